//! The structured printer collaborator the dumper writes through.
//!
//! [`Sink`] models an external tree-shaped printer: scopes are opened and
//! must be closed in LIFO order. [`Scope`] and [`ListScope`] are RAII
//! guards so a mid-iteration error still closes every dict/list it opened,
//! matching the "scoped acquisition" design note.

use std::io::Write;

/// A structured, tree-shaped output sink.
pub trait Sink {
    /// Open a labelled dict scope.
    fn open_dict(&mut self, label: &str);
    /// Close the most recently opened dict scope.
    fn close_dict(&mut self);
    /// Open a labelled list scope.
    fn open_list(&mut self, label: &str);
    /// Close the most recently opened list scope.
    fn close_list(&mut self);
    /// Print a key and a hex-formatted value.
    fn print_hex(&mut self, key: &str, value: u64);
    /// Print a key and a decimal value.
    fn print_number(&mut self, key: &str, value: u64);
    /// Print a key and a string value.
    fn print_string(&mut self, key: &str, value: &str);
    /// Begin a free-form line, returning a writer for its text.
    fn start_line(&mut self) -> &mut dyn Write;
}

/// A plain-text, indentation-tracking [`Sink`] backed by any [`Write`]r.
///
/// The one concrete sink this crate ships; a real dumper driver would
/// likely wrap a JSON or YAML emitter instead, but that driver is out of
/// scope here.
pub struct TextSink<W: Write> {
    out: W,
    depth: usize,
    line_buf: Vec<u8>,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, depth: 0, line_buf: Vec::new() }
    }

    fn indent(&mut self) {
        let _ = write!(self.out, "{}", "  ".repeat(self.depth));
    }

    fn flush_line_buf(&mut self) {
        if !self.line_buf.is_empty() {
            let _ = self.out.write_all(&self.line_buf);
            let _ = writeln!(self.out);
            self.line_buf.clear();
        }
    }
}

impl<W: Write> Sink for TextSink<W> {
    fn open_dict(&mut self, label: &str) {
        self.indent();
        let _ = writeln!(self.out, "{label} {{");
        self.depth += 1;
    }

    fn close_dict(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        let _ = writeln!(self.out, "}}");
    }

    fn open_list(&mut self, label: &str) {
        self.indent();
        let _ = writeln!(self.out, "{label} [");
        self.depth += 1;
    }

    fn close_list(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        let _ = writeln!(self.out, "]");
    }

    fn print_hex(&mut self, key: &str, value: u64) {
        self.indent();
        let _ = writeln!(self.out, "{key} = 0x{value:x}");
    }

    fn print_number(&mut self, key: &str, value: u64) {
        self.indent();
        let _ = writeln!(self.out, "{key} = {value}");
    }

    fn print_string(&mut self, key: &str, value: &str) {
        self.indent();
        let _ = writeln!(self.out, "{key} = \"{value}\"");
    }

    fn start_line(&mut self) -> &mut dyn Write {
        self.flush_line_buf();
        self.indent();
        &mut self.line_buf
    }
}

/// A scoped dict that closes on drop, so an early return or `?` inside the
/// scope still balances `open_dict`/`close_dict`.
pub struct Scope<'s> {
    sink: &'s mut dyn Sink,
}

impl<'s> Scope<'s> {
    pub fn open(sink: &'s mut dyn Sink, label: &str) -> Self {
        sink.open_dict(label);
        Self { sink }
    }

    pub fn sink(&mut self) -> &mut dyn Sink {
        self.sink
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.sink.close_dict();
    }
}

/// A scoped list that closes on drop.
pub struct ListScope<'s> {
    sink: &'s mut dyn Sink,
}

impl<'s> ListScope<'s> {
    pub fn open(sink: &'s mut dyn Sink, label: &str) -> Self {
        sink.open_list(label);
        Self { sink }
    }

    pub fn sink(&mut self) -> &mut dyn Sink {
        self.sink
    }
}

impl Drop for ListScope<'_> {
    fn drop(&mut self) {
        self.sink.close_list();
    }
}
