//! Hand-rolled diagnostic JSON writer for decoded typed values.
//!
//! This is not a `serde_json::Value` builder: it streams directly into an internal string
//! buffer and tracks indentation and comma/newline placement itself, mirroring the streaming
//! diagnostic dumper the reference ASN.1 runtime uses to render decoded messages for logging.

use core::fmt::Write as _;

#[derive(Copy, Clone, PartialEq, Eq)]
enum Separator {
    None,
    Comma,
    Newline,
}

pub struct JsonWriter {
    buf: String,
    ident: String,
    sep: Separator,
}

impl JsonWriter {
    pub fn new() -> Self {
        JsonWriter {
            buf: String::new(),
            ident: String::new(),
            sep: Separator::None,
        }
    }

    fn before_value(&mut self) {
        match self.sep {
            Separator::Comma => self.buf.push_str(",\n"),
            Separator::Newline => self.buf.push('\n'),
            Separator::None => {}
        }
        self.buf.push_str(&self.ident);
        self.sep = Separator::Comma;
    }

    pub fn write_fieldname(&mut self, name: &str) {
        self.before_value();
        let _ = write!(self.buf, "\"{}\": ", name);
        self.sep = Separator::None;
    }

    pub fn write_str(&mut self, name: &str, value: &str) {
        self.write_fieldname(name);
        let _ = write!(self.buf, "\"{}\"", value);
        self.sep = Separator::Comma;
    }

    pub fn write_str_elem(&mut self, value: &str) {
        self.before_value();
        let _ = write!(self.buf, "\"{}\"", value);
    }

    pub fn write_int(&mut self, name: &str, value: i64) {
        self.write_fieldname(name);
        let _ = write!(self.buf, "{}", value);
        self.sep = Separator::Comma;
    }

    pub fn write_int_elem(&mut self, value: i64) {
        self.before_value();
        let _ = write!(self.buf, "{}", value);
    }

    pub fn write_bool(&mut self, name: &str, value: bool) {
        self.write_fieldname(name);
        self.buf.push_str(if value { "true" } else { "false" });
        self.sep = Separator::Comma;
    }

    pub fn write_null(&mut self, name: &str) {
        self.write_fieldname(name);
        self.buf.push_str("null");
        self.sep = Separator::Comma;
    }

    pub fn start_obj(&mut self, name: &str) {
        if !name.is_empty() {
            self.write_fieldname(name);
        } else {
            self.before_value();
        }
        self.buf.push('{');
        self.ident.push_str("  ");
        self.sep = Separator::Newline;
    }

    pub fn end_obj(&mut self) {
        self.ident.truncate(self.ident.len().saturating_sub(2));
        self.buf.push('\n');
        self.buf.push_str(&self.ident);
        self.buf.push('}');
        self.sep = Separator::Comma;
    }

    pub fn start_array(&mut self, name: &str) {
        if !name.is_empty() {
            self.write_fieldname(name);
        } else {
            self.before_value();
        }
        self.buf.push('[');
        self.ident.push_str("  ");
        self.sep = Separator::Newline;
    }

    pub fn end_array(&mut self) {
        self.ident.truncate(self.ident.len().saturating_sub(2));
        self.buf.push('\n');
        self.buf.push_str(&self.ident);
        self.buf.push(']');
        self.sep = Separator::Comma;
    }

    pub fn to_string(&self) -> String {
        self.buf.clone()
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything composing the PER typed-value templates can render itself for diagnostics.
pub trait ToJson {
    fn to_json(&self, w: &mut JsonWriter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_flat_object() {
        let mut w = JsonWriter::new();
        w.start_obj("");
        w.write_int("sn", 7);
        w.write_bool("last", true);
        w.end_obj();
        let s = w.to_string();
        assert!(s.contains("\"sn\": 7"));
        assert!(s.contains("\"last\": true"));
    }

    #[test]
    fn renders_array_of_ints() {
        let mut w = JsonWriter::new();
        w.start_array("li");
        w.write_int_elem(1);
        w.write_int_elem(2);
        w.end_array();
        let s = w.to_string();
        assert!(s.contains("\"li\": ["));
        assert!(s.contains('1'));
        assert!(s.contains('2'));
    }
}
