//! Tagged text writer shared by the EIF, ESE and RTG formats
//!
//! Every line is `<tabs>*TAG value value ...`. Blocks open with a trailing
//! `{` and close with a `}` line one level up. Output is accumulated in
//! memory; nothing touches the disk until a render has fully succeeded.

use std::fmt::Display;

use euroland_core::{Vec2, Vec3};

/// Format a float with fixed precision, never emitting `-0`
pub fn format_float(value: f32, precision: usize) -> String {
    let mut text = format!("{:.*}", precision, value);
    if text.starts_with('-') && text[1..].bytes().all(|b| b == b'0' || b == b'.') {
        text.remove(0);
    }
    text
}

/// Quote a string value; embedded quotes and control characters are replaced
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push('\''),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Indented tag writer
#[derive(Debug)]
pub struct TagWriter {
    buf: String,
    depth: usize,
    precision: usize,
}

impl TagWriter {
    pub fn new(precision: usize) -> Self {
        Self {
            buf: String::with_capacity(64 * 1024),
            depth: 0,
            precision,
        }
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Current block nesting
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Start a tagged line
    pub fn record(&mut self, tag: &str) -> Record<'_> {
        let mut line = String::with_capacity(64);
        line.push('*');
        line.push_str(tag);
        Record { writer: self, line }
    }

    /// Tag without values
    pub fn tag(&mut self, tag: &str) {
        self.record(tag).end();
    }

    /// `*TAG {` and one level deeper
    pub fn open(&mut self, tag: &str) {
        self.record(tag).open();
    }

    /// Close the innermost block
    pub fn close(&mut self) {
        debug_assert!(self.depth > 0, "close without open");
        self.depth = self.depth.saturating_sub(1);
        self.push_line("}");
    }

    /// Raw indented line
    pub fn line(&mut self, text: &str) {
        self.push_line(text);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Consume the writer; every opened block must be closed
    pub fn finish(self) -> String {
        debug_assert_eq!(self.depth, 0, "unclosed block");
        self.buf
    }

    fn push_line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.buf.push('\t');
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }
}

/// One tagged line under construction
#[must_use = "a record is only written by end() or open()"]
pub struct Record<'w> {
    writer: &'w mut TagWriter,
    line: String,
}

impl<'w> Record<'w> {
    /// Integer or other displayable token
    pub fn value(mut self, value: impl Display) -> Self {
        self.line.push(' ');
        self.line.push_str(&value.to_string());
        self
    }

    pub fn int(self, value: i64) -> Self {
        self.value(value)
    }

    pub fn uint(self, value: u64) -> Self {
        self.value(value)
    }

    /// Index or `-1` when absent
    pub fn index(self, value: Option<u32>) -> Self {
        match value {
            Some(v) => self.value(v),
            None => self.value(-1),
        }
    }

    pub fn float(mut self, value: f32) -> Self {
        let text = format_float(value, self.writer.precision);
        self.line.push(' ');
        self.line.push_str(&text);
        self
    }

    pub fn floats(mut self, values: &[f32]) -> Self {
        for &v in values {
            self = self.float(v);
        }
        self
    }

    pub fn vec2(self, v: Vec2) -> Self {
        self.floats(&[v.x, v.y])
    }

    pub fn vec3(self, v: Vec3) -> Self {
        self.floats(&[v.x, v.y, v.z])
    }

    /// Quoted string
    pub fn string(mut self, value: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(&quote_string(value));
        self
    }

    /// Bare word
    pub fn word(mut self, value: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(value);
        self
    }

    /// Text appended with no separator
    pub fn raw(mut self, text: &str) -> Self {
        self.line.push_str(text);
        self
    }

    pub fn flag(self, value: bool) -> Self {
        self.value(u8::from(value))
    }

    /// Finish the line
    pub fn end(self) {
        self.writer.push_line(&self.line);
    }

    /// Finish the line as a block opener
    pub fn open(mut self) {
        self.line.push_str(" {");
        self.writer.push_line(&self.line);
        self.writer.depth += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0, 4), "1.0000");
        assert_eq!(format_float(-0.5, 2), "-0.50");
        assert_eq!(format_float(-0.0, 4), "0.0000");
        assert_eq!(format_float(-0.00001, 4), "0.0000");
        assert_eq!(format_float(3.0, 0), "3");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("Cube"), "\"Cube\"");
        assert_eq!(quote_string("say \"hi\""), "\"say 'hi'\"");
        assert_eq!(quote_string("a\tb\n"), "\"a b \"");
    }

    #[test]
    fn test_nested_blocks() {
        let mut w = TagWriter::new(2);
        w.open("GEOMOBJECT");
        w.record("NODE_NAME").string("Box").end();
        w.open("MESH");
        w.record("MESH_VERTEX").uint(0).vec3(Vec3::new(1.0, -0.0, 2.5)).end();
        w.close();
        w.close();

        let text = w.finish();
        assert_eq!(
            text,
            "*GEOMOBJECT {\n\t*NODE_NAME \"Box\"\n\t*MESH {\n\t\t*MESH_VERTEX 0 1.00 0.00 2.50\n\t}\n}\n"
        );
    }

    #[test]
    fn test_index_and_flags() {
        let mut w = TagWriter::new(6);
        w.record("FACE").index(Some(3)).index(None).flag(true).word("LH").end();
        assert_eq!(w.as_str(), "*FACE 3 -1 1 LH\n");
        assert_eq!(w.depth(), 0);
    }
}
