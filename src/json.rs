#![forbid(unsafe_code)]

//! SAX-style JSON event stream and deterministic JSON writer.
//!
//! The tokenizer delivers every numeric literal as a [`JsonEvent::Str`]
//! payload without converting it, so 64-bit and 128-bit integers survive the
//! trip through JSON untouched. String payloads borrow a scratch buffer owned
//! by the tokenizer and are only valid until the next [`JsonTokenizer::next_event`]
//! call; consumers copy what they keep.

use std::fmt::Write;

use crate::{Error, Result};

/// One event of the JSON stream.
///
/// Numbers are delivered as [`JsonEvent::Str`]; a consumer that needs the
/// numeric value parses the payload itself.
#[derive(Debug, PartialEq)]
pub enum JsonEvent<'a> {
    Null,
    Bool(bool),
    /// A string value or an unconverted numeric literal.
    Str(&'a str),
    StartObject,
    /// An object key.
    Key(&'a str),
    EndObject,
    StartArray,
    EndArray,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ctx {
    Object,
    Array,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Value,
    ObjectFirst,
    ObjectNext,
    ArrayFirst,
    ArrayNext,
    Finished,
}

/// Pull tokenizer over a JSON document.
#[derive(Debug)]
pub struct JsonTokenizer<'a> {
    input: &'a [u8],
    pos: usize,
    scratch: String,
    ctx: Vec<Ctx>,
    state: State,
}

impl<'a> JsonTokenizer<'a> {
    /// Create a tokenizer over the provided JSON text.
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            scratch: String::new(),
            ctx: Vec::new(),
            state: State::Value,
        }
    }

    /// Produce the next event, or `Ok(None)` once the document is complete.
    ///
    /// Input after the root value is rejected with
    /// [`Error::TrailingCharacters`].
    pub fn next_event(&mut self) -> Result<Option<JsonEvent<'_>>> {
        self.skip_whitespace();
        match self.state {
            State::Finished => {
                if self.pos < self.input.len() {
                    Err(Error::TrailingCharacters)
                } else {
                    Ok(None)
                }
            }
            State::Value => self.value_event(),
            State::ObjectFirst => {
                if self.peek_byte() == Some(b'}') {
                    self.pos += 1;
                    self.close_scope();
                    Ok(Some(JsonEvent::EndObject))
                } else {
                    self.key_event()
                }
            }
            State::ObjectNext => match self.peek_byte() {
                Some(b'}') => {
                    self.pos += 1;
                    self.close_scope();
                    Ok(Some(JsonEvent::EndObject))
                }
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    self.key_event()
                }
                _ => Err(self.unexpected("',' or '}'")),
            },
            State::ArrayFirst => {
                if self.peek_byte() == Some(b']') {
                    self.pos += 1;
                    self.close_scope();
                    Ok(Some(JsonEvent::EndArray))
                } else {
                    self.value_event()
                }
            }
            State::ArrayNext => match self.peek_byte() {
                Some(b']') => {
                    self.pos += 1;
                    self.close_scope();
                    Ok(Some(JsonEvent::EndArray))
                }
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    self.value_event()
                }
                _ => Err(self.unexpected("',' or ']'")),
            },
        }
    }

    fn close_scope(&mut self) {
        self.ctx.pop();
        self.state = self.after_value();
    }

    fn after_value(&self) -> State {
        match self.ctx.last() {
            None => State::Finished,
            Some(Ctx::Object) => State::ObjectNext,
            Some(Ctx::Array) => State::ArrayNext,
        }
    }

    fn value_event(&mut self) -> Result<Option<JsonEvent<'_>>> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('{') => {
                self.pos += 1;
                self.ctx.push(Ctx::Object);
                self.state = State::ObjectFirst;
                Ok(Some(JsonEvent::StartObject))
            }
            Some('[') => {
                self.pos += 1;
                self.ctx.push(Ctx::Array);
                self.state = State::ArrayFirst;
                Ok(Some(JsonEvent::StartArray))
            }
            Some('"') => {
                self.parse_string()?;
                self.state = self.after_value();
                Ok(Some(JsonEvent::Str(&self.scratch)))
            }
            Some('t') | Some('f') => {
                let value = if self.consume_literal("true") {
                    true
                } else if self.consume_literal("false") {
                    false
                } else {
                    return Err(self.unexpected("boolean"));
                };
                self.state = self.after_value();
                Ok(Some(JsonEvent::Bool(value)))
            }
            Some('n') => {
                if !self.consume_literal("null") {
                    return Err(self.unexpected("null"));
                }
                self.state = self.after_value();
                Ok(Some(JsonEvent::Null))
            }
            Some('-') | Some('0'..='9') => {
                self.lex_number()?;
                self.state = self.after_value();
                Ok(Some(JsonEvent::Str(&self.scratch)))
            }
            Some(_) => Err(self.unexpected("value")),
            None => Err(Error::UnexpectedEnd("value")),
        }
    }

    fn key_event(&mut self) -> Result<Option<JsonEvent<'_>>> {
        self.skip_whitespace();
        self.parse_string()?;
        self.skip_whitespace();
        match self.next_char() {
            Some(':') => {}
            Some(found) => {
                return Err(Error::UnexpectedToken {
                    expected: "':'",
                    found,
                })
            }
            None => return Err(Error::UnexpectedEnd("':'")),
        }
        self.state = State::Value;
        Ok(Some(JsonEvent::Key(&self.scratch)))
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_char(&self) -> Option<char> {
        let remaining = std::str::from_utf8(&self.input[self.pos..]).ok()?;
        remaining.chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let remaining = std::str::from_utf8(&self.input[self.pos..]).ok()?;
        let ch = remaining.chars().next()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn consume_literal(&mut self, literal: &str) -> bool {
        if self.input[self.pos..].starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> Error {
        match self.peek_char() {
            Some(found) => Error::UnexpectedToken { expected, found },
            None => Error::UnexpectedEnd(expected),
        }
    }

    /// Parse a quoted string into the scratch buffer.
    fn parse_string(&mut self) -> Result<()> {
        match self.next_char() {
            Some('"') => {}
            Some(found) => {
                return Err(Error::UnexpectedToken {
                    expected: "'\"'",
                    found,
                })
            }
            None => return Err(Error::UnexpectedEnd("string")),
        }
        self.scratch.clear();
        loop {
            match self.next_char() {
                Some('"') => break,
                Some('\\') => {
                    let escaped = self.next_char().ok_or(Error::UnexpectedEnd("escape"))?;
                    match escaped {
                        '"' => self.scratch.push('"'),
                        '\\' => self.scratch.push('\\'),
                        '/' => self.scratch.push('/'),
                        'b' => self.scratch.push('\u{0008}'),
                        'f' => self.scratch.push('\u{000C}'),
                        'n' => self.scratch.push('\n'),
                        'r' => self.scratch.push('\r'),
                        't' => self.scratch.push('\t'),
                        'u' => {
                            let code = self.parse_unicode_escape()?;
                            self.scratch.push(code);
                        }
                        found => {
                            return Err(Error::UnexpectedToken {
                                expected: "valid escape",
                                found,
                            })
                        }
                    }
                }
                Some(ch) => {
                    if ch.is_control() {
                        return Err(Error::UnexpectedToken {
                            expected: "non-control character",
                            found: ch,
                        });
                    }
                    self.scratch.push(ch);
                }
                None => return Err(Error::UnexpectedEnd("string")),
            }
        }
        Ok(())
    }

    fn parse_unicode_escape(&mut self) -> Result<char> {
        let value = self.parse_hex4()?;
        if (0xD800..=0xDBFF).contains(&value) {
            // High surrogate must be followed by an escaped low surrogate.
            if self.next_char() != Some('\\') || self.next_char() != Some('u') {
                return Err(Error::InvalidUnicodeEscape);
            }
            let low = self.parse_hex4()?;
            decode_surrogate_pair(value, low).ok_or(Error::InvalidUnicodeEscape)
        } else {
            char::from_u32(u32::from(value)).ok_or(Error::InvalidUnicodeEscape)
        }
    }

    fn parse_hex4(&mut self) -> Result<u16> {
        let mut hex = String::new();
        for _ in 0..4 {
            let ch = self
                .next_char()
                .ok_or(Error::UnexpectedEnd("unicode escape"))?;
            hex.push(ch);
        }
        u16::from_str_radix(&hex, 16).map_err(|_| Error::InvalidUnicodeEscape)
    }

    /// Lex one JSON number into the scratch buffer without converting it.
    fn lex_number(&mut self) -> Result<()> {
        let start = self.pos;
        if self.peek_byte() == Some(b'-') {
            self.pos += 1;
        }
        match self.peek_byte() {
            Some(b'0') => {
                self.pos += 1;
            }
            Some(b'1'..=b'9') => {
                while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
            _ => return Err(self.unexpected("digit")),
        }

        if self.peek_byte() == Some(b'.') {
            self.pos += 1;
            if !matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                return Err(Error::InvalidNumber);
            }
            while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }

        if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if !matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                return Err(Error::InvalidNumber);
            }
            while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }

        let text =
            std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| Error::InvalidNumber)?;
        self.scratch.clear();
        self.scratch.push_str(text);
        Ok(())
    }
}

fn decode_surrogate_pair(high: u16, low: u16) -> Option<char> {
    if (0xDC00..=0xDFFF).contains(&low) {
        let high_ten = u32::from(high) - 0xD800;
        let low_ten = u32::from(low) - 0xDC00;
        char::from_u32(0x10000 + ((high_ten << 10) | low_ten))
    } else {
        None
    }
}

/// Deterministic JSON builder used by the binary-to-JSON engine.
#[derive(Default, Debug)]
pub struct JsonWriter {
    buffer: String,
    stack: Vec<WriterState>,
    needs_comma: Vec<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriterState {
    Object,
    Array,
}

impl JsonWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_state(&mut self, state: WriterState) {
        self.stack.push(state);
        self.needs_comma.push(false);
    }

    fn write_separator(&mut self) {
        if matches!(self.needs_comma.last(), Some(true)) {
            self.buffer.push(',');
        }
        if let Some(last) = self.needs_comma.last_mut() {
            *last = true;
        }
    }

    pub fn begin_object(&mut self) {
        self.write_separator();
        self.buffer.push('{');
        self.push_state(WriterState::Object);
    }

    pub fn end_object(&mut self) {
        self.stack.pop();
        self.needs_comma.pop();
        self.buffer.push('}');
    }

    pub fn begin_array(&mut self) {
        self.write_separator();
        self.buffer.push('[');
        self.push_state(WriterState::Array);
    }

    pub fn end_array(&mut self) {
        self.stack.pop();
        self.needs_comma.pop();
        self.buffer.push(']');
    }

    pub fn object_key(&mut self, key: &str) {
        if !matches!(self.stack.last(), Some(WriterState::Object)) {
            panic!("object_key called outside of object context");
        }
        self.write_separator();
        self.write_string_raw(key);
        self.buffer.push(':');
        if let Some(last) = self.needs_comma.last_mut() {
            *last = false;
        }
    }

    pub fn string(&mut self, value: &str) {
        self.write_separator();
        self.write_string_raw(value);
    }

    fn write_string_raw(&mut self, value: &str) {
        self.buffer.push('"');
        for ch in value.chars() {
            match ch {
                '"' => self.buffer.push_str("\\\""),
                '\\' => self.buffer.push_str("\\\\"),
                '\n' => self.buffer.push_str("\\n"),
                '\r' => self.buffer.push_str("\\r"),
                '\t' => self.buffer.push_str("\\t"),
                c if c.is_control() => {
                    write!(&mut self.buffer, "\\u{:04X}", c as u32).expect("write hex escape");
                }
                other => self.buffer.push(other),
            }
        }
        self.buffer.push('"');
    }

    /// Emit an unsigned integer as a JSON number.
    pub fn unsigned(&mut self, value: u64) {
        self.write_separator();
        write!(&mut self.buffer, "{value}").expect("write number");
    }

    /// Emit a signed integer as a JSON number.
    pub fn signed(&mut self, value: i64) {
        self.write_separator();
        write!(&mut self.buffer, "{value}").expect("write number");
    }

    /// Emit a finite double as a JSON number.
    ///
    /// Integral values render with a trailing `.0` so the output remains
    /// recognizably floating-point.
    pub fn double(&mut self, value: f64) {
        self.write_separator();
        if value.fract() == 0.0 && value.abs() < 1e17 {
            let mut s = format!("{value:.1}");
            while s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.push('0');
            }
            self.buffer.push_str(&s);
        } else {
            write!(&mut self.buffer, "{value}").expect("write number");
        }
    }

    pub fn boolean(&mut self, value: bool) {
        self.write_separator();
        self.buffer.push_str(if value { "true" } else { "false" });
    }

    pub fn null(&mut self) {
        self.write_separator();
        self.buffer.push_str("null");
    }

    /// Consume the writer, returning the rendered JSON text.
    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonEvent, JsonTokenizer, JsonWriter};
    use crate::Error;

    fn collect(input: &str) -> Vec<String> {
        let mut tok = JsonTokenizer::new(input);
        let mut events = Vec::new();
        while let Some(event) = tok.next_event().expect("tokenize") {
            events.push(format!("{event:?}"));
        }
        events
    }

    #[test]
    fn numbers_are_delivered_as_strings() {
        let events = collect("[10, -3.5, 1e4]");
        assert_eq!(
            events,
            [
                "StartArray",
                "Str(\"10\")",
                "Str(\"-3.5\")",
                "Str(\"1e4\")",
                "EndArray",
            ]
        );
    }

    #[test]
    fn object_events_carry_keys() {
        let events = collect(r#"{"a": true, "b": {"c": null}}"#);
        assert_eq!(
            events,
            [
                "StartObject",
                "Key(\"a\")",
                "Bool(true)",
                "Key(\"b\")",
                "StartObject",
                "Key(\"c\")",
                "Null",
                "EndObject",
                "EndObject",
            ]
        );
    }

    #[test]
    fn empty_containers() {
        assert_eq!(collect("{}"), ["StartObject", "EndObject"]);
        assert_eq!(collect("[]"), ["StartArray", "EndArray"]);
    }

    #[test]
    fn escapes_and_surrogate_pairs() {
        let mut tok = JsonTokenizer::new(r#""a\nA😀""#);
        match tok.next_event().expect("event") {
            Some(JsonEvent::Str(s)) => assert_eq!(s, "a\nA\u{1F600}"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(tok.next_event().expect("end").is_none());
    }

    #[test]
    fn trailing_input_is_rejected() {
        let mut tok = JsonTokenizer::new("true false");
        tok.next_event().expect("first value");
        assert!(matches!(
            tok.next_event(),
            Err(Error::TrailingCharacters)
        ));
    }

    #[test]
    fn missing_comma_is_rejected() {
        let mut tok = JsonTokenizer::new("[1 2]");
        tok.next_event().expect("start");
        tok.next_event().expect("first");
        assert!(matches!(
            tok.next_event(),
            Err(Error::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn writer_renders_deterministic_output() {
        let mut writer = JsonWriter::new();
        writer.begin_object();
        writer.object_key("id");
        writer.unsigned(9);
        writer.object_key("scores");
        writer.begin_array();
        writer.signed(-2);
        writer.double(1.0);
        writer.double(0.5);
        writer.end_array();
        writer.object_key("name");
        writer.string("a\"b");
        writer.object_key("gone");
        writer.null();
        writer.end_object();
        assert_eq!(
            writer.finish(),
            r#"{"id":9,"scores":[-2,1.0,0.5],"name":"a\"b","gone":null}"#
        );
    }
}
