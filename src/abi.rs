#![forbid(unsafe_code)]

//! ABI descriptor records and their reflective codecs.
//!
//! The descriptor is the schema document itself: the list of aliases, structs
//! and actions a contract publishes. Unlike the ABI-driven engines, the
//! codecs here are keyed off compile-time field lists (the `native_record!`
//! macro below), so the descriptor can be decoded before any type graph
//! exists, including from its own packed wire form as stored on chain.
//!
//! JSON decoding matches keys by name in any order; fields absent from the
//! input keep their defaults; unknown keys are a hard error.

use crate::binary::{BinReader, BinWriter};
use crate::json::{JsonEvent, JsonTokenizer, JsonWriter};
use crate::primitive::{parse_signed, parse_unsigned};
use crate::types::{Bytes, Name};
use crate::{Error, Result, MAX_STACK_SIZE};

/// Owned snapshot of one tokenizer event.
///
/// The streaming engines borrow payloads straight out of the tokenizer's
/// scratch buffer; the reflective decoder instead needs to hold an event
/// across nested calls, so it copies the payload out first.
#[derive(Clone, Debug, PartialEq)]
pub enum OwnedEvent {
    Null,
    Bool(bool),
    Str(String),
    StartObject,
    Key(String),
    EndObject,
    StartArray,
    EndArray,
}

/// Pull the next event, failing on a premature end of input.
fn next_owned(tok: &mut JsonTokenizer<'_>) -> Result<OwnedEvent> {
    match tok.next_event()? {
        Some(JsonEvent::Null) => Ok(OwnedEvent::Null),
        Some(JsonEvent::Bool(b)) => Ok(OwnedEvent::Bool(b)),
        Some(JsonEvent::Str(s)) => Ok(OwnedEvent::Str(s.to_owned())),
        Some(JsonEvent::StartObject) => Ok(OwnedEvent::StartObject),
        Some(JsonEvent::Key(k)) => Ok(OwnedEvent::Key(k.to_owned())),
        Some(JsonEvent::EndObject) => Ok(OwnedEvent::EndObject),
        Some(JsonEvent::StartArray) => Ok(OwnedEvent::StartArray),
        Some(JsonEvent::EndArray) => Ok(OwnedEvent::EndArray),
        None => Err(Error::UnexpectedEnd("value")),
    }
}

fn borrow_event(event: &OwnedEvent) -> JsonEvent<'_> {
    match event {
        OwnedEvent::Null => JsonEvent::Null,
        OwnedEvent::Bool(b) => JsonEvent::Bool(*b),
        OwnedEvent::Str(s) => JsonEvent::Str(s),
        OwnedEvent::StartObject => JsonEvent::StartObject,
        OwnedEvent::Key(k) => JsonEvent::Key(k),
        OwnedEvent::EndObject => JsonEvent::EndObject,
        OwnedEvent::StartArray => JsonEvent::StartArray,
        OwnedEvent::EndArray => JsonEvent::EndArray,
    }
}

/// Wire-format serialization for a host record.
pub trait BinaryEncode {
    fn encode_binary(&self, writer: &mut BinWriter);
}

/// Wire-format deserialization for a host record.
pub trait BinaryDecode: Sized {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self>;
}

/// JSON rendering for a host record.
pub trait JsonEncode {
    fn encode_json(&self, writer: &mut JsonWriter);
}

/// JSON decoding for a host record. `event` is the first event of the value;
/// nested values are pulled from the tokenizer.
pub trait JsonDecode: Sized {
    fn decode_json(event: OwnedEvent, tok: &mut JsonTokenizer<'_>, depth: usize) -> Result<Self>;
}

impl BinaryEncode for bool {
    fn encode_binary(&self, writer: &mut BinWriter) {
        writer.write_bool(*self);
    }
}

impl BinaryDecode for bool {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
        Ok(reader.read_u8()? != 0)
    }
}

impl JsonEncode for bool {
    fn encode_json(&self, writer: &mut JsonWriter) {
        writer.boolean(*self);
    }
}

impl JsonDecode for bool {
    fn decode_json(event: OwnedEvent, _tok: &mut JsonTokenizer<'_>, _depth: usize) -> Result<Self> {
        match parse_unsigned(&borrow_event(&event))? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::NumberOutOfRange),
        }
    }
}

macro_rules! unsigned_scalar {
    ($ty:ty, $write:ident, $read:ident) => {
        impl BinaryEncode for $ty {
            fn encode_binary(&self, writer: &mut BinWriter) {
                writer.$write(*self);
            }
        }

        impl BinaryDecode for $ty {
            fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
                reader.$read()
            }
        }

        impl JsonEncode for $ty {
            fn encode_json(&self, writer: &mut JsonWriter) {
                writer.unsigned(u64::from(*self));
            }
        }

        impl JsonDecode for $ty {
            fn decode_json(
                event: OwnedEvent,
                _tok: &mut JsonTokenizer<'_>,
                _depth: usize,
            ) -> Result<Self> {
                let wide = parse_unsigned(&borrow_event(&event))?;
                <$ty>::try_from(wide).map_err(|_| Error::NumberOutOfRange)
            }
        }
    };
}

unsigned_scalar!(u8, write_u8, read_u8);
unsigned_scalar!(u16, write_u16, read_u16);
unsigned_scalar!(u32, write_u32, read_u32);

impl BinaryEncode for u64 {
    fn encode_binary(&self, writer: &mut BinWriter) {
        writer.write_u64(*self);
    }
}

impl BinaryDecode for u64 {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
        reader.read_u64()
    }
}

impl JsonEncode for u64 {
    fn encode_json(&self, writer: &mut JsonWriter) {
        writer.unsigned(*self);
    }
}

impl JsonDecode for u64 {
    fn decode_json(event: OwnedEvent, _tok: &mut JsonTokenizer<'_>, _depth: usize) -> Result<Self> {
        parse_unsigned(&borrow_event(&event))
    }
}

impl BinaryEncode for i64 {
    fn encode_binary(&self, writer: &mut BinWriter) {
        writer.write_i64(*self);
    }
}

impl BinaryDecode for i64 {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
        reader.read_i64()
    }
}

impl JsonEncode for i64 {
    fn encode_json(&self, writer: &mut JsonWriter) {
        writer.signed(*self);
    }
}

impl JsonDecode for i64 {
    fn decode_json(event: OwnedEvent, _tok: &mut JsonTokenizer<'_>, _depth: usize) -> Result<Self> {
        parse_signed(&borrow_event(&event))
    }
}

impl BinaryEncode for String {
    fn encode_binary(&self, writer: &mut BinWriter) {
        writer.write_string(self);
    }
}

impl BinaryDecode for String {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
        reader.read_string()
    }
}

impl JsonEncode for String {
    fn encode_json(&self, writer: &mut JsonWriter) {
        writer.string(self);
    }
}

impl JsonDecode for String {
    fn decode_json(event: OwnedEvent, _tok: &mut JsonTokenizer<'_>, _depth: usize) -> Result<Self> {
        match event {
            OwnedEvent::Str(s) => Ok(s),
            _ => Err(Error::ExpectedString),
        }
    }
}

impl BinaryEncode for Name {
    fn encode_binary(&self, writer: &mut BinWriter) {
        writer.write_u64(self.0);
    }
}

impl BinaryDecode for Name {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
        Ok(Name(reader.read_u64()?))
    }
}

impl JsonEncode for Name {
    fn encode_json(&self, writer: &mut JsonWriter) {
        writer.string(&self.to_string());
    }
}

impl JsonDecode for Name {
    fn decode_json(event: OwnedEvent, _tok: &mut JsonTokenizer<'_>, _depth: usize) -> Result<Self> {
        match event {
            OwnedEvent::Str(s) => Ok(Name::from_str(&s)),
            _ => Err(Error::ExpectedValueString("name")),
        }
    }
}

impl BinaryEncode for Bytes {
    fn encode_binary(&self, writer: &mut BinWriter) {
        writer.write_bytes(&self.0);
    }
}

impl BinaryDecode for Bytes {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
        Ok(Bytes(reader.read_bytes()?))
    }
}

impl JsonEncode for Bytes {
    fn encode_json(&self, writer: &mut JsonWriter) {
        writer.string(&hex::encode(&self.0));
    }
}

impl JsonDecode for Bytes {
    fn decode_json(event: OwnedEvent, _tok: &mut JsonTokenizer<'_>, _depth: usize) -> Result<Self> {
        match event {
            OwnedEvent::Str(s) => {
                if s.len() % 2 != 0 {
                    return Err(Error::OddHexDigits);
                }
                Ok(Bytes(hex::decode(&s).map_err(|_| Error::ExpectedHexString)?))
            }
            _ => Err(Error::ExpectedValueString("hex digits")),
        }
    }
}

impl<T: BinaryEncode> BinaryEncode for Vec<T> {
    fn encode_binary(&self, writer: &mut BinWriter) {
        writer.write_varuint32(self.len() as u32);
        for item in self {
            item.encode_binary(writer);
        }
    }
}

impl<T: BinaryDecode> BinaryDecode for Vec<T> {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
        let len = reader.read_varuint32()? as usize;
        let mut items = Vec::new();
        for _ in 0..len {
            items.push(T::decode_binary(reader)?);
        }
        Ok(items)
    }
}

impl<T: JsonEncode> JsonEncode for Vec<T> {
    fn encode_json(&self, writer: &mut JsonWriter) {
        writer.begin_array();
        for item in self {
            item.encode_json(writer);
        }
        writer.end_array();
    }
}

impl<T: JsonDecode> JsonDecode for Vec<T> {
    fn decode_json(event: OwnedEvent, tok: &mut JsonTokenizer<'_>, depth: usize) -> Result<Self> {
        if depth > MAX_STACK_SIZE {
            return Err(Error::RecursionLimit);
        }
        if event != OwnedEvent::StartArray {
            return Err(Error::ExpectedArray);
        }
        let mut items = Vec::new();
        loop {
            match next_owned(tok)? {
                OwnedEvent::EndArray => break,
                first => items.push(T::decode_json(first, tok, depth + 1)?),
            }
        }
        Ok(items)
    }
}

// Pairs serialize element by element, each with its own codec; the JSON form
// is a two-element array.
impl<A: BinaryEncode, B: BinaryEncode> BinaryEncode for (A, B) {
    fn encode_binary(&self, writer: &mut BinWriter) {
        self.0.encode_binary(writer);
        self.1.encode_binary(writer);
    }
}

impl<A: BinaryDecode, B: BinaryDecode> BinaryDecode for (A, B) {
    fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
        Ok((A::decode_binary(reader)?, B::decode_binary(reader)?))
    }
}

impl<A: JsonEncode, B: JsonEncode> JsonEncode for (A, B) {
    fn encode_json(&self, writer: &mut JsonWriter) {
        writer.begin_array();
        self.0.encode_json(writer);
        self.1.encode_json(writer);
        writer.end_array();
    }
}

impl<A: JsonDecode, B: JsonDecode> JsonDecode for (A, B) {
    fn decode_json(event: OwnedEvent, tok: &mut JsonTokenizer<'_>, depth: usize) -> Result<Self> {
        if depth > MAX_STACK_SIZE {
            return Err(Error::RecursionLimit);
        }
        if event != OwnedEvent::StartArray {
            return Err(Error::ExpectedArray);
        }
        let first = A::decode_json(next_owned(tok)?, tok, depth + 1)?;
        let second = B::decode_json(next_owned(tok)?, tok, depth + 1)?;
        match next_owned(tok)? {
            OwnedEvent::EndArray => Ok((first, second)),
            _ => Err(Error::ExpectedArray),
        }
    }
}

/// Generate the four reflective codec impls for a record from its declared
/// field list. Binary serialization follows declaration order; JSON keys are
/// matched by name with unknown keys rejected.
macro_rules! native_record {
    ($ty:ident { $( $field:ident => $key:literal ),+ $(,)? }) => {
        impl BinaryEncode for $ty {
            fn encode_binary(&self, writer: &mut BinWriter) {
                $( self.$field.encode_binary(writer); )+
            }
        }

        impl BinaryDecode for $ty {
            fn decode_binary(reader: &mut BinReader<'_>) -> Result<Self> {
                Ok(Self {
                    $( $field: BinaryDecode::decode_binary(reader)?, )+
                })
            }
        }

        impl JsonEncode for $ty {
            fn encode_json(&self, writer: &mut JsonWriter) {
                writer.begin_object();
                $(
                    writer.object_key($key);
                    self.$field.encode_json(writer);
                )+
                writer.end_object();
            }
        }

        impl JsonDecode for $ty {
            fn decode_json(
                event: OwnedEvent,
                tok: &mut JsonTokenizer<'_>,
                depth: usize,
            ) -> Result<Self> {
                if depth > MAX_STACK_SIZE {
                    return Err(Error::RecursionLimit);
                }
                if event != OwnedEvent::StartObject {
                    return Err(Error::ExpectedObject);
                }
                let mut value = <$ty>::default();
                loop {
                    match next_owned(tok)? {
                        OwnedEvent::EndObject => break,
                        OwnedEvent::Key(key) => {
                            let first = next_owned(tok)?;
                            match key.as_str() {
                                $( $key => {
                                    value.$field = JsonDecode::decode_json(first, tok, depth + 1)?;
                                } )+
                                _ => return Err(Error::UnknownField(key)),
                            }
                        }
                        _ => return Err(Error::ExpectedObject),
                    }
                }
                Ok(value)
            }
        }
    };
}

/// An alias entry: `new_type_name` refers to `type_name`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeDef {
    pub new_type_name: String,
    pub type_name: String,
}

native_record!(TypeDef {
    new_type_name => "new_type_name",
    type_name => "type",
});

/// One field of a struct definition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub type_name: String,
}

native_record!(FieldDef {
    name => "name",
    type_name => "type",
});

/// A struct definition, optionally inheriting the fields of `base`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub base: String,
    pub fields: Vec<FieldDef>,
}

native_record!(StructDef {
    name => "name",
    base => "base",
    fields => "fields",
});

/// An action entry mapping an action name to its argument struct type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionDef {
    pub name: Name,
    pub type_name: String,
    pub ricardian_contract: String,
}

native_record!(ActionDef {
    name => "name",
    type_name => "type",
    ricardian_contract => "ricardian_contract",
});

/// A table entry; carried through as metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableDef {
    pub name: Name,
    pub index_type: String,
    pub key_names: Vec<String>,
    pub key_types: Vec<String>,
    pub type_name: String,
}

native_record!(TableDef {
    name => "name",
    index_type => "index_type",
    key_names => "key_names",
    key_types => "key_types",
    type_name => "type",
});

/// A ricardian clause; carried through as metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClausePair {
    pub id: String,
    pub body: String,
}

native_record!(ClausePair {
    id => "id",
    body => "body",
});

/// An error message entry; carried through as metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorMessageDef {
    pub error_code: u64,
    pub error_msg: String,
}

native_record!(ErrorMessageDef {
    error_code => "error_code",
    error_msg => "error_msg",
});

/// The full ABI descriptor of a contract.
///
/// `version` conventionally starts with `eosio::abi/`; the value is carried
/// through but not enforced on ingest.
#[derive(Clone, Debug, PartialEq)]
pub struct AbiDef {
    pub version: String,
    pub types: Vec<TypeDef>,
    pub structs: Vec<StructDef>,
    pub actions: Vec<ActionDef>,
    pub tables: Vec<TableDef>,
    pub ricardian_clauses: Vec<ClausePair>,
    pub error_messages: Vec<ErrorMessageDef>,
    pub abi_extensions: Vec<(u16, Bytes)>,
}

impl Default for AbiDef {
    fn default() -> Self {
        AbiDef {
            version: "eosio::abi/1.0".to_owned(),
            types: Vec::new(),
            structs: Vec::new(),
            actions: Vec::new(),
            tables: Vec::new(),
            ricardian_clauses: Vec::new(),
            error_messages: Vec::new(),
            abi_extensions: Vec::new(),
        }
    }
}

native_record!(AbiDef {
    version => "version",
    types => "types",
    structs => "structs",
    actions => "actions",
    tables => "tables",
    ricardian_clauses => "ricardian_clauses",
    error_messages => "error_messages",
    abi_extensions => "abi_extensions",
});

impl AbiDef {
    /// Decode a descriptor from JSON text. Absent fields keep their defaults;
    /// unknown fields are rejected.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut tok = JsonTokenizer::new(text);
        let first = next_owned(&mut tok)?;
        let abi = Self::decode_json(first, &mut tok, 1)?;
        // Consuming the closing event leaves only end-of-input or trailing
        // garbage, which the tokenizer reports itself.
        tok.next_event()?;
        Ok(abi)
    }

    /// Render the descriptor as compact JSON.
    pub fn to_json(&self) -> String {
        let mut writer = JsonWriter::new();
        self.encode_json(&mut writer);
        writer.finish()
    }

    /// Decode a descriptor from its packed wire form.
    pub fn from_bin(bytes: &[u8]) -> Result<Self> {
        let mut reader = BinReader::new(bytes);
        Self::decode_binary(&mut reader)
    }

    /// Encode the descriptor into its packed wire form.
    pub fn to_bin(&self) -> Vec<u8> {
        let mut writer = BinWriter::new();
        self.encode_binary(&mut writer);
        writer.finish()
    }
}
