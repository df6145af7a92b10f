#![forbid(unsafe_code)]

//! Built-in scalar codecs.
//!
//! Each primitive translates between exactly one JSON event and its wire
//! form. Numbers arrive as strings (see [`crate::json::JsonTokenizer`]);
//! integer range is enforced by checked narrowing to the target width.

use crate::binary::{BinReader, BinWriter};
use crate::json::{JsonEvent, JsonWriter};
use crate::keys::{PrivateKey, PublicKey, Signature};
use crate::types::{
    decimal_to_i128, decimal_to_u128, Asset, BlockTimestamp, Name, Symbol, SymbolCode, TimePoint,
    TimePointSec,
};
use crate::{Error, Result};

/// One of the built-in scalar domains an ABI can reference by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Int128,
    Uint128,
    Varuint32,
    Varint32,
    Float32,
    Float64,
    Float128,
    TimePoint,
    TimePointSec,
    BlockTimestamp,
    Name,
    Bytes,
    String,
    Checksum160,
    Checksum256,
    Checksum512,
    PublicKey,
    PrivateKey,
    Signature,
    Symbol,
    SymbolCode,
    Asset,
}

impl Primitive {
    /// The built-in type names, in registration order.
    pub(crate) const ALL: [(&'static str, Primitive); 31] = [
        ("bool", Primitive::Bool),
        ("int8", Primitive::Int8),
        ("uint8", Primitive::Uint8),
        ("int16", Primitive::Int16),
        ("uint16", Primitive::Uint16),
        ("int32", Primitive::Int32),
        ("uint32", Primitive::Uint32),
        ("int64", Primitive::Int64),
        ("uint64", Primitive::Uint64),
        ("int128", Primitive::Int128),
        ("uint128", Primitive::Uint128),
        ("varuint32", Primitive::Varuint32),
        ("varint32", Primitive::Varint32),
        ("float32", Primitive::Float32),
        ("float64", Primitive::Float64),
        ("float128", Primitive::Float128),
        ("time_point", Primitive::TimePoint),
        ("time_point_sec", Primitive::TimePointSec),
        ("block_timestamp_type", Primitive::BlockTimestamp),
        ("name", Primitive::Name),
        ("bytes", Primitive::Bytes),
        ("string", Primitive::String),
        ("checksum160", Primitive::Checksum160),
        ("checksum256", Primitive::Checksum256),
        ("checksum512", Primitive::Checksum512),
        ("public_key", Primitive::PublicKey),
        ("private_key", Primitive::PrivateKey),
        ("signature", Primitive::Signature),
        ("symbol", Primitive::Symbol),
        ("symbol_code", Primitive::SymbolCode),
        ("asset", Primitive::Asset),
    ];

    /// Consume one JSON event and append the wire form.
    pub(crate) fn json_to_bin(self, writer: &mut BinWriter, event: &JsonEvent<'_>) -> Result<()> {
        match self {
            Primitive::Bool => {
                let v = parse_unsigned(event)?;
                match v {
                    0 => writer.write_u8(0),
                    1 => writer.write_u8(1),
                    _ => return Err(Error::NumberOutOfRange),
                }
            }
            Primitive::Int8 => writer.write_i8(parse_narrow_signed::<i8>(event)?),
            Primitive::Uint8 => writer.write_u8(parse_narrow_unsigned::<u8>(event)?),
            Primitive::Int16 => writer.write_i16(parse_narrow_signed::<i16>(event)?),
            Primitive::Uint16 => writer.write_u16(parse_narrow_unsigned::<u16>(event)?),
            Primitive::Int32 => writer.write_i32(parse_narrow_signed::<i32>(event)?),
            Primitive::Uint32 => writer.write_u32(parse_narrow_unsigned::<u32>(event)?),
            Primitive::Int64 => writer.write_i64(parse_signed(event)?),
            Primitive::Uint64 => writer.write_u64(parse_unsigned(event)?),
            Primitive::Int128 => {
                let s = expect_string(event, "int128")?;
                writer.write_u128(decimal_to_i128(s)?);
            }
            Primitive::Uint128 => {
                let s = expect_string(event, "uint128")?;
                writer.write_u128(decimal_to_u128(s)?);
            }
            Primitive::Varuint32 => writer.write_varuint32(parse_narrow_unsigned::<u32>(event)?),
            Primitive::Varint32 => writer.write_varint32(parse_narrow_signed::<i32>(event)?),
            Primitive::Float32 => writer.write_f32(parse_float(event)? as f32),
            Primitive::Float64 => writer.write_f64(parse_float(event)?),
            Primitive::Float128 => write_fixed_hex(writer, event, 16)?,
            Primitive::TimePoint => {
                let s = expect_string(event, "time_point")?;
                writer.write_u64(TimePoint::from_str(s)?.microseconds);
            }
            Primitive::TimePointSec => {
                let s = expect_string(event, "time_point_sec")?;
                writer.write_u32(TimePointSec::from_str(s)?.utc_seconds);
            }
            Primitive::BlockTimestamp => {
                let s = expect_string(event, "block_timestamp")?;
                writer.write_u32(BlockTimestamp::from_str(s)?.slot);
            }
            Primitive::Name => {
                let s = expect_string(event, "name")?;
                writer.write_u64(Name::from_str(s).0);
            }
            Primitive::Bytes => {
                let s = expect_string(event, "hex digits")?;
                if s.len() % 2 != 0 {
                    return Err(Error::OddHexDigits);
                }
                let raw = hex::decode(s).map_err(|_| Error::ExpectedHexString)?;
                writer.write_bytes(&raw);
            }
            Primitive::String => match event {
                JsonEvent::Str(s) => writer.write_string(s),
                _ => return Err(Error::ExpectedString),
            },
            Primitive::Checksum160 => write_fixed_hex(writer, event, 20)?,
            Primitive::Checksum256 => write_fixed_hex(writer, event, 32)?,
            Primitive::Checksum512 => write_fixed_hex(writer, event, 64)?,
            Primitive::PublicKey => {
                let s = expect_string(event, "public_key")?;
                PublicKey::from_str(s)?.to_bin(writer);
            }
            Primitive::PrivateKey => {
                let s = expect_string(event, "private_key")?;
                PrivateKey::from_str(s)?.to_bin(writer);
            }
            Primitive::Signature => {
                let s = expect_string(event, "signature")?;
                Signature::from_str(s)?.to_bin(writer);
            }
            Primitive::Symbol => {
                let s = expect_string(event, "symbol")?;
                writer.write_u64(Symbol::from_str(s).0);
            }
            Primitive::SymbolCode => {
                let s = expect_string(event, "symbol_code")?;
                writer.write_u64(SymbolCode::from_str(s).0);
            }
            Primitive::Asset => {
                let s = expect_string(event, "asset")?;
                let asset = Asset::from_str(s);
                writer.write_i64(asset.amount);
                writer.write_u64(asset.symbol.0);
            }
        }
        Ok(())
    }

    /// Consume the wire form and emit one JSON value.
    pub(crate) fn bin_to_json(
        self,
        reader: &mut BinReader<'_>,
        writer: &mut JsonWriter,
    ) -> Result<()> {
        match self {
            Primitive::Bool => writer.boolean(reader.read_u8()? != 0),
            Primitive::Int8 => writer.signed(i64::from(reader.read_i8()?)),
            Primitive::Uint8 => writer.unsigned(u64::from(reader.read_u8()?)),
            Primitive::Int16 => writer.signed(i64::from(reader.read_i16()?)),
            Primitive::Uint16 => writer.unsigned(u64::from(reader.read_u16()?)),
            Primitive::Int32 => writer.signed(i64::from(reader.read_i32()?)),
            Primitive::Uint32 => writer.unsigned(u64::from(reader.read_u32()?)),
            // 64-bit and wider integers travel as strings to survive JSON
            // consumers that coerce numbers through doubles.
            Primitive::Int64 => writer.string(&reader.read_i64()?.to_string()),
            Primitive::Uint64 => writer.string(&reader.read_u64()?.to_string()),
            Primitive::Int128 => {
                let value = reader.read_u128()? as i128;
                writer.string(&value.to_string());
            }
            Primitive::Uint128 => writer.string(&reader.read_u128()?.to_string()),
            Primitive::Varuint32 => {
                let v = reader.read_varuint32()?;
                writer.unsigned(u64::from(v));
            }
            Primitive::Varint32 => {
                let v = reader.read_varint32()?;
                writer.signed(i64::from(v));
            }
            Primitive::Float32 => emit_double(writer, f64::from(reader.read_f32()?))?,
            Primitive::Float64 => emit_double(writer, reader.read_f64()?)?,
            Primitive::Float128 => writer.string(&hex::encode(reader.read_exact(16)?)),
            Primitive::TimePoint => {
                let t = TimePoint {
                    microseconds: reader.read_u64()?,
                };
                writer.string(&t.to_string());
            }
            Primitive::TimePointSec => {
                let t = TimePointSec {
                    utc_seconds: reader.read_u32()?,
                };
                writer.string(&t.to_string());
            }
            Primitive::BlockTimestamp => {
                let b = BlockTimestamp {
                    slot: reader.read_u32()?,
                };
                writer.string(&b.to_string());
            }
            Primitive::Name => writer.string(&Name(reader.read_u64()?).to_string()),
            Primitive::Bytes => writer.string(&hex::encode(reader.read_bytes()?)),
            Primitive::String => writer.string(&reader.read_string()?),
            Primitive::Checksum160 => writer.string(&hex::encode(reader.read_exact(20)?)),
            Primitive::Checksum256 => writer.string(&hex::encode(reader.read_exact(32)?)),
            Primitive::Checksum512 => writer.string(&hex::encode(reader.read_exact(64)?)),
            Primitive::PublicKey => writer.string(&PublicKey::from_bin(reader)?.to_string()),
            Primitive::PrivateKey => writer.string(&PrivateKey::from_bin(reader)?.to_string()),
            Primitive::Signature => writer.string(&Signature::from_bin(reader)?.to_string()),
            Primitive::Symbol => writer.string(&Symbol(reader.read_u64()?).to_string()),
            Primitive::SymbolCode => writer.string(&SymbolCode(reader.read_u64()?).to_string()),
            Primitive::Asset => {
                let asset = Asset {
                    amount: reader.read_i64()?,
                    symbol: Symbol(reader.read_u64()?),
                };
                writer.string(&asset.to_string());
            }
        }
        Ok(())
    }
}

fn expect_string<'a>(event: &'a JsonEvent<'_>, what: &'static str) -> Result<&'a str> {
    match event {
        JsonEvent::Str(s) => Ok(s),
        _ => Err(Error::ExpectedValueString(what)),
    }
}

/// Full-width signed parse: a boolean counts as 0/1.
pub(crate) fn parse_signed(event: &JsonEvent<'_>) -> Result<i64> {
    match event {
        JsonEvent::Bool(b) => Ok(i64::from(*b)),
        JsonEvent::Str(s) => s.parse().map_err(|_| Error::BadNumberFormat),
        _ => Err(Error::ExpectedNumberOrBool),
    }
}

/// Full-width unsigned parse: rejects any input containing `-`.
pub(crate) fn parse_unsigned(event: &JsonEvent<'_>) -> Result<u64> {
    match event {
        JsonEvent::Bool(b) => Ok(u64::from(*b)),
        JsonEvent::Str(s) => {
            if s.contains('-') {
                return Err(Error::ExpectedNonNegative);
            }
            s.parse().map_err(|_| Error::BadNumberFormat)
        }
        _ => Err(Error::ExpectedNumberOrBool),
    }
}

fn parse_narrow_signed<T: TryFrom<i64>>(event: &JsonEvent<'_>) -> Result<T> {
    T::try_from(parse_signed(event)?).map_err(|_| Error::NumberOutOfRange)
}

fn parse_narrow_unsigned<T: TryFrom<u64>>(event: &JsonEvent<'_>) -> Result<T> {
    T::try_from(parse_unsigned(event)?).map_err(|_| Error::NumberOutOfRange)
}

fn parse_float(event: &JsonEvent<'_>) -> Result<f64> {
    match event {
        JsonEvent::Bool(b) => Ok(f64::from(u8::from(*b))),
        JsonEvent::Str(s) => s.parse().map_err(|_| Error::BadNumberFormat),
        _ => Err(Error::ExpectedNumberOrBool),
    }
}

fn write_fixed_hex(writer: &mut BinWriter, event: &JsonEvent<'_>, len: usize) -> Result<()> {
    let s = expect_string(event, "hex")?;
    let raw = hex::decode(s).map_err(|_| Error::ExpectedHexString)?;
    if raw.len() != len {
        return Err(Error::HexLengthMismatch);
    }
    writer.write_raw(&raw);
    Ok(())
}

fn emit_double(writer: &mut JsonWriter, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::NonFiniteFloat);
    }
    writer.double(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(p: Primitive, event: &JsonEvent<'_>) -> Result<Vec<u8>> {
        let mut writer = BinWriter::new();
        p.json_to_bin(&mut writer, event)?;
        Ok(writer.finish())
    }

    fn decode(p: Primitive, bytes: &[u8]) -> Result<String> {
        let mut reader = BinReader::new(bytes);
        let mut writer = JsonWriter::new();
        p.bin_to_json(&mut reader, &mut writer)?;
        Ok(writer.finish())
    }

    #[test]
    fn uint32_encodes_little_endian() {
        let bytes = encode(Primitive::Uint32, &JsonEvent::Str("10")).expect("encode");
        assert_eq!(bytes, [0x0a, 0x00, 0x00, 0x00]);
        assert_eq!(decode(Primitive::Uint32, &bytes).expect("decode"), "10");
    }

    #[test]
    fn integers_accept_booleans() {
        assert_eq!(
            encode(Primitive::Uint8, &JsonEvent::Bool(true)).expect("encode"),
            [0x01]
        );
        assert_eq!(
            encode(Primitive::Int64, &JsonEvent::Bool(false)).expect("encode"),
            0i64.to_le_bytes()
        );
    }

    #[test]
    fn narrowing_is_range_checked() {
        assert!(matches!(
            encode(Primitive::Uint8, &JsonEvent::Str("256")),
            Err(Error::NumberOutOfRange)
        ));
        assert!(matches!(
            encode(Primitive::Int8, &JsonEvent::Str("-129")),
            Err(Error::NumberOutOfRange)
        ));
        assert!(matches!(
            encode(Primitive::Uint32, &JsonEvent::Str("-1")),
            Err(Error::ExpectedNonNegative)
        ));
        assert!(matches!(
            encode(Primitive::Uint32, &JsonEvent::Str("12x")),
            Err(Error::BadNumberFormat)
        ));
        assert!(matches!(
            encode(Primitive::Uint32, &JsonEvent::Null),
            Err(Error::ExpectedNumberOrBool)
        ));
    }

    #[test]
    fn sixty_four_bit_integers_decode_as_strings() {
        let bytes = encode(Primitive::Uint64, &JsonEvent::Str("18446744073709551615"))
            .expect("encode");
        assert_eq!(
            decode(Primitive::Uint64, &bytes).expect("decode"),
            "\"18446744073709551615\""
        );

        let bytes = encode(Primitive::Int64, &JsonEvent::Str("-9223372036854775808"))
            .expect("encode");
        assert_eq!(
            decode(Primitive::Int64, &bytes).expect("decode"),
            "\"-9223372036854775808\""
        );
    }

    #[test]
    fn int128_decimal_strings_round_trip() {
        let bytes = encode(
            Primitive::Int128,
            &JsonEvent::Str("-170141183460469231731687303715884105728"),
        )
        .expect("encode");
        assert_eq!(bytes.len(), 16);
        assert_eq!(
            decode(Primitive::Int128, &bytes).expect("decode"),
            "\"-170141183460469231731687303715884105728\""
        );

        assert!(matches!(
            encode(Primitive::Uint128, &JsonEvent::Str("-1")),
            Err(Error::InvalidNumber)
        ));
    }

    #[test]
    fn varuint32_wire_form() {
        let bytes = encode(Primitive::Varuint32, &JsonEvent::Str("300")).expect("encode");
        assert_eq!(bytes, [0xac, 0x02]);
        assert_eq!(decode(Primitive::Varuint32, &bytes).expect("decode"), "300");
    }

    #[test]
    fn bytes_hex_rules() {
        let bytes = encode(Primitive::Bytes, &JsonEvent::Str("00ff")).expect("encode");
        assert_eq!(bytes, [0x02, 0x00, 0xff]);
        assert_eq!(decode(Primitive::Bytes, &bytes).expect("decode"), "\"00ff\"");

        assert!(matches!(
            encode(Primitive::Bytes, &JsonEvent::Str("abc")),
            Err(Error::OddHexDigits)
        ));
        assert!(matches!(
            encode(Primitive::Bytes, &JsonEvent::Str("zz")),
            Err(Error::ExpectedHexString)
        ));
    }

    #[test]
    fn checksum_length_is_fixed() {
        let hex64 = "aa".repeat(32);
        let bytes = encode(Primitive::Checksum256, &JsonEvent::Str(&hex64)).expect("encode");
        assert_eq!(bytes.len(), 32);
        assert_eq!(
            decode(Primitive::Checksum256, &bytes).expect("decode"),
            format!("\"{hex64}\"")
        );

        assert!(matches!(
            encode(Primitive::Checksum256, &JsonEvent::Str("aabb")),
            Err(Error::HexLengthMismatch)
        ));
    }

    #[test]
    fn name_wire_form() {
        let bytes = encode(Primitive::Name, &JsonEvent::Str("eosio.token")).expect("encode");
        assert_eq!(bytes, [0x00, 0xa6, 0x82, 0x34, 0x03, 0xea, 0x30, 0x55]);
        assert_eq!(
            decode(Primitive::Name, &bytes).expect("decode"),
            "\"eosio.token\""
        );
    }

    #[test]
    fn asset_wire_form() {
        let bytes = encode(Primitive::Asset, &JsonEvent::Str("1.0000 EOS")).expect("encode");
        assert_eq!(
            bytes,
            [
                0x10, 0x27, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // amount 10000
                0x04, 0x45, 0x4f, 0x53, 0x00, 0x00, 0x00, 0x00, // 4,EOS
            ]
        );
        assert_eq!(
            decode(Primitive::Asset, &bytes).expect("decode"),
            "\"1.0000 EOS\""
        );
    }

    #[test]
    fn timestamps_round_trip_through_strings() {
        let bytes = encode(
            Primitive::TimePointSec,
            &JsonEvent::Str("2018-06-01T00:00:00"),
        )
        .expect("encode");
        assert_eq!(bytes, 1_527_811_200u32.to_le_bytes());
        assert_eq!(
            decode(Primitive::TimePointSec, &bytes).expect("decode"),
            "\"2018-06-01T00:00:00.000\""
        );

        let bytes = encode(
            Primitive::BlockTimestamp,
            &JsonEvent::Str("2018-06-01T00:00:00.500"),
        )
        .expect("encode");
        assert_eq!(bytes, 1_162_252_801u32.to_le_bytes());
    }

    #[test]
    fn wrong_event_kind_names_the_type() {
        let err = encode(Primitive::Name, &JsonEvent::StartObject).unwrap_err();
        assert_eq!(err.to_string(), "expected string containing name");
        let err = encode(Primitive::Asset, &JsonEvent::Bool(true)).unwrap_err();
        assert_eq!(err.to_string(), "expected string containing asset");
    }

    #[test]
    fn floats_render_like_doubles() {
        let bytes = encode(Primitive::Float64, &JsonEvent::Str("1")).expect("encode");
        assert_eq!(decode(Primitive::Float64, &bytes).expect("decode"), "1.0");
        let bytes = encode(Primitive::Float32, &JsonEvent::Str("0.5")).expect("encode");
        assert_eq!(decode(Primitive::Float32, &bytes).expect("decode"), "0.5");
    }
}
