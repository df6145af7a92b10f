#![forbid(unsafe_code)]

//! Schema-driven codec between contract binary payloads and JSON.
//!
//! An ABI descriptor ([`AbiDef`]) names the types a contract understands.
//! Resolving one produces an immutable [`Contract`], which can translate any
//! JSON document conforming to one of its types into the canonical binary
//! form and back:
//!
//! ```
//! use abi_codec::{AbiDef, Contract};
//!
//! let abi = AbiDef::from_json(r#"{
//!     "version": "eosio::abi/1.0",
//!     "structs": [{
//!         "name": "transfer",
//!         "base": "",
//!         "fields": [
//!             {"name": "from", "type": "name"},
//!             {"name": "to", "type": "name"},
//!             {"name": "quantity", "type": "asset"},
//!             {"name": "memo", "type": "string"}
//!         ]
//!     }],
//!     "actions": [{"name": "transfer", "type": "transfer", "ricardian_contract": ""}]
//! }"#).unwrap();
//! let contract = Contract::new(&abi).unwrap();
//!
//! let bin = contract
//!     .json_to_bin(
//!         "transfer",
//!         r#"{"from":"alice","to":"bob","quantity":"1.0000 EOS","memo":""}"#,
//!     )
//!     .unwrap();
//! let json = contract.bin_to_json("transfer", &bin).unwrap();
//! assert!(json.contains("\"quantity\":\"1.0000 EOS\""));
//! ```
//!
//! The engines are iterative: both directions walk an explicit stack capped at
//! 128 frames, so adversarial inputs cannot exhaust the call stack. A resolved
//! [`Contract`] is immutable and may be shared freely across threads.

mod decode;
mod encode;
mod ripemd160;

pub mod abi;
pub mod base58;
pub mod binary;
pub mod contract;
pub mod json;
pub mod keys;
pub mod primitive;
pub mod types;

pub use abi::{
    AbiDef, ActionDef, ClausePair, ErrorMessageDef, FieldDef, StructDef, TableDef, TypeDef,
};
pub use contract::Contract;
pub use keys::{KeyType, PrivateKey, PublicKey, Signature};
pub use types::{
    Asset, BlockTimestamp, Bytes, Name, Symbol, SymbolCode, TimePoint, TimePointSec,
};

/// Result alias shared by every codec operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum walker stack depth for the streaming engines and the native
/// descriptor mirror.
pub(crate) const MAX_STACK_SIZE: usize = 128;

/// Maximum alias-chain / inheritance depth during schema resolution.
pub(crate) const MAX_ABI_DEPTH: usize = 32;

/// Unified error returned by every operation in this crate.
///
/// Each variant renders a stable, user-facing message; [`Error::Path`] wraps a
/// failure from the JSON-to-binary engine with a breadcrumb assembled from the
/// walker stack (`type.field[index]`).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Binary cursor.
    #[error("read past end")]
    ReadPastEnd,
    #[error("invalid string size")]
    InvalidStringSize,
    #[error("invalid bytes size")]
    InvalidBytesSize,
    #[error("invalid optional discriminant: {0}")]
    InvalidOptionalTag(u8),

    // Numeric parsing.
    #[error("number is out of range")]
    NumberOutOfRange,
    #[error("number is out of range or has bad format")]
    BadNumberFormat,
    #[error("expected non-negative number")]
    ExpectedNonNegative,
    #[error("expected number or boolean")]
    ExpectedNumberOrBool,
    #[error("invalid number")]
    InvalidNumber,
    #[error("non-finite floating point numbers are unsupported")]
    NonFiniteFloat,

    // Hex fields.
    #[error("odd number of hex digits")]
    OddHexDigits,
    #[error("expected hex string")]
    ExpectedHexString,
    #[error("hex string has incorrect length")]
    HexLengthMismatch,

    // Event shape.
    #[error("expected string containing {0}")]
    ExpectedValueString(&'static str),
    #[error("expected string")]
    ExpectedString,
    #[error("expected object")]
    ExpectedObject,
    #[error("expected array")]
    ExpectedArray,
    #[error("expected field \"{0}\"")]
    ExpectedField(String),
    #[error("unexpected field \"{0}\"")]
    UnexpectedField(String),
    #[error("unknown field {0}")]
    UnknownField(String),
    #[error("extra data")]
    ExtraData,
    #[error("recursion limit reached")]
    RecursionLimit,

    // Schema resolution.
    #[error("unknown type \"{0}\"")]
    UnknownType(String),
    #[error("abi recursion limit reached")]
    AbiRecursionLimit,
    #[error("abi has a struct with a missing name")]
    MissingStructName,
    #[error("abi has a type with a missing name")]
    MissingTypeName,
    #[error("abi redefines type \"{0}\"")]
    TypeRedefinition(String),
    #[error("optional and array don't support nesting")]
    NestedOptionalOrArray,
    #[error("abi type \"{0}\" is not a struct")]
    NotAStruct(String),

    // Domain scalars.
    #[error("invalid time format")]
    InvalidTimeFormat,
    #[error("unrecognized public key format")]
    BadPublicKeyFormat,
    #[error("unrecognized private key format")]
    BadPrivateKeyFormat,
    #[error("unrecognized signature format")]
    BadSignatureFormat,
    #[error("checksum doesn't match")]
    ChecksumMismatch,
    #[error(transparent)]
    Base58(#[from] base58::Base58Error),

    // JSON tokenizer.
    #[error("expected {expected}, found '{found}'")]
    UnexpectedToken { expected: &'static str, found: char },
    #[error("expected {0}, found end of input")]
    UnexpectedEnd(&'static str),
    #[error("trailing characters after JSON value")]
    TrailingCharacters,
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,

    /// A failure from the JSON-to-binary engine, prefixed with the navigation
    /// path at which it occurred.
    #[error("{path}: {source}")]
    Path {
        path: String,
        #[source]
        source: Box<Error>,
    },
}

#[cfg(feature = "telemetry")]
pub(crate) mod telemetry {
    //! Operation counters mirroring the codec profile telemetry used across
    //! the workspace this crate grew out of.

    pub(crate) fn record(direction: &'static str, ok: bool, bytes: usize) {
        metrics::counter!(
            "abi_codec_operations_total",
            "direction" => direction,
            "outcome" => if ok { "ok" } else { "error" },
        )
        .increment(1);
        if ok {
            metrics::histogram!("abi_codec_payload_bytes", "direction" => direction)
                .record(bytes as f64);
        }
    }
}

#[cfg(not(feature = "telemetry"))]
pub(crate) mod telemetry {
    pub(crate) fn record(_direction: &'static str, _ok: bool, _bytes: usize) {}
}
