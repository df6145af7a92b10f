#![forbid(unsafe_code)]

//! Public/private key and signature blobs with their base58 string forms.
//!
//! The wire form of each blob is a one-byte curve discriminant followed by the
//! fixed-length payload. The string forms are base58 with a trailing 4-byte
//! RIPEMD-160 checksum: the legacy `EOS…` public key checksums the bare
//! payload, the prefixed `PUB_…`/`PVT_…`/`SIG_…` forms mix the curve suffix
//! letters into the digest.

use std::fmt;

use crate::binary::{BinReader, BinWriter};
use crate::{base58, ripemd160, Error, Result};

/// Curve discriminant carried in the first wire byte of every key blob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyType {
    #[default]
    K1 = 0,
    R1 = 1,
}

impl KeyType {
    fn from_tag(tag: u8, kind: Kind) -> Result<Self> {
        match tag {
            0 => Ok(KeyType::K1),
            1 => Ok(KeyType::R1),
            _ => Err(kind.format_error()),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            KeyType::K1 => "K1",
            KeyType::R1 => "R1",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Kind {
    Public,
    Private,
    Signature,
}

impl Kind {
    fn format_error(self) -> Error {
        match self {
            Kind::Public => Error::BadPublicKeyFormat,
            Kind::Private => Error::BadPrivateKeyFormat,
            Kind::Signature => Error::BadSignatureFormat,
        }
    }
}

/// 33-byte compressed public key plus curve discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub key_type: KeyType,
    pub data: [u8; 33],
}

/// 32-byte private key plus curve discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrivateKey {
    pub key_type: KeyType,
    pub data: [u8; 32],
}

/// 65-byte recoverable signature plus curve discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub key_type: KeyType,
    pub data: [u8; 65],
}

/// Encode payload + 4-byte checksum as base58; the suffix letters are mixed
/// into the digest but not emitted.
fn to_checksummed_base58(payload: &[u8], suffix: &str) -> String {
    let mut digest_input = payload.to_vec();
    digest_input.extend_from_slice(suffix.as_bytes());
    let digest = ripemd160::hash(&digest_input);

    let mut raw = payload.to_vec();
    raw.extend_from_slice(&digest[..4]);
    base58::encode(&raw)
}

fn from_checksummed_base58(
    text: &str,
    suffix: &str,
    payload_len: usize,
    kind: Kind,
) -> Result<Vec<u8>> {
    let raw = base58::decode(text)?;
    if raw.len() != payload_len + 4 {
        return Err(kind.format_error());
    }
    let (payload, checksum) = raw.split_at(payload_len);

    let mut digest_input = payload.to_vec();
    digest_input.extend_from_slice(suffix.as_bytes());
    let digest = ripemd160::hash(&digest_input);
    if checksum != &digest[..4] {
        return Err(Error::ChecksumMismatch);
    }
    Ok(payload.to_vec())
}

impl PublicKey {
    /// Parse the legacy `EOS…` form or the prefixed `PUB_K1_…`/`PUB_R1_…`
    /// forms.
    pub fn from_str(s: &str) -> Result<Self> {
        let (key_type, suffix, rest) = if let Some(rest) = s.strip_prefix("PUB_K1_") {
            (KeyType::K1, "K1", rest)
        } else if let Some(rest) = s.strip_prefix("PUB_R1_") {
            (KeyType::R1, "R1", rest)
        } else if let Some(rest) = s.strip_prefix("EOS") {
            (KeyType::K1, "", rest)
        } else {
            return Err(Error::BadPublicKeyFormat);
        };
        let payload = from_checksummed_base58(rest, suffix, 33, Kind::Public)?;
        let mut data = [0u8; 33];
        data.copy_from_slice(&payload);
        Ok(PublicKey { key_type, data })
    }

    pub(crate) fn to_bin(&self, writer: &mut BinWriter) {
        writer.write_u8(self.key_type as u8);
        writer.write_raw(&self.data);
    }

    pub(crate) fn from_bin(reader: &mut BinReader<'_>) -> Result<Self> {
        let key_type = KeyType::from_tag(reader.read_u8()?, Kind::Public)?;
        let mut data = [0u8; 33];
        data.copy_from_slice(reader.read_exact(33)?);
        Ok(PublicKey { key_type, data })
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key_type {
            KeyType::K1 => write!(f, "EOS{}", to_checksummed_base58(&self.data, "")),
            KeyType::R1 => write!(f, "PUB_R1_{}", to_checksummed_base58(&self.data, "R1")),
        }
    }
}

impl PrivateKey {
    /// Parse the prefixed `PVT_K1_…`/`PVT_R1_…` forms.
    pub fn from_str(s: &str) -> Result<Self> {
        let (key_type, rest) = if let Some(rest) = s.strip_prefix("PVT_K1_") {
            (KeyType::K1, rest)
        } else if let Some(rest) = s.strip_prefix("PVT_R1_") {
            (KeyType::R1, rest)
        } else {
            return Err(Error::BadPrivateKeyFormat);
        };
        let payload = from_checksummed_base58(rest, key_type.suffix(), 32, Kind::Private)?;
        let mut data = [0u8; 32];
        data.copy_from_slice(&payload);
        Ok(PrivateKey { key_type, data })
    }

    pub(crate) fn to_bin(&self, writer: &mut BinWriter) {
        writer.write_u8(self.key_type as u8);
        writer.write_raw(&self.data);
    }

    pub(crate) fn from_bin(reader: &mut BinReader<'_>) -> Result<Self> {
        let key_type = KeyType::from_tag(reader.read_u8()?, Kind::Private)?;
        let mut data = [0u8; 32];
        data.copy_from_slice(reader.read_exact(32)?);
        Ok(PrivateKey { key_type, data })
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PVT_{}_{}",
            self.key_type.suffix(),
            to_checksummed_base58(&self.data, self.key_type.suffix())
        )
    }
}

impl Signature {
    /// Parse the prefixed `SIG_K1_…`/`SIG_R1_…` forms.
    pub fn from_str(s: &str) -> Result<Self> {
        let (key_type, rest) = if let Some(rest) = s.strip_prefix("SIG_K1_") {
            (KeyType::K1, rest)
        } else if let Some(rest) = s.strip_prefix("SIG_R1_") {
            (KeyType::R1, rest)
        } else {
            return Err(Error::BadSignatureFormat);
        };
        let payload = from_checksummed_base58(rest, key_type.suffix(), 65, Kind::Signature)?;
        let mut data = [0u8; 65];
        data.copy_from_slice(&payload);
        Ok(Signature { key_type, data })
    }

    pub(crate) fn to_bin(&self, writer: &mut BinWriter) {
        writer.write_u8(self.key_type as u8);
        writer.write_raw(&self.data);
    }

    pub(crate) fn from_bin(reader: &mut BinReader<'_>) -> Result<Self> {
        let key_type = KeyType::from_tag(reader.read_u8()?, Kind::Signature)?;
        let mut data = [0u8; 65];
        data.copy_from_slice(reader.read_exact(65)?);
        Ok(Signature { key_type, data })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SIG_{}_{}",
            self.key_type.suffix(),
            to_checksummed_base58(&self.data, self.key_type.suffix())
        )
    }
}
