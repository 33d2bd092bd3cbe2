//! # Principal Derivation
//!
//! A principal is a self-authenticating identifier computed from a public key:
//!
//! ```text
//! der  = SubjectPublicKeyInfo(public_key)
//! id   = SHA-224(der) || 0x02
//! text = group5(base32_lower_nopad(crc32_be(id) || id))
//! ```
//!
//! The result is a 63-character string such as
//! `abcde-fghij-...-xyz`. Derivation is a pure function of
//! `(algorithm, public_key)`; nothing is cached between requests.

use super::entities::Algorithm;
use super::errors::PrincipalError;
use serde::{Deserialize, Serialize};
use shared_crypto::{sha224, Ed25519PublicKey, Secp256k1PublicKey};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// DER prefix of an Ed25519 SubjectPublicKeyInfo (OID 1.3.101.112).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// DER prefix of a secp256k1 SubjectPublicKeyInfo (id-ecPublicKey, secp256k1).
const SECP256K1_SPKI_PREFIX: [u8; 23] = [
    0x30, 0x56, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05,
    0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x42, 0x00,
];

/// Tag byte marking a self-authenticating id.
pub const SELF_AUTHENTICATING_TAG: u8 = 0x02;

/// Byte length of a principal id (SHA-224 digest plus tag).
pub const PRINCIPAL_ID_LEN: usize = 29;

/// Character length of the textual form.
pub const PRINCIPAL_TEXT_LEN: usize = 63;

const GROUP_LEN: usize = 5;
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Canonical textual principal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Encode a 29-byte id as a principal.
    pub fn from_id(id: &[u8; PRINCIPAL_ID_LEN]) -> Self {
        let mut raw = Vec::with_capacity(4 + PRINCIPAL_ID_LEN);
        raw.extend_from_slice(&crc32fast::hash(id).to_be_bytes());
        raw.extend_from_slice(id);

        let encoded = base32_encode(&raw);
        let grouped = encoded
            .as_bytes()
            .chunks(GROUP_LEN)
            .map(|chunk| String::from_utf8_lossy(chunk))
            .collect::<Vec<_>>()
            .join("-");
        Self(grouped)
    }

    /// Parse the canonical textual form.
    ///
    /// Only lowercase, correctly grouped text with a valid checksum and the
    /// self-authenticating tag is accepted.
    pub fn parse(text: &str) -> Result<Self, PrincipalError> {
        if text.len() != PRINCIPAL_TEXT_LEN {
            return Err(PrincipalError::InvalidEncoding);
        }

        let groups: Vec<&str> = text.split('-').collect();
        let (last, full) = groups
            .split_last()
            .ok_or(PrincipalError::InvalidEncoding)?;
        if full.iter().any(|g| g.len() != GROUP_LEN) || last.is_empty() || last.len() > GROUP_LEN
        {
            return Err(PrincipalError::InvalidEncoding);
        }

        let compact: String = groups.concat();
        let raw = base32_decode(&compact).ok_or(PrincipalError::InvalidEncoding)?;
        if raw.len() != 4 + PRINCIPAL_ID_LEN {
            return Err(PrincipalError::InvalidLength(raw.len().saturating_sub(4)));
        }

        let (checksum, id) = raw.split_at(4);
        let expected = crc32fast::hash(id).to_be_bytes();
        if checksum != expected {
            return Err(PrincipalError::ChecksumMismatch);
        }
        if id.last() != Some(&SELF_AUTHENTICATING_TAG) {
            return Err(PrincipalError::InvalidEncoding);
        }

        let id: [u8; PRINCIPAL_ID_LEN] = id
            .try_into()
            .map_err(|_| PrincipalError::InvalidLength(id.len()))?;
        let principal = Self::from_id(&id);
        if principal.0 != text {
            return Err(PrincipalError::InvalidEncoding);
        }
        Ok(principal)
    }

    /// Textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.0)
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = PrincipalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

/// Maps `(algorithm, public_key)` to a principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrincipalDeriver;

impl PrincipalDeriver {
    /// Derive the principal owned by `public_key` under `algorithm`.
    ///
    /// # Errors
    ///
    /// [`PrincipalError::InvalidPublicKey`] if the key has the wrong length
    /// or is not a point on the curve.
    pub fn derive(algorithm: Algorithm, public_key: &[u8]) -> Result<Principal, PrincipalError> {
        let invalid = PrincipalError::InvalidPublicKey {
            algorithm: algorithm.as_str(),
        };

        match algorithm {
            Algorithm::Ed25519 => Ed25519PublicKey::from_slice(public_key)
                .map(|key| Self::ed25519(&key))
                .map_err(|_| invalid),
            Algorithm::Secp256k1 => Secp256k1PublicKey::from_sec1_bytes(public_key)
                .map(|key| Self::secp256k1(&key))
                .map_err(|_| invalid),
        }
    }

    /// Principal of an already-parsed Ed25519 key.
    pub fn ed25519(key: &Ed25519PublicKey) -> Principal {
        Self::from_spki_der(&[ED25519_SPKI_PREFIX.as_slice(), key.as_bytes().as_slice()].concat())
    }

    /// Principal of an already-parsed secp256k1 key (either SEC1 form).
    pub fn secp256k1(key: &Secp256k1PublicKey) -> Principal {
        Self::from_spki_der(
            &[SECP256K1_SPKI_PREFIX.as_slice(), key.to_uncompressed().as_slice()].concat(),
        )
    }

    fn from_spki_der(der: &[u8]) -> Principal {
        let digest = sha224(der);

        let mut id = [0u8; PRINCIPAL_ID_LEN];
        id[..digest.len()].copy_from_slice(&digest);
        id[PRINCIPAL_ID_LEN - 1] = SELF_AUTHENTICATING_TAG;
        Principal::from_id(&id)
    }

    /// Constant-time check that `public_key` derives `claimed`.
    pub fn matches(
        claimed: &Principal,
        algorithm: Algorithm,
        public_key: &[u8],
    ) -> Result<bool, PrincipalError> {
        let derived = Self::derive(algorithm, public_key)?;
        Ok(derived.as_str().as_bytes().ct_eq(claimed.as_str().as_bytes()).into())
    }
}

fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize]));
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(char::from(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize]));
    }
    out
}

fn base32_decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for c in text.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&a| a == c)? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
        buffer &= (1 << bits) - 1;
    }

    // Leftover bits must be zero padding.
    if bits >= 5 || buffer != 0 {
        return None;
    }
    Some(out)
}
