//! Message signing.
//!
//! The gateway signs with SHA-512 over the form encoding of the key-sorted
//! fields followed by the merchant secret. Line endings inside the encoded
//! string are normalised to `%0A` first, so a value signed with CRLF and
//! received with LF still verifies.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::{
    errors::{Error, Result},
    fields::Fields,
};

/// Name of the field carrying the signature.
pub const SIGNATURE_FIELD: &str = "signature";

static LINE_ENDINGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)%0D%0A|%0A%0D|%0A|%0D").expect("line ending pattern is valid"));

/// The pre-shared merchant signing key. Never empty.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct MerchantSecret(String);

impl MerchantSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(Error::EmptySecret);
        }
        Ok(MerchantSecret(secret))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MerchantSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MerchantSecret(***)")
    }
}

impl TryFrom<String> for MerchantSecret {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        MerchantSecret::new(value)
    }
}

impl FromStr for MerchantSecret {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MerchantSecret::new(s)
    }
}

/// A lower-case hex SHA-512 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The string that is hashed, without the secret.
pub fn canonical_string(fields: &Fields) -> String {
    let mut sorted = fields.clone();
    sorted.remove(SIGNATURE_FIELD);
    sorted.sort_keys();
    LINE_ENDINGS.replace_all(&sorted.to_query(), "%0A").into_owned()
}

/// Computes the signature of `fields`, ignoring any existing `signature`.
pub fn sign(fields: &Fields, secret: &MerchantSecret) -> Signature {
    let mut hasher = Sha512::new();
    hasher.update(canonical_string(fields).as_bytes());
    hasher.update(secret.expose().as_bytes());
    Signature(hex::encode(hasher.finalize()))
}

/// Returns `fields` with its signature appended.
pub fn sign_fields(mut fields: Fields, secret: &MerchantSecret) -> Fields {
    let signature = sign(&fields, secret);
    fields.insert(SIGNATURE_FIELD, signature.0);
    fields
}

/// Checks the `signature` field of a received message.
pub fn verify(fields: &Fields, secret: &MerchantSecret) -> Result<()> {
    let received = fields.get_str(SIGNATURE_FIELD).ok_or(Error::MissingSignature)?;
    let expected = sign(fields, secret);

    if bool::from(expected.as_str().as_bytes().ct_eq(received.as_bytes())) {
        Ok(())
    } else {
        Err(Error::SignatureMismatch)
    }
}
