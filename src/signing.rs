//! Canonical request signing.
//!
//! The provider's MD5 scheme: drop `sign` and empty values, sort the rest by key
//! (byte order), join as `k=v` pairs with `&`, append `key=<merchant key>` last,
//! then take the uppercase hex MD5 of the UTF-8 bytes. Values are joined raw,
//! never percent-encoded, on both the outbound and the inbound path.

use md5::{Digest as _, Md5};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};

use crate::types::FieldMap;

pub const SIGN_FIELD: &str = "sign";
pub const SIGN_TYPE_FIELD: &str = "sign_type";

/// Signature scheme announced in the `sign_type` field.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, strum_macros::Display)]
pub enum SignType {
    #[default]
    #[serde(rename = "MD5")]
    #[strum(serialize = "MD5")]
    Md5,
}

/// Builds the exact string that gets hashed.
fn signing_string(fields: &FieldMap, secret: &str) -> String {
    // FieldMap iterates in byte order of its keys
    let mut raw = fields
        .iter()
        .filter(|(k, v)| k.as_str() != SIGN_FIELD && !v.is_empty())
        .fold(String::new(), |mut acc, (k, v)| {
            acc.push_str(k);
            acc.push('=');
            acc.push_str(v);
            acc.push('&');
            acc
        });
    raw.push_str("key=");
    raw.push_str(secret);
    raw
}

/// Computes the 32-character uppercase hex signature of `fields`.
///
/// Any `sign` entry already present is ignored.
#[must_use]
pub fn sign(fields: &FieldMap, secret: &SecretString) -> String {
    let raw = signing_string(fields, secret.expose_secret());
    hex::encode_upper(Md5::digest(raw.as_bytes()))
}

/// Returns a copy of `fields` carrying `sign_type` and a fresh `sign`.
#[must_use]
pub fn signed(fields: &FieldMap, secret: &SecretString, sign_type: SignType) -> FieldMap {
    let mut out = fields.clone();
    out.insert(SIGN_TYPE_FIELD, sign_type.to_string());
    let signature = sign(&out, secret);
    out.insert(SIGN_FIELD, signature);
    out
}

/// `true` only when `message` carries a `sign` that matches the recomputed signature.
#[must_use]
pub fn verify(message: &FieldMap, secret: &SecretString) -> bool {
    match message.get(SIGN_FIELD) {
        Some(provided) => sign(message, secret) == provided,
        None => false,
    }
}
