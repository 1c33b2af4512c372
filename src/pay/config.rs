use std::path::PathBuf;

use bon::Builder;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Deserializer};

use crate::Result;
use crate::error::Error;
use crate::pay::policy::NoncePolicy;

/// Merchant account identity plus the signing secret.
///
/// `merchant_key` signs every message but is never transmitted or logged.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub app_id: String,
    #[serde(alias = "mch_id")]
    pub merchant_id: String,
    #[serde(alias = "mch_key")]
    pub merchant_key: SecretString,
}

impl Credentials {
    pub fn new<A: Into<String>, M: Into<String>, K: Into<SecretString>>(
        app_id: A,
        merchant_id: M,
        merchant_key: K,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            merchant_id: merchant_id.into(),
            merchant_key: merchant_key.into(),
        }
    }
}

/// Account configuration shared by every operation.
///
/// Certificate paths and `debug_cache` are carried for transports and callers
/// that need them; the signing pipeline itself never reads them.
#[non_exhaustive]
#[derive(Clone, Debug, Builder, Deserialize)]
#[builder(on(String, into))]
pub struct Config {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub notify_url: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[builder(into)]
    pub cert_pem: Option<PathBuf>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[builder(into)]
    pub cert_key: Option<PathBuf>,
    /// Route requests to the provider's sandbox under `sandboxnew/`.
    ///
    /// Requests are still signed with `merchant_key`. The sandbox expects its
    /// own signing key, so fetching that key (and caching it at `debug_cache`)
    /// and passing it in as `merchant_key` is up to the caller.
    #[serde(default)]
    #[builder(default)]
    pub debug: bool,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[builder(into)]
    pub debug_cache: Option<PathBuf>,
    #[serde(default)]
    #[builder(default)]
    pub nonce: NoncePolicy,
}

impl Config {
    pub(crate) fn validate(&self) -> Result<()> {
        let credentials = &self.credentials;
        if credentials.app_id.is_empty() {
            return Err(Error::validation("app_id must not be empty"));
        }
        if credentials.merchant_id.is_empty() {
            return Err(Error::validation("merchant_id must not be empty"));
        }
        if credentials.merchant_key.expose_secret().is_empty() {
            return Err(Error::validation("merchant_key must not be empty"));
        }
        if self.notify_url.is_empty() {
            return Err(Error::validation("notify_url must not be empty"));
        }
        self.nonce.validate()
    }

    #[must_use]
    pub(crate) fn merchant_key(&self) -> &SecretString {
        &self.credentials.merchant_key
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<PathBuf>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()).map(PathBuf::from))
}
