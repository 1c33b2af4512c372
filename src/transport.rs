//! Outbound HTTP and the audit log collaborator.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use url::Url;

use crate::Result;
use crate::error::Error;

/// Posts an encoded request body and returns the raw response body.
///
/// Any `Err` short-circuits the calling operation before decode and verify.
/// Timeouts, pooling and client certificates are the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &Url, body: String) -> Result<String>;
}

/// Default [`Transport`] backed by [`reqwest`].
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, url: &Url, body: String) -> Result<String> {
        let response = self
            .client
            .request(Method::POST, url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("text/xml; charset=utf-8"))
            .body(body)
            .send()
            .await?;

        let status_code = response.status();
        if !status_code.is_success() {
            let message = response.text().await.unwrap_or_default();

            #[cfg(feature = "tracing")]
            tracing::error!(
                status = %status_code,
                path = %url.path(),
                message = %message,
                "provider request failed"
            );

            return Err(Error::status(
                status_code,
                Method::POST,
                url.path().to_owned(),
                message,
            ));
        }

        Ok(response.text().await?)
    }
}

/// Fire-and-forget audit trail of outbound requests and raw responses.
pub trait AuditLog: Send + Sync + fmt::Debug {
    fn write(&self, message: &str);
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditLog;

impl AuditLog for NoopAuditLog {
    fn write(&self, _message: &str) {}
}

/// Forwards audit lines to `tracing` at `INFO` under the `wxpay_client::audit` target.
#[cfg(feature = "tracing")]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditLog;

#[cfg(feature = "tracing")]
impl AuditLog for TracingAuditLog {
    fn write(&self, message: &str) {
        tracing::info!(target: "wxpay_client::audit", "{message}");
    }
}
