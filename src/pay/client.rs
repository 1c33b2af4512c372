use std::sync::Arc;

use chrono::Utc;
use url::Url;

use crate::Result;
use crate::error::Error;
use crate::origin::RequestOrigin;
use crate::pay::config::Config;
use crate::pay::types::{InvokeParams, OrderRef, OrderRequest, Prepay, TradeType};
use crate::schema::{self, FieldSchema, ORDER_QUERY, UNIFIED_ORDER};
use crate::signing::{self, SignType};
use crate::transport::{AuditLog, NoopAuditLog, ReqwestTransport, Transport};
use crate::types::FieldMap;
use crate::xml;

const SANDBOX_PREFIX: &str = "sandboxnew/";
const SUCCESS: &str = "SUCCESS";
const FAIL: &str = "FAIL";
/// Provider error code reported when a successful prepay reply lacks `prepay_id`.
pub const MISSING_PREPAY_ID: &str = "MISSING_PREPAY_ID";

/// Merchant API client.
///
/// Every operation runs the same pipeline: assemble, auto-fill, validate,
/// sign, encode, post, decode, verify, then inspect the business result.
/// The client holds only immutable configuration and can be shared freely.
#[derive(Clone, Debug)]
pub struct Client<T = ReqwestTransport> {
    host: Url,
    config: Config,
    transport: T,
    audit: Arc<dyn AuditLog>,
}

impl Client<ReqwestTransport> {
    /// Creates a client that talks to `host` (usually [`crate::DEFAULT_HOST`]) over `reqwest`.
    pub fn new(host: &str, config: Config) -> Result<Self> {
        Self::with_transport(host, config, ReqwestTransport::default())
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(host: &str, config: Config, transport: T) -> Result<Self> {
        config.validate()?;

        let mut host = Url::parse(host)?;
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }

        Ok(Self {
            host,
            config,
            transport,
            audit: Arc::new(NoopAuditLog),
        })
    }

    #[must_use]
    pub fn with_audit_log<L: AuditLog + 'static>(mut self, audit: L) -> Self {
        self.audit = Arc::new(audit);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Creates a prepay order from typed business fields.
    pub async fn create_order(
        &self,
        trade_type: TradeType,
        order: &OrderRequest,
        origin: Option<&RequestOrigin>,
    ) -> Result<Prepay> {
        self.create_order_fields(trade_type, &FieldMap::from(order), origin)
            .await
    }

    /// Creates a prepay order from raw business fields.
    ///
    /// Fields outside the unified order schema are dropped. `trade_type`,
    /// `appid`, `mch_id` and `notify_url` always come from the client.
    /// `spbill_create_ip` is resolved from `origin` when the caller did not set it.
    pub async fn create_order_fields(
        &self,
        trade_type: TradeType,
        fields: &FieldMap,
        origin: Option<&RequestOrigin>,
    ) -> Result<Prepay> {
        let preset = self.preset(Some(trade_type));
        let mut request = assemble(&UNIFIED_ORDER, fields, &preset);

        let ip_missing = !request.is_present("spbill_create_ip");
        if let Some(ip) = origin
            .filter(|_| ip_missing)
            .and_then(RequestOrigin::client_ip)
        {
            request.insert("spbill_create_ip", ip);
        }

        let response = self.execute(&UNIFIED_ORDER, request).await?;

        let prepay_id = response
            .get("prepay_id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::provider(
                    MISSING_PREPAY_ID,
                    "successful prepay response carries no prepay_id",
                )
            })?
            .to_owned();
        let code_url = response.get("code_url").map(str::to_owned);
        let invoke = self.invoke_params(&prepay_id)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(%trade_type, prepay_id = %prepay_id, "prepay order created");

        Ok(Prepay {
            prepay_id,
            code_url,
            response,
            invoke,
        })
    }

    /// Queries an order's payment state.
    pub async fn query_order(&self, order: &OrderRef) -> Result<FieldMap> {
        self.query_order_fields(&FieldMap::from(order)).await
    }

    /// Queries an order's payment state from raw fields (`transaction_id` and/or `out_trade_no`).
    pub async fn query_order_fields(&self, fields: &FieldMap) -> Result<FieldMap> {
        let preset = self.preset(None);
        let request = assemble(&ORDER_QUERY, fields, &preset);

        self.execute(&ORDER_QUERY, request).await
    }

    /// Decodes and verifies an asynchronous payment notification.
    ///
    /// Only an `Ok` value may be acted upon. A [`crate::error::Kind::Verification`]
    /// error still carries the received fields for logging.
    pub fn parse_notification(&self, body: &str) -> Result<FieldMap> {
        self.audit.write(&format!("notification={body}"));
        self.trusted(body)
    }

    /// Signs the client-side invocation payload for `prepay_id` with a fresh nonce and timestamp.
    pub fn invoke_params(&self, prepay_id: &str) -> Result<InvokeParams> {
        let mut params = InvokeParams {
            app_id: self.config.credentials.app_id.clone(),
            time_stamp: Utc::now().timestamp().to_string(),
            nonce_str: self.config.nonce.generate()?,
            package: format!("prepay_id={prepay_id}"),
            sign_type: SignType::Md5.to_string(),
            pay_sign: String::new(),
        };
        params.pay_sign = signing::sign(&params.unsigned_fields(), self.config.merchant_key());

        Ok(params)
    }

    fn preset(&self, trade_type: Option<TradeType>) -> FieldMap {
        let credentials = &self.config.credentials;
        let mut preset = FieldMap::from([
            ("appid", credentials.app_id.as_str()),
            ("mch_id", credentials.merchant_id.as_str()),
        ]);
        if let Some(trade_type) = trade_type {
            preset.insert("trade_type", trade_type.to_string());
            preset.insert("notify_url", self.config.notify_url.as_str());
        }
        preset
    }

    async fn execute(&self, schema: &FieldSchema, mut request: FieldMap) -> Result<FieldMap> {
        if !request.is_present("nonce_str") {
            request.insert("nonce_str", self.config.nonce.generate()?);
        }

        if let Err(violation) = schema::validate(schema, &request) {
            #[cfg(feature = "tracing")]
            tracing::warn!(operation = schema.operation, %violation, "request rejected before submission");

            return Err(violation.into());
        }

        let message = signing::signed(&request, self.config.merchant_key(), SignType::Md5);
        let body = xml::encode(&message);
        let url = self.endpoint(schema)?;

        self.audit.write(&format!("request={body}"));
        let raw = self.transport.post(&url, body).await?;
        self.audit.write(&format!("response={raw}"));

        let response = self.trusted(&raw)?;
        inspect(response)
    }

    /// Decode then verify; nothing past this point sees unverified data.
    fn trusted(&self, body: &str) -> Result<FieldMap> {
        let fields = xml::decode(body)?;

        if !signing::verify(&fields, self.config.merchant_key()) {
            #[cfg(feature = "tracing")]
            tracing::warn!(has_sign = fields.contains_key("sign"), "signature verification failed");

            return Err(Error::verification(fields));
        }

        Ok(fields)
    }

    fn endpoint(&self, schema: &FieldSchema) -> Result<Url> {
        let path = if self.config.debug {
            format!("{SANDBOX_PREFIX}{}", schema.path)
        } else {
            schema.path.to_owned()
        };
        Ok(self.host.join(&path)?)
    }
}

/// Keeps schema fields only, layers the preset on top and drops computed fields.
fn assemble(schema: &FieldSchema, fields: &FieldMap, preset: &FieldMap) -> FieldMap {
    #[cfg(feature = "tracing")]
    for name in fields.keys().filter(|name| !schema.accepts(name)) {
        tracing::debug!(operation = schema.operation, field = name, "dropping field outside schema");
    }

    let mut request = fields.filtered(|name| schema.accepts(name)).merged(preset);
    for name in schema.computed() {
        request.remove(name);
    }
    request
}

/// Maps the provider's own failure markers onto [`Error::provider`].
fn inspect(response: FieldMap) -> Result<FieldMap> {
    if response.get("return_code") == Some(FAIL) {
        return Err(Error::provider(
            FAIL,
            response.get("return_msg").unwrap_or_default(),
        ));
    }
    if response.get("result_code") == Some(FAIL) {
        return Err(Error::provider(
            response.get("err_code").unwrap_or(FAIL),
            response.get("err_code_des").unwrap_or_default(),
        ));
    }
    if response.get("return_code") != Some(SUCCESS) {
        return Err(Error::decode("response carries no return_code"));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Kind, Provider};

    #[test]
    fn assemble_filters_presets_and_computed() {
        let caller = FieldMap::from([
            ("body", "cup"),
            ("trade_type", "NATIVE"),
            ("sign", "caller-supplied"),
            ("sign_type", "HMAC-SHA256"),
            ("hack", "1"),
        ]);
        let preset = FieldMap::from([("trade_type", "JSAPI"), ("appid", "wx1")]);

        let request = assemble(&UNIFIED_ORDER, &caller, &preset);

        assert_eq!(
            request,
            FieldMap::from([("appid", "wx1"), ("body", "cup"), ("trade_type", "JSAPI")])
        );
    }

    #[test]
    fn inspect_maps_result_code_fail() {
        let response = FieldMap::from([
            ("return_code", "SUCCESS"),
            ("result_code", "FAIL"),
            ("err_code", "ORDERPAID"),
            ("err_code_des", "order already paid"),
        ]);

        let err = inspect(response).expect_err("business failure");
        assert_eq!(err.kind(), Kind::Provider);
        let provider = err.downcast_ref::<Provider>().expect("provider source");
        assert_eq!(provider.code, "ORDERPAID");
        assert_eq!(provider.description, "order already paid");
    }

    #[test]
    fn inspect_maps_return_code_fail() {
        let response = FieldMap::from([("return_code", "FAIL"), ("return_msg", "invalid appid")]);

        let err = inspect(response).expect_err("communication failure");
        let provider = err.downcast_ref::<Provider>().expect("provider source");
        assert_eq!(provider.code, "FAIL");
        assert_eq!(provider.description, "invalid appid");
    }

    #[test]
    fn inspect_passes_success() -> Result<()> {
        let response = FieldMap::from([("return_code", "SUCCESS"), ("result_code", "SUCCESS")]);

        assert_eq!(inspect(response.clone())?, response);
        Ok(())
    }
}
