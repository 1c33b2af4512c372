use bon::Builder;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::{Error, Kind};
use crate::types::FieldMap;

/// Provider timestamp layout for `time_start` / `time_expire` (China Standard Time).
const PROVIDER_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Payment channel selector; decides which conditional fields are required.
#[non_exhaustive]
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TradeType {
    /// Official account and mini program payments; needs `openid`.
    Jsapi,
    /// Scan-code payments; needs `product_id`.
    Native,
    App,
    /// Mobile web (H5) payments.
    Mweb,
}

/// Business fields of a unified order, converted into a [`FieldMap`] before submission.
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
#[builder(on(String, into))]
pub struct OrderRequest {
    pub out_trade_no: String,
    /// Amount in the smallest currency unit (fen for CNY).
    pub total_fee: u64,
    pub body: String,
    pub openid: Option<String>,
    pub product_id: Option<String>,
    pub device_info: Option<String>,
    pub detail: Option<String>,
    pub attach: Option<String>,
    pub fee_type: Option<String>,
    pub time_start: Option<NaiveDateTime>,
    pub time_expire: Option<NaiveDateTime>,
    pub goods_tag: Option<String>,
    pub limit_pay: Option<String>,
    /// Overrides client IP resolution from the request origin.
    pub spbill_create_ip: Option<String>,
}

impl From<&OrderRequest> for FieldMap {
    fn from(order: &OrderRequest) -> Self {
        let mut fields = FieldMap::from([
            ("out_trade_no", order.out_trade_no.clone()),
            ("total_fee", order.total_fee.to_string()),
            ("body", order.body.clone()),
        ]);

        let optional = [
            ("openid", &order.openid),
            ("product_id", &order.product_id),
            ("device_info", &order.device_info),
            ("detail", &order.detail),
            ("attach", &order.attach),
            ("fee_type", &order.fee_type),
            ("goods_tag", &order.goods_tag),
            ("limit_pay", &order.limit_pay),
            ("spbill_create_ip", &order.spbill_create_ip),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                fields.insert(name, value.clone());
            }
        }

        for (name, time) in [("time_start", order.time_start), ("time_expire", order.time_expire)] {
            if let Some(time) = time {
                fields.insert(name, time.format(PROVIDER_TIME_FORMAT).to_string());
            }
        }

        fields
    }
}

/// Identifies the order to query. The provider's own id takes precedence when available.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OrderRef {
    TransactionId(String),
    OutTradeNo(String),
}

impl From<&OrderRef> for FieldMap {
    fn from(order: &OrderRef) -> Self {
        match order {
            OrderRef::TransactionId(id) => FieldMap::from([("transaction_id", id.as_str())]),
            OrderRef::OutTradeNo(no) => FieldMap::from([("out_trade_no", no.as_str())]),
        }
    }
}

/// Parameters handed to the client-side payment invocation (e.g. `wx.requestPayment`).
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeParams {
    pub app_id: String,
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    pub sign_type: String,
    pub pay_sign: String,
}

impl InvokeParams {
    /// The signed payload, keyed exactly as the client-side API expects.
    #[must_use]
    pub fn unsigned_fields(&self) -> FieldMap {
        FieldMap::from([
            ("appId", self.app_id.as_str()),
            ("timeStamp", self.time_stamp.as_str()),
            ("nonceStr", self.nonce_str.as_str()),
            ("package", self.package.as_str()),
            ("signType", self.sign_type.as_str()),
        ])
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::with_source(Kind::Internal, e))
    }
}

/// Successful unified order: the verified provider response plus invocation parameters.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct Prepay {
    pub prepay_id: String,
    /// Present for NATIVE trades.
    pub code_url: Option<String>,
    pub response: FieldMap,
    pub invoke: InvokeParams,
}

/// Flattens the verified response and the signed invocation parameters into one map.
impl From<Prepay> for FieldMap {
    fn from(prepay: Prepay) -> Self {
        let mut fields = prepay.response.merged(&prepay.invoke.unsigned_fields());
        fields.insert("paySign", prepay.invoke.pay_sign);
        fields
    }
}
