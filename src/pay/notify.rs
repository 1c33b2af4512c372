//! Replies to the provider's asynchronous payment notifications.
//!
//! The provider keeps re-delivering a notification until it receives a
//! `SUCCESS` reply, so callers should acknowledge only after the verified
//! fields from [`crate::pay::Client::parse_notification`] have been processed.

use crate::types::FieldMap;
use crate::xml;

/// Reply body telling the provider the notification was handled.
#[must_use]
pub fn ack_success() -> String {
    reply("SUCCESS", "OK")
}

/// Reply body asking the provider to retry later.
#[must_use]
pub fn ack_failure(message: &str) -> String {
    reply("FAIL", message)
}

fn reply(code: &str, message: &str) -> String {
    xml::encode(&FieldMap::from([("return_code", code), ("return_msg", message)]))
}
