//! Merchant payment operations: unified order, order query and notifications.
//!
//! All operations share one pipeline in [`Client`]. Requests are assembled
//! against a [`crate::schema::FieldSchema`], signed with the merchant key and
//! posted as XML; responses are verified before anything reads them.

mod client;
mod config;
mod notify;
mod policy;
mod types;

pub use client::{Client, MISSING_PREPAY_ID};
pub use config::{Config, Credentials};
pub use notify::{ack_failure, ack_success};
pub use policy::{DEFAULT_NONCE_ALPHABET, DEFAULT_NONCE_LENGTH, NoncePolicy};
pub use types::{InvokeParams, OrderRef, OrderRequest, Prepay, TradeType};
