//! Client for the WeChat Pay merchant API (v2, XML with MD5 signatures).
//!
//! ```no_run
//! use wxpay_client::pay::{Client, Config, Credentials, OrderRequest, TradeType};
//!
//! # async fn run() -> wxpay_client::Result<()> {
//! let config = Config::builder()
//!     .credentials(Credentials::new("wx8888888888888888", "1900000109", "merchant-key"))
//!     .notify_url("https://example.com/wxpay/notify")
//!     .build();
//! let client = Client::new(wxpay_client::DEFAULT_HOST, config)?;
//!
//! let order = OrderRequest::builder()
//!     .out_trade_no("20180611000001")
//!     .total_fee(1)
//!     .body("Coffee")
//!     .openid("oUpF8uMuAJO_M2pxb1Q9zNjWeS6o")
//!     .spbill_create_ip("203.0.113.7")
//!     .build();
//! let prepay = client.create_order(TradeType::Jsapi, &order, None).await?;
//! println!("{}", prepay.invoke.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod origin;
pub mod pay;
pub mod schema;
pub mod signing;
pub mod transport;
pub mod types;
pub mod xml;

pub use error::Error;
pub use types::{FieldMap, Outcome};

pub type Result<T> = std::result::Result<T, Error>;

/// Production merchant API host.
pub const DEFAULT_HOST: &str = "https://api.mch.weixin.qq.com";
