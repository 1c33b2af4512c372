use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use reqwest::{Method, StatusCode};

use crate::types::FieldMap;

#[non_exhaustive]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    /// Local input or schema problem, detected before any network call
    Validation,
    /// Non-2xx HTTP status from the provider endpoint
    Status,
    /// Network or HTTP-layer failure reported by the transport
    Transport,
    /// Malformed XML in either direction
    Decode,
    /// Inbound data failed signature verification
    Verification,
    /// The provider explicitly reported a business failure
    Provider,
    /// Internal error from dependencies
    Internal,
}

impl Kind {
    /// Stable numeric code for the client-facing result shape. `0` is reserved for success.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Kind::Validation => 1,
            Kind::Status | Kind::Transport => 2,
            Kind::Decode => 3,
            Kind::Verification => 4,
            Kind::Provider => 5,
            Kind::Internal => 6,
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn status<S: Into<String>>(
        status_code: StatusCode,
        method: Method,
        path: String,
        message: S,
    ) -> Self {
        Status {
            status_code,
            method,
            path,
            message: message.into(),
        }
        .into()
    }

    pub fn decode<S: Into<String>>(reason: S) -> Self {
        Decode {
            reason: reason.into(),
        }
        .into()
    }

    pub fn verification(fields: FieldMap) -> Self {
        Verification { fields }.into()
    }

    pub fn provider<C: Into<String>, D: Into<String>>(code: C, description: D) -> Self {
        Provider {
            code: code.into(),
            description: description.into(),
        }
        .into()
    }

    /// Untrusted fields attached to a verification failure, for diagnostics only.
    #[must_use]
    pub fn untrusted_fields(&self) -> Option<&FieldMap> {
        self.downcast_ref::<Verification>().map(|v| &v.fields)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

/// Field-level violation found by [`crate::schema::validate`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    UnknownField(String),
    MissingField(String),
    MissingConditionalField { name: String, reason: String },
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::UnknownField(name) => write!(f, "unknown field `{name}`"),
            Schema::MissingField(name) => write!(f, "missing required field `{name}`"),
            Schema::MissingConditionalField { name, reason } => {
                write!(f, "missing field `{name}`: {reason}")
            }
        }
    }
}

impl StdError for Schema {}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error({}) making {} call to {} with {}",
            self.status_code, self.method, self.path, self.message
        )
    }
}

impl StdError for Status {}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decode {
    pub reason: String,
}

impl fmt::Display for Decode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed xml: {}", self.reason)
    }
}

impl StdError for Decode {}

/// Signature check failed. The fields are carried for logging and must not be trusted.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub fields: FieldMap,
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.contains_key("sign") {
            write!(f, "signature mismatch")
        } else {
            write!(f, "signature missing")
        }
    }
}

impl StdError for Verification {}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub code: String,
    pub description: String,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider reported {}: {}", self.code, self.description)
    }
}

impl StdError for Provider {}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<Schema> for Error {
    fn from(err: Schema) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Status, err)
    }
}

impl From<Decode> for Error {
    fn from(err: Decode) -> Self {
        Error::with_source(Kind::Decode, err)
    }
}

impl From<Verification> for Error {
    fn from(err: Verification) -> Self {
        Error::with_source(Kind::Verification, err)
    }
}

impl From<Provider> for Error {
    fn from(err: Provider) -> Self {
        Error::with_source(Kind::Provider, err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::with_source(Kind::Transport, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::with_source(Kind::Decode, e)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Self {
        Error::with_source(Kind::Decode, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_violation_is_validation_kind() {
        let err: Error = Schema::MissingField("body".to_owned()).into();

        assert_eq!(err.kind(), Kind::Validation);
        assert_eq!(err.code(), 1);
        assert_eq!(
            err.to_string(),
            "Validation: missing required field `body`"
        );
        assert_eq!(
            err.downcast_ref::<Schema>(),
            Some(&Schema::MissingField("body".to_owned()))
        );
    }

    #[test]
    fn verification_keeps_untrusted_fields() {
        let fields = FieldMap::from([("return_code", "SUCCESS"), ("sign", "BAD")]);
        let err = Error::verification(fields.clone());

        assert_eq!(err.kind(), Kind::Verification);
        assert_eq!(err.untrusted_fields(), Some(&fields));
        assert_eq!(err.to_string(), "Verification: signature mismatch");
    }

    #[test]
    fn provider_failure_is_distinct_from_verification() {
        let err = Error::provider("ORDERPAID", "order already paid");

        assert_eq!(err.kind(), Kind::Provider);
        assert_eq!(err.code(), 5);
        assert!(err.untrusted_fields().is_none(), "no untrusted payload");
        let provider = err.downcast_ref::<Provider>().expect("provider source");
        assert_eq!(provider.code, "ORDERPAID");
    }

    #[test]
    fn status_display() {
        let err = Error::status(
            StatusCode::BAD_GATEWAY,
            Method::POST,
            "/pay/orderquery".to_owned(),
            "upstream down",
        );

        assert_eq!(err.kind(), Kind::Status);
        assert_eq!(
            err.to_string(),
            "Status: error(502 Bad Gateway) making POST call to /pay/orderquery with upstream down"
        );
    }
}
