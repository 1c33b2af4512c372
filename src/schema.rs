//! Per-operation field schemas and the pre-submission validator.

use crate::error::Schema as Violation;
use crate::types::FieldMap;

/// Predicate over other fields that makes a conditional field mandatory.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Condition {
    /// Holds when `field` equals `value`.
    Equals {
        field: &'static str,
        value: &'static str,
    },
    /// Holds when `field` is absent or empty.
    Absent { field: &'static str },
}

impl Condition {
    #[must_use]
    pub fn holds(self, fields: &FieldMap) -> bool {
        match self {
            Condition::Equals { field, value } => fields.get(field) == Some(value),
            Condition::Absent { field } => !fields.is_present(field),
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rule {
    Required,
    /// Generated by the client when the caller leaves it out.
    Auto,
    Conditional {
        when: Condition,
        reason: &'static str,
    },
    Optional,
    /// Always overwritten before signing; a caller-supplied value is discarded.
    Computed,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rule: Rule,
}

impl FieldSpec {
    const fn new(name: &'static str, rule: Rule) -> Self {
        Self { name, rule }
    }
}

/// Immutable field table for one provider operation.
#[non_exhaustive]
#[derive(Clone, Copy, Debug)]
pub struct FieldSchema {
    pub operation: &'static str,
    /// Endpoint path relative to the provider host.
    pub path: &'static str,
    pub fields: &'static [FieldSpec],
}

impl FieldSchema {
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<Rule> {
        self.fields
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.rule)
    }

    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        self.rule(name).is_some()
    }

    /// Names of all fields tagged [`Rule::Computed`].
    pub fn computed(&self) -> impl Iterator<Item = &'static str> {
        self.fields
            .iter()
            .filter(|spec| spec.rule == Rule::Computed)
            .map(|spec| spec.name)
    }
}

/// Unified order (prepay) creation.
pub static UNIFIED_ORDER: FieldSchema = FieldSchema {
    operation: "unifiedorder",
    path: "pay/unifiedorder",
    fields: &[
        FieldSpec::new("appid", Rule::Required),
        FieldSpec::new("mch_id", Rule::Required),
        FieldSpec::new("trade_type", Rule::Required),
        FieldSpec::new("out_trade_no", Rule::Required),
        FieldSpec::new("total_fee", Rule::Required),
        FieldSpec::new("body", Rule::Required),
        FieldSpec::new("notify_url", Rule::Required),
        FieldSpec::new("nonce_str", Rule::Auto),
        FieldSpec::new("spbill_create_ip", Rule::Auto),
        FieldSpec::new(
            "openid",
            Rule::Conditional {
                when: Condition::Equals {
                    field: "trade_type",
                    value: "JSAPI",
                },
                reason: "JSAPI trades require openid",
            },
        ),
        FieldSpec::new(
            "product_id",
            Rule::Conditional {
                when: Condition::Equals {
                    field: "trade_type",
                    value: "NATIVE",
                },
                reason: "NATIVE (scan code) trades require product_id",
            },
        ),
        FieldSpec::new("device_info", Rule::Optional),
        FieldSpec::new("detail", Rule::Optional),
        FieldSpec::new("attach", Rule::Optional),
        FieldSpec::new("fee_type", Rule::Optional),
        FieldSpec::new("time_start", Rule::Optional),
        FieldSpec::new("time_expire", Rule::Optional),
        FieldSpec::new("goods_tag", Rule::Optional),
        FieldSpec::new("limit_pay", Rule::Optional),
        FieldSpec::new("sign_type", Rule::Computed),
        FieldSpec::new("sign", Rule::Computed),
    ],
};

/// Order status query. Either `transaction_id` or `out_trade_no` identifies the order;
/// the provider prefers `transaction_id` when both are sent.
pub static ORDER_QUERY: FieldSchema = FieldSchema {
    operation: "orderquery",
    path: "pay/orderquery",
    fields: &[
        FieldSpec::new("appid", Rule::Required),
        FieldSpec::new("mch_id", Rule::Required),
        FieldSpec::new("nonce_str", Rule::Auto),
        FieldSpec::new("transaction_id", Rule::Optional),
        FieldSpec::new(
            "out_trade_no",
            Rule::Conditional {
                when: Condition::Absent {
                    field: "transaction_id",
                },
                reason: "one of transaction_id or out_trade_no is required",
            },
        ),
        FieldSpec::new("sign_type", Rule::Computed),
        FieldSpec::new("sign", Rule::Computed),
    ],
};

/// Checks `fields` against `schema`; the first violation wins.
///
/// Order of checks: unknown keys, then `required`/`auto` presence, then
/// conditional predicates. Nothing is aggregated.
pub fn validate(schema: &FieldSchema, fields: &FieldMap) -> Result<(), Violation> {
    if let Some(name) = fields.keys().find(|name| !schema.accepts(name)) {
        return Err(Violation::UnknownField(name.to_owned()));
    }

    for spec in schema.fields {
        if matches!(spec.rule, Rule::Required | Rule::Auto) && !fields.is_present(spec.name) {
            return Err(Violation::MissingField(spec.name.to_owned()));
        }
    }

    for spec in schema.fields {
        let Rule::Conditional { when, reason } = spec.rule else {
            continue;
        };
        if when.holds(fields) && !fields.is_present(spec.name) {
            return Err(Violation::MissingConditionalField {
                name: spec.name.to_owned(),
                reason: reason.to_owned(),
            });
        }
    }

    Ok(())
}
