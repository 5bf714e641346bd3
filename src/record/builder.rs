//! Incremental construction of [`Sale`] records.

use std::fmt;

use chrono::{DateTime, Utc};

use super::sale::{truncate_to_millis, Sale, SaleField, SALE_FIELD_COUNT};
use super::schema::Value;
use crate::{Error, Result};

/// Accumulates field values and tracks which ones were explicitly set.
///
/// `build` does not consume the builder; each call yields an independent
/// record, so later changes to the builder never reach records already
/// built. Cloning a builder copies its values and set-state.
#[derive(Clone, Default)]
pub struct SaleBuilder {
    values: [Option<Value>; SALE_FIELD_COUNT],
}

impl SaleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field`, rejecting a value of the wrong type.
    pub fn set(&mut self, field: SaleField, value: Value) -> Result<&mut Self> {
        if value.field_type() != field.field_type() {
            return Err(Error::malformed(format!(
                "field '{}' expects {:?}, got {:?}",
                field.name(),
                field.field_type(),
                value.field_type()
            )));
        }

        let value = match value {
            Value::TimestampMillis(ts) => Value::TimestampMillis(truncate_to_millis(ts)),
            other => other,
        };
        self.values[field.index()] = Some(value);
        Ok(self)
    }

    pub fn get(&self, field: SaleField) -> Option<&Value> {
        self.values[field.index()].as_ref()
    }

    pub fn is_set(&self, field: SaleField) -> bool {
        self.values[field.index()].is_some()
    }

    pub fn clear(&mut self, field: SaleField) -> &mut Self {
        self.values[field.index()] = None;
        self
    }

    pub fn order_id(mut self, value: i32) -> Self {
        self.values[SaleField::OrderId.index()] = Some(Value::Int(value));
        self
    }

    pub fn product_id(mut self, value: i32) -> Self {
        self.values[SaleField::ProductId.index()] = Some(Value::Int(value));
        self
    }

    pub fn customer_id(mut self, value: i32) -> Self {
        self.values[SaleField::CustomerId.index()] = Some(Value::Int(value));
        self
    }

    pub fn confirmation_code(mut self, value: impl Into<String>) -> Self {
        self.values[SaleField::ConfirmationCode.index()] = Some(Value::String(value.into()));
        self
    }

    pub fn cc_number(mut self, value: impl Into<String>) -> Self {
        self.values[SaleField::CcNumber.index()] = Some(Value::String(value.into()));
        self
    }

    pub fn expiration(mut self, value: impl Into<String>) -> Self {
        self.values[SaleField::Expiration.index()] = Some(Value::String(value.into()));
        self
    }

    pub fn amount(mut self, value: f64) -> Self {
        self.values[SaleField::Amount.index()] = Some(Value::Double(value));
        self
    }

    pub fn ts(mut self, value: DateTime<Utc>) -> Self {
        self.values[SaleField::Ts.index()] =
            Some(Value::TimestampMillis(truncate_to_millis(value)));
        self
    }

    /// Finalizes a record. Unset fields take their schema default; an unset
    /// field without one fails with [`Error::MissingRequiredField`].
    pub fn build(&self) -> Result<Sale> {
        Ok(Sale::new(
            self.int(SaleField::OrderId)?,
            self.int(SaleField::ProductId)?,
            self.int(SaleField::CustomerId)?,
            self.string(SaleField::ConfirmationCode)?,
            self.string(SaleField::CcNumber)?,
            self.string(SaleField::Expiration)?,
            self.double(SaleField::Amount)?,
            self.timestamp(SaleField::Ts)?,
        ))
    }

    fn resolve(&self, field: SaleField) -> Result<Value> {
        match &self.values[field.index()] {
            Some(value) => Ok(value.clone()),
            None => field
                .descriptor()
                .default
                .map(|default| default())
                .ok_or_else(|| Error::MissingRequiredField {
                    field: field.name().to_string(),
                }),
        }
    }

    fn int(&self, field: SaleField) -> Result<i32> {
        match self.resolve(field)? {
            Value::Int(v) => Ok(v),
            other => Err(mismatch(field, &other)),
        }
    }

    fn string(&self, field: SaleField) -> Result<String> {
        match self.resolve(field)? {
            Value::String(v) => Ok(v),
            other => Err(mismatch(field, &other)),
        }
    }

    fn double(&self, field: SaleField) -> Result<f64> {
        match self.resolve(field)? {
            Value::Double(v) => Ok(v),
            other => Err(mismatch(field, &other)),
        }
    }

    fn timestamp(&self, field: SaleField) -> Result<DateTime<Utc>> {
        match self.resolve(field)? {
            Value::TimestampMillis(v) => Ok(v),
            other => Err(mismatch(field, &other)),
        }
    }
}

fn mismatch(field: SaleField, value: &Value) -> Error {
    Error::malformed(format!(
        "field '{}' holds {:?}",
        field.name(),
        value.field_type()
    ))
}

impl From<&Sale> for SaleBuilder {
    fn from(sale: &Sale) -> Self {
        let mut builder = Self::new();
        for field in SaleField::ALL {
            builder.values[field.index()] = Some(sale.get(field));
        }
        builder
    }
}

impl fmt::Debug for SaleBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = SaleField::ALL
            .iter()
            .filter(|field| self.is_set(**field))
            .map(|field| field.name())
            .collect();
        f.debug_struct("SaleBuilder").field("set", &set).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn complete() -> SaleBuilder {
        Sale::builder()
            .order_id(1)
            .product_id(42)
            .customer_id(7)
            .confirmation_code("ABC123")
            .cc_number("4111111111111111")
            .expiration("12/29")
            .amount(19.99)
            .ts(Utc.timestamp_millis_opt(1_704_067_200_123).unwrap())
    }

    #[test]
    fn test_empty_builder_fails_on_first_field() {
        match Sale::builder().build() {
            Err(Error::MissingRequiredField { field }) => assert_eq!(field, "order_id"),
            other => panic!("expected missing field, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut builder = complete();
        builder.clear(SaleField::Expiration);
        assert!(!builder.is_set(SaleField::Expiration));

        match builder.build() {
            Err(Error::MissingRequiredField { field }) => assert_eq!(field, "expiration"),
            other => panic!("expected missing field, got {:?}", other),
        }
    }

    #[test]
    fn test_build_is_repeatable_and_isolated() {
        let mut builder = complete();
        let first = builder.build().unwrap();

        builder
            .set(SaleField::ConfirmationCode, Value::String("XYZ".into()))
            .unwrap();
        let second = builder.build().unwrap();

        assert_eq!(first.confirmation_code(), "ABC123");
        assert_eq!(second.confirmation_code(), "XYZ");
    }

    #[test]
    fn test_cloned_builder_is_independent() {
        let b1 = Sale::builder().confirmation_code("ORIGINAL");
        let b2 = b1.clone().confirmation_code("CHANGED");

        assert_eq!(
            b1.get(SaleField::ConfirmationCode),
            Some(&Value::String("ORIGINAL".into()))
        );
        assert_eq!(
            b2.get(SaleField::ConfirmationCode),
            Some(&Value::String("CHANGED".into()))
        );
    }

    #[test]
    fn test_builder_from_record() {
        let sale = complete().build().unwrap();
        let builder = sale.to_builder();

        assert!(SaleField::ALL.iter().all(|f| builder.is_set(*f)));
        assert_eq!(builder.clone().amount(5.0).build().unwrap().amount(), 5.0);
        assert_eq!(builder.build().unwrap(), sale);
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut builder = Sale::builder();
        let result = builder.set(SaleField::OrderId, Value::String("1".into()));
        assert!(matches!(result, Err(Error::MalformedPayload { .. })));
        assert!(!builder.is_set(SaleField::OrderId));
    }

    #[test]
    fn test_set_truncates_timestamp() {
        let ts = Utc.timestamp_nanos(1_704_067_200_123_456_789);
        let mut builder = Sale::builder();
        builder.set(SaleField::Ts, Value::TimestampMillis(ts)).unwrap();

        assert_eq!(
            builder.get(SaleField::Ts),
            Some(&Value::TimestampMillis(
                Utc.timestamp_millis_opt(1_704_067_200_123).unwrap()
            ))
        );
    }

    #[test]
    fn test_debug_lists_set_fields_only() {
        let builder = Sale::builder().order_id(1).cc_number("4111111111111111");
        let rendered = format!("{:?}", builder);
        assert!(rendered.contains("order_id"));
        assert!(!rendered.contains("4111"));
    }
}
