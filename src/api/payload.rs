//! Loose request-body coercion.
//!
//! Form-driven clients send numbers as strings and empty inputs as `""`, so
//! fields are read through `Payload` rather than a strict struct: empty and
//! `null` collapse to absent, numeric strings become numbers.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("{0} ต้องเป็นตัวเลข")]
    InvalidNumber(String),

    #[error("{0} ต้องเป็นวันที่ในรูปแบบ YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{0} ไม่ถูกต้อง")]
    InvalidId(String),
}

/// A JSON object body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Whether the client sent `key` at all, `null` included.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Trimmed, non-empty text. Numbers are accepted and rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn decimal(&self, key: &str) -> Result<Option<Decimal>, PayloadError> {
        let raw = match self.scalar(key) {
            Some(raw) => raw,
            None => return Ok(None),
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map(Some)
            .map_err(|_| PayloadError::InvalidNumber(key.to_string()))
    }

    /// Whole number; fractional input is truncated.
    pub fn integer(&self, key: &str) -> Result<Option<i32>, PayloadError> {
        let invalid = || PayloadError::InvalidNumber(key.to_string());
        let raw = match self.scalar(key) {
            Some(raw) => raw,
            None => return Ok(None),
        };
        if let Ok(n) = raw.parse::<i64>() {
            return i32::try_from(n).map(Some).map_err(|_| invalid());
        }
        let n = raw.parse::<f64>().map_err(|_| invalid())?;
        if !n.is_finite() || n.trunc() < i32::MIN as f64 || n.trunc() > i32::MAX as f64 {
            return Err(invalid());
        }
        Ok(Some(n.trunc() as i32))
    }

    /// `YYYY-MM-DD`, or an RFC 3339 timestamp reduced to its date.
    pub fn date(&self, key: &str) -> Result<Option<NaiveDate>, PayloadError> {
        let raw = match self.scalar(key) {
            Some(raw) => raw,
            None => return Ok(None),
        };
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|dt| dt.date_naive()))
            .map(Some)
            .map_err(|_| PayloadError::InvalidDate(key.to_string()))
    }

    pub fn uuid(&self, key: &str) -> Result<Option<Uuid>, PayloadError> {
        match self.text(key) {
            Some(raw) => parse_id(&raw, key).map(Some),
            None => Ok(None),
        }
    }

    /// `true`, `"true"` and `1` are truthy; anything else is false.
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    /// For partial updates: `None` when the key is absent, `Some(None)` when
    /// it was sent empty or null.
    pub fn present<T>(
        &self,
        key: &str,
        read: impl FnOnce(&Self, &str) -> Result<Option<T>, PayloadError>,
    ) -> Result<Option<Option<T>>, PayloadError> {
        if self.contains(key) {
            read(self, key).map(Some)
        } else {
            Ok(None)
        }
    }

    fn scalar(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Parse a UUID from a path or query parameter named `field`.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, PayloadError> {
    Uuid::parse_str(raw.trim()).map_err(|_| PayloadError::InvalidId(field.to_string()))
}
