//! JSON shape of a possession as served by the REST backend
//!
//! ```json
//! {"libelle": "Voiture", "valeur": 12000, "dateDebut": "2020-05-01",
//!  "dateFin": null, "tauxAmortissement": 15}
//! ```
//!
//! Form-driven clients post raw input strings, so amounts may arrive as
//! `"12000"` and an unset end date as `""`. Dates may carry a time part
//! (`2020-05-01T00:00:00.000Z`).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::db::{NewPossession, Possession};
use crate::error::PatrimoineError;
use crate::utils;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePossession {
    #[serde(rename = "libelle", alias = "label")]
    pub label: String,

    #[serde(
        rename = "valeur",
        alias = "value",
        deserialize_with = "deserialize_amount",
        serialize_with = "serialize_amount"
    )]
    pub value: Decimal,

    #[serde(rename = "dateDebut", alias = "startDate")]
    pub start_date: String,

    #[serde(rename = "dateFin", alias = "endDate", default)]
    pub end_date: Option<String>,

    #[serde(
        rename = "tauxAmortissement",
        alias = "depreciationRatePercent",
        default,
        deserialize_with = "deserialize_amount",
        serialize_with = "serialize_amount"
    )]
    pub depreciation_rate: Decimal,
}

impl WirePossession {
    /// Convert into a validated possession ready to be stored
    pub fn to_new_possession(&self) -> Result<NewPossession, PatrimoineError> {
        let start_date = parse_wire_date(&self.start_date)?.ok_or_else(|| {
            PatrimoineError::Validation(format!("'{}' has no start date", self.label))
        })?;
        let end_date = match &self.end_date {
            Some(raw) => parse_wire_date(raw)?,
            None => None,
        };

        let new = NewPossession {
            label: self.label.trim().to_string(),
            value: self.value,
            start_date,
            end_date,
            depreciation_rate: self.depreciation_rate,
        };
        new.validate()?;
        Ok(new)
    }
}

impl From<&Possession> for WirePossession {
    fn from(p: &Possession) -> Self {
        Self {
            label: p.label.clone(),
            value: p.value,
            start_date: p.start_date.format("%Y-%m-%d").to_string(),
            end_date: p.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            depreciation_rate: p.depreciation_rate,
        }
    }
}

/// A collection decoded element by element, so one malformed record does
/// not cost the others
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireBatch {
    pub records: Vec<WirePossession>,
    /// `"<label>: <reason>"` for each element that could not be decoded
    pub rejected: Vec<String>,
}

impl WireBatch {
    pub fn from_values(values: Vec<Value>) -> Self {
        let mut batch = Self::default();
        for (index, value) in values.into_iter().enumerate() {
            let label = element_label(&value, index);
            match serde_json::from_value::<WirePossession>(value) {
                Ok(record) => batch.records.push(record),
                Err(e) => {
                    warn!("Rejecting possession '{}': {}", label, e);
                    batch.rejected.push(format!("{}: {}", label, e));
                }
            }
        }
        batch
    }

    /// Number of elements in the collection, decoded or not
    pub fn len(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Label of a raw element, or its 1-based position when it has none
fn element_label(value: &Value, index: usize) -> String {
    ["libelle", "label"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index + 1))
}

/// Parse a wire date; blank means "no date"
pub fn parse_wire_date(raw: &str) -> Result<Option<NaiveDate>, PatrimoineError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    // Browsers serialize dates as UTC instants
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(instant.naive_utc().date()));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(naive.date()));
    }

    Err(PatrimoineError::Validation(format!(
        "unrecognized date '{}'",
        raw
    )))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(serde_json::Number),
    Text(String),
    Null,
}

fn parse_amount(raw: &str) -> Result<Decimal, PatrimoineError> {
    if raw.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    utils::parse_amount(raw)
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(n) => n.to_string(),
        RawAmount::Text(s) => s,
        RawAmount::Null => return Ok(Decimal::ZERO),
    };
    parse_amount(&raw).map_err(serde::de::Error::custom)
}

fn serialize_amount<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        if let Some(whole) = normalized.to_i64() {
            return serializer.serialize_i64(whole);
        }
    }
    match normalized.to_f64() {
        Some(float) => serializer.serialize_f64(float),
        None => serializer.serialize_str(&normalized.to_string()),
    }
}
