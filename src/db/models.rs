use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PatrimoineError;

/// Upper bound (exclusive) of the annual depreciation rate, in percent
pub const MAX_DEPRECIATION_RATE: Decimal = Decimal::ONE_HUNDRED;

/// A tracked possession (asset) with its active window and depreciation rate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Possession {
    pub id: Option<i64>,
    pub label: String,
    pub value: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>, // None while the possession is still held
    pub depreciation_rate: Decimal,  // Annual rate, percent
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Possession {
    /// Build an unsaved possession, mostly useful for valuation-only callers
    pub fn new(
        label: impl Into<String>,
        value: Decimal,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        depreciation_rate: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            label: label.into(),
            value,
            start_date,
            end_date,
            depreciation_rate,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.end_date.is_some()
    }
}

/// Fields of a possession that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPossession {
    pub label: String,
    pub value: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub depreciation_rate: Decimal,
}

impl NewPossession {
    pub fn validate(&self) -> Result<(), PatrimoineError> {
        validate_fields(
            &self.label,
            self.value,
            self.start_date,
            self.end_date,
            self.depreciation_rate,
        )
    }
}

/// Partial update of a stored possession; `None` leaves the field untouched.
///
/// `end_date` is doubly optional: `Some(None)` reopens a closed possession.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PossessionChanges {
    pub label: Option<String>,
    pub value: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub depreciation_rate: Option<Decimal>,
}

impl PossessionChanges {
    pub fn is_empty(&self) -> bool {
        self == &PossessionChanges::default()
    }

    /// Apply the changes on top of an existing possession and validate the result
    pub fn apply_to(&self, current: &Possession) -> Result<Possession, PatrimoineError> {
        let mut updated = current.clone();
        if let Some(label) = &self.label {
            updated.label = label.trim().to_string();
        }
        if let Some(value) = self.value {
            updated.value = value;
        }
        if let Some(start) = self.start_date {
            updated.start_date = start;
        }
        if let Some(end) = self.end_date {
            updated.end_date = end;
        }
        if let Some(rate) = self.depreciation_rate {
            updated.depreciation_rate = rate;
        }

        validate_fields(
            &updated.label,
            updated.value,
            updated.start_date,
            updated.end_date,
            updated.depreciation_rate,
        )?;
        updated.updated_at = Utc::now();
        Ok(updated)
    }
}

/// A pending write to the register: either a brand new possession or an
/// edit of an existing one, addressed by its id rather than its label.
#[derive(Debug, Clone, PartialEq)]
pub enum PossessionDraft {
    Create(NewPossession),
    Edit { id: i64, changes: PossessionChanges },
}

impl PossessionDraft {
    /// Checks that can run without looking at the stored record
    pub fn validate(&self) -> Result<(), PatrimoineError> {
        match self {
            PossessionDraft::Create(new) => new.validate(),
            PossessionDraft::Edit { changes, .. } => {
                if changes.is_empty() {
                    return Err(PatrimoineError::Validation(
                        "nothing to change".to_string(),
                    ));
                }
                if let Some(label) = &changes.label {
                    validate_label(label)?;
                }
                if let Some(value) = changes.value {
                    validate_value(value)?;
                }
                if let Some(rate) = changes.depreciation_rate {
                    validate_rate(rate)?;
                }
                Ok(())
            }
        }
    }
}

fn validate_fields(
    label: &str,
    value: Decimal,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    depreciation_rate: Decimal,
) -> Result<(), PatrimoineError> {
    validate_label(label)?;
    validate_value(value)?;
    validate_rate(depreciation_rate)?;
    if let Some(end) = end_date {
        validate_end_date(start_date, end)?;
    }
    Ok(())
}

fn validate_label(label: &str) -> Result<(), PatrimoineError> {
    if label.trim().is_empty() {
        return Err(PatrimoineError::Validation(
            "label must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_value(value: Decimal) -> Result<(), PatrimoineError> {
    if value < Decimal::ZERO {
        return Err(PatrimoineError::Validation(format!(
            "value must not be negative (got {})",
            value
        )));
    }
    Ok(())
}

fn validate_rate(rate: Decimal) -> Result<(), PatrimoineError> {
    if rate < Decimal::ZERO || rate >= MAX_DEPRECIATION_RATE {
        return Err(PatrimoineError::Validation(format!(
            "depreciation rate must be in [0, 100) percent (got {})",
            rate
        )));
    }
    Ok(())
}

pub(crate) fn validate_end_date(start: NaiveDate, end: NaiveDate) -> Result<(), PatrimoineError> {
    if end < start {
        return Err(PatrimoineError::Validation(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_possession() -> NewPossession {
        NewPossession {
            label: "Ordinateur".to_string(),
            value: dec!(1500),
            start_date: date(2023, 1, 1),
            end_date: None,
            depreciation_rate: dec!(20),
        }
    }

    #[test]
    fn test_new_possession_validation() {
        assert!(new_possession().validate().is_ok());

        let mut bad = new_possession();
        bad.value = dec!(-1);
        assert!(bad.validate().is_err());

        let mut bad = new_possession();
        bad.depreciation_rate = dec!(100);
        assert!(bad.validate().is_err());

        let mut bad = new_possession();
        bad.label = "   ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = new_possession();
        bad.end_date = Some(date(2022, 12, 31));
        assert!(bad.validate().is_err());

        let mut same_day = new_possession();
        same_day.end_date = Some(date(2023, 1, 1));
        assert!(same_day.validate().is_ok());
    }

    #[test]
    fn test_changes_apply_and_reopen() {
        let mut stored = Possession::new(
            "Voiture",
            dec!(12000),
            date(2020, 5, 1),
            Some(date(2024, 5, 1)),
            dec!(15),
        );
        stored.id = Some(7);

        let changes = PossessionChanges {
            value: Some(dec!(11000)),
            end_date: Some(None),
            ..Default::default()
        };
        let updated = changes.apply_to(&stored).unwrap();
        assert_eq!(updated.id, Some(7));
        assert_eq!(updated.value, dec!(11000));
        assert_eq!(updated.end_date, None);
        assert_eq!(updated.label, "Voiture");
    }

    #[test]
    fn test_changes_reject_start_after_end() {
        let stored = Possession::new(
            "Voiture",
            dec!(12000),
            date(2020, 5, 1),
            Some(date(2024, 5, 1)),
            dec!(15),
        );
        let changes = PossessionChanges {
            start_date: Some(date(2025, 1, 1)),
            ..Default::default()
        };
        assert!(changes.apply_to(&stored).is_err());
    }

    #[test]
    fn test_edit_draft_requires_changes() {
        let draft = PossessionDraft::Edit {
            id: 1,
            changes: PossessionChanges::default(),
        };
        assert!(draft.validate().is_err());

        let draft = PossessionDraft::Edit {
            id: 1,
            changes: PossessionChanges {
                depreciation_rate: Some(dec!(150)),
                ..Default::default()
            },
        };
        assert!(draft.validate().is_err());

        assert!(PossessionDraft::Create(new_possession()).validate().is_ok());
    }
}
