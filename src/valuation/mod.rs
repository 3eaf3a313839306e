//! Valuation engine
//!
//! Computes the total value of a set of possessions ("patrimoine") at a date
//! or over a date range, applying exponential depreciation at each
//! possession's annual rate:
//!
//! ```text
//! value(t) = max(0, nominal * (1 - rate / 100) ^ years(t - start))
//! ```
//!
//! A possession counts at time `t` when `start <= t` and, if it was closed,
//! `t <= end`. The engine is a pure function of its inputs: it owns no state
//! and never touches the database or the network.

pub mod year_basis;

pub use year_basis::YearBasis;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::db::Possession;
use crate::error::PatrimoineError;

/// Number of sub-intervals used for a range query unless told otherwise
pub const DEFAULT_INTERVALS: u32 = 8;

/// Total value at one sample date of a range query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Depreciated value of a single possession at a date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PossessionValuation {
    pub id: Option<i64>,
    pub label: String,
    pub nominal: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuationEngine {
    /// Reference date standing in for the end of still-open possessions
    /// when pre-filtering a range query
    today: NaiveDate,
    basis: YearBasis,
}

impl ValuationEngine {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            basis: YearBasis::default(),
        }
    }

    /// Engine anchored on the local calendar date
    pub fn as_of_today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn with_basis(mut self, basis: YearBasis) -> Self {
        self.basis = basis;
        self
    }

    pub fn basis(&self) -> YearBasis {
        self.basis
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Total value of the possessions eligible at `date`, rounded to cents
    pub fn value_at(&self, possessions: &[Possession], date: NaiveDate) -> Decimal {
        to_money(self.total_at(possessions.iter(), start_of_day(date)))
    }

    /// Per-possession values at `date`, eligible possessions only, input order
    pub fn breakdown_at(
        &self,
        possessions: &[Possession],
        date: NaiveDate,
    ) -> Vec<PossessionValuation> {
        let instant = start_of_day(date);
        possessions
            .iter()
            .filter(|p| is_active_at(p, instant))
            .map(|p| PossessionValuation {
                id: p.id,
                label: p.label.clone(),
                nominal: p.value,
                value: to_money(depreciated_value(p, instant, self.basis)),
            })
            .collect()
    }

    /// Sample the total value at `intervals + 1` evenly spaced points of
    /// `[start, end]`, both ends included, in chronological order.
    ///
    /// Interior points are valued at the sample instant itself, which may
    /// fall mid-day: a point labelled with the day a possession closes can
    /// leave it out even though `value_at` on that day counts it.
    pub fn value_over_range(
        &self,
        possessions: &[Possession],
        start: NaiveDate,
        end: NaiveDate,
        intervals: u32,
    ) -> Result<Vec<ValuationPoint>, PatrimoineError> {
        if intervals == 0 {
            return Err(PatrimoineError::InvalidRange(
                "the number of intervals must be at least 1".to_string(),
            ));
        }
        if start > end {
            return Err(PatrimoineError::InvalidRange(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        let overlapping: Vec<&Possession> = possessions
            .iter()
            .filter(|p| overlaps_range(p, start, end, self.today))
            .collect();

        tracing::debug!(
            "Valuing {} of {} possessions from {} to {} over {} intervals",
            overlapping.len(),
            possessions.len(),
            start,
            end,
            intervals
        );

        let points = sample_instants(start, end, intervals)
            .into_iter()
            .map(|instant| ValuationPoint {
                date: instant.date(),
                value: to_money(self.total_at(overlapping.iter().copied(), instant)),
            })
            .collect();

        Ok(points)
    }

    fn total_at<'a>(
        &self,
        possessions: impl Iterator<Item = &'a Possession>,
        instant: NaiveDateTime,
    ) -> f64 {
        possessions
            .filter(|p| is_active_at(p, instant))
            .map(|p| depreciated_value(p, instant, self.basis))
            .sum()
    }
}

/// Whether a possession is held at `instant` (start and end dates inclusive)
pub fn is_active_at(possession: &Possession, instant: NaiveDateTime) -> bool {
    instant >= start_of_day(possession.start_date)
        && possession
            .end_date
            .map_or(true, |end| instant <= start_of_day(end))
}

/// Whether a possession is held on `date`
pub fn is_held_on(possession: &Possession, date: NaiveDate) -> bool {
    is_active_at(possession, start_of_day(date))
}

/// Whether a possession's holding window touches `[start, end]`; still-open
/// possessions are considered held until `today`
fn overlaps_range(
    possession: &Possession,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> bool {
    let held_until = possession.end_date.unwrap_or(today);
    possession.start_date <= end && held_until >= start
}

/// Depreciated value of one possession at `instant`, never negative.
///
/// Eligibility is the caller's concern.
pub fn depreciated_value(
    possession: &Possession,
    instant: NaiveDateTime,
    basis: YearBasis,
) -> f64 {
    let nominal = as_f64(possession.value);
    let rate = as_f64(possession.depreciation_rate);
    let years = basis.years_between(start_of_day(possession.start_date), instant);

    let retained = (1.0 - rate / 100.0).max(0.0);
    (nominal * retained.powf(years)).max(0.0)
}

fn sample_instants(start: NaiveDate, end: NaiveDate, intervals: u32) -> Vec<NaiveDateTime> {
    let from = start_of_day(start);
    let total_seconds = (start_of_day(end) - from).num_seconds() as i128;
    let steps = intervals as i128;

    (0..=steps)
        .map(|i| {
            let offset = (total_seconds * i / steps) as i64;
            from + Duration::seconds(offset)
        })
        .collect()
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Decimal's range lies well inside f64's; only precision is lost
fn as_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(if amount.is_sign_negative() {
        f64::MIN
    } else {
        f64::MAX
    })
}

/// Round an accumulated float total to a two-decimal amount.
///
/// Totals are never negative; one past `Decimal::MAX` is capped there.
fn to_money(total: f64) -> Decimal {
    let Some(amount) = Decimal::from_f64(total) else {
        tracing::warn!(
            "Total {} exceeds the largest representable amount, capped at {}",
            total,
            Decimal::MAX
        );
        return Decimal::MAX;
    };
    let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(2);
    amount
}
