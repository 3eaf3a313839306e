//! Year-fraction conventions used to turn elapsed time into depreciation years

use chrono::{Datelike, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_FIXED_YEAR: f64 = 365.0;

/// How elapsed time is converted into a (fractional) number of years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearBasis {
    /// Elapsed seconds divided by a 365-day year
    #[default]
    Fixed365,
    /// Whole anniversaries plus the elapsed share of the current anniversary year
    Actual,
}

impl YearBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            YearBasis::Fixed365 => "fixed365",
            YearBasis::Actual => "actual",
        }
    }

    /// Fractional years between `from` and `to`; negative when `to` precedes `from`
    pub fn years_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> f64 {
        match self {
            YearBasis::Fixed365 => {
                let seconds = (to - from).num_seconds() as f64;
                seconds / (DAYS_PER_FIXED_YEAR * SECONDS_PER_DAY)
            }
            YearBasis::Actual => {
                if to < from {
                    return -YearBasis::Actual.years_between(to, from);
                }
                actual_years(from, to)
            }
        }
    }
}

fn add_years(base: NaiveDateTime, years: u32) -> Option<NaiveDateTime> {
    base.checked_add_months(Months::new(years.checked_mul(12)?))
}

fn actual_years(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    // Anniversaries of Feb 29 fall on Feb 28 in common years (chrono clamps).
    let mut whole = (to.year() - from.year()).max(0) as u32;
    while whole > 0 && add_years(from, whole).map_or(true, |anniversary| anniversary > to) {
        whole -= 1;
    }

    let (Some(anniversary), Some(next)) = (add_years(from, whole), add_years(from, whole + 1))
    else {
        return whole as f64;
    };

    let span = (next - anniversary).num_seconds() as f64;
    let elapsed = (to - anniversary).num_seconds() as f64;
    whole as f64 + elapsed / span
}

impl fmt::Display for YearBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YearBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed365" | "365" | "fixed" => Ok(YearBasis::Fixed365),
            "actual" | "calendar" => Ok(YearBasis::Actual),
            other => Err(format!(
                "unknown year basis '{}' (expected fixed365 or actual)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn fixed_basis_counts_leap_day() {
        let years = YearBasis::Fixed365.years_between(midnight(2020, 1, 1), midnight(2021, 1, 1));
        assert!((years - 366.0 / 365.0).abs() < 1e-12);

        let years = YearBasis::Fixed365.years_between(midnight(2021, 1, 1), midnight(2022, 1, 1));
        assert!((years - 1.0).abs() < 1e-12);
    }

    #[test]
    fn actual_basis_lands_on_whole_years() {
        let years = YearBasis::Actual.years_between(midnight(2020, 1, 1), midnight(2021, 1, 1));
        assert!((years - 1.0).abs() < 1e-12);

        let years = YearBasis::Actual.years_between(midnight(2020, 3, 15), midnight(2025, 3, 15));
        assert!((years - 5.0).abs() < 1e-12);
    }

    #[test]
    fn actual_basis_fractional_part() {
        // 2021-01-01 -> 2021-07-02 is 182 days of a 365-day anniversary year
        let years = YearBasis::Actual.years_between(midnight(2021, 1, 1), midnight(2021, 7, 2));
        assert!((years - 182.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn actual_basis_before_anniversary_month() {
        // Later calendar year but anniversary not reached yet
        let years = YearBasis::Actual.years_between(midnight(2020, 12, 1), midnight(2021, 6, 1));
        assert!(years > 0.0 && years < 1.0);
    }

    #[test]
    fn negative_when_reversed() {
        let fixed = YearBasis::Fixed365.years_between(midnight(2022, 1, 1), midnight(2021, 1, 1));
        assert!((fixed + 1.0).abs() < 1e-12);
        let actual = YearBasis::Actual.years_between(midnight(2022, 1, 1), midnight(2021, 1, 1));
        assert!((actual + 1.0).abs() < 1e-12);
    }

    #[test]
    fn parses_names() {
        assert_eq!("fixed365".parse::<YearBasis>(), Ok(YearBasis::Fixed365));
        assert_eq!("Actual".parse::<YearBasis>(), Ok(YearBasis::Actual));
        assert!("weekly".parse::<YearBasis>().is_err());
    }
}
