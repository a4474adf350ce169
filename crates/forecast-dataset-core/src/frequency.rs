//! Sampling frequencies.
//!
//! A [`Frequency`] is the calendar grid a series is sampled on. It is always
//! supplied by the caller (datasets never infer it) and is parsed from the
//! short pandas-style aliases used in dataset metadata:
//!
//! | alias            | meaning                         | alignment         |
//! |------------------|---------------------------------|-------------------|
//! | `S`              | seconds                         | floor             |
//! | `T`, `min`       | minutes                         | floor             |
//! | `H`              | hours                           | floor             |
//! | `D`              | calendar days                   | floor             |
//! | `B`              | business days                   | left as-is        |
//! | `W`, `W-<DAY>`   | weeks ending on `<DAY>`         | rollback          |
//! | `M`              | month end                       | rollback          |
//! | `MS`             | month start                     | rollback          |
//!
//! Every alias may carry a positive multiple, for example `5min` or `2H`.
//! `W` is shorthand for `W-SUN`.

use std::{fmt, str::FromStr};

use chrono::Weekday;
use snafu::prelude::*;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum ParseFrequencyError {
    /// The frequency string was empty.
    #[snafu(display("empty frequency string"))]
    Empty,

    /// The multiple in front of the alias was zero or did not fit in a `u32`.
    #[snafu(display("invalid multiple in frequency '{spec}'"))]
    InvalidMultiple {
        /// The full frequency string as supplied.
        spec: String,
    },

    /// The alias is not one of the supported frequencies.
    #[snafu(display("unsupported frequency '{spec}'"))]
    UnknownAlias {
        /// The full frequency string as supplied.
        spec: String,
    },
}

/// Base unit of a [`Frequency`], without its multiple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyUnit {
    /// Seconds (`S`).
    Second,
    /// Minutes (`T` or `min`).
    Minute,
    /// Hours (`H`).
    Hour,
    /// Calendar days (`D`).
    Day,
    /// Business days, Monday to Friday (`B`).
    BusinessDay,
    /// Weeks anchored on the given weekday (`W-<DAY>`).
    Week(Weekday),
    /// Last day of each month (`M`).
    MonthEnd,
    /// First day of each month (`MS`).
    MonthStart,
}

/// A sampling frequency: a base unit and a positive multiple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    multiple: u32,
    unit: FrequencyUnit,
}

impl Frequency {
    /// Build a frequency from a unit and a multiple.
    ///
    /// A zero multiple is bumped to 1.
    pub fn new(multiple: u32, unit: FrequencyUnit) -> Self {
        Frequency {
            multiple: multiple.max(1),
            unit,
        }
    }

    /// Frequency of one `unit`.
    pub fn of(unit: FrequencyUnit) -> Self {
        Frequency::new(1, unit)
    }

    /// The multiple in front of the base unit.
    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    /// The base unit.
    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    /// Canonical name of the base unit, without the multiple
    /// (`"D"`, `"W-SUN"`, `"M"`, ...).
    pub fn name(&self) -> &'static str {
        match self.unit {
            FrequencyUnit::Second => "S",
            FrequencyUnit::Minute => "T",
            FrequencyUnit::Hour => "H",
            FrequencyUnit::Day => "D",
            FrequencyUnit::BusinessDay => "B",
            FrequencyUnit::Week(day) => week_alias(day),
            FrequencyUnit::MonthEnd => "M",
            FrequencyUnit::MonthStart => "MS",
        }
    }

    /// Whether timestamps on this grid are aligned by rolling back to an
    /// anchor (month end, month start, week day) rather than by flooring.
    pub fn is_anchored(&self) -> bool {
        matches!(
            self.unit,
            FrequencyUnit::Week(_) | FrequencyUnit::MonthEnd | FrequencyUnit::MonthStart
        )
    }

    /// Whether this is a business-day frequency.
    pub fn is_business_day(&self) -> bool {
        self.unit == FrequencyUnit::BusinessDay
    }

    /// Width of one period in whole seconds, for fixed-width frequencies.
    ///
    /// Returns `None` for calendar-dependent frequencies (business days,
    /// weeks, months).
    pub fn fixed_seconds(&self) -> Option<i64> {
        let unit_secs = match self.unit {
            FrequencyUnit::Second => 1,
            FrequencyUnit::Minute => SECONDS_PER_MINUTE,
            FrequencyUnit::Hour => SECONDS_PER_HOUR,
            FrequencyUnit::Day => SECONDS_PER_DAY,
            _ => return None,
        };
        Some(unit_secs * i64::from(self.multiple))
    }
}

fn week_alias(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "W-MON",
        Weekday::Tue => "W-TUE",
        Weekday::Wed => "W-WED",
        Weekday::Thu => "W-THU",
        Weekday::Fri => "W-FRI",
        Weekday::Sat => "W-SAT",
        Weekday::Sun => "W-SUN",
    }
}

fn parse_unit(alias: &str) -> Option<FrequencyUnit> {
    let unit = match alias {
        "S" | "s" => FrequencyUnit::Second,
        "T" | "min" => FrequencyUnit::Minute,
        "H" | "h" => FrequencyUnit::Hour,
        "D" | "d" => FrequencyUnit::Day,
        "B" => FrequencyUnit::BusinessDay,
        "W" => FrequencyUnit::Week(Weekday::Sun),
        "M" => FrequencyUnit::MonthEnd,
        "MS" => FrequencyUnit::MonthStart,
        _ => {
            let day = alias.strip_prefix("W-")?;
            let day = match day {
                "MON" => Weekday::Mon,
                "TUE" => Weekday::Tue,
                "WED" => Weekday::Wed,
                "THU" => Weekday::Thu,
                "FRI" => Weekday::Fri,
                "SAT" => Weekday::Sat,
                "SUN" => Weekday::Sun,
                _ => return None,
            };
            FrequencyUnit::Week(day)
        }
    };
    Some(unit)
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        ensure!(!spec.is_empty(), EmptySnafu);

        let split = spec
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(spec.len());
        let (digits, alias) = spec.split_at(split);

        let multiple = if digits.is_empty() {
            1
        } else {
            match digits.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return InvalidMultipleSnafu { spec }.fail(),
            }
        };

        let unit = parse_unit(alias).context(UnknownAliasSnafu { spec })?;
        Ok(Frequency { multiple, unit })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiple == 1 {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}{}", self.multiple, self.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_aliases() {
        let day: Frequency = "D".parse().unwrap();
        assert_eq!(day, Frequency::of(FrequencyUnit::Day));

        let month: Frequency = "M".parse().unwrap();
        assert_eq!(month.unit(), FrequencyUnit::MonthEnd);
        assert!(month.is_anchored());

        let bday: Frequency = "B".parse().unwrap();
        assert!(bday.is_business_day());
        assert_eq!(bday.fixed_seconds(), None);
    }

    #[test]
    fn parses_multiples() {
        let f: Frequency = "5min".parse().unwrap();
        assert_eq!(f.multiple(), 5);
        assert_eq!(f.unit(), FrequencyUnit::Minute);
        assert_eq!(f.fixed_seconds(), Some(300));

        let h: Frequency = "12H".parse().unwrap();
        assert_eq!(h.fixed_seconds(), Some(12 * 3600));
    }

    #[test]
    fn weekly_defaults_to_sunday_anchor() {
        let w: Frequency = "W".parse().unwrap();
        assert_eq!(w.unit(), FrequencyUnit::Week(Weekday::Sun));
        assert_eq!(w.name(), "W-SUN");
        assert_eq!(w, "W-SUN".parse().unwrap());

        let w_mon: Frequency = "W-MON".parse().unwrap();
        assert_eq!(w_mon.unit(), FrequencyUnit::Week(Weekday::Mon));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!("W".parse::<Frequency>().unwrap().to_string(), "W-SUN");
        assert_eq!("min".parse::<Frequency>().unwrap().to_string(), "T");
        assert_eq!("3D".parse::<Frequency>().unwrap().to_string(), "3D");
        assert_eq!("MS".parse::<Frequency>().unwrap().to_string(), "MS");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Frequency>(), Err(ParseFrequencyError::Empty));
        assert!(matches!(
            "0D".parse::<Frequency>(),
            Err(ParseFrequencyError::InvalidMultiple { .. })
        ));
        assert!(matches!(
            "fortnight".parse::<Frequency>(),
            Err(ParseFrequencyError::UnknownAlias { .. })
        ));
        assert!(matches!(
            "W-XYZ".parse::<Frequency>(),
            Err(ParseFrequencyError::UnknownAlias { .. })
        ));
    }
}
