//! Notification cadences and their calendar predicates.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// How often a user wants to receive irrigation digests.
///
/// Variants are listed in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cadence {
    Daily,
    EveryTwoDays,
    EveryThreeDays,
    EveryFourDays,
    EveryFiveDays,
    Weekly,
    EveryTenDays,
    Monthly,
}

impl Cadence {
    pub const ALL: [Self; 8] = [
        Self::Daily,
        Self::EveryTwoDays,
        Self::EveryThreeDays,
        Self::EveryFourDays,
        Self::EveryFiveDays,
        Self::Weekly,
        Self::EveryTenDays,
        Self::Monthly,
    ];

    /// Stored preference code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::EveryTwoDays => "2D",
            Self::EveryThreeDays => "3D",
            Self::EveryFourDays => "4D",
            Self::EveryFiveDays => "5D",
            Self::Weekly => "7D",
            Self::EveryTenDays => "10D",
            Self::Monthly => "30D",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::EveryTwoDays => "Every two days",
            Self::EveryThreeDays => "Every three days",
            Self::EveryFourDays => "Every four days",
            Self::EveryFiveDays => "Every five days",
            Self::Weekly => "Weekly",
            Self::EveryTenDays => "Every ten days",
            Self::Monthly => "Monthly",
        }
    }

    /// Whether a digest is due on `date`.
    ///
    /// The N-day cadences count days from 0001-01-01, which is day 1.
    pub fn is_due(self, date: NaiveDate) -> bool {
        let every = |n: i32| date.num_days_from_ce().rem_euclid(n) == 0;
        match self {
            Self::Daily => true,
            Self::EveryTwoDays => every(2),
            Self::EveryThreeDays => every(3),
            Self::EveryFourDays => every(4),
            Self::EveryFiveDays => every(5),
            Self::Weekly => date.weekday() == Weekday::Mon,
            Self::EveryTenDays => matches!(date.day(), 1 | 11 | 21),
            Self::Monthly => date.day() == 1,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification cadence: {0:?}")]
pub struct UnknownCadence(pub String);

impl FromStr for Cadence {
    type Err = UnknownCadence;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| UnknownCadence(code.to_owned()))
    }
}

impl TryFrom<String> for Cadence {
    type Error = UnknownCadence;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cadence> for String {
    fn from(value: Cadence) -> Self {
        value.code().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn ordinal_matches_proleptic_day_count() {
        assert_eq!(date(1, 1, 1).num_days_from_ce(), 1);
        // 2024-01-01 has ordinal 738886.
        assert_eq!(date(2024, 1, 1).num_days_from_ce(), 738_886);
    }

    #[rstest]
    #[case(date(2024, 1, 1), true)]
    #[case(date(2024, 1, 2), false)]
    #[case(date(2024, 1, 3), true)]
    fn every_two_days_follows_ordinal_parity(#[case] day: NaiveDate, #[case] due: bool) {
        assert_eq!(Cadence::EveryTwoDays.is_due(day), due);
        assert_eq!(day.num_days_from_ce() % 2 == 0, due);
    }

    #[test]
    fn weekly_is_due_only_on_mondays() {
        let monday = date(2024, 1, 1);
        for offset in 0..7 {
            let day = monday + chrono::Days::new(offset);
            assert_eq!(Cadence::Weekly.is_due(day), offset == 0, "{day}");
        }
    }

    #[rstest]
    #[case(1, true)]
    #[case(11, true)]
    #[case(21, true)]
    #[case(31, false)]
    #[case(10, false)]
    fn ten_day_cadence_uses_day_of_month(#[case] day: u32, #[case] due: bool) {
        assert_eq!(Cadence::EveryTenDays.is_due(date(2024, 1, day)), due);
    }

    #[test]
    fn monthly_and_daily() {
        assert!(Cadence::Monthly.is_due(date(2024, 3, 1)));
        assert!(!Cadence::Monthly.is_due(date(2024, 3, 2)));
        assert!(Cadence::Daily.is_due(date(2024, 3, 2)));
    }

    #[test]
    fn n_day_cadences_fire_once_per_period() {
        let start = date(2024, 5, 1);
        for (cadence, n) in [
            (Cadence::EveryThreeDays, 3),
            (Cadence::EveryFourDays, 4),
            (Cadence::EveryFiveDays, 5),
        ] {
            let due = (0..n)
                .filter(|i| cadence.is_due(start + chrono::Days::new(*i)))
                .count();
            assert_eq!(due, 1, "{cadence}");
        }
    }

    #[test]
    fn codes_and_labels_are_stable() {
        let codes: Vec<_> = Cadence::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, ["D", "2D", "3D", "4D", "5D", "7D", "10D", "30D"]);
        assert_eq!(Cadence::Weekly.label(), "Weekly");
        assert_eq!("10D".parse(), Ok(Cadence::EveryTenDays));
        assert!("".parse::<Cadence>().is_err());
    }
}
