//! Label date parsing
//!
//! Label documents encode dates as `yyyyMMdd`, sometimes with a time and
//! zone suffix (`20211216000000-0500`) and sometimes truncated to a month
//! or a year.

use chrono::{Datelike, NaiveDate};

/// Calendar date a fact was observed on
pub type LabelDate = NaiveDate;

/// Earliest year accepted as a plausible label date
pub const VALID_START_YEAR: i32 = 1910;

/// Latest year accepted as a plausible label date
pub const VALID_END_YEAR: i32 = 2100;

/// Normalize a raw label timestamp to `yyyyMMdd`.
///
/// Non-digits are dropped. Fourteen or more digits are truncated to the
/// date part, six digits get day `01`, four digits get `0101`. Any other
/// length yields `None`.
pub fn normalize_to_yyyymmdd(raw: &str) -> Option<String> {
    let digits: String = raw.trim().chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        n if n >= 14 => Some(digits[..8].to_string()),
        8 => Some(digits),
        6 => Some(format!("{}01", digits)),
        4 => Some(format!("{}0101", digits)),
        _ => None,
    }
}

/// Parse a raw label timestamp into a date.
///
/// Accepts everything [`normalize_to_yyyymmdd`] accepts as well as ISO
/// `yyyy-MM-dd`. Dates outside the plausible year range are rejected.
pub fn parse_label_date(raw: &str) -> Option<LabelDate> {
    let normalized = normalize_to_yyyymmdd(raw)?;
    let date = NaiveDate::parse_from_str(&normalized, "%Y%m%d").ok()?;
    is_plausible(date).then_some(date)
}

/// Whether a date falls within the plausible label year range
pub fn is_plausible(date: LabelDate) -> bool {
    (VALID_START_YEAR..=VALID_END_YEAR).contains(&date.year())
}

/// Earlier of two optional dates; a missing date never wins
pub fn earliest(a: Option<LabelDate>, b: Option<LabelDate>) -> Option<LabelDate> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants() {
        assert_eq!(normalize_to_yyyymmdd("20211216"), Some("20211216".to_string()));
        assert_eq!(normalize_to_yyyymmdd("20211216000000-0500"), Some("20211216".to_string()));
        assert_eq!(normalize_to_yyyymmdd("202112"), Some("20211201".to_string()));
        assert_eq!(normalize_to_yyyymmdd("2021"), Some("20210101".to_string()));
        assert_eq!(normalize_to_yyyymmdd("2021-12-16"), Some("20211216".to_string()));
        assert_eq!(normalize_to_yyyymmdd("21"), None);
    }

    #[test]
    fn test_parse_rejects_implausible_years() {
        assert!(parse_label_date("18000101").is_none());
        assert!(parse_label_date("20231301").is_none());
        assert_eq!(
            parse_label_date("2019-01-15"),
            NaiveDate::from_ymd_opt(2019, 1, 15)
        );
    }

    #[test]
    fn test_earliest_ignores_missing() {
        let d1 = NaiveDate::from_ymd_opt(2019, 1, 15);
        let d2 = NaiveDate::from_ymd_opt(2018, 12, 31);
        assert_eq!(earliest(d1, d2), d2);
        assert_eq!(earliest(d1, None), d1);
        assert_eq!(earliest(None, None), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: normalizing an already normalized value is a no-op
        #[test]
        fn test_normalize_idempotent(raw in "[0-9 :-]{0,20}") {
            if let Some(once) = normalize_to_yyyymmdd(&raw) {
                prop_assert_eq!(normalize_to_yyyymmdd(&once), Some(once.clone()));
                prop_assert_eq!(once.len(), 8);
            }
        }

        /// Property: earliest is commutative
        #[test]
        fn test_earliest_commutative(a in 0i64..40_000, b in 0i64..40_000) {
            let base = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
            let da = base.checked_add_signed(chrono::Duration::days(a));
            let db = base.checked_add_signed(chrono::Duration::days(b));
            prop_assert_eq!(earliest(da, db), earliest(db, da));
        }
    }
}
