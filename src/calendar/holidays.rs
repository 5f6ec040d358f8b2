//! Literal holiday tables, one per domain.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::domain::Domain;

/// Years covered by both tables. Generation is only supported for these.
pub const COVERED_YEARS: std::ops::RangeInclusive<i32> = 2024..=2025;

const POS_HOLIDAYS: &[(i32, u32, u32)] = &[
    (2024, 1, 1),
    (2024, 2, 14),
    (2024, 5, 12),
    (2024, 5, 27),
    (2024, 6, 16),
    (2024, 7, 4),
    (2024, 9, 2),
    (2024, 10, 31),
    (2024, 11, 28),
    (2024, 11, 29),
    (2024, 12, 25),
    (2025, 1, 1),
    (2025, 2, 14),
    (2025, 2, 17),
    (2025, 5, 11),
    (2025, 5, 26),
    (2025, 6, 15),
    (2025, 7, 4),
    (2025, 9, 1),
    (2025, 10, 31),
    (2025, 11, 27),
    (2025, 11, 28),
    (2025, 12, 25),
];

const ECOMMERCE_HOLIDAYS: &[(i32, u32, u32)] = &[
    (2024, 1, 1),   // New Year's Day
    (2024, 2, 14),  // Valentine's Day
    (2024, 5, 12),  // Mother's Day
    (2024, 5, 27),  // Memorial Day
    (2024, 6, 16),  // Father's Day
    (2024, 7, 4),   // Independence Day
    (2024, 9, 2),   // Labor Day
    (2024, 11, 28), // Thanksgiving
    (2024, 11, 29), // Black Friday
    (2024, 12, 2),  // Cyber Monday
    (2024, 12, 25), // Christmas Day
    (2025, 1, 1),
    (2025, 2, 14),
    (2025, 2, 17), // Presidents' Day
    (2025, 5, 11),
    (2025, 5, 26),
    (2025, 6, 15),
    (2025, 7, 4),
    (2025, 9, 1),
    (2025, 11, 27),
    (2025, 11, 28),
    (2025, 12, 1),
    (2025, 12, 25),
];

fn build(entries: &[(i32, u32, u32)]) -> HashSet<NaiveDate> {
    entries
        .iter()
        .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .collect()
}

/// The holiday set for a domain, built once on first use.
pub fn table(domain: Domain) -> &'static HashSet<NaiveDate> {
    static POS: OnceLock<HashSet<NaiveDate>> = OnceLock::new();
    static ECOMMERCE: OnceLock<HashSet<NaiveDate>> = OnceLock::new();
    match domain {
        Domain::Pos => POS.get_or_init(|| build(POS_HOLIDAYS)),
        Domain::Ecommerce => ECOMMERCE.get_or_init(|| build(ECOMMERCE_HOLIDAYS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_literal_entry_is_a_valid_date() {
        assert_eq!(table(Domain::Pos).len(), POS_HOLIDAYS.len());
        assert_eq!(table(Domain::Ecommerce).len(), ECOMMERCE_HOLIDAYS.len());
    }

    #[test]
    fn test_tables_stay_within_covered_years() {
        use chrono::Datelike;
        for domain in [Domain::Pos, Domain::Ecommerce] {
            assert!(table(domain).iter().all(|d| COVERED_YEARS.contains(&d.year())));
        }
    }
}
