//! Mapping calendar dates onto the archive's `(year, day)` keys.
//!
//! Daily products are keyed by ordinal day, monthly composites by the
//! ordinal day their month starts on, and annual composites always
//! by day `001`. Month starts shift by one after February in leap
//! years, so every month owns two day codes.

use crate::{product::Granularity, BlackMarbleError, Product};
use chrono::{Datelike, NaiveDate};
use std::fmt::{self, Display};

/// Day codes a month's composite may be filed under, as
/// `[non-leap, leap]`, indexed by `month - 1`.
const MONTH_DAY_CODES: [[&str; 2]; 12] = [
    ["001", "001"],
    ["032", "032"],
    ["060", "061"],
    ["091", "092"],
    ["121", "122"],
    ["152", "153"],
    ["182", "183"],
    ["213", "214"],
    ["244", "245"],
    ["274", "275"],
    ["305", "306"],
    ["335", "336"],
];

/// Left pads `value` with zeros to two characters.
pub fn pad2(value: impl Display) -> String {
    format!("{value:0>2}")
}

/// Left pads `value` with zeros to three characters.
pub fn pad3(value: impl Display) -> String {
    format!("{value:0>3}")
}

/// Returns the month (1-12) a monthly composite day code belongs to.
pub fn month_of_day_code(day: &str) -> Option<u32> {
    MONTH_DAY_CODES
        .iter()
        .position(|codes| codes.contains(&day))
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

/// Returns both day codes registered for `month`.
pub fn day_codes_for_month(month: u32) -> Option<[&'static str; 2]> {
    let idx = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_DAY_CODES.get(idx).copied()
}

/// A `(year, day code)` pair locating one archive directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchiveKey {
    pub year: i32,
    pub day: String,
}

impl ArchiveKey {
    pub fn new(year: i32, day: impl Display) -> Self {
        Self {
            year,
            day: pad3(day),
        }
    }
}

impl Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year, self.day)
    }
}

/// A requested date, normalized to the product's granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    product: Product,
    /// First day of the period.
    start: NaiveDate,
}

impl Period {
    /// Parses a caller supplied date.
    ///
    /// Daily products take `YYYY-MM-DD`. Monthly products take
    /// `YYYY-MM` or a full date whose day is ignored. Annual products
    /// take `YYYY` or a full date whose month and day are ignored.
    pub fn parse(product: Product, date: &str) -> Result<Self, BlackMarbleError> {
        let date = date.trim();
        let mk_err = || BlackMarbleError::Date {
            product: product.id(),
            date: date.to_string(),
        };
        let full = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        let start = match product.granularity() {
            Granularity::Day => full(date),
            Granularity::Month => full(date)
                .or_else(|| full(&format!("{date}-01")))
                .and_then(|d| d.with_day(1)),
            Granularity::Year => full(date)
                .or_else(|| {
                    let is_year = date.len() == 4 && date.bytes().all(|b| b.is_ascii_digit());
                    is_year.then(|| full(&format!("{date}-01-01"))).flatten()
                })
                .and_then(|d| NaiveDate::from_ymd_opt(d.year(), 1, 1)),
        }
        .ok_or_else(mk_err)?;
        Ok(Self { product, start })
    }

    pub fn product(&self) -> Product {
        self.product
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Normalized name for this period, used to label output bands.
    pub fn label(&self) -> String {
        let fmt = match self.product.granularity() {
            Granularity::Day => "%Y-%m-%d",
            Granularity::Month => "%Y-%m",
            Granularity::Year => "%Y",
        };
        self.start.format(fmt).to_string()
    }

    /// Archive directories which may hold this period's files.
    ///
    /// Monthly periods yield both of the month's day codes (once,
    /// when they coincide).
    pub fn archive_keys(&self) -> Vec<ArchiveKey> {
        let year = self.start.year();
        match self.product.granularity() {
            Granularity::Day => vec![ArchiveKey::new(year, self.start.ordinal())],
            Granularity::Month => {
                let mut keys: Vec<ArchiveKey> = day_codes_for_month(self.start.month())
                    .into_iter()
                    .flatten()
                    .map(|day| ArchiveKey::new(year, day))
                    .collect();
                keys.dedup();
                keys
            }
            Granularity::Year => vec![ArchiveKey::new(year, "001")],
        }
    }

    /// Whether files under `key` belong to this period.
    pub fn covers(&self, key: &ArchiveKey) -> bool {
        key.year == self.start.year()
            && match self.product.granularity() {
                Granularity::Day => key.day == pad3(self.start.ordinal()),
                Granularity::Month => month_of_day_code(&key.day) == Some(self.start.month()),
                Granularity::Year => key.day == "001",
            }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.product, self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        day_codes_for_month, month_of_day_code, pad2, pad3, ArchiveKey, Period, MONTH_DAY_CODES,
    };
    use crate::Product;

    #[test]
    fn test_month_table() {
        let codes: Vec<&str> = MONTH_DAY_CODES.iter().flatten().copied().collect();
        assert_eq!(codes.len(), 24);
        for code in codes {
            let month = month_of_day_code(code).unwrap();
            assert!((1..=12).contains(&month));
            let [non_leap, leap] = day_codes_for_month(month).unwrap();
            assert_eq!(month_of_day_code(non_leap), month_of_day_code(leap));
        }
        assert_eq!(month_of_day_code("060"), Some(3));
        assert_eq!(month_of_day_code("061"), Some(3));
        assert_eq!(month_of_day_code("336"), Some(12));
        assert_eq!(month_of_day_code("002"), None);
        assert_eq!(day_codes_for_month(0), None);
        assert_eq!(day_codes_for_month(13), None);
    }

    #[test]
    fn test_month_codes_match_calendar() {
        use chrono::{Datelike, NaiveDate};
        for month in 1..=12 {
            let [non_leap, leap] = day_codes_for_month(month).unwrap();
            let non_leap_start = NaiveDate::from_ymd_opt(2021, month, 1).unwrap();
            let leap_start = NaiveDate::from_ymd_opt(2020, month, 1).unwrap();
            assert_eq!(non_leap, pad3(non_leap_start.ordinal()));
            assert_eq!(leap, pad3(leap_start.ordinal()));
        }
    }

    #[test]
    fn test_padding() {
        for n in 0..10 {
            assert_eq!(pad2(n), format!("0{n}"));
            assert_eq!(pad3(n), format!("00{n}"));
        }
        for n in 10..100 {
            assert_eq!(pad2(n).len(), 2);
            assert_eq!(pad2(n), n.to_string());
            assert_eq!(pad3(n), format!("0{n}"));
        }
        assert_eq!(pad2("07"), "07");
        assert_eq!(pad3("007"), "007");
        assert_eq!(pad3(pad3(42)), "042");
        assert_eq!(pad3(365), "365");
    }

    #[test]
    fn test_daily() {
        let period = Period::parse(Product::DailyV2, "2021-02-03").unwrap();
        assert_eq!(period.label(), "2021-02-03");
        assert_eq!(period.archive_keys(), vec![ArchiveKey::new(2021, 34)]);
        assert_eq!(period.archive_keys()[0].day, "034");
        assert!(Period::parse(Product::DailyV1, "2021-02").is_err());
        assert!(Period::parse(Product::DailyV1, "2021-02-30").is_err());
    }

    #[test]
    fn test_monthly() {
        let period = Period::parse(Product::Monthly, "2021-03").unwrap();
        assert_eq!(period.label(), "2021-03");
        assert_eq!(
            period.archive_keys(),
            vec![ArchiveKey::new(2021, "060"), ArchiveKey::new(2021, "061")]
        );
        assert!(period.covers(&ArchiveKey::new(2021, "061")));
        assert!(!period.covers(&ArchiveKey::new(2021, "091")));
        assert!(!period.covers(&ArchiveKey::new(2020, "060")));

        let with_day = Period::parse(Product::Monthly, "2021-03-17").unwrap();
        assert_eq!(with_day, period);

        let january = Period::parse(Product::Monthly, "2021-01").unwrap();
        assert_eq!(january.archive_keys(), vec![ArchiveKey::new(2021, "001")]);
        assert!(Period::parse(Product::Monthly, "2021-13").is_err());
    }

    #[test]
    fn test_annual() {
        let period = Period::parse(Product::Annual, "2019").unwrap();
        assert_eq!(period.label(), "2019");
        assert_eq!(period.archive_keys(), vec![ArchiveKey::new(2019, 1)]);
        assert_eq!(Period::parse(Product::Annual, "2019-07-04").unwrap(), period);
        assert!(Period::parse(Product::Annual, "19").is_err());
        assert!(Period::parse(Product::Annual, "twenty").is_err());
    }
}
