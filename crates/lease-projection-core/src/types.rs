use serde::{Deserialize, Serialize};

use rust_decimal::Decimal;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Fiscal year, e.g. 2028.
pub type Year = i32;

/// Which calculator produced a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Historical,
    Transition,
    Dynamic,
}

/// Inclusive range of contract years. Every year inside it is a dynamic period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractWindow {
    pub start_year: Year,
    pub end_year: Year,
}

impl ContractWindow {
    pub fn contains(&self, year: Year) -> bool {
        year >= self.start_year && year <= self.end_year
    }

    /// Number of contract years (inclusive of both ends).
    pub fn term_years(&self) -> u32 {
        if self.end_year < self.start_year {
            0
        } else {
            (self.end_year - self.start_year + 1) as u32
        }
    }

    /// Whole years elapsed since the contract start; zero before it.
    pub fn years_elapsed(&self, year: Year) -> u32 {
        if year <= self.start_year {
            0
        } else {
            (year - self.start_year) as u32
        }
    }

    pub fn years(&self) -> impl Iterator<Item = Year> {
        self.start_year..=self.end_year
    }
}
