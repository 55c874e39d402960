//! Decimal policy for a calculation: fixed scale, explicit rounding mode, and the
//! step-escalation helper shared by fees, staff CPI and rent.
//!
//! A `NumericContext` is bound once per run and handed to every call site that
//! emits a currency value. There is no process-wide precision setting, so runs
//! with different contexts can execute side by side.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;
use crate::types::{Money, Rate};
use crate::ProjectionResult;

pub const ZERO: Decimal = Decimal::ZERO;
pub const ONE: Decimal = Decimal::ONE;
pub const HUNDRED: Decimal = dec!(100);

/// Standard zakat rate (2.5%).
pub const DEFAULT_ZAKAT_RATE: Rate = dec!(0.025);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Midpoints round away from zero (1.005 -> 1.01, -1.005 -> -1.01).
    #[default]
    HalfUp,
    /// Banker's rounding.
    HalfEven,
}

impl RoundingPolicy {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingPolicy::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingPolicy::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericContext {
    /// Decimal places kept on every emitted currency value
    pub decimal_places: u32,
    pub rounding: RoundingPolicy,
}

impl Default for NumericContext {
    fn default() -> Self {
        NumericContext {
            decimal_places: 2,
            rounding: RoundingPolicy::HalfUp,
        }
    }
}

impl NumericContext {
    pub fn round(&self, value: Money) -> Money {
        value.round_dp_with_strategy(self.decimal_places, self.rounding.strategy())
    }

    /// Round to a whole unit (students, headcount).
    pub fn round_whole(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(0, self.rounding.strategy())
    }
}

/// `base * (1 + rate)^floor(years_elapsed / frequency)`.
///
/// A step function: the value is flat inside each `frequency`-year block and
/// jumps by exactly `(1 + rate)` at block boundaries. A zero frequency is
/// treated as "never escalate"; callers reject it earlier as a config error.
/// Growth that leaves the Decimal range is an `InvalidInput` error.
pub fn step_escalation(
    base: Money,
    rate: Rate,
    years_elapsed: u32,
    frequency: u32,
) -> ProjectionResult<Money> {
    if frequency == 0 || rate.is_zero() {
        return Ok(base);
    }
    let steps = years_elapsed / frequency;
    compound(rate, steps)
        .and_then(|factor| base.checked_mul(factor))
        .ok_or_else(|| ProjectionError::InvalidInput {
            field: "growth_rate".into(),
            reason: format!("escalating {base} at {rate} for {steps} steps overflows"),
        })
}

/// `(1 + rate)^n` by repeated multiplication, exact in Decimal. `None` once
/// the factor no longer fits.
pub fn compound(rate: Rate, n: u32) -> Option<Decimal> {
    let one_plus_r = ONE + rate;
    (0..n).try_fold(ONE, |factor, _| factor.checked_mul(one_plus_r))
}

/// Divide, returning zero when the denominator is zero.
pub fn safe_divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        ZERO
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        let ctx = NumericContext::default();
        assert_eq!(ctx.round(dec!(1.005)), dec!(1.01));
        assert_eq!(ctx.round(dec!(1.004)), dec!(1.00));
        assert_eq!(ctx.round(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn test_round_half_even() {
        let ctx = NumericContext {
            decimal_places: 2,
            rounding: RoundingPolicy::HalfEven,
        };
        assert_eq!(ctx.round(dec!(1.005)), dec!(1.00));
        assert_eq!(ctx.round(dec!(1.015)), dec!(1.02));
    }

    #[test]
    fn test_round_whole() {
        let ctx = NumericContext::default();
        assert_eq!(ctx.round_whole(dec!(950.5)), dec!(951));
        assert_eq!(ctx.round_whole(dec!(950.49)), dec!(950));
    }

    #[test]
    fn test_step_escalation_blocks() {
        // 3-year blocks at 10%
        let base = dec!(1000);
        assert_eq!(step_escalation(base, dec!(0.10), 0, 3).unwrap(), dec!(1000));
        assert_eq!(step_escalation(base, dec!(0.10), 2, 3).unwrap(), dec!(1000));
        assert_eq!(step_escalation(base, dec!(0.10), 3, 3).unwrap(), dec!(1100));
        assert_eq!(step_escalation(base, dec!(0.10), 5, 3).unwrap(), dec!(1100));
        assert_eq!(step_escalation(base, dec!(0.10), 6, 3).unwrap(), dec!(1210));
    }

    #[test]
    fn test_step_escalation_zero_frequency_is_flat() {
        assert_eq!(step_escalation(dec!(500), dec!(0.05), 10, 0).unwrap(), dec!(500));
    }

    #[test]
    fn test_step_escalation_overflow_is_an_error() {
        let err = step_escalation(dec!(50000000), dec!(5), 50, 1).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_compound_out_of_range() {
        assert_eq!(compound(dec!(0.10), 2), Some(dec!(1.21)));
        assert_eq!(compound(dec!(100), 30), None);
    }

    #[test]
    fn test_safe_divide_zero_denominator() {
        assert_eq!(safe_divide(dec!(10), ZERO), ZERO);
        assert_eq!(safe_divide(dec!(10), dec!(4)), dec!(2.5));
    }
}
