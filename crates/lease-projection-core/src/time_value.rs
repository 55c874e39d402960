use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ProjectionError;
use crate::numeric::compound;
use crate::types::{Money, Rate};
use crate::ProjectionResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const IRR_FLOOR: Rate = dec!(-0.99);
const IRR_CEILING: Rate = dec!(10);

/// Net Present Value with end-of-year discounting: the first flow is discounted
/// one full period, `sum(cf_t / (1+r)^t)` for t = 1..=n.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ProjectionResult<Money> {
    if rate <= dec!(-1) {
        return Err(ProjectionError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut result = Decimal::ZERO;

    for cf in cash_flows {
        discount = discount
            .checked_mul(one_plus_r)
            .ok_or_else(|| out_of_range(rate, cash_flows.len()))?;
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| out_of_range(rate, cash_flows.len()))?;
    }

    Ok(result)
}

/// Internal Rate of Return using Newton-Raphson on `sum(cf_t / (1+r)^t)`,
/// t starting at 0. A root whose discount factors leave the Decimal range
/// is reported as not found.
pub fn irr(cash_flows: &[Money], guess: Rate) -> ProjectionResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(ProjectionError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !(has_positive && has_negative) {
        return Err(ProjectionError::InsufficientData(
            "IRR requires at least one sign change in the cash flows".into(),
        ));
    }

    let mut rate = guess;
    let mut last_npv = Decimal::ZERO;

    for i in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = npv_with_derivative(cash_flows, rate).ok_or_else(|| {
            ProjectionError::InsufficientData(format!(
                "IRR search left the decimal range at rate {rate} after {i} iterations"
            ))
        })?;
        last_npv = npv_val;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        if dnpv.is_zero() {
            return Err(ProjectionError::InsufficientData(format!(
                "IRR derivative vanished after {i} iterations"
            )));
        }

        rate = npv_val
            .checked_div(dnpv)
            .and_then(|step| rate.checked_sub(step))
            .ok_or_else(|| {
                ProjectionError::InsufficientData(format!(
                    "IRR step overflowed after {i} iterations"
                ))
            })?
            .clamp(IRR_FLOOR, IRR_CEILING);
    }

    Err(ProjectionError::InsufficientData(format!(
        "IRR did not converge after {MAX_IRR_ITERATIONS} iterations (npv {last_npv})"
    )))
}

/// NPV at `rate` (t from 0) and its derivative in `rate`, or `None` when a
/// term does not fit in a Decimal.
fn npv_with_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        if discount.is_zero() {
            continue;
        }
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let term = Decimal::from(t as i64)
                .checked_mul(*cf)?
                .checked_div(discount.checked_mul(one_plus_r)?)?;
            dnpv = dnpv.checked_sub(term)?;
        }
    }
    Some((npv_val, dnpv))
}

fn out_of_range(rate: Rate, periods: usize) -> ProjectionError {
    ProjectionError::InvalidInput {
        field: "rate".into(),
        reason: format!("discounting {periods} periods at {rate} leaves the decimal range"),
    }
}

/// Level annuity payment that recovers `principal` over `periods` at `rate`:
/// `P * r / (1 - (1+r)^-n)`. A zero rate degenerates to straight recovery
/// `P / n`; a factor too large to represent gives the perpetuity `P * r`.
pub fn annuity_payment(principal: Money, rate: Rate, periods: u32) -> Money {
    if principal <= Decimal::ZERO || periods == 0 {
        return Decimal::ZERO;
    }
    if rate.is_zero() {
        return principal / Decimal::from(periods);
    }

    let Some(factor) = compound(rate, periods) else {
        return principal * rate;
    };

    // P * r / (1 - (1+r)^-n)
    match Decimal::ONE.checked_div(factor) {
        Some(inv) if inv != Decimal::ONE => principal * rate / (Decimal::ONE - inv),
        _ => principal / Decimal::from(periods),
    }
}

/// Convert an NPV into the level annual amount with the same present value:
/// `npv * r / (1 - (1+r)^-n)`; `npv / n` at a zero rate.
pub fn annualize(npv_value: Money, rate: Rate, periods: u32) -> ProjectionResult<Money> {
    if periods == 0 {
        return Err(ProjectionError::InvalidInput {
            field: "periods".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }
    if rate <= dec!(-1) {
        return Err(ProjectionError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if rate.is_zero() {
        return Ok(npv_value / Decimal::from(periods));
    }

    let overflow = || out_of_range(rate, periods as usize);
    let factor = compound(rate, periods).ok_or_else(overflow)?;
    let denominator = Decimal::ONE
        .checked_div(factor)
        .map(|inv| Decimal::ONE - inv)
        .ok_or_else(overflow)?;
    if denominator.is_zero() {
        return Ok(npv_value / Decimal::from(periods));
    }
    npv_value
        .checked_mul(rate)
        .and_then(|v| v.checked_div(denominator))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_end_of_year() {
        // 110 received at the end of year 1 at 10% is worth 100 today
        let result = npv(dec!(0.10), &[dec!(110)]).unwrap();
        assert_eq!(result, dec!(100));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_below_minus_one() {
        assert!(npv(dec!(-1), &[dec!(1)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_requires_sign_change() {
        let cfs = vec![dec!(100), dec!(100), dec!(100)];
        assert!(irr(&cfs, dec!(0.1)).is_err());
    }

    #[test]
    fn test_irr_with_unrepresentable_root_is_not_found() {
        // A tiny outlay against huge inflows: the root sits where (1+r)^29
        // no longer fits in a Decimal
        let mut cfs = vec![dec!(-1000)];
        cfs.extend(std::iter::repeat(dec!(5000000)).take(29));
        let err = irr(&cfs, dec!(0.10)).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_npv_out_of_range_rate_is_an_error() {
        let flows = vec![dec!(1000000); 30];
        let err = npv(dec!(20), &flows).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_annualize_out_of_range_rate_is_an_error() {
        assert!(annualize(dec!(1000000), dec!(20), 30).is_err());
    }

    #[test]
    fn test_annuity_payment_zero_rate_is_capital_recovery() {
        assert_eq!(annuity_payment(dec!(3000), Decimal::ZERO, 30), dec!(100));
    }

    #[test]
    fn test_annuity_payment_positive_rate() {
        // 1000 over 2 periods at 10%: 1000 * 0.1 * 1.21 / 0.21 = 576.19...
        let pmt = annuity_payment(dec!(1000), dec!(0.10), 2);
        assert!((pmt - dec!(576.19)).abs() < dec!(0.01));
    }

    #[test]
    fn test_annualize_inverts_npv_of_level_series() {
        let level = vec![dec!(250); 10];
        let pv = npv(dec!(0.08), &level).unwrap();
        let annual = annualize(pv, dec!(0.08), 10).unwrap();
        assert!((annual - dec!(250)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_annualize_zero_rate() {
        assert_eq!(annualize(dec!(1000), Decimal::ZERO, 4).unwrap(), dec!(250));
    }

    #[test]
    fn test_annualize_zero_periods_rejected() {
        assert!(annualize(dec!(1000), dec!(0.05), 0).is_err());
    }
}
