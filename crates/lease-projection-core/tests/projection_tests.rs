use lease_projection_core::capex::{
    AssetCategory, AutoReinvestment, CapExConfig, DepreciationRegime, ReinvestmentAmount,
};
use lease_projection_core::config::{
    CircularSolverConfig, SystemConfiguration, ValidationConfig, ValuationConfig,
};
use lease_projection_core::numeric::NumericContext;
use lease_projection_core::periods::dynamic::{
    CurriculumConfig, CurriculumProgram, DynamicPeriodInput, EnrollmentConfig, StaffConfig,
};
use lease_projection_core::periods::historical::{HistoricalPeriodInput, ProfitAndLossSnapshot};
use lease_projection_core::periods::transition::TransitionPeriodInput;
use lease_projection_core::rent::RentParams;
use lease_projection_core::statements::{BalanceSnapshot, CashFlowBasis, Period};
use lease_projection_core::working_capital::WorkingCapitalRatios;
use lease_projection_core::{
    run_projection, run_with_timeout, ContractWindow, PeriodKind, ProjectionInput,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn historical(year: i32) -> HistoricalPeriodInput {
    HistoricalPeriodInput {
        year,
        immutable: true,
        profit_and_loss: ProfitAndLossSnapshot {
            revenue: dec!(60000000),
            other_revenue: dec!(3000000),
            rent: dec!(9000000),
            staff_costs: dec!(30000000),
            other_opex: dec!(8000000),
            depreciation: dec!(2000000),
            interest: dec!(0),
            zakat: dec!(275000),
        },
        balance_sheet: BalanceSnapshot {
            cash: dec!(6000000),
            receivables: dec!(2850000),
            prepaid: dec!(570000),
            gross_ppe: dec!(40000000),
            accumulated_depreciation: dec!(16000000),
            payables: dec!(2280000),
            accrued: dec!(1140000),
            deferred_revenue: dec!(7200000),
            debt: dec!(0),
            // 6 + 2.85 + 0.57 + 24 - (2.28 + 1.14 + 7.2)
            equity: dec!(22800000),
        },
    }
}

fn dynamic(students: i64, rent: RentParams) -> DynamicPeriodInput {
    DynamicPeriodInput {
        enrollment: EnrollmentConfig {
            ramp_up_enabled: false,
            ramp_start_year: 2025,
            ramp_end_year: 2027,
            steady_state_students: students,
            ramp_curve: None,
            grade_distribution: vec![],
        },
        curriculum: CurriculumConfig {
            programs: vec![CurriculumProgram {
                name: "National".into(),
                enabled: true,
                base_fee: dec!(40000),
                growth_rate: Decimal::ZERO,
                growth_frequency_years: 1,
                start_year: None,
                student_share: Decimal::ONE,
            }],
        },
        staff: StaffConfig {
            fixed_cost: dec!(15000000),
            variable_cost_per_student: dec!(10000),
            cpi_rate: dec!(0.02),
            cpi_frequency_years: 1,
        },
        other_opex_percent: dec!(0.10),
        rent,
    }
}

fn fixed_rent(base: Decimal, growth: Decimal, frequency: u32) -> RentParams {
    RentParams::FixedEscalation {
        base_rent: base,
        growth_rate: growth,
        frequency,
    }
}

fn base_input() -> ProjectionInput {
    ProjectionInput {
        system: SystemConfiguration::default(),
        numeric: NumericContext::default(),
        historical: vec![historical(2023), historical(2024)],
        transition: vec![],
        working_capital: WorkingCapitalRatios {
            ar_percent: dec!(0.05),
            prepaid_percent: dec!(0.01),
            ap_percent: dec!(0.04),
            accrued_percent: dec!(0.02),
            deferred_revenue_percent: dec!(0.12),
            other_revenue_ratio: dec!(0.05),
            locked: true,
            calculated_from_base_year: false,
        },
        contract: ContractWindow {
            start_year: 2025,
            end_year: 2034,
        },
        dynamic: dynamic(1900, fixed_rent(dec!(1000000), Decimal::ZERO, 1)),
        capex: CapExConfig::default(),
        solver: CircularSolverConfig::default(),
        validation: ValidationConfig::default(),
        valuation: ValuationConfig::default(),
    }
}

fn contract_periods(periods: &[Period]) -> Vec<&Period> {
    periods
        .iter()
        .filter(|p| p.kind == PeriodKind::Dynamic)
        .collect()
}

// ===========================================================================
// Reference scenarios
// ===========================================================================

#[test]
fn test_reference_first_contract_year() {
    let out = run_projection(&base_input()).unwrap();
    let first = contract_periods(&out.periods)[0];

    assert_eq!(first.year, 2025);
    assert_eq!(first.profit_and_loss.tuition_revenue, dec!(76000000));
    assert_eq!(first.profit_and_loss.total_revenue, dec!(79800000));
    assert_eq!(first.profit_and_loss.rent_expense, dec!(1000000));
}

#[test]
fn test_doubling_enrollment_at_least_doubles_revenue() {
    let mut small = base_input();
    small.dynamic.enrollment.steady_state_students = 1200;
    let mut large = base_input();
    large.dynamic.enrollment.steady_state_students = 2400;

    let small = run_projection(&small).unwrap();
    let large = run_projection(&large).unwrap();

    for (s, l) in contract_periods(&small.periods)
        .iter()
        .zip(contract_periods(&large.periods))
    {
        let s = &s.profit_and_loss;
        let l = &l.profit_and_loss;
        assert!(l.total_revenue >= s.total_revenue * dec!(2));
        assert!(l.tuition_revenue > s.tuition_revenue);
        assert!(l.other_revenue > s.other_revenue);
    }
}

#[test]
fn test_revenue_share_rent_is_exact() {
    let mut input = base_input();
    input.dynamic.rent = RentParams::RevenueShare {
        revenue_share_percent: dec!(0.137),
    };
    let ctx = input.numeric;
    let out = run_projection(&input).unwrap();
    for p in contract_periods(&out.periods) {
        let pl = &p.profit_and_loss;
        assert_eq!(pl.rent_expense, ctx.round(pl.total_revenue * dec!(0.137)));
    }
}

#[test]
fn test_fixed_escalation_steps_in_emitted_periods() {
    let mut input = base_input();
    input.dynamic.rent = fixed_rent(dec!(1000000), dec!(0.05), 3);
    let out = run_projection(&input).unwrap();
    let rents: Vec<Decimal> = contract_periods(&out.periods)
        .iter()
        .map(|p| p.profit_and_loss.rent_expense)
        .collect();

    assert_eq!(rents[0], dec!(1000000));
    assert_eq!(rents[2], dec!(1000000));
    assert_eq!(rents[3], dec!(1050000));
    assert_eq!(rents[5], dec!(1050000));
    assert_eq!(rents[6], dec!(1102500));
    assert_eq!(rents[9], dec!(1157625));
}

// ===========================================================================
// Accounting integrity
// ===========================================================================

#[test]
fn test_balance_identity_and_cash_reconciliation() {
    let input = base_input();
    let tolerance = input.validation.balance_tolerance;
    let out = run_projection(&input).unwrap();

    assert!(out.validation.all_periods_balanced);
    assert!(out.validation.all_cash_flows_reconciled);
    for p in &out.periods {
        let bs = &p.balance_sheet;
        assert!((bs.total_assets - bs.total_liabilities_and_equity).abs() <= tolerance);
        let cf = &p.cash_flow;
        if cf.basis != CashFlowBasis::Unavailable {
            let gap = cf.beginning_cash
                + cf.operating_cash_flow
                + cf.investing_cash_flow
                + cf.financing_cash_flow
                - cf.ending_cash;
            assert!(gap.abs() <= tolerance, "year {} gap {gap}", p.year);
        }
    }
}

#[test]
fn test_opening_balances_equal_prior_closing() {
    let out = run_projection(&base_input()).unwrap();
    for pair in out.periods.windows(2).skip(1) {
        let (prev, curr) = (&pair[0], &pair[1]);
        assert_eq!(curr.cash_flow.beginning_cash, prev.balance_sheet.cash);
        if curr.kind != PeriodKind::Historical {
            assert_eq!(
                curr.balance_sheet.equity,
                prev.balance_sheet.equity + curr.profit_and_loss.net_income
            );
            assert_eq!(
                curr.balance_sheet.accumulated_depreciation,
                prev.balance_sheet.accumulated_depreciation + curr.profit_and_loss.depreciation
            );
        }
    }
}

#[test]
fn test_historical_periods_pass_through() {
    let input = base_input();
    let out = run_projection(&input).unwrap();
    for (emitted, given) in out.periods.iter().zip(&input.historical) {
        assert_eq!(emitted.kind, PeriodKind::Historical);
        assert_eq!(emitted.year, given.year);
        assert_eq!(
            emitted.profit_and_loss.total_revenue,
            given.profit_and_loss.revenue
        );
        assert_eq!(emitted.balance_sheet.snapshot(), given.balance_sheet);
    }
}

#[test]
fn test_repeated_runs_are_identical() {
    let input = base_input();
    let a = run_projection(&input).unwrap();
    let b = run_projection(&input).unwrap();
    assert_eq!(a.periods, b.periods);
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.validation, b.validation);
}

// ===========================================================================
// Enrollment
// ===========================================================================

#[test]
fn test_ramp_up_is_monotonic() {
    let mut input = base_input();
    input.dynamic.enrollment.ramp_up_enabled = true;
    input.dynamic.enrollment.ramp_curve = Some(vec![dec!(0.4), dec!(0.7), dec!(0.9)]);
    let out = run_projection(&input).unwrap();

    let students: Vec<Decimal> = contract_periods(&out.periods)
        .iter()
        .map(|p| p.enrollment.as_ref().map(|e| e.total_students).unwrap_or_default())
        .collect();
    assert!(students.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(students[0], dec!(760));
    assert_eq!(*students.last().unwrap(), dec!(1900));
}

#[test]
fn test_non_positive_enrollment_rejected_before_compute() {
    let mut input = base_input();
    input.dynamic.enrollment.steady_state_students = 0;
    let err = run_projection(&input).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.code(), "NON_POSITIVE_ENROLLMENT");
}

// ===========================================================================
// Solver / deadline
// ===========================================================================

#[test]
fn test_iteration_budget_exhausted_is_convergence_error() {
    let mut input = base_input();
    input.solver.max_iterations = 1;
    let err = run_projection(&input).unwrap_err();
    assert!(err.is_convergence(), "got {err}");
    assert!(!err.is_configuration());
}

#[test]
fn test_damped_solver_reaches_same_result() {
    let undamped = run_projection(&base_input()).unwrap();
    let mut input = base_input();
    input.solver.relaxation_factor = dec!(0.5);
    let damped = run_projection(&input).unwrap();

    for (a, b) in undamped.periods.iter().zip(&damped.periods) {
        let diff = (a.profit_and_loss.net_income - b.profit_and_loss.net_income).abs();
        assert!(diff <= dec!(1), "year {} differs by {diff}", a.year);
    }
    assert!(
        damped.performance.total_solver_iterations
            >= undamped.performance.total_solver_iterations
    );
}

#[test]
fn test_zero_budget_is_timeout_not_convergence() {
    let err = run_with_timeout(&base_input(), 0).unwrap_err();
    assert!(err.is_timeout());
    assert!(!err.is_convergence());
    assert_eq!(err.code(), "TIMEOUT");
}

#[test]
fn test_generous_budget_matches_unbounded_run() {
    let input = base_input();
    let bounded = run_with_timeout(&input, 60_000).unwrap();
    let unbounded = run_projection(&input).unwrap();
    assert_eq!(bounded.periods, unbounded.periods);
}

// ===========================================================================
// Transition, capex and metrics together
// ===========================================================================

#[test]
fn test_transition_year_and_reinvestment() {
    let mut input = base_input();
    input.transition = vec![TransitionPeriodInput {
        year: 2025,
        prefill_from_prior: true,
        revenue_growth_rate: dec!(0.04),
        rent_growth_rate: dec!(0.03),
        fixed_cost_lines: vec![],
        revenue_override: None,
    }];
    input.contract = ContractWindow {
        start_year: 2026,
        end_year: 2035,
    };
    input.capex = CapExConfig {
        categories: vec![AssetCategory {
            name: "equipment".into(),
            regime: DepreciationRegime::ContractPeriod,
            useful_life_years: 5,
        }],
        auto_reinvestment: Some(AutoReinvestment {
            enabled: true,
            frequency_years: 4,
            amount: ReinvestmentAmount::Fixed {
                amount: dec!(2000000),
            },
            category: "equipment".into(),
        }),
        ..Default::default()
    };

    let out = run_projection(&input).unwrap();
    let transition = &out.periods[2];
    assert_eq!(transition.kind, PeriodKind::Transition);
    assert_eq!(transition.profit_and_loss.total_revenue, dec!(62400000));
    assert_eq!(transition.profit_and_loss.rent_expense, dec!(9270000));

    let capex_years: Vec<i32> = out
        .periods
        .iter()
        .filter(|p| {
            p.cash_flow.basis == CashFlowBasis::Projected && p.cash_flow.capex > Decimal::ZERO
        })
        .map(|p| p.year)
        .collect();
    assert_eq!(capex_years, vec![2030, 2034]);
    assert!(out.validation.all_periods_balanced);
}

#[test]
fn test_metrics_cover_contract_window_only() {
    let out = run_projection(&base_input()).unwrap();
    let m = &out.metrics;
    assert_eq!(m.contract_years, 10);
    assert_eq!(m.total_rent, dec!(10000000));
    assert_eq!(m.net_annualized_value, m.annualized_ebitda - m.annualized_rent);
    // Flat rent annualizes back to itself
    assert_eq!(m.annualized_rent, dec!(1000000));
}

#[test]
fn test_partner_investment_rent_runs() {
    let mut input = base_input();
    input.dynamic.rent = RentParams::PartnerInvestment {
        land_size: dec!(12000),
        land_price_per_sqm: dec!(1200),
        bua_size: dec!(9000),
        construction_cost_per_sqm: dec!(2800),
        yield_rate: dec!(0.07),
        growth_rate: dec!(0.02),
        frequency: 2,
    };
    let out = run_projection(&input).unwrap();
    let rents: Vec<Decimal> = contract_periods(&out.periods)
        .iter()
        .map(|p| p.profit_and_loss.rent_expense)
        .collect();
    assert_eq!(rents[0], rents[1]);
    assert!(rents[2] > rents[1]);
}
