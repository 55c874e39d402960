use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capex::scheduler::{CapexScheduler, CapexYear};
use crate::deadline::Deadline;
use crate::engine::input::ProjectionInput;
use crate::metrics::valuation::{calculate_metrics, ProjectionMetrics};
use crate::periods::dynamic::{calculate_dynamic_year, EnrollmentBreakdown};
use crate::periods::historical::mutability_warnings;
use crate::periods::transition::project_transition;
use crate::periods::OperatingLines;
use crate::solver::circular::{CircularSolver, InterestEstimate, YearDrivers};
use crate::statements::assembler::{
    assemble_historical, assemble_projected, BalanceSnapshot, Period, ProfitAndLoss,
    ProjectedYear,
};
use crate::statements::validation::{summarize, validate_period, ValidationRecord};
use crate::types::PeriodKind;
use crate::working_capital::ratios::{project_balances, resolve_ratios, WorkingCapitalRatios};
use crate::ProjectionResult;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub duration_us: u64,
    pub periods: usize,
    pub total_solver_iterations: u32,
    pub max_solver_iterations: u32,
}

/// Result of one projection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationEngineOutput {
    pub periods: Vec<Period>,
    pub metrics: ProjectionMetrics,
    pub validation: ValidationRecord,
    pub performance: PerformanceRecord,
    pub capex_schedule: Vec<CapexYear>,
    pub working_capital_ratios: WorkingCapitalRatios,
    pub warnings: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run a full projection: historical pass-through, transition years, then
/// every contract year, each resolved through the circular solver.
pub fn run_projection(input: &ProjectionInput) -> ProjectionResult<CalculationEngineOutput> {
    project(input, None)
}

/// Same as [`run_projection`] under a wall-clock budget. The budget is
/// checked between periods and between solver iterations.
pub fn run_with_timeout(
    input: &ProjectionInput,
    duration_ms: u64,
) -> ProjectionResult<CalculationEngineOutput> {
    project(input, Some(Deadline::after_ms(duration_ms)))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Rolling state carried from one emitted period to the next.
struct Carry {
    opening: BalanceSnapshot,
    prior_pl: ProfitAndLoss,
}

fn project(
    input: &ProjectionInput,
    deadline: Option<Deadline>,
) -> ProjectionResult<CalculationEngineOutput> {
    let start = Instant::now();
    input.validate()?;

    let ctx = input.numeric;
    let ratios = resolve_ratios(&input.working_capital, &input.historical)?;
    let mut warnings = mutability_warnings(&input.historical);
    for w in &warnings {
        log::warn!("{w}");
    }

    let total_years =
        input.historical.len() + input.transition.len() + input.contract.term_years() as usize;
    let mut periods: Vec<Period> = Vec::with_capacity(total_years);

    // Historical years pass through untouched
    let mut prior = None;
    for h in &input.historical {
        periods.push(assemble_historical(h, prior));
        prior = Some(h);
    }
    let last = periods.last().ok_or_else(|| {
        crate::error::ProjectionError::InsufficientData("no historical periods".into())
    })?;
    let mut carry = Carry {
        opening: last.balance_sheet.snapshot(),
        prior_pl: last.profit_and_loss.clone(),
    };

    let mut scheduler =
        CapexScheduler::new(&input.seeded_capex(), input.contract)?.with_numeric(ctx);
    let solver = CircularSolver::new(&input.system, &input.solver).with_deadline(deadline);
    let mut capex_schedule = Vec::with_capacity(input.transition.len() + total_years);

    for t in &input.transition {
        check(deadline)?;
        let lines = project_transition(t, &carry.prior_pl, &ctx)?;
        let period = project_year(
            input,
            &solver,
            &mut scheduler,
            &ratios,
            &mut carry,
            &mut capex_schedule,
            PeriodKind::Transition,
            lines,
            None,
        )?;
        periods.push(period);
    }

    for year in input.contract.years() {
        check(deadline)?;
        let dynamic = calculate_dynamic_year(
            &input.dynamic,
            year,
            &input.contract,
            ratios.other_revenue_ratio,
            &ctx,
        )?;
        let period = project_year(
            input,
            &solver,
            &mut scheduler,
            &ratios,
            &mut carry,
            &mut capex_schedule,
            PeriodKind::Dynamic,
            dynamic.lines,
            Some(dynamic.enrollment),
        )?;
        periods.push(period);
    }

    check(deadline)?;
    let tolerance = input.validation.balance_tolerance;
    let checks = periods.iter().map(|p| validate_period(p, tolerance)).collect();
    let validation = summarize(checks, tolerance, &mut warnings);

    let metrics = calculate_metrics(&periods, &input.valuation, &mut warnings)?;

    let iterations: Vec<u32> = periods
        .iter()
        .filter_map(|p| p.solver.as_ref().map(|s| s.iterations))
        .collect();
    let performance = PerformanceRecord {
        duration_us: start.elapsed().as_micros() as u64,
        periods: periods.len(),
        total_solver_iterations: iterations.iter().sum(),
        max_solver_iterations: iterations.iter().copied().max().unwrap_or(0),
    };

    log::info!(
        "projection complete: {} periods, {} solver iterations, {} us",
        performance.periods,
        performance.total_solver_iterations,
        performance.duration_us
    );

    Ok(CalculationEngineOutput {
        periods,
        metrics,
        validation,
        performance,
        capex_schedule,
        working_capital_ratios: ratios,
        warnings,
        calculated_at: Utc::now(),
    })
}

fn check(deadline: Option<Deadline>) -> ProjectionResult<()> {
    match deadline {
        Some(d) => d.check(),
        None => Ok(()),
    }
}

/// Depreciation, working capital, financing and assembly for one projected
/// year. Updates `carry` with the emitted closing balances.
#[allow(clippy::too_many_arguments)]
fn project_year(
    input: &ProjectionInput,
    solver: &CircularSolver<'_>,
    scheduler: &mut CapexScheduler,
    ratios: &WorkingCapitalRatios,
    carry: &mut Carry,
    capex_schedule: &mut Vec<CapexYear>,
    kind: PeriodKind,
    lines: OperatingLines,
    enrollment: Option<EnrollmentBreakdown>,
) -> ProjectionResult<Period> {
    let ctx = input.numeric;
    let year = lines.year;

    let capex_year = scheduler.advance(year, lines.total_revenue)?;
    let working_capital =
        project_balances(ratios, lines.tuition_revenue, lines.total_revenue, &ctx);

    let drivers = YearDrivers {
        year,
        ebit: lines.ebitda() - capex_year.total_depreciation,
        depreciation: capex_year.total_depreciation,
        capex: capex_year.capex_total,
        working_capital: working_capital.clone(),
        opening: carry.opening.clone(),
    };
    let initial = InterestEstimate {
        expense: carry.prior_pl.interest_expense,
        income: carry.prior_pl.interest_income,
    };
    let financing = solver.solve(&drivers, initial)?;

    log::debug!(
        "{year} ({kind:?}): revenue {} net income {} debt {} after {} iterations",
        lines.total_revenue,
        financing.net_income,
        financing.closing_debt,
        financing.iterations
    );

    let period = assemble_projected(
        ProjectedYear {
            year,
            kind,
            opening: &carry.opening,
            lines: &lines,
            capex: capex_year.capex_total,
            depreciation: capex_year.total_depreciation,
            working_capital: &working_capital,
            financing: &financing,
            enrollment,
        },
        &ctx,
    );

    carry.opening = period.balance_sheet.snapshot();
    carry.prior_pl = period.profit_and_loss.clone();
    capex_schedule.push(capex_year);
    Ok(period)
}
