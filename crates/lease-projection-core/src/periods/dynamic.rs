//! Contract-year calculator: enrollment drives tuition, staff and, through
//! total revenue, other opex and revenue-linked rent.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, ProjectionError};
use crate::numeric::{step_escalation, NumericContext};
use crate::periods::OperatingLines;
use crate::rent::model::RentParams;
use crate::types::{ContractWindow, Money, Rate, Year};
use crate::ProjectionResult;

const MAX_PROGRAMS: usize = 2;
const SHARE_TOLERANCE: Decimal = dec!(0.0001);

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Template applied to every contract year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicPeriodInput {
    pub enrollment: EnrollmentConfig,
    pub curriculum: CurriculumConfig,
    pub staff: StaffConfig,
    /// Other opex as a fraction of total revenue (other revenue included)
    pub other_opex_percent: Rate,
    pub rent: RentParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentConfig {
    pub ramp_up_enabled: bool,
    pub ramp_start_year: Year,
    pub ramp_end_year: Year,
    /// Capacity reached at steady state. Must be positive.
    pub steady_state_students: i64,
    /// Fraction of capacity per ramp year, starting at `ramp_start_year`.
    /// Linear to full capacity when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_curve: Option<Vec<Rate>>,
    #[serde(default)]
    pub grade_distribution: Vec<GradeShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeShare {
    pub grade: String,
    pub share: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumConfig {
    pub programs: Vec<CurriculumProgram>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumProgram {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Annual fee per student at contract start
    pub base_fee: Money,
    #[serde(default)]
    pub growth_rate: Rate,
    #[serde(default = "default_frequency")]
    pub growth_frequency_years: u32,
    /// First year the program enrolls students; contributes nothing before
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_year: Option<Year>,
    /// Fraction of total enrollment attending this program
    #[serde(default = "default_share")]
    pub student_share: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffConfig {
    pub fixed_cost: Money,
    pub variable_cost_per_student: Money,
    #[serde(default)]
    pub cpi_rate: Rate,
    #[serde(default = "default_frequency")]
    pub cpi_frequency_years: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_frequency() -> u32 {
    1
}

fn default_share() -> Rate {
    Decimal::ONE
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentBreakdown {
    pub total_students: Decimal,
    /// Fraction of steady-state capacity applied this year
    pub capacity_percent: Rate,
    pub by_grade: Vec<GradeEnrollment>,
    pub by_program: Vec<ProgramRevenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEnrollment {
    pub grade: String,
    pub students: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRevenue {
    pub name: String,
    pub students: Decimal,
    pub fee: Money,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicYear {
    pub lines: OperatingLines,
    pub enrollment: EnrollmentBreakdown,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject a template that cannot produce a meaningful year. Runs before any
/// period is computed.
pub fn validate_dynamic(input: &DynamicPeriodInput) -> ProjectionResult<()> {
    validate_enrollment(&input.enrollment)?;
    validate_curriculum(&input.curriculum)?;
    validate_staff(&input.staff)?;

    if input.other_opex_percent < Decimal::ZERO || input.other_opex_percent > Decimal::ONE {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidOpexPercent,
            format!(
                "other_opex_percent must be between 0 and 1, got {}",
                input.other_opex_percent
            ),
        ));
    }

    input.rent.validate()
}

fn validate_enrollment(e: &EnrollmentConfig) -> ProjectionResult<()> {
    if e.steady_state_students <= 0 {
        return Err(ProjectionError::config(
            ConfigErrorCode::NonPositiveEnrollment,
            format!(
                "steady_state_students must be positive, got {}",
                e.steady_state_students
            ),
        ));
    }

    if e.ramp_up_enabled {
        if e.ramp_end_year < e.ramp_start_year {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidRampCurve,
                format!(
                    "ramp_end_year ({}) precedes ramp_start_year ({})",
                    e.ramp_end_year, e.ramp_start_year
                ),
            ));
        }
        if let Some(curve) = &e.ramp_curve {
            if curve.is_empty() {
                return Err(ProjectionError::config(
                    ConfigErrorCode::InvalidRampCurve,
                    "ramp_curve must not be empty when provided",
                ));
            }
            if let Some(bad) = curve.iter().find(|p| **p < Decimal::ZERO || **p > Decimal::ONE) {
                return Err(ProjectionError::config(
                    ConfigErrorCode::InvalidRampCurve,
                    format!("ramp_curve values must be between 0 and 1, got {bad}"),
                ));
            }
        }
    }

    if !e.grade_distribution.is_empty() {
        if e.grade_distribution.iter().any(|g| g.share < Decimal::ZERO) {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidGradeDistribution,
                "grade shares must be non-negative",
            ));
        }
        let total: Decimal = e.grade_distribution.iter().map(|g| g.share).sum();
        if (total - Decimal::ONE).abs() > SHARE_TOLERANCE {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidGradeDistribution,
                format!("grade shares must sum to 1, got {total}"),
            ));
        }
    }

    Ok(())
}

fn validate_curriculum(c: &CurriculumConfig) -> ProjectionResult<()> {
    if c.programs.is_empty() || c.programs.len() > MAX_PROGRAMS {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidCurriculum,
            format!(
                "between 1 and {MAX_PROGRAMS} curriculum programs are required, got {}",
                c.programs.len()
            ),
        ));
    }
    if !c.programs.iter().any(|p| p.enabled) {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidCurriculum,
            "at least one curriculum program must be enabled",
        ));
    }

    for p in &c.programs {
        if p.base_fee < Decimal::ZERO {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidCurriculum,
                format!("program '{}': base_fee must be non-negative", p.name),
            ));
        }
        if p.growth_frequency_years == 0 {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidCurriculum,
                format!("program '{}': growth_frequency_years must be >= 1", p.name),
            ));
        }
        if p.student_share < Decimal::ZERO || p.student_share > Decimal::ONE {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidCurriculum,
                format!(
                    "program '{}': student_share must be between 0 and 1, got {}",
                    p.name, p.student_share
                ),
            ));
        }
    }

    let enabled_share: Decimal = c
        .programs
        .iter()
        .filter(|p| p.enabled)
        .map(|p| p.student_share)
        .sum();
    if enabled_share > Decimal::ONE + SHARE_TOLERANCE {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidCurriculum,
            format!("enabled program student shares exceed 1 ({enabled_share})"),
        ));
    }

    Ok(())
}

fn validate_staff(s: &StaffConfig) -> ProjectionResult<()> {
    if s.fixed_cost < Decimal::ZERO || s.variable_cost_per_student < Decimal::ZERO {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidStaffConfig,
            "staff costs must be non-negative",
        ));
    }
    if s.cpi_frequency_years == 0 {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidStaffConfig,
            "cpi_frequency_years must be >= 1",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Fraction of capacity enrolled in `year`.
pub fn capacity_percent(e: &EnrollmentConfig, year: Year) -> Rate {
    if !e.ramp_up_enabled {
        return Decimal::ONE;
    }
    if year < e.ramp_start_year {
        return Decimal::ZERO;
    }
    if year > e.ramp_end_year {
        return Decimal::ONE;
    }

    let idx = (year - e.ramp_start_year) as usize;
    match &e.ramp_curve {
        Some(curve) => curve
            .get(idx)
            .or_else(|| curve.last())
            .copied()
            .unwrap_or(Decimal::ONE),
        None => {
            let span = Decimal::from(e.ramp_end_year - e.ramp_start_year + 1);
            Decimal::from(idx as i64 + 1) / span
        }
    }
}

/// Enrolled students in `year`, rounded to whole students.
pub fn students_for_year(e: &EnrollmentConfig, year: Year, ctx: &NumericContext) -> Decimal {
    let capacity = Decimal::from(e.steady_state_students);
    ctx.round_whole(capacity * capacity_percent(e, year))
}

/// Compute one contract year's operating lines. Rent is evaluated last
/// because revenue-share rent needs the final total revenue.
pub fn calculate_dynamic_year(
    input: &DynamicPeriodInput,
    year: Year,
    contract: &ContractWindow,
    other_revenue_ratio: Rate,
    ctx: &NumericContext,
) -> ProjectionResult<DynamicYear> {
    // Fail fast even if the caller skipped template validation
    if input.enrollment.steady_state_students <= 0 {
        return Err(ProjectionError::config(
            ConfigErrorCode::NonPositiveEnrollment,
            format!(
                "steady_state_students must be positive, got {}",
                input.enrollment.steady_state_students
            ),
        ));
    }

    let elapsed = contract.years_elapsed(year);
    let pct = capacity_percent(&input.enrollment, year);
    let students = students_for_year(&input.enrollment, year, ctx);

    // Tuition per program
    let mut by_program = Vec::with_capacity(input.curriculum.programs.len());
    let mut tuition_revenue = Decimal::ZERO;
    for program in input.curriculum.programs.iter().filter(|p| p.enabled) {
        let started = program.start_year.map_or(true, |s| year >= s);
        let fee = ctx.round(step_escalation(
            program.base_fee,
            program.growth_rate,
            elapsed,
            program.growth_frequency_years,
        )?);
        let program_students = if started {
            ctx.round_whole(students * program.student_share)
        } else {
            Decimal::ZERO
        };
        let revenue = ctx.round(program_students * fee);
        tuition_revenue += revenue;
        by_program.push(ProgramRevenue {
            name: program.name.clone(),
            students: program_students,
            fee,
            revenue,
        });
    }

    let other_revenue = ctx.round(tuition_revenue * other_revenue_ratio);
    let total_revenue = tuition_revenue + other_revenue;

    let staff = &input.staff;
    let staff_base = staff.fixed_cost + staff.variable_cost_per_student * students;
    let staff_costs = ctx.round(step_escalation(
        staff_base,
        staff.cpi_rate,
        elapsed,
        staff.cpi_frequency_years,
    )?);

    // Percentage applied after other revenue is added to the base
    let other_opex = ctx.round(input.other_opex_percent * total_revenue);

    let rent_expense = ctx.round(input.rent.rent_for_year(year, contract, total_revenue)?);

    let by_grade = input
        .enrollment
        .grade_distribution
        .iter()
        .map(|g| GradeEnrollment {
            grade: g.grade.clone(),
            students: ctx.round_whole(students * g.share),
        })
        .collect();

    Ok(DynamicYear {
        lines: OperatingLines {
            year,
            tuition_revenue,
            other_revenue,
            total_revenue,
            rent_expense,
            staff_costs,
            other_opex,
        },
        enrollment: EnrollmentBreakdown {
            total_students: students,
            capacity_percent: pct,
            by_grade,
            by_program,
        },
    })
}

/// Total revenue for every contract year, without financing. Used for rent
/// and depreciation previews.
pub fn revenue_path(
    input: &DynamicPeriodInput,
    contract: &ContractWindow,
    other_revenue_ratio: Rate,
    ctx: &NumericContext,
) -> ProjectionResult<Vec<(Year, Money)>> {
    contract
        .years()
        .map(|year| {
            calculate_dynamic_year(input, year, contract, other_revenue_ratio, ctx)
                .map(|d| (year, d.lines.total_revenue))
        })
        .collect()
}
