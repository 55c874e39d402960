use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::{safe_divide, NumericContext};
use crate::periods::dynamic::EnrollmentBreakdown;
use crate::periods::historical::HistoricalPeriodInput;
use crate::periods::OperatingLines;
use crate::solver::circular::FinancingResolution;
use crate::types::{Money, PeriodKind, Rate, Year};
use crate::working_capital::ratios::WorkingCapitalBalances;

/// Decimal places kept on margin ratios in emitted statements.
const RATIO_DP: u32 = 6;

// ---------------------------------------------------------------------------
// Output structs
// ---------------------------------------------------------------------------

/// Closing balances carried from one period into the next. Also the shape of a
/// historical balance-sheet snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub cash: Money,
    pub receivables: Money,
    pub prepaid: Money,
    pub gross_ppe: Money,
    pub accumulated_depreciation: Money,
    pub payables: Money,
    pub accrued: Money,
    pub deferred_revenue: Money,
    pub debt: Money,
    pub equity: Money,
}

impl BalanceSnapshot {
    pub fn net_ppe(&self) -> Money {
        self.gross_ppe - self.accumulated_depreciation
    }

    pub fn total_assets(&self) -> Money {
        self.cash + self.receivables + self.prepaid + self.net_ppe()
    }

    pub fn total_liabilities(&self) -> Money {
        self.payables + self.accrued + self.deferred_revenue + self.debt
    }
}

/// Profit & loss for a single fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub tuition_revenue: Money,
    pub other_revenue: Money,
    pub total_revenue: Money,
    pub rent_expense: Money,
    pub staff_costs: Money,
    pub other_opex: Money,
    pub ebitda: Money,
    pub ebitda_margin: Rate,
    pub depreciation: Money,
    pub ebit: Money,
    pub interest_expense: Money,
    pub interest_income: Money,
    pub net_interest: Money,
    pub ebt: Money,
    pub zakat: Money,
    pub net_income: Money,
}

/// Balance sheet at the close of a fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub cash: Money,
    pub accounts_receivable: Money,
    pub prepaid_expenses: Money,
    pub total_current_assets: Money,
    pub gross_ppe: Money,
    pub accumulated_depreciation: Money,
    pub net_ppe: Money,
    pub total_assets: Money,
    pub accounts_payable: Money,
    pub accrued_expenses: Money,
    pub deferred_revenue: Money,
    pub total_current_liabilities: Money,
    pub debt: Money,
    pub total_liabilities: Money,
    pub equity: Money,
    pub total_liabilities_and_equity: Money,
}

impl BalanceSheet {
    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            cash: self.cash,
            receivables: self.accounts_receivable,
            prepaid: self.prepaid_expenses,
            gross_ppe: self.gross_ppe,
            accumulated_depreciation: self.accumulated_depreciation,
            payables: self.accounts_payable,
            accrued: self.accrued_expenses,
            deferred_revenue: self.deferred_revenue,
            debt: self.debt,
            equity: self.equity,
        }
    }
}

/// How a cash-flow statement was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowBasis {
    /// Produced by the projection for this year
    Projected,
    /// Reconstructed from two consecutive historical snapshots
    Derived,
    /// First historical year: no opening snapshot to derive from
    Unavailable,
}

/// Indirect-method cash flow statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub basis: CashFlowBasis,
    pub beginning_cash: Money,
    pub net_income: Money,
    pub depreciation: Money,
    pub change_in_receivables: Money,
    pub change_in_prepaid: Money,
    pub change_in_payables: Money,
    pub change_in_accrued: Money,
    pub change_in_deferred_revenue: Money,
    pub operating_cash_flow: Money,
    pub capex: Money,
    pub investing_cash_flow: Money,
    pub debt_drawn: Money,
    pub debt_repaid: Money,
    /// Equity movements other than earnings (historical years only)
    pub equity_movements: Money,
    pub financing_cash_flow: Money,
    pub net_change_in_cash: Money,
    pub ending_cash: Money,
    pub free_cash_flow: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverTrace {
    pub iterations: u32,
    pub residual: Money,
}

/// One emitted fiscal year. Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub year: Year,
    pub kind: PeriodKind,
    pub profit_and_loss: ProfitAndLoss,
    pub balance_sheet: BalanceSheet,
    pub cash_flow: CashFlowStatement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<EnrollmentBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverTrace>,
}

// ---------------------------------------------------------------------------
// Historical
// ---------------------------------------------------------------------------

/// Emit a historical year verbatim. The cash-flow statement is reconstructed
/// from the prior snapshot when one exists.
pub fn assemble_historical(
    current: &HistoricalPeriodInput,
    prior: Option<&HistoricalPeriodInput>,
) -> Period {
    let pl = &current.profit_and_loss;
    let bs = &current.balance_sheet;

    let ebitda = pl.ebitda();
    let ebit = ebitda - pl.depreciation;
    let ebt = ebit - pl.interest;
    let net_income = ebt - pl.zakat;

    let profit_and_loss = ProfitAndLoss {
        tuition_revenue: pl.tuition_revenue(),
        other_revenue: pl.other_revenue,
        total_revenue: pl.revenue,
        rent_expense: pl.rent,
        staff_costs: pl.staff_costs,
        other_opex: pl.other_opex,
        ebitda,
        ebitda_margin: safe_divide(ebitda, pl.revenue).round_dp(RATIO_DP),
        depreciation: pl.depreciation,
        ebit,
        interest_expense: pl.interest,
        interest_income: Decimal::ZERO,
        net_interest: pl.interest,
        ebt,
        zakat: pl.zakat,
        net_income,
    };

    let balance_sheet = balance_sheet_from_snapshot(bs);

    let cash_flow = match prior {
        Some(prev) => derive_cash_flow(&prev.balance_sheet, bs, net_income, pl.depreciation),
        None => unavailable_cash_flow(bs.cash, net_income, pl.depreciation),
    };

    Period {
        year: current.year,
        kind: PeriodKind::Historical,
        profit_and_loss,
        balance_sheet,
        cash_flow,
        enrollment: None,
        solver: None,
    }
}

fn balance_sheet_from_snapshot(bs: &BalanceSnapshot) -> BalanceSheet {
    let total_current_assets = bs.cash + bs.receivables + bs.prepaid;
    let net_ppe = bs.net_ppe();
    let total_current_liabilities = bs.payables + bs.accrued + bs.deferred_revenue;
    let total_liabilities = total_current_liabilities + bs.debt;
    BalanceSheet {
        cash: bs.cash,
        accounts_receivable: bs.receivables,
        prepaid_expenses: bs.prepaid,
        total_current_assets,
        gross_ppe: bs.gross_ppe,
        accumulated_depreciation: bs.accumulated_depreciation,
        net_ppe,
        total_assets: total_current_assets + net_ppe,
        accounts_payable: bs.payables,
        accrued_expenses: bs.accrued,
        deferred_revenue: bs.deferred_revenue,
        total_current_liabilities,
        debt: bs.debt,
        total_liabilities,
        equity: bs.equity,
        total_liabilities_and_equity: total_liabilities + bs.equity,
    }
}

fn derive_cash_flow(
    opening: &BalanceSnapshot,
    closing: &BalanceSnapshot,
    net_income: Money,
    depreciation: Money,
) -> CashFlowStatement {
    let change_in_receivables = closing.receivables - opening.receivables;
    let change_in_prepaid = closing.prepaid - opening.prepaid;
    let change_in_payables = closing.payables - opening.payables;
    let change_in_accrued = closing.accrued - opening.accrued;
    let change_in_deferred_revenue = closing.deferred_revenue - opening.deferred_revenue;

    let operating_cash_flow = net_income + depreciation - change_in_receivables
        - change_in_prepaid
        + change_in_payables
        + change_in_accrued
        + change_in_deferred_revenue;

    // Spend implied by the move in net PP&E after adding back the year's charge
    let capex = closing.net_ppe() - opening.net_ppe() + depreciation;
    let investing_cash_flow = -capex;

    let debt_change = closing.debt - opening.debt;
    let (debt_drawn, debt_repaid) = if debt_change >= Decimal::ZERO {
        (debt_change, Decimal::ZERO)
    } else {
        (Decimal::ZERO, -debt_change)
    };
    let equity_movements = closing.equity - opening.equity - net_income;
    let financing_cash_flow = debt_drawn - debt_repaid + equity_movements;

    CashFlowStatement {
        basis: CashFlowBasis::Derived,
        beginning_cash: opening.cash,
        net_income,
        depreciation,
        change_in_receivables,
        change_in_prepaid,
        change_in_payables,
        change_in_accrued,
        change_in_deferred_revenue,
        operating_cash_flow,
        capex,
        investing_cash_flow,
        debt_drawn,
        debt_repaid,
        equity_movements,
        financing_cash_flow,
        net_change_in_cash: operating_cash_flow + investing_cash_flow + financing_cash_flow,
        ending_cash: closing.cash,
        free_cash_flow: operating_cash_flow - capex,
    }
}

fn unavailable_cash_flow(cash: Money, net_income: Money, depreciation: Money) -> CashFlowStatement {
    CashFlowStatement {
        basis: CashFlowBasis::Unavailable,
        beginning_cash: cash,
        net_income,
        depreciation,
        change_in_receivables: Decimal::ZERO,
        change_in_prepaid: Decimal::ZERO,
        change_in_payables: Decimal::ZERO,
        change_in_accrued: Decimal::ZERO,
        change_in_deferred_revenue: Decimal::ZERO,
        operating_cash_flow: Decimal::ZERO,
        capex: Decimal::ZERO,
        investing_cash_flow: Decimal::ZERO,
        debt_drawn: Decimal::ZERO,
        debt_repaid: Decimal::ZERO,
        equity_movements: Decimal::ZERO,
        financing_cash_flow: Decimal::ZERO,
        net_change_in_cash: Decimal::ZERO,
        ending_cash: cash,
        free_cash_flow: Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Projected (transition / dynamic)
// ---------------------------------------------------------------------------

/// Everything the assembler needs for one projected year after the solver
/// has converged.
pub struct ProjectedYear<'a> {
    pub year: Year,
    pub kind: PeriodKind,
    pub opening: &'a BalanceSnapshot,
    pub lines: &'a OperatingLines,
    pub capex: Money,
    pub depreciation: Money,
    pub working_capital: &'a WorkingCapitalBalances,
    pub financing: &'a FinancingResolution,
    pub enrollment: Option<EnrollmentBreakdown>,
}

/// Build the three statements for a projected year. Every emitted currency
/// line is rounded through `ctx`; subtotals are sums of the rounded lines so
/// the printed statements foot.
pub fn assemble_projected(parts: ProjectedYear<'_>, ctx: &NumericContext) -> Period {
    let opening = parts.opening;
    let lines = parts.lines;
    let fin = parts.financing;
    let wc = parts.working_capital;

    // Income statement
    let tuition_revenue = ctx.round(lines.tuition_revenue);
    let other_revenue = ctx.round(lines.other_revenue);
    let total_revenue = tuition_revenue + other_revenue;
    let rent_expense = ctx.round(lines.rent_expense);
    let staff_costs = ctx.round(lines.staff_costs);
    let other_opex = ctx.round(lines.other_opex);
    let ebitda = total_revenue - rent_expense - staff_costs - other_opex;
    let depreciation = ctx.round(parts.depreciation);
    let ebit = ebitda - depreciation;
    let interest_expense = ctx.round(fin.interest_expense);
    let interest_income = ctx.round(fin.interest_income);
    let net_interest = interest_expense - interest_income;
    let ebt = ebit - net_interest;
    let zakat = ctx.round(fin.zakat);
    let net_income = ebt - zakat;

    // Balance sheet
    let cash = ctx.round(fin.ending_cash);
    let receivables = ctx.round(wc.receivables);
    let prepaid = ctx.round(wc.prepaid);
    let payables = ctx.round(wc.payables);
    let accrued = ctx.round(wc.accrued);
    let deferred_revenue = ctx.round(wc.deferred_revenue);
    let capex = ctx.round(parts.capex);
    let gross_ppe = opening.gross_ppe + capex;
    let accumulated_depreciation = opening.accumulated_depreciation + depreciation;
    let debt = ctx.round(fin.closing_debt);
    let equity = opening.equity + net_income;

    let closing = BalanceSnapshot {
        cash,
        receivables,
        prepaid,
        gross_ppe,
        accumulated_depreciation,
        payables,
        accrued,
        deferred_revenue,
        debt,
        equity,
    };
    let balance_sheet = balance_sheet_from_snapshot(&closing);

    // Cash flow
    let change_in_receivables = receivables - opening.receivables;
    let change_in_prepaid = prepaid - opening.prepaid;
    let change_in_payables = payables - opening.payables;
    let change_in_accrued = accrued - opening.accrued;
    let change_in_deferred_revenue = deferred_revenue - opening.deferred_revenue;
    let operating_cash_flow = net_income + depreciation - change_in_receivables
        - change_in_prepaid
        + change_in_payables
        + change_in_accrued
        + change_in_deferred_revenue;
    let investing_cash_flow = -capex;
    let debt_drawn = ctx.round(fin.debt_drawn);
    let debt_repaid = ctx.round(fin.debt_repaid);
    let financing_cash_flow = debt_drawn - debt_repaid;

    let cash_flow = CashFlowStatement {
        basis: CashFlowBasis::Projected,
        beginning_cash: opening.cash,
        net_income,
        depreciation,
        change_in_receivables,
        change_in_prepaid,
        change_in_payables,
        change_in_accrued,
        change_in_deferred_revenue,
        operating_cash_flow,
        capex,
        investing_cash_flow,
        debt_drawn,
        debt_repaid,
        equity_movements: Decimal::ZERO,
        financing_cash_flow,
        net_change_in_cash: operating_cash_flow + investing_cash_flow + financing_cash_flow,
        ending_cash: cash,
        free_cash_flow: operating_cash_flow - capex,
    };

    Period {
        year: parts.year,
        kind: parts.kind,
        profit_and_loss: ProfitAndLoss {
            tuition_revenue,
            other_revenue,
            total_revenue,
            rent_expense,
            staff_costs,
            other_opex,
            ebitda,
            ebitda_margin: safe_divide(ebitda, total_revenue).round_dp(RATIO_DP),
            depreciation,
            ebit,
            interest_expense,
            interest_income,
            net_interest,
            ebt,
            zakat,
            net_income,
        },
        balance_sheet,
        cash_flow,
        enrollment: parts.enrollment,
        solver: Some(SolverTrace {
            iterations: fin.iterations,
            residual: fin.residual,
        }),
    }
}
