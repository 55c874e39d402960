//! Capital expenditure and depreciation.
//!
//! Every asset lives in one ledger tagged with its depreciation regime.
//! Pre-contract assets depreciate as a pool: the pool charges its run-rate
//! each year until the remaining book value runs out, and new pre-contract
//! additions raise both the run-rate and the remaining value. Contract-period
//! assets depreciate individually, straight line over their useful life from
//! the acquisition year (full-year convention).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, ProjectionError};
use crate::numeric::NumericContext;
use crate::types::{ContractWindow, Money, Rate, Year};
use crate::ProjectionResult;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationRegime {
    PreContract,
    ContractPeriod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCategory {
    pub name: String,
    pub regime: DepreciationRegime,
    pub useful_life_years: u32,
}

/// Fixed-asset position at the end of the last historical year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalCapexState {
    pub gross_ppe: Money,
    pub accumulated_depreciation: Money,
    /// Current yearly charge on the existing base
    pub annual_depreciation: Money,
    /// Book value still to be charged
    pub remaining_to_depreciate: Money,
}

/// Spend in a transition year, depreciated under its category's regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionCapexEvent {
    pub year: Year,
    pub amount: Money,
    pub category: String,
}

/// A planned asset with its own life and regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualAsset {
    pub year: Year,
    pub name: String,
    pub amount: Money,
    pub useful_life_years: u32,
    pub regime: DepreciationRegime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReinvestmentAmount {
    Fixed { amount: Money },
    PercentOfRevenue { percent: Rate },
}

/// Periodic reinvestment during the contract: fires every
/// `frequency_years` after the contract start. The category must use the
/// contract-period regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoReinvestment {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub frequency_years: u32,
    pub amount: ReinvestmentAmount,
    pub category: String,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapExConfig {
    pub categories: Vec<AssetCategory>,
    /// Seeded from the last historical balance sheet when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_state: Option<HistoricalCapexState>,
    pub transition_capex: Vec<TransitionCapexEvent>,
    pub virtual_assets: Vec<VirtualAsset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_reinvestment: Option<AutoReinvestment>,
}

impl CapExConfig {
    fn category(&self, name: &str) -> ProjectionResult<&AssetCategory> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                ProjectionError::config(
                    ConfigErrorCode::UnknownAssetCategory,
                    format!("Unknown asset category '{name}'"),
                )
            })
    }

    pub fn validate(&self) -> ProjectionResult<()> {
        for c in &self.categories {
            if c.useful_life_years == 0 {
                return Err(invalid(format!(
                    "category '{}': useful_life_years must be at least 1",
                    c.name
                )));
            }
        }

        if let Some(state) = &self.historical_state {
            let fields = [
                ("gross_ppe", state.gross_ppe),
                ("accumulated_depreciation", state.accumulated_depreciation),
                ("annual_depreciation", state.annual_depreciation),
                ("remaining_to_depreciate", state.remaining_to_depreciate),
            ];
            for (field, value) in fields {
                if value < Decimal::ZERO {
                    return Err(invalid(format!(
                        "historical_state.{field} must be non-negative, got {value}"
                    )));
                }
            }
        }

        for e in &self.transition_capex {
            if e.amount < Decimal::ZERO {
                return Err(invalid(format!(
                    "transition capex in {} must be non-negative, got {}",
                    e.year, e.amount
                )));
            }
            self.category(&e.category)?;
        }

        for v in &self.virtual_assets {
            if v.amount < Decimal::ZERO || v.useful_life_years == 0 {
                return Err(invalid(format!(
                    "virtual asset '{}' needs a non-negative amount and a useful life of at least 1 year",
                    v.name
                )));
            }
        }

        if let Some(auto) = self.auto_reinvestment.as_ref().filter(|a| a.enabled) {
            if auto.frequency_years == 0 {
                return Err(invalid(
                    "auto_reinvestment.frequency_years must be at least 1".into(),
                ));
            }
            let negative = match &auto.amount {
                ReinvestmentAmount::Fixed { amount } => *amount < Decimal::ZERO,
                ReinvestmentAmount::PercentOfRevenue { percent } => *percent < Decimal::ZERO,
            };
            if negative {
                return Err(invalid("auto_reinvestment amount must be non-negative".into()));
            }
            let category = self.category(&auto.category)?;
            if category.regime != DepreciationRegime::ContractPeriod {
                return Err(invalid(format!(
                    "auto_reinvestment category '{}' must use the contract_period regime",
                    category.name
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> ProjectionError {
    ProjectionError::config(ConfigErrorCode::InvalidCapexConfig, message)
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// One ledger entry. The historical base is seeded as a single pre-contract
/// asset holding the remaining book value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub label: String,
    pub acquired_year: Year,
    pub cost: Money,
    pub accumulated: Money,
    /// Yearly straight-line charge (contribution to the pool run-rate for
    /// pre-contract assets)
    pub annual_charge: Money,
    pub regime: DepreciationRegime,
}

impl Asset {
    pub fn net_book_value(&self) -> Money {
        (self.cost - self.accumulated).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAddition {
    pub label: String,
    pub amount: Money,
    pub regime: DepreciationRegime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexYear {
    pub year: Year,
    pub additions: Vec<AssetAddition>,
    pub capex_total: Money,
    pub pre_contract_depreciation: Money,
    pub contract_depreciation: Money,
    pub total_depreciation: Money,
    pub net_book_value: Money,
}

pub struct CapexScheduler {
    config: CapExConfig,
    contract: ContractWindow,
    ctx: NumericContext,
    ledger: Vec<Asset>,
}

impl CapexScheduler {
    pub fn new(config: &CapExConfig, contract: ContractWindow) -> ProjectionResult<Self> {
        config.validate()?;

        let mut ledger = Vec::new();
        if let Some(state) = &config.historical_state {
            if state.remaining_to_depreciate > Decimal::ZERO {
                ledger.push(Asset {
                    label: "historical base".into(),
                    acquired_year: contract.start_year,
                    cost: state.remaining_to_depreciate,
                    accumulated: Decimal::ZERO,
                    annual_charge: state.annual_depreciation,
                    regime: DepreciationRegime::PreContract,
                });
            }
        }

        Ok(CapexScheduler {
            config: config.clone(),
            contract,
            ctx: NumericContext::default(),
            ledger,
        })
    }

    pub fn with_numeric(mut self, ctx: NumericContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn ledger(&self) -> &[Asset] {
        &self.ledger
    }

    pub fn net_book_value(&self) -> Money {
        self.ledger.iter().map(Asset::net_book_value).sum()
    }

    /// Book additions for `year`, then charge the year's depreciation.
    /// `total_revenue` sizes percent-of-revenue reinvestment.
    pub fn advance(&mut self, year: Year, total_revenue: Money) -> ProjectionResult<CapexYear> {
        let additions = self.book_additions(year, total_revenue)?;
        let capex_total = additions.iter().map(|a| a.amount).sum();

        let pre_contract_depreciation = self.charge_pool();
        let contract_depreciation = self.charge_contract_assets();

        Ok(CapexYear {
            year,
            additions,
            capex_total,
            pre_contract_depreciation,
            contract_depreciation,
            total_depreciation: pre_contract_depreciation + contract_depreciation,
            net_book_value: self.net_book_value(),
        })
    }

    fn book_additions(
        &mut self,
        year: Year,
        total_revenue: Money,
    ) -> ProjectionResult<Vec<AssetAddition>> {
        let mut pending: Vec<(String, Money, u32, DepreciationRegime)> = Vec::new();

        for e in self.config.transition_capex.iter().filter(|e| e.year == year) {
            let category = self.config.category(&e.category)?;
            pending.push((
                format!("transition capex ({})", e.category),
                e.amount,
                category.useful_life_years,
                category.regime,
            ));
        }

        for v in self.config.virtual_assets.iter().filter(|v| v.year == year) {
            pending.push((v.name.clone(), v.amount, v.useful_life_years, v.regime));
        }

        if let Some(auto) = self.config.auto_reinvestment.as_ref().filter(|a| a.enabled) {
            if self.reinvests_in(year, auto.frequency_years) {
                let category = self.config.category(&auto.category)?;
                let amount = match &auto.amount {
                    ReinvestmentAmount::Fixed { amount } => *amount,
                    ReinvestmentAmount::PercentOfRevenue { percent } => total_revenue * *percent,
                };
                pending.push((
                    format!("reinvestment ({})", auto.category),
                    amount,
                    category.useful_life_years,
                    DepreciationRegime::ContractPeriod,
                ));
            }
        }

        let mut additions = Vec::with_capacity(pending.len());
        for (label, amount, life, regime) in pending {
            let cost = self.ctx.round(amount);
            if cost.is_zero() {
                continue;
            }
            self.ledger.push(Asset {
                label: label.clone(),
                acquired_year: year,
                cost,
                accumulated: Decimal::ZERO,
                annual_charge: cost / Decimal::from(life),
                regime,
            });
            additions.push(AssetAddition {
                label,
                amount: cost,
                regime,
            });
        }
        Ok(additions)
    }

    fn reinvests_in(&self, year: Year, frequency: u32) -> bool {
        if frequency == 0 || !self.contract.contains(year) || year == self.contract.start_year {
            return false;
        }
        self.contract.years_elapsed(year) % frequency == 0
    }

    /// Pool charge: `min(run-rate, remaining)` spread over pre-contract assets
    /// oldest first.
    fn charge_pool(&mut self) -> Money {
        let pool = || {
            self.ledger
                .iter()
                .filter(|a| a.regime == DepreciationRegime::PreContract)
        };
        let run_rate: Money = pool().map(|a| a.annual_charge).sum();
        let remaining: Money = pool().map(Asset::net_book_value).sum();
        let charge = self.ctx.round(run_rate.min(remaining)).min(remaining);
        if charge <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mut left = charge;
        for asset in self
            .ledger
            .iter_mut()
            .filter(|a| a.regime == DepreciationRegime::PreContract)
        {
            if left.is_zero() {
                break;
            }
            let take = asset.net_book_value().min(left);
            asset.accumulated += take;
            left -= take;
        }
        charge
    }

    fn charge_contract_assets(&mut self) -> Money {
        let ctx = self.ctx;
        let mut total = Decimal::ZERO;
        for asset in self
            .ledger
            .iter_mut()
            .filter(|a| a.regime == DepreciationRegime::ContractPeriod)
        {
            let charge = ctx.round(asset.annual_charge).min(asset.net_book_value());
            asset.accumulated += charge;
            total += charge;
        }
        total
    }
}

/// Stand-alone depreciation report over the given years and revenues.
pub fn depreciation_schedule(
    config: &CapExConfig,
    contract: ContractWindow,
    revenue_by_year: &[(Year, Money)],
    ctx: &NumericContext,
) -> ProjectionResult<Vec<CapexYear>> {
    let mut scheduler = CapexScheduler::new(config, contract)?.with_numeric(*ctx);
    revenue_by_year
        .iter()
        .map(|&(year, revenue)| scheduler.advance(year, revenue))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract() -> ContractWindow {
        ContractWindow {
            start_year: 2026,
            end_year: 2035,
        }
    }

    fn categories() -> Vec<AssetCategory> {
        vec![
            AssetCategory {
                name: "building".into(),
                regime: DepreciationRegime::PreContract,
                useful_life_years: 20,
            },
            AssetCategory {
                name: "equipment".into(),
                regime: DepreciationRegime::ContractPeriod,
                useful_life_years: 5,
            },
        ]
    }

    fn seeded(annual: Money, remaining: Money) -> CapExConfig {
        CapExConfig {
            categories: categories(),
            historical_state: Some(HistoricalCapexState {
                gross_ppe: dec!(10000),
                accumulated_depreciation: dec!(10000) - remaining,
                annual_depreciation: annual,
                remaining_to_depreciate: remaining,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_pool_decays_to_zero_without_restart() {
        let mut s = CapexScheduler::new(&seeded(dec!(1000), dec!(2500)), contract()).unwrap();
        let charges: Vec<Money> = (2026..=2030)
            .map(|y| s.advance(y, Decimal::ZERO).unwrap().pre_contract_depreciation)
            .collect();
        assert_eq!(
            charges,
            vec![dec!(1000), dec!(1000), dec!(500), dec!(0), dec!(0)]
        );
        assert_eq!(s.net_book_value(), Decimal::ZERO);
    }

    #[test]
    fn test_transition_capex_joins_pool() {
        let mut config = seeded(dec!(1000), dec!(2000));
        config.transition_capex.push(TransitionCapexEvent {
            year: 2025,
            amount: dec!(4000),
            category: "building".into(),
        });
        let mut s = CapexScheduler::new(&config, contract()).unwrap();
        let y = s.advance(2025, Decimal::ZERO).unwrap();
        assert_eq!(y.capex_total, dec!(4000));
        // run-rate 1000 + 4000 / 20
        assert_eq!(y.pre_contract_depreciation, dec!(1200));
        assert_eq!(y.net_book_value, dec!(4800));
    }

    #[test]
    fn test_transition_capex_follows_category_regime() {
        let mut config = seeded(dec!(1000), dec!(2000));
        config.transition_capex.push(TransitionCapexEvent {
            year: 2025,
            amount: dec!(5000),
            category: "equipment".into(),
        });
        let mut s = CapexScheduler::new(&config, contract()).unwrap();
        let y = s.advance(2025, Decimal::ZERO).unwrap();
        assert_eq!(y.capex_total, dec!(5000));
        // Pool keeps its own run-rate; equipment is straight line over 5 years
        assert_eq!(y.pre_contract_depreciation, dec!(1000));
        assert_eq!(y.contract_depreciation, dec!(1000));
        let equipment = s.ledger().iter().find(|a| a.cost == dec!(5000)).unwrap();
        assert_eq!(equipment.regime, DepreciationRegime::ContractPeriod);
    }

    #[test]
    fn test_reinvestment_into_pre_contract_category_rejected() {
        let config = CapExConfig {
            categories: categories(),
            auto_reinvestment: Some(AutoReinvestment {
                enabled: true,
                frequency_years: 5,
                amount: ReinvestmentAmount::Fixed {
                    amount: dec!(1000),
                },
                category: "building".into(),
            }),
            ..Default::default()
        };
        let err = CapexScheduler::new(&config, contract()).err().unwrap();
        assert_eq!(err.code(), "INVALID_CAPEX_CONFIG");
    }

    #[test]
    fn test_contract_asset_straight_line_floors_at_zero() {
        let config = CapExConfig {
            categories: categories(),
            virtual_assets: vec![VirtualAsset {
                year: 2027,
                name: "labs".into(),
                amount: dec!(1000),
                useful_life_years: 3,
                regime: DepreciationRegime::ContractPeriod,
            }],
            ..Default::default()
        };
        let mut s = CapexScheduler::new(&config, contract()).unwrap();
        assert_eq!(s.advance(2026, Decimal::ZERO).unwrap().contract_depreciation, dec!(0));
        let charges: Vec<Money> = (2027..=2031)
            .map(|y| s.advance(y, Decimal::ZERO).unwrap().contract_depreciation)
            .collect();
        assert_eq!(
            charges,
            vec![dec!(333.33), dec!(333.33), dec!(333.33), dec!(0.01), dec!(0)]
        );
        assert_eq!(s.net_book_value(), Decimal::ZERO);
    }

    #[test]
    fn test_auto_reinvestment_timing_and_amount() {
        let config = CapExConfig {
            categories: categories(),
            auto_reinvestment: Some(AutoReinvestment {
                enabled: true,
                frequency_years: 3,
                amount: ReinvestmentAmount::PercentOfRevenue {
                    percent: dec!(0.02),
                },
                category: "equipment".into(),
            }),
            ..Default::default()
        };
        let mut s = CapexScheduler::new(&config, contract()).unwrap();
        let fired: Vec<Year> = (2026..=2035)
            .filter(|&y| !s.advance(y, dec!(1000000)).unwrap().additions.is_empty())
            .collect();
        assert_eq!(fired, vec![2029, 2032, 2035]);
        assert_eq!(s.ledger()[0].cost, dec!(20000));
        assert_eq!(s.ledger()[0].annual_charge, dec!(4000));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut config = seeded(dec!(100), dec!(100));
        config.transition_capex.push(TransitionCapexEvent {
            year: 2025,
            amount: dec!(10),
            category: "spaceship".into(),
        });
        let err = CapexScheduler::new(&config, contract()).err().unwrap();
        assert_eq!(err.code(), "UNKNOWN_ASSET_CATEGORY");
    }

    #[test]
    fn test_zero_life_rejected() {
        let mut config = seeded(dec!(100), dec!(100));
        config.categories[1].useful_life_years = 0;
        let err = CapexScheduler::new(&config, contract()).err().unwrap();
        assert_eq!(err.code(), "INVALID_CAPEX_CONFIG");
    }

    #[test]
    fn test_depreciation_schedule_report() {
        let rows = depreciation_schedule(
            &seeded(dec!(1000), dec!(1500)),
            contract(),
            &[(2026, dec!(0)), (2027, dec!(0))],
            &NumericContext::default(),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].total_depreciation, dec!(500));
    }
}
