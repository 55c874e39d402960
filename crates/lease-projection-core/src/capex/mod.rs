pub mod scheduler;

pub use scheduler::{
    depreciation_schedule, Asset, AssetAddition, AssetCategory, AutoReinvestment, CapExConfig,
    CapexScheduler, CapexYear, DepreciationRegime, HistoricalCapexState, ReinvestmentAmount,
    TransitionCapexEvent, VirtualAsset,
};
