pub mod batch;
pub mod capex_schedule;
pub mod fingerprint;
pub mod project;
pub mod ratios;
pub mod rent_schedule;
