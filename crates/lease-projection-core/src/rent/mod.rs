pub mod model;

pub use model::{rent_schedule, RentParams, RentScheduleRow};
