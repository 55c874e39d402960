pub mod dynamic;
pub mod historical;
pub mod transition;

use serde::{Deserialize, Serialize};

use crate::types::{Money, Year};

/// Pre-financing operating lines of one projected year: everything above
/// depreciation, interest and zakat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingLines {
    pub year: Year,
    pub tuition_revenue: Money,
    pub other_revenue: Money,
    pub total_revenue: Money,
    pub rent_expense: Money,
    pub staff_costs: Money,
    pub other_opex: Money,
}

impl OperatingLines {
    pub fn ebitda(&self) -> Money {
        self.total_revenue - self.rent_expense - self.staff_costs - self.other_opex
    }
}
