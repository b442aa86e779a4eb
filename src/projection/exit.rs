//! Sale of the asset at the end of the hold

use crate::config::{ExitConfig, ExitNoiBasis};
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Reversion value at exit, net of costs and loan payoff
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitValuation {
    /// NOI the buyer capitalizes
    pub exit_noi: f64,
    /// Gross sale price, `exit_noi / exit_cap_rate`
    pub sale_price: f64,
    pub selling_costs: f64,
    /// Loan balance repaid out of the proceeds
    pub loan_payoff: f64,
    /// Cash to equity from the sale; negative when underwater
    pub net_proceeds: f64,
}

impl ExitValuation {
    /// Price the sale off the final hold-year NOI
    pub fn compute(
        final_year_noi: f64,
        annual_noi_growth: f64,
        exit_cap_rate: f64,
        loan_payoff: f64,
        config: &ExitConfig,
    ) -> EngineResult<Self> {
        if exit_cap_rate <= 0.0 {
            return Err(EngineError::configuration(
                "exit_cap_rate",
                format!("must be positive, got {}", exit_cap_rate),
            ));
        }

        let exit_noi = match config.noi_basis {
            ExitNoiBasis::Forward => final_year_noi * (1.0 + annual_noi_growth),
            ExitNoiBasis::Trailing => final_year_noi,
        };
        let sale_price = exit_noi / exit_cap_rate;
        let selling_costs = sale_price * config.selling_cost_rate;

        Ok(Self {
            exit_noi,
            sale_price,
            selling_costs,
            loan_payoff,
            net_proceeds: sale_price - selling_costs - loan_payoff,
        })
    }
}
