//! Conservative / base / aggressive scenario generation
//!
//! Each scenario shifts NOI growth and exit cap in opposite directions and
//! runs the full projection. The three pipelines share nothing, so they run
//! in parallel.

use crate::config::ScenarioShocks;
use crate::deal::DealAssumptions;
use crate::error::EngineResult;
use crate::projection::{DerivedMetrics, ReturnEngine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioLabel {
    Conservative,
    Base,
    Aggressive,
}

impl ScenarioLabel {
    pub const ALL: [ScenarioLabel; 3] = [
        ScenarioLabel::Conservative,
        ScenarioLabel::Base,
        ScenarioLabel::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioLabel::Conservative => "Conservative",
            ScenarioLabel::Base => "Base",
            ScenarioLabel::Aggressive => "Aggressive",
        }
    }

    /// Assumption variant for this label
    ///
    /// The aggressive exit cap never drops below `min_exit_cap_ratio` of the
    /// base cap, so it stays positive for small base caps.
    pub fn apply(&self, base: &DealAssumptions, shocks: &ScenarioShocks) -> DealAssumptions {
        match self {
            ScenarioLabel::Conservative => DealAssumptions {
                annual_noi_growth: base.annual_noi_growth - shocks.noi_growth_shift,
                exit_cap_rate: base.exit_cap_rate + shocks.exit_cap_shift,
                ..*base
            },
            ScenarioLabel::Base => *base,
            ScenarioLabel::Aggressive => DealAssumptions {
                annual_noi_growth: base.annual_noi_growth + shocks.noi_growth_shift,
                exit_cap_rate: (base.exit_cap_rate - shocks.exit_cap_shift)
                    .max(base.exit_cap_rate * shocks.min_exit_cap_ratio),
                ..*base
            },
        }
    }
}

impl std::fmt::Display for ScenarioLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully evaluated scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub label: ScenarioLabel,
    pub assumptions: DealAssumptions,
    /// Gross sale price at exit
    pub terminal_value: f64,
    pub net_sale_proceeds: f64,
    pub metrics: DerivedMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub conservative: Scenario,
    pub base: Scenario,
    pub aggressive: Scenario,
}

impl ScenarioSet {
    /// Scenarios in conservative, base, aggressive order
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        [&self.conservative, &self.base, &self.aggressive].into_iter()
    }
}

impl ReturnEngine {
    /// Evaluate the three scenarios around `base`
    pub fn generate_scenarios(&self, base: &DealAssumptions) -> EngineResult<ScenarioSet> {
        base.check()?;

        let (conservative, (base_case, aggressive)) = rayon::join(
            || self.run_scenario(ScenarioLabel::Conservative, base),
            || {
                rayon::join(
                    || self.run_scenario(ScenarioLabel::Base, base),
                    || self.run_scenario(ScenarioLabel::Aggressive, base),
                )
            },
        );

        Ok(ScenarioSet {
            conservative: conservative?,
            base: base_case?,
            aggressive: aggressive?,
        })
    }

    fn run_scenario(&self, label: ScenarioLabel, base: &DealAssumptions) -> EngineResult<Scenario> {
        let assumptions = label.apply(base, &self.config().scenarios);
        let evaluation = self.evaluate(&assumptions)?;
        log::debug!("{} scenario irr {:.6}", label, evaluation.metrics.irr);

        Ok(Scenario {
            label,
            assumptions,
            terminal_value: evaluation.projection.exit.sale_price,
            net_sale_proceeds: evaluation.projection.exit.net_proceeds,
            metrics: evaluation.metrics,
        })
    }
}
