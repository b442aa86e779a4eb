//! CRE Returns CLI
//!
//! Command-line interface for evaluating commercial real estate deals

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cre_returns::config::loader::load_overrides;
use cre_returns::deal::{load_deals, loader::DEFAULT_DEALS_PATH};
use cre_returns::projection::{BatchOutcome, DealEvaluation};
use cre_returns::{
    AssumptionPatch, DealAssumptions, DerivedMetrics, EngineConfig, OptimizationResult, ReturnEngine, ScenarioSet,
    ValidationReport,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process;

/// Deterministic return engine for commercial real estate deals
#[derive(Parser)]
#[command(name = "cre-returns", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// `key,value` CSV of engine overrides, applied after CRE_* variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project cash flows and compute IRR, multiple and cash-on-cash
    Evaluate(DealArgs),
    /// Run conservative, base and aggressive scenarios
    Scenarios(DealArgs),
    /// Find the equity fraction that hits a target IRR
    Optimize(OptimizeArgs),
    /// Check assumptions and returns for red flags
    Validate(DealArgs),
    /// Evaluate every deal in a deal sheet CSV
    Batch(BatchArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
struct DealArgs {
    /// JSON file with a full set of assumptions (flags below override it)
    #[arg(long)]
    input: Option<PathBuf>,

    /// JSON file with a partial set of assumptions applied last
    #[arg(long)]
    patch: Option<PathBuf>,

    #[arg(long)]
    purchase_price: Option<f64>,
    #[arg(long)]
    equity_fraction: Option<f64>,
    #[arg(long)]
    interest_rate: Option<f64>,
    #[arg(long)]
    amortization_years: Option<u32>,
    #[arg(long)]
    hold_years: Option<u32>,
    #[arg(long)]
    noi: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    noi_growth: Option<f64>,
    #[arg(long)]
    exit_cap: Option<f64>,
}

#[derive(Args)]
struct OptimizeArgs {
    #[command(flatten)]
    deal: DealArgs,

    /// Target levered IRR as a decimal (0.15 for 15%)
    #[arg(long)]
    target_irr: f64,
}

#[derive(Args)]
struct BatchArgs {
    /// Deal sheet CSV
    #[arg(long, default_value = DEFAULT_DEALS_PATH)]
    deals: PathBuf,
}

impl DealArgs {
    fn flag_patch(&self) -> AssumptionPatch {
        AssumptionPatch {
            purchase_price: self.purchase_price,
            equity_fraction: self.equity_fraction,
            annual_interest_rate: self.interest_rate,
            amortization_years: self.amortization_years,
            hold_years: self.hold_years,
            first_year_noi: self.noi,
            annual_noi_growth: self.noi_growth,
            exit_cap_rate: self.exit_cap,
        }
    }

    fn resolve(&self) -> Result<DealAssumptions> {
        let flags = self.flag_patch();

        let base = match &self.input {
            Some(path) => {
                let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
                let base: DealAssumptions =
                    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
                base.apply_patch(&flags)
            }
            None => DealAssumptions {
                purchase_price: flags.purchase_price.context("--purchase-price is required (or provide --input)")?,
                equity_fraction: flags.equity_fraction.context("--equity-fraction is required (or provide --input)")?,
                annual_interest_rate: flags.annual_interest_rate.context("--interest-rate is required (or provide --input)")?,
                amortization_years: flags.amortization_years.context("--amortization-years is required (or provide --input)")?,
                hold_years: flags.hold_years.context("--hold-years is required (or provide --input)")?,
                first_year_noi: flags.first_year_noi.context("--noi is required (or provide --input)")?,
                annual_noi_growth: flags.annual_noi_growth.context("--noi-growth is required (or provide --input)")?,
                exit_cap_rate: flags.exit_cap_rate.context("--exit-cap is required (or provide --input)")?,
            },
        };

        match &self.patch {
            Some(path) => {
                let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
                let patch: AssumptionPatch =
                    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
                Ok(base.apply_patch(&patch))
            }
            None => Ok(base),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env().context("reading CRE_* overrides")?;
    if let Some(path) = path {
        for (key, value) in load_overrides(path).with_context(|| format!("reading {}", path.display()))? {
            config.apply_override(&key, &value)?;
        }
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let engine = ReturnEngine::new(load_config(cli.config.as_ref())?)?;

    match cli.command {
        Commands::Evaluate(args) => {
            let evaluation = engine.evaluate(&args.resolve()?)?;
            emit(cli.output, &evaluation, print_evaluation)?;
        }
        Commands::Scenarios(args) => {
            let scenarios = engine.generate_scenarios(&args.resolve()?)?;
            emit(cli.output, &scenarios, print_scenarios)?;
        }
        Commands::Optimize(args) => {
            let result = engine.optimize_for_irr(&args.deal.resolve()?, args.target_irr)?;
            emit(cli.output, &result, print_optimization)?;
        }
        Commands::Validate(args) => {
            let report = engine.validate(&args.resolve()?);
            emit(cli.output, &report, print_validation)?;
            if !report.is_valid() {
                process::exit(1);
            }
        }
        Commands::Batch(args) => {
            let deals = load_deals(&args.deals).with_context(|| format!("loading {}", args.deals.display()))?;
            let outcomes = engine.evaluate_batch(&deals);
            emit(cli.output, &outcomes, |o| print_batch(o))?;
        }
    }

    Ok(())
}

fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T, table: impl Fn(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => table(value),
    }
    Ok(())
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn print_metrics(metrics: &DerivedMetrics) {
    println!("  IRR:                 {} ({})", pct(metrics.irr), metrics.irr_status);
    println!("  Equity multiple:     {:.3}x", metrics.equity_multiple);
    println!("  Cash-on-cash (yr 1): {}", pct(metrics.cash_on_cash_year1));
    println!("  Annual debt service: ${:.2}", metrics.annual_debt_service);
    println!("  Equity invested:     ${:.2}", metrics.initial_equity);
    println!("  Net profit:          ${:.2}", metrics.net_profit);
    if let Some(dscr) = metrics.dscr_year1 {
        println!("  DSCR (yr 1):         {:.2}x", dscr);
    }
}

fn print_evaluation(evaluation: &DealEvaluation) {
    let projection = &evaluation.projection;
    let a = &projection.assumptions;

    println!("Deal: ${:.0} at {} going-in cap, {} equity, {} rate, {}y amortization",
        a.purchase_price, pct(a.entry_cap_rate()), pct(a.equity_fraction), pct(a.annual_interest_rate), a.amortization_years);
    println!("Loan: ${:.2} ({} LTC), payment ${:.2}/month\n",
        projection.loan.principal, pct(a.loan_to_cost()), projection.loan.monthly_payment);

    println!("{:>4} {:>14} {:>14} {:>14} {:>16} {:>16} {:>7}",
        "Year", "NOI", "Debt Service", "Operating CF", "Sale Proceeds", "Total CF", "DSCR");
    println!("{}", "-".repeat(91));
    println!("{:>4} {:>14} {:>14} {:>14} {:>16} {:>16.2} {:>7}", 0, "", "", "", "", projection.series.flows[0], "");
    for row in &projection.rows {
        let dscr = row.dscr.map(|d| format!("{:.2}", d)).unwrap_or_else(|| "-".to_string());
        println!("{:>4} {:>14.2} {:>14.2} {:>14.2} {:>16.2} {:>16.2} {:>7}",
            row.year, row.noi, row.debt_service, row.operating_cash_flow, row.exit_proceeds, row.total_cash_flow, dscr);
    }

    let summary = projection.summary();
    println!("{}", "-".repeat(91));
    println!("{:>4} {:>14.2} {:>14.2} {:>14.2} {:>16.2}", "Sum", summary.total_noi, summary.total_debt_service,
        summary.total_operating_cash_flow, summary.net_sale_proceeds);
    println!("Interest paid over {} years: ${:.2}", summary.hold_years, summary.total_interest);

    let exit = &projection.exit;
    println!("\nExit: NOI ${:.2} at {} cap = ${:.2}, costs ${:.2}, payoff ${:.2}",
        exit.exit_noi, pct(a.exit_cap_rate), exit.sale_price, exit.selling_costs, exit.loan_payoff);
    println!("\nReturns:");
    print_metrics(&evaluation.metrics);
}

fn print_scenarios(set: &ScenarioSet) {
    println!("{:<13} {:>8} {:>8} {:>16} {:>10} {:>10} {:>9}",
        "Scenario", "Growth", "Exit Cap", "Terminal Value", "IRR", "Multiple", "CoC");
    println!("{}", "-".repeat(80));
    for s in set.iter() {
        println!("{:<13} {:>8} {:>8} {:>16.2} {:>10} {:>9.3}x {:>9}",
            s.label.as_str(),
            pct(s.assumptions.annual_noi_growth),
            pct(s.assumptions.exit_cap_rate),
            s.terminal_value,
            pct(s.metrics.irr),
            s.metrics.equity_multiple,
            pct(s.metrics.cash_on_cash_year1));
    }
}

fn print_optimization(result: &OptimizationResult) {
    println!("Target IRR:      {}", pct(result.target_irr));
    println!("Equity fraction: {}", pct(result.equity_fraction));
    println!("Achieved IRR:    {} ({})", pct(result.achieved_irr), result.irr_status);
    if result.reachable {
        println!("Target reached after {} iterations", result.iterations);
    } else {
        println!("Target not reachable within equity bounds; closest result shown");
    }
}

fn print_validation(report: &ValidationReport) {
    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("No issues found");
        return;
    }
    for message in report.messages() {
        println!("{:?}: {}", message.severity, message.message);
    }
}

fn print_batch(outcomes: &[BatchOutcome]) {
    println!("{:>5} {:<28} {:>10} {:>10} {:>9}", "ID", "Name", "IRR", "Multiple", "CoC");
    println!("{}", "-".repeat(66));
    for outcome in outcomes {
        match (&outcome.metrics, &outcome.error) {
            (Some(m), _) => println!("{:>5} {:<28} {:>10} {:>9.3}x {:>9}",
                outcome.deal_id, outcome.name, pct(m.irr), m.equity_multiple, pct(m.cash_on_cash_year1)),
            (None, error) => println!("{:>5} {:<28} error: {}",
                outcome.deal_id, outcome.name, error.as_deref().unwrap_or("unknown")),
        }
    }
}
