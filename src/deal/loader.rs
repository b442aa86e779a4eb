//! Load deals from a deal sheet CSV
//!
//! Rows are parsed, not validated: a deal with out-of-domain assumptions
//! still loads and is reported on its own when it is evaluated.

use super::{Deal, DealAssumptions};
use crate::error::LoadError;
use csv::Reader;
use std::path::Path;

/// Default location of the sample deal sheet
pub const DEFAULT_DEALS_PATH: &str = "data/sample_deals.csv";

/// Raw CSV row matching the deal sheet columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "DealID")]
    deal_id: u32,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "PurchasePrice")]
    purchase_price: f64,
    #[serde(rename = "EquityFraction")]
    equity_fraction: f64,
    #[serde(rename = "AnnualInterestRate")]
    annual_interest_rate: f64,
    #[serde(rename = "AmortizationYears")]
    amortization_years: u32,
    #[serde(rename = "HoldYears")]
    hold_years: u32,
    #[serde(rename = "FirstYearNOI")]
    first_year_noi: f64,
    #[serde(rename = "AnnualNOIGrowth")]
    annual_noi_growth: f64,
    #[serde(rename = "ExitCapRate")]
    exit_cap_rate: f64,
}

impl CsvRow {
    fn into_deal(self) -> Deal {
        let assumptions = DealAssumptions {
            purchase_price: self.purchase_price,
            equity_fraction: self.equity_fraction,
            annual_interest_rate: self.annual_interest_rate,
            amortization_years: self.amortization_years,
            hold_years: self.hold_years,
            first_year_noi: self.first_year_noi,
            annual_noi_growth: self.annual_noi_growth,
            exit_cap_rate: self.exit_cap_rate,
        };

        Deal::new(self.deal_id, self.name, assumptions)
    }
}

/// Load all deals from a CSV file
pub fn load_deals<P: AsRef<Path>>(path: P) -> Result<Vec<Deal>, LoadError> {
    let file = std::fs::File::open(path)?;
    load_deals_from_reader(file)
}

/// Load deals from any reader (e.g., string buffer, request body)
pub fn load_deals_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<Deal>, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut deals = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        deals.push(row.into_deal());
    }

    Ok(deals)
}

/// Load the bundled sample deal sheet
pub fn load_sample_deals() -> Result<Vec<Deal>, LoadError> {
    load_deals(DEFAULT_DEALS_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "DealID,Name,PurchasePrice,EquityFraction,AnnualInterestRate,\
                          AmortizationYears,HoldYears,FirstYearNOI,AnnualNOIGrowth,ExitCapRate\n";

    #[test]
    fn test_load_sample_deals() {
        let deals = load_sample_deals().expect("Failed to load deals");
        assert_eq!(deals.len(), 4);

        let d1 = &deals[0];
        assert_eq!(d1.deal_id, 1);
        assert_eq!(d1.name, "Riverside Industrial");
        assert_eq!(d1.assumptions.purchase_price, 10_000_000.0);
        assert_eq!(d1.assumptions.hold_years, 5);
        assert_eq!(d1.assumptions.exit_cap_rate, 0.06);

        let d3 = &deals[2];
        assert_eq!(d3.assumptions.amortization_years, 25);
        assert_eq!(d3.assumptions.hold_years, 10);
    }

    #[test]
    fn test_load_from_reader() {
        let data = format!("{}9,Test Deal,1000,0.5,0.0,10,3,100,0.0,0.1\n", HEADER);
        let deals = load_deals_from_reader(data.as_bytes()).unwrap();
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].assumptions.initial_equity(), 500.0);
    }

    #[test]
    fn test_invalid_row_does_not_sink_the_sheet() {
        let data = format!(
            "{}11,Good,1000,0.5,0.05,10,3,100,0.0,0.1\n12,Broken,1000,0.5,0.05,10,0,100,0.0,0.1\n",
            HEADER
        );
        let deals = load_deals_from_reader(data.as_bytes()).unwrap();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[1].deal_id, 12);
        assert_eq!(deals[1].assumptions.check().unwrap_err().field(), "hold_years");
    }

    #[test]
    fn test_malformed_number() {
        let data = format!("{}1,Bad,abc,0.5,0.05,10,5,100,0.0,0.1\n", HEADER);
        let result = load_deals_from_reader(data.as_bytes());
        assert!(matches!(result, Err(LoadError::Csv(_))));
    }
}
