use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::error::{ProjectionError, invalid};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilingStatus {
    Single,
    MarriedFilingJointly,
}

impl FromStr for FilingStatus {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "s" => Ok(FilingStatus::Single),
            "married-filing-jointly" | "married_filing_jointly" | "marriedfilingjointly"
            | "mfj" | "joint" | "married" => Ok(FilingStatus::MarriedFilingJointly),
            other => Err(invalid(format!("unrecognised filing status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub birth_date: NaiveDate,
    pub plan_to_age: u32,
}

impl Person {
    pub fn birth_year(&self) -> i32 {
        self.birth_date.year()
    }

    pub fn age_in(&self, year: i32) -> i32 {
        year.saturating_sub(self.birth_year())
    }

    pub fn alive_in(&self, year: i32) -> bool {
        u32::try_from(self.age_in(year)).map_or(true, |age| age <= self.plan_to_age)
    }

    pub fn final_year(&self) -> i32 {
        self.birth_year().saturating_add_unsigned(self.plan_to_age)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Household {
    Single(Person),
    Married { primary: Person, spouse: Person },
}

impl Household {
    pub fn primary(&self) -> &Person {
        match self {
            Household::Single(person) => person,
            Household::Married { primary, .. } => primary,
        }
    }

    pub fn spouse(&self) -> Option<&Person> {
        match self {
            Household::Single(_) => None,
            Household::Married { spouse, .. } => Some(spouse),
        }
    }

    pub fn final_year(&self) -> i32 {
        let primary = self.primary().final_year();
        self.spouse()
            .map_or(primary, |spouse| primary.max(spouse.final_year()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdProfile {
    pub household: Household,
    pub filing_status: FilingStatus,
    pub zip_code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contributions {
    pub deferred: f64,
    pub roth: f64,
    pub employer_match: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemberIncome {
    pub ss_start_year: Option<i32>,
    /// Annual benefit in as-of-year dollars.
    pub ss_annual_benefit: f64,
    /// Defaults to the year the member turns 65.
    pub medicare_start_year: Option<i32>,
    pub contributions: Contributions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StartingBalances {
    pub tax_deferred: f64,
    pub roth: f64,
    pub taxable: f64,
    pub other_assets: f64,
    pub real_estate: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ConversionWindow {
    Always,
    Years { first: i32, last: i32 },
}

impl ConversionWindow {
    pub fn contains(&self, year: i32) -> bool {
        match *self {
            ConversionWindow::Always => true,
            ConversionWindow::Years { first, last } => (first..=last).contains(&year),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ConversionTarget {
    OrdinaryBracket { rate: f64 },
    /// Keep MAGI at or below the ceiling of IRMAA tier `tier` (0 = no surcharge).
    IrmaaTier { tier: usize },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RothConversionSettings {
    pub enabled: bool,
    pub window: ConversionWindow,
    pub target: ConversionTarget,
}

impl Default for RothConversionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            window: ConversionWindow::Always,
            target: ConversionTarget::IrmaaTier { tier: 0 },
        }
    }
}

/// MAGI for the two years before the as-of year, feeding the IRMAA look-back.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PriorMagi {
    pub two_years_ago: f64,
    pub last_year: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxScenarioInputs {
    pub wages: f64,
    pub interest: f64,
    pub dividends: f64,
    pub capital_gain_distributions: f64,
    pub short_term_gains: f64,
    pub long_term_gains: f64,
    pub other_income: f64,
    pub balances: StartingBalances,
    pub living_expenses: f64,
    pub growth_rate: f64,
    pub inflation_rate: f64,
    pub retirement_year: i32,
    pub primary: MemberIncome,
    pub spouse: Option<MemberIncome>,
    pub conversion: RothConversionSettings,
    pub qcd_amount: f64,
    pub prior_magi: PriorMagi,
    pub state_tax_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalances {
    pub tax_deferred: f64,
    pub roth: f64,
    pub taxable: f64,
    pub other_assets: f64,
    pub real_estate: f64,
}

impl AccountBalances {
    pub fn from_start(start: &StartingBalances) -> Self {
        Self {
            tax_deferred: start.tax_deferred,
            roth: start.roth,
            taxable: start.taxable,
            other_assets: start.other_assets,
            real_estate: start.real_estate,
        }
    }

    /// Balances that earn the portfolio growth rate.
    pub fn investable(&self) -> f64 {
        self.tax_deferred + self.roth + self.taxable + self.other_assets
    }

    pub fn net_worth(&self) -> f64 {
        self.investable() + self.real_estate
    }

    pub fn clamp_non_negative(&mut self) -> f64 {
        let mut clamped = 0.0;
        for value in [
            &mut self.tax_deferred,
            &mut self.roth,
            &mut self.taxable,
            &mut self.other_assets,
            &mut self.real_estate,
        ] {
            if *value < 0.0 {
                clamped -= *value;
                *value = 0.0;
            }
        }
        clamped
    }

    pub(crate) fn rounded(&self) -> Self {
        Self {
            tax_deferred: round_cents(self.tax_deferred),
            roth: round_cents(self.roth),
            taxable: round_cents(self.taxable),
            other_assets: round_cents(self.other_assets),
            real_estate: round_cents(self.real_estate),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeBreakdown {
    pub wages: f64,
    pub interest: f64,
    pub dividends: f64,
    pub capital_gains: f64,
    pub social_security: f64,
    pub rmd: f64,
    pub roth_conversion: f64,
    pub qcd: f64,
    pub other: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawals {
    pub taxable: f64,
    pub tax_deferred: f64,
    pub roth: f64,
}

impl Withdrawals {
    pub fn total(&self) -> f64 {
        self.taxable + self.tax_deferred + self.roth
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyProjectionResult {
    pub year: i32,
    pub primary_age: Option<u32>,
    pub spouse_age: Option<u32>,
    pub filing_status: FilingStatus,
    pub income: IncomeBreakdown,
    pub taxable_social_security: f64,
    pub magi: f64,
    pub taxable_income: f64,
    pub federal_tax: f64,
    pub capital_gains_tax: f64,
    pub state_tax: f64,
    pub irmaa_tier: usize,
    pub irmaa_lookback_magi: f64,
    pub medicare_enrollees: u32,
    pub medicare_premium: f64,
    /// Portion of the premium above the base (tier 0) rate.
    pub irmaa_surcharge: f64,
    pub living_expenses: f64,
    pub contributions: f64,
    pub investment_growth: f64,
    pub withdrawals: Withdrawals,
    pub net_cash_flow: f64,
    pub unfunded_shortfall: f64,
    pub insufficient_funds: bool,
    pub ending_balances: AccountBalances,
}

impl YearlyProjectionResult {
    pub fn total_tax(&self) -> f64 {
        self.federal_tax + self.capital_gains_tax + self.state_tax
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
