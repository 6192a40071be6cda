mod calculators;
mod engine;
mod error;
mod roth;
mod state;
mod state_tax;
mod tables;
mod types;

pub use calculators::{
    FilingContext, IncomeComposition, IrmaaAssessment, TaxAssessment, assess, capital_gains_tax,
    deduction_for, irmaa_tier, ordinary_tax, rmd_amount, rmd_start_age, taxable_social_security,
};
pub use engine::{
    Projection, ProjectionPhase, ProjectionSummary, run_projection, validate_inputs,
};
pub use error::{ProjectionError, Result};
pub use roth::{ConversionContext, recommend_conversion};
pub use state::{HouseholdFinancialState, MemberState};
pub use state_tax::{effective_rate, rate_for_zip, state_for_zip, validate_zip};
pub use tables::{
    Bracket, BracketSchedule, ByFilingStatus, Extrapolation, IrmaaBracket, PublishedTaxLaw,
    RmdTable, SsThresholds, TaxLawProvider, YearlyTaxLawTable,
};
pub use types::{
    AccountBalances, Contributions, ConversionTarget, ConversionWindow, FilingStatus, Household,
    HouseholdProfile, IncomeBreakdown, MemberIncome, Person, PriorMagi, RothConversionSettings,
    StartingBalances, TaxScenarioInputs, Withdrawals, YearlyProjectionResult, round_cents,
};
