use axum::{
    Router,
    extract::{Json, Path, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Datelike, Local, NaiveDate};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    Contributions, ConversionTarget, ConversionWindow, Extrapolation, FilingStatus, Household,
    HouseholdProfile, MemberIncome, Person, PriorMagi, ProjectionError, ProjectionSummary,
    PublishedTaxLaw, RothConversionSettings, StartingBalances, TaxLawProvider,
    TaxScenarioInputs, YearlyProjectionResult, YearlyTaxLawTable, run_projection,
};

/// Scenario flags. Rates are percentages (5 = 5%); amounts are annual dollars.
#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long, help = "First projected year; defaults to the current year")]
    pub as_of_year: Option<i32>,
    #[arg(long, default_value = "1960-01-01")]
    pub birth_date: NaiveDate,
    #[arg(long, default_value_t = 95)]
    pub plan_to_age: u32,
    #[arg(long, help = "Spouse birth date; makes the household married")]
    pub spouse_birth_date: Option<NaiveDate>,
    #[arg(long, default_value_t = 95)]
    pub spouse_plan_to_age: u32,
    #[arg(
        long,
        help = "single or married-filing-jointly; defaults from whether a spouse is given"
    )]
    pub filing_status: Option<FilingStatus>,
    #[arg(long, default_value = "75201")]
    pub zip_code: String,
    #[arg(long, help = "Flat state income-tax rate in percent, overrides the ZIP lookup")]
    pub state_tax_rate: Option<f64>,

    #[arg(long, default_value_t = 0.0)]
    pub wages: f64,
    #[arg(long, default_value_t = 0.0)]
    pub interest: f64,
    #[arg(long, default_value_t = 0.0)]
    pub dividends: f64,
    #[arg(long, default_value_t = 0.0)]
    pub capital_gain_distributions: f64,
    #[arg(long, default_value_t = 0.0)]
    pub short_term_gains: f64,
    #[arg(long, default_value_t = 0.0)]
    pub long_term_gains: f64,
    #[arg(long, default_value_t = 0.0)]
    pub other_income: f64,

    #[arg(long, default_value_t = 0.0)]
    pub tax_deferred_balance: f64,
    #[arg(long, default_value_t = 0.0)]
    pub roth_balance: f64,
    #[arg(long, default_value_t = 0.0)]
    pub taxable_balance: f64,
    #[arg(long, default_value_t = 0.0)]
    pub other_assets: f64,
    #[arg(long, default_value_t = 0.0)]
    pub real_estate: f64,

    #[arg(long, default_value_t = 60_000.0, help = "Annual living expenses in today's money")]
    pub living_expenses: f64,
    #[arg(long, default_value_t = 5.0, help = "Annual portfolio growth in percent")]
    pub growth_rate: f64,
    #[arg(long, default_value_t = 2.5, help = "Annual inflation in percent")]
    pub inflation_rate: f64,
    #[arg(long, help = "First year without wages or contributions; defaults to the as-of year")]
    pub retirement_year: Option<i32>,

    #[arg(long)]
    pub ss_start_year: Option<i32>,
    #[arg(long, default_value_t = 0.0, help = "Annual Social Security benefit in today's money")]
    pub ss_annual_benefit: f64,
    #[arg(long)]
    pub medicare_start_year: Option<i32>,
    #[arg(long, default_value_t = 0.0)]
    pub deferred_contribution: f64,
    #[arg(long, default_value_t = 0.0)]
    pub roth_contribution: f64,
    #[arg(long, default_value_t = 0.0)]
    pub employer_match: f64,

    #[arg(long)]
    pub spouse_ss_start_year: Option<i32>,
    #[arg(long, default_value_t = 0.0)]
    pub spouse_ss_annual_benefit: f64,
    #[arg(long)]
    pub spouse_medicare_start_year: Option<i32>,
    #[arg(long, default_value_t = 0.0)]
    pub spouse_deferred_contribution: f64,
    #[arg(long, default_value_t = 0.0)]
    pub spouse_roth_contribution: f64,
    #[arg(long, default_value_t = 0.0)]
    pub spouse_employer_match: f64,

    #[arg(long, default_value_t = false)]
    pub roth_conversions: bool,
    #[arg(long)]
    pub conversion_start_year: Option<i32>,
    #[arg(long)]
    pub conversion_end_year: Option<i32>,
    #[arg(
        long,
        help = "Fill ordinary income up to the top of this bracket (percent, e.g. 22)"
    )]
    pub target_bracket: Option<f64>,
    #[arg(
        long,
        default_value_t = 0,
        help = "Keep MAGI within this IRMAA tier when no target bracket is set"
    )]
    pub irmaa_target_tier: usize,
    #[arg(long, default_value_t = 0.0)]
    pub qcd_amount: f64,

    #[arg(long, default_value_t = 0.0)]
    pub prior_magi_two_years_ago: f64,
    #[arg(long, default_value_t = 0.0)]
    pub prior_magi_last_year: f64,

    #[arg(
        long,
        help = "Yearly growth of tax-law thresholds past the latest published table, in percent; defaults to inflation-rate"
    )]
    pub tax_law_inflation_rate: Option<f64>,
    #[arg(long, default_value_t = false, help = "Fail for years past the latest published table")]
    pub no_extrapolation: bool,
}

impl Default for ScenarioArgs {
    fn default() -> Self {
        Self {
            as_of_year: None,
            birth_date: NaiveDate::from_ymd_opt(1960, 1, 1).unwrap_or_default(),
            plan_to_age: 95,
            spouse_birth_date: None,
            spouse_plan_to_age: 95,
            filing_status: None,
            zip_code: "75201".to_string(),
            state_tax_rate: None,
            wages: 0.0,
            interest: 0.0,
            dividends: 0.0,
            capital_gain_distributions: 0.0,
            short_term_gains: 0.0,
            long_term_gains: 0.0,
            other_income: 0.0,
            tax_deferred_balance: 0.0,
            roth_balance: 0.0,
            taxable_balance: 0.0,
            other_assets: 0.0,
            real_estate: 0.0,
            living_expenses: 60_000.0,
            growth_rate: 5.0,
            inflation_rate: 2.5,
            retirement_year: None,
            ss_start_year: None,
            ss_annual_benefit: 0.0,
            medicare_start_year: None,
            deferred_contribution: 0.0,
            roth_contribution: 0.0,
            employer_match: 0.0,
            spouse_ss_start_year: None,
            spouse_ss_annual_benefit: 0.0,
            spouse_medicare_start_year: None,
            spouse_deferred_contribution: 0.0,
            spouse_roth_contribution: 0.0,
            spouse_employer_match: 0.0,
            roth_conversions: false,
            conversion_start_year: None,
            conversion_end_year: None,
            target_bracket: None,
            irmaa_target_tier: 0,
            qcd_amount: 0.0,
            prior_magi_two_years_ago: 0.0,
            prior_magi_last_year: 0.0,
            tax_law_inflation_rate: None,
            no_extrapolation: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    as_of_year: Option<i32>,
    birth_date: Option<NaiveDate>,
    plan_to_age: Option<u32>,
    spouse_birth_date: Option<NaiveDate>,
    spouse_plan_to_age: Option<u32>,
    filing_status: Option<String>,
    zip_code: Option<String>,
    state_tax_rate: Option<f64>,

    wages: Option<f64>,
    interest: Option<f64>,
    dividends: Option<f64>,
    capital_gain_distributions: Option<f64>,
    short_term_gains: Option<f64>,
    long_term_gains: Option<f64>,
    other_income: Option<f64>,

    tax_deferred_balance: Option<f64>,
    roth_balance: Option<f64>,
    taxable_balance: Option<f64>,
    other_assets: Option<f64>,
    real_estate: Option<f64>,

    living_expenses: Option<f64>,
    growth_rate: Option<f64>,
    inflation_rate: Option<f64>,
    retirement_year: Option<i32>,

    ss_start_year: Option<i32>,
    ss_annual_benefit: Option<f64>,
    medicare_start_year: Option<i32>,
    deferred_contribution: Option<f64>,
    roth_contribution: Option<f64>,
    employer_match: Option<f64>,

    spouse_ss_start_year: Option<i32>,
    spouse_ss_annual_benefit: Option<f64>,
    spouse_medicare_start_year: Option<i32>,
    spouse_deferred_contribution: Option<f64>,
    spouse_roth_contribution: Option<f64>,
    spouse_employer_match: Option<f64>,

    roth_conversions: Option<bool>,
    conversion_start_year: Option<i32>,
    conversion_end_year: Option<i32>,
    target_bracket: Option<f64>,
    irmaa_target_tier: Option<usize>,
    qcd_amount: Option<f64>,

    prior_magi_two_years_ago: Option<f64>,
    prior_magi_last_year: Option<f64>,

    tax_law_inflation_rate: Option<f64>,
    no_extrapolation: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub profile: HouseholdProfile,
    pub inputs: TaxScenarioInputs,
    pub as_of_year: i32,
    pub extrapolation: Extrapolation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    pub as_of_year: i32,
    pub filing_status: FilingStatus,
    pub summary: ProjectionSummary,
    pub years: Vec<YearlyProjectionResult>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    published_years: [i32; 2],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxLawQuery {
    inflation_rate: Option<f64>,
}

fn percent(name: &str, value: f64) -> Result<f64, String> {
    if !value.is_finite() || value <= -100.0 {
        return Err(format!("--{name} must be > -100"));
    }
    Ok(value / 100.0)
}

pub fn build_scenario(args: ScenarioArgs) -> Result<Scenario, String> {
    let as_of_year = args.as_of_year.unwrap_or_else(|| Local::now().year());

    let growth_rate = percent("growth-rate", args.growth_rate)?;
    let inflation_rate = percent("inflation-rate", args.inflation_rate)?;
    let law_rate = percent(
        "tax-law-inflation-rate",
        args.tax_law_inflation_rate.unwrap_or(args.inflation_rate),
    )?;

    let state_tax_rate = match args.state_tax_rate {
        Some(rate) if !(0.0..=100.0).contains(&rate) => {
            return Err("--state-tax-rate must be between 0 and 100".to_string());
        }
        Some(rate) => Some(rate / 100.0),
        None => None,
    };

    let target = match args.target_bracket {
        Some(rate) if !(rate > 0.0 && rate < 100.0) => {
            return Err("--target-bracket must be between 0 and 100".to_string());
        }
        Some(rate) => ConversionTarget::OrdinaryBracket { rate: rate / 100.0 },
        None => ConversionTarget::IrmaaTier {
            tier: args.irmaa_target_tier,
        },
    };
    let window = match (args.conversion_start_year, args.conversion_end_year) {
        (None, None) => ConversionWindow::Always,
        (first, last) => ConversionWindow::Years {
            first: first.unwrap_or(as_of_year),
            last: last.unwrap_or(i32::MAX),
        },
    };
    if let ConversionWindow::Years { first, last } = window {
        if first > last {
            return Err("--conversion-end-year must be >= --conversion-start-year".to_string());
        }
    }

    let primary = Person {
        birth_date: args.birth_date,
        plan_to_age: args.plan_to_age,
    };
    let household = match args.spouse_birth_date {
        Some(birth_date) => Household::Married {
            primary,
            spouse: Person {
                birth_date,
                plan_to_age: args.spouse_plan_to_age,
            },
        },
        None => Household::Single(primary),
    };
    let filing_status = args.filing_status.unwrap_or(if household.spouse().is_some() {
        FilingStatus::MarriedFilingJointly
    } else {
        FilingStatus::Single
    });
    let spouse = household.spouse().map(|_| MemberIncome {
        ss_start_year: args.spouse_ss_start_year,
        ss_annual_benefit: args.spouse_ss_annual_benefit,
        medicare_start_year: args.spouse_medicare_start_year,
        contributions: Contributions {
            deferred: args.spouse_deferred_contribution,
            roth: args.spouse_roth_contribution,
            employer_match: args.spouse_employer_match,
        },
    });

    Ok(Scenario {
        profile: HouseholdProfile {
            household,
            filing_status,
            zip_code: args.zip_code,
        },
        inputs: TaxScenarioInputs {
            wages: args.wages,
            interest: args.interest,
            dividends: args.dividends,
            capital_gain_distributions: args.capital_gain_distributions,
            short_term_gains: args.short_term_gains,
            long_term_gains: args.long_term_gains,
            other_income: args.other_income,
            balances: StartingBalances {
                tax_deferred: args.tax_deferred_balance,
                roth: args.roth_balance,
                taxable: args.taxable_balance,
                other_assets: args.other_assets,
                real_estate: args.real_estate,
            },
            living_expenses: args.living_expenses,
            growth_rate,
            inflation_rate,
            retirement_year: args.retirement_year.unwrap_or(as_of_year),
            primary: MemberIncome {
                ss_start_year: args.ss_start_year,
                ss_annual_benefit: args.ss_annual_benefit,
                medicare_start_year: args.medicare_start_year,
                contributions: Contributions {
                    deferred: args.deferred_contribution,
                    roth: args.roth_contribution,
                    employer_match: args.employer_match,
                },
            },
            spouse,
            conversion: RothConversionSettings {
                enabled: args.roth_conversions,
                window,
                target,
            },
            qcd_amount: args.qcd_amount,
            prior_magi: PriorMagi {
                two_years_ago: args.prior_magi_two_years_ago,
                last_year: args.prior_magi_last_year,
            },
            state_tax_rate,
        },
        as_of_year,
        extrapolation: if args.no_extrapolation {
            Extrapolation::Disabled
        } else {
            Extrapolation::InflateLatest { rate: law_rate }
        },
    })
}

pub fn run_scenario(scenario: &Scenario) -> Result<ProjectionResponse, ProjectionError> {
    let law = PublishedTaxLaw::new(scenario.extrapolation);
    let years = run_projection(&scenario.profile, &scenario.inputs, scenario.as_of_year, &law)?;
    Ok(ProjectionResponse {
        as_of_year: scenario.as_of_year,
        filing_status: scenario.profile.filing_status,
        summary: ProjectionSummary::from_years(&years),
        years,
    })
}

fn args_from_payload(payload: ProjectionPayload) -> Result<ScenarioArgs, String> {
    let mut args = ScenarioArgs::default();

    macro_rules! apply {
        ($($field:ident),* $(,)?) => {
            $(if let Some(v) = payload.$field {
                args.$field = v;
            })*
        };
    }
    macro_rules! apply_opt {
        ($($field:ident),* $(,)?) => {
            $(if payload.$field.is_some() {
                args.$field = payload.$field;
            })*
        };
    }

    apply!(
        birth_date,
        plan_to_age,
        spouse_plan_to_age,
        zip_code,
        wages,
        interest,
        dividends,
        capital_gain_distributions,
        short_term_gains,
        long_term_gains,
        other_income,
        tax_deferred_balance,
        roth_balance,
        taxable_balance,
        other_assets,
        real_estate,
        living_expenses,
        growth_rate,
        inflation_rate,
        ss_annual_benefit,
        deferred_contribution,
        roth_contribution,
        employer_match,
        spouse_ss_annual_benefit,
        spouse_deferred_contribution,
        spouse_roth_contribution,
        spouse_employer_match,
        roth_conversions,
        irmaa_target_tier,
        qcd_amount,
        prior_magi_two_years_ago,
        prior_magi_last_year,
        no_extrapolation,
    );
    apply_opt!(
        as_of_year,
        spouse_birth_date,
        state_tax_rate,
        retirement_year,
        ss_start_year,
        medicare_start_year,
        spouse_ss_start_year,
        spouse_medicare_start_year,
        conversion_start_year,
        conversion_end_year,
        target_bracket,
        tax_law_inflation_rate,
    );

    if let Some(status) = payload.filing_status {
        args.filing_status = Some(status.parse().map_err(|e: ProjectionError| e.to_string())?);
    }
    Ok(args)
}

#[cfg(test)]
fn scenario_from_json(json: &str) -> Result<Scenario, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    build_scenario(args_from_payload(payload)?)
}

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/tax-law/:year", get(tax_law_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "taxplan HTTP API listening");
    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    let years = PublishedTaxLaw::published_years();
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            published_years: [*years.start(), *years.end()],
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_handler_impl(payload)
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_handler_impl(payload)
}

fn projection_handler_impl(payload: ProjectionPayload) -> Response {
    let scenario = match args_from_payload(payload).and_then(build_scenario) {
        Ok(scenario) => scenario,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match run_scenario(&scenario) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

async fn tax_law_handler(Path(year): Path<i32>, Query(query): Query<TaxLawQuery>) -> Response {
    match tax_law_for(year, query) {
        Ok(table) => json_response(StatusCode::OK, table),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn tax_law_for(year: i32, query: TaxLawQuery) -> Result<YearlyTaxLawTable, String> {
    let rate = percent("inflation-rate", query.inflation_rate.unwrap_or(2.5))?;
    PublishedTaxLaw::new(Extrapolation::InflateLatest { rate })
        .year_data(year)
        .map_err(|e| e.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        scenario: ScenarioArgs,
    }

    fn sample_args() -> ScenarioArgs {
        ScenarioArgs {
            as_of_year: Some(2025),
            birth_date: NaiveDate::from_ymd_opt(1958, 5, 1).expect("valid date"),
            plan_to_age: 90,
            tax_deferred_balance: 600_000.0,
            taxable_balance: 150_000.0,
            living_expenses: 55_000.0,
            ..ScenarioArgs::default()
        }
    }

    #[test]
    fn clap_defaults_match_api_defaults() {
        let parsed = TestCli::parse_from(["taxplan"]).scenario;
        let defaults = ScenarioArgs::default();
        assert_eq!(parsed.birth_date, defaults.birth_date);
        assert_eq!(parsed.plan_to_age, defaults.plan_to_age);
        assert_eq!(parsed.zip_code, defaults.zip_code);
        assert_approx(parsed.living_expenses, defaults.living_expenses);
        assert_approx(parsed.growth_rate, defaults.growth_rate);
        assert_approx(parsed.inflation_rate, defaults.inflation_rate);
        assert!(!parsed.roth_conversions);
    }

    #[test]
    fn clap_parses_filing_status_and_dates() {
        let parsed = TestCli::parse_from([
            "taxplan",
            "--birth-date",
            "1957-09-30",
            "--spouse-birth-date",
            "1959-02-14",
            "--filing-status",
            "mfj",
            "--target-bracket",
            "22",
        ])
        .scenario;
        assert_eq!(parsed.filing_status, Some(FilingStatus::MarriedFilingJointly));
        assert_eq!(
            parsed.spouse_birth_date,
            NaiveDate::from_ymd_opt(1959, 2, 14)
        );
        assert_eq!(parsed.target_bracket, Some(22.0));
    }

    #[test]
    fn build_scenario_converts_percentages() {
        let mut args = sample_args();
        args.growth_rate = 6.0;
        args.inflation_rate = 3.0;
        args.state_tax_rate = Some(4.5);
        args.target_bracket = Some(24.0);
        args.roth_conversions = true;
        let scenario = build_scenario(args).expect("valid scenario");
        assert_approx(scenario.inputs.growth_rate, 0.06);
        assert_approx(scenario.inputs.inflation_rate, 0.03);
        assert_eq!(scenario.inputs.state_tax_rate, Some(0.045));
        assert_eq!(
            scenario.inputs.conversion.target,
            ConversionTarget::OrdinaryBracket { rate: 0.24 }
        );
        assert_eq!(
            scenario.extrapolation,
            Extrapolation::InflateLatest { rate: 0.03 }
        );
        assert_eq!(scenario.inputs.retirement_year, 2025);
    }

    #[test]
    fn build_scenario_infers_joint_filing_from_spouse() {
        let mut args = sample_args();
        args.spouse_birth_date = NaiveDate::from_ymd_opt(1961, 1, 1);
        args.spouse_ss_annual_benefit = 18_000.0;
        let scenario = build_scenario(args).expect("valid scenario");
        assert_eq!(
            scenario.profile.filing_status,
            FilingStatus::MarriedFilingJointly
        );
        let spouse = scenario.inputs.spouse.expect("spouse income");
        assert_approx(spouse.ss_annual_benefit, 18_000.0);
    }

    #[test]
    fn build_scenario_opens_partial_conversion_window() {
        let mut args = sample_args();
        args.conversion_end_year = Some(2030);
        let scenario = build_scenario(args).expect("valid scenario");
        assert_eq!(
            scenario.inputs.conversion.window,
            ConversionWindow::Years {
                first: 2025,
                last: 2030
            }
        );
    }

    #[test]
    fn build_scenario_rejects_bad_rates() {
        let mut args = sample_args();
        args.inflation_rate = -100.0;
        let err = build_scenario(args).expect_err("must reject -100% inflation");
        assert!(err.contains("--inflation-rate"));

        let mut args = sample_args();
        args.state_tax_rate = Some(120.0);
        let err = build_scenario(args).expect_err("must reject state rate");
        assert!(err.contains("--state-tax-rate"));

        let mut args = sample_args();
        args.conversion_start_year = Some(2030);
        args.conversion_end_year = Some(2028);
        let err = build_scenario(args).expect_err("must reject inverted window");
        assert!(err.contains("--conversion-end-year"));
    }

    #[test]
    fn scenario_from_json_parses_camel_case_keys() {
        let json = r#"{
          "asOfYear": 2025,
          "birthDate": "1956-07-04",
          "planToAge": 92,
          "spouseBirthDate": "1958-03-01",
          "filingStatus": "married-filing-jointly",
          "zipCode": "94105",
          "taxDeferredBalance": 800000,
          "rothBalance": 50000,
          "taxableBalance": 200000,
          "livingExpenses": 90000,
          "ssStartYear": 2026,
          "ssAnnualBenefit": 38000,
          "spouseSsAnnualBenefit": 20000,
          "rothConversions": true,
          "conversionStartYear": 2025,
          "conversionEndYear": 2029,
          "irmaaTargetTier": 1,
          "qcdAmount": 4000,
          "priorMagiTwoYearsAgo": 140000
        }"#;
        let scenario = scenario_from_json(json).expect("json should parse");
        assert_eq!(scenario.as_of_year, 2025);
        assert_eq!(scenario.profile.zip_code, "94105");
        assert_eq!(
            scenario.profile.filing_status,
            FilingStatus::MarriedFilingJointly
        );
        assert_eq!(scenario.profile.household.primary().plan_to_age, 92);
        assert_approx(scenario.inputs.balances.tax_deferred, 800_000.0);
        assert_approx(scenario.inputs.living_expenses, 90_000.0);
        assert_eq!(scenario.inputs.primary.ss_start_year, Some(2026));
        assert_approx(scenario.inputs.qcd_amount, 4_000.0);
        assert_approx(scenario.inputs.prior_magi.two_years_ago, 140_000.0);
        assert!(scenario.inputs.conversion.enabled);
        assert_eq!(
            scenario.inputs.conversion.target,
            ConversionTarget::IrmaaTier { tier: 1 }
        );
        assert_eq!(
            scenario.inputs.conversion.window,
            ConversionWindow::Years {
                first: 2025,
                last: 2029
            }
        );
    }

    #[test]
    fn scenario_from_json_rejects_unknown_filing_status() {
        let err = scenario_from_json(r#"{ "filingStatus": "head-of-household" }"#)
            .expect_err("must reject filing status");
        assert!(err.contains("head-of-household"));
    }

    #[test]
    fn engine_validation_errors_surface_as_messages() {
        let mut args = sample_args();
        args.plan_to_age = 50;
        let scenario = build_scenario(args).expect("boundary accepts it");
        let err = run_scenario(&scenario).expect_err("engine must reject it");
        assert!(matches!(err, ProjectionError::InvalidInputs(_)));
        assert!(err.to_string().contains("plan-to age"));
    }

    #[test]
    fn oversized_plan_to_age_from_json_is_rejected() {
        let scenario = scenario_from_json(r#"{ "asOfYear": 2025, "planToAge": 4294967295 }"#)
            .expect("u32 fits the payload");
        let err = run_scenario(&scenario).expect_err("engine must reject it");
        assert!(matches!(err, ProjectionError::InvalidInputs(_)));
        assert!(err.to_string().contains("plan-to age"));
    }

    #[test]
    fn projection_response_serialization_contains_expected_fields() {
        let mut args = sample_args();
        args.plan_to_age = 70;
        let scenario = build_scenario(args).expect("valid scenario");
        let response = run_scenario(&scenario).expect("projection runs");
        assert_eq!(response.years.len(), 4);
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"asOfYear\":2025"));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"firstShortfallYear\""));
        assert!(json.contains("\"endingBalances\""));
        assert!(json.contains("\"irmaaTier\""));
        assert!(json.contains("\"filingStatus\":\"single\""));
    }

    #[test]
    fn tax_law_lookup_extrapolates_and_rejects_early_years() {
        let table = tax_law_for(2025, TaxLawQuery::default()).expect("published year");
        assert!(!table.extrapolated);
        let future = tax_law_for(2030, TaxLawQuery::default()).expect("extrapolated year");
        assert!(future.extrapolated);
        let err = tax_law_for(2019, TaxLawQuery::default()).expect_err("before tables");
        assert!(err.contains("2019"));
    }
}
