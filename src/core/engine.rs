use serde::Serialize;
use tracing::{debug, warn};

use super::calculators::{
    FilingContext, IncomeComposition, TaxAssessment, assess, irmaa_tier, rmd_amount,
    rmd_start_age,
};
use super::error::{ProjectionError, Result, invalid};
use super::roth::{ConversionContext, floor_cents, recommend_conversion};
use super::state::{HouseholdFinancialState, MemberState};
use super::state_tax;
use super::tables::{TaxLawProvider, YearlyTaxLawTable};
use super::types::{
    AccountBalances, ConversionTarget, ConversionWindow, FilingStatus, Household,
    HouseholdProfile, IncomeBreakdown, MemberIncome, TaxScenarioInputs, Withdrawals,
    YearlyProjectionResult, round_cents,
};

const HALF_CENT: f64 = 0.005;
const MAX_HORIZON_YEARS: i32 = 130;
const MAX_PLAN_TO_AGE: u32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionPhase {
    NotStarted,
    /// `year` is the last year already emitted.
    Running { year: i32 },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RunPlan {
    as_of_year: i32,
    final_year: i32,
    state_tax_rate: f64,
}

pub struct Projection<'a, P: TaxLawProvider + ?Sized> {
    profile: &'a HouseholdProfile,
    inputs: &'a TaxScenarioInputs,
    law: &'a P,
    plan: RunPlan,
    phase: ProjectionPhase,
    state: HouseholdFinancialState,
}

impl<'a, P: TaxLawProvider + ?Sized> Projection<'a, P> {
    pub fn new(
        profile: &'a HouseholdProfile,
        inputs: &'a TaxScenarioInputs,
        as_of_year: i32,
        law: &'a P,
    ) -> Result<Self> {
        let plan = plan_run(profile, inputs, as_of_year)?;
        Ok(Self {
            profile,
            inputs,
            law,
            plan,
            phase: ProjectionPhase::NotStarted,
            state: HouseholdFinancialState::initial(profile, inputs, as_of_year),
        })
    }

    pub fn resume(
        profile: &'a HouseholdProfile,
        inputs: &'a TaxScenarioInputs,
        law: &'a P,
        snapshot: HouseholdFinancialState,
    ) -> Result<Self> {
        let plan = plan_run(profile, inputs, snapshot.as_of_year)?;
        let phase = if snapshot.year >= plan.final_year {
            ProjectionPhase::Completed
        } else if snapshot.year < plan.as_of_year {
            ProjectionPhase::NotStarted
        } else {
            ProjectionPhase::Running {
                year: snapshot.year,
            }
        };
        Ok(Self {
            profile,
            inputs,
            law,
            plan,
            phase,
            state: snapshot,
        })
    }

    pub fn phase(&self) -> ProjectionPhase {
        self.phase
    }

    pub fn state(&self) -> &HouseholdFinancialState {
        &self.state
    }

    pub fn final_year(&self) -> i32 {
        self.plan.final_year
    }

    pub fn step(&mut self) -> Result<YearlyProjectionResult> {
        if self.phase == ProjectionPhase::Completed {
            return Err(ProjectionError::ProjectionComplete);
        }
        let (next, result) = advance_year(
            &self.state,
            self.profile,
            self.inputs,
            &self.plan,
            self.law,
        )?;
        self.phase = if next.year >= self.plan.final_year {
            ProjectionPhase::Completed
        } else {
            ProjectionPhase::Running { year: next.year }
        };
        self.state = next;
        Ok(result)
    }

    pub fn run_to_completion(mut self) -> Result<Vec<YearlyProjectionResult>> {
        let remaining = (self.plan.final_year - self.state.year).max(0) as usize;
        let mut years = Vec::with_capacity(remaining);
        while self.phase != ProjectionPhase::Completed {
            years.push(self.step()?);
        }
        Ok(years)
    }
}

/// Runs the whole horizon. Any fatal error discards the partial sequence.
pub fn run_projection<P: TaxLawProvider + ?Sized>(
    profile: &HouseholdProfile,
    inputs: &TaxScenarioInputs,
    as_of_year: i32,
    law: &P,
) -> Result<Vec<YearlyProjectionResult>> {
    Projection::new(profile, inputs, as_of_year, law)?.run_to_completion()
}

pub fn validate_inputs(
    profile: &HouseholdProfile,
    inputs: &TaxScenarioInputs,
    as_of_year: i32,
) -> Result<()> {
    let household = &profile.household;
    let mut members = vec![("primary", household.primary())];
    if let Some(spouse) = household.spouse() {
        members.push(("spouse", spouse));
    }
    for (label, person) in members {
        if person.plan_to_age > MAX_PLAN_TO_AGE {
            return Err(invalid(format!(
                "{label} plan-to age {} is above {MAX_PLAN_TO_AGE}",
                person.plan_to_age
            )));
        }
        if person.birth_year() > as_of_year {
            return Err(invalid(format!(
                "{label} birth date {} is after the plan start year {as_of_year}",
                person.birth_date
            )));
        }
        let age = person.age_in(as_of_year);
        if (person.plan_to_age as i32) < age {
            return Err(invalid(format!(
                "{label} plan-to age {} is below current age {age}",
                person.plan_to_age
            )));
        }
    }

    match (household, profile.filing_status) {
        (Household::Single(_), FilingStatus::MarriedFilingJointly) => {
            return Err(invalid("married-filing-jointly requires a spouse"));
        }
        (Household::Married { .. }, FilingStatus::Single) => {
            return Err(invalid("a married household must file jointly"));
        }
        _ => {}
    }
    if inputs.spouse.is_some() && household.spouse().is_none() {
        return Err(invalid("spouse income supplied for a single household"));
    }

    state_tax::validate_zip(&profile.zip_code)?;

    let b = &inputs.balances;
    let spouse = inputs.spouse.unwrap_or_default();
    for (name, value) in [
        ("wages", inputs.wages),
        ("interest", inputs.interest),
        ("dividends", inputs.dividends),
        ("capital_gain_distributions", inputs.capital_gain_distributions),
        ("short_term_gains", inputs.short_term_gains),
        ("long_term_gains", inputs.long_term_gains),
        ("other_income", inputs.other_income),
        ("tax_deferred_balance", b.tax_deferred),
        ("roth_balance", b.roth),
        ("taxable_balance", b.taxable),
        ("other_assets", b.other_assets),
        ("real_estate", b.real_estate),
        ("living_expenses", inputs.living_expenses),
        ("qcd_amount", inputs.qcd_amount),
        ("prior_magi.two_years_ago", inputs.prior_magi.two_years_ago),
        ("prior_magi.last_year", inputs.prior_magi.last_year),
    ] {
        non_negative(name, value)?;
    }
    for (label, member) in [("primary", &inputs.primary), ("spouse", &spouse)] {
        validate_member(label, member)?;
    }

    for (name, rate) in [
        ("growth_rate", inputs.growth_rate),
        ("inflation_rate", inputs.inflation_rate),
    ] {
        if !rate.is_finite() || rate <= -1.0 {
            return Err(invalid(format!("{name} must be > -100%")));
        }
    }
    if let Some(rate) = inputs.state_tax_rate {
        if !(0.0..=1.0).contains(&rate) {
            return Err(invalid("state_tax_rate must be between 0 and 1"));
        }
    }

    if let ConversionWindow::Years { first, last } = inputs.conversion.window {
        if first > last {
            return Err(invalid("conversion window must not end before it starts"));
        }
    }
    if let ConversionTarget::OrdinaryBracket { rate } = inputs.conversion.target {
        if !(rate > 0.0 && rate < 1.0) {
            return Err(invalid("target bracket rate must be between 0 and 1"));
        }
    }

    let final_year = household.final_year();
    if final_year - as_of_year > MAX_HORIZON_YEARS {
        return Err(invalid(format!(
            "plan horizon of {} years is too long",
            final_year - as_of_year
        )));
    }
    Ok(())
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{name} must be >= 0")));
    }
    Ok(())
}

fn validate_member(label: &str, member: &MemberIncome) -> Result<()> {
    non_negative(&format!("{label}.ss_annual_benefit"), member.ss_annual_benefit)?;
    let c = &member.contributions;
    non_negative(&format!("{label}.deferred_contribution"), c.deferred)?;
    non_negative(&format!("{label}.roth_contribution"), c.roth)?;
    non_negative(&format!("{label}.employer_match"), c.employer_match)?;
    Ok(())
}

fn plan_run(
    profile: &HouseholdProfile,
    inputs: &TaxScenarioInputs,
    as_of_year: i32,
) -> Result<RunPlan> {
    validate_inputs(profile, inputs, as_of_year)?;
    let state_tax_rate = match inputs.state_tax_rate {
        Some(rate) => rate,
        None => state_tax::rate_for_zip(&profile.zip_code)?.unwrap_or_else(|| {
            warn!(zip = %profile.zip_code, "no state found for zip code; assuming no state tax");
            0.0
        }),
    };
    Ok(RunPlan {
        as_of_year,
        final_year: profile.household.final_year(),
        state_tax_rate,
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct ContributionFlow {
    pre_tax: f64,
    roth: f64,
    employer: f64,
}

impl ContributionFlow {
    fn employee(self) -> f64 {
        self.pre_tax + self.roth
    }

    fn total(self) -> f64 {
        self.employee() + self.employer
    }
}

/// Taxable-account income for the year; flows while the account holds money
/// (or unconditionally when the scenario started without one).
#[derive(Debug, Clone, Copy, Default)]
struct PortfolioIncome {
    interest: f64,
    dividends: f64,
    distributions: f64,
    short_term: f64,
    long_term: f64,
}

fn advance_year<P: TaxLawProvider + ?Sized>(
    prev: &HouseholdFinancialState,
    profile: &HouseholdProfile,
    inputs: &TaxScenarioInputs,
    plan: &RunPlan,
    law_provider: &P,
) -> Result<(HouseholdFinancialState, YearlyProjectionResult)> {
    let year = prev.year + 1;
    let law = law_provider.year_data(year)?;
    law.validate()?;

    // Age the household and pick up enrollment changes.
    let household = &profile.household;
    let spouse_income = inputs.spouse.unwrap_or_default();
    let mut next = HouseholdFinancialState {
        year,
        primary: MemberState::for_year(
            household.primary(),
            inputs.primary.ss_start_year,
            inputs.primary.medicare_start_year,
            year,
        ),
        spouse: household.spouse().map(|person| {
            MemberState::for_year(
                person,
                spouse_income.ss_start_year,
                spouse_income.medicare_start_year,
                year,
            )
        }),
        ..prev.clone()
    };
    let status = next.filing_status(profile.filing_status);
    let filing = FilingContext {
        status,
        seniors: next.living_members().filter(|m| m.age >= 65).count() as u32,
        state_tax_rate: plan.state_tax_rate,
    };
    let index = (1.0 + inputs.inflation_rate).powi(year - plan.as_of_year);

    // Growth on prior year-end balances.
    let prior = prev.balances;
    let growth = 1.0 + inputs.growth_rate;
    {
        let b = &mut next.balances;
        b.tax_deferred *= growth;
        b.roth *= growth;
        b.taxable *= growth;
        b.other_assets *= growth;
        b.real_estate *= 1.0 + inputs.inflation_rate;
    }
    let investment_growth = next.balances.investable() - prior.investable();

    // Contributions while still working.
    let working = year < inputs.retirement_year;
    let contributions = if working {
        contributions_for(&next, inputs)
    } else {
        ContributionFlow::default()
    };
    next.balances.tax_deferred += contributions.pre_tax + contributions.employer;
    next.balances.roth += contributions.roth;

    // RMD on the prior year-end balance.
    let rmd = required_distribution(&next, household, prior.tax_deferred, &law)?
        .min(next.balances.tax_deferred);
    next.balances.tax_deferred -= rmd;
    next.cumulative_rmds += rmd;

    let social_security = social_security_income(&next, inputs, index);

    let wages = if working { inputs.wages } else { 0.0 };
    let portfolio = if prior.taxable > 0.0 || inputs.balances.taxable <= 0.0 {
        PortfolioIncome {
            interest: inputs.interest,
            dividends: inputs.dividends,
            distributions: inputs.capital_gain_distributions,
            short_term: inputs.short_term_gains,
            long_term: inputs.long_term_gains,
        }
    } else {
        PortfolioIncome::default()
    };
    let qcd = inputs.qcd_amount.min(rmd).min(law.qcd_limit).max(0.0);

    let base_income = IncomeComposition {
        ordinary: (wages - contributions.pre_tax).max(0.0)
            + portfolio.interest
            + portfolio.dividends
            + portfolio.short_term
            + (rmd - qcd)
            + inputs.other_income,
        preferential_gains: portfolio.distributions + portfolio.long_term,
        ss_benefit: social_security,
    };

    let irmaa_lookback_magi = prev.magi_for(year - 2).unwrap_or(0.0);
    let irmaa = irmaa_tier(irmaa_lookback_magi, &law.irmaa, status);
    let medicare_enrollees = next.living_members().filter(|m| m.on_medicare).count() as u32;
    let medicare_premium = irmaa.annual_per_enrollee() * medicare_enrollees as f64;
    let base_premium = law
        .irmaa
        .get(status)
        .first()
        .map_or(0.0, |t| 12.0 * (t.part_b_premium + t.part_d_surcharge));
    let irmaa_surcharge = (medicare_premium - base_premium * medicare_enrollees as f64).max(0.0);

    let living_expenses = inputs.living_expenses * index;
    let funding = YearFunding {
        cash_in: wages
            + portfolio.interest
            + portfolio.dividends
            + portfolio.distributions
            + inputs.other_income
            + social_security
            + (rmd - qcd),
        fixed_out: contributions.employee() + medicare_premium + living_expenses,
        balances: next.balances,
    };

    // Discretionary conversion. The target applies to the return as filed,
    // including any tax-deferred draw the year's spending forces.
    let conversion = if inputs.conversion.enabled
        && inputs.conversion.window.contains(year)
        && next.living_members().next().is_some()
    {
        let irmaa_law = law_provider
            .year_data(year + 2)
            .unwrap_or_else(|_| law.clone());
        let irmaa_status = match household.spouse() {
            Some(spouse)
                if household.primary().alive_in(year + 2) && spouse.alive_in(year + 2) =>
            {
                profile.filing_status
            }
            _ => FilingStatus::Single,
        };
        let recommend = |draw: f64| -> Result<f64> {
            let ctx = ConversionContext {
                year,
                income: base_income.with_extra_ordinary(draw),
                filing,
                irmaa_status,
                available_deferred: (funding.balances.tax_deferred - draw).max(0.0),
            };
            Ok(recommend_conversion(&ctx, &law, &irmaa_law, &inputs.conversion)?
                .min(funding.balances.tax_deferred))
        };
        let forced_draw = |conversion: f64| {
            funding
                .settle(conversion, &base_income, &law, &filing)
                .withdrawals
                .tax_deferred
        };
        size_conversion(recommend, forced_draw)?
    } else {
        0.0
    };

    // Cash flow: cover any shortfall from taxable, then tax-deferred, then Roth.
    let Settlement {
        tax,
        net_cash_flow,
        withdrawals,
    } = funding.settle(conversion, &base_income, &law, &filing);
    next.balances.tax_deferred -= conversion + withdrawals.tax_deferred;
    next.balances.roth += conversion - withdrawals.roth;
    next.balances.taxable -= withdrawals.taxable;

    let settled = funding.cash_in + withdrawals.total() - funding.fixed_out - tax.total();
    let mut unfunded_shortfall = 0.0;
    if settled >= 0.0 {
        next.balances.taxable += settled;
    } else if -settled > HALF_CENT {
        unfunded_shortfall = -settled;
    }
    let clamped = next.balances.clamp_non_negative();
    let insufficient_funds = unfunded_shortfall > 0.0 || clamped > HALF_CENT;

    if insufficient_funds && !prev.ran_out_of_money {
        warn!(year, shortfall = unfunded_shortfall, "household runs out of money");
    }
    next.ran_out_of_money |= insufficient_funds;
    next.magi_history.insert(year, tax.magi());

    debug!(
        year,
        rmd,
        conversion,
        federal_tax = tax.federal_tax,
        irmaa_tier = irmaa.tier,
        net_worth = next.balances.net_worth(),
        "projected year"
    );

    let result = YearlyProjectionResult {
        year,
        primary_age: next.primary.living_age(),
        spouse_age: next.spouse.and_then(|s| s.living_age()),
        filing_status: status,
        income: IncomeBreakdown {
            wages: round_cents(wages),
            interest: round_cents(portfolio.interest),
            dividends: round_cents(portfolio.dividends),
            capital_gains: round_cents(
                portfolio.distributions + portfolio.short_term + portfolio.long_term,
            ),
            social_security: round_cents(social_security),
            rmd: round_cents(rmd),
            roth_conversion: round_cents(conversion),
            qcd: round_cents(qcd),
            other: round_cents(inputs.other_income),
        },
        taxable_social_security: round_cents(tax.taxable_social_security),
        magi: round_cents(tax.magi()),
        taxable_income: round_cents(tax.taxable_income),
        federal_tax: round_cents(tax.federal_tax),
        capital_gains_tax: round_cents(tax.capital_gains_tax),
        state_tax: round_cents(tax.state_tax),
        irmaa_tier: irmaa.tier,
        irmaa_lookback_magi: round_cents(irmaa_lookback_magi),
        medicare_enrollees,
        medicare_premium: round_cents(medicare_premium),
        irmaa_surcharge: round_cents(irmaa_surcharge),
        living_expenses: round_cents(living_expenses),
        contributions: round_cents(contributions.total()),
        investment_growth: round_cents(investment_growth),
        withdrawals: Withdrawals {
            taxable: round_cents(withdrawals.taxable),
            tax_deferred: round_cents(withdrawals.tax_deferred),
            roth: round_cents(withdrawals.roth),
        },
        net_cash_flow: round_cents(net_cash_flow),
        unfunded_shortfall: round_cents(unfunded_shortfall),
        insufficient_funds,
        ending_balances: next.balances.rounded(),
    };

    Ok((next, result))
}

#[derive(Debug, Clone, Copy)]
struct YearFunding {
    cash_in: f64,
    fixed_out: f64,
    balances: AccountBalances,
}

struct Settlement {
    tax: TaxAssessment,
    net_cash_flow: f64,
    withdrawals: Withdrawals,
}

impl YearFunding {
    fn settle(
        &self,
        conversion: f64,
        base_income: &IncomeComposition,
        law: &YearlyTaxLawTable,
        filing: &FilingContext,
    ) -> Settlement {
        let income = base_income.with_extra_ordinary(conversion);
        let base_tax = assess(&income, law, filing);
        let net_cash_flow = self.cash_in - self.fixed_out - base_tax.total();

        let mut withdrawals = Withdrawals::default();
        let mut tax = base_tax;
        if net_cash_flow < 0.0 {
            let mut need = -net_cash_flow;

            withdrawals.taxable = need.min(self.balances.taxable);
            need -= withdrawals.taxable;

            let deferred = self.balances.tax_deferred - conversion;
            if need > 0.0 && deferred > 0.0 {
                let (gross, assessed) =
                    withdraw_deferred_for_net(need, deferred, &income, law, filing, &base_tax);
                withdrawals.tax_deferred = gross;
                need -= gross - (assessed.total() - base_tax.total()).max(0.0);
                tax = assessed;
            }

            if need > 0.0 {
                withdrawals.roth = need.min(self.balances.roth + conversion);
            }
        }
        Settlement {
            tax,
            net_cash_flow,
            withdrawals,
        }
    }
}

// A larger conversion never shrinks the forced draw, so the conversions that
// fit form a prefix of [0, recommend(forced_draw(0))].
fn size_conversion(
    recommend: impl Fn(f64) -> Result<f64>,
    forced_draw: impl Fn(f64) -> f64,
) -> Result<f64> {
    let fits = |conversion: f64| -> Result<bool> {
        Ok(conversion <= recommend(forced_draw(conversion))?)
    };
    let upper = recommend(forced_draw(0.0))?;
    if upper <= 0.0 || fits(upper)? {
        return Ok(upper);
    }
    let mut lo = 0.0;
    let mut hi = upper;
    for _ in 0..60 {
        let mid = (lo + hi) * 0.5;
        if fits(mid)? {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(floor_cents(lo))
}

fn contributions_for(state: &HouseholdFinancialState, inputs: &TaxScenarioInputs) -> ContributionFlow {
    let mut flow = ContributionFlow::default();
    let mut add = |member: &MemberIncome| {
        flow.pre_tax += member.contributions.deferred;
        flow.roth += member.contributions.roth;
        flow.employer += member.contributions.employer_match;
    };
    if state.primary.alive {
        add(&inputs.primary);
    }
    if let (Some(spouse), Some(income)) = (state.spouse, inputs.spouse.as_ref()) {
        if spouse.alive {
            add(income);
        }
    }
    flow
}

/// The tax-deferred account belongs to the primary member and rolls to the
/// surviving spouse, whose age then drives the RMD.
fn required_distribution(
    state: &HouseholdFinancialState,
    household: &Household,
    prior_year_end_balance: f64,
    law: &YearlyTaxLawTable,
) -> Result<f64> {
    let owner = if state.primary.alive {
        Some((state.primary, household.primary().birth_year()))
    } else {
        state
            .spouse
            .filter(|s| s.alive)
            .zip(household.spouse().map(|p| p.birth_year()))
    };
    let Some((member, birth_year)) = owner else {
        return Ok(0.0);
    };
    if member.age < rmd_start_age(birth_year) as i32 || prior_year_end_balance <= 0.0 {
        return Ok(0.0);
    }
    rmd_amount(prior_year_end_balance, member.age as u32, &law.rmd_divisors)
}

fn social_security_income(
    state: &HouseholdFinancialState,
    inputs: &TaxScenarioInputs,
    index: f64,
) -> f64 {
    let primary_benefit = inputs.primary.ss_annual_benefit * index;
    let Some(spouse) = state.spouse else {
        return if state.primary.collecting_ss {
            primary_benefit
        } else {
            0.0
        };
    };
    let spouse_benefit = inputs.spouse.map_or(0.0, |s| s.ss_annual_benefit) * index;
    let primary = state.primary;
    match (primary.alive, spouse.alive) {
        (true, true) => {
            let mut total = 0.0;
            if primary.collecting_ss {
                total += primary_benefit;
            }
            if spouse.collecting_ss {
                total += spouse_benefit;
            }
            total
        }
        (true, false) if primary.collecting_ss => primary_benefit.max(spouse_benefit),
        (false, true) if spouse.collecting_ss => spouse_benefit.max(primary_benefit),
        _ => 0.0,
    }
}

fn withdraw_deferred_for_net(
    target_net: f64,
    available: f64,
    income: &IncomeComposition,
    law: &YearlyTaxLawTable,
    filing: &FilingContext,
    base_tax: &TaxAssessment,
) -> (f64, TaxAssessment) {
    let net_of = |gross: f64| {
        let assessed = assess(&income.with_extra_ordinary(gross), law, filing);
        let incremental = (assessed.total() - base_tax.total()).max(0.0);
        ((gross - incremental).max(0.0), assessed)
    };

    let (max_net, max_tax) = net_of(available);
    if max_net <= target_net {
        return (available, max_tax);
    }

    let mut lo = 0.0;
    let mut hi = available;
    for _ in 0..60 {
        let mid = (lo + hi) * 0.5;
        if net_of(mid).0 < target_net {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (hi, net_of(hi).1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub first_shortfall_year: Option<i32>,
    pub lifetime_federal_tax: f64,
    pub lifetime_capital_gains_tax: f64,
    pub lifetime_state_tax: f64,
    pub lifetime_total_tax: f64,
    pub lifetime_medicare_premiums: f64,
    pub lifetime_irmaa_surcharges: f64,
    pub years_with_irmaa_surcharge: usize,
    pub total_rmds: f64,
    pub total_roth_conversions: f64,
    pub ending_net_worth: f64,
}

impl ProjectionSummary {
    pub fn from_years(years: &[YearlyProjectionResult]) -> Self {
        let sum = |f: fn(&YearlyProjectionResult) -> f64| round_cents(years.iter().map(f).sum());
        Self {
            first_year: years.first().map(|y| y.year),
            last_year: years.last().map(|y| y.year),
            first_shortfall_year: years.iter().find(|y| y.insufficient_funds).map(|y| y.year),
            lifetime_federal_tax: sum(|y| y.federal_tax),
            lifetime_capital_gains_tax: sum(|y| y.capital_gains_tax),
            lifetime_state_tax: sum(|y| y.state_tax),
            lifetime_total_tax: sum(|y| y.total_tax()),
            lifetime_medicare_premiums: sum(|y| y.medicare_premium),
            lifetime_irmaa_surcharges: sum(|y| y.irmaa_surcharge),
            years_with_irmaa_surcharge: years.iter().filter(|y| y.irmaa_surcharge > 0.0).count(),
            total_rmds: sum(|y| y.income.rmd),
            total_roth_conversions: sum(|y| y.income.roth_conversion),
            ending_net_worth: years
                .last()
                .map_or(0.0, |y| round_cents(y.ending_balances.net_worth())),
        }
    }
}
