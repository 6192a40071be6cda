use serde::Serialize;

use super::error::{ProjectionError, Result};
use super::tables::{BracketSchedule, ByFilingStatus, IrmaaBracket, RmdTable, SsThresholds, YearlyTaxLawTable};
use super::types::FilingStatus;

pub fn ordinary_tax(taxable_income: f64, schedule: &BracketSchedule) -> f64 {
    if taxable_income <= 0.0 {
        return 0.0;
    }
    schedule
        .brackets
        .iter()
        .map(|b| {
            let top = b.ceiling.map_or(taxable_income, |c| taxable_income.min(c));
            (top - b.floor).max(0.0) * b.rate
        })
        .sum()
}

/// Gains stack on top of ordinary taxable income.
pub fn capital_gains_tax(
    ordinary_taxable_income: f64,
    net_capital_gains: f64,
    schedule: &BracketSchedule,
) -> f64 {
    if net_capital_gains <= 0.0 {
        return 0.0;
    }
    let start = ordinary_taxable_income.max(0.0);
    let end = start + net_capital_gains;
    schedule
        .brackets
        .iter()
        .map(|b| {
            let lo = start.max(b.floor);
            let hi = b.ceiling.map_or(end, |c| end.min(c));
            (hi - lo).max(0.0) * b.rate
        })
        .sum()
}

/// Two-tier 50%/85% inclusion of Social Security benefits (IRS Pub. 915 worksheet).
pub fn taxable_social_security(
    provisional_income: f64,
    ss_benefit: f64,
    thresholds: &ByFilingStatus<SsThresholds>,
    filing_status: FilingStatus,
) -> f64 {
    if ss_benefit <= 0.0 {
        return 0.0;
    }
    let SsThresholds { base, adjusted } = *thresholds.get(filing_status);
    let provisional = provisional_income.max(0.0);
    if provisional <= base {
        return 0.0;
    }
    let half_benefit = 0.5 * ss_benefit;
    if provisional <= adjusted {
        return (0.5 * (provisional - base)).min(half_benefit);
    }
    let first_tier = (0.5 * (adjusted - base)).min(half_benefit);
    (0.85 * (provisional - adjusted) + first_tier).min(0.85 * ss_benefit)
}

pub(crate) fn social_security_kinks(ss_benefit: f64, thresholds: &SsThresholds) -> [f64; 4] {
    let SsThresholds { base, adjusted } = *thresholds;
    let first_tier = (0.5 * (adjusted - base)).min(0.5 * ss_benefit);
    [
        base,
        base + ss_benefit,
        adjusted,
        adjusted + (0.85 * ss_benefit - first_tier).max(0.0) / 0.85,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrmaaAssessment {
    pub tier: usize,
    pub part_b_premium: f64,
    pub part_d_surcharge: f64,
}

impl IrmaaAssessment {
    pub fn annual_per_enrollee(&self) -> f64 {
        12.0 * (self.part_b_premium + self.part_d_surcharge)
    }
}

/// Selects the IRMAA tier for a look-back MAGI. A MAGI equal to a tier's
/// ceiling stays in that tier; only income strictly above it moves up.
pub fn irmaa_tier(
    magi: f64,
    brackets: &ByFilingStatus<Vec<IrmaaBracket>>,
    filing_status: FilingStatus,
) -> IrmaaAssessment {
    let tiers = brackets.get(filing_status);
    let tier = tiers
        .iter()
        .position(|t| t.income_ceiling.is_none_or(|c| magi <= c))
        .unwrap_or(tiers.len().saturating_sub(1));
    let chosen = tiers.get(tier).copied().unwrap_or(IrmaaBracket {
        income_floor: 0.0,
        income_ceiling: None,
        part_b_premium: 0.0,
        part_d_surcharge: 0.0,
    });
    IrmaaAssessment {
        tier,
        part_b_premium: chosen.part_b_premium,
        part_d_surcharge: chosen.part_d_surcharge,
    }
}

pub fn rmd_amount(prior_year_end_balance: f64, age: u32, table: &RmdTable) -> Result<f64> {
    let divisor = table
        .divisor(age)
        .ok_or(ProjectionError::NoDivisorForAge { age })?;
    if prior_year_end_balance <= 0.0 {
        return Ok(0.0);
    }
    Ok(prior_year_end_balance / divisor)
}

/// SECURE 2.0 required beginning age by birth year.
pub fn rmd_start_age(birth_year: i32) -> u32 {
    match birth_year {
        ..=1950 => 72,
        1951..=1959 => 73,
        _ => 75,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncomeComposition {
    pub ordinary: f64,
    /// Long-term gains and capital-gain distributions.
    pub preferential_gains: f64,
    pub ss_benefit: f64,
}

impl IncomeComposition {
    pub fn with_extra_ordinary(&self, extra: f64) -> Self {
        Self {
            ordinary: self.ordinary + extra,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilingContext {
    pub status: FilingStatus,
    /// Filers aged 65 or older, for the additional standard deduction.
    pub seniors: u32,
    pub state_tax_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaxAssessment {
    pub taxable_social_security: f64,
    pub agi: f64,
    pub deduction: f64,
    pub ordinary_taxable_income: f64,
    pub taxable_income: f64,
    pub federal_tax: f64,
    pub capital_gains_tax: f64,
    pub state_tax: f64,
}

impl TaxAssessment {
    pub fn total(&self) -> f64 {
        self.federal_tax + self.capital_gains_tax + self.state_tax
    }

    /// MAGI used for IRMAA; this model has no tax-exempt interest.
    pub fn magi(&self) -> f64 {
        self.agi
    }
}

pub fn deduction_for(law: &YearlyTaxLawTable, filing: &FilingContext) -> f64 {
    law.standard_deduction.get(filing.status)
        + law.additional_deduction_65.get(filing.status) * filing.seniors as f64
}

pub(crate) fn gross_ordinary(
    income: &IncomeComposition,
    law: &YearlyTaxLawTable,
    status: FilingStatus,
) -> f64 {
    let provisional = income.ordinary + income.preferential_gains + 0.5 * income.ss_benefit;
    income.ordinary
        + taxable_social_security(provisional, income.ss_benefit, &law.ss_thresholds, status)
}

/// Full federal + state assessment. The deduction offsets ordinary income first;
/// whatever is left over shelters gains. State tax is a flat rate on total taxable income.
pub fn assess(
    income: &IncomeComposition,
    law: &YearlyTaxLawTable,
    filing: &FilingContext,
) -> TaxAssessment {
    let status = filing.status;
    let provisional = income.ordinary + income.preferential_gains + 0.5 * income.ss_benefit;
    let taxable_ss =
        taxable_social_security(provisional, income.ss_benefit, &law.ss_thresholds, status);
    let ordinary_gross = income.ordinary + taxable_ss;
    let gains = income.preferential_gains.max(0.0);
    let agi = ordinary_gross + gains;
    let deduction = deduction_for(law, filing);

    let taxable_income = (agi - deduction).max(0.0);
    let ordinary_taxable_income = (ordinary_gross - deduction).max(0.0);
    let taxable_gains = (taxable_income - ordinary_taxable_income).max(0.0);

    let federal_tax = ordinary_tax(ordinary_taxable_income, law.ordinary.get(status));
    let capital_gains_tax = capital_gains_tax(
        ordinary_taxable_income,
        taxable_gains,
        law.capital_gains.get(status),
    );
    let state_tax = taxable_income * filing.state_tax_rate.clamp(0.0, 1.0);

    TaxAssessment {
        taxable_social_security: taxable_ss,
        agi,
        deduction,
        ordinary_taxable_income,
        taxable_income,
        federal_tax,
        capital_gains_tax,
        state_tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tables::{Extrapolation, PublishedTaxLaw, TaxLawProvider};
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn law_2024() -> YearlyTaxLawTable {
        PublishedTaxLaw::new(Extrapolation::Disabled)
            .year_data(2024)
            .expect("2024 table")
    }

    fn single() -> FilingContext {
        FilingContext {
            status: FilingStatus::Single,
            seniors: 0,
            state_tax_rate: 0.0,
        }
    }

    #[test]
    fn ordinary_tax_matches_2024_single_hand_calculation() {
        let law = law_2024();
        // 10% of 11,600 + 12% of 35,550 + 22% of 12,850
        let tax = ordinary_tax(60_000.0, law.ordinary.get(FilingStatus::Single));
        assert_approx(tax, 1_160.0 + 4_266.0 + 2_827.0);
    }

    #[test]
    fn ordinary_tax_is_zero_for_non_positive_income() {
        let law = law_2024();
        assert_eq!(ordinary_tax(0.0, &law.ordinary.single), 0.0);
        assert_eq!(ordinary_tax(-5_000.0, &law.ordinary.single), 0.0);
    }

    #[test]
    fn gains_fill_zero_bracket_first_when_no_ordinary_income() {
        let law = law_2024();
        let tax = capital_gains_tax(0.0, 50_000.0, &law.capital_gains.single);
        assert_approx(tax, 0.15 * (50_000.0 - 47_025.0));
        assert_eq!(capital_gains_tax(0.0, 47_025.0, &law.capital_gains.single), 0.0);
    }

    #[test]
    fn gains_above_filled_zero_bracket_are_all_taxed_at_fifteen_percent() {
        let law = law_2024();
        let tax = capital_gains_tax(60_000.0, 20_000.0, &law.capital_gains.single);
        assert_approx(tax, 0.15 * 20_000.0);
    }

    #[test]
    fn gains_straddling_the_zero_bracket_split_at_the_ceiling() {
        let law = law_2024();
        let tax = capital_gains_tax(40_000.0, 10_000.0, &law.capital_gains.single);
        assert_approx(tax, 0.15 * (50_000.0 - 47_025.0));
    }

    #[test]
    fn gains_reaching_twenty_percent_tier() {
        let law = law_2024();
        let tax = capital_gains_tax(500_000.0, 100_000.0, &law.capital_gains.single);
        let at_15 = 518_900.0 - 500_000.0;
        let at_20 = 100_000.0 - at_15;
        assert_approx(tax, 0.15 * at_15 + 0.20 * at_20);
    }

    #[test]
    fn social_security_is_untaxed_below_base_threshold() {
        let law = law_2024();
        let taxable =
            taxable_social_security(24_000.0, 30_000.0, &law.ss_thresholds, FilingStatus::Single);
        assert_eq!(taxable, 0.0);
    }

    #[test]
    fn social_security_first_tier_is_half_of_excess() {
        let law = law_2024();
        let taxable =
            taxable_social_security(30_000.0, 20_000.0, &law.ss_thresholds, FilingStatus::Single);
        assert_approx(taxable, 2_500.0);
    }

    #[test]
    fn social_security_second_tier_matches_worksheet() {
        let law = law_2024();
        // joint: 0.85*(60,000-44,000) + min(6,000, 15,000) = 13,600 + 6,000
        let taxable = taxable_social_security(
            60_000.0,
            30_000.0,
            &law.ss_thresholds,
            FilingStatus::MarriedFilingJointly,
        );
        assert_approx(taxable, 19_600.0);
        let capped = taxable_social_security(
            200_000.0,
            30_000.0,
            &law.ss_thresholds,
            FilingStatus::MarriedFilingJointly,
        );
        assert_approx(capped, 25_500.0);
    }

    #[test]
    fn irmaa_ceiling_is_inclusive() {
        let law = law_2024();
        let at_ceiling = irmaa_tier(103_000.0, &law.irmaa, FilingStatus::Single);
        assert_eq!(at_ceiling.tier, 0);
        assert_approx(at_ceiling.part_b_premium, 174.70);

        let above = irmaa_tier(103_000.01, &law.irmaa, FilingStatus::Single);
        assert_eq!(above.tier, 1);
        assert_approx(above.part_d_surcharge, 12.90);

        let top = irmaa_tier(2_000_000.0, &law.irmaa, FilingStatus::MarriedFilingJointly);
        assert_eq!(top.tier, 5);
        assert_approx(top.annual_per_enrollee(), 12.0 * (594.0 + 81.0));
    }

    #[test]
    fn rmd_divides_prior_balance_by_table_divisor() {
        let law = law_2024();
        assert_eq!(
            rmd_amount(100_000.0, 73, &law.rmd_divisors).expect("valid age"),
            100_000.0 / 26.5
        );
        assert_eq!(rmd_amount(0.0, 90, &law.rmd_divisors).expect("valid age"), 0.0);
    }

    #[test]
    fn rmd_below_table_fails() {
        let law = law_2024();
        assert_eq!(
            rmd_amount(100_000.0, 70, &law.rmd_divisors),
            Err(ProjectionError::NoDivisorForAge { age: 70 })
        );
    }

    #[test]
    fn rmd_start_age_follows_birth_cohort() {
        assert_eq!(rmd_start_age(1950), 72);
        assert_eq!(rmd_start_age(1951), 73);
        assert_eq!(rmd_start_age(1959), 73);
        assert_eq!(rmd_start_age(1960), 75);
    }

    #[test]
    fn assess_shelters_gains_with_unused_deduction() {
        let law = law_2024();
        let income = IncomeComposition {
            ordinary: 10_000.0,
            preferential_gains: 60_000.0,
            ss_benefit: 0.0,
        };
        let result = assess(&income, &law, &single());
        assert_eq!(result.ordinary_taxable_income, 0.0);
        assert_approx(result.taxable_income, 70_000.0 - 14_600.0);
        assert_eq!(result.federal_tax, 0.0);
        assert_approx(
            result.capital_gains_tax,
            0.15 * (70_000.0 - 14_600.0 - 47_025.0),
        );
    }

    #[test]
    fn assess_adds_senior_deduction_and_state_tax() {
        let law = law_2024();
        let filing = FilingContext {
            status: FilingStatus::MarriedFilingJointly,
            seniors: 2,
            state_tax_rate: 0.05,
        };
        let income = IncomeComposition {
            ordinary: 80_000.0,
            preferential_gains: 0.0,
            ss_benefit: 0.0,
        };
        let result = assess(&income, &law, &filing);
        let deduction = 29_200.0 + 2.0 * 1_550.0;
        assert_approx(result.deduction, deduction);
        assert_approx(result.taxable_income, 80_000.0 - deduction);
        assert_approx(result.state_tax, 0.05 * (80_000.0 - deduction));
    }

    #[test]
    fn kinks_bracket_every_slope_change() {
        let law = law_2024();
        let thresholds = law.ss_thresholds.get(FilingStatus::Single);
        let benefit = 24_000.0;
        let kinks = social_security_kinks(benefit, thresholds);
        let taxable_at = |p: f64| {
            taxable_social_security(p, benefit, &law.ss_thresholds, FilingStatus::Single)
        };
        // Between consecutive kinks the function is linear.
        let mut points = vec![0.0];
        points.extend(kinks);
        points.push(200_000.0);
        points.sort_by(|a, b| a.total_cmp(b));
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b - a < 1.0 {
                continue;
            }
            let mid = 0.5 * (a + b);
            let linear = 0.5 * (taxable_at(a) + taxable_at(b));
            assert!((taxable_at(mid) - linear).abs() < 1e-6, "non-linear between {a} and {b}");
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_ordinary_tax_is_monotonic_and_continuous(
            a in 0u32..1_000_000,
            delta in 0u32..200_000,
            joint in proptest::bool::ANY
        ) {
            let law = law_2024();
            let status = if joint { FilingStatus::MarriedFilingJointly } else { FilingStatus::Single };
            let schedule = law.ordinary.get(status);
            let lo = a as f64;
            let hi = lo + delta as f64;
            prop_assert!(ordinary_tax(lo, schedule) <= ordinary_tax(hi, schedule) + 1e-9);

            for bracket in &schedule.brackets {
                if let Some(c) = bracket.ceiling {
                    let jump = ordinary_tax(c + 0.01, schedule) - ordinary_tax(c, schedule);
                    prop_assert!(jump <= 0.01 * 0.37 + 1e-9);
                }
            }
        }

        #[test]
        fn prop_taxable_social_security_is_bounded(
            provisional in 0u32..500_000,
            benefit in 0u32..120_000,
            joint in proptest::bool::ANY
        ) {
            let law = law_2024();
            let status = if joint { FilingStatus::MarriedFilingJointly } else { FilingStatus::Single };
            let benefit = benefit as f64;
            let taxable = taxable_social_security(provisional as f64, benefit, &law.ss_thresholds, status);
            prop_assert!(taxable >= 0.0);
            prop_assert!(taxable <= 0.85 * benefit + 1e-9);
        }

        #[test]
        fn prop_capital_gains_stacking_never_beats_zero_bracket(
            ordinary in 0u32..700_000,
            gains in 0u32..700_000
        ) {
            let law = law_2024();
            let schedule = &law.capital_gains.single;
            let ordinary = ordinary as f64;
            let gains = gains as f64;
            let tax = capital_gains_tax(ordinary, gains, schedule);
            prop_assert!(tax >= 0.0);
            prop_assert!(tax <= 0.20 * gains + 1e-6);
            // More ordinary income can only push gains into higher tiers.
            prop_assert!(capital_gains_tax(ordinary + 10_000.0, gains, schedule) + 1e-9 >= tax);
        }
    }
}
