use super::calculators::{
    FilingContext, IncomeComposition, deduction_for, gross_ordinary, social_security_kinks,
};
use super::error::{Result, invalid};
use super::tables::YearlyTaxLawTable;
use super::types::{ConversionTarget, FilingStatus, RothConversionSettings};

#[derive(Debug, Clone, Copy)]
pub struct ConversionContext {
    pub year: i32,
    pub income: IncomeComposition,
    pub filing: FilingContext,
    /// Status the household will file under when this year's MAGI is priced
    /// for IRMAA, two years out.
    pub irmaa_status: FilingStatus,
    pub available_deferred: f64,
}

pub fn recommend_conversion(
    ctx: &ConversionContext,
    law: &YearlyTaxLawTable,
    irmaa_law: &YearlyTaxLawTable,
    settings: &RothConversionSettings,
) -> Result<f64> {
    if !settings.enabled || !settings.window.contains(ctx.year) {
        return Ok(0.0);
    }
    let cap = ctx.available_deferred.max(0.0);
    if cap <= 0.0 {
        return Ok(0.0);
    }

    let status = ctx.filing.status;
    let limit = match settings.target {
        ConversionTarget::OrdinaryBracket { rate } => {
            let bracket = law
                .ordinary
                .get(status)
                .bracket_with_rate(rate)
                .ok_or_else(|| {
                    invalid(format!(
                        "no {:.0}% ordinary bracket in the {} table",
                        rate * 100.0,
                        law.year
                    ))
                })?;
            bracket
                .ceiling
                .map(|ceiling| ceiling + deduction_for(law, &ctx.filing))
        }
        ConversionTarget::IrmaaTier { tier } => {
            let tiers = irmaa_law.irmaa.get(ctx.irmaa_status);
            let target = tiers.get(tier).ok_or_else(|| {
                invalid(format!(
                    "IRMAA tier {tier} does not exist (tiers 0-{})",
                    tiers.len().saturating_sub(1)
                ))
            })?;
            target
                .income_ceiling
                .map(|ceiling| ceiling - ctx.income.preferential_gains.max(0.0))
        }
    };

    let Some(limit) = limit else {
        // Unbounded target: the whole remaining balance fits.
        return Ok(floor_cents(cap));
    };
    Ok(max_conversion_within(&ctx.income, law, ctx.filing, limit, cap))
}

pub(crate) fn max_conversion_within(
    income: &IncomeComposition,
    law: &YearlyTaxLawTable,
    filing: FilingContext,
    limit: f64,
    cap: f64,
) -> f64 {
    let status = filing.status;
    let g = |x: f64| gross_ordinary(&income.with_extra_ordinary(x), law, status);

    if g(0.0) >= limit {
        return 0.0;
    }
    if g(cap) <= limit {
        return floor_cents(cap);
    }

    let provisional = income.ordinary + income.preferential_gains + 0.5 * income.ss_benefit;
    let mut points = vec![0.0, cap];
    if income.ss_benefit > 0.0 {
        let thresholds = law.ss_thresholds.get(status);
        points.extend(
            social_security_kinks(income.ss_benefit, thresholds)
                .iter()
                .map(|k| k - provisional)
                .filter(|x| *x > 0.0 && *x < cap),
        );
    }
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup();

    let mut solution = 0.0;
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (ga, gb) = (g(a), g(b));
        if gb <= limit {
            solution = b;
            continue;
        }
        let slope = (gb - ga) / (b - a);
        solution = if slope > 0.0 {
            a + (limit - ga) / slope
        } else {
            a
        };
        break;
    }

    let mut x = floor_cents(solution.clamp(0.0, cap));
    while x > 0.0 && g(x) > limit + 1e-9 {
        x = floor_cents(x - 0.01).max(0.0);
    }
    x
}

pub(crate) fn floor_cents(value: f64) -> f64 {
    // Nudge before flooring so values like 12.34999999 land on 12.35.
    ((value * 100.0) + 1e-7).floor() / 100.0
}
