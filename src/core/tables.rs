use std::ops::RangeInclusive;

use serde::Serialize;

use super::error::{ProjectionError, Result, invalid};
use super::types::FilingStatus;

const EARLIEST_PUBLISHED_YEAR: i32 = 2023;
const LATEST_PUBLISHED_YEAR: i32 = 2025;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub floor: f64,
    pub ceiling: Option<f64>,
    pub rate: f64,
}

/// Marginal brackets ordered ascending; the last one is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BracketSchedule {
    pub brackets: Vec<Bracket>,
}

impl BracketSchedule {
    pub fn from_ceilings(bands: &[(f64, f64)], top_rate: f64) -> Self {
        let mut brackets = Vec::with_capacity(bands.len() + 1);
        let mut floor = 0.0;
        for &(ceiling, rate) in bands {
            brackets.push(Bracket {
                floor,
                ceiling: Some(ceiling),
                rate,
            });
            floor = ceiling;
        }
        brackets.push(Bracket {
            floor,
            ceiling: None,
            rate: top_rate,
        });
        Self { brackets }
    }

    pub fn bracket_with_rate(&self, rate: f64) -> Option<&Bracket> {
        self.brackets
            .iter()
            .find(|bracket| (bracket.rate - rate).abs() < 1e-9)
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            brackets: self
                .brackets
                .iter()
                .map(|b| Bracket {
                    floor: b.floor * factor,
                    ceiling: b.ceiling.map(|c| c * factor),
                    rate: b.rate,
                })
                .collect(),
        }
    }

    fn validate(&self, label: &str) -> Result<()> {
        let Some(first) = self.brackets.first() else {
            return Err(invalid(format!("{label}: schedule is empty")));
        };
        if first.floor != 0.0 {
            return Err(invalid(format!("{label}: first bracket must start at 0")));
        }
        for pair in self.brackets.windows(2) {
            let Some(ceiling) = pair[0].ceiling else {
                return Err(invalid(format!("{label}: only the top bracket may be unbounded")));
            };
            if ceiling <= pair[0].floor {
                return Err(invalid(format!("{label}: bracket ceilings must increase")));
            }
            if (pair[1].floor - ceiling).abs() > 1e-9 {
                return Err(invalid(format!("{label}: brackets must be contiguous")));
            }
        }
        if self.brackets.last().is_some_and(|b| b.ceiling.is_some()) {
            return Err(invalid(format!("{label}: top bracket must be unbounded")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ByFilingStatus<T> {
    pub single: T,
    pub joint: T,
}

impl<T> ByFilingStatus<T> {
    pub fn get(&self, status: FilingStatus) -> &T {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedFilingJointly => &self.joint,
        }
    }

    fn map<U>(&self, f: impl Fn(&T) -> U) -> ByFilingStatus<U> {
        ByFilingStatus {
            single: f(&self.single),
            joint: f(&self.joint),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SsThresholds {
    pub base: f64,
    pub adjusted: f64,
}

/// One IRMAA tier. Premiums are monthly, per enrollee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrmaaBracket {
    pub income_floor: f64,
    pub income_ceiling: Option<f64>,
    pub part_b_premium: f64,
    pub part_d_surcharge: f64,
}

/// IRS Uniform Lifetime Table; ages past the last entry reuse its divisor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RmdTable {
    pub first_age: u32,
    pub divisors: Vec<f64>,
}

impl RmdTable {
    pub fn divisor(&self, age: u32) -> Option<f64> {
        if age < self.first_age {
            return None;
        }
        let idx = ((age - self.first_age) as usize).min(self.divisors.len().checked_sub(1)?);
        self.divisors.get(idx).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyTaxLawTable {
    pub year: i32,
    pub extrapolated: bool,
    pub ordinary: ByFilingStatus<BracketSchedule>,
    pub capital_gains: ByFilingStatus<BracketSchedule>,
    pub standard_deduction: ByFilingStatus<f64>,
    /// Extra deduction per filer aged 65 or older.
    pub additional_deduction_65: ByFilingStatus<f64>,
    pub ss_thresholds: ByFilingStatus<SsThresholds>,
    pub irmaa: ByFilingStatus<Vec<IrmaaBracket>>,
    pub part_d_oop_cap: f64,
    pub qcd_limit: f64,
    pub rmd_divisors: RmdTable,
}

impl YearlyTaxLawTable {
    /// Re-labels the table as `year`, scaling every indexed dollar amount by `factor`.
    /// Social Security thresholds are statutory and the RMD table is age-based, so
    /// neither is scaled.
    pub fn inflated(&self, year: i32, factor: f64) -> Self {
        Self {
            year,
            extrapolated: true,
            ordinary: self.ordinary.map(|s| s.scaled(factor)),
            capital_gains: self.capital_gains.map(|s| s.scaled(factor)),
            standard_deduction: self.standard_deduction.map(|d| d * factor),
            additional_deduction_65: self.additional_deduction_65.map(|d| d * factor),
            ss_thresholds: self.ss_thresholds,
            irmaa: self.irmaa.map(|tiers| {
                tiers
                    .iter()
                    .map(|t| IrmaaBracket {
                        income_floor: t.income_floor * factor,
                        income_ceiling: t.income_ceiling.map(|c| c * factor),
                        part_b_premium: t.part_b_premium * factor,
                        part_d_surcharge: t.part_d_surcharge * factor,
                    })
                    .collect()
            }),
            part_d_oop_cap: self.part_d_oop_cap * factor,
            qcd_limit: self.qcd_limit * factor,
            rmd_divisors: self.rmd_divisors.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let year = self.year;
        for (label, schedule) in [
            ("ordinary single", &self.ordinary.single),
            ("ordinary joint", &self.ordinary.joint),
            ("capital gains single", &self.capital_gains.single),
            ("capital gains joint", &self.capital_gains.joint),
        ] {
            schedule.validate(&format!("{year} {label}"))?;
        }
        for (label, tiers) in [
            ("single", &self.irmaa.single),
            ("joint", &self.irmaa.joint),
        ] {
            let Some(first) = tiers.first() else {
                return Err(invalid(format!("{year} IRMAA {label}: no tiers")));
            };
            if first.income_floor != 0.0 {
                return Err(invalid(format!("{year} IRMAA {label}: first tier must start at 0")));
            }
            for pair in tiers.windows(2) {
                if pair[0].income_ceiling != Some(pair[1].income_floor) {
                    return Err(invalid(format!("{year} IRMAA {label}: tiers must be contiguous")));
                }
            }
            if tiers.last().is_some_and(|t| t.income_ceiling.is_some()) {
                return Err(invalid(format!("{year} IRMAA {label}: top tier must be unbounded")));
            }
        }
        if self.rmd_divisors.divisors.iter().any(|d| *d <= 0.0) {
            return Err(invalid(format!("{year} RMD table: divisors must be positive")));
        }
        Ok(())
    }
}

pub trait TaxLawProvider {
    fn year_data(&self, year: i32) -> Result<YearlyTaxLawTable>;
}

impl<F> TaxLawProvider for F
where
    F: Fn(i32) -> Result<YearlyTaxLawTable>,
{
    fn year_data(&self, year: i32) -> Result<YearlyTaxLawTable> {
        self(year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extrapolation {
    Disabled,
    InflateLatest { rate: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct PublishedTaxLaw {
    extrapolation: Extrapolation,
}

impl PublishedTaxLaw {
    pub fn new(extrapolation: Extrapolation) -> Self {
        Self { extrapolation }
    }

    pub fn published_years() -> RangeInclusive<i32> {
        EARLIEST_PUBLISHED_YEAR..=LATEST_PUBLISHED_YEAR
    }

    fn unsupported(year: i32) -> ProjectionError {
        ProjectionError::UnsupportedYear {
            year,
            earliest: EARLIEST_PUBLISHED_YEAR,
            latest: LATEST_PUBLISHED_YEAR,
        }
    }
}

impl TaxLawProvider for PublishedTaxLaw {
    fn year_data(&self, year: i32) -> Result<YearlyTaxLawTable> {
        if let Some(table) = published_table(year) {
            return Ok(table);
        }
        if year < EARLIEST_PUBLISHED_YEAR {
            return Err(Self::unsupported(year));
        }
        match self.extrapolation {
            Extrapolation::Disabled => Err(Self::unsupported(year)),
            Extrapolation::InflateLatest { rate } => {
                let latest =
                    published_table(LATEST_PUBLISHED_YEAR).ok_or_else(|| Self::unsupported(year))?;
                let factor = (1.0 + rate).powi(year - LATEST_PUBLISHED_YEAR);
                Ok(latest.inflated(year, factor))
            }
        }
    }
}

const UNIFORM_LIFETIME_FIRST_AGE: u32 = 72;
const UNIFORM_LIFETIME_DIVISORS: [f64; 49] = [
    27.4, 26.5, 25.5, 24.6, 23.7, 22.9, 22.0, 21.1, 20.2, 19.4, // 72-81
    18.5, 17.7, 16.8, 16.0, 15.2, 14.4, 13.7, 12.9, 12.2, 11.5, // 82-91
    10.8, 10.1, 9.5, 8.9, 8.4, 7.8, 7.3, 6.8, 6.4, 6.0, // 92-101
    5.6, 5.2, 4.9, 4.6, 4.3, 4.1, 3.9, 3.7, 3.5, 3.4, // 102-111
    3.3, 3.1, 3.0, 2.9, 2.8, 2.7, 2.5, 2.3, 2.0, // 112-120+
];

const SS_THRESHOLDS: ByFilingStatus<SsThresholds> = ByFilingStatus {
    single: SsThresholds {
        base: 25_000.0,
        adjusted: 34_000.0,
    },
    joint: SsThresholds {
        base: 32_000.0,
        adjusted: 44_000.0,
    },
};

const ORDINARY_RATES: [f64; 6] = [0.10, 0.12, 0.22, 0.24, 0.32, 0.35];
const ORDINARY_TOP_RATE: f64 = 0.37;

struct PublishedYear {
    year: i32,
    ordinary_single: [f64; 6],
    ordinary_joint: [f64; 6],
    cg_single: [f64; 2],
    cg_joint: [f64; 2],
    standard_deduction: (f64, f64),
    additional_65: (f64, f64),
    irmaa_single: [f64; 5],
    irmaa_joint: [f64; 5],
    part_b: [f64; 6],
    part_d: [f64; 6],
    part_d_oop_cap: f64,
    qcd_limit: f64,
}

const PUBLISHED: [PublishedYear; 3] = [
    PublishedYear {
        year: 2023,
        ordinary_single: [11_000.0, 44_725.0, 95_375.0, 182_100.0, 231_250.0, 578_125.0],
        ordinary_joint: [22_000.0, 89_450.0, 190_750.0, 364_200.0, 462_500.0, 693_750.0],
        cg_single: [44_625.0, 492_300.0],
        cg_joint: [89_250.0, 553_850.0],
        standard_deduction: (13_850.0, 27_700.0),
        additional_65: (1_850.0, 1_500.0),
        irmaa_single: [97_000.0, 123_000.0, 153_000.0, 183_000.0, 500_000.0],
        irmaa_joint: [194_000.0, 246_000.0, 306_000.0, 366_000.0, 750_000.0],
        part_b: [164.90, 230.80, 329.70, 428.60, 527.50, 560.50],
        part_d: [0.0, 12.20, 31.50, 50.70, 70.00, 76.40],
        part_d_oop_cap: 7_400.0,
        qcd_limit: 100_000.0,
    },
    PublishedYear {
        year: 2024,
        ordinary_single: [11_600.0, 47_150.0, 100_525.0, 191_950.0, 243_725.0, 609_350.0],
        ordinary_joint: [23_200.0, 94_300.0, 201_050.0, 383_900.0, 487_450.0, 731_200.0],
        cg_single: [47_025.0, 518_900.0],
        cg_joint: [94_050.0, 583_750.0],
        standard_deduction: (14_600.0, 29_200.0),
        additional_65: (1_950.0, 1_550.0),
        irmaa_single: [103_000.0, 129_000.0, 161_000.0, 193_000.0, 500_000.0],
        irmaa_joint: [206_000.0, 258_000.0, 322_000.0, 386_000.0, 750_000.0],
        part_b: [174.70, 244.60, 349.40, 454.20, 559.00, 594.00],
        part_d: [0.0, 12.90, 33.30, 53.80, 74.20, 81.00],
        part_d_oop_cap: 8_000.0,
        qcd_limit: 105_000.0,
    },
    PublishedYear {
        year: 2025,
        ordinary_single: [11_925.0, 48_475.0, 103_350.0, 197_300.0, 250_525.0, 626_350.0],
        ordinary_joint: [23_850.0, 96_950.0, 206_700.0, 394_600.0, 501_050.0, 751_600.0],
        cg_single: [48_350.0, 533_400.0],
        cg_joint: [96_700.0, 600_050.0],
        standard_deduction: (15_750.0, 31_500.0),
        additional_65: (2_000.0, 1_600.0),
        irmaa_single: [106_000.0, 133_000.0, 167_000.0, 200_000.0, 500_000.0],
        irmaa_joint: [212_000.0, 266_000.0, 334_000.0, 400_000.0, 750_000.0],
        part_b: [185.00, 259.00, 370.00, 480.90, 591.90, 628.90],
        part_d: [0.0, 13.70, 35.30, 57.00, 78.60, 85.80],
        part_d_oop_cap: 2_000.0,
        qcd_limit: 108_000.0,
    },
];

fn ordinary_schedule(ceilings: &[f64; 6]) -> BracketSchedule {
    let bands: Vec<(f64, f64)> = ceilings
        .iter()
        .copied()
        .zip(ORDINARY_RATES.iter().copied())
        .collect();
    BracketSchedule::from_ceilings(&bands, ORDINARY_TOP_RATE)
}

fn capital_gains_schedule(ceilings: &[f64; 2]) -> BracketSchedule {
    BracketSchedule::from_ceilings(&[(ceilings[0], 0.0), (ceilings[1], 0.15)], 0.20)
}

fn irmaa_tiers(ceilings: &[f64; 5], part_b: &[f64; 6], part_d: &[f64; 6]) -> Vec<IrmaaBracket> {
    let mut tiers = Vec::with_capacity(6);
    let mut floor = 0.0;
    for idx in 0..6 {
        let ceiling = ceilings.get(idx).copied();
        tiers.push(IrmaaBracket {
            income_floor: floor,
            income_ceiling: ceiling,
            part_b_premium: part_b[idx],
            part_d_surcharge: part_d[idx],
        });
        if let Some(c) = ceiling {
            floor = c;
        }
    }
    tiers
}

fn published_table(year: i32) -> Option<YearlyTaxLawTable> {
    let p = PUBLISHED.iter().find(|p| p.year == year)?;
    Some(YearlyTaxLawTable {
        year,
        extrapolated: false,
        ordinary: ByFilingStatus {
            single: ordinary_schedule(&p.ordinary_single),
            joint: ordinary_schedule(&p.ordinary_joint),
        },
        capital_gains: ByFilingStatus {
            single: capital_gains_schedule(&p.cg_single),
            joint: capital_gains_schedule(&p.cg_joint),
        },
        standard_deduction: ByFilingStatus {
            single: p.standard_deduction.0,
            joint: p.standard_deduction.1,
        },
        additional_deduction_65: ByFilingStatus {
            single: p.additional_65.0,
            joint: p.additional_65.1,
        },
        ss_thresholds: SS_THRESHOLDS,
        irmaa: ByFilingStatus {
            single: irmaa_tiers(&p.irmaa_single, &p.part_b, &p.part_d),
            joint: irmaa_tiers(&p.irmaa_joint, &p.part_b, &p.part_d),
        },
        part_d_oop_cap: p.part_d_oop_cap,
        qcd_limit: p.qcd_limit,
        rmd_divisors: RmdTable {
            first_age: UNIFORM_LIFETIME_FIRST_AGE,
            divisors: UNIFORM_LIFETIME_DIVISORS.to_vec(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_published_table_is_well_formed() {
        let law = PublishedTaxLaw::new(Extrapolation::Disabled);
        for year in PublishedTaxLaw::published_years() {
            let table = law.year_data(year).expect("published year");
            assert_eq!(table.year, year);
            assert!(!table.extrapolated);
            table.validate().expect("valid table");
        }
    }

    #[test]
    fn years_outside_published_range_fail_without_extrapolation() {
        let law = PublishedTaxLaw::new(Extrapolation::Disabled);
        assert_eq!(
            law.year_data(2026),
            Err(ProjectionError::UnsupportedYear {
                year: 2026,
                earliest: 2023,
                latest: 2025
            })
        );
        assert!(matches!(
            law.year_data(2019),
            Err(ProjectionError::UnsupportedYear { year: 2019, .. })
        ));
    }

    #[test]
    fn extrapolation_inflates_thresholds_but_not_statutory_amounts() {
        let law = PublishedTaxLaw::new(Extrapolation::InflateLatest { rate: 0.03 });
        let base = law.year_data(2025).expect("2025");
        let later = law.year_data(2027).expect("2027");
        let factor = 1.03_f64.powi(2);

        assert!(later.extrapolated);
        later.validate().expect("still well formed");
        assert!(
            (later.standard_deduction.single - base.standard_deduction.single * factor).abs()
                < 1e-6
        );
        let base_ceiling = base.ordinary.joint.brackets[2].ceiling.expect("bounded");
        let later_ceiling = later.ordinary.joint.brackets[2].ceiling.expect("bounded");
        assert!((later_ceiling - base_ceiling * factor).abs() < 1e-6);
        assert_eq!(later.ss_thresholds, base.ss_thresholds);
        assert_eq!(later.rmd_divisors, base.rmd_divisors);
    }

    #[test]
    fn extrapolation_never_reaches_back_before_published_tables() {
        let law = PublishedTaxLaw::new(Extrapolation::InflateLatest { rate: 0.03 });
        assert!(matches!(
            law.year_data(2020),
            Err(ProjectionError::UnsupportedYear { .. })
        ));
    }

    #[test]
    fn rmd_table_covers_72_through_120_plus() {
        let table = published_table(2024).expect("2024").rmd_divisors;
        assert_eq!(table.divisor(71), None);
        assert_eq!(table.divisor(72), Some(27.4));
        assert_eq!(table.divisor(73), Some(26.5));
        assert_eq!(table.divisor(120), Some(2.0));
        assert_eq!(table.divisor(125), Some(2.0));
    }

    #[test]
    fn validate_rejects_gapped_schedules() {
        let mut table = published_table(2024).expect("2024");
        table.ordinary.single.brackets[1].floor += 1.0;
        assert!(matches!(
            table.validate(),
            Err(ProjectionError::InvalidInputs(_))
        ));
    }

    #[test]
    fn closures_act_as_providers() {
        let fixed = |year: i32| -> Result<YearlyTaxLawTable> {
            published_table(2024)
                .map(|t| t.inflated(year, 1.0))
                .ok_or(ProjectionError::InvalidInputs("missing".to_string()))
        };
        let table = fixed.year_data(2040).expect("fixed table");
        assert_eq!(table.year, 2040);
        assert_eq!(table.standard_deduction.single, 14_600.0);
    }
}
