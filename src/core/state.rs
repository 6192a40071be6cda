use std::collections::BTreeMap;

use super::types::{AccountBalances, FilingStatus, HouseholdProfile, Person, TaxScenarioInputs};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberState {
    pub age: i32,
    pub alive: bool,
    pub collecting_ss: bool,
    pub on_medicare: bool,
}

impl MemberState {
    pub(crate) fn for_year(
        person: &Person,
        ss_start_year: Option<i32>,
        medicare_start_year: Option<i32>,
        year: i32,
    ) -> Self {
        let age = person.age_in(year);
        let alive = person.alive_in(year);
        let medicare_start = medicare_start_year.unwrap_or(person.birth_year() + 65);
        Self {
            age,
            alive,
            collecting_ss: alive && ss_start_year.is_some_and(|start| year >= start),
            on_medicare: alive && year >= medicare_start,
        }
    }

    pub(crate) fn living_age(&self) -> Option<u32> {
        (self.alive && self.age >= 0).then_some(self.age as u32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdFinancialState {
    pub as_of_year: i32,
    pub year: i32,
    pub primary: MemberState,
    pub spouse: Option<MemberState>,
    pub balances: AccountBalances,
    pub cumulative_rmds: f64,
    pub(crate) magi_history: BTreeMap<i32, f64>,
    pub ran_out_of_money: bool,
}

impl HouseholdFinancialState {
    pub fn initial(
        profile: &HouseholdProfile,
        inputs: &TaxScenarioInputs,
        as_of_year: i32,
    ) -> Self {
        let year = as_of_year - 1;
        let household = &profile.household;
        let primary = MemberState::for_year(
            household.primary(),
            inputs.primary.ss_start_year,
            inputs.primary.medicare_start_year,
            year,
        );
        let spouse_income = inputs.spouse.unwrap_or_default();
        let spouse = household.spouse().map(|person| {
            MemberState::for_year(
                person,
                spouse_income.ss_start_year,
                spouse_income.medicare_start_year,
                year,
            )
        });

        let mut magi_history = BTreeMap::new();
        magi_history.insert(as_of_year - 2, inputs.prior_magi.two_years_ago);
        magi_history.insert(as_of_year - 1, inputs.prior_magi.last_year);

        Self {
            as_of_year,
            year,
            primary,
            spouse,
            balances: AccountBalances::from_start(&inputs.balances),
            cumulative_rmds: 0.0,
            magi_history,
            ran_out_of_money: false,
        }
    }

    pub fn magi_for(&self, year: i32) -> Option<f64> {
        self.magi_history.get(&year).copied()
    }

    pub fn living_members(&self) -> impl Iterator<Item = &MemberState> {
        std::iter::once(&self.primary)
            .chain(self.spouse.as_ref())
            .filter(|m| m.alive)
    }

    /// Married couples file jointly only while both are alive.
    pub fn filing_status(&self, declared: FilingStatus) -> FilingStatus {
        match self.spouse {
            Some(spouse) if spouse.alive && self.primary.alive => declared,
            _ => FilingStatus::Single,
        }
    }
}
