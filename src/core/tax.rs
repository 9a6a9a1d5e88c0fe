use super::types::{CalculatorSettings, FilingStatus, TaxMode};

/// `(upper bound of bracket, marginal rate)`; the last bound is infinite.
type Schedule = [(f64, f64); 7];
type GainsSchedule = [(f64, f64); 3];

const SINGLE: Schedule = [
    (11_600.0, 0.10),
    (47_150.0, 0.12),
    (100_525.0, 0.22),
    (191_950.0, 0.24),
    (243_725.0, 0.32),
    (609_350.0, 0.35),
    (f64::INFINITY, 0.37),
];

const MARRIED_JOINT: Schedule = [
    (23_200.0, 0.10),
    (94_300.0, 0.12),
    (201_050.0, 0.22),
    (383_900.0, 0.24),
    (487_450.0, 0.32),
    (731_200.0, 0.35),
    (f64::INFINITY, 0.37),
];

const MARRIED_SEPARATE: Schedule = [
    (11_600.0, 0.10),
    (47_150.0, 0.12),
    (100_525.0, 0.22),
    (191_950.0, 0.24),
    (243_725.0, 0.32),
    (365_600.0, 0.35),
    (f64::INFINITY, 0.37),
];

const HEAD_OF_HOUSEHOLD: Schedule = [
    (16_550.0, 0.10),
    (63_100.0, 0.12),
    (100_500.0, 0.22),
    (191_950.0, 0.24),
    (243_700.0, 0.32),
    (609_350.0, 0.35),
    (f64::INFINITY, 0.37),
];

const GAINS_SINGLE: GainsSchedule = [(47_025.0, 0.0), (518_900.0, 0.15), (f64::INFINITY, 0.20)];
const GAINS_MARRIED_JOINT: GainsSchedule =
    [(94_050.0, 0.0), (583_750.0, 0.15), (f64::INFINITY, 0.20)];
const GAINS_MARRIED_SEPARATE: GainsSchedule =
    [(47_025.0, 0.0), (291_850.0, 0.15), (f64::INFINITY, 0.20)];
const GAINS_HEAD_OF_HOUSEHOLD: GainsSchedule =
    [(63_000.0, 0.0), (551_350.0, 0.15), (f64::INFINITY, 0.20)];

pub const STANDARD_DEDUCTION_JOINT: f64 = 29_200.0;
pub const STANDARD_DEDUCTION_OTHER: f64 = 14_600.0;

fn ordinary_schedule(status: FilingStatus) -> &'static Schedule {
    match status {
        FilingStatus::Single => &SINGLE,
        FilingStatus::MarriedFilingJointly => &MARRIED_JOINT,
        FilingStatus::MarriedFilingSeparately => &MARRIED_SEPARATE,
        FilingStatus::HeadOfHousehold => &HEAD_OF_HOUSEHOLD,
    }
}

fn gains_schedule(status: FilingStatus) -> &'static GainsSchedule {
    match status {
        FilingStatus::Single => &GAINS_SINGLE,
        FilingStatus::MarriedFilingJointly => &GAINS_MARRIED_JOINT,
        FilingStatus::MarriedFilingSeparately => &GAINS_MARRIED_SEPARATE,
        FilingStatus::HeadOfHousehold => &GAINS_HEAD_OF_HOUSEHOLD,
    }
}

fn clamp_input(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn tax_over_schedule(amount: f64, schedule: &[(f64, f64)]) -> f64 {
    let mut tax = 0.0;
    let mut lower = 0.0;
    for &(upper, rate) in schedule {
        if amount <= lower {
            break;
        }
        tax += (amount.min(upper) - lower) * rate;
        lower = upper;
    }
    tax
}

fn rate_at(amount: f64, schedule: &[(f64, f64)]) -> f64 {
    schedule
        .iter()
        .find(|(upper, _)| amount < *upper)
        .or(schedule.last())
        .map(|(_, rate)| *rate)
        .unwrap_or(0.0)
}

/// Joint filing is forced while the spouse's Social Security is being modeled.
pub fn resolve_filing_status(
    configured: Option<FilingStatus>,
    spouse_ssa_active: bool,
) -> FilingStatus {
    if spouse_ssa_active {
        FilingStatus::MarriedFilingJointly
    } else {
        configured.unwrap_or_default()
    }
}

pub fn standard_deduction(status: FilingStatus) -> f64 {
    match status {
        FilingStatus::MarriedFilingJointly => STANDARD_DEDUCTION_JOINT,
        _ => STANDARD_DEDUCTION_OTHER,
    }
}

pub fn progressive_tax(ordinary_income: f64, status: FilingStatus) -> f64 {
    let taxable = (clamp_input(ordinary_income) - standard_deduction(status)).max(0.0);
    tax_over_schedule(taxable, ordinary_schedule(status))
}

pub fn capital_gains_tax(gains: f64, status: FilingStatus) -> f64 {
    tax_over_schedule(clamp_input(gains), gains_schedule(status))
}

pub fn estimate_marginal_rate(ordinary_income: f64, status: FilingStatus) -> f64 {
    let income = clamp_input(ordinary_income);
    let deduction = standard_deduction(status);
    if income < deduction {
        return 0.0;
    }
    rate_at(income - deduction, ordinary_schedule(status))
}

pub fn estimate_capital_gains_rate(gains: f64, status: FilingStatus) -> f64 {
    rate_at(clamp_input(gains), gains_schedule(status))
}

/// Gross ordinary income at which the current marginal bracket ends. The 10% bracket is
/// treated as part of the 12% one so "fill the low brackets" always has headroom.
pub fn bracket_ceiling(ordinary_income: f64, status: FilingStatus) -> f64 {
    let deduction = standard_deduction(status);
    let taxable = (clamp_input(ordinary_income) - deduction).max(0.0);
    let schedule = ordinary_schedule(status);
    let floor_ceiling = schedule[1].0;
    let ceiling = schedule
        .iter()
        .map(|(upper, _)| *upper)
        .find(|upper| taxable < *upper)
        .unwrap_or(f64::INFINITY);
    ceiling.max(floor_ceiling) + deduction
}

#[derive(Debug, Clone, Copy)]
pub struct TaxCalculator {
    pub status: FilingStatus,
    pub mode: TaxMode,
    pub flat_income_rate: f64,
    pub flat_gains_rate: f64,
}

impl TaxCalculator {
    pub fn new(settings: &CalculatorSettings, status: FilingStatus) -> Self {
        Self {
            status,
            mode: settings.tax_mode,
            flat_income_rate: settings.income_tax_rate.clamp(0.0, 1.0),
            flat_gains_rate: settings.capital_gains_tax_rate.clamp(0.0, 1.0),
        }
    }

    pub fn income_tax(&self, ordinary_income: f64) -> f64 {
        match self.mode {
            TaxMode::Brackets => progressive_tax(ordinary_income, self.status),
            TaxMode::FlatRate => clamp_input(ordinary_income) * self.flat_income_rate,
        }
    }

    pub fn gains_tax(&self, gains: f64) -> f64 {
        match self.mode {
            TaxMode::Brackets => capital_gains_tax(gains, self.status),
            TaxMode::FlatRate => clamp_input(gains) * self.flat_gains_rate,
        }
    }

    pub fn marginal_rate(&self, ordinary_income: f64) -> f64 {
        match self.mode {
            TaxMode::Brackets => estimate_marginal_rate(ordinary_income, self.status),
            TaxMode::FlatRate => self.flat_income_rate,
        }
    }
}
