pub const PRIMARY_DEFAULT_BENEFIT: f64 = 20_000.0;
pub const PRIMARY_BENEFIT_CAP: f64 = 45_000.0;
pub const SPOUSE_BENEFIT_CAP: f64 = 22_500.0;
const INCOME_REPLACEMENT: f64 = 0.25;
const SPOUSE_SHARE: f64 = 0.5;

pub const FULL_RETIREMENT_AGE: u32 = 67;
pub const EARLIEST_CLAIM_AGE: u32 = 62;
pub const LATEST_CREDIT_AGE: u32 = 70;
const EARLY_REDUCTION_PER_YEAR: f64 = 0.0667;
const MAX_EARLY_REDUCTION: f64 = 0.30;
const DELAY_CREDIT_PER_YEAR: f64 = 0.08;
const MAX_DELAY_CREDIT: f64 = 0.24;

/// Portion of benefits included in ordinary taxable income.
pub const TAXABLE_SHARE: f64 = 0.85;

// Floor plus a flat share of income, capped. Not the PIA bend-point formula.
pub fn estimate_ssa(annual_income: f64, is_primary: bool) -> f64 {
    let income = if annual_income.is_finite() {
        annual_income.max(0.0)
    } else {
        0.0
    };
    let primary = (PRIMARY_DEFAULT_BENEFIT + income * INCOME_REPLACEMENT).min(PRIMARY_BENEFIT_CAP);
    if is_primary {
        primary
    } else {
        (primary * SPOUSE_SHARE).min(SPOUSE_BENEFIT_CAP)
    }
}

pub fn start_age_factor(start_age: u32) -> f64 {
    if start_age < FULL_RETIREMENT_AGE {
        let years_early = (FULL_RETIREMENT_AGE - start_age) as f64;
        1.0 - (years_early * EARLY_REDUCTION_PER_YEAR).min(MAX_EARLY_REDUCTION)
    } else {
        let years_late = (start_age - FULL_RETIREMENT_AGE) as f64;
        1.0 + (years_late * DELAY_CREDIT_PER_YEAR).min(MAX_DELAY_CREDIT)
    }
}

pub fn effective_start_age(configured: u32) -> u32 {
    configured.clamp(EARLIEST_CLAIM_AGE, LATEST_CREDIT_AGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn zero_income_uses_defaults() {
        assert_approx(estimate_ssa(0.0, true), 20_000.0);
        assert_approx(estimate_ssa(0.0, false), 10_000.0);
        assert_approx(estimate_ssa(-50_000.0, true), 20_000.0);
    }

    #[test]
    fn benefits_scale_then_saturate() {
        assert_approx(estimate_ssa(40_000.0, true), 30_000.0);
        assert_approx(estimate_ssa(40_000.0, false), 15_000.0);
        assert_approx(estimate_ssa(500_000.0, true), 45_000.0);
        assert_approx(estimate_ssa(500_000.0, false), 22_500.0);
    }

    #[test]
    fn claim_age_adjustments_are_capped() {
        assert_approx(start_age_factor(67), 1.0);
        assert_approx(start_age_factor(66), 1.0 - 0.0667);
        assert_approx(start_age_factor(62), 0.70);
        assert_approx(start_age_factor(55), 0.70);
        assert_approx(start_age_factor(68), 1.08);
        assert_approx(start_age_factor(70), 1.24);
        assert_approx(start_age_factor(75), 1.24);
    }

    #[test]
    fn claim_age_is_clamped_to_legal_window() {
        assert_eq!(effective_start_age(55), 62);
        assert_eq!(effective_start_age(67), 67);
        assert_eq!(effective_start_age(80), 70);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_spouse_benefit_stays_below_primary(income in 0u32..2_000_000) {
            let income = income as f64;
            let primary = estimate_ssa(income, true);
            let spouse = estimate_ssa(income, false);
            prop_assert!(spouse < primary);
            prop_assert!(primary <= PRIMARY_BENEFIT_CAP);
            prop_assert!(spouse <= SPOUSE_BENEFIT_CAP);
        }
    }
}
