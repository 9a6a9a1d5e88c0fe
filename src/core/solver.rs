use super::growth::TaxableBasis;
use super::ssa;
use super::strategy::{SelectorState, WithdrawalPlan, choose_withdrawal_order};
use super::tax::TaxCalculator;
use super::types::ByAccountType;

/// Dollars of overdraw accepted above spending.
pub const DEFAULT_TOLERANCE: f64 = 1.0;
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;
const COVERED_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct SolveConfig {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GuaranteedIncome {
    pub ssa: f64,
    pub other: f64,
}

impl GuaranteedIncome {
    pub fn cash(&self) -> f64 {
        self.ssa + self.other
    }

    pub fn ordinary_income(&self) -> f64 {
        self.ssa * ssa::TAXABLE_SHARE + self.other
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YearTax {
    pub ordinary_income: f64,
    pub realized_gains: f64,
    pub income_tax: f64,
    pub gains_tax: f64,
}

impl YearTax {
    pub fn total(&self) -> f64 {
        self.income_tax + self.gains_tax
    }

    pub fn taxable_income(&self) -> f64 {
        self.ordinary_income + self.realized_gains
    }
}

/// Tax owed on guaranteed income plus the given draws. 401k and IRA draws are ordinary
/// income, taxable-account draws realize their gain share, everything else is untaxed.
pub fn tax_for_draws(
    tax: &TaxCalculator,
    income: &GuaranteedIncome,
    draws: &ByAccountType,
    taxable_gain_fraction: f64,
) -> YearTax {
    let ordinary_income = income.ordinary_income() + draws.k401 + draws.ira;
    let realized_gains = draws.taxable * taxable_gain_fraction.clamp(0.0, 1.0);
    YearTax {
        ordinary_income,
        realized_gains,
        income_tax: tax.income_tax(ordinary_income),
        gains_tax: tax.gains_tax(realized_gains),
    }
}

#[derive(Debug, Clone)]
pub struct GrossUpSolution {
    pub plan: WithdrawalPlan,
    pub tax: YearTax,
    pub net_cash: f64,
    /// Spending minus net cash; positive means uncovered. Never positive when converged.
    pub residual: f64,
    pub iterations: u32,
    pub converged: bool,
    pub exhausted: bool,
}

pub fn solve_gross_withdrawal(
    selector: &SelectorState,
    tax: &TaxCalculator,
    income: &GuaranteedIncome,
    required_spending: f64,
    taxable_basis: &TaxableBasis,
    config: SolveConfig,
) -> GrossUpSolution {
    let tolerance = if config.tolerance.is_finite() {
        config.tolerance.max(1e-9)
    } else {
        DEFAULT_TOLERANCE
    };
    let max_iterations = config.max_iterations.max(1);
    let required = if required_spending.is_finite() {
        required_spending.max(0.0)
    } else {
        0.0
    };
    let gain_fraction = taxable_basis.gain_fraction(selector.balances.taxable);

    let mut target = (required - income.cash()).max(0.0);
    let mut iterations = 0;
    let mut converged = false;
    let mut exhausted = false;

    let (mut plan, mut year_tax, mut net_cash, mut residual);
    loop {
        iterations += 1;
        plan = choose_withdrawal_order(selector, target);
        year_tax = tax_for_draws(tax, income, &plan.draws, gain_fraction);
        net_cash = income.cash() + plan.total() - year_tax.total();
        residual = required - net_cash;

        // Only stop on the covered side so a converged year never leaves a shortfall.
        let covered = residual <= COVERED_EPS;
        let not_overdrawn = residual >= -tolerance || target <= 0.0;
        if covered && not_overdrawn {
            converged = true;
            break;
        }
        if residual > 0.0 && plan.shortfall > 0.0 {
            exhausted = true;
            break;
        }
        if iterations >= max_iterations {
            break;
        }
        let step = if residual > 0.0 {
            residual + tolerance / 2.0
        } else {
            residual
        };
        target = (target + step).max(0.0);
    }

    GrossUpSolution {
        plan,
        tax: year_tax,
        net_cash,
        residual,
        iterations,
        converged,
        exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CalculatorSettings, FilingStatus, TaxMode, WithdrawalStrategy};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn selector(balances: ByAccountType) -> SelectorState {
        SelectorState {
            balances,
            age: 70,
            years_remaining: 20,
            years_since_retirement: 5,
            retired: true,
            base_ordinary_income: 0.0,
            filing_status: FilingStatus::Single,
            primary: WithdrawalStrategy::Default,
            secondary: WithdrawalStrategy::Default,
        }
    }

    fn brackets() -> TaxCalculator {
        TaxCalculator::new(&CalculatorSettings::default(), FilingStatus::Single)
    }

    #[test]
    fn tax_free_accounts_need_no_gross_up() {
        let s = selector(ByAccountType {
            roth: 500_000.0,
            ..ByAccountType::default()
        });
        let solution = solve_gross_withdrawal(
            &s,
            &brackets(),
            &GuaranteedIncome::default(),
            40_000.0,
            &TaxableBasis::new(0.0, 0.0),
            SolveConfig::default(),
        );
        assert!(solution.converged);
        assert_eq!(solution.iterations, 1);
        assert_close(solution.plan.draws.roth, 40_000.0, 1e-9);
        assert_close(solution.tax.total(), 0.0, 1e-9);
    }

    #[test]
    fn deferred_draws_are_grossed_up_for_tax() {
        let s = selector(ByAccountType {
            k401: 1_000_000.0,
            ..ByAccountType::default()
        });
        let solution = solve_gross_withdrawal(
            &s,
            &brackets(),
            &GuaranteedIncome::default(),
            60_000.0,
            &TaxableBasis::new(0.0, 0.0),
            SolveConfig::default(),
        );
        assert!(solution.converged);
        assert!(solution.plan.draws.k401 > 60_000.0);
        assert_close(solution.net_cash, 60_000.0, DEFAULT_TOLERANCE);
        assert_close(
            solution.plan.draws.k401 - solution.tax.income_tax,
            60_000.0,
            DEFAULT_TOLERANCE,
        );
    }

    #[test]
    fn converged_solution_never_leaves_spending_uncovered() {
        let s = selector(ByAccountType {
            k401: 5_000_000.0,
            ira: 1_000_000.0,
            ..ByAccountType::default()
        });
        for spending in [20_000.0, 60_000.0, 137_500.0, 400_000.0] {
            let solution = solve_gross_withdrawal(
                &s,
                &brackets(),
                &GuaranteedIncome {
                    ssa: 18_000.0,
                    other: 0.0,
                },
                spending,
                &TaxableBasis::new(0.0, 0.0),
                SolveConfig::default(),
            );
            assert!(solution.converged, "spending {spending}");
            assert!(solution.residual <= 1e-9, "residual {}", solution.residual);
            assert!(solution.residual >= -DEFAULT_TOLERANCE);
            assert!(solution.net_cash >= spending - 1e-9);
        }
    }

    #[test]
    fn flat_tax_gross_up_matches_closed_form() {
        let settings = CalculatorSettings {
            tax_mode: TaxMode::FlatRate,
            income_tax_rate: 0.20,
            ..CalculatorSettings::default()
        };
        let calc = TaxCalculator::new(&settings, FilingStatus::Single);
        let s = selector(ByAccountType {
            ira: 1_000_000.0,
            ..ByAccountType::default()
        });
        let solution = solve_gross_withdrawal(
            &s,
            &calc,
            &GuaranteedIncome::default(),
            80_000.0,
            &TaxableBasis::new(0.0, 0.0),
            SolveConfig {
                tolerance: 0.01,
                max_iterations: 100,
            },
        );
        assert!(solution.converged);
        assert_close(solution.plan.draws.ira, 100_000.0, 0.05);
    }

    #[test]
    fn taxable_gains_are_taxed_at_gains_rates() {
        let s = selector(ByAccountType {
            taxable: 1_000_000.0,
            ..ByAccountType::default()
        });
        let basis = TaxableBasis::new(0.0, 1_000_000.0);
        let solution = solve_gross_withdrawal(
            &s,
            &brackets(),
            &GuaranteedIncome::default(),
            100_000.0,
            &basis,
            SolveConfig::default(),
        );
        assert!(solution.converged);
        assert!(solution.tax.gains_tax > 0.0);
        assert_close(solution.tax.income_tax, 0.0, 1e-9);
        assert_close(solution.tax.realized_gains, solution.plan.draws.taxable, 1e-9);
    }

    #[test]
    fn guaranteed_income_surplus_draws_nothing() {
        let s = selector(ByAccountType {
            k401: 100_000.0,
            ..ByAccountType::default()
        });
        let income = GuaranteedIncome {
            ssa: 30_000.0,
            other: 20_000.0,
        };
        let solution = solve_gross_withdrawal(
            &s,
            &brackets(),
            &income,
            20_000.0,
            &TaxableBasis::new(0.0, 0.0),
            SolveConfig::default(),
        );
        assert!(solution.converged);
        assert_close(solution.plan.total(), 0.0, 1e-9);
        assert!(solution.residual < 0.0);
    }

    #[test]
    fn exhausted_accounts_report_residual() {
        let s = selector(ByAccountType {
            roth: 10_000.0,
            ..ByAccountType::default()
        });
        let solution = solve_gross_withdrawal(
            &s,
            &brackets(),
            &GuaranteedIncome::default(),
            25_000.0,
            &TaxableBasis::new(0.0, 0.0),
            SolveConfig::default(),
        );
        assert!(solution.exhausted);
        assert!(!solution.converged);
        assert_close(solution.residual, 15_000.0, 1e-9);
    }

    #[test]
    fn iteration_cap_returns_best_estimate() {
        let s = selector(ByAccountType {
            k401: 1_000_000.0,
            ..ByAccountType::default()
        });
        let solution = solve_gross_withdrawal(
            &s,
            &brackets(),
            &GuaranteedIncome::default(),
            150_000.0,
            &TaxableBasis::new(0.0, 0.0),
            SolveConfig {
                tolerance: 1.0,
                max_iterations: 1,
            },
        );
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 1);
        assert_close(solution.plan.draws.k401, 150_000.0, 1e-9);
        assert!(solution.residual > 0.0);
    }
}
