use serde::Serialize;

use super::types::{AccountType, ByAccountType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearAdvance {
    pub balances: ByAccountType,
    pub growth: f64,
    /// Withdrawals that could not be covered by the post-growth balance.
    pub unmet: f64,
}

/// Growth on the prior balance, then contributions, then distributions. Never below zero.
pub fn advance_year(
    balances: &ByAccountType,
    contributions: &ByAccountType,
    distributions: &ByAccountType,
    growth_rate: f64,
) -> YearAdvance {
    let rate = if growth_rate.is_finite() {
        growth_rate.max(-1.0)
    } else {
        0.0
    };
    let mut next = ByAccountType::default();
    let mut growth = 0.0;
    let mut unmet = 0.0;

    for account_type in AccountType::ALL {
        let prior = balances.get(account_type).max(0.0);
        let grown = (prior * (1.0 + rate)).max(0.0);
        growth += grown - prior;
        let funded = grown + contributions.get(account_type).max(0.0);
        let withdrawal = distributions.get(account_type).max(0.0);
        if withdrawal > funded {
            unmet += withdrawal - funded;
        }
        *next.get_mut(account_type) = (funded - withdrawal).max(0.0);
    }

    YearAdvance {
        balances: next,
        growth,
        unmet,
    }
}

/// Cost basis of the taxable account, carried across years so that each sale realizes
/// only its share of the embedded gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxableBasis {
    pub basis: f64,
}

impl TaxableBasis {
    pub fn new(basis: f64, value: f64) -> Self {
        Self {
            basis: basis.max(0.0).min(value.max(0.0)),
        }
    }

    pub fn gain_fraction(&self, value: f64) -> f64 {
        if value <= 0.0 {
            return 0.0;
        }
        (1.0 - self.basis / value).clamp(0.0, 1.0)
    }

    pub fn add(&mut self, amount: f64) {
        self.basis += amount.max(0.0);
    }

    /// Removes the basis attached to a sale and returns the realized gain.
    pub fn sell(&mut self, value_before_sale: f64, sold: f64) -> f64 {
        if value_before_sale <= 0.0 || sold <= 0.0 {
            return 0.0;
        }
        let sold = sold.min(value_before_sale);
        let basis_sold = self.basis * (sold / value_before_sale);
        self.basis = (self.basis - basis_sold).max(0.0);
        (sold - basis_sold).max(0.0)
    }

    /// A market loss can push value below basis; basis never exceeds value.
    pub fn cap_to(&mut self, value: f64) {
        self.basis = self.basis.min(value.max(0.0));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtState {
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebtOutcome {
    pub state: DebtState,
    pub interest_paid: f64,
    pub principal_paid: f64,
    /// Surplus left after servicing debt, available for the taxable sweep.
    pub surplus_remaining: f64,
    pub borrowed: f64,
}

/// Interest accrues on the opening balance. A surplus pays interest, then principal;
/// unpaid interest capitalizes. A shortfall becomes principal only when borrowing is on.
pub fn apply_shortfall(
    debt: DebtState,
    gap: f64,
    enable_borrowing: bool,
    borrowing_rate: f64,
) -> DebtOutcome {
    let gap = if gap.is_finite() { gap } else { 0.0 };
    let opening = debt.balance.max(0.0);
    let interest = opening * borrowing_rate.max(0.0);

    if gap >= 0.0 {
        let interest_paid = gap.min(interest);
        let after_interest = gap - interest_paid;
        let owed_principal = opening + (interest - interest_paid);
        let principal_paid = after_interest.min(owed_principal);
        return DebtOutcome {
            state: DebtState {
                balance: (owed_principal - principal_paid).max(0.0),
            },
            interest_paid,
            principal_paid,
            surplus_remaining: (after_interest - principal_paid).max(0.0),
            borrowed: 0.0,
        };
    }

    let borrowed = if enable_borrowing { -gap } else { 0.0 };
    DebtOutcome {
        state: DebtState {
            balance: opening + interest + borrowed,
        },
        interest_paid: 0.0,
        principal_paid: 0.0,
        surplus_remaining: 0.0,
        borrowed,
    }
}
