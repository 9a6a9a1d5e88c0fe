use serde::Serialize;

use super::tax::bracket_ceiling;
use super::types::{AccountType, ByAccountType, FilingStatus, WithdrawalStrategy};

/// Years after retirement during which `SequenceRisk` keeps equity-heavy accounts intact.
const SEQUENCE_RISK_WINDOW: u32 = 5;
/// Below this many remaining years `Longevity` has nothing left to protect.
const LONGEVITY_ENDGAME_YEARS: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct SelectorState {
    pub balances: ByAccountType,
    pub age: u32,
    pub years_remaining: u32,
    pub years_since_retirement: u32,
    pub retired: bool,
    /// Ordinary income already recognized this year before any withdrawal.
    pub base_ordinary_income: f64,
    pub filing_status: FilingStatus,
    pub primary: WithdrawalStrategy,
    pub secondary: WithdrawalStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawSlot {
    pub account_type: AccountType,
    pub max_draw: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalPlan {
    pub order: Vec<DrawSlot>,
    pub draws: ByAccountType,
    pub shortfall: f64,
}

impl WithdrawalPlan {
    pub fn total(&self) -> f64 {
        self.draws.total()
    }
}

/// Ordered draw slots plus the concrete draws that cover `requested` gross dollars.
pub fn choose_withdrawal_order(state: &SelectorState, requested: f64) -> WithdrawalPlan {
    let requested = if requested.is_finite() {
        requested.max(0.0)
    } else {
        0.0
    };
    let balances = state.balances.map(|_, v| if v.is_finite() { v.max(0.0) } else { 0.0 });

    if !state.retired {
        return WithdrawalPlan {
            order: Vec::new(),
            draws: ByAccountType::default(),
            shortfall: requested,
        };
    }

    let ranked = ranked_account_types(state);
    let order = match state.primary {
        WithdrawalStrategy::StableIncome => pro_rata_slots(&balances, requested, &ranked),
        WithdrawalStrategy::TaxOptimization => bracket_fill_slots(state, &balances, &ranked),
        _ => ranked
            .iter()
            .map(|t| DrawSlot {
                account_type: *t,
                max_draw: balances.get(*t),
            })
            .collect(),
    };

    fill_slots(order, &balances, requested)
}

/// Account types sorted by the primary ranking, ties broken by the secondary ranking and
/// finally by `AccountType::ALL` order.
pub fn ranked_account_types(state: &SelectorState) -> Vec<AccountType> {
    let mut types = AccountType::ALL.to_vec();
    types.sort_by_key(|t| {
        let column = AccountType::ALL.iter().position(|a| a == t).unwrap_or(0);
        (
            rank(state.primary, *t, state),
            rank(state.secondary, *t, state),
            column,
        )
    });
    types
}

fn rank(strategy: WithdrawalStrategy, account_type: AccountType, state: &SelectorState) -> u8 {
    use AccountType::*;
    match strategy {
        WithdrawalStrategy::Default | WithdrawalStrategy::StableIncome => match account_type {
            Other => 0,
            Taxable => 1,
            K401 | Ira => 2,
            Hsa => 3,
            Roth => 4,
        },
        WithdrawalStrategy::Longevity => {
            if state.years_remaining <= LONGEVITY_ENDGAME_YEARS {
                return rank(WithdrawalStrategy::Default, account_type, state);
            }
            match account_type {
                Other => 0,
                Taxable => 1,
                Roth => 2,
                Hsa => 3,
                K401 | Ira => 4,
            }
        }
        WithdrawalStrategy::Legacy => match account_type {
            K401 | Ira => 0,
            Other => 1,
            Hsa => 2,
            Taxable => 3,
            Roth => 4,
        },
        WithdrawalStrategy::TaxOptimization => match account_type {
            Taxable | Other => 0,
            K401 | Ira => 1,
            Hsa => 2,
            Roth => 3,
        },
        WithdrawalStrategy::SequenceRisk => {
            if state.years_since_retirement >= SEQUENCE_RISK_WINDOW {
                return rank(WithdrawalStrategy::Default, account_type, state);
            }
            match account_type {
                Other => 0,
                Taxable => 1,
                Hsa => 2,
                K401 | Ira => 3,
                Roth => 4,
            }
        }
        WithdrawalStrategy::Liquidity => match account_type {
            Other => 0,
            Taxable => 1,
            Hsa => 2,
            Roth => 3,
            K401 | Ira => 4,
        },
    }
}

// A level nominal draw taken pro rata from every account leaves the account mix, and so
// the tax character of the draw, unchanged from one year to the next.
fn pro_rata_slots(
    balances: &ByAccountType,
    requested: f64,
    ranked: &[AccountType],
) -> Vec<DrawSlot> {
    let total = balances.total();
    let mut slots = Vec::with_capacity(ranked.len() * 2);
    let mut shares = ByAccountType::default();
    if total > 0.0 {
        for t in ranked {
            let share = (requested * balances.get(*t) / total).min(balances.get(*t));
            *shares.get_mut(*t) = share;
            slots.push(DrawSlot {
                account_type: *t,
                max_draw: share,
            });
        }
    }
    // Rounding residue falls through to the normal order.
    for t in ranked {
        slots.push(DrawSlot {
            account_type: *t,
            max_draw: (balances.get(*t) - shares.get(*t)).max(0.0),
        });
    }
    slots
}

fn bracket_fill_slots(
    state: &SelectorState,
    balances: &ByAccountType,
    ranked: &[AccountType],
) -> Vec<DrawSlot> {
    let base = state.base_ordinary_income.max(0.0);
    let mut headroom = (bracket_ceiling(base, state.filing_status) - base).max(0.0);
    let mut used = ByAccountType::default();
    let mut slots = Vec::with_capacity(ranked.len() * 2);

    for t in ranked.iter().filter(|t| t.is_tax_deferred()) {
        let take = balances.get(*t).min(headroom);
        headroom -= take;
        *used.get_mut(*t) = take;
        slots.push(DrawSlot {
            account_type: *t,
            max_draw: take,
        });
    }
    for t in ranked {
        slots.push(DrawSlot {
            account_type: *t,
            max_draw: (balances.get(*t) - used.get(*t)).max(0.0),
        });
    }
    slots
}

fn fill_slots(order: Vec<DrawSlot>, balances: &ByAccountType, requested: f64) -> WithdrawalPlan {
    let mut draws = ByAccountType::default();
    let mut remaining = requested;

    for slot in &order {
        if remaining <= 0.0 {
            break;
        }
        let left_in_account = (balances.get(slot.account_type) - draws.get(slot.account_type))
            .max(0.0);
        let take = remaining.min(slot.max_draw).min(left_in_account).max(0.0);
        *draws.get_mut(slot.account_type) += take;
        remaining -= take;
    }

    WithdrawalPlan {
        order,
        draws,
        shortfall: remaining.max(0.0),
    }
}
