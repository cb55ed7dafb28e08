//! The spendable resource counter.
//!
//! Only two parties mutate the budget: the economy collaborator earns into
//! it and the controller's commit step spends from it. The value is
//! unsigned and a spend larger than the balance is refused without effect.

use serde::{Deserialize, Serialize};

/// Errors that can occur when spending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BudgetError {
    /// The balance does not cover the cost.
    #[error("insufficient budget: cost {cost}, available {available}")]
    Insufficient {
        /// Requested amount.
        cost: u32,
        /// Balance at the time of the request.
        available: u32,
    },
}

/// Snapshot of the budget counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStats {
    /// Current balance.
    pub current: u32,
    /// Total earned since the last reset.
    pub total_earned: u64,
    /// Total spent since the last reset.
    pub total_spent: u64,
}

/// Resource balance with lifetime counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Budget {
    current: u32,
    total_earned: u64,
    total_spent: u64,
}

impl Budget {
    /// A budget starting at `initial`.
    pub const fn new(initial: u32) -> Self {
        Self {
            current: initial,
            total_earned: 0,
            total_spent: 0,
        }
    }

    /// Current balance.
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Whether the balance covers `cost`.
    pub const fn can_afford(&self, cost: u32) -> bool {
        cost <= self.current
    }

    /// Add `amount` collected by the economy.
    pub fn earn(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount);
        self.total_earned = self.total_earned.saturating_add(u64::from(amount));
    }

    /// Deduct `cost`.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::Insufficient`] and leaves the balance untouched
    /// if `cost` exceeds it.
    pub fn spend(&mut self, cost: u32) -> Result<(), BudgetError> {
        self.current = self
            .current
            .checked_sub(cost)
            .ok_or(BudgetError::Insufficient {
                cost,
                available: self.current,
            })?;
        self.total_spent = self.total_spent.saturating_add(u64::from(cost));
        Ok(())
    }

    /// Restore the balance to `initial` and zero the counters.
    pub fn reset(&mut self, initial: u32) {
        *self = Self::new(initial);
    }

    /// Snapshot of the counters.
    pub const fn stats(&self) -> BudgetStats {
        BudgetStats {
            current: self.current,
            total_earned: self.total_earned,
            total_spent: self.total_spent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_within_balance() {
        let mut budget = Budget::new(200);
        assert!(budget.spend(150).is_ok());
        assert_eq!(budget.current(), 50);
        assert_eq!(budget.stats().total_spent, 150);
    }

    #[test]
    fn overspend_is_refused_without_effect() {
        let mut budget = Budget::new(40);
        let result = budget.spend(50);
        assert_eq!(
            result,
            Err(BudgetError::Insufficient {
                cost: 50,
                available: 40,
            })
        );
        assert_eq!(budget.current(), 40);
        assert_eq!(budget.stats().total_spent, 0);
    }

    #[test]
    fn earn_and_reset() {
        let mut budget = Budget::new(50);
        budget.earn(25);
        budget.earn(25);
        assert!(budget.can_afford(100));
        assert!(!budget.can_afford(101));
        assert_eq!(budget.stats().total_earned, 50);

        budget.reset(50);
        assert_eq!(budget.stats(), BudgetStats {
            current: 50,
            total_earned: 0,
            total_spent: 0,
        });
    }

    #[test]
    fn exact_balance_can_be_spent() {
        let mut budget = Budget::new(125);
        assert!(budget.spend(125).is_ok());
        assert_eq!(budget.current(), 0);
    }
}
