//! Per-message cycle budget (RFC 3320 section 8.6)

use crate::error::FailureReason;
use log::debug;

/// Cycles granted for free on top of the per-bit allowance
pub const BASE_CYCLE_BITS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBudget {
    used: u64,
    maximum: u64,
}

impl CycleBudget {
    /// `(8 * (header_length + message_length) + 1000) * cycles_per_bit`
    pub fn new(cycles_per_bit: u16, header_length: usize, message_length: usize) -> Self {
        let bits = 8 * (header_length as u64 + message_length as u64);
        CycleBudget {
            used: 0,
            maximum: (bits + BASE_CYCLE_BITS) * cycles_per_bit as u64,
        }
    }

    /// Spend `cycles`; exceeding the maximum is a hard failure
    pub fn charge(&mut self, cycles: u64) -> Result<(), FailureReason> {
        self.used = self.used.saturating_add(cycles);
        if self.used > self.maximum {
            debug!(
                "cycle budget exhausted: {} used of {}",
                self.used, self.maximum
            );
            return Err(FailureReason::CyclesExhausted);
        }
        Ok(())
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn maximum(&self) -> u64 {
        self.maximum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_budget_formula() {
        assert_eq!(CycleBudget::new(16, 0, 0).maximum(), 16000);
        assert_eq!(CycleBudget::new(32, 10, 90).maximum(), (800 + 1000) * 32);
    }

    #[test]
    fn test_charge_up_to_limit() {
        let mut budget = CycleBudget::new(16, 0, 0);
        for _ in 0..16000 {
            budget.charge(1).unwrap();
        }
        assert_eq!(budget.charge(1), Err(FailureReason::CyclesExhausted));
    }
}
