// Currency ledger of the fake engine.
//
// Tracks a bank of minerals and gas plus the amount currently reserved by
// tasks. The engine itself deducts a price from the bank when an entity
// starts materializing; the owning task releases its reservation only once
// it has correlated that entity. Between those two moments the price is
// counted twice, which is the conservative side to err on.

use foreman_core::error::LedgerError;
use foreman_core::ledger::ResourceLedger;
use foreman_core::types::Cost;
use tracing::trace;

#[derive(Clone, Debug, Default)]
pub struct Stockpile {
    bank: Cost,
    reserved: Cost,
    pub reserve_calls: u32,
    pub release_calls: u32,
    pub denials: u32,
}

impl Stockpile {
    pub fn new(bank: Cost) -> Self {
        Self {
            bank,
            ..Self::default()
        }
    }

    pub fn bank(&self) -> Cost {
        self.bank
    }

    pub fn reserved(&self) -> Cost {
        self.reserved
    }

    /// Bank minus outstanding reservations.
    pub fn available(&self) -> Cost {
        self.bank.saturating_sub(self.reserved)
    }

    pub fn deposit(&mut self, amount: Cost) {
        self.bank = self.bank + amount;
    }

    /// Deduct a price from the bank. Returns false (and deducts nothing) if
    /// the bank cannot cover it.
    pub fn spend(&mut self, price: Cost) -> bool {
        if !self.bank.covers(price) {
            return false;
        }
        self.bank = self.bank - price;
        true
    }
}

impl ResourceLedger for Stockpile {
    fn reserve(&mut self, cost: Cost) -> bool {
        if !self.available().covers(cost) {
            self.denials += 1;
            return false;
        }
        self.reserved = self.reserved + cost;
        self.reserve_calls += 1;
        trace!(%cost, reserved = %self.reserved, "reserved");
        true
    }

    fn release(&mut self, cost: Cost) -> Result<(), LedgerError> {
        if !self.reserved.covers(cost) {
            return Err(LedgerError::UnmatchedRelease {
                cost,
                reserved: self.reserved,
            });
        }
        self.reserved = self.reserved - cost;
        self.release_calls += 1;
        trace!(%cost, reserved = %self.reserved, "released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservations_reduce_availability_not_the_bank() {
        let mut stockpile = Stockpile::new(Cost::new(300, 100));
        assert!(stockpile.reserve(Cost::new(200, 100)));
        assert_eq!(stockpile.bank(), Cost::new(300, 100));
        assert_eq!(stockpile.available(), Cost::new(100, 0));
        assert!(!stockpile.reserve(Cost::new(50, 25)));
        assert_eq!(stockpile.denials, 1);

        stockpile.release(Cost::new(200, 100)).unwrap();
        assert_eq!(stockpile.available(), Cost::new(300, 100));
        assert!(stockpile.release(Cost::new(1, 0)).is_err());
    }

    #[test]
    fn spending_needs_a_covering_bank() {
        let mut stockpile = Stockpile::new(Cost::new(100, 0));
        assert!(!stockpile.spend(Cost::new(150, 0)));
        assert!(stockpile.spend(Cost::new(100, 0)));
        assert_eq!(stockpile.bank(), Cost::ZERO);
        stockpile.deposit(Cost::new(8, 0));
        assert_eq!(stockpile.bank(), Cost::new(8, 0));
    }
}
