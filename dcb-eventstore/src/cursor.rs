//! A [`Cursor`] identifies a point in the total order of committed events.
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// `(transaction_id, position)`, identifying a unique point in the global event order.
///
/// Ordering follows §3: `(tx_a, pos_a) < (tx_b, pos_b) ⇔ tx_a < tx_b ∨ (tx_a = tx_b ∧ pos_a <
/// pos_b)`. Position alone is never a total order across transactions — always compare
/// cursors, never positions in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor {
    transaction_id: u64,
    position: i64,
}

impl Cursor {
    /// Creates a new cursor. `transaction_id` and `position` are both required to be
    /// strictly positive by the data model (§3); this constructor does not itself enforce
    /// that invariant since cursors are also used to represent `0`/sentinel origins for
    /// unconditional reads, see [`Cursor::origin`].
    pub fn new(transaction_id: u64, position: i64) -> Self {
        Self {
            transaction_id,
            position,
        }
    }

    /// The sentinel cursor that precedes every real event, used as the default "from the
    /// beginning" starting point for reads and projections.
    pub const fn origin() -> Self {
        Self {
            transaction_id: 0,
            position: 0,
        }
    }

    pub fn transaction_id(&self) -> u64 {
        self.transaction_id
    }

    pub fn position(&self) -> i64 {
        self.position
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_transaction_then_position() {
        let a = Cursor::new(1, 5);
        let b = Cursor::new(1, 6);
        let c = Cursor::new(2, 1);
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }

    #[test]
    fn origin_precedes_any_real_cursor() {
        assert!(Cursor::origin() < Cursor::new(1, 1));
    }
}
