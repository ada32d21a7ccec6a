use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inline capacity of a lock script, sized for the common pay-to-pubkey shape.
pub const LOCK_SCRIPT_INLINE_SIZE: usize = 36;

/// Used as the underlying type for lock script data, optimized for the common script size.
pub type LockScript = SmallVec<[u8; LOCK_SCRIPT_INLINE_SIZE]>;

/// Alias the `smallvec!` macro to ease maintenance
pub use smallvec::smallvec as lockvec;

/// Value carried by a single transaction output: the amount plus the script
/// locking it. Opaque to the patch layer and compared structurally.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coins {
    amount: u64,
    lock_script: LockScript,
}

impl Coins {
    pub fn new(amount: u64, lock_script: LockScript) -> Self {
        Self { amount, lock_script }
    }

    pub fn from_vec(amount: u64, lock_script: Vec<u8>) -> Self {
        Self { amount, lock_script: LockScript::from_vec(lock_script) }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn lock_script(&self) -> &[u8] {
        &self.lock_script
    }

    /// Bytes this value pins in memory. The inline script capacity is part
    /// of `size_of::<Self>()`; only a spilled script adds to it.
    pub fn estimated_bytes(&self) -> usize {
        size_of::<Self>() + self.lock_script.len().saturating_sub(LOCK_SCRIPT_INLINE_SIZE)
    }
}

impl fmt::Debug for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coins")
            .field("amount", &self.amount)
            .field("lock_script", &hex::encode(&self.lock_script))
            .finish()
    }
}

//
// Borsh serializers need to be manually implemented for `Coins` since
// smallvec does not currently support Borsh
//

impl BorshSerialize for Coins {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&self.amount, writer)?;
        // Vectors and slices are all serialized internally the same way
        borsh::BorshSerialize::serialize(&self.lock_script.as_slice(), writer)?;
        Ok(())
    }
}

impl BorshDeserialize for Coins {
    fn deserialize(buf: &mut &[u8]) -> std::io::Result<Self> {
        let amount: u64 = BorshDeserialize::deserialize(buf)?;
        let lock_script: Vec<u8> = BorshDeserialize::deserialize(buf)?;
        Ok(Self::from_vec(amount, lock_script))
    }
}
