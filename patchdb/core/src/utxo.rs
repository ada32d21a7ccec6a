use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{PatchError, PatchResult};
use crate::{serde_hash, Coins, Hash256, OutputIndex};

/// Per-transaction record of surviving outputs.
///
/// The sparse map holds only indices that are still live. A record with no
/// live indices is a valid value: it represents a fully-spent transaction
/// that stays tracked for conflict detection until purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Utxo {
    #[serde(with = "serde_hash")]
    tx_hash: Hash256,
    outputs: BTreeMap<OutputIndex, Coins>,
}

impl Utxo {
    /// Create an empty record for the given transaction
    pub fn new(tx_hash: Hash256) -> Self {
        Self { tx_hash, outputs: BTreeMap::new() }
    }

    /// Hash of the transaction this record belongs to
    pub fn tx_hash(&self) -> Hash256 {
        self.tx_hash
    }

    /// Live output indices, ascending. Callers must not rely on the order.
    pub fn indexes(&self) -> impl Iterator<Item = OutputIndex> + '_ {
        self.outputs.keys().copied()
    }

    /// Returns true if `index` is live
    pub fn contains(&self, index: OutputIndex) -> bool {
        self.outputs.contains_key(&index)
    }

    /// Coin value at `index`, if live
    pub fn coins_at(&self, index: OutputIndex) -> Option<&Coins> {
        self.outputs.get(&index)
    }

    /// Removes `index` from the live set and returns its coins. Fails when
    /// the index is not live, which includes a repeated spend of the same
    /// output.
    pub fn spend(&mut self, index: OutputIndex) -> PatchResult<Coins> {
        self.outputs.remove(&index).ok_or(PatchError::InvalidIndex)
    }

    /// Inserts a newly created output at `index`. Fails when the index is
    /// already occupied.
    pub fn add(&mut self, index: OutputIndex, coins: Coins) -> PatchResult<()> {
        match self.outputs.entry(index) {
            Entry::Vacant(entry) => {
                entry.insert(coins);
                Ok(())
            }
            Entry::Occupied(_) => Err(PatchError::InvalidIndex),
        }
    }

    /// Record containing only the indices live in both `self` and `other`,
    /// with coin values taken from `self`.
    pub fn intersect(&self, other: &Utxo) -> Utxo {
        Utxo {
            tx_hash: self.tx_hash,
            outputs: self
                .outputs
                .iter()
                .filter(|(index, _)| other.outputs.contains_key(index))
                .map(|(&index, coins)| (index, coins.clone()))
                .collect(),
        }
    }

    /// Number of live outputs
    pub fn live_count(&self) -> usize {
        self.outputs.len()
    }

    /// True when every output has been spent
    pub fn is_fully_spent(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Bytes this record pins in memory, outputs included
    pub fn estimated_bytes(&self) -> usize {
        size_of::<Self>()
            + self.outputs.values().map(|coins| size_of::<OutputIndex>() + coins.estimated_bytes()).sum::<usize>()
    }
}
