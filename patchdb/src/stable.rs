use std::collections::HashMap;

use log::{debug, warn};
use patchdb_core::{Hash256, PatchError, PatchResult, Utxo};

use crate::patch::Patch;

/// Read-only view of the durably-committed baseline, as far as the patch
/// layer needs to see it. Implementations must not mutate under a live
/// borrow; higher layers hold the baseline read lock between enumerating
/// UTXOs and applying the resulting patch to storage.
pub trait StableView {
    /// The baseline UTXO record for `tx_hash`, if the transaction is known
    fn utxo(&self, tx_hash: &Hash256) -> Option<&Utxo>;
}

impl StableView for Patch {
    fn utxo(&self, tx_hash: &Hash256) -> Option<&Utxo> {
        self.get_utxo(tx_hash)
    }
}

/// The simplest baseline: an in-memory map keyed by transaction hash
impl StableView for HashMap<Hash256, Utxo> {
    fn utxo(&self, tx_hash: &Hash256) -> Option<&Utxo> {
        self.get(tx_hash)
    }
}

impl Patch {
    /// Drops every entity that is identical in `stable`, keeping entries
    /// this patch has diverged on.
    ///
    /// Called after the block behind `stable` has been applied to durable
    /// storage, so still-speculative descendants stop carrying material
    /// that is now part of the baseline. A UTXO record goes away only when
    /// both its live set and its spent-output sub-map match the stable
    /// side exactly; contract state goes away on bytewise-equal payloads;
    /// receipts go away whenever the stable side carries the hash.
    pub fn purge(&mut self, stable: &Patch) {
        let before = self.coins.len();

        for (tx_hash, stable_utxo) in stable.coins.iter() {
            let identical = match self.coins.get(tx_hash) {
                Some(ours) => *ours == *stable_utxo && self.spent.get(tx_hash) == stable.spent.get(tx_hash),
                None => false,
            };
            if identical {
                self.coins.remove(tx_hash);
                self.spent.remove(tx_hash);
            }
        }

        for (address, stable_contract) in stable.contracts.iter() {
            let unchanged = self
                .contracts
                .get(address)
                .map(|ours| ours.data_buffer() == stable_contract.data_buffer())
                .unwrap_or(false);
            if unchanged {
                self.contracts.remove(address);
            }
        }

        // Receipts are write-once: a matching hash means a matching receipt.
        for tx_hash in stable.receipts.keys() {
            self.receipts.remove(tx_hash);
        }

        debug!("purged {} of {} utxo records against the stable layer", before - self.coins.len(), before);
    }

    /// Cross-checks this patch's spends against the durable baseline.
    ///
    /// A transaction hash unknown to the baseline is still pending in an
    /// ancestor patch and is validated later. For every known hash, each
    /// index this patch recorded as spent must still be live in the
    /// baseline record; a dead index means the spend conflicts with
    /// durably-committed history. Read-only on both sides.
    pub fn validate_against_stable<V: StableView>(&self, stable: &V) -> PatchResult<()> {
        for tx_hash in self.coins.keys() {
            let baseline = match stable.utxo(tx_hash) {
                Some(utxo) => utxo,
                None => continue,
            };
            if let Some(spent) = self.spent.get(tx_hash) {
                for &index in spent.keys() {
                    if !baseline.contains(index) {
                        warn!("spend of {}:{} conflicts with the stable baseline", tx_hash, index);
                        return Err(PatchError::StaleSpend { tx_hash: *tx_hash, index });
                    }
                }
            }
        }
        Ok(())
    }
}
