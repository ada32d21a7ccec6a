use log::{debug, warn};
use patchdb_core::{PatchError, PatchResult};

use crate::patch::Patch;

impl Patch {
    /// Combines two patches into a fresh one describing the joint effect of
    /// both execution paths.
    ///
    /// The result is bound to no group but carries the per-group maximum of
    /// both inputs' levels. Outputs spent on either side stay spent; an
    /// output spent on both sides must name the same spending transaction,
    /// otherwise the merge fails with `DoubleSpend`. Contract state at the
    /// same address must belong to the same witness group on both sides,
    /// and the side with the higher group level wins (ties resolve to
    /// `self`). Receipts present on both sides must be structurally equal.
    ///
    /// Neither input is mutated; merging is a pure function of the two
    /// patches, associative and commutative up to the contract tie-break.
    pub fn merge(&self, other: &Patch) -> PatchResult<Patch> {
        let mut merged = Patch::new();

        // Group levels: per-group maximum of both sides.
        for (&group_id, &level) in self.group_levels.iter().chain(other.group_levels.iter()) {
            let entry = merged.group_levels.entry(group_id).or_insert(0);
            if level > *entry {
                *entry = level;
            }
        }

        self.merge_coins(other, &mut merged)?;
        self.merge_contracts(other, &mut merged)?;
        self.merge_receipts(other, &mut merged)?;

        debug!(
            "merged patches: {} utxo records, {} spent outputs, {} contracts, {} receipts",
            merged.coins.len(),
            merged.complexity(),
            merged.contracts.len(),
            merged.receipts.len()
        );
        Ok(merged)
    }

    fn merge_coins(&self, other: &Patch, merged: &mut Patch) -> PatchResult<()> {
        // An index live on both sides was spent by neither and carries over.
        // An index live on one side only was spent by the other side within
        // this merge window and is dropped; its spending evidence, if any,
        // stays in the spent-output index below.
        for (tx_hash, ours) in self.coins.iter() {
            let surviving = match other.coins.get(tx_hash) {
                Some(theirs) => ours.intersect(theirs),
                None => ours.clone(),
            };
            merged.coins.insert(*tx_hash, surviving);
        }
        for (tx_hash, theirs) in other.coins.iter() {
            if !self.coins.contains_key(tx_hash) {
                merged.coins.insert(*tx_hash, theirs.clone());
            }
        }

        // Spent-output index: union of both sides. An output spent on both
        // sides must have been consumed by the same transaction.
        for (tx_hash, ours) in self.spent.iter() {
            let mut combined = ours.clone();
            if let Some(theirs) = other.spent.get(tx_hash) {
                for (&index, spender) in theirs.iter() {
                    match combined.get(&index) {
                        Some(existing) if existing != spender => {
                            warn!("conflicting spends of {}:{} by {} and {}", tx_hash, index, existing, spender);
                            return Err(PatchError::DoubleSpend { tx_hash: *tx_hash, index });
                        }
                        _ => {
                            combined.insert(index, *spender);
                        }
                    }
                }
            }
            merged.spent.insert(*tx_hash, combined);
        }
        for (tx_hash, theirs) in other.spent.iter() {
            if !self.spent.contains_key(tx_hash) {
                merged.spent.insert(*tx_hash, theirs.clone());
            }
        }
        Ok(())
    }

    fn merge_contracts(&self, other: &Patch, merged: &mut Patch) -> PatchResult<()> {
        for (address, ours) in self.contracts.iter() {
            let winner = match other.contracts.get(address) {
                Some(theirs) => {
                    // Contracts are partitioned by witness group; the same
                    // address appearing under two groups has no resolution.
                    if ours.group_id() != theirs.group_id() {
                        warn!(
                            "contract {} bound to witness groups {} and {}",
                            address,
                            ours.group_id(),
                            theirs.group_id()
                        );
                        return Err(PatchError::ContractGroupMismatch { address: address.clone() });
                    }
                    // Within a group the sibling with the higher level
                    // carries the fresher state.
                    if other.level_of(theirs.group_id()) > self.level_of(ours.group_id()) {
                        theirs
                    } else {
                        ours
                    }
                }
                None => ours,
            };
            merged.contracts.insert(address.clone(), winner.replicate()?);
        }
        for (address, theirs) in other.contracts.iter() {
            if !self.contracts.contains_key(address) {
                merged.contracts.insert(address.clone(), theirs.replicate()?);
            }
        }
        Ok(())
    }

    fn merge_receipts(&self, other: &Patch, merged: &mut Patch) -> PatchResult<()> {
        for (tx_hash, ours) in self.receipts.iter() {
            if let Some(theirs) = other.receipts.get(tx_hash) {
                if ours != theirs {
                    warn!("conflicting receipts for transaction {}", tx_hash);
                    return Err(PatchError::ReceiptCollision { tx_hash: *tx_hash });
                }
            }
            merged.receipts.insert(*tx_hash, ours.clone());
        }
        for (tx_hash, theirs) in other.receipts.iter() {
            if !self.receipts.contains_key(tx_hash) {
                merged.receipts.insert(*tx_hash, theirs.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchdb_core::{Address, Coins, Contract, Hash256, TxReceipt, Utxo};
    use std::str::FromStr;

    fn hash(hex_str: &str) -> Hash256 {
        Hash256::from_str(hex_str).unwrap()
    }

    fn coins(amount: u64) -> Coins {
        Coins::from_vec(amount, vec![0xac])
    }

    const TX_H: &str = "1111111111111111111111111111111111111111111111111111111111111111";
    const TX_S1: &str = "2222222222222222222222222222222222222222222222222222222222222222";
    const TX_S2: &str = "3333333333333333333333333333333333333333333333333333333333333333";

    fn snapshot_with_indices(indices: &[u32]) -> Utxo {
        let mut utxo = Utxo::new(hash(TX_H));
        for &index in indices {
            utxo.add(index, coins(10 + index as u64)).unwrap();
        }
        utxo
    }

    fn contract_with_data(address: &Address, group_id: u32, data: &[u8]) -> Contract {
        let mut contract = Contract::new(address.clone(), group_id);
        contract.update_data(data.to_vec());
        contract
    }

    #[test]
    fn double_spend_across_branches_is_detected() {
        let snapshot = snapshot_with_indices(&[0, 1]);

        let mut left = Patch::new();
        left.spend_coins(&snapshot, 0, hash(TX_S1)).unwrap();
        let mut right = Patch::new();
        right.spend_coins(&snapshot, 0, hash(TX_S2)).unwrap();

        assert_eq!(left.merge(&right), Err(PatchError::DoubleSpend { tx_hash: hash(TX_H), index: 0 }));
        assert_eq!(right.merge(&left), Err(PatchError::DoubleSpend { tx_hash: hash(TX_H), index: 0 }));
    }

    #[test]
    fn same_spender_on_both_sides_is_compatible() {
        let snapshot = snapshot_with_indices(&[0, 1]);

        let mut left = Patch::new();
        left.spend_coins(&snapshot, 0, hash(TX_S1)).unwrap();
        let mut right = Patch::new();
        right.spend_coins(&snapshot, 0, hash(TX_S1)).unwrap();

        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.spenders_of(&hash(TX_H)).unwrap()[&0], hash(TX_S1));
        assert_eq!(merged.complexity(), 1);
    }

    #[test]
    fn disjoint_spends_union_and_drop_both_indices() {
        let snapshot = snapshot_with_indices(&[0, 1, 2]);

        let mut left = Patch::new();
        left.spend_coins(&snapshot, 0, hash(TX_S1)).unwrap();
        let mut right = Patch::new();
        right.spend_coins(&snapshot, 1, hash(TX_S2)).unwrap();

        let merged = left.merge(&right).unwrap();
        let utxo = merged.get_utxo(&hash(TX_H)).unwrap();
        assert_eq!(utxo.indexes().collect::<Vec<_>>(), vec![2]);

        let spent = merged.spenders_of(&hash(TX_H)).unwrap();
        assert_eq!(spent[&0], hash(TX_S1));
        assert_eq!(spent[&1], hash(TX_S2));
        assert_eq!(merged.complexity(), 2);
    }

    #[test]
    fn index_loss_rule_is_an_intersection() {
        let snapshot = snapshot_with_indices(&[0, 1, 2, 3]);

        let mut left = Patch::new();
        left.spend_coins(&snapshot, 0, hash(TX_S1)).unwrap();
        left.spend_coins(&snapshot, 1, hash(TX_S1)).unwrap();
        let mut right = Patch::new();
        right.spend_coins(&snapshot, 2, hash(TX_S2)).unwrap();

        let merged = left.merge(&right).unwrap();
        let survivors: Vec<u32> = merged.get_utxo(&hash(TX_H)).unwrap().indexes().collect();
        // an index survives iff it is live on both sides
        assert_eq!(survivors, vec![3]);
    }

    #[test]
    fn one_sided_entries_copy_through() {
        let snapshot = snapshot_with_indices(&[0]);

        let mut left = Patch::new();
        left.spend_coins(&snapshot, 0, hash(TX_S1)).unwrap();
        left.create_coins(hash(TX_S1), 0, coins(99)).unwrap();
        left.set_receipt(hash(TX_S1), TxReceipt::new(1, 21_000, vec![]));

        let right = Patch::new();

        let merged = left.merge(&right).unwrap();
        assert_eq!(merged, left);
        assert_eq!(merged.group_id(), None);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let snapshot = snapshot_with_indices(&[0, 1]);
        let address = Address::from_hex("c0ffee").unwrap();

        let mut patch = Patch::with_group(4);
        patch.spend_coins(&snapshot, 1, hash(TX_S1)).unwrap();
        patch.set_contract(contract_with_data(&address, 4, b"state"));
        patch.set_receipt(hash(TX_S1), TxReceipt::new(1, 500, vec![7]));

        let empty = Patch::new();
        assert_eq!(patch.merge(&empty).unwrap(), patch);
        assert_eq!(empty.merge(&patch).unwrap(), patch);
    }

    #[test]
    fn merge_is_commutative_without_level_ties() {
        let snapshot = snapshot_with_indices(&[0, 1, 2]);
        let address = Address::from_hex("c0ffee").unwrap();

        let mut left = Patch::with_group(7);
        left.spend_coins(&snapshot, 0, hash(TX_S1)).unwrap();
        left.set_contract(contract_with_data(&address, 7, b"older"));

        // right sits one level above left, as a successor patch of group 7
        let mut right = Patch::new();
        right.group_levels.insert(7, 1);
        right.set_group_id(7).unwrap();
        right.spend_coins(&snapshot, 1, hash(TX_S2)).unwrap();
        right.set_contract(contract_with_data(&address, 7, b"newer"));

        let forward = left.merge(&right).unwrap();
        let backward = right.merge(&left).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.get_contract(&address).unwrap().data_buffer(), b"newer");
    }

    #[test]
    fn contract_tie_break_prefers_higher_level() {
        let address = Address::from_hex("0abc").unwrap();

        // level 2 on the left
        let mut left = Patch::new();
        left.group_levels.insert(7, 1);
        left.set_group_id(7).unwrap();
        left.set_contract(contract_with_data(&address, 7, b"A"));
        assert_eq!(left.level().unwrap(), 2);

        // level 3 on the right
        let mut right = Patch::new();
        right.group_levels.insert(7, 2);
        right.set_group_id(7).unwrap();
        right.set_contract(contract_with_data(&address, 7, b"B"));
        assert_eq!(right.level().unwrap(), 3);

        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.get_contract(&address).unwrap().data_buffer(), b"B");

        // winner is independent of argument order
        let merged = right.merge(&left).unwrap();
        assert_eq!(merged.get_contract(&address).unwrap().data_buffer(), b"B");
    }

    #[test]
    fn contracts_from_different_groups_do_not_merge() {
        let address = Address::from_hex("0abc").unwrap();

        let mut left = Patch::with_group(1);
        left.set_contract(contract_with_data(&address, 1, b"A"));
        let mut right = Patch::with_group(2);
        right.set_contract(contract_with_data(&address, 2, b"B"));

        assert_eq!(left.merge(&right), Err(PatchError::ContractGroupMismatch { address }));
    }

    #[test]
    fn receipts_must_agree_when_present_on_both_sides() {
        let mut left = Patch::new();
        left.set_receipt(hash(TX_S1), TxReceipt::new(1, 100, vec![]));
        let mut right = Patch::new();
        right.set_receipt(hash(TX_S1), TxReceipt::new(0, 100, vec![]));

        assert_eq!(left.merge(&right), Err(PatchError::ReceiptCollision { tx_hash: hash(TX_S1) }));

        let mut agreeing = Patch::new();
        agreeing.set_receipt(hash(TX_S1), TxReceipt::new(1, 100, vec![]));
        let merged = left.merge(&agreeing).unwrap();
        assert_eq!(merged.get_receipt(&hash(TX_S1)).unwrap().status(), 1);
    }

    #[test]
    fn merged_levels_take_the_maximum() {
        let mut left = Patch::with_group(1);
        left.group_levels.insert(2, 5);
        let mut right = Patch::with_group(2);
        right.group_levels.insert(2, 3);
        right.group_levels.insert(8, 1);

        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.group_id(), None);
        assert_eq!(merged.level_of(1), 1);
        assert_eq!(merged.level_of(2), 5);
        assert_eq!(merged.level_of(8), 1);
    }

    #[test]
    fn binding_a_merged_patch_resumes_from_the_unioned_max() {
        let mut left = Patch::new();
        left.group_levels.insert(7, 4);
        let mut right = Patch::new();
        right.group_levels.insert(7, 2);

        let mut merged = left.merge(&right).unwrap();
        merged.set_group_id(7).unwrap();
        assert_eq!(merged.level().unwrap(), 5);
    }
}
