use std::collections::hash_map::Entry;
use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};
use patchdb_core::{
    Address, Coins, Contract, GroupId, GroupLevel, Hash256, OutputIndex, PatchError, PatchResult, TxReceipt, Utxo,
};
use serde::{Deserialize, Serialize};

/// Maps an output index to the hash of the transaction that consumed it.
pub type SpentOutputs = HashMap<OutputIndex, Hash256>;

/// An in-memory delta over the durable baseline: the effect of executing
/// one or more blocks, held apart from storage until the chain commits to
/// it.
///
/// A patch is a plain value with no interior mutability. It is owned by
/// exactly one executor context at a time and can be shipped between tasks
/// freely. The multi-patch operations live in sibling modules: combining
/// two patches ([`Patch::merge`]), dropping material that became stable
/// ([`Patch::purge`]) and cross-checking spends against the baseline
/// ([`Patch::validate_against_stable`]).
///
/// Iteration order of every accessor is unspecified.
#[derive(Debug, Default, Clone, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Patch {
    pub(crate) group_id: Option<GroupId>,
    pub(crate) group_levels: HashMap<GroupId, GroupLevel>,
    pub(crate) coins: HashMap<Hash256, Utxo>,
    pub(crate) spent: HashMap<Hash256, SpentOutputs>,
    pub(crate) contracts: HashMap<Address, Contract>,
    pub(crate) receipts: HashMap<Hash256, TxReceipt>,
}

// Equality is over patch content. The group binding is transient
// bookkeeping: two patches differing only in it describe the same delta.
impl PartialEq for Patch {
    fn eq(&self, other: &Self) -> bool {
        self.group_levels == other.group_levels
            && self.coins == other.coins
            && self.spent == other.spent
            && self.contracts == other.contracts
            && self.receipts == other.receipts
    }
}

impl Eq for Patch {}

impl Patch {
    /// Create a new empty patch bound to no group
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty patch already bound to `group_id`
    pub fn with_group(group_id: GroupId) -> Self {
        let mut patch = Self::default();
        patch.set_group_id(group_id).expect("a fresh patch has no binding");
        patch
    }

    /// Binds the patch to a witness group. Allowed exactly once per patch.
    /// Binding bumps the group's level, so successive patches of the same
    /// group are ordered monotonically; a merged patch starts unbound but
    /// keeps the unioned levels, and a later binding bumps from that
    /// maximum.
    pub fn set_group_id(&mut self, group_id: GroupId) -> PatchResult<()> {
        if self.group_id.is_some() {
            return Err(PatchError::AlreadyBound);
        }
        self.group_id = Some(group_id);
        *self.group_levels.entry(group_id).or_insert(0) += 1;
        Ok(())
    }

    /// Group this patch is bound to, if any
    pub fn group_id(&self) -> Option<GroupId> {
        self.group_id
    }

    /// Level recorded for `group_id`; 0 when the group was never seen
    pub fn level_of(&self, group_id: GroupId) -> GroupLevel {
        self.group_levels.get(&group_id).copied().unwrap_or(0)
    }

    /// Level of the bound group. Fails when the patch is unbound.
    pub fn level(&self) -> PatchResult<GroupLevel> {
        let group_id = self.group_id.ok_or(PatchError::GroupNotSet)?;
        Ok(self.level_of(group_id))
    }

    /// Records the spend of output `index` of the transaction described by
    /// `snapshot`, performed by the transaction `spender`.
    ///
    /// `snapshot` is the UTXO as it appeared before this spend, taken from
    /// a preceding patch layer or from the stable baseline. The first spend
    /// of a transaction installs a private copy of the snapshot; later
    /// spends mutate that copy, so a second spend of the same index fails
    /// with `InvalidIndex` and signals a double-spend within this patch.
    pub fn spend_coins(&mut self, snapshot: &Utxo, index: OutputIndex, spender: Hash256) -> PatchResult<()> {
        let tx_hash = snapshot.tx_hash();
        match self.coins.entry(tx_hash) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().spend(index)?;
            }
            Entry::Vacant(entry) => {
                let mut local = snapshot.clone();
                local.spend(index)?;
                entry.insert(local);
            }
        }
        self.spent.entry(tx_hash).or_default().insert(index, spender);
        Ok(())
    }

    /// Records a newly created output. Fails with `InvalidIndex` when this
    /// patch already tracks an output at the same index.
    pub fn create_coins(&mut self, tx_hash: Hash256, index: OutputIndex, coins: Coins) -> PatchResult<()> {
        self.coins.entry(tx_hash).or_insert_with(|| Utxo::new(tx_hash)).add(index, coins)
    }

    /// Installs a copy of `utxo`, replacing any in-patch record (block-load path)
    pub fn set_utxo(&mut self, utxo: &Utxo) {
        self.coins.insert(utxo.tx_hash(), utxo.clone());
    }

    /// In-patch UTXO record for `tx_hash`, if tracked
    pub fn get_utxo(&self, tx_hash: &Hash256) -> Option<&Utxo> {
        self.coins.get(tx_hash)
    }

    /// Iterator over all tracked `(tx_hash, UTXO)` pairs
    pub fn get_coins(&self) -> impl Iterator<Item = (&Hash256, &Utxo)> {
        self.coins.iter()
    }

    /// Spend evidence recorded for `tx_hash`: which transaction consumed
    /// each spent index
    pub fn spenders_of(&self, tx_hash: &Hash256) -> Option<&SpentOutputs> {
        self.spent.get(tx_hash)
    }

    /// Installs contract state, replacing any prior state at its address
    pub fn set_contract(&mut self, contract: Contract) {
        self.contracts.insert(contract.address().clone(), contract);
    }

    pub fn get_contract(&self, address: &Address) -> Option<&Contract> {
        self.contracts.get(address)
    }

    pub fn get_contracts(&self) -> impl Iterator<Item = (&Address, &Contract)> {
        self.contracts.iter()
    }

    /// Installs the execution receipt for `tx_hash`
    pub fn set_receipt(&mut self, tx_hash: Hash256, receipt: TxReceipt) {
        self.receipts.insert(tx_hash, receipt);
    }

    pub fn get_receipt(&self, tx_hash: &Hash256) -> Option<&TxReceipt> {
        self.receipts.get(tx_hash)
    }

    pub fn get_receipts(&self) -> impl Iterator<Item = (&Hash256, &TxReceipt)> {
        self.receipts.iter()
    }

    /// Total number of spent outputs recorded in this patch. Among
    /// otherwise-equivalent candidate patches the block selection layer
    /// keeps the one with higher complexity.
    pub fn complexity(&self) -> usize {
        self.spent.values().map(|spent| spent.len()).sum()
    }

    /// True when the patch carries no delta at all
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
            && self.spent.is_empty()
            && self.contracts.is_empty()
            && self.receipts.is_empty()
            && self.group_levels.is_empty()
    }

    /// Bytes of speculative state this patch pins in memory. The block
    /// manager sums these across in-flight patches to decide when a branch
    /// must be purged or abandoned.
    pub fn estimated_bytes(&self) -> usize {
        size_of::<Self>()
            + self
                .coins
                .values()
                .map(|utxo| size_of::<Hash256>() + utxo.estimated_bytes())
                .sum::<usize>()
            + self
                .spent
                .values()
                .map(|spent| size_of::<Hash256>() + spent.len() * size_of::<(OutputIndex, Hash256)>())
                .sum::<usize>()
            + self
                .contracts
                .values()
                .map(|contract| contract.estimated_bytes())
                .sum::<usize>()
            + self
                .receipts
                .values()
                .map(|receipt| size_of::<(Hash256, TxReceipt)>() + receipt.return_data().len())
                .sum::<usize>()
    }
}
