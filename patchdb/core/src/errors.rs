use thiserror::Error;

use crate::{Address, Hash256, OutputIndex};

/// Errors surfaced by the patch layer. None are recovered internally.
/// `DoubleSpend`, `StaleSpend` and `ReceiptCollision` are consensus-relevant
/// and must cause the caller to reject the offending block; the remaining
/// kinds indicate programming errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Malformed transaction hash")]
    BadHash,

    #[error("Malformed contract address")]
    BadAddress,

    #[error("Invalid output index")]
    InvalidIndex,

    #[error("Patch is already bound to a witness group")]
    AlreadyBound,

    #[error("Conflicting spends of output {index} of transaction {tx_hash}")]
    DoubleSpend { tx_hash: Hash256, index: OutputIndex },

    #[error("Contract {address} is bound to different witness groups")]
    ContractGroupMismatch { address: Address },

    #[error("Conflicting receipts for transaction {tx_hash}")]
    ReceiptCollision { tx_hash: Hash256 },

    #[error("Output {index} of transaction {tx_hash} is not live in the stable baseline")]
    StaleSpend { tx_hash: Hash256, index: OutputIndex },

    #[error("No witness group bound to this patch")]
    GroupNotSet,

    #[error("Contract payload failed to decode: {0}")]
    CorruptContract(String),
}

pub type PatchResult<T> = Result<T, PatchError>;
