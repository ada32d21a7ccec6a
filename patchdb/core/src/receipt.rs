use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Result of executing a single transaction: status word, gas consumed and
/// the opaque return data. Write-once per transaction hash and compared
/// structurally when two patches both carry one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TxReceipt {
    status: u32,
    gas_used: u64,
    #[serde(with = "serde_bytes")]
    return_data: Vec<u8>,
}

impl TxReceipt {
    pub fn new(status: u32, gas_used: u64, return_data: Vec<u8>) -> Self {
        Self { status, gas_used, return_data }
    }

    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    pub fn return_data(&self) -> &[u8] {
        &self.return_data
    }
}
