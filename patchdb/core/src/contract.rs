use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::errors::{PatchError, PatchResult};
use crate::GroupId;

/// Speculative state of a contract inside a patch.
///
/// The stored address is not part of the encoded payload; it is carried by
/// the owning map and reattached when decoding. Contract state may be
/// touched from multiple forks of the same witness group; the group level
/// of the owning patch decides which version survives a merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Contract {
    address: Address,
    group_id: GroupId,
    #[serde(with = "serde_bytes")]
    data_buffer: Vec<u8>,
}

/// Payload record as it travels through `encode`/`decode`
#[derive(BorshSerialize, BorshDeserialize)]
struct ContractPayload {
    group_id: GroupId,
    data_buffer: Vec<u8>,
}

impl Contract {
    /// Fresh contract with an empty state payload
    pub fn new(address: Address, group_id: GroupId) -> Self {
        Self { address, group_id, data_buffer: Vec::new() }
    }

    /// Reconstructs a contract from its encoded payload against the given
    /// stored address.
    pub fn decode(bytes: &[u8], address: Address) -> PatchResult<Self> {
        let payload =
            ContractPayload::try_from_slice(bytes).map_err(|e| PatchError::CorruptContract(e.to_string()))?;
        Ok(Self { address, group_id: payload.group_id, data_buffer: payload.data_buffer })
    }

    /// Encodes the payload (group id and state buffer, not the address)
    pub fn encode(&self) -> Vec<u8> {
        ContractPayload { group_id: self.group_id, data_buffer: self.data_buffer.clone() }
            .try_to_vec()
            .expect("borsh write to an in-memory buffer is infallible")
    }

    /// Fresh copy produced by re-encoding and decoding against the same
    /// stored address, as done when a contract crosses into a merged patch.
    pub fn replicate(&self) -> PatchResult<Self> {
        Self::decode(&self.encode(), self.address.clone())
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn data_buffer(&self) -> &[u8] {
        &self.data_buffer
    }

    /// Replaces the state payload
    pub fn update_data(&mut self, new_data: Vec<u8>) {
        self.data_buffer = new_data;
    }

    /// Bytes this state pins in memory, address and payload included
    pub fn estimated_bytes(&self) -> usize {
        size_of::<Self>() + self.address.as_bytes().len() + self.data_buffer.len()
    }
}
