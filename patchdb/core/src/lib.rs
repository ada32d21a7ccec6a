pub mod address;
pub mod coins;
pub mod contract;
pub mod errors;
pub mod receipt;
pub mod utxo;

pub use address::Address;
pub use coins::{lockvec, Coins, LockScript, LOCK_SCRIPT_INLINE_SIZE};
pub use contract::Contract;
pub use errors::{PatchError, PatchResult};
pub use receipt::TxReceipt;
pub use utxo::Utxo;

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Number of bytes in a transaction identifier.
pub const HASH_SIZE: usize = 32;

/// Identifier of a witness group. Contracts are partitioned by group;
/// across groups there is no ordering between patches.
pub type GroupId = u32;

/// Monotonic per-group counter ordering sibling patches within a group.
pub type GroupLevel = u32;

/// Position of an output within its transaction.
pub type OutputIndex = u32;

/// A 32-byte transaction identifier, held canonically as its byte array.
///
/// Callers hold hashes either as raw bytes or as hex strings; both forms
/// are accepted once at construction ([`Hash256::try_from_slice`] and
/// [`Hash256::from_hex`]) and everything past the boundary works on the
/// canonical form. Hex output is always lowercase, whatever case came in.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Hash256([u8; HASH_SIZE]);

impl Hash256 {
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Accepts exactly `HASH_SIZE` raw bytes
    pub fn try_from_slice(slice: &[u8]) -> PatchResult<Self> {
        let array: [u8; HASH_SIZE] = slice.try_into().map_err(|_| PatchError::BadHash)?;
        Ok(Self(array))
    }

    /// Accepts a 64-character hex string of either case
    pub fn from_hex(hex_str: &str) -> PatchResult<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(PatchError::BadHash);
        }
        let mut bytes = [0u8; HASH_SIZE];
        faster_hex::hex_decode(hex_str.as_bytes(), &mut bytes).map_err(|_| PatchError::BadHash)?;
        Ok(Self(bytes))
    }

    /// Canonical lowercase-hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for Hash256 {
    type Error = PatchError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Self::try_from_slice(slice)
    }
}

impl FromStr for Hash256 {
    type Err = PatchError;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        Self::from_hex(hex_str)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash256").field(&self.to_hex()).finish()
    }
}

/// Serde adapter for `Hash256` struct fields: serializes the raw 32 bytes
/// and re-validates the length on the way back in, so a truncated stream
/// surfaces as a serde error.
pub mod serde_hash {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::Hash256;

    pub fn serialize<S>(hash: &Hash256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(hash.as_bytes())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Hash256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Hash256::try_from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}
