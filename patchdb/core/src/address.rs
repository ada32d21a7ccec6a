use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{PatchError, PatchResult};

/// Stored address of a contract. Opaque to the patch layer: addresses are
/// minted elsewhere and used here only as map keys. Accepted as raw bytes
/// or hex of either case; held canonically as bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Address(Vec<u8>);

impl Address {
    pub fn from_bytes(bytes: Vec<u8>) -> PatchResult<Self> {
        if bytes.is_empty() {
            return Err(PatchError::BadAddress);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_hex(hex_str: &str) -> PatchResult<Self> {
        if hex_str.is_empty() || hex_str.len() % 2 != 0 {
            return Err(PatchError::BadAddress);
        }
        let mut bytes = vec![0u8; hex_str.len() / 2];
        faster_hex::hex_decode(hex_str.as_bytes(), bytes.as_mut_slice()).map_err(|_| PatchError::BadAddress)?;
        Ok(Self(bytes))
    }
}

impl FromStr for Address {
    type Err = PatchError;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        Self::from_hex(hex_str)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Address").field(&hex::encode(&self.0)).finish()
    }
}
