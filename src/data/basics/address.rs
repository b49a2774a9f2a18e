// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::convert::TryInto;
use std::fmt;

use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

use crate::crypto;

/// Number of bytes in an account address.
pub const ADDRESS_LEN: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressError {
    InvalidHex,
    WrongLength,
}

/// A 20-byte account address, the trailing bytes of the keccak digest of the
/// account's uncompressed public key.
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Derives the address of an uncompressed (65-byte, tagged) secp256k1 public key.
    pub fn from_pubkey(pubkey: &[u8]) -> Result<Self, AddressError> {
        if pubkey.len() != crypto::PUBKEY_LEN {
            return Err(AddressError::WrongLength);
        }
        // the 0x04 tag byte is not part of the hashed material
        let digest = crypto::hash(&pubkey[1..]);
        Ok(Self(
            digest.0[crypto::HASH_LEN - ADDRESS_LEN..].try_into().unwrap(),
        ))
    }

    /// Tries to unmarshal a hex address string, with or without a `0x` prefix.
    pub fn from_str(addr: &str) -> Result<Self, AddressError> {
        let bare = addr.strip_prefix("0x").unwrap_or(addr);
        let decoded = HEXLOWER
            .decode(bare.as_bytes())
            .map_err(|_| AddressError::InvalidHex)?;
        if decoded.len() != ADDRESS_LEN {
            return Err(AddressError::WrongLength);
        }
        Ok(Self(decoded.try_into().unwrap()))
    }

    /// Checks if an address is the zero value.
    pub fn is_zero(&self) -> bool {
        *self == Address([0; ADDRESS_LEN])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", HEXLOWER.encode(&self.0))
    }
}
