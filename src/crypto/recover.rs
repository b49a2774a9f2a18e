// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use thiserror::Error;

use super::hashable::CryptoHash;

/// Length of a recoverable signature: 64 bytes `r || s` plus one recovery byte.
pub const SIGN_LEN: usize = 65;

/// Length of an uncompressed secp256k1 public key (with the 0x04 tag byte).
pub const PUBKEY_LEN: usize = 65;

#[derive(Error, Debug)]
pub enum RecoverError {
    #[error("wrong length for signature: `{0}`")]
    WrongLength(usize),
    #[error("invalid recovery id: `{0}`")]
    InvalidRecoveryId(u8),
    #[error("malformed signature")]
    Malformed(#[from] k256::ecdsa::Error),
}

/// Recovers the uncompressed public key which produced `sign` over the given digest.
pub fn recover_pubkey(digest: &CryptoHash, sign: &[u8]) -> Result<Vec<u8>, RecoverError> {
    if sign.len() != SIGN_LEN {
        return Err(RecoverError::WrongLength(sign.len()));
    }
    let sig = Signature::from_slice(&sign[..64])?;
    let rec_id =
        RecoveryId::from_byte(sign[64]).ok_or(RecoverError::InvalidRecoveryId(sign[64]))?;
    let key = VerifyingKey::recover_from_prehash(&digest.0, &sig, rec_id)?;
    Ok(key.to_encoded_point(false).as_bytes().to_vec())
}

/// Signs the given digest, producing the 65-byte recoverable form consumed by `recover_pubkey`.
pub fn sign_digest(secret: &SigningKey, digest: &CryptoHash) -> Result<Vec<u8>, RecoverError> {
    let (sig, rec_id) = secret.sign_prehash_recoverable(&digest.0)?;
    let mut out = Vec::with_capacity(SIGN_LEN);
    out.extend_from_slice(&sig.to_bytes());
    out.push(rec_id.to_byte());
    Ok(out)
}
