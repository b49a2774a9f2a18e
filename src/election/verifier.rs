// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::collections::HashSet;

use tracing::debug;

use super::ElectionError;
use crate::crypto::{self, CryptoHash};
use crate::data::basics::{Address, FastNumber};
use crate::data::committee::{CommitteeMember, VoteResult, VoteSign};

/// The result of a quorum check. Per-signature resolution is reported even
/// when quorum overall failed, so reward accounting can still credit the
/// members whose signatures were valid.
#[derive(Debug)]
pub struct QuorumOutcome {
    /// Strictly more than two thirds of the committee agreed, each through
    /// a distinct valid member.
    pub accepted: bool,
    /// Number of distinct valid Agree signers.
    pub agreed: usize,
    pub committee_size: usize,
    /// The member each signature resolved to, in input order.
    pub members: Vec<Option<CommitteeMember>>,
    /// The failure for each signature that did not resolve, in input order.
    pub errors: Vec<Option<ElectionError>>,
}

/// Maps each signature to a committee member by recovering its signing key.
/// Failures are recorded per entry; one bad signature never hides the rest.
pub fn resolve_signers(
    signs: &[VoteSign],
    members: &[CommitteeMember],
) -> (Vec<Option<CommitteeMember>>, Vec<Option<ElectionError>>) {
    let mut resolved = Vec::with_capacity(signs.len());
    let mut errors = Vec::with_capacity(signs.len());
    let mut seen: HashSet<Address> = HashSet::new();

    for sign in signs {
        let digest = sign.hash_with_no_sign();
        let pubkey = match crypto::recover_pubkey(&digest, &sign.sign) {
            Ok(pk) => pk,
            Err(err) => {
                debug!("unrecoverable committee signature: {}", err);
                resolved.push(None);
                errors.push(Some(ElectionError::InvalidSign));
                continue;
            }
        };
        let address = match Address::from_pubkey(&pubkey) {
            Ok(a) => a,
            Err(_) => {
                resolved.push(None);
                errors.push(Some(ElectionError::InvalidSign));
                continue;
            }
        };
        match members.iter().find(|m| m.committee_address == address) {
            Some(member) if seen.contains(&address) => {
                debug!("duplicate signature from member {}", member.committee_address);
                resolved.push(None);
                errors.push(Some(ElectionError::RepeatSign));
            }
            Some(member) => {
                seen.insert(address);
                resolved.push(Some(member.clone()));
                errors.push(None);
            }
            None => {
                resolved.push(None);
                errors.push(Some(ElectionError::InvalidMember));
            }
        }
    }

    (resolved, errors)
}

/// Checks whether `signs` carry an agreeing quorum of `members` for the
/// given fast block.
///
/// Hard rejections (no signatures, unresolvable committee, a signature
/// pinned to a different block) return an error; everything past that is
/// reported per signature in the outcome.
pub fn check_quorum(
    signs: &[VoteSign],
    members: &[CommitteeMember],
    fast_height: FastNumber,
    fast_hash: &CryptoHash,
) -> Result<QuorumOutcome, ElectionError> {
    if signs.is_empty() {
        return Err(ElectionError::InvalidSign);
    }
    if members.is_empty() {
        return Err(ElectionError::CommitteeNotFound);
    }
    for sign in signs {
        if sign.fast_height != fast_height || sign.fast_hash != *fast_hash {
            return Err(ElectionError::SignHashMismatch {
                want_height: fast_height,
                got_height: sign.fast_height,
            });
        }
    }

    let (resolved, errors) = resolve_signers(signs, members);
    let agreed = resolved
        .iter()
        .zip(signs)
        .filter(|(member, sign)| member.is_some() && sign.result == VoteResult::Agree)
        .count();

    Ok(QuorumOutcome {
        accepted: 3 * agreed > 2 * members.len(),
        agreed,
        committee_size: members.len(),
        members: resolved,
        errors,
    })
}
