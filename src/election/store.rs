// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use tracing::warn;

use crate::data::basics::FastNumber;
use crate::protocol;

const TREE_NAME: &str = "switches";

/// Persists, per committee id, the ordered list of fast numbers at which
/// membership changed. The log is rewritten wholesale on every mutation;
/// it is a session cache, not the source of truth — the same list can
/// always be re-derived by replaying chain history.
pub struct SwitchStore {
    tree: sled::Tree,
}

impl SwitchStore {
    pub fn open(db: &sled::Db) -> sled::Result<Self> {
        Ok(Self {
            tree: db.open_tree(TREE_NAME)?,
        })
    }

    /// Reads the switch log for a committee. Unknown ids and undecodable
    /// entries both read back as an empty log.
    pub fn read(&self, id: u64) -> Vec<FastNumber> {
        match self.tree.get(id.to_be_bytes()) {
            Ok(Some(raw)) => match protocol::decode(&raw) {
                Ok(switches) => switches,
                Err(err) => {
                    warn!("undecodable switch log for committee {}: {}", id, err);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("failed to read switch log for committee {}: {}", id, err);
                Vec::new()
            }
        }
    }

    /// Rewrites the whole switch log for a committee.
    pub fn write(&self, id: u64, switches: &[FastNumber]) -> sled::Result<()> {
        self.tree
            .insert(id.to_be_bytes(), protocol::encode(&switches))?;
        Ok(())
    }
}
