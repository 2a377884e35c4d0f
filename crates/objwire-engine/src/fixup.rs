//! The fixup ledger: assignments deferred until their target id exists.

use std::collections::HashMap;

use objwire_core::graph::NodeId;

/// Where a deferred value goes within its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Member(String),
    /// Row-major cell position.
    Cell(usize),
}

#[derive(Debug, Default)]
pub struct FixupLedger {
    by_target: HashMap<i32, Vec<(NodeId, Slot)>>,
    by_owner: HashMap<NodeId, usize>,
}

impl FixupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, owner: NodeId, slot: Slot, target: i32) {
        log::debug!("fixup recorded: {owner} {slot:?} -> #{target}");
        self.by_target.entry(target).or_default().push((owner, slot));
        *self.by_owner.entry(owner).or_default() += 1;
    }

    /// Remove and return every entry waiting on `target`.
    pub fn drain(&mut self, target: i32) -> Vec<(NodeId, Slot)> {
        let entries = self.by_target.remove(&target).unwrap_or_default();
        for (owner, _) in &entries {
            if let Some(count) = self.by_owner.get_mut(owner) {
                *count -= 1;
                if *count == 0 {
                    self.by_owner.remove(owner);
                }
            }
        }
        if !entries.is_empty() {
            log::debug!("replaying {} fixup(s) for #{target}", entries.len());
        }
        entries
    }

    /// Whether any entry still targets a slot of `owner`.
    pub fn has_owner(&self, owner: NodeId) -> bool {
        self.by_owner.contains_key(&owner)
    }

    /// Smallest id still awaited, for error reporting.
    pub fn first_unresolved(&self) -> Option<i32> {
        self.by_target.keys().min().copied()
    }
}
