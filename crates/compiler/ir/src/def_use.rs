//! # Def-Use Index
//!
//! Maps every result id to the instruction defining it and to the set of
//! (instruction, operand slot) pairs using it. The index is keyed by arena
//! handles, so it stays valid across insertions elsewhere in the module.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::{Id, InstId, Instruction, Module};

/// Which part of an instruction refers to an id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UseSlot {
    /// The result type
    Type,
    /// In-operand at this position
    Operand(usize),
}

/// One use of an id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Use {
    pub user: InstId,
    pub slot: UseSlot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefUseIndex {
    defs: FxHashMap<Id, InstId>,
    /// Result id defined by each instruction, for cheap clearing
    results: FxHashMap<InstId, Id>,
    uses: FxHashMap<Id, BTreeSet<Use>>,
    /// Ids used by each instruction, as registered
    used: FxHashMap<InstId, Vec<(UseSlot, Id)>>,
}

impl DefUseIndex {
    /// Builds the index for every live instruction of `module`
    pub fn build(module: &Module) -> Self {
        let mut index = Self::default();
        for (id, slot) in module.arena.iter_enumerated() {
            if let Some(slot) = slot {
                index.analyze_inst_def_use(id, &slot.inst);
            }
        }
        index
    }

    /// Registers both the definition and the uses of `inst`
    pub fn analyze_inst_def_use(&mut self, id: InstId, inst: &Instruction) {
        if let Some(result) = inst.result_id() {
            if let Some(old) = self.results.insert(id, result) {
                if old != result && self.defs.get(&old) == Some(&id) {
                    self.defs.remove(&old);
                }
            }
            self.defs.insert(result, id);
        }
        self.analyze_inst_use(id, inst);
    }

    /// Re-registers the uses of `inst`, dropping whatever was recorded before
    pub fn analyze_inst_use(&mut self, id: InstId, inst: &Instruction) {
        self.clear_uses(id);
        let used: Vec<_> = inst.used_ids().collect();
        for &(slot, used_id) in &used {
            self.uses
                .entry(used_id)
                .or_default()
                .insert(Use { user: id, slot });
        }
        self.used.insert(id, used);
    }

    fn clear_uses(&mut self, id: InstId) {
        let Some(used) = self.used.remove(&id) else {
            return;
        };
        for (slot, used_id) in used {
            if let Some(set) = self.uses.get_mut(&used_id) {
                set.remove(&Use { user: id, slot });
                if set.is_empty() {
                    self.uses.remove(&used_id);
                }
            }
        }
    }

    /// Forgets everything known about `id`, both as a definition and as a user
    pub fn clear_inst(&mut self, id: InstId) {
        self.clear_uses(id);
        if let Some(result) = self.results.remove(&id) {
            if self.defs.get(&result) == Some(&id) {
                self.defs.remove(&result);
            }
        }
    }

    /// The instruction defining `id`
    pub fn get_def(&self, id: Id) -> Option<InstId> {
        self.defs.get(&id).copied()
    }

    /// All uses of `id`, ordered by user then slot
    pub fn uses(&self, id: Id) -> impl Iterator<Item = Use> + '_ {
        self.uses.get(&id).into_iter().flatten().copied()
    }

    /// Distinct instructions using `id`, in arena order
    pub fn users(&self, id: Id) -> Vec<InstId> {
        let mut users: Vec<InstId> = self.uses(id).map(|u| u.user).collect();
        users.dedup();
        users
    }

    pub fn num_users(&self, id: Id) -> usize {
        self.users(id).len()
    }

    pub fn for_each_use(&self, id: Id, mut f: impl FnMut(Use)) {
        for u in self.uses(id) {
            f(u);
        }
    }

    /// Visits the users of `id` until `f` returns an error, which is passed
    /// back to the caller
    pub fn while_each_user<E>(
        &self,
        id: Id,
        f: impl FnMut(InstId) -> Result<(), E>,
    ) -> Result<(), E> {
        self.users(id).into_iter().try_for_each(f)
    }

    /// Ids used by an instruction, as last registered
    pub fn used_ids(&self, inst: InstId) -> &[(UseSlot, Id)] {
        self.used.get(&inst).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
#[path = "def_use_tests.rs"]
mod tests;
