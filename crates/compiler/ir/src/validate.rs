//! Structural validation of modules.
//!
//! This is not a full SPIR-V validator. It checks the layout rules the
//! passes rely on and that every edit must preserve.

use rustc_hash::FxHashSet;
use spvopt_common::{Opcode, StorageClass};

use crate::{Id, Module, PrettyPrint, ValidationError};

impl Module {
    /// Checks that:
    /// - result ids are unique and below the id bound
    /// - every used id is defined somewhere in the module
    /// - function-storage variables form a prefix of their function's entry
    ///   block and appear nowhere else
    /// - every block ends in exactly one terminator
    pub fn validate(&self) -> Result<(), ValidationError> {
        let order = self.instructions_in_order();

        let mut defined = FxHashSet::default();
        for inst in order.iter().filter_map(|&id| self.inst(id)) {
            if let Some(result) = inst.result_id() {
                if result.raw() >= self.id_bound() {
                    return Err(ValidationError::IdOutOfBound {
                        id: result,
                        bound: self.id_bound(),
                    });
                }
                if !defined.insert(result) {
                    return Err(ValidationError::DuplicateDefinition(result));
                }
            }
        }

        // Forward references are legal, so uses are checked in a second sweep.
        for inst in order.iter().filter_map(|&id| self.inst(id)) {
            for (_, used) in inst.used_ids() {
                if !defined.contains(&used) {
                    return Err(ValidationError::UndefinedId {
                        id: used,
                        user: inst.pretty_print(0),
                    });
                }
            }
        }

        for (_, function) in self.functions() {
            let Some(def) = self.inst(function.def) else {
                continue;
            };
            let function_id = def.result_id().unwrap_or(Id::new(0));
            let Some(entry) = function.entry_block() else {
                // Declarations (imported functions) have no body.
                continue;
            };

            for (block_id, block) in function.blocks() {
                let label = self
                    .inst(block.label)
                    .and_then(|l| l.result_id())
                    .unwrap_or(function_id);
                let insts: Vec<_> = block
                    .instructions()
                    .iter()
                    .filter_map(|&id| self.inst(id))
                    .collect();

                let mut in_prefix = block_id == entry;
                for inst in &insts {
                    let is_local = inst.opcode() == Opcode::Variable
                        && inst.storage_class() == Some(StorageClass::Function);
                    if !is_local {
                        in_prefix = false;
                        continue;
                    }
                    if !in_prefix {
                        let result = inst.result_id().unwrap_or(label);
                        return Err(ValidationError::MisplacedVariable(result));
                    }
                }

                match insts.iter().position(|i| i.opcode().is_block_terminator()) {
                    None => return Err(ValidationError::MissingTerminator { label }),
                    Some(position) if position + 1 != insts.len() => {
                        return Err(ValidationError::EarlyTerminator { label });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}
