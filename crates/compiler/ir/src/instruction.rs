//! # IR Instructions
//!
//! An [`Instruction`] is an opcode with an optional result type, an optional
//! result id and an ordered list of in-operands. Instructions are immutable
//! from the outside once they are owned by a module: all edits go through
//! [`crate::IrContext`], which keeps the analyses in sync.

use smallvec::SmallVec;
use spvopt_common::{MemoryAccess, Opcode, StorageClass};

use crate::{Id, Operand, PrettyPrint, UseSlot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    opcode: Opcode,
    type_id: Option<Id>,
    result_id: Option<Id>,
    operands: SmallVec<[Operand; 4]>,
}

impl Instruction {
    pub fn new(
        opcode: Opcode,
        type_id: Option<Id>,
        result_id: Option<Id>,
        operands: impl IntoIterator<Item = Operand>,
    ) -> Self {
        Self {
            opcode,
            type_id,
            result_id,
            operands: operands.into_iter().collect(),
        }
    }

    /// `%result = OpVariable %ptr_type <storage> [%initializer]`
    pub fn variable(
        pointer_type: Id,
        result: Id,
        storage: StorageClass,
        initializer: Option<Id>,
    ) -> Self {
        let mut inst = Self::new(
            Opcode::Variable,
            Some(pointer_type),
            Some(result),
            [Operand::StorageClass(storage)],
        );
        if let Some(init) = initializer {
            inst.operands.push(Operand::Id(init));
        }
        inst
    }

    /// `%result = OpLoad %type %pointer`
    pub fn load(ty: Id, result: Id, pointer: Id) -> Self {
        Self::new(Opcode::Load, Some(ty), Some(result), [Operand::Id(pointer)])
    }

    /// `OpStore %pointer %object`
    pub fn store(pointer: Id, object: Id) -> Self {
        Self::new(
            Opcode::Store,
            None,
            None,
            [Operand::Id(pointer), Operand::Id(object)],
        )
    }

    /// `%result = OpCompositeExtract %type %composite index`
    pub fn composite_extract(ty: Id, result: Id, composite: Id, index: u32) -> Self {
        Self::new(
            Opcode::CompositeExtract,
            Some(ty),
            Some(result),
            [Operand::Id(composite), Operand::Literal(u64::from(index))],
        )
    }

    /// `%result = OpCompositeConstruct %type %constituents...`
    pub fn composite_construct(
        ty: Id,
        result: Id,
        constituents: impl IntoIterator<Item = Id>,
    ) -> Self {
        Self::new(
            Opcode::CompositeConstruct,
            Some(ty),
            Some(result),
            constituents.into_iter().map(Operand::Id),
        )
    }

    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub const fn type_id(&self) -> Option<Id> {
        self.type_id
    }

    pub const fn result_id(&self) -> Option<Id> {
        self.result_id
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operand(&self, index: usize) -> Option<&Operand> {
        self.operands.get(index)
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    /// Returns operand `index` if it is an id
    pub fn id_operand(&self, index: usize) -> Option<Id> {
        self.operand(index).and_then(Operand::as_id)
    }

    /// Returns operand `index` if it is an integer literal
    pub fn literal_operand(&self, index: usize) -> Option<u64> {
        self.operand(index).and_then(Operand::as_literal)
    }

    /// Appends an operand. Only meaningful before the instruction is handed
    /// to a module.
    pub fn push_operand(&mut self, operand: Operand) {
        self.operands.push(operand);
    }

    /// All ids referenced by this instruction, with the slot they occupy
    pub fn used_ids(&self) -> impl Iterator<Item = (UseSlot, Id)> + '_ {
        self.type_id
            .map(|id| (UseSlot::Type, id))
            .into_iter()
            .chain(
                self.operands
                    .iter()
                    .enumerate()
                    .filter_map(|(i, op)| op.as_id().map(|id| (UseSlot::Operand(i), id))),
            )
    }

    /// Storage class of an `OpVariable`
    pub fn storage_class(&self) -> Option<StorageClass> {
        match self.opcode {
            Opcode::Variable => self.operand(0).and_then(Operand::as_storage_class),
            _ => None,
        }
    }

    /// Initializer of an `OpVariable`, if any
    pub fn initializer(&self) -> Option<Id> {
        match self.opcode {
            Opcode::Variable => self.id_operand(1),
            _ => None,
        }
    }

    /// Memory-access mask of a load or store, empty when absent
    pub fn memory_access(&self) -> MemoryAccess {
        let index = match self.opcode {
            Opcode::Load => 1,
            Opcode::Store => 2,
            _ => return MemoryAccess::empty(),
        };
        self.operand(index)
            .and_then(Operand::as_memory_access)
            .unwrap_or_default()
    }

    /// Whether the load or store touches volatile memory
    pub fn is_volatile_access(&self) -> bool {
        self.memory_access().contains(MemoryAccess::VOLATILE)
    }

    pub(crate) fn set_slot(&mut self, slot: UseSlot, id: Id) {
        match slot {
            UseSlot::Type => self.type_id = Some(id),
            UseSlot::Operand(i) => self.operands[i] = Operand::Id(id),
        }
    }

    pub(crate) fn set_operand(&mut self, index: usize, operand: Operand) {
        self.operands[index] = operand;
    }

    pub(crate) fn retain_operands(&mut self, mut keep: impl FnMut(usize, &Operand) -> bool) {
        let mut index = 0;
        self.operands.retain(|op| {
            let kept = keep(index, op);
            index += 1;
            kept
        });
    }
}

impl PrettyPrint for Instruction {
    fn pretty_print(&self, _indent: usize) -> String {
        let mut out = String::new();
        if let Some(result) = self.result_id {
            out.push_str(&format!("{result} = "));
        }
        out.push_str(self.opcode.name());
        if let Some(ty) = self.type_id {
            out.push_str(&format!(" {ty}"));
        }
        for operand in &self.operands {
            out.push_str(&format!(" {operand}"));
        }
        out
    }
}

#[cfg(test)]
#[path = "instruction_tests.rs"]
mod tests;
