//! # IR Context
//!
//! Owns a [`Module`] together with its analyses. Every structural edit goes
//! through this type and updates the def-use index, the
//! instruction-to-block mapping and the type manager before returning.

use bitflags::bitflags;
use spvopt_common::{Extension, Opcode, StorageClass};

use crate::decoration::{decorations_for, AppliedDecoration};
use crate::{
    BlockId, DefUseIndex, FunctionId, Id, InstId, InstParent, Instruction, IrError, Module,
    Operand, Section, Type, TypeKind, TypeManager, UseSlot,
};

bitflags! {
    /// Analyses a pass may declare as preserved
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Analysis: u32 {
        const DEF_USE = 1 << 0;
        const INSTR_TO_BLOCK_MAPPING = 1 << 1;
        const DECORATIONS = 1 << 2;
        const COMBINATORS = 1 << 3;
        const CFG = 1 << 4;
        const DOMINATOR_ANALYSIS = 1 << 5;
        const NAME_MAP = 1 << 6;
        const TYPES = 1 << 7;
    }
}

#[derive(Debug, Clone)]
pub struct IrContext {
    module: Module,
    def_use: DefUseIndex,
    types: TypeManager,
}

impl IrContext {
    pub fn new(module: Module) -> Self {
        let def_use = DefUseIndex::build(&module);
        let types = TypeManager::build(&module, &def_use);
        Self {
            module,
            def_use,
            types,
        }
    }

    pub const fn module(&self) -> &Module {
        &self.module
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    pub const fn def_use(&self) -> &DefUseIndex {
        &self.def_use
    }

    pub const fn types(&self) -> &TypeManager {
        &self.types
    }

    /// Rebuilds every analysis not in `preserved`.
    ///
    /// Decorations and the instruction-to-block mapping are derived from the
    /// def-use index and the arena, so they are always current.
    pub fn invalidate_analyses_except(&mut self, preserved: Analysis) {
        if !preserved.contains(Analysis::DEF_USE) {
            log::debug!("rebuilding def-use index");
            self.def_use = DefUseIndex::build(&self.module);
        }
        if !preserved.contains(Analysis::TYPES) {
            log::debug!("rebuilding type manager");
            self.types = TypeManager::build(&self.module, &self.def_use);
        }
    }

    // ==================== Queries ====================

    pub fn inst(&self, id: InstId) -> Option<&Instruction> {
        self.module.inst(id)
    }

    /// The instruction defining `id`
    pub fn get_def(&self, id: Id) -> Option<InstId> {
        self.def_use.get_def(id)
    }

    pub fn def_inst(&self, id: Id) -> Option<&Instruction> {
        self.get_def(id).and_then(|inst| self.inst(inst))
    }

    /// Function and block holding a body instruction (or block label)
    pub fn instr_block(&self, inst: InstId) -> Option<(FunctionId, BlockId)> {
        match self.module.parent(inst)? {
            InstParent::Block(function, block) | InstParent::Label(function, block) => {
                Some((function, block))
            }
            _ => None,
        }
    }

    pub fn decorations_for(&self, id: Id, include_linkage: bool) -> Vec<AppliedDecoration> {
        decorations_for(&self.module, &self.def_use, id, include_linkage)
    }

    /// Whether the module declares `extension` with `OpExtension`
    pub fn has_extension(&self, extension: Extension) -> bool {
        self.module
            .section(Section::Extensions)
            .iter()
            .filter_map(|&inst| self.inst(inst))
            .any(|inst| inst.operand(0).and_then(Operand::as_str) == Some(extension.name()))
    }

    /// Value of an integer `OpConstant`, with `OpConstantNull` reading as 0.
    /// Specialization constants have no value yet and yield `None`.
    pub fn constant_integer(&self, id: Id) -> Option<u64> {
        let def = self.def_inst(id)?;
        let ty = self.types.get_type(def.type_id()?)?;
        if !matches!(ty.kind, TypeKind::Int { .. }) {
            return None;
        }
        match def.opcode() {
            Opcode::Constant => def.literal_operand(0),
            Opcode::ConstantNull => Some(0),
            _ => None,
        }
    }

    /// Pointee of an `OpTypePointer`
    pub fn pointee_type_id(&self, pointer_type: Id) -> Option<Id> {
        let def = self.def_inst(pointer_type)?;
        (def.opcode() == Opcode::TypePointer)
            .then(|| def.id_operand(1))
            .flatten()
    }

    /// Type of the memory an `OpVariable` (or any pointer value) points to
    pub fn storage_type_of(&self, pointer: &Instruction) -> Option<Id> {
        self.pointee_type_id(pointer.type_id()?)
    }

    // ==================== Edits ====================

    pub fn take_next_id(&mut self) -> Result<Id, IrError> {
        self.module.ids.take_next_id()
    }

    fn register(&mut self, id: InstId) {
        if let Some(inst) = self.module.inst(id) {
            self.def_use.analyze_inst_def_use(id, inst);
        }
    }

    /// Inserts `inst` immediately before `anchor`, which must be a body
    /// instruction of some block
    pub fn insert_before(&mut self, anchor: InstId, inst: Instruction) -> Result<InstId, IrError> {
        let (function, block, position) = self
            .module
            .position_in_block(anchor)
            .ok_or(IrError::NotInBlock(anchor))?;
        let id = self.module.insert_in_block(function, block, position, inst);
        self.register(id);
        Ok(id)
    }

    /// Inserts `inst` as the first body instruction of a block
    pub fn insert_at_block_start(
        &mut self,
        function: FunctionId,
        block: BlockId,
        inst: Instruction,
    ) -> InstId {
        let id = self.module.insert_in_block(function, block, 0, inst);
        self.register(id);
        id
    }

    /// Appends a type declaration and registers it with the type manager
    pub fn add_type(&mut self, inst: Instruction) -> InstId {
        let id = self.module.push_to_section(Section::TypesValues, inst);
        self.register(id);
        if let Some(inst) = self.module.inst(id) {
            if let (Some(result), Some(ty)) = (
                inst.result_id(),
                self.types
                    .type_of_instruction(&self.module, &self.def_use, inst),
            ) {
                self.types.register_type(result, ty);
            }
        }
        id
    }

    /// Appends a constant or global variable
    pub fn add_global_value(&mut self, inst: Instruction) -> InstId {
        let id = self.module.push_to_section(Section::TypesValues, inst);
        self.register(id);
        id
    }

    pub fn add_annotation(&mut self, inst: Instruction) -> InstId {
        let id = self.module.push_to_section(Section::Annotations, inst);
        self.register(id);
        id
    }

    /// Canonical id of `ty`, declaring it first if needed.
    ///
    /// Only undecorated pointer and scalar types can be declared on the fly.
    pub fn get_type_instruction(&mut self, ty: &Type) -> Result<Id, IrError> {
        if let Some(id) = self.types.get_id(ty) {
            return Ok(id);
        }
        if ty.is_decorated() {
            return Err(IrError::UnsupportedTypeSynthesis(ty.kind.clone()));
        }
        let operands = match &ty.kind {
            TypeKind::Pointer { storage, pointee } => {
                vec![Operand::StorageClass(*storage), Operand::Id(*pointee)]
            }
            TypeKind::Int { width, signed } => vec![
                Operand::Literal(u64::from(*width)),
                Operand::Literal(u64::from(*signed)),
            ],
            TypeKind::Float { width } => vec![Operand::Literal(u64::from(*width))],
            TypeKind::Bool | TypeKind::Void => Vec::new(),
            kind => return Err(IrError::UnsupportedTypeSynthesis(kind.clone())),
        };
        let opcode = match ty.kind {
            TypeKind::Pointer { .. } => Opcode::TypePointer,
            TypeKind::Int { .. } => Opcode::TypeInt,
            TypeKind::Float { .. } => Opcode::TypeFloat,
            TypeKind::Bool => Opcode::TypeBool,
            _ => Opcode::TypeVoid,
        };
        let result = self.take_next_id()?;
        self.add_type(Instruction::new(opcode, None, Some(result), operands));
        Ok(result)
    }

    /// Pointer type to `pointee` in `storage`, declared if needed
    pub fn pointer_type_to(&mut self, pointee: Id, storage: StorageClass) -> Result<Id, IrError> {
        let (_, pointer) = self
            .types
            .get_type_and_pointer_type(pointee, storage)
            .ok_or(IrError::NotAType(pointee))?;
        self.get_type_instruction(&pointer)
    }

    /// Replaces operand `index` of `inst`
    pub fn set_operand(&mut self, inst: InstId, index: usize, operand: Operand) -> Result<(), IrError> {
        let target = self
            .module
            .inst_mut(inst)
            .ok_or(IrError::DeadInstruction(inst))?;
        target.set_operand(index, operand);
        self.register(inst);
        Ok(())
    }

    /// Rewrites every use of `old` to refer to `new` instead. Returns whether
    /// anything changed.
    pub fn replace_all_uses_with(&mut self, old: Id, new: Id) -> bool {
        if old == new {
            return false;
        }
        let uses: Vec<_> = self.def_use.uses(old).collect();
        for u in &uses {
            if let Some(inst) = self.module.inst_mut(u.user) {
                inst.set_slot(u.slot, new);
            }
        }
        for user in self.def_use.users(old) {
            self.register(user);
        }
        !uses.is_empty()
    }

    /// Removes `inst` from the module, together with the debug names and
    /// decorations targeting its result id
    pub fn kill_inst(&mut self, inst: InstId) {
        let Some(result) = self.inst(inst).and_then(Instruction::result_id) else {
            self.forget(inst);
            return;
        };
        self.kill_names_and_decorates(result);
        if self.inst(inst).is_some_and(|i| i.opcode().is_type()) {
            self.types.remove_id(result);
        }
        self.forget(inst);
    }

    fn forget(&mut self, inst: InstId) {
        self.def_use.clear_inst(inst);
        self.module.remove(inst);
    }

    /// Kills the `OpName`, `OpMemberName` and decoration instructions whose
    /// target is `id`. Group decorations drop `id` from their target list and
    /// die once no target remains.
    pub fn kill_names_and_decorates(&mut self, id: Id) {
        let uses: Vec<_> = self.def_use.uses(id).collect();
        for u in uses {
            let Some(user) = self.inst(u.user) else {
                continue;
            };
            match user.opcode() {
                Opcode::Name
                | Opcode::MemberName
                | Opcode::Decorate
                | Opcode::DecorateId
                | Opcode::MemberDecorate
                    if u.slot == UseSlot::Operand(0) =>
                {
                    self.forget(u.user);
                }
                Opcode::GroupDecorate | Opcode::GroupMemberDecorate => {
                    self.drop_group_target(u.user, id);
                }
                _ => {}
            }
        }
    }

    fn drop_group_target(&mut self, group_decorate: InstId, target: Id) {
        let Some(inst) = self.module.inst_mut(group_decorate) else {
            return;
        };
        // Targets of OpGroupMemberDecorate are (id, member) pairs.
        let paired = inst.opcode() == Opcode::GroupMemberDecorate;
        let mut drop_next = false;
        inst.retain_operands(|index, operand| {
            if index == 0 {
                return true;
            }
            if drop_next {
                drop_next = false;
                return false;
            }
            let is_target = operand.as_id() == Some(target) && (!paired || index % 2 == 1);
            drop_next = is_target && paired;
            !is_target
        });
        let empty = inst.num_operands() <= 1;
        if empty {
            self.forget(group_decorate);
        } else {
            self.register(group_decorate);
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
