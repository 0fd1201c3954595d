//! # IR Module
//!
//! The top-level container: module header, logical sections of global
//! instructions, and functions made of basic blocks. All instructions are
//! stored in one arena indexed by [`InstId`]; sections and blocks only hold
//! ordered lists of handles.

use index_vec::IndexVec;

use crate::{BlockId, FunctionId, Id, InstId, Instruction, IrError, Opcode};

/// Largest id bound the toolkit will grow a module to
pub const MAX_ID_BOUND: u32 = 0x3F_FFFF;

/// Logical layout sections holding module-scope instructions, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Capabilities,
    Extensions,
    ExtInstImports,
    MemoryModel,
    EntryPoints,
    ExecutionModes,
    Debug,
    Annotations,
    TypesValues,
}

impl Section {
    pub const ALL: [Self; 9] = [
        Self::Capabilities,
        Self::Extensions,
        Self::ExtInstImports,
        Self::MemoryModel,
        Self::EntryPoints,
        Self::ExecutionModes,
        Self::Debug,
        Self::Annotations,
        Self::TypesValues,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Section a module-scope instruction with this opcode belongs to
    pub const fn for_opcode(opcode: Opcode) -> Option<Self> {
        match opcode {
            Opcode::Capability => Some(Self::Capabilities),
            Opcode::Extension => Some(Self::Extensions),
            Opcode::ExtInstImport => Some(Self::ExtInstImports),
            Opcode::MemoryModel => Some(Self::MemoryModel),
            Opcode::EntryPoint => Some(Self::EntryPoints),
            Opcode::ExecutionMode => Some(Self::ExecutionModes),
            op if op.is_debug() => Some(Self::Debug),
            op if op.is_annotation() => Some(Self::Annotations),
            op if op.is_type() || op.is_compile_time_constant() => Some(Self::TypesValues),
            Opcode::Variable | Opcode::Undef | Opcode::Line => Some(Self::TypesValues),
            _ => None,
        }
    }
}

/// Where an instruction lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstParent {
    Section(Section),
    /// The `OpFunction` instruction itself
    FunctionDef(FunctionId),
    FunctionParam(FunctionId),
    FunctionEnd(FunctionId),
    /// The `OpLabel` of a block
    Label(FunctionId, BlockId),
    /// A body instruction of a block
    Block(FunctionId, BlockId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InstSlot {
    pub(crate) inst: Instruction,
    pub(crate) parent: InstParent,
}

/// Hands out fresh result ids.
///
/// The allocator is owned by the module (its value is the module's id
/// bound) and is threaded explicitly through every pass that creates ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    bound: u32,
    limit: u32,
}

impl IdAllocator {
    pub const fn new(bound: u32) -> Self {
        Self {
            bound,
            limit: MAX_ID_BOUND,
        }
    }

    /// Allocator refusing to grow the bound past `limit`
    pub const fn with_limit(bound: u32, limit: u32) -> Self {
        Self { bound, limit }
    }

    /// One more than the largest id in use
    pub const fn bound(&self) -> u32 {
        self.bound
    }

    pub fn take_next_id(&mut self) -> Result<Id, IrError> {
        if self.bound >= self.limit {
            return Err(IrError::IdOverflow { limit: self.limit });
        }
        let id = Id::new(self.bound);
        self.bound += 1;
        Ok(id)
    }

    /// Ensures `id` is below the bound
    pub fn observe(&mut self, id: Id) {
        self.bound = self.bound.max(id.raw() + 1);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(1)
    }
}

/// A basic block: a label followed by a straight-line run of instructions
/// ending in a terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub(crate) label: InstId,
    pub(crate) insts: Vec<InstId>,
}

impl BasicBlock {
    pub const fn label(&self) -> InstId {
        self.label
    }

    /// Body instructions, terminator included
    pub fn instructions(&self) -> &[InstId] {
        &self.insts
    }
}

/// A function: its `OpFunction`, parameters, blocks and `OpFunctionEnd`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub(crate) def: InstId,
    pub(crate) params: Vec<InstId>,
    pub(crate) blocks: IndexVec<BlockId, BasicBlock>,
    pub(crate) end: Option<InstId>,
}

impl Function {
    pub const fn def(&self) -> InstId {
        self.def
    }

    pub fn params(&self) -> &[InstId] {
        &self.params
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks.iter_enumerated()
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id)
    }

    /// The first block, if the function has a body
    pub fn entry_block(&self) -> Option<BlockId> {
        (!self.blocks.is_empty()).then(|| BlockId::new(0))
    }

    pub const fn end(&self) -> Option<InstId> {
        self.end
    }
}

/// A complete module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// SPIR-V version (major, minor)
    pub version: (u8, u8),
    pub generator: u32,
    pub(crate) ids: IdAllocator,
    pub(crate) arena: IndexVec<InstId, Option<InstSlot>>,
    pub(crate) sections: [Vec<InstId>; 9],
    pub(crate) functions: IndexVec<FunctionId, Function>,
}

impl Module {
    pub fn new() -> Self {
        Self {
            version: (1, 0),
            generator: 0,
            ids: IdAllocator::default(),
            arena: IndexVec::new(),
            sections: Default::default(),
            functions: IndexVec::new(),
        }
    }

    // ==================== Construction ====================
    //
    // These methods build a module before it is handed to an `IrContext`.
    // They do not maintain any analysis.

    fn alloc(&mut self, inst: Instruction, parent: InstParent) -> InstId {
        if let Some(result) = inst.result_id() {
            self.ids.observe(result);
        }
        self.arena.push(Some(InstSlot { inst, parent }))
    }

    /// Appends a module-scope instruction to the section its opcode belongs to
    pub fn push_global(&mut self, inst: Instruction) -> Result<InstId, IrError> {
        let section = Section::for_opcode(inst.opcode())
            .ok_or(IrError::NotModuleScope(inst.opcode()))?;
        Ok(self.push_to_section(section, inst))
    }

    pub fn push_to_section(&mut self, section: Section, inst: Instruction) -> InstId {
        let id = self.alloc(inst, InstParent::Section(section));
        self.sections[section.index()].push(id);
        id
    }

    /// Starts a new function from its `OpFunction` instruction
    pub fn begin_function(&mut self, def: Instruction) -> FunctionId {
        let function_id = self.functions.next_idx();
        let def = self.alloc(def, InstParent::FunctionDef(function_id));
        self.functions.push(Function {
            def,
            params: Vec::new(),
            blocks: IndexVec::new(),
            end: None,
        })
    }

    pub fn push_param(&mut self, function: FunctionId, param: Instruction) -> InstId {
        let id = self.alloc(param, InstParent::FunctionParam(function));
        self.functions[function].params.push(id);
        id
    }

    /// Opens a new block with the given `OpLabel`
    pub fn push_block(&mut self, function: FunctionId, label: Instruction) -> BlockId {
        let block = self.functions[function].blocks.next_idx();
        let label = self.alloc(label, InstParent::Label(function, block));
        self.functions[function].blocks.push(BasicBlock {
            label,
            insts: Vec::new(),
        })
    }

    pub fn push_block_inst(
        &mut self,
        function: FunctionId,
        block: BlockId,
        inst: Instruction,
    ) -> InstId {
        let id = self.alloc(inst, InstParent::Block(function, block));
        self.functions[function].blocks[block].insts.push(id);
        id
    }

    pub fn end_function(&mut self, function: FunctionId, end: Instruction) -> InstId {
        let id = self.alloc(end, InstParent::FunctionEnd(function));
        self.functions[function].end = Some(id);
        id
    }

    /// Raises the id bound (never lowers it)
    pub fn reserve_id_bound(&mut self, bound: u32) {
        if bound > 0 {
            self.ids.observe(Id::new(bound - 1));
        }
    }

    // ==================== Queries ====================

    /// The instruction in slot `id`, or `None` if it was killed
    pub fn inst(&self, id: InstId) -> Option<&Instruction> {
        self.arena.get(id).and_then(Option::as_ref).map(|slot| &slot.inst)
    }

    pub fn parent(&self, id: InstId) -> Option<InstParent> {
        self.arena.get(id).and_then(Option::as_ref).map(|slot| slot.parent)
    }

    pub fn section(&self, section: Section) -> &[InstId] {
        &self.sections[section.index()]
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions.iter_enumerated()
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub const fn id_bound(&self) -> u32 {
        self.ids.bound()
    }

    pub const fn id_allocator(&self) -> IdAllocator {
        self.ids
    }

    /// Replaces the id allocator, e.g. to cap id growth
    pub fn set_id_allocator(&mut self, ids: IdAllocator) {
        self.ids = ids;
    }

    /// Every live instruction in layout order
    pub fn instructions_in_order(&self) -> Vec<InstId> {
        let mut order = Vec::new();
        for section in Section::ALL {
            order.extend_from_slice(self.section(section));
        }
        for (_, function) in self.functions() {
            order.push(function.def);
            order.extend_from_slice(&function.params);
            for (_, block) in function.blocks() {
                order.push(block.label);
                order.extend_from_slice(&block.insts);
            }
            order.extend(function.end);
        }
        order
    }

    /// Number of live instructions
    pub fn live_instruction_count(&self) -> usize {
        self.arena.iter().filter(|slot| slot.is_some()).count()
    }

    // ==================== Crate-internal edits ====================

    pub(crate) fn inst_mut(&mut self, id: InstId) -> Option<&mut Instruction> {
        self.arena
            .get_mut(id)
            .and_then(Option::as_mut)
            .map(|slot| &mut slot.inst)
    }

    pub(crate) fn insert_in_block(
        &mut self,
        function: FunctionId,
        block: BlockId,
        position: usize,
        inst: Instruction,
    ) -> InstId {
        let id = self.alloc(inst, InstParent::Block(function, block));
        self.functions[function].blocks[block]
            .insts
            .insert(position, id);
        id
    }

    /// Position of a body instruction within its block
    pub(crate) fn position_in_block(&self, id: InstId) -> Option<(FunctionId, BlockId, usize)> {
        match self.parent(id)? {
            InstParent::Block(function, block) => {
                let position = self.functions[function].blocks[block]
                    .insts
                    .iter()
                    .position(|&i| i == id)?;
                Some((function, block, position))
            }
            _ => None,
        }
    }

    /// Unlinks an instruction from its container and tombstones its slot
    pub(crate) fn remove(&mut self, id: InstId) -> Option<Instruction> {
        let slot = self.arena.get_mut(id)?.take()?;
        match slot.parent {
            InstParent::Section(section) => {
                self.sections[section.index()].retain(|&i| i != id);
            }
            InstParent::Block(function, block) => {
                self.functions[function].blocks[block]
                    .insts
                    .retain(|&i| i != id);
            }
            InstParent::FunctionParam(function) => {
                self.functions[function].params.retain(|&i| i != id);
            }
            InstParent::FunctionEnd(function) => {
                self.functions[function].end = None;
            }
            // Labels and function headers anchor their containers and are
            // only tombstoned.
            InstParent::FunctionDef(_) | InstParent::Label(_, _) => {}
        }
        Some(slot.inst)
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod tests;
