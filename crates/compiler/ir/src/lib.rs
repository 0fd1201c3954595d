//! # spvopt Intermediate Representation
//!
//! In-memory form of a SPIR-V module together with the analyses optimization
//! passes rely on.
//!
//! ## Architecture
//!
//! ```text
//! IrContext
//! module: Module
//!   arena: IndexVec<InstId, Option<InstSlot>>   (stable handles, tombstones on kill)
//!   sections: capabilities .. annotations, types/values
//!   functions: IndexVec<FunctionId, Function>
//!     blocks: IndexVec<BlockId, BasicBlock>
//! def_use: DefUseIndex        id -> defining instruction, id -> uses
//! types: TypeManager          id <-> structural type
//! ```
//!
//! Instructions never move between arena slots. Blocks and module sections
//! hold ordered lists of `InstId`s, and every slot remembers its parent so
//! the instruction-to-block mapping is always available.
//!
//! ## Editing discipline
//!
//! Once a [`Module`] is wrapped in an [`IrContext`], the context is the only
//! way to mutate it. Every edit (insert, kill, operand replacement) updates
//! the def-use index, the instruction-to-block mapping and the type manager
//! before returning, so no caller can observe a stale index.

#![allow(clippy::option_if_let_else)]

pub use context::{Analysis, IrContext};
pub use decoration::AppliedDecoration;
pub use def_use::{DefUseIndex, Use, UseSlot};
pub use error::{IrError, ValidationError};
pub use instruction::Instruction;
pub use module::{BasicBlock, Function, IdAllocator, InstParent, Module, Section, MAX_ID_BOUND};
pub use operand::Operand;
pub use types::{ArrayLength, Type, TypeDecoration, TypeKind, TypeManager};

pub use spvopt_common::{Decoration, Extension, MemoryAccess, Opcode, StorageClass};

pub mod context;
pub mod decoration;
pub mod def_use;
pub mod error;
pub mod instruction;
pub mod module;
pub mod operand;
pub mod print;
pub mod types;
pub mod validate;

// --- Core Identifiers ---

index_vec::define_index_type! {
    /// Stable handle of an instruction slot in the module arena
    pub struct InstId = u32;
}

index_vec::define_index_type! {
    /// Identifier of a function within a module
    pub struct FunctionId = usize;
}

index_vec::define_index_type! {
    /// Identifier of a basic block within its function
    pub struct BlockId = usize;
}

/// A SPIR-V result id.
///
/// Result ids are what instructions use to refer to each other. They are
/// distinct from [`InstId`], which names an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u32);

impl Id {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

// --- Pretty Printing Support ---

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self, indent: usize) -> String;
}

/// Helper function to create indentation
pub(crate) fn indent_str(level: usize) -> String {
    "  ".repeat(level)
}
