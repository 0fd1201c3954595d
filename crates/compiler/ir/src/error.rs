//! Error types of the IR crate.

use thiserror::Error;

use crate::{Id, InstId, Opcode};

/// Failure of an IR edit or query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("id bound limit {limit:#x} exhausted")]
    IdOverflow { limit: u32 },

    #[error("{0} cannot appear at module scope")]
    NotModuleScope(Opcode),

    #[error("instruction {0:?} does not exist or was killed")]
    DeadInstruction(InstId),

    #[error("instruction {0:?} is not inside a basic block")]
    NotInBlock(InstId),

    #[error("{0} has no defining instruction")]
    UndefinedId(Id),

    #[error("{0} does not name a type")]
    NotAType(Id),

    #[error("cannot declare type {0:?} on the fly")]
    UnsupportedTypeSynthesis(crate::TypeKind),
}

/// Structural problem found by [`crate::Module::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{id} is used by {user} but never defined")]
    UndefinedId { id: Id, user: String },

    #[error("{0} is defined more than once")]
    DuplicateDefinition(Id),

    #[error("{id} is not below the id bound {bound}")]
    IdOutOfBound { id: Id, bound: u32 },

    #[error("function-storage variable {0} is not at the start of the entry block")]
    MisplacedVariable(Id),

    #[error("block {label} does not end in a terminator")]
    MissingTerminator { label: Id },

    #[error("block {label} has a terminator before its last instruction")]
    EarlyTerminator { label: Id },

    #[error("function {0} has no body")]
    EmptyFunction(Id),
}
