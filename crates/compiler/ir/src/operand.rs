//! Instruction operands.

use spvopt_common::{Decoration, MemoryAccess, Opcode, StorageClass};

use crate::Id;

/// A single in-operand of an instruction.
///
/// The result type and result id of an instruction are not operands; they
/// live in dedicated fields of [`crate::Instruction`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Reference to another instruction's result
    Id(Id),
    /// Integer literal (up to 64 bits)
    Literal(u64),
    /// Floating-point literal, stored as the bits of an `f64`
    Float(u64),
    /// String literal
    String(String),
    StorageClass(StorageClass),
    Decoration(Decoration),
    MemoryAccess(MemoryAccess),
    /// Opcode operand of `OpSpecConstantOp`
    Opcode(Opcode),
    /// Any other enumerant, kept by name (e.g. `Shader`, `GLSL450`, `None`)
    Keyword(String),
}

impl Operand {
    pub fn float(value: f64) -> Self {
        Self::Float(value.to_bits())
    }

    pub const fn as_id(&self) -> Option<Id> {
        match self {
            Self::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub const fn as_literal(&self) -> Option<u64> {
        match self {
            Self::Literal(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_storage_class(&self) -> Option<StorageClass> {
        match self {
            Self::StorageClass(class) => Some(*class),
            _ => None,
        }
    }

    pub const fn as_decoration(&self) -> Option<Decoration> {
        match self {
            Self::Decoration(decoration) => Some(*decoration),
            _ => None,
        }
    }

    pub const fn as_memory_access(&self) -> Option<MemoryAccess> {
        match self {
            Self::MemoryAccess(mask) => Some(*mask),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Keyword(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Id> for Operand {
    fn from(id: Id) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            Self::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
            Self::StorageClass(class) => write!(f, "{class}"),
            Self::Decoration(decoration) => write!(f, "{decoration}"),
            Self::MemoryAccess(mask) => write!(f, "{mask}"),
            Self::Opcode(op) => f.write_str(op.name().trim_start_matches("Op")),
            Self::Keyword(word) => f.write_str(word),
        }
    }
}
