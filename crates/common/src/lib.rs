//! Opcode and operand-enumeration tables shared across the spvopt crates.

#![allow(clippy::option_if_let_else)]
pub mod enums;
pub mod opcode;

pub use enums::{Decoration, Extension, MemoryAccess, StorageClass};
pub use opcode::{InstructionError, Opcode};
