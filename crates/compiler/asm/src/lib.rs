//! # spvopt Assembler
//!
//! Reads the SPIR-V assembly text format into a [`spvopt_ir::Module`].
//!
//! ```text
//! ; comment
//! %int = OpTypeInt 32 1
//! %v = OpVariable %ptr Function %init
//! OpStore %v %x Volatile|Aligned 4
//! ```
//!
//! Symbolic ids (`%int`) are numbered in order of first appearance, skipping
//! any number already written literally (`%12`) in the same source. The
//! header comments printed by the disassembler (`; Version:`, `; Bound:`)
//! are read back, so disassembling and re-assembling preserves the module.

use std::ops::Range;

use ariadne::{Label, Report, ReportKind, Source};
use spvopt_ir::{IrError, Opcode};
use thiserror::Error;

pub mod lexer;
pub mod parser;

pub use lexer::LexingError;
pub use parser::{assemble, Assembly};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AsmError {
    #[error("{error}")]
    Lexing {
        error: LexingError,
        span: Range<usize>,
    },

    #[error("unknown opcode `{name}`")]
    UnknownOpcode { name: String, span: Range<usize> },

    #[error("expected {expected}")]
    Expected {
        expected: &'static str,
        span: Range<usize>,
    },

    #[error("{opcode} does not produce a result id")]
    UnexpectedResult { opcode: Opcode, span: Range<usize> },

    #[error("{opcode} requires a result id")]
    MissingResult { opcode: Opcode, span: Range<usize> },

    #[error("invalid {kind} `{word}`")]
    InvalidEnumerant {
        kind: &'static str,
        word: String,
        span: Range<usize>,
    },

    #[error("{opcode} must be inside a block")]
    OutsideBlock { opcode: Opcode, span: Range<usize> },

    #[error("function is missing OpFunctionEnd")]
    UnterminatedFunction { span: Range<usize> },

    #[error("{source}")]
    Ir { source: IrError, span: Range<usize> },
}

impl AsmError {
    /// Byte range of the source the error points at
    pub fn span(&self) -> Range<usize> {
        match self {
            Self::Lexing { span, .. }
            | Self::UnknownOpcode { span, .. }
            | Self::Expected { span, .. }
            | Self::UnexpectedResult { span, .. }
            | Self::MissingResult { span, .. }
            | Self::InvalidEnumerant { span, .. }
            | Self::OutsideBlock { span, .. }
            | Self::UnterminatedFunction { span }
            | Self::Ir { span, .. } => span.clone(),
        }
    }

    /// Formats the error against its source text
    pub fn render(&self, source: &str, with_color: bool) -> String {
        let mut write_buffer = Vec::new();
        let written = Report::build(ReportKind::Error, ((), self.span()))
            .with_config(
                ariadne::Config::new()
                    .with_index_type(ariadne::IndexType::Byte)
                    .with_color(with_color),
            )
            .with_message(self.to_string())
            .with_label(Label::new(((), self.span())).with_message(self.to_string()))
            .finish()
            .write(Source::from(source), &mut write_buffer);
        match written {
            Ok(()) => String::from_utf8_lossy(&write_buffer).to_string(),
            Err(_) => self.to_string(),
        }
    }
}
