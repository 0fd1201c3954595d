//! Line-oriented assembler building a [`Module`] from text.

use std::ops::Range;

use logos::Logos;
use rustc_hash::{FxHashMap, FxHashSet};
use spvopt_ir::{
    BlockId, Decoration, FunctionId, Id, Instruction, MemoryAccess, Module, Opcode, Operand,
    StorageClass,
};

use crate::lexer::Token;
use crate::AsmError;

/// Result of assembling a text module
#[derive(Debug, Clone)]
pub struct Assembly {
    pub module: Module,
    /// Id assigned to each symbolic `%name`
    pub names: FxHashMap<String, Id>,
}

impl Assembly {
    /// Id bound to `%name`. Numeric names map to themselves.
    pub fn id(&self, name: &str) -> Option<Id> {
        self.names
            .get(name)
            .copied()
            .or_else(|| name.parse().ok().map(Id::new))
    }
}

/// How a word in a given operand position is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandKind {
    StorageClass,
    Decoration,
    MemoryAccess,
    SpecOpcode,
    Other,
}

fn operand_kind(opcode: Opcode, position: usize) -> OperandKind {
    match (opcode, position) {
        (Opcode::TypePointer | Opcode::Variable, 0) => OperandKind::StorageClass,
        (Opcode::Decorate | Opcode::DecorateId, 1) | (Opcode::MemberDecorate, 2) => {
            OperandKind::Decoration
        }
        (Opcode::Load, 1) | (Opcode::Store | Opcode::CopyMemory, 2) => OperandKind::MemoryAccess,
        (Opcode::SpecConstantOp, 0) => OperandKind::SpecOpcode,
        _ => OperandKind::Other,
    }
}

type Spanned<'a> = (Token<'a>, Range<usize>);

struct Assembler {
    module: Module,
    names: FxHashMap<String, Id>,
    /// Numeric ids written literally in the source; symbolic names skip them
    reserved: FxHashSet<u32>,
    next_symbolic: u32,
    /// Width of each integer type declared so far
    int_widths: FxHashMap<Id, u32>,
    function: Option<FunctionId>,
    block: Option<BlockId>,
}

/// Assembles `source` into a module
pub fn assemble(source: &str) -> Result<Assembly, AsmError> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(source).spanned() {
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(error) => return Err(AsmError::Lexing { error, span }),
        }
    }

    let reserved = tokens
        .iter()
        .filter_map(|(token, _)| match token {
            Token::IdRef(name) => name.parse::<u32>().ok(),
            _ => None,
        })
        .collect();

    let mut assembler = Assembler {
        module: Module::new(),
        names: FxHashMap::default(),
        reserved,
        next_symbolic: 1,
        int_widths: FxHashMap::default(),
        function: None,
        block: None,
    };

    for line in tokens.split(|(token, _)| *token == Token::Newline) {
        assembler.line(line)?;
    }
    if assembler.function.is_some() {
        return Err(AsmError::UnterminatedFunction {
            span: source.len()..source.len(),
        });
    }

    log::debug!(
        "Assembled {} instructions in {} functions, id bound {}",
        assembler.module.live_instruction_count(),
        assembler.module.function_count(),
        assembler.module.id_bound()
    );
    Ok(Assembly {
        module: assembler.module,
        names: assembler.names,
    })
}

impl Assembler {
    fn resolve(&mut self, name: &str, span: &Range<usize>) -> Result<Id, AsmError> {
        if let Ok(raw) = name.parse::<u32>() {
            if raw == 0 {
                return Err(AsmError::Expected {
                    expected: "a non-zero id",
                    span: span.clone(),
                });
            }
            return Ok(Id::new(raw));
        }
        if let Some(&id) = self.names.get(name) {
            return Ok(id);
        }
        while self.reserved.contains(&self.next_symbolic) {
            self.next_symbolic += 1;
        }
        let id = Id::new(self.next_symbolic);
        self.next_symbolic += 1;
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    fn header_comment(&mut self, text: &str) {
        if let Some(version) = text.strip_prefix("Version:") {
            if let Some((major, minor)) = version.trim().split_once('.') {
                if let (Ok(major), Ok(minor)) = (major.parse(), minor.parse()) {
                    self.module.version = (major, minor);
                }
            }
        } else if let Some(generator) = text.strip_prefix("Generator:") {
            if let Ok(generator) = generator.trim().parse() {
                self.module.generator = generator;
            }
        } else if let Some(bound) = text.strip_prefix("Bound:") {
            if let Ok(bound) = bound.trim().parse() {
                self.module.reserve_id_bound(bound);
            }
        }
    }

    fn line(&mut self, line: &[Spanned<'_>]) -> Result<(), AsmError> {
        let mut code = Vec::with_capacity(line.len());
        for (token, span) in line {
            match token {
                Token::Comment(text) => self.header_comment(text),
                _ => code.push((token, span)),
            }
        }
        let Some(&(_, first_span)) = code.first() else {
            return Ok(());
        };
        let line_span = first_span.start..code.last().map_or(first_span.end, |(_, s)| s.end);

        let (result, rest) = match code.as_slice() {
            [(Token::IdRef(name), span), (Token::Equals, _), tail @ ..] => {
                (Some(self.resolve(name, span)?), tail)
            }
            all => (None, all),
        };

        let (opcode, operands) = match rest {
            [(Token::Word(name), span), tail @ ..] => {
                let opcode = Opcode::from_name(name).ok_or_else(|| AsmError::UnknownOpcode {
                    name: name.to_string(),
                    span: (*span).clone(),
                })?;
                (opcode, tail)
            }
            [(_, span), ..] => {
                return Err(AsmError::Expected {
                    expected: "an opcode",
                    span: (*span).clone(),
                })
            }
            [] => {
                return Err(AsmError::Expected {
                    expected: "an opcode",
                    span: line_span,
                })
            }
        };

        if opcode.has_result() != result.is_some() {
            return Err(if result.is_some() {
                AsmError::UnexpectedResult {
                    opcode,
                    span: line_span,
                }
            } else {
                AsmError::MissingResult {
                    opcode,
                    span: line_span,
                }
            });
        }

        let mut operands = operands;
        let type_id = if opcode.has_type() {
            match operands.split_first() {
                Some(((Token::IdRef(name), span), tail)) => {
                    operands = tail;
                    Some(self.resolve(name, span)?)
                }
                _ => {
                    return Err(AsmError::Expected {
                        expected: "a result type id",
                        span: line_span,
                    })
                }
            }
        } else {
            None
        };

        let literal_width = type_id.and_then(|ty| self.int_widths.get(&ty).copied());
        let mut parsed = Vec::with_capacity(operands.len());
        for (position, (token, span)) in operands.iter().enumerate() {
            parsed.push(self.operand(opcode, position, token, span, literal_width)?);
        }

        if opcode == Opcode::TypeInt {
            if let (Some(result), Some(width)) = (result, parsed.first().and_then(Operand::as_literal)) {
                self.int_widths.insert(result, width as u32);
            }
        }

        self.place(Instruction::new(opcode, type_id, result, parsed), line_span)
    }

    fn operand(
        &mut self,
        opcode: Opcode,
        position: usize,
        token: &Token<'_>,
        span: &Range<usize>,
        literal_width: Option<u32>,
    ) -> Result<Operand, AsmError> {
        let operand = match token {
            Token::IdRef(name) => Operand::Id(self.resolve(name, span)?),
            Token::Integer(value) if *value < 0 => {
                // Negative literals are stored in two's complement at the
                // width of the constant's type.
                let bits = *value as u64;
                match literal_width {
                    Some(width) if width <= 32 => Operand::Literal(bits & 0xFFFF_FFFF),
                    _ => Operand::Literal(bits),
                }
            }
            Token::Integer(value) => Operand::Literal(*value as u64),
            Token::HexInteger(value) => Operand::Literal(*value),
            Token::Float(value) => Operand::float(*value),
            Token::String(s) => Operand::String(s.clone()),
            Token::Word(word) => self.word(opcode, position, word, span)?,
            Token::Comment(_) | Token::Newline | Token::Equals => {
                return Err(AsmError::Expected {
                    expected: "an operand",
                    span: span.clone(),
                })
            }
        };
        Ok(operand)
    }

    fn word(
        &self,
        opcode: Opcode,
        position: usize,
        word: &str,
        span: &Range<usize>,
    ) -> Result<Operand, AsmError> {
        let invalid = |kind: &'static str| AsmError::InvalidEnumerant {
            kind,
            word: word.to_string(),
            span: span.clone(),
        };
        let operand = match operand_kind(opcode, position) {
            OperandKind::StorageClass => Operand::StorageClass(
                StorageClass::from_name(word).ok_or_else(|| invalid("storage class"))?,
            ),
            OperandKind::Decoration => Operand::Decoration(
                Decoration::from_name(word).ok_or_else(|| invalid("decoration"))?,
            ),
            OperandKind::MemoryAccess => {
                let mut mask = MemoryAccess::empty();
                for part in word.split('|') {
                    mask |= MemoryAccess::from_spirv_name(part).ok_or_else(|| invalid("memory access"))?;
                }
                Operand::MemoryAccess(mask)
            }
            OperandKind::SpecOpcode => Operand::Opcode(
                Opcode::from_name(&format!("Op{word}")).ok_or_else(|| invalid("opcode"))?,
            ),
            OperandKind::Other => Operand::Keyword(word.to_string()),
        };
        Ok(operand)
    }

    fn place(&mut self, inst: Instruction, span: Range<usize>) -> Result<(), AsmError> {
        let opcode = inst.opcode();
        match (opcode, self.function, self.block) {
            (Opcode::Function, None, _) => {
                self.function = Some(self.module.begin_function(inst));
                self.block = None;
            }
            (Opcode::FunctionParameter, Some(function), None) => {
                self.module.push_param(function, inst);
            }
            (Opcode::Label, Some(function), _) => {
                self.block = Some(self.module.push_block(function, inst));
            }
            (Opcode::FunctionEnd, Some(function), _) => {
                self.module.end_function(function, inst);
                self.function = None;
                self.block = None;
            }
            (Opcode::Function, Some(_), _) => {
                return Err(AsmError::UnterminatedFunction { span });
            }
            (_, Some(function), Some(block)) => {
                self.module.push_block_inst(function, block, inst);
            }
            (_, Some(_), None) => return Err(AsmError::OutsideBlock { opcode, span }),
            (_, None, _) => {
                self.module
                    .push_global(inst)
                    .map_err(|source| AsmError::Ir { source, span })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
