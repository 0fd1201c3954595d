//! Reference interpreter for small functions.
//!
//! Evaluates module-scope constants and then runs a function over a private
//! memory, so an optimized module can be compared observationally with its
//! input. Supported: variables, loads and stores, access chains, composite
//! construct/extract/insert, integer arithmetic and comparison, `OpSelect`,
//! unconditional and conditional branches. Anything else is reported as
//! [`InterpError::Unsupported`].

use rustc_hash::FxHashMap;
use spvopt_ir::{DefUseIndex, FunctionId, Id, Instruction, Module, Opcode, Operand, Section};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Integer or float bits
    Scalar(u64),
    Bool(bool),
    Composite(Vec<Value>),
    Pointer(Pointer),
    Undef,
}

/// A memory slot and the element path inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    slot: usize,
    path: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpError {
    #[error("no function named `{0}`")]
    UnknownFunction(String),
    #[error("{0} is not supported")]
    Unsupported(Opcode),
    #[error("{0} has no value")]
    NoValue(Id),
    #[error("cannot build a value of type {0}")]
    UnsupportedType(Id),
    #[error("index {index} out of range for a composite of {len} elements")]
    IndexOutOfRange { index: u64, len: usize },
    #[error("expected {expected}")]
    Mismatch { expected: &'static str },
    #[error("malformed {0}")]
    Malformed(Opcode),
    #[error("branch to unknown block {0}")]
    UnknownBlock(Id),
    #[error("step limit of {0} exceeded")]
    StepLimit(usize),
    #[error("expected {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },
    #[error("block ends without a terminator")]
    MissingTerminator,
}

/// How the leaves of a default value are filled
#[derive(Clone, Copy)]
enum Fill {
    Null,
    Undef,
}

pub struct Interpreter<'m> {
    module: &'m Module,
    def_use: DefUseIndex,
    constants: FxHashMap<Id, Value>,
    /// Module-scope variables and their initial values
    globals: Vec<(Id, Value)>,
    step_limit: usize,
}

struct Frame {
    values: FxHashMap<Id, Value>,
    memory: Vec<Value>,
}

impl Frame {
    fn alloc(&mut self, value: Value) -> Pointer {
        self.memory.push(value);
        Pointer {
            slot: self.memory.len() - 1,
            path: Vec::new(),
        }
    }

    fn read(&self, pointer: &Pointer) -> Result<&Value, InterpError> {
        let root = self
            .memory
            .get(pointer.slot)
            .ok_or(InterpError::Mismatch { expected: "a live pointer" })?;
        at_path(root, &pointer.path)
    }

    fn write(&mut self, pointer: &Pointer, value: Value) -> Result<(), InterpError> {
        let root = self
            .memory
            .get_mut(pointer.slot)
            .ok_or(InterpError::Mismatch { expected: "a live pointer" })?;
        *at_path_mut(root, &pointer.path)? = value;
        Ok(())
    }
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m Module) -> Result<Self, InterpError> {
        let mut interp = Self {
            module,
            def_use: DefUseIndex::build(module),
            constants: FxHashMap::default(),
            globals: Vec::new(),
            step_limit: 10_000,
        };
        interp.evaluate_globals()?;
        Ok(interp)
    }

    pub const fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    /// Value of a module-scope constant
    pub fn constant(&self, id: Id) -> Option<&Value> {
        self.constants.get(&id)
    }

    /// The function carrying `OpName %f "name"`
    pub fn function_by_name(&self, name: &str) -> Result<FunctionId, InterpError> {
        let target = self
            .module
            .section(Section::Debug)
            .iter()
            .filter_map(|&inst| self.module.inst(inst))
            .find(|inst| {
                inst.opcode() == Opcode::Name
                    && inst.operand(1).and_then(Operand::as_str) == Some(name)
            })
            .and_then(|inst| inst.id_operand(0));
        self.module
            .functions()
            .find(|(_, function)| {
                target.is_some()
                    && self
                        .module
                        .inst(function.def())
                        .and_then(Instruction::result_id)
                        == target
            })
            .map(|(id, _)| id)
            .ok_or_else(|| InterpError::UnknownFunction(name.to_string()))
    }

    /// Runs the function named `name`
    pub fn run(&self, name: &str, args: &[Value]) -> Result<Option<Value>, InterpError> {
        self.call(self.function_by_name(name)?, args)
    }

    pub fn call(&self, function: FunctionId, args: &[Value]) -> Result<Option<Value>, InterpError> {
        let f = self
            .module
            .function(function)
            .ok_or(InterpError::MissingTerminator)?;
        if f.params().len() != args.len() {
            return Err(InterpError::Arity {
                expected: f.params().len(),
                got: args.len(),
            });
        }

        let mut frame = Frame {
            values: FxHashMap::default(),
            memory: Vec::new(),
        };
        for (id, init) in &self.globals {
            let pointer = frame.alloc(init.clone());
            frame.values.insert(*id, Value::Pointer(pointer));
        }
        for (&param, arg) in f.params().iter().zip(args) {
            if let Some(id) = self.module.inst(param).and_then(Instruction::result_id) {
                frame.values.insert(id, arg.clone());
            }
        }

        let mut block = f.entry_block().ok_or(InterpError::MissingTerminator)?;
        let mut steps = 0;
        'blocks: loop {
            let body = f.block(block).ok_or(InterpError::MissingTerminator)?;
            for &inst in body.instructions() {
                steps += 1;
                if steps > self.step_limit {
                    return Err(InterpError::StepLimit(self.step_limit));
                }
                let Some(inst) = self.module.inst(inst) else {
                    continue;
                };
                let target = match inst.opcode() {
                    Opcode::Return => return Ok(None),
                    Opcode::ReturnValue => return Ok(Some(self.operand_value(&frame, inst, 0)?)),
                    Opcode::Branch => inst.id_operand(0),
                    Opcode::BranchConditional => {
                        let taken = match self.operand_value(&frame, inst, 0)? {
                            Value::Bool(true) => 1,
                            Value::Bool(false) => 2,
                            _ => return Err(InterpError::Mismatch { expected: "a boolean" }),
                        };
                        inst.id_operand(taken)
                    }
                    _ => {
                        self.step(&mut frame, inst)?;
                        continue;
                    }
                };
                let label = target.ok_or(InterpError::Malformed(inst.opcode()))?;
                block = f
                    .blocks()
                    .find(|(_, b)| {
                        self.module.inst(b.label()).and_then(Instruction::result_id) == Some(label)
                    })
                    .map(|(id, _)| id)
                    .ok_or(InterpError::UnknownBlock(label))?;
                continue 'blocks;
            }
            return Err(InterpError::MissingTerminator);
        }
    }

    fn evaluate_globals(&mut self) -> Result<(), InterpError> {
        let module = self.module;
        for &inst in module.section(Section::TypesValues) {
            let Some(inst) = module.inst(inst) else {
                continue;
            };
            let Some(result) = inst.result_id() else {
                continue;
            };
            let value = match inst.opcode() {
                op if op.is_type() => continue,
                Opcode::Constant | Opcode::SpecConstant => match inst.operand(0) {
                    Some(Operand::Literal(bits) | Operand::Float(bits)) => Value::Scalar(*bits),
                    _ => return Err(InterpError::Malformed(inst.opcode())),
                },
                Opcode::ConstantTrue | Opcode::SpecConstantTrue => Value::Bool(true),
                Opcode::ConstantFalse | Opcode::SpecConstantFalse => Value::Bool(false),
                Opcode::ConstantComposite | Opcode::SpecConstantComposite => {
                    let elements = inst
                        .operands()
                        .iter()
                        .map(|op| self.global_operand(op))
                        .collect::<Result<_, _>>()?;
                    Value::Composite(elements)
                }
                Opcode::ConstantNull => self.default_value(self.type_of(inst)?, Fill::Null)?,
                Opcode::Undef => Value::Undef,
                Opcode::SpecConstantOp => {
                    let Some(Operand::Opcode(opcode)) = inst.operand(0) else {
                        return Err(InterpError::Malformed(Opcode::SpecConstantOp));
                    };
                    self.pure_op(*opcode, inst.type_id(), &inst.operands()[1..], |id| {
                        self.constants.get(&id).cloned().ok_or(InterpError::NoValue(id))
                    })?
                }
                Opcode::Variable => {
                    let init = match inst.initializer() {
                        Some(init) => self.global_operand(&Operand::Id(init))?,
                        None => self.default_value(self.pointee(inst)?, Fill::Undef)?,
                    };
                    self.globals.push((result, init));
                    continue;
                }
                _ => continue,
            };
            self.constants.insert(result, value);
        }
        Ok(())
    }

    fn global_operand(&self, operand: &Operand) -> Result<Value, InterpError> {
        let id = operand.as_id().ok_or(InterpError::Mismatch { expected: "an id" })?;
        self.constants.get(&id).cloned().ok_or(InterpError::NoValue(id))
    }

    fn value(&self, frame: &Frame, id: Id) -> Result<Value, InterpError> {
        frame
            .values
            .get(&id)
            .or_else(|| self.constants.get(&id))
            .cloned()
            .ok_or(InterpError::NoValue(id))
    }

    fn operand_value(&self, frame: &Frame, inst: &Instruction, index: usize) -> Result<Value, InterpError> {
        let id = inst
            .id_operand(index)
            .ok_or(InterpError::Malformed(inst.opcode()))?;
        self.value(frame, id)
    }

    fn pointer_operand(&self, frame: &Frame, inst: &Instruction, index: usize) -> Result<Pointer, InterpError> {
        match self.operand_value(frame, inst, index)? {
            Value::Pointer(pointer) => Ok(pointer),
            _ => Err(InterpError::Mismatch { expected: "a pointer" }),
        }
    }

    fn step(&self, frame: &mut Frame, inst: &Instruction) -> Result<(), InterpError> {
        let value = match inst.opcode() {
            Opcode::Variable => {
                let init = match inst.initializer() {
                    Some(init) => self.value(frame, init)?,
                    None => self.default_value(self.pointee(inst)?, Fill::Undef)?,
                };
                Value::Pointer(frame.alloc(init))
            }
            Opcode::Load => {
                let pointer = self.pointer_operand(frame, inst, 0)?;
                frame.read(&pointer)?.clone()
            }
            Opcode::Store => {
                let pointer = self.pointer_operand(frame, inst, 0)?;
                let value = self.operand_value(frame, inst, 1)?;
                return frame.write(&pointer, value);
            }
            Opcode::AccessChain | Opcode::InBoundsAccessChain => {
                let mut pointer = self.pointer_operand(frame, inst, 0)?;
                for index in 1..inst.num_operands() {
                    match self.operand_value(frame, inst, index)? {
                        Value::Scalar(index) => pointer.path.push(index),
                        _ => return Err(InterpError::Mismatch { expected: "an integer index" }),
                    }
                }
                Value::Pointer(pointer)
            }
            opcode => {
                let frame: &Frame = frame;
                self.pure_op(opcode, inst.type_id(), inst.operands(), |id| self.value(frame, id))?
            }
        };
        if let Some(result) = inst.result_id() {
            frame.values.insert(result, value);
        }
        Ok(())
    }

    /// Operations without side effects, shared by function bodies and
    /// `OpSpecConstantOp`
    fn pure_op(
        &self,
        opcode: Opcode,
        ty: Option<Id>,
        operands: &[Operand],
        value_of: impl Fn(Id) -> Result<Value, InterpError>,
    ) -> Result<Value, InterpError> {
        let operand = |index: usize| {
            operands
                .get(index)
                .and_then(Operand::as_id)
                .ok_or(InterpError::Malformed(opcode))
                .and_then(&value_of)
        };
        let literals = |from: usize| -> Result<Vec<u64>, InterpError> {
            operands[from.min(operands.len())..]
                .iter()
                .map(|op| op.as_literal().ok_or(InterpError::Malformed(opcode)))
                .collect()
        };

        let value = match opcode {
            Opcode::CompositeConstruct => Value::Composite(
                (0..operands.len())
                    .map(operand)
                    .collect::<Result<_, _>>()?,
            ),
            Opcode::CompositeExtract => {
                let composite = operand(0)?;
                at_path(&composite, &literals(1)?)?.clone()
            }
            Opcode::CompositeInsert => {
                let object = operand(0)?;
                let mut composite = operand(1)?;
                *at_path_mut(&mut composite, &literals(2)?)? = object;
                composite
            }
            Opcode::CopyObject => operand(0)?,
            Opcode::IAdd | Opcode::ISub | Opcode::IMul => {
                let (Value::Scalar(a), Value::Scalar(b)) = (operand(0)?, operand(1)?) else {
                    return Err(InterpError::Mismatch { expected: "integer operands" });
                };
                let raw = match opcode {
                    Opcode::IAdd => a.wrapping_add(b),
                    Opcode::ISub => a.wrapping_sub(b),
                    _ => a.wrapping_mul(b),
                };
                Value::Scalar(raw & self.width_mask(ty))
            }
            Opcode::IEqual | Opcode::INotEqual => {
                let equal = operand(0)? == operand(1)?;
                Value::Bool(equal == (opcode == Opcode::IEqual))
            }
            Opcode::Select => match operand(0)? {
                Value::Bool(true) => operand(1)?,
                Value::Bool(false) => operand(2)?,
                _ => return Err(InterpError::Mismatch { expected: "a boolean" }),
            },
            opcode => return Err(InterpError::Unsupported(opcode)),
        };
        Ok(value)
    }

    fn def(&self, id: Id) -> Result<&Instruction, InterpError> {
        self.def_use
            .get_def(id)
            .and_then(|inst| self.module.inst(inst))
            .ok_or(InterpError::NoValue(id))
    }

    fn type_of(&self, inst: &Instruction) -> Result<Id, InterpError> {
        inst.type_id().ok_or(InterpError::Malformed(inst.opcode()))
    }

    /// Pointee type of a variable
    fn pointee(&self, var: &Instruction) -> Result<Id, InterpError> {
        let pointer = self.def(self.type_of(var)?)?;
        pointer
            .id_operand(1)
            .ok_or(InterpError::Malformed(pointer.opcode()))
    }

    /// Mask keeping the bits of an integer of type `ty`
    fn width_mask(&self, ty: Option<Id>) -> u64 {
        let width = ty
            .and_then(|ty| self.def(ty).ok())
            .filter(|def| def.opcode() == Opcode::TypeInt)
            .and_then(|def| def.literal_operand(0))
            .unwrap_or(64);
        if width >= 64 {
            u64::MAX
        } else {
            (1 << width) - 1
        }
    }

    fn default_value(&self, ty: Id, fill: Fill) -> Result<Value, InterpError> {
        let def = self.def(ty)?;
        let element_count = |def: &Instruction| -> Result<usize, InterpError> {
            let count = match def.opcode() {
                Opcode::TypeArray => match def.id_operand(1).and_then(|len| self.constants.get(&len)) {
                    Some(Value::Scalar(len)) => *len,
                    _ => return Err(InterpError::UnsupportedType(ty)),
                },
                _ => def.literal_operand(1).ok_or(InterpError::UnsupportedType(ty))?,
            };
            usize::try_from(count).map_err(|_| InterpError::UnsupportedType(ty))
        };

        let value = match (def.opcode(), fill) {
            (Opcode::TypeInt | Opcode::TypeFloat, Fill::Null) => Value::Scalar(0),
            (Opcode::TypeBool, Fill::Null) => Value::Bool(false),
            (Opcode::TypeInt | Opcode::TypeFloat | Opcode::TypeBool | Opcode::TypePointer, _) => {
                Value::Undef
            }
            (Opcode::TypeStruct, _) => Value::Composite(
                def.operands()
                    .iter()
                    .map(|member| {
                        let member = member.as_id().ok_or(InterpError::UnsupportedType(ty))?;
                        self.default_value(member, fill)
                    })
                    .collect::<Result<_, _>>()?,
            ),
            (Opcode::TypeArray | Opcode::TypeVector | Opcode::TypeMatrix, _) => {
                let element = def.id_operand(0).ok_or(InterpError::UnsupportedType(ty))?;
                let element = self.default_value(element, fill)?;
                Value::Composite(vec![element; element_count(def)?])
            }
            _ => return Err(InterpError::UnsupportedType(ty)),
        };
        Ok(value)
    }
}

fn at_path<'v>(mut value: &'v Value, path: &[u64]) -> Result<&'v Value, InterpError> {
    for &index in path {
        value = match value {
            Value::Composite(elements) => usize::try_from(index)
                .ok()
                .and_then(|i| elements.get(i))
                .ok_or(InterpError::IndexOutOfRange {
                    index,
                    len: elements.len(),
                })?,
            _ => return Err(InterpError::Mismatch { expected: "a composite" }),
        };
    }
    Ok(value)
}

fn at_path_mut<'v>(mut value: &'v mut Value, path: &[u64]) -> Result<&'v mut Value, InterpError> {
    for &index in path {
        value = match value {
            Value::Composite(elements) => {
                let len = elements.len();
                usize::try_from(index)
                    .ok()
                    .and_then(|i| elements.get_mut(i))
                    .ok_or(InterpError::IndexOutOfRange { index, len })?
            }
            _ => return Err(InterpError::Mismatch { expected: "a composite" }),
        };
    }
    Ok(value)
}

#[cfg(test)]
#[path = "interp_tests.rs"]
mod tests;
