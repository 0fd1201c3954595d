//! # Type Manager
//!
//! Structural view of the type declarations of a module. SPIR-V allows the
//! same structural type to be declared several times (for instance with
//! different decorations, or plain duplicates); the first declaration of a
//! structural type is its canonical id.
//!
//! Component types are recorded by their canonical id, so two struct
//! declarations whose members are duplicate declarations of the same type
//! compare equal.

use rustc_hash::FxHashMap;
use spvopt_common::{Decoration, Opcode, StorageClass};

use crate::decoration::decorations_for;
use crate::{DefUseIndex, Id, Instruction, Module, Operand, PrettyPrint};

/// Length of an `OpTypeArray`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    /// Length given by a regular integer constant
    Constant(u64),
    /// Length given by a specialization constant, unknown until specialization
    Spec(Id),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { component: Id, count: u32 },
    Matrix { column: Id, count: u32 },
    Array { element: Id, length: ArrayLength },
    RuntimeArray { element: Id },
    Struct { members: Vec<Id> },
    Pointer { storage: StorageClass, pointee: Id },
    Function { ret: Id, params: Vec<Id> },
    /// Any type the manager does not model structurally. Such types are only
    /// equal to themselves.
    Opaque { opcode: Opcode, id: Id },
}

/// A decoration folded into type identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeDecoration {
    pub member: Option<u32>,
    pub decoration: Decoration,
    pub params: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub kind: TypeKind,
    /// Sorted decorations
    pub decorations: Vec<TypeDecoration>,
}

impl Type {
    pub const fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            decorations: Vec::new(),
        }
    }

    pub const fn pointer(storage: StorageClass, pointee: Id) -> Self {
        Self::new(TypeKind::Pointer { storage, pointee })
    }

    pub fn is_decorated(&self) -> bool {
        !self.decorations.is_empty()
    }

    /// Number of elements of a composite, when statically known
    pub fn element_count(&self) -> Option<u64> {
        match &self.kind {
            TypeKind::Struct { members } => Some(members.len() as u64),
            TypeKind::Array {
                length: ArrayLength::Constant(len),
                ..
            } => Some(*len),
            TypeKind::Vector { count, .. } | TypeKind::Matrix { count, .. } => {
                Some(u64::from(*count))
            }
            _ => None,
        }
    }

    /// Type of element `index` of a composite
    pub fn element_type(&self, index: usize) -> Option<Id> {
        match &self.kind {
            TypeKind::Struct { members } => members.get(index).copied(),
            TypeKind::Array { element, .. } | TypeKind::RuntimeArray { element } => Some(*element),
            TypeKind::Vector { component, .. } => Some(*component),
            TypeKind::Matrix { column, .. } => Some(*column),
            _ => None,
        }
    }
}

impl PrettyPrint for Type {
    fn pretty_print(&self, _indent: usize) -> String {
        let kind = match &self.kind {
            TypeKind::Void => "void".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Int { width, signed: true } => format!("i{width}"),
            TypeKind::Int { width, signed: false } => format!("u{width}"),
            TypeKind::Float { width } => format!("f{width}"),
            TypeKind::Vector { component, count } => format!("vec{count}<{component}>"),
            TypeKind::Matrix { column, count } => format!("mat{count}<{column}>"),
            TypeKind::Array {
                element,
                length: ArrayLength::Constant(len),
            } => format!("[{element}; {len}]"),
            TypeKind::Array {
                element,
                length: ArrayLength::Spec(len),
            } => format!("[{element}; {len}]"),
            TypeKind::RuntimeArray { element } => format!("[{element}]"),
            TypeKind::Struct { members } => {
                let members: Vec<_> = members.iter().map(ToString::to_string).collect();
                format!("{{{}}}", members.join(", "))
            }
            TypeKind::Pointer { storage, pointee } => format!("*{storage} {pointee}"),
            TypeKind::Function { ret, params } => {
                let params: Vec<_> = params.iter().map(ToString::to_string).collect();
                format!("fn({}) -> {ret}", params.join(", "))
            }
            TypeKind::Opaque { opcode, id } => format!("{opcode} {id}"),
        };
        if self.decorations.is_empty() {
            kind
        } else {
            let decorations: Vec<_> = self
                .decorations
                .iter()
                .map(|d| match d.member {
                    Some(member) => format!("{member}:{}", d.decoration),
                    None => d.decoration.to_string(),
                })
                .collect();
            format!("{kind} [{}]", decorations.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeManager {
    id_to_type: FxHashMap<Id, Type>,
    type_to_id: FxHashMap<Type, Id>,
}

impl TypeManager {
    /// Builds the manager from the type declarations of `module`
    pub fn build(module: &Module, def_use: &DefUseIndex) -> Self {
        let mut types = Self::default();
        for &inst in module.section(crate::Section::TypesValues) {
            let Some(inst) = module.inst(inst) else {
                continue;
            };
            if !inst.opcode().is_type() {
                continue;
            }
            if let Some(ty) = types.type_of_instruction(module, def_use, inst) {
                if let Some(id) = inst.result_id() {
                    types.register_type(id, ty);
                }
            }
        }
        types
    }

    /// Structural type declared by `inst`, with its decorations
    pub fn type_of_instruction(
        &self,
        module: &Module,
        def_use: &DefUseIndex,
        inst: &Instruction,
    ) -> Option<Type> {
        let result = inst.result_id()?;
        let literal = |i: usize| inst.literal_operand(i).map(|v| v as u32);
        let id = |i: usize| inst.id_operand(i).map(|id| self.canonical(id));
        let kind = match inst.opcode() {
            Opcode::TypeVoid => TypeKind::Void,
            Opcode::TypeBool => TypeKind::Bool,
            Opcode::TypeInt => TypeKind::Int {
                width: literal(0)?,
                signed: literal(1)? != 0,
            },
            Opcode::TypeFloat => TypeKind::Float { width: literal(0)? },
            Opcode::TypeVector => TypeKind::Vector {
                component: id(0)?,
                count: literal(1)?,
            },
            Opcode::TypeMatrix => TypeKind::Matrix {
                column: id(0)?,
                count: literal(1)?,
            },
            Opcode::TypeArray => {
                let length_id = inst.id_operand(1)?;
                let length = match module.inst(def_use.get_def(length_id)?)? {
                    def if def.opcode() == Opcode::Constant => {
                        ArrayLength::Constant(def.literal_operand(0)?)
                    }
                    def if def.opcode() == Opcode::ConstantNull => ArrayLength::Constant(0),
                    _ => ArrayLength::Spec(length_id),
                };
                TypeKind::Array {
                    element: id(0)?,
                    length,
                }
            }
            Opcode::TypeRuntimeArray => TypeKind::RuntimeArray { element: id(0)? },
            Opcode::TypeStruct => TypeKind::Struct {
                members: (0..inst.num_operands()).map(id).collect::<Option<_>>()?,
            },
            Opcode::TypePointer => TypeKind::Pointer {
                storage: inst.operand(0)?.as_storage_class()?,
                pointee: id(1)?,
            },
            Opcode::TypeFunction => TypeKind::Function {
                ret: id(0)?,
                params: (1..inst.num_operands()).map(id).collect::<Option<_>>()?,
            },
            opcode => TypeKind::Opaque { opcode, id: result },
        };
        let mut decorations: Vec<_> = decorations_for(module, def_use, result, false)
            .into_iter()
            .map(|d| TypeDecoration {
                member: d.member,
                decoration: d.decoration,
                params: d.params.iter().filter_map(Operand::as_literal).collect(),
            })
            .collect();
        decorations.sort();
        Some(Type { kind, decorations })
    }

    /// Records `ty` as the type declared by `id`. The first id registered for
    /// a structural type stays canonical.
    pub fn register_type(&mut self, id: Id, ty: Type) {
        self.type_to_id.entry(ty.clone()).or_insert(id);
        self.id_to_type.insert(id, ty);
    }

    /// Forgets a killed type declaration
    pub fn remove_id(&mut self, id: Id) {
        let Some(ty) = self.id_to_type.remove(&id) else {
            return;
        };
        if self.type_to_id.get(&ty) == Some(&id) {
            self.type_to_id.remove(&ty);
            // Promote a remaining duplicate, if any.
            let replacement = self
                .id_to_type
                .iter()
                .filter(|(_, other)| **other == ty)
                .map(|(&other, _)| other)
                .min();
            if let Some(other) = replacement {
                self.type_to_id.insert(ty, other);
            }
        }
    }

    pub fn get_type(&self, id: Id) -> Option<&Type> {
        self.id_to_type.get(&id)
    }

    /// Canonical id of a structural type
    pub fn get_id(&self, ty: &Type) -> Option<Id> {
        self.type_to_id.get(ty).copied()
    }

    /// Canonical id of the type declared by `id` (itself if unknown)
    pub fn canonical(&self, id: Id) -> Id {
        self.get_type(id)
            .and_then(|ty| self.get_id(ty))
            .unwrap_or(id)
    }

    /// The type declared by `type_id` and the structural pointer type to it
    /// in `storage`. The pointer type may not be declared yet.
    pub fn get_type_and_pointer_type(
        &self,
        type_id: Id,
        storage: StorageClass,
    ) -> Option<(Type, Type)> {
        let ty = self.get_type(type_id)?.clone();
        let pointer = Type::pointer(storage, self.canonical(type_id));
        Some((ty, pointer))
    }

    pub fn len(&self) -> usize {
        self.id_to_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_type.is_empty()
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
