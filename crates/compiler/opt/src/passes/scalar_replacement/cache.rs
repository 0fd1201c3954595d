//! Per-run caches of the pointer types and null constants synthesized for
//! replacement variables.

use rustc_hash::FxHashMap;
use spvopt_ir::{Extension, Id, Instruction, IrContext, IrError, Opcode, Operand, Section, StorageClass};

#[derive(Debug, Default)]
pub(super) struct TypeCache {
    /// Pointee type id to its Function-storage pointer type
    pointers: FxHashMap<Id, Id>,
    /// Storage type id to its `OpConstantNull`
    nulls: FxHashMap<Id, Id>,
}

impl TypeCache {
    pub(super) fn clear(&mut self) {
        self.pointers.clear();
        self.nulls.clear();
    }

    /// A Function-storage pointer type whose pointee operand is exactly
    /// `pointee`, declared if the module has none
    pub(super) fn pointer_type(&mut self, ctx: &mut IrContext, pointee: Id) -> Result<Id, IrError> {
        if let Some(&pointer) = self.pointers.get(&pointee) {
            return Ok(pointer);
        }

        let pointer = match canonical_pointer(ctx, pointee)? {
            Some(pointer) => pointer,
            None => match existing_pointer(ctx, pointee) {
                Some(pointer) => pointer,
                None => {
                    let pointer = ctx.take_next_id()?;
                    ctx.add_type(Instruction::new(
                        Opcode::TypePointer,
                        None,
                        Some(pointer),
                        [
                            Operand::StorageClass(StorageClass::Function),
                            Operand::Id(pointee),
                        ],
                    ));
                    log::debug!("declared pointer type {pointer} to {pointee}");
                    pointer
                }
            },
        };

        self.pointers.insert(pointee, pointer);
        Ok(pointer)
    }

    /// The null constant of `ty`, declared on first request
    pub(super) fn null_constant(&mut self, ctx: &mut IrContext, ty: Id) -> Result<Id, IrError> {
        if let Some(&null) = self.nulls.get(&ty) {
            return Ok(null);
        }
        let null = ctx.take_next_id()?;
        ctx.add_global_value(Instruction::new(Opcode::ConstantNull, Some(ty), Some(null), []));
        self.nulls.insert(ty, null);
        Ok(null)
    }
}

/// An already declared Function-storage pointer to exactly `pointee`. With
/// variable pointers enabled, decorated pointer types are not reused.
fn existing_pointer(ctx: &IrContext, pointee: Id) -> Option<Id> {
    let variable_pointers = ctx.has_extension(Extension::KhrVariablePointers);
    ctx.module()
        .section(Section::TypesValues)
        .iter()
        .filter_map(|&inst| ctx.inst(inst))
        .filter(|inst| {
            inst.opcode() == Opcode::TypePointer
                && inst.operand(0).and_then(Operand::as_storage_class) == Some(StorageClass::Function)
                && inst.id_operand(1) == Some(pointee)
        })
        .filter_map(|inst| inst.result_id())
        .find(|&pointer| !variable_pointers || ctx.decorations_for(pointer, false).is_empty())
}

/// The type manager's pointer type, usable only when `pointee` is the
/// canonical declaration of its type
fn canonical_pointer(ctx: &mut IrContext, pointee: Id) -> Result<Option<Id>, IrError> {
    let (pointee_type, pointer_type) = ctx
        .types()
        .get_type_and_pointer_type(pointee, StorageClass::Function)
        .ok_or(IrError::NotAType(pointee))?;
    if ctx.types().get_id(&pointee_type) != Some(pointee) {
        return Ok(None);
    }
    let pointer = ctx.get_type_instruction(&pointer_type)?;
    // A declared pointer to a duplicate of `pointee` is structurally equal
    // but would give loads the wrong result type.
    Ok((ctx.pointee_type_id(pointer) == Some(pointee)).then_some(pointer))
}
