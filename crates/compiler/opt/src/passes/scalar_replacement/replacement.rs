//! Creation of the per-element variables replacing an aggregate variable.

use spvopt_ir::{
    Decoration, Id, InstId, Instruction, IrContext, IrError, Opcode, Operand, StorageClass,
};

use super::cache::TypeCache;
use super::eligibility::aggregate_elements;
use super::ScalarReplacementError;

/// A variable standing in for one element of a replaced aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Replacement {
    pub inst: InstId,
    pub id: Id,
    /// Type of the element, i.e. the pointee of the new variable
    pub storage_type: Id,
}

/// Declares one Function variable per element of `var`'s storage type at
/// the start of its block. The result is in element order.
pub(super) fn create_replacements(
    ctx: &mut IrContext,
    cache: &mut TypeCache,
    var: InstId,
) -> Result<Vec<Replacement>, ScalarReplacementError> {
    let inst = ctx.inst(var).cloned().ok_or(IrError::DeadInstruction(var))?;
    let var_id = inst.result_id().ok_or(IrError::DeadInstruction(var))?;
    let storage_type = ctx
        .storage_type_of(&inst)
        .ok_or(ScalarReplacementError::NotAnAggregate(var_id))?;
    let elements = aggregate_elements(ctx, storage_type)
        .ok_or(ScalarReplacementError::NotAnAggregate(storage_type))?;
    let (function, block) = ctx.instr_block(var).ok_or(IrError::NotInBlock(var))?;

    let mut replacements = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let pointer = cache.pointer_type(ctx, element)?;
        let id = ctx.take_next_id()?;
        let initializer = match inst.initializer() {
            Some(init) => {
                narrowed_initializer(ctx, cache, var_id, storage_type, init, index, element)?
            }
            None => None,
        };
        let new_var = ctx.insert_at_block_start(
            function,
            block,
            Instruction::variable(pointer, id, StorageClass::Function, initializer),
        );
        replacements.push(Replacement {
            inst: new_var,
            id,
            storage_type: element,
        });
    }

    transfer_annotations(ctx, var_id, &replacements);
    Ok(replacements)
}

/// Initializer of element `index`, given the initializer of the whole
/// variable. `None` when the element is undefined.
fn narrowed_initializer(
    ctx: &mut IrContext,
    cache: &mut TypeCache,
    var_id: Id,
    aggregate_type: Id,
    init: Id,
    index: usize,
    element_type: Id,
) -> Result<Option<Id>, ScalarReplacementError> {
    let def = ctx.def_inst(init).ok_or(IrError::UndefinedId(init))?;
    let unsupported = ScalarReplacementError::UnsupportedInitializer {
        variable: var_id,
        initializer: init,
    };

    match def.opcode() {
        Opcode::ConstantNull => Ok(Some(cache.null_constant(ctx, element_type)?)),
        opcode if opcode.is_spec_constant() => {
            let id = ctx.take_next_id()?;
            ctx.add_global_value(Instruction::new(
                Opcode::SpecConstantOp,
                Some(element_type),
                Some(id),
                [
                    Operand::Opcode(Opcode::CompositeExtract),
                    Operand::Id(init),
                    Operand::Literal(index as u64),
                ],
            ));
            Ok(Some(id))
        }
        Opcode::ConstantComposite => {
            let component = def.id_operand(index).ok_or(unsupported)?;
            let undefined = ctx
                .def_inst(component)
                .is_some_and(|c| c.opcode() == Opcode::Undef);
            Ok((!undefined).then_some(component))
        }
        opcode => {
            // An initializer of the right type is always one of the kinds above.
            debug_assert_ne!(
                def.type_id(),
                Some(aggregate_type),
                "{var_id} has an unhandled {opcode} initializer {init}"
            );
            Err(unsupported)
        }
    }
}

/// Copies the `Invariant` and `Restrict` decorations of the source variable
/// onto every replacement
fn transfer_annotations(ctx: &mut IrContext, var_id: Id, replacements: &[Replacement]) {
    for applied in ctx.decorations_for(var_id, false) {
        if applied.member.is_some()
            || !matches!(applied.decoration, Decoration::Invariant | Decoration::Restrict)
        {
            continue;
        }
        for replacement in replacements {
            let operands = [
                Operand::Id(replacement.id),
                Operand::Decoration(applied.decoration),
            ]
            .into_iter()
            .chain(applied.params.iter().cloned());
            ctx.add_annotation(Instruction::new(Opcode::Decorate, None, None, operands));
        }
    }
}
