//! Rewrites the users of a replaced variable in terms of its replacements.

use spvopt_ir::{Id, InstId, Instruction, IrContext, IrError, Operand, Use};

use super::replacement::Replacement;
use super::uses::{classify, UseKind};
use super::{ScalarReplacementError, Stats};

/// Redirects every load, store and access chain of `var` to the
/// replacements. Returns the instructions left dead, in the order they were
/// found.
pub(super) fn replace_uses(
    ctx: &mut IrContext,
    var: InstId,
    replacements: &[Replacement],
    stats: &mut Stats,
) -> Result<Vec<InstId>, ScalarReplacementError> {
    let var_id = ctx
        .inst(var)
        .and_then(Instruction::result_id)
        .ok_or(IrError::DeadInstruction(var))?;
    let mut uses: Vec<Use> = ctx.def_use().uses(var_id).collect();
    uses.dedup_by_key(|u| u.user);

    let mut dead = vec![var];
    uses.into_iter().try_for_each(|u| {
        match classify(ctx, u) {
            Some(UseKind::Load { .. }) => {
                replace_whole_load(ctx, u.user, replacements)?;
                stats.loads_rewritten += 1;
            }
            Some(UseKind::Store { .. }) => {
                replace_whole_store(ctx, u.user, replacements)?;
                stats.stores_rewritten += 1;
            }
            Some(UseKind::AccessChain { first_index }) => {
                replace_access_chain(ctx, u.user, first_index, replacements)?;
                stats.access_chains_rewritten += 1;
            }
            Some(UseKind::Name | UseKind::Annotation) => return Ok(()),
            None => unreachable!("{var_id} has a use eligibility checking should have rejected"),
        }
        dead.push(u.user);
        Ok::<(), ScalarReplacementError>(())
    })?;

    Ok(dead)
}

/// `%x = OpLoad %T %var` becomes one load per replacement and a
/// `OpCompositeConstruct %T` of the loaded values
fn replace_whole_load(
    ctx: &mut IrContext,
    load: InstId,
    replacements: &[Replacement],
) -> Result<(), ScalarReplacementError> {
    let inst = ctx.inst(load).cloned().ok_or(IrError::DeadInstruction(load))?;
    let (Some(ty), Some(result)) = (inst.type_id(), inst.result_id()) else {
        return Err(IrError::DeadInstruction(load).into());
    };

    let mut loaded = Vec::with_capacity(replacements.len());
    for replacement in replacements {
        let id = ctx.take_next_id()?;
        let mut new_load = Instruction::load(replacement.storage_type, id, replacement.id);
        for operand in inst.operands().iter().skip(1) {
            new_load.push_operand(operand.clone());
        }
        ctx.insert_before(load, new_load)?;
        loaded.push(id);
    }

    let composite = ctx.take_next_id()?;
    ctx.insert_before(load, Instruction::composite_construct(ty, composite, loaded))?;
    ctx.replace_all_uses_with(result, composite);
    Ok(())
}

/// `OpStore %var %x` becomes, per replacement, an `OpCompositeExtract` of
/// the element from `%x` and a store of it
fn replace_whole_store(
    ctx: &mut IrContext,
    store: InstId,
    replacements: &[Replacement],
) -> Result<(), ScalarReplacementError> {
    let inst = ctx.inst(store).cloned().ok_or(IrError::DeadInstruction(store))?;
    let object = inst.id_operand(1).ok_or(IrError::DeadInstruction(store))?;

    for (index, replacement) in replacements.iter().enumerate() {
        let extract = ctx.take_next_id()?;
        ctx.insert_before(
            store,
            Instruction::composite_extract(replacement.storage_type, extract, object, index as u32),
        )?;
        let mut new_store = Instruction::store(replacement.id, extract);
        for operand in inst.operands().iter().skip(2) {
            new_store.push_operand(operand.clone());
        }
        ctx.insert_before(store, new_store)?;
    }
    Ok(())
}

/// Re-roots an access chain at the replacement its first index selects
fn replace_access_chain(
    ctx: &mut IrContext,
    chain: InstId,
    first_index: Option<Id>,
    replacements: &[Replacement],
) -> Result<(), ScalarReplacementError> {
    let inst = ctx.inst(chain).cloned().ok_or(IrError::DeadInstruction(chain))?;
    let result = inst.result_id().ok_or(IrError::DeadInstruction(chain))?;
    let index = first_index
        .and_then(|index| ctx.constant_integer(index))
        .ok_or(ScalarReplacementError::NonConstantIndex { chain: result })?;

    let Some(replacement) = usize::try_from(index).ok().and_then(|i| replacements.get(i)) else {
        return Err(ScalarReplacementError::OutOfBoundsAccess {
            chain: result,
            index,
            len: replacements.len(),
        });
    };

    if inst.num_operands() > 2 {
        let id = ctx.take_next_id()?;
        let operands = std::iter::once(Operand::Id(replacement.id))
            .chain(inst.operands().iter().skip(2).cloned());
        ctx.insert_before(
            chain,
            Instruction::new(inst.opcode(), inst.type_id(), Some(id), operands),
        )?;
        ctx.replace_all_uses_with(result, id);
    } else {
        ctx.replace_all_uses_with(result, replacement.id);
    }
    Ok(())
}
