//! Decides whether a variable can be split into one variable per element.
//!
//! Nothing here mutates the module, so a candidate can be checked any
//! number of times.

use spvopt_ir::{Decoration, Id, InstId, IrContext, Opcode, StorageClass};

use super::uses::{classify, UseKind};
use super::ScalarReplacementConfig;

/// Decorations a replaceable variable may carry
const VARIABLE_DECORATIONS: &[Decoration] = &[
    Decoration::Invariant,
    Decoration::Restrict,
    Decoration::Alignment,
    Decoration::AlignmentId,
    Decoration::MaxByteOffset,
];

/// Decorations the storage type (and pointer type) of a replaceable variable
/// may carry
const TYPE_DECORATIONS: &[Decoration] = &[
    Decoration::RowMajor,
    Decoration::ColMajor,
    Decoration::ArrayStride,
    Decoration::MatrixStride,
    Decoration::CPacked,
    Decoration::Invariant,
    Decoration::Restrict,
    Decoration::Offset,
    Decoration::Alignment,
    Decoration::AlignmentId,
    Decoration::MaxByteOffset,
];

/// Largest aggregate ever split, whatever the configured limit. One
/// variable is created per element.
pub(super) const MAX_SPLIT_ELEMENTS: u64 = 1 << 16;

/// Access counts gathered while checking the uses of a candidate
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct VariableStats {
    pub num_partial_accesses: usize,
    pub num_full_accesses: usize,
}

/// Whether the `OpVariable` at `var` can be replaced
pub(super) fn can_replace(ctx: &IrContext, config: &ScalarReplacementConfig, var: InstId) -> bool {
    let Some(inst) = ctx.inst(var) else {
        return false;
    };
    let (Some(var_id), Some(pointer_type)) = (inst.result_id(), inst.type_id()) else {
        return false;
    };
    if inst.opcode() != Opcode::Variable || inst.storage_class() != Some(StorageClass::Function) {
        return false;
    }
    if !has_allowed_decorations(ctx, pointer_type, TYPE_DECORATIONS) {
        return false;
    }
    let Some(storage_type) = ctx.storage_type_of(inst) else {
        return false;
    };
    if !check_type(ctx, config, storage_type) {
        return false;
    }
    if !has_allowed_decorations(ctx, var_id, VARIABLE_DECORATIONS) {
        return false;
    }

    let mut stats = VariableStats::default();
    let eligible = check_uses(ctx, var_id, &mut stats);
    log::trace!(
        "{var_id}: partial_accesses={}, full_accesses={}",
        stats.num_partial_accesses,
        stats.num_full_accesses
    );
    eligible
}

fn has_allowed_decorations(ctx: &IrContext, id: Id, allowed: &[Decoration]) -> bool {
    ctx.decorations_for(id, false)
        .iter()
        .all(|applied| allowed.contains(&applied.decoration))
}

fn check_type(ctx: &IrContext, config: &ScalarReplacementConfig, type_id: Id) -> bool {
    let Some(def) = ctx.def_inst(type_id) else {
        return false;
    };
    if !has_allowed_decorations(ctx, type_id, TYPE_DECORATIONS) {
        return false;
    }
    let count = match def.opcode() {
        Opcode::TypeStruct => def.num_operands() as u64,
        // A length given by a specialization constant has no value yet.
        Opcode::TypeArray => match def.id_operand(1).and_then(|len| ctx.constant_integer(len)) {
            Some(len) => len,
            None => return false,
        },
        Opcode::TypeVector | Opcode::TypeMatrix if config.scalarize_vectors_and_matrices => {
            match def.literal_operand(1) {
                Some(count) => count,
                None => return false,
            }
        }
        _ => return false,
    };
    count > 0 && count <= MAX_SPLIT_ELEMENTS && !config.exceeds_limit(count)
}

/// Element types of an aggregate, in element order.
///
/// Vectors and matrices are listed even though [`can_replace`] only admits
/// them when `scalarize_vectors_and_matrices` is set. `None` for arrays and
/// vectors longer than [`MAX_SPLIT_ELEMENTS`].
pub(super) fn aggregate_elements(ctx: &IrContext, type_id: Id) -> Option<Vec<Id>> {
    let def = ctx.def_inst(type_id)?;
    let count = match def.opcode() {
        Opcode::TypeStruct => return def.operands().iter().map(|op| op.as_id()).collect(),
        Opcode::TypeArray => ctx.constant_integer(def.id_operand(1)?)?,
        Opcode::TypeVector | Opcode::TypeMatrix => def.literal_operand(1)?,
        _ => return None,
    };
    if count > MAX_SPLIT_ELEMENTS {
        return None;
    }
    Some(vec![def.id_operand(0)?; usize::try_from(count).ok()?])
}

/// Uses of the variable itself. Access chains must select the element with
/// a constant first index.
fn check_uses(ctx: &IrContext, id: Id, stats: &mut VariableStats) -> bool {
    ctx.def_use().uses(id).all(|u| match classify(ctx, u) {
        Some(UseKind::Name | UseKind::Annotation) => true,
        Some(kind @ (UseKind::Load { .. } | UseKind::Store { .. })) => {
            stats.num_full_accesses += 1;
            !kind.is_volatile()
        }
        Some(UseKind::AccessChain { first_index }) => {
            stats.num_partial_accesses += 1;
            first_index.is_some_and(|index| ctx.constant_integer(index).is_some())
                && ctx
                    .inst(u.user)
                    .and_then(|chain| chain.result_id())
                    .is_some_and(|chain| check_uses_relaxed(ctx, chain))
        }
        None => false,
    })
}

/// Uses of a pointer derived from the variable. Further indices are not
/// restricted since the element is already fixed.
fn check_uses_relaxed(ctx: &IrContext, id: Id) -> bool {
    ctx.def_use().uses(id).all(|u| match classify(ctx, u) {
        Some(UseKind::AccessChain { .. }) => ctx
            .inst(u.user)
            .and_then(|chain| chain.result_id())
            .is_some_and(|chain| check_uses_relaxed(ctx, chain)),
        Some(kind @ (UseKind::Load { .. } | UseKind::Store { .. })) => !kind.is_volatile(),
        _ => false,
    })
}
