//! Classification of the uses of a candidate pointer.
//!
//! Eligibility checking and rewriting walk the same uses and must agree on
//! what each one is, so both go through [`classify`].

use spvopt_ir::{Id, IrContext, Opcode, Use, UseSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum UseKind {
    /// `OpLoad` through the pointer
    Load { volatile: bool },
    /// `OpStore` to the pointer (not of it)
    Store { volatile: bool },
    /// Access chain based on the pointer, with its first index if any
    AccessChain { first_index: Option<Id> },
    /// `OpName` or `OpMemberName`
    Name,
    Annotation,
}

impl UseKind {
    pub(super) const fn is_volatile(self) -> bool {
        matches!(
            self,
            Self::Load { volatile: true } | Self::Store { volatile: true }
        )
    }
}

/// What `u` does with the pointer. `None` for any use scalar replacement
/// cannot rewrite.
pub(super) fn classify(ctx: &IrContext, u: Use) -> Option<UseKind> {
    let user = ctx.inst(u.user)?;
    let kind = match (user.opcode(), u.slot) {
        (Opcode::Load, UseSlot::Operand(0)) => UseKind::Load {
            volatile: user.is_volatile_access(),
        },
        (Opcode::Store, UseSlot::Operand(0)) => UseKind::Store {
            volatile: user.is_volatile_access(),
        },
        (Opcode::AccessChain | Opcode::InBoundsAccessChain, UseSlot::Operand(0)) => {
            UseKind::AccessChain {
                first_index: user.id_operand(1),
            }
        }
        (Opcode::Name | Opcode::MemberName, UseSlot::Operand(0)) => UseKind::Name,
        (opcode, _) if opcode.is_annotation() => UseKind::Annotation,
        _ => return None,
    };
    Some(kind)
}
