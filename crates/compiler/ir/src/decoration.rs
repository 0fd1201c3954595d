//! Decoration queries derived from the def-use index.
//!
//! Decorations are not stored separately: the users of an id that are
//! decoration instructions targeting it (directly or through a decoration
//! group) are its decorations.

use spvopt_common::{Decoration, Opcode};

use crate::{DefUseIndex, Id, InstId, Module, Operand, UseSlot};

/// A decoration in effect on some id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDecoration {
    /// The `OpDecorate`/`OpMemberDecorate` carrying the decoration. For
    /// decorations applied through a group this targets the group.
    pub inst: InstId,
    /// Struct member the decoration applies to, if any
    pub member: Option<u32>,
    pub decoration: Decoration,
    /// Extra operands following the decoration enumerant
    pub params: Vec<Operand>,
}

/// Splits a decorate instruction into (member, decoration, params)
fn decoded(module: &Module, inst: InstId) -> Option<(Option<u32>, Decoration, Vec<Operand>)> {
    let inst = module.inst(inst)?;
    let (member, at) = match inst.opcode() {
        Opcode::Decorate | Opcode::DecorateId => (None, 1),
        Opcode::MemberDecorate => (inst.literal_operand(1).map(|m| m as u32), 2),
        _ => return None,
    };
    let decoration = inst.operand(at)?.as_decoration()?;
    Some((member, decoration, inst.operands()[at + 1..].to_vec()))
}

/// Returns every decoration applying to `id`, in the order the decorating
/// instructions were created.
///
/// `LinkageAttributes` is only reported when `include_linkage` is set.
pub fn decorations_for(
    module: &Module,
    def_use: &DefUseIndex,
    id: Id,
    include_linkage: bool,
) -> Vec<AppliedDecoration> {
    let mut found = Vec::new();
    for u in def_use.uses(id) {
        let Some(user) = module.inst(u.user) else {
            continue;
        };
        match user.opcode() {
            Opcode::Decorate | Opcode::DecorateId | Opcode::MemberDecorate
                if u.slot == UseSlot::Operand(0) =>
            {
                if let Some((member, decoration, params)) = decoded(module, u.user) {
                    found.push(AppliedDecoration {
                        inst: u.user,
                        member,
                        decoration,
                        params,
                    });
                }
            }
            Opcode::GroupDecorate | Opcode::GroupMemberDecorate => {
                let UseSlot::Operand(position) = u.slot else {
                    continue;
                };
                if position == 0 {
                    continue;
                }
                // Group member targets come in (id, member) pairs.
                let member = match user.opcode() {
                    Opcode::GroupMemberDecorate if position % 2 == 1 => {
                        user.literal_operand(position + 1).map(|m| m as u32)
                    }
                    Opcode::GroupMemberDecorate => continue,
                    _ => None,
                };
                let Some(group) = user.id_operand(0) else {
                    continue;
                };
                for mut applied in decorations_for(module, def_use, group, true) {
                    applied.member = member.or(applied.member);
                    found.push(applied);
                }
            }
            _ => {}
        }
    }
    if !include_linkage {
        found.retain(|d| d.decoration != Decoration::LinkageAttributes);
    }
    found
}
