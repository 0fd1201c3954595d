//! # Scalar Replacement of Aggregates
//!
//! Splits Function-storage variables of struct or array type into one
//! variable per element, so later passes see scalar memory only.
//!
//! ## Eligibility
//!
//! A variable is replaced when all of the following hold:
//!
//! 1. Its storage class is `Function`.
//! 2. Its pointer type, its storage type and the variable itself carry no
//!    decoration outside a small allow-list (layout and alignment
//!    decorations, `Invariant`, `Restrict`).
//! 3. Its storage type is a struct with at least one member or an array
//!    with a constant length, in both cases with at most
//!    [`ScalarReplacementConfig::max_num_elements`] elements.
//! 4. Every use is a non-volatile whole load or store, a debug name, or an
//!    access chain whose first index is an integer constant. Pointers
//!    derived from such an access chain may only be loaded, stored or
//!    indexed further.
//!
//! ## Rewriting
//!
//! ```text
//! %v = OpVariable %ptr_S Function          %v1 = OpVariable %ptr_int Function
//!                                          %v0 = OpVariable %ptr_int Function
//! %x = OpLoad %S %v                  =>    %a = OpLoad %int %v0
//!                                          %b = OpLoad %int %v1
//!                                          %x' = OpCompositeConstruct %S %a %b
//! %p = OpAccessChain %ptr_int %v %c1 =>    (uses of %p now use %v1)
//! ```
//!
//! Whole stores become one `OpCompositeExtract` and store per element.
//! Initializers are narrowed per element. `Invariant` and `Restrict` are
//! copied onto every replacement. Replacements that are themselves
//! aggregates go back on the worklist, so nested aggregates are split all
//! the way down.
//!
//! An access chain whose constant index is out of range makes the pass fail.
//! Edits made before the failure are not undone.

mod cache;
mod eligibility;
mod replacement;
mod rewrite;
mod uses;

use std::collections::VecDeque;

use spvopt_ir::{Analysis, FunctionId, Id, InstId, IrContext, IrError, Opcode};
use thiserror::Error;

use self::cache::TypeCache;
use super::{Pass, Status};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScalarReplacementError {
    #[error("access chain {chain} selects element {index} of an aggregate with {len} elements")]
    OutOfBoundsAccess { chain: Id, index: u64, len: usize },

    #[error("access chain {chain} has no constant first index")]
    NonConstantIndex { chain: Id },

    #[error("initializer {initializer} of {variable} cannot be split per element")]
    UnsupportedInitializer { variable: Id, initializer: Id },

    #[error("{0} is not an aggregate")]
    NotAnAggregate(Id),

    #[error(transparent)]
    Ir(#[from] IrError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarReplacementConfig {
    /// Largest aggregate that is split. 0 means no limit.
    pub max_num_elements: usize,
    /// Also split vectors and matrices. Off by default.
    pub scalarize_vectors_and_matrices: bool,
}

impl Default for ScalarReplacementConfig {
    fn default() -> Self {
        Self {
            max_num_elements: 100,
            scalarize_vectors_and_matrices: false,
        }
    }
}

impl ScalarReplacementConfig {
    /// Whether an aggregate of `count` elements is too large to split
    pub const fn exceeds_limit(&self, count: u64) -> bool {
        self.max_num_elements != 0 && count > self.max_num_elements as u64
    }
}

#[derive(Debug, Default)]
struct Stats {
    variables_replaced: usize,
    replacements_created: usize,
    unused_replacements: usize,
    loads_rewritten: usize,
    stores_rewritten: usize,
    access_chains_rewritten: usize,
}

#[derive(Debug, Default)]
pub struct ScalarReplacementPass {
    config: ScalarReplacementConfig,
    cache: TypeCache,
    stats: Stats,
    last_error: Option<ScalarReplacementError>,
}

impl ScalarReplacementPass {
    pub const NAME: &'static str = "scalar-replacement";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScalarReplacementConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Conservative configuration for testing
    pub fn conservative() -> Self {
        Self::with_config(ScalarReplacementConfig {
            max_num_elements: 4,
            scalarize_vectors_and_matrices: false,
        })
    }

    pub const fn config(&self) -> &ScalarReplacementConfig {
        &self.config
    }

    /// The error that made the last run fail
    pub const fn last_error(&self) -> Option<&ScalarReplacementError> {
        self.last_error.as_ref()
    }

    /// Whether the `OpVariable` at `var` would be replaced
    pub fn can_replace(&self, ctx: &IrContext, var: InstId) -> bool {
        eligibility::can_replace(ctx, &self.config, var)
    }

    /// Replaces the eligible variables of one function. Returns whether
    /// anything changed.
    fn process_function(
        &mut self,
        ctx: &mut IrContext,
        function: FunctionId,
    ) -> Result<bool, ScalarReplacementError> {
        let Some(entry) = ctx
            .module()
            .function(function)
            .and_then(|f| f.entry_block().and_then(|entry| f.block(entry)))
        else {
            return Ok(false);
        };

        // Function variables all sit at the top of the entry block.
        let mut worklist: VecDeque<InstId> = entry
            .instructions()
            .iter()
            .copied()
            .take_while(|&inst| ctx.inst(inst).is_some_and(|i| i.opcode() == Opcode::Variable))
            .filter(|&inst| self.can_replace(ctx, inst))
            .collect();
        let changed = !worklist.is_empty();

        while let Some(var) = worklist.pop_front() {
            self.replace_variable(ctx, var, &mut worklist)?;
        }
        Ok(changed)
    }

    fn replace_variable(
        &mut self,
        ctx: &mut IrContext,
        var: InstId,
        worklist: &mut VecDeque<InstId>,
    ) -> Result<(), ScalarReplacementError> {
        let var_id = ctx
            .inst(var)
            .and_then(|inst| inst.result_id())
            .ok_or(IrError::DeadInstruction(var))?;

        let replacements = replacement::create_replacements(ctx, &mut self.cache, var)?;
        log::debug!("Replacing {var_id} with {} variables", replacements.len());
        self.stats.variables_replaced += 1;
        self.stats.replacements_created += replacements.len();

        let dead = rewrite::replace_uses(ctx, var, &replacements, &mut self.stats)?;
        for inst in dead.into_iter().rev() {
            ctx.kill_inst(inst);
        }

        for replacement in replacements {
            if ctx.def_use().num_users(replacement.id) == 0 {
                ctx.kill_inst(replacement.inst);
                self.stats.unused_replacements += 1;
            } else if self.can_replace(ctx, replacement.inst) {
                worklist.push_back(replacement.inst);
            }
        }
        Ok(())
    }
}

impl Pass for ScalarReplacementPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn process(&mut self, ctx: &mut IrContext) -> Status {
        self.cache.clear();
        self.stats = Stats::default();
        self.last_error = None;

        let functions: Vec<FunctionId> = ctx.module().functions().map(|(id, _)| id).collect();
        let mut modified = false;
        for function in functions {
            match self.process_function(ctx, function) {
                Ok(changed) => modified |= changed,
                Err(err) => {
                    log::warn!("Scalar replacement failed: {err}");
                    self.last_error = Some(err);
                    return Status::Failure;
                }
            }
        }

        if !modified {
            return Status::SuccessWithoutChange;
        }
        log::debug!(
            "SROA pass stats: variables={}, replacements={}, unused={}, loads={}, stores={}, access_chains={}",
            self.stats.variables_replaced,
            self.stats.replacements_created,
            self.stats.unused_replacements,
            self.stats.loads_rewritten,
            self.stats.stores_rewritten,
            self.stats.access_chains_rewritten
        );
        Status::SuccessWithChange
    }

    fn preserved_analyses(&self) -> Analysis {
        Analysis::DEF_USE
            | Analysis::INSTR_TO_BLOCK_MAPPING
            | Analysis::DECORATIONS
            | Analysis::COMBINATORS
            | Analysis::CFG
            | Analysis::NAME_MAP
    }
}

#[cfg(test)]
#[path = "scalar_replacement_tests.rs"]
mod tests;
