//! # Optimization Passes
//!
//! Every pass reports a [`Status`] after processing a module and declares
//! which analyses its edits keep valid. The [`PassManager`] runs passes in
//! order, stops at the first failure and rebuilds stale analyses between
//! passes.

pub mod scalar_replacement;

use spvopt_ir::{Analysis, IrContext};
use thiserror::Error;

pub use scalar_replacement::{ScalarReplacementConfig, ScalarReplacementPass};

/// Outcome of running a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The pass hit a condition it cannot handle. The module may already
    /// contain partial edits and should not be emitted.
    Failure,
    SuccessWithoutChange,
    SuccessWithChange,
}

impl Status {
    /// Status of running two passes in sequence
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Failure, _) | (_, Self::Failure) => Self::Failure,
            (Self::SuccessWithChange, _) | (_, Self::SuccessWithChange) => Self::SuccessWithChange,
            _ => Self::SuccessWithoutChange,
        }
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failure)
    }

    pub const fn is_changed(self) -> bool {
        matches!(self, Self::SuccessWithChange)
    }
}

/// A module-level transformation
pub trait Pass {
    /// Name used on the command line and in logs
    fn name(&self) -> &'static str;

    /// Apply this pass to the module owned by `ctx`
    fn process(&mut self, ctx: &mut IrContext) -> Status;

    /// Analyses that remain valid after this pass changed the module
    fn preserved_analyses(&self) -> Analysis {
        Analysis::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("unknown pass `{0}`")]
    UnknownPass(String),
}

/// Settings for the passes that take any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOptions {
    pub scalar_replacement: ScalarReplacementConfig,
}

/// Creates the pass registered under `name`
pub fn create_pass(name: &str, options: &PassOptions) -> Result<Box<dyn Pass>, PassError> {
    match name {
        ScalarReplacementPass::NAME => Ok(Box::new(ScalarReplacementPass::with_config(
            options.scalar_replacement,
        ))),
        _ => Err(PassError::UnknownPass(name.to_string())),
    }
}

/// Runs a sequence of passes over a module
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a pass to the manager
    pub fn add_pass<P: Pass + 'static>(mut self, pass: P) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn push(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// Builds a pipeline from registered pass names
    pub fn from_names<S: AsRef<str>>(
        names: impl IntoIterator<Item = S>,
        options: &PassOptions,
    ) -> Result<Self, PassError> {
        let mut manager = Self::new();
        for name in names {
            manager.push(create_pass(name.as_ref(), options)?);
        }
        Ok(manager)
    }

    /// The default pipeline
    pub fn standard_pipeline(options: &PassOptions) -> Self {
        Self::new().add_pass(ScalarReplacementPass::with_config(options.scalar_replacement))
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run all passes on the module, stopping at the first failure
    pub fn run(&mut self, ctx: &mut IrContext) -> Status {
        let mut status = Status::SuccessWithoutChange;

        for pass in &mut self.passes {
            log::debug!("Running pass '{}'", pass.name());
            let result = pass.process(ctx);
            match result {
                Status::Failure => {
                    log::warn!("Pass '{}' failed", pass.name());
                    return Status::Failure;
                }
                Status::SuccessWithChange => {
                    log::debug!("Pass '{}' modified the module", pass.name());
                    ctx.invalidate_analyses_except(pass.preserved_analyses());
                }
                Status::SuccessWithoutChange => {}
            }
            status = status.combine(result);
        }

        status
    }
}

#[cfg(test)]
#[path = "passes_tests.rs"]
mod tests;
