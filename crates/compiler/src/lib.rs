//! # spvopt
//!
//! Optimizer driver: assembles a text module, runs a pass pipeline over it
//! and hands back the result for disassembly.

pub mod config;

pub use config::{ConfigError, OptimizerConfig, ScalarReplacementSection};

use spvopt_asm::{assemble, AsmError};
use spvopt_ir::{IrContext, Module, ValidationError};
use spvopt_opt::{PassError, PassManager, PassOptions, Status};
use thiserror::Error;

/// Errors that stop an optimization run
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Parse(#[from] AsmError),

    #[error("input module is invalid: {0}")]
    InvalidInput(ValidationError),

    #[error("optimized module is invalid: {0}")]
    InvalidOutput(ValidationError),

    #[error(transparent)]
    Pipeline(#[from] PassError),

    #[error("pass pipeline failed (run with --verbose for details)")]
    PassFailed,
}

/// What to run and how
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizerOptions {
    /// Registered pass names in order. Empty means the standard pipeline.
    pub passes: Vec<String>,
    pub pass_options: PassOptions,
    /// Validate the module before and after optimizing
    pub validate: bool,
}

impl OptimizerOptions {
    pub fn pass_manager(&self) -> Result<PassManager, PassError> {
        if self.passes.is_empty() {
            Ok(PassManager::standard_pipeline(&self.pass_options))
        } else {
            PassManager::from_names(&self.passes, &self.pass_options)
        }
    }
}

#[derive(Debug)]
pub struct Optimized {
    pub module: Module,
    pub status: Status,
}

/// Optimizes a module given in assembly text
pub fn optimize(source: &str, options: &OptimizerOptions) -> Result<Optimized, OptimizeError> {
    let module = assemble(source)?.module;
    optimize_module(module, options)
}

pub fn optimize_module(
    module: Module,
    options: &OptimizerOptions,
) -> Result<Optimized, OptimizeError> {
    let mut manager = options.pass_manager()?;
    if options.validate {
        module.validate().map_err(OptimizeError::InvalidInput)?;
    }

    log::debug!("Running pipeline {:?}", manager.pass_names());
    let mut ctx = IrContext::new(module);
    let status = manager.run(&mut ctx);
    if status.is_failure() {
        return Err(OptimizeError::PassFailed);
    }

    let module = ctx.into_module();
    if options.validate {
        module.validate().map_err(OptimizeError::InvalidOutput)?;
    }
    Ok(Optimized { module, status })
}
