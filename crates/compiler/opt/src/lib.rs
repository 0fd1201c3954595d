//! # spvopt Optimizer
//!
//! Transformation passes over an [`spvopt_ir::IrContext`] and the
//! [`PassManager`] that sequences them.
//!
//! ```text
//! let mut ctx = IrContext::new(module);
//! let status = PassManager::new()
//!     .add_pass(ScalarReplacementPass::new())
//!     .run(&mut ctx);
//! ```

pub mod passes;

pub use passes::scalar_replacement::{
    ScalarReplacementConfig, ScalarReplacementError, ScalarReplacementPass,
};
pub use passes::{create_pass, Pass, PassError, PassManager, PassOptions, Status};
