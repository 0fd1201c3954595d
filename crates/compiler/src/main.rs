use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use spvopt::{optimize, OptimizeError, OptimizerConfig, OptimizerOptions};
use spvopt_ir::PrettyPrint;
use spvopt_opt::Status;
use tracing::Level;

/// SPIR-V assembly optimizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input assembly file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Write the optimized module here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with pass settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pass to run (repeat for a pipeline). Defaults to the standard pipeline.
    #[arg(long = "pass", value_name = "NAME")]
    passes: Vec<String>,

    /// Largest aggregate scalar replacement splits (0 for no limit)
    #[arg(long)]
    max_elements: Option<usize>,

    /// Validate the module before and after optimizing
    #[arg(long)]
    validate: bool,

    /// Log pass decisions and statistics
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn options(&self) -> anyhow::Result<OptimizerOptions> {
        let mut options = match &self.config {
            Some(path) => OptimizerConfig::from_path(path)?.into_options(),
            None => OptimizerOptions::default(),
        };
        if !self.passes.is_empty() {
            options.passes.clone_from(&self.passes);
        }
        if let Some(max) = self.max_elements {
            options.pass_options.scalar_replacement.max_num_elements = max;
        }
        options.validate |= self.validate;
        Ok(options)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let options = args.options()?;
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let optimized = match optimize(&source, &options) {
        Ok(optimized) => optimized,
        Err(OptimizeError::Parse(error)) => {
            eprint!("{}", error.render(&source, true));
            std::process::exit(1);
        }
        Err(error) => return Err(error.into()),
    };

    if optimized.status == Status::SuccessWithoutChange {
        tracing::info!("Module unchanged");
    }
    let text = optimized.module.pretty_print(0);
    match &args.output {
        Some(path) => {
            fs::write(path, &text).with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Output written to '{}'", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
