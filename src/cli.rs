use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "docsmith")]
#[command(about = "Structured documentation metadata from pre-parsed source trees")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Extract documentation models from CST inputs
    Extract {
        /// Source directory of CST inputs
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output directory for model files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the written models
        #[arg(long)]
        pretty: bool,
    },

    /// Print a single file's documentation model to stdout
    Dump {
        /// CST input file
        file: PathBuf,

        /// Override the derived module name
        #[arg(short, long)]
        module_name: Option<String>,
    },

    /// Walk all inputs and report failures without writing output
    Check {
        /// Source directory of CST inputs
        #[arg(short, long)]
        source: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path } => engine.init(path).await,
            Commands::Extract {
                source,
                output,
                pretty,
            } => engine.extract(source, output, pretty).await,
            Commands::Dump { file, module_name } => engine.dump(file, module_name).await,
            Commands::Check { source } => engine.check(source).await,
        }
        .map_err(Into::into)
    }
}
