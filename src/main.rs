//! sigproc command line interface
//!
//! Runs recipes over audio files and inspects the stage catalog.

use clap::{Parser, Subcommand};
use log::{info, warn};
use sigproc::encoder::{save_artifact, suggested_extension};
use sigproc::pipeline::PipelineEntry;
use sigproc::{
    CompileOptions, LogProgress, PipelineError, PipelineRunner, RecipeManager, Runner,
    RunnerConfig, Value,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sigproc")]
#[command(about = "Recipe-driven signal processing pipelines", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory of recipe files
    #[arg(short, long, value_name = "DIR", default_value = "recipes", global = true)]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recipe over one or more input files
    Run {
        /// Recipe name
        recipe: String,

        /// Input audio files
        #[arg(value_name = "INPUT", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output file, or directory when there are several inputs
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Output extension, overriding the one implied by the recipe
        #[arg(short, long)]
        ext: Option<String>,

        /// Progress events per iterative stage
        #[arg(long, default_value = "100")]
        updates: usize,
    },

    /// List registered stages and loaded recipes
    List,

    /// Describe every registered stage
    Doc,

    /// Print the compiled form of a recipe
    Show {
        /// Recipe name
        recipe: String,

        /// Keep referenced recipes as placeholders
        #[arg(long)]
        no_expand: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    info!("sigproc {}", sigproc::VERSION);

    let registry = Arc::new(sigproc::stages::builtin_registry()?);
    let mut manager = RecipeManager::new(registry);
    if cli.dir.is_dir() {
        manager.load_dir(&cli.dir)?;
    } else {
        warn!("recipe directory {} not found", cli.dir.display());
    }

    match cli.command {
        Commands::Run {
            recipe,
            inputs,
            output,
            ext,
            updates,
        } => run(&manager, &recipe, &inputs, &output, ext, updates)?,
        Commands::List => {
            println!("Stages:");
            for (name, stage) in manager.registry().iter() {
                if name == stage.name() {
                    println!("  {:<16} {}", name, stage.summary_text());
                } else {
                    println!("  {:<16} alias of {}", name, stage.name());
                }
            }
            println!("\nRecipes:");
            for name in manager.recipe_names() {
                println!("  {}", name);
            }
        }
        Commands::Doc => {
            for (name, stage) in manager.registry().iter() {
                if name != stage.name() {
                    continue;
                }
                println!("{}\n{}\n{}", name, "=".repeat(name.len()), stage.describe());
            }
        }
        Commands::Show { recipe, no_expand } => {
            let options = CompileOptions {
                expand_sub_recipes: !no_expand,
                ..CompileOptions::default()
            };
            let pipeline = manager.compile_with(&recipe, &options)?;
            for (i, entry) in pipeline.entries().iter().enumerate() {
                match entry {
                    PipelineEntry::Stage(compiled) => {
                        println!("{:>3}. [{}] {}", i, compiled.section, compiled.stage.name());
                        for (key, value) in compiled.options.iter() {
                            println!("       {} = {}", key, value);
                        }
                    }
                    PipelineEntry::SubRecipe(name) => println!("{:>3}. <recipe {}>", i, name),
                }
            }
        }
    }

    Ok(())
}

fn run(
    manager: &RecipeManager,
    recipe: &str,
    inputs: &[PathBuf],
    output: &Path,
    ext: Option<String>,
    updates: usize,
) -> Result<(), PipelineError> {
    let pipeline = manager.compile(recipe)?;
    let ext = match ext {
        Some(ext) if ext.starts_with('.') => ext,
        Some(ext) => format!(".{}", ext),
        None => pipeline
            .output_type()
            .and_then(suggested_extension)
            .ok_or_else(|| {
                PipelineError::config(format!("recipe '{}' has no file output", recipe))
            })?
            .to_string(),
    };

    let to_dir = inputs.len() > 1 || output.is_dir();
    if to_dir {
        std::fs::create_dir_all(output)?;
    }

    let config = RunnerConfig::default().with_num_updates(updates);
    let mut runner = PipelineRunner::new(Runner::new(config).with_sink(LogProgress));

    for input in inputs {
        info!("processing {}", input.display());
        let source = Value::from(input.to_string_lossy().into_owned());
        let outputs = runner.run(&pipeline, Some(source))?;
        let Some(last) = outputs.last() else {
            warn!("recipe {} produced nothing for {}", recipe, input.display());
            continue;
        };

        let target = if to_dir {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            output.join(format!("{}{}", name, ext))
        } else {
            output.to_path_buf()
        };
        save_artifact(&target, last)?;
    }

    Ok(())
}
