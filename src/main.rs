#![warn(unused_extern_crates)]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use facecrop::output::{CleanupPolicy, OutputNaming};
use facecrop::pipeline::model::ModelFiles;
use facecrop::{Pipeline, RunOptions, SsdFaceDetector};
use num_cpus::get as get_cpu_count;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Naming {
    /// "<input name> (output)" next to the input
    Suffix,
    /// "Faces Output (N)", never reusing an existing directory
    Increment,
}

impl From<Naming> for OutputNaming {
    fn from(naming: Naming) -> OutputNaming {
        match naming {
            Naming::Suffix => OutputNaming::Suffix,
            Naming::Increment => OutputNaming::Increment,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    /// Directory of images to crop faces from. Prompts on stdin if unset
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory holding the detector config (.json) and weights (.onnx)
    #[arg(short, long, default_value = ".")]
    model_dir: PathBuf,

    /// Where output directories are created. Defaults to the input's parent
    #[arg(short, long)]
    output_parent: Option<PathBuf>,

    /// Output directory naming scheme
    #[arg(long, value_enum, default_value_t = Naming::Suffix)]
    naming: Naming,

    /// Keep the output directory even when no faces were extracted
    #[arg(long)]
    keep_empty: bool,

    /// Max threads used for inference
    #[arg(short = 't', long)]
    max_threads: Option<usize>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let args = CmdArgs::parse();

    let total_threads = get_cpu_count();
    let threads = args.max_threads.unwrap_or(total_threads).min(total_threads);
    debug!("Using {threads} inference threads");

    let model_files = ModelFiles::discover(&args.model_dir).context("No model found")?;
    let detector = SsdFaceDetector::new(&model_files, threads).context("No model found")?;
    let pipeline = Pipeline::new(Box::new(detector));

    let options = RunOptions {
        naming: args.naming.into(),
        cleanup: if args.keep_empty {
            CleanupPolicy::Keep
        } else {
            CleanupPolicy::RemoveIfEmpty
        },
        output_parent: args.output_parent,
    };

    match args.input {
        Some(input) => process_directory(&pipeline, &input, &options),
        None => prompt_loop(&pipeline, &options),
    }
}

fn process_directory(pipeline: &Pipeline, input: &Path, options: &RunOptions) -> Result<()> {
    let summary = pipeline.run(input, options)?;
    println!("{summary}\n");
    Ok(())
}

/// Ask for directories until stdin closes, running one batch per answer.
fn prompt_loop(pipeline: &Pipeline, options: &RunOptions) -> Result<()> {
    let mut lines = io::stdin().lock().lines();

    loop {
        let input = loop {
            print!("Enter directory: ");
            io::stdout().flush()?;

            let Some(line) = lines.next() else {
                return Ok(());
            };
            let path = PathBuf::from(strip_quotes(&line?));
            if path.exists() {
                break path;
            }
            println!("Wrong directory\n");
        };

        if let Err(e) = process_directory(pipeline, &input, options) {
            error!("{e:#}");
        }
    }
}

/// Drop the quotes file managers add when a path is pasted.
fn strip_quotes(line: &str) -> &str {
    line.trim().trim_matches(|c| c == '"' || c == '\'')
}
