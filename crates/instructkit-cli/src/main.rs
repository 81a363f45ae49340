//! instructkit CLI - SFT dataset preparation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use instructkit_core::{
    ConversationRow, DataModuleConfig, FormattedRecord, MetaMathRow, RawSplit, SecretString,
};
use instructkit_data::{
    format_meta_math, format_rows, DataModule, MetaMathQa, PromptStyle, SftDataset, TextEncoder,
    Tokenizer, WizardLmEvolInstructV2,
};
use instructkit_hub::{cache_dir, cache_size, clear_cache, read_rows, HubDatasetSource};

/// Row layout of an input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Schema {
    /// ShareGPT conversations (WizardLM evol-instruct)
    #[default]
    Wizardlm,
    /// query/response pairs (MetaMathQA)
    Metamath,
}

#[derive(Parser)]
#[command(name = "instructkit")]
#[command(author, version, about = "Prepare instruction-tuning datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format a local dataset file into instruction/input/output records
    Format {
        /// Input rows (JSONL, JSON or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSONL file
        #[arg(short, long)]
        output: PathBuf,

        /// Row layout of the input
        #[arg(long, value_enum, default_value_t = Schema::Wizardlm)]
        schema: Schema,
    },

    /// Download a dataset from the Hub and format its training split
    Prepare {
        /// Data module configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dataset whose defaults to start from
        #[arg(short, long, value_enum, default_value_t = Schema::Wizardlm)]
        dataset: Schema,

        /// Directory to cache downloaded files in
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// Override the Hub repository
        #[arg(long)]
        repo_id: Option<String>,

        /// Prompt style (see `instructkit styles`)
        #[arg(long)]
        prompt_style: Option<String>,

        /// Write the formatted records to this JSONL file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// HuggingFace token (defaults to $HF_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },

    /// Report record counts, role problems and token lengths of a local file
    Inspect {
        /// Input rows (JSONL, JSON or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Row layout of the input
        #[arg(long, value_enum, default_value_t = Schema::Wizardlm)]
        schema: Schema,

        /// tokenizer.json used for token statistics
        #[arg(short, long)]
        tokenizer: Option<PathBuf>,

        /// Prompt style used to render prompts
        #[arg(long, default_value = "chatml")]
        prompt_style: String,

        /// Count samples longer than this many tokens
        #[arg(long)]
        max_seq_length: Option<i64>,

        /// Mask prompt tokens when counting trainable labels
        #[arg(long)]
        mask_prompt: bool,
    },

    /// List prompt styles
    Styles,

    /// Manage the download cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the size of the cache
    Size {
        /// Cache directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete the cache
    Clear {
        /// Cache directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Format {
            input,
            output,
            schema,
        } => run_format(&input, &output, schema),
        Commands::Prepare {
            config,
            dataset,
            download_dir,
            repo_id,
            prompt_style,
            output,
            token,
        } => {
            let mut config = match config {
                Some(path) => DataModuleConfig::from_yaml_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => match dataset {
                    Schema::Wizardlm => DataModuleConfig::wizardlm(),
                    Schema::Metamath => DataModuleConfig::meta_math(),
                },
            };
            if let Some(dir) = download_dir {
                config.download_dir = dir;
            }
            if let Some(repo_id) = repo_id {
                config.repo_id = repo_id;
            }
            if let Some(style) = prompt_style {
                config.prompt_style = style;
            }
            let token = token.or_else(|| std::env::var("HF_TOKEN").ok());
            if let Some(token) = SecretString::from_option(token) {
                config.hf_token = Some(token);
            }
            run_prepare(config, dataset, output.as_deref())
        }
        Commands::Inspect {
            input,
            schema,
            tokenizer,
            prompt_style,
            max_seq_length,
            mask_prompt,
        } => run_inspect(
            &input,
            schema,
            tokenizer.as_deref(),
            &prompt_style,
            max_seq_length,
            mask_prompt,
        ),
        Commands::Styles => {
            for style in PromptStyle::all() {
                let marker = if *style == PromptStyle::default() {
                    " (default)"
                } else {
                    ""
                };
                println!("{}{}", style, marker);
            }
            Ok(())
        }
        Commands::Cache { action } => run_cache(action),
    }
}

/// Formatted records plus the number of role mismatches seen.
struct Formatted {
    records: Vec<FormattedRecord>,
    mismatches: usize,
}

fn load_split(path: &Path) -> anyhow::Result<RawSplit> {
    let rows = read_rows(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(RawSplit::new("train", rows))
}

fn format_split(split: &RawSplit, schema: Schema) -> anyhow::Result<Formatted> {
    match schema {
        Schema::Wizardlm => {
            let rows: Vec<ConversationRow> = split.decode()?;
            let outcome = format_rows(&rows, false)?;
            Ok(Formatted {
                records: outcome.records,
                mismatches: outcome.mismatches.len(),
            })
        }
        Schema::Metamath => {
            let rows: Vec<MetaMathRow> = split.decode()?;
            Ok(Formatted {
                records: format_meta_math(&rows),
                mismatches: 0,
            })
        }
    }
}

fn write_records(path: &Path, records: &[FormattedRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn run_format(input: &Path, output: &Path, schema: Schema) -> anyhow::Result<()> {
    let split = load_split(input)?;
    let formatted = format_split(&split, schema)?;
    write_records(output, &formatted.records)?;

    println!(
        "Wrote {} records to {}",
        formatted.records.len(),
        output.display()
    );
    if formatted.mismatches > 0 {
        println!("Role mismatches: {}", formatted.mismatches);
    }
    Ok(())
}

fn run_prepare(
    config: DataModuleConfig,
    dataset: Schema,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let source = HubDatasetSource::new()
        .with_token(config.hf_token.clone())
        .with_revision(config.revision.clone())
        .with_progress(true);
    let repo_id = config.repo_id.clone();

    let mut module: Box<dyn DataModule> = match dataset {
        Schema::Wizardlm => Box::new(WizardLmEvolInstructV2::with_config(
            config,
            Box::new(source),
        )?),
        Schema::Metamath => Box::new(MetaMathQa::with_config(config, Box::new(source))?),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Preparing {}", repo_id));

    let prepared = match module.setup("fit") {
        Ok(prepared) => prepared,
        Err(e) => {
            spinner.abandon_with_message(format!("Failed to prepare {}", repo_id));
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!("Prepared {}", repo_id));

    for (name, ds) in prepared.iter() {
        println!("{:<14} {} records", name, ds.len());
    }

    if let Some(output) = output {
        let train = prepared
            .train_dataset
            .as_ref()
            .context("Data module produced no training dataset")?;
        write_records(output, train.records())?;
        println!("Wrote {} records to {}", train.len(), output.display());
    }
    Ok(())
}

fn run_inspect(
    input: &Path,
    schema: Schema,
    tokenizer: Option<&Path>,
    prompt_style: &str,
    max_seq_length: Option<i64>,
    mask_prompt: bool,
) -> anyhow::Result<()> {
    let prompt_style = PromptStyle::from_name(prompt_style)?;
    let split = load_split(input)?;
    let formatted = format_split(&split, schema)?;

    println!("========================================");
    println!("  Dataset Inspection");
    println!("========================================");
    println!("Path:            {}", input.display());
    println!("Rows:            {}", split.len());
    println!("Records:         {}", formatted.records.len());
    println!("Role mismatches: {}", formatted.mismatches);
    println!("Prompt style:    {}", prompt_style);
    println!();

    let Some(tokenizer_path) = tokenizer else {
        return Ok(());
    };
    let tokenizer: Arc<dyn TextEncoder> = Arc::new(
        Tokenizer::from_file(tokenizer_path)
            .with_context(|| format!("Failed to load tokenizer {}", tokenizer_path.display()))?,
    );

    let dataset = SftDataset::new(formatted.records, prompt_style)
        .with_tokenizer(Some(tokenizer))
        .with_prompt_masking(mask_prompt, instructkit_core::DEFAULT_IGNORE_INDEX);

    let progress = ProgressBar::new(dataset.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let mut lengths = Vec::with_capacity(dataset.len());
    let mut trainable = 0usize;
    for sample in dataset.iter_samples() {
        let sample = sample?;
        trainable += sample
            .labels
            .iter()
            .filter(|&&l| l != dataset.ignore_index())
            .count();
        lengths.push(sample.len());
        progress.inc(1);
    }
    progress.finish_and_clear();

    let Some(stats) = LengthStats::compute(&mut lengths) else {
        println!("No samples to tokenize");
        return Ok(());
    };

    println!("Token lengths:");
    println!("  Min:    {}", stats.min);
    println!("  Max:    {}", stats.max);
    println!("  Mean:   {:.0}", stats.mean);
    println!("  Median: {}", stats.median);
    println!("  P95:    {} (recommended max_seq_length)", stats.p95);
    println!("Trainable labels: {}", trainable);

    if let Some(limit) = max_seq_length.filter(|&l| l > 0) {
        let over = lengths.iter().filter(|&&l| l as i64 > limit).count();
        println!(
            "Longer than {}: {} ({:.1}%)",
            limit,
            over,
            100.0 * over as f64 / lengths.len() as f64
        );
    }
    Ok(())
}

/// Summary of sample lengths.
#[derive(Debug, PartialEq)]
struct LengthStats {
    min: usize,
    max: usize,
    mean: f64,
    median: usize,
    p95: usize,
}

impl LengthStats {
    /// Sorts `lengths` in place. `None` when empty.
    fn compute(lengths: &mut [usize]) -> Option<Self> {
        lengths.sort_unstable();
        let min = *lengths.first()?;
        let max = *lengths.last()?;
        let n = lengths.len();
        Some(Self {
            min,
            max,
            mean: lengths.iter().sum::<usize>() as f64 / n as f64,
            median: lengths[n / 2],
            p95: lengths[((n as f64 * 0.95) as usize).min(n - 1)],
        })
    }
}

fn run_cache(action: CacheAction) -> anyhow::Result<()> {
    match action {
        CacheAction::Size { dir } => {
            let dir = dir.unwrap_or_else(cache_dir);
            let size = cache_size(&dir)?;
            println!("{}: {}", dir.display(), format_size(size));
        }
        CacheAction::Clear { dir } => {
            let dir = dir.unwrap_or_else(cache_dir);
            if clear_cache(&dir)? {
                println!("Removed {}", dir.display());
            } else {
                println!("Nothing to remove at {}", dir.display());
            }
        }
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cli_parses_format() {
        let cli = Cli::try_parse_from([
            "instructkit",
            "format",
            "--input",
            "rows.jsonl",
            "--output",
            "out.jsonl",
            "--schema",
            "metamath",
        ])
        .unwrap();
        match cli.command {
            Commands::Format { schema, .. } => assert_eq!(schema, Schema::Metamath),
            _ => panic!("expected format command"),
        }
    }

    #[test]
    fn test_length_stats() {
        let mut lengths = vec![5, 1, 3, 2, 4];
        let stats = LengthStats::compute(&mut lengths).unwrap();
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 5);
        assert_eq!(stats.median, 3);
        assert_eq!(stats.p95, 5);
        assert!((stats.mean - 3.0).abs() < f64::EPSILON);
        assert!(LengthStats::compute(&mut []).is_none());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_split_counts_mismatches() {
        let split = RawSplit::new(
            "train",
            vec![
                json!({"idx": "7", "conversations": [{"from": "human", "value": "2+2?"}, {"from": "gpt", "value": "4"}]}),
                json!({"idx": "9", "conversations": [{"from": "gpt", "value": "oops"}, {"from": "human", "value": "hi"}]}),
            ],
        );
        let formatted = format_split(&split, Schema::Wizardlm).unwrap();
        assert_eq!(formatted.records.len(), 2);
        assert_eq!(formatted.mismatches, 2);
    }

    #[test]
    fn test_write_records_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        write_records(&path, &[FormattedRecord::new("q", "a")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value, json!({"instruction": "q", "input": "", "output": "a"}));
    }
}
