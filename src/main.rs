use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::PathBuf;
use track_compare::analysis::{CancellationToken, LocalAnalyzer};
use track_compare::decode::{AudioSource, SymphoniaDecoder};
use track_compare::reconcile::{reconcile, ComparisonTable, Reconciliation};
use track_compare::{Config, LocalAnalysisResult, ReconcileConfig, ReferenceFeatureSet};

#[derive(Parser, Debug)]
#[command(name = "track-compare")]
#[command(about = "Compare locally analyzed audio features with reference descriptors", long_about = None)]
struct Args {
    /// Audio files or preview URLs to analyze
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Reference feature record (JSON: tempo, key, loudness, energy, danceability)
    #[arg(short = 'r', long)]
    reference: Option<String>,

    /// Reference tempo in BPM (overrides the JSON record)
    #[arg(long)]
    ref_tempo: Option<f32>,

    /// Reference key as pitch class 0-11 (overrides the JSON record)
    #[arg(long, allow_hyphen_values = true)]
    ref_key: Option<i32>,

    /// Reference loudness in dB (overrides the JSON record)
    #[arg(long, allow_hyphen_values = true)]
    ref_loudness: Option<f32>,

    /// Reference energy 0-1 (overrides the JSON record)
    #[arg(long)]
    ref_energy: Option<f32>,

    /// Reference danceability 0-1 (overrides the JSON record)
    #[arg(long)]
    ref_danceability: Option<f32>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Use the wide-band calibration (energy scale 10, danceable 90-140 BPM)
    #[arg(long)]
    wide_band: bool,

    /// Multiplier mapping RMS to the 0-1 energy scale
    #[arg(long)]
    energy_scale: Option<f32>,

    /// Tempo differences below this are "precise"
    #[arg(long)]
    tempo_threshold: Option<f32>,

    /// Samples per analysis frame
    #[arg(long)]
    frame_size: Option<usize>,

    /// Minimum BPM for detection range
    #[arg(long)]
    min_bpm: Option<f32>,

    /// Maximum BPM for detection range
    #[arg(long)]
    max_bpm: Option<f32>,

    /// Only analyze the first N seconds of each input
    #[arg(long)]
    max_duration: Option<u32>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = build_config(&args)?;
    let reference = load_reference(&args)?;

    if reference.is_some() && args.inputs.len() > 1 {
        log::warn!(
            "One reference record is compared against {} inputs",
            args.inputs.len()
        );
    }

    let mut decoder = SymphoniaDecoder::new();
    if let Some(secs) = args.max_duration {
        decoder = decoder.with_max_duration(secs);
    }
    let analyzer = LocalAnalyzer::with_decoder(decoder).with_config(config.extraction.clone());

    log::info!(
        "Analyzing {} input(s), BPM range {}-{}",
        args.inputs.len(),
        config.extraction.min_bpm,
        config.extraction.max_bpm
    );

    // Each input is an independent run; runs share no state apart from the
    // batch token their own tokens derive from.
    let batch = CancellationToken::new();
    let reports: Vec<Report> = args
        .inputs
        .par_iter()
        .map(|input| {
            let source = AudioSource::parse(input);
            let token = batch.child_token();
            let outcome = analyzer.analyze_source(&source, &token, |_| {});
            Report::new(input.clone(), outcome.ok(), reference.as_ref(), &config.reconcile)
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            report.print();
        }
    }

    let failed = reports.iter().filter(|r| r.local.is_none()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} input(s) could not be analyzed", failed, reports.len());
    }

    Ok(())
}

/// Merge config file, preset and command-line overrides
fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let path = PathBuf::from(shellexpand::tilde(path).as_ref());
            Config::load(&path).with_context(|| format!("Failed to load config: {:?}", path))?
        }
        None => Config::default(),
    };

    if args.wide_band {
        config.reconcile = ReconcileConfig::wide_band();
    }
    if let Some(scale) = args.energy_scale {
        config.reconcile.energy_scale = scale;
    }
    if let Some(threshold) = args.tempo_threshold {
        config.reconcile.tempo_threshold = threshold;
    }
    if let Some(size) = args.frame_size {
        config.extraction.frame_size = size;
    }
    if let Some(min) = args.min_bpm {
        config.extraction.min_bpm = min;
    }
    if let Some(max) = args.max_bpm {
        config.extraction.max_bpm = max;
    }

    log::debug!("Effective config: {:?}", config);
    Ok(config)
}

/// Reference record from JSON and/or individual flags
fn load_reference(args: &Args) -> Result<Option<ReferenceFeatureSet>> {
    let mut reference = match &args.reference {
        Some(path) => {
            let path = PathBuf::from(shellexpand::tilde(path).as_ref());
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read reference record: {:?}", path))?;
            Some(
                ReferenceFeatureSet::from_json(&json)
                    .with_context(|| format!("Invalid reference record: {:?}", path))?,
            )
        }
        None => None,
    };

    let has_flags = args.ref_tempo.is_some()
        || args.ref_key.is_some()
        || args.ref_loudness.is_some()
        || args.ref_energy.is_some()
        || args.ref_danceability.is_some();

    if has_flags {
        let record = reference.get_or_insert_with(ReferenceFeatureSet::default);
        record.tempo = args.ref_tempo.or(record.tempo);
        record.key = args.ref_key.or(record.key);
        record.loudness = args.ref_loudness.or(record.loudness);
        record.energy = args.ref_energy.or(record.energy);
        record.danceability = args.ref_danceability.or(record.danceability);
    }

    Ok(reference)
}

/// Per-input output record
#[derive(serde::Serialize)]
struct Report {
    input: String,
    local: Option<LocalAnalysisResult>,
    reconciliation: Option<Reconciliation>,
}

impl Report {
    fn new(
        input: String,
        local: Option<LocalAnalysisResult>,
        reference: Option<&ReferenceFeatureSet>,
        config: &ReconcileConfig,
    ) -> Self {
        let reconciliation = local
            .as_ref()
            .map(|result| reconcile(result, reference, config));
        Self {
            input,
            local,
            reconciliation,
        }
    }

    fn print(&self) {
        println!("== {}", self.input);
        match &self.reconciliation {
            None => println!("  analysis failed"),
            Some(Reconciliation::LocalOnly(summary)) => {
                println!("  BPM:       {:.1}", summary.bpm);
                println!("  Loudness:  {:.2} dB", summary.loudness);
                println!("  RMS:       {:.3}", summary.rms);
                if let Some(local) = &self.local {
                    println!("  Key:       {}", local.key());
                }
            }
            Some(Reconciliation::Comparison(table)) => print_table(table),
        }
        println!();
    }
}

fn print_table(table: &ComparisonTable) {
    let cell = |v: Option<f32>| v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v));

    println!(
        "  {:<13} {:>9} {:>10} {:>8}  {}",
        "feature", "local", "reference", "diff", "verdict"
    );
    for entry in &table.entries {
        println!(
            "  {:<13} {:>9} {:>10} {:>8}  {}",
            entry.feature.name(),
            cell(entry.local),
            cell(entry.reference),
            cell(entry.abs_diff),
            entry.verdict
        );
    }
    println!(
        "  derived: energy={:.3} danceability={:.3}",
        table.derived.energy, table.derived.danceability
    );
}
