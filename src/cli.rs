
use clap::{Args, Parser, Subcommand};
use chrono::Datelike;
use lazy_static::lazy_static;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::ga_engine::GaParameters;
use crate::link_builder::PhaseLinkMode;
use crate::visualization::ScriptRunner;

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) 2015-{}     hicga developers
This program comes with ABSOLUTELY NO WARRANTY.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    #[clap(global = true)]
    pub verbosity: u8,

    #[clap(subcommand)]
    pub command: Command
}

#[derive(Clone, Subcommand)]
pub enum Command {
    /// Order contigs using Hi-C contact links
    #[clap(subcommand)]
    Scaffold(ScaffoldCommand),
    /// Phase variants or blocks using Hi-C contact links
    #[clap(subcommand)]
    Phase(PhaseCommand),
    /// Sequence utilities
    #[clap(subcommand)]
    Seq(SeqCommand),
    /// Variant utilities
    #[clap(subcommand)]
    Vars(VarsCommand)
}

#[derive(Clone, Subcommand)]
pub enum ScaffoldCommand {
    /// Infer a contig order from a links file
    Infer(ScaffoldInferSettings),
    /// Evaluate a contig order against a key order
    Eval(EvalSettings),
    /// Build a contig links file from name-grouped Hi-C alignments
    Prep(ScaffoldPrepSettings)
}

#[derive(Clone, Subcommand)]
pub enum PhaseCommand {
    /// Infer a phasing from a links file
    Infer(PhaseInferSettings),
    /// Evaluate a phasing against a key phasing
    Eval(EvalSettings),
    /// Build a variant or block links file from name-grouped Hi-C alignments
    Prep(PhasePrepSettings)
}

#[derive(Clone, Subcommand)]
pub enum SeqCommand {
    /// Split every sequence of a FASTA into fixed-size windows
    Partition(PartitionSettings),
    /// Replace the base at every variant position of a FASTA with N
    Mask(MaskSettings),
    /// Write the alignments of each contig to a separate file
    Split(SplitSettings)
}

#[derive(Clone, Subcommand)]
pub enum VarsCommand {
    /// Tag variants with simulated phase blocks of a fixed size
    Simblocks(SimBlocksSettings),
    /// Write the variants of each contig to a separate file
    Split(SplitSettings)
}

/// Genetic algorithm options, unset values take the workflow defaults
#[derive(Clone, Args)]
pub struct GaOptions {
    /// Number of generations to run
    #[clap(short = 'i')]
    #[clap(long = "iterations")]
    #[clap(value_name = "COUNT")]
    #[clap(default_value = "1000")]
    #[clap(help_heading = Some("Optimization"))]
    pub iterations: usize,

    /// Fraction of the iterations between progression snapshots
    #[clap(long = "report-frequency")]
    #[clap(value_name = "FRACTION")]
    #[clap(default_value = "0.01")]
    #[clap(help_heading = Some("Optimization"))]
    pub report_frequency: f64,

    /// Population size (default: 40 scaffolding, 10 phasing)
    #[clap(long = "population-size")]
    #[clap(value_name = "SIZE")]
    #[clap(help_heading = Some("Optimization"))]
    pub population_size: Option<usize>,

    /// Breeding probability per population slot (default: 0.2 scaffolding, 0.7 phasing)
    #[clap(long = "breed-probability")]
    #[clap(value_name = "PROB")]
    #[clap(help_heading = Some("Optimization"))]
    pub breed_probability: Option<f64>,

    /// Mutation probability per population slot (default: 0.6 scaffolding, 0.7 phasing)
    #[clap(long = "mutate-probability")]
    #[clap(value_name = "PROB")]
    #[clap(help_heading = Some("Optimization"))]
    pub mutate_probability: Option<f64>,

    /// Number of contestants per tournament
    #[clap(long = "tournament-size")]
    #[clap(value_name = "SIZE")]
    #[clap(default_value = "5")]
    #[clap(help_heading = Some("Optimization"))]
    pub tournament_size: usize,

    /// Probability of accepting each ranked tournament contestant
    #[clap(long = "elite-probability")]
    #[clap(value_name = "PROB")]
    #[clap(default_value = "0.7")]
    #[clap(help_heading = Some("Optimization"))]
    pub elite_probability: f64,

    /// Seed for reproducible runs (default: random)
    #[clap(long = "seed")]
    #[clap(value_name = "SEED")]
    #[clap(help_heading = Some("Optimization"))]
    pub seed: Option<u64>,

    /// Number of threads to use for fitness evaluation
    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize
}

/// Plotting options shared by the infer commands
#[derive(Clone, Args)]
pub struct PlotOptions {
    /// Directory with scaffplot.py, heatmap.py and optimizationviz.py; plots are skipped without it
    #[clap(long = "scripts-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Visualization"))]
    pub scripts_dir: Option<PathBuf>,

    /// Interpreter used to run the plotting scripts
    #[clap(long = "interpreter")]
    #[clap(value_name = "PROGRAM")]
    #[clap(default_value = "python")]
    #[clap(help_heading = Some("Visualization"))]
    pub interpreter: String
}

#[derive(Clone, Args)]
pub struct ScaffoldInferSettings {
    /// Input links file, gzip is allowed
    #[clap(short = 'l')]
    #[clap(long = "links")]
    #[clap(value_name = "LINKS")]
    #[clap(help_heading = Some("Input/Output"))]
    pub links_filename: PathBuf,

    /// Output file prefix
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(value_name = "PREFIX")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_prefix: PathBuf,

    /// Key ordering used to report accuracy (optional)
    #[clap(short = 'k')]
    #[clap(long = "key")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub key_filename: Option<PathBuf>,

    /// Only scaffold entities named "<TAG>_*"
    #[clap(long = "subset")]
    #[clap(value_name = "TAG")]
    #[clap(help_heading = Some("Input/Output"))]
    pub subset_tag: Option<String>,

    /// Also plot heatmaps of the links under the inferred and key orderings
    #[clap(long = "heatmaps")]
    #[clap(help_heading = Some("Visualization"))]
    pub heatmaps: bool,

    #[clap(flatten)]
    pub ga: GaOptions,

    #[clap(flatten)]
    pub plots: PlotOptions
}

#[derive(Clone, Args)]
pub struct PhaseInferSettings {
    /// Input links file, gzip is allowed
    #[clap(short = 'l')]
    #[clap(long = "links")]
    #[clap(value_name = "LINKS")]
    #[clap(help_heading = Some("Input/Output"))]
    pub links_filename: PathBuf,

    /// Output file prefix
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(value_name = "PREFIX")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_prefix: PathBuf,

    /// Tag inserted into every output name of this run
    #[clap(long = "run-tag")]
    #[clap(value_name = "TAG")]
    #[clap(default_value = "0")]
    #[clap(help_heading = Some("Input/Output"))]
    pub run_tag: String,

    /// Key phasing used to report accuracy (optional)
    #[clap(short = 'k')]
    #[clap(long = "key")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub key_filename: Option<PathBuf>,

    #[clap(flatten)]
    pub ga: GaOptions,

    #[clap(flatten)]
    pub plots: PlotOptions
}

#[derive(Clone, Args)]
pub struct EvalSettings {
    /// Inferred solution file
    #[clap(short = 'i')]
    #[clap(long = "inferred")]
    #[clap(value_name = "FILE")]
    pub inferred_filename: PathBuf,

    /// Key solution file
    #[clap(short = 'k')]
    #[clap(long = "key")]
    #[clap(value_name = "FILE")]
    pub key_filename: PathBuf,

    /// Output accuracy file (optional)
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "FILE")]
    pub output_filename: Option<PathBuf>
}

#[derive(Clone, Args)]
pub struct ScaffoldPrepSettings {
    /// Input Hi-C alignments in SAM/BAM format, grouped by read name
    #[clap(short = 'b')]
    #[clap(long = "alignments")]
    #[clap(value_name = "BAM")]
    pub alignment_filename: PathBuf,

    /// Output links file
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "LINKS")]
    pub output_filename: PathBuf
}

#[derive(Clone, Args)]
pub struct PhasePrepSettings {
    /// Input Hi-C alignments in SAM/BAM format, grouped by read name
    #[clap(short = 'b')]
    #[clap(long = "alignments")]
    #[clap(value_name = "BAM")]
    pub alignment_filename: PathBuf,

    /// Input variant file in VCF/BCF format
    #[clap(short = 'c')]
    #[clap(long = "vcf")]
    #[clap(value_name = "VCF")]
    pub vcf_filename: PathBuf,

    /// Link entities: single variants or prior phase blocks
    #[clap(long = "mode")]
    #[clap(value_name = "MODE")]
    #[clap(default_value = "block")]
    pub mode: PhaseLinkMode,

    /// Output links file
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "LINKS")]
    pub output_filename: PathBuf
}

#[derive(Clone, Args)]
pub struct PartitionSettings {
    /// Input FASTA file, gzip is allowed
    #[clap(short = 'f')]
    #[clap(long = "fasta")]
    #[clap(value_name = "FASTA")]
    pub fasta_filename: PathBuf,

    /// Output FASTA file
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "FASTA")]
    pub output_filename: PathBuf,

    /// Window size in bases
    #[clap(short = 'w')]
    #[clap(long = "window-size")]
    #[clap(value_name = "LENGTH")]
    pub window_size: usize
}

#[derive(Clone, Args)]
pub struct MaskSettings {
    /// Input FASTA file, gzip is allowed
    #[clap(short = 'f')]
    #[clap(long = "fasta")]
    #[clap(value_name = "FASTA")]
    pub fasta_filename: PathBuf,

    /// Variant file marking the positions to mask
    #[clap(short = 'c')]
    #[clap(long = "vcf")]
    #[clap(value_name = "VCF")]
    pub vcf_filename: PathBuf,

    /// Output FASTA file
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "FASTA")]
    pub output_filename: PathBuf
}

#[derive(Clone, Args)]
pub struct SplitSettings {
    /// Input file to split
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "FILE")]
    pub input_filename: PathBuf,

    /// Output name template, each contig name is inserted before the extension
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "FILE")]
    pub output_template: PathBuf,

    /// Maximum number of contig files to create
    #[clap(long = "max-open-files")]
    #[clap(value_name = "NUM")]
    #[clap(default_value = "200")]
    pub max_open_files: usize
}

#[derive(Clone, Args)]
pub struct SimBlocksSettings {
    /// Input variant file in VCF/BCF format, sorted by position
    #[clap(short = 'c')]
    #[clap(long = "vcf")]
    #[clap(value_name = "VCF")]
    pub vcf_filename: PathBuf,

    /// Output VCF file
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "VCF")]
    pub output_filename: PathBuf,

    /// Block size in bases
    #[clap(short = 'b')]
    #[clap(long = "block-size")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "10000")]
    pub block_size: u64,

    /// Gap between blocks in bases
    #[clap(short = 'g')]
    #[clap(long = "gap")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "0")]
    pub gap: u64
}

impl GaOptions {
    /// Fills the unset options from `defaults`
    pub fn parameters(&self, defaults: GaParameters) -> GaParameters {
        GaParameters {
            population_size: self.population_size.unwrap_or(defaults.population_size),
            breed_probability: self.breed_probability.unwrap_or(defaults.breed_probability),
            mutate_probability: self.mutate_probability.unwrap_or(defaults.mutate_probability),
            tournament_size: self.tournament_size,
            elite_probability: self.elite_probability,
            threads: self.threads,
            seed: self.seed
        }
    }
}

impl PlotOptions {
    pub fn script_runner(&self) -> Option<ScriptRunner> {
        self.scripts_dir.as_ref().map(|dir| ScriptRunner::new(&self.interpreter, dir))
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

fn check_probability(value: Option<f64>, flag: &str) {
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) {
            error!("{} must be in the range [0.0, 1.0]", flag);
            std::process::exit(exitcode::USAGE);
        }
    }
}

/// Validates the optimizer options and dumps them to the logger
fn check_ga_options(ga: &mut GaOptions) {
    check_probability(ga.breed_probability, "--breed-probability");
    check_probability(ga.mutate_probability, "--mutate-probability");
    check_probability(Some(ga.elite_probability), "--elite-probability");
    if ga.population_size.unwrap_or(2) < 2 {
        error!("--population-size must be at least 2");
        std::process::exit(exitcode::USAGE);
    }
    if ga.tournament_size < 2 {
        error!("--tournament-size must be at least 2");
        std::process::exit(exitcode::USAGE);
    }
    if !(ga.report_frequency > 0.0 && ga.report_frequency <= 1.0) {
        error!("--report-frequency must be in the range (0.0, 1.0]");
        std::process::exit(exitcode::USAGE);
    }
    if ga.iterations == 0 {
        warn!("Zero iterations requested, the initial population will be reported as is.");
    }

    // 0 doesn't make sense, so lets just error proof it up to 1
    if ga.threads == 0 {
        ga.threads = 1;
    }

    info!("Optimization:");
    info!("\tIterations: {}", ga.iterations);
    info!("\tReport frequency: {}", ga.report_frequency);
    info!("\tTournament: {} contestants, elite probability {}", ga.tournament_size, ga.elite_probability);
    match ga.seed {
        Some(seed) => info!("\tSeed: {}", seed),
        None => info!("\tSeed: RANDOM")
    };
    info!("Processing threads: {}", ga.threads);
}

fn check_max_open_files(max_open_files: usize) {
    if max_open_files == 0 {
        error!("--max-open-files must be > 0");
        std::process::exit(exitcode::USAGE);
    }
}

fn check_plot_options(plots: &PlotOptions) {
    match plots.scripts_dir.as_ref() {
        Some(dir) => check_required_filename(dir, "Scripts directory"),
        None => info!("Visualization: DISABLED")
    };
}

/// Do some additional checks here, we may increase these as we go.
/// Also can modify settings if needed since we're passing it around.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(mut settings: Settings) -> Settings {
    match &mut settings.command {
        Command::Scaffold(ScaffoldCommand::Infer(s)) => {
            check_required_filename(&s.links_filename, "Links file");
            if let Some(key) = s.key_filename.as_ref() {
                check_required_filename(key, "Key file");
            }
            if s.heatmaps && s.plots.scripts_dir.is_none() {
                warn!("--heatmaps has no effect without --scripts-dir");
            }
            check_ga_options(&mut s.ga);
            check_plot_options(&s.plots);
        },
        Command::Phase(PhaseCommand::Infer(s)) => {
            check_required_filename(&s.links_filename, "Links file");
            if let Some(key) = s.key_filename.as_ref() {
                check_required_filename(key, "Key file");
            }
            check_ga_options(&mut s.ga);
            check_plot_options(&s.plots);
        },
        Command::Scaffold(ScaffoldCommand::Eval(s)) | Command::Phase(PhaseCommand::Eval(s)) => {
            check_required_filename(&s.inferred_filename, "Inferred file");
            check_required_filename(&s.key_filename, "Key file");
        },
        Command::Scaffold(ScaffoldCommand::Prep(s)) => {
            check_required_filename(&s.alignment_filename, "Alignment file");
        },
        Command::Phase(PhaseCommand::Prep(s)) => {
            check_required_filename(&s.alignment_filename, "Alignment file");
            check_required_filename(&s.vcf_filename, "Variant file");
            info!("Link mode: {}", s.mode);
        },
        Command::Seq(SeqCommand::Partition(s)) => {
            check_required_filename(&s.fasta_filename, "Assembly file");
            if s.window_size == 0 {
                error!("--window-size must be > 0");
                std::process::exit(exitcode::USAGE);
            }
        },
        Command::Seq(SeqCommand::Mask(s)) => {
            check_required_filename(&s.fasta_filename, "Assembly file");
            check_required_filename(&s.vcf_filename, "Variant file");
        },
        Command::Seq(SeqCommand::Split(s)) => {
            check_required_filename(&s.input_filename, "Alignment file");
            check_max_open_files(s.max_open_files);
        },
        Command::Vars(VarsCommand::Simblocks(s)) => {
            check_required_filename(&s.vcf_filename, "Variant file");
            if s.block_size == 0 {
                error!("--block-size must be > 0");
                std::process::exit(exitcode::USAGE);
            }
            info!("Simulated blocks: {} bp with {} bp gaps", s.block_size, s.gap);
        },
        Command::Vars(VarsCommand::Split(s)) => {
            check_required_filename(&s.input_filename, "Variant file");
            check_max_open_files(s.max_open_files);
        }
    };

    //send the settings back
    settings
}
