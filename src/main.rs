
use hicga::assembly::{mask_assembly, partition_assembly};
use hicga::block_sim::simulate_blocks;
use hicga::cli::{Command, PhaseCommand, ScaffoldCommand, SeqCommand, Settings, VarsCommand, check_settings, get_raw_settings};
use hicga::contig_split::{split_alignments_by_contig, split_variants_by_contig};
use hicga::data_types::errors::exit_code;
use hicga::ga_engine::GaParameters;
use hicga::phaser::{PhaseConfig, run_phase_eval, run_phase_infer, run_phase_prep};
use hicga::scaffolder::{ScaffoldConfig, run_scaffold_eval, run_scaffold_infer, run_scaffold_prep};

use log::{LevelFilter, error, info};
use std::time::Instant;

/// Runs the selected subcommand
fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match &settings.command {
        Command::Scaffold(ScaffoldCommand::Infer(s)) => {
            let config: ScaffoldConfig = ScaffoldConfig {
                links_filename: s.links_filename.clone(),
                output_prefix: s.output_prefix.clone(),
                key_filename: s.key_filename.clone(),
                subset_tag: s.subset_tag.clone(),
                iterations: s.ga.iterations,
                report_frequency: s.ga.report_frequency,
                parameters: s.ga.parameters(GaParameters::scaffolding_defaults()),
                visualizer: s.plots.script_runner(),
                heatmaps: s.heatmaps
            };
            let outputs = run_scaffold_infer(&config)?;
            info!("Scaffolding written to {:?}", outputs.scaffolding);
        },
        Command::Scaffold(ScaffoldCommand::Eval(s)) => {
            let accuracy = run_scaffold_eval(&s.inferred_filename, &s.key_filename, s.output_filename.as_deref())?;
            println!("{:.6}\n{:.6}", accuracy.score, accuracy.neighbor_score);
        },
        Command::Scaffold(ScaffoldCommand::Prep(s)) => {
            run_scaffold_prep(&s.alignment_filename, &s.output_filename)?;
        },
        Command::Phase(PhaseCommand::Infer(s)) => {
            let config: PhaseConfig = PhaseConfig {
                links_filename: s.links_filename.clone(),
                output_prefix: s.output_prefix.clone(),
                run_tag: s.run_tag.clone(),
                key_filename: s.key_filename.clone(),
                iterations: s.ga.iterations,
                report_frequency: s.ga.report_frequency,
                parameters: s.ga.parameters(GaParameters::phasing_defaults()),
                visualizer: s.plots.script_runner()
            };
            let outputs = run_phase_infer(&config)?;
            info!("Phasing written to {:?}", outputs.phasing);
        },
        Command::Phase(PhaseCommand::Eval(s)) => {
            let accuracy = run_phase_eval(&s.inferred_filename, &s.key_filename, s.output_filename.as_deref())?;
            let band = |value: Option<f64>| value.map(|v| format!("{v:.6}")).unwrap_or_else(|| "NA".to_string());
            println!("{:.6}\n{}\n{}", accuracy.global, band(accuracy.near), band(accuracy.mid));
        },
        Command::Phase(PhaseCommand::Prep(s)) => {
            run_phase_prep(&s.alignment_filename, &s.vcf_filename, s.mode, &s.output_filename)?;
        },
        Command::Seq(SeqCommand::Partition(s)) => {
            partition_assembly(&s.fasta_filename, &s.output_filename, s.window_size)?;
        },
        Command::Seq(SeqCommand::Mask(s)) => {
            mask_assembly(&s.fasta_filename, &s.vcf_filename, &s.output_filename)?;
        },
        Command::Seq(SeqCommand::Split(s)) => {
            let outputs = split_alignments_by_contig(&s.input_filename, &s.output_template, s.max_open_files)?;
            info!("Split into {} files", outputs.len());
        },
        Command::Vars(VarsCommand::Simblocks(s)) => {
            simulate_blocks(&s.vcf_filename, &s.output_filename, s.block_size, s.gap)?;
        },
        Command::Vars(VarsCommand::Split(s)) => {
            let outputs = split_variants_by_contig(&s.input_filename, &s.output_template, s.max_open_files)?;
            info!("Split into {} files", outputs.len());
        }
    };
    Ok(())
}

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);

    let start_time: Instant = Instant::now();
    if let Err(e) = run(&cli_settings) {
        error!("Error during processing: {}", e);
        std::process::exit(exit_code(e.as_ref()));
    }
    info!("Finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());
    info!("All jobs completed successfully.");
}
