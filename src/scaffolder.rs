
use crate::data_types::links::LinkStore;
use crate::data_types::solutions::{read_scaffolding, write_scaffolding};
use crate::evaluation::{ScaffoldAccuracy, evaluate_scaffolding};
use crate::ga_engine::{GaParameters, GeneticAlgorithm, OptimizationResult, optimize};
use crate::link_builder::scaffold_links_from_alignments;
use crate::operators::{MultiMutator, MutationKind};
use crate::ordered_genome::OrderedGenome;
use crate::scoring::scaffold_score;
use crate::visualization::ScriptRunner;
use crate::writers::accuracy_writer::write_scaffold_accuracy;
use crate::writers::paths::{ensure_parent_dir, prefixed_path};
use crate::writers::progress_writer::ProgressWriter;

use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Operators used for contig orderings
pub const SCAFFOLD_MUTATORS: [MutationKind; 3] = [MutationKind::Shift, MutationKind::Switch, MutationKind::Invert];

/// Everything needed for one `scaffold infer` run
#[derive(Clone, Debug)]
pub struct ScaffoldConfig {
    /// Links file, optionally gzipped
    pub links_filename: PathBuf,
    /// Output prefix, files are `<prefix>.scaff.txt` and friends
    pub output_prefix: PathBuf,
    /// Optional true ordering used for accuracy reporting
    pub key_filename: Option<PathBuf>,
    /// Only scaffold entities named `<tag>_*`
    pub subset_tag: Option<String>,
    pub iterations: usize,
    pub report_frequency: f64,
    pub parameters: GaParameters,
    /// Plotting is skipped when absent
    pub visualizer: Option<ScriptRunner>,
    /// Also plot heatmaps of the links under both orderings
    pub heatmaps: bool
}

/// Files produced by a scaffolding run
#[derive(Clone, Debug, PartialEq)]
pub struct ScaffoldOutputs {
    pub scaffolding: PathBuf,
    pub progression: PathBuf,
    pub accuracy: Option<PathBuf>
}

/// Orders the entities of `links` with the genetic algorithm.
/// Snapshots carry the decoded order at each report point.
/// # Errors
/// * `EmptyResult` if `links` has no entities
/// * invalid `parameters`
pub fn scaffold(
    links: Arc<LinkStore>, parameters: GaParameters, iterations: usize, report_frequency: f64
) -> Result<OptimizationResult<OrderedGenome, Vec<String>>, Box<dyn std::error::Error>> {
    let mutator: MultiMutator<OrderedGenome> = MultiMutator::from_kinds(&SCAFFOLD_MUTATORS)?;
    let mut engine: GeneticAlgorithm<OrderedGenome> = GeneticAlgorithm::new(parameters, mutator)?;
    let template: OrderedGenome = OrderedGenome::new(links, scaffold_score);
    let result = optimize(&mut engine, &template, iterations, report_frequency, |g: &OrderedGenome| g.decode())?;
    result.statistics.log_summary();
    Ok(result)
}

/// Loads links, applies the optional subset, scaffolds, and writes the order, the progression
/// and, when a key is configured, the accuracy file. Plot failures are logged and ignored.
/// # Errors
/// * if the links or key cannot be loaded
/// * if optimization fails
/// * if an output file cannot be written
pub fn run_scaffold_infer(config: &ScaffoldConfig) -> Result<ScaffoldOutputs, Box<dyn std::error::Error>> {
    let mut links: LinkStore = LinkStore::load_links(&config.links_filename)?;
    if let Some(tag) = config.subset_tag.as_ref() {
        links = links.subset(tag);
        info!("Subset {:?} retained {} of the entities.", tag, links.size());
    }
    let key: Option<Vec<String>> = match config.key_filename.as_ref() {
        Some(filename) => Some(read_scaffolding(filename)?),
        None => None
    };

    let result = scaffold(Arc::new(links), config.parameters.clone(), config.iterations, config.report_frequency)?;

    let scaffolding_filename: PathBuf = prefixed_path(&config.output_prefix, ".scaff.txt");
    ensure_parent_dir(&scaffolding_filename)?;
    write_scaffolding(&scaffolding_filename, &result.solution)?;
    info!("Wrote scaffolding of {} entities to {:?}", result.solution.len(), scaffolding_filename);

    let progression_filename: PathBuf = prefixed_path(&config.output_prefix, ".opt.txt");
    let mut progress_writer: ProgressWriter = ProgressWriter::new(&progression_filename)?;
    for snapshot in result.snapshots.iter() {
        let accuracy: Option<f64> = match key.as_ref() {
            Some(k) => Some(evaluate_scaffolding(&snapshot.solution, k)?.score),
            None => None
        };
        progress_writer.write_snapshot(snapshot.iteration, snapshot.score, accuracy)?;
    }

    let mut accuracy_filename: Option<PathBuf> = None;
    if let Some(k) = key.as_ref() {
        let accuracy: ScaffoldAccuracy = evaluate_scaffolding(&result.solution, k)?;
        info!("Evaluated scaffolding with score {:.6} and neighbor score {:.6} ({} orientation)",
            accuracy.score, accuracy.neighbor_score, accuracy.orientation);
        let filename: PathBuf = prefixed_path(&config.output_prefix, ".qscore.txt");
        write_scaffold_accuracy(&filename, &accuracy)?;
        accuracy_filename = Some(filename);
    }

    if let Some(runner) = config.visualizer.as_ref() {
        visualize_run(runner, config, &scaffolding_filename, &progression_filename);
    }

    Ok(ScaffoldOutputs {
        scaffolding: scaffolding_filename,
        progression: progression_filename,
        accuracy: accuracy_filename
    })
}

fn visualize_run(runner: &ScriptRunner, config: &ScaffoldConfig, scaffolding_filename: &Path, progression_filename: &Path) {
    let prefix: &Path = &config.output_prefix;
    let mut results = vec![];
    if let Some(key_filename) = config.key_filename.as_ref() {
        results.push(runner.order_plot(scaffolding_filename, key_filename, &prefixed_path(prefix, ".orderviz.png")));
        if config.heatmaps {
            results.push(runner.heatmap(&config.links_filename, key_filename, "true", &prefixed_path(prefix, ".heat.true.png")));
        }
    }
    if config.heatmaps {
        results.push(runner.heatmap(&config.links_filename, scaffolding_filename, "inferred", &prefixed_path(prefix, ".heat.inferred.png")));
    }
    results.push(runner.optimization_plot(progression_filename, "scaffolding", &prefixed_path(prefix, ".opt.png")));
    for result in results.into_iter() {
        if let Err(e) = result {
            warn!("Visualization failed: {}", e);
        }
    }
}

/// Compares a scaffolding file with a key, optionally writing the accuracy file
/// # Errors
/// * if either file cannot be read
/// * `EmptyResult` if they share fewer than three entities
pub fn run_scaffold_eval(scaffolding_filename: &Path, key_filename: &Path, output_filename: Option<&Path>) -> Result<ScaffoldAccuracy, Box<dyn std::error::Error>> {
    let inferred: Vec<String> = read_scaffolding(scaffolding_filename)?;
    let key: Vec<String> = read_scaffolding(key_filename)?;
    let accuracy: ScaffoldAccuracy = evaluate_scaffolding(&inferred, &key)?;
    if let Some(filename) = output_filename {
        ensure_parent_dir(filename)?;
        write_scaffold_accuracy(filename, &accuracy)?;
    }
    Ok(accuracy)
}

/// Builds contig links from paired alignments and writes them out
/// # Errors
/// * if the alignments cannot be read or produce no links
/// * if the output cannot be written
pub fn run_scaffold_prep(alignment_filename: &Path, output_filename: &Path) -> Result<LinkStore, Box<dyn std::error::Error>> {
    let links: LinkStore = scaffold_links_from_alignments(alignment_filename)?;
    ensure_parent_dir(output_filename)?;
    links.write_links(output_filename)?;
    info!("Wrote {} links to {:?}", links.num_links(), output_filename);
    Ok(links)
}
