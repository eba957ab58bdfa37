
use crate::bitstring_genome::BitstringGenome;
use crate::data_types::links::LinkStore;
use crate::data_types::solutions::{read_phasing, write_phasing};
use crate::evaluation::{PhasingAccuracy, evaluate_phasing};
use crate::ga_engine::{GaParameters, GeneticAlgorithm, OptimizationResult, optimize};
use crate::link_builder::{PhaseLinkMode, phasing_links_from_alignments};
use crate::operators::{MultiMutator, MutationKind};
use crate::scoring::phase_score;
use crate::visualization::ScriptRunner;
use crate::writers::accuracy_writer::write_phasing_accuracy;
use crate::writers::paths::{ensure_parent_dir, prefixed_path};
use crate::writers::progress_writer::ProgressWriter;

use log::{info, warn};
use rustc_hash::FxHashMap as HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Operators used for phasings
pub const PHASE_MUTATORS: [MutationKind; 2] = [MutationKind::Invert, MutationKind::Switch];

/// Everything needed for one `phase infer` run
#[derive(Clone, Debug)]
pub struct PhaseConfig {
    /// Links file, optionally gzipped
    pub links_filename: PathBuf,
    /// Output prefix, files are `<prefix>.<tag>.phasing.txt` and friends
    pub output_prefix: PathBuf,
    /// Label separating several runs over the same prefix
    pub run_tag: String,
    /// Optional true phasing used for accuracy reporting
    pub key_filename: Option<PathBuf>,
    pub iterations: usize,
    pub report_frequency: f64,
    pub parameters: GaParameters,
    /// Plotting is skipped when absent
    pub visualizer: Option<ScriptRunner>
}

/// Files produced by a phasing run
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseOutputs {
    pub phasing: PathBuf,
    pub progression: PathBuf,
    pub accuracy: Option<PathBuf>
}

/// Assigns a phase to every entity of `links` with the genetic algorithm
/// # Errors
/// * `EmptyResult` if `links` has no entities
/// * invalid `parameters`
pub fn phase(
    links: Arc<LinkStore>, parameters: GaParameters, iterations: usize, report_frequency: f64
) -> Result<OptimizationResult<BitstringGenome, HashMap<String, bool>>, Box<dyn std::error::Error>> {
    let mutator: MultiMutator<BitstringGenome> = MultiMutator::from_kinds(&PHASE_MUTATORS)?;
    let mut engine: GeneticAlgorithm<BitstringGenome> = GeneticAlgorithm::new(parameters, mutator)?;
    let template: BitstringGenome = BitstringGenome::new(links, phase_score);
    let result = optimize(&mut engine, &template, iterations, report_frequency, |g: &BitstringGenome| g.decode())?;
    result.statistics.log_summary();
    Ok(result)
}

/// Loads links, phases them, and writes the phasing, the progression and, when a key is configured, the accuracy file.
/// A plot failure is logged and ignored.
/// # Errors
/// * if the links or key cannot be loaded
/// * if optimization or evaluation fails
/// * if an output file cannot be written
pub fn run_phase_infer(config: &PhaseConfig) -> Result<PhaseOutputs, Box<dyn std::error::Error>> {
    let links: LinkStore = LinkStore::load_links(&config.links_filename)?;
    let key: Option<HashMap<String, bool>> = match config.key_filename.as_ref() {
        Some(filename) => Some(read_phasing(filename)?),
        None => None
    };

    let result = phase(Arc::new(links), config.parameters.clone(), config.iterations, config.report_frequency)?;

    let run_prefix: PathBuf = prefixed_path(&config.output_prefix, &format!(".{}", config.run_tag));
    let phasing_filename: PathBuf = prefixed_path(&run_prefix, ".phasing.txt");
    ensure_parent_dir(&phasing_filename)?;
    write_phasing(&phasing_filename, &result.solution)?;
    info!("Wrote phasing of {} entities to {:?}", result.solution.len(), phasing_filename);

    let progression_filename: PathBuf = prefixed_path(&run_prefix, ".opt.txt");
    let mut progress_writer: ProgressWriter = ProgressWriter::new(&progression_filename)?;
    for snapshot in result.snapshots.iter() {
        let accuracy: Option<f64> = match key.as_ref() {
            Some(k) => Some(evaluate_phasing(&snapshot.solution, k)?.global),
            None => None
        };
        progress_writer.write_snapshot(snapshot.iteration, snapshot.score, accuracy)?;
    }

    let mut accuracy_filename: Option<PathBuf> = None;
    if let Some(k) = key.as_ref() {
        let accuracy: PhasingAccuracy = evaluate_phasing(&result.solution, k)?;
        info!("Evaluated phasing with scores {:.6}, {:?}, {:?} over {} comparisons",
            accuracy.global, accuracy.near, accuracy.mid, accuracy.comparisons);
        let filename: PathBuf = prefixed_path(&run_prefix, ".qscore.txt");
        write_phasing_accuracy(&filename, &accuracy)?;
        accuracy_filename = Some(filename);
    }

    if let Some(runner) = config.visualizer.as_ref() {
        if let Err(e) = runner.optimization_plot(&progression_filename, &config.run_tag, &prefixed_path(&run_prefix, ".opt.png")) {
            warn!("Visualization failed: {}", e);
        }
    }

    Ok(PhaseOutputs {
        phasing: phasing_filename,
        progression: progression_filename,
        accuracy: accuracy_filename
    })
}

/// Compares a phasing file with a key, optionally writing the accuracy file
/// # Errors
/// * if either file cannot be read
/// * `EmptyResult` if they share no entity
pub fn run_phase_eval(phasing_filename: &Path, key_filename: &Path, output_filename: Option<&Path>) -> Result<PhasingAccuracy, Box<dyn std::error::Error>> {
    let inferred: HashMap<String, bool> = read_phasing(phasing_filename)?;
    let key: HashMap<String, bool> = read_phasing(key_filename)?;
    let accuracy: PhasingAccuracy = evaluate_phasing(&inferred, &key)?;
    if let Some(filename) = output_filename {
        ensure_parent_dir(filename)?;
        write_phasing_accuracy(filename, &accuracy)?;
    }
    Ok(accuracy)
}

/// Builds variant or block links from paired alignments and a variant file, then writes them out
/// # Errors
/// * if the inputs cannot be read or produce no links
/// * if the output cannot be written
pub fn run_phase_prep(alignment_filename: &Path, variant_filename: &Path, mode: PhaseLinkMode, output_filename: &Path) -> Result<LinkStore, Box<dyn std::error::Error>> {
    let links: LinkStore = phasing_links_from_alignments(alignment_filename, variant_filename, mode)?;
    ensure_parent_dir(output_filename)?;
    links.write_links(output_filename)?;
    info!("Wrote {} {} links to {:?}", links.num_links(), mode, output_filename);
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let mut links = LinkStore::new();
        for name in ["chr1_1", "chr1_2", "chr1_3"] {
            links.id(name);
        }
        links.set(0, 1, 2.0).unwrap();
        links.set(1, 2, -1.0).unwrap();
        let links_filename = dir.join("phase.links.txt");
        links.write_links(&links_filename).unwrap();

        let key: HashMap<String, bool> = [("chr1_1", false), ("chr1_2", false), ("chr1_3", true)]
            .into_iter()
            .map(|(n, p)| (n.to_string(), p))
            .collect();
        let key_filename = dir.join("key.phasing.txt");
        write_phasing(&key_filename, &key).unwrap();
        (links_filename, key_filename)
    }

    fn config(dir: &Path, links_filename: PathBuf, key_filename: Option<PathBuf>) -> PhaseConfig {
        PhaseConfig {
            links_filename,
            output_prefix: dir.join("run"),
            run_tag: "7".to_string(),
            key_filename,
            iterations: 50,
            report_frequency: 0.5,
            parameters: GaParameters { seed: Some(3), ..GaParameters::phasing_defaults() },
            visualizer: None
        }
    }

    #[test]
    fn test_run_phase_infer() {
        let tmp = tempfile::tempdir().unwrap();
        let (links_filename, key_filename) = phase_fixture(tmp.path());
        let outputs = run_phase_infer(&config(tmp.path(), links_filename, Some(key_filename.clone()))).unwrap();

        assert_eq!(outputs.phasing, tmp.path().join("run.7.phasing.txt"));
        assert_eq!(outputs.progression, tmp.path().join("run.7.opt.txt"));
        let progression = std::fs::read_to_string(&outputs.progression).unwrap();
        assert_eq!(progression.lines().count(), 2);

        let accuracy = run_phase_eval(&outputs.phasing, &key_filename, None).unwrap();
        assert_eq!(accuracy.global, 1.0);
        let qscore = std::fs::read_to_string(outputs.accuracy.unwrap()).unwrap();
        assert_eq!(qscore, "global near mid\n1.000000 1.000000 1.000000\n");
    }

    #[test]
    fn test_run_phase_infer_without_key() {
        let tmp = tempfile::tempdir().unwrap();
        let (links_filename, _) = phase_fixture(tmp.path());
        let outputs = run_phase_infer(&config(tmp.path(), links_filename, None)).unwrap();
        assert!(outputs.accuracy.is_none());
        assert_eq!(read_phasing(&outputs.phasing).unwrap().len(), 3);
    }

    #[test]
    fn test_run_phase_eval_written() {
        let tmp = tempfile::tempdir().unwrap();
        let (_, key_filename) = phase_fixture(tmp.path());
        let output = tmp.path().join("eval").join("key.qscore.txt");
        let accuracy = run_phase_eval(&key_filename, &key_filename, Some(&output)).unwrap();
        assert_eq!(accuracy.comparisons, 9);
        assert!(output.exists());
    }

    #[test]
    fn test_run_phase_prep() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("block.links.txt");
        let links = run_phase_prep(
            Path::new("./test_data/phase_pairs.sam"), Path::new("./test_data/variants.vcf"), PhaseLinkMode::Block, &output
        ).unwrap();
        assert_eq!(links.num_links(), 1);
        assert_eq!(LinkStore::load_links(&output).unwrap().size(), 2);
    }
}
