use log::{debug, info};
use simple_error::bail;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Plot comparing an inferred contig order with the key order
pub const ORDER_PLOT_SCRIPT: &str = "scaffplot.py";
/// Contact heatmap of a links file under a given ordering
pub const HEATMAP_SCRIPT: &str = "heatmap.py";
/// Score progression plot from an `.opt.txt` file
pub const OPTIMIZATION_PLOT_SCRIPT: &str = "optimizationviz.py";

/// Runs the external plotting scripts, blocking until each finishes
#[derive(Clone, Debug)]
pub struct ScriptRunner {
    /// Program used to run each script, e.g. `python3`
    interpreter: String,
    /// Directory holding the scripts
    scripts_dir: PathBuf
}

impl ScriptRunner {
    pub fn new(interpreter: &str, scripts_dir: &Path) -> ScriptRunner {
        ScriptRunner {
            interpreter: interpreter.to_string(),
            scripts_dir: scripts_dir.to_path_buf()
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Runs `<interpreter> <scripts_dir>/<script> --flag value ...`
    /// # Errors
    /// * if the interpreter cannot be started
    /// * if the script exits unsuccessfully
    pub fn run(&self, script: &str, arguments: &[(&str, &Path)]) -> Result<(), Box<dyn std::error::Error>> {
        let mut command: Command = Command::new(&self.interpreter);
        command.arg(self.scripts_dir.join(script));
        for (flag, value) in arguments.iter() {
            command.arg(format!("--{}", flag)).arg(value);
        }
        debug!("Running {:?}", command);
        let status: ExitStatus = command.status()?;
        if !status.success() {
            bail!("{} finished with {}", script, status);
        }
        Ok(())
    }

    /// Plots an inferred scaffolding against its key
    pub fn order_plot(&self, inferred: &Path, key: &Path, out_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        info!("Visualizing contig order dotplot to {:?}...", out_path);
        self.run(ORDER_PLOT_SCRIPT, &[("inferred", inferred), ("actual", key), ("outpath", out_path)])
    }

    /// Plots the contact heatmap of `links` under `ordering`
    pub fn heatmap(&self, links: &Path, ordering: &Path, label: &str, out_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        info!("Visualizing {} heatmap to {:?}...", label, out_path);
        self.run(HEATMAP_SCRIPT, &[
            ("inpath", links), ("outpath", out_path), ("label", Path::new(label)), ("ordering", ordering)
        ])
    }

    /// Plots the score progression of a run
    pub fn optimization_plot(&self, scores: &Path, label: &str, out_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        info!("Visualizing optimization progression to {:?}...", out_path);
        self.run(OPTIMIZATION_PLOT_SCRIPT, &[("scores", scores), ("label", Path::new(label)), ("outpath", out_path)])
    }
}
