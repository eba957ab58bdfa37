use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// Writes the score progression of an optimizer run, one space-delimited row per snapshot
pub struct ProgressWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of the progression file
#[derive(Serialize)]
struct ProgressRow {
    /// the generation of the snapshot
    iteration: usize,
    /// best fitness at that generation
    score: f64,
    /// accuracy against a key, or "NA"
    accuracy: String
}

impl ProgressWriter {
    /// Creates a new writer for a given filename, no header line is written
    /// # Arguments
    /// * `filename` - the path to write the progression to
    pub fn new(filename: &Path) -> csv::Result<ProgressWriter> {
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_path(filename)?;
        Ok(ProgressWriter {
            csv_writer
        })
    }

    /// Writes one snapshot row.
    /// # Arguments
    /// * `iteration` - the snapshot generation
    /// * `score` - the best score at that generation
    /// * `accuracy` - accuracy against a key when one was given
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_snapshot(&mut self, iteration: usize, score: f64, accuracy: Option<f64>) -> Result<(), Box<dyn std::error::Error>> {
        let row: ProgressRow = ProgressRow {
            iteration,
            score,
            accuracy: format_optional(accuracy)
        };
        self.csv_writer.serialize(&row)?;
        self.csv_writer.flush()?;
        Ok(())
    }
}

/// Six-decimal rendering of a value, or `NA`
pub fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.6}", v),
        None => "NA".to_string()
    }
}
