use serde::Serialize;
use std::path::Path;

use crate::evaluation::{PhasingAccuracy, ScaffoldAccuracy};
use crate::writers::progress_writer::format_optional;

#[derive(Serialize)]
struct ScaffoldRow {
    score: String,
    neighbor_score: String
}

#[derive(Serialize)]
struct PhasingRow {
    global: String,
    near: String,
    mid: String
}

fn write_row<R: Serialize>(filename: &Path, row: &R) -> Result<(), Box<dyn std::error::Error>> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .from_path(filename)?;
    csv_writer.serialize(row)?;
    csv_writer.flush()?;
    Ok(())
}

/// Writes a scaffolding quality file: a `score neighbor_score` header and one value row
/// # Errors
/// * if the file cannot be written
pub fn write_scaffold_accuracy(filename: &Path, accuracy: &ScaffoldAccuracy) -> Result<(), Box<dyn std::error::Error>> {
    write_row(filename, &ScaffoldRow {
        score: format_optional(Some(accuracy.score)),
        neighbor_score: format_optional(Some(accuracy.neighbor_score))
    })
}

/// Writes a phasing quality file: a `global near mid` header and one value row, empty bands as `NA`
/// # Errors
/// * if the file cannot be written
pub fn write_phasing_accuracy(filename: &Path, accuracy: &PhasingAccuracy) -> Result<(), Box<dyn std::error::Error>> {
    write_row(filename, &PhasingRow {
        global: format_optional(Some(accuracy.global)),
        near: format_optional(accuracy.near),
        mid: format_optional(accuracy.mid)
    })
}
