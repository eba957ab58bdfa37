
use crate::data_types::errors::HicError;

use log::info;
use rustc_hash::FxHashMap as HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a scaffolding (or scaffolding key) file, one entity name per line in scaffold order.
/// Blank lines are ignored.
/// # Errors
/// * `ResourceUnavailable` if the file cannot be read
/// * `EmptyResult` if the file holds no names
pub fn read_scaffolding(filename: &Path) -> Result<Vec<String>, HicError> {
    let file: File = File::open(filename).map_err(|e| HicError::unavailable(filename, e))?;
    let mut scaffolding: Vec<String> = vec![];
    for line_result in BufReader::new(file).lines() {
        let line: String = line_result.map_err(|e| HicError::unavailable(filename, e))?;
        let name: &str = line.trim();
        if !name.is_empty() {
            scaffolding.push(name.to_string());
        }
    }
    if scaffolding.is_empty() {
        return Err(HicError::empty(format!("no scaffold entries in {filename:?}")));
    }
    info!("Loaded {} scaffold entries from {:?}", scaffolding.len(), filename);
    Ok(scaffolding)
}

/// Writes a scaffolding as one name per line.
/// # Errors
/// * `ResourceUnavailable` if the file cannot be written
pub fn write_scaffolding(filename: &Path, scaffolding: &[String]) -> Result<(), HicError> {
    let wrap = |e: std::io::Error| HicError::unavailable(filename, e);
    let mut writer = BufWriter::new(File::create(filename).map_err(wrap)?);
    for name in scaffolding.iter() {
        writeln!(writer, "{name}").map_err(wrap)?;
    }
    writer.flush().map_err(wrap)
}

/// Reads a phasing (or phasing key) file of `name 0|1` lines.
/// # Errors
/// * `ResourceUnavailable` if the file cannot be read
/// * `UnsupportedFormat` if a line is not a name followed by exactly `0` or `1`
/// * `EmptyResult` if the file holds no entries
pub fn read_phasing(filename: &Path) -> Result<HashMap<String, bool>, HicError> {
    let file: File = File::open(filename).map_err(|e| HicError::unavailable(filename, e))?;
    let mut phasing: HashMap<String, bool> = Default::default();
    for (line_index, line_result) in BufReader::new(file).lines().enumerate() {
        let line: String = line_result.map_err(|e| HicError::unavailable(filename, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(HicError::unsupported(filename, line_index + 1, format!("expected 2 columns, found {}", tokens.len())));
        }
        let phase: bool = match tokens[1] {
            "0" => false,
            "1" => true,
            other => {
                return Err(HicError::unsupported(filename, line_index + 1, format!("phase must be 0 or 1, found {other:?}")));
            }
        };
        phasing.insert(tokens[0].to_string(), phase);
    }
    if phasing.is_empty() {
        return Err(HicError::empty(format!("no phasing entries in {filename:?}")));
    }
    info!("Loaded {} phasing entries from {:?}", phasing.len(), filename);
    Ok(phasing)
}

/// Writes a phasing as `name 0|1` lines, sorted by name so output is stable.
/// # Errors
/// * `ResourceUnavailable` if the file cannot be written
pub fn write_phasing(filename: &Path, phasing: &HashMap<String, bool>) -> Result<(), HicError> {
    let wrap = |e: std::io::Error| HicError::unavailable(filename, e);
    let mut writer = BufWriter::new(File::create(filename).map_err(wrap)?);
    let mut names: Vec<&String> = phasing.keys().collect();
    names.sort();
    for name in names {
        writeln!(writer, "{} {}", name, u8::from(phasing[name])).map_err(wrap)?;
    }
    writer.flush().map_err(wrap)
}
