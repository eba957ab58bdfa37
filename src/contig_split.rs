
use crate::writers::paths::{ensure_parent_dir, postfix_path};

use log::{debug, info};
use rust_htslib::bam;
use rust_htslib::bam::Read as BamRead;
use rust_htslib::bcf;
use rust_htslib::bcf::Read as BcfRead;
use rustc_hash::FxHashMap as HashMap;
use simple_error::bail;
use std::path::{Path, PathBuf};

/// Default cap on the number of per-contig outputs open at once
pub const MAX_OPEN_FILES: usize = 200;

/// Opens a new per-contig output path, failing once `max_open_files` outputs exist
fn next_output(output_template: &Path, contig: &str, opened: usize, max_open_files: usize) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if opened >= max_open_files {
        bail!("splitting needs more than {} open files, raise --max-open-files", max_open_files);
    }
    let path: PathBuf = postfix_path(output_template, contig);
    debug!("Opening {:?} for contig {}", path, contig);
    Ok(path)
}

/// Writes every mapped alignment record to a per-contig copy of the input.
/// Outputs are named from `output_template` with `_<contig>` inserted before the extension,
/// and are SAM for a `.sam` template or BAM otherwise. Records without a reference are skipped.
/// Returns the outputs in the order they were created.
/// # Errors
/// * if more than `max_open_files` contigs are seen
/// * any alignment read or write failure
pub fn split_alignments_by_contig(alignment_fn: &Path, output_template: &Path, max_open_files: usize) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    info!("Splitting {:?} by contig...", alignment_fn);
    ensure_parent_dir(output_template)?;
    let mut reader: bam::Reader = bam::Reader::from_path(alignment_fn)?;
    let header_view: bam::HeaderView = reader.header().clone();
    let output_header: bam::header::Header = bam::header::Header::from_template(&header_view);
    let bam_format: bam::Format = if output_template.extension().unwrap_or_default() == "sam" {
        bam::Format::Sam
    } else {
        bam::Format::Bam
    };

    let mut writers: HashMap<i32, bam::Writer> = Default::default();
    let mut outputs: Vec<PathBuf> = vec![];
    let mut skipped: u64 = 0;
    let mut written: u64 = 0;
    for record_result in reader.records() {
        let record: bam::Record = record_result?;
        let tid: i32 = record.tid();
        if tid < 0 {
            skipped += 1;
            continue;
        }
        if !writers.contains_key(&tid) {
            let contig: String = String::from_utf8_lossy(header_view.tid2name(tid as u32)).to_string();
            let path: PathBuf = next_output(output_template, &contig, outputs.len(), max_open_files)?;
            let writer: bam::Writer = bam::Writer::from_path(&path, &output_header, bam_format)?;
            writers.insert(tid, writer);
            outputs.push(path);
        }
        if let Some(writer) = writers.get_mut(&tid) {
            writer.write(&record)?;
            written += 1;
        }
    }

    info!("Wrote {} alignments to {} contig files, skipped {} without a reference.", written, outputs.len(), skipped);
    Ok(outputs)
}

/// Writes every variant record to a per-contig copy of the input.
/// Outputs are named from `output_template` with `_<contig>` inserted before the extension,
/// and are BCF for a `.bcf` template, compressed VCF for `.gz`, or plain VCF otherwise.
/// Returns the outputs in the order they were created.
/// # Errors
/// * if more than `max_open_files` contigs are seen
/// * any variant read or write failure
pub fn split_variants_by_contig(vcf_fn: &Path, output_template: &Path, max_open_files: usize) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    info!("Splitting {:?} by contig...", vcf_fn);
    ensure_parent_dir(output_template)?;
    let mut reader: bcf::Reader = bcf::Reader::from_path(vcf_fn)?;
    let output_header: bcf::header::Header = bcf::header::Header::from_template(reader.header());
    let extension = output_template.extension().unwrap_or_default();
    let (uncompressed, vcf_format): (bool, bcf::Format) = if extension == "bcf" {
        (false, bcf::Format::Bcf)
    } else {
        (extension != "gz", bcf::Format::Vcf)
    };

    let mut writers: HashMap<u32, bcf::Writer> = Default::default();
    let mut outputs: Vec<PathBuf> = vec![];
    let mut skipped: u64 = 0;
    let mut written: u64 = 0;
    for record_result in reader.records() {
        let mut record: bcf::Record = record_result?;
        let rid: u32 = match record.rid() {
            Some(r) => r,
            None => {
                skipped += 1;
                continue;
            }
        };
        if !writers.contains_key(&rid) {
            let contig: String = String::from_utf8_lossy(record.header().rid2name(rid)?).to_string();
            let path: PathBuf = next_output(output_template, &contig, outputs.len(), max_open_files)?;
            let writer: bcf::Writer = bcf::Writer::from_path(&path, &output_header, uncompressed, vcf_format)?;
            writers.insert(rid, writer);
            outputs.push(path);
        }
        if let Some(writer) = writers.get_mut(&rid) {
            writer.translate(&mut record);
            writer.write(&record)?;
            written += 1;
        }
    }

    info!("Wrote {} variants to {} contig files, skipped {} without a contig.", written, outputs.len(), skipped);
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_alignments(path: &Path) -> usize {
        let mut reader = bam::Reader::from_path(path).unwrap();
        reader.records().count()
    }

    fn count_variants(path: &Path) -> usize {
        let mut reader = bcf::Reader::from_path(path).unwrap();
        reader.records().count()
    }

    #[test]
    fn test_split_alignments() {
        let tmp = tempfile::tempdir().unwrap();
        let template = tmp.path().join("split").join("pairs.sam");
        let outputs = split_alignments_by_contig(Path::new("./test_data/pairs.sam"), &template, MAX_OPEN_FILES).unwrap();
        let expected: Vec<PathBuf> = ["ctg_0", "ctg_1", "ctg_2"].iter()
            .map(|c| tmp.path().join("split").join(format!("pairs_{c}.sam")))
            .collect();
        assert_eq!(outputs, expected);

        // r3's unmapped mate has no reference and is skipped
        let counts: Vec<usize> = outputs.iter().map(|p| count_alignments(p)).collect();
        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_split_alignments_file_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let result = split_alignments_by_contig(Path::new("./test_data/pairs.sam"), &tmp.path().join("pairs.sam"), 2);
        assert!(result.is_err());
    }

    #[test]
    fn test_split_variants() {
        let tmp = tempfile::tempdir().unwrap();
        let template = tmp.path().join("calls.vcf");
        let outputs = split_variants_by_contig(Path::new("./test_data/noblocks.vcf"), &template, MAX_OPEN_FILES).unwrap();
        assert_eq!(outputs, vec![tmp.path().join("calls_chr1.vcf"), tmp.path().join("calls_chr2.vcf")]);
        assert_eq!(count_variants(&outputs[0]), 4);
        assert_eq!(count_variants(&outputs[1]), 1);

        assert!(split_variants_by_contig(Path::new("./test_data/noblocks.vcf"), &template, 1).is_err());
    }
}
