use crate::data_types::variants::VariantCatalog;

use bio::io::fasta;
use flate2::bufread::MultiGzDecoder;
use log::{debug, info};
use simple_error::bail;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Opens a FASTA reader, transparently decoding a `.gz` file
fn open_fasta(fasta_fn: &Path) -> Result<fasta::Reader<Box<dyn BufRead>>, Box<dyn std::error::Error>> {
    let fasta_file: std::fs::File = std::fs::File::open(fasta_fn)?;
    let file_reader = BufReader::new(fasta_file);
    let fasta_reader: fasta::Reader<Box<dyn BufRead>> = if fasta_fn.extension().unwrap_or_default() == "gz" {
        debug!("Detected gzip extension, loading assembly with MultiGzDecoder...");
        let gz_decoder = MultiGzDecoder::new(file_reader);
        fasta::Reader::from_bufread(Box::new(BufReader::new(gz_decoder)))
    } else {
        debug!("Loading assembly as plain-text file...");
        fasta::Reader::from_bufread(Box::new(file_reader))
    };
    Ok(fasta_reader)
}

/// Splits every sequence of an assembly into consecutive windows of `window_size` bases.
/// Windows are named `<id>_<n>` with `n` counting from 0, and the last window of a sequence may be shorter.
/// Returns the number of windows written.
/// # Arguments
/// * `fasta_fn` - the input FASTA, gzip is allowed
/// * `out_fn` - the output FASTA
/// * `window_size` - bases per window, must be > 0
/// # Errors
/// * if `window_size` is 0
/// * any FASTA read or write failure
pub fn partition_assembly(fasta_fn: &Path, out_fn: &Path, window_size: usize) -> Result<u64, Box<dyn std::error::Error>> {
    if window_size == 0 {
        bail!("window size must be > 0");
    }
    info!("Partitioning {:?} into {} bp windows...", fasta_fn, window_size);
    let fasta_reader = open_fasta(fasta_fn)?;
    let mut writer = fasta::Writer::to_file(out_fn)?;
    let description: String = format!("windowsize:{}", window_size);

    let mut sequences: u64 = 0;
    let mut windows: u64 = 0;
    for entry in fasta_reader.records() {
        let record: fasta::Record = entry?;
        sequences += 1;
        for (n, window) in record.seq().chunks(window_size).enumerate() {
            let window_id: String = format!("{}_{}", record.id(), n);
            writer.write(&window_id, Some(description.as_str()), window)?;
            windows += 1;
        }
    }
    writer.flush()?;
    info!("Wrote {} windows from {} sequences to {:?}.", windows, sequences, out_fn);
    Ok(windows)
}

/// Replaces the base at every variant position of an assembly with `N`.
/// Sequences without variants and positions past the end of a sequence are left alone.
/// Returns the number of masked bases.
/// # Arguments
/// * `fasta_fn` - the input FASTA, gzip is allowed
/// * `vcf_fn` - the variants marking positions to mask
/// * `out_fn` - the output FASTA
/// # Errors
/// * if the variants cannot be loaded or none are present
/// * any FASTA read or write failure
pub fn mask_assembly(fasta_fn: &Path, vcf_fn: &Path, out_fn: &Path) -> Result<u64, Box<dyn std::error::Error>> {
    let catalog: VariantCatalog = VariantCatalog::from_vcf(vcf_fn)?;
    info!("Masking {} variant positions in {:?}...", catalog.len(), fasta_fn);
    let fasta_reader = open_fasta(fasta_fn)?;
    let mut writer = fasta::Writer::to_file(out_fn)?;

    let mut masked: u64 = 0;
    for entry in fasta_reader.records() {
        let record: fasta::Record = entry?;
        let mut sequence: Vec<u8> = record.seq().to_vec();
        let mut record_masked: u64 = 0;
        for position in catalog.positions(record.id()) {
            if let Some(base) = sequence.get_mut((position - 1) as usize) {
                *base = b'N';
                record_masked += 1;
            }
        }
        debug!("Masked {} bases in {}", record_masked, record.id());
        masked += record_masked;
        writer.write(record.id(), record.desc(), &sequence)?;
    }
    writer.flush()?;
    info!("Masked {} bases, written to {:?}.", masked, out_fn);
    Ok(masked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_assembly() {
        for input in ["./test_data/assembly.fa", "./test_data/assembly.fa.gz"] {
            let tmp = tempfile::tempdir().unwrap();
            let out_fn = tmp.path().join("windows.fa");
            let windows = partition_assembly(Path::new(input), &out_fn, 6).unwrap();
            assert_eq!(windows, 4);

            let records: Vec<fasta::Record> = fasta::Reader::from_file(&out_fn).unwrap()
                .records().map(|r| r.unwrap()).collect();
            let ids: Vec<&str> = records.iter().map(|r| r.id()).collect();
            assert_eq!(ids, vec!["chr1_0", "chr1_1", "chr1_2", "chr2_0"]);
            assert_eq!(records[0].seq(), b"ACGTAC");
            assert_eq!(records[2].seq(), b"ACG");
            assert_eq!(records[3].seq(), b"ttttt");
            assert!(records.iter().all(|r| r.desc() == Some("windowsize:6")));
        }
    }

    #[test]
    fn test_mask_assembly() {
        let tmp = tempfile::tempdir().unwrap();
        let out_fn = tmp.path().join("masked.fa");
        // chr1:100 and chr1:110 lie past the end of chr1
        let masked = mask_assembly(Path::new("./test_data/assembly.fa.gz"), Path::new("./test_data/noblocks.vcf"), &out_fn).unwrap();
        assert_eq!(masked, 2);

        let records: Vec<fasta::Record> = fasta::Reader::from_file(&out_fn).unwrap()
            .records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "chr1");
        assert_eq!(records[0].desc(), Some("first chromosome"));
        assert_eq!(records[0].seq(), b"ACGTACGTANGTACG");
        assert_eq!(records[1].seq(), b"ttttN");
    }

    #[test]
    fn test_mask_missing_variants() {
        let tmp = tempfile::tempdir().unwrap();
        let result = mask_assembly(Path::new("./test_data/assembly.fa"), Path::new("./test_data/missing.vcf"), &tmp.path().join("out.fa"));
        assert!(result.is_err());
    }

    #[test]
    fn test_partition_zero_window() {
        let tmp = tempfile::tempdir().unwrap();
        let result = partition_assembly(Path::new("./test_data/assembly.fa"), &tmp.path().join("out.fa"), 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_partition_missing_input() {
        let tmp = tempfile::tempdir().unwrap();
        let result = partition_assembly(Path::new("./test_data/missing.fa"), &tmp.path().join("out.fa"), 5);
        assert!(result.is_err());
    }
}
