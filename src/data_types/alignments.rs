
use crate::data_types::errors::HicError;

use log::{debug, info, warn};
use rust_htslib::bam;
use rust_htslib::bam::Read;
use rust_htslib::bam::record::Cigar;
use std::collections::BTreeMap;
use std::path::Path;

/// The parts of a mapped read needed to build links
#[derive(Clone, Debug, PartialEq)]
pub struct ReadAlignment {
    pub read_name: String,
    /// Reference sequence the read is mapped to
    pub contig: String,
    /// 1-based leftmost reference position
    pub position: u64,
    pub cigar: Vec<Cigar>,
    /// Read bases as ASCII
    pub sequence: Vec<u8>
}

impl ReadAlignment {
    /// Converts a primary mapped record; unmapped, secondary, and supplementary records give `None`.
    /// # Arguments
    /// * `record` - the record to convert
    /// * `header` - the header used to resolve the contig name
    pub fn from_record(record: &bam::Record, header: &bam::HeaderView) -> Option<ReadAlignment> {
        if record.is_unmapped() || record.is_secondary() || record.is_supplementary() || record.tid() < 0 {
            return None;
        }
        Some(ReadAlignment {
            read_name: String::from_utf8_lossy(record.qname()).to_string(),
            contig: String::from_utf8_lossy(header.tid2name(record.tid() as u32)).to_string(),
            position: (record.pos() + 1) as u64,
            cigar: record.cigar().iter().cloned().collect(),
            sequence: record.seq().as_bytes()
        })
    }

    /// Maps each 1-based reference position covered by the read to the read base aligned there.
    /// Soft clips consume read bases only and hard clips consume nothing.
    /// # Errors
    /// * `UnsupportedFormat` for any CIGAR operation other than match, soft clip, or hard clip
    pub fn genome_positions(&self) -> Result<BTreeMap<u64, u8>, HicError> {
        let mut positions: BTreeMap<u64, u8> = BTreeMap::new();
        let mut reference_position: u64 = self.position;
        let mut read_offset: usize = 0;
        for operation in self.cigar.iter() {
            match *operation {
                Cigar::Match(length) | Cigar::Equal(length) | Cigar::Diff(length) => {
                    for _ in 0..length {
                        if let Some(&base) = self.sequence.get(read_offset) {
                            positions.insert(reference_position, base);
                        }
                        reference_position += 1;
                        read_offset += 1;
                    }
                },
                Cigar::SoftClip(length) => {
                    read_offset += length as usize;
                },
                Cigar::HardClip(_) => {},
                other => {
                    return Err(HicError::unsupported_record(
                        format!("read {:?}", self.read_name),
                        format!("unsupported CIGAR operation {other:?}")
                    ));
                }
            };
        }
        Ok(positions)
    }
}

/// Groups consecutive alignments sharing a read name
#[derive(Default)]
pub struct ReadGrouper {
    current: Vec<ReadAlignment>
}

impl ReadGrouper {
    pub fn new() -> ReadGrouper {
        Default::default()
    }

    /// Adds an alignment, returning the previous group once a new read name starts
    pub fn push(&mut self, alignment: ReadAlignment) -> Option<Vec<ReadAlignment>> {
        let completed: Option<Vec<ReadAlignment>> = match self.current.first() {
            Some(first) if first.read_name != alignment.read_name => Some(std::mem::take(&mut self.current)),
            _ => None
        };
        self.current.push(alignment);
        completed
    }

    /// Returns the final group, if any
    pub fn finish(&mut self) -> Option<Vec<ReadAlignment>> {
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}

/// Counters from one pass over an alignment file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PairingStats {
    /// Records read from the file
    pub records: u64,
    /// Records that could not be parsed or were not primary mapped alignments
    pub skipped_records: u64,
    /// Read-name groups with exactly two alignments
    pub pairs: u64,
    /// Read-name groups of any other size
    pub skipped_groups: u64,
    /// Pairs rejected by the pair handler
    pub failed_pairs: u64
}

impl PairingStats {
    fn handle_group<F>(&mut self, group: Vec<ReadAlignment>, handler: &mut F)
    where
        F: FnMut(&ReadAlignment, &ReadAlignment) -> Result<(), HicError>
    {
        if group.len() != 2 {
            self.skipped_groups += 1;
            return;
        }
        self.pairs += 1;
        if let Err(e) = handler(&group[0], &group[1]) {
            warn!("Skipping read pair {:?}: {}", group[0].read_name, e);
            self.failed_pairs += 1;
        }
    }
}

/// Streams a name-grouped SAM/BAM file and calls `handler` for every read pair.
/// Parse failures on a record or a pair are logged and skipped.
/// # Arguments
/// * `filename` - the alignment file, records with the same name must be adjacent
/// * `handler` - called with both alignments of each pair
/// # Errors
/// * if the file cannot be opened
pub fn for_each_read_pair<F>(filename: &Path, mut handler: F) -> Result<PairingStats, Box<dyn std::error::Error>>
where
    F: FnMut(&ReadAlignment, &ReadAlignment) -> Result<(), HicError>
{
    info!("Loading read pairs from {:?}...", filename);
    let mut reader = bam::Reader::from_path(filename)?;
    let header: bam::HeaderView = reader.header().clone();

    let mut stats: PairingStats = Default::default();
    let mut grouper: ReadGrouper = ReadGrouper::new();
    for record_result in reader.records() {
        stats.records += 1;
        let record: bam::Record = match record_result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping unreadable alignment record {}: {}", stats.records, e);
                stats.skipped_records += 1;
                continue;
            }
        };
        let alignment: ReadAlignment = match ReadAlignment::from_record(&record, &header) {
            Some(a) => a,
            None => {
                stats.skipped_records += 1;
                continue;
            }
        };
        if let Some(group) = grouper.push(alignment) {
            stats.handle_group(group, &mut handler);
        }
    }
    if let Some(group) = grouper.finish() {
        stats.handle_group(group, &mut handler);
    }

    info!("Processed {} alignment records into {} read pairs.", stats.records, stats.pairs);
    debug!("Pairing statistics: {:?}", stats);
    Ok(stats)
}
