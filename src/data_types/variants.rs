
use crate::data_types::alignments::ReadAlignment;
use crate::data_types::errors::HicError;

use log::{info, warn};
use rust_htslib::bcf;
use rust_htslib::bcf::Read;
use rustc_hash::FxHashMap as HashMap;
use std::collections::BTreeMap;
use std::path::Path;

/// What a read shows at a variant position
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AlleleCall {
    Reference,
    Alternate,
    /// Any base matching neither allele
    Other
}

/// Index into the per-block call counts
const REF_COUNT: usize = 0;
const ALT_COUNT: usize = 1;
const OTHER_COUNT: usize = 2;

/// Per-block call counts in `[reference, alternate, other]` order
pub type BlockCounts = [u64; 3];

/// The variant fields needed to build phasing links
#[derive(Clone, Debug, PartialEq)]
pub struct VariantRecord {
    pub reference: Vec<u8>,
    pub alternate: Vec<u8>,
    /// Prior phase block from the INFO `BLOCK` tag
    pub block: Option<i64>
}

impl VariantRecord {
    /// Classifies a single read base against the alleles
    pub fn call(&self, base: u8) -> AlleleCall {
        if self.reference.len() == 1 && self.reference[0] == base {
            AlleleCall::Reference
        } else if self.alternate.len() == 1 && self.alternate[0] == base {
            AlleleCall::Alternate
        } else {
            AlleleCall::Other
        }
    }
}

/// Variants indexed by chromosome then 1-based position
#[derive(Clone, Debug, Default)]
pub struct VariantCatalog {
    variants: HashMap<String, BTreeMap<u64, VariantRecord>>,
    num_variants: usize
}

/// Reads the `BLOCK` INFO value, accepting integer or string-encoded integer tags
fn block_id(record: &mut bcf::Record) -> Option<i64> {
    if let Ok(Some(values)) = record.info(b"BLOCK").integer() {
        return values.first().map(|&v| v as i64);
    }
    if let Ok(Some(values)) = record.info(b"BLOCK").string() {
        return values.first().and_then(|v| String::from_utf8_lossy(v).parse::<i64>().ok());
    }
    None
}

impl VariantCatalog {
    pub fn new() -> VariantCatalog {
        Default::default()
    }

    /// Adds or replaces the variant at a position
    pub fn insert(&mut self, chrom: &str, position: u64, record: VariantRecord) {
        let previous = self.variants.entry(chrom.to_string()).or_default().insert(position, record);
        if previous.is_none() {
            self.num_variants += 1;
        }
    }

    pub fn get(&self, chrom: &str, position: u64) -> Option<&VariantRecord> {
        self.variants.get(chrom).and_then(|v| v.get(&position))
    }

    /// 1-based positions of every variant on `chrom`, in increasing order
    pub fn positions<'a>(&'a self, chrom: &str) -> impl Iterator<Item = u64> + 'a {
        self.variants.get(chrom).into_iter().flat_map(|v| v.keys().copied())
    }

    pub fn len(&self) -> usize {
        self.num_variants
    }

    pub fn is_empty(&self) -> bool {
        self.num_variants == 0
    }

    /// Loads every record of a VCF/BCF file; unreadable records are logged and skipped.
    /// # Errors
    /// * if the file cannot be opened
    /// * `EmptyResult` if no variants were loaded
    pub fn from_vcf(filename: &Path) -> Result<VariantCatalog, Box<dyn std::error::Error>> {
        info!("Loading variants from {:?}...", filename);
        let mut reader = bcf::Reader::from_path(filename)?;
        let mut catalog: VariantCatalog = VariantCatalog::new();
        let mut skipped: u64 = 0;
        for record_result in reader.records() {
            let mut record: bcf::Record = match record_result {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping unreadable variant record: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            let rid: u32 = match record.rid() {
                Some(r) => r,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            let block: Option<i64> = block_id(&mut record);
            let chrom: String = String::from_utf8_lossy(record.header().rid2name(rid)?).to_string();
            let alleles = record.alleles();
            let variant: VariantRecord = VariantRecord {
                reference: alleles.first().map(|a| a.to_vec()).unwrap_or_default(),
                alternate: alleles.get(1).map(|a| a.to_vec()).unwrap_or_default(),
                block
            };
            catalog.insert(&chrom, (record.pos() + 1) as u64, variant);
        }

        if catalog.is_empty() {
            return Err(Box::new(HicError::empty(format!("no variants found in {filename:?}"))));
        }
        info!("Finished loading {} variants ({} skipped).", catalog.len(), skipped);
        Ok(catalog)
    }

    /// Calls every known variant covered by a read.
    /// # Errors
    /// * `UnsupportedFormat` if the read CIGAR cannot be resolved
    pub fn allele_calls(&self, read: &ReadAlignment) -> Result<BTreeMap<u64, AlleleCall>, HicError> {
        let mut calls: BTreeMap<u64, AlleleCall> = BTreeMap::new();
        let chrom_variants = match self.variants.get(&read.contig) {
            Some(v) => v,
            None => return Ok(calls)
        };
        for (position, base) in read.genome_positions()? {
            if let Some(variant) = chrom_variants.get(&position) {
                calls.insert(position, variant.call(base));
            }
        }
        Ok(calls)
    }

    /// Tallies the calls of a read per prior phase block; variants without a block are ignored.
    /// # Errors
    /// * `UnsupportedFormat` if the read CIGAR cannot be resolved
    pub fn block_calls(&self, read: &ReadAlignment) -> Result<BTreeMap<i64, BlockCounts>, HicError> {
        let mut blocks: BTreeMap<i64, BlockCounts> = BTreeMap::new();
        let chrom_variants = match self.variants.get(&read.contig) {
            Some(v) => v,
            None => return Ok(blocks)
        };
        for (position, base) in read.genome_positions()? {
            if let Some(variant) = chrom_variants.get(&position) {
                if let Some(block) = variant.block {
                    let counts: &mut BlockCounts = blocks.entry(block).or_insert([0; 3]);
                    match variant.call(base) {
                        AlleleCall::Reference => counts[REF_COUNT] += 1,
                        AlleleCall::Alternate => counts[ALT_COUNT] += 1,
                        AlleleCall::Other => counts[OTHER_COUNT] += 1
                    };
                }
            }
        }
        Ok(blocks)
    }
}

/// Whether a block's counts lean reference (`Some(true)`), alternate (`Some(false)`), or neither
pub fn block_orientation(counts: &BlockCounts) -> Option<bool> {
    if counts[REF_COUNT] > counts[ALT_COUNT] {
        Some(true)
    } else if counts[REF_COUNT] < counts[ALT_COUNT] {
        Some(false)
    } else {
        None
    }
}

/// True when a block saw no base matching neither allele
pub fn block_is_clean(counts: &BlockCounts) -> bool {
    counts[OTHER_COUNT] == 0
}
