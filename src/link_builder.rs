use crate::data_types::alignments::{PairingStats, ReadAlignment, for_each_read_pair};
use crate::data_types::errors::HicError;
use crate::data_types::links::LinkStore;
use crate::data_types::variants::{AlleleCall, BlockCounts, VariantCatalog, block_is_clean, block_orientation};

use log::info;
use std::collections::BTreeMap;
use std::path::Path;

/// Which entities phasing links are built between
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PhaseLinkMode {
    /// One entity per variant position
    Variant,
    /// One entity per prior phase block
    Block
}

/// Registers the contigs of two mates and adds a unit link between them.
/// Mates on the same contig register that contig but add no link.
/// Returns true if a link was added.
pub fn add_scaffold_pair(links: &mut LinkStore, read1: &ReadAlignment, read2: &ReadAlignment) -> Result<bool, HicError> {
    let id1: usize = links.id(&read1.contig);
    let id2: usize = links.id(&read2.contig);
    if id1 == id2 {
        return Ok(false);
    }
    links.add(id1, id2, 1.0)?;
    Ok(true)
}

/// Tabulates +1 (same call) or -1 (different call) links between variant positions.
/// With `same_read` each position pair `k1 > k2` counts once, otherwise every pair of distinct positions counts.
/// `Other` calls are ignored. Returns the number of links added.
/// # Arguments
/// * `links` - the store to add to
/// * `chrom` - prefix for the `chrom_position` entity names
/// * `calls1` - calls from the first read
/// * `calls2` - calls from the second read (the same read when `same_read`)
/// * `same_read` - whether both call sets come from one read
pub fn tabulate_variant_links(
    links: &mut LinkStore, chrom: &str,
    calls1: &BTreeMap<u64, AlleleCall>, calls2: &BTreeMap<u64, AlleleCall>,
    same_read: bool
) -> Result<u64, HicError> {
    let mut count: u64 = 0;
    for (&k1, &c1) in calls1.iter() {
        for (&k2, &c2) in calls2.iter() {
            let counted: bool = if same_read { k1 > k2 } else { k1 != k2 };
            if !counted || c1 == AlleleCall::Other || c2 == AlleleCall::Other {
                continue;
            }
            let id1: usize = links.id(&format!("{chrom}_{k1}"));
            let id2: usize = links.id(&format!("{chrom}_{k2}"));
            links.add(id1, id2, if c1 == c2 { 1.0 } else { -1.0 })?;
            count += 1;
        }
    }
    Ok(count)
}

/// Tabulates +1 (both blocks lean the same way) or -1 links between distinct blocks seen by two mates.
/// Blocks with any `Other` call are ignored. Returns the number of links added.
pub fn tabulate_block_links(
    links: &mut LinkStore, chrom: &str,
    blocks1: &BTreeMap<i64, BlockCounts>, blocks2: &BTreeMap<i64, BlockCounts>
) -> Result<u64, HicError> {
    let mut count: u64 = 0;
    for (&b1, counts1) in blocks1.iter() {
        for (&b2, counts2) in blocks2.iter() {
            if b1 == b2 || !block_is_clean(counts1) || !block_is_clean(counts2) {
                continue;
            }
            let in_phase: bool = match (block_orientation(counts1), block_orientation(counts2)) {
                (Some(o1), Some(o2)) => o1 == o2,
                _ => false
            };
            let id1: usize = links.id(&format!("{chrom}_{b1}"));
            let id2: usize = links.id(&format!("{chrom}_{b2}"));
            links.add(id1, id2, if in_phase { 1.0 } else { -1.0 })?;
            count += 1;
        }
    }
    Ok(count)
}

/// Adds the variant links supported by one read pair; mates on different chromosomes add nothing.
/// # Errors
/// * `UnsupportedFormat` if either CIGAR cannot be resolved
pub fn add_variant_pair(links: &mut LinkStore, catalog: &VariantCatalog, read1: &ReadAlignment, read2: &ReadAlignment) -> Result<u64, HicError> {
    if read1.contig != read2.contig {
        return Ok(0);
    }
    let calls1 = catalog.allele_calls(read1)?;
    let calls2 = catalog.allele_calls(read2)?;
    let chrom: &str = &read1.contig;
    let mut count: u64 = tabulate_variant_links(links, chrom, &calls1, &calls2, false)?;
    count += tabulate_variant_links(links, chrom, &calls1, &calls1, true)?;
    count += tabulate_variant_links(links, chrom, &calls2, &calls2, true)?;
    Ok(count)
}

/// Adds the block links supported by one read pair; mates on different chromosomes add nothing.
/// # Errors
/// * `UnsupportedFormat` if either CIGAR cannot be resolved
pub fn add_block_pair(links: &mut LinkStore, catalog: &VariantCatalog, read1: &ReadAlignment, read2: &ReadAlignment) -> Result<u64, HicError> {
    if read1.contig != read2.contig {
        return Ok(0);
    }
    let blocks1 = catalog.block_calls(read1)?;
    let blocks2 = catalog.block_calls(read2)?;
    tabulate_block_links(links, &read1.contig, &blocks1, &blocks2)
}

fn check_links(links: LinkStore, stats: &PairingStats, added: u64, label: &str) -> Result<LinkStore, Box<dyn std::error::Error>> {
    info!("Built {} {} links over {} entities from {} read pairs ({} failed, {} unpaired groups).",
        added, label, links.size(), stats.pairs, stats.failed_pairs, stats.skipped_groups);
    if links.is_empty() {
        return Err(Box::new(HicError::empty(format!("no {label} links could be built"))));
    }
    Ok(links)
}

/// Builds contig-to-contig links from a name-grouped alignment file.
/// # Errors
/// * if the file cannot be read
/// * `EmptyResult` if no link was produced
pub fn scaffold_links_from_alignments(alignment_filename: &Path) -> Result<LinkStore, Box<dyn std::error::Error>> {
    let mut links: LinkStore = LinkStore::new();
    let mut added: u64 = 0;
    let stats = for_each_read_pair(alignment_filename, |read1, read2| {
        if add_scaffold_pair(&mut links, read1, read2)? {
            added += 1;
        }
        Ok(())
    })?;
    check_links(links, &stats, added, "scaffolding")
}

/// Builds variant or block phasing links from a name-grouped alignment file and a variant file.
/// # Errors
/// * if either file cannot be read
/// * `EmptyResult` if no link was produced
pub fn phasing_links_from_alignments(alignment_filename: &Path, variant_filename: &Path, mode: PhaseLinkMode) -> Result<LinkStore, Box<dyn std::error::Error>> {
    let catalog: VariantCatalog = VariantCatalog::from_vcf(variant_filename)?;
    let mut links: LinkStore = LinkStore::new();
    let mut added: u64 = 0;
    let stats = for_each_read_pair(alignment_filename, |read1, read2| {
        added += match mode {
            PhaseLinkMode::Variant => add_variant_pair(&mut links, &catalog, read1, read2)?,
            PhaseLinkMode::Block => add_block_pair(&mut links, &catalog, read1, read2)?
        };
        Ok(())
    })?;
    check_links(links, &stats, added, &mode.to_string())
}
