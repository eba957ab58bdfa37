
use log::{debug, info};
use rust_htslib::bcf;
use rust_htslib::bcf::Read;
use simple_error::bail;
use std::path::Path;

/// Assigns sorted variant positions to simulated phase blocks.
/// Blocks are `block_size` wide with `gap` bases between them, starting at position 0 of every chromosome.
/// Block numbers start at 1 and only advance past blocks that received a variant.
#[derive(Clone, Debug)]
pub struct BlockSimulator {
    block_size: u64,
    gap: u64,
    /// Current block as `[start, end)`
    start: u64,
    end: u64,
    block: i64,
    chrom: Option<String>,
    saw_variant: bool
}

impl BlockSimulator {
    /// # Errors
    /// * if `block_size` is 0
    pub fn new(block_size: u64, gap: u64) -> Result<BlockSimulator, Box<dyn std::error::Error>> {
        if block_size == 0 {
            bail!("block size must be > 0");
        }
        Ok(BlockSimulator {
            block_size,
            gap,
            start: 0,
            end: block_size,
            block: 1,
            chrom: None,
            saw_variant: false
        })
    }

    /// Returns the block for a variant, or `None` if it falls in a gap or before the current block.
    /// # Arguments
    /// * `chrom` - the variant chromosome
    /// * `position` - the 1-based variant position
    pub fn assign(&mut self, chrom: &str, position: u64) -> Option<i64> {
        if self.chrom.as_deref() != Some(chrom) {
            if self.saw_variant {
                self.block += 1;
            }
            self.start = 0;
            self.end = self.block_size;
            self.chrom = Some(chrom.to_string());
            self.saw_variant = false;
        }

        loop {
            if position < self.start {
                return None;
            }
            if position < self.end {
                self.saw_variant = true;
                return Some(self.block);
            }
            self.start = self.end + self.gap;
            self.end = self.start + self.block_size;
            if self.saw_variant {
                self.block += 1;
                self.saw_variant = false;
            }
        }
    }
}

/// Counts from a block simulation run
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SimulationCounts {
    /// Variants written with a `BLOCK` tag
    pub written: u64,
    /// Variants that fell into a gap
    pub dropped: u64,
    /// Highest block number written
    pub last_block: i64
}

/// Copies a sorted variant file, tagging each variant with a simulated `BLOCK` INFO value.
/// Variants that fall between blocks are left out of the output.
/// # Arguments
/// * `vcf_fn` - the input VCF/BCF, it must not already define `BLOCK`
/// * `out_fn` - the output VCF
/// * `block_size` - bases per block
/// * `gap` - bases between consecutive blocks
/// # Errors
/// * if `block_size` is 0 or the input already defines `BLOCK`
/// * any VCF read or write failure
pub fn simulate_blocks(vcf_fn: &Path, out_fn: &Path, block_size: u64, gap: u64) -> Result<SimulationCounts, Box<dyn std::error::Error>> {
    let mut simulator: BlockSimulator = BlockSimulator::new(block_size, gap)?;
    info!("Simulating {} bp phase blocks with {} bp gaps from {:?}...", block_size, gap, vcf_fn);

    let mut reader: bcf::Reader = bcf::Reader::from_path(vcf_fn)?;
    if reader.header().info_type(b"BLOCK").is_ok() {
        bail!("{:?} already defines a BLOCK INFO field", vcf_fn);
    }
    let mut output_header: bcf::header::Header = bcf::header::Header::from_template(reader.header());
    let cli_version: &str = &crate::cli::FULL_VERSION;
    output_header.push_record(format!(r#"##hicga_version="{cli_version}""#).as_bytes());
    output_header.push_record(r#"##INFO=<ID=BLOCK,Number=1,Type=Integer,Description="Simulated phase block">"#.as_bytes());
    let mut writer: bcf::Writer = bcf::Writer::from_path(out_fn, &output_header, true, bcf::Format::Vcf)?;

    let mut counts: SimulationCounts = Default::default();
    for record_result in reader.records() {
        let mut record: bcf::Record = record_result?;
        let rid: u32 = match record.rid() {
            Some(r) => r,
            None => {
                counts.dropped += 1;
                continue;
            }
        };
        let chrom: String = String::from_utf8_lossy(record.header().rid2name(rid)?).to_string();
        let position: u64 = (record.pos() + 1) as u64;
        match simulator.assign(&chrom, position) {
            Some(block) => {
                writer.translate(&mut record);
                record.push_info_integer(b"BLOCK", &[block as i32])?;
                writer.write(&record)?;
                counts.written += 1;
                counts.last_block = block;
            },
            None => {
                debug!("Dropping {}:{}, it falls between blocks", chrom, position);
                counts.dropped += 1;
            }
        }
    }

    info!("Wrote {} variants in {} blocks, dropped {}.", counts.written, counts.last_block, counts.dropped);
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::variants::VariantCatalog;

    #[test]
    fn test_assign_contiguous_blocks() {
        let mut simulator = BlockSimulator::new(50, 0).unwrap();
        let blocks: Vec<Option<i64>> = [("chr1", 10), ("chr1", 20), ("chr1", 100), ("chr1", 110), ("chr2", 5)]
            .iter()
            .map(|&(c, p)| simulator.assign(c, p))
            .collect();
        assert_eq!(blocks, vec![Some(1), Some(1), Some(2), Some(2), Some(3)]);
    }

    #[test]
    fn test_assign_with_gaps() {
        let mut simulator = BlockSimulator::new(15, 10).unwrap();
        assert_eq!(simulator.assign("chr1", 10), Some(1));
        // [15, 25) is a gap
        assert_eq!(simulator.assign("chr1", 20), None);
        assert_eq!(simulator.assign("chr1", 30), Some(2));
        // empty blocks in between do not use up numbers
        assert_eq!(simulator.assign("chr1", 105), Some(3));
        assert_eq!(simulator.assign("chr2", 1), Some(4));
    }

    #[test]
    fn test_zero_block_size() {
        assert!(BlockSimulator::new(0, 5).is_err());
    }

    #[test]
    fn test_simulate_blocks() {
        let tmp = tempfile::tempdir().unwrap();
        let out_fn = tmp.path().join("blocks.vcf");
        let counts = simulate_blocks(Path::new("./test_data/noblocks.vcf"), &out_fn, 15, 10).unwrap();
        assert_eq!(counts, SimulationCounts { written: 4, dropped: 1, last_block: 3 });

        let catalog = VariantCatalog::from_vcf(&out_fn).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get("chr1", 10).unwrap().block, Some(1));
        assert!(catalog.get("chr1", 20).is_none());
        assert_eq!(catalog.get("chr1", 100).unwrap().block, Some(2));
        assert_eq!(catalog.get("chr1", 110).unwrap().block, Some(2));
        assert_eq!(catalog.get("chr2", 5).unwrap().block, Some(3));
    }

    #[test]
    fn test_simulate_rejects_existing_blocks() {
        let tmp = tempfile::tempdir().unwrap();
        let result = simulate_blocks(Path::new("./test_data/variants.vcf"), &tmp.path().join("blocks.vcf"), 50, 0);
        assert!(result.is_err());
    }
}
