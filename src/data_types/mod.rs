/// Name-grouped Hi-C alignments and read pairing
pub mod alignments;
/// Error taxonomy shared across the crate
pub mod errors;
/// Symmetric weighted links between named entities
pub mod links;
/// Plain-text scaffolding and phasing solution files
pub mod solutions;
/// Variant catalog with allele and phase block calls
pub mod variants;
