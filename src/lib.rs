/// Splits assemblies into fixed-size windows and masks variant positions
pub mod assembly;
/// Fixed-length bitstring genome used for phasing
pub mod bitstring_genome;
/// Simulated phase blocks for variant files
pub mod block_sim;
/// CLI functionality and checks
pub mod cli;
/// Per-contig splitting of alignment and variant files
pub mod contig_split;
/// Contains multiple wrappers for useful data types in hicga
pub mod data_types;
/// Accuracy of scaffolding and phasing solutions against keys
pub mod evaluation;
/// Generational genetic algorithm engine and run driver
pub mod ga_engine;
/// The genome abstraction shared by both encodings
pub mod genome;
/// Builds scaffolding and phasing links from Hi-C alignments
pub mod link_builder;
/// Mutation and selection operators
pub mod operators;
/// Permutation genome used for scaffolding
pub mod ordered_genome;
/// Phasing workflows: infer, eval and prep
pub mod phaser;
/// Scaffolding workflows: infer, eval and prep
pub mod scaffolder;
/// Fitness functions
pub mod scoring;
/// External plotting script adapter
pub mod visualization;
/// Contains all the various output writer functionality
pub mod writers;
