
use crate::data_types::errors::HicError;
use crate::data_types::links::LinkStore;
use crate::genome::{Genome, ScoreFn, ordered_pair, shift_slice};

use bit_vec::BitVec;
use rand::Rng;
use rustc_hash::FxHashMap as HashMap;
use std::sync::Arc;

/// Phasing genome: one haplotype bit per entity, indexed by entity ID.
#[derive(Clone)]
pub struct BitstringGenome {
    genes: BitVec,
    links: Arc<LinkStore>,
    scorer: ScoreFn<BitstringGenome>,
    score: Option<f64>
}

impl std::fmt::Debug for BitstringGenome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitstringGenome")
            .field("genes", &self.genes)
            .field("score", &self.score)
            .finish()
    }
}

impl BitstringGenome {
    /// Creates an all-zero genome with one bit per registered entity
    pub fn new(links: Arc<LinkStore>, scorer: ScoreFn<BitstringGenome>) -> BitstringGenome {
        BitstringGenome {
            genes: BitVec::from_elem(links.size(), false),
            links,
            scorer,
            score: None
        }
    }

    /// Creates a genome from explicit phases.
    /// # Errors
    /// * `UnknownEntity` if there are more phases than registered entities
    /// * `UnsupportedFormat` if some registered entity has no phase
    pub fn with_phases(phases: &[bool], links: Arc<LinkStore>, scorer: ScoreFn<BitstringGenome>) -> Result<BitstringGenome, HicError> {
        if phases.len() > links.size() {
            return Err(HicError::UnknownEntity((phases.len() - 1).to_string()));
        }
        if phases.len() < links.size() {
            return Err(HicError::unsupported_record(
                "phasing",
                format!("{} phases for {} registered entities", phases.len(), links.size())
            ));
        }
        Ok(BitstringGenome {
            genes: BitVec::from_fn(phases.len(), |i| phases[i]),
            links,
            scorer,
            score: None
        })
    }

    /// Phase of the entity with ID `index`
    pub fn phase(&self, index: usize) -> bool {
        self.genes[index]
    }

    pub fn phases(&self) -> Vec<bool> {
        self.genes.iter().collect()
    }

    pub fn links(&self) -> &LinkStore {
        &self.links
    }

    /// Translates the bits into an entity name to phase map
    pub fn decode(&self) -> Result<HashMap<String, bool>, HicError> {
        self.links.decode_phasing(self.genes.iter())
    }
}

impl Genome for BitstringGenome {
    fn len(&self) -> usize {
        self.genes.len()
    }

    fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for i in 0..self.genes.len() {
            self.genes.set(i, rng.gen::<bool>());
        }
        self.score = None;
    }

    /// Two-point crossover, the inclusive window `[p1, p2]` is exchanged
    fn crossover(&self, other: &BitstringGenome, p1: usize, p2: usize) -> (BitstringGenome, BitstringGenome) {
        debug_assert_eq!(self.len(), other.len());
        debug_assert!(p1 <= p2 && p2 < self.len());
        let mut child_a: BitstringGenome = self.clone();
        let mut child_b: BitstringGenome = other.clone();
        child_a.score = None;
        child_b.score = None;
        for i in p1..=p2 {
            child_a.genes.set(i, other.genes[i]);
            child_b.genes.set(i, self.genes[i]);
        }
        (child_a, child_b)
    }

    /// Flips every bit in the inclusive range
    fn invert(&mut self, p1: usize, p2: usize) {
        let (start, end) = ordered_pair(p1, p2);
        for i in start..=end {
            let bit: bool = self.genes[i];
            self.genes.set(i, !bit);
        }
        self.score = None;
    }

    fn switch(&mut self, p1: usize, p2: usize) {
        let bit1: bool = self.genes[p1];
        let bit2: bool = self.genes[p2];
        self.genes.set(p1, bit2);
        self.genes.set(p2, bit1);
        self.score = None;
    }

    fn shift(&mut self, start: usize, end: usize, destination: usize) {
        let mut bits: Vec<bool> = self.genes.iter().collect();
        shift_slice(&mut bits, start, end, destination);
        self.genes = BitVec::from_fn(bits.len(), |i| bits[i]);
        self.score = None;
    }

    /// Every bit pattern is a legal phasing
    fn is_valid(&self) -> bool {
        true
    }

    fn score(&mut self) -> f64 {
        if let Some(score) = self.score {
            return score;
        }
        let score: f64 = (self.scorer)(self);
        self.score = Some(score);
        score
    }

    fn cached_score(&self) -> Option<f64> {
        self.score
    }
}
