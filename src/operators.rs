
use crate::genome::{Genome, ordered_pair};

use rand::Rng;
use rand::rngs::StdRng;
use simple_error::bail;

/// A mutation strategy producing a changed copy of a genome
pub trait Mutator<G: Genome>: Send {
    /// Label used in run statistics
    fn name(&self) -> String;

    /// Returns a mutated copy of `genome`
    fn mutate(&self, genome: &G, rng: &mut StdRng) -> G;
}

/// The built-in mutation operators
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display, strum_macros::EnumIter, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MutationKind {
    /// Reverses (or flips) a random range
    Invert,
    /// Exchanges two distinct random positions
    Switch,
    /// Moves a random segment to a random offset
    Shift
}

impl<G: Genome> Mutator<G> for MutationKind {
    fn name(&self) -> String {
        self.to_string()
    }

    fn mutate(&self, genome: &G, rng: &mut StdRng) -> G {
        let mut mutant: G = genome.clone();
        let length: usize = genome.len();
        if length < 2 {
            return mutant;
        }
        match self {
            MutationKind::Invert => {
                let (p1, p2) = random_cut_points(length, rng);
                mutant.invert(p1, p2);
            },
            MutationKind::Switch => {
                let p1: usize = rng.gen_range(0..length);
                let p2: usize = (p1 + rng.gen_range(1..length)) % length;
                mutant.switch(p1, p2);
            },
            MutationKind::Shift => {
                let (start, end) = random_cut_points(length, rng);
                let segment_len: usize = end - start + 1;
                if segment_len < length {
                    let destination: usize = rng.gen_range(0..=(length - segment_len));
                    mutant.shift(start, end, destination);
                }
            }
        };
        mutant
    }
}

/// Picks one of several mutators uniformly at random and tracks how often each was used
pub struct MultiMutator<G: Genome> {
    mutators: Vec<Box<dyn Mutator<G>>>,
    usage: Vec<u64>
}

impl<G: Genome> MultiMutator<G> {
    /// # Errors
    /// * if `mutators` is empty
    pub fn new(mutators: Vec<Box<dyn Mutator<G>>>) -> Result<MultiMutator<G>, Box<dyn std::error::Error>> {
        if mutators.is_empty() {
            bail!("at least one mutation operator is required");
        }
        let usage: Vec<u64> = vec![0; mutators.len()];
        Ok(MultiMutator {
            mutators,
            usage
        })
    }

    /// Convenience constructor from the built-in operators
    pub fn from_kinds(kinds: &[MutationKind]) -> Result<MultiMutator<G>, Box<dyn std::error::Error>> {
        let mutators: Vec<Box<dyn Mutator<G>>> = kinds.iter()
            .map(|&k| Box::new(k) as Box<dyn Mutator<G>>)
            .collect();
        MultiMutator::new(mutators)
    }

    pub fn mutate(&mut self, genome: &G, rng: &mut StdRng) -> G {
        let index: usize = rng.gen_range(0..self.mutators.len());
        self.usage[index] += 1;
        self.mutators[index].mutate(genome, rng)
    }

    /// Mutator names paired with how many times each was applied
    pub fn usage(&self) -> Vec<(String, u64)> {
        self.mutators.iter()
            .zip(self.usage.iter())
            .map(|(m, &count)| (m.name(), count))
            .collect()
    }
}

/// A parent selection strategy over a fully scored population
pub trait Selector<G: Genome>: Send {
    /// Picks one individual; `population` must not be empty
    fn select<'a>(&self, population: &'a [G], rng: &mut StdRng) -> &'a G;
}

/// Sort key for minimization, unscored individuals rank last
pub fn score_key<G: Genome>(genome: &G) -> f64 {
    genome.cached_score().unwrap_or(f64::INFINITY)
}

/// Tournament selection: sample contestants with replacement, rank them best first,
/// then accept each in turn with `elite_probability`, falling back to the last one.
#[derive(Clone, Debug)]
pub struct TournamentSelector {
    contestants: usize,
    elite_probability: f64
}

impl TournamentSelector {
    /// # Errors
    /// * if `contestants < 2`
    /// * if `elite_probability` is outside [0, 1]
    pub fn new(contestants: usize, elite_probability: f64) -> Result<TournamentSelector, Box<dyn std::error::Error>> {
        if contestants < 2 {
            bail!("tournament selection requires at least 2 contestants, found {}", contestants);
        }
        if !(0.0..=1.0).contains(&elite_probability) {
            bail!("tournament elite probability must be in [0, 1], found {}", elite_probability);
        }
        Ok(TournamentSelector {
            contestants,
            elite_probability
        })
    }
}

impl<G: Genome> Selector<G> for TournamentSelector {
    fn select<'a>(&self, population: &'a [G], rng: &mut StdRng) -> &'a G {
        let mut contestants: Vec<&'a G> = (0..self.contestants)
            .map(|_| &population[rng.gen_range(0..population.len())])
            .collect();
        contestants.sort_by(|a, b| score_key(*a).total_cmp(&score_key(*b)));
        for &contestant in contestants.iter() {
            if rng.gen::<f64>() < self.elite_probability {
                return contestant;
            }
        }
        contestants[contestants.len() - 1]
    }
}

/// Two uniformly random indices in `0..length`, ordered so `p1 <= p2`
pub fn random_cut_points(length: usize, rng: &mut StdRng) -> (usize, usize) {
    ordered_pair(rng.gen_range(0..length), rng.gen_range(0..length))
}
