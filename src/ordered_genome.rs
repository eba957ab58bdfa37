
use crate::data_types::errors::HicError;
use crate::data_types::links::LinkStore;
use crate::genome::{Genome, ScoreFn, ordered_pair, shift_slice};

use rand::Rng;
use std::sync::Arc;

/// Scaffolding genome: a permutation of every entity ID in a link store.
#[derive(Clone)]
pub struct OrderedGenome {
    /// Entity IDs in scaffold order
    genes: Vec<usize>,
    /// Shared read-only links the genome is scored against
    links: Arc<LinkStore>,
    /// The injected scoring function
    scorer: ScoreFn<OrderedGenome>,
    /// Memoized score, cleared on every change
    score: Option<f64>
}

impl std::fmt::Debug for OrderedGenome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedGenome")
            .field("genes", &self.genes)
            .field("score", &self.score)
            .finish()
    }
}

impl OrderedGenome {
    /// Creates a genome holding the identity permutation of all registered IDs.
    /// # Arguments
    /// * `links` - the shared link store
    /// * `scorer` - the scoring function to memoize
    pub fn new(links: Arc<LinkStore>, scorer: ScoreFn<OrderedGenome>) -> OrderedGenome {
        OrderedGenome {
            genes: links.int_ids(),
            links,
            scorer,
            score: None
        }
    }

    /// Creates a genome from an explicit gene order.
    /// # Errors
    /// * `UnknownEntity` if a gene is not a registered ID
    /// * `UnsupportedFormat` if the genes are not a permutation of every registered ID
    pub fn with_genes(genes: Vec<usize>, links: Arc<LinkStore>, scorer: ScoreFn<OrderedGenome>) -> Result<OrderedGenome, HicError> {
        if genes.len() != links.size() {
            return Err(HicError::unsupported_record(
                "scaffold order",
                format!("{} genes for {} registered entities", genes.len(), links.size())
            ));
        }
        let mut seen: Vec<bool> = vec![false; links.size()];
        for &gene in genes.iter() {
            match seen.get_mut(gene) {
                None => return Err(HicError::UnknownEntity(gene.to_string())),
                Some(true) => return Err(HicError::unsupported_record(
                    "scaffold order",
                    format!("gene {gene} appears more than once")
                )),
                Some(flag) => *flag = true
            }
        }
        Ok(OrderedGenome {
            genes,
            links,
            scorer,
            score: None
        })
    }

    pub fn genes(&self) -> &[usize] {
        &self.genes
    }

    pub fn links(&self) -> &LinkStore {
        &self.links
    }

    /// Translates the permutation into entity names
    pub fn decode(&self) -> Result<Vec<String>, HicError> {
        self.links.decode(&self.genes)
    }

    /// Finds where `value` sits outside the inclusive window `[p1, p2]`
    fn position_outside(&self, value: usize, p1: usize, p2: usize) -> Option<usize> {
        self.genes.iter()
            .enumerate()
            .find(|&(i, &g)| g == value && (i < p1 || i > p2))
            .map(|(i, _)| i)
    }
}

/// Pairs one pending conflict from each child and exchanges their values
fn resolve_conflict(genes_a: &mut [usize], genes_b: &mut [usize], pending_a: &mut Vec<usize>, pending_b: &mut Vec<usize>) {
    if pending_a.is_empty() || pending_b.is_empty() {
        return;
    }
    if let (Some(index_a), Some(index_b)) = (pending_a.pop(), pending_b.pop()) {
        std::mem::swap(&mut genes_a[index_a], &mut genes_b[index_b]);
    }
}

impl Genome for OrderedGenome {
    fn len(&self) -> usize {
        self.genes.len()
    }

    /// Performs `len` random pair swaps
    fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let length: usize = self.genes.len();
        if length > 0 {
            for _ in 0..length {
                let i: usize = rng.gen_range(0..length);
                let j: usize = rng.gen_range(0..length);
                self.genes.swap(i, j);
            }
        }
        self.score = None;
    }

    /// Partially-mapped crossover: the window is exchanged and any value duplicated outside it
    /// is repaired by trading it for the duplicate found in the other child.
    fn crossover(&self, other: &OrderedGenome, p1: usize, p2: usize) -> (OrderedGenome, OrderedGenome) {
        debug_assert_eq!(self.len(), other.len());
        debug_assert!(p1 <= p2 && p2 < self.len());
        let mut child_a: OrderedGenome = self.clone();
        let mut child_b: OrderedGenome = other.clone();
        child_a.score = None;
        child_b.score = None;
        child_a.genes[p1..=p2].copy_from_slice(&other.genes[p1..=p2]);
        child_b.genes[p1..=p2].copy_from_slice(&self.genes[p1..=p2]);

        let mut pending_a: Vec<usize> = vec![];
        let mut pending_b: Vec<usize> = vec![];
        for i in p1..=p2 {
            if let Some(conflict) = child_a.position_outside(child_a.genes[i], p1, p2) {
                pending_a.push(conflict);
                resolve_conflict(&mut child_a.genes, &mut child_b.genes, &mut pending_a, &mut pending_b);
            }
            if let Some(conflict) = child_b.position_outside(child_b.genes[i], p1, p2) {
                pending_b.push(conflict);
                resolve_conflict(&mut child_a.genes, &mut child_b.genes, &mut pending_a, &mut pending_b);
            }
        }
        (child_a, child_b)
    }

    fn invert(&mut self, p1: usize, p2: usize) {
        let (start, end) = ordered_pair(p1, p2);
        self.genes[start..=end].reverse();
        self.score = None;
    }

    fn switch(&mut self, p1: usize, p2: usize) {
        self.genes.swap(p1, p2);
        self.score = None;
    }

    fn shift(&mut self, start: usize, end: usize, destination: usize) {
        shift_slice(&mut self.genes, start, end, destination);
        self.score = None;
    }

    /// True when no ID appears twice
    fn is_valid(&self) -> bool {
        let mut sorted: Vec<usize> = self.genes.clone();
        sorted.sort_unstable();
        sorted.windows(2).all(|w| w[0] != w[1])
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

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Rewards IDs sitting at their own index, so the identity scores `-len`
    fn identity_score(genome: &OrderedGenome) -> f64 {
        -(genome.genes().iter().enumerate().filter(|&(i, &g)| i == g).count() as f64)
    }

    fn test_links(size: usize) -> Arc<LinkStore> {
        let mut links = LinkStore::new();
        for i in 0..size {
            links.id(&format!("ctg_{i}"));
        }
        Arc::new(links)
    }

    #[test]
    fn test_pmx_always_valid() {
        let links = test_links(8);
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            let mut parent_a = OrderedGenome::new(links.clone(), identity_score);
            let mut parent_b = OrderedGenome::new(links.clone(), identity_score);
            parent_a.randomize(&mut rng);
            parent_b.randomize(&mut rng);
            for p1 in 0..8 {
                for p2 in p1..8 {
                    let (child_a, child_b) = parent_a.crossover(&parent_b, p1, p2);
                    assert!(child_a.is_valid(), "{parent_a:?} x {parent_b:?} [{p1}, {p2}] -> {child_a:?}");
                    assert!(child_b.is_valid(), "{parent_a:?} x {parent_b:?} [{p1}, {p2}] -> {child_b:?}");
                    assert_eq!(child_a.len(), 8);
                    assert_eq!(&child_a.genes()[p1..=p2], &parent_b.genes()[p1..=p2]);
                    assert_eq!(&child_b.genes()[p1..=p2], &parent_a.genes()[p1..=p2]);
                }
            }
        }
    }

    #[test]
    fn test_pmx_example() {
        let links = test_links(6);
        let parent_a = OrderedGenome::with_genes(vec![0, 1, 2, 3, 4, 5], links.clone(), identity_score).unwrap();
        let parent_b = OrderedGenome::with_genes(vec![5, 3, 4, 0, 2, 1], links, identity_score).unwrap();
        let (child_a, child_b) = parent_a.crossover(&parent_b, 1, 2);
        assert_eq!(child_a.genes(), &[0, 3, 4, 1, 2, 5]);
        assert_eq!(child_b.genes(), &[5, 1, 2, 0, 4, 3]);
    }

    #[test]
    fn test_mutations_preserve_validity() {
        let links = test_links(5);
        let mut genome = OrderedGenome::new(links, identity_score);
        genome.invert(3, 1);
        assert_eq!(genome.genes(), &[0, 3, 2, 1, 4]);
        genome.switch(0, 4);
        assert_eq!(genome.genes(), &[4, 3, 2, 1, 0]);
        genome.shift(0, 1, 3);
        assert_eq!(genome.genes(), &[2, 1, 0, 4, 3]);
        assert!(genome.is_valid());

        let mut rng = StdRng::seed_from_u64(17);
        genome.randomize(&mut rng);
        assert!(genome.is_valid());
    }

    #[test]
    fn test_validity() {
        let links = test_links(3);
        let valid = OrderedGenome::with_genes(vec![2, 0, 1], links.clone(), identity_score).unwrap();
        assert!(valid.is_valid());
        let mut duplicated = valid.clone();
        duplicated.genes[2] = 2;
        assert!(!duplicated.is_valid());
        assert!(matches!(
            OrderedGenome::with_genes(vec![0, 1, 3], links, identity_score),
            Err(HicError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_with_genes_rejects_partial_orders() {
        let links = test_links(4);
        assert!(matches!(
            OrderedGenome::with_genes(vec![0, 1], links.clone(), identity_score),
            Err(HicError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            OrderedGenome::with_genes(vec![0, 1, 2, 3, 0], links.clone(), identity_score),
            Err(HicError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            OrderedGenome::with_genes(vec![0, 1, 1, 3], links.clone(), identity_score),
            Err(HicError::UnsupportedFormat { .. })
        ));
        assert!(OrderedGenome::with_genes(vec![3, 1, 2, 0], links, identity_score).is_ok());
    }

    #[test]
    fn test_score_cache() {
        let links = test_links(4);
        let mut genome = OrderedGenome::new(links, identity_score);
        assert_eq!(genome.cached_score(), None);
        assert_eq!(genome.score(), -4.0);
        assert_eq!(genome.cached_score(), Some(-4.0));

        genome.switch(0, 1);
        assert_eq!(genome.cached_score(), None);
        assert_eq!(genome.score(), -2.0);

        let (child, _) = genome.crossover(&genome.clone(), 0, 0);
        assert_eq!(child.cached_score(), None);
    }

    #[test]
    fn test_decode() {
        let links = test_links(3);
        let genome = OrderedGenome::with_genes(vec![2, 0, 1], links, identity_score).unwrap();
        assert_eq!(genome.decode().unwrap(), vec!["ctg_2", "ctg_0", "ctg_1"]);
    }
}
