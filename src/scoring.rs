
use crate::bitstring_genome::BitstringGenome;
use crate::genome::Genome;
use crate::ordered_genome::OrderedGenome;

/// Neighbor offsets and their weights for the scaffolding score
pub const SCAFFOLD_STEPS: [(usize, f64); 6] = [
    (1, 1.0), (2, 0.5), (3, 0.33), (5, 0.2), (11, 0.1), (20, 0.05)
];

/// Neighbor offsets for the phasing score, all weighted equally
pub const PHASE_STEPS: [usize; 15] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 15, 20, 25, 30];

/// Scores a scaffold order by the distance-decayed link weight between entities near each other.
/// Left neighbors are only taken from indices strictly greater than 0.
/// Returns the negated total so that lower is better.
pub fn scaffold_score(genome: &OrderedGenome) -> f64 {
    let links = genome.links();
    let genes: &[usize] = genome.genes();
    let size: usize = genes.len();
    let mut total: f64 = 0.0;
    for (i, &current) in genes.iter().enumerate() {
        for &(step, weight) in SCAFFOLD_STEPS.iter() {
            if i + step < size {
                total += weight * links.weight(current, genes[i + step]);
            }
            if i > step {
                total += weight * links.weight(current, genes[i - step]);
            }
        }
    }
    -total
}

/// Scores a phasing by rewarding links between same-phase entities and penalizing links across phases.
/// Uses the same neighbor bounds as `scaffold_score`, indexed by entity ID.
/// Returns the negated total so that lower is better.
pub fn phase_score(genome: &BitstringGenome) -> f64 {
    let links = genome.links();
    let size: usize = genome.len();
    let mut total: f64 = 0.0;
    for i in 0..size {
        let current: bool = genome.phase(i);
        for &step in PHASE_STEPS.iter() {
            let mut neighbors: [Option<usize>; 2] = [None, None];
            if i + step < size {
                neighbors[0] = Some(i + step);
            }
            if i > step {
                neighbors[1] = Some(i - step);
            }
            for j in neighbors.into_iter().flatten() {
                let value: f64 = links.weight(i, j);
                if current == genome.phase(j) {
                    total += value;
                } else {
                    total -= value;
                }
            }
        }
    }
    -total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::links::LinkStore;
    use crate::genome::Genome;
    use std::sync::Arc;

    fn chain_links() -> Arc<LinkStore> {
        // a - b - c - d with unit weights
        let mut links = LinkStore::new();
        let ids: Vec<usize> = ["a", "b", "c", "d"].iter().map(|n| links.id(n)).collect();
        for w in ids.windows(2) {
            links.set(w[0], w[1], 1.0).unwrap();
        }
        Arc::new(links)
    }

    #[test]
    fn test_scaffold_score_chain() {
        let links = chain_links();
        // pairs touching index 0 are only counted from the left side
        let mut forward = OrderedGenome::with_genes(vec![0, 1, 2, 3], links.clone(), scaffold_score).unwrap();
        assert!((forward.score() + 5.0).abs() < 1e-9);

        let mut reverse = OrderedGenome::with_genes(vec![3, 2, 1, 0], links.clone(), scaffold_score).unwrap();
        assert!((reverse.score() + 5.0).abs() < 1e-9);

        // a c b d: b-c adjacent (x2), a-b and c-d at step 2 (0.5 once and 0.5 twice)
        let mut shuffled = OrderedGenome::with_genes(vec![0, 2, 1, 3], links, scaffold_score).unwrap();
        assert!((shuffled.score() + 3.5).abs() < 1e-9);
        assert!(forward.score() < shuffled.score());
    }

    #[test]
    fn test_scaffold_score_empty_links() {
        let mut links = LinkStore::new();
        links.id("x");
        links.id("y");
        let mut genome = OrderedGenome::new(Arc::new(links), scaffold_score);
        assert_eq!(genome.score(), 0.0);
    }

    #[test]
    fn test_phase_score() {
        let mut links = LinkStore::new();
        for name in ["chr1_1", "chr1_2", "chr1_3"] {
            links.id(name);
        }
        links.set(0, 1, 2.0).unwrap();
        links.set(1, 2, -1.0).unwrap();
        let links = Arc::new(links);

        // (0,1) only counted from index 0, (1,2) from both sides
        let mut same = BitstringGenome::with_phases(&[false, false, false], links.clone(), phase_score).unwrap();
        assert!((same.score() - 0.0).abs() < 1e-9);

        let mut best = BitstringGenome::with_phases(&[false, false, true], links.clone(), phase_score).unwrap();
        assert!((best.score() + 4.0).abs() < 1e-9);

        let mut worst = BitstringGenome::with_phases(&[true, false, false], links, phase_score).unwrap();
        assert!((worst.score() - 4.0).abs() < 1e-9);
    }
}
