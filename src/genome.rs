
use rand::Rng;

/// Scoring function injected into a genome; lower (more negative) is better.
pub type ScoreFn<G> = fn(&G) -> f64;

/// A candidate solution the genetic algorithm can evolve.
/// Implementors memoize their score and must drop the memo on any in-place change.
pub trait Genome: Clone + Send + 'static {
    /// Number of genes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the genotype with a random one
    fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R);

    /// Produces two children from the inclusive cut range `[p1, p2]`.
    /// Callers guarantee `p1 <= p2 < len`.
    fn crossover(&self, other: &Self, p1: usize, p2: usize) -> (Self, Self);

    /// Inverts the inclusive range `[p1, p2]`
    fn invert(&mut self, p1: usize, p2: usize);

    /// Exchanges the genes at `p1` and `p2`
    fn switch(&mut self, p1: usize, p2: usize);

    /// Moves the inclusive segment `[start, end]` so that it begins at `destination`.
    /// Callers guarantee `destination + (end - start) < len`.
    fn shift(&mut self, start: usize, end: usize, destination: usize);

    /// Whether the genotype is a legal solution
    fn is_valid(&self) -> bool;

    /// Returns the score, computing and caching it on first use
    fn score(&mut self) -> f64;

    /// Returns the cached score if one has been computed
    fn cached_score(&self) -> Option<f64>;
}

/// Orders an arbitrary pair of indices
pub(crate) fn ordered_pair(p1: usize, p2: usize) -> (usize, usize) {
    if p1 <= p2 { (p1, p2) } else { (p2, p1) }
}

/// Moves `values[start..=end]` so it begins at `destination`, keeping the segment order.
pub(crate) fn shift_slice<T>(values: &mut [T], start: usize, end: usize, destination: usize) {
    let segment_len: usize = end - start + 1;
    if destination < start {
        values[destination..=end].rotate_right(segment_len);
    } else if destination > start {
        values[start..destination + segment_len].rotate_left(segment_len);
    }
}
