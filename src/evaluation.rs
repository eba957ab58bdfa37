
use crate::data_types::errors::HicError;

use rustc_hash::FxHashMap as HashMap;

/// Entities at most this many index steps apart fall in the near band
pub const NEAR_BAND_STEPS: u64 = 2;
/// Entities at most this many index steps apart fall in the mid band
pub const MID_BAND_STEPS: u64 = 9;

/// Which direction of the key matched the inferred scaffold better
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
    Forward,
    Reverse
}

/// Triplet ordering accuracy of a scaffold against a key
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaffoldAccuracy {
    /// Fraction of all ordered triplets kept monotonic
    pub score: f64,
    /// Same fraction restricted to consecutive triplets
    pub neighbor_score: f64,
    pub orientation: Orientation
}

/// Counts (correct, comparisons, neighbors correct, neighbors) for monotonic triplets of `ranks`
fn triplet_counts(ranks: &[usize]) -> (u64, u64, u64, u64) {
    let mut correct: u64 = 0;
    let mut comparisons: u64 = 0;
    let mut neighbors_correct: u64 = 0;
    let mut neighbors: u64 = 0;
    let n: usize = ranks.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let monotonic: bool = ranks[i] < ranks[j] && ranks[j] < ranks[k];
                comparisons += 1;
                if monotonic {
                    correct += 1;
                }
                if j == i + 1 && k == j + 1 {
                    neighbors += 1;
                    if monotonic {
                        neighbors_correct += 1;
                    }
                }
            }
        }
    }
    (correct, comparisons, neighbors_correct, neighbors)
}

/// Compares an inferred scaffold order with a key order using every index triplet `i < j < k`.
/// Both orientations of the key are tried and the better one reported; a tie reports the reverse.
/// Inferred names missing from the key are ignored.
/// # Errors
/// * `EmptyResult` if fewer than three inferred names appear in the key
pub fn evaluate_scaffolding(inferred: &[String], key: &[String]) -> Result<ScaffoldAccuracy, HicError> {
    let key_rank: HashMap<&str, usize> = key.iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let forward: Vec<usize> = inferred.iter()
        .filter_map(|name| key_rank.get(name.as_str()).copied())
        .collect();
    if forward.len() < 3 {
        return Err(HicError::empty(format!("only {} scaffold entries are shared with the key, need 3", forward.len())));
    }
    let reverse: Vec<usize> = forward.iter().map(|&rank| key.len() - rank).collect();

    let (f_correct, comparisons, f_neighbors_correct, neighbors) = triplet_counts(&forward);
    let (r_correct, _, r_neighbors_correct, _) = triplet_counts(&reverse);
    let comparisons: f64 = comparisons as f64;
    let neighbors: f64 = neighbors as f64;
    let forward_score: f64 = f_correct as f64 / comparisons;
    let reverse_score: f64 = r_correct as f64 / comparisons;

    let accuracy = if forward_score > reverse_score {
        ScaffoldAccuracy {
            score: forward_score,
            neighbor_score: f_neighbors_correct as f64 / neighbors,
            orientation: Orientation::Forward
        }
    } else {
        ScaffoldAccuracy {
            score: reverse_score,
            neighbor_score: r_neighbors_correct as f64 / neighbors,
            orientation: Orientation::Reverse
        }
    };
    Ok(accuracy)
}

/// Pairwise phase agreement of a phasing against a key
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhasingAccuracy {
    /// Fraction of all shared pairs with consistent agreement
    pub global: f64,
    /// Same fraction for pairs within `NEAR_BAND_STEPS`, if any
    pub near: Option<f64>,
    /// Same fraction for pairs within `MID_BAND_STEPS`, if any
    pub mid: Option<f64>,
    /// Number of ordered pairs compared
    pub comparisons: u64
}

/// Parses the integer after the final `_` of a `chrom_index` entity name
fn name_index(name: &str) -> Result<u64, HicError> {
    name.rsplit_once('_')
        .and_then(|(_, suffix)| suffix.parse::<u64>().ok())
        .ok_or_else(|| HicError::unsupported_record(format!("entity {name:?}"), "name does not end in _<integer>"))
}

#[derive(Default)]
struct MatchTally {
    matches: u64,
    comparisons: u64
}

impl MatchTally {
    fn record(&mut self, matched: bool) {
        self.comparisons += 1;
        if matched {
            self.matches += 1;
        }
    }

    fn ratio(&self) -> Option<f64> {
        if self.comparisons == 0 {
            None
        } else {
            Some(self.matches as f64 / self.comparisons as f64)
        }
    }
}

/// Compares an inferred phasing with a key over every ordered pair of shared entities (self pairs included).
/// A pair matches when "same phase" agrees between inferred and key, so a globally flipped phasing is still perfect.
/// Bands are cumulative and use the distance between the names' index suffixes.
/// # Errors
/// * `EmptyResult` if no entity is shared
/// * `UnsupportedFormat` if a shared name has no integer suffix
pub fn evaluate_phasing(inferred: &HashMap<String, bool>, key: &HashMap<String, bool>) -> Result<PhasingAccuracy, HicError> {
    let mut shared: Vec<(u64, bool, bool)> = vec![];
    for (name, &phase) in inferred.iter() {
        if let Some(&key_phase) = key.get(name) {
            shared.push((name_index(name)?, phase, key_phase));
        }
    }
    if shared.is_empty() {
        return Err(HicError::empty("no phased entities are shared with the key"));
    }

    let mut global = MatchTally::default();
    let mut near = MatchTally::default();
    let mut mid = MatchTally::default();
    for &(index_i, phase_i, key_i) in shared.iter() {
        for &(index_j, phase_j, key_j) in shared.iter() {
            let matched: bool = (phase_i == phase_j) == (key_i == key_j);
            let distance: u64 = index_i.abs_diff(index_j);
            global.record(matched);
            if distance <= NEAR_BAND_STEPS {
                near.record(matched);
            }
            if distance <= MID_BAND_STEPS {
                mid.record(matched);
            }
        }
    }

    Ok(PhasingAccuracy {
        global: global.matches as f64 / global.comparisons as f64,
        near: near.ratio(),
        mid: mid.ratio(),
        comparisons: global.comparisons
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn phasing(values: &[(&str, bool)]) -> HashMap<String, bool> {
        values.iter().map(|&(n, p)| (n.to_string(), p)).collect()
    }

    #[test]
    fn test_scaffolding_exact() {
        let key = names(&["a", "b", "c", "d", "e"]);
        let accuracy = evaluate_scaffolding(&key, &key).unwrap();
        assert_eq!(accuracy.score, 1.0);
        assert_eq!(accuracy.neighbor_score, 1.0);
        assert_eq!(accuracy.orientation, Orientation::Forward);
    }

    #[test]
    fn test_scaffolding_reversed() {
        let key = names(&["a", "b", "c", "d", "e"]);
        let inferred = names(&["e", "d", "c", "b", "a"]);
        let accuracy = evaluate_scaffolding(&inferred, &key).unwrap();
        assert_eq!(accuracy.score, 1.0);
        assert_eq!(accuracy.neighbor_score, 1.0);
        assert_eq!(accuracy.orientation, Orientation::Reverse);
    }

    #[test]
    fn test_scaffolding_partial() {
        let key = names(&["a", "b", "c", "d"]);
        // triplets: (b,a,c) (b,a,d) (b,c,d) (a,c,d); forward keeps the last two
        let inferred = names(&["b", "a", "c", "d", "unknown"]);
        let accuracy = evaluate_scaffolding(&inferred, &key).unwrap();
        assert_eq!(accuracy.score, 0.5);
        assert_eq!(accuracy.neighbor_score, 0.5);
        assert_eq!(accuracy.orientation, Orientation::Forward);

        let too_small = names(&["a", "x", "b"]);
        assert!(matches!(evaluate_scaffolding(&too_small, &key), Err(HicError::EmptyResult { .. })));
    }

    #[test]
    fn test_phasing_exact_and_flipped() {
        let key = phasing(&[("chr1_1", true), ("chr1_2", false), ("chr1_5", true), ("chr1_20", false)]);
        let accuracy = evaluate_phasing(&key, &key).unwrap();
        assert_eq!(accuracy.global, 1.0);
        assert_eq!(accuracy.near, Some(1.0));
        assert_eq!(accuracy.mid, Some(1.0));
        assert_eq!(accuracy.comparisons, 16);

        let flipped: HashMap<String, bool> = key.iter().map(|(n, &p)| (n.clone(), !p)).collect();
        assert_eq!(evaluate_phasing(&flipped, &key).unwrap().global, 1.0);
    }

    #[test]
    fn test_phasing_bands() {
        let key = phasing(&[("chr1_1", true), ("chr1_2", true), ("chr1_30", true)]);
        // chr1_30 is wrong relative to the others, and only far pairs involve it
        let inferred = phasing(&[("chr1_1", true), ("chr1_2", true), ("chr1_30", false), ("chr2_4", true)]);
        let accuracy = evaluate_phasing(&inferred, &key).unwrap();
        assert_eq!(accuracy.comparisons, 9);
        assert!((accuracy.global - 5.0 / 9.0).abs() < 1e-9);
        assert_eq!(accuracy.near, Some(1.0));
        assert_eq!(accuracy.mid, Some(1.0));
    }

    #[test]
    fn test_phasing_band_edges() {
        // one wrong entity: self pairs match, the two cross pairs do not
        let band = |first: &str, second: &str| {
            let key = phasing(&[(first, true), (second, true)]);
            let inferred = phasing(&[(first, true), (second, false)]);
            let accuracy = evaluate_phasing(&inferred, &key).unwrap();
            (accuracy.near, accuracy.mid)
        };
        assert_eq!(band("chr1_1", "chr1_3"), (Some(0.5), Some(0.5)));
        assert_eq!(band("chr1_1", "chr1_4"), (Some(1.0), Some(0.5)));
        assert_eq!(band("chr1_1", "chr1_10"), (Some(1.0), Some(0.5)));
        assert_eq!(band("chr1_1", "chr1_11"), (Some(1.0), Some(1.0)));
    }

    #[test]
    fn test_phasing_errors() {
        let key = phasing(&[("chr1_1", true)]);
        let disjoint = phasing(&[("chr1_2", true)]);
        assert!(matches!(evaluate_phasing(&disjoint, &key), Err(HicError::EmptyResult { .. })));

        let bad_key = phasing(&[("nosuffix", true)]);
        assert!(matches!(evaluate_phasing(&bad_key, &bad_key), Err(HicError::UnsupportedFormat { .. })));
    }
}
