
use crate::data_types::errors::HicError;

use flate2::bufread::MultiGzDecoder;
use log::{debug, info};
use rustc_hash::FxHashMap as HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Sparse symmetric weighted graph over named entities.
/// Names receive dense sequential IDs on first encounter; IDs are never reused.
/// Every pair weight is stored once under the canonical `(min, max)` key and an absent pair reads as 0.
#[derive(Clone, Debug, Default)]
pub struct LinkStore {
    /// Name to ID lookup
    name_to_id: HashMap<String, usize>,
    /// ID to name lookup, the index is the ID
    id_to_name: Vec<String>,
    /// Canonical pair to weight
    weights: HashMap<(usize, usize), f64>
}

impl LinkStore {
    /// Creates an empty store
    pub fn new() -> LinkStore {
        Default::default()
    }

    /// Returns the ID for `name`, allocating the next sequential ID if the name is new.
    /// # Arguments
    /// * `name` - the entity name, e.g. `chr1_20766468`
    pub fn id(&mut self, name: &str) -> usize {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id: usize = self.id_to_name.len();
        self.id_to_name.push(name.to_string());
        self.name_to_id.insert(name.to_string(), id);
        id
    }

    /// Non-allocating name lookup
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the name registered for `id`.
    /// # Errors
    /// * `UnknownEntity` if the ID was never allocated
    pub fn name(&self, id: usize) -> Result<&str, HicError> {
        self.id_to_name.get(id)
            .map(|n| n.as_str())
            .ok_or_else(|| HicError::UnknownEntity(id.to_string()))
    }

    /// Number of registered entities (not the number of links)
    pub fn size(&self) -> usize {
        self.id_to_name.len()
    }

    /// Number of stored pairs
    pub fn num_links(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }

    /// All IDs in allocation order
    pub fn int_ids(&self) -> Vec<usize> {
        (0..self.size()).collect()
    }

    /// All names in allocation order
    pub fn string_ids(&self) -> &[String] {
        &self.id_to_name
    }

    fn check_id(&self, id: usize) -> Result<(), HicError> {
        if id < self.id_to_name.len() {
            Ok(())
        } else {
            Err(HicError::UnknownEntity(id.to_string()))
        }
    }

    fn canonical(id1: usize, id2: usize) -> (usize, usize) {
        if id1 <= id2 { (id1, id2) } else { (id2, id1) }
    }

    /// Overwrites the weight between two entities.
    /// # Errors
    /// * `UnknownEntity` if either ID was never allocated
    pub fn set(&mut self, id1: usize, id2: usize, value: f64) -> Result<(), HicError> {
        self.check_id(id1)?;
        self.check_id(id2)?;
        self.weights.insert(Self::canonical(id1, id2), value);
        Ok(())
    }

    /// Accumulates `delta` onto the weight between two entities, starting from 0.
    /// # Errors
    /// * `UnknownEntity` if either ID was never allocated
    pub fn add(&mut self, id1: usize, id2: usize, delta: f64) -> Result<(), HicError> {
        self.check_id(id1)?;
        self.check_id(id2)?;
        *self.weights.entry(Self::canonical(id1, id2)).or_insert(0.0) += delta;
        Ok(())
    }

    /// Returns the weight between two entities, 0 if the pair has no entry.
    /// # Errors
    /// * `UnknownEntity` if either ID was never allocated
    pub fn get(&self, id1: usize, id2: usize) -> Result<f64, HicError> {
        self.check_id(id1)?;
        self.check_id(id2)?;
        Ok(self.weight(id1, id2))
    }

    /// Unchecked weight lookup for the scoring hot path; callers guarantee both IDs are registered.
    pub(crate) fn weight(&self, id1: usize, id2: usize) -> f64 {
        self.weights.get(&Self::canonical(id1, id2)).copied().unwrap_or(0.0)
    }

    /// Translates a sequence of IDs back into names.
    /// # Errors
    /// * `UnknownEntity` if any ID was never allocated
    pub fn decode(&self, ids: &[usize]) -> Result<Vec<String>, HicError> {
        ids.iter()
            .map(|&id| self.name(id).map(|n| n.to_string()))
            .collect()
    }

    /// Translates a bit per entity (indexed by ID) into a name to phase map.
    /// # Errors
    /// * `UnknownEntity` if there are more bits than registered entities
    pub fn decode_phasing<I: IntoIterator<Item = bool>>(&self, bits: I) -> Result<HashMap<String, bool>, HicError> {
        let mut phasing: HashMap<String, bool> = Default::default();
        for (id, bit) in bits.into_iter().enumerate() {
            phasing.insert(self.name(id)?.to_string(), bit);
        }
        Ok(phasing)
    }

    /// Builds a new store restricted to entities whose name starts with `<tag>_`.
    /// Retained entities are renumbered in their original ID order and keep all links among themselves.
    /// # Arguments
    /// * `tag` - the name prefix, typically a chromosome
    pub fn subset(&self, tag: &str) -> LinkStore {
        let prefix: String = format!("{tag}_");
        let mut subset: LinkStore = LinkStore::new();
        let mut remap: HashMap<usize, usize> = Default::default();
        for (old_id, name) in self.id_to_name.iter().enumerate() {
            if name.starts_with(&prefix) {
                remap.insert(old_id, subset.id(name));
            }
        }
        for (&(id1, id2), &value) in self.weights.iter() {
            if let (Some(&new1), Some(&new2)) = (remap.get(&id1), remap.get(&id2)) {
                subset.weights.insert(Self::canonical(new1, new2), value);
            }
        }
        debug!("Subset {:?} retained {} of {} entities", tag, subset.size(), self.size());
        subset
    }

    /// All stored links as `(id1, id2, weight)` in canonical order
    pub fn links(&self) -> Vec<(usize, usize, f64)> {
        let mut all_links: Vec<(usize, usize, f64)> = self.weights.iter()
            .map(|(&(id1, id2), &value)| (id1, id2, value))
            .collect();
        all_links.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        all_links
    }

    /// Writes the store as a `#` header of `name:id` tokens followed by `name1 name2 weight` lines.
    /// # Errors
    /// * `ResourceUnavailable` if the file cannot be created or written
    pub fn write_links(&self, filename: &Path) -> Result<(), HicError> {
        let wrap = |e: std::io::Error| HicError::unavailable(filename, e);
        let file: File = File::create(filename).map_err(wrap)?;
        let mut writer = BufWriter::new(file);

        let mut header: String = String::from("#");
        for (id, name) in self.id_to_name.iter().enumerate() {
            header.push_str(&format!(" {name}:{id}"));
        }
        writeln!(writer, "{header}").map_err(wrap)?;

        for (id1, id2, value) in self.links() {
            writeln!(writer, "{} {} {:.6}", self.id_to_name[id1], self.id_to_name[id2], value).map_err(wrap)?;
        }
        writer.flush().map_err(wrap)?;
        Ok(())
    }

    /// Loads a store written by `write_links`; IDs are reassigned in first-seen order of the body.
    /// Files ending in `.gz` are decompressed on the fly.
    /// # Errors
    /// * `ResourceUnavailable` if the file cannot be opened or read
    /// * `UnsupportedFormat` if a data line is not `name1 name2 weight`
    /// * `EmptyResult` if no entity was registered
    pub fn load_links(filename: &Path) -> Result<LinkStore, HicError> {
        info!("Loading links from {:?}...", filename);
        let file: File = File::open(filename).map_err(|e| HicError::unavailable(filename, e))?;
        let file_reader = BufReader::new(file);
        let reader: Box<dyn BufRead> = if filename.extension().unwrap_or_default() == "gz" {
            debug!("Detected gzip extension, loading links with MultiGzDecoder...");
            Box::new(BufReader::new(MultiGzDecoder::new(file_reader)))
        } else {
            Box::new(file_reader)
        };

        let mut links: LinkStore = LinkStore::new();
        for (line_index, line_result) in reader.lines().enumerate() {
            let line: String = line_result.map_err(|e| HicError::unavailable(filename, e))?;
            let line_number: usize = line_index + 1;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 3 {
                return Err(HicError::unsupported(filename, line_number, format!("expected 3 columns, found {}", tokens.len())));
            }
            let value: f64 = tokens[2].parse()
                .map_err(|_| HicError::unsupported(filename, line_number, format!("weight {:?} is not a number", tokens[2])))?;

            let id1: usize = links.id(tokens[0]);
            let id2: usize = links.id(tokens[1]);
            links.set(id1, id2, value)?;
        }

        if links.is_empty() {
            return Err(HicError::empty(format!("no links found in {filename:?}")));
        }
        info!("Finished loading {} entities with {} links.", links.size(), links.num_links());
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn abc_store() -> LinkStore {
        let mut links = LinkStore::new();
        let a = links.id("a");
        let b = links.id("b");
        let c = links.id("c");
        links.set(a, b, 2.0).unwrap();
        links.set(b, c, 1.0).unwrap();
        links
    }

    #[test]
    fn test_sequential_ids() {
        let links = abc_store();
        assert_eq!(links.int_ids(), vec![0, 1, 2]);
        assert_eq!(links.string_ids(), &["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(links.size(), 3);
        assert_eq!(links.num_links(), 2);

        // repeated names keep their original ID
        let mut links = links;
        assert_eq!(links.id("b"), 1);
        assert_eq!(links.id("d"), 3);
        assert_eq!(links.lookup("d"), Some(3));
        assert_eq!(links.lookup("e"), None);
    }

    #[test]
    fn test_get_symmetric_and_default() {
        let links = abc_store();
        assert_eq!(links.get(0, 1).unwrap(), 2.0);
        assert_eq!(links.get(1, 0).unwrap(), 2.0);
        assert_eq!(links.get(2, 1).unwrap(), 1.0);
        assert_eq!(links.get(0, 2).unwrap(), 0.0);
        assert_eq!(links.get(2, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_add_and_set() {
        let mut links = abc_store();
        links.add(0, 2, 0.25).unwrap();
        links.add(2, 0, 1.5).unwrap();
        assert!((links.get(0, 2).unwrap() - 1.75).abs() < 1e-9);

        links.set(2, 0, -3.0).unwrap();
        assert_eq!(links.get(0, 2).unwrap(), -3.0);
        links.add(1, 1, 1.0).unwrap();
        assert_eq!(links.get(1, 1).unwrap(), 1.0);
    }

    #[test]
    fn test_unknown_entity() {
        let mut links = abc_store();
        assert!(matches!(links.get(0, 3), Err(HicError::UnknownEntity(_))));
        assert!(matches!(links.set(7, 0, 1.0), Err(HicError::UnknownEntity(_))));
        assert!(matches!(links.add(0, 9, 1.0), Err(HicError::UnknownEntity(_))));
        assert!(matches!(links.decode(&[0, 3]), Err(HicError::UnknownEntity(_))));
        assert!(matches!(links.decode_phasing([true, false, true, false]), Err(HicError::UnknownEntity(_))));
    }

    #[test]
    fn test_decode() {
        let links = abc_store();
        assert_eq!(links.decode(&[2, 0, 1]).unwrap(), vec!["c", "a", "b"]);

        let phasing = links.decode_phasing([true, false, true]).unwrap();
        assert_eq!(phasing.len(), 3);
        assert!(phasing["a"]);
        assert!(!phasing["b"]);
        assert!(phasing["c"]);
    }

    #[test]
    fn test_subset() {
        let mut links = LinkStore::new();
        let ids: Vec<usize> = ["chr1_10", "chr2_5", "chr1_20", "chr10_1"].iter()
            .map(|n| links.id(n))
            .collect();
        links.set(ids[0], ids[2], 4.0).unwrap();
        links.set(ids[0], ids[1], 1.0).unwrap();
        links.set(ids[2], ids[3], 2.0).unwrap();

        let subset = links.subset("chr1");
        assert_eq!(subset.string_ids(), &["chr1_10".to_string(), "chr1_20".to_string()]);
        assert_eq!(subset.num_links(), 1);
        assert_eq!(subset.get(0, 1).unwrap(), 4.0);
    }

    #[test]
    fn test_write_load_round_trip() {
        let mut links = abc_store();
        let d = links.id("d");
        links.set(d, 0, 0.333333).unwrap();
        links.set(d, 2, -1.0).unwrap();

        let tmp_dir = tempfile::tempdir().unwrap();
        let filename = tmp_dir.path().join("round_trip.links.txt");
        links.write_links(&filename).unwrap();

        let reloaded = LinkStore::load_links(&filename).unwrap();
        assert_eq!(reloaded.size(), links.size());
        assert_eq!(reloaded.num_links(), links.num_links());
        for (id1, id2, value) in links.links() {
            let r1 = reloaded.lookup(links.name(id1).unwrap()).unwrap();
            let r2 = reloaded.lookup(links.name(id2).unwrap()).unwrap();
            assert!((reloaded.get(r1, r2).unwrap() - value).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_fixture_files() {
        for filename in ["./test_data/simple.links.txt", "./test_data/simple.links.txt.gz"] {
            let links = LinkStore::load_links(&PathBuf::from(filename)).unwrap();
            assert_eq!(links.string_ids(), &[
                "chr1_100".to_string(),
                "chr1_200".to_string(),
                "chr1_300".to_string()
            ]);
            assert_eq!(links.get(0, 1).unwrap(), -1.0);
            assert_eq!(links.get(2, 1).unwrap(), 2.5);
            assert_eq!(links.get(0, 2).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_load_header_only() {
        let result = LinkStore::load_links(&PathBuf::from("./test_data/header_only.links.txt"));
        assert!(matches!(result, Err(HicError::EmptyResult { .. })));
    }

    #[test]
    fn test_load_malformed() {
        let result = LinkStore::load_links(&PathBuf::from("./test_data/malformed.links.txt"));
        match result {
            Err(HicError::UnsupportedFormat { location, .. }) => assert!(location.ends_with("line 3")),
            other => panic!("unexpected result: {other:?}")
        };
    }

    #[test]
    fn test_load_missing() {
        let result = LinkStore::load_links(&PathBuf::from("./test_data/does_not_exist.links.txt"));
        assert!(matches!(result, Err(HicError::ResourceUnavailable { .. })));
    }
}
