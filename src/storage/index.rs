use super::Row;
use std::collections::{BTreeMap, BTreeSet};

/// Secondary index for one column: value to the positions holding it.
///
/// Scans never consult it; the table only keeps it current.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Index {
    entries: BTreeMap<String, BTreeSet<usize>>,
}

impl Index {
    pub fn build(rows: &[Row], column: usize) -> Self {
        let mut index = Self::default();
        for (pos, row) in rows.iter().enumerate() {
            if let Some(value) = row.get(column) {
                index.insert(value, pos);
            }
        }
        index
    }

    pub fn insert(&mut self, value: &str, pos: usize) {
        self.entries.entry(value.to_string()).or_default().insert(pos);
    }

    pub fn remove(&mut self, value: &str, pos: usize) {
        if let Some(set) = self.entries.get_mut(value) {
            set.remove(&pos);
            if set.is_empty() {
                self.entries.remove(value);
            }
        }
    }

    pub fn positions(&self, value: &str) -> Option<&BTreeSet<usize>> {
        self.entries.get(value)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rows(values: &[&str]) -> Vec<Row> {
        values.iter().map(|v| vec![v.to_string()]).collect()
    }

    #[test]
    fn test_build() {
        let index = Index::build(&rows(&["a", "b", "a"]), 0);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.positions("a").unwrap().iter().copied().collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert!(index.positions("c").is_none());
    }

    #[test]
    fn test_remove_drops_empty_values() {
        let mut index = Index::build(&rows(&["a", "b"]), 0);
        index.remove("b", 1);
        assert_eq!(index, Index::build(&rows(&["a"]), 0));
        index.remove("a", 0);
        assert!(index.is_empty());
    }
}
