// src/dao/mod.rs

pub mod adapters;

use std::collections::HashMap;

/// Key-value read interface over external storage. Lookups return an
/// empty list, never an error, when nothing exists for the key.
pub trait ReadableDao<V>: Send + Sync {
    fn get(&self, key: &str) -> Vec<V>;
}

/// DAO backed by a map loaded once at startup (from the static files or
/// the generated mock catalog).
pub struct InMemoryDao<V> {
    rows: HashMap<String, Vec<V>>,
}

impl<V> InMemoryDao<V> {
    pub fn new(rows: HashMap<String, Vec<V>>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<V: Clone + Send + Sync> ReadableDao<V> for InMemoryDao<V> {
    fn get(&self, key: &str) -> Vec<V> {
        self.rows.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_yields_empty_list() {
        let dao: InMemoryDao<String> = InMemoryDao::empty();
        assert!(dao.get("nope").is_empty());
    }

    #[test]
    fn known_key_yields_its_rows() {
        let mut rows = HashMap::new();
        rows.insert("mp1".to_string(), vec!["a".to_string(), "b".to_string()]);
        let dao = InMemoryDao::new(rows);
        assert_eq!(dao.get("mp1"), vec!["a".to_string(), "b".to_string()]);
    }
}
