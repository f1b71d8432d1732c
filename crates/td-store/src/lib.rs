//! td-store
//!
//! Current-state table of price records plus the persistent blob store the
//! table is saved to.

mod blob;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};

use anyhow::{Context, Result};
use td_schemas::{Category, PriceRecord};
use tracing::{info, warn};

/// Ordered sequence of price records, partitioned by category via id prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceStore {
    records: Vec<PriceRecord>,
}

impl PriceStore {
    pub fn new(records: Vec<PriceRecord>) -> Self {
        Self { records }
    }

    /// Load the persisted document. Missing or unparsable means empty.
    pub async fn load(blob: &dyn BlobStore, key: &str) -> Self {
        match blob.get(key).await {
            Ok(None) => {
                info!(key, "no persisted prices; starting empty");
                Self::default()
            }
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<PriceRecord>>(&bytes) {
                Ok(records) => {
                    info!(key, records = records.len(), "prices loaded");
                    Self::new(records)
                }
                Err(err) => {
                    warn!(key, error = %err, "persisted prices unparsable; starting empty");
                    Self::default()
                }
            },
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "reading persisted prices failed; starting empty");
                Self::default()
            }
        }
    }

    pub fn all(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn by_category(&self, category: &Category) -> Vec<PriceRecord> {
        self.records
            .iter()
            .filter(|r| category.owns(&r.id))
            .cloned()
            .collect()
    }

    /// Remove every record of `category`, append `new_records`, and return
    /// what was removed. Records of other categories keep their order.
    pub fn replace_category(
        &mut self,
        category: &Category,
        new_records: Vec<PriceRecord>,
    ) -> Vec<PriceRecord> {
        let (removed, kept): (Vec<PriceRecord>, Vec<PriceRecord>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| category.owns(&r.id));
        self.records = kept;
        self.records.extend(new_records);
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Persisted layout: the full record sequence as a pretty JSON array.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.records).context("serialize prices failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(s: &str) -> Category {
        Category::parse(s).unwrap()
    }

    fn store() -> PriceStore {
        PriceStore::new(vec![
            PriceRecord::new("A1", 10.0, 12.0, 14.0, 16.0),
            PriceRecord::new("B1", 1.0, 2.0, 3.0, 4.0),
            PriceRecord::new("A2", 11.0, 13.0, 15.0, 17.0),
        ])
    }

    #[test]
    fn by_category_upper_cases_the_key() {
        let ids: Vec<String> = store().by_category(&cat("a")).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["A1", "A2"]);
    }

    #[test]
    fn replace_category_returns_removed_and_leaves_others() {
        let mut s = store();
        let removed = s.replace_category(&cat("A"), vec![PriceRecord::new("A9", 1.0, 1.0, 1.0, 1.0)]);

        let removed_ids: Vec<&str> = removed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(removed_ids, vec!["A1", "A2"]);

        let ids: Vec<&str> = s.all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["B1", "A9"]);
    }

    #[test]
    fn replace_with_empty_clears_category() {
        let mut s = store();
        s.replace_category(&cat("A"), Vec::new());
        assert!(s.by_category(&cat("A")).is_empty());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn encode_is_a_json_array() {
        let bytes = store().encode().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v.as_array().map(Vec::len), Some(3));
        assert_eq!(v[0]["under25"], 10);
    }
}
