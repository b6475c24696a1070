//! NRM1 level 4 → NRM2 crosswalk table.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosswalkEntry {
    pub nrm1_l4_code: String,
    pub nrm1_l3_code: String,
    pub nrm1_l2_code: String,
    pub nrm1_description: String,
    #[serde(default)]
    pub nrm1_unit: String,
    #[serde(default)]
    pub nrm2_primary_ws: String,
    #[serde(default)]
    pub nrm2_primary_ws_name: String,
    #[serde(default)]
    pub nrm2_primary_items: String,
    #[serde(default)]
    pub nrm2_secondary_ws: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub matched_keywords: String,
    #[serde(default)]
    pub notes: String,
}

impl CrosswalkEntry {
    /// Comma separated `matched_keywords`, lowercased, blanks dropped.
    pub fn keywords(&self) -> BTreeSet<String> {
        self.matched_keywords
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }

    pub fn section(&self) -> &str {
        self.nrm1_l2_code
            .split('.')
            .next()
            .unwrap_or(&self.nrm1_l2_code)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Crosswalk {
    entries: Vec<CrosswalkEntry>,
    by_l2: HashMap<String, Vec<usize>>,
    by_l4: HashMap<String, usize>,
}

impl Crosswalk {
    pub fn from_entries(entries: Vec<CrosswalkEntry>) -> Self {
        let mut by_l2: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_l4 = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_l2.entry(entry.nrm1_l2_code.clone()).or_default().push(idx);
            // later rows win, as in a plain dict rebuild
            by_l4.insert(entry.nrm1_l4_code.clone(), idx);
        }
        Self {
            entries,
            by_l2,
            by_l4,
        }
    }

    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(data);
        let entries = reader
            .deserialize::<CrosswalkEntry>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::debug!("Parsed {} crosswalk rows", entries.len());
        Ok(Self::from_entries(entries))
    }

    /// Rows under an NRM1 level 2 code, in file order.
    pub fn candidates(&self, l2_code: &str) -> Vec<&CrosswalkEntry> {
        self.by_l2
            .get(l2_code)
            .map(|idxs| idxs.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    pub fn by_l4(&self, l4_code: &str) -> Option<&CrosswalkEntry> {
        self.by_l4.get(l4_code).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn l2_count(&self) -> usize {
        self.by_l2.len()
    }

    pub fn l4_count(&self) -> usize {
        self.by_l4.len()
    }
}
