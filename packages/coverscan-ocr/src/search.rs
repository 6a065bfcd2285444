//! Substring search over cached region texts.
use serde::Serialize;

use crate::cache::ResultCache;
use crate::region::RegionRecord;

/// Matching regions reported per image at most.
pub const MAX_MATCHES_PER_IMAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub filename: String,
    /// Total number of matching regions in the image.
    pub matches: usize,
    /// The first [`MAX_MATCHES_PER_IMAGE`] matching regions.
    pub regions: Vec<RegionRecord>,
}

/// Case-insensitive substring match of `query` against every region text,
/// grouped per image in file-name order. Blank queries match nothing.
pub fn search(cache: &ResultCache, query: &str) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    cache
        .iter()
        .filter_map(|(name, entry)| {
            let matching: Vec<&RegionRecord> = entry
                .text_data
                .iter()
                .filter(|r| r.text.to_lowercase().contains(&needle))
                .collect();
            if matching.is_empty() {
                return None;
            }
            Some(SearchHit {
                filename: name.to_string(),
                matches: matching.len(),
                regions: matching
                    .into_iter()
                    .take(MAX_MATCHES_PER_IMAGE)
                    .cloned()
                    .collect(),
            })
        })
        .collect()
}
