//! Name and tag search over the catalog

use crate::catalog::Catalog;
use crate::state::CatalogEntry;
use crate::tags::{tags_text, TagIndex};

/// A catalog entry together with its tags at the time of the query
#[derive(Debug, Clone)]
pub struct TaggedEntry {
    pub entry: CatalogEntry,
    pub tags: Vec<String>,
}

impl TaggedEntry {
    pub fn tags_text(&self) -> String {
        tags_text(&self.tags)
    }
}

/// Entries whose file name or tag text contains `keyword`, ignoring case.
///
/// A blank keyword matches everything. Catalog order is preserved.
pub fn filter(catalog: &Catalog, tags: &TagIndex, keyword: &str) -> Vec<TaggedEntry> {
    let needle = keyword.trim().to_lowercase();

    catalog
        .entries()
        .iter()
        .filter_map(|entry| {
            let entry_tags = tags.tags(&entry.file_name);
            let hit = needle.is_empty()
                || entry.file_name.to_lowercase().contains(&needle)
                || tags_text(entry_tags).to_lowercase().contains(&needle);

            hit.then(|| TaggedEntry {
                entry: entry.clone(),
                tags: entry_tags.to_vec(),
            })
        })
        .collect()
}
