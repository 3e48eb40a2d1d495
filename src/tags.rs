//! Tag storage keyed by file name

use crate::error::TagRejection;
use crate::state::name_key;
use std::collections::{BTreeMap, HashSet};

/// Every stored tag starts with this marker
pub const TAG_MARKER: char = '#';

/// Longest accepted tag in characters, marker included
pub const MAX_TAG_LEN: usize = 20;

/// Trim a raw tag, add the marker if missing, and check its length.
///
/// Whitespace between the marker and the text is dropped, so `# foo` and
/// `#foo` are the same tag.
pub fn normalize_tag(raw: &str) -> Result<String, TagRejection> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix(TAG_MARKER).unwrap_or(trimmed).trim_start();

    if body.trim_start_matches(TAG_MARKER).trim().is_empty() {
        return Err(TagRejection::Empty);
    }
    let tag = format!("{}{}", TAG_MARKER, body);
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(TagRejection::TooLong { max: MAX_TAG_LEN });
    }
    Ok(tag)
}

/// Split comma separated tag text as typed in the tag editor
pub fn parse_tag_text(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render tags the way they are edited and searched
pub fn tags_text(tags: &[String]) -> String {
    tags.join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TaggedName {
    file_name: String,
    tags: Vec<String>,
}

/// What a call to [`TagIndex::set`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub stored: Vec<String>,
    pub rejected: Vec<(String, TagRejection)>,
    pub changed: bool,
}

/// Mapping from file name (case-insensitive) to a non-empty list of tags.
///
/// A name without tags has no key at all. Each edit replaces the whole
/// list for a name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    entries: BTreeMap<String, TaggedName>,
}

impl TagIndex {
    /// Build from persisted data, normalizing whatever was stored.
    ///
    /// Names that differ only in case are merged into one key: the spelling
    /// seen first is kept and its tags come first.
    pub fn from_map(map: &BTreeMap<String, Vec<String>>) -> Self {
        let mut index = Self::default();
        for (file_name, tags) in map {
            let update = match index.entries.get(&name_key(file_name)).cloned() {
                Some(existing) => {
                    log::warn!(
                        "Stored tags for {} and {} differ only in case, merging them",
                        existing.file_name,
                        file_name
                    );
                    let merged: Vec<&str> = existing
                        .tags
                        .iter()
                        .chain(tags)
                        .map(String::as_str)
                        .collect();
                    index.set(&existing.file_name, merged.as_slice())
                }
                None => index.set(file_name, tags.as_slice()),
            };
            for (tag, reason) in update.rejected {
                log::warn!("Dropping stored tag {:?} for {}: {}", tag, file_name, reason);
            }
        }
        index
    }

    /// Snapshot for persistence
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .values()
            .map(|e| (e.file_name.clone(), e.tags.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.entries.contains_key(&name_key(file_name))
    }

    /// Tags for a file name; empty when it has none
    pub fn get(&self, file_name: &str) -> Vec<String> {
        self.tags(file_name).to_vec()
    }

    pub fn tags(&self, file_name: &str) -> &[String] {
        self.entries
            .get(&name_key(file_name))
            .map(|e| e.tags.as_slice())
            .unwrap_or(&[])
    }

    /// Replace all tags of a file name.
    ///
    /// Invalid tags are dropped individually, duplicates (ignoring case) keep
    /// their first occurrence, and an empty result removes the key.
    pub fn set<S: AsRef<str>>(&mut self, file_name: &str, tags: &[S]) -> TagUpdate {
        let mut stored: Vec<String> = Vec::new();
        let mut rejected = Vec::new();

        for raw in tags {
            match normalize_tag(raw.as_ref()) {
                Ok(tag) => {
                    let folded = tag.to_lowercase();
                    if !stored.iter().any(|t| t.to_lowercase() == folded) {
                        stored.push(tag);
                    }
                }
                Err(reason) => rejected.push((raw.as_ref().to_string(), reason)),
            }
        }

        let key = name_key(file_name);
        let changed = if stored.is_empty() {
            self.entries.remove(&key).is_some()
        } else {
            let next = TaggedName {
                file_name: file_name.to_string(),
                tags: stored.clone(),
            };
            let changed = self.entries.get(&key) != Some(&next);
            self.entries.insert(key, next);
            changed
        };

        TagUpdate {
            stored,
            rejected,
            changed,
        }
    }

    /// Drop every key whose file name is not live. Returns the dropped names.
    pub fn garbage_collect(&mut self, live_names: &HashSet<String>) -> Vec<String> {
        let live: HashSet<String> = live_names.iter().map(|n| name_key(n)).collect();
        let mut dropped = Vec::new();

        self.entries.retain(|key, entry| {
            let keep = live.contains(key);
            if !keep {
                dropped.push(entry.file_name.clone());
            }
            keep
        });

        dropped
    }
}
