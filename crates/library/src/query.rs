//! View queries over the file list.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use filedock_protocol::{FileRecord, MediaCategory};

/// Display order of a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Name,
    /// Largest first.
    Size,
}

impl SortKey {
    /// Total order for `self`; ties fall back to the identifier.
    fn compare(self, a: &FileRecord, b: &FileRecord) -> Ordering {
        let primary = match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::Oldest => a.created_at.cmp(&b.created_at),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::Size => b.size.cmp(&a.size),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" | "new" => Ok(Self::Newest),
            "oldest" | "old" => Ok(Self::Oldest),
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            other => Err(format!(
                "unknown sort key '{other}' (expected newest, oldest, name or size)"
            )),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Name => "name",
            Self::Size => "size",
        })
    }
}

/// Filter and order for one projection of the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    /// Case-insensitive substring of the display name. Empty matches all.
    pub search: String,
    pub category: Option<MediaCategory>,
    pub sort: SortKey,
}

impl ViewQuery {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_category(mut self, category: MediaCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub(crate) fn matches(&self, record: &FileRecord, needle: &str) -> bool {
        if self.category.is_some_and(|c| record.category() != c) {
            return false;
        }
        needle.is_empty() || record.name.to_lowercase().contains(needle)
    }

    /// Derives a fresh, ordered projection of `records`.
    pub(crate) fn apply<'a>(&self, records: impl Iterator<Item = &'a FileRecord>) -> Vec<FileRecord> {
        let needle = self.search.to_lowercase();
        let mut out: Vec<FileRecord> = records
            .filter(|r| self.matches(r, &needle))
            .cloned()
            .collect();
        out.sort_by(|a, b| self.sort.compare(a, b));
        out
    }
}
