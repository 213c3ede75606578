//! Read queries and their windowed results

/// Case fold applied to every word on the way in and every query text
///
/// Matching is case-insensitive throughout; no trimming is done.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// Prefix lookup with optional substring filter and pagination window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Words must start with this. Empty matches every word.
    pub prefix: String,
    /// Words must also contain this substring
    pub contains: Option<String>,
    /// Matches to skip before the window starts
    pub offset: usize,
    /// Maximum number of words in the window, unbounded if `None`
    pub limit: Option<usize>,
}

impl Query {
    /// Query for every word starting with `prefix`
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Keep only words containing `needle`
    pub fn with_contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    /// Skip the first `offset` matches
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Return at most `limit` matches
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Case-folded copy; an empty filter is the same as no filter
    pub fn normalized(&self) -> Self {
        Self {
            prefix: normalize(&self.prefix),
            contains: self
                .contains
                .as_deref()
                .filter(|needle| !needle.is_empty())
                .map(normalize),
            offset: self.offset,
            limit: self.limit,
        }
    }

    /// Filter then window the sorted prefix matches
    pub(crate) fn window(&self, matches: Vec<String>) -> SearchPage {
        let filtered: Vec<String> = match &self.contains {
            Some(needle) => matches
                .into_iter()
                .filter(|word| word.contains(needle.as_str()))
                .collect(),
            None => matches,
        };

        let total = filtered.len();
        let words = filtered
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();

        SearchPage { words, total }
    }
}

/// One window of sorted search results
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    /// Matching words inside the window, lexicographic order
    pub words: Vec<String>,
    /// Matches before windowing
    pub total: usize,
}

impl SearchPage {
    /// Number of words in this window
    pub fn count(&self) -> usize {
        self.words.len()
    }
}
