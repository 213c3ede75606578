//! Cache keys derived from read queries
//!
//! A signature carries every parameter that affects a result, already case
//! folded. Two queries with the same meaning produce equal signatures no
//! matter how their parameters were supplied.

use std::fmt;

use crate::query::{normalize, Query};

/// Normalized key of one read query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuerySignature {
    /// Prefix search with its filter and window
    Search {
        /// Case-folded prefix
        prefix: String,
        /// Case-folded substring filter, `None` when absent or empty
        contains: Option<String>,
        /// Window start
        offset: usize,
        /// Window size
        limit: Option<usize>,
    },
    /// Exact existence check
    Exists {
        /// Case-folded word
        word: String,
    },
}

impl QuerySignature {
    /// Signature of a search query
    pub fn search(query: &Query) -> Self {
        let query = query.normalized();
        QuerySignature::Search {
            prefix: query.prefix,
            contains: query.contains,
            offset: query.offset,
            limit: query.limit,
        }
    }

    /// Signature of an existence check
    pub fn exists(word: &str) -> Self {
        QuerySignature::Exists {
            word: normalize(word),
        }
    }

    /// Could inserting or deleting `word` change the cached result?
    ///
    /// `word` must already be normalized.
    pub fn affected_by(&self, word: &str) -> bool {
        match self {
            QuerySignature::Search { prefix, .. } => word.starts_with(prefix.as_str()),
            QuerySignature::Exists { word: cached } => cached == word,
        }
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySignature::Search {
                prefix,
                contains,
                offset,
                limit,
            } => {
                write!(
                    f,
                    "search?prefix={}&contains={}&offset={}&limit=",
                    prefix,
                    contains.as_deref().unwrap_or(""),
                    offset
                )?;
                match limit {
                    Some(limit) => write!(f, "{}", limit),
                    None => write!(f, "*"),
                }
            }
            QuerySignature::Exists { word } => write!(f, "exists?word={}", word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_query_same_signature() {
        let a = QuerySignature::search(&Query::prefix("Ma").with_limit(10).with_offset(2));
        let b = QuerySignature::search(&Query::prefix("mA").with_offset(2).with_limit(10));

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "search?prefix=ma&contains=&offset=2&limit=10");
    }

    #[test]
    fn test_empty_filter_equals_no_filter() {
        let a = QuerySignature::search(&Query::prefix("ma").with_contains(""));
        let b = QuerySignature::search(&Query::prefix("ma"));

        assert_eq!(a, b);
    }

    #[test]
    fn test_different_queries_differ() {
        let base = QuerySignature::search(&Query::prefix("ma"));

        assert_ne!(base, QuerySignature::search(&Query::prefix("mag")));
        assert_ne!(base, QuerySignature::search(&Query::prefix("ma").with_offset(1)));
        assert_ne!(base, QuerySignature::search(&Query::prefix("ma").with_limit(0)));
        assert_ne!(base, QuerySignature::search(&Query::prefix("ma").with_contains("g")));
        assert_ne!(base, QuerySignature::exists("ma"));
        assert_eq!(QuerySignature::exists("ma").to_string(), "exists?word=ma");
    }

    #[test]
    fn test_affected_by() {
        let search = QuerySignature::search(&Query::prefix("ca"));
        assert!(search.affected_by("cat"));
        assert!(search.affected_by("ca"));
        assert!(!search.affected_by("c"));
        assert!(!search.affected_by("dog"));

        let all = QuerySignature::search(&Query::prefix(""));
        assert!(all.affected_by("anything"));

        let exists = QuerySignature::exists("Cat");
        assert!(exists.affected_by("cat"));
        assert!(!exists.affected_by("cats"));
    }
}
