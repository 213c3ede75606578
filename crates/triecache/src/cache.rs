//! TrieCache: lookup cache wrapping the prefix index
//!
//! Reads go cache first, index on miss. Writes go to the index, then
//! invalidate the cache before returning.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use triedb::PrefixIndex;

use crate::lookup::LookupCache;
use crate::query::{normalize, Query, SearchPage};
use crate::signature::QuerySignature;
use crate::stats::CacheStats;

/// Default time a lookup result stays cached
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Which cache entries a mutation removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Drop every entry on any mutation
    #[default]
    Flush,
    /// Drop only entries whose result could contain a mutated word
    Precise,
}

impl FromStr for InvalidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flush" | "coarse" => Ok(InvalidationPolicy::Flush),
            "precise" => Ok(InvalidationPolicy::Precise),
            _ => Err(format!(
                "Invalid invalidation policy: {}. Use 'flush' or 'precise'",
                s
            )),
        }
    }
}

/// Cache tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of a cached lookup
    pub ttl: Duration,
    /// Invalidation applied on insert and delete
    pub policy: InvalidationPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            policy: InvalidationPolicy::default(),
        }
    }
}

#[derive(Clone)]
enum Lookup {
    Page(Arc<SearchPage>),
    Exists(bool),
}

/// Cached word store combining the lookup cache with the prefix index
pub struct TrieCache {
    /// Word store
    index: PrefixIndex,

    /// Read results by query signature
    cache: LookupCache<Lookup>,

    config: CacheConfig,
}

impl TrieCache {
    /// Create an empty store with the given cache settings
    pub fn new(config: CacheConfig) -> Self {
        Self {
            index: PrefixIndex::new(),
            cache: LookupCache::new(),
            config,
        }
    }

    /// Add words, case folded. Empty words are skipped.
    ///
    /// # Returns
    /// * `usize` - Number of words not stored before
    pub fn insert_words<I, S>(&self, words: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for word in words {
            let word = normalize(word.as_ref());
            if self.index.insert(&word) {
                added.push(word);
            }
        }

        if !added.is_empty() {
            self.invalidate(&added);
        }
        added.len()
    }

    /// Delete one word, case folded. An empty word clears the whole store.
    ///
    /// # Returns
    /// * `bool` - True if anything was removed
    pub fn delete_word(&self, word: &str) -> bool {
        if word.is_empty() {
            return self.clear();
        }

        let word = normalize(word);
        let removed = self.index.delete(&word);
        if removed {
            self.invalidate(std::slice::from_ref(&word));
        }
        removed
    }

    /// Remove every word and flush the cache
    ///
    /// # Returns
    /// * `bool` - True if the store held any word
    pub fn clear(&self) -> bool {
        let had_words = !self.index.is_empty();
        self.index.clear();
        self.cache.flush();
        had_words
    }

    /// Sorted words matching `query`, windowed
    pub fn search(&self, query: &Query) -> Arc<SearchPage> {
        let query = query.normalized();
        let signature = QuerySignature::search(&query);

        if let Some(Lookup::Page(page)) = self.cache.get(&signature) {
            return page;
        }

        let generation = self.cache.generation();
        let page = Arc::new(query.window(self.index.search(&query.prefix)));
        self.cache.set_if_current(
            signature,
            Lookup::Page(Arc::clone(&page)),
            self.config.ttl,
            generation,
        );
        page
    }

    /// Check whether a word is stored, case-insensitively
    pub fn exists(&self, word: &str) -> bool {
        let word = normalize(word);
        let signature = QuerySignature::Exists { word: word.clone() };

        if let Some(Lookup::Exists(found)) = self.cache.get(&signature) {
            return found;
        }

        let generation = self.cache.generation();
        let found = self.index.exists(&word);
        self.cache.set_if_current(
            signature,
            Lookup::Exists(found),
            self.config.ttl,
            generation,
        );
        found
    }

    fn invalidate(&self, words: &[String]) {
        match self.config.policy {
            InvalidationPolicy::Flush => {
                self.cache.flush();
            }
            InvalidationPolicy::Precise => {
                self.cache
                    .invalidate_where(|signature| words.iter().any(|w| signature.affected_by(w)));
            }
        }
    }

    /// Drop expired cache entries
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    /// Get the number of stored words
    pub fn word_count(&self) -> usize {
        self.index.count()
    }

    /// Get the number of index nodes, root included
    pub fn node_count(&self) -> usize {
        self.index.node_count()
    }

    /// Get current cache size
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Get cache settings
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl Default for TrieCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const WORDS: [&str; 8] = [
        "magic", "magnet", "maggie", "maggot", "ma", "megan", "mama", "mam",
    ];

    fn precise() -> TrieCache {
        TrieCache::new(CacheConfig {
            policy: InvalidationPolicy::Precise,
            ..CacheConfig::default()
        })
    }

    fn words(page: &SearchPage) -> Vec<&str> {
        page.words.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_search_scenario() {
        let store = TrieCache::default();
        assert_eq!(store.insert_words(WORDS), 8);

        let page = store.search(&Query::prefix("mag"));
        assert_eq!(words(&page), ["maggie", "maggot", "magic", "magnet"]);
        assert_eq!(page.total, 4);

        let page = store.search(&Query::prefix("ma"));
        assert_eq!(
            words(&page),
            ["ma", "maggie", "maggot", "magic", "magnet", "mam", "mama"]
        );

        assert!(store.search(&Query::prefix("a")).words.is_empty());
    }

    #[test]
    fn test_case_folding() {
        let store = TrieCache::default();
        store.insert_words(["Hello"]);

        assert!(store.exists("hello"));
        assert!(store.exists("Hello"));
        assert!(store.exists("HELLO"));
        assert!(!store.exists("HELLO "));
        assert_eq!(words(&store.search(&Query::prefix("HEL"))), ["hello"]);
    }

    #[test]
    fn test_empty_words_ignored() {
        let store = TrieCache::default();

        assert_eq!(store.insert_words(["", "a", "", "A"]), 1);
        assert_eq!(store.word_count(), 1);
        assert!(!store.exists(""));
    }

    #[test]
    fn test_cache_hit() {
        let store = TrieCache::default();
        store.insert_words(WORDS);

        let first = store.search(&Query::prefix("mag"));
        let second = store.search(&Query::prefix("MAG"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.stats().hits(), 1);
        assert_eq!(store.stats().misses(), 1);
        assert_eq!(store.cache_len(), 1);
    }

    #[test]
    fn test_insert_invalidates() {
        for store in [TrieCache::default(), precise()] {
            store.insert_words(["cat"]);
            assert_eq!(words(&store.search(&Query::prefix("ca"))), ["cat"]);
            assert!(!store.exists("car"));

            store.insert_words(["car"]);

            assert_eq!(words(&store.search(&Query::prefix("ca"))), ["car", "cat"]);
            assert!(store.exists("car"));
        }
    }

    #[test]
    fn test_delete_invalidates() {
        for store in [TrieCache::default(), precise()] {
            store.insert_words(["cat", "car"]);
            assert_eq!(words(&store.search(&Query::prefix(""))), ["car", "cat"]);
            assert_eq!(words(&store.search(&Query::prefix("ca"))), ["car", "cat"]);
            assert!(store.exists("cat"));

            assert!(store.delete_word("CAT"));

            assert_eq!(words(&store.search(&Query::prefix(""))), ["car"]);
            assert_eq!(words(&store.search(&Query::prefix("ca"))), ["car"]);
            assert!(!store.exists("cat"));
        }
    }

    #[test]
    fn test_delete_prunes() {
        let store = TrieCache::default();
        store.insert_words(["cat"]);

        assert!(store.delete_word("cat"));

        assert!(store.search(&Query::prefix("ca")).words.is_empty());
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_precise_keeps_unrelated_entries() {
        let store = precise();
        store.insert_words(["cat", "dog"]);

        store.search(&Query::prefix("d"));
        store.search(&Query::prefix("c"));
        store.exists("dog");
        assert_eq!(store.cache_len(), 3);

        store.insert_words(["cow"]);

        // Only the "c" search went
        assert_eq!(store.cache_len(), 2);
        assert_eq!(words(&store.search(&Query::prefix("c"))), ["cat", "cow"]);
        assert_eq!(words(&store.search(&Query::prefix("d"))), ["dog"]);
    }

    #[test]
    fn test_flush_policy_drops_everything() {
        let store = TrieCache::default();
        store.insert_words(["cat", "dog"]);

        store.search(&Query::prefix("d"));
        store.exists("dog");
        assert_eq!(store.cache_len(), 2);

        store.insert_words(["cow"]);
        assert_eq!(store.cache_len(), 0);
    }

    #[test]
    fn test_noop_mutations_keep_cache() {
        let store = TrieCache::default();
        store.insert_words(["cat"]);
        store.search(&Query::prefix("c"));

        store.insert_words(["cat", "CAT"]);
        store.delete_word("dog");

        assert_eq!(store.cache_len(), 1);
    }

    #[test]
    fn test_empty_delete_clears() {
        let store = TrieCache::default();
        store.insert_words(WORDS);
        store.search(&Query::prefix("ma"));

        assert!(store.delete_word(""));

        assert_eq!(store.word_count(), 0);
        assert_eq!(store.cache_len(), 0);
        assert!(store.search(&Query::prefix("ma")).words.is_empty());
        assert!(!store.delete_word(""));
    }

    #[test]
    fn test_pagination() {
        let store = TrieCache::default();
        store.insert_words(WORDS);

        let page = store.search(&Query::prefix("ma").with_offset(2).with_limit(3));
        assert_eq!(words(&page), ["maggot", "magic", "magnet"]);
        assert_eq!(page.total, 7);

        let page = store.search(&Query::prefix("ma").with_offset(7));
        assert!(page.words.is_empty());
        assert_eq!(page.total, 7);

        let page = store.search(&Query::prefix("ma").with_contains("GG").with_limit(1));
        assert_eq!(words(&page), ["maggie"]);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_expired_entries_recomputed() {
        let store = TrieCache::new(CacheConfig {
            ttl: Duration::ZERO,
            ..CacheConfig::default()
        });
        store.insert_words(["cat"]);

        store.search(&Query::prefix("c"));
        store.search(&Query::prefix("c"));

        assert_eq!(store.stats().hits(), 0);
        assert_eq!(store.stats().misses(), 2);
        assert_eq!(store.purge_expired(), 1);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("flush".parse::<InvalidationPolicy>(), Ok(InvalidationPolicy::Flush));
        assert_eq!("PRECISE".parse::<InvalidationPolicy>(), Ok(InvalidationPolicy::Precise));
        assert!("sometimes".parse::<InvalidationPolicy>().is_err());
    }

    #[test]
    fn test_concurrent_writes_stay_coherent() {
        let store = Arc::new(precise());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        let word = format!("t{}w{:03}", t, i);
                        store.insert_words([word.as_str()]);
                        assert!(store.exists(&word));
                        store.search(&Query::prefix(format!("t{}", t)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for t in 0..4 {
            let page = store.search(&Query::prefix(format!("t{}", t)));
            assert_eq!(page.total, 100);
        }
        assert_eq!(store.search(&Query::prefix("")).total, 400);
    }
}
