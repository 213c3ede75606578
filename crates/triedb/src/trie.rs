//! Prefix index implementation
//!
//! Layout:
//! - `root`: the empty-string node, never pruned
//! - one node per distinct prefix of every stored word
//!
//! Writers (`insert`, `delete`, `clear`) take the lock exclusively. Readers
//! share it and finish their traversal before releasing it.

use std::mem;

use parking_lot::RwLock;

use crate::node::Node;

/// PrefixIndex is the word store handle
pub struct PrefixIndex {
    /// Root node, guarded for the whole tree
    root: RwLock<Node>,
}

impl PrefixIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Node::new()),
        }
    }

    /// Insert a word into the index
    ///
    /// # Arguments
    /// * `word` - Word to store, compared by raw code point
    ///
    /// # Returns
    /// * `bool` - True if the word was not stored before. An empty word is
    ///   never stored.
    pub fn insert(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }

        let mut root = self.root.write();
        let mut node = &mut *root;
        for ch in word.chars() {
            node = node.children.entry(ch).or_default();
        }

        !mem::replace(&mut node.terminal, true)
    }

    /// Delete a word from the index, pruning nodes left without purpose
    ///
    /// # Arguments
    /// * `word` - Word to remove
    ///
    /// # Returns
    /// * `bool` - True if the word was stored and has been removed
    pub fn delete(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }

        let mut root = self.root.write();

        // Deepest node on the path that survives the delete. The root always
        // does; below it a node survives if it ends another word or branches.
        let mut keep_depth = 0;
        let mut node = &*root;
        for (depth, ch) in word.chars().enumerate() {
            if depth > 0 && (node.terminal || node.children.len() > 1) {
                keep_depth = depth;
            }
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return false,
            }
        }

        if !node.terminal {
            return false;
        }

        if !node.children.is_empty() {
            // Still a prefix of other words: only unmark it
            if let Some(end) = root.descend_mut(word) {
                end.terminal = false;
            }
            return true;
        }

        // Cut the edge leaving the surviving node; everything below it
        // belonged to this word alone.
        if let Some((offset, ch)) = word.char_indices().nth(keep_depth) {
            if let Some(parent) = root.descend_mut(&word[..offset]) {
                parent.children.remove(&ch);
            }
        }

        true
    }

    /// Check whether a word is stored
    ///
    /// An empty word never exists.
    pub fn exists(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }

        self.root
            .read()
            .descend(word)
            .is_some_and(|node| node.terminal)
    }

    /// All stored words starting with `prefix`, in lexicographic order
    ///
    /// An empty prefix matches every stored word. A prefix with no path in
    /// the index yields an empty vector.
    pub fn search(&self, prefix: &str) -> Vec<String> {
        let root = self.root.read();

        let mut words = Vec::new();
        if let Some(start) = root.descend(prefix) {
            start.collect_into(prefix, &mut words);
        }
        words
    }

    /// Every stored word, in lexicographic order
    pub fn collect_all(&self) -> Vec<String> {
        self.search("")
    }

    /// Number of stored words
    pub fn count(&self) -> usize {
        self.root.read().count_words()
    }

    /// Check if the index holds no words
    pub fn is_empty(&self) -> bool {
        self.root.read().children.is_empty()
    }

    /// Number of allocated nodes, root included
    pub fn node_count(&self) -> usize {
        self.root.read().count_nodes()
    }

    /// Remove every word by replacing the whole tree
    pub fn clear(&self) {
        let old = mem::replace(&mut *self.root.write(), Node::new());
        // Tear down outside the lock
        drop(old);
    }
}

impl Default for PrefixIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const WORDS: [&str; 8] = [
        "magic", "magnet", "maggie", "maggot", "ma", "megan", "mama", "mam",
    ];

    fn populated() -> PrefixIndex {
        let index = PrefixIndex::new();
        for word in WORDS {
            index.insert(word);
        }
        index
    }

    #[test]
    fn test_insert_and_exists() {
        let index = PrefixIndex::new();

        assert!(index.insert("hello"));
        assert!(index.exists("hello"));
        assert!(!index.exists("hell"));
        assert!(!index.exists("helloo"));
        assert_eq!(index.count(), 1);
    }

    #[test]
    fn test_empty_word_is_noop() {
        let index = PrefixIndex::new();

        assert!(!index.insert(""));
        assert!(!index.exists(""));
        assert!(!index.delete(""));
        assert!(index.is_empty());
        assert_eq!(index.node_count(), 1);
        assert!(index.search("").is_empty());
    }

    #[test]
    fn test_insert_idempotent() {
        let index = PrefixIndex::new();

        assert!(index.insert("cat"));
        let nodes = index.node_count();
        assert!(!index.insert("cat"));

        assert_eq!(index.node_count(), nodes);
        assert_eq!(index.search("c"), vec!["cat"]);
        assert_eq!(index.count(), 1);
    }

    #[test]
    fn test_search_prefixes() {
        let index = populated();

        assert_eq!(
            index.search("mag"),
            vec!["maggie", "maggot", "magic", "magnet"]
        );
        assert_eq!(
            index.search("ma"),
            vec!["ma", "maggie", "maggot", "magic", "magnet", "mam", "mama"]
        );
        assert!(index.search("a").is_empty());
        assert!(index.search("magnets").is_empty());
        assert_eq!(index.search("megan"), vec!["megan"]);
    }

    #[test]
    fn test_empty_prefix_lists_everything() {
        let index = populated();

        let all = index.search("");
        assert_eq!(all.len(), WORDS.len());
        assert_eq!(all, index.collect_all());

        let mut sorted: Vec<String> = WORDS.iter().map(|w| w.to_string()).collect();
        sorted.sort();
        assert_eq!(all, sorted);
    }

    #[test]
    fn test_search_is_case_sensitive() {
        let index = PrefixIndex::new();
        index.insert("hello");

        assert!(index.search("He").is_empty());
        assert!(!index.exists("Hello"));
    }

    #[test]
    fn test_delete_prunes_chain() {
        let index = PrefixIndex::new();
        index.insert("cat");

        assert!(index.delete("cat"));
        assert!(!index.exists("cat"));
        assert!(index.search("ca").is_empty());
        assert!(index.is_empty());
        assert_eq!(index.node_count(), 1);
    }

    #[test]
    fn test_delete_keeps_shared_prefix() {
        let index = populated();
        let before = index.node_count();

        // "mam" is terminal and has a child: unmark only
        assert!(index.delete("mam"));
        assert_eq!(index.node_count(), before);
        assert!(index.exists("mama"));
        assert!(!index.exists("mam"));

        // "mama" now hangs off a non-terminal "mam": both go
        assert!(index.delete("mama"));
        assert_eq!(index.node_count(), before - 2);
        assert!(index.exists("ma"));

        // "magnet" branches off "mag": only "net" goes
        assert!(index.delete("magnet"));
        assert_eq!(index.node_count(), before - 5);
        assert_eq!(index.search("mag"), vec!["maggie", "maggot", "magic"]);
    }

    #[test]
    fn test_delete_keeps_terminal_ancestor() {
        let index = PrefixIndex::new();
        index.insert("ma");
        index.insert("magic");

        assert!(index.delete("magic"));
        assert!(index.exists("ma"));
        // root + m + a
        assert_eq!(index.node_count(), 3);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let index = populated();
        let before = index.node_count();

        assert!(!index.delete("mag"));
        assert!(!index.delete("zebra"));
        assert!(!index.delete("magnetic"));

        assert_eq!(index.node_count(), before);
        assert_eq!(index.count(), WORDS.len());
    }

    #[test]
    fn test_insert_delete_restores_node_count() {
        let index = populated();
        let before = index.node_count();

        index.insert("magnetism");
        index.insert("zebra");
        index.delete("magnetism");
        index.delete("zebra");

        assert_eq!(index.node_count(), before);
    }

    #[test]
    fn test_unicode_code_points() {
        let index = PrefixIndex::new();
        index.insert("café");
        index.insert("cafe");
        index.insert("日本語");

        assert_eq!(index.search("caf"), vec!["cafe", "café"]);
        assert_eq!(index.search("日本"), vec!["日本語"]);

        assert!(index.delete("café"));
        assert_eq!(index.search("caf"), vec!["cafe"]);
        assert!(index.delete("日本語"));
        // root + c + a + f + e
        assert_eq!(index.node_count(), 5);
    }

    #[test]
    fn test_clear() {
        let index = populated();

        index.clear();

        assert!(index.is_empty());
        assert_eq!(index.count(), 0);
        assert_eq!(index.node_count(), 1);
        assert!(index.search("ma").is_empty());

        index.insert("again");
        assert!(index.exists("again"));
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let index = Arc::new(PrefixIndex::new());

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for i in 0..250 {
                        index.insert(&format!("w{}_{}", t, i));
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let words = index.search("w");
                        assert!(words.windows(2).all(|pair| pair[0] < pair[1]));
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(index.count(), 1000);
        assert_eq!(index.search("w3_").len(), 250);
    }
}
