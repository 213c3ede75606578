//! Trie node and traversal helpers, called under the index lock
//!
//! Every traversal here uses an explicit stack. Word length is caller
//! controlled, so recursion depth must not follow it.

use std::collections::BTreeMap;
use std::mem;

/// One position in the shared prefix space
#[derive(Debug, Default)]
pub(crate) struct Node {
    /// Child per code point. Ordered, so enumeration is lexicographic.
    pub(crate) children: BTreeMap<char, Node>,

    /// True iff the path from the root to this node spells a stored word
    pub(crate) terminal: bool,
}

impl Node {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Follow `path` from this node, if every code point has an edge
    pub(crate) fn descend(&self, path: &str) -> Option<&Node> {
        path.chars()
            .try_fold(self, |node, ch| node.children.get(&ch))
    }

    /// Mutable variant of [`Node::descend`]
    pub(crate) fn descend_mut(&mut self, path: &str) -> Option<&mut Node> {
        path.chars()
            .try_fold(self, |node, ch| node.children.get_mut(&ch))
    }

    /// Push every word stored at or below this node onto `out`.
    ///
    /// `prefix` is the spelling of this node. Words come out in
    /// lexicographic (code point) order: pre-order, smallest child first.
    pub(crate) fn collect_into(&self, prefix: &str, out: &mut Vec<String>) {
        let mut stack: Vec<(&Node, String)> = vec![(self, prefix.to_string())];

        while let Some((node, word)) = stack.pop() {
            // Reverse so the smallest child is popped first
            for (ch, child) in node.children.iter().rev() {
                let mut next = String::with_capacity(word.len() + ch.len_utf8());
                next.push_str(&word);
                next.push(*ch);
                stack.push((child, next));
            }

            if node.terminal {
                out.push(word);
            }
        }
    }

    /// Number of terminal nodes at or below this node
    pub(crate) fn count_words(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            if node.terminal {
                count += 1;
            }
            stack.extend(node.children.values());
        }

        count
    }

    /// Number of nodes at or below this node, including itself
    pub(crate) fn count_nodes(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.values());
        }

        count
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Flatten the subtree so a long chain does not drop recursively
        let mut stack: Vec<Node> = mem::take(&mut self.children).into_values().collect();

        while let Some(mut node) = stack.pop() {
            stack.extend(mem::take(&mut node.children).into_values());
        }
    }
}
