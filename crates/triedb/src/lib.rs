//! # triedb
//!
//! In-memory prefix index for word autocomplete.
//!
//! ## Design
//! - Tree keyed by `char`, one edge per code point
//! - Single writer, unlimited readers (`parking_lot::RwLock`)
//! - Operations: INSERT, DELETE, EXISTS, SEARCH (prefix), COLLECT, COUNT, CLEAR
//! - Total over string input: empty or unknown words are no-ops, never errors

#![warn(missing_docs)]

mod node;
mod trie;

pub use trie::PrefixIndex;
