//! Character trie over function identifiers.
//!
//! Used for tracked-function lookups when the host hands over a scope and a
//! method name separately: the trie walks both parts in place instead of
//! building the qualified string on every call.

use crate::utils::config::SCOPE_SEPARATOR;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    /// (byte, child node index), kept sorted by byte
    children: Vec<(u8, usize)>,

    /// Ordinal of the word ending at this node
    terminal: Option<usize>,
}

/// Trie of function identifiers, each tagged with its insertion ordinal
#[derive(Debug, Clone)]
pub struct FunctionTrie {
    nodes: Vec<TrieNode>,
    words: usize,
}

impl Default for FunctionTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            words: 0,
        }
    }

    /// Number of distinct words stored
    pub fn len(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    /// Insert a word, returning its ordinal
    ///
    /// Inserting an existing word returns the ordinal it already has.
    pub fn insert(&mut self, word: &str) -> usize {
        let mut node = 0;
        for byte in word.bytes() {
            node = match self.child(node, byte) {
                Some(next) => next,
                None => self.append(node, byte),
            };
        }

        match self.nodes[node].terminal {
            Some(ordinal) => ordinal,
            None => {
                let ordinal = self.words;
                self.nodes[node].terminal = Some(ordinal);
                self.words += 1;
                ordinal
            }
        }
    }

    /// Ordinal of `word`, if present
    pub fn lookup(&self, word: &str) -> Option<usize> {
        let node = self.walk(0, word.as_bytes())?;
        self.nodes[node].terminal
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lookup(word).is_some()
    }

    /// Look up `scope::name` without allocating the qualified string
    pub fn lookup_qualified(&self, scope: Option<&str>, name: &str) -> Option<usize> {
        let mut node = 0;
        if let Some(scope) = scope.filter(|s| !s.is_empty()) {
            node = self.walk(node, scope.as_bytes())?;
            node = self.walk(node, SCOPE_SEPARATOR.as_bytes())?;
        }
        node = self.walk(node, name.as_bytes())?;
        self.nodes[node].terminal
    }

    fn walk(&self, mut node: usize, bytes: &[u8]) -> Option<usize> {
        for &byte in bytes {
            node = self.child(node, byte)?;
        }
        Some(node)
    }

    fn child(&self, node: usize, byte: u8) -> Option<usize> {
        let children = &self.nodes[node].children;
        children
            .binary_search_by_key(&byte, |(b, _)| *b)
            .ok()
            .map(|pos| children[pos].1)
    }

    fn append(&mut self, node: usize, byte: u8) -> usize {
        let index = self.nodes.len();
        self.nodes.push(TrieNode::default());

        let children = &mut self.nodes[node].children;
        let pos = children
            .binary_search_by_key(&byte, |(b, _)| *b)
            .unwrap_or_else(|pos| pos);
        children.insert(pos, (byte, index));
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut trie = FunctionTrie::new();
        assert_eq!(trie.insert("test"), 0);
        assert_eq!(trie.insert("bar"), 1);
        assert_eq!(trie.insert("test"), 0);

        assert_eq!(trie.len(), 2);
        assert_eq!(trie.lookup("test"), Some(0));
        assert_eq!(trie.lookup("bar"), Some(1));
        assert!(!trie.contains("tes"));
        assert!(!trie.contains("testing"));
        assert!(!trie.contains(""));
    }

    #[test]
    fn test_prefix_words() {
        let mut trie = FunctionTrie::new();
        trie.insert("foo");
        trie.insert("foo_array");

        assert!(trie.contains("foo"));
        assert!(trie.contains("foo_array"));
        assert!(!trie.contains("foo_"));
    }

    #[test]
    fn test_lookup_qualified() {
        let mut trie = FunctionTrie::new();
        trie.insert("C::outer_static");
        trie.insert("strlen");

        assert_eq!(trie.lookup_qualified(Some("C"), "outer_static"), Some(0));
        assert_eq!(trie.lookup_qualified(None, "strlen"), Some(1));
        assert_eq!(trie.lookup_qualified(Some(""), "strlen"), Some(1));
        assert_eq!(trie.lookup_qualified(Some("C"), "strlen"), None);
        assert_eq!(trie.lookup_qualified(None, "outer_static"), None);
    }
}
