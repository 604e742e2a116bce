//! Symbol interning.
//!
//! Every distinct symbol text is stored once as an `Arc<str>`; later lookups
//! hand out clones of that canonical instance. The cache only grows.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

/// First-writer-wins cache of canonical symbol instances
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use fix_flyweight::table::SymbolCache;
///
/// let cache = SymbolCache::new();
/// let a = cache.intern("AAPL");
/// let b = cache.intern("AAPL");
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Default)]
pub struct SymbolCache {
    symbols: RwLock<FxHashSet<Arc<str>>>,
}

impl SymbolCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical instance of `text`, allocating only the first time it is seen
    #[inline]
    pub fn intern(&self, text: &str) -> Arc<str> {
        if let Some(existing) = self.symbols.read().get(text) {
            return Arc::clone(existing);
        }

        let mut symbols = self.symbols.write();
        // Another writer may have won between the two locks.
        if let Some(existing) = symbols.get(text) {
            return Arc::clone(existing);
        }
        let canonical: Arc<str> = Arc::from(text);
        symbols.insert(Arc::clone(&canonical));
        canonical
    }

    /// Check whether `text` has been interned
    pub fn contains(&self, text: &str) -> bool {
        self.symbols.read().contains(text)
    }

    /// Number of distinct symbols
    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    /// True if nothing has been interned yet
    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_canonical_instance() {
        let cache = SymbolCache::new();
        let first = cache.intern("MSFT");
        let owned = String::from("MSFT");
        let second = cache.intern(&owned);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("MSFT"));
        assert!(!cache.contains("AAPL"));
    }

    #[test]
    fn test_distinct_symbols() {
        let cache = SymbolCache::new();
        assert!(cache.is_empty());
        let a = cache.intern("AAPL");
        let b = cache.intern("AMZN");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_intern_agrees() {
        let cache = Arc::new(SymbolCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.intern("GOOGL"))
            })
            .collect();

        let results: Vec<Arc<str>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], r));
        }
        assert_eq!(cache.len(), 1);
    }
}
