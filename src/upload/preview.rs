use std::collections::HashMap;
use std::sync::Arc;

/// Issues `blob:`-style URLs for in-memory image bytes.
///
/// A URL resolves only until it is revoked.
#[derive(Debug, Default)]
pub struct ObjectUrlStore {
    next_id: u64,
    entries: HashMap<String, Arc<[u8]>>,
}

impl ObjectUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `tag` is embedded in the URL to make it recognizable in logs.
    pub fn create(&mut self, bytes: Arc<[u8]>, tag: &str) -> String {
        self.next_id += 1;
        let url = format!("blob:detect-overlay/{}-{}", self.next_id, tag);
        self.entries.insert(url.clone(), bytes);
        url
    }

    /// Release a URL. Returns false if it was unknown or already revoked.
    pub fn revoke(&mut self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.entries.get(url).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_unique_and_revocable() {
        let mut store = ObjectUrlStore::new();
        let bytes: Arc<[u8]> = Arc::from(&b"pixels"[..]);
        let a = store.create(Arc::clone(&bytes), "abc");
        let b = store.create(bytes, "abc");
        assert_ne!(a, b);
        assert!(store.resolve(&a).is_some());

        assert!(store.revoke(&a));
        assert!(!store.revoke(&a));
        assert!(store.resolve(&a).is_none());
        assert_eq!(store.resolve(&b).as_deref(), Some(&b"pixels"[..]));
    }
}
