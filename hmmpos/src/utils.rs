use std::borrow::Borrow;
use std::hash::Hash;

use hashbrown::HashMap;

/// Assigns consecutive IDs to keys in order of first appearance.
pub struct Indexer<K> {
    ids: HashMap<K, usize>,
    keys: Vec<K>,
}

impl<K> Indexer<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            keys: vec![],
        }
    }

    pub fn get_id<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + ToOwned<Owned = K> + Eq + Hash,
    {
        if let Some(&id) = self.ids.get(key) {
            id
        } else {
            let id = self.keys.len();
            let key = key.to_owned();
            self.keys.push(key.clone());
            self.ids.insert(key, id);
            id
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexer() {
        let mut indexer = Indexer::<String>::new();
        assert_eq!(0, indexer.get_id("රෑ"));
        assert_eq!(1, indexer.get_id("ගස"));
        assert_eq!(0, indexer.get_id("රෑ"));
        assert_eq!(2, indexer.len());
        assert_eq!(&["රෑ".to_string(), "ගස".to_string()], indexer.keys());
    }
}
