//! Dense ids for placed objects

use std::collections::HashMap;

/// Assigns sequential ids to `(source file id, source object id)` pairs.
///
/// Ids start at 1 and follow first-use order, so identical input processed
/// in the same order always yields identical ids.
#[derive(Debug, Default, Clone)]
pub struct ObjectIdAllocator {
    ids: HashMap<(u32, u16), u32>,
}

impl ObjectIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for the pair, allocating the next one on first use
    pub fn get_or_create(&mut self, source_file_id: u32, source_object_id: u16) -> u32 {
        let next = self.ids.len() as u32 + 1;
        *self
            .ids
            .entry((source_file_id, source_object_id))
            .or_insert(next)
    }

    /// Number of ids handed out
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_first_use_order() {
        let mut ids = ObjectIdAllocator::new();
        assert_eq!(ids.get_or_create(500, 0), 1);
        assert_eq!(ids.get_or_create(500, 1), 2);
        assert_eq!(ids.get_or_create(12, 0), 3);
        assert_eq!(ids.get_or_create(500, 0), 1);
        assert_eq!(ids.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_ids_are_dense_and_stable(keys in prop::collection::vec((0u32..50, 0u16..4), 0..200)) {
            let mut ids = ObjectIdAllocator::new();
            let mut seen = HashMap::new();
            let mut last = 0;

            for key in &keys {
                let id = ids.get_or_create(key.0, key.1);
                match seen.get(key) {
                    Some(previous) => prop_assert_eq!(*previous, id),
                    None => {
                        prop_assert!(id > last);
                        last = id;
                        seen.insert(*key, id);
                    }
                }
                prop_assert!(id as usize <= seen.len());
            }

            let distinct: HashSet<_> = keys.iter().collect();
            prop_assert_eq!(ids.len(), distinct.len());
        }
    }
}
