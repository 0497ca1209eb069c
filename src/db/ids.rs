use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::types::{ExternalId, VertexId};

#[derive(Default)]
struct IdMaps {
    forward: FxHashMap<ExternalId, VertexId>,
    reverse: Vec<ExternalId>,
}

impl IdMaps {
    fn get_or_assign(&mut self, external: ExternalId) -> VertexId {
        if let Some(&id) = self.forward.get(&external) {
            return id;
        }
        let id = VertexId(self.reverse.len() as u64);
        self.reverse.push(external);
        self.forward.insert(external, id);
        id
    }
}

/// Bijection between caller-supplied ids and dense internal ids.
///
/// Internal ids are handed out from zero in order of first appearance and
/// never reassigned. Every resolution goes through one mutex; that is fine
/// for vertex-creation rates but is the one lock every operation shares.
#[derive(Default)]
pub struct VertexIdManager {
    maps: Mutex<IdMaps>,
}

impl VertexIdManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the internal id for `external`, assigning one on first use.
    pub fn internal_id(&self, external: ExternalId) -> VertexId {
        self.maps.lock().get_or_assign(external)
    }

    /// Resolves two ids under a single lock acquisition.
    pub fn internal_pair(&self, a: ExternalId, b: ExternalId) -> (VertexId, VertexId) {
        let mut maps = self.maps.lock();
        let a = maps.get_or_assign(a);
        let b = maps.get_or_assign(b);
        (a, b)
    }

    /// Returns the internal id for `external` without assigning one.
    pub fn lookup(&self, external: ExternalId) -> Option<VertexId> {
        self.maps.lock().forward.get(&external).copied()
    }

    /// Non-assigning variant of [`Self::internal_pair`].
    pub fn lookup_pair(
        &self,
        a: ExternalId,
        b: ExternalId,
    ) -> (Option<VertexId>, Option<VertexId>) {
        let maps = self.maps.lock();
        (maps.forward.get(&a).copied(), maps.forward.get(&b).copied())
    }

    /// Returns the external id for `id`, if it was ever assigned.
    pub fn external_id(&self, id: VertexId) -> Option<ExternalId> {
        self.maps.lock().reverse.get(id.as_index()).copied()
    }

    /// Translates internal ids produced by this manager back to external ids.
    ///
    /// # Panics
    ///
    /// Panics if an id was never assigned; internal ids only originate here.
    pub fn external_ids(&self, ids: &[VertexId]) -> Vec<ExternalId> {
        let maps = self.maps.lock();
        ids.iter()
            .map(|id| {
                *maps
                    .reverse
                    .get(id.as_index())
                    .unwrap_or_else(|| panic!("internal vertex id {id} was never assigned"))
            })
            .collect()
    }

    /// Number of ids assigned so far.
    pub fn len(&self) -> usize {
        self.maps.lock().reverse.len()
    }

    /// Returns `true` if no id has been assigned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_stable() {
        let ids = VertexIdManager::new();
        assert_eq!(ids.internal_id(900), VertexId(0));
        assert_eq!(ids.internal_id(-4), VertexId(1));
        assert_eq!(ids.internal_id(900), VertexId(0));
        assert_eq!(ids.internal_pair(7, -4), (VertexId(2), VertexId(1)));
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn round_trip_through_both_directions() {
        let ids = VertexIdManager::new();
        for external in [i64::MIN, -1, 0, 42, i64::MAX] {
            let internal = ids.internal_id(external);
            assert_eq!(ids.external_id(internal), Some(external));
        }
        assert_eq!(
            ids.external_ids(&[VertexId(4), VertexId(0)]),
            vec![i64::MAX, i64::MIN]
        );
    }

    #[test]
    fn lookup_does_not_assign() {
        let ids = VertexIdManager::new();
        assert_eq!(ids.lookup(5), None);
        assert_eq!(ids.lookup_pair(5, 6), (None, None));
        assert!(ids.is_empty());
        ids.internal_id(6);
        assert_eq!(ids.lookup_pair(5, 6), (None, Some(VertexId(0))));
        assert_eq!(ids.external_id(VertexId(3)), None);
    }

    #[test]
    #[should_panic(expected = "never assigned")]
    fn translating_unknown_internal_id_panics() {
        VertexIdManager::new().external_ids(&[VertexId(0)]);
    }
}
