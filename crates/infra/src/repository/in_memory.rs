use std::collections::HashMap;
use std::sync::RwLock;

use vatdesk_core::Entity;

use super::{Repository, RepositoryError};

#[derive(Debug)]
struct Records<E: Entity> {
    by_id: HashMap<E::Id, E>,
    order: Vec<E::Id>,
}

/// In-memory repository for tests/dev. Last write wins.
#[derive(Debug)]
pub struct InMemoryRepository<E: Entity> {
    inner: RwLock<Records<E>>,
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Records {
                by_id: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|r| r.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Repository<E> for InMemoryRepository<E>
where
    E: Entity + Clone + Send + Sync + 'static,
    E::Id: Send + Sync,
{
    fn get(&self, id: &E::Id) -> Result<Option<E>, RepositoryError> {
        let records = self.inner.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(records.by_id.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<E>, RepositoryError> {
        let records = self.inner.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id).cloned())
            .collect())
    }

    fn insert(&self, entity: E) -> Result<(), RepositoryError> {
        let mut records = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        let id = entity.id().clone();
        if records.by_id.contains_key(&id) {
            return Err(RepositoryError::Duplicate(format!("{id:?}")));
        }
        tracing::debug!(id = ?id, "insert");
        records.order.push(id.clone());
        records.by_id.insert(id, entity);
        Ok(())
    }

    fn update(&self, entity: E) -> Result<(), RepositoryError> {
        let mut records = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        let id = entity.id().clone();
        match records.by_id.get_mut(&id) {
            Some(slot) => {
                tracing::debug!(id = ?id, "update");
                *slot = entity;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("{id:?}"))),
        }
    }

    fn delete(&self, id: &E::Id) -> Result<E, RepositoryError> {
        let mut records = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        let removed = records
            .by_id
            .remove(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("{id:?}")))?;
        records.order.retain(|existing| existing != id);
        tracing::debug!(id = ?id, "delete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Note {
        id: u32,
        text: &'static str,
    }

    impl Entity for Note {
        type Id = u32;

        fn id(&self) -> &Self::Id {
            &self.id
        }
    }

    fn note(id: u32, text: &'static str) -> Note {
        Note { id, text }
    }

    #[test]
    fn insert_get_list_in_insertion_order() {
        let repo = InMemoryRepository::new();
        repo.insert(note(3, "c")).unwrap();
        repo.insert(note(1, "a")).unwrap();
        repo.insert(note(2, "b")).unwrap();

        assert_eq!(repo.get(&1).unwrap(), Some(note(1, "a")));
        assert_eq!(repo.get(&9).unwrap(), None);
        let ids: Vec<u32> = repo.list().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(repo.len(), 3);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let repo = InMemoryRepository::new();
        repo.insert(note(1, "a")).unwrap();
        assert!(matches!(repo.insert(note(1, "again")), Err(RepositoryError::Duplicate(_))));
        assert_eq!(repo.get(&1).unwrap().unwrap().text, "a");
    }

    #[test]
    fn update_and_delete_require_existing_record() {
        let repo = InMemoryRepository::new();
        assert!(matches!(repo.update(note(1, "x")), Err(RepositoryError::NotFound(_))));
        assert!(matches!(repo.delete(&1), Err(RepositoryError::NotFound(_))));

        repo.insert(note(1, "a")).unwrap();
        repo.update(note(1, "b")).unwrap();
        assert_eq!(repo.get(&1).unwrap().unwrap().text, "b");

        assert_eq!(repo.delete(&1).unwrap(), note(1, "b"));
        assert!(repo.is_empty());
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn find_filters_and_arc_delegates() {
        let repo: Arc<InMemoryRepository<Note>> = Arc::new(InMemoryRepository::new());
        repo.insert(note(1, "keep")).unwrap();
        repo.insert(note(2, "drop")).unwrap();
        repo.insert(note(3, "keep")).unwrap();

        let shared: &dyn Repository<Note> = &repo;
        let kept = shared.find(&|n: &Note| n.text == "keep").unwrap();
        assert_eq!(kept.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn repository_errors_map_to_domain_errors() {
        use vatdesk_core::DomainError;

        assert!(matches!(
            DomainError::from(RepositoryError::NotFound("1".into())),
            DomainError::NotFound(_)
        ));
        assert!(matches!(
            DomainError::from(RepositoryError::Duplicate("1".into())),
            DomainError::Conflict(_)
        ));
    }
}
