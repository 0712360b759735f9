//! Repository abstraction over entity storage.
//!
//! The in-memory implementation backs tests and the CLI; a remote backend
//! would implement the same trait.

pub mod in_memory;

pub use in_memory::InMemoryRepository;

use std::sync::Arc;

use thiserror::Error;

use vatdesk_core::{DomainError, Entity};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("repository lock poisoned")]
    Poisoned,
}

impl From<RepositoryError> for DomainError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => DomainError::not_found(format!("record {id}")),
            RepositoryError::Duplicate(id) => DomainError::conflict(format!("duplicate id {id}")),
            RepositoryError::Poisoned => DomainError::invariant("repository lock poisoned"),
        }
    }
}

/// CRUD storage for one entity type, keyed by `Entity::Id`.
pub trait Repository<E: Entity>: Send + Sync {
    fn get(&self, id: &E::Id) -> Result<Option<E>, RepositoryError>;

    /// All records, in insertion order.
    fn list(&self) -> Result<Vec<E>, RepositoryError>;

    /// Fails with `Duplicate` when the id is taken.
    fn insert(&self, entity: E) -> Result<(), RepositoryError>;

    /// Replace an existing record. Fails with `NotFound` when absent.
    fn update(&self, entity: E) -> Result<(), RepositoryError>;

    /// Remove and return a record. Fails with `NotFound` when absent.
    fn delete(&self, id: &E::Id) -> Result<E, RepositoryError>;

    fn find(&self, predicate: &dyn Fn(&E) -> bool) -> Result<Vec<E>, RepositoryError> {
        Ok(self.list()?.into_iter().filter(|e| predicate(e)).collect())
    }
}

impl<E, R> Repository<E> for Arc<R>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    fn get(&self, id: &E::Id) -> Result<Option<E>, RepositoryError> {
        (**self).get(id)
    }

    fn list(&self) -> Result<Vec<E>, RepositoryError> {
        (**self).list()
    }

    fn insert(&self, entity: E) -> Result<(), RepositoryError> {
        (**self).insert(entity)
    }

    fn update(&self, entity: E) -> Result<(), RepositoryError> {
        (**self).update(entity)
    }

    fn delete(&self, id: &E::Id) -> Result<E, RepositoryError> {
        (**self).delete(id)
    }

    fn find(&self, predicate: &dyn Fn(&E) -> bool) -> Result<Vec<E>, RepositoryError> {
        (**self).find(predicate)
    }
}
