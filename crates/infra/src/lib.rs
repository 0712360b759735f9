//! Infrastructure layer: storage behind the `Repository` trait and the
//! `Books` service that ties the domain crates together.

pub mod books;
pub mod repository;

pub use books::{Books, BooksSnapshot};
pub use repository::{InMemoryRepository, Repository, RepositoryError};
