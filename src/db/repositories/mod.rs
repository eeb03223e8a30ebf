//! Repository layer
//!
//! Unit structs with the database operations for each domain, all going
//! through the shared [`Store`](crate::db::Store) handle.

pub mod contest_repo;
pub mod history_repo;
pub mod task_repo;
pub mod whitelist_repo;

pub use contest_repo::ContestRepository;
pub use history_repo::HistoryRepository;
pub use task_repo::TaskRepository;
pub use whitelist_repo::WhitelistRepository;
