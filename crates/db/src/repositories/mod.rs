//! Zero-sized repositories over the shared document store.
//!
//! Every method takes the store as its first argument; transactional
//! methods need the [`crate::SharedStore`] handle so they can retry.

pub mod history_repo;
pub mod job_repo;
pub mod migration_status_repo;
pub mod photo_repo;
pub mod style_repo;
pub mod user_repo;

pub use history_repo::HistoryRepo;
pub use job_repo::JobRepo;
pub use migration_status_repo::MigrationStatusRepo;
pub use photo_repo::PhotoRepo;
pub use style_repo::StyleRepo;
pub use user_repo::UserRepo;
