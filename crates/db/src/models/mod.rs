//! Typed views over the documents this service reads and writes.

pub mod history;
pub mod job;
pub mod migration_status;
pub mod style;
pub mod user;

/// Collection names.
pub mod collections {
    pub const JOBS: &str = "aiJobs";
    pub const USERS: &str = "users";
    pub const USER_PHOTOS: &str = "userPhotos";
    pub const HAIRCUTS: &str = "haircuts";
    pub const BEARD_STYLES: &str = "beard_styles";
    pub const STYLES: &str = "styles";
    pub const HISTORY: &str = "history";
    pub const MIGRATIONS: &str = "_migrations";

    /// Singleton document inside [`MIGRATIONS`].
    pub const MIGRATION_STATUS_ID: &str = "migration_status";

    /// Per-user favourites subcollection.
    pub fn favourites(user_id: &str) -> String {
        format!("{USERS}/{user_id}/favourites")
    }
}
