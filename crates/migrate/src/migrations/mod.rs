//! The built-in migrations, in application order.

mod m001_init_styles_from_data;
mod m002_secure_storage_paths;
mod m003_normalize_user_data;

pub use m001_init_styles_from_data::InitStylesFromData;
pub use m002_secure_storage_paths::SecureStoragePaths;
pub use m003_normalize_user_data::NormalizeUserData;

use crate::Migration;

pub fn all() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(InitStylesFromData),
        Box::new(SecureStoragePaths),
        Box::new(NormalizeUserData),
    ]
}
