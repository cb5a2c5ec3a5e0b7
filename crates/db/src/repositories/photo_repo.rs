//! Repository for users' reference photos (`userPhotos/{uid}`).

use barbcut_core::position::ReferenceImages;

use crate::error::DbError;
use crate::models::collections;
use crate::SharedStore;

pub struct PhotoRepo;

impl PhotoRepo {
    /// The user's four reference slots; all empty when nothing was uploaded.
    pub async fn reference_images(
        store: &SharedStore,
        user_id: &str,
    ) -> Result<ReferenceImages, DbError> {
        match store.get(collections::USER_PHOTOS, user_id).await? {
            Some(snapshot) => Ok(snapshot.decode::<ReferenceImages>()?.normalized()),
            None => Ok(ReferenceImages::default()),
        }
    }
}
