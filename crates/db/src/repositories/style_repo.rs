//! Repository for haircut and beard style records.

use crate::error::DbError;
use crate::models::collections;
use crate::models::style::StyleRecord;
use crate::SharedStore;

pub struct StyleRepo;

impl StyleRepo {
    pub async fn find_haircut(store: &SharedStore, id: &str) -> Result<Option<StyleRecord>, DbError> {
        Self::find(store, collections::HAIRCUTS, id).await
    }

    pub async fn find_beard(store: &SharedStore, id: &str) -> Result<Option<StyleRecord>, DbError> {
        Self::find(store, collections::BEARD_STYLES, id).await
    }

    async fn find(
        store: &SharedStore,
        collection: &str,
        id: &str,
    ) -> Result<Option<StyleRecord>, DbError> {
        store
            .get(collection, id)
            .await?
            .map(|s| s.decode::<StyleRecord>())
            .transpose()
    }
}
