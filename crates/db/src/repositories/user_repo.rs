//! Repository for user credit balances.

use barbcut_core::points;
use barbcut_core::types::{timestamp_format, Timestamp};
use serde_json::json;

use crate::document::object;
use crate::error::DbError;
use crate::models::collections;
use crate::models::user::{points_of, POINTS_FIELD};
use crate::transaction::{run_transaction, Transaction};
use crate::SharedStore;

pub struct UserRepo;

impl UserRepo {
    /// Current balance; 0 for unknown users.
    pub async fn points(store: &SharedStore, user_id: &str) -> Result<i64, DbError> {
        let snapshot = store.get(collections::USERS, user_id).await?;
        Ok(points_of(snapshot.as_ref()))
    }

    /// Re-read the balance inside `tx` and buffer the debit.
    ///
    /// Fails with a failed-precondition error (and buffers nothing) when the
    /// balance does not cover `cost`. Returns the new balance.
    pub async fn debit_in(
        tx: &mut Transaction,
        user_id: &str,
        cost: i64,
        now: Timestamp,
    ) -> Result<i64, DbError> {
        let snapshot = tx.get(collections::USERS, user_id).await?;
        let remaining = points::debit(points_of(snapshot.as_ref()), cost)?;

        tx.set_merge(
            collections::USERS,
            user_id,
            object(json!({
                POINTS_FIELD: remaining,
                "updatedAt": timestamp_format::format(&now),
            })),
        );
        Ok(remaining)
    }

    /// Add `amount` credits in a transaction. Returns the new balance.
    ///
    /// The user document must already exist.
    pub async fn grant_points(
        store: &SharedStore,
        user_id: &str,
        amount: i64,
        now: Timestamp,
    ) -> Result<i64, DbError> {
        let user_id = user_id.to_string();
        run_transaction(store, move |tx| {
            let user_id = user_id.clone();
            Box::pin(async move {
                let Some(snapshot) = tx.get(collections::USERS, &user_id).await? else {
                    return Err(DbError::NotFound {
                        collection: collections::USERS.to_string(),
                        id: user_id,
                    });
                };
                let balance = points::credit(points_of(Some(&snapshot)), amount)?;
                tx.update(
                    collections::USERS,
                    &user_id,
                    object(json!({
                        POINTS_FIELD: balance,
                        "updatedAt": timestamp_format::format(&now),
                    })),
                );
                Ok(balance)
            })
        })
        .await
    }
}
