use async_trait::async_trait;
use estate_core::ledger::LedgerOwner;
use estate_core::types::DbId;
use sqlx::PgPool;

/// Load/save access to a table whose rows embed a payment ledger.
///
/// Implemented by [`PropertyRepo`](super::PropertyRepo) and
/// [`RentRepo`](super::RentRepo) so the ledger service can treat both owner
/// kinds the same way.
#[async_trait]
pub trait LedgerStore {
    type Owner: LedgerOwner + Send + Sync;

    async fn find_owner(pool: &PgPool, id: DbId) -> Result<Option<Self::Owner>, sqlx::Error>;

    /// Persist the whole owner row. Returns `None` when the row changed (or
    /// vanished) since it was loaded.
    async fn save_owner(
        pool: &PgPool,
        owner: &Self::Owner,
    ) -> Result<Option<Self::Owner>, sqlx::Error>;
}
