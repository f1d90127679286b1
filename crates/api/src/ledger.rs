//! Ledger service: payment mutations against properties and rental units.
//!
//! Each operation loads the owner row, applies one `estate_core::ledger`
//! change, recomputes derived fields with [`LedgerOwner::reconcile`], writes
//! the whole row back once, and publishes `data-updated`. A failed step
//! leaves the stored row untouched.

use chrono::Utc;
use estate_core::error::CoreError;
use estate_core::ledger::{LedgerOwner, NewPayment, PaymentEdit};
use estate_core::types::DbId;
use estate_db::repositories::LedgerStore;
use estate_db::DbPool;
use estate_events::{DomainEvent, EventBus};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const ACTION_PAYMENT: &str = "payment";
pub const ACTION_PAYMENT_EDIT: &str = "payment-edit";
pub const ACTION_PAYMENT_DELETE: &str = "payment-delete";

/// Payment operations for one owner kind `S`.
pub struct LedgerService<'a, S> {
    pool: &'a DbPool,
    events: &'a EventBus,
    _store: std::marker::PhantomData<S>,
}

impl<'a, S: LedgerStore> LedgerService<'a, S> {
    pub fn new(pool: &'a DbPool, events: &'a EventBus) -> Self {
        Self {
            pool,
            events,
            _store: std::marker::PhantomData,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.pool, &state.event_bus)
    }

    /// Append a payment. `payment.date` defaults to now when absent.
    pub async fn record_payment(
        &self,
        owner_id: DbId,
        payment: NewPayment,
        actor: DbId,
    ) -> AppResult<S::Owner> {
        let mut owner = self.load(owner_id).await?;
        let entry_id = owner.ledger_mut().record(payment, Utc::now())?.id;
        self.commit(owner_id, &mut owner, ACTION_PAYMENT, actor, entry_id)
            .await
    }

    /// Partially update one entry.
    pub async fn edit_payment(
        &self,
        owner_id: DbId,
        entry_id: Uuid,
        edit: PaymentEdit,
        actor: DbId,
    ) -> AppResult<S::Owner> {
        let mut owner = self.load(owner_id).await?;
        owner.ledger_mut().edit(entry_id, edit)?;
        self.commit(owner_id, &mut owner, ACTION_PAYMENT_EDIT, actor, entry_id)
            .await
    }

    /// Remove one entry.
    pub async fn delete_payment(
        &self,
        owner_id: DbId,
        entry_id: Uuid,
        actor: DbId,
    ) -> AppResult<S::Owner> {
        let mut owner = self.load(owner_id).await?;
        owner.ledger_mut().remove(entry_id)?;
        self.commit(owner_id, &mut owner, ACTION_PAYMENT_DELETE, actor, entry_id)
            .await
    }

    async fn load(&self, owner_id: DbId) -> AppResult<S::Owner> {
        S::find_owner(self.pool, owner_id)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::not_found(S::Owner::ENTITY, owner_id)))
    }

    async fn commit(
        &self,
        owner_id: DbId,
        owner: &mut S::Owner,
        action: &str,
        actor: DbId,
        entry_id: Uuid,
    ) -> AppResult<S::Owner> {
        owner.reconcile();
        let saved = S::save_owner(self.pool, owner).await?.ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "{} was modified concurrently. Please retry.",
                S::Owner::ENTITY
            )))
        })?;

        tracing::info!(
            kind = S::Owner::KIND,
            owner_id,
            entry_id = %entry_id,
            action,
            actor,
            total_paid = %saved.ledger().total_paid(),
            "Ledger updated"
        );
        self.events
            .publish(DomainEvent::data_updated(S::Owner::KIND, action).with_actor(actor));
        Ok(saved)
    }
}
