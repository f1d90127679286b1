//! Handlers for the `/rents` resource and its payment ledger.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use estate_core::error::CoreError;
use estate_core::ledger::{
    validate_rent_status, LedgerOwner, NewPayment, PaymentEdit, RENT_STATUS_VACANT,
};
use estate_core::types::{DbId, Money, Timestamp};
use estate_db::models::rent::{CreateRent, Rent, RentDetails, UpdateRent};
use estate_db::repositories::RentRepo;
use estate_events::DomainEvent;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::LedgerService;
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::response::MessageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /rents`. The ledger starts empty.
#[derive(Debug, Deserialize)]
pub struct CreateRentRequest {
    pub house_number: String,
    pub monthly_rent: Money,
    /// Defaults to `Vacant`.
    pub status: Option<String>,
    #[serde(flatten)]
    pub details: RentDetails,
}

/// Request body for `POST /rents/{id}/pay`.
#[derive(Debug, Deserialize)]
pub struct RentPaymentRequest {
    pub amount: Money,
    #[serde(default, alias = "month")]
    pub period_label: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    /// Backdated payments are allowed for rent.
    pub date: Option<Timestamp>,
}

/// Request body for `PUT /rents/{id}/payments/{payment_id}`.
#[derive(Debug, Deserialize)]
pub struct RentPaymentEditRequest {
    pub amount: Option<Money>,
    #[serde(default, alias = "month")]
    pub period_label: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    pub date: Option<Timestamp>,
}

fn validate_monthly_rent(value: Money) -> Result<(), CoreError> {
    if value < Decimal::ZERO {
        return Err(CoreError::Validation(
            "Monthly rent cannot be negative".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/rents
pub async fn list_rents(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> AppResult<Json<Vec<Rent>>> {
    let rents = RentRepo::list(&state.pool).await?;
    Ok(Json(rents))
}

/// GET /api/rents/{id}
pub async fn get_rent(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<Rent>> {
    let rent = RentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found(Rent::ENTITY, id)))?;
    Ok(Json(rent))
}

/// POST /api/rents
pub async fn create_rent(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<CreateRentRequest>,
) -> AppResult<(StatusCode, Json<Rent>)> {
    let house_number = input.house_number.trim().to_string();
    if house_number.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "House number is required".into(),
        )));
    }
    validate_monthly_rent(input.monthly_rent)?;
    let status = input
        .status
        .unwrap_or_else(|| RENT_STATUS_VACANT.to_string());
    validate_rent_status(&status)?;

    let create = CreateRent {
        house_number,
        monthly_rent: input.monthly_rent,
        status,
        details: input.details,
    };
    let rent = RentRepo::create(&state.pool, &create).await?;

    tracing::info!(rent_id = rent.id, user_id = user.user_id, "Rent record created");
    state
        .event_bus
        .publish(DomainEvent::data_updated(Rent::KIND, "add").with_actor(user.user_id));

    Ok((StatusCode::CREATED, Json(rent)))
}

/// PUT /api/rents/{id}
///
/// Unit and tenant details plus occupancy status; the ledger changes through
/// the payment routes.
pub async fn update_rent(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRent>,
) -> AppResult<Json<Rent>> {
    if let Some(status) = input.status.as_deref() {
        validate_rent_status(status)?;
    }
    if let Some(monthly_rent) = input.monthly_rent {
        validate_monthly_rent(monthly_rent)?;
    }

    let mut rent = RentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found(Rent::ENTITY, id)))?;
    input.apply(&mut rent);

    let saved = RentRepo::save(&state.pool, &rent).await?.ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "Rent was modified concurrently. Please retry.".into(),
        ))
    })?;

    tracing::info!(rent_id = id, admin_id = admin.user_id, "Rent record updated");
    state
        .event_bus
        .publish(DomainEvent::data_updated(Rent::KIND, "update").with_actor(admin.user_id));

    Ok(Json(saved))
}

/// DELETE /api/rents/{id}
pub async fn delete_rent(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    if !RentRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::not_found(Rent::ENTITY, id)));
    }

    tracing::info!(rent_id = id, admin_id = admin.user_id, "Rent record deleted");
    state
        .event_bus
        .publish(DomainEvent::data_updated(Rent::KIND, "delete").with_actor(admin.user_id));

    Ok(Json(MessageResponse::new("Rent record deleted successfully")))
}

/// POST /api/rents/{id}/pay
pub async fn record_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
    Json(input): Json<RentPaymentRequest>,
) -> AppResult<Json<Rent>> {
    let payment = NewPayment {
        amount: input.amount,
        category: input
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| Rent::DEFAULT_CATEGORY.to_string()),
        period_label: input.period_label,
        recorded_by: user.recorder_name(),
        date: input.date,
    };
    let rent = LedgerService::<RentRepo>::from_state(&state)
        .record_payment(id, payment, user.user_id)
        .await?;
    Ok(Json(rent))
}

/// PUT /api/rents/{id}/payments/{payment_id}
pub async fn edit_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((id, payment_id)): Path<(DbId, Uuid)>,
    Json(input): Json<RentPaymentEditRequest>,
) -> AppResult<Json<Rent>> {
    let edit = PaymentEdit {
        amount: input.amount,
        period_label: input.period_label,
        category: input.category.filter(|c| !c.trim().is_empty()),
        date: input.date,
    };
    let rent = LedgerService::<RentRepo>::from_state(&state)
        .edit_payment(id, payment_id, edit, admin.user_id)
        .await?;
    Ok(Json(rent))
}

/// DELETE /api/rents/{id}/payments/{payment_id}
pub async fn delete_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((id, payment_id)): Path<(DbId, Uuid)>,
) -> AppResult<Json<Rent>> {
    let rent = LedgerService::<RentRepo>::from_state(&state)
        .delete_payment(id, payment_id, admin.user_id)
        .await?;
    Ok(Json(rent))
}
