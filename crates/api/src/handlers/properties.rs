//! Handlers for the `/properties` resource and its payment ledger.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use estate_core::error::CoreError;
use estate_core::ledger::{
    settlement_status, Ledger, LedgerOwner, NewPayment, PaymentEdit,
};
use estate_core::types::{DbId, Money};
use estate_db::models::property::{CreateProperty, Property, PropertyResponse, UpdateProperty};
use estate_db::repositories::PropertyRepo;
use estate_events::DomainEvent;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::ledger::LedgerService;
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::response::MessageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /properties`.
///
/// `advance_payment` and `down_payment` become the opening ledger entries.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePropertyRequest {
    #[validate(length(min = 1, message = "Plot number is required"))]
    pub plot_number: String,
    pub size: Option<String>,
    #[validate(length(min = 1, message = "Scheme is required"))]
    pub scheme: String,
    pub total_price: Money,
    #[serde(default)]
    pub advance_payment: Money,
    #[serde(default)]
    pub down_payment: Money,
    #[validate(range(min = 0, message = "Installment count cannot be negative"))]
    pub num_installments: Option<i32>,
    #[validate(range(min = 0, message = "Year count cannot be negative"))]
    pub num_years: Option<i32>,
    pub monthly_installment: Option<Money>,
    pub agent: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_cnic: Option<String>,
    pub buyer_address: Option<String>,
}

/// Request body for `POST /properties/{id}/pay`.
#[derive(Debug, Deserialize)]
pub struct PropertyPaymentRequest {
    pub amount: Money,
    #[serde(default, alias = "month")]
    pub period_label: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
}

/// Request body for `PUT /properties/{id}/payments/{payment_id}`.
#[derive(Debug, Deserialize)]
pub struct PropertyPaymentEditRequest {
    pub amount: Option<Money>,
    #[serde(default, alias = "month")]
    pub period_label: Option<String>,
}

fn ensure_non_negative(field: &str, value: Money) -> Result<(), CoreError> {
    if value < Decimal::ZERO {
        return Err(CoreError::Validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/properties
///
/// Newest first. Rows whose stored totals or status disagree with their
/// ledger are reconciled and written back before being returned.
pub async fn list_properties(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> AppResult<Json<Vec<PropertyResponse>>> {
    let properties = PropertyRepo::list(&state.pool).await?;
    let mut out = Vec::with_capacity(properties.len());

    for mut property in properties {
        if property.reconcile() {
            match PropertyRepo::save(&state.pool, &property).await? {
                Some(saved) => {
                    tracing::info!(
                        property_id = saved.id,
                        status = %saved.status,
                        "Reconciled property"
                    );
                    property = saved;
                }
                None => {
                    tracing::warn!(
                        property_id = property.id,
                        "Skipped reconcile of concurrently modified property"
                    );
                }
            }
        }
        out.push(PropertyResponse::from(property));
    }

    Ok(Json(out))
}

/// GET /api/properties/{id}
pub async fn get_property(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<PropertyResponse>> {
    let property = PropertyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found(Property::ENTITY, id)))?;
    Ok(Json(PropertyResponse::from(property)))
}

/// POST /api/properties
pub async fn create_property(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<CreatePropertyRequest>,
) -> AppResult<(StatusCode, Json<PropertyResponse>)> {
    input.validate()?;
    ensure_non_negative("Total price", input.total_price)?;
    ensure_non_negative("Advance payment", input.advance_payment)?;
    ensure_non_negative("Down payment", input.down_payment)?;

    // 1. Opening entries are recorded under the selling agent, if named.
    let recorded_by = input
        .agent
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| user.recorder_name());
    let payments = Ledger::opening(
        input.advance_payment,
        input.down_payment,
        &recorded_by,
        Utc::now(),
    )?;

    // 2. Derived fields come from the ledger.
    let total_paid = payments.total_paid();
    let status = settlement_status(total_paid, input.total_price).to_string();

    let create = CreateProperty {
        plot_number: input.plot_number,
        size: input.size,
        scheme: input.scheme,
        total_price: input.total_price,
        num_installments: input.num_installments,
        num_years: input.num_years,
        monthly_installment: input.monthly_installment,
        agent: input.agent,
        agent_id: Some(user.user_id),
        buyer_name: input.buyer_name,
        buyer_phone: input.buyer_phone,
        buyer_cnic: input.buyer_cnic,
        buyer_address: input.buyer_address,
        status,
        total_paid,
        payments,
    };
    let property = PropertyRepo::create(&state.pool, &create).await?;

    tracing::info!(property_id = property.id, user_id = user.user_id, "Property created");
    state
        .event_bus
        .publish(DomainEvent::data_updated(Property::KIND, "add").with_actor(user.user_id));

    Ok((StatusCode::CREATED, Json(PropertyResponse::from(property))))
}

/// PUT /api/properties/{id}
///
/// Descriptive fields only; the ledger changes through the payment routes.
pub async fn update_property(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProperty>,
) -> AppResult<Json<PropertyResponse>> {
    if let Some(price) = input.total_price {
        ensure_non_negative("Total price", price)?;
    }

    let mut property = PropertyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found(Property::ENTITY, id)))?;
    input.apply(&mut property);

    let saved = PropertyRepo::save(&state.pool, &property)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Property was modified concurrently. Please retry.".into(),
            ))
        })?;

    tracing::info!(property_id = id, admin_id = admin.user_id, "Property updated");
    state
        .event_bus
        .publish(DomainEvent::data_updated(Property::KIND, "update").with_actor(admin.user_id));

    Ok(Json(PropertyResponse::from(saved)))
}

/// DELETE /api/properties/{id}
pub async fn delete_property(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    if !PropertyRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::not_found(Property::ENTITY, id)));
    }

    tracing::info!(property_id = id, admin_id = admin.user_id, "Property deleted");
    state
        .event_bus
        .publish(DomainEvent::data_updated(Property::KIND, "delete").with_actor(admin.user_id));

    Ok(Json(MessageResponse::new("Property deleted successfully")))
}

/// POST /api/properties/{id}/pay
///
/// Payments on properties are always dated now.
pub async fn record_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
    Json(input): Json<PropertyPaymentRequest>,
) -> AppResult<Json<PropertyResponse>> {
    let payment = NewPayment {
        amount: input.amount,
        category: input
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| Property::DEFAULT_CATEGORY.to_string()),
        period_label: input.period_label,
        recorded_by: user.recorder_name(),
        date: None,
    };
    let property = LedgerService::<PropertyRepo>::from_state(&state)
        .record_payment(id, payment, user.user_id)
        .await?;
    Ok(Json(PropertyResponse::from(property)))
}

/// PUT /api/properties/{id}/payments/{payment_id}
pub async fn edit_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((id, payment_id)): Path<(DbId, Uuid)>,
    Json(input): Json<PropertyPaymentEditRequest>,
) -> AppResult<Json<PropertyResponse>> {
    let edit = PaymentEdit {
        amount: input.amount,
        period_label: input.period_label,
        ..Default::default()
    };
    let property = LedgerService::<PropertyRepo>::from_state(&state)
        .edit_payment(id, payment_id, edit, admin.user_id)
        .await?;
    Ok(Json(PropertyResponse::from(property)))
}

/// DELETE /api/properties/{id}/payments/{payment_id}
pub async fn delete_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((id, payment_id)): Path<(DbId, Uuid)>,
) -> AppResult<Json<PropertyResponse>> {
    let property = LedgerService::<PropertyRepo>::from_state(&state)
        .delete_payment(id, payment_id, admin.user_id)
        .await?;
    Ok(Json(PropertyResponse::from(property)))
}
