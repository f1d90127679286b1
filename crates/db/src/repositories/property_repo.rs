//! Repository for the `properties` table.

use async_trait::async_trait;
use estate_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use super::LedgerStore;
use crate::models::property::{CreateProperty, Property};

const COLUMNS: &str = "id, plot_number, size, scheme, total_price, num_installments, \
                        num_years, monthly_installment, agent, agent_id, buyer_name, \
                        buyer_phone, buyer_cnic, buyer_address, status, total_paid, payments, \
                        version, created_at, updated_at";

/// Provides CRUD operations for properties.
pub struct PropertyRepo;

impl PropertyRepo {
    /// Insert a new property, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateProperty) -> Result<Property, sqlx::Error> {
        let query = format!(
            "INSERT INTO properties (plot_number, size, scheme, total_price, num_installments,
                num_years, monthly_installment, agent, agent_id, buyer_name, buyer_phone,
                buyer_cnic, buyer_address, status, total_paid, payments)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Property>(&query)
            .bind(&input.plot_number)
            .bind(&input.size)
            .bind(&input.scheme)
            .bind(input.total_price)
            .bind(input.num_installments)
            .bind(input.num_years)
            .bind(input.monthly_installment)
            .bind(&input.agent)
            .bind(input.agent_id)
            .bind(&input.buyer_name)
            .bind(&input.buyer_phone)
            .bind(&input.buyer_cnic)
            .bind(&input.buyer_address)
            .bind(&input.status)
            .bind(input.total_paid)
            .bind(Json(&input.payments))
            .fetch_one(pool)
            .await
    }

    /// Find a property by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Property>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM properties WHERE id = $1");
        sqlx::query_as::<_, Property>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all properties, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Property>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM properties ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Property>(&query).fetch_all(pool).await
    }

    /// Write every mutable column of `property` in one statement.
    ///
    /// Succeeds only if the stored row still has `property.version`;
    /// otherwise returns `None` and nothing is written.
    pub async fn save(pool: &PgPool, property: &Property) -> Result<Option<Property>, sqlx::Error> {
        let query = format!(
            "UPDATE properties SET
                plot_number = $3,
                size = $4,
                scheme = $5,
                total_price = $6,
                num_installments = $7,
                num_years = $8,
                monthly_installment = $9,
                agent = $10,
                buyer_name = $11,
                buyer_phone = $12,
                buyer_cnic = $13,
                buyer_address = $14,
                status = $15,
                total_paid = $16,
                payments = $17,
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Property>(&query)
            .bind(property.id)
            .bind(property.version)
            .bind(&property.plot_number)
            .bind(&property.size)
            .bind(&property.scheme)
            .bind(property.total_price)
            .bind(property.num_installments)
            .bind(property.num_years)
            .bind(property.monthly_installment)
            .bind(&property.agent)
            .bind(&property.buyer_name)
            .bind(&property.buyer_phone)
            .bind(&property.buyer_cnic)
            .bind(&property.buyer_address)
            .bind(&property.status)
            .bind(property.total_paid)
            .bind(&property.payments)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a property. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LedgerStore for PropertyRepo {
    type Owner = Property;

    async fn find_owner(pool: &PgPool, id: DbId) -> Result<Option<Property>, sqlx::Error> {
        Self::find_by_id(pool, id).await
    }

    async fn save_owner(pool: &PgPool, owner: &Property) -> Result<Option<Property>, sqlx::Error> {
        Self::save(pool, owner).await
    }
}
