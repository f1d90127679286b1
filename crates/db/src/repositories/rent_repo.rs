//! Repository for the `rents` table.

use async_trait::async_trait;
use estate_core::ledger::Ledger;
use estate_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use super::LedgerStore;
use crate::models::rent::{CreateRent, Rent};

const COLUMNS: &str = "id, house_number, address, unit_type, owner_name, owner_phone, \
                        tenant_name, tenant_father_name, tenant_phone, tenant_cnic, \
                        tenant_address, tenant_permanent_address, tenant_occupation, \
                        tenant_work_address, tenant_reference_name, tenant_reference_phone, \
                        monthly_rent, security_deposit, status, rent_due_date, start_date, \
                        end_date, total_paid, payments, version, created_at, updated_at";

/// Provides CRUD operations for rental units.
pub struct RentRepo;

impl RentRepo {
    /// Insert a new rental unit with an empty ledger, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateRent) -> Result<Rent, sqlx::Error> {
        let d = &input.details;
        let query = format!(
            "INSERT INTO rents (house_number, monthly_rent, status, address, unit_type,
                owner_name, owner_phone, tenant_name, tenant_father_name, tenant_phone,
                tenant_cnic, tenant_address, tenant_permanent_address, tenant_occupation,
                tenant_work_address, tenant_reference_name, tenant_reference_phone,
                security_deposit, rent_due_date, start_date, end_date, payments)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Rent>(&query)
            .bind(&input.house_number)
            .bind(input.monthly_rent)
            .bind(&input.status)
            .bind(&d.address)
            .bind(&d.unit_type)
            .bind(&d.owner_name)
            .bind(&d.owner_phone)
            .bind(&d.tenant_name)
            .bind(&d.tenant_father_name)
            .bind(&d.tenant_phone)
            .bind(&d.tenant_cnic)
            .bind(&d.tenant_address)
            .bind(&d.tenant_permanent_address)
            .bind(&d.tenant_occupation)
            .bind(&d.tenant_work_address)
            .bind(&d.tenant_reference_name)
            .bind(&d.tenant_reference_phone)
            .bind(d.security_deposit)
            .bind(&d.rent_due_date)
            .bind(&d.start_date)
            .bind(&d.end_date)
            .bind(Json(Ledger::new()))
            .fetch_one(pool)
            .await
    }

    /// Find a rental unit by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Rent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rents WHERE id = $1");
        sqlx::query_as::<_, Rent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all rental units, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Rent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rents ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Rent>(&query).fetch_all(pool).await
    }

    /// Write every mutable column of `rent` in one statement, guarded by
    /// `rent.version`. Returns `None` on a version mismatch.
    pub async fn save(pool: &PgPool, rent: &Rent) -> Result<Option<Rent>, sqlx::Error> {
        let query = format!(
            "UPDATE rents SET
                house_number = $3,
                address = $4,
                unit_type = $5,
                owner_name = $6,
                owner_phone = $7,
                tenant_name = $8,
                tenant_father_name = $9,
                tenant_phone = $10,
                tenant_cnic = $11,
                tenant_address = $12,
                tenant_permanent_address = $13,
                tenant_occupation = $14,
                tenant_work_address = $15,
                tenant_reference_name = $16,
                tenant_reference_phone = $17,
                monthly_rent = $18,
                security_deposit = $19,
                status = $20,
                rent_due_date = $21,
                start_date = $22,
                end_date = $23,
                total_paid = $24,
                payments = $25,
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Rent>(&query)
            .bind(rent.id)
            .bind(rent.version)
            .bind(&rent.house_number)
            .bind(&rent.address)
            .bind(&rent.unit_type)
            .bind(&rent.owner_name)
            .bind(&rent.owner_phone)
            .bind(&rent.tenant_name)
            .bind(&rent.tenant_father_name)
            .bind(&rent.tenant_phone)
            .bind(&rent.tenant_cnic)
            .bind(&rent.tenant_address)
            .bind(&rent.tenant_permanent_address)
            .bind(&rent.tenant_occupation)
            .bind(&rent.tenant_work_address)
            .bind(&rent.tenant_reference_name)
            .bind(&rent.tenant_reference_phone)
            .bind(rent.monthly_rent)
            .bind(rent.security_deposit)
            .bind(&rent.status)
            .bind(&rent.rent_due_date)
            .bind(&rent.start_date)
            .bind(&rent.end_date)
            .bind(rent.total_paid)
            .bind(&rent.payments)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a rental unit. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LedgerStore for RentRepo {
    type Owner = Rent;

    async fn find_owner(pool: &PgPool, id: DbId) -> Result<Option<Rent>, sqlx::Error> {
        Self::find_by_id(pool, id).await
    }

    async fn save_owner(pool: &PgPool, owner: &Rent) -> Result<Option<Rent>, sqlx::Error> {
        Self::save(pool, owner).await
    }
}
