//! Rental unit entity model and DTOs.

use estate_core::ledger::{Ledger, LedgerOwner, CATEGORY_RENT};
use estate_core::types::{DbId, Money, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A rental unit row from the `rents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Rent {
    pub id: DbId,
    pub house_number: String,
    pub address: Option<String>,
    pub unit_type: Option<String>,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub tenant_name: Option<String>,
    pub tenant_father_name: Option<String>,
    pub tenant_phone: Option<String>,
    pub tenant_cnic: Option<String>,
    pub tenant_address: Option<String>,
    pub tenant_permanent_address: Option<String>,
    pub tenant_occupation: Option<String>,
    pub tenant_work_address: Option<String>,
    pub tenant_reference_name: Option<String>,
    pub tenant_reference_phone: Option<String>,
    pub monthly_rent: Money,
    pub security_deposit: Option<Money>,
    /// Occupancy: `Occupied` or `Vacant`.
    pub status: String,
    pub rent_due_date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Derived: sum of `payments`.
    pub total_paid: Money,
    pub payments: Json<Ledger>,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LedgerOwner for Rent {
    const ENTITY: &'static str = "Rent";
    const KIND: &'static str = "rent";
    const DEFAULT_CATEGORY: &'static str = CATEGORY_RENT;

    fn ledger(&self) -> &Ledger {
        &self.payments
    }

    fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.payments
    }

    fn reconcile(&mut self) -> bool {
        let total_paid = self.payments.total_paid();
        let changed = total_paid != self.total_paid;
        self.total_paid = total_paid;
        changed
    }
}

/// Tenant and unit details shared by the create and update DTOs.
#[derive(Debug, Default, Deserialize)]
pub struct RentDetails {
    pub address: Option<String>,
    pub unit_type: Option<String>,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub tenant_name: Option<String>,
    pub tenant_father_name: Option<String>,
    pub tenant_phone: Option<String>,
    pub tenant_cnic: Option<String>,
    pub tenant_address: Option<String>,
    pub tenant_permanent_address: Option<String>,
    pub tenant_occupation: Option<String>,
    pub tenant_work_address: Option<String>,
    pub tenant_reference_name: Option<String>,
    pub tenant_reference_phone: Option<String>,
    pub security_deposit: Option<Money>,
    pub rent_due_date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// DTO for inserting a new rental unit.
#[derive(Debug)]
pub struct CreateRent {
    pub house_number: String,
    pub monthly_rent: Money,
    pub status: String,
    pub details: RentDetails,
}

/// DTO for updating a rental unit. All fields are optional; the ledger is
/// not updatable here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRent {
    pub house_number: Option<String>,
    pub monthly_rent: Option<Money>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub details: RentDetails,
}

/// Overwrite `target` when `value` is supplied.
fn set_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl UpdateRent {
    /// Apply the supplied fields to `rent`. `status` must already be validated.
    pub fn apply(self, rent: &mut Rent) {
        if let Some(v) = self.house_number {
            rent.house_number = v;
        }
        if let Some(v) = self.monthly_rent {
            rent.monthly_rent = v;
        }
        if let Some(v) = self.status {
            rent.status = v;
        }
        let d = self.details;
        set_opt(&mut rent.address, d.address);
        set_opt(&mut rent.unit_type, d.unit_type);
        set_opt(&mut rent.owner_name, d.owner_name);
        set_opt(&mut rent.owner_phone, d.owner_phone);
        set_opt(&mut rent.tenant_name, d.tenant_name);
        set_opt(&mut rent.tenant_father_name, d.tenant_father_name);
        set_opt(&mut rent.tenant_phone, d.tenant_phone);
        set_opt(&mut rent.tenant_cnic, d.tenant_cnic);
        set_opt(&mut rent.tenant_address, d.tenant_address);
        set_opt(&mut rent.tenant_permanent_address, d.tenant_permanent_address);
        set_opt(&mut rent.tenant_occupation, d.tenant_occupation);
        set_opt(&mut rent.tenant_work_address, d.tenant_work_address);
        set_opt(&mut rent.tenant_reference_name, d.tenant_reference_name);
        set_opt(&mut rent.tenant_reference_phone, d.tenant_reference_phone);
        set_opt(&mut rent.security_deposit, d.security_deposit);
        set_opt(&mut rent.rent_due_date, d.rent_due_date);
        set_opt(&mut rent.start_date, d.start_date);
        set_opt(&mut rent.end_date, d.end_date);
        rent.reconcile();
    }
}
