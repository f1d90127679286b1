//! Property entity model and DTOs.

use estate_core::ledger::{
    remaining, settlement_status, Ledger, LedgerOwner, CATEGORY_INSTALLMENT,
};
use estate_core::types::{DbId, Money, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A property row from the `properties` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Property {
    pub id: DbId,
    pub plot_number: String,
    pub size: Option<String>,
    pub scheme: String,
    pub total_price: Money,
    pub num_installments: Option<i32>,
    pub num_years: Option<i32>,
    pub monthly_installment: Option<Money>,
    pub agent: Option<String>,
    pub agent_id: Option<DbId>,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_cnic: Option<String>,
    pub buyer_address: Option<String>,
    /// Derived: `Completed` iff `total_paid >= total_price`.
    pub status: String,
    /// Derived: sum of `payments`.
    pub total_paid: Money,
    pub payments: Json<Ledger>,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Property {
    pub fn remaining(&self) -> Money {
        remaining(self.total_price, self.total_paid)
    }
}

impl LedgerOwner for Property {
    const ENTITY: &'static str = "Property";
    const KIND: &'static str = "property";
    const DEFAULT_CATEGORY: &'static str = CATEGORY_INSTALLMENT;

    fn ledger(&self) -> &Ledger {
        &self.payments
    }

    fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.payments
    }

    fn reconcile(&mut self) -> bool {
        let total_paid = self.payments.total_paid();
        let status = settlement_status(total_paid, self.total_price);
        let changed = total_paid != self.total_paid || status != self.status;
        self.total_paid = total_paid;
        self.status = status.to_string();
        changed
    }
}

/// API representation: the row plus its outstanding balance.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyResponse {
    #[serde(flatten)]
    pub property: Property,
    pub remaining: Money,
}

impl From<Property> for PropertyResponse {
    fn from(property: Property) -> Self {
        let remaining = property.remaining();
        Self {
            property,
            remaining,
        }
    }
}

/// DTO for inserting a new property. Derived fields are computed by the
/// caller from `payments` before insert.
#[derive(Debug)]
pub struct CreateProperty {
    pub plot_number: String,
    pub size: Option<String>,
    pub scheme: String,
    pub total_price: Money,
    pub num_installments: Option<i32>,
    pub num_years: Option<i32>,
    pub monthly_installment: Option<Money>,
    pub agent: Option<String>,
    pub agent_id: Option<DbId>,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_cnic: Option<String>,
    pub buyer_address: Option<String>,
    pub status: String,
    pub total_paid: Money,
    pub payments: Ledger,
}

/// DTO for updating descriptive fields. All fields are optional; the ledger
/// and derived fields are not updatable here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProperty {
    pub plot_number: Option<String>,
    pub size: Option<String>,
    pub scheme: Option<String>,
    pub total_price: Option<Money>,
    pub num_installments: Option<i32>,
    pub num_years: Option<i32>,
    pub monthly_installment: Option<Money>,
    pub agent: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_cnic: Option<String>,
    pub buyer_address: Option<String>,
}

impl UpdateProperty {
    /// Apply the supplied fields and reconcile derived fields, since a new
    /// `total_price` can flip the status.
    pub fn apply(self, property: &mut Property) {
        if let Some(v) = self.plot_number {
            property.plot_number = v;
        }
        if let Some(v) = self.size {
            property.size = Some(v);
        }
        if let Some(v) = self.scheme {
            property.scheme = v;
        }
        if let Some(v) = self.total_price {
            property.total_price = v;
        }
        if let Some(v) = self.num_installments {
            property.num_installments = Some(v);
        }
        if let Some(v) = self.num_years {
            property.num_years = Some(v);
        }
        if let Some(v) = self.monthly_installment {
            property.monthly_installment = Some(v);
        }
        if let Some(v) = self.agent {
            property.agent = Some(v);
        }
        if let Some(v) = self.buyer_name {
            property.buyer_name = Some(v);
        }
        if let Some(v) = self.buyer_phone {
            property.buyer_phone = Some(v);
        }
        if let Some(v) = self.buyer_cnic {
            property.buyer_cnic = Some(v);
        }
        if let Some(v) = self.buyer_address {
            property.buyer_address = Some(v);
        }
        property.reconcile();
    }
}
