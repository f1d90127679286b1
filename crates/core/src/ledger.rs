//! Payment ledger embedded in properties and rental units.
//!
//! A [`Ledger`] is an ordered list of [`LedgerEntry`] inflows. Every inflow,
//! including the advance and down payment captured when a property is sold,
//! is an entry, so the paid total is always the plain sum of entries.
//!
//! Owners implement [`LedgerOwner`]; after any ledger mutation the caller runs
//! [`LedgerOwner::reconcile`] before persisting so derived fields never drift
//! from the entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{Money, Timestamp};

pub const CATEGORY_INSTALLMENT: &str = "Installment";
pub const CATEGORY_ADVANCE: &str = "Advance";
pub const CATEGORY_DOWN_PAYMENT: &str = "Down Payment";
pub const CATEGORY_RENT: &str = "Rent";
pub const CATEGORY_SECURITY: &str = "Security";
pub const CATEGORY_MISC: &str = "Misc";

/// Period label written on the opening advance entry.
pub const ADVANCE_PERIOD_LABEL: &str = "Advance/Token Payment";
/// Period label written on the opening down-payment entry.
pub const DOWN_PAYMENT_PERIOD_LABEL: &str = "Down Payment";

pub const PROPERTY_STATUS_INSTALLMENT: &str = "Installment";
pub const PROPERTY_STATUS_COMPLETED: &str = "Completed";

pub const RENT_STATUS_OCCUPIED: &str = "Occupied";
pub const RENT_STATUS_VACANT: &str = "Vacant";
pub const VALID_RENT_STATUSES: &[&str] = &[RENT_STATUS_OCCUPIED, RENT_STATUS_VACANT];

/// Name recorded when the acting user has no display name.
pub const DEFAULT_RECORDER: &str = "System Admin";

/// One recorded inflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub amount: Money,
    pub date: Timestamp,
    pub category: String,
    pub period_label: Option<String>,
    pub recorded_by: String,
}

/// Input for [`Ledger::record`].
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: Money,
    pub category: String,
    pub period_label: Option<String>,
    pub recorded_by: String,
    /// Explicit payment date; `None` means "now".
    pub date: Option<Timestamp>,
}

/// Partial update for [`Ledger::edit`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PaymentEdit {
    pub amount: Option<Money>,
    pub period_label: Option<String>,
    pub category: Option<String>,
    pub date: Option<Timestamp>,
}

fn ensure_positive(amount: Money) -> Result<(), CoreError> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::Validation(format!(
            "Payment amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger(Vec<LedgerEntry>);

impl Ledger {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Opening entries for a newly sold property. Zero amounts are skipped.
    pub fn opening(
        advance_payment: Money,
        down_payment: Money,
        recorded_by: &str,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        let mut ledger = Self::new();
        if advance_payment > Decimal::ZERO {
            ledger.record(
                NewPayment {
                    amount: advance_payment,
                    category: CATEGORY_ADVANCE.to_string(),
                    period_label: Some(ADVANCE_PERIOD_LABEL.to_string()),
                    recorded_by: recorded_by.to_string(),
                    date: None,
                },
                now,
            )?;
        }
        if down_payment > Decimal::ZERO {
            ledger.record(
                NewPayment {
                    amount: down_payment,
                    category: CATEGORY_DOWN_PAYMENT.to_string(),
                    period_label: Some(DOWN_PAYMENT_PERIOD_LABEL.to_string()),
                    recorded_by: recorded_by.to_string(),
                    date: None,
                },
                now,
            )?;
        }
        Ok(ledger)
    }

    /// Append a payment and return it.
    pub fn record(
        &mut self,
        payment: NewPayment,
        now: Timestamp,
    ) -> Result<&LedgerEntry, CoreError> {
        ensure_positive(payment.amount)?;
        let index = self.0.len();
        self.0.push(LedgerEntry {
            id: Uuid::new_v4(),
            amount: payment.amount,
            date: payment.date.unwrap_or(now),
            category: payment.category,
            period_label: payment.period_label,
            recorded_by: payment.recorded_by,
        });
        Ok(&self.0[index])
    }

    /// Apply a partial edit to one entry.
    ///
    /// Validation runs before anything is written, so a rejected edit leaves
    /// the entry untouched.
    pub fn edit(&mut self, entry_id: Uuid, edit: PaymentEdit) -> Result<&LedgerEntry, CoreError> {
        if let Some(amount) = edit.amount {
            ensure_positive(amount)?;
        }
        let entry = self
            .0
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| CoreError::not_found("Payment", entry_id))?;

        if let Some(amount) = edit.amount {
            entry.amount = amount;
        }
        if let Some(label) = edit.period_label {
            entry.period_label = Some(label);
        }
        if let Some(category) = edit.category {
            entry.category = category;
        }
        if let Some(date) = edit.date {
            entry.date = date;
        }
        Ok(entry)
    }

    /// Remove one entry by id, returning it.
    pub fn remove(&mut self, entry_id: Uuid) -> Result<LedgerEntry, CoreError> {
        let index = self
            .0
            .iter()
            .position(|e| e.id == entry_id)
            .ok_or_else(|| CoreError::not_found("Payment", entry_id))?;
        Ok(self.0.remove(index))
    }

    pub fn get(&self, entry_id: Uuid) -> Option<&LedgerEntry> {
        self.0.iter().find(|e| e.id == entry_id)
    }

    /// Sum of all current entries.
    pub fn total_paid(&self) -> Money {
        self.0.iter().map(|e| e.amount).sum()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outstanding balance, clamped at zero when the owner has overpaid.
pub fn remaining(total_price: Money, total_paid: Money) -> Money {
    (total_price - total_paid).max(Decimal::ZERO)
}

/// Property status derived from the paid total.
pub fn settlement_status(total_paid: Money, total_price: Money) -> &'static str {
    if total_paid >= total_price {
        PROPERTY_STATUS_COMPLETED
    } else {
        PROPERTY_STATUS_INSTALLMENT
    }
}

/// Validate a rental occupancy status.
pub fn validate_rent_status(status: &str) -> Result<(), CoreError> {
    if VALID_RENT_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid rent status '{status}'. Must be one of: {}",
            VALID_RENT_STATUSES.join(", ")
        )))
    }
}

/// A record that embeds a [`Ledger`] and derives fields from it.
pub trait LedgerOwner {
    /// Entity name used in not-found errors (e.g. `"Property"`).
    const ENTITY: &'static str;
    /// Value of `type` in `data-updated` events (e.g. `"property"`).
    const KIND: &'static str;
    /// Category used when a payment is recorded without one.
    const DEFAULT_CATEGORY: &'static str;

    fn ledger(&self) -> &Ledger;

    fn ledger_mut(&mut self) -> &mut Ledger;

    /// Recompute every ledger-derived field. Returns `true` if any changed.
    fn reconcile(&mut self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    struct Plot {
        total_price: Money,
        total_paid: Money,
        status: &'static str,
        payments: Ledger,
    }

    impl Plot {
        fn priced(total_price: Money) -> Self {
            Self {
                total_price,
                total_paid: Decimal::ZERO,
                status: PROPERTY_STATUS_INSTALLMENT,
                payments: Ledger::new(),
            }
        }
    }

    impl LedgerOwner for Plot {
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
            self.status = status;
            changed
        }
    }

    fn payment(amount: Money) -> NewPayment {
        NewPayment {
            amount,
            category: CATEGORY_INSTALLMENT.to_string(),
            period_label: Some("Jan 2025".to_string()),
            recorded_by: "agent".to_string(),
            date: None,
        }
    }

    #[test]
    fn record_defaults_date_to_now() {
        let now = Utc::now();
        let mut ledger = Ledger::new();
        let entry = ledger.record(payment(dec!(100)), now).unwrap();
        assert_eq!(entry.date, now);
        assert_eq!(entry.period_label.as_deref(), Some("Jan 2025"));
    }

    #[test]
    fn record_keeps_explicit_date() {
        let now = Utc::now();
        let paid_on = now - chrono::Duration::days(3);
        let mut ledger = Ledger::new();
        let entry = ledger
            .record(NewPayment { date: Some(paid_on), ..payment(dec!(10)) }, now)
            .unwrap();
        assert_eq!(entry.date, paid_on);
    }

    #[test]
    fn record_rejects_non_positive_amounts() {
        let mut ledger = Ledger::new();
        assert_matches!(
            ledger.record(payment(dec!(0)), Utc::now()),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            ledger.record(payment(dec!(-5)), Utc::now()),
            Err(CoreError::Validation(_))
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn completing_payment_then_deleting_it_reverts_status() {
        let now = Utc::now();
        let mut plot = Plot::priced(dec!(200000));
        plot.ledger_mut().record(payment(dec!(150000)), now).unwrap();
        plot.reconcile();
        assert_eq!(plot.status, PROPERTY_STATUS_INSTALLMENT);

        let id = plot.ledger_mut().record(payment(dec!(50000)), now).unwrap().id;
        plot.reconcile();
        assert_eq!(plot.total_paid, dec!(200000));
        assert_eq!(plot.status, PROPERTY_STATUS_COMPLETED);

        plot.ledger_mut().remove(id).unwrap();
        plot.reconcile();
        assert_eq!(plot.total_paid, dec!(150000));
        assert_eq!(plot.status, PROPERTY_STATUS_INSTALLMENT);
    }

    #[test]
    fn totals_track_entries_through_mixed_mutations() {
        let now = Utc::now();
        let mut plot = Plot::priced(dec!(1000));

        let a = plot.ledger_mut().record(payment(dec!(300)), now).unwrap().id;
        let b = plot.ledger_mut().record(payment(dec!(300)), now).unwrap().id;
        plot.reconcile();
        assert_eq!(plot.total_paid, dec!(600));

        plot.ledger_mut()
            .edit(a, PaymentEdit { amount: Some(dec!(700)), ..Default::default() })
            .unwrap();
        plot.reconcile();
        assert_eq!(plot.total_paid, dec!(1000));
        assert_eq!(plot.status, PROPERTY_STATUS_COMPLETED);

        plot.ledger_mut()
            .edit(a, PaymentEdit { amount: Some(dec!(100)), ..Default::default() })
            .unwrap();
        plot.reconcile();
        assert_eq!(plot.total_paid, dec!(400));
        assert_eq!(plot.status, PROPERTY_STATUS_INSTALLMENT);

        plot.ledger_mut().remove(b).unwrap();
        plot.reconcile();
        assert_eq!(plot.total_paid, plot.ledger().total_paid());
        assert_eq!(plot.total_paid, dec!(100));
    }

    #[test]
    fn edit_is_partial() {
        let now = Utc::now();
        let mut ledger = Ledger::new();
        let id = ledger.record(payment(dec!(50)), now).unwrap().id;

        let entry = ledger
            .edit(id, PaymentEdit { period_label: Some("Feb 2025".into()), ..Default::default() })
            .unwrap();
        assert_eq!(entry.amount, dec!(50));
        assert_eq!(entry.period_label.as_deref(), Some("Feb 2025"));
        assert_eq!(entry.category, CATEGORY_INSTALLMENT);
    }

    #[test]
    fn rejected_edit_leaves_entry_untouched() {
        let mut ledger = Ledger::new();
        let id = ledger.record(payment(dec!(50)), Utc::now()).unwrap().id;

        let result = ledger.edit(
            id,
            PaymentEdit {
                amount: Some(dec!(0)),
                period_label: Some("ignored".into()),
                ..Default::default()
            },
        );
        assert_matches!(result, Err(CoreError::Validation(_)));
        assert_eq!(ledger.get(id).unwrap().period_label.as_deref(), Some("Jan 2025"));
    }

    #[test]
    fn unknown_entry_is_not_found() {
        let mut ledger = Ledger::new();
        let missing = Uuid::new_v4();
        assert_matches!(
            ledger.edit(missing, PaymentEdit::default()),
            Err(CoreError::NotFound { entity: "Payment", .. })
        );
        assert_matches!(ledger.remove(missing), Err(CoreError::NotFound { .. }));
    }

    #[test]
    fn opening_entries_cover_advance_and_down_payment() {
        let ledger = Ledger::opening(dec!(20000), dec!(30000), "agent", Utc::now()).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[0].category, CATEGORY_ADVANCE);
        assert_eq!(ledger.entries()[1].category, CATEGORY_DOWN_PAYMENT);
        assert_eq!(ledger.total_paid(), dec!(50000));

        let none = Ledger::opening(dec!(0), dec!(0), "agent", Utc::now()).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn remaining_never_goes_negative() {
        assert_eq!(remaining(dec!(1000), dec!(400)), dec!(600));
        assert_eq!(remaining(dec!(1000), dec!(1000)), dec!(0));
        assert_eq!(remaining(dec!(1000), dec!(1500)), dec!(0));
    }

    #[test]
    fn settlement_status_completes_at_exact_price() {
        assert_eq!(settlement_status(dec!(999.99), dec!(1000)), PROPERTY_STATUS_INSTALLMENT);
        assert_eq!(settlement_status(dec!(1000), dec!(1000)), PROPERTY_STATUS_COMPLETED);
        assert_eq!(settlement_status(dec!(1200), dec!(1000)), PROPERTY_STATUS_COMPLETED);
    }

    #[test]
    fn rent_status_validation() {
        assert!(validate_rent_status(RENT_STATUS_OCCUPIED).is_ok());
        assert!(validate_rent_status(RENT_STATUS_VACANT).is_ok());
        assert_matches!(validate_rent_status("Sold"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn reconcile_reports_changes() {
        let mut plot = Plot::priced(dec!(100));
        assert!(!plot.reconcile());
        plot.ledger_mut().record(payment(dec!(10)), Utc::now()).unwrap();
        assert!(plot.reconcile());
        assert!(!plot.reconcile());
    }
}
