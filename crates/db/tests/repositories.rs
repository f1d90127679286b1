//! Repository-layer tests against a real database.
//!
//! Focus on the version-checked whole-row writes: a stale version writes
//! nothing, and derived columns follow the embedded collections.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use estate_core::ledger::{Ledger, LedgerOwner, NewPayment};
use estate_core::session::{ActiveSessions, Session};
use estate_db::models::property::{CreateProperty, Property};
use estate_db::models::rent::{CreateRent, RentDetails};
use estate_db::models::user::{CreateUser, UpdateUser};
use estate_db::repositories::{LedgerStore, PropertyRepo, RentRepo, UserRepo};
use rust_decimal_macros::dec;
use sqlx::PgPool;

fn new_user(email: &str, cnic: &str, role: &str) -> CreateUser {
    CreateUser {
        name: "Test".to_string(),
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        cnic: cnic.to_string(),
        phone: None,
        role: role.to_string(),
    }
}

fn new_property(ledger: Ledger) -> CreateProperty {
    CreateProperty {
        plot_number: "B-4".to_string(),
        size: None,
        scheme: "Lake City".to_string(),
        total_price: dec!(1000),
        num_installments: None,
        num_years: None,
        monthly_installment: None,
        agent: None,
        agent_id: None,
        buyer_name: None,
        buyer_phone: None,
        buyer_cnic: None,
        buyer_address: None,
        status: "Installment".to_string(),
        total_paid: ledger.total_paid(),
        payments: ledger,
    }
}

fn payment(amount: rust_decimal::Decimal) -> NewPayment {
    NewPayment {
        amount,
        category: "Installment".to_string(),
        period_label: None,
        recorded_by: "Test".to_string(),
        date: None,
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_new_user_starts_offline(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("a@x.com", "c-1", "admin"))
        .await
        .unwrap();
    assert!(!user.is_online);
    assert!(user.active_sessions.is_empty());
    assert_eq!(UserRepo::count_admins(&pool).await.unwrap(), 1);
}

/// Email lookups ignore case and surrounding whitespace.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_by_email_normalizes(pool: PgPool) {
    UserRepo::create(&pool, &new_user("a@x.com", "c-1", "employee"))
        .await
        .unwrap();
    let found = UserRepo::find_by_email(&pool, " A@X.COM ").await.unwrap();
    assert!(found.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_email_violates_constraint(pool: PgPool) {
    UserRepo::create(&pool, &new_user("a@x.com", "c-1", "employee"))
        .await
        .unwrap();
    let err = UserRepo::create(&pool, &new_user("a@x.com", "c-2", "employee"))
        .await
        .unwrap_err();
    assert_matches!(err, sqlx::Error::Database(db) if db.constraint() == Some("uq_users_email"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_role_is_rejected(pool: PgPool) {
    let result = UserRepo::create(&pool, &new_user("a@x.com", "c-1", "owner")).await;
    assert!(result.is_err());
}

/// Saving sessions bumps the version and derives `is_online`.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_sessions_derives_online_flag(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("a@x.com", "c-1", "employee"))
        .await
        .unwrap();

    let mut sessions = ActiveSessions::new();
    sessions.push(Session::new("t1", Utc::now(), "UA", "127.0.0.1"));
    let saved = UserRepo::save_sessions(&pool, user.id, user.version, &sessions)
        .await
        .unwrap()
        .expect("version should match");
    assert!(saved.is_online);
    assert_eq!(saved.version, user.version + 1);
    assert!(saved.active_sessions.contains_token("t1"));

    let cleared = UserRepo::save_sessions(&pool, saved.id, saved.version, &ActiveSessions::new())
        .await
        .unwrap()
        .expect("version should match");
    assert!(!cleared.is_online);
}

/// A write with a stale version changes nothing.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_sessions_stale_version_writes_nothing(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("a@x.com", "c-1", "employee"))
        .await
        .unwrap();

    let mut first = ActiveSessions::new();
    first.push(Session::new("winner", Utc::now(), "UA", "-"));
    UserRepo::save_sessions(&pool, user.id, user.version, &first)
        .await
        .unwrap()
        .unwrap();

    let mut second = ActiveSessions::new();
    second.push(Session::new("loser", Utc::now(), "UA", "-"));
    let result = UserRepo::save_sessions(&pool, user.id, user.version, &second)
        .await
        .unwrap();
    assert!(result.is_none());

    let stored = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(stored.active_sessions.contains_token("winner"));
    assert!(!stored.active_sessions.contains_token("loser"));
}

/// Profile updates leave sessions alone.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_keeps_sessions(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("a@x.com", "c-1", "employee"))
        .await
        .unwrap();
    let mut sessions = ActiveSessions::new();
    sessions.push(Session::new("t1", Utc::now(), "UA", "-"));
    UserRepo::save_sessions(&pool, user.id, user.version, &sessions)
        .await
        .unwrap()
        .unwrap();

    let update = UpdateUser {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let updated = UserRepo::update(&pool, user.id, &update)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.email, "a@x.com");
    assert!(updated.active_sessions.contains_token("t1"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reset_token_expiry(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("a@x.com", "c-1", "admin"))
        .await
        .unwrap();

    UserRepo::set_reset_token(&pool, user.id, "expired", Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    assert!(UserRepo::find_by_reset_token(&pool, "expired").await.unwrap().is_none());

    UserRepo::set_reset_token(&pool, user.id, "fresh", Utc::now() + Duration::minutes(10))
        .await
        .unwrap();
    assert!(UserRepo::find_by_reset_token(&pool, "fresh").await.unwrap().is_some());

    UserRepo::update_password(&pool, user.id, "new-hash").await.unwrap();
    assert!(UserRepo::find_by_reset_token(&pool, "fresh").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_touch_session_updates_activity_in_place(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("a@x.com", "c-1", "employee"))
        .await
        .unwrap();
    let login = Utc::now() - Duration::hours(1);
    let mut sessions = ActiveSessions::new();
    sessions.push(Session::new("t1", login, "UA", "-"));
    sessions.push(Session::new("t2", login, "UA", "-"));
    let saved = UserRepo::save_sessions(&pool, user.id, user.version, &sessions)
        .await
        .unwrap()
        .unwrap();

    let touched = UserRepo::touch_session(&pool, user.id, "t2", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(touched.version, saved.version);
    let tokens: Vec<&str> = touched.active_sessions.iter().map(|s| s.token.as_str()).collect();
    assert_eq!(tokens, ["t1", "t2"]);
    let entries: Vec<_> = touched.active_sessions.iter().collect();
    assert_eq!(entries[0].last_activity, Some(login));
    assert!(entries[1].last_activity > Some(login));
    assert_eq!(entries[1].login_time, Some(login));

    let missing = UserRepo::touch_session(&pool, user.id, "unknown", Utc::now())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_keeps_last_admin(pool: PgPool) {
    let owner = UserRepo::create(&pool, &new_user("o@x.com", "c-1", "admin"))
        .await
        .unwrap();
    let partner = UserRepo::create(&pool, &new_user("p@x.com", "c-2", "admin"))
        .await
        .unwrap();
    let clerk = UserRepo::create(&pool, &new_user("c@x.com", "c-3", "employee"))
        .await
        .unwrap();

    assert!(UserRepo::delete_unless_last_admin(&pool, partner.id).await.unwrap());
    assert!(!UserRepo::delete_unless_last_admin(&pool, owner.id).await.unwrap());
    assert!(UserRepo::delete_unless_last_admin(&pool, clerk.id).await.unwrap());
    assert!(!UserRepo::delete_unless_last_admin(&pool, clerk.id).await.unwrap());
    assert_eq!(UserRepo::count_admins(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_admin_deletes_leave_one_admin(pool: PgPool) {
    let owner = UserRepo::create(&pool, &new_user("o@x.com", "c-1", "admin"))
        .await
        .unwrap();
    let partner = UserRepo::create(&pool, &new_user("p@x.com", "c-2", "admin"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        UserRepo::delete_unless_last_admin(&pool, owner.id),
        UserRepo::delete_unless_last_admin(&pool, partner.id),
    );
    assert_ne!(a.unwrap(), b.unwrap());
    assert_eq!(UserRepo::count_admins(&pool).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Ledger owners
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_property_ledger_roundtrip(pool: PgPool) {
    let mut ledger = Ledger::new();
    ledger.record(payment(dec!(400)), Utc::now()).unwrap();
    let created = PropertyRepo::create(&pool, &new_property(ledger)).await.unwrap();
    assert_eq!(created.total_paid, dec!(400));
    assert_eq!(created.payments.len(), 1);

    let mut owner = PropertyRepo::find_owner(&pool, created.id)
        .await
        .unwrap()
        .unwrap();
    owner.ledger_mut().record(payment(dec!(600)), Utc::now()).unwrap();
    assert!(owner.reconcile());

    let saved = PropertyRepo::save_owner(&pool, &owner).await.unwrap().unwrap();
    assert_eq!(saved.total_paid, dec!(1000));
    assert_eq!(saved.status, "Completed");
    assert_eq!(saved.version, created.version + 1);
}

/// Two writers loaded from the same version: only the first lands.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_property_concurrent_save_conflicts(pool: PgPool) {
    let created = PropertyRepo::create(&pool, &new_property(Ledger::new()))
        .await
        .unwrap();

    let mut a: Property = created.clone();
    let mut b: Property = created;
    a.ledger_mut().record(payment(dec!(100)), Utc::now()).unwrap();
    a.reconcile();
    b.ledger_mut().record(payment(dec!(200)), Utc::now()).unwrap();
    b.reconcile();

    assert!(PropertyRepo::save(&pool, &a).await.unwrap().is_some());
    assert!(PropertyRepo::save(&pool, &b).await.unwrap().is_none());

    let stored = PropertyRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(stored.total_paid, dec!(100));
    assert_eq!(stored.payments.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rent_create_and_delete(pool: PgPool) {
    let input = CreateRent {
        house_number: "H-1".to_string(),
        monthly_rent: dec!(25000),
        status: "Vacant".to_string(),
        details: RentDetails {
            tenant_name: Some("Nadia".to_string()),
            ..Default::default()
        },
    };
    let rent = RentRepo::create(&pool, &input).await.unwrap();
    assert_eq!(rent.tenant_name.as_deref(), Some("Nadia"));
    assert!(rent.payments.is_empty());
    assert_eq!(rent.total_paid, dec!(0));

    assert!(RentRepo::delete(&pool, rent.id).await.unwrap());
    assert!(!RentRepo::delete(&pool, rent.id).await.unwrap());
    assert!(RentRepo::find_by_id(&pool, rent.id).await.unwrap().is_none());
}
