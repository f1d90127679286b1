//! Repositories: one zero-sized struct per table, associated async fns
//! taking `&PgPool`.

mod ledger_store;
mod property_repo;
mod rent_repo;
mod user_repo;

pub use ledger_store::LedgerStore;
pub use property_repo::PropertyRepo;
pub use rent_repo::RentRepo;
pub use user_repo::UserRepo;
