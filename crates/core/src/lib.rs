//! EstatePro domain core.
//!
//! Pure logic shared by the persistence and HTTP layers. Nothing in this
//! crate performs I/O: callers load a record, apply these functions to it,
//! and persist the result in a single write.

pub mod account;
pub mod error;
pub mod ledger;
pub mod roles;
pub mod session;
pub mod types;
