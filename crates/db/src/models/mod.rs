pub mod property;
pub mod rent;
pub mod user;
