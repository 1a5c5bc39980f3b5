pub mod account;
pub mod auth;
pub mod authorize;
pub mod companies;
