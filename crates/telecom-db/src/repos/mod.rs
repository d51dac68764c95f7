pub mod contract;
pub mod revoked_token;
pub mod service;
pub mod user;
