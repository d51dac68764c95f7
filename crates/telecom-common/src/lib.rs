pub mod models;
pub mod money;
pub mod validation;
