pub mod constraint;
pub mod pool;
pub mod repos;

// Re-export commonly used items
pub use constraint::{constraint_violation, ConstraintViolation};
pub use pool::{create_pool, run_migrations};
pub use repos::contract::{ContractChanges, ContractRepo, ContractRow};
pub use repos::revoked_token::{RevokedTokenRepo, RevokedTokenRow};
pub use repos::service::{ServiceChanges, ServiceRepo, ServiceRow};
pub use repos::user::{UserChanges, UserRepo, UserRow};
