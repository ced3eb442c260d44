mod delivery_log_repo;
mod mock;
mod repo_error;
mod subscription_repo;

pub use delivery_log_repo::*;
pub use mock::*;
pub use repo_error::RepositoryError;
pub use subscription_repo::*;
