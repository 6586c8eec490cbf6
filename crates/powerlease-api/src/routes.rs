//! Route paths served by powerleased

/// `GET ?id=&expire_in_sec=` → [`crate::RenewResponse`]
pub const RENEW_PATH: &str = "/tokens/update";

/// `GET /tokens/delete/{id}` → [`crate::DeleteResponse`]
pub const DELETE_PATH: &str = "/tokens/delete/{id}";

/// `GET` → list of [`crate::LeaseView`]
pub const LIST_PATH: &str = "/tokens/list";

/// `GET` → [`crate::StatusResponse`]
pub const STATUS_PATH: &str = "/status";

/// `GET` → [`crate::HealthResponse`]
pub const HEALTH_PATH: &str = "/health";

/// Concrete path for deleting one lease
pub fn delete_path(id: &str) -> String {
    DELETE_PATH.replace("{id}", id)
}
