//! Request and response bodies

use powerlease_util::LeaseId;
use serde::{Deserialize, Serialize};

/// Query parameters of a renew call
///
/// Without `id` the server generates one. Without `expire_in_sec` an anonymous
/// renewal gets the server's default TTL, while a renewal of a named lease
/// makes it never expire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LeaseId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_in_sec: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewResponse {
    pub id: LeaseId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// One row of the lease table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseView {
    pub id: LeaseId,

    /// Unix seconds; `null` means the lease never expires
    pub expire_time: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub api_version: u32,
    pub store_healthy: bool,
}

/// Body returned with non-2xx statuses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delete_path;

    #[test]
    fn lease_view_json_shape() {
        let view = LeaseView {
            id: LeaseId::new("backup-job"),
            expire_time: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json, serde_json::json!({"id": "backup-job", "expire_time": null}));
    }

    #[test]
    fn renew_query_omits_absent_fields() {
        let query = RenewQuery::default();
        assert_eq!(serde_json::to_value(&query).unwrap(), serde_json::json!({}));

        let parsed: RenewQuery =
            serde_json::from_str(r#"{"id": "tmp:abc", "expire_in_sec": 180}"#).unwrap();
        assert_eq!(parsed.id, Some(LeaseId::new("tmp:abc")));
        assert_eq!(parsed.expire_in_sec, Some(180));
    }

    #[test]
    fn delete_path_fills_in_id() {
        assert_eq!(delete_path("backup-job"), "/tokens/delete/backup-job");
    }
}
