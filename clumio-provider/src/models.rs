//! Wire models of the Clumio REST API
//!
//! Only the fields the provider reads or writes are modeled. Optional
//! request fields are skipped when unset so the API applies its defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// AWS connections
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsConnection {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub account_native_id: Option<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub connection_status: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub clumio_aws_account_id: Option<String>,
    #[serde(default)]
    pub clumio_aws_region: Option<String>,
    #[serde(default)]
    pub organizational_unit_id: Option<String>,
    #[serde(default)]
    pub services_enabled: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateAwsConnectionRequest {
    pub account_native_id: String,
    pub aws_region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services_enabled: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateAwsConnectionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// =============================================================================
// Protection groups
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefixFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_sub_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_filters: Option<Vec<PrefixFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_classes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtectionGroup {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bucket_rule: Option<String>,
    #[serde(default)]
    pub object_filter: Option<ObjectFilter>,
    #[serde(default)]
    pub organizational_unit_id: Option<String>,
    /// Incremented by the backend on every applied change
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub protection_status: Option<String>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

/// Body of both create and update calls
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProtectionGroupRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_filter: Option<ObjectFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit_id: Option<String>,
}

// =============================================================================
// S3 buckets
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Bucket {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account_native_id: Option<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub event_bridge_enabled: Option<bool>,
    #[serde(default)]
    pub event_bridge_notification_disabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetBucketPropertiesRequest {
    pub event_bridge_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_bridge_notification_disabled: Option<bool>,
}

// =============================================================================
// Tasks
// =============================================================================

/// Reference to an asynchronous backend job started by a call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskReference {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    InProgress,
    Completed,
    Aborted,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, rename = "type")]
    pub task_type: Option<String>,
    #[serde(default)]
    pub start_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// Envelopes
// =============================================================================

/// HAL style list envelope: `{"_embedded": {"items": [...]}, "total_pages_count": 1}`
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Option<Embedded<T>>,
    #[serde(default)]
    pub total_pages_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Embedded<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> ListResponse<T> {
    /// Whether pages follow the 1-based `page`
    pub fn has_more(&self, page: u64) -> bool {
        self.total_pages_count.is_some_and(|total| page < total)
    }

    pub fn into_items(self) -> Vec<T> {
        self.embedded.map(|e| e.items).unwrap_or_default()
    }
}

/// Error body: `{"errors": [{"error_code": 1, "error_message": "..."}]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}
