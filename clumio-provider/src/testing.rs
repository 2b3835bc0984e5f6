//! In-memory [`ClumioApi`] used by the unit tests
//!
//! Objects live in maps shared by every scoped copy of the fake, and each
//! call is recorded together with the organizational unit it ran under.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::{ClientError, ClientResult, ClumioApi};
use crate::models::{
    AwsConnection, CreateAwsConnectionRequest, ProtectionGroup, ProtectionGroupRequest, S3Bucket,
    SetBucketPropertiesRequest, Task, TaskReference, TaskStatus, UpdateAwsConnectionRequest,
};

#[derive(Default)]
struct Inner {
    connections: HashMap<String, AwsConnection>,
    protection_groups: HashMap<String, ProtectionGroup>,
    buckets: HashMap<String, S3Bucket>,
    tasks: HashMap<String, VecDeque<TaskStatus>>,
    hidden_connection_reads: HashMap<String, usize>,
    connection_reads: HashMap<String, usize>,
    task_reads: HashMap<String, usize>,
    /// Task statuses handed to the next bucket property updates
    bucket_task_script: Vec<&'static str>,
    /// When set, protection group updates leave the version alone
    freeze_versions: bool,
    /// When set, a bucket disappears once its properties are updated
    lose_updated_buckets: bool,
    next_id: usize,
    calls: Vec<(String, Option<String>)>,
    pg_updates: Vec<ProtectionGroupRequest>,
    bucket_updates: Vec<(String, SetBucketPropertiesRequest)>,
}

#[derive(Clone, Default)]
pub struct FakeClumio {
    inner: Arc<Mutex<Inner>>,
    organizational_unit: Option<String>,
}

fn not_found(what: &str) -> ClientError {
    ClientError::Http {
        status: 404,
        message: format!("{} not found", what),
    }
}

fn parse_status(status: &str) -> TaskStatus {
    serde_json::from_value(serde_json::Value::String(status.to_string()))
        .unwrap_or(TaskStatus::Unknown)
}

impl FakeClumio {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn record(&self, call: &str) {
        let ou = self.organizational_unit.clone();
        self.lock().calls.push((call.to_string(), ou));
    }

    pub fn insert_connection(&self, conn: AwsConnection) {
        let id = conn.id.clone().unwrap_or_default();
        self.lock().connections.insert(id, conn);
    }

    pub fn insert_protection_group(&self, pg: ProtectionGroup) {
        let id = pg.id.clone().unwrap_or_default();
        self.lock().protection_groups.insert(id, pg);
    }

    pub fn insert_bucket(&self, bucket: S3Bucket) {
        let id = bucket.id.clone().unwrap_or_default();
        self.lock().buckets.insert(id, bucket);
    }

    /// Statuses returned by successive reads of a task; the last one repeats
    pub fn script_task(&self, task_id: &str, statuses: &[&str]) {
        self.lock().tasks.insert(
            task_id.to_string(),
            statuses.iter().map(|s| parse_status(s)).collect(),
        );
    }

    /// Statuses of the tasks started by the next bucket property update
    pub fn script_bucket_tasks(&self, statuses: &[&'static str]) {
        self.lock().bucket_task_script = statuses.to_vec();
    }

    /// The next `count` reads of the connection answer 404
    pub fn hide_connection_reads(&self, id: &str, count: usize) {
        self.lock()
            .hidden_connection_reads
            .insert(id.to_string(), count);
    }

    pub fn freeze_versions(&self) {
        self.lock().freeze_versions = true;
    }

    pub fn lose_updated_buckets(&self) {
        self.lock().lose_updated_buckets = true;
    }

    pub fn connection_reads(&self, id: &str) -> usize {
        self.lock().connection_reads.get(id).copied().unwrap_or(0)
    }

    pub fn task_reads(&self, id: &str) -> usize {
        self.lock().task_reads.get(id).copied().unwrap_or(0)
    }

    /// Calls made so far with the organizational unit they ran under
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|(c, _)| c == call).count()
    }

    pub fn protection_group_updates(&self) -> Vec<ProtectionGroupRequest> {
        self.lock().pg_updates.clone()
    }

    pub fn bucket_updates(&self) -> Vec<(String, SetBucketPropertiesRequest)> {
        self.lock().bucket_updates.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut inner = self.lock();
        inner.next_id += 1;
        format!("{}-{}", prefix, inner.next_id)
    }
}

/// Evaluate a `{"name": {"$eq": "..."}}` style filter against a JSON object
fn matches_filter<T: serde::Serialize>(item: &T, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let (Ok(filter), Ok(item)) = (
        serde_json::from_str::<serde_json::Value>(filter),
        serde_json::to_value(item),
    ) else {
        return false;
    };
    filter.as_object().is_some_and(|conditions| {
        conditions
            .iter()
            .all(|(field, condition)| item.get(field) == condition.get("$eq"))
    })
}

#[async_trait]
impl ClumioApi for FakeClumio {
    fn scoped(&self, organizational_unit_id: &str) -> Arc<dyn ClumioApi> {
        Arc::new(FakeClumio {
            inner: self.inner.clone(),
            organizational_unit: Some(organizational_unit_id.to_string()),
        })
    }

    async fn create_aws_connection(
        &self,
        request: &CreateAwsConnectionRequest,
    ) -> ClientResult<AwsConnection> {
        self.record("create_aws_connection");
        let id = self.next_id("conn");
        let conn = AwsConnection {
            id: Some(id.clone()),
            account_native_id: Some(request.account_native_id.clone()),
            aws_region: Some(request.aws_region.clone()),
            description: request.description.clone(),
            connection_status: Some("waiting_for_template".to_string()),
            token: Some("tok-123".to_string()),
            namespace: Some("clumio".to_string()),
            clumio_aws_account_id: Some("999999999999".to_string()),
            clumio_aws_region: Some("us-west-2".to_string()),
            organizational_unit_id: request
                .organizational_unit_id
                .clone()
                .or_else(|| self.organizational_unit.clone())
                .or_else(|| Some("ou-root".to_string())),
            services_enabled: request.services_enabled.clone(),
        };
        self.insert_connection(conn.clone());
        Ok(AwsConnection {
            connection_status: None,
            ..conn
        })
    }

    async fn read_aws_connection(&self, id: &str) -> ClientResult<AwsConnection> {
        self.record("read_aws_connection");
        let mut inner = self.lock();
        *inner.connection_reads.entry(id.to_string()).or_default() += 1;
        if let Some(hidden) = inner.hidden_connection_reads.get_mut(id)
            && *hidden > 0
        {
            *hidden -= 1;
            return Err(not_found("connection"));
        }
        inner
            .connections
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("connection"))
    }

    async fn update_aws_connection(
        &self,
        id: &str,
        request: &UpdateAwsConnectionRequest,
    ) -> ClientResult<AwsConnection> {
        self.record("update_aws_connection");
        let mut inner = self.lock();
        let conn = inner
            .connections
            .get_mut(id)
            .ok_or_else(|| not_found("connection"))?;
        conn.description = request.description.clone();
        Ok(conn.clone())
    }

    async fn delete_aws_connection(&self, id: &str) -> ClientResult<()> {
        self.record("delete_aws_connection");
        self.lock()
            .connections
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("connection"))
    }

    async fn list_aws_connections(
        &self,
        filter: Option<&str>,
    ) -> ClientResult<Vec<AwsConnection>> {
        self.record("list_aws_connections");
        let inner = self.lock();
        Ok(inner
            .connections
            .values()
            .filter(|c| matches_filter(c, filter))
            .cloned()
            .collect())
    }

    async fn create_protection_group(
        &self,
        request: &ProtectionGroupRequest,
    ) -> ClientResult<ProtectionGroup> {
        self.record("create_protection_group");
        let id = self.next_id("pg");
        let pg = ProtectionGroup {
            id: Some(id.clone()),
            name: Some(request.name.clone()),
            description: request.description.clone(),
            bucket_rule: request.bucket_rule.clone(),
            object_filter: request.object_filter.clone(),
            organizational_unit_id: request
                .organizational_unit_id
                .clone()
                .or_else(|| self.organizational_unit.clone()),
            version: Some(1),
            protection_status: Some("unprotected".to_string()),
            is_deleted: Some(false),
        };
        self.insert_protection_group(pg);
        Ok(ProtectionGroup {
            id: Some(id),
            ..Default::default()
        })
    }

    async fn read_protection_group(&self, id: &str) -> ClientResult<ProtectionGroup> {
        self.record("read_protection_group");
        self.lock()
            .protection_groups
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("protection group"))
    }

    async fn update_protection_group(
        &self,
        id: &str,
        request: &ProtectionGroupRequest,
    ) -> ClientResult<ProtectionGroup> {
        self.record("update_protection_group");
        let mut inner = self.lock();
        inner.pg_updates.push(request.clone());
        let freeze = inner.freeze_versions;
        let pg = inner
            .protection_groups
            .get_mut(id)
            .ok_or_else(|| not_found("protection group"))?;
        pg.name = Some(request.name.clone());
        pg.description = request.description.clone();
        pg.bucket_rule = request.bucket_rule.clone();
        pg.object_filter = request.object_filter.clone();
        if !freeze {
            pg.version = Some(pg.version.unwrap_or(0) + 1);
        }
        Ok(pg.clone())
    }

    async fn delete_protection_group(&self, id: &str) -> ClientResult<()> {
        self.record("delete_protection_group");
        self.lock()
            .protection_groups
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("protection group"))
    }

    async fn list_protection_groups(
        &self,
        filter: Option<&str>,
    ) -> ClientResult<Vec<ProtectionGroup>> {
        self.record("list_protection_groups");
        let inner = self.lock();
        Ok(inner
            .protection_groups
            .values()
            .filter(|pg| matches_filter(pg, filter))
            .cloned()
            .collect())
    }

    async fn read_s3_bucket(&self, bucket_id: &str) -> ClientResult<S3Bucket> {
        self.record("read_s3_bucket");
        self.lock()
            .buckets
            .get(bucket_id)
            .cloned()
            .ok_or_else(|| not_found("bucket"))
    }

    async fn set_s3_bucket_properties(
        &self,
        bucket_id: &str,
        request: &SetBucketPropertiesRequest,
    ) -> ClientResult<TaskReference> {
        self.record("set_s3_bucket_properties");
        let task_id = self.next_id("task");
        let mut inner = self.lock();
        let bucket = inner
            .buckets
            .get_mut(bucket_id)
            .ok_or_else(|| not_found("bucket"))?;
        bucket.event_bridge_enabled = Some(request.event_bridge_enabled);
        if request.event_bridge_notification_disabled.is_some() {
            bucket.event_bridge_notification_disabled = request.event_bridge_notification_disabled;
        }
        inner
            .bucket_updates
            .push((bucket_id.to_string(), request.clone()));
        if inner.lose_updated_buckets {
            inner.buckets.remove(bucket_id);
        }
        let script: VecDeque<TaskStatus> = if inner.bucket_task_script.is_empty() {
            VecDeque::from([TaskStatus::Completed])
        } else {
            inner.bucket_task_script.iter().map(|s| parse_status(s)).collect()
        };
        inner.tasks.insert(task_id.clone(), script);
        Ok(TaskReference {
            task_id: Some(task_id),
        })
    }

    async fn read_task(&self, task_id: &str) -> ClientResult<Task> {
        self.record("read_task");
        let mut inner = self.lock();
        *inner.task_reads.entry(task_id.to_string()).or_default() += 1;
        let statuses = inner
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| not_found("task"))?;
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(Task {
            id: Some(task_id.to_string()),
            status,
            task_type: None,
            start_timestamp: None,
            end_timestamp: None,
        })
    }
}
