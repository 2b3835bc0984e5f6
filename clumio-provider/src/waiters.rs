//! Waiters - Poll variants used after mutating calls
//!
//! - poll after create: the new object is readable and its status field is set
//! - poll after update: the read reflects the change (version advanced or
//!   the requested value is visible), so a stale read is never returned
//! - poll task: an asynchronous backend task completed

use clumio_core::poll::{PollConfig, PollOutcome, poll_until};
use clumio_core::provider::{ProviderError, ProviderResult};
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, ClumioApi};
use crate::models::{AwsConnection, ProtectionGroup, Task, TaskStatus};

pub const TASK_ABORTED: &str = "task aborted";
pub const TASK_FAILED: &str = "task failed";

/// Map a task to the outcome of one check
pub fn task_outcome(task: Task) -> PollOutcome<Task> {
    match task.status {
        Some(TaskStatus::Completed) => PollOutcome::Success(task),
        Some(TaskStatus::Aborted) => PollOutcome::Failed(TASK_ABORTED.to_string()),
        Some(TaskStatus::Failed) => PollOutcome::Failed(TASK_FAILED.to_string()),
        _ => PollOutcome::Pending,
    }
}

/// Read errors during a poll: 404 means "not visible yet", anything else ends it
fn pending_if_not_found<T>(err: ClientError) -> Result<PollOutcome<T>, ProviderError> {
    if err.is_not_found() {
        Ok(PollOutcome::Pending)
    } else {
        Err(err.into())
    }
}

/// Wait until a task completes; aborted and failed tasks are terminal failures
pub async fn wait_for_task(
    client: &dyn ClumioApi,
    poll: &PollConfig,
    cancel: &CancellationToken,
    task_id: &str,
) -> ProviderResult<Task> {
    let request = poll.request(format!("task {}", task_id));
    poll_until(&request, cancel, move || async move {
        let task = client.read_task(task_id).await.map_err(ProviderError::from)?;
        debug!("task {} status {:?}", task_id, task.status);
        Ok::<_, ProviderError>(task_outcome(task))
    })
    .await
    .map_err(ProviderError::from)
}

/// Wait until a freshly created connection is readable with a status
pub async fn wait_for_connection_ready(
    client: &dyn ClumioApi,
    poll: &PollConfig,
    cancel: &CancellationToken,
    connection_id: &str,
) -> ProviderResult<AwsConnection> {
    let request = poll.request(format!("AWS connection {}", connection_id));
    poll_until(&request, cancel, move || async move {
        match client.read_aws_connection(connection_id).await {
            Ok(conn) if conn.connection_status.is_some() => Ok(PollOutcome::Success(conn)),
            Ok(_) => Ok(PollOutcome::Pending),
            Err(err) => pending_if_not_found(err),
        }
    })
    .await
    .map_err(ProviderError::from)
}

/// Wait until a connection read reflects the requested description.
/// An absent description reads the same as an empty one.
pub async fn wait_for_connection_update(
    client: &dyn ClumioApi,
    poll: &PollConfig,
    cancel: &CancellationToken,
    connection_id: &str,
    expected_description: &str,
) -> ProviderResult<AwsConnection> {
    let request = poll.request(format!("update of AWS connection {}", connection_id));
    poll_until(&request, cancel, move || async move {
        let conn = client
            .read_aws_connection(connection_id)
            .await
            .map_err(ProviderError::from)?;
        let outcome = if conn.description.as_deref().unwrap_or_default() == expected_description {
            PollOutcome::Success(conn)
        } else {
            PollOutcome::Pending
        };
        Ok::<_, ProviderError>(outcome)
    })
    .await
    .map_err(ProviderError::from)
}

/// Wait until a freshly created protection group is readable
pub async fn wait_for_protection_group(
    client: &dyn ClumioApi,
    poll: &PollConfig,
    cancel: &CancellationToken,
    protection_group_id: &str,
) -> ProviderResult<ProtectionGroup> {
    let request = poll.request(format!("protection group {}", protection_group_id));
    poll_until(&request, cancel, move || async move {
        match client.read_protection_group(protection_group_id).await {
            Ok(pg) if pg.version.is_some() => Ok(PollOutcome::Success(pg)),
            Ok(_) => Ok(PollOutcome::Pending),
            Err(err) => pending_if_not_found(err),
        }
    })
    .await
    .map_err(ProviderError::from)
}

/// Wait until the protection group version moves past `previous_version`
pub async fn wait_for_protection_group_version(
    client: &dyn ClumioApi,
    poll: &PollConfig,
    cancel: &CancellationToken,
    protection_group_id: &str,
    previous_version: i64,
) -> ProviderResult<ProtectionGroup> {
    let request = poll.request(format!(
        "protection group {} to move past version {}",
        protection_group_id, previous_version
    ));
    poll_until(&request, cancel, move || async move {
        let pg = client
            .read_protection_group(protection_group_id)
            .await
            .map_err(ProviderError::from)?;
        let outcome = match pg.version {
            Some(version) if version > previous_version => PollOutcome::Success(pg),
            _ => PollOutcome::Pending,
        };
        Ok::<_, ProviderError>(outcome)
    })
    .await
    .map_err(ProviderError::from)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clumio_core::provider::ErrorKind;
    use tokio::time::Instant;

    use super::*;
    use crate::testing::FakeClumio;

    fn poll() -> PollConfig {
        PollConfig::new(Duration::from_secs(1), Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn task_completes_on_third_tick() {
        let fake = FakeClumio::default();
        fake.script_task("t-1", &["in_progress", "in_progress", "completed"]);
        let start = Instant::now();

        let task = wait_for_task(&fake, &poll(), &CancellationToken::new(), "t-1")
            .await
            .unwrap();

        assert_eq!(task.status, Some(TaskStatus::Completed));
        assert_eq!(fake.task_reads("t-1"), 3);
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_task_fails_immediately() {
        let fake = FakeClumio::default();
        fake.script_task("t-2", &["aborted"]);

        let err = wait_for_task(&fake, &poll(), &CancellationToken::new(), "t-2")
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::TerminalFailure);
        assert_eq!(err.message, TASK_ABORTED);
        assert_eq!(fake.task_reads("t-2"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_task_is_terminal() {
        let fake = FakeClumio::default();
        fake.script_task("t-3", &["queued", "failed"]);

        let err = wait_for_task(&fake, &poll(), &CancellationToken::new(), "t-3")
            .await
            .unwrap_err();
        assert_eq!(err.message, TASK_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_task_is_an_api_error() {
        let fake = FakeClumio::default();

        let err = wait_for_task(&fake, &poll(), &CancellationToken::new(), "nope")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn version_that_never_advances_times_out() {
        let fake = FakeClumio::default();
        fake.insert_protection_group(ProtectionGroup {
            id: Some("pg-1".to_string()),
            name: Some("pg".to_string()),
            version: Some(3),
            ..Default::default()
        });

        let err = wait_for_protection_group_version(
            &fake,
            &poll(),
            &CancellationToken::new(),
            "pg-1",
            3,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::PollTimeout);
    }

    #[tokio::test(start_paused = true)]
    async fn version_advance_succeeds() {
        let fake = FakeClumio::default();
        fake.insert_protection_group(ProtectionGroup {
            id: Some("pg-1".to_string()),
            version: Some(4),
            ..Default::default()
        });

        let pg = wait_for_protection_group_version(
            &fake,
            &poll(),
            &CancellationToken::new(),
            "pg-1",
            3,
        )
        .await
        .unwrap();
        assert_eq!(pg.version, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn create_poll_treats_not_found_as_pending() {
        let fake = FakeClumio::default();
        fake.hide_connection_reads("c-1", 2);
        fake.insert_connection(AwsConnection {
            id: Some("c-1".to_string()),
            connection_status: Some("waiting_for_template".to_string()),
            ..Default::default()
        });

        let conn = wait_for_connection_ready(&fake, &poll(), &CancellationToken::new(), "c-1")
            .await
            .unwrap();
        assert_eq!(conn.connection_status.as_deref(), Some("waiting_for_template"));
        assert_eq!(fake.connection_reads("c-1"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_reports_cancellation() {
        let fake = FakeClumio::default();
        fake.script_task("t-4", &["in_progress"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = wait_for_task(&fake, &poll(), &cancel, "t-4").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PollCancelled);
        assert_eq!(fake.task_reads("t-4"), 0);
    }
}
