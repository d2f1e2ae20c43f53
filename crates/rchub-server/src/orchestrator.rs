//! Job orchestration: validate, dispatch to an agent, persist
//!
//! A submission becomes exactly one remote `_async` operation and one job
//! record. The agent's own job id is kept so the job can be stopped later.
//!
//! There is no completion tracking: the agent is never asked whether a job
//! finished, so a job stays `running` until someone stops it.

use crate::error::{HubError, HubResult};
use crate::locks::KeyedLocks;
use rchub_connect::{paths, ConnectError, NodeRegistry, RcClient};
use rchub_store::{Job, JobKind, JobStatus, JobStore, TransferFlags};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Instrument};
use uuid::Uuid;

/// Body of a job submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    pub node: Option<String>,
    pub src: Option<String>,
    pub dst: Option<String>,
    #[serde(default)]
    pub flags: Option<Map<String, Value>>,
}

/// Result of a stop request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub uid: String,
    pub stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Remote-control operation for a transfer kind
pub fn rc_path(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Copy => paths::COPY,
        JobKind::Move => paths::MOVE,
        JobKind::Sync => paths::SYNC,
    }
}

/// Payload for an asynchronous copy/move/sync
pub fn build_payload(src: &str, dst: &str, flags: &TransferFlags) -> Value {
    let mut payload = Map::new();
    payload.insert("_async".to_string(), Value::Bool(true));
    payload.insert("srcFs".to_string(), Value::String(src.to_string()));
    payload.insert("dstFs".to_string(), Value::String(dst.to_string()));
    payload.extend(flags.to_map());
    Value::Object(payload)
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Validated submission, owned so it can move onto a dispatch task
struct Submission {
    kind: JobKind,
    node_id: String,
    src: String,
    dst: String,
    flags: TransferFlags,
    key: Option<String>,
}

/// Run `work` on its own task and wait for it
///
/// Dropping the returned future (a client hanging up) leaves the task running
/// to completion, so a started remote call is always followed by its save.
async fn detached<T, F>(work: F) -> HubResult<T>
where
    T: Send + 'static,
    F: Future<Output = HubResult<T>> + Send + 'static,
{
    tokio::spawn(work.in_current_span())
        .await
        .map_err(|e| HubError::Internal(format!("dispatch task failed: {}", e)))?
}

#[derive(Clone)]
pub struct JobOrchestrator {
    registry: Arc<NodeRegistry>,
    gateway: Arc<dyn RcClient>,
    store: Arc<dyn JobStore>,
    locks: KeyedLocks,
}

impl JobOrchestrator {
    pub fn new(
        registry: Arc<NodeRegistry>,
        gateway: Arc<dyn RcClient>,
        store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            registry,
            gateway,
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Start a copy, move or sync on a node and record it as a job
    ///
    /// With an idempotency key the key becomes the job id, and a repeated
    /// submission returns that id without contacting any node. Concurrent
    /// submissions under one key wait for each other.
    #[instrument(skip(self, request))]
    pub async fn submit(
        &self,
        kind: &str,
        request: JobRequest,
        idempotency_key: Option<&str>,
    ) -> HubResult<String> {
        let kind: JobKind = kind
            .parse()
            .map_err(|_| HubError::InvalidRequest("Invalid job kind".to_string()))?;

        let (node_id, src, dst) = match (
            non_empty(request.node),
            non_empty(request.src),
            non_empty(request.dst),
        ) {
            (Some(node), Some(src), Some(dst)) => (node, src, dst),
            _ => {
                return Err(HubError::InvalidRequest(
                    "Missing required fields: node, src, dst".to_string(),
                ))
            }
        };

        let (flags, dropped) = TransferFlags::from_map(&request.flags.unwrap_or_default())
            .map_err(|e| HubError::InvalidRequest(format!("Invalid flags: {}", e)))?;
        if !dropped.is_empty() {
            debug!("Dropping unsupported flags: {}", dropped.join(", "));
        }

        let submission = Submission {
            kind,
            node_id,
            src,
            dst,
            flags,
            key: non_empty(idempotency_key.map(str::to_string)),
        };

        let this = self.clone();
        detached(async move { this.dispatch(submission).await }).await
    }

    async fn dispatch(&self, submission: Submission) -> HubResult<String> {
        let Submission {
            kind,
            node_id,
            src,
            dst,
            flags,
            key,
        } = submission;

        let _claim = match key.as_deref() {
            Some(key) => Some(self.locks.acquire(key).await),
            None => None,
        };

        if let Some(key) = key.as_deref() {
            if let Some(existing) = self.store.find_by_idempotency_key(key).await? {
                info!("Idempotent replay of job {}", existing.uid);
                return Ok(existing.uid);
            }
        }

        let node = self.registry.lookup(&node_id).await?;
        let payload = build_payload(&src, &dst, &flags);

        let reply = self
            .gateway
            .call(&node, rc_path(kind), Some(payload), None)
            .await?;
        let rc_jobid = reply.get("jobid").and_then(Value::as_i64);
        if rc_jobid.is_none() {
            warn!("Agent {} returned no jobid for {}", node.id, kind);
        }

        let uid = key.unwrap_or_else(|| Uuid::new_v4().to_string());
        let job = Job::new(uid, node.id, kind, src, dst, flags, rc_jobid, now());

        if let Err(e) = self.store.upsert(&job).await {
            error!(
                "Job {} dispatched to {} (rc job {:?}) but could not be saved: {}",
                job.uid, job.node, rc_jobid, e
            );
            return Err(e.into());
        }

        info!(
            "Created {} job {} on {} ({} -> {})",
            job.kind, job.uid, job.node, job.src, job.dst
        );

        Ok(job.uid)
    }

    /// Current record of a job
    pub async fn status(&self, uid: &str) -> HubResult<Job> {
        self.store
            .get(uid)
            .await?
            .ok_or_else(|| HubError::JobNotFound(uid.to_string()))
    }

    /// Ask the owning agent to stop a running job
    ///
    /// Stopping a job that is not running is a no-op reported as
    /// `stopped: false`.
    #[instrument(skip(self))]
    pub async fn stop(&self, uid: &str) -> HubResult<StopOutcome> {
        let this = self.clone();
        let uid = uid.to_string();
        detached(async move { this.stop_running(uid).await }).await
    }

    async fn stop_running(&self, uid: String) -> HubResult<StopOutcome> {
        let _claim = self.locks.acquire(&uid).await;

        let job = self.status(&uid).await?;
        if job.status != JobStatus::Running {
            return Ok(StopOutcome {
                uid: job.uid,
                stopped: false,
                message: Some(format!("Job status is {}, nothing to stop", job.status)),
            });
        }

        let node = self.registry.lookup(&job.node).await.map_err(|e| match e {
            ConnectError::NodeNotFound(id) => HubError::OwnerNodeNotFound(id),
            other => other.into(),
        })?;

        self.gateway
            .call(
                &node,
                paths::JOB_STOP,
                Some(json!({ "jobid": job.rc_jobid })),
                None,
            )
            .await?;

        self.store
            .update_status(&uid, JobStatus::Stopped, now())
            .await?;

        info!("Stopped job {} on {}", uid, node.id);

        Ok(StopOutcome {
            uid: job.uid,
            stopped: true,
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry, temp_store, RecordingClient};
    use std::time::Duration;

    fn request(node: &str, src: &str, dst: &str, flags: Value) -> JobRequest {
        JobRequest {
            node: Some(node.to_string()),
            src: Some(src.to_string()),
            dst: Some(dst.to_string()),
            flags: flags.as_object().cloned(),
        }
    }

    fn copy_request() -> JobRequest {
        request("A", "local:/tmp/a", "remote:/backup/a", json!({"checksum": true}))
    }

    #[tokio::test]
    async fn test_submit_persists_running_job() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        let uid = orchestrator.submit("copy", copy_request(), None).await.unwrap();
        let job = orchestrator.status(&uid).await.unwrap();

        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.kind, JobKind::Copy);
        assert_eq!(job.node, "A");
        assert_eq!(job.src, "local:/tmp/a");
        assert_eq!(job.dst, "remote:/backup/a");
        assert_eq!(job.flags.checksum, Some(true));
        assert_eq!(job.rc_jobid, Some(1));
        assert_eq!((job.bytes_done, job.files_done), (0, 0));
        assert!(Uuid::parse_str(&uid).is_ok());
    }

    #[tokio::test]
    async fn test_payload_shape_and_flag_whitelist() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        let req = request(
            "A",
            "local:/tmp/a",
            "remote:/backup/a",
            json!({"checksum": true, "deleteExcluded": true, "_filter": {"IncludeRule": ["*"]}}),
        );
        let uid = orchestrator.submit("copy", req, None).await.unwrap();

        let calls = client.calls_to(paths::COPY);
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].payload,
            json!({
                "_async": true,
                "srcFs": "local:/tmp/a",
                "dstFs": "remote:/backup/a",
                "checksum": true,
            })
        );

        let job = orchestrator.status(&uid).await.unwrap();
        assert_eq!(job.flags.to_map(), json!({"checksum": true}).as_object().cloned().unwrap());
    }

    #[tokio::test]
    async fn test_kind_maps_to_remote_path() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        for kind in ["copy", "move", "sync"] {
            orchestrator.submit(kind, copy_request(), None).await.unwrap();
        }

        let paths: Vec<String> = client.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec!["operations/copyfs", "operations/movefs", "sync/sync"]);
    }

    #[tokio::test]
    async fn test_invalid_kind_and_missing_fields() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        let err = orchestrator.submit("delete", copy_request(), None).await.unwrap_err();
        assert!(matches!(err, HubError::InvalidRequest(_)));

        let mut req = copy_request();
        req.dst = Some(String::new());
        let err = orchestrator.submit("copy", req, None).await.unwrap_err();
        assert!(matches!(err, HubError::InvalidRequest(_)));

        let mut req = copy_request();
        req.node = None;
        let err = orchestrator.submit("copy", req, None).await.unwrap_err();
        assert!(matches!(err, HubError::InvalidRequest(_)));

        let req = request("A", "a", "b", json!({"transfers": "many"}));
        let err = orchestrator.submit("copy", req, None).await.unwrap_err();
        assert!(matches!(err, HubError::InvalidRequest(_)));

        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_node_fails_before_network() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        let req = request("Z", "local:/a", "remote:/a", json!({}));
        let err = orchestrator.submit("sync", req, None).await.unwrap_err();

        assert!(matches!(err, HubError::NodeNotFound(ref id) if id == "Z"));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_replay_calls_agent_once() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        let first = orchestrator
            .submit("copy", copy_request(), Some("nightly-2024-01-01"))
            .await
            .unwrap();
        let second = orchestrator
            .submit("copy", copy_request(), Some("nightly-2024-01-01"))
            .await
            .unwrap();

        assert_eq!(first, "nightly-2024-01-01");
        assert_eq!(second, first);
        assert_eq!(client.calls_to(paths::COPY).len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_idempotent_submissions_race() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(50)));
        let orchestrator = Arc::new(JobOrchestrator::new(
            registry(&["A"]),
            client.clone(),
            store,
        ));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator
                    .submit("copy", copy_request(), Some("same-key"))
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "same-key");
        }
        assert_eq!(client.calls_to(paths::COPY).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_idempotency_key_is_ignored() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        let a = orchestrator.submit("copy", copy_request(), Some("")).await.unwrap();
        let b = orchestrator.submit("copy", copy_request(), Some("")).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(client.calls_to(paths::COPY).len(), 2);
    }

    #[tokio::test]
    async fn test_gateway_error_is_propagated_and_nothing_saved() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new().with_remote_error(500, "didn't find section"));
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        let err = orchestrator
            .submit("copy", copy_request(), Some("key-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, HubError::Gateway(_)));
        assert!(matches!(
            orchestrator.status("key-1").await,
            Err(HubError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_then_stop_again() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        let uid = orchestrator.submit("copy", copy_request(), None).await.unwrap();

        let first = orchestrator.stop(&uid).await.unwrap();
        assert!(first.stopped);
        assert_eq!(first.message, None);

        let stop_calls = client.calls_to(paths::JOB_STOP);
        assert_eq!(stop_calls.len(), 1);
        assert_eq!(stop_calls[0].payload, json!({"jobid": 1}));

        let job = orchestrator.status(&uid).await.unwrap();
        assert_eq!(job.status, JobStatus::Stopped);

        let second = orchestrator.stop(&uid).await.unwrap();
        assert!(!second.stopped);
        assert_eq!(
            second.message.as_deref(),
            Some("Job status is stopped, nothing to stop")
        );
        assert_eq!(client.calls_to(paths::JOB_STOP).len(), 1);
    }

    #[tokio::test]
    async fn test_stop_unknown_job() {
        let (_dir, store) = temp_store().await;
        let orchestrator =
            JobOrchestrator::new(registry(&["A"]), Arc::new(RecordingClient::new()), store);

        let err = orchestrator.stop("ghost").await.unwrap_err();
        assert!(matches!(err, HubError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_when_node_was_removed() {
        let (_dir, store) = temp_store().await;
        let nodes = registry(&["A"]);
        let client = Arc::new(RecordingClient::new());
        let orchestrator = JobOrchestrator::new(nodes.clone(), client.clone(), store);

        let uid = orchestrator.submit("move", copy_request(), None).await.unwrap();
        nodes.reload(Vec::new()).await.unwrap();

        let err = orchestrator.stop(&uid).await.unwrap_err();
        assert!(matches!(err, HubError::OwnerNodeNotFound(ref id) if id == "A"));
        assert_eq!(err.to_string(), "Node A not found");
        assert_eq!(
            orchestrator.status(&uid).await.unwrap().status,
            JobStatus::Running
        );
    }

    #[tokio::test]
    async fn test_failed_stop_keeps_job_running() {
        let (_dir, store) = temp_store().await;
        let nodes = registry(&["A"]);

        let ok = JobOrchestrator::new(nodes.clone(), Arc::new(RecordingClient::new()), store.clone());
        let uid = ok.submit("copy", copy_request(), None).await.unwrap();

        let failing = JobOrchestrator::new(
            nodes,
            Arc::new(RecordingClient::new().with_unreachable("A")),
            store,
        );
        let err = failing.stop(&uid).await.unwrap_err();

        assert!(matches!(err, HubError::Gateway(_)));
        assert_eq!(failing.status(&uid).await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_abandoned_submission_is_not_dispatched_twice() {
        let (_dir, store) = temp_store().await;
        let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(100)));
        let orchestrator = JobOrchestrator::new(registry(&["A"]), client.clone(), store);

        // Caller gives up while the agent call is in flight
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            orchestrator.submit("copy", copy_request(), Some("k1")),
        )
        .await;
        assert!(abandoned.is_err());

        let uid = orchestrator
            .submit("copy", copy_request(), Some("k1"))
            .await
            .unwrap();

        assert_eq!(uid, "k1");
        assert_eq!(client.calls_to(paths::COPY).len(), 1);
        assert_eq!(
            orchestrator.status("k1").await.unwrap().status,
            JobStatus::Running
        );
    }

    #[tokio::test]
    async fn test_abandoned_stop_still_completes() {
        let (_dir, store) = temp_store().await;
        let nodes = registry(&["A"]);

        let fast = JobOrchestrator::new(nodes.clone(), Arc::new(RecordingClient::new()), store.clone());
        let uid = fast.submit("sync", copy_request(), None).await.unwrap();

        let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(100)));
        let slow = JobOrchestrator::new(nodes, client.clone(), store);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), slow.stop(&uid)).await;
        assert!(abandoned.is_err());

        // Waits on the job's lock until the first stop has been saved
        let again = slow.stop(&uid).await.unwrap();

        assert!(!again.stopped);
        assert_eq!(client.calls_to(paths::JOB_STOP).len(), 1);
        assert_eq!(slow.status(&uid).await.unwrap().status, JobStatus::Stopped);
    }
}
