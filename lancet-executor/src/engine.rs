//! High-level sandbox engine wrapping a [`WorkerBackend`].
//!
//! This is the surface the orchestrator consumes: submit a snippet plus
//! a dataset handle and limits, receive an attempt record. Attempts are
//! independent and may run concurrently; the engine tracks in-flight
//! attempt ids for observability only.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use lancet_core::{AttemptId, AttemptRecord, DatasetHandle, ExecLimits, SessionId, Snippet};
use lancet_policy::AllowListRegistry;

use crate::backend::WorkerBackend;
use crate::context::ContextOptions;
use crate::runner::AttemptRunner;
use crate::ExecutorError;

/// One execution submission from the orchestrator.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ExecutionRequest {
    /// The snippet to execute.
    pub snippet: Snippet,
    /// The dataset the snippet may read.
    pub dataset: DatasetHandle,
    /// Resource ceilings for this attempt.
    pub limits: ExecLimits,
    /// Registry replacing the engine's default for this attempt.
    pub registry_override: Option<Arc<AllowListRegistry>>,
    /// Per-attempt context options.
    pub options: ContextOptions,
    /// Session this attempt belongs to, for correlation in logs.
    pub session: Option<SessionId>,
}

impl ExecutionRequest {
    /// Create a request with the engine's default registry and options.
    #[must_use]
    pub fn new(snippet: Snippet, dataset: DatasetHandle, limits: ExecLimits) -> Self {
        Self {
            snippet,
            dataset,
            limits,
            registry_override: None,
            options: ContextOptions::default(),
            session: None,
        }
    }

    /// Replace the registry for this attempt.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<AllowListRegistry>) -> Self {
        self.registry_override = Some(registry);
        self
    }

    /// Replace the context options for this attempt.
    #[must_use]
    pub fn with_options(mut self, options: ContextOptions) -> Self {
        self.options = options;
        self
    }

    /// Tag this attempt with its session.
    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }
}

/// Thread-safe set of in-flight attempt ids.
#[derive(Debug, Default)]
struct ActiveSet {
    ids: RwLock<BTreeSet<AttemptId>>,
}

impl ActiveSet {
    fn insert(&self, id: AttemptId) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        self.ids.write().expect("active set write lock poisoned").insert(id);
    }

    fn remove(&self, id: AttemptId) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        self.ids.write().expect("active set write lock poisoned").remove(&id);
    }

    fn len(&self) -> usize {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        self.ids.read().expect("active set read lock poisoned").len()
    }
}

/// Removes the attempt id even when the execute future is dropped.
struct ActiveGuard {
    set: Arc<ActiveSet>,
    id: AttemptId,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.set.remove(self.id);
    }
}

/// The orchestrator-facing sandbox engine.
///
/// All operations are safe to call concurrently; the registry and the
/// dataset handles inside requests are shared read-only.
pub struct SandboxEngine<B: WorkerBackend> {
    runner: AttemptRunner<B>,
    registry: Arc<AllowListRegistry>,
    active: Arc<ActiveSet>,
}

impl<B: WorkerBackend> SandboxEngine<B> {
    /// Create an engine using the built-in allow-list registry.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_registry(backend, Arc::new(AllowListRegistry::builtin().clone()))
    }

    /// Create an engine with an explicit default registry.
    #[must_use]
    pub fn with_registry(backend: B, registry: Arc<AllowListRegistry>) -> Self {
        Self {
            runner: AttemptRunner::new(backend),
            registry,
            active: Arc::new(ActiveSet::default()),
        }
    }

    /// Execute one attempt.
    ///
    /// Always returns a record — every failure is an `Outcome` value,
    /// never an error or panic across this boundary.
    pub async fn execute(&self, request: &ExecutionRequest) -> AttemptRecord {
        let id = AttemptId::new();
        self.active.insert(id);
        let _guard = ActiveGuard { set: Arc::clone(&self.active), id };

        if let Some(session) = request.session {
            tracing::debug!(attempt = %id, session = %session, "attempt accepted");
        }

        let registry = request
            .registry_override
            .as_deref()
            .unwrap_or(&self.registry);
        self.runner
            .execute_as(
                id,
                &request.snippet,
                &request.dataset,
                registry,
                &request.limits,
                &request.options,
            )
            .await
    }

    /// Return the number of currently in-flight attempts.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Check that the engine's backend can start workers.
    ///
    /// # Errors
    /// Propagates the backend's [`WorkerBackend::health_check`] errors.
    pub async fn health_check(&self) -> Result<(), ExecutorError> {
        self.runner.backend().health_check().await
    }
}
