//! Worker-pool dispatch (§2): a bounded work queue per transport kind,
//! drained by a fixed pool of named OS threads sized by
//! `max_satellite_workers` (mirroring the idle sweep's own
//! single-purpose-thread style). LOCAL sessions never go through here —
//! they run synchronously on the main thread.
//!
//! Within a kind, a session's jobs always land on the same worker (sharded
//! by `session_id`), so two turns for one session can never run
//! concurrently — `StreamingState` and the history append order are only
//! safe under that single-worker-per-session invariant (§4.6, §4.5).

use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, SyncSender};
use std::thread::JoinHandle;
use std::sync::Arc;

use aura_domain::config::llm::LlmConfig;
use aura_providers::ProviderRegistry;
use aura_sessions::SessionHandle;
use aura_tools::ToolRegistry;

use crate::policy::AvailableCredentials;
use crate::turn::TurnContext;

/// Depth of each worker's queue before `submit` blocks the caller.
/// Back-pressure beats unbounded growth under a burst of connects.
const QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Satellite,
    LegacyNet,
    Web,
}

impl TransportKind {
    fn label(self) -> &'static str {
        match self {
            TransportKind::Satellite => "satellite",
            TransportKind::LegacyNet => "legacy",
            TransportKind::Web => "web",
        }
    }
}

/// One turn of work handed to the pool: a live session plus the utterance
/// that arrived on its transport.
pub struct Job {
    pub session: SessionHandle,
    pub user_text: String,
    pub image: Option<(String, Option<String>)>,
}

/// Everything a worker thread needs to build a `TurnContext`, constructed
/// once at startup and shared read-only across the whole pool.
pub struct SharedTurnDeps {
    pub providers: ProviderRegistry,
    pub tools: ToolRegistry,
    pub llm_defaults: LlmConfig,
    pub available_credentials: AvailableCredentials,
    pub max_tool_iterations: u32,
}

impl SharedTurnDeps {
    fn turn_context(&self) -> TurnContext<'_> {
        TurnContext {
            providers: &self.providers,
            tools: &self.tools,
            llm_defaults: &self.llm_defaults,
            available_credentials: &self.available_credentials,
            max_tool_iterations: self.max_tool_iterations,
        }
    }
}

/// A fixed set of named worker threads for one transport kind, each with
/// its own bounded channel. `submit` routes a job by `session_id %
/// worker_count`, so every turn for a given session is handled by the same
/// thread and never overlaps with another turn for that same session.
pub struct WorkQueue {
    senders: Vec<SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    pub fn spawn(kind: TransportKind, worker_count: usize, deps: Arc<SharedTurnDeps>) -> Self {
        let worker_count = worker_count.max(1);
        let mut senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);

        for i in 0..worker_count {
            let (sender, receiver) = sync_channel::<Job>(QUEUE_CAPACITY);
            let deps = deps.clone();
            let handle = std::thread::Builder::new()
                .name(format!("aura-worker-{}-{i}", kind.label()))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        let ctx = deps.turn_context();
                        if let Err(e) = crate::turn::run_turn(&ctx, &job.session, &job.user_text, job.image) {
                            tracing::error!(session_id = job.session.session_id, error = %e, "dispatched turn failed");
                        }
                    }
                })
                .expect("spawning worker thread");
            senders.push(sender);
            workers.push(handle);
        }

        Self { senders, workers }
    }

    /// Enqueues a turn on the worker that owns this session, blocking if
    /// that worker's queue is already at `QUEUE_CAPACITY`. Returns `false`
    /// if that worker thread has already exited.
    pub fn submit(&self, job: Job) -> bool {
        let shard = (job.session.session_id as usize) % self.senders.len();
        self.senders[shard].send(job).is_ok()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Drops every sender (closing each worker's channel) and joins all
    /// threads, so no turn is left mid-flight when this returns.
    fn shutdown(self) {
        drop(self.senders);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

/// One `WorkQueue` per transport kind, all sized by the same
/// `max_satellite_workers` bound (no config field distinguishes legacy/web
/// pool sizes from the satellite one).
pub struct Dispatcher {
    queues: HashMap<TransportKind, WorkQueue>,
}

impl Dispatcher {
    pub fn new(worker_count_per_kind: usize, deps: Arc<SharedTurnDeps>) -> Self {
        let mut queues = HashMap::new();
        for kind in [TransportKind::Satellite, TransportKind::LegacyNet, TransportKind::Web] {
            queues.insert(kind, WorkQueue::spawn(kind, worker_count_per_kind, deps.clone()));
        }
        Self { queues }
    }

    /// Submits a turn to the queue for `kind`. `false` means that kind's
    /// pool is gone (should not happen before shutdown).
    pub fn submit(&self, kind: TransportKind, job: Job) -> bool {
        match self.queues.get(&kind) {
            Some(queue) => queue.submit(job),
            None => false,
        }
    }

    pub fn worker_count(&self, kind: TransportKind) -> usize {
        self.queues.get(&kind).map(WorkQueue::worker_count).unwrap_or(0)
    }

    /// Closes every queue and blocks until every worker thread has drained
    /// its backlog and exited. Call before persisting session histories on
    /// shutdown, so no in-flight turn's messages are missed.
    pub fn shutdown(self) {
        for (_, queue) in self.queues {
            queue.shutdown();
        }
    }
}
