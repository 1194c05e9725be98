// Orchestrator - bounded worker pool with per-test timeout, fail-fast, and
// heartbeat stall detection.

use super::runner::{TestExecutionResult, TestExecutionStatus, TestRunner};
use crate::parser;
use crate::report::Reporter;
use crate::state::{TestResult, TestResults};
use crate::utils::FileUtils;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::{AbortHandle, JoinSet};

/// Identifies a worker slot for heartbeat tracking. Not a thread id: workers
/// are tokio tasks, reused across the semaphore permits.
pub type WorkerId = u64;

/// Orchestrator tuning knobs, derived from CLI args at the call site.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub parallel_jobs: usize,
    pub test_timeout: Duration,
    pub fail_fast: bool,
    pub heartbeat_interval: Duration,
    pub heartbeat_stall_threshold: Duration,
}

impl OrchestratorConfig {
    pub fn new(parallel_jobs: usize, test_timeout: Duration, fail_fast: bool) -> Self {
        Self {
            parallel_jobs: parallel_jobs.max(1),
            test_timeout,
            fail_fast,
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_stall_threshold: Duration::from_secs(300),
        }
    }

    /// Resolve `--parallel auto|N`. Auto picks the available CPU count;
    /// an explicit request is capped at 2x that, to avoid oversubscribing
    /// the gRPC client's connection pool under a laptop-scale core count.
    pub fn resolve_parallel_jobs(requested: &str) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        if requested == "auto" {
            cpus
        } else {
            match requested.parse::<usize>() {
                Ok(n) if n > 0 => n.min(cpus * 2),
                _ => cpus,
            }
        }
    }
}

/// Outcome of a full orchestrated run.
pub struct OrchestratorOutcome {
    pub results: TestResults,
    /// True if the run stopped early (fail-fast trip or SIGINT/SIGTERM).
    pub cancelled: bool,
}

/// Bounded worker pool that executes `.gctf` test files concurrently.
pub struct Orchestrator {
    runner: Arc<TestRunner>,
    reporters: Arc<Vec<Box<dyn Reporter>>>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        runner: Arc<TestRunner>,
        reporters: Arc<Vec<Box<dyn Reporter>>>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            runner,
            reporters,
            config,
        }
    }

    /// Run every test file to completion (or until cancellation), returning
    /// an aggregate `TestResults` in the order tests finish.
    pub async fn run(&self, test_files: Vec<PathBuf>) -> Result<OrchestratorOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.parallel_jobs));
        let cancelled = Arc::new(AtomicBool::new(false));
        let heartbeats: Arc<Mutex<HashMap<WorkerId, Instant>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let workers: Arc<Mutex<HashMap<WorkerId, (AbortHandle, String)>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let force_timed_out: Arc<Mutex<HashSet<WorkerId>>> = Arc::new(Mutex::new(HashSet::new()));
        let next_worker_id = Arc::new(AtomicU64::new(0));

        let (forced_tx, mut forced_rx) = mpsc::unbounded_channel::<TestResult>();

        let watchdog = self.spawn_watchdog(
            heartbeats.clone(),
            workers.clone(),
            force_timed_out.clone(),
            forced_tx,
        );
        let shutdown = Self::spawn_shutdown_listener(cancelled.clone());

        let mut join_set: JoinSet<(WorkerId, TestResult)> = JoinSet::new();
        let mut results = TestResults::new();
        let mut pending = test_files.into_iter();
        let mut in_flight = 0usize;

        loop {
            while in_flight < self.config.parallel_jobs {
                let Some(file) = pending.next() else {
                    break;
                };

                if cancelled.load(Ordering::SeqCst) {
                    let name = file.to_string_lossy().to_string();
                    results.add(TestResult::skip(name, "run cancelled", 0));
                    continue;
                }

                let permit = semaphore.clone().acquire_owned().await?;
                let worker_id = next_worker_id.fetch_add(1, Ordering::SeqCst);
                heartbeats.lock().await.insert(worker_id, Instant::now());

                let runner = self.runner.clone();
                let reporters = self.reporters.clone();
                let heartbeats_task = heartbeats.clone();
                let cancelled_task = cancelled.clone();
                let timeout_dur = self.config.test_timeout;
                let fail_fast = self.config.fail_fast;
                let file_name = file.to_string_lossy().to_string();

                let abort_handle = join_set.spawn(async move {
                    let _permit = permit;
                    let result = Self::execute_one(
                        &runner,
                        &reporters,
                        &file,
                        timeout_dur,
                        worker_id,
                        &heartbeats_task,
                    )
                    .await;

                    if fail_fast && !matches!(result.status, crate::state::TestStatus::Pass) {
                        cancelled_task.store(true, Ordering::SeqCst);
                    }

                    heartbeats_task.lock().await.remove(&worker_id);
                    (worker_id, result)
                });

                workers
                    .lock()
                    .await
                    .insert(worker_id, (abort_handle, file_name));
                in_flight += 1;
            }

            if in_flight == 0 && forced_rx.is_empty() {
                break;
            }

            tokio::select! {
                joined = join_set.join_next(), if in_flight > 0 => {
                    match joined {
                        Some(Ok((worker_id, result))) => {
                            workers.lock().await.remove(&worker_id);
                            if !force_timed_out.lock().await.remove(&worker_id) {
                                results.add(result);
                            }
                            in_flight -= 1;
                        }
                        Some(Err(join_err)) => {
                            // Surfaces for both panics and our own watchdog-issued aborts.
                            // The forced TIMEOUT result was already recorded by the watchdog
                            // for the latter, so only record genuine panics here.
                            if !join_err.is_cancelled() {
                                results.add(TestResult::fail(
                                    "<worker task>",
                                    format!("worker task panicked: {}", join_err),
                                    0,
                                    None,
                                ));
                            }
                            in_flight -= 1;
                        }
                        None => {}
                    }
                }
                Some(forced) = forced_rx.recv() => {
                    results.add(forced);
                }
            }
        }

        watchdog.abort();
        shutdown.abort();

        Ok(OrchestratorOutcome {
            results,
            cancelled: cancelled.load(Ordering::SeqCst),
        })
    }

    async fn execute_one(
        runner: &TestRunner,
        reporters: &[Box<dyn Reporter>],
        file: &Path,
        timeout_dur: Duration,
        worker_id: WorkerId,
        heartbeats: &Mutex<HashMap<WorkerId, Instant>>,
    ) -> TestResult {
        let file_path_str = file.to_string_lossy().to_string();
        for r in reporters.iter() {
            r.on_test_start(&file_path_str);
        }

        let test_start = Instant::now();
        let outcome = tokio::time::timeout(timeout_dur, execute_test_file(runner, file)).await;
        heartbeats.lock().await.insert(worker_id, Instant::now());

        let mut test_result = match outcome {
            Ok(Ok(res)) => {
                let grpc_duration = res.grpc_duration_ms;
                match res.status {
                    TestExecutionStatus::Pass => {
                        TestResult::pass(file_path_str.clone(), 0, grpc_duration)
                    }
                    TestExecutionStatus::Fail(msg) => {
                        TestResult::fail(file_path_str.clone(), msg, 0, grpc_duration)
                    }
                }
            }
            Ok(Err(e)) => TestResult::fail(
                file_path_str.clone(),
                format!("Execution error: {}", e),
                0,
                None,
            ),
            Err(_) => TestResult::timeout(file_path_str.clone(), timeout_dur.as_millis() as u64),
        };
        test_result.duration_ms = test_start.elapsed().as_millis() as u64;

        for r in reporters.iter() {
            r.on_test_end(&file_path_str, &test_result);
        }

        test_result
    }

    /// A worker whose heartbeat is older than `heartbeat_stall_threshold` is
    /// force-terminated and the test recorded as TIMEOUT, rather than left
    /// to run indefinitely alongside the rest of the pool.
    fn spawn_watchdog(
        &self,
        heartbeats: Arc<Mutex<HashMap<WorkerId, Instant>>>,
        workers: Arc<Mutex<HashMap<WorkerId, (AbortHandle, String)>>>,
        force_timed_out: Arc<Mutex<HashSet<WorkerId>>>,
        forced_tx: mpsc::UnboundedSender<TestResult>,
    ) -> tokio::task::JoinHandle<()> {
        let interval_dur = self.config.heartbeat_interval;
        let stall_threshold = self.config.heartbeat_stall_threshold;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_dur);
            loop {
                ticker.tick().await;
                let now = Instant::now();

                let stalled: Vec<(WorkerId, u64)> = heartbeats
                    .lock()
                    .await
                    .iter()
                    .filter_map(|(worker_id, last_seen)| {
                        let stalled_for = now.duration_since(*last_seen);
                        (stalled_for > stall_threshold)
                            .then_some((*worker_id, stalled_for.as_millis() as u64))
                    })
                    .collect();

                for (worker_id, stalled_for_ms) in stalled {
                    let worker_entry = workers.lock().await.remove(&worker_id);
                    heartbeats.lock().await.remove(&worker_id);

                    let Some((abort_handle, file_name)) = worker_entry else {
                        continue;
                    };

                    tracing::warn!(
                        worker_id,
                        stalled_for_ms,
                        file = %file_name,
                        "worker heartbeat stale, force-terminating"
                    );

                    abort_handle.abort();
                    force_timed_out.lock().await.insert(worker_id);
                    let _ = forced_tx.send(TestResult::timeout(file_name, stalled_for_ms));
                }
            }
        })
    }

    fn spawn_shutdown_listener(cancelled: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("received interrupt signal, draining in-flight tests");
                cancelled.store(true, Ordering::SeqCst);
            }
        })
    }
}

/// Parse, validate and execute a single `.gctf` file, applying snapshot
/// updates (`--write`) when the runner captured a response for it.
pub async fn execute_test_file(runner: &TestRunner, file: &Path) -> Result<TestExecutionResult> {
    let doc = match parser::parse_gctf(file) {
        Ok(d) => d,
        Err(e) => {
            return Ok(TestExecutionResult::fail(
                format!("Parse error: {}", e),
                None,
            ))
        }
    };

    if let Err(e) = parser::validate_document(&doc) {
        return Ok(TestExecutionResult::fail(
            format!("Validation error: {}", e),
            None,
        ));
    }

    let result = runner.run_test(&doc).await?;

    if let Some(resp) = &result.captured_response {
        if let Err(e) = FileUtils::update_test_file(file, &doc, resp) {
            return Ok(TestExecutionResult::fail(
                format!("Failed to update test file: {}", e),
                None,
            ));
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_parallel_jobs_auto_uses_cpu_count() {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        assert_eq!(OrchestratorConfig::resolve_parallel_jobs("auto"), cpus);
    }

    #[test]
    fn resolve_parallel_jobs_caps_explicit_request() {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        let huge = (cpus * 100).to_string();
        assert_eq!(OrchestratorConfig::resolve_parallel_jobs(&huge), cpus * 2);
    }

    #[test]
    fn resolve_parallel_jobs_invalid_falls_back_to_cpu_count() {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        assert_eq!(OrchestratorConfig::resolve_parallel_jobs("bogus"), cpus);
    }
}
