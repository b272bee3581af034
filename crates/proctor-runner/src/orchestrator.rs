use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use proctor_core::{Expectation, LoadedManifest, TestCase};
use proctor_driver::{CancellationToken, Driver, ProcessorTransport};
use proctor_matcher::{compare, Difference};
use proctor_snapshot::SnapshotStore;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::RunConfig;
use crate::error::{ConfigError, TestError};
use crate::ids::RunId;
use crate::result::{RunResult, TestResult, TestStatus};
use crate::select::Selector;
use crate::sink::Reporter;

/// A selected test case with what it needs from its manifest.
#[derive(Clone, Debug)]
pub struct PlannedTest {
    pub case: TestCase,
    pub manifest: String,
    pub snapshot: Option<PathBuf>,
}

/// Runs test cases against a processor and aggregates their results.
pub struct Orchestrator<T> {
    worker: Worker<T>,
    config: RunConfig,
    selector: Selector,
}

impl<T: ProcessorTransport> Orchestrator<T> {
    pub fn new(
        driver: Driver<T>,
        snapshots: Arc<dyn SnapshotStore>,
        reporter: Arc<dyn Reporter>,
        config: RunConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let selector = Selector::new(config.filter.as_deref(), &config.tags);
        Ok(Self {
            worker: Worker {
                driver: Arc::new(driver),
                snapshots,
                reporter,
                update_snapshots: config.update_snapshots,
                allow_empty: config.allow_empty_expectations,
            },
            config,
            selector,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Eligible test cases in manifest order.
    pub fn plan(&self, manifests: &[LoadedManifest]) -> Vec<PlannedTest> {
        manifests
            .iter()
            .flat_map(|m| {
                m.test_cases()
                    .iter()
                    .filter(|tc| self.selector.matches(tc))
                    .map(move |tc| PlannedTest {
                        case: tc.clone(),
                        manifest: m.name().to_string(),
                        snapshot: m.snapshot_path(tc),
                    })
            })
            .collect()
    }

    pub async fn run(&self, manifests: &[LoadedManifest], cancel: &CancellationToken) -> RunResult {
        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id);
        self.run_plan(run_id, self.plan(manifests), cancel).instrument(span).await
    }

    async fn run_plan(&self, run_id: RunId, plan: Vec<PlannedTest>, cancel: &CancellationToken) -> RunResult {
        let total = plan.len();
        self.worker.reporter.start_suite(&run_id, total);
        info!(total, parallel = self.config.parallel, "run started");

        let started = Instant::now();
        let aggregate = Arc::new(Mutex::new(RunResult::new(run_id, total)));
        if self.config.parallel > 1 {
            self.run_parallel(plan, cancel, &aggregate).await;
        } else {
            self.run_sequential(plan, cancel, &aggregate).await;
        }

        let mut run = lock(&aggregate).clone();
        run.duration = started.elapsed();
        let summary = run.summary();
        self.worker.reporter.end_suite(&summary);
        info!(
            passed = run.passed,
            failed = run.failed,
            skipped = run.skipped,
            "run finished"
        );
        run
    }

    async fn run_sequential(&self, plan: Vec<PlannedTest>, cancel: &CancellationToken, aggregate: &Mutex<RunResult>) {
        for planned in plan {
            if cancel.is_cancelled() {
                self.worker.skip(&planned, aggregate);
                continue;
            }
            let result = self.worker.run(&planned, cancel).await;
            lock(aggregate).record(result);
        }
    }

    async fn run_parallel(
        &self,
        plan: Vec<PlannedTest>,
        cancel: &CancellationToken,
        aggregate: &Arc<Mutex<RunResult>>,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.config.parallel));
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<task::Id, (String, String)> = HashMap::new();
        for planned in plan {
            let permit = if cancel.is_cancelled() {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
                }
            };
            let Some(permit) = permit else {
                self.worker.skip(&planned, aggregate);
                continue;
            };

            let labels = (planned.case.name.clone(), planned.manifest.clone());
            let worker = self.worker.clone();
            let cancel = cancel.clone();
            let aggregate = Arc::clone(aggregate);
            let handle = tasks.spawn(
                async move {
                    let result = worker.run(&planned, &cancel).await;
                    drop(permit);
                    lock(&aggregate).record(result);
                }
                .in_current_span(),
            );
            in_flight.insert(handle.id(), labels);
        }
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, ())) => {
                    in_flight.remove(&id);
                }
                Err(e) => {
                    warn!(error = %e, "test task did not complete");
                    if let Some((name, manifest)) = in_flight.remove(&e.id()) {
                        let result = TestResult::failed(name, manifest, TestError::Aborted(e.to_string()));
                        self.worker.reporter.end_test(&result);
                        lock(aggregate).record(result);
                    }
                }
            }
        }
    }
}

struct Worker<T> {
    driver: Arc<Driver<T>>,
    snapshots: Arc<dyn SnapshotStore>,
    reporter: Arc<dyn Reporter>,
    update_snapshots: bool,
    allow_empty: bool,
}

impl<T> Clone for Worker<T> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            snapshots: Arc::clone(&self.snapshots),
            reporter: Arc::clone(&self.reporter),
            update_snapshots: self.update_snapshots,
            allow_empty: self.allow_empty,
        }
    }
}

struct Verdict {
    passed: bool,
    differences: Vec<Difference>,
    unmatched: Vec<Expectation>,
}

impl Verdict {
    fn pass() -> Self {
        Self {
            passed: true,
            differences: vec![],
            unmatched: vec![],
        }
    }
}

impl<T: ProcessorTransport> Worker<T> {
    async fn run(&self, planned: &PlannedTest, cancel: &CancellationToken) -> TestResult {
        let span = info_span!("test", name = %planned.case.name);
        async {
            self.reporter.start_test(&planned.case.name);

            let started = Instant::now();
            let outcome = self.execute(planned, cancel).await;
            let mut result = TestResult {
                name: planned.case.name.clone(),
                manifest: planned.manifest.clone(),
                status: TestStatus::Running,
                duration: started.elapsed(),
                error: None,
                differences: vec![],
                unmatched: vec![],
            };
            result.status = match outcome {
                Ok(verdict) => {
                    result.differences = verdict.differences;
                    result.unmatched = verdict.unmatched;
                    if verdict.passed {
                        TestStatus::Passed
                    } else {
                        TestStatus::Failed
                    }
                }
                Err(e) => {
                    warn!(error = %e, "test errored");
                    result.error = Some(e);
                    TestStatus::Failed
                }
            };
            debug_assert!(TestStatus::Running.can_advance_to(result.status));
            debug!(status = %result.status, duration = ?result.duration, "test finished");
            self.reporter.end_test(&result);
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, planned: &PlannedTest, cancel: &CancellationToken) -> Result<Verdict, TestError> {
        let case = &planned.case;
        if self.update_snapshots {
            if let Some(path) = &planned.snapshot {
                let actual = self.driver.execute(&case.request, cancel).await?;
                self.snapshots
                    .write(path, &actual)
                    .map_err(|e| TestError::SnapshotWrite {
                        path: path.clone(),
                        message: format!("{e:#}"),
                    })?;
                info!(path = %path.display(), responses = actual.len(), "snapshot updated");
                return Ok(Verdict::pass());
            }
        }

        let expectations = self.expectations(planned)?;
        if expectations.is_empty() && !self.allow_empty {
            return Err(TestError::NoExpectations);
        }

        let actual = self.driver.execute(&case.request, cancel).await?;
        if expectations.is_empty() {
            warn!("no expectations; passing without comparison");
            return Ok(Verdict::pass());
        }

        let report = compare(&expectations, &actual);
        Ok(Verdict {
            passed: report.passed,
            differences: report.differences,
            unmatched: report.unmatched,
        })
    }

    /// Inline expectations win over the snapshot file.
    fn expectations(&self, planned: &PlannedTest) -> Result<Vec<Expectation>, TestError> {
        if !planned.case.expectations.is_empty() {
            return Ok(planned.case.expectations.clone());
        }
        match &planned.snapshot {
            Some(path) => self.snapshots.read(path).map_err(|e| TestError::SnapshotRead {
                path: path.clone(),
                message: format!("{e:#}"),
            }),
            None => Ok(vec![]),
        }
    }

    fn skip(&self, planned: &PlannedTest, aggregate: &Mutex<RunResult>) {
        debug!(name = %planned.case.name, "run cancelled; test not started");
        let result = TestResult::skipped(&planned.case.name, &planned.manifest, Some(TestError::Cancelled));
        self.reporter.end_test(&result);
        lock(aggregate).record(result);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
