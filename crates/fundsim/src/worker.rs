//! Background worker for running simulations and sensitivity searches off the
//! calling thread, so the caller can enforce a deadline and cancel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fundsim_core::config::SimulationConfig;
use fundsim_core::model::{FundMetrics, FundSimulationResult, Investment};
use fundsim_core::sensitivity::{SensitivityConfig, SensitivityReport};
use fundsim_core::{RunProgress, SimulationError, analyze_sensitivity, simulate_fund};

/// Request sent to the background worker
#[derive(Debug)]
pub enum WorkerRequest {
    /// Run the fund simulation once
    Simulate {
        investments: Vec<Investment>,
        config: SimulationConfig,
    },
    /// Search for the adjustments that reach each target multiple
    Sensitivity {
        investments: Vec<Investment>,
        config: SimulationConfig,
        baseline: Option<FundMetrics>,
        targets: Vec<f64>,
        search: SensitivityConfig,
    },
    /// Graceful shutdown
    Shutdown,
}

/// Response from the background worker
#[derive(Debug)]
pub enum WorkerResponse {
    /// A search phase finished
    Progress { percent: f64, step: String },
    SimulationComplete(Box<FundSimulationResult>),
    SensitivityComplete(Box<SensitivityReport>),
    /// The run stopped at a cancellation check
    Cancelled,
    Error(String),
}

impl WorkerResponse {
    /// True for every response that ends a request
    pub fn is_final(&self) -> bool {
        !matches!(self, WorkerResponse::Progress { .. })
    }
}

/// Background worker that runs requests on a separate thread
pub struct SearchWorker {
    request_tx: Sender<WorkerRequest>,
    response_rx: Receiver<WorkerResponse>,
    cancel_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SearchWorker {
    pub fn new() -> Self {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));

        let ctx = WorkerContext {
            response_tx,
            cancel_flag: cancel_flag.clone(),
        };

        let thread = thread::spawn(move || {
            ctx.run(request_rx);
        });

        Self {
            request_tx,
            response_rx,
            cancel_flag,
            thread: Some(thread),
        }
    }

    /// Send a request to the worker
    pub fn send(&self, request: WorkerRequest) -> bool {
        // Clear cancel flag for new work
        self.cancel_flag.store(false, Ordering::SeqCst);
        self.request_tx.send(request).is_ok()
    }

    /// Try to receive a response (non-blocking)
    pub fn try_recv(&self) -> Option<WorkerResponse> {
        self.response_rx.try_recv().ok()
    }

    /// Block for at most `timeout` waiting for a response
    pub fn recv_timeout(&self, timeout: Duration) -> Result<WorkerResponse, RecvTimeoutError> {
        self.response_rx.recv_timeout(timeout)
    }

    /// Wait for the final response of the current request, forwarding progress
    /// to `on_progress`. Once `deadline` passes the run is cancelled and this
    /// keeps waiting for the worker to acknowledge.
    pub fn wait(
        &self,
        deadline: Option<Instant>,
        mut on_progress: impl FnMut(f64, &str),
    ) -> WorkerResponse {
        loop {
            let timeout = match deadline {
                Some(at) if !self.is_cancelled() => at.saturating_duration_since(Instant::now()),
                _ => Duration::from_millis(200),
            };

            match self.recv_timeout(timeout) {
                Ok(WorkerResponse::Progress { percent, step }) => on_progress(percent, &step),
                Ok(response) => return response,
                Err(RecvTimeoutError::Timeout) => {
                    if deadline.is_some_and(|at| Instant::now() >= at) && !self.is_cancelled() {
                        tracing::warn!("Deadline reached, cancelling run");
                        self.cancel();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return WorkerResponse::Error("worker thread stopped".to_string());
                }
            }
        }
    }

    /// Request cancellation of the current operation
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Shutdown the worker thread
    pub fn shutdown(&self) {
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
    }
}

impl Default for SearchWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.cancel();
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Shared state for the background worker thread.
struct WorkerContext {
    response_tx: Sender<WorkerResponse>,
    cancel_flag: Arc<AtomicBool>,
}

impl WorkerContext {
    fn run(&self, request_rx: Receiver<WorkerRequest>) {
        while let Ok(request) = request_rx.recv() {
            let response = match request {
                WorkerRequest::Shutdown => break,

                WorkerRequest::Simulate {
                    investments,
                    config,
                } => {
                    tracing::info!(
                        investments = investments.len(),
                        trials = config.trials,
                        "Starting fund simulation"
                    );
                    let progress = self.progress();
                    simulate_fund(&investments, &config, Some(&progress))
                        .map(|r| WorkerResponse::SimulationComplete(Box::new(r)))
                }

                WorkerRequest::Sensitivity {
                    investments,
                    config,
                    baseline,
                    targets,
                    search,
                } => {
                    tracing::info!(
                        investments = investments.len(),
                        targets = targets.len(),
                        "Starting sensitivity search"
                    );
                    let progress = self.progress();
                    analyze_sensitivity(
                        &investments,
                        &config,
                        baseline.as_ref(),
                        &targets,
                        &search,
                        Some(&progress),
                    )
                    .map(|r| WorkerResponse::SensitivityComplete(Box::new(r)))
                }
            };

            let response = response.unwrap_or_else(|e| match e {
                SimulationError::Cancelled => {
                    tracing::info!("Run cancelled");
                    WorkerResponse::Cancelled
                }
                e => {
                    tracing::error!(error = %e, "Run failed");
                    WorkerResponse::Error(e.to_string())
                }
            });
            if self.response_tx.send(response).is_err() {
                break;
            }
        }
    }

    /// Progress handle sharing the worker's cancel flag and streaming steps
    /// back as responses
    fn progress(&self) -> RunProgress {
        let tx = self.response_tx.clone();
        RunProgress::from_flag(self.cancel_flag.clone()).on_step(move |percent, step| {
            let _ = tx.send(WorkerResponse::Progress {
                percent,
                step: step.to_string(),
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundsim_core::InvestmentBuilder;
    use fundsim_core::config::FeeSchedule;

    fn diluted() -> Vec<Investment> {
        vec![
            InvestmentBuilder::certain("Diluted", 10.0)
                .check_size(1.0)
                .entry_valuation(4.0)
                .all_dilution(10.0)
                .build(),
        ]
    }

    fn certain_config() -> SimulationConfig {
        SimulationConfig {
            trials: 1,
            fees: FeeSchedule::none(),
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_round_trip() {
        let worker = SearchWorker::new();
        assert!(worker.send(WorkerRequest::Simulate {
            investments: diluted(),
            config: certain_config(),
        }));

        match worker.wait(None, |_, _| {}) {
            WorkerResponse::SimulationComplete(result) => {
                assert!((result.metrics.average_moic - 2.5 * 0.9_f64.powi(5)).abs() < 1e-12);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_sensitivity_streams_progress() {
        let worker = SearchWorker::new();
        worker.send(WorkerRequest::Sensitivity {
            investments: diluted(),
            config: certain_config(),
            baseline: None,
            targets: vec![2.0],
            search: SensitivityConfig::default(),
        });

        let mut steps = Vec::new();
        let response = worker.wait(None, |pct, _| steps.push(pct));
        assert!(matches!(response, WorkerResponse::SensitivityComplete(_)));
        assert_eq!(steps.len(), 6);
        assert!((steps[5] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_request_reports_error() {
        let worker = SearchWorker::new();
        worker.send(WorkerRequest::Sensitivity {
            investments: diluted(),
            config: certain_config(),
            baseline: None,
            targets: Vec::new(),
            search: SensitivityConfig::default(),
        });
        let response = worker.wait(None, |_, _| {});
        assert!(matches!(response, WorkerResponse::Error(_)));
        assert!(response.is_final());
    }

    #[test]
    fn test_elapsed_deadline_cancels() {
        let worker = SearchWorker::new();
        let investments: Vec<_> = (0..20)
            .map(|i| InvestmentBuilder::new(format!("Co{i}")).build())
            .collect();
        worker.send(WorkerRequest::Sensitivity {
            investments,
            config: SimulationConfig::default().with_trials(20_000),
            baseline: None,
            targets: vec![50.0, 100.0],
            search: SensitivityConfig {
                step_size: 1.0,
                ..Default::default()
            },
        });

        let response = worker.wait(Some(Instant::now()), |_, _| {});
        assert!(worker.is_cancelled());
        // A run can only finish before the first cancellation check if it is trivially short
        assert!(matches!(
            response,
            WorkerResponse::Cancelled | WorkerResponse::SensitivityComplete(_)
        ));
    }
}
