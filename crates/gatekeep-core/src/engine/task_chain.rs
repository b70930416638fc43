//! Task chain runner - executes a loopable sequence of operations
//!
//! Each operation receives the values produced by the previous one. The chain
//! runs on a dedicated worker thread and is controlled from the outside with
//! pause/resume/stop, which only flip a mode flag guarded by a mutex and
//! condition variable.

use crate::error::ChainError;
use gatekeep_types::CoreEvent;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a successful step produced
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    /// Text to display; the next step gets no parameters
    Display(String),
    /// Text to display plus the next step's parameters
    Chain { display: String, next: Vec<Value> },
}

impl StepOutput {
    pub fn display(text: impl Into<String>) -> Self {
        StepOutput::Display(text.into())
    }

    pub fn chain(display: impl Into<String>, next: Vec<Value>) -> Self {
        StepOutput::Chain {
            display: display.into(),
            next,
        }
    }
}

impl From<String> for StepOutput {
    fn from(text: String) -> Self {
        StepOutput::Display(text)
    }
}

impl From<&str> for StepOutput {
    fn from(text: &str) -> Self {
        StepOutput::Display(text.to_string())
    }
}

/// One step of a task chain
pub trait Operation: Send + Sync {
    fn invoke(&self, params: Vec<Value>) -> anyhow::Result<StepOutput>;
}

impl<F> Operation for F
where
    F: Fn(Vec<Value>) -> anyhow::Result<StepOutput> + Send + Sync,
{
    fn invoke(&self, params: Vec<Value>) -> anyhow::Result<StepOutput> {
        self(params)
    }
}

/// Shared handle to an operation
pub type OperationRef = Arc<dyn Operation>;

/// What the chain does when a step fails.
///
/// Every failure is published as an `Error: ...` display line first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepFailurePolicy {
    /// Drop the pending parameters and move on to the next step
    #[default]
    DropParamsAndContinue,
    /// Stop the chain after the failing step
    StopChain,
}

/// Options for a chain run
#[derive(Debug, Clone, Copy)]
pub struct ChainOptions {
    /// Restart from the first operation after the last one
    pub looping: bool,
    pub on_failure: StepFailurePolicy,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            looping: true,
            on_failure: StepFailurePolicy::default(),
        }
    }
}

/// Execution mode of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    Running,
    Paused,
    Stopped,
}

/// Mode flag shared between the worker and its controllers
struct Control {
    state: Mutex<ControlState>,
    changed: Condvar,
}

struct ControlState {
    mode: ChainMode,
    /// Set once the worker has left its loop
    finished: bool,
}

impl Control {
    fn new() -> Self {
        Self {
            state: Mutex::new(ControlState {
                mode: ChainMode::Running,
                finished: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn mode(&self) -> ChainMode {
        self.state.lock().mode
    }

    /// Set the mode unless the chain already stopped. Stopped is terminal.
    fn set(&self, next: ChainMode) {
        let mut state = self.state.lock();
        if state.mode != ChainMode::Stopped {
            state.mode = next;
        }
        self.changed.notify_all();
    }

    /// Block while paused. Returns false once the chain is stopped.
    fn wait_runnable(&self) -> bool {
        let mut state = self.state.lock();
        while state.mode == ChainMode::Paused {
            self.changed.wait(&mut state);
        }
        state.mode == ChainMode::Running
    }

    fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    fn mark_finished(&self) {
        let mut state = self.state.lock();
        state.mode = ChainMode::Stopped;
        state.finished = true;
        self.changed.notify_all();
    }

    fn wait_finished(&self) {
        let mut state = self.state.lock();
        while !state.finished {
            self.changed.wait(&mut state);
        }
    }
}

/// Marks the worker finished when it exits, unwinding included
struct FinishGuard(Arc<Control>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

struct ActiveChain {
    run_id: Uuid,
    control: Arc<Control>,
    /// Taken by the first waiter to join the thread
    worker: Option<JoinHandle<()>>,
}

/// Runs one task chain at a time
#[derive(Clone)]
pub struct ChainRunner {
    active: Arc<Mutex<Option<ActiveChain>>>,
    event_tx: broadcast::Sender<CoreEvent>,
}

impl ChainRunner {
    pub fn new(event_tx: broadcast::Sender<CoreEvent>) -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            event_tx,
        }
    }

    /// Start a chain on a fresh worker thread
    pub fn start(
        &self,
        operations: Vec<OperationRef>,
        options: ChainOptions,
    ) -> Result<Uuid, ChainError> {
        if operations.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut active = self.active.lock();
        if let Some(chain) = active.as_ref() {
            if !chain.control.is_finished() {
                return Err(ChainError::AlreadyRunning);
            }
        }
        if let Some(worker) = active.take().and_then(|finished| finished.worker) {
            let _ = worker.join();
        }

        let run_id = Uuid::new_v4();
        let control = Arc::new(Control::new());
        let worker = {
            let guard = FinishGuard(Arc::clone(&control));
            let event_tx = self.event_tx.clone();
            thread::Builder::new()
                .name(format!("task-chain-{}", run_id))
                .spawn(move || run_chain(run_id, operations, options, guard, event_tx))?
        };

        info!(%run_id, looping = options.looping, "Task chain started");
        *active = Some(ActiveChain {
            run_id,
            control,
            worker: Some(worker),
        });
        Ok(run_id)
    }

    /// Stop starting new steps until resumed
    pub fn pause(&self) {
        if let Some(chain) = self.active.lock().as_ref() {
            chain.control.set(ChainMode::Paused);
            info!(run_id = %chain.run_id, "Task chain paused");
        }
    }

    pub fn resume(&self) {
        if let Some(chain) = self.active.lock().as_ref() {
            chain.control.set(ChainMode::Running);
            info!(run_id = %chain.run_id, "Task chain resumed");
        }
    }

    /// Ask the worker to exit. A step already in progress runs to completion.
    pub fn stop(&self) {
        if let Some(chain) = self.active.lock().as_ref() {
            chain.control.set(ChainMode::Stopped);
            info!(run_id = %chain.run_id, "Task chain stop requested");
        }
    }

    /// Block until the current worker has exited.
    ///
    /// The chain stays registered while waiting, so pause/resume/stop from
    /// other threads still reach it.
    pub fn wait(&self) {
        let (run_id, control, worker) = {
            let mut active = self.active.lock();
            let Some(chain) = active.as_mut() else {
                return;
            };
            (chain.run_id, Arc::clone(&chain.control), chain.worker.take())
        };

        control.wait_finished();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!(%run_id, "Task chain worker panicked");
            }
        }

        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|chain| chain.run_id == run_id) {
            *active = None;
        }
    }

    /// Stop the chain and wait for the worker to exit
    pub fn stop_and_wait(&self) {
        self.stop();
        self.wait();
    }

    /// Mode of the current chain, if one was started and not yet waited on
    pub fn mode(&self) -> Option<ChainMode> {
        self.active.lock().as_ref().map(|chain| chain.control.mode())
    }

    pub fn is_paused(&self) -> bool {
        self.mode() == Some(ChainMode::Paused)
    }

    /// Whether a worker is still executing
    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|chain| !chain.control.is_finished())
            .unwrap_or(false)
    }
}

fn run_chain(
    run_id: Uuid,
    operations: Vec<OperationRef>,
    options: ChainOptions,
    guard: FinishGuard,
    event_tx: broadcast::Sender<CoreEvent>,
) {
    let control = &guard.0;
    let emit = |text: String| {
        let _ = event_tx.send(CoreEvent::ChainOutput { run_id, text });
    };

    let mut cursor = 0;
    let mut pending: Vec<Value> = Vec::new();

    while control.wait_runnable() {
        let params = std::mem::take(&mut pending);
        debug!(%run_id, step = cursor, params = params.len(), "Invoking operation");

        let operation = &operations[cursor];
        let result = panic::catch_unwind(AssertUnwindSafe(|| operation.invoke(params)))
            .unwrap_or_else(|payload| Err(anyhow::anyhow!(panic_message(payload.as_ref()))));

        match result {
            Ok(StepOutput::Display(text)) => emit(text),
            Ok(StepOutput::Chain { display, next }) => {
                emit(display);
                pending = next;
            }
            Err(e) => {
                warn!(%run_id, step = cursor, error = %e, "Operation failed");
                emit(format!("Error: {:#}", e));
                match options.on_failure {
                    StepFailurePolicy::DropParamsAndContinue => {}
                    StepFailurePolicy::StopChain => control.set(ChainMode::Stopped),
                }
            }
        }

        cursor += 1;
        if cursor >= operations.len() {
            if options.looping {
                cursor = 0;
            } else {
                control.set(ChainMode::Stopped);
            }
        }
    }

    info!(%run_id, "Task chain finished");
    let _ = event_tx.send(CoreEvent::ChainFinished { run_id });
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("operation panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("operation panicked: {}", s)
    } else {
        "operation panicked".to_string()
    }
}
