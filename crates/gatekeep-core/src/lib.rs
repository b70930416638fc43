//! Gatekeep Core - licensing enforcement runtime
//!
//! This crate talks to the licensing service, keeps an authenticated session
//! verified in the background, runs the licensed workload as a controllable
//! task chain and downloads client updates.

mod announcement;
pub mod engine;
mod error;
pub mod transport;
mod update;
mod watchdog;

pub use announcement::*;
pub use engine::{
    ChainMode, ChainOptions, ChainRunner, DownloadHandle, Downloader, Operation, OperationRef,
    StepFailurePolicy, StepOutput,
};
pub use error::*;
pub use transport::{ApiClient, Endpoint, MirrorList, RequestOutcome};
pub use update::*;
pub use watchdog::*;

use gatekeep_types::{ClientConfig, CoreEvent, LoginType, Session, UpdateStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

/// Capacity of the event bus
const EVENT_CAPACITY: usize = 1000;

/// The main Gatekeep core instance
#[derive(Clone)]
pub struct GatekeepCore {
    config: Arc<ClientConfig>,
    api: ApiClient,
    /// Event broadcaster
    event_tx: broadcast::Sender<CoreEvent>,
    runner: ChainRunner,
    downloader: Downloader,
}

impl GatekeepCore {
    /// Create a new core from configuration
    pub fn new(config: ClientConfig) -> Result<Self, GatekeepError> {
        let api = ApiClient::new(&config)?;
        Self::with_client(config, api)
    }

    /// Create a core around an already configured client
    pub fn with_client(config: ClientConfig, api: ApiClient) -> Result<Self, GatekeepError> {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let runner = ChainRunner::new(event_tx.clone());
        let downloader = Downloader::new(event_tx.clone())?;

        Ok(Self {
            config: Arc::new(config),
            api,
            event_tx,
            runner,
            downloader,
        })
    }

    /// Subscribe to core events
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_tx.subscribe()
    }

    /// Emit an event
    pub fn emit(&self, event: CoreEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn runner(&self) -> &ChainRunner {
        &self.runner
    }

    // ========================================================================
    // Account Operations
    // ========================================================================

    /// Password login. The session is only accepted if an immediate status
    /// check with the new token succeeds.
    pub async fn login(&self, user_name: &str, password: &str) -> Result<Arc<Session>, GatekeepError> {
        let token = self.api.user_login(user_name, password).await?;

        if let Err(e) = self.api.check_user_status(user_name, &token).await {
            warn!(user = user_name, error = %e, "Permission check after login failed");
            return Err(GatekeepError::PermissionDenied(e.to_string()));
        }

        info!(user = user_name, "Logged in");
        Ok(Arc::new(Session::new(
            user_name,
            Some(password.to_string()),
            token,
            LoginType::Password,
        )))
    }

    /// Single-code login with a card
    pub async fn login_with_code(&self, card: &str) -> Result<Arc<Session>, GatekeepError> {
        let token = self.api.single_code_login(card).await?;
        info!("Logged in with single code");
        Ok(Arc::new(Session::new(card, None, token, LoginType::SingleCode)))
    }

    /// End a session on the service side
    pub async fn logout(&self, session: &Session) -> RequestOutcome {
        let outcome = self.api.user_logout(&session.principal, &session.token).await;
        match &outcome {
            Ok(_) => info!(principal = %session.principal, "Logged out"),
            Err(e) => warn!(principal = %session.principal, error = %e, "Logout failed"),
        }
        outcome
    }

    /// Register an account. The password doubles as the super password.
    pub async fn register(&self, user_name: &str, password: &str) -> RequestOutcome {
        self.api
            .user_register(user_name, password, password, "", None)
            .await
    }

    pub async fn recharge(&self, user_name: &str, card_password: &str) -> RequestOutcome {
        self.api.user_recharge(user_name, card_password).await
    }

    // ========================================================================
    // Watchdog
    // ========================================================================

    /// Start periodic verification of `session` at the configured interval
    pub fn start_watchdog(&self, session: Arc<Session>) -> WatchdogHandle {
        Watchdog::new(
            self.api.clone(),
            session,
            self.config.watchdog_interval(),
            self.runner.clone(),
            self.event_tx.clone(),
        )
        .spawn()
    }

    // ========================================================================
    // Task Chain
    // ========================================================================

    pub fn start_chain(
        &self,
        operations: Vec<OperationRef>,
        options: ChainOptions,
    ) -> Result<Uuid, GatekeepError> {
        Ok(self.runner.start(operations, options)?)
    }

    pub fn pause_chain(&self) {
        self.runner.pause();
    }

    pub fn resume_chain(&self) {
        self.runner.resume();
    }

    pub fn stop_chain(&self) {
        self.runner.stop();
    }

    /// Block until the chain worker exits
    pub fn wait_chain(&self) {
        self.runner.wait();
    }

    // ========================================================================
    // Updates and Downloads
    // ========================================================================

    pub async fn check_update(&self) -> Result<UpdateStatus, CallError> {
        check_update(&self.api).await
    }

    /// Download an update into the configured update directory
    pub fn start_update(&self, url: &str) -> Result<DownloadHandle, GatekeepError> {
        let destination = update_destination(&self.config.update_dir, url);
        self.download(url, destination)
    }

    pub fn download(
        &self,
        url: &str,
        destination: impl Into<PathBuf>,
    ) -> Result<DownloadHandle, GatekeepError> {
        Ok(self.downloader.start(url, destination)?)
    }

    // ========================================================================
    // Announcements
    // ========================================================================

    pub fn announcements(&self) -> AnnouncementWatcher {
        AnnouncementWatcher::new(self.api.clone(), self.event_tx.clone())
    }

    /// Poll announcements at the configured interval, starting now
    pub fn watch_announcements(&self) -> AnnouncementHandle {
        self.announcements()
            .spawn(self.config.announcement_interval())
    }
}
