//! Courier daemon implementation
//!
//! Background poll loop that drives the sync engine at a fixed interval.
//! Runs as a tokio async event loop with graceful shutdown on
//! SIGTERM/SIGINT and a command channel for external control.

use super::engine::SyncEngine;
use super::metrics;
use crate::integrations::{IssueTracker, PageStore};
use crate::Result;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Default poll interval (120 seconds)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Default event channel capacity (1000 events)
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Time between poll cycles
    pub poll_interval: Duration,

    /// Event broadcast channel capacity
    pub event_channel_capacity: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl DaemonConfig {
    /// Create a config with the given poll interval
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Default::default()
        }
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}

/// Events emitted by the courier daemon
#[derive(Debug, Clone)]
pub enum CourierEvent {
    /// Daemon started
    Started,

    /// Daemon stopped
    Stopped,

    /// Poll cycle started
    CycleStarted,

    /// Poll cycle completed
    CycleCompleted {
        /// Pages returned by the eligibility query
        eligible: usize,
        /// Pages mirrored into new records
        synced: usize,
        /// Pages skipped with a reason
        skipped: usize,
        /// Per-page errors
        errors: usize,
    },

    /// Error occurred
    Error {
        /// Error message
        message: String,
    },
}

/// Commands that can be sent to the courier daemon
#[derive(Debug, Clone)]
pub enum CourierCommand {
    /// Trigger an immediate sync cycle
    SyncNow,

    /// Stop the daemon
    Shutdown,

    /// Set poll interval
    SetPollInterval(Duration),
}

/// Result of handling a command
enum CommandResult {
    /// Continue running the daemon
    Continue,
    /// Stop the daemon
    Stop,
}

/// Courier daemon
///
/// Owns the sync engine and runs it on a fixed interval. Cycles never
/// overlap; a slow cycle simply delays the next tick.
pub struct SyncDaemon<S: PageStore, T: IssueTracker> {
    /// Configuration
    config: DaemonConfig,

    /// The engine driven each cycle
    engine: SyncEngine<S, T>,

    /// Event sender
    event_tx: broadcast::Sender<CourierEvent>,

    /// Command receiver
    command_rx: Option<mpsc::Receiver<CourierCommand>>,

    /// Command sender (for cloning)
    command_tx: mpsc::Sender<CourierCommand>,

    /// Running flag
    running: bool,
}

impl<S: PageStore, T: IssueTracker> SyncDaemon<S, T> {
    /// Create a new daemon around an engine
    pub fn new(engine: SyncEngine<S, T>, config: DaemonConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        let (command_tx, command_rx) = mpsc::channel(10);

        Self {
            config,
            engine,
            event_tx,
            command_rx: Some(command_rx),
            command_tx,
            running: false,
        }
    }

    /// Get an event subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<CourierEvent> {
        self.event_tx.subscribe()
    }

    /// Get a command sender
    pub fn command_sender(&self) -> mpsc::Sender<CourierCommand> {
        self.command_tx.clone()
    }

    /// Check if daemon is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Send an event, logging if dropped due to no receivers or channel full
    fn send_event(&self, event: CourierEvent) {
        match self.event_tx.send(event) {
            Ok(receiver_count) => {
                // Warn if getting close to capacity (80% threshold)
                let capacity = self.config.event_channel_capacity;
                let len = self.event_tx.len();
                if len > capacity * 80 / 100 {
                    tracing::warn!(
                        current = len,
                        capacity = capacity,
                        "Event channel nearing capacity"
                    );
                }
                if receiver_count == 0 {
                    tracing::debug!("Event sent but no receivers subscribed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Event dropped, no receivers");
            }
        }
    }

    /// Run the daemon event loop with graceful shutdown on SIGTERM/SIGINT
    ///
    /// The first cycle runs immediately; subsequent cycles follow the poll
    /// interval. Returns once a shutdown signal or command arrives.
    pub async fn run(&mut self) -> Result<()> {
        self.running = true;
        metrics::set_health_status(true);
        self.send_event(CourierEvent::Started);

        let mut interval = tokio::time::interval(self.config.poll_interval);

        let mut command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| crate::CourierError::Config("Daemon already running".to_string()))?;

        // Use platform-specific event loop
        #[cfg(unix)]
        {
            self.run_with_signals(&mut interval, &mut command_rx).await?;
        }

        #[cfg(not(unix))]
        {
            self.run_without_signals(&mut interval, &mut command_rx)
                .await?;
        }

        tracing::info!("Courier daemon shutdown complete");
        metrics::set_health_status(false);
        self.send_event(CourierEvent::Stopped);
        Ok(())
    }

    /// Run event loop with Unix signal handling (SIGTERM/SIGINT)
    #[cfg(unix)]
    async fn run_with_signals(
        &mut self,
        interval: &mut tokio::time::Interval,
        command_rx: &mut mpsc::Receiver<CourierCommand>,
    ) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            crate::CourierError::Other(format!("Failed to set up SIGTERM handler: {}", e))
        })?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
            crate::CourierError::Other(format!("Failed to set up SIGINT handler: {}", e))
        })?;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.running {
                        self.poll_cycle().await;
                    }
                }
                Some(cmd) = command_rx.recv() => {
                    match self.handle_command(cmd, interval).await {
                        CommandResult::Continue => {}
                        CommandResult::Stop => break,
                    }
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.running = false;
                    break;
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.running = false;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Run event loop without signal handling (non-Unix platforms)
    #[cfg(not(unix))]
    async fn run_without_signals(
        &mut self,
        interval: &mut tokio::time::Interval,
        command_rx: &mut mpsc::Receiver<CourierCommand>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.running {
                        self.poll_cycle().await;
                    }
                }
                Some(cmd) = command_rx.recv() => {
                    match self.handle_command(cmd, interval).await {
                        CommandResult::Continue => {}
                        CommandResult::Stop => break,
                    }
                }
            }
        }
        Ok(())
    }

    /// Handle a command
    async fn handle_command(
        &mut self,
        cmd: CourierCommand,
        interval: &mut tokio::time::Interval,
    ) -> CommandResult {
        match cmd {
            CourierCommand::SyncNow => {
                self.poll_cycle().await;
            }
            CourierCommand::Shutdown => {
                tracing::info!("Received shutdown command");
                self.running = false;
                return CommandResult::Stop;
            }
            CourierCommand::SetPollInterval(duration) => {
                *interval = tokio::time::interval(duration);
                self.config.poll_interval = duration;
                tracing::info!("Poll interval set to {:?}", duration);
            }
        }
        CommandResult::Continue
    }

    /// Execute a single poll cycle
    ///
    /// A cycle error is reported and swallowed; the next tick proceeds.
    async fn poll_cycle(&mut self) {
        self.send_event(CourierEvent::CycleStarted);

        let start = std::time::Instant::now();
        match self.engine.run_cycle().await {
            Ok(report) => {
                metrics::record_cycle_duration(start.elapsed().as_secs_f64());
                metrics::record_cycle(if report.has_errors() {
                    "partial"
                } else {
                    "success"
                });

                self.send_event(CourierEvent::CycleCompleted {
                    eligible: report.eligible,
                    synced: report.synced,
                    skipped: report.skipped,
                    errors: report.errors.len(),
                });
            }
            Err(e) => {
                metrics::record_cycle_duration(start.elapsed().as_secs_f64());
                metrics::record_cycle("error");
                tracing::error!("Poll cycle failed: {}", e);

                self.send_event(CourierEvent::Error {
                    message: format!("Poll cycle failed: {}", e),
                });
            }
        }
    }
}
