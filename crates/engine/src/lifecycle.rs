use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use common::{CandleSource, Config, MonitorConfig, Result, StatusBoard};
use notify::SignalDispatcher;

use crate::exchanges::SourceRegistry;
use crate::monitor::Monitor;

/// Owns every monitor until `start` hands them to tokio.
pub struct Engine {
    monitors: Vec<Monitor>,
    markets: Vec<(MonitorConfig, Arc<dyn CandleSource>)>,
    dispatcher: Arc<SignalDispatcher>,
    shutdown_grace: Duration,
}

/// Returned by [`Engine::start`]; stops and drains the running monitors.
pub struct EngineHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    dispatcher: Arc<SignalDispatcher>,
    shutdown_grace: Duration,
}

impl Engine {
    /// Resolve one source per monitor. Unknown exchanges fail here, before
    /// anything is spawned.
    pub fn build(
        config: &Config,
        sources: &SourceRegistry,
        dispatcher: Arc<SignalDispatcher>,
        board: StatusBoard,
    ) -> Result<Self> {
        let mut monitors = Vec::with_capacity(config.monitors.len());
        let mut markets = Vec::with_capacity(config.monitors.len());

        for monitor_cfg in &config.monitors {
            let source = sources.create(&monitor_cfg.exchange)?;
            markets.push((monitor_cfg.clone(), Arc::clone(&source)));
            monitors.push(Monitor::new(
                monitor_cfg.clone(),
                source,
                Arc::clone(&dispatcher),
                board.clone(),
            ));
        }

        Ok(Self {
            monitors,
            markets,
            dispatcher,
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// Assemble from ready-made monitors.
    pub fn from_monitors(
        monitors: Vec<Monitor>,
        dispatcher: Arc<SignalDispatcher>,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            monitors,
            markets: Vec::new(),
            dispatcher,
            shutdown_grace,
        }
    }

    /// Each monitor's configuration paired with its candle source.
    pub fn markets(&self) -> &[(MonitorConfig, Arc<dyn CandleSource>)] {
        &self.markets
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Spawn one task per monitor.
    pub fn start(self) -> EngineHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = self
            .monitors
            .into_iter()
            .map(|monitor| tokio::spawn(monitor.run(shutdown_rx.clone())))
            .collect::<Vec<_>>();
        info!(monitors = tasks.len(), "Engine started");

        EngineHandle {
            shutdown_tx,
            tasks,
            dispatcher: self.dispatcher,
            shutdown_grace: self.shutdown_grace,
        }
    }
}

impl EngineHandle {
    /// A receiver that flips to `true` when shutdown begins.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Stop scheduling cycles, let running cycles finish, then drain pending
    /// notifications. The whole sequence is bounded by the shutdown grace.
    pub async fn shutdown(self) {
        info!(grace_secs = self.shutdown_grace.as_secs(), "Engine shutting down");
        let _ = self.shutdown_tx.send(true);

        let deadline = Instant::now() + self.shutdown_grace;
        let mut tasks = self.tasks;
        if tokio::time::timeout_at(deadline, join_all(tasks.iter_mut()))
            .await
            .is_err()
        {
            let stuck = tasks.iter().filter(|t| !t.is_finished()).count();
            warn!(stuck, "Monitors did not stop within grace period; aborting");
            for task in &tasks {
                task.abort();
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let aborted = self.dispatcher.drain(remaining).await;
        info!(aborted_sends = aborted, "Engine stopped");
    }
}
