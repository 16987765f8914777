use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use common::{
    CandleSeries, CandleSource, Error, MonitorConfig, MonitorSnapshot, Result, SignalPayload,
    StatusBoard,
};
use gate::{Admission, SignalGate};
use notify::{DispatchReport, SignalDispatcher};
use strategy::SignalEngine;

/// Candles requested per fetch.
pub const CANDLE_LIMIT: usize = 100;

/// A heartbeat line is logged every this many cycles.
pub const HEARTBEAT_EVERY: u64 = 60;

/// Attempts per fetch; the pause doubles after each failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// What one cycle ended with.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Admitted and handed to the dispatcher.
    Fired(DispatchReport),
    /// Evaluated but held back by thresholds or cooldown.
    Held(Admission),
    /// No evaluation this cycle.
    Skipped(Error),
}

/// One symbol on one venue, evaluated on a fixed cadence.
pub struct Monitor {
    config: MonitorConfig,
    source: Arc<dyn CandleSource>,
    engine: SignalEngine,
    gate: SignalGate,
    dispatcher: Arc<SignalDispatcher>,
    board: StatusBoard,
    snapshot: MonitorSnapshot,
    retry: RetryPolicy,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn CandleSource>,
        dispatcher: Arc<SignalDispatcher>,
        board: StatusBoard,
    ) -> Self {
        let snapshot = MonitorSnapshot::new(&config.symbol, &config.exchange, &config.timeframe);
        Self {
            gate: SignalGate::new(config.trade.clone()),
            engine: SignalEngine::default(),
            config,
            source,
            dispatcher,
            board,
            snapshot,
            retry: RetryPolicy::default(),
            shutdown: None,
        }
    }

    pub fn with_engine(mut self, engine: SignalEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &MonitorSnapshot {
        &self.snapshot
    }

    /// Tick every `check_interval` until `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.shutdown = Some(shutdown.clone());
        info!(
            symbol = %self.config.symbol,
            exchange = %self.config.exchange,
            timeframe = %self.config.timeframe,
            interval_secs = self.config.check_interval.as_secs(),
            "Monitor started"
        );

        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle(Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(symbol = %self.config.symbol, cycles = self.snapshot.cycles, "Monitor stopped");
    }

    /// One full evaluation at `now`. Never fails: every error is logged and
    /// reported as [`CycleOutcome::Skipped`].
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleOutcome {
        self.snapshot.cycles += 1;
        let outcome = match self.evaluate_and_gate(now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    Error::InsufficientHistory { required, available } => {
                        warn!(symbol = %self.config.symbol, required, available, "Not enough candles; cycle skipped")
                    }
                    other => warn!(symbol = %self.config.symbol, error = %other, "Cycle failed; skipped"),
                }
                self.snapshot.last_error = Some(e.to_string());
                CycleOutcome::Skipped(e)
            }
        };

        if self.snapshot.cycles % HEARTBEAT_EVERY == 0 {
            info!(
                symbol = %self.config.symbol,
                cycles = self.snapshot.cycles,
                signals = self.snapshot.signals_sent,
                last_price = ?self.snapshot.last_price,
                "Heartbeat"
            );
        }

        self.snapshot.updated_at = Some(now);
        self.board.publish(self.snapshot.clone()).await;
        outcome
    }

    async fn evaluate_and_gate(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        let series = self.fetch_series().await?;
        let required = self.engine.required_candles();
        if series.len() < required {
            return Err(Error::InsufficientHistory {
                required,
                available: series.len(),
            });
        }
        let price = self.current_price(&series).await;

        let analysis = self
            .engine
            .analyze(&self.config.symbol, &series, price, &self.config.trade, now)?;
        let evaluation = &analysis.evaluation;

        self.snapshot.last_price = Some(price);
        self.snapshot.last_pattern = Some(evaluation.pattern);
        self.snapshot.last_confidence = Some(evaluation.confidence_score);
        self.snapshot.last_conditions = evaluation.conditions_met.clone();
        self.snapshot.last_error = None;

        let admission = self.gate.admit(evaluation, now);
        if !admission.is_accepted() {
            return Ok(CycleOutcome::Held(admission));
        }

        info!(
            symbol = %evaluation.symbol,
            price,
            pattern = %evaluation.pattern,
            confidence = evaluation.confidence_score,
            conditions = evaluation.conditions_met.len(),
            "Signal accepted"
        );

        let payload = SignalPayload::new(
            evaluation,
            &self.config.trade,
            &self.config.timeframe,
            analysis.notes(),
        );
        self.gate.record_fire(&evaluation.symbol, now);
        self.snapshot.last_signal_at = Some(now);
        self.snapshot.signals_sent += 1;

        let report = self.dispatcher.dispatch(&payload, self.shutdown.clone()).await;
        debug!(
            symbol = %payload.symbol,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            pending = report.pending.len(),
            "Dispatch finished"
        );
        Ok(CycleOutcome::Fired(report))
    }

    async fn fetch_series(&self) -> Result<CandleSeries> {
        let source = Arc::clone(&self.source);
        let (symbol, timeframe) = (&self.config.symbol, &self.config.timeframe);
        let candles = self
            .fetch_with_retry("candles", || source.get_candles(symbol, timeframe, CANDLE_LIMIT))
            .await?;
        Ok(CandleSeries::new(candles))
    }

    /// Ticker last price, or the latest close if the ticker stays unavailable.
    async fn current_price(&self, series: &CandleSeries) -> f64 {
        let source = Arc::clone(&self.source);
        let symbol = &self.config.symbol;
        match self.fetch_with_retry("ticker", || source.get_ticker(symbol)).await {
            Ok(ticker) => ticker.last,
            Err(e) => {
                let close = series.last().map_or(0.0, |c| c.close);
                warn!(symbol = %symbol, error = %e, fallback = close, "Ticker unavailable; using last close");
                close
            }
        }
    }

    async fn fetch_with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() && attempt < self.retry.attempts => {
                    warn!(
                        symbol = %self.config.symbol,
                        exchange = %self.source.name(),
                        what,
                        attempt,
                        error = %e,
                        "Fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
