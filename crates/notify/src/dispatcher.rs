use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use common::{DispatchConfig, Error, NotificationChannel, Result, SignalPayload};

/// Per-channel outcome of one dispatch, as seen when `dispatch` returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
    /// Still running when the dispatch deadline or shutdown hit. These sends
    /// continue in the background and log their own outcome.
    pub pending: Vec<String>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty() && self.pending.is_empty()
    }
}

/// Fans a payload out to every configured channel, one task per channel.
pub struct SignalDispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    config: DispatchConfig,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl SignalDispatcher {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, config: DispatchConfig) -> Self {
        Self {
            channels,
            config,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Send `payload` to every channel concurrently.
    ///
    /// Waits at most `max_dispatch`, or until `shutdown` flips to `true`.
    pub async fn dispatch(
        &self,
        payload: &SignalPayload,
        mut shutdown: Option<watch::Receiver<bool>>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        if self.channels.is_empty() {
            warn!(symbol = %payload.symbol, "No notification channels configured; alert only logged");
            return report;
        }

        let payload = Arc::new(payload.clone());
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, bool)>();

        {
            let mut in_flight = self.lock_in_flight();
            in_flight.retain(|h| !h.is_finished());
            for (idx, channel) in self.channels.iter().enumerate() {
                let channel = Arc::clone(channel);
                let payload = Arc::clone(&payload);
                let result_tx = result_tx.clone();
                let config = self.config;
                in_flight.push(tokio::spawn(async move {
                    let delivered = match deliver(channel.as_ref(), &payload, config).await {
                        Ok(()) => {
                            info!(channel = %channel.name(), symbol = %payload.symbol, "Alert delivered");
                            true
                        }
                        Err(e) => {
                            error!(channel = %channel.name(), symbol = %payload.symbol, error = %e, "Alert delivery failed");
                            false
                        }
                    };
                    let _ = result_tx.send((idx, delivered));
                }));
            }
        }
        drop(result_tx);

        let mut outcomes: Vec<Option<bool>> = vec![None; self.channels.len()];
        let deadline = tokio::time::sleep(self.config.max_dispatch);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                result = result_rx.recv() => match result {
                    Some((idx, delivered)) => outcomes[idx] = Some(delivered),
                    None => break,
                },
                _ = &mut deadline => {
                    warn!(
                        symbol = %payload.symbol,
                        timeout_secs = self.config.max_dispatch.as_secs(),
                        "Dispatch deadline reached; remaining sends continue in background"
                    );
                    break;
                }
                _ = shutdown_requested(&mut shutdown) => {
                    warn!(symbol = %payload.symbol, "Shutdown during dispatch; remaining sends will be drained");
                    break;
                }
            }
        }

        for (channel, outcome) in self.channels.iter().zip(outcomes) {
            let name = channel.name().to_string();
            match outcome {
                Some(true) => report.delivered.push(name),
                Some(false) => report.failed.push(name),
                None => report.pending.push(name),
            }
        }
        report
    }

    /// Wait up to `grace` for background sends, then abort the rest.
    /// Returns the number of aborted sends.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.lock_in_flight())
            .into_iter()
            .filter(|h| !h.is_finished())
            .collect();
        if handles.is_empty() {
            return 0;
        }

        info!(in_flight = handles.len(), grace_secs = grace.as_secs(), "Draining notification sends");
        if tokio::time::timeout(grace, join_all(handles.iter_mut())).await.is_ok() {
            return 0;
        }

        let mut aborted = 0;
        for handle in handles.iter().filter(|h| !h.is_finished()) {
            handle.abort();
            aborted += 1;
        }
        warn!(aborted, "Grace period elapsed; aborted notification sends");
        aborted
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One attempt, and one retry after `retry_backoff` if it fails.
async fn deliver(
    channel: &dyn NotificationChannel,
    payload: &SignalPayload,
    config: DispatchConfig,
) -> Result<()> {
    match attempt(channel, payload, config.send_timeout).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(channel = %channel.name(), error = %e, "Send failed; retrying once");
            tokio::time::sleep(config.retry_backoff).await;
            attempt(channel, payload, config.send_timeout).await
        }
    }
}

async fn attempt(
    channel: &dyn NotificationChannel,
    payload: &SignalPayload,
    timeout: Duration,
) -> Result<()> {
    match tokio::time::timeout(timeout, channel.send(payload)).await {
        Ok(result) => result,
        Err(_) => Err(Error::notification(
            channel.name(),
            format!("timed out after {}s", timeout.as_secs_f64()),
        )),
    }
}

/// Resolves once the shutdown flag is set; never resolves without a receiver.
async fn shutdown_requested(shutdown: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = shutdown else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use common::{Pattern, SignalEvaluation, TradeConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `fail_first` calls, sleeps `delay` on every call.
    struct FakeChannel {
        name: &'static str,
        fail_first: usize,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeChannel {
        fn new(name: &'static str, fail_first: usize, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail_first,
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NotificationChannel for FakeChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, _payload: &SignalPayload) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.fail_first {
                Err(Error::notification(self.name, "boom"))
            } else {
                Ok(())
            }
        }
    }

    fn payload() -> SignalPayload {
        let eval = SignalEvaluation {
            symbol: "BTCUSD-PERP".into(),
            current_price: 94_350.0,
            pattern: Pattern::Hammer,
            conditions_met: vec!["Pattern: HAMMER".into()],
            confidence_score: 65,
            timestamp: Utc.with_ymd_and_hms(2024, 11, 5, 14, 0, 0).unwrap(),
        };
        SignalPayload::new(&eval, &TradeConfig::default(), "1h", "")
    }

    fn dispatcher(channels: Vec<Arc<dyn NotificationChannel>>) -> SignalDispatcher {
        SignalDispatcher::new(
            channels,
            DispatchConfig {
                send_timeout: Duration::from_secs(10),
                max_dispatch: Duration::from_secs(30),
                retry_backoff: Duration::from_millis(500),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn failing_channel_does_not_block_others() {
        let telegram = FakeChannel::new("telegram", usize::MAX, Duration::ZERO);
        let discord = FakeChannel::new("discord", 0, Duration::from_millis(50));
        let d = dispatcher(vec![telegram.clone(), discord.clone()]);

        let report = d.dispatch(&payload(), None).await;

        assert_eq!(report.delivered, vec!["discord"]);
        assert_eq!(report.failed, vec!["telegram"]);
        assert!(report.pending.is_empty());
        // one retry, no more
        assert_eq!(telegram.calls.load(Ordering::SeqCst), 2);
        assert_eq!(discord.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_then_success_counts_as_delivered() {
        let flaky = FakeChannel::new("webhook", 1, Duration::ZERO);
        let report = dispatcher(vec![flaky.clone()]).dispatch(&payload(), None).await;
        assert_eq!(report.delivered, vec!["webhook"]);
        assert!(report.all_delivered());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_channel_times_out_and_fails() {
        let hung = FakeChannel::new("n8n", 0, Duration::from_secs(3_600));
        let report = dispatcher(vec![hung.clone()]).dispatch(&payload(), None).await;
        assert_eq!(report.failed, vec!["n8n"]);
        assert_eq!(hung.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn max_dispatch_leaves_slow_sends_pending() {
        let slow = FakeChannel::new("slow", 0, Duration::from_secs(8));
        let d = SignalDispatcher::new(
            vec![slow.clone()],
            DispatchConfig {
                send_timeout: Duration::from_secs(10),
                max_dispatch: Duration::from_secs(2),
                retry_backoff: Duration::from_millis(500),
            },
        );

        let report = d.dispatch(&payload(), None).await;
        assert_eq!(report.pending, vec!["slow"]);

        assert_eq!(d.drain(Duration::from_secs(30)).await, 0);
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_waiting_and_drain_aborts() {
        let hung = FakeChannel::new("hung", 0, Duration::from_secs(3_600));
        let d = dispatcher(vec![hung]);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let report = d.dispatch(&payload(), Some(rx)).await;
        assert_eq!(report.pending, vec!["hung"]);
        assert_eq!(d.drain(Duration::from_secs(1)).await, 1);
    }

    #[tokio::test]
    async fn no_channels_is_an_empty_report() {
        let report = dispatcher(Vec::new()).dispatch(&payload(), None).await;
        assert_eq!(report, DispatchReport::default());
    }
}
