//! Random-walk ticker generator.
//!
//! [`TickerSynthesizer`] is an explicit service: construct it once, `start`
//! it, hand out subscriptions, and `stop` it (or drop it) on shutdown.

use crate::{
    error::{BoardError, Result},
    ticker::{push_capped, ProjectTickerDatum, TickerDelta},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

type Callback = Arc<dyn Fn(&[TickerDelta]) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Advances one project by one step and returns the full delta.
///
/// Profit moves ±5 %, margin ±0.02 (clamped to 0..=1), time saved by an
/// integer in -2..=2. PRs change by ±1 with probability 0.3 and app events
/// by -5..=4 with probability 0.2. The index point moves ±3 and stays in
/// 50..=200.
pub fn step<R: Rng + ?Sized>(
    datum: &mut ProjectTickerDatum,
    rng: &mut R,
    history: usize,
) -> TickerDelta {
    let profit = datum.profit + datum.profit * (rng.random::<f64>() * 0.1 - 0.05);
    let margin = (datum.margin + (rng.random::<f64>() * 0.04 - 0.02)).clamp(0.0, 1.0);
    let time_saved = datum.time_saved_hrs + (rng.random::<f64>() * 5.0 - 2.0).floor();

    let prs = if rng.random::<f64>() > 0.7 {
        let change = if rng.random::<f64>() > 0.5 { 1 } else { -1 };
        Some(datum.prs.unwrap_or(0) + change)
    } else {
        datum.prs
    };
    let app_events = if rng.random::<f64>() > 0.8 {
        let change = (rng.random::<f64>() * 10.0 - 5.0).floor() as i64;
        Some(datum.app_events.unwrap_or(0) + change)
    } else {
        datum.app_events
    };

    let last = datum.index_series.last().copied().unwrap_or(100.0);
    let index_point = (last + (rng.random::<f64>() * 6.0 - 3.0)).clamp(50.0, 200.0);

    datum.profit = profit;
    datum.margin = margin;
    datum.time_saved_hrs = time_saved;
    datum.prs = prs;
    datum.app_events = app_events;
    push_capped(&mut datum.index_series, index_point, history);

    TickerDelta {
        project_id: datum.project_id.clone(),
        profit: Some(profit),
        margin: Some(margin),
        time_saved_hrs: Some(time_saved),
        prs,
        app_events,
        index_point: Some(index_point),
    }
}

struct Shared {
    data: Mutex<Vec<ProjectTickerDatum>>,
    rng: Mutex<StdRng>,
    subscribers: Mutex<BTreeMap<u64, Callback>>,
    next_subscriber: AtomicU64,
    history: usize,
}

impl Shared {
    fn tick(&self) -> Vec<TickerDelta> {
        let deltas: Vec<TickerDelta> = {
            let mut data = lock(&self.data);
            let mut rng = lock(&self.rng);
            data.iter_mut()
                .map(|datum| step(datum, &mut *rng, self.history))
                .collect()
        };

        // listeners run outside the locks so they may subscribe or unsubscribe
        let listeners: Vec<Callback> = lock(&self.subscribers).values().cloned().collect();
        for listener in listeners {
            listener(&deltas);
        }
        deltas
    }
}

/// Handle returned by [`TickerSynthesizer::subscribe`].
///
/// Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.subscribers).remove(&self.id);
        }
    }
}

/// Synthesizes ticker deltas on a fixed interval
pub struct TickerSynthesizer {
    shared: Arc<Shared>,
    interval: Duration,
    running: Mutex<Option<CancellationToken>>,
}

impl TickerSynthesizer {
    pub fn new(initial: Vec<ProjectTickerDatum>, interval: Duration, history: usize) -> Self {
        Self::with_rng(initial, interval, history, StdRng::from_os_rng())
    }

    /// Uses the given generator, e.g. a seeded one for reproducible runs
    pub fn with_rng(
        initial: Vec<ProjectTickerDatum>,
        interval: Duration,
        history: usize,
        rng: StdRng,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                data: Mutex::new(initial),
                rng: Mutex::new(rng),
                subscribers: Mutex::new(BTreeMap::new()),
                next_subscriber: AtomicU64::new(0),
                history,
            }),
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.running).is_some()
    }

    /// Starts the interval task. Calling it again while running does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut running = lock(&self.running);
        if running.is_some() {
            return Ok(());
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| BoardError::Config(format!("ticker needs a tokio runtime: {e}")))?;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let shared = Arc::clone(&self.shared);
        let period = self.interval;

        handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        shared.tick();
                    }
                }
            }
            tracing::debug!("ticker synthesizer task finished");
        });

        tracing::info!(interval_ms = period.as_millis() as u64, "ticker synthesizer started");
        *running = Some(token);
        Ok(())
    }

    /// Stops the interval task. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(token) = lock(&self.running).take() {
            token.cancel();
            tracing::info!("ticker synthesizer stopped");
        }
    }

    /// Registers a listener called with every batch of deltas
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[TickerDelta]) + Send + Sync + 'static,
    {
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.subscribers).insert(id, Arc::new(callback));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.subscribers).len()
    }

    /// Advances every project one step and notifies listeners
    pub fn tick(&self) -> Vec<TickerDelta> {
        self.shared.tick()
    }

    /// Current data, in seed order
    pub fn snapshot(&self) -> Vec<ProjectTickerDatum> {
        lock(&self.shared.data).clone()
    }
}

impl Drop for TickerSynthesizer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::{seed::generate_seed, TickerBook};
    use std::sync::atomic::AtomicUsize;

    fn seeded(seed: u64) -> TickerSynthesizer {
        TickerSynthesizer::with_rng(
            generate_seed(),
            Duration::from_millis(3000),
            30,
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_step_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut datum = generate_seed().remove(0);

        for _ in 0..500 {
            let before_time = datum.time_saved_hrs;
            let before_profit = datum.profit;
            let delta = step(&mut datum, &mut rng, 30);

            assert!((0.0..=1.0).contains(&datum.margin));
            let point = delta.index_point.unwrap();
            assert!((50.0..=200.0).contains(&point));
            assert!((datum.time_saved_hrs - before_time).abs() <= 2.0);
            assert!((datum.profit - before_profit).abs() <= before_profit.abs() * 0.05 + 1e-9);
            assert_eq!(datum.index_series.len(), 30);
            assert_eq!(datum.index_series.last().copied(), Some(point));
        }
    }

    #[test]
    fn test_tick_emits_one_delta_per_project_in_order() {
        let synth = seeded(1);
        let deltas = synth.tick();
        let ids: Vec<_> = deltas.iter().map(|d| d.project_id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert!(deltas.iter().all(|d| d.profit.is_some() && d.index_point.is_some()));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        assert_eq!(seeded(42).tick(), seeded(42).tick());
    }

    #[test]
    fn test_listeners_track_snapshot() {
        let synth = seeded(3);
        let mut book = TickerBook::new(synth.snapshot(), 30);
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&received);
        let subscription = synth.subscribe(move |deltas| {
            lock(&sink).extend_from_slice(deltas);
        });
        synth.tick();
        synth.tick();

        book.apply(&lock(&received));
        assert_eq!(book.data(), synth.snapshot().as_slice());

        subscription.unsubscribe();
        assert_eq!(synth.subscriber_count(), 0);
        synth.tick();
        assert_eq!(lock(&received).len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_lifecycle() {
        let synth = seeded(9);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _subscription = synth.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        synth.start().unwrap();
        synth.start().unwrap();
        assert!(synth.is_running());

        tokio::time::sleep(Duration::from_millis(6100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        synth.stop();
        synth.stop();
        assert!(!synth.is_running());
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let synth = seeded(0);
        assert!(matches!(synth.start(), Err(BoardError::Config(_))));
    }
}
