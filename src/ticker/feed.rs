//! Ticker source selection.
//!
//! [`TickerFeed`] hides where ticker data comes from: the static seed, an
//! owned [`TickerSynthesizer`], or the backend (REST snapshot plus a
//! WebSocket delta stream).

use crate::{
    api::ApiClient,
    config::{ClientConfig, MetricsSource},
    error::{BoardError, Result},
    ticker::{
        seed::generate_seed,
        synth::{Subscription, TickerSynthesizer},
        ProjectTickerDatum, TickerDelta,
    },
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::{CancellationToken, DropGuard};

pub const TICKER_PATH: &str = "/api/metrics/ticker";
pub const TICKER_WS_PATH: &str = "/ws/metrics/ticker";

/// `GET /api/metrics/ticker` answers either shape
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TickerPayload {
    Wrapped { items: Vec<ProjectTickerDatum> },
    Bare(Vec<ProjectTickerDatum>),
}

impl From<TickerPayload> for Vec<ProjectTickerDatum> {
    fn from(payload: TickerPayload) -> Self {
        match payload {
            TickerPayload::Wrapped { items } => items,
            TickerPayload::Bare(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Frame {
    Delta { deltas: Vec<TickerDelta> },
    #[serde(other)]
    Other,
}

/// Decodes one WebSocket text frame.
///
/// Returns `Ok(None)` for well-formed frames of other types.
pub fn parse_frame(text: &str) -> Result<Option<Vec<TickerDelta>>> {
    match serde_json::from_str::<Frame>(text)? {
        Frame::Delta { deltas } => Ok(Some(deltas)),
        Frame::Other => Ok(None),
    }
}

/// Decodes a ticker snapshot body
pub fn parse_ticker_payload(body: &str) -> Result<Vec<ProjectTickerDatum>> {
    Ok(serde_json::from_str::<TickerPayload>(body)?.into())
}

/// `GET /api/metrics/ticker`
pub async fn fetch_ticker_data(client: &ApiClient) -> Result<Vec<ProjectTickerDatum>> {
    let payload: TickerPayload = client.get_json(TICKER_PATH).await?;
    Ok(payload.into())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps a feed subscription alive; drop it to stop receiving deltas.
#[must_use = "dropping a feed subscription unsubscribes immediately"]
pub enum FeedSubscription {
    /// Static source, nothing to receive
    Inert,
    Synth(Subscription),
    Socket(DropGuard),
}

impl FeedSubscription {
    pub fn unsubscribe(self) {}
}

pub struct TickerFeed {
    source: MetricsSource,
    client: Arc<ApiClient>,
    ws_base_url: String,
    interval: Duration,
    history: usize,
    synth: Mutex<Option<Arc<TickerSynthesizer>>>,
    sockets: CancellationToken,
}

impl TickerFeed {
    pub fn new(config: &ClientConfig, client: Arc<ApiClient>) -> Self {
        Self {
            source: config.metrics_source,
            client,
            ws_base_url: config.ws_base_url.trim_end_matches('/').to_string(),
            interval: config.ticker_interval,
            history: config.ticker_history,
            synth: Mutex::new(None),
            sockets: CancellationToken::new(),
        }
    }

    pub fn source(&self) -> MetricsSource {
        self.source
    }

    pub fn ws_url(&self) -> String {
        format!("{}{}", self.ws_base_url, TICKER_WS_PATH)
    }

    /// The owned synthesizer, created and started on first use
    fn synthesizer(&self) -> Result<Arc<TickerSynthesizer>> {
        let mut slot = lock(&self.synth);
        if let Some(synth) = slot.as_ref() {
            return Ok(Arc::clone(synth));
        }
        let synth = Arc::new(TickerSynthesizer::new(
            generate_seed(),
            self.interval,
            self.history,
        ));
        synth.start()?;
        *slot = Some(Arc::clone(&synth));
        Ok(synth)
    }

    /// Current ticker data for the configured source.
    ///
    /// In `ws` mode a failed snapshot request falls back to the seed.
    pub async fn initial_data(&self) -> Result<Vec<ProjectTickerDatum>> {
        match self.source {
            MetricsSource::Static => Ok(generate_seed()),
            MetricsSource::Synth => Ok(self.synthesizer()?.snapshot()),
            MetricsSource::Ws => match fetch_ticker_data(&self.client).await {
                Ok(data) => Ok(data),
                Err(e) => {
                    tracing::warn!(error = %e, "ticker snapshot failed, using seed data");
                    Ok(generate_seed())
                }
            },
        }
    }

    /// Delivers every batch of deltas to `on_delta` until the returned
    /// subscription is dropped or the feed shuts down.
    pub fn subscribe<F>(&self, on_delta: F) -> Result<FeedSubscription>
    where
        F: Fn(&[TickerDelta]) + Send + Sync + 'static,
    {
        match self.source {
            MetricsSource::Static => Ok(FeedSubscription::Inert),
            MetricsSource::Synth => Ok(FeedSubscription::Synth(
                self.synthesizer()?.subscribe(on_delta),
            )),
            MetricsSource::Ws => {
                let handle = tokio::runtime::Handle::try_current().map_err(|e| {
                    BoardError::Config(format!("ticker socket needs a tokio runtime: {e}"))
                })?;
                let token = self.sockets.child_token();
                handle.spawn(run_socket(self.ws_url(), token.clone(), on_delta));
                Ok(FeedSubscription::Socket(token.drop_guard()))
            }
        }
    }

    /// Stops the synthesizer and closes every open socket
    pub fn shutdown(&self) {
        if let Some(synth) = lock(&self.synth).take() {
            synth.stop();
        }
        self.sockets.cancel();
    }
}

impl Drop for TickerFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_socket<F>(url: String, cancel: CancellationToken, on_delta: F)
where
    F: Fn(&[TickerDelta]) + Send + Sync + 'static,
{
    tracing::info!(url = %url, "connecting to ticker stream");

    let ws_stream = tokio::select! {
        _ = cancel.cancelled() => return,
        connected = connect_async(url.as_str()) => match connected {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                tracing::error!(error = %e, "ticker stream connection failed, no updates will be received");
                return;
            }
        },
    };
    tracing::info!("ticker stream connected");

    let (mut sink, mut stream) = ws_stream.split();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.close().await;
                tracing::info!("ticker stream closed");
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                    Ok(Some(deltas)) => on_delta(&deltas),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "skipping malformed ticker frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "backend closed ticker stream");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!(error = %e, "ticker stream receive error");
                    break;
                }
                None => break,
            },
        }
    }
}
