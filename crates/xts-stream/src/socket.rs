//! Simulated market-data socket.
//!
//! Emits fabricated ticks after `subscribe`. Connection lifecycle follows
//! the real socket: connect → subscribe → unsubscribe → disconnect.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xts_core::{InstrumentRef, Session, StreamEvent, StreamEventType};

use crate::error::{StreamError, StreamResult};

/// Base price of the fabricated touchline.
const BASE_PRICE: u64 = 22_500;

/// Price step per tick.
const PRICE_STEP: u64 = 5;

/// Socket configuration.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Socket URL (logged only; nothing is dialled).
    pub url: String,
    /// Delay between ticks.
    pub tick_interval: Duration,
    /// Ticks per subscription before the generator stops.
    pub max_ticks: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            tick_interval: Duration::from_millis(1000),
            max_ticks: 10,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Sandbox socket that pushes events into an mpsc channel.
pub struct SimulatedSocket {
    config: SocketConfig,
    user_id: String,
    state: Arc<RwLock<ConnectionState>>,
    event_tx: mpsc::Sender<StreamEvent>,
    subscriptions: RwLock<Vec<InstrumentRef>>,
    /// Cancelled on disconnect; replaced on connect.
    shutdown_token: Mutex<CancellationToken>,
    tick_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SimulatedSocket {
    /// Create a socket for an authenticated session.
    pub fn new(
        config: SocketConfig,
        session: &Session,
        event_tx: mpsc::Sender<StreamEvent>,
    ) -> StreamResult<Self> {
        if !session.is_authenticated() {
            return Err(StreamError::NotAuthenticated);
        }
        // tokio::time::interval panics on a zero period.
        if config.tick_interval.is_zero() {
            return Err(StreamError::InvalidConfig(
                "tick_interval must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            config,
            user_id: session.user_id().to_string(),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
            subscriptions: RwLock::new(Vec::new()),
            shutdown_token: Mutex::new(CancellationToken::new()),
            tick_tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Currently subscribed instruments.
    pub fn subscriptions(&self) -> Vec<InstrumentRef> {
        self.subscriptions.read().clone()
    }

    /// Mark connected and emit `CONNECTED`.
    pub async fn connect(&self) -> StreamResult<()> {
        *self.shutdown_token.lock() = CancellationToken::new();
        *self.state.write() = ConnectionState::Connected;

        info!(url = %self.config.url, user_id = %self.user_id, "Socket connected (sandbox)");
        self.emit(
            StreamEventType::Connected,
            format!("Connected (sandbox) to {}", self.config.url),
        )
        .await
    }

    /// Start the tick generator for `instruments`.
    ///
    /// When not connected, an `ERROR` event is emitted and
    /// [`StreamError::NotConnected`] returned.
    pub async fn subscribe(&self, instruments: &[InstrumentRef]) -> StreamResult<()> {
        if !self.is_connected() {
            self.emit(StreamEventType::Error, StreamError::NotConnected.to_string())
                .await?;
            return Err(StreamError::NotConnected);
        }

        {
            let mut subscriptions = self.subscriptions.write();
            for instrument in instruments {
                info!(instrument = %instrument, "Subscribed");
                if !subscriptions.contains(instrument) {
                    subscriptions.push(*instrument);
                }
            }
        }

        let cancel = self.shutdown_token.lock().child_token();
        let handle = tokio::spawn(run_ticks(
            self.event_tx.clone(),
            cancel,
            self.config.tick_interval,
            self.config.max_ticks,
        ));
        self.tick_tasks.lock().push(handle);
        Ok(())
    }

    /// Drop `instruments` from the subscription set.
    ///
    /// Tick generation stops once nothing is subscribed.
    pub async fn unsubscribe(&self, instruments: &[InstrumentRef]) -> StreamResult<()> {
        let remaining = {
            let mut subscriptions = self.subscriptions.write();
            subscriptions.retain(|s| !instruments.contains(s));
            subscriptions.len()
        };
        info!(count = instruments.len(), remaining, "Unsubscribed");

        if remaining == 0 {
            self.stop_ticks().await;
        }
        Ok(())
    }

    /// Cancel tick generation and mark disconnected.
    ///
    /// No event is emitted after this returns.
    pub async fn disconnect(&self) {
        self.shutdown_token.lock().cancel();
        *self.state.write() = ConnectionState::Disconnected;
        self.stop_ticks().await;
        self.subscriptions.write().clear();
        info!("Socket disconnected (sandbox)");
    }

    async fn stop_ticks(&self) {
        // Fresh token so a later subscribe still works while connected.
        let old = std::mem::replace(&mut *self.shutdown_token.lock(), CancellationToken::new());
        old.cancel();

        let tasks: Vec<JoinHandle<()>> = self.tick_tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Tick task ended abnormally");
            }
        }
    }

    async fn emit(&self, event_type: StreamEventType, message: String) -> StreamResult<()> {
        self.event_tx
            .send(StreamEvent::now(event_type, Some(message)))
            .await
            .map_err(|_| StreamError::ChannelClosed)
    }
}

impl Drop for SimulatedSocket {
    fn drop(&mut self) {
        self.shutdown_token.lock().cancel();
    }
}

async fn run_ticks(
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    interval: Duration,
    max_ticks: u32,
) {
    let mut ticker = tokio::time::interval(interval);

    for tick in 1..=u64::from(max_ticks) {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let touchline = format!(
            "NIFTY | Price: {} | Time: {}",
            BASE_PRICE + tick * PRICE_STEP,
            Local::now().format("%H:%M:%S")
        );
        let depth = format!("Depth snapshot #{tick}");

        for (event_type, message) in [
            (StreamEventType::Touchline, touchline),
            (StreamEventType::MarketDepth, depth),
        ] {
            if cancel.is_cancelled() {
                return;
            }
            if tx
                .send(StreamEvent::now(event_type, Some(message)))
                .await
                .is_err()
            {
                debug!("Event receiver dropped, stopping ticks");
                return;
            }
        }
    }
    debug!("Tick generator finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;
    use xts_core::ExchangeSegment;

    fn fast_config(max_ticks: u32) -> SocketConfig {
        SocketConfig {
            url: "wss://sandbox.invalid".to_string(),
            tick_interval: Duration::from_millis(5),
            max_ticks,
        }
    }

    fn session() -> Session {
        Session::authenticated("tok", "USER1")
    }

    fn reliance() -> InstrumentRef {
        InstrumentRef::new(ExchangeSegment::NseCm, 2885).unwrap()
    }

    #[test]
    fn test_requires_authenticated_session() {
        let (tx, _rx) = mpsc::channel(8);
        let result = SimulatedSocket::new(fast_config(1), &Session::anonymous(), tx);
        assert!(matches!(result, Err(StreamError::NotAuthenticated)));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let (tx, _rx) = mpsc::channel(8);
        let config = SocketConfig {
            tick_interval: Duration::ZERO,
            ..fast_config(1)
        };

        let result = SimulatedSocket::new(config, &session(), tx);
        assert!(matches!(result, Err(StreamError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_connect_emits_connected() {
        let (tx, mut rx) = mpsc::channel(8);
        let socket = SimulatedSocket::new(fast_config(1), &session(), tx).unwrap();

        socket.connect().await.unwrap();
        assert!(socket.is_connected());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, StreamEventType::Connected);
        assert!(event.message.unwrap().contains("wss://sandbox.invalid"));
    }

    #[tokio::test]
    async fn test_subscribe_before_connect_emits_error() {
        let (tx, mut rx) = mpsc::channel(8);
        let socket = SimulatedSocket::new(fast_config(1), &session(), tx).unwrap();

        let err = socket.subscribe(&[reliance()]).await.unwrap_err();
        assert!(matches!(err, StreamError::NotConnected));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, StreamEventType::Error);
        assert_eq!(event.message.as_deref(), Some("Socket not connected"));
    }

    #[tokio::test]
    async fn test_ticks_alternate_and_stop_at_max() {
        let (tx, mut rx) = mpsc::channel(64);
        let socket = SimulatedSocket::new(fast_config(3), &session(), tx).unwrap();
        socket.connect().await.unwrap();
        socket.subscribe(&[reliance()]).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().event_type, StreamEventType::Connected);

        let mut events = Vec::new();
        for _ in 0..6 {
            events.push(rx.recv().await.unwrap());
        }

        let first = events[0].message.as_deref().unwrap();
        assert_eq!(events[0].event_type, StreamEventType::Touchline);
        assert!(first.starts_with("NIFTY | Price: 22505 | Time: "));
        assert_eq!(events[1].event_type, StreamEventType::MarketDepth);
        assert_eq!(events[1].message.as_deref(), Some("Depth snapshot #1"));
        assert!(events[4]
            .message
            .as_deref()
            .unwrap()
            .starts_with("NIFTY | Price: 22515"));
        assert_eq!(events[5].message.as_deref(), Some("Depth snapshot #3"));

        // Generator finished: nothing more arrives.
        socket.disconnect().await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_disconnect_stops_events() {
        let (tx, mut rx) = mpsc::channel(1024);
        let socket = SimulatedSocket::new(fast_config(10_000), &session(), tx).unwrap();
        socket.connect().await.unwrap();
        socket.subscribe(&[reliance()]).await.unwrap();

        // CONNECTED plus at least one tick.
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();

        socket.disconnect().await;
        assert_eq!(socket.state(), ConnectionState::Disconnected);
        assert!(socket.subscriptions().is_empty());

        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_unsubscribe_last_instrument_stops_ticks() {
        let (tx, mut rx) = mpsc::channel(1024);
        let socket = SimulatedSocket::new(fast_config(10_000), &session(), tx).unwrap();
        socket.connect().await.unwrap();
        socket.subscribe(&[reliance()]).await.unwrap();
        rx.recv().await.unwrap();

        socket.unsubscribe(&[reliance()]).await.unwrap();
        assert!(socket.is_connected());
        assert!(socket.subscriptions().is_empty());

        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // Still connected, so a new subscription ticks again.
        socket.subscribe(&[reliance()]).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, StreamEventType::Touchline);
        socket.disconnect().await;
    }
}
