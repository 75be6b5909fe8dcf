//! Main application orchestration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use indexmap::IndexMap;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use xts_client::{
    authenticate, BarSummary, BatchRetriever, DynTransport, HttpTransport, InstrumentFetcher,
};
use xts_core::Session;
use xts_persistence::{CsvLogWriter, StreamRecorder};
use xts_stream::{SimulatedSocket, SocketConfig};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Stream event channel capacity.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// What one run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Batch files written, by instrument name.
    pub batch_files: IndexMap<String, PathBuf>,
    /// Instruments whose retrieval failed, with the error text.
    pub failures: IndexMap<String, String>,
    /// Stream log path, when streaming ran.
    pub stream_log: Option<PathBuf>,
    /// Stream events recorded.
    pub stream_events: u64,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    transport: DynTransport,
    writer: CsvLogWriter,
}

impl Application {
    /// Create the application with the HTTP transport.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let transport = HttpTransport::new(config.base_url.clone(), config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create the application over any transport.
    pub fn with_transport(config: AppConfig, transport: DynTransport) -> AppResult<Self> {
        config.validate()?;
        let writer = CsvLogWriter::new(&config.data_dir);
        Ok(Self {
            config,
            transport,
            writer,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Login, batch download, then stream if enabled.
    pub async fn run(&self) -> AppResult<RunReport> {
        let credentials = self.config.credentials()?;

        info!("Market data login");
        let session = match authenticate(self.transport.as_ref(), &credentials).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(e.into());
            }
        };

        let mut report = self.run_batch(&session).await?;

        if self.config.stream.enabled {
            let (path, events) = self.run_stream(&session).await?;
            report.stream_log = Some(path);
            report.stream_events = events;
        } else {
            info!("Streaming disabled");
        }

        info!(
            files = report.batch_files.len(),
            failures = report.failures.len(),
            stream_events = report.stream_events,
            "Run complete"
        );
        Ok(report)
    }

    /// Download the configured universe and write one file per instrument
    /// that returned bars.
    pub async fn run_batch(&self, session: &Session) -> AppResult<RunReport> {
        let universe = self.config.universe()?;
        let granularity = self.config.granularity()?;
        let end = Local::now();
        let start = self.config.lookback_start(end)?;

        let retriever = BatchRetriever::new(InstrumentFetcher::new(self.transport.clone()));
        let results = retriever
            .retrieve(session, &universe, start, end, granularity)
            .await?;

        let mut report = RunReport {
            failures: results.failures.clone(),
            ..RunReport::default()
        };

        for (name, bars) in &results.bars {
            if bars.is_empty() {
                continue;
            }
            let path = self
                .writer
                .write_batch(name, bars, start, end, granularity)?;
            report.batch_files.insert(name.clone(), path);
        }

        for summary in BatchRetriever::summarize(&results) {
            match summary {
                BarSummary::Last { name, bars, last } => info!(
                    instrument = %name,
                    bars,
                    time = %last.timestamp(),
                    open = %last.open(),
                    high = %last.high(),
                    low = %last.low(),
                    close = %last.close(),
                    volume = last.volume(),
                    "Last bar"
                ),
                BarSummary::NoData { name } => info!(instrument = %name, "No data available"),
            }
        }
        for (name, reason) in &results.failures {
            warn!(instrument = %name, error = %reason, "No data retrieved");
        }

        Ok(report)
    }

    /// Stream sandbox ticks into a fresh stream log for the configured
    /// duration. Returns the log path and the number of events recorded.
    pub async fn run_stream(&self, session: &Session) -> AppResult<(PathBuf, u64)> {
        let stream = &self.config.stream;
        let instruments = self.config.stream_instruments()?;

        let path = self.writer.ensure_stream_log(Local::now())?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let recorder = tokio::spawn(StreamRecorder::new(self.writer.clone(), path.clone()).run(rx));

        let socket = SimulatedSocket::new(
            SocketConfig {
                url: self.config.socket_url.clone(),
                tick_interval: Duration::from_millis(stream.tick_interval_ms),
                max_ticks: stream.max_ticks,
            },
            session,
            tx,
        )?;

        socket.connect().await?;
        if let Err(e) = socket.subscribe(&instruments).await {
            warn!(error = %e, "Subscribe failed");
        }

        info!(seconds = stream.duration_secs, path = %path.display(), "Streaming");
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(stream.duration_secs)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping stream");
            }
        }

        socket.unsubscribe(&instruments).await?;
        socket.disconnect().await;
        // Last sender goes with the socket; the recorder then drains and exits.
        drop(socket);

        let events = recorder
            .await
            .map_err(|e| AppError::Task(format!("stream recorder: {e}")))?;
        info!(events, "Streaming complete");
        Ok((path, events))
    }
}
