//! Runs fetches and downloads off the UI thread and hands their results back.

use crate::{
    downloader::{DownloadRequest, MediaClient},
    error::{AppError, Result},
    logsink::LogSink,
    model::{MediaInfo, ProgressSample},
};
use std::{path::PathBuf, sync::Arc};
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, Receiver, Sender, error::TryRecvError},
};

/// Capacity of the worker -> UI channel
const CHANNEL_CAPACITY: usize = 256;

/// Messages from the worker, delivered in the order they were produced
#[derive(Debug)]
pub enum TaskEvent {
    Status(String),
    Progress(ProgressSample),
    FetchFinished(Result<MediaInfo>),
    DownloadFinished(Result<PathBuf>),
}

impl TaskEvent {
    fn is_terminal(&self) -> bool {
        matches!(self, TaskEvent::FetchFinished(_) | TaskEvent::DownloadFinished(_))
    }
}

pub struct TaskRunner {
    client: Arc<dyn MediaClient>,
    runtime: Handle,
    sink: LogSink,
    tx: Sender<TaskEvent>,
    rx: Receiver<TaskEvent>,
    busy: bool,
}

impl TaskRunner {
    pub fn new(client: Arc<dyn MediaClient>, runtime: Handle, sink: LogSink) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self { client, runtime, sink, tx, rx, busy: false }
    }

    /// True while a worker is alive
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    fn claim(&mut self) -> Result<()> {
        if self.busy {
            return Err(AppError::Busy);
        }
        self.busy = true;
        Ok(())
    }

    pub fn start_fetch(&mut self, url: String) -> Result<()> {
        self.claim()?;
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let sink = self.sink.clone();
        self.runtime.spawn(async move {
            let result = client.fetch_formats(&url).await;
            if let Err(e) = &result {
                sink.error(format!("ERROR: {e}"));
            }
            let _ = tx.send(TaskEvent::FetchFinished(result)).await;
        });
        Ok(())
    }

    pub fn start_download(&mut self, request: DownloadRequest) -> Result<()> {
        self.claim()?;
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let sink = self.sink.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(TaskEvent::Status(request.plan.status.clone())).await;

            let (progress_tx, mut progress_rx) = mpsc::channel::<ProgressSample>(CHANNEL_CAPACITY);
            let download = client.download(request, progress_tx);
            tokio::pin!(download);

            // forward progress until the download returns, then flush what is left
            let result = loop {
                tokio::select! {
                    biased;
                    Some(sample) = progress_rx.recv() => {
                        let _ = tx.send(TaskEvent::Progress(sample)).await;
                    }
                    result = &mut download => break result,
                }
            };
            while let Ok(sample) = progress_rx.try_recv() {
                let _ = tx.send(TaskEvent::Progress(sample)).await;
            }

            if let Err(e) = &result {
                sink.error(format!("DOWNLOAD ERROR: {e}"));
            }
            let _ = tx.send(TaskEvent::DownloadFinished(result)).await;
        });
        Ok(())
    }

    /// Drains everything queued since the last call. Called once per frame.
    pub fn poll(&mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    if event.is_terminal() {
                        self.busy = false;
                    }
                    events.push(event);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}
