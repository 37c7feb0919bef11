use crate::app::ports::EventSink;
use crate::error::{IngestError, Result};
use crate::types::EventMeta;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::{mpsc, Mutex};

/// Writes each payload as one line on stdout.
pub struct StdoutSink {
    out: Mutex<Stdout>,
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutSink {
    pub fn new() -> Self {
        Self { out: Mutex::new(tokio::io::stdout()) }
    }
}

#[async_trait]
impl EventSink for StdoutSink {
    async fn deliver(&self, raw: &str, _meta: Option<&EventMeta>) -> Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(raw.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

/// Appends each payload as one line to a newline-delimited JSON file.
pub struct NdjsonFileSink {
    file: Mutex<File>,
}

impl NdjsonFileSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self { file: Mutex::new(file) })
    }
}

#[async_trait]
impl EventSink for NdjsonFileSink {
    async fn deliver(&self, raw: &str, _meta: Option<&EventMeta>) -> Result<()> {
        let mut line = String::with_capacity(raw.len() + 1);
        line.push_str(raw);
        line.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Forwards payloads into a channel, for hosts that consume events in-process.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(String, Option<EventMeta>)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Option<EventMeta>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn deliver(&self, raw: &str, meta: Option<&EventMeta>) -> Result<()> {
        self.tx
            .send((raw.to_string(), meta.copied()))
            .map_err(|_| IngestError::Sink("receiver dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Origin;

    #[tokio::test]
    async fn ndjson_sink_appends_one_line_per_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/tweets.ndjson");

        let sink = NdjsonFileSink::open(&path).await.unwrap();
        sink.deliver(r#"{"id":1}"#, None).await.unwrap();
        sink.deliver(r#"{"id":2}"#, None).await.unwrap();
        drop(sink);

        let reopened = NdjsonFileSink::open(&path).await.unwrap();
        reopened.deliver(r#"{"id":3}"#, None).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "{\"id\":1}\n{\"id\":2}\n{\"id\":3}\n");
    }

    #[tokio::test]
    async fn channel_sink_forwards_payload_and_meta() {
        let (sink, mut rx) = ChannelSink::new();
        let meta = EventMeta { origin: Origin::Poll, item_id: 9 };
        sink.deliver("{}", Some(&meta)).await.unwrap();
        assert_eq!(rx.recv().await, Some(("{}".to_string(), Some(meta))));

        drop(rx);
        assert!(matches!(sink.deliver("{}", None).await, Err(IngestError::Sink(_))));
    }
}
