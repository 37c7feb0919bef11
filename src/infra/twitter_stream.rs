//! Client for the v1.1 streaming endpoints (`statuses/sample`, `statuses/filter`).
//!
//! The connection runs on its own task. The body is newline-delimited JSON;
//! each message is classified into a [`StreamEvent`] and handed to every
//! registered listener in turn, so a listener parked at the pause gate holds
//! the connection's read loop. Transport failures are reported to listeners as
//! `Exception` and followed by a reconnect with doubling back-off.

use crate::app::ports::{StreamClient, StreamListener};
use crate::constants;
use crate::error::{IngestError, Result};
use crate::infra::http_client::{build_client, error_for_status};
use crate::metrics::StreamMetrics;
use crate::types::{FilterQuery, StallWarning, StreamEvent, Tweet};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Clone)]
enum Endpoint {
    Sample,
    Filter(Vec<(&'static str, String)>),
}

impl Endpoint {
    fn name(&self) -> &'static str {
        match self {
            Endpoint::Sample => "sample",
            Endpoint::Filter(_) => "filter",
        }
    }
}

type Listeners = Arc<Mutex<Vec<Arc<dyn StreamListener>>>>;

#[derive(Clone)]
struct Connection {
    client: reqwest::Client,
    sample_url: String,
    filter_url: String,
    listeners: Listeners,
    backoff: Backoff,
}

/// Reconnect delay: starts at `initial`, doubles after each failed attempt up
/// to `max`, and drops back to `initial` once a connection is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(constants::STREAM_RECONNECT_INITIAL_SECS),
            max: Duration::from_secs(constants::STREAM_RECONNECT_MAX_SECS),
        }
    }
}

impl Backoff {
    pub fn next(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

pub struct HttpStreamClient {
    conn: Connection,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HttpStreamClient {
    pub fn new(
        sample_url: impl Into<String>,
        filter_url: impl Into<String>,
        bearer_token: &str,
    ) -> Result<Self> {
        let client = build_client(bearer_token, None)?;
        let (stop, _) = watch::channel(false);
        Ok(Self {
            conn: Connection {
                client,
                sample_url: sample_url.into(),
                filter_url: filter_url.into(),
                listeners: Arc::new(Mutex::new(Vec::new())),
                backoff: Backoff::default(),
            },
            stop,
            task: Mutex::new(None),
        })
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.conn.backoff = backoff;
        self
    }

    fn spawn(&self, endpoint: Endpoint) {
        // Opening a new stream replaces the one in flight.
        if let Some(previous) = self.take_task() {
            previous.abort();
        }
        self.stop.send_replace(false);

        let conn = self.conn.clone();
        let stop = self.stop.subscribe();
        let span = info_span!("stream", endpoint = endpoint.name());
        let handle = tokio::spawn(run_connection(conn, endpoint, stop).instrument(span));
        *self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
    }

    fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take()
    }
}

#[async_trait]
impl StreamClient for HttpStreamClient {
    fn add_listener(&self, listener: Arc<dyn StreamListener>) {
        self.conn
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    async fn sample(&self) -> Result<()> {
        self.spawn(Endpoint::Sample);
        Ok(())
    }

    async fn filter(&self, filter: &FilterQuery) -> Result<()> {
        if filter.is_empty() {
            return Err(IngestError::Config(
                "filter stream needs at least one of track, follow or locations".into(),
            ));
        }
        self.spawn(Endpoint::Filter(filter.to_form_params()));
        Ok(())
    }

    async fn shutdown(&self) {
        self.stop.send_replace(true);
        if let Some(mut handle) = self.take_task() {
            if tokio::time::timeout(Duration::from_secs(5), &mut handle).await.is_err() {
                warn!("stream task did not stop in time, aborting it");
                handle.abort();
            }
        }
    }
}

async fn run_connection(conn: Connection, endpoint: Endpoint, mut stop: watch::Receiver<bool>) {
    let mut backoff = conn.backoff.initial;

    loop {
        if *stop.borrow() {
            break;
        }
        // Ok only when asked to stop; a body that simply ends is an error.
        match read_stream(&conn, &endpoint, &mut stop, &mut backoff).await {
            Ok(()) => break,
            Err(e) => dispatch(&conn.listeners, StreamEvent::Exception(e.to_string())).await,
        }
        if *stop.borrow() {
            break;
        }

        info!(
            "reconnecting to the {} stream in {}ms",
            endpoint.name(),
            backoff.as_millis()
        );
        StreamMetrics::record_reconnect();
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = stop.wait_for(|stopped| *stopped) => break,
        }
        backoff = conn.backoff.next(backoff);
    }
    info!("stream task stopped");
}

async fn read_stream(
    conn: &Connection,
    endpoint: &Endpoint,
    stop: &mut watch::Receiver<bool>,
    backoff: &mut Duration,
) -> Result<()> {
    let request = match endpoint {
        Endpoint::Sample => conn.client.get(&conn.sample_url),
        Endpoint::Filter(params) => conn.client.post(&conn.filter_url).form(params),
    };
    let mut resp = error_for_status(request.send().await?).await?;
    info!("connected to the {} stream", endpoint.name());
    *backoff = conn.backoff.initial;

    let mut buf: Vec<u8> = Vec::new();
    loop {
        let chunk = tokio::select! {
            chunk = resp.chunk() => chunk?,
            _ = stop.wait_for(|stopped| *stopped) => return Ok(()),
        };
        let Some(chunk) = chunk else {
            return Err(IngestError::Stream(format!(
                "{} stream closed by the server",
                endpoint.name()
            )));
        };
        buf.extend_from_slice(&chunk);

        while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let message = text.trim();
            if message.is_empty() {
                // keep-alive
                continue;
            }
            match classify_message(message) {
                Some(event) => dispatch(&conn.listeners, event).await,
                None => debug!("ignoring stream message: {}", message),
            }
        }
    }
}

async fn dispatch(listeners: &Listeners, event: StreamEvent) {
    let snapshot: Vec<Arc<dyn StreamListener>> = listeners
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    for listener in snapshot {
        listener.on_event(event.clone()).await;
    }
}

/// Map one stream message to an event. Message kinds with no listener
/// callback (friends lists, user events) yield `None`.
pub fn classify_message(message: &str) -> Option<StreamEvent> {
    let value: Value = match serde_json::from_str(message) {
        Ok(value) => value,
        Err(e) => return Some(StreamEvent::Exception(format!("malformed stream message: {}", e))),
    };

    if let Some(delete) = value.get("delete") {
        let status = delete.get("status")?;
        return Some(StreamEvent::Deletion {
            status_id: id_field(status, "id")?,
            user_id: id_field(status, "user_id").unwrap_or(0),
        });
    }
    if let Some(limit) = value.get("limit") {
        return Some(StreamEvent::TrackLimitation {
            limited: limit.get("track").and_then(Value::as_u64).unwrap_or(0),
        });
    }
    if let Some(scrub) = value.get("scrub_geo") {
        return Some(StreamEvent::ScrubGeo {
            user_id: id_field(scrub, "user_id")?,
            up_to_status_id: id_field(scrub, "up_to_status_id")?,
        });
    }
    if let Some(warning) = value.get("warning") {
        return Some(StreamEvent::StallWarning(StallWarning {
            code: warning.get("code").and_then(Value::as_str).unwrap_or_default().to_string(),
            message: warning.get("message").and_then(Value::as_str).unwrap_or_default().to_string(),
            percent_full: warning.get("percent_full").and_then(Value::as_u64).unwrap_or(0) as u32,
        }));
    }
    if let Some(disconnect) = value.get("disconnect") {
        let reason = disconnect.get("reason").and_then(Value::as_str).unwrap_or("unknown");
        return Some(StreamEvent::Exception(format!("stream disconnected: {}", reason)));
    }
    if value.get("text").is_some() || value.get("full_text").is_some() {
        return Tweet::from_json(&value, message).map(StreamEvent::Status);
    }
    None
}

// Ids arrive both as numbers and as *_str strings.
fn id_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64).or_else(|| {
        value
            .get(&format!("{}_str", key))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    #[test]
    fn classifies_statuses() {
        let message = r#"{"text": "hello", "id": 7, "id_str": "7"}"#;
        match classify_message(message).unwrap() {
            StreamEvent::Status(tweet) => {
                assert_eq!(tweet.id, 7);
                assert_eq!(tweet.raw, message);
            }
            other => panic!("expected a status, got {:?}", other),
        }
    }

    #[test]
    fn classifies_notices() {
        assert_eq!(
            classify_message(
                r#"{"delete":{"status":{"id":1234,"id_str":"1234","user_id":3,"user_id_str":"3"}}}"#
            ),
            Some(StreamEvent::Deletion { status_id: 1234, user_id: 3 })
        );
        assert_eq!(
            classify_message(r#"{"limit":{"track":1234}}"#),
            Some(StreamEvent::TrackLimitation { limited: 1234 })
        );
        assert_eq!(
            classify_message(
                r#"{"scrub_geo":{"user_id_str":"14090548","up_to_status_id_str":"23260136625"}}"#
            ),
            Some(StreamEvent::ScrubGeo { user_id: 14090548, up_to_status_id: 23260136625 })
        );
        assert_eq!(
            classify_message(
                r#"{"warning":{"code":"FALLING_BEHIND","message":"Behind","percent_full":60}}"#
            ),
            Some(StreamEvent::StallWarning(StallWarning {
                code: "FALLING_BEHIND".into(),
                message: "Behind".into(),
                percent_full: 60,
            }))
        );
    }

    #[test]
    fn disconnects_and_garbage_become_exceptions() {
        assert!(matches!(
            classify_message(
                r#"{"disconnect":{"code":4,"stream_name":"x","reason":"duplicate stream"}}"#
            ),
            Some(StreamEvent::Exception(msg)) if msg.contains("duplicate stream")
        ));
        assert!(matches!(classify_message("{not json"), Some(StreamEvent::Exception(_))));
    }

    #[test]
    fn unknown_messages_are_ignored() {
        assert_eq!(classify_message(r#"{"friends":[1,2,3]}"#), None);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let backoff = Backoff::default();
        assert_eq!(backoff.initial, Duration::from_secs(5));
        let mut delays = vec![backoff.initial];
        for _ in 0..7 {
            let last = delays[delays.len() - 1];
            delays.push(backoff.next(last));
        }
        let secs: Vec<u64> = delays.iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![5, 10, 20, 40, 80, 160, 320, 320]);
    }

    #[tokio::test]
    async fn filter_without_terms_is_rejected() {
        let client = HttpStreamClient::new(
            "http://127.0.0.1:9/sample",
            "http://127.0.0.1:9/filter",
            "token",
        )
        .unwrap();
        let err = client.filter(&FilterQuery::default()).await.unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    struct Collector(mpsc::UnboundedSender<StreamEvent>);

    #[async_trait]
    impl StreamListener for Collector {
        async fn on_event(&self, event: StreamEvent) {
            let _ = self.0.send(event);
        }
    }

    async fn read_request_head(socket: &mut TcpStream) {
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            head.extend_from_slice(&buf[..n]);
        }
    }

    async fn write_chunked(socket: &mut TcpStream, chunks: &[&str]) {
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                  Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        for chunk in chunks {
            let framed = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
            socket.write_all(framed.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn reads_reassembles_and_reconnects_until_shutdown() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();

        let server_task = tokio::spawn(async move {
            // First connection: a status split mid-key, a keep-alive, a notice,
            // then the body ends.
            let (mut socket, _) = server.accept().await.unwrap();
            let _ = accepted_tx.send(Instant::now());
            read_request_head(&mut socket).await;
            write_chunked(
                &mut socket,
                &[
                    r#"{"id":1,"te"#,
                    "xt\":\"first\"}\r\n\r\n{\"delete\":{\"status\":{\"id\":5,\"user_id\":6}}}\r\n",
                    "{\"id\":2,\"text\":\"second\"}\r\n",
                ],
            )
            .await;
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.shutdown().await.unwrap();

            // Second connection stays open until the client stops.
            let (mut socket, _) = server.accept().await.unwrap();
            let _ = accepted_tx.send(Instant::now());
            read_request_head(&mut socket).await;
            write_chunked(&mut socket, &["{\"id\":3,\"text\":\"third\"}\r\n"]).await;
            std::future::pending::<()>().await;
        });

        let backoff = Backoff {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(400),
        };
        let client = HttpStreamClient::new(
            format!("http://{}/sample.json", addr),
            format!("http://{}/filter.json", addr),
            "token",
        )
        .unwrap()
        .with_backoff(backoff);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.add_listener(Arc::new(Collector(tx)));
        client.sample().await.unwrap();

        let mut events = Vec::new();
        while events.len() < 5 {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .unwrap()
                .unwrap();
            events.push(event);
        }

        assert_eq!(
            events[0],
            StreamEvent::Status(Tweet::new(1, r#"{"id":1,"text":"first"}"#))
        );
        assert_eq!(events[1], StreamEvent::Deletion { status_id: 5, user_id: 6 });
        assert_eq!(
            events[2],
            StreamEvent::Status(Tweet::new(2, r#"{"id":2,"text":"second"}"#))
        );
        assert!(matches!(
            &events[3],
            StreamEvent::Exception(msg) if msg.contains("closed by the server")
        ));
        assert_eq!(
            events[4],
            StreamEvent::Status(Tweet::new(3, r#"{"id":3,"text":"third"}"#))
        );

        let first = accepted_rx.recv().await.unwrap();
        let second = accepted_rx.recv().await.unwrap();
        assert!(second - first >= backoff.initial);

        tokio::time::timeout(Duration::from_secs(2), client.shutdown())
            .await
            .unwrap();
        assert!(client.take_task().is_none());
        assert!(rx.try_recv().is_err());
        server_task.abort();
    }
}
