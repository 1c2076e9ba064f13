// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Source side of the pipeline
//!
//! [`run_source`] drives any [`EntropySource`] in a tight loop, publishing
//! every block on the entropy channel in delivery order. The first failure is
//! reported once and ends the loop: there is no retry and no backoff.

use crate::{
    config::SourceConfig,
    pipeline::TaskContext,
    protocol::{EntropyBlock, EntropyResponse},
    Error, Result,
};
use reqwest::Client;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Something that yields batches of entropy blocks, one call at a time
pub trait EntropySource: Send + 'static {
    /// Fetch the next batch of blocks, in delivery order
    fn fetch_batch(&mut self) -> impl Future<Output = Result<Vec<EntropyBlock>>> + Send;
}

/// Entropy source backed by the ANU Quantum Random Numbers Server
pub struct QrngEntropySource {
    client: Client,
    config: SourceConfig,
    url: Url,
}

impl QrngEntropySource {
    /// Validate the configuration and build a dedicated HTTP client
    pub fn new(config: SourceConfig) -> Result<Self> {
        config.validate()?;
        let client = config.build_client()?;
        Ok(Self::with_client(client, config))
    }

    /// Use an already configured HTTP client
    pub fn with_client(client: Client, config: SourceConfig) -> Self {
        let url = config.request_url();
        Self {
            client,
            config,
            url,
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn request_url(&self) -> &Url {
        &self.url
    }

    /// Issue one request and parse the response
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_once(&self) -> Result<EntropyResponse> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to fetch from {}: {}", self.url, e);
                Error::Network(e)
            })?;

        // The status code is not checked: an error page fails to parse below
        debug!(status = %response.status(), "Received response");

        let body = response.bytes().await.map_err(Error::Network)?;
        EntropyResponse::from_slice(&body)
    }
}

impl EntropySource for QrngEntropySource {
    async fn fetch_batch(&mut self) -> Result<Vec<EntropyBlock>> {
        let response = self.fetch_once().await?;
        debug!(
            data_type = %response.data_type,
            length = response.length,
            size = response.size,
            blocks = response.data.len(),
            success = response.success,
            "Parsed entropy response"
        );
        response.into_blocks()
    }
}

/// Fetch loop: publish entropy until the first error or until shutdown
pub async fn run_source<S: EntropySource>(
    mut source: S,
    entropy: mpsc::Sender<EntropyBlock>,
    ctx: TaskContext,
) {
    loop {
        let batch = tokio::select! {
            biased;
            _ = ctx.shutdown().cancelled() => {
                debug!("Shutdown signalled, fetcher stopping");
                return;
            }
            batch = source.fetch_batch() => batch,
        };
        ctx.metrics().record_request();

        let blocks = match batch {
            Ok(blocks) => blocks,
            Err(e) => {
                ctx.report(e).await;
                return;
            }
        };

        for block in blocks {
            tokio::select! {
                biased;
                _ = ctx.shutdown().cancelled() => {
                    debug!("Shutdown signalled while publishing, fetcher stopping");
                    return;
                }
                sent = entropy.send(block) => {
                    if sent.is_err() {
                        debug!("Entropy channel closed, fetcher stopping");
                        return;
                    }
                    ctx.metrics().record_published();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use mockito::Matcher;
    use tokio_util::sync::CancellationToken;

    const VALID_BODY: &str = r#"{"type":"string","length":10,"size":2,
        "data":["f7b5","e4d1","c842","5551","f117","e75d","30a1","32b8","8e40","9ba3"],
        "success":true}"#;

    const INVALID_BODY: &str = r#"{"type":"string","length":10,"size":2,
        "data":"f7b5","e4d1","c842","5551","f117","e75d","30a1","32b8","8e40","9ba3"],
        "success":true}"#;

    fn test_context() -> (TaskContext, mpsc::Receiver<Error>, Metrics) {
        let (error_tx, error_rx) = mpsc::channel(1);
        let metrics = Metrics::new();
        let ctx = TaskContext::new(error_tx, CancellationToken::new(), metrics.clone());
        (ctx, error_rx, metrics)
    }

    fn source_for(server: &mockito::ServerGuard) -> QrngEntropySource {
        let base_url = Url::parse(&format!("{}/API/jsonI.php", server.url())).unwrap();
        QrngEntropySource::new(SourceConfig::with_base_url(base_url)).unwrap()
    }

    #[test]
    fn test_request_url() {
        let source = QrngEntropySource::new(SourceConfig::default()).unwrap();
        assert_eq!(
            source.request_url().as_str(),
            "https://qrng.anu.edu.au/API/jsonI.php?length=1024&size=1024&type=hex16"
        );
    }

    #[tokio::test]
    async fn test_fetch_valid_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/API/jsonI.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("length".into(), "1024".into()),
                Matcher::UrlEncoded("size".into(), "1024".into()),
                Matcher::UrlEncoded("type".into(), "hex16".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(VALID_BODY)
            .create_async()
            .await;

        let mut source = source_for(&server);
        let blocks = source.fetch_batch().await.unwrap();

        assert_eq!(blocks.len(), 10);
        assert_eq!(blocks[0].as_str(), "f7b5");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_json_reports_once() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/API/jsonI.php")
            .match_query(Matcher::Any)
            .with_body(INVALID_BODY)
            .create_async()
            .await;

        let (entropy_tx, mut entropy_rx) = mpsc::channel(1);
        let (ctx, mut error_rx, metrics) = test_context();

        run_source(source_for(&server), entropy_tx, ctx).await;

        let err = error_rx.recv().await.unwrap();
        assert!(matches!(err, Error::Serialization(_)));
        // The task has ended and dropped every sender
        assert!(error_rx.recv().await.is_none());
        assert!(entropy_rx.recv().await.is_none());
        assert_eq!(metrics.errors_reported(), 1);
        assert_eq!(metrics.blocks_published(), 0);
    }

    #[tokio::test]
    async fn test_unsuccessful_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/API/jsonI.php")
            .match_query(Matcher::Any)
            .with_body(r#"{"type":"hex16","length":1,"size":1,"data":["f7b5"],"success":false}"#)
            .create_async()
            .await;

        let (entropy_tx, mut entropy_rx) = mpsc::channel(1);
        let (ctx, mut error_rx, _metrics) = test_context();

        run_source(source_for(&server), entropy_tx, ctx).await;

        let err = error_rx.recv().await.unwrap();
        assert_eq!(err.to_string(), "unable to retrieve entropy");
        assert!(entropy_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure() {
        // Nothing listens on port 1
        let base_url = Url::parse("http://127.0.0.1:1/API/jsonI.php").unwrap();
        let source = QrngEntropySource::new(SourceConfig::with_base_url(base_url)).unwrap();

        let (entropy_tx, mut entropy_rx) = mpsc::channel(1);
        let (ctx, mut error_rx, metrics) = test_context();

        run_source(source, entropy_tx, ctx).await;

        let err = error_rx.recv().await.unwrap();
        assert!(err.is_transport());
        assert!(entropy_rx.recv().await.is_none());
        assert_eq!(metrics.errors_reported(), 1);
    }

    #[tokio::test]
    async fn test_truncated_body_reports_once() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Promise 100 bytes, send a few, then hang up
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"data\":[\"f7")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let base_url = Url::parse(&format!("http://{}/API/jsonI.php", addr)).unwrap();
        let source = QrngEntropySource::new(SourceConfig::with_base_url(base_url)).unwrap();

        let (entropy_tx, mut entropy_rx) = mpsc::channel(1);
        let (ctx, mut error_rx, metrics) = test_context();

        run_source(source, entropy_tx, ctx).await;
        server.await.unwrap();

        let err = error_rx.recv().await.unwrap();
        assert!(matches!(err, Error::Network(_)));
        assert!(error_rx.recv().await.is_none());
        assert!(entropy_rx.recv().await.is_none());
        assert_eq!(metrics.errors_reported(), 1);
        assert_eq!(metrics.blocks_published(), 0);
    }

    #[tokio::test]
    async fn test_publishes_in_order_across_calls() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/API/jsonI.php")
            .match_query(Matcher::Any)
            .with_body(VALID_BODY)
            .create_async()
            .await;

        let (entropy_tx, mut entropy_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let (error_tx, _error_rx) = mpsc::channel(1);
        let ctx = TaskContext::new(error_tx, shutdown.clone(), Metrics::new());

        let handle = tokio::spawn(run_source(source_for(&server), entropy_tx, ctx));

        let mut received = Vec::new();
        for _ in 0..15 {
            received.push(entropy_rx.recv().await.unwrap().to_string());
        }
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(&received[..3], &["f7b5", "e4d1", "c842"]);
        // Second response starts over after the tenth block
        assert_eq!(received[9], "9ba3");
        assert_eq!(received[10], "f7b5");
        assert_eq!(received[14], "f117");
    }
}
