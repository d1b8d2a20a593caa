use std::sync::Arc;
use std::time::Duration;

use pulse_codec::HASH_HEADER;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::builder::ShipRequest;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);
// Delays between attempts; three attempts total.
const RETRY_BACKOFF: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(3)];

#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    #[error("request error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("shutdown requested")]
    Cancelled,
}

/// Bounded worker pool executing ship requests. A batch that still fails
/// after the retry schedule is logged and dropped; the agent never blocks
/// on delivery.
pub struct Shipper {
    client: reqwest::Client,
    endpoint: String,
    rate_limit: usize,
}

impl Shipper {
    pub fn new(endpoint: String, rate_limit: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            rate_limit: rate_limit.max(1),
        }
    }

    /// Drain the request channel with `rate_limit` workers. Returns when
    /// the channel closes and every in-flight worker has finished, or when
    /// the token fires.
    pub async fn run(
        self: Arc<Self>,
        requests: mpsc::Receiver<ShipRequest>,
        cancel: CancellationToken,
    ) {
        let requests = Arc::new(Mutex::new(requests));
        let mut workers = JoinSet::new();
        for worker in 0..self.rate_limit {
            let shipper = Arc::clone(&self);
            let requests = Arc::clone(&requests);
            let cancel = cancel.clone();
            workers.spawn(async move { shipper.work(worker, requests, cancel).await });
        }
        while workers.join_next().await.is_some() {}
    }

    async fn work(
        &self,
        worker: usize,
        requests: Arc<Mutex<mpsc::Receiver<ShipRequest>>>,
        cancel: CancellationToken,
    ) {
        loop {
            let request = {
                let mut requests = requests.lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    received = requests.recv() => match received {
                        Some(request) => request,
                        None => return,
                    },
                }
            };
            match self.ship(&request, &cancel).await {
                Ok(()) => debug!(worker, "batch shipped"),
                Err(ShipError::Cancelled) => return,
                Err(e) => warn!(worker, error = %e, "dropping batch after retries"),
            }
        }
    }

    async fn ship(&self, request: &ShipRequest, cancel: &CancellationToken) -> Result<(), ShipError> {
        let mut delays = RETRY_BACKOFF.iter();
        loop {
            let attempt = tokio::select! {
                result = self.attempt(request) => result,
                _ = cancel.cancelled() => return Err(ShipError::Cancelled),
            };
            match attempt {
                Ok(()) => return Ok(()),
                Err(e) => match delays.next() {
                    Some(delay) => {
                        warn!(error = %e, "ship attempt failed, retrying");
                        tokio::select! {
                            _ = tokio::time::sleep(*delay) => {}
                            _ = cancel.cancelled() => return Err(ShipError::Cancelled),
                        }
                    }
                    None => return Err(e),
                },
            }
        }
    }

    async fn attempt(&self, request: &ShipRequest) -> Result<(), ShipError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .timeout(ATTEMPT_TIMEOUT)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_ENCODING, "gzip")
            .body(request.body.clone());
        if let Some(signature) = &request.signature {
            builder = builder.header(HASH_HEADER, signature.as_str());
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ShipError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
