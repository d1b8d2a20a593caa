use std::sync::Arc;

use pulse_codec::{CodecError, Sealer, Signer};
use pulse_core::{MetricPayload, MetricValue};
use pulse_store::{Store, StoreError};
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("request channel closed")]
    ChannelClosed,
}

/// A ship-ready request: the gzip JSON batch, sealed if a public key is
/// configured, plus the signature of the compressed body.
#[derive(Debug)]
pub struct ShipRequest {
    pub body: Vec<u8>,
    pub signature: Option<String>,
}

/// Turns the local store into batch requests. The transformation chain is
/// encode, compress, sign, seal; each stage past encoding is optional and
/// driven by configuration.
pub struct Builder {
    store: Arc<dyn Store>,
    signer: Signer,
    sealer: Option<Sealer>,
    requests: mpsc::Sender<ShipRequest>,
}

impl Builder {
    pub fn new(
        store: Arc<dyn Store>,
        signer: Signer,
        sealer: Option<Sealer>,
        requests: mpsc::Sender<ShipRequest>,
    ) -> Self {
        Self {
            store,
            signer,
            sealer,
            requests,
        }
    }

    /// Snapshot the store into one batch request and queue it for shipping.
    pub async fn build(&self) -> Result<(), BuildError> {
        let metrics = self.store.metrics().await?;
        if metrics.is_empty() {
            return Ok(());
        }

        let payloads: Vec<MetricPayload> = metrics.iter().map(MetricPayload::from).collect();
        let encoded = serde_json::to_vec(&payloads)?;
        let compressed = pulse_codec::compress(&encoded)?;
        let signature = self.signer.sign(&compressed);
        let body = match &self.sealer {
            Some(sealer) => sealer.seal(&compressed)?,
            None => compressed,
        };

        self.requests
            .send(ShipRequest { body, signature })
            .await
            .map_err(|_| BuildError::ChannelClosed)?;

        // Deltas that just went onto the channel must not ship again next
        // cycle. If the ship later fails those deltas are lost; that is the
        // accepted trade-off, the next cycle keeps accumulating.
        for metric in &metrics {
            if let MetricValue::Counter(delta) = metric.value() {
                self.store.store_counter(metric.name(), -delta).await?;
            }
        }
        Ok(())
    }
}
