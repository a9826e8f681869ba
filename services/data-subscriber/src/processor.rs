use crate::object_key::{ObjectKey, ObjectKeyBuilder};
use crate::observation::{self, ParseError};
use crate::record::build_records;
use crate::router::{route, RouteDecision};
use crate::uploader::ObjectStore;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Message delivered by the bus
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub topic: String,
    pub payload: Bytes,
}

impl IncomingMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Keys written and keys that failed while processing one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: Vec<ObjectKey>,
    pub failed: Vec<ObjectKey>,
}

/// Result of handling one message
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Topic is not a SYNOP topic
    Skipped { segment: String },
    /// Payload could not be extracted; the message is lost
    Dropped(ParseError),
    /// Every timestamp was attempted
    Processed(UploadSummary),
}

/// Turns SYNOP messages into per-timestamp CSV objects
pub struct SynopProcessor {
    keys: ObjectKeyBuilder,
    store: Arc<dyn ObjectStore>,
}

impl SynopProcessor {
    pub fn new(keys: ObjectKeyBuilder, store: Arc<dyn ObjectStore>) -> Self {
        Self { keys, store }
    }

    /// Process a single message to completion
    ///
    /// Uploads run one after another. A failed upload is logged and the
    /// remaining timestamps are still written.
    #[instrument(skip(self, message), fields(topic = %message.topic, payload_size = message.payload.len()))]
    pub async fn process(&self, message: &IncomingMessage) -> ProcessOutcome {
        info!("Message received");
        metrics::counter!("subscriber.messages.received").increment(1);

        if let RouteDecision::Skipped { segment } = route(&message.topic) {
            metrics::counter!("subscriber.messages.skipped").increment(1);
            return ProcessOutcome::Skipped { segment };
        }

        let payload = match observation::parse(&message.payload) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to extract observations, dropping message");
                metrics::counter!("subscriber.messages.dropped").increment(1);
                return ProcessOutcome::Dropped(e);
            }
        };

        debug!(
            logger_id = %payload.logger_id,
            timestamps = payload.observations.len(),
            "Extracted observations"
        );

        let mut summary = UploadSummary::default();

        for record in build_records(&message.topic, &payload) {
            let key = self.keys.build(&record.logger_id, &record.timestamp);
            let body = record.to_bytes();
            let size = body.len();

            let started = Instant::now();
            let result = self.store.put_object(&key, body).await;
            metrics::histogram!("subscriber.upload.duration_seconds")
                .record(started.elapsed().as_secs_f64());

            match result {
                Ok(()) => {
                    info!(bucket = %key.bucket, s3_key = %key.path, "Successfully uploaded CSV");
                    metrics::counter!("subscriber.records.uploaded").increment(1);
                    metrics::counter!("subscriber.bytes.uploaded").increment(size as u64);
                    summary.uploaded.push(key);
                }
                Err(e) => {
                    error!(error = %e, s3_key = %key.path, "Failed to upload CSV");
                    metrics::counter!("subscriber.records.failed").increment(1);
                    summary.failed.push(key);
                }
            }
        }

        ProcessOutcome::Processed(summary)
    }
}

/// Drain `messages` into `processor` until shutdown or until the sender closes
///
/// Each message is processed to completion before the next is received;
/// shutdown is only observed between messages.
pub async fn run_consumer(
    processor: Arc<SynopProcessor>,
    mut messages: mpsc::Receiver<IncomingMessage>,
    shutdown: CancellationToken,
) {
    info!("Starting consumer loop");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Consumer loop received shutdown signal");
                break;
            }
            message = messages.recv() => {
                match message {
                    Some(message) => {
                        processor.process(&message).await;
                    }
                    None => {
                        debug!("Message channel closed");
                        break;
                    }
                }
            }
        }
    }

    info!("Consumer loop stopped");
}
