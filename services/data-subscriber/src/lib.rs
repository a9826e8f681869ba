//! wis2box Data Subscriber
//!
//! Bridges SYNOP observation messages from an MQTT broker into an S3
//! compatible bucket. Every message carries observations for one or more
//! timestamps; each timestamp becomes its own CSV object under a key derived
//! from the country, centre, logger and timestamp.
//!
//! ## Architecture
//!
//! ```text
//! MQTT Broker                 Consumer Loop                    S3 / MinIO
//! ┌──────────────┐           ┌──────────────┐                ┌──────────────────────┐
//! │ data-incoming│  bounded  │ Router       │ SYNOP only     │ {country}/{centre}/  │
//! │   /#  (QoS1) │──channel─▶│ Extractor    │                │   data/core/weather/ │
//! └──────────────┘           │ Records      │──one object───▶│   .../synop/         │
//!                            │ Object keys  │  per timestamp │   {logger}_{ts}.csv  │
//!                            └──────────────┘                └──────────────────────┘
//! ```
//!
//! Malformed payloads are logged and dropped; a failed upload is logged and
//! the remaining timestamps of the message are still written.

pub mod config;
pub mod error;
pub mod format;
pub mod mqtt;
pub mod object_key;
pub mod observation;
pub mod processor;
pub mod record;
pub mod router;
pub mod uploader;

pub use config::{BrokerUrl, Config, ConfigError};
pub use error::ConnectionError;
pub use mqtt::MqttSubscriber;
pub use object_key::{ObjectKey, ObjectKeyBuilder};
pub use observation::{ObservationPayload, ObservationValue, ParseError, TimestampedValues};
pub use processor::{run_consumer, IncomingMessage, ProcessOutcome, SynopProcessor, UploadSummary};
pub use record::{build_records, CsvRecord};
pub use router::{route, RouteDecision};
pub use uploader::{ObjectStore, S3Uploader, UploadError};
