//! MQTT side of the bridge.
//!
//! The subscriber owns the broker connection and forwards every publish into
//! a bounded channel; processing happens in [`crate::processor::run_consumer`].
//! When the channel is full the event loop stops polling, which pushes back
//! on the broker instead of buffering without limit.

use crate::config::{BrokerUrl, ConfigError, MqttConfig};
use crate::error::ConnectionError;
use crate::processor::IncomingMessage;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Capacity of the rumqttc request channel
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// MQTT subscriber feeding inbound messages to the consumer loop
pub struct MqttSubscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    retry_delay: Duration,
    connect_timeout: Duration,
}

impl MqttSubscriber {
    /// Create a subscriber; no network activity happens until [`connect`](Self::connect)
    pub fn new(config: &MqttConfig, client_id: &str) -> Result<Self, ConfigError> {
        let broker = config.broker()?;
        let options = mqtt_options(&broker, client_id, config.keep_alive());

        info!(
            host = %broker.host,
            port = broker.port,
            user = broker.username.as_deref().unwrap_or(""),
            tls = broker.tls,
            client_id = %client_id,
            "MQTT subscriber configured"
        );

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            eventloop,
            topic: config.subscribe_topic.clone(),
            retry_delay: config.retry_delay(),
            connect_timeout: config.connect_timeout(),
        })
    }

    /// Wait for the first CONNACK and subscribe
    ///
    /// A broker that refuses or does not answer within the connect timeout
    /// is a fatal startup error.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        let timeout = self.connect_timeout;
        tokio::time::timeout(timeout, self.await_connack())
            .await
            .map_err(|_| ConnectionError::ConnectTimeout(timeout))?
    }

    async fn await_connack(&mut self) -> Result<(), ConnectionError> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    info!(code = ?ack.code, "Connected to MQTT broker");
                    return subscribe(&self.client, &self.topic).await;
                }
                Ok(_) => {}
                Err(e) => return Err(ConnectionError::Broker(e.to_string())),
            }
        }
    }

    /// Run the event loop on a background task until `shutdown` fires
    pub fn spawn(
        self,
        messages: mpsc::Sender<IncomingMessage>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(messages, shutdown))
    }

    #[instrument(name = "mqtt_subscriber", skip_all, fields(topic = %self.topic))]
    async fn run(self, messages: mpsc::Sender<IncomingMessage>, shutdown: CancellationToken) {
        let Self {
            client,
            mut eventloop,
            topic,
            retry_delay,
            ..
        } = self;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Shutdown signal received");
                    let _ = client.disconnect().await;
                    break;
                }
                event = eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let message = IncomingMessage {
                                topic: publish.topic,
                                payload: publish.payload,
                            };
                            debug!(topic = %message.topic, payload_size = message.payload.len(), "Received publish");

                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                sent = messages.send(message) => {
                                    if sent.is_err() {
                                        warn!("Consumer channel closed, stopping MQTT subscriber");
                                        break;
                                    }
                                }
                            }
                        }
                        Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                            // Clean sessions drop subscriptions, so every reconnect resubscribes
                            info!(code = ?ack.code, "Reconnected to MQTT broker");
                            if let Err(e) = subscribe(&client, &topic).await {
                                error!(error = %e, "Failed to resubscribe");
                            }
                        }
                        Ok(Event::Incoming(Packet::SubAck(_))) => {
                            debug!("Subscription acknowledged");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(
                                error = %e,
                                retry_delay_secs = retry_delay.as_secs(),
                                "MQTT connection error, retrying"
                            );
                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                _ = tokio::time::sleep(retry_delay) => {}
                            }
                        }
                    }
                }
            }
        }

        info!("MQTT subscriber stopped");
    }
}

async fn subscribe(client: &AsyncClient, topic: &str) -> Result<(), ConnectionError> {
    info!(topic = %topic, "Subscribing");
    client
        .subscribe(topic, QoS::AtLeastOnce)
        .await
        .map_err(|e| ConnectionError::Subscribe {
            topic: topic.to_string(),
            message: e.to_string(),
        })
}

fn mqtt_options(broker: &BrokerUrl, client_id: &str, keep_alive: Duration) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, broker.host.clone(), broker.port);
    options.set_keep_alive(keep_alive);
    options.set_clean_session(true);

    if let Some(ref username) = broker.username {
        options.set_credentials(username, broker.password.as_deref().unwrap_or(""));
    }

    if broker.tls {
        options.set_transport(Transport::tls_with_default_config());
    }

    options
}
