use crate::db::Store;
use crate::decode::decode;
use crate::errors::{Error, Result};
use crate::metrics::{DECODE_FAILURES_TOTAL, MESSAGES_TOTAL, STORED_READINGS_TOTAL};
use rumqttc::{
    AsyncClient, ConnAck, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions,
    Outgoing, Packet, QoS,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const REQUEST_CHANNEL_CAPACITY: usize = 10;
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub topic: String,
    pub client_id: String,
    pub keep_alive: Duration,
    pub clean_session: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            topic: "sensor/dht11/data".to_string(),
            client_id: "SQLiteSubscriber".to_string(),
            keep_alive: Duration::from_secs(60),
            clean_session: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// What happened to a single inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Stored,
    DecodeFailed,
    StoreFailed,
}

/// Receives readings from one topic and writes them to the store, one message at a time.
pub struct Subscriber {
    config: SubscriberConfig,
    store: Store,
    state: SubscriberState,
}

impl Subscriber {
    pub fn new(config: SubscriberConfig, store: Store) -> Self {
        Self {
            config,
            store,
            state: SubscriberState::Disconnected,
        }
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(
            &self.config.client_id,
            &self.config.broker_host,
            self.config.broker_port,
        );
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(self.config.clean_session);
        mqtt_options
    }

    /// Handles a CONNACK. Subscribes on success; otherwise logs and waits for the
    /// transport to try again. A failed subscribe request is retried on the next CONNACK.
    pub fn on_connected(&mut self, client: &AsyncClient, ack: &ConnAck) {
        if ack.code != ConnectReturnCode::Success {
            error!("Failed to connect, return code {:?}", ack.code);
            self.state = SubscriberState::Connecting;
            return;
        }

        info!("Subscriber connected to MQTT broker");
        if let Err(e) = client.try_subscribe(&self.config.topic, QoS::AtLeastOnce) {
            error!("Failed to subscribe to {}: {}", self.config.topic, Error::from(e));
            self.state = SubscriberState::Connecting;
            return;
        }

        self.state = SubscriberState::Subscribed;
        info!("Subscribed to {} with QoS 1", self.config.topic);
    }

    /// Decodes one payload and persists it. Failures are logged and the message is dropped.
    pub async fn on_message(&self, payload: &[u8]) -> MessageOutcome {
        MESSAGES_TOTAL.inc();

        let reading = match decode(payload) {
            Ok(reading) => reading,
            Err(e) => {
                DECODE_FAILURES_TOTAL.inc();
                warn!("Error processing message: {}", e);
                warn!("Raw payload: {:?}", e.payload().unwrap_or_default());
                return MessageOutcome::DecodeFailed;
            }
        };

        if let Err(e) = self.store.insert(&reading).await {
            error!("Database error: {}", e);
            return MessageOutcome::StoreFailed;
        }

        STORED_READINGS_TOTAL.inc();
        info!(
            "Data saved to DB: T={}, H={}",
            reading.temperature, reading.humidity
        );
        MessageOutcome::Stored
    }

    /// Runs until `shutdown` flips to `true` (or its sender is dropped), then
    /// unsubscribes and disconnects.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        if *shutdown.borrow() {
            return Ok(());
        }

        info!(
            "Connecting to MQTT broker at {}:{} as {}",
            self.config.broker_host, self.config.broker_port, self.config.client_id
        );

        let (client, mut eventloop) =
            AsyncClient::new(self.mqtt_options(), REQUEST_CHANNEL_CAPACITY);
        self.state = SubscriberState::Connecting;

        'events: loop {
            tokio::select! {
                _ = shutdown.changed() => break 'events,
                notification = eventloop.poll() => match notification {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        self.on_connected(&client, &ack);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        debug!(
                            "Received message on topic {}, size: {} bytes",
                            publish.topic,
                            publish.payload.len()
                        );
                        self.on_message(&publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.on_connection_error(e.into());
                        // rumqttc reconnects on the next poll
                        tokio::select! {
                            _ = shutdown.changed() => break 'events,
                            _ = tokio::time::sleep(RECONNECT_PAUSE) => {}
                        }
                    }
                },
            }
        }

        info!("Shutdown requested, leaving MQTT broker");
        self.disconnect(&client, &mut eventloop).await;
        Ok(())
    }

    fn on_connection_error(&mut self, e: Error) {
        match &e {
            Error::Connection(ConnectionError::ConnectionRefused(code)) => {
                error!("Failed to connect, return code {:?}", code);
            }
            _ => error!("{}", e),
        }
        self.state = SubscriberState::Connecting;
    }

    async fn disconnect(&mut self, client: &AsyncClient, eventloop: &mut EventLoop) {
        if self.state != SubscriberState::Subscribed {
            self.state = SubscriberState::Disconnected;
            return;
        }

        if let Err(e) = client.try_unsubscribe(&self.config.topic) {
            warn!("Failed to unsubscribe from {}: {}", self.config.topic, e);
        }
        if let Err(e) = client.try_disconnect() {
            warn!("Failed to request disconnect: {}", e);
        }

        let drain = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_GRACE, drain).await.is_err() {
            warn!("Broker did not acknowledge disconnect within {:?}", DISCONNECT_GRACE);
        }

        self.state = SubscriberState::Disconnected;
        info!("Disconnected from MQTT broker");
    }
}
