use crate::db::StoreConfig;
use crate::mqtt::SubscriberConfig;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "dht-ingestor", about = "Stores DHT sensor readings received over MQTT")]
pub struct Args {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://sensor_data.db")]
    pub database_url: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 4)]
    pub db_max_connections: u32,

    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 5000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    pub mqtt_broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    #[arg(long, env = "MQTT_TOPIC", default_value = "sensor/dht11/data")]
    pub mqtt_topic: String,

    #[arg(long, env = "MQTT_CLIENT_ID", default_value = "SQLiteSubscriber")]
    pub client_id: String,

    #[arg(long, env = "MQTT_KEEP_ALIVE_SECS", default_value_t = 60)]
    pub keep_alive_secs: u64,

    /// Keep the broker session (and queued QoS 1 messages) across reconnects
    #[arg(long, env = "MQTT_PERSISTENT_SESSION")]
    pub persistent_session: bool,

    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:5000")]
    pub http_addr: String,
}

impl Args {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            database_url: self.database_url.clone(),
            max_connections: self.db_max_connections,
            write_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }

    pub fn subscriber_config(&self) -> SubscriberConfig {
        SubscriberConfig {
            broker_host: self.mqtt_broker.clone(),
            broker_port: self.mqtt_port,
            topic: self.mqtt_topic.clone(),
            client_id: self.client_id.clone(),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
            clean_session: !self.persistent_session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["dht-ingestor"]).unwrap();
        let subscriber = args.subscriber_config();

        assert_eq!(subscriber.topic, "sensor/dht11/data");
        assert_eq!(subscriber.client_id, "SQLiteSubscriber");
        assert_eq!(subscriber.broker_port, 1883);
        assert!(subscriber.clean_session);
        assert_eq!(args.store_config().write_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "dht-ingestor",
            "--mqtt-broker",
            "broker.local",
            "--mqtt-port",
            "8883",
            "--persistent-session",
            "--database-url",
            "sqlite://other.db",
        ])
        .unwrap();

        let subscriber = args.subscriber_config();
        assert_eq!(subscriber.broker_host, "broker.local");
        assert_eq!(subscriber.broker_port, 8883);
        assert!(!subscriber.clean_session);
        assert_eq!(args.store_config().database_url, "sqlite://other.db");
    }
}
