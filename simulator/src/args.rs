use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "dht-simulator", about = "Publishes simulated DHT11 readings over MQTT")]
pub struct Args {
    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    pub mqtt_broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    #[arg(long, env = "MQTT_TOPIC", default_value = "sensor/dht11/data")]
    pub mqtt_topic: String,

    #[arg(long, env = "MQTT_CLIENT_ID", default_value = "dht-simulator")]
    pub client_id: String,

    /// Seconds between readings
    #[arg(long, env = "INTERVAL_SECS", default_value_t = 5)]
    pub interval_secs: u64,

    /// Stop after this many readings
    #[arg(long, env = "COUNT")]
    pub count: Option<u64>,
}
