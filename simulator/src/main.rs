mod args;
mod reading;

use args::Args;
use clap::Parser as _;
use reading::generate_reading;
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, Event, MqttOptions, Outgoing, Packet, QoS,
};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting DHT simulator");
    info!(
        "Broker: {}:{}, Topic: {}, Interval: {}s",
        args.mqtt_broker, args.mqtt_port, args.mqtt_topic, args.interval_secs
    );

    let mut mqtt_options = MqttOptions::new(&args.client_id, &args.mqtt_broker, args.mqtt_port);
    mqtt_options.set_keep_alive(Duration::from_secs(60));
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);

    // Spawn eventloop handler
    let eventloop_handle = tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!("Connected to MQTT broker");
                    } else {
                        error!("Failed to connect, return code {:?}", ack.code);
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT eventloop error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs.max(1)));
    let mut published = 0u64;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    'publish: loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => {
                info!("Simulation stopped by user");
                break 'publish;
            }
        }

        let reading = generate_reading(&mut rand::thread_rng());
        let payload = match serde_json::to_string(&reading) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize reading: {}", e);
                continue;
            }
        };

        match publish_until(&client, &args.mqtt_topic, payload.clone(), &mut ctrl_c).await {
            Some(Ok(())) => {
                published += 1;
                info!("Published to topic {}: {}", args.mqtt_topic, payload);
            }
            Some(Err(e)) => warn!("Failed to publish: {}", e),
            None => {
                info!("Simulation stopped by user");
                break 'publish;
            }
        }

        if args.count.is_some_and(|limit| published >= limit) {
            info!("Published {} readings, stopping", published);
            break;
        }
    }

    if let Err(e) = client.try_disconnect() {
        warn!("Failed to disconnect: {}", e);
    }
    if tokio::time::timeout(Duration::from_secs(2), eventloop_handle)
        .await
        .is_err()
    {
        warn!("MQTT eventloop did not stop within 2s");
    }
}

/// Publishes with QoS 1 unless `stop` completes first; `None` means stopped.
/// `publish` waits while the request channel is full, e.g. when the broker is down.
async fn publish_until<F>(
    client: &AsyncClient,
    topic: &str,
    payload: String,
    stop: &mut F,
) -> Option<Result<(), ClientError>>
where
    F: Future + Unpin,
{
    tokio::select! {
        result = client.publish(topic, QoS::AtLeastOnce, false, payload) => Some(result),
        _ = stop => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_until_stops_when_channel_is_full() {
        let options = MqttOptions::new("sim-test", "localhost", 1883);
        let (client, _eventloop) = AsyncClient::new(options, 1);
        client
            .try_publish("sensor/dht11/data", QoS::AtLeastOnce, false, "{}")
            .unwrap();

        let stop = tokio::time::sleep(Duration::from_millis(50));
        tokio::pin!(stop);

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            publish_until(&client, "sensor/dht11/data", "{}".to_string(), &mut stop),
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_publish_until_publishes_with_room() {
        let options = MqttOptions::new("sim-test", "localhost", 1883);
        let (client, _eventloop) = AsyncClient::new(options, 10);
        let mut stop = std::future::pending::<()>();

        let result =
            publish_until(&client, "sensor/dht11/data", "{}".to_string(), &mut stop).await;
        assert!(matches!(result, Some(Ok(()))));
    }
}
