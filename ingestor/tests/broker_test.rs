use dht_ingestor::db::{Store, StoreConfig};
use dht_ingestor::model::ReadingPayload;
use dht_ingestor::mqtt::{Subscriber, SubscriberConfig};
use rand::Rng;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

fn random_payload(second: u32) -> ReadingPayload {
    let mut rng = rand::thread_rng();
    ReadingPayload {
        timestamp: format!("2024-01-01 00:00:{:02}", second),
        temp: rng.gen_range(20.0..30.0),
        humidity: rng.gen_range(40.0..60.0),
    }
}

/// Needs a broker on localhost:1883.
#[tokio::test]
#[ignore]
async fn test_readings_flow_from_broker_to_store() {
    let topic = format!("sensor/dht11/test-{}", uuid::Uuid::new_v4());
    let store = Store::open(&StoreConfig::in_memory()).await.unwrap();

    let config = SubscriberConfig {
        topic: topic.clone(),
        client_id: format!("dht-ingestor-test-{}", uuid::Uuid::new_v4()),
        ..SubscriberConfig::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let subscriber = tokio::spawn(Subscriber::new(config, store.clone()).run(shutdown_rx));

    // let the subscription settle
    sleep(Duration::from_secs(1)).await;

    let mut mqtt_options = MqttOptions::new(
        format!("dht-publisher-test-{}", uuid::Uuid::new_v4()),
        "localhost",
        1883,
    );
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);
    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                eprintln!("MQTT error: {}", e);
                break;
            }
        }
    });

    let sent: Vec<ReadingPayload> = (0..5).map(random_payload).collect();
    for (i, payload) in sent.iter().enumerate() {
        client
            .publish(
                topic.as_str(),
                QoS::AtLeastOnce,
                false,
                serde_json::to_vec(payload).unwrap(),
            )
            .await
            .unwrap();
        if i == 2 {
            client
                .publish(topic.as_str(), QoS::AtLeastOnce, false, "not json")
                .await
                .unwrap();
        }
    }

    let mut stored = 0;
    for _ in 0..50 {
        stored = store.count().await.unwrap();
        if stored >= 5 {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(stored, 5);

    let latest = store.latest().await.unwrap();
    let last = sent.last().unwrap();
    assert_eq!(latest.timestamp, last.timestamp);
    assert!((latest.temperature - last.temp).abs() < 1e-9);
    assert!((latest.humidity - last.humidity).abs() < 1e-9);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), subscriber)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
