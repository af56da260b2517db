use aas_eventflow_core::{
    ChangeEnvelope, ChangeReason, ElementPath, PathKey, PayloadItem, StructuralChange,
};
use aas_eventflow_proto::{ChangeBatch, TopicScheme};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use uuid::Uuid;

fn parse_mqtt_url(url: &str) -> (String, u16) {
    let url = url
        .strip_prefix("tcp://")
        .or_else(|| url.strip_prefix("mqtt://"))
        .unwrap_or(url);

    let parts: Vec<&str> = url.split(':').collect();

    let host = parts.first().copied().unwrap_or("localhost").to_string();
    let port = parts.get(1).and_then(|p| p.parse().ok()).unwrap_or(1883);

    (host, port)
}

async fn spawn_eventloop(mut eventloop: EventLoop) {
    loop {
        if eventloop.poll().await.is_err() {
            break;
        }
    }
}

fn modify_envelope(observable: &ElementPath, data: &str) -> ChangeEnvelope {
    ChangeEnvelope::new(
        ElementPath::from_keys(vec![PathKey::new("Submodel", "urn:example:src")]),
        ElementPath::from_keys(vec![PathKey::new("GlobalReference", "urn:example:kind")]),
        observable.clone(),
    )
    .with_payload(PayloadItem::StructuralChange(vec![StructuralChange::new(
        ChangeReason::Modify,
        ElementPath::from_short_path("TechnicalData.MaxTemperature"),
        serde_json::json!(data),
    )]))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mqtt_batch_roundtrip() {
    if std::env::var("EVENTFLOW_INTEGRATION").is_err() {
        eprintln!("Skipping integration test; set EVENTFLOW_INTEGRATION=1 to run");
        return;
    }

    let broker = std::env::var("EVENTFLOW_MQTT_BROKER")
        .unwrap_or_else(|_| "tcp://localhost:1883".to_string());
    let (host, port) = parse_mqtt_url(&broker);

    let tenant = "integration";
    let scheme = TopicScheme::new(tenant);
    let observable = ElementPath::from_keys(vec![PathKey::new("Submodel", "urn:example:sm:data")]);
    let observable_hash = observable.topic_hash();
    let topic = scheme.changes(&observable_hash);

    let mut sub_opts = MqttOptions::new(format!("sub-{}", Uuid::new_v4()), host.clone(), port);
    sub_opts.set_keep_alive(Duration::from_secs(5));
    let (sub_client, mut sub_eventloop) = AsyncClient::new(sub_opts, 10);
    sub_client
        .subscribe(&topic, QoS::AtLeastOnce)
        .await
        .unwrap();

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        loop {
            match sub_eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let _ = tx.send(publish.payload.to_vec());
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    let mut pub_opts = MqttOptions::new(format!("pub-{}", Uuid::new_v4()), host, port);
    pub_opts.set_keep_alive(Duration::from_secs(5));
    let (pub_client, pub_eventloop) = AsyncClient::new(pub_opts, 10);
    tokio::spawn(spawn_eventloop(pub_eventloop));

    tokio::time::sleep(Duration::from_millis(200)).await;

    let batch = ChangeBatch::new(Uuid::new_v4(), 0, vec![modify_envelope(&observable, "42")]);
    let payload = batch.to_cbor().unwrap();

    pub_client
        .publish(&topic, QoS::AtLeastOnce, false, payload)
        .await
        .unwrap();

    let received = timeout(Duration::from_secs(5), rx)
        .await
        .expect("timeout waiting for MQTT message")
        .expect("subscriber dropped");

    let decoded = ChangeBatch::from_cbor(&received).unwrap();
    assert_eq!(decoded.sequence, 0);
    assert_eq!(decoded.envelopes.len(), 1);
    assert_eq!(
        decoded.envelopes[0].single_modify_change().unwrap().data,
        serde_json::json!("42")
    );
}
