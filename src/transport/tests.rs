use crate::broker::{Broker, SharedBroker, lock};
use crate::client::{Client, ConnectionId};
use crate::transport::message::{ClientMessage, DecodeError, PublishFrame, ServerMessage};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use axum::extract::ws::Message as WsMessage;

// Mirrors the dispatch step of the connection handler: decode, then route
// or drop.
fn handle_message(broker: &SharedBroker, client_id: ConnectionId, msg: &str) {
    if let Ok(decoded) = ClientMessage::decode(msg) {
        lock(broker).handle(client_id, decoded);
    }
}

fn register(broker: &SharedBroker) -> (ConnectionId, mpsc::UnboundedReceiver<WsMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = lock(broker).register_client(Client::new(tx));
    (id, rx)
}

#[test]
fn test_decode_subscribe() {
    let msg = ClientMessage::decode(r#"{"type":"subscribe","topics":["a","b"]}"#).unwrap();
    assert_eq!(
        msg,
        ClientMessage::Subscribe {
            topics: vec!["a".to_string(), "b".to_string()]
        }
    );
}

#[test]
fn test_decode_subscribe_skips_non_string_topics() {
    let msg = ClientMessage::decode(r#"{"type":"subscribe","topics":["a",1,null,{"x":1},"b"]}"#)
        .unwrap();
    assert_eq!(
        msg,
        ClientMessage::Subscribe {
            topics: vec!["a".to_string(), "b".to_string()]
        }
    );
}

#[test]
fn test_decode_missing_or_null_topics_is_empty() {
    for raw in [r#"{"type":"unsubscribe"}"#, r#"{"type":"unsubscribe","topics":null}"#] {
        assert_eq!(
            ClientMessage::decode(raw).unwrap(),
            ClientMessage::Unsubscribe { topics: vec![] }
        );
    }
}

#[test]
fn test_decode_topics_must_be_a_list() {
    let err = ClientMessage::decode(r#"{"type":"subscribe","topics":"room"}"#).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
}

#[test]
fn test_decode_publish_keeps_extra_fields() {
    let msg = ClientMessage::decode(r#"{"type":"publish","topic":"room","from":"peer-1","data":[1,2]}"#)
        .unwrap();
    let ClientMessage::Publish(PublishFrame { topic, fields }) = msg else {
        panic!("Expected a publish message");
    };
    assert_eq!(topic, "room");
    assert_eq!(fields.get("from"), Some(&json!("peer-1")));
    assert_eq!(fields.get("data"), Some(&json!([1, 2])));
    assert!(!fields.contains_key("type"));
    assert!(!fields.contains_key("topic"));
}

#[test]
fn test_decode_publish_requires_string_topic() {
    for raw in [r#"{"type":"publish"}"#, r#"{"type":"publish","topic":7}"#] {
        assert!(matches!(
            ClientMessage::decode(raw).unwrap_err(),
            DecodeError::Malformed(_)
        ));
    }
}

#[test]
fn test_decode_ping_ignores_extra_fields() {
    assert_eq!(
        ClientMessage::decode(r#"{"type":"ping","seq":3}"#).unwrap(),
        ClientMessage::Ping {}
    );
}

#[test]
fn test_decode_binary_frame() {
    assert_eq!(
        ClientMessage::decode_slice(br#"{"type":"ping"}"#).unwrap(),
        ClientMessage::Ping {}
    );
}

#[test]
fn test_decode_failures() {
    assert!(matches!(
        ClientMessage::decode("not json").unwrap_err(),
        DecodeError::Malformed(_)
    ));
    assert!(matches!(
        ClientMessage::decode("[1,2]").unwrap_err(),
        DecodeError::NotAnObject
    ));
    for raw in [
        r#"{}"#,
        r#"{"type":null}"#,
        r#"{"type":""}"#,
        r#"{"type":false}"#,
        r#"{"type":0}"#,
    ] {
        assert!(
            matches!(ClientMessage::decode(raw).unwrap_err(), DecodeError::MissingKind),
            "{raw}"
        );
    }
    assert!(matches!(
        ClientMessage::decode(r#"{"type":"announce"}"#).unwrap_err(),
        DecodeError::UnknownKind(kind) if kind == "announce"
    ));
    assert!(matches!(
        ClientMessage::decode(r#"{"type":true}"#).unwrap_err(),
        DecodeError::UnknownKind(_)
    ));
}

#[test]
fn test_outgoing_publish_frame() {
    let frame = PublishFrame {
        topic: "room".to_string(),
        fields: json!({"data": "x"}).as_object().cloned().unwrap(),
    };
    assert_eq!(
        frame.into_outgoing(3),
        json!({"type": "publish", "topic": "room", "data": "x", "clients": 3})
    );
}

#[test]
fn test_pong_wire_format() {
    assert_eq!(
        serde_json::to_value(ServerMessage::Pong {}).unwrap(),
        json!({"type": "pong"})
    );
}

#[test]
fn test_handle_subscribe() {
    let broker = Broker::new().shared();
    let (client_id, _rx) = register(&broker);

    let msg = json!({
        "type": "subscribe",
        "topics": ["test_topic"]
    })
    .to_string();

    handle_message(&broker, client_id, &msg);

    let broker = lock(&broker);
    let topic = broker.registry().get("test_topic").unwrap();
    assert!(topic.contains(&client_id));
}

#[test]
fn test_handle_unsubscribe() {
    let broker = Broker::new().shared();
    let (client_id, _rx) = register(&broker);

    // First, subscribe the client to the topic
    lock(&broker).subscribe(client_id, &["test_topic".to_string()]);

    let msg = json!({
        "type": "unsubscribe",
        "topics": ["test_topic"]
    })
    .to_string();

    handle_message(&broker, client_id, &msg);

    let broker = lock(&broker);
    assert!(broker.registry().get("test_topic").is_none());
    assert!(broker.client(&client_id).unwrap().topics().is_empty());
}

#[test]
fn test_handle_publish() {
    let broker = Broker::new().shared();
    let (publisher, _prx) = register(&broker);
    let (subscriber, mut rx) = register(&broker);
    lock(&broker).subscribe(subscriber, &["test_topic".to_string()]);

    let msg = json!({
        "type": "publish",
        "topic": "test_topic",
        "payload": "hello"
    })
    .to_string();

    handle_message(&broker, publisher, &msg);

    let received_msg = rx.try_recv().unwrap();
    if let WsMessage::Text(text) = received_msg {
        let received: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(received["topic"], "test_topic");
        assert_eq!(received["payload"], "hello");
        assert_eq!(received["clients"], 1);
    } else {
        panic!("Expected a text message");
    }
}

#[test]
fn test_handle_garbage_leaves_state_alone() {
    let broker = Broker::new().shared();
    let (client_id, mut rx) = register(&broker);

    handle_message(&broker, client_id, "{{{");
    handle_message(&broker, client_id, r#"{"type":"shout","topics":["a"]}"#);

    let guard = lock(&broker);
    assert!(guard.registry().is_empty());
    assert!(guard.is_open(&client_id));
    assert!(rx.try_recv().is_err());
}
