use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{info, warn};
use uuid::Uuid;

use super::{dto::LiveEvent, AppState};
use crate::{broadcaster::Broadcaster, db::models::Reading};

/// Upgrade to a WebSocket that receives a `newData` frame per stored
/// reading.
///
/// The subscription is taken before the upgrade completes, so every write
/// made after the client's handshake is delivered.
pub async fn subscribe(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let rx = state.broadcaster.subscribe();
    let broadcaster = state.broadcaster.clone();

    ws.on_upgrade(move |socket| serve_subscriber(socket, rx, broadcaster))
}

async fn serve_subscriber(socket: WebSocket, mut rx: Receiver<Reading>, broadcaster: Broadcaster) {
    let subscriber = Uuid::new_v4();
    info!(
        %subscriber,
        subscribers = broadcaster.subscriber_count(),
        "Live subscriber connected"
    );

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let reading = match rx.recv().await {
                Ok(reading) => reading,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%subscriber, skipped, "Live subscriber lagged; readings skipped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let frame = match serde_json::to_string(&LiveEvent::new_data(reading)) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(%subscriber, error = %e, "Failed to encode live event");
                    continue;
                }
            };

            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames carry nothing; only a close or an error ends the session.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!(%subscriber, "Live subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use std::time::Duration;

    use serde_json::{json, Value};
    use sqlx::PgPool;

    use crate::{
        api::{router, AppState},
        broadcaster::Broadcaster,
        db::Store,
    };

    async fn http_server(pool: PgPool) -> (TestServer, Broadcaster) {
        let store = Store::new(pool);
        store.ensure_schema().await.unwrap();
        let broadcaster = Broadcaster::new(16);
        let state = AppState::new(store, broadcaster.clone(), 1000);
        let server = TestServer::builder()
            .http_transport()
            .build(router(state))
            .unwrap();
        (server, broadcaster)
    }

    #[sqlx::test(migrations = false)]
    async fn subscriber_receives_new_data_for_each_write(pool: PgPool) {
        let (server, _) = http_server(pool).await;
        let mut ws = server.get_websocket("/ws").await.into_websocket().await;

        let mut ids = Vec::new();
        for value in [1, 0] {
            let body: Value = server
                .post("/api/data")
                .json(&json!({ "value": value, "pc_timestamp": "12:00:00" }))
                .await
                .json();
            ids.push(body["id"].as_i64().unwrap());
        }

        for (id, value) in ids.iter().zip([1, 0]) {
            let frame: Value = ws.receive_json().await;
            assert_eq!(frame["event"], "newData");
            assert_eq!(frame["data"]["id"], *id);
            assert_eq!(frame["data"]["value"], value);
            assert_eq!(frame["data"]["pc_timestamp"], "12:00:00");
        }
    }

    #[sqlx::test(migrations = false)]
    async fn late_subscriber_sees_only_later_writes(pool: PgPool) {
        let (server, _) = http_server(pool).await;
        server.post("/api/data").json(&json!({ "value": 1 })).await;

        let mut ws = server.get_websocket("/ws").await.into_websocket().await;
        let body: Value = server.post("/api/data").json(&json!({ "value": 0 })).await.json();

        let frame: Value = ws.receive_json().await;
        assert_eq!(frame["data"]["id"], body["id"]);
        assert_eq!(frame["data"]["id"], 2);
    }

    #[sqlx::test(migrations = false)]
    async fn closed_socket_drops_its_subscription(pool: PgPool) {
        let (server, broadcaster) = http_server(pool).await;

        let ws = server.get_websocket("/ws").await.into_websocket().await;
        assert_eq!(broadcaster.subscriber_count(), 1);

        ws.close().await;
        for _ in 0..100 {
            if broadcaster.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
