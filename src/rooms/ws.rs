use std::fmt::Display;

use axum::{
    debug_handler,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Response},
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{AppResult, config::RealtimeConfig, res, tokens::TokenStore};

use super::{
    deny::{self, Exit},
    hub::{HubHandle, Hubs},
    msg::Inbound,
    registry::ConnectionId,
};

#[debug_handler(state = crate::AppState)]
pub async fn room_ws(
    Path(room_id): Path<i64>,
    State(hubs): State<Hubs>,
    State(tokens): State<TokenStore>,
    State(realtime): State<RealtimeConfig>,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(hub) = hubs.get(room_id) else {
        return res::sorry("room");
    };

    Ok(ws
        .on_upgrade(move |socket| serve(socket, hub, tokens, realtime))
        .into_response())
}

async fn serve(socket: WebSocket, hub: HubHandle, tokens: TokenStore, realtime: RealtimeConfig) {
    let id = ConnectionId::new();
    let (outbox, mut inbox) = mpsc::channel(realtime.outbox_capacity);
    let (mut sender, receiver) = socket.split();

    hub.register(id, outbox);

    let exit = {
        let reader = read_frames(receiver, &hub, &tokens);
        let writer = write_frames(&mut sender, &mut inbox);
        tokio::select! {
            exit = reader => exit,
            exit = writer => exit,
        }
    };

    hub.unregister(id);
    debug!(room_id = hub.room_id(), %id, ?exit, "connection ended");

    if let Some(frame) = deny::closing_frame(realtime.deny_mode, exit) {
        let _ = sender.send(frame).await;
    }
    let _ = sender.close().await;
}

/// Every frame is authenticated on its own, against this hub's room.
pub(crate) async fn read_frames<S, E>(mut receiver: S, hub: &HubHandle, tokens: &TokenStore) -> Exit
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(room_id = hub.room_id(), error = %e, "read failed");
                return Exit::ReadFailed;
            }
        };

        let (payload, is_text) = match &frame {
            Message::Text(text) => (text.as_str().as_bytes(), true),
            Message::Binary(bytes) => (bytes.as_ref(), false),
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return Exit::Closed,
        };

        let Ok(Inbound { token, content }) = serde_json::from_slice(payload) else {
            debug!(room_id = hub.room_id(), "malformed frame");
            return Exit::Malformed;
        };

        let sender = match tokens.resolve(&token).await {
            Ok(Some(sender)) if sender.room_id == hub.room_id() => sender,
            Ok(Some(sender)) => {
                debug!(room_id = hub.room_id(), token_room_id = sender.room_id, "token minted for another room");
                return Exit::Unauthorized;
            }
            Ok(None) => return Exit::Unauthorized,
            Err(e) => {
                warn!(room_id = hub.room_id(), error = %e, "token lookup failed, denying");
                return Exit::StoreFailed;
            }
        };

        if !is_text {
            debug!(room_id = hub.room_id(), user_id = sender.user_id, "ignoring binary frame");
            continue;
        }

        hub.broadcast(sender.login, content);
    }

    Exit::Closed
}

async fn write_frames<W>(sender: &mut W, inbox: &mut mpsc::Receiver<String>) -> Exit
where
    W: Sink<Message> + Unpin,
{
    while let Some(frame) = inbox.recv().await {
        if sender.send(Message::Text(frame.into())).await.is_err() {
            return Exit::WriteFailed;
        }
    }

    Exit::Evicted
}

#[cfg(test)]
mod tests {
    use std::{convert::Infallible, time::Duration};

    use futures_util::stream;
    use tokio::time::timeout;

    use super::*;
    use crate::{
        db::{self, Room, User},
        rooms::{hub::RoomHub, msg::Outbound},
    };

    struct Fixture {
        hub: HubHandle,
        tokens: TokenStore,
        listener: mpsc::Receiver<String>,
        alice: String,
        alice_elsewhere: String,
    }

    async fn fixture() -> Fixture {
        let db_pool = db::connect_in_memory().await.unwrap();
        let user_id = User::insert(&db_pool, "alice", "alice@example.com", "hash").await.unwrap();
        Room::insert(&db_pool, 2, "Random").await.unwrap();
        let tokens = TokenStore::new(db_pool);
        let alice = tokens.mint(1, user_id).await.unwrap().value;
        let alice_elsewhere = tokens.mint(2, user_id).await.unwrap().value;

        let hub = RoomHub::spawn(1);
        let (outbox, listener) = mpsc::channel(16);
        hub.register(ConnectionId::new(), outbox);

        Fixture { hub, tokens, listener, alice, alice_elsewhere }
    }

    fn text(body: String) -> Result<Message, Infallible> {
        Ok(Message::Text(body.into()))
    }

    fn post(token: &str, content: &str) -> Result<Message, Infallible> {
        text(serde_json::json!({"Token": token, "Content": content}).to_string())
    }

    async fn received(listener: &mut mpsc::Receiver<String>) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = timeout(Duration::from_millis(200), listener.recv()).await {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    fn from_alice(content: &str) -> Outbound {
        Outbound { login: "alice".to_string(), content: content.to_string() }
    }

    #[tokio::test]
    async fn test_valid_messages_are_broadcast_in_order() {
        let mut f = fixture().await;
        let frames = stream::iter(vec![post(&f.alice, "m1"), post(&f.alice, "m2")]);

        assert_eq!(read_frames(frames, &f.hub, &f.tokens).await, Exit::Closed);
        assert_eq!(received(&mut f.listener).await, vec![from_alice("m1"), from_alice("m2")]);
    }

    #[tokio::test]
    async fn test_unknown_token_ends_connection() {
        let mut f = fixture().await;
        let frames = stream::iter(vec![post("bogus", "hi"), post(&f.alice, "never read")]);

        assert_eq!(read_frames(frames, &f.hub, &f.tokens).await, Exit::Unauthorized);
        assert!(received(&mut f.listener).await.is_empty());
    }

    #[tokio::test]
    async fn test_token_for_another_room_ends_connection() {
        let mut f = fixture().await;
        let frames = stream::iter(vec![post(&f.alice_elsewhere, "wrong room"), post(&f.alice, "never read")]);

        assert_eq!(read_frames(frames, &f.hub, &f.tokens).await, Exit::Unauthorized);
        assert!(received(&mut f.listener).await.is_empty());
    }

    #[tokio::test]
    async fn test_every_message_is_revalidated() {
        let mut f = fixture().await;
        let first = stream::iter(vec![post(&f.alice, "before")]);
        assert_eq!(read_frames(first, &f.hub, &f.tokens).await, Exit::Closed);

        f.tokens.revoke_for_user(1).await.unwrap();
        let second = stream::iter(vec![post(&f.alice, "after")]);
        assert_eq!(read_frames(second, &f.hub, &f.tokens).await, Exit::Unauthorized);

        assert_eq!(received(&mut f.listener).await, vec![from_alice("before")]);
    }

    #[tokio::test]
    async fn test_malformed_frame_ends_connection() {
        let mut f = fixture().await;
        let frames = stream::iter(vec![text("not json".to_string()), post(&f.alice, "never read")]);

        assert_eq!(read_frames(frames, &f.hub, &f.tokens).await, Exit::Malformed);
        assert!(received(&mut f.listener).await.is_empty());
    }

    #[tokio::test]
    async fn test_binary_frames_are_authenticated_but_not_broadcast() {
        let mut f = fixture().await;
        let binary = serde_json::json!({"Token": f.alice, "Content": "bin"}).to_string();
        let frames = stream::iter(vec![
            Ok(Message::Binary(binary.into_bytes().into())),
            post(&f.alice, "text"),
            Ok(Message::Binary(b"garbage".to_vec().into())),
        ]);

        assert_eq!(read_frames(frames, &f.hub, &f.tokens).await, Exit::Malformed);
        assert_eq!(received(&mut f.listener).await, vec![from_alice("text")]);
    }

    #[tokio::test]
    async fn test_close_and_errors() {
        let f = fixture().await;

        let frames = stream::iter(vec![Ok::<_, Infallible>(Message::Close(None)), post(&f.alice, "x")]);
        assert_eq!(read_frames(frames, &f.hub, &f.tokens).await, Exit::Closed);

        let frames = stream::iter(vec![Err::<Message, _>("connection reset")]);
        assert_eq!(read_frames(frames, &f.hub, &f.tokens).await, Exit::ReadFailed);
    }

    #[tokio::test]
    async fn test_write_frames_stops_when_evicted() {
        let (outbox, mut inbox) = mpsc::channel(4);
        outbox.send("one".to_string()).await.unwrap();
        drop(outbox);

        let mut sink = futures_util::sink::drain();
        assert_eq!(write_frames(&mut sink, &mut inbox).await, Exit::Evicted);
    }
}
