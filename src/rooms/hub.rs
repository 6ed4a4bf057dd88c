use std::{collections::HashMap, sync::Arc};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tracing::{debug, error, warn};

use crate::db::Room;

use super::{
    msg::Outbound,
    registry::{ConnectionId, ConnectionRegistry, Outbox},
};

enum Command {
    Register(ConnectionId, Outbox),
    Unregister(ConnectionId),
    Broadcast(Outbound),
    MemberCount(oneshot::Sender<usize>),
}

#[derive(Clone, Debug)]
pub struct HubHandle {
    room_id: i64,
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Register(id, _) => write!(f, "Register({id})"),
            Command::Unregister(id) => write!(f, "Unregister({id})"),
            Command::Broadcast(_) => f.write_str("Broadcast"),
            Command::MemberCount(_) => f.write_str("MemberCount"),
        }
    }
}

impl HubHandle {
    pub fn room_id(&self) -> i64 {
        self.room_id
    }

    pub fn register(&self, id: ConnectionId, outbox: Outbox) {
        self.send(Command::Register(id, outbox));
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.send(Command::Unregister(id));
    }

    pub fn broadcast(&self, login: String, content: String) {
        self.send(Command::Broadcast(Outbound { login, content }));
    }

    pub async fn member_count(&self) -> Option<usize> {
        let (reply, count) = oneshot::channel();
        self.send(Command::MemberCount(reply));
        count.await.ok()
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            warn!(room_id = self.room_id, command = ?e.0, "room hub is not running");
        }
    }
}

pub struct RoomHub {
    room_id: i64,
    registry: ConnectionRegistry,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl RoomHub {
    pub fn spawn(room_id: i64) -> HubHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = RoomHub {
            room_id,
            registry: ConnectionRegistry::default(),
            commands: rx,
        };
        tokio::spawn(hub.run());

        HubHandle { room_id, commands: tx }
    }

    async fn run(mut self) {
        debug!(room_id = self.room_id, "room hub started");
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        debug!(room_id = self.room_id, "room hub stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register(id, outbox) => {
                if !self.registry.insert(id, outbox) {
                    warn!(room_id = self.room_id, %id, "connection registered twice");
                }
                debug!(room_id = self.room_id, %id, members = self.registry.len(), "connection registered");
            }
            Command::Unregister(id) => {
                if self.registry.remove(&id) {
                    debug!(room_id = self.room_id, %id, members = self.registry.len(), "connection unregistered");
                }
            }
            Command::Broadcast(message) => self.broadcast(&message),
            Command::MemberCount(reply) => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    /// Never waits on a member. A closed or full outbox gets its member
    /// evicted, which closes that connection.
    fn broadcast(&mut self, message: &Outbound) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                error!(room_id = self.room_id, error = %e, "cannot encode broadcast");
                return;
            }
        };

        let failed: Vec<ConnectionId> = self
            .registry
            .iter()
            .filter_map(|(id, outbox)| match outbox.try_send(frame.clone()) {
                Ok(()) => None,
                Err(TrySendError::Full(_)) => {
                    debug!(room_id = self.room_id, %id, "outbox full, evicting");
                    Some(*id)
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(room_id = self.room_id, %id, "outbox closed, evicting");
                    Some(*id)
                }
            })
            .collect();

        for id in failed {
            self.registry.remove(&id);
        }
    }
}

#[derive(Clone, Default)]
pub struct Hubs(Arc<HashMap<i64, HubHandle>>);

impl Hubs {
    pub fn spawn_for(rooms: &[Room]) -> Self {
        Hubs(Arc::new(
            rooms
                .iter()
                .map(|room| (room.id, RoomHub::spawn(room.id)))
                .collect(),
        ))
    }

    pub fn get(&self, room_id: i64) -> Option<HubHandle> {
        self.0.get(&room_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
