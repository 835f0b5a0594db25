//! Test cluster simulation for convergence testing.
//!
//! Runs several Sans-IO clients against one [`SimServer`] without a runtime
//! or a driver. The cluster executes client actions directly: channels open
//! on the server, sends are applied in order, uploads complete immediately.
//! Delivery is explicit, so tests control the interleaving.

use std::time::Duration;

use studyroom_app::ChannelEvent;
use studyroom_client::{Client, ClientAction, ClientConfig, ClientEvent, RoomChoice};
use studyroom_proto::RoomId;
use url::Url;

use crate::{ClientSnapshot, SimEnv, SimServer, SystemSnapshot};

/// Channel endpoint the simulated clients are configured with.
const SIM_SERVER_URL: &str = "ws://sim.local/ws";

/// Simulated cluster of clients sharing one room.
pub struct TestCluster {
    env: SimEnv,
    server: SimServer,
    clients: Vec<Client<SimEnv>>,
    connections: Vec<Option<String>>,
}

impl TestCluster {
    /// Create a cluster: client 0 hosts a room, the others join it.
    ///
    /// Nobody is connected yet.
    pub fn new(seed: u64, num_clients: usize) -> Result<Self, String> {
        let env = SimEnv::with_seed(seed);
        let server_url = Url::parse(SIM_SERVER_URL).map_err(|e| format!("bad url: {e}"))?;
        let config = |i: usize, room: RoomChoice| ClientConfig {
            server_url: server_url.clone(),
            display_name: format!("Client {i}"),
            room,
            participant_id: None,
        };

        let host = Client::new(env.clone(), config(0, RoomChoice::Host))
            .map_err(|e| format!("host failed: {e}"))?;
        let room_id = host.session().room_id().clone();

        let mut clients = vec![host];
        for i in 1..num_clients {
            let client = Client::new(env.clone(), config(i, RoomChoice::Join(room_id.clone())))
                .map_err(|e| format!("client {i} failed: {e}"))?;
            clients.push(client);
        }

        let connections = vec![None; clients.len()];
        Ok(Self { env, server: SimServer::new(), clients, connections })
    }

    /// The room every client targets.
    pub fn room_id(&self) -> &RoomId {
        self.clients[0].session().room_id()
    }

    /// All clients, in creation order.
    pub fn clients(&self) -> &[Client<SimEnv>] {
        &self.clients
    }

    /// Client by index.
    pub fn client(&self, idx: usize) -> &Client<SimEnv> {
        &self.clients[idx]
    }

    /// The server.
    pub fn server(&self) -> &SimServer {
        &self.server
    }

    /// Mutable server, for injecting faults.
    pub fn server_mut(&mut self) -> &mut SimServer {
        &mut self.server
    }

    /// Shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Whether the client has an open channel.
    pub fn is_connected(&self, idx: usize) -> bool {
        self.connections[idx].is_some()
    }

    /// Open the client's channel. Joining follows from the client's actions.
    pub fn connect(&mut self, idx: usize) -> Result<(), String> {
        self.handle(idx, ClientEvent::Connect)
    }

    /// Feed an event to a client and execute everything it asks for.
    pub fn handle(&mut self, idx: usize, event: ClientEvent<Duration>) -> Result<(), String> {
        let actions =
            self.clients[idx].handle(event).map_err(|e| format!("client {idx} rejected: {e}"))?;
        self.execute(idx, actions)
    }

    /// Deliver the next queued server event to a client.
    ///
    /// Returns `false` when nothing was waiting.
    pub fn deliver_one(&mut self, idx: usize) -> Result<bool, String> {
        let Some(connection_id) = self.connections[idx].clone() else {
            return Ok(false);
        };

        match self.server.recv(&connection_id) {
            Some(ChannelEvent::Received(event)) => {
                self.handle(idx, ClientEvent::EventReceived(event))?;
            },
            Some(ChannelEvent::Closed { reason }) => {
                self.connections[idx] = None;
                self.handle(idx, ClientEvent::ChannelClosed { reason })?;
            },
            None => return Ok(false),
        }
        Ok(true)
    }

    /// Deliver round-robin until the server has nothing left to deliver.
    pub fn deliver_all(&mut self) -> Result<(), String> {
        loop {
            let mut delivered = false;
            for idx in 0..self.clients.len() {
                delivered |= self.deliver_one(idx)?;
            }
            if !delivered {
                return Ok(());
            }
        }
    }

    /// Snapshot every client for invariant checking.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::from_clients(
            self.clients
                .iter()
                .enumerate()
                .map(|(i, client)| ClientSnapshot::from_client(i, client))
                .collect(),
        )
    }

    fn execute(&mut self, idx: usize, initial: Vec<ClientAction>) -> Result<(), String> {
        let mut pending = initial;

        while !pending.is_empty() {
            for action in std::mem::take(&mut pending) {
                let follow_up = match action {
                    ClientAction::OpenChannel { .. } => match self.server.connect() {
                        Ok(connection_id) => {
                            self.connections[idx] = Some(connection_id.clone());
                            ClientEvent::ChannelOpened { connection_id }
                        },
                        Err(reason) => ClientEvent::ChannelFailed { reason },
                    },
                    ClientAction::CloseChannel => {
                        if let Some(connection_id) = self.connections[idx].take() {
                            self.server.disconnect(&connection_id);
                        }
                        continue;
                    },
                    ClientAction::Send(event) => {
                        if let Some(connection_id) = &self.connections[idx] {
                            self.server.handle(connection_id, event);
                        }
                        continue;
                    },
                    ClientAction::Upload { request_id, file } => ClientEvent::UploadFinished {
                        request_id,
                        outcome: Ok(format!("uploads/{}", file.name)),
                    },
                    ClientAction::ConnectionChanged(_)
                    | ClientAction::Joined { .. }
                    | ClientAction::RoomUpdated
                    | ClientAction::Notify(_) => continue,
                };

                pending.extend(
                    self.clients[idx]
                        .handle(follow_up)
                        .map_err(|e| format!("client {idx} rejected: {e}"))?,
                );
            }
        }
        Ok(())
    }
}
