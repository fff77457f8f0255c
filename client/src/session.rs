use std::convert::TryFrom;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use system::{
    ClientEvent, ClientReplica, Delta, DownPayload, MovePayload, Point, ServerEvent, Snapshot,
    UserPayload, Username,
};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::{ClientConfig, TransportKind};
use crate::error::Result;
use crate::transport::{Inbound, LongPollTransport, PushTransport, Transport};

/// Called with the replica after every flush or clear.
pub type Redraw = Arc<dyn Fn(&ClientReplica) + Send + Sync>;

struct Shared {
    replica: Mutex<ClientReplica>,
    pending: Mutex<Option<Delta>>,
    clock: Clock,
    redraw: Redraw,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn schedule(self: &Arc<Self>, delta: Delta) {
        lock(&self.pending)
            .get_or_insert_with(Delta::default)
            .merge(delta);
        let shared = self.clone();
        tokio::spawn(async move {
            let flusher = shared.clone();
            shared.clock.tick(move || flusher.flush()).await;
        });
    }

    fn flush(&self) {
        let delta = lock(&self.pending).take();
        let mut replica = lock(&self.replica);
        if let Some(delta) = delta {
            replica.apply_update(delta);
        }
        (self.redraw)(&replica);
    }

    /// Pending pencils survive a clear; pending stroke fragments do not.
    fn clear(&self) {
        if let Some(pending) = lock(&self.pending).as_mut() {
            pending.strokes.clear();
        }
        let mut replica = lock(&self.replica);
        replica.apply_clear();
        (self.redraw)(&replica);
    }
}

/// One user's view of the shared board: emits that user's actions and keeps
/// a [`ClientReplica`] in sync with the server's broadcasts.
pub struct ClientSession {
    username: Username,
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    receiver: JoinHandle<()>,
}

impl ClientSession {
    pub async fn connect(
        config: &ClientConfig,
        username: impl Into<Username>,
        redraw: Redraw,
    ) -> Result<Self> {
        let (transport, inbound): (Arc<dyn Transport>, Inbound) = match config.transport {
            TransportKind::Push => {
                let (transport, inbound) = PushTransport::connect(&config.ws_url()).await?;
                (Arc::new(transport), inbound)
            }
            TransportKind::LongPoll => {
                let (transport, inbound) = LongPollTransport::connect(config);
                (Arc::new(transport), inbound)
            }
        };

        // Fetched after the transport is up so no broadcast falls in between.
        let snapshot = reqwest::get(config.url("/"))
            .await?
            .error_for_status()?
            .json::<Snapshot>()
            .await?;

        Ok(Self::with_transport(
            username,
            snapshot,
            transport,
            inbound,
            Clock::new(config.frames_per_second),
            redraw,
        ))
    }

    pub fn with_transport(
        username: impl Into<Username>,
        snapshot: Snapshot,
        transport: Arc<dyn Transport>,
        inbound: Inbound,
        clock: Clock,
        redraw: Redraw,
    ) -> Self {
        let shared = Arc::new(Shared {
            replica: Mutex::new(ClientReplica::new(snapshot)),
            pending: Mutex::new(None),
            clock,
            redraw,
        });
        let receiver = tokio::spawn(receive_loop(shared.clone(), inbound));
        Self {
            username: username.into(),
            transport,
            shared,
            receiver,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn replica(&self) -> ClientReplica {
        lock(&self.shared.replica).clone()
    }

    pub async fn move_to(&self, position: Point) -> Result<()> {
        self.emit(ClientEvent::Move(MovePayload {
            position,
            username: self.username.clone(),
        }))
        .await
    }

    pub async fn press(&self, position: Point, color: impl Into<String>) -> Result<()> {
        self.emit(ClientEvent::Down(DownPayload {
            position,
            color: color.into(),
            username: self.username.clone(),
        }))
        .await
    }

    pub async fn release(&self) -> Result<()> {
        self.emit(ClientEvent::Up(self.user())).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.emit(ClientEvent::Clear).await
    }

    pub async fn leave(&self) -> Result<()> {
        self.emit(ClientEvent::Leave(self.user())).await
    }

    /// Leaves the board and shuts the transport down.
    pub async fn close(self) {
        if let Err(e) = self.leave().await {
            log::warn!("{} could not leave cleanly: {}", self.username, e);
        }
        self.transport.close().await;
    }

    async fn emit(&self, event: ClientEvent) -> Result<()> {
        log::debug!("{} -> {}", self.username, event.name());
        self.transport.emit(&event).await
    }

    fn user(&self) -> UserPayload {
        UserPayload {
            username: self.username.clone(),
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

async fn receive_loop(shared: Arc<Shared>, mut inbound: Inbound) {
    while let Some(envelope) = inbound.recv().await {
        match ServerEvent::try_from(envelope) {
            Ok(ServerEvent::Update(delta)) => shared.schedule(delta),
            Ok(ServerEvent::Clear) => shared.clear(),
            Err(e) => log::warn!("Ignored server event: {}", e),
        }
    }
    log::debug!("receive loop - terminated");
}
