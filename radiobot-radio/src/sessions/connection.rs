use log::{debug, warn};
use radiobot_core::{ArcedTransport, ConnectionId, TransportHandle};
use tokio::runtime::Handle;

/// Holds a live transport connection, which is closed when the guard is released or dropped
pub struct ConnectionGuard {
    transport: ArcedTransport,
    handle: TransportHandle,
    released: bool,
}

impl ConnectionGuard {
    pub fn new(transport: ArcedTransport, handle: TransportHandle) -> Self {
        Self {
            transport,
            handle,
            released: false,
        }
    }

    pub fn handle(&self) -> &TransportHandle {
        &self.handle
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.connection_id
    }

    /// Disconnects and waits for the transport to confirm it
    pub async fn release(mut self) {
        self.released = true;

        match self.transport.disconnect(&self.handle).await {
            Ok(()) => debug!(
                "Released connection {} of guild {}",
                self.handle.connection_id, self.handle.guild_id
            ),
            Err(e) => warn!(
                "Failed to disconnect from channel {} of guild {}: {}",
                self.handle.channel_id, self.handle.guild_id, e
            ),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        // Without a runtime there is nothing to disconnect with
        let Ok(runtime) = Handle::try_current() else {
            return;
        };

        let transport = self.transport.clone();
        let handle = self.handle.clone();

        runtime.spawn(async move {
            if let Err(e) = transport.disconnect(&handle).await {
                warn!(
                    "Failed to disconnect dropped connection of guild {}: {}",
                    handle.guild_id, e
                );
            }
        });
    }
}
