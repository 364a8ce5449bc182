//! LAN broadcast over UDP.
//!
//! Components announce lifecycle events or share configuration by sending a
//! datagram to the limited broadcast address; listeners hand every datagram
//! they receive to a callback.

use crate::Result;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Port used when none is given.
pub const DEFAULT_BROADCAST_PORT: u16 = 28015;

/// Largest datagram a listener reads; longer ones are truncated.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Sends datagrams to `255.255.255.255:<port>`.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    port: u16,
    target: IpAddr,
}

impl Broadcaster {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            target: IpAddr::V4(Ipv4Addr::BROADCAST),
        }
    }

    /// Send to `target` instead of the broadcast address.
    pub fn with_target(mut self, target: IpAddr) -> Self {
        self.target = target;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Send one datagram. Returns the number of bytes sent.
    pub async fn broadcast(&self, message: impl AsRef<[u8]>) -> Result<usize> {
        let message = message.as_ref();
        debug!(
            port = self.port,
            message = %String::from_utf8_lossy(message),
            "broadcasting"
        );

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        let sent = socket
            .send_to(message, SocketAddr::new(self.target, self.port))
            .await?;
        Ok(sent)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_PORT)
    }
}

/// Callback invoked with each received payload and its sender.
pub type DatagramCallback = Arc<dyn Fn(&[u8], SocketAddr) + Send + Sync>;

/// Receives broadcast datagrams on a background task.
pub struct Listener;

impl Listener {
    /// Bind `0.0.0.0:port` and call `callback` for every datagram until the
    /// returned handle is stopped.
    pub async fn spawn<F>(port: u16, callback: F) -> Result<ListenerHandle>
    where
        F: Fn(&[u8], SocketAddr) + Send + Sync + 'static,
    {
        let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
        let local_addr = socket.local_addr()?;
        let callback: DatagramCallback = Arc::new(callback);
        let (shutdown, mut stopped) = oneshot::channel::<()>();

        info!(port = local_addr.port(), "listening on broadcast port");

        let task = tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM_SIZE];
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    received = socket.recv_from(&mut buf) => match received {
                        Ok((len, from)) => {
                            debug!(%from, len, "received broadcast");
                            callback(&buf[..len], from);
                        }
                        Err(e) => {
                            warn!(error = %e, "broadcast receive failed");
                            break;
                        }
                    },
                }
            }
            debug!(port = local_addr.port(), "broadcast listener stopped");
        });

        Ok(ListenerHandle {
            local_addr,
            shutdown: Some(shutdown),
            task,
        })
    }
}

/// Handle to a running [`Listener`].
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// The bound address; useful when listening on port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop listening and wait for the background task to exit.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "broadcast listener task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_listener_receives_datagrams() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = Listener::spawn(0, move |payload, _from| {
            let _ = tx.send(String::from_utf8_lossy(payload).into_owned());
        })
        .await
        .unwrap();
        assert!(handle.is_running());

        let broadcaster = Broadcaster::new(handle.local_addr().port())
            .with_target(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let sent = broadcaster.broadcast("service up").await.unwrap();
        assert_eq!(sent, 10);

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, "service up");

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_ends_task() {
        let handle = Listener::spawn(0, |_, _| {}).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .unwrap();
    }

    #[test]
    fn test_defaults() {
        let broadcaster = Broadcaster::default();
        assert_eq!(broadcaster.port(), DEFAULT_BROADCAST_PORT);
        assert_eq!(broadcaster.target, IpAddr::V4(Ipv4Addr::BROADCAST));
    }
}
