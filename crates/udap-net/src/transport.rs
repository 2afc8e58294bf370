//! ---
//! udap_section: "05-networking-external-interfaces"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDP broadcast transport and device operations."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, warn};
use udap_common::NetworkConfig;

use crate::{NetError, Result};

/// A received datagram and who sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Address the datagram came from.
    pub sender: SocketAddr,
    /// Datagram contents.
    pub bytes: Bytes,
}

/// Send-then-listen primitive used by the device client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send once and collect every reply that arrives before `timeout` elapses.
    /// No replies is not an error.
    async fn send_then_collect(
        &self,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<Datagram>>;

    /// Send once and return the first reply, failing with
    /// [`NetError::Timeout`] when none arrives in time.
    async fn send_then_await_one(
        &self,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Datagram>;
}

/// Broadcasts requests from a chosen interface and listens for replies on
/// every interface.
#[derive(Debug, Clone)]
pub struct BroadcastTransport {
    interface: Ipv4Addr,
    broadcast: Ipv4Addr,
    recv_buffer: usize,
}

impl BroadcastTransport {
    /// Build a transport sending from `interface` to `broadcast`.
    pub fn new(interface: Ipv4Addr, broadcast: Ipv4Addr, recv_buffer: usize) -> Self {
        Self {
            interface,
            broadcast,
            recv_buffer,
        }
    }

    /// Send the payload and return a socket listening on the same port.
    async fn broadcast(&self, port: u16, payload: &[u8]) -> Result<UdpSocket> {
        let sender = UdpSocket::bind(SocketAddrV4::new(self.interface, 0)).await?;
        sender.set_broadcast(true)?;
        let target = SocketAddrV4::new(self.broadcast, port);
        sender.send_to(payload, target).await?;
        let local = sender.local_addr()?;
        debug!(%target, %local, len = payload.len(), "broadcast request sent");

        if self.interface.is_unspecified() {
            return Ok(sender);
        }
        // A socket bound to one address does not see broadcast replies, so
        // listen on the wildcard address with the port the request used.
        drop(sender);
        let listener =
            UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, local.port())).await?;
        Ok(listener)
    }
}

async fn recv(socket: &UdpSocket, capacity: usize) -> io::Result<Datagram> {
    let mut buf = vec![0u8; capacity];
    let (len, sender) = socket.recv_from(&mut buf).await?;
    debug!(%sender, len, "datagram received");
    buf.truncate(len);
    Ok(Datagram {
        sender,
        bytes: Bytes::from(buf),
    })
}

/// Gather datagrams until the deadline passes. A receive error ends the
/// collection with whatever arrived before it.
async fn collect_until<F, Fut>(deadline: Instant, mut next: F) -> Vec<Datagram>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<Datagram>>,
{
    let mut replies = Vec::new();
    loop {
        match tokio::time::timeout_at(deadline, next()).await {
            Err(_) => break,
            Ok(Ok(datagram)) => replies.push(datagram),
            Ok(Err(err)) => {
                warn!(%err, collected = replies.len(), "receive failed, ending collection");
                break;
            }
        }
    }
    replies
}

impl From<&NetworkConfig> for BroadcastTransport {
    fn from(config: &NetworkConfig) -> Self {
        Self::new(config.interface, config.broadcast, config.recv_buffer)
    }
}

#[async_trait]
impl Transport for BroadcastTransport {
    async fn send_then_collect(
        &self,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<Datagram>> {
        let socket = self.broadcast(port, payload).await?;
        let deadline = Instant::now() + timeout;
        let capacity = self.recv_buffer;
        let socket = &socket;
        Ok(collect_until(deadline, move || recv(socket, capacity)).await)
    }

    async fn send_then_await_one(
        &self,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Datagram> {
        let socket = self.broadcast(port, payload).await?;
        match tokio::time::timeout(timeout, recv(&socket, self.recv_buffer)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(NetError::Timeout(timeout)),
        }
    }
}

/// Scripted transport that records requests and replays queued replies.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    replies: Arc<Mutex<VecDeque<Datagram>>>,
    sent: Arc<Mutex<Vec<(u16, Bytes)>>>,
}

impl InMemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next request.
    pub fn push_reply(&self, sender: SocketAddr, bytes: impl Into<Bytes>) {
        self.replies.lock().push_back(Datagram {
            sender,
            bytes: bytes.into(),
        });
    }

    /// Every `(port, payload)` sent so far.
    pub fn sent(&self) -> Vec<(u16, Bytes)> {
        self.sent.lock().clone()
    }

    fn record(&self, port: u16, payload: &[u8]) {
        self.sent.lock().push((port, Bytes::copy_from_slice(payload)));
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send_then_collect(
        &self,
        port: u16,
        payload: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<Datagram>> {
        self.record(port, payload);
        Ok(self.replies.lock().drain(..).collect())
    }

    async fn send_then_await_one(
        &self,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Datagram> {
        self.record(port, payload);
        self.replies
            .lock()
            .pop_front()
            .ok_or(NetError::Timeout(timeout))
    }
}
