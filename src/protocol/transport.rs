use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::Arc;

use ahash::AHashMap;
use tokio::net::UdpSocket;

use crate::error::{Error, Result};
use super::PeerId;
use super::packet::{SendMode, MAX_PACKET_SIZE};

/// Datagram transport between peers
///
/// Both calls are non-blocking; `recv` returns `Ok(None)` when nothing is queued.
pub trait Transport {
    /// Identity of the local peer on this transport
    fn local_peer(&self) -> PeerId;

    fn send(&mut self, to: PeerId, packet: &[u8], mode: SendMode) -> Result<()>;

    fn recv(&mut self) -> Result<Option<(PeerId, Vec<u8>)>>;
}

type Inbox = Rc<RefCell<VecDeque<(PeerId, Vec<u8>)>>>;

/// In-memory transport connecting two peers in the same thread
pub struct LoopbackTransport {
    local: PeerId,
    remote: PeerId,
    inbox: Inbox,
    outbox: Inbox,
    link_up: Rc<Cell<bool>>,
}

impl LoopbackTransport {
    /// Create both ends of a link
    pub fn pair(a: PeerId, b: PeerId) -> (Self, Self) {
        let a_inbox: Inbox = Rc::default();
        let b_inbox: Inbox = Rc::default();
        let link_up = Rc::new(Cell::new(true));
        (
            Self {
                local: a,
                remote: b,
                inbox: a_inbox.clone(),
                outbox: b_inbox.clone(),
                link_up: link_up.clone(),
            },
            Self {
                local: b,
                remote: a,
                inbox: b_inbox,
                outbox: a_inbox,
                link_up,
            },
        )
    }

    /// Cut or restore the link; packets sent while down are lost
    pub fn set_link_up(&self, up: bool) {
        self.link_up.set(up);
    }

    /// Handle that keeps control of the link after the transport is boxed
    pub fn link(&self) -> LinkHandle {
        LinkHandle(self.link_up.clone())
    }

    pub fn pending(&self) -> usize {
        self.inbox.borrow().len()
    }
}

/// Shared up/down switch of a loopback link
#[derive(Debug, Clone)]
pub struct LinkHandle(Rc<Cell<bool>>);

impl LinkHandle {
    pub fn set_up(&self, up: bool) {
        self.0.set(up);
    }

    pub fn is_up(&self) -> bool {
        self.0.get()
    }
}

impl Transport for LoopbackTransport {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn send(&mut self, to: PeerId, packet: &[u8], _mode: SendMode) -> Result<()> {
        if to != self.remote {
            return Err(Error::UnknownPeer(to));
        }
        if self.link_up.get() {
            self.outbox.borrow_mut().push_back((self.local, packet.to_vec()));
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<(PeerId, Vec<u8>)>> {
        Ok(self.inbox.borrow_mut().pop_front())
    }
}

/// UDP transport
///
/// Reliable sends are plain datagrams. The joiner repeats its handshake and
/// its world-state request until answered; streaming state is simply resent.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    local: PeerId,
    peers: AHashMap<PeerId, SocketAddr>,
    addrs: AHashMap<SocketAddr, PeerId>,
    next_peer: u64,
}

impl UdpTransport {
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await
            .map_err(|e| Error::Io(e.to_string()))?;
        // try_send_to reports WouldBlock until the reactor has seen the socket writable
        socket.writable().await
            .map_err(|e| Error::Io(e.to_string()))?;
        Ok(Self {
            socket: Arc::new(socket),
            local: PeerId(0),
            peers: AHashMap::new(),
            addrs: AHashMap::new(),
            next_peer: 1,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr()
            .map_err(|e| Error::Io(e.to_string()))
    }

    /// Register a remote address, returning its peer id
    pub fn add_peer(&mut self, addr: SocketAddr) -> PeerId {
        if let Some(&peer) = self.addrs.get(&addr) {
            return peer;
        }
        let peer = PeerId(self.next_peer);
        self.next_peer += 1;
        self.peers.insert(peer, addr);
        self.addrs.insert(addr, peer);
        tracing::debug!(%peer, %addr, "registered udp peer");
        peer
    }

    pub fn peer_addr(&self, peer: PeerId) -> Option<SocketAddr> {
        self.peers.get(&peer).copied()
    }

    /// Hand a blocked datagram to the runtime; without one it is lost
    fn send_when_writable(&self, to: PeerId, addr: SocketAddr, packet: &[u8]) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::trace!(peer = %to, "udp send would block, dropping packet");
            return;
        };
        let socket = Arc::clone(&self.socket);
        let packet = packet.to_vec();
        runtime.spawn(async move {
            if let Err(e) = socket.send_to(&packet, addr).await {
                tracing::warn!(peer = %to, error = %e, "deferred udp send failed");
            }
        });
    }
}

impl Transport for UdpTransport {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn send(&mut self, to: PeerId, packet: &[u8], _mode: SendMode) -> Result<()> {
        let addr = self.peers.get(&to).copied().ok_or(Error::UnknownPeer(to))?;
        match self.socket.try_send_to(packet, addr) {
            Ok(_) => Ok(()),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                self.send_when_writable(to, addr, packet);
                Ok(())
            }
            Err(e) => Err(Error::Io(e.to_string())),
        }
    }

    fn recv(&mut self) -> Result<Option<(PeerId, Vec<u8>)>> {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        match self.socket.try_recv_from(&mut buf) {
            Ok((len, from)) => {
                buf.truncate(len);
                let peer = self.add_peer(from);
                Ok(Some((peer, buf)))
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(Error::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_delivery() {
        let (mut a, mut b) = LoopbackTransport::pair(PeerId(1), PeerId(2));
        a.send(PeerId(2), &[1, 2, 3], SendMode::Reliable).unwrap();
        assert_eq!(b.pending(), 1);
        assert_eq!(b.recv().unwrap(), Some((PeerId(1), vec![1, 2, 3])));
        assert_eq!(b.recv().unwrap(), None);
        assert_eq!(a.recv().unwrap(), None);
    }

    #[test]
    fn test_loopback_link_down_drops() {
        let (mut a, mut b) = LoopbackTransport::pair(PeerId(1), PeerId(2));
        a.set_link_up(false);
        a.send(PeerId(2), &[9], SendMode::Unreliable).unwrap();
        assert_eq!(b.recv().unwrap(), None);
    }

    #[test]
    fn test_link_handle_outlives_transport_borrow() {
        let (a, mut b) = LoopbackTransport::pair(PeerId(1), PeerId(2));
        let link = a.link();
        let mut boxed: Box<dyn Transport> = Box::new(a);
        link.set_up(false);
        boxed.send(PeerId(2), &[1], SendMode::Reliable).unwrap();
        assert_eq!(b.recv().unwrap(), None);
        assert!(!link.is_up());
    }

    #[test]
    fn test_loopback_unknown_peer() {
        let (mut a, _b) = LoopbackTransport::pair(PeerId(1), PeerId(2));
        assert!(matches!(
            a.send(PeerId(5), &[0], SendMode::Reliable),
            Err(Error::UnknownPeer(PeerId(5)))
        ));
    }

    async fn recv_within(transport: &mut UdpTransport, attempts: usize) -> Option<(PeerId, Vec<u8>)> {
        for _ in 0..attempts {
            if let Some(packet) = transport.recv().unwrap() {
                return Some(packet);
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        None
    }

    #[test]
    fn test_udp_first_send_after_bind_delivered() {
        tokio_test::block_on(async {
            let mut host = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
            let mut joiner = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
            let host_peer = joiner.add_peer(host.local_addr().unwrap());

            // no await between bind and the first send, as in a fresh join
            joiner.send(host_peer, b"hello", SendMode::Reliable).unwrap();

            let (from, data) = recv_within(&mut host, 100).await.expect("datagram not delivered");
            assert_eq!(data, b"hello");
            assert_eq!(host.peer_addr(from), Some(joiner.local_addr().unwrap()));

            host.send(from, b"welcome", SendMode::Reliable).unwrap();
            let (back, data) = recv_within(&mut joiner, 100).await.expect("reply not delivered");
            assert_eq!(back, host_peer);
            assert_eq!(data, b"welcome");
        });
    }
}
