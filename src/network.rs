use crate::types::RouterId;
use log::{debug, info};
use std::io;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not bound yet")]
    NotBound,

    #[error("router {0} has no port above base port {1}")]
    PortOutOfRange(RouterId, u16),

    #[error("transport already bound for router {0}")]
    AlreadyBound(RouterId),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Derives addresses from router ids: router `id` lives at `bind_ip:base_port + id`.
///
/// Only meaningful when every router shares one host. Deployments across
/// hosts need an explicit neighbor -> address table instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMap {
    pub bind_ip: IpAddr,
    pub base_port: u16,
}

impl PortMap {
    pub fn new(bind_ip: IpAddr, base_port: u16) -> Self {
        Self { bind_ip, base_port }
    }

    pub fn port_of(&self, id: RouterId) -> Result<u16, TransportError> {
        self.base_port
            .checked_add(id.0)
            .ok_or(TransportError::PortOutOfRange(id, self.base_port))
    }

    pub fn address_of(&self, id: RouterId) -> Result<SocketAddr, TransportError> {
        Ok(SocketAddr::new(self.bind_ip, self.port_of(id)?))
    }

    /// Inverse mapping from a datagram's source address.
    pub fn router_id_of(&self, addr: SocketAddr) -> Option<RouterId> {
        addr.port().checked_sub(self.base_port).map(RouterId)
    }
}

/// The single UDP endpoint a router sends and receives on. Bound once,
/// when the router learns its own id.
#[derive(Debug)]
pub struct Transport {
    ports: PortMap,
    socket: OnceCell<(RouterId, UdpSocket)>,
}

impl Transport {
    pub fn new(ports: PortMap) -> Self {
        Self {
            ports,
            socket: OnceCell::new(),
        }
    }

    pub fn ports(&self) -> &PortMap {
        &self.ports
    }

    pub fn is_bound(&self) -> bool {
        self.socket.initialized()
    }

    pub async fn bind(&self, id: RouterId) -> Result<SocketAddr, TransportError> {
        if let Some((bound_id, _)) = self.socket.get() {
            return Err(TransportError::AlreadyBound(*bound_id));
        }

        let addr = self.ports.address_of(id)?;
        let (_, socket) = self
            .socket
            .get_or_try_init(|| async move {
                let socket = UdpSocket::bind(addr).await?;
                Ok::<_, TransportError>((id, socket))
            })
            .await?;

        let local = socket.local_addr()?;
        info!("Router {} bound to {}", id, local);
        Ok(local)
    }

    fn socket(&self) -> Result<&UdpSocket, TransportError> {
        self.socket
            .get()
            .map(|(_, socket)| socket)
            .ok_or(TransportError::NotBound)
    }

    pub async fn send_to(&self, neighbor: RouterId, payload: &[u8]) -> Result<(), TransportError> {
        let target = self.ports.address_of(neighbor)?;
        self.socket()?.send_to(payload, target).await?;
        debug!("Sent {} bytes to router {} at {}", payload.len(), neighbor, target);
        Ok(())
    }

    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        Ok(self.socket()?.recv_from(buf).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn localhost(base_port: u16) -> PortMap {
        PortMap::new(IpAddr::V4(Ipv4Addr::LOCALHOST), base_port)
    }

    #[test]
    fn test_port_mapping_roundtrip() {
        let ports = localhost(8000);
        let addr = ports.address_of(RouterId(3)).unwrap();
        assert_eq!(addr, "127.0.0.1:8003".parse().unwrap());
        assert_eq!(ports.router_id_of(addr), Some(RouterId(3)));
    }

    #[test]
    fn test_port_below_base_is_not_a_router() {
        let ports = localhost(8000);
        assert_eq!(ports.router_id_of("127.0.0.1:7999".parse().unwrap()), None);
        assert_eq!(ports.router_id_of("127.0.0.1:8000".parse().unwrap()), Some(RouterId(0)));
    }

    #[test]
    fn test_port_overflow_is_rejected() {
        let ports = localhost(65000);
        assert!(matches!(
            ports.port_of(RouterId(600)),
            Err(TransportError::PortOutOfRange(RouterId(600), 65000))
        ));
    }

    #[tokio::test]
    async fn test_unbound_transport_refuses_io() {
        let transport = Transport::new(localhost(46000));
        let mut buf = [0u8; 8];
        assert!(matches!(
            transport.send_to(RouterId(1), b"x").await,
            Err(TransportError::NotBound)
        ));
        assert!(matches!(
            transport.recv_from(&mut buf).await,
            Err(TransportError::NotBound)
        ));
    }

    #[tokio::test]
    async fn test_send_and_identify_sender() {
        let a = Transport::new(localhost(46010));
        let b = Transport::new(localhost(46010));
        a.bind(RouterId(1)).await.unwrap();
        b.bind(RouterId(2)).await.unwrap();
        assert!(matches!(a.bind(RouterId(1)).await, Err(TransportError::AlreadyBound(_))));

        a.send_to(RouterId(2), &[0, 0]).await.unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = b.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[0, 0]);
        assert_eq!(b.ports().router_id_of(from), Some(RouterId(1)));
    }
}
