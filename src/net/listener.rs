//! TCP listener binding for the web frontend.
//!
//! # Responsibilities
//! - Resolve the configured address and port
//! - Bind synchronously so the bound port is known before serving starts
//! - Hand a non-blocking std listener to axum-server

use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use thiserror::Error;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address did not resolve to any socket address.
    #[error("failed to resolve {address}:{port}: {source}")]
    Resolve {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl ListenerError {
    pub fn into_io(self) -> std::io::Error {
        match self {
            ListenerError::Resolve { source, .. } | ListenerError::Bind { source, .. } => source,
        }
    }
}

/// A bound listener and the address it actually listens on.
#[derive(Debug)]
pub struct BoundListener {
    pub listener: TcpListener,
    pub local_addr: SocketAddr,
}

/// Bind `address:port`. Port 0 binds an ephemeral port.
pub fn bind(address: &str, port: u16) -> Result<BoundListener, ListenerError> {
    let addr = (address, port)
        .to_socket_addrs()
        .and_then(|mut addrs| {
            addrs.next().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no address resolved")
            })
        })
        .map_err(|source| ListenerError::Resolve {
            address: address.to_string(),
            port,
            source,
        })?;

    let listener = TcpListener::bind(addr).map_err(|source| ListenerError::Bind { addr, source })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| ListenerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::info!(address = %local_addr, "Listener bound");

    Ok(BoundListener {
        listener,
        local_addr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_port() {
        let bound = bind("127.0.0.1", 0).unwrap();
        assert_ne!(bound.local_addr.port(), 0);
    }

    #[test]
    fn test_port_in_use() {
        let first = bind("127.0.0.1", 0).unwrap();
        let err = bind("127.0.0.1", first.local_addr.port()).unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[test]
    fn test_unresolvable_address() {
        let err = bind("definitely not an address", 80).unwrap_err();
        assert!(matches!(err, ListenerError::Resolve { .. }));
    }
}
