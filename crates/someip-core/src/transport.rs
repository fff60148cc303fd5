//! Byte-level transport the facade sends/receives datagrams over (§6).

use async_trait::async_trait;

use crate::error::Result;

/// Sends raw SOME/IP datagrams to a destination endpoint.
///
/// `Endpoint` is opaque to the facade: production code plugs in a
/// `SocketAddr`, tests plug in a small integer or a simulated peer id.
#[async_trait]
pub trait Transport<Endpoint>: Send + Sync {
    /// Sends `bytes` to `endpoint`.
    async fn send(&self, endpoint: &Endpoint, bytes: &[u8]) -> Result<()>;

    /// Sends `bytes` to the SD multicast group.
    async fn send_multicast(&self, bytes: &[u8]) -> Result<()>;
}
