//! In-memory [`Transport`] for driving the stack without real sockets.
//!
//! Every sent datagram (unicast or multicast) is appended to a shared
//! inbox so a test can inspect or manually deliver it, keeping datagram
//! delivery under the test's explicit control instead of a background
//! task racing the assertions.

#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use someip_core::{Result, Transport};

/// One datagram recorded by a [`SimTransport`].
#[derive(Debug, Clone)]
pub struct Sent<Endpoint> {
    /// Destination, or `None` for a multicast send.
    pub to: Option<Endpoint>,
    /// Raw bytes handed to the transport.
    pub bytes: Vec<u8>,
}

/// Records every datagram sent through it instead of touching the network.
#[derive(Clone)]
pub struct SimTransport<Endpoint> {
    sent: Arc<Mutex<Vec<Sent<Endpoint>>>>,
}

impl<Endpoint> SimTransport<Endpoint> {
    /// Creates a transport with nothing sent yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Drains and returns every datagram sent since the last call.
    pub fn drain(&self) -> Vec<Sent<Endpoint>> {
        std::mem::take(&mut self.sent.lock().expect("sim transport mutex poisoned"))
    }
}

impl<Endpoint> Default for SimTransport<Endpoint> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Endpoint> Transport<Endpoint> for SimTransport<Endpoint>
where
    Endpoint: Clone + Send + Sync,
{
    async fn send(&self, endpoint: &Endpoint, bytes: &[u8]) -> Result<()> {
        self.sent.lock().expect("sim transport mutex poisoned").push(Sent {
            to: Some(endpoint.clone()),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    async fn send_multicast(&self, bytes: &[u8]) -> Result<()> {
        self.sent.lock().expect("sim transport mutex poisoned").push(Sent {
            to: None,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}
