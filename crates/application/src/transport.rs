use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
}

/// The only thing the core requires from a live client connection.
///
/// A hung `send` is expected to be bounded by the transport itself; the
/// dispatcher applies no timeout of its own.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError>;
    async fn close(&self) -> Result<(), TransportError>;
}

/// Channel-backed transport, used by tests and local tooling.
pub mod memory {
    use std::sync::Mutex;

    use super::*;

    /// Records every payload it is asked to send. `fail_sends` turns the
    /// transport into one that refuses delivery, which exercises the
    /// dispatcher's implicit-disconnect path.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        sent: Mutex<Vec<Vec<u8>>>,
        closed: Mutex<bool>,
        fail_sends: bool,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail_sends: true,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().expect("transport lock").clone()
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().expect("transport lock").len()
        }

        pub fn is_closed(&self) -> bool {
            *self.closed.lock().expect("transport lock")
        }
    }

    #[async_trait]
    impl ClientTransport for RecordingTransport {
        async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
            if self.fail_sends {
                return Err(TransportError::Closed);
            }
            self.sent.lock().expect("transport lock").push(payload.to_vec());
            Ok(())
        }

        async fn close(&self) -> Result<(), TransportError> {
            *self.closed.lock().expect("transport lock") = true;
            Ok(())
        }
    }
}
