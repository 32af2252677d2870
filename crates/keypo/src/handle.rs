//! Lifecycle-scoped access to the access-control network.

use keypo_session::{AccessControlNetwork, NetworkError};

/// A connected network client.
///
/// Obtained from [`NetworkHandle::connect`] and given back with
/// [`NetworkHandle::release`]; there is no shared global client.
pub struct NetworkHandle<N: AccessControlNetwork> {
    network: N,
}

impl<N: AccessControlNetwork> NetworkHandle<N> {
    /// Connect `network` and wrap it.
    pub async fn connect(network: N) -> Result<Self, NetworkError> {
        network.connect().await?;
        tracing::info!("connected to access-control network");
        Ok(Self { network })
    }

    /// The connected client.
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Disconnect and return the client.
    pub async fn release(self) -> Result<N, NetworkError> {
        self.network.disconnect().await?;
        tracing::info!("released access-control network");
        Ok(self.network)
    }
}
