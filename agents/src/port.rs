use std::fmt;
use std::future::Future;

use vessel_rpc::{RemoteContainer, RpcError};

/// The container operations an agent needs, independent of transport.
pub trait ContainerPort {
    type Error: fmt::Display + Send;

    fn is_destroyed(&mut self) -> impl Future<Output = Result<bool, Self::Error>> + Send;
    fn pressure(&mut self) -> impl Future<Output = Result<f64, Self::Error>> + Send;
    fn increase_mass(&mut self, mass: f64) -> impl Future<Output = Result<(), Self::Error>> + Send;
    fn decrease_mass(&mut self, mass: f64) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl ContainerPort for RemoteContainer {
    type Error = RpcError;

    async fn is_destroyed(&mut self) -> Result<bool, RpcError> {
        RemoteContainer::is_destroyed(self).await
    }

    async fn pressure(&mut self) -> Result<f64, RpcError> {
        self.get_pressure().await
    }

    async fn increase_mass(&mut self, mass: f64) -> Result<(), RpcError> {
        RemoteContainer::increase_mass(self, mass).await
    }

    async fn decrease_mass(&mut self, mass: f64) -> Result<(), RpcError> {
        RemoteContainer::decrease_mass(self, mass).await
    }
}
