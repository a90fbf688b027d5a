//! Network transport for the Vessel container service.
//!
//! JSON-RPC 2.0 over TCP with `Content-Length` framing. The server side is
//! wired to any [`vessel_core::GasContainerService`]; the client side is what
//! the producer and consumer agents talk through.

pub mod codec;
pub mod protocol;

mod client;
mod error;
mod server;

pub use client::{DEFAULT_REQUEST_TIMEOUT, RemoteContainer, RpcClient};
pub use error::RpcError;
pub use protocol::Method;
pub use server::{RpcServer, ServerHandle};
