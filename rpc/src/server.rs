//! TCP server exposing a [`GasContainerService`] over framed JSON-RPC.
//!
//! Each accepted connection gets its own task that reads frames, dispatches
//! them to the service one at a time, and writes the response back. The
//! service is synchronous and bounded, so it is called directly from the
//! connection task.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

use vessel_core::GasContainerService;

use crate::codec::{FrameReader, FrameWriter};
use crate::error::RpcError;
use crate::protocol::{self, MassParams, Method, error_codes};

/// A bound, not yet serving, RPC server.
pub struct RpcServer {
    listener: TcpListener,
    service: Arc<dyn GasContainerService>,
}

impl RpcServer {
    pub async fn bind<A>(addr: A, service: Arc<dyn GasContainerService>) -> Result<Self, RpcError>
    where
        A: ToSocketAddrs + fmt::Display,
    {
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RpcError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Open connections are aborted when the server stops.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()>,
    {
        let local = self.local_addr()?;
        tracing::info!(addr = %local, "RPC server listening");

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "Accepted connection");
                        connections.spawn(handle_connection(stream, peer, Arc::clone(&self.service)));
                    }
                    Err(e) => {
                        tracing::warn!("Accept failed: {e}");
                    }
                },
                // Reap finished connections so the set does not grow unbounded.
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        connections.abort_all();
        while connections.join_next().await.is_some() {}
        tracing::info!(addr = %local, "RPC server stopped");
        Ok(())
    }

    /// Serve on a background task; the returned handle stops it.
    #[must_use]
    pub fn spawn(self) -> ServerHandle {
        let addr = self.listener.local_addr().ok();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(self.serve(async move {
            let _ = stop_rx.await;
        }));
        ServerHandle {
            addr,
            stop: Some(stop_tx),
            join,
        }
    }
}

/// Handle to a server started with [`RpcServer::spawn`].
pub struct ServerHandle {
    addr: Option<SocketAddr>,
    stop: Option<oneshot::Sender<()>>,
    join: JoinHandle<Result<(), RpcError>>,
}

impl ServerHandle {
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Stop accepting, abort open connections, and wait for the accept loop.
    pub async fn shutdown(mut self) -> Result<(), RpcError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match (&mut self.join).await {
            Ok(result) => result,
            Err(e) => Err(RpcError::Transport(anyhow::anyhow!(
                "server task failed: {e}"
            ))),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    service: Arc<dyn GasContainerService>,
) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    loop {
        match reader.read_frame::<Value>().await {
            Ok(Some(frame)) => {
                let Some(response) = dispatch(service.as_ref(), &frame) else {
                    continue;
                };
                if let Err(e) = writer.write_frame(&response).await {
                    tracing::warn!(%peer, "Write failed: {e:#}");
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(%peer, "Connection closed");
                break;
            }
            Err(e) => {
                tracing::warn!(%peer, "Dropping connection after malformed frame: {e:#}");
                break;
            }
        }
    }
}

/// Handle one decoded frame.
///
/// Returns the response to send, or `None` for notifications (frames without
/// an `id`), which get no reply.
pub(crate) fn dispatch(service: &dyn GasContainerService, frame: &Value) -> Option<Value> {
    let id = frame.get("id").cloned();

    let Some(method_name) = frame.get("method").and_then(Value::as_str) else {
        return Some(protocol::failure(
            id.unwrap_or(Value::Null),
            error_codes::INVALID_REQUEST,
            "missing method",
        ));
    };

    let Some(method) = Method::parse(method_name) else {
        tracing::debug!("Unknown method: {method_name}");
        return id.map(|id| {
            protocol::failure(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {method_name}"),
            )
        });
    };

    let params = frame.get("params").cloned().unwrap_or(Value::Null);
    let result = match method {
        Method::IncreaseMass | Method::DecreaseMass => {
            match serde_json::from_value::<MassParams>(params) {
                Ok(MassParams { mass }) => {
                    if method == Method::IncreaseMass {
                        service.increase_mass(mass);
                    } else {
                        service.decrease_mass(mass);
                    }
                    Ok(Value::Null)
                }
                Err(e) => Err(format!("invalid params for {method_name}: {e}")),
            }
        }
        Method::GetPressure => Ok(Value::from(service.get_pressure())),
        Method::IsDestroyed => Ok(Value::from(service.is_destroyed())),
    };

    let id = id?;
    Some(match result {
        Ok(value) => protocol::success(id, value),
        Err(message) => protocol::failure(id, error_codes::INVALID_PARAMS, message),
    })
}
