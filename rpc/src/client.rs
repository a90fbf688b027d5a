//! Client side of the container RPC.
//!
//! [`RpcClient`] is a single connection with sequential request/response.
//! [`RemoteContainer`] wraps it with lazy connect and reconnect-after-failure,
//! which is what the long-running driver agents want.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::codec::{FrameReader, FrameWriter};
use crate::error::RpcError;
use crate::protocol::{self, Method, Request, Response};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RpcClient {
    peer: SocketAddr,
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    next_id: u64,
    timeout: Duration,
}

impl RpcClient {
    /// Connect to `addr` (anything `host:port` shaped).
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self, RpcError> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(RpcError::Connect {
                    addr: addr.to_string(),
                    source,
                });
            }
            Err(_) => {
                return Err(RpcError::Timeout {
                    method: "connect",
                    timeout,
                });
            }
        };
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();

        tracing::debug!(%peer, "Connected to container service");
        Ok(Self {
            peer,
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            next_id: 1,
            timeout,
        })
    }

    pub async fn increase_mass(&mut self, mass: f64) -> Result<(), RpcError> {
        self.call(Method::IncreaseMass, Some(protocol::mass_params(mass)))
            .await
            .map(drop)
    }

    pub async fn decrease_mass(&mut self, mass: f64) -> Result<(), RpcError> {
        self.call(Method::DecreaseMass, Some(protocol::mass_params(mass)))
            .await
            .map(drop)
    }

    pub async fn get_pressure(&mut self) -> Result<f64, RpcError> {
        let method = Method::GetPressure;
        let result = self.call(method, None).await?;
        result
            .as_ref()
            .and_then(Value::as_f64)
            .ok_or_else(|| unexpected(method, result.as_ref()))
    }

    pub async fn is_destroyed(&mut self) -> Result<bool, RpcError> {
        let method = Method::IsDestroyed;
        let result = self.call(method, None).await?;
        result
            .as_ref()
            .and_then(Value::as_bool)
            .ok_or_else(|| unexpected(method, result.as_ref()))
    }

    /// Send one request and wait for the response carrying the same id.
    ///
    /// A timed-out call leaves its response, possibly half received, on the
    /// wire. The reader keeps partial frames buffered across calls, so that
    /// late response is decoded whole and skipped here by id.
    async fn call(&mut self, method: Method, params: Option<Value>) -> Result<Option<Value>, RpcError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request::new(id, method, params);
        self.writer.write_frame(&request).await?;

        let response = tokio::time::timeout(self.timeout, self.read_response(id))
            .await
            .map_err(|_| RpcError::Timeout {
                method: method.as_str(),
                timeout: self.timeout,
            })??;

        if let Some(error) = response.error {
            return Err(RpcError::Remote {
                method: method.as_str(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }

    async fn read_response(&mut self, id: u64) -> Result<Response, RpcError> {
        loop {
            let Some(frame) = self.reader.read_frame::<Value>().await? else {
                return Err(RpcError::Closed { peer: self.peer });
            };
            let response: Response = match serde_json::from_value(frame) {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("Ignoring malformed response frame: {e}");
                    continue;
                }
            };
            if response.id == Some(id) {
                return Ok(response);
            }
            tracing::trace!(expected = id, got = ?response.id, "Skipping stale response");
        }
    }
}

fn unexpected(method: Method, result: Option<&Value>) -> RpcError {
    RpcError::UnexpectedResponse {
        method: method.as_str(),
        detail: match result {
            Some(value) => format!("result {value}"),
            None => String::from("missing result"),
        },
    }
}

/// A remote container reached through a reconnecting client.
///
/// The connection is opened on first use. Any transport failure drops it, so
/// the next call dials again.
pub struct RemoteContainer {
    addr: String,
    timeout: Duration,
    client: Option<RpcClient>,
}

impl RemoteContainer {
    #[must_use]
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            client: None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn client(&mut self) -> Result<&mut RpcClient, RpcError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => {
                let client = RpcClient::connect(&self.addr, self.timeout).await?;
                tracing::info!(addr = %self.addr, "Successfully connected to container service.");
                client
            }
        };
        Ok(self.client.insert(client))
    }

    fn settle<T>(&mut self, result: Result<T, RpcError>) -> Result<T, RpcError> {
        if let Err(e) = &result
            && e.is_transient()
        {
            self.client = None;
        }
        result
    }

    pub async fn increase_mass(&mut self, mass: f64) -> Result<(), RpcError> {
        let result = match self.client().await {
            Ok(client) => client.increase_mass(mass).await,
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    pub async fn decrease_mass(&mut self, mass: f64) -> Result<(), RpcError> {
        let result = match self.client().await {
            Ok(client) => client.decrease_mass(mass).await,
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    pub async fn get_pressure(&mut self) -> Result<f64, RpcError> {
        let result = match self.client().await {
            Ok(client) => client.get_pressure().await,
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    pub async fn is_destroyed(&mut self) -> Result<bool, RpcError> {
        let result = match self.client().await {
            Ok(client) => client.is_destroyed().await,
            Err(e) => Err(e),
        };
        self.settle(result)
    }
}
