// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! QUIC-based request/response transport shared by master, data-node and
//! client processes, built on the same `qp2p` peer-to-peer endpoint this
//! codebase has always used for node-to-node messaging. A server binds one
//! [`qp2p::Endpoint`] per role and answers each inbound connection's
//! messages in the order they arrive; a client opens one connection per
//! call and reads the matching reply back off that same connection.

pub mod messages;

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Implemented by the component that answers requests of type `Req` with
/// responses of type `Resp` (the master's file manager, a data node's
/// server).
pub trait RequestHandler<Req, Resp>: Send + Sync {
    /// Handle one request and produce its response.
    fn handle(&self, request: Req) -> BoxFuture<'_, Resp>;
}

/// A bound RPC listener. Dropping or calling [`RpcServer::close`] stops
/// accepting new connections.
#[derive(Debug)]
pub struct RpcServer {
    endpoint: qp2p::Endpoint,
}

impl RpcServer {
    /// Bind `local_addr` and serve `handler` for as long as the returned
    /// server is alive. Returns the server plus the address peers should
    /// connect to (which may differ from `local_addr` if port 0 was
    /// requested).
    pub async fn bind<Req, Resp, H>(local_addr: SocketAddr, handler: Arc<H>) -> Result<(Self, SocketAddr)>
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        H: RequestHandler<Req, Resp> + 'static,
    {
        let (endpoint, mut incoming_connections, _) =
            qp2p::Endpoint::new_peer(local_addr, Vec::<SocketAddr>::new(), qp2p::Config::default())
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;
        let public_addr = endpoint.public_addr();

        tokio::spawn(async move {
            while let Some((connection, mut incoming_msgs)) = incoming_connections.next().await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    loop {
                        let bytes = match incoming_msgs.next().await {
                            Some(Ok(bytes)) => bytes,
                            Some(Err(e)) => {
                                warn!("rpc connection from {} errored: {:?}", connection.remote_address(), e);
                                break;
                            }
                            None => break,
                        };

                        let request: Req = match bincode::deserialize(&bytes) {
                            Ok(request) => request,
                            Err(e) => {
                                warn!("failed to decode rpc request: {e}");
                                break;
                            }
                        };

                        let response = handler.handle(request).await;
                        let encoded = match bincode::serialize(&response) {
                            Ok(bytes) => bytes,
                            Err(e) => {
                                warn!("failed to encode rpc response: {e}");
                                break;
                            }
                        };

                        if let Err(e) = connection.send(Bytes::from(encoded)).await {
                            warn!("failed to send rpc response to {}: {:?}", connection.remote_address(), e);
                            break;
                        }
                    }
                });
            }
        });

        Ok((Self { endpoint }, public_addr))
    }

    /// Stop accepting connections and close the underlying endpoint.
    pub fn close(&self) {
        self.endpoint.close();
    }
}

/// A lightweight RPC caller: one `qp2p` client endpoint, one connection per
/// call.
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: qp2p::Endpoint,
}

impl RpcClient {
    /// Create a new client endpoint, bound to an ephemeral local port.
    pub fn new() -> Result<Self> {
        let endpoint = qp2p::Endpoint::new_client(([0, 0, 0, 0], 0).into(), qp2p::Config::default())
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { endpoint })
    }

    /// Send `request` to `addr` and await its response.
    pub async fn call<Req, Resp>(&self, addr: SocketAddr, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let (connection, mut incoming_msgs) = self
            .endpoint
            .connect_to(&addr)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let encoded = bincode::serialize(request)?;
        connection
            .send(Bytes::from(encoded))
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        match incoming_msgs.next().await {
            Some(Ok(bytes)) => Ok(bincode::deserialize(&bytes)?),
            Some(Err(e)) => Err(Error::Transport(format!("{e:?}"))),
            None => Err(Error::Unavailable(format!("{addr} closed the connection before replying"))),
        }
    }

    /// Close the underlying endpoint.
    pub fn close(&self) {
        self.endpoint.close();
    }
}
