// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The client entry point: sheet lifecycle calls plus the retrying RPC
//! plumbing [`super::file::OpenFile`] builds its cell-level spin loops on.

use super::file::OpenFile;
use super::resolver::Resolver;
use crate::config::ClientConfig;
use crate::coordination::Coordination;
use crate::error::{Error, Result};
use crate::model::{Sheet, Status};
use crate::transport::messages::{DataNodeRequest, DataNodeResponse, MasterRequest, MasterResponse, MasterResponseBody};
use crate::transport::RpcClient;
use std::sync::Arc;

/// A SheetFS client: resolves the master and data-node group primaries
/// on demand and retries across primary failover.
#[derive(Clone)]
pub struct Client {
    resolver: Arc<Resolver>,
    rpc: RpcClient,
    max_retry: u32,
}

impl Client {
    /// Build a client resolving endpoints through `coordination`.
    pub fn new(coordination: Arc<dyn Coordination>, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            resolver: Arc::new(Resolver::new(coordination)),
            rpc: RpcClient::new()?,
            max_retry: config.max_retry,
        })
    }

    pub(super) async fn call_master(&self, request: MasterRequest) -> Result<MasterResponse> {
        let mut attempts = 0;
        loop {
            let resolved = self.resolver.master_addr().await?;
            match self.rpc.call::<MasterRequest, MasterResponse>(resolved.addr, &request).await {
                Ok(response) => return Ok(response),
                Err(e) if is_connection_level(&e) && attempts < self.max_retry => {
                    attempts += 1;
                    self.resolver.invalidate_master(resolved.version).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub(super) async fn call_data_node(&self, group: &str, request: DataNodeRequest) -> Result<DataNodeResponse> {
        let mut attempts = 0;
        loop {
            let resolved = self.resolver.group_addr(group).await?;
            match self.rpc.call::<DataNodeRequest, DataNodeResponse>(resolved.addr, &request).await {
                Ok(response) => return Ok(response),
                Err(e) if is_connection_level(&e) && attempts < self.max_retry => {
                    attempts += 1;
                    self.resolver.invalidate_group(group, resolved.version).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// `RegisterDataNode`: announce a data-node group's ack-node path to the
    /// master's allocator. Idempotent for the same group.
    pub async fn register_data_node(&self, group: impl Into<String>, ack_path: impl Into<String>) -> Result<()> {
        let response = self
            .call_master(MasterRequest::RegisterDataNode { group: group.into(), ack_path: ack_path.into() })
            .await?;
        status_result(response.status)
    }

    /// `CreateSheet`.
    pub async fn create_sheet(&self, filename: impl Into<String>) -> Result<OpenFile> {
        let response = self.call_master(MasterRequest::CreateSheet { filename: filename.into() }).await?;
        status_result(response.status)?;
        match response.body {
            MasterResponseBody::Fd(fd) => Ok(OpenFile::new(self.clone(), fd)),
            _ => Err(unexpected_body()),
        }
    }

    /// `OpenSheet`.
    pub async fn open_sheet(&self, filename: impl Into<String>) -> Result<OpenFile> {
        let response = self.call_master(MasterRequest::OpenSheet { filename: filename.into() }).await?;
        status_result(response.status)?;
        match response.body {
            MasterResponseBody::Fd(fd) => Ok(OpenFile::new(self.clone(), fd)),
            _ => Err(unexpected_body()),
        }
    }

    /// `DeleteSheet`.
    pub async fn delete_sheet(&self, filename: impl Into<String>) -> Result<()> {
        let response = self.call_master(MasterRequest::DeleteSheet { filename: filename.into() }).await?;
        status_result(response.status)
    }

    /// `RecycleSheet`.
    pub async fn recycle_sheet(&self, filename: impl Into<String>) -> Result<()> {
        let response = self.call_master(MasterRequest::RecycleSheet { filename: filename.into() }).await?;
        status_result(response.status)
    }

    /// `ResumeSheet`.
    pub async fn resume_sheet(&self, filename: impl Into<String>) -> Result<()> {
        let response = self.call_master(MasterRequest::ResumeSheet { filename: filename.into() }).await?;
        status_result(response.status)
    }

    /// `ListSheets`.
    pub async fn list_sheets(&self) -> Result<Vec<Sheet>> {
        let response = self.call_master(MasterRequest::ListSheets).await?;
        status_result(response.status)?;
        match response.body {
            MasterResponseBody::Sheets(sheets) => Ok(sheets),
            _ => Err(unexpected_body()),
        }
    }
}

/// Whether `e` is a connection-level failure (can't connect, or the peer
/// dropped the connection before replying) rather than a protocol-level one.
/// Only this class is worth invalidating the cached endpoint and retrying
/// for: it's what a primary failover actually looks like from here. A
/// deserialisation failure or other propagated error is a real bug and must
/// surface, not be silently retried against a possibly-same endpoint.
fn is_connection_level(e: &Error) -> bool {
    matches!(e, Error::Transport(_) | Error::Unavailable(_))
}

pub(super) fn status_result(status: Status) -> Result<()> {
    match status {
        Status::Ok => Ok(()),
        other => Err(status_to_error(other)),
    }
}

pub(super) fn status_to_error(status: Status) -> Error {
    match status {
        Status::Ok => unreachable!("Ok is not an error status"),
        Status::NotFound => Error::NotFound("remote reported not found".into()),
        Status::Exist => Error::Exist("remote reported already exists".into()),
        Status::Invalid => Error::Invalid("remote reported an invalid request".into()),
        Status::WrongVersion => Error::Unavailable("wrong-version status reached the client caller".into()),
        Status::Unavailable => Error::Unavailable("remote is unavailable".into()),
    }
}

fn unexpected_body() -> Error {
    Error::Invalid("master response body did not match the request kind".into())
}
