//! Remote gateway lifecycle.
//!
//! Owns the one authenticated backend handle. Only the identity-change path
//! replaces it; everything else takes a cheap clone through
//! [`RemoteGateway::handle`]. Each replacement bumps the epoch so work started
//! under an older identity can be recognised and dropped.

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cache::{rw_read, rw_write};

use super::backend::{Backend, BackendError};
use super::error::SyncError;

const SOURCE: &str = "application::gateway";

/// Who the caller is. Anonymous callers carry no credential.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Identity {
    token: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.is_none()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_some() {
            "<redacted>"
        } else {
            "<anonymous>"
        };
        f.debug_struct("Identity").field("token", &token).finish()
    }
}

/// Negotiates an authenticated backend handle for an identity.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn Backend>, BackendError>;
}

/// Backend handle tagged with the epoch it was established under.
#[derive(Clone)]
pub struct GatewayHandle {
    pub epoch: u64,
    pub backend: Arc<dyn Backend>,
}

impl fmt::Debug for GatewayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayHandle")
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    /// No identity has been presented yet.
    Disconnected,
    Connecting,
    Ready,
    Failed(String),
}

struct GatewayState {
    epoch: u64,
    status: GatewayStatus,
    handle: Option<GatewayHandle>,
}

pub struct RemoteGateway {
    connector: Arc<dyn Connector>,
    state: RwLock<GatewayState>,
}

impl RemoteGateway {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            state: RwLock::new(GatewayState {
                epoch: 0,
                status: GatewayStatus::Disconnected,
                handle: None,
            }),
        }
    }

    pub fn epoch(&self) -> u64 {
        rw_read(&self.state, SOURCE, "epoch").epoch
    }

    pub fn status(&self) -> GatewayStatus {
        rw_read(&self.state, SOURCE, "status").status.clone()
    }

    /// Current handle, or [`SyncError::NotReady`] while none is established.
    pub fn handle(&self) -> Result<GatewayHandle, SyncError> {
        let state = rw_read(&self.state, SOURCE, "handle");
        match (&state.status, &state.handle) {
            (GatewayStatus::Ready, Some(handle)) => Ok(handle.clone()),
            _ => Err(SyncError::NotReady),
        }
    }

    /// Tear down the current handle and open a new epoch for `identity`.
    pub fn begin(&self, identity: &Identity) -> u64 {
        let mut state = rw_write(&self.state, SOURCE, "begin");
        state.epoch += 1;
        state.status = GatewayStatus::Connecting;
        state.handle = None;
        info!(
            epoch = state.epoch,
            anonymous = identity.is_anonymous(),
            "Gateway connecting"
        );
        state.epoch
    }

    /// Negotiate the handle for `epoch`.
    ///
    /// A result arriving after a newer [`RemoteGateway::begin`] is dropped
    /// without touching the gateway.
    pub async fn establish(&self, epoch: u64, identity: &Identity) -> Result<(), SyncError> {
        let connected = self.connector.connect(identity).await;

        let mut state = rw_write(&self.state, SOURCE, "establish");
        if state.epoch != epoch {
            debug!(
                epoch,
                current_epoch = state.epoch,
                "Discarding connection for superseded identity"
            );
            return Err(SyncError::NotReady);
        }

        match connected {
            Ok(backend) => {
                state.handle = Some(GatewayHandle { epoch, backend });
                state.status = GatewayStatus::Ready;
                info!(epoch, "Gateway ready");
                Ok(())
            }
            Err(err) => {
                let error = SyncError::from_backend("connect", err);
                state.status = GatewayStatus::Failed(error.to_string());
                warn!(epoch, error = %error, "Gateway connection failed");
                Err(error)
            }
        }
    }
}
