//! Application services: gateway lifecycle, cached reads, and writes.

pub mod backend;
pub mod error;
pub mod gateway;
pub mod mutations;
pub mod queries;
pub mod site;

pub use backend::{Backend, BackendError, BackendResult};
pub use error::{MutationError, SyncError};
pub use gateway::{Connector, GatewayHandle, GatewayStatus, Identity, RemoteGateway};
pub use mutations::{Mutation, MutationDispatcher};
pub use queries::{Capabilities, QueryService};
pub use site::SiteSync;
