// ABOUTME: Collaborator traits consumed by the saga orchestrator.
// ABOUTME: One trait and error type per external service, plus HTTP implementations.

mod custody;
pub mod http;
mod registry;
mod signing;

pub use custody::{CustodyClient, CustodyError, RequestDetails, WhitelistDetails, metadata_text};
pub use registry::{RegistryClient, RegistryError};
pub use signing::{SigningClient, SigningError};
