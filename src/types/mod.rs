// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod auth_token;
mod contract_name;
mod id;

pub use auth_token::AuthToken;
pub use contract_name::{ContractName, ContractNameError, MAX_CONTRACT_NAME_LEN};
pub use id::{DeploymentId, Id, RequestId, WhitelistId};
