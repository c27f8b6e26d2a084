// ABOUTME: Deployment saga: states, transition table, durable record, orchestrator.
// ABOUTME: State only changes through the table; the orchestrator owns the step order.

mod error;
mod orchestrator;
mod record;
mod state;
pub mod transitions;

pub use error::{Operation, SagaError, SagaErrorKind};
pub use orchestrator::{DEFAULT_CALL_TIMEOUT, SagaOrchestrator};
pub use record::{ArtifactAlreadySet, DeploymentRecord, NewDeployment, ValidationError};
pub use state::{DeploymentEvent, DeploymentState, UnknownState};
pub use transitions::InvalidTransition;
