// ABOUTME: Table-driven legality graph for the deployment saga.
// ABOUTME: Pure lookup from (state, event) to the next state; no machine instance.

use super::state::{DeploymentEvent, DeploymentState};
use thiserror::Error;

use DeploymentEvent as E;
use DeploymentState as S;

/// Linear success path plus the cancel edges. `ERROR_OCCURRED` is handled
/// separately since it applies to every non-terminal state.
const EDGES: &[(DeploymentState, DeploymentEvent, DeploymentState)] = &[
    (S::Initial, E::AuthenticationSuccess, S::Authenticated),
    (S::Authenticated, E::DeploymentRequestSuccess, S::DeployRequested),
    (S::DeployRequested, E::RequestApproval, S::ApprovalPending),
    (S::ApprovalPending, E::HashFetched, S::HashRetrieved),
    (S::HashRetrieved, E::HashSigned, S::HashSigned),
    (S::HashSigned, E::DeploymentApproved, S::DeploymentApproved),
    (S::DeploymentApproved, E::DeploymentCompleted, S::Deployed),
    (S::Deployed, E::RequestWhitelist, S::WhitelistRequested),
    (S::WhitelistRequested, E::WhitelistHashFetched, S::WhitelistHashRetrieved),
    (S::WhitelistHashRetrieved, E::WhitelistHashSigned, S::WhitelistHashSigned),
    (S::WhitelistHashSigned, E::WhitelistApproved, S::WhitelistApproved),
    (S::WhitelistApproved, E::TokenRegistered, S::TokenRegistered),
    (S::TokenRegistered, E::RegisterToken, S::Completed),
    (S::DeployRequested, E::Cancel, S::Cancelled),
    (S::ApprovalPending, E::Cancel, S::Cancelled),
    (S::HashRetrieved, E::Cancel, S::Cancelled),
    (S::HashSigned, E::Cancel, S::Cancelled),
    (S::DeploymentApproved, E::Cancel, S::Cancelled),
];

/// The event is not legal from the given state.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("event {event} is not allowed in state {from}")]
pub struct InvalidTransition {
    pub from: DeploymentState,
    pub event: DeploymentEvent,
}

/// Look up the state reached by firing `event` in `from`.
pub fn apply(
    from: DeploymentState,
    event: DeploymentEvent,
) -> Result<DeploymentState, InvalidTransition> {
    if event == E::ErrorOccurred && !from.is_terminal() {
        return Ok(S::Error);
    }

    EDGES
        .iter()
        .find(|(state, ev, _)| *state == from && *ev == event)
        .map(|(_, _, to)| *to)
        .ok_or(InvalidTransition { from, event })
}

/// Whether `event` would be accepted in `from`.
pub fn permits(from: DeploymentState, event: DeploymentEvent) -> bool {
    apply(from, event).is_ok()
}

/// States from which a deployment may still be cancelled.
pub fn cancellable_states() -> impl Iterator<Item = DeploymentState> {
    EDGES
        .iter()
        .filter(|(_, event, _)| *event == E::Cancel)
        .map(|(from, _, _)| *from)
}
