// ABOUTME: Integration tests for the deployment saga orchestrator.
// ABOUTME: Drives sagas against scripted collaborators and inspects persisted records.

mod support;

use consign::saga::{DeploymentState, NewDeployment, SagaError, SagaErrorKind};
use consign::store::{DeploymentStore, SqliteStore, StoreError};
use consign::types::RequestId;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::{Harness, token_a};

// =============================================================================
// Initiate
// =============================================================================

/// Test: A successful initiation authenticates, stores the token, and ends in DEPLOY_REQUESTED.
#[tokio::test]
async fn initiate_reaches_deploy_requested() {
    let h = Harness::new();

    let record = h.saga.initiate_deployment(token_a()).await.unwrap();

    assert_eq!(record.state(), DeploymentState::DeployRequested);
    assert_eq!(record.request_id().map(RequestId::as_str), Some("DEP-1"));
    assert_eq!(record.auth_token().map(|t| t.expose()), Some("tok-1"));
    assert!(record.constructor_args().is_none());

    let stored = h.stored("DEP-1").await;
    assert_eq!(stored, record);
    assert_eq!(
        h.states(),
        vec![
            DeploymentState::Initial,
            DeploymentState::Authenticated,
            DeploymentState::DeployRequested
        ]
    );
}

/// Test: Invalid input is rejected before any record exists or any call is made.
#[tokio::test]
async fn initiate_rejects_invalid_input_without_side_effects() {
    let h = Harness::new();

    let err = h
        .saga
        .initiate_deployment(NewDeployment {
            contract_name: "   ".to_string(),
            ..token_a()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), SagaErrorKind::Validation);
    assert!(err.deployment_id().is_none());
    assert!(h.states().is_empty());
    assert_eq!(h.total_calls(), 0);
}

/// Test: An authentication failure parks the new record in ERROR and reports its id.
#[tokio::test]
async fn initiate_failure_is_recorded_on_the_saga() {
    let h = Harness::new();
    h.custody.fail_on("authenticate");

    let err = h.saga.initiate_deployment(token_a()).await.unwrap_err();

    assert_eq!(err.kind(), SagaErrorKind::ExternalService);
    let id = err.deployment_id().unwrap().clone();
    let stored = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.state(), DeploymentState::Error);
    assert!(
        stored
            .error_message()
            .unwrap()
            .starts_with("failed to initiate deployment:")
    );
}

/// Test: Two initiations never share a request id; a duplicate from custody aborts the second.
#[tokio::test]
async fn duplicate_request_id_aborts_second_saga() {
    let h = Harness::new();
    h.custody.script_request_ids(&["DEP-1", "DEP-1"]);

    let first = h.saga.initiate_deployment(token_a()).await.unwrap();
    let err = h.saga.initiate_deployment(token_a()).await.unwrap_err();

    assert!(matches!(
        &err,
        SagaError::Aborted { source, .. }
            if matches!(**source, SagaError::Store(StoreError::DuplicateRequestId(_)))
    ));
    assert_eq!(err.kind(), SagaErrorKind::Conflict);

    let second = h.store.get(err.deployment_id().unwrap()).await.unwrap().unwrap();
    assert_eq!(second.state(), DeploymentState::Error);
    assert!(second.request_id().is_none());

    let owner = h.stored("DEP-1").await;
    assert_eq!(owner.id(), first.id());
    assert_eq!(owner.state(), DeploymentState::DeployRequested);
}

/// Test: Sequential initiations get distinct request ids.
#[tokio::test]
async fn sequential_initiations_get_distinct_request_ids() {
    let h = Harness::new();

    let a = h.saga.initiate_deployment(token_a()).await.unwrap();
    let b = h.saga.initiate_deployment(token_a()).await.unwrap();

    assert_ne!(a.request_id(), b.request_id());
    assert_ne!(a.id(), b.id());
}

// =============================================================================
// Approve
// =============================================================================

/// Test: Approve signs the custody hash with its metadata and lands in DEPLOYED.
#[tokio::test]
async fn approve_signs_hash_and_confirms_deployment() {
    let h = Harness::new();
    h.saga.initiate_deployment(token_a()).await.unwrap();

    let record = h
        .saga
        .approve_deployment(&RequestId::new("DEP-1"))
        .await
        .unwrap();

    assert_eq!(record.state(), DeploymentState::Deployed);
    assert_eq!(record.hash_value(), Some("h1"));
    assert_eq!(record.signed_hash(), Some("sig-h1"));
    assert_eq!(record.contract_address(), Some("0xAA"));
    assert_eq!(record.transaction_hash(), Some("0xBB"));
    assert_eq!(record.whitelist_id().map(|w| w.as_str()), Some("WL-1"));

    assert_eq!(
        h.signer.calls.lock().clone(),
        vec![("h1".to_string(), "{}".to_string())]
    );
    assert_eq!(
        h.custody.approvals.lock().clone(),
        vec![("DEP-1".to_string(), "sig-h1".to_string())]
    );
    assert_eq!(h.stored("DEP-1").await, record);
}

/// Test: A signer failure aborts the saga; a second approve is then rejected.
#[tokio::test]
async fn signer_failure_during_approve_is_terminal() {
    let h = Harness::new();
    h.saga.initiate_deployment(token_a()).await.unwrap();
    h.signer.fail(true);

    let err = h
        .saga
        .approve_deployment(&RequestId::new("DEP-1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), SagaErrorKind::ExternalService);

    let stored = h.stored("DEP-1").await;
    assert_eq!(stored.state(), DeploymentState::Error);
    assert!(!stored.error_message().unwrap().is_empty());
    assert_eq!(stored.hash_value(), Some("h1"));
    assert!(stored.signed_hash().is_none());

    h.signer.fail(false);
    let err = h
        .saga
        .approve_deployment(&RequestId::new("DEP-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SagaError::InvalidState {
            state: DeploymentState::Error,
            ..
        }
    ));
}

/// Test: Approving an unknown request is NotFound and touches nothing.
#[tokio::test]
async fn approve_unknown_request_is_not_found() {
    let h = Harness::new();

    let err = h
        .saga
        .approve_deployment(&RequestId::new("nope"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), SagaErrorKind::NotFound);
    assert_eq!(h.total_calls(), 0);
}

/// Test: Approve requires DEPLOY_REQUESTED.
#[tokio::test]
async fn approve_twice_is_invalid_state() {
    let h = Harness::new();
    let request_id = h.deployed().await;
    let before = h.total_calls();

    let err = h.saga.approve_deployment(&request_id).await.unwrap_err();

    assert_eq!(err.kind(), SagaErrorKind::InvalidState);
    assert_eq!(h.total_calls(), before);
    assert_eq!(h.stored("DEP-1").await.state(), DeploymentState::Deployed);
}

/// Test: A poll failure inside approve aborts the saga after the approval was sent.
#[tokio::test]
async fn poll_failure_inside_approve_aborts() {
    let h = Harness::new();
    h.saga.initiate_deployment(token_a()).await.unwrap();
    // The first details call fetches the hash; the second is the poll.
    h.custody.fail_after("get_request_details", 1);

    let err = h
        .saga
        .approve_deployment(&RequestId::new("DEP-1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), SagaErrorKind::ExternalService);
    assert_eq!(h.custody.count("approve"), 1);
    let stored = h.stored("DEP-1").await;
    assert_eq!(stored.state(), DeploymentState::Error);
    assert_eq!(stored.signed_hash(), Some("sig-h1"));
}

// =============================================================================
// Status
// =============================================================================

/// Test: A pending deployment stays approved until custody reports it deployed.
#[tokio::test]
async fn status_polls_until_deployed() {
    let h = Harness::new();
    h.custody.set_status("pending");
    h.saga.initiate_deployment(token_a()).await.unwrap();
    let request_id = RequestId::new("DEP-1");

    let record = h.saga.approve_deployment(&request_id).await.unwrap();
    assert_eq!(record.state(), DeploymentState::DeploymentApproved);
    assert!(record.contract_address().is_none());

    let record = h.saga.deployment_status(&request_id).await.unwrap();
    assert_eq!(record.state(), DeploymentState::DeploymentApproved);

    h.custody.set_status("Deployed");
    let record = h.saga.deployment_status(&request_id).await.unwrap();
    assert_eq!(record.state(), DeploymentState::Deployed);
    assert_eq!(record.contract_address(), Some("0xAA"));
    assert_eq!(h.stored("DEP-1").await, record);
}

/// Test: Poll failures during status are swallowed and the record is returned unchanged.
#[tokio::test]
async fn status_poll_failure_returns_record_unchanged() {
    let h = Harness::new();
    h.custody.set_status("pending");
    h.saga.initiate_deployment(token_a()).await.unwrap();
    let request_id = RequestId::new("DEP-1");
    h.saga.approve_deployment(&request_id).await.unwrap();
    let before = h.stored("DEP-1").await;

    h.custody.fail_on("get_request_details");
    let record = h.saga.deployment_status(&request_id).await.unwrap();

    assert_eq!(record, before);
    assert_eq!(h.stored("DEP-1").await, before);
}

/// Test: Status outside DEPLOYMENT_APPROVED makes no collaborator calls.
#[tokio::test]
async fn status_in_other_states_is_a_pure_read() {
    let h = Harness::new();
    h.saga.initiate_deployment(token_a()).await.unwrap();
    let before = h.total_calls();

    let record = h
        .saga
        .deployment_status(&RequestId::new("DEP-1"))
        .await
        .unwrap();

    assert_eq!(record.state(), DeploymentState::DeployRequested);
    assert_eq!(h.total_calls(), before);
}

/// Test: Status reads of a completed saga are identical and free of calls.
#[tokio::test]
async fn status_on_completed_is_idempotent() {
    let h = Harness::new();
    let request_id = h.deployed().await;
    h.saga.whitelist_contract(&request_id).await.unwrap();
    let before = h.total_calls();

    let first = h.saga.deployment_status(&request_id).await.unwrap();
    let second = h.saga.deployment_status(&request_id).await.unwrap();

    assert_eq!(first.state(), DeploymentState::Completed);
    assert_eq!(first, second);
    assert_eq!(h.total_calls(), before);
}

// =============================================================================
// Whitelist
// =============================================================================

/// Test: The full saga passes through the fourteen success states in order.
#[tokio::test]
async fn full_saga_visits_every_success_state_in_order() {
    let h = Harness::new();
    let request_id = h.deployed().await;

    let record = h.saga.whitelist_contract(&request_id).await.unwrap();

    assert_eq!(record.state(), DeploymentState::Completed);
    assert_eq!(h.states(), DeploymentState::ALL[..14].to_vec());
    assert_eq!(record.whitelist_hash(), Some("wh1"));
    assert_eq!(record.signed_whitelist_hash(), Some("sig-wh1"));
    assert_eq!(
        h.custody.whitelist_approvals.lock().clone(),
        vec![("WL-1".to_string(), "sig-wh1".to_string())]
    );
    assert_eq!(
        h.registry.calls.lock().clone(),
        vec![("0xAA".to_string(), json!({"name": "TokenA"}))]
    );
}

/// Test: A declined registration stalls in WHITELIST_APPROVED; a retry registers only.
#[tokio::test]
async fn declined_registration_can_be_resumed() {
    let h = Harness::new();
    let request_id = h.deployed().await;
    h.registry.accept(false);

    let record = h.saga.whitelist_contract(&request_id).await.unwrap();
    assert_eq!(record.state(), DeploymentState::WhitelistApproved);
    assert!(record.error_message().is_none());

    h.registry.accept(true);
    let record = h.saga.whitelist_contract(&request_id).await.unwrap();

    assert_eq!(record.state(), DeploymentState::Completed);
    assert_eq!(h.custody.count("get_whitelist_details"), 1);
    assert_eq!(h.custody.count("approve_whitelist"), 1);
    assert_eq!(h.registry.calls.lock().len(), 2);
}

/// Test: A registry error during whitelisting is terminal.
#[tokio::test]
async fn registry_error_aborts_whitelist() {
    let h = Harness::new();
    let request_id = h.deployed().await;
    *h.registry.failing.lock() = true;

    let err = h.saga.whitelist_contract(&request_id).await.unwrap_err();

    assert_eq!(err.kind(), SagaErrorKind::ExternalService);
    let stored = h.stored("DEP-1").await;
    assert_eq!(stored.state(), DeploymentState::Error);
    assert!(
        stored
            .error_message()
            .unwrap()
            .starts_with("failed to whitelist contract:")
    );
}

/// Test: A missing whitelist id is refreshed from custody before the sub-protocol.
#[tokio::test]
async fn missing_whitelist_id_is_refreshed() {
    let h = Harness::new();
    h.custody.set_whitelist_id(None);
    let request_id = h.deployed().await;
    assert!(h.stored("DEP-1").await.whitelist_id().is_none());

    h.custody.set_whitelist_id(Some("WL-7"));
    let record = h.saga.whitelist_contract(&request_id).await.unwrap();

    assert_eq!(record.state(), DeploymentState::Completed);
    assert_eq!(record.whitelist_id().map(|w| w.as_str()), Some("WL-7"));
}

/// Test: If custody still has no whitelist id the call fails and the record is untouched.
#[tokio::test]
async fn unknown_whitelist_id_is_invalid_state_without_mutation() {
    let h = Harness::new();
    h.custody.set_whitelist_id(None);
    let request_id = h.deployed().await;
    let before = h.stored("DEP-1").await;

    let err = h.saga.whitelist_contract(&request_id).await.unwrap_err();

    assert!(matches!(err, SagaError::MissingWhitelistId(_)));
    assert_eq!(err.kind(), SagaErrorKind::InvalidState);
    assert_eq!(h.stored("DEP-1").await, before);
}

/// Test: Whitelisting before deployment is rejected.
#[tokio::test]
async fn whitelist_requires_deployed() {
    let h = Harness::new();
    h.saga.initiate_deployment(token_a()).await.unwrap();

    let err = h
        .saga
        .whitelist_contract(&RequestId::new("DEP-1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SagaError::InvalidState {
            state: DeploymentState::DeployRequested,
            ..
        }
    ));
}

/// Test: A deployment reported without an address stops whitelisting before any step runs.
#[tokio::test]
async fn missing_contract_address_blocks_whitelist_without_mutation() {
    let h = Harness::new();
    *h.custody.contract_address.lock() = None;
    let request_id = h.deployed().await;
    let before = h.stored("DEP-1").await;
    assert!(before.contract_address().is_none());

    let err = h.saga.whitelist_contract(&request_id).await.unwrap_err();

    assert!(matches!(err, SagaError::MissingContractAddress(_)));
    assert_eq!(err.kind(), SagaErrorKind::InvalidState);
    assert_eq!(h.stored("DEP-1").await, before);
    assert_eq!(h.custody.count("get_whitelist_details"), 0);
    assert_eq!(h.custody.count("approve_whitelist"), 0);
    assert_eq!(h.signer.calls.lock().len(), 1);

    // Once custody reports the address, the refresh picks it up.
    *h.custody.contract_address.lock() = Some("0xCC".to_string());
    let record = h.saga.whitelist_contract(&request_id).await.unwrap();

    assert_eq!(record.state(), DeploymentState::Completed);
    assert_eq!(record.contract_address(), Some("0xCC"));
    assert_eq!(
        h.registry.calls.lock().clone(),
        vec![("0xCC".to_string(), json!({"name": "TokenA"}))]
    );
}

// =============================================================================
// Cancel
// =============================================================================

/// Test: Cancel from DEPLOY_REQUESTED is absorbing and calls no collaborator.
#[tokio::test]
async fn cancel_before_approval() {
    let h = Harness::new();
    h.saga.initiate_deployment(token_a()).await.unwrap();
    let before = h.total_calls();
    let request_id = RequestId::new("DEP-1");

    let record = h.saga.cancel_deployment(&request_id).await.unwrap();
    assert_eq!(record.state(), DeploymentState::Cancelled);
    assert_eq!(h.total_calls(), before);

    let err = h.saga.cancel_deployment(&request_id).await.unwrap_err();
    assert_eq!(err.kind(), SagaErrorKind::InvalidState);

    let err = h.saga.approve_deployment(&request_id).await.unwrap_err();
    assert_eq!(err.kind(), SagaErrorKind::InvalidState);
}

/// Test: A deployed contract can no longer be cancelled.
#[tokio::test]
async fn cancel_after_deployment_is_rejected() {
    let h = Harness::new();
    let request_id = h.deployed().await;

    let err = h.saga.cancel_deployment(&request_id).await.unwrap_err();

    assert!(matches!(
        err,
        SagaError::InvalidState {
            state: DeploymentState::Deployed,
            ..
        }
    ));
    assert_eq!(h.stored("DEP-1").await.state(), DeploymentState::Deployed);
}

// =============================================================================
// Concurrent writers
// =============================================================================

/// Test: A cancel that lands while approve waits on the signer wins; approve gets a conflict.
#[tokio::test]
async fn cancel_during_approve_wins_over_inflight_saga() {
    let h = Harness::new();
    h.saga.initiate_deployment(token_a()).await.unwrap();
    h.signer.hold(true);

    let saga = h.saga.clone();
    let approve =
        tokio::spawn(async move { saga.approve_deployment(&RequestId::new("DEP-1")).await });
    h.signer.entered.notified().await;

    let cancelled = h
        .saga
        .cancel_deployment(&RequestId::new("DEP-1"))
        .await
        .unwrap();
    assert_eq!(cancelled.state(), DeploymentState::Cancelled);
    h.signer.release.notify_one();

    let err = approve.await.unwrap().unwrap_err();
    assert!(matches!(
        &err,
        SagaError::Aborted { source, .. }
            if matches!(**source, SagaError::Store(StoreError::Conflict { .. }))
    ));
    assert_eq!(err.kind(), SagaErrorKind::Conflict);

    let stored = h.stored("DEP-1").await;
    assert_eq!(stored, cancelled);
    assert!(stored.error_message().is_none());
    assert!(stored.signed_hash().is_none());
    assert!(!h.states().contains(&DeploymentState::Error));
    assert_eq!(h.custody.count("approve"), 0);
}

/// Test: If the saga cannot be reloaded after a failure, the last persisted copy is left alone.
#[tokio::test]
async fn failure_is_not_recorded_when_reload_fails() {
    let h = Harness::new();
    h.saga.initiate_deployment(token_a()).await.unwrap();
    h.signer.fail(true);
    h.store.fail_gets(true);

    let err = h
        .saga
        .approve_deployment(&RequestId::new("DEP-1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), SagaErrorKind::ExternalService);
    let stored = h.stored("DEP-1").await;
    assert_eq!(stored.state(), DeploymentState::HashRetrieved);
    assert!(stored.error_message().is_none());
    assert!(stored.signed_hash().is_none());
}

// =============================================================================
// Timeouts
// =============================================================================

/// Test: A hung collaborator call times out and is treated as a failure.
#[tokio::test]
async fn hung_call_times_out() {
    let h = Harness::with_timeout(Duration::from_millis(50));
    h.custody.hang_on("authenticate");

    let err = h.saga.initiate_deployment(token_a()).await.unwrap_err();

    assert!(matches!(
        &err,
        SagaError::Aborted { source, .. }
            if matches!(**source, SagaError::Timeout { step: "authenticate", .. })
    ));
    assert_eq!(err.kind(), SagaErrorKind::ExternalService);

    let stored = h.store.get(err.deployment_id().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.state(), DeploymentState::Error);
}

// =============================================================================
// SQLite persistence
// =============================================================================

/// Test: The full saga runs unchanged against the SQLite store.
#[tokio::test]
async fn full_saga_against_sqlite() {
    let sqlite = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let h = Harness::with_store(Arc::new(sqlite), Duration::from_secs(5));

    let request_id = h.deployed().await;
    let record = h.saga.whitelist_contract(&request_id).await.unwrap();

    assert_eq!(record.state(), DeploymentState::Completed);
    let stored = h.stored("DEP-1").await;
    assert_eq!(stored.state(), DeploymentState::Completed);
    assert_eq!(stored.version(), record.version());
    assert_eq!(stored.auth_token().map(|t| t.expose()), Some("tok-1"));
}

/// Test: SQLite reports a reused request id as a duplicate and the second saga is aborted.
#[tokio::test]
async fn duplicate_request_id_against_sqlite() {
    let sqlite = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let h = Harness::with_store(Arc::new(sqlite), Duration::from_secs(5));
    h.custody.script_request_ids(&["DEP-1", "DEP-1"]);

    let first = h.saga.initiate_deployment(token_a()).await.unwrap();
    let err = h.saga.initiate_deployment(token_a()).await.unwrap_err();

    assert!(matches!(
        &err,
        SagaError::Aborted { source, .. }
            if matches!(
                &**source,
                SagaError::Store(StoreError::DuplicateRequestId(id)) if id.as_str() == "DEP-1"
            )
    ));
    assert_eq!(err.kind(), SagaErrorKind::Conflict);

    let second = h.store.get(err.deployment_id().unwrap()).await.unwrap().unwrap();
    assert_eq!(second.state(), DeploymentState::Error);
    assert!(second.request_id().is_none());

    let owner = h.stored("DEP-1").await;
    assert_eq!(owner.id(), first.id());
    assert_eq!(owner.state(), DeploymentState::DeployRequested);
}
