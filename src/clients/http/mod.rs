// ABOUTME: HTTP implementations of the collaborator traits using reqwest.
// ABOUTME: Each client owns a pooled reqwest Client with a request timeout.

mod custody;
mod registry;
mod signing;

pub use custody::HttpCustodyClient;
pub use registry::HttpRegistryClient;
pub use signing::HttpSigningClient;

use reqwest::Client;
use std::time::Duration;

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Join a base URL (no trailing slash) and an endpoint path.
fn join_url(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
