// ABOUTME: Library root for consign, a smart contract deployment saga service.
// ABOUTME: Exposes the saga, its collaborators, persistence, and the HTTP API.

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod output;
pub mod saga;
pub mod server;
pub mod store;
pub mod types;
