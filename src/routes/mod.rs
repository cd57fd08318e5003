// # Routes Module
//
// HTTP and WebSocket handlers in front of the orchestrator.
//
// ## Available Route Modules
// - `health`: liveness check
// - `message`: the `{action, data}` message endpoint every UI surface posts to
// - `tabs`: WebSocket port a content script attaches to as a browser tab

/// Health check endpoint
pub mod health;

/// Orchestrator message endpoint
pub mod message;

/// Tab-scoped WebSocket ports
pub mod tabs;
