pub mod accounts;
pub mod middleware;
pub mod notifications;
pub mod respond;
pub mod rest;
pub mod router;
pub mod state;

// Re-export the router builder to make it easily accessible
// to the binary that starts the web server.
pub use middleware::{require_auth, resolve_user};
pub use router::build_router;
