pub mod rest;
pub mod router;
pub mod state;

// Re-export the router builder to make it easily accessible
// to the binary that runs the web server.
pub use router::api_router;
pub use state::AppState;
