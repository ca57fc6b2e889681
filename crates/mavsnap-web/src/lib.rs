//! HTTP presenter for mavsnap.
//!
//! Serves the index page, the JSON snapshots written by the collector and
//! the static assets of the web page.

mod routes;
pub mod server;

pub use server::{router, run, AppState};
