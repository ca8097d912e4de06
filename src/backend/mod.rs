//! Todo API server: REST handlers over a key-value table of todo items.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (ServerConfig, build_router)         │
//! │ (checky  │ <─────── │    ├─ metrics.rs  (track_requests middleware,    │
//! │   app)   │          │    │               MetricsCollector, sinks)      │
//! └──────────┘          │    └─ api.rs  (route handlers, AppState)         │
//!                       │         │                                        │
//!                       │         │ DbHandle::call()                       │
//!                       │         v                                        │
//!                       │  db.rs  (TodoDb over one SQLite table)           │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Typical Request Flow (toggle an item)
//!
//! 1. `PUT /todos/{id}` with `{"completed": true}` enters `metrics::track_requests`
//! 2. `api::update_todo` validates the supplied fields (400 on failure)
//! 3. `TodoDb::update_todo` merges and writes in one conditional statement;
//!    no matching row becomes a 404
//! 4. The merged record is returned; the middleware records status and
//!    duration into the collector, which a background task flushes to the
//!    configured `MetricsSink` every interval when metrics push is enabled.

pub mod api;
pub mod db;
pub mod metrics;
pub mod server;
