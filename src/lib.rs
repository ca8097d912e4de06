pub mod backend;
pub mod client;
pub mod errors;
pub mod models;
pub mod state;
pub mod ui;
