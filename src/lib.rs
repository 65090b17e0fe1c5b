//! turbobot: chat command bridge for the Mai-Turbo service.
//!
//! Chat users bind their platform identity to a Turbo bot key once, then
//! issue prefixed commands that are relayed to the Turbo HTTP backend and
//! answered with plain-text replies.
//!
//! ```text
//!  channel (repl / webhook)
//!        │  IncomingMessage
//!        ▼
//!  bridge ──► commands::Dispatcher ──► auth ──► db (libSQL)
//!        ▲              │
//!        │  reply       ▼
//!        └──────── interpret ◄── backend (reqwest)
//! ```

pub mod auth;
pub mod backend;
pub mod bootstrap;
pub mod bridge;
pub mod channels;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod interpret;
pub mod settings;
