//! prompt-relay: a small HTTP front for the GLM chat-completion API.
//!
//! Serves a static page and forwards each `POST /api/ask` prompt to the
//! upstream model as a single-message conversation, relaying the reply text.

pub mod config;
pub mod server;
pub mod upstream;
