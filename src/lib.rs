//! Avisia chat relay: page-aware website assistant backend.
//!
//! Screens a visitor's message for prompt injection, then relays it with the
//! page content and prior turns to the Mistral chat API and returns the reply.

pub mod chat;
pub mod config;
pub mod error;
pub mod inference;
pub mod server;
pub mod types;
