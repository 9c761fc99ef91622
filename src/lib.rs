// src/lib.rs
// Folio - streaming chat relay for a personal portfolio site

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod mail;
pub mod persona;
pub mod relay;
pub mod web;

pub use error::{RelayError, Result};
