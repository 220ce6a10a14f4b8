#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(missing_docs, clippy::pedantic)]

//! Wire models and client configuration shared by the `ChatSync` crates.

pub mod config;
pub mod models;
