//! Chainscope: natural-language agents over on-chain data.
//!
//! A task handler normalizes a conversation, lets a language model call
//! domain tools, and returns exactly one terminal update. The Dune agent's
//! tools sit on an analytics layer with offset pagination and a
//! failure-isolating fan-out; the Solana agent's tools talk JSON-RPC.

pub mod agent;
pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod solana;
