//! expert-finder - Locate subject-matter experts for a free-text question
//!
//! This crate embeds expert profiles into a persistent vector index, retrieves
//! the profiles closest to a query, and asks a generative model for an answer
//! grounded in those experts, degrading to a plain listing when it cannot.

pub mod config;
pub mod domain;
pub mod embedding;
pub mod index;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod services;
pub mod storage;
pub mod synthesis;

pub use pipeline::{Pipeline, QueryOptions, QueryOutcome};
