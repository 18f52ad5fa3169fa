//! Batch URL reachability checker
//!
//! Accepts batches of URLs over HTTP, probes them with a bounded worker pool
//! and per-target deadlines, and stores per-target and aggregate results in
//! SQLite for later polling.

pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod web;
