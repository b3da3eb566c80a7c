// src/lib.rs

//! Vacation scheme search agent.
//!
//! Searches for new postings, emails the ones not sent before, and keeps a
//! durable history of sent links.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
