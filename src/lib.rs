//! Transloader - synchronize weather station data into an OGC SensorThings API
//!
//! This library exposes the core modules for testing and reuse.

pub mod cache;
pub mod cli;
pub mod common;
pub mod config;
pub mod entity;
pub mod error;
pub mod http;
pub mod ontology;
pub mod provider;
pub mod sensorthings;
pub mod sources;
pub mod station;
pub mod sync;
