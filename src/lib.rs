//! notekeep library
//!
//! Storage core for a personal notes and checklists application: domain
//! records, a SQLite-backed repository with idempotent upsert semantics,
//! observable stores, and a persistence controller owning the store file
//! lifecycle including backup and restore.

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod persistence;
pub mod services;
pub mod stores;
