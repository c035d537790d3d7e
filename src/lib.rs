//! VaultLinks - A personal vault of bookmarked links
//!
//! This library provides sign-in through an external identity provider,
//! session-token access checks, and owner-scoped vault link storage.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
