//! Storage layer for notes-sync.
//!
//! This module provides SQLite-based persistence for:
//! - The offline queue of notes awaiting delivery
//! - The completed log of delivered notes

mod database;
mod migrations;

pub use database::Database;
