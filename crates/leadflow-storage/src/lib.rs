// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for leads and conversation history.

pub mod cache;
pub mod database;
pub mod repository;

pub use cache::CachedLeadRepository;
pub use database::Database;
pub use repository::SqliteLeadRepository;
