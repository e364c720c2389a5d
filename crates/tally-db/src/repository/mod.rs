//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartSessions / caller                                                  │
//! │       │                                                                 │
//! │       │  db.carts().restore(&id, catalog, taxes, mode)                  │
//! │       ▼                                                                 │
//! │  CartRepository                                                         │
//! │  ├── save(&self, record)      upsert                                    │
//! │  ├── find(&self, id)          stored record                             │
//! │  ├── restore(&self, id, ..)   record → Cart via the codec               │
//! │  └── delete(&self, id)                                                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CartRepository`](carts::CartRepository) - Persisted cart records

pub mod carts;
