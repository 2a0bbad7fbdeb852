//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  ScanController                                                        │
//! │       │                                                                 │
//! │       │  db.products().find_by_code("P1")                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── find_by_code(&self, code)                                         │
//! │  ├── insert(&self, product)                                            │
//! │  └── update_quantity(&self, code, quantity)                            │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - User lookup and seeding
//! - [`ProductRepository`](product::ProductRepository) - Product lookup and quantities
//! - [`LedgerRepository`](ledger::LedgerRepository) - Append-only history

pub mod ledger;
pub mod product;
pub mod user;
