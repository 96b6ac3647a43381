//! # Repository Module
//!
//! One repository per collection.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service (vitrina-app)                                                 │
//! │       │                                                                 │
//! │       │  db.products().list(&owner)          pool, publishes at once   │
//! │       │  ProductRepository::update_in(&mut uow, &p)                    │
//! │       │                                      transaction, publishes    │
//! │       ▼                                      on commit                 │
//! │  ProductRepository / SaleRepository / UserRepository                   │
//! │       │                                                                 │
//! │       │  SQL (every document query scoped by owner_id)                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - The `inventory` collection
//! - [`sale::SaleRepository`] - The `sales` collection
//! - [`user::UserRepository`] - Accounts

pub mod product;
pub mod sale;
pub mod user;
