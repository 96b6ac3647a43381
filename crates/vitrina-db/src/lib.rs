//! # vitrina-db: Document Store for Vitrina
//!
//! Per-user `inventory` and `sales` collections on SQLite, with units of
//! work and live queries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vitrina Data Flow                                │
//! │                                                                         │
//! │  SaleService::create / CatalogService::add_product                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   vitrina-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ product, sale │    │  (embedded)  │  │   │
//! │  │   │ SqlitePool    │◄───│ user          │    │ 001_init.sql │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │   ┌───────▼───────┐    ┌───────────────┐                       │   │
//! │  │   │  UnitOfWork   │───►│  ChangeFeed   │───► LiveQuery          │   │
//! │  │   │ (transaction) │    │  (broadcast)  │     (snapshots)        │   │
//! │  │   └───────────────┘    └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (platform data dir, or VITRINA_DB_PATH)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories for products, sales and users
//! - [`unit_of_work`] - Transactions that publish on commit
//! - [`changes`] - Change feed
//! - [`live`] - Live queries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vitrina_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("vitrina.db")).await?;
//!
//! let mut live = db.live_inventory(&user.id);
//! let products = live.next().await?; // now, then after every change
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod changes;
pub mod error;
pub mod live;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use changes::{ChangeEvent, ChangeFeed, Collection};
pub use error::{DbError, DbResult};
pub use live::LiveQuery;
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::user::{Credentials, UserRepository};
