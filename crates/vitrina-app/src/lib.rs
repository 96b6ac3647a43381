//! # vitrina-app: Application Layer for Vitrina
//!
//! Sign-in, local caches, and the operations that change a shop's
//! inventory and sales.
//!
//! ## Module Organization
//! ```text
//! vitrina_app/
//! ├── lib.rs          ◄─── You are here (tracing setup, re-exports)
//! ├── config.rs       ◄─── vitrina.toml + environment overrides
//! ├── error.rs        ◄─── AppError for the view layer
//! ├── auth.rs         ◄─── Identity provider and session
//! ├── state.rs        ◄─── AppState, caches, live sync
//! ├── sales.rs        ◄─── Sale transaction orchestrator
//! └── catalog.rs      ◄─── Product and variant maintenance
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Startup                               │
//! │                                                                         │
//! │  1. Load Configuration ───────────────────────────────────────────────► │
//! │     • defaults, vitrina.toml, VITRINA_* environment variables           │
//! │                                                                         │
//! │  2. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter                                │
//! │     • RUST_LOG wins over the configured filter                          │
//! │                                                                         │
//! │  3. Open Database ────────────────────────────────────────────────────► │
//! │     • SQLite with WAL mode, pending migrations applied                  │
//! │                                                                         │
//! │  4. Start Live Sync ──────────────────────────────────────────────────► │
//! │     • caches follow whoever signs in                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust,ignore
//! let config = AppConfig::load_or_default(None);
//! vitrina_app::init_tracing(&config.logging.filter);
//!
//! let state = AppState::open(config).await?;
//! state.start_live_sync();
//!
//! state.session().login("ana@tienda.ec", "secreto").await?;
//! let receipt = state.sale_service().create(draft).await?;
//! ```

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod sales;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use auth::Session;
pub use catalog::{CatalogService, ProductDraft, VariantDraft};
pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorCode};
pub use sales::{SaleReceipt, SaleService, SkipReason, SkippedAdjustment};
pub use state::AppState;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=vitrina=trace` - Show trace for vitrina crates only
/// - Otherwise `filter`, normally `logging.filter` from the config
///
/// Only the first call installs a subscriber.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
