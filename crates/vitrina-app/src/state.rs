//! # Application State
//!
//! One explicit object owning everything the views read and every service
//! they call.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                         AppState                                │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐  │   │
//! │  │  │   Session    │  │   Database   │  │       Caches         │  │   │
//! │  │  │ watch<User>  │  │ pool + feed  │  │ RwLock<Vec<Product>> │  │   │
//! │  │  └──────┬───────┘  └──────┬───────┘  │ RwLock<Vec<Sale>>    │  │   │
//! │  │         │                 │          └──────────▲───────────┘  │   │
//! │  │         │   sign-in       │ live queries        │ replaced     │   │
//! │  │         └────────► live sync task ──────────────┘ wholesale    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  READS:  inventory(), sales(), summaries  (snapshots of the caches)    │
//! │  WRITES: sale_service(), catalog()        (straight to the store)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caches are never the source of truth. Services read and write the
//! store; the caches catch up through live queries.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vitrina_core::report::{
    inventory_summary, sales_by_period, summarize_sales, DateRange, InventorySummary, Period, PeriodTotal,
    SalesSummary,
};
use vitrina_core::sale::SaleDraft;
use vitrina_core::{Product, Sale, User};
use vitrina_db::{Database, DbResult};

use crate::auth::Session;
use crate::catalog::CatalogService;
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::sales::SaleService;

/// Read-only copies of the signed-in user's collections.
#[derive(Debug, Default)]
struct Caches {
    inventory: RwLock<Vec<Product>>,
    sales: RwLock<Vec<Sale>>,
}

impl Caches {
    async fn clear(&self) {
        self.inventory.write().await.clear();
        self.sales.write().await.clear();
    }
}

#[derive(Debug)]
pub struct AppState {
    config: AppConfig,
    db: Database,
    session: Session,
    caches: Arc<Caches>,
    live_sync: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    /// Opens the configured database and builds the state around it.
    pub async fn open(config: AppConfig) -> AppResult<Self> {
        let db_config = config.db_config();
        info!(path = ?db_config.database_path, "Opening database");

        let db = Database::new(db_config).await?;
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: AppConfig, db: Database) -> Self {
        let session = Session::new(&db);
        AppState {
            config,
            db,
            session,
            caches: Arc::new(Caches::default()),
            live_sync: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // =========================================================================
    // Services
    // =========================================================================

    pub fn sale_service(&self) -> SaleService {
        SaleService::new(self.db.clone(), self.session.clone())
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(
            self.db.clone(),
            self.session.clone(),
            self.config.catalog.default_category.clone(),
        )
    }

    /// An empty sale form with the configured defaults preselected.
    pub fn new_sale_draft(&self) -> SaleDraft {
        SaleDraft::new(self.config.sales.default_payment_method, self.config.sales.default_channel)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Products of the signed-in user, by name.
    pub async fn inventory(&self) -> Vec<Product> {
        self.caches.inventory.read().await.clone()
    }

    /// Sales of the signed-in user, newest first.
    pub async fn sales(&self) -> Vec<Sale> {
        self.caches.sales.read().await.clone()
    }

    pub async fn sales_summary(&self, range: DateRange) -> SalesSummary {
        summarize_sales(&self.caches.sales.read().await, range)
    }

    pub async fn sales_by_period(&self, period: Period) -> Vec<PeriodTotal> {
        sales_by_period(&self.caches.sales.read().await, period)
    }

    pub async fn inventory_summary(&self) -> InventorySummary {
        inventory_summary(&self.caches.inventory.read().await)
    }

    /// Reloads both caches from the store once.
    pub async fn refresh(&self) -> AppResult<()> {
        match self.session.current_user() {
            Some(user) => {
                let products = self.db.products().list(&user.id).await?;
                let sales = self.db.sales().list(&user.id).await?;
                *self.caches.inventory.write().await = products;
                *self.caches.sales.write().await = sales;
            }
            None => self.caches.clear().await,
        }
        Ok(())
    }

    // =========================================================================
    // Live Sync
    // =========================================================================

    /// Keeps the caches following the signed-in user's collections until
    /// [`stop_live_sync`](Self::stop_live_sync). Calling it again while it
    /// runs does nothing.
    pub fn start_live_sync(&self) {
        let mut slot = match self.live_sync.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };

        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let task = tokio::spawn(follow_session(
            self.db.clone(),
            Arc::clone(&self.caches),
            self.session.subscribe(),
        ));
        *slot = Some(task);
        info!("Live sync started");
    }

    /// Whether the live sync task is running.
    pub fn live_sync_running(&self) -> bool {
        match self.live_sync.lock() {
            Ok(slot) => slot.as_ref().is_some_and(|task| !task.is_finished()),
            Err(poisoned) => poisoned.into_inner().as_ref().is_some_and(|task| !task.is_finished()),
        }
    }

    pub fn stop_live_sync(&self) {
        let task = match self.live_sync.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(task) = task {
            task.abort();
            info!("Live sync stopped");
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.stop_live_sync();
    }
}

/// Pause before re-opening live queries after a failed read.
const LIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Why [`follow_user`] returned.
enum SessionEvent {
    Changed,
    Closed,
}

/// Follows sign-ins: clears the caches on every change of user, then feeds
/// them from that user's live queries until the user changes again.
///
/// A failed read does not end the task. The caches keep their last
/// snapshot and the queries are re-opened after [`LIVE_RETRY_DELAY`].
async fn follow_session(db: Database, caches: Arc<Caches>, mut auth: watch::Receiver<Option<User>>) {
    loop {
        let user = auth.borrow_and_update().clone();
        caches.clear().await;

        let Some(user) = user else {
            if auth.changed().await.is_err() {
                return;
            }
            continue;
        };

        debug!(user_id = %user.id, "Following collections");
        loop {
            match follow_user(&db, &caches, &mut auth, &user.id).await {
                Ok(SessionEvent::Changed) => break,
                Ok(SessionEvent::Closed) => return,
                Err(e) => {
                    warn!(user_id = %user.id, "Live query failed, retrying: {}", e);
                    tokio::select! {
                        changed = auth.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            break;
                        }
                        _ = tokio::time::sleep(LIVE_RETRY_DELAY) => {}
                    }
                }
            }
        }
    }
}

/// Feeds the caches from one user's live queries until the session
/// changes or a read fails.
async fn follow_user(
    db: &Database,
    caches: &Caches,
    auth: &mut watch::Receiver<Option<User>>,
    user_id: &str,
) -> DbResult<SessionEvent> {
    let mut inventory = db.live_inventory(user_id);
    let mut sales = db.live_sales(user_id);

    loop {
        tokio::select! {
            changed = auth.changed() => {
                return Ok(match changed {
                    Ok(()) => SessionEvent::Changed,
                    Err(_) => SessionEvent::Closed,
                });
            }
            snapshot = inventory.next() => *caches.inventory.write().await = snapshot?,
            snapshot = sales.next() => *caches.sales.write().await = snapshot?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProductDraft, VariantDraft};
    use vitrina_core::{PaymentMethod, SaleLineItem, SalesChannel, VariantRef};
    use vitrina_db::DbConfig;

    async fn state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::with_database(AppConfig::default(), db)
    }

    fn shirt() -> ProductDraft {
        ProductDraft {
            name: "Shirt".into(),
            brand: "Acme".into(),
            category: None,
            cost_price: "4.00".into(),
            sale_price: "10.00".into(),
            variants: vec![VariantDraft::new("M", "Red", 10)],
            stock: String::new(),
        }
    }

    /// Polls `check` until it holds or a second passes.
    async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_refresh_and_summaries() {
        let state = state().await;
        state.session().register("ana@tienda.ec", "secreto").await.unwrap();

        let shirt = state.catalog().add_product(shirt()).await.unwrap();

        let mut draft = state.new_sale_draft();
        draft.products.push(SaleLineItem {
            product_id: shirt.id.clone(),
            product_name: String::new(),
            variant: Some(VariantRef::new("M", "Red")),
            quantity: 3,
            price: shirt.sale_price,
            payment_method: PaymentMethod::Efectivo,
            channel: SalesChannel::Local,
            override_defaults: false,
        });
        state.sale_service().create(draft).await.unwrap();

        assert!(state.inventory().await.is_empty());
        state.refresh().await.unwrap();

        assert_eq!(state.inventory().await[0].stock, 7);
        assert_eq!(state.sales().await.len(), 1);

        let summary = state.sales_summary(DateRange::all()).await;
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.units, 3);
        assert_eq!(summary.revenue.cents(), 3000);

        let inventory = state.inventory_summary().await;
        assert_eq!(inventory.total_units, 7);

        state.session().logout();
        state.refresh().await.unwrap();
        assert!(state.inventory().await.is_empty());
    }

    #[tokio::test]
    async fn test_live_sync_follows_session() {
        let state = state().await;
        let s = &state;
        state.start_live_sync();

        state.session().register("ana@tienda.ec", "secreto").await.unwrap();
        state.catalog().add_product(shirt()).await.unwrap();
        eventually(|| async move { s.inventory().await.len() == 1 }).await;

        state.session().logout();
        eventually(|| async move { s.inventory().await.is_empty() }).await;

        // Another account sees only its own inventory
        state.session().register("luis@tienda.ec", "secreto").await.unwrap();
        state.catalog().add_product(shirt()).await.unwrap();
        state.catalog().add_product(ProductDraft { name: "Cap".into(), variants: vec![], ..shirt() }).await.unwrap();
        eventually(|| async move { s.inventory().await.len() == 2 }).await;

        state.stop_live_sync();
    }

    #[tokio::test]
    async fn test_live_sync_survives_failed_reads() {
        let state = state().await;
        let s = &state;
        state.session().register("ana@tienda.ec", "secreto").await.unwrap();

        state.db().close().await;
        state.start_live_sync();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(state.live_sync_running());

        // Still follows the session while reads keep failing
        state.session().logout();
        eventually(|| async move { s.inventory().await.is_empty() }).await;
        assert!(state.live_sync_running());

        state.stop_live_sync();
        assert!(!state.live_sync_running());
    }

    #[tokio::test]
    async fn test_new_sale_draft_uses_config_defaults() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = AppConfig::default();
        config.sales.default_payment_method = PaymentMethod::Deuna;
        config.sales.default_channel = SalesChannel::Online;

        let state = AppState::with_database(config, db);
        let draft = state.new_sale_draft();
        assert_eq!(draft.payment_method, PaymentMethod::Deuna);
        assert_eq!(draft.channel, SalesChannel::Online);
        assert!(draft.products.is_empty());
    }
}
