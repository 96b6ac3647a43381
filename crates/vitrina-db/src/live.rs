//! # Live Queries
//!
//! A live query yields the full current contents of one user's collection:
//! once immediately, then again after every committed change to it.
//!
//! ```text
//! let mut live = db.live_inventory(&user.id);
//!
//! live.next().await  ──► [Shirt, Cap]            (initial snapshot)
//!        ... sale committed ...
//! live.next().await  ──► [Shirt (stock 7), Cap]  (after the change)
//! ```
//!
//! The subscription is taken when the query is created, so a write that
//! lands between two calls to `next` is never missed. Bursts of changes
//! are coalesced into a single re-read.
//!
//! `next` is cancel-safe: a snapshot that was due when the future was
//! dropped is still due on the following call, which makes it usable as a
//! `tokio::select!` branch.

use std::marker::PhantomData;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::debug;

use crate::changes::{ChangeEvent, Collection};
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use vitrina_core::{Product, Sale};

/// Subscription to one collection of one user.
#[derive(Debug)]
pub struct LiveQuery<T> {
    db: Database,
    collection: Collection,
    owner_id: String,
    rx: Receiver<ChangeEvent>,
    /// A snapshot is due and has not been delivered yet.
    stale: bool,
    _document: PhantomData<fn() -> T>,
}

impl<T> LiveQuery<T> {
    pub(crate) fn new(db: Database, collection: Collection, owner_id: String) -> Self {
        let rx = db.changes().subscribe();
        LiveQuery {
            db,
            collection,
            owner_id,
            rx,
            stale: true,
            _document: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Resolves when a fresh snapshot is due.
    async fn changed(&mut self) -> DbResult<()> {
        if self.stale {
            return Ok(());
        }

        loop {
            match self.rx.recv().await {
                Ok(event) if event.concerns(self.collection, &self.owner_id) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, collection = %self.collection, "Live query lagged, re-reading");
                    break;
                }
                Err(RecvError::Closed) => {
                    return Err(DbError::ConnectionFailed("change feed closed".to_string()));
                }
            }
        }

        // Anything already queued is covered by the re-read below.
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        self.stale = true;
        Ok(())
    }
}

impl LiveQuery<Product> {
    /// Next snapshot of the inventory.
    pub async fn next(&mut self) -> DbResult<Vec<Product>> {
        self.changed().await?;
        let snapshot = self.db.products().list(&self.owner_id).await?;
        self.stale = false;
        Ok(snapshot)
    }
}

impl LiveQuery<Sale> {
    /// Next snapshot of the sales, newest first.
    pub async fn next(&mut self) -> DbResult<Vec<Sale>> {
        self.changed().await?;
        let snapshot = self.db.sales().list(&self.owner_id).await?;
        self.stale = false;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::user::tests::create_user;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_initial_snapshot_then_updates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = create_user(&db, "ana@tienda.ec").await;

        let mut live = db.live_inventory(&owner);
        assert!(live.next().await.unwrap().is_empty());

        let mut shirt = Product::new("Shirt", "Acme");
        shirt.owner_id = owner.clone();
        db.products().create(shirt).await.unwrap();

        let snapshot = timeout(Duration::from_secs(2), live.next()).await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "Shirt");
    }

    #[tokio::test]
    async fn test_other_owner_changes_are_ignored() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ana = create_user(&db, "ana@tienda.ec").await;
        let luis = create_user(&db, "luis@tienda.ec").await;

        let mut live = db.live_inventory(&ana);
        live.next().await.unwrap();

        let mut cap = Product::new("Cap", "Acme");
        cap.owner_id = luis;
        db.products().create(cap).await.unwrap();

        assert!(timeout(Duration::from_millis(100), live.next()).await.is_err());
    }

    #[tokio::test]
    async fn test_rolled_back_writes_are_not_announced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = create_user(&db, "ana@tienda.ec").await;

        let mut live = db.live_inventory(&owner);
        live.next().await.unwrap();

        {
            let mut uow = db.begin().await.unwrap();
            let mut cap = Product::new("Cap", "Acme");
            cap.owner_id = owner.clone();
            crate::ProductRepository::create_in(&mut uow, cap).await.unwrap();
            uow.rollback().await.unwrap();
        }

        assert!(timeout(Duration::from_millis(100), live.next()).await.is_err());
        assert_eq!(db.products().count(&owner).await.unwrap(), 0);
    }
}
