//! # Unit of Work
//!
//! One SQLite transaction plus the change events it will publish.
//!
//! ```text
//! db.begin() ──► UnitOfWork ──► *_in(&mut uow, ..) writes ──► commit()
//!                    │                                           │
//!                    │ drop / rollback()                         ├─ COMMIT
//!                    ▼                                           └─ publish events
//!                ROLLBACK, nothing published
//! ```
//!
//! Subscribers never hear about writes that were rolled back, and never
//! see a half-applied operation.

use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::debug;

use crate::changes::{ChangeEvent, ChangeFeed, Collection};
use crate::error::{DbError, DbResult};

/// An open transaction. Dropping it without [`commit`](Self::commit) rolls
/// back every write made through it.
#[derive(Debug)]
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    feed: ChangeFeed,
    pending: Vec<ChangeEvent>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>, feed: ChangeFeed) -> Self {
        UnitOfWork {
            tx,
            feed,
            pending: Vec::new(),
        }
    }

    /// The transaction's connection, for queries repositories don't cover.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Queues a change event for publication on commit.
    pub(crate) fn touch(&mut self, collection: Collection, owner_id: &str) {
        let event = ChangeEvent::new(collection, owner_id);
        if !self.pending.contains(&event) {
            self.pending.push(event);
        }
    }

    /// Commits, then publishes one event per touched collection.
    pub async fn commit(self) -> DbResult<()> {
        let UnitOfWork { tx, feed, pending } = self;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(changes = pending.len(), "Unit of work committed");
        for event in pending {
            feed.publish(event);
        }
        Ok(())
    }

    /// Rolls back explicitly. Equivalent to dropping the unit.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work rolled back");
        Ok(())
    }
}
