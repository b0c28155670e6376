//! Database pool construction and ambient transaction plumbing.
//!
//! Repository methods never know whether they run inside a transaction.
//! Each statement resolves its executor through [`acquire`]: if the
//! request's [`TxContext`] carries an active transaction the statement joins
//! it, otherwise a pooled connection is checked out and the statement runs
//! as a single autocommit.
//!
//! Query functions stay generic over `sqlx::Executor`, so identical SQL and
//! scan logic runs against either source:
//!
//! ```ignore
//! let mut handle = db::acquire(ctx, &self.pool).await?;
//! let row = insert_user(handle.as_conn()?, &user).await?;
//! ```

use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::{Mutex, MutexGuard};

use crate::config::DatabaseConfig;

/// Shared slot holding the transaction for one unit of work.
///
/// The coordinator that began the transaction owns the slot; nested calls
/// reach it through the context and only ever borrow the connection inside.
/// `None` means the transaction reached a terminal state.
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// Request-scoped carrier for the ambient transaction.
///
/// A fresh request starts from [`TxContext::new`] with no handle installed;
/// the transaction coordinator derives a child context per unit of work.
/// Cloning is cheap and never shares state across unrelated call chains.
#[derive(Clone, Default)]
pub struct TxContext {
    tx: Option<SharedTx>,
}

impl TxContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context carrying `tx`; the receiver is left untouched.
    pub fn with_transaction(&self, tx: SharedTx) -> Self {
        Self { tx: Some(tx) }
    }

    /// The ambient transaction, if one is active on this call chain.
    pub fn transaction(&self) -> Option<&SharedTx> {
        self.tx.as_ref()
    }
}

/// A resolved executor: the ambient transaction when one is active,
/// otherwise a connection checked out from the pool.
pub enum ConnHandle<'a> {
    Tx(MutexGuard<'a, Option<Transaction<'static, Postgres>>>),
    Pool(PoolConnection<Postgres>),
}

impl ConnHandle<'_> {
    /// The connection to run the next statement on.
    ///
    /// Fails if the transaction slot was already emptied; a handle must not
    /// be used after its unit of work finalized.
    pub fn as_conn(&mut self) -> Result<&mut PgConnection, sqlx::Error> {
        match self {
            ConnHandle::Tx(guard) => match guard.as_mut() {
                Some(tx) => Ok(&mut **tx),
                None => Err(sqlx::Error::PoolClosed),
            },
            ConnHandle::Pool(conn) => Ok(&mut **conn),
        }
    }
}

/// Resolve the executor for one statement.
pub async fn acquire<'a>(
    ctx: &'a TxContext,
    pool: &PgPool,
) -> Result<ConnHandle<'a>, sqlx::Error> {
    match ctx.transaction() {
        Some(tx) => Ok(ConnHandle::Tx(tx.lock().await)),
        None => Ok(ConnHandle::Pool(pool.acquire().await?)),
    }
}

/// Build the connection pool and verify connectivity.
pub async fn connect(cfg: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = pool_options(cfg).connect(&cfg.url).await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

fn pool_options(cfg: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .acquire_timeout(cfg.acquire_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_handle() -> SharedTx {
        Arc::new(Mutex::new(None))
    }

    #[test]
    fn new_context_has_no_transaction() {
        let ctx = TxContext::new();
        assert!(ctx.transaction().is_none());
    }

    #[test]
    fn with_transaction_derives_without_mutating() {
        let ctx = TxContext::new();
        let handle = empty_handle();

        let derived = ctx.with_transaction(Arc::clone(&handle));

        assert!(ctx.transaction().is_none());
        let resolved = derived
            .transaction()
            .expect("derived context carries the handle");
        assert!(Arc::ptr_eq(resolved, &handle));
    }

    #[test]
    fn cloned_context_shares_the_same_handle() {
        let handle = empty_handle();
        let ctx = TxContext::new().with_transaction(Arc::clone(&handle));

        let cloned = ctx.clone();

        let resolved = cloned.transaction().expect("clone carries the handle");
        assert!(Arc::ptr_eq(resolved, &handle));
    }

    #[tokio::test]
    async fn empty_slot_is_an_error_not_a_panic() {
        let handle = empty_handle();
        let mut conn = ConnHandle::Tx(handle.lock().await);

        assert!(matches!(conn.as_conn(), Err(sqlx::Error::PoolClosed)));
    }
}
