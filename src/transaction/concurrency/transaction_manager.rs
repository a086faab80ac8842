use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;

use crate::common::types::TxnId;
use crate::transaction::concurrency::lock_manager::LockManager;
use crate::transaction::concurrency::transaction::{
    IsolationLevel, Transaction, TransactionState,
};

/// Creates and tracks transactions.
///
/// Ids are handed out monotonically, so a smaller id always means an older
/// transaction; the lock manager relies on this for wound-wait. Finalizing a
/// transaction (commit or abort) is the point where its locks are released.
pub struct TransactionManager {
    next_txn_id: AtomicU32,
    active_transactions: Mutex<HashMap<TxnId, Arc<Transaction>>>,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_txn_id: AtomicU32::new(1),
            active_transactions: Mutex::new(HashMap::new()),
        }
    }

    /// Begin a new transaction in the `Growing` state
    pub fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(txn_id, isolation_level));
        self.active_transactions.lock().insert(txn_id, txn.clone());
        txn
    }

    /// Look up an active transaction; consumed by the lock manager when it
    /// wounds younger requesters.
    pub fn get_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        self.active_transactions.lock().get(&txn_id).cloned()
    }

    /// Commit: release every held lock, then retire the transaction
    pub fn commit(&self, txn: &Arc<Transaction>, lock_manager: &LockManager) {
        Self::release_all_locks(txn, lock_manager);
        txn.set_state(TransactionState::Committed);
        self.active_transactions.lock().remove(&txn.id());
    }

    /// Abort: release every held lock, then retire the transaction. Also the
    /// path a wounded transaction takes once its thread observes the abort.
    pub fn abort(&self, txn: &Arc<Transaction>, lock_manager: &LockManager) {
        Self::release_all_locks(txn, lock_manager);
        txn.set_state(TransactionState::Aborted);
        self.active_transactions.lock().remove(&txn.id());
    }

    pub fn active_transaction_ids(&self) -> Vec<TxnId> {
        self.active_transactions.lock().keys().copied().collect()
    }

    fn release_all_locks(txn: &Arc<Transaction>, lock_manager: &LockManager) {
        for rid in txn.held_rids() {
            lock_manager.unlock(txn, rid);
        }
    }
}
