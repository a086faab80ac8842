use std::collections::HashMap;
use std::sync::Arc;
use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::common::types::{Rid, TxnId};
use crate::transaction::concurrency::transaction::{
    IsolationLevel, Transaction, TransactionError, TransactionState,
};
use crate::transaction::concurrency::transaction_manager::TransactionManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
struct LockRequest {
    txn_id: TxnId,
    mode: LockMode,
    granted: bool,
}

#[derive(Default)]
struct QueueState {
    requests: Vec<LockRequest>,
    upgrading: Option<TxnId>,
}

struct LockRequestQueue {
    state: Mutex<QueueState>,
    cv: Condvar,
}

impl LockRequestQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            cv: Condvar::new(),
        }
    }
}

/// Row-level lock manager with wound-wait deadlock prevention.
///
/// Each record id owns a request queue with its own mutex and condition
/// variable; the top-level mutex only guards queue creation. An arriving
/// transaction wounds (aborts) every younger queued request whose mode
/// conflicts, then waits while an older conflicting request remains queued.
/// The wounded side discovers the abort on wake-up and surfaces `Wounded`;
/// its granted locks stay until the transaction manager finalizes it.
pub struct LockManager {
    txn_manager: Arc<TransactionManager>,
    lock_table: Mutex<HashMap<Rid, Arc<LockRequestQueue>>>,
}

impl LockManager {
    pub fn new(txn_manager: Arc<TransactionManager>) -> Self {
        Self {
            txn_manager,
            lock_table: Mutex::new(HashMap::new()),
        }
    }

    /// Take a shared lock. Rejected outright under read uncommitted.
    pub fn lock_shared(&self, txn: &Arc<Transaction>, rid: Rid) -> Result<(), TransactionError> {
        self.precheck(txn, LockMode::Shared)?;

        let queue = self.queue_for(rid);
        let mut state = queue.state.lock();
        state.requests.push(LockRequest {
            txn_id: txn.id(),
            mode: LockMode::Shared,
            granted: false,
        });
        self.wound_younger(&queue, &mut state, txn.id(), LockMode::Shared);

        while Self::older_conflicting(&state, txn.id(), LockMode::Shared)
            && txn.state() != TransactionState::Aborted
        {
            queue.cv.wait(&mut state);
        }

        if txn.state() == TransactionState::Aborted {
            Self::drop_request(&mut state, txn.id());
            queue.cv.notify_all();
            return Err(TransactionError::Wounded(txn.id()));
        }

        if let Some(request) = state.requests.iter_mut().find(|r| r.txn_id == txn.id()) {
            request.granted = true;
        }
        txn.add_shared_lock(rid);
        Ok(())
    }

    /// Take an exclusive lock
    pub fn lock_exclusive(
        &self,
        txn: &Arc<Transaction>,
        rid: Rid,
    ) -> Result<(), TransactionError> {
        self.precheck(txn, LockMode::Exclusive)?;

        let queue = self.queue_for(rid);
        let mut state = queue.state.lock();
        state.requests.push(LockRequest {
            txn_id: txn.id(),
            mode: LockMode::Exclusive,
            granted: false,
        });
        self.wound_younger(&queue, &mut state, txn.id(), LockMode::Exclusive);

        while Self::older_conflicting(&state, txn.id(), LockMode::Exclusive)
            && txn.state() != TransactionState::Aborted
        {
            queue.cv.wait(&mut state);
        }

        if txn.state() == TransactionState::Aborted {
            Self::drop_request(&mut state, txn.id());
            queue.cv.notify_all();
            return Err(TransactionError::Wounded(txn.id()));
        }

        if let Some(request) = state.requests.iter_mut().find(|r| r.txn_id == txn.id()) {
            request.granted = true;
        }
        txn.add_exclusive_lock(rid);
        Ok(())
    }

    /// Upgrade a granted shared lock to exclusive. Only one upgrade may be
    /// pending per record.
    pub fn lock_upgrade(&self, txn: &Arc<Transaction>, rid: Rid) -> Result<(), TransactionError> {
        self.precheck(txn, LockMode::Exclusive)?;

        let queue = self
            .existing_queue(rid)
            .ok_or(TransactionError::LockNotHeld(txn.id()))?;
        let mut state = queue.state.lock();

        if state.upgrading.is_some() {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionError::UpgradeConflict(txn.id()));
        }

        {
            let request = state
                .requests
                .iter_mut()
                .find(|r| r.txn_id == txn.id())
                .ok_or(TransactionError::LockNotHeld(txn.id()))?;
            if request.mode == LockMode::Exclusive || !request.granted {
                return Err(TransactionError::LockNotHeld(txn.id()));
            }
            request.mode = LockMode::Exclusive;
        }
        state.upgrading = Some(txn.id());
        txn.remove_shared_lock(rid);
        txn.add_exclusive_lock(rid);
        self.wound_younger(&queue, &mut state, txn.id(), LockMode::Exclusive);

        while Self::older_conflicting(&state, txn.id(), LockMode::Exclusive)
            && txn.state() != TransactionState::Aborted
        {
            queue.cv.wait(&mut state);
        }

        state.upgrading = None;
        if txn.state() == TransactionState::Aborted {
            queue.cv.notify_all();
            return Err(TransactionError::Wounded(txn.id()));
        }
        Ok(())
    }

    /// Release a lock. Under repeatable read this is the growing→shrinking
    /// transition. Returns false when the transaction has no request queued.
    pub fn unlock(&self, txn: &Arc<Transaction>, rid: Rid) -> bool {
        if txn.isolation_level() == IsolationLevel::RepeatableRead
            && txn.state() == TransactionState::Growing
        {
            txn.set_state(TransactionState::Shrinking);
        }
        txn.remove_shared_lock(rid);
        txn.remove_exclusive_lock(rid);

        let queue = match self.existing_queue(rid) {
            Some(queue) => queue,
            None => return false,
        };
        let mut state = queue.state.lock();
        let removed = Self::drop_request(&mut state, txn.id());
        if removed {
            queue.cv.notify_all();
        }
        removed
    }

    /// State checks shared by the lock operations. Both violations abort the
    /// calling transaction.
    fn precheck(&self, txn: &Arc<Transaction>, mode: LockMode) -> Result<(), TransactionError> {
        match txn.state() {
            TransactionState::Shrinking => {
                txn.set_state(TransactionState::Aborted);
                return Err(TransactionError::LockOnShrinking(txn.id()));
            }
            TransactionState::Aborted => {
                return Err(TransactionError::Wounded(txn.id()));
            }
            _ => {}
        }
        if mode == LockMode::Shared
            && txn.isolation_level() == IsolationLevel::ReadUncommitted
        {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionError::SharedOnReadUncommitted(txn.id()));
        }
        Ok(())
    }

    /// Two requests conflict unless both are shared
    fn conflicts(acquiring: LockMode, queued: LockMode) -> bool {
        acquiring == LockMode::Exclusive || queued == LockMode::Exclusive
    }

    /// Abort every younger queued request whose mode conflicts with the
    /// arriving one, and wake the queue so they can observe it.
    fn wound_younger(
        &self,
        queue: &LockRequestQueue,
        state: &mut QueueState,
        txn_id: TxnId,
        acquiring: LockMode,
    ) {
        let mut wounded_any = false;
        for request in &mut state.requests {
            if request.txn_id <= txn_id || !Self::conflicts(acquiring, request.mode) {
                continue;
            }
            if let Some(victim) = self.txn_manager.get_transaction(request.txn_id) {
                if victim.state() != TransactionState::Aborted {
                    debug!("txn {} wounds younger txn {}", txn_id, request.txn_id);
                    victim.set_state(TransactionState::Aborted);
                    request.granted = false;
                    wounded_any = true;
                }
            }
        }
        if wounded_any {
            queue.cv.notify_all();
        }
    }

    /// True while an older request with a conflicting mode is still queued
    fn older_conflicting(state: &QueueState, txn_id: TxnId, acquiring: LockMode) -> bool {
        state
            .requests
            .iter()
            .any(|r| r.txn_id < txn_id && Self::conflicts(acquiring, r.mode))
    }

    fn drop_request(state: &mut QueueState, txn_id: TxnId) -> bool {
        match state.requests.iter().position(|r| r.txn_id == txn_id) {
            Some(position) => {
                state.requests.remove(position);
                true
            }
            None => false,
        }
    }

    fn queue_for(&self, rid: Rid) -> Arc<LockRequestQueue> {
        self.lock_table
            .lock()
            .entry(rid)
            .or_insert_with(|| Arc::new(LockRequestQueue::new()))
            .clone()
    }

    fn existing_queue(&self, rid: Rid) -> Option<Arc<LockRequestQueue>> {
        self.lock_table.lock().get(&rid).cloned()
    }
}
