use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::engine::reconciler::{LoadReconciler, OrderEvent};
use crate::error::StoreError;
use crate::models::order::{Order, OrderPatch};
use crate::store::Store;

/// Order writes made on behalf of collaborators. Every successful write is
/// followed by the reconciler's event path.
pub struct OrderLifecycle {
    store: Arc<Store>,
    reconciler: Arc<LoadReconciler>,
}

impl OrderLifecycle {
    pub fn new(store: Arc<Store>, reconciler: Arc<LoadReconciler>) -> Self {
        Self { store, reconciler }
    }

    pub fn create(&self, order: Order) -> Result<Order, StoreError> {
        let order = self.store.insert_order(order)?;
        info!(order_id = %order.id, status = ?order.status, "order created");

        self.reconciler.handle(&OrderEvent::created(order.clone()));
        Ok(order)
    }

    pub fn update(&self, id: Uuid, patch: &OrderPatch) -> Result<Order, StoreError> {
        let (before, after) = self.store.update_order(id, |order| patch.apply(order))?;
        info!(
            order_id = %id,
            from = ?before.status,
            to = ?after.status,
            delivery_man_id = ?after.delivery_man_id,
            reserved_delivery_man_id = ?after.reserved_delivery_man_id,
            "order updated"
        );

        self.reconciler
            .handle(&OrderEvent::updated(before, after.clone()));
        Ok(after)
    }

    pub fn trash(&self, id: Uuid) -> Result<Order, StoreError> {
        let order = self.store.trash_order(id)?;
        info!(order_id = %id, "order moved to trash");

        self.reconciler.handle(&OrderEvent::deleted(order.clone()));
        Ok(order)
    }

    pub fn restore(&self, id: Uuid) -> Result<Order, StoreError> {
        let order = self.store.restore_order(id)?;
        info!(order_id = %id, "order restored");

        self.reconciler.handle(&OrderEvent::restored(order.clone()));
        Ok(order)
    }

    pub fn purge(&self, id: Uuid) -> Result<Order, StoreError> {
        let order = self.store.purge_order(id)?;
        info!(order_id = %id, "order permanently deleted");

        self.reconciler
            .handle(&OrderEvent::force_deleted(order.clone()));
        Ok(order)
    }
}
