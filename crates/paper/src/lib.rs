use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use common::{OrderDispatcher, OrderRequest, Result};

/// Simulated order dispatcher.
///
/// Orders are logged and kept in a bounded in-memory history. Nothing is
/// ever sent to the brokerage.
pub struct PaperDispatcher {
    /// Most recent dispatched orders, oldest first.
    history: Arc<RwLock<Vec<OrderRequest>>>,
    max_history: usize,
}

impl PaperDispatcher {
    const DEFAULT_MAX_HISTORY: usize = 200;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_HISTORY)
    }

    pub fn with_capacity(max_history: usize) -> Self {
        info!(max_history, "PaperDispatcher initialized");
        Self {
            history: Arc::new(RwLock::new(Vec::new())),
            max_history: max_history.max(1),
        }
    }

    /// Snapshot of the dispatched orders, oldest first.
    pub async fn history(&self) -> Vec<OrderRequest> {
        self.history.read().await.clone()
    }
}

impl Default for PaperDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderDispatcher for PaperDispatcher {
    async fn dispatch(&self, order: &OrderRequest) -> Result<()> {
        info!(
            order_id = %order.id,
            strategy = %order.strategy,
            "Placing {} order at {}",
            order.side,
            order.price
        );

        let mut history = self.history.write().await;
        history.push(order.clone());
        if history.len() > self.max_history {
            history.remove(0);
        }
        Ok(())
    }
}
