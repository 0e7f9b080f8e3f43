use std::sync::Arc;

use tracing::{debug, error, info};

use common::{Decision, MarketSnapshot, OrderDispatcher, OrderRequest};

use crate::StrategyRegistry;

/// Maps one market snapshot to at most one trading action and hands that
/// action to the order dispatcher.
///
/// Stateless between calls: concurrent requests share only the immutable
/// registry and the dispatcher handle.
pub struct DecisionPipeline {
    registry: StrategyRegistry,
    dispatcher: Arc<dyn OrderDispatcher>,
}

impl DecisionPipeline {
    pub fn new(registry: StrategyRegistry, dispatcher: Arc<dyn OrderDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Decide without side effects. The first strategy in priority order
    /// that fires determines the decision; `Decision::None` if none fire.
    pub fn decide(&self, snapshot: &MarketSnapshot) -> Decision {
        match self.registry.first_match(snapshot) {
            Some(strategy) => {
                Decision::new(strategy.side(), snapshot.current_price(), strategy.name())
            }
            None => Decision::None,
        }
    }

    /// Decide, then dispatch an order if a strategy fired.
    ///
    /// A failed dispatch is logged and not retried; the returned decision is
    /// the same either way.
    pub async fn execute(&self, snapshot: &MarketSnapshot) -> Decision {
        let decision = self.decide(snapshot);

        let Some(order) = OrderRequest::from_decision(&decision) else {
            debug!(price = snapshot.current_price(), "No strategy fired");
            return decision;
        };

        info!(
            order_id = %order.id,
            side = %order.side,
            price = order.price,
            strategy = %order.strategy,
            "Strategy fired, dispatching order"
        );
        if let Err(e) = self.dispatcher.dispatch(&order).await {
            error!(order_id = %order.id, error = %e, "Order dispatch failed");
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{Error, OrderSide, Result};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        orders: Mutex<Vec<OrderRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl OrderDispatcher for Recorder {
        async fn dispatch(&self, order: &OrderRequest) -> Result<()> {
            self.orders.lock().unwrap().push(order.clone());
            if self.fail {
                return Err(Error::Dispatch("exchange down".into()));
            }
            Ok(())
        }
    }

    fn snap(price: f64, high: f64, low: f64, vol: f64, avg: f64) -> MarketSnapshot {
        MarketSnapshot::new(price, high, low, vol, avg).unwrap()
    }

    fn pipeline(recorder: Arc<Recorder>) -> DecisionPipeline {
        DecisionPipeline::new(StrategyRegistry::standard(), recorder)
    }

    #[test]
    fn breakout_with_volume_buys_via_lr() {
        let p = pipeline(Arc::default());
        assert_eq!(
            p.decide(&snap(110.0, 105.0, 95.0, 6000.0, 4000.0)),
            Decision::Buy {
                price: 110.0,
                strategy: "LR".into()
            }
        );
    }

    #[test]
    fn quiet_market_decides_none() {
        let p = pipeline(Arc::default());
        assert_eq!(p.decide(&snap(100.0, 105.0, 95.0, 4000.0, 4000.0)), Decision::None);
    }

    #[test]
    fn breakdown_with_volume_sells_via_lr() {
        let p = pipeline(Arc::default());
        let d = p.decide(&snap(90.0, 105.0, 95.0, 6000.0, 4000.0));
        assert_eq!(d.side(), Some(OrderSide::Sell));
        assert_eq!(d.strategy(), Some("LR"));
    }

    #[test]
    fn breakout_without_volume_falls_through_to_lg() {
        let p = pipeline(Arc::default());
        let d = p.decide(&snap(110.0, 105.0, 95.0, 3000.0, 4000.0));
        assert_eq!(
            d,
            Decision::Buy {
                price: 110.0,
                strategy: "LG".into()
            }
        );
        let d = p.decide(&snap(96.0, 105.0, 95.0, 3000.0, 4000.0));
        assert_eq!(d.side(), Some(OrderSide::Sell));
        assert_eq!(d.strategy(), Some("LG"));
    }

    #[tokio::test]
    async fn execute_dispatches_fired_decision() {
        let recorder = Arc::new(Recorder::default());
        let p = pipeline(recorder.clone());
        let d = p.execute(&snap(110.0, 105.0, 95.0, 6000.0, 4000.0)).await;
        assert_eq!(d.strategy(), Some("LR"));

        let orders = recorder.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].price, 110.0);
        assert_eq!(orders[0].strategy, "LR");
    }

    #[tokio::test]
    async fn execute_skips_dispatch_on_none() {
        let recorder = Arc::new(Recorder::default());
        let p = pipeline(recorder.clone());
        let d = p.execute(&snap(100.0, 105.0, 95.0, 4000.0, 4000.0)).await;
        assert!(d.is_none());
        assert!(recorder.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_does_not_change_decision() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let p = pipeline(recorder.clone());
        let d = p.execute(&snap(90.0, 105.0, 95.0, 6000.0, 4000.0)).await;
        assert_eq!(
            d,
            Decision::Sell {
                price: 90.0,
                strategy: "LR".into()
            }
        );
        // Single attempt, no retry.
        assert_eq!(recorder.orders.lock().unwrap().len(), 1);
    }
}
