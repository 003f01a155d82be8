use pkg_metrics::{
    MetricsRegistry, QUEUE_DEPTH, RECONCILE_ERRORS_TOTAL, RECONCILES_TOTAL, WORKERS_BUSY,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::queue::WorkQueue;
use crate::router::EventRouter;
use crate::vip::VipController;

/// Runs the [`EventRouter`] and a pool of workers draining its queue into
/// [`VipController::reconcile`].
pub struct ControllerRuntime {
    controller: Arc<VipController>,
    queue: WorkQueue<String>,
    metrics: Arc<MetricsRegistry>,
    resync_interval: Duration,
}

impl ControllerRuntime {
    pub fn new(
        controller: VipController,
        metrics: Arc<MetricsRegistry>,
        resync_interval: Duration,
    ) -> Self {
        Self {
            controller: Arc::new(controller),
            queue: WorkQueue::default(),
            metrics,
            resync_interval,
        }
    }

    pub fn queue(&self) -> &WorkQueue<String> {
        &self.queue
    }

    /// Process keys until `shutdown` flips. Keys still waiting are dropped;
    /// reconciles already running are allowed to finish.
    pub async fn run(
        self,
        workers: usize,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let workers = workers.max(1);
        let router = EventRouter::new(
            self.controller.registry().clone(),
            self.queue.clone(),
            self.resync_interval,
        )
        .start(shutdown.clone());

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            handles.push(tokio::spawn(worker(
                id,
                self.controller.clone(),
                self.queue.clone(),
                self.metrics.clone(),
            )));
        }
        info!("ControllerRuntime started with {} worker(s)", workers);

        while !*shutdown.borrow_and_update() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        info!("ControllerRuntime shutting down");
        self.queue.shutdown();
        for handle in handles {
            handle.await?;
        }
        router.await?;
        info!("ControllerRuntime stopped");
        Ok(())
    }
}

async fn worker(
    id: usize,
    controller: Arc<VipController>,
    queue: WorkQueue<String>,
    metrics: Arc<MetricsRegistry>,
) {
    while let Some(key) = queue.get().await {
        metrics.gauge_inc(WORKERS_BUSY);
        metrics.gauge_set(QUEUE_DEPTH, queue.len() as i64);
        metrics.counter_inc(RECONCILES_TOTAL);

        match controller.reconcile(&key).await {
            Ok(outcome) => {
                debug!("Worker {}: {} -> {:?}", id, key, outcome);
                queue.forget(&key);
            }
            Err(e) => {
                metrics.counter_inc(RECONCILE_ERRORS_TOTAL);
                warn!(
                    "Error processing service {} (attempt {}): {:#}",
                    key,
                    queue.num_requeues(&key) + 1,
                    e
                );
                queue.add_rate_limited(key.clone());
            }
        }

        queue.done(&key);
        metrics.gauge_dec(WORKERS_BUSY);
    }
    debug!("Worker {} stopped", id);
}
