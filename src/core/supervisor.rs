// src/core/supervisor.rs
use crate::config::ExecutionConfig;
use crate::connectors::traits::ExchangeGateway;
use crate::core::engine::{TradingEngine, Transition};
use crate::error::{EngineError, SupervisorError};
use crate::strategies::traits::Strategy;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Single-flight guard: at most one strategy evaluation at a time.
#[derive(Debug, Clone, Default)]
pub struct EvaluationGuard {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of one evaluation; released on drop, including on error.
#[derive(Debug)]
pub struct EvaluationPermit {
    busy: Arc<AtomicBool>,
}

impl EvaluationGuard {
    pub fn try_acquire(&self) -> Option<EvaluationPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| EvaluationPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for EvaluationPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Outer recovery: reconnect, back off, retry the tick exactly once.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    pub backoff: Duration,
    pub poll_interval: Duration,
}

impl From<&ExecutionConfig> for RecoveryPolicy {
    fn from(cfg: &ExecutionConfig) -> Self {
        Self {
            backoff: Duration::from_secs(cfg.recovery_backoff_secs),
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TickReport {
    /// Gate closed or an evaluation was already in flight.
    Skipped,
    Evaluated(Transition),
}

pub struct Supervisor<G, S> {
    engine: TradingEngine<G, S>,
    guard: EvaluationGuard,
    policy: RecoveryPolicy,
}

impl<G, S> Supervisor<G, S>
where
    G: ExchangeGateway,
    S: Strategy,
{
    pub fn new(engine: TradingEngine<G, S>, policy: RecoveryPolicy) -> Self {
        Self {
            engine,
            guard: EvaluationGuard::default(),
            policy,
        }
    }

    pub fn engine(&self) -> &TradingEngine<G, S> {
        &self.engine
    }

    pub fn guard(&self) -> EvaluationGuard {
        self.guard.clone()
    }

    /// One polling step: cheap two-candle gate, then the full fetch and evaluation.
    pub async fn tick(&mut self) -> Result<TickReport, EngineError> {
        let config = self.engine.config();
        let latest_two = self
            .engine
            .gateway()
            .get_candles(&config.pair(), &config.interval, 2)
            .await?;
        let [previous, latest] = match latest_two.as_slice() {
            [.., previous, latest] => [previous.clone(), latest.clone()],
            _ => return Ok(TickReport::Skipped),
        };

        if !self.engine.should_evaluate(&previous, &latest) {
            return Ok(TickReport::Skipped);
        }
        let Some(_permit) = self.guard.try_acquire() else {
            debug!("Evaluation already in flight, skipping tick");
            return Ok(TickReport::Skipped);
        };

        self.engine.observe(latest.open_time);
        self.engine.refresh_window().await?;
        let transition = self.engine.evaluate().await?;
        Ok(TickReport::Evaluated(transition))
    }

    /// Fault barrier around `tick`. A failure of the retry is fatal.
    pub async fn tick_with_recovery(&mut self) -> Result<TickReport, SupervisorError> {
        let first = match self.tick().await {
            Ok(report) => return Ok(report),
            Err(e) => e,
        };

        let kind = if first.is_transient() {
            "transient"
        } else {
            "exchange"
        };
        error!(
            "Something went wrong in the main loop ({} error), retrying in {:?}: {}",
            kind, self.policy.backoff, first
        );
        if let Err(e) = self.engine.gateway_mut().reconnect().await {
            warn!("Reconnect failed: {}", e);
        }
        tokio::time::sleep(self.policy.backoff).await;

        self.tick()
            .await
            .map_err(|retry| SupervisorError { first, retry })
    }

    /// Polls until `shutdown` resolves. Shutdown is only observed between ticks,
    /// never in the middle of an order sequence.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), SupervisorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "Polling {} every {:?}",
            self.engine.config().pair(),
            self.policy.poll_interval
        );

        loop {
            if let TickReport::Evaluated(transition) = self.tick_with_recovery().await? {
                debug!("Evaluation finished: {:?}", transition);
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, leaving polling loop");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.policy.poll_interval) => {}
            }
        }
    }

    pub async fn run(&mut self) -> Result<(), SupervisorError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}
