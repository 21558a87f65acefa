//! Settlement poller
//!
//! Asynchronous rails (mobile-money push charges) settle out-of-band, so
//! the caller polls payment status at a fixed interval for a bounded
//! number of attempts. The budget is explicit: once exhausted the poller
//! stops issuing queries and reports a timeout, which is distinct from a
//! failure - the payment may still settle later and is reconciled
//! out-of-band.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use core_kernel::{PaymentId, PortError};

use crate::payment::PaymentStatus;

/// Polling schedule
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status queries
    pub interval: Duration,
    /// Maximum number of status queries before giving up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 30,
        }
    }
}

/// Terminal result of a polling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The payment settled successfully
    Completed { attempts: u32 },
    /// The provider reported the payment failed
    Failed { attempts: u32 },
    /// The attempt budget ran out without a terminal state
    TimedOut { attempts: u32 },
}

/// Source of payment settlement state
///
/// Implemented by `PaymentService` (verify-and-refresh against the
/// provider) and by scripted doubles in tests.
#[async_trait]
pub trait PaymentStatusSource: Send + Sync {
    async fn payment_status(&self, id: PaymentId) -> Result<PaymentStatus, PortError>;
}

/// Polls a status source until a terminal state or budget exhaustion
pub struct SettlementPoller {
    source: Arc<dyn PaymentStatusSource>,
    config: PollConfig,
}

impl SettlementPoller {
    /// Creates a poller over the given status source
    pub fn new(source: Arc<dyn PaymentStatusSource>, config: PollConfig) -> Self {
        Self { source, config }
    }

    /// Runs the polling loop for one payment
    ///
    /// `Pending` states and transient query errors both consume an
    /// attempt and continue; only `Completed`, `Failed`, or an exhausted
    /// budget end the loop.
    pub async fn poll_until_settled(&self, payment_id: PaymentId) -> PollOutcome {
        let max = self.config.max_attempts;

        for attempt in 1..=max {
            match self.source.payment_status(payment_id).await {
                Ok(PaymentStatus::Completed) => {
                    debug!(%payment_id, attempt, "payment settled while polling");
                    return PollOutcome::Completed { attempts: attempt };
                }
                Ok(PaymentStatus::Failed) => {
                    debug!(%payment_id, attempt, "payment failed while polling");
                    return PollOutcome::Failed { attempts: attempt };
                }
                Ok(status) => {
                    debug!(%payment_id, attempt, %status, "payment not settled yet");
                }
                Err(e) => {
                    // Transient or not, a query error never ends the loop
                    // early; the budget is the only stop condition.
                    warn!(%payment_id, attempt, error = %e, "status query failed, continuing");
                }
            }

            if attempt < max {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        warn!(%payment_id, attempts = max, "settlement polling budget exhausted");
        PollOutcome::TimedOut { attempts: max }
    }
}
