//! Waiting for transaction inclusion

use crate::node::EthereumNode;
use crate::types::H256;
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Polls the node until a transaction is confirmed
pub struct TxWatcher<'a> {
    node: &'a dyn EthereumNode,
    poll: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<'a> TxWatcher<'a> {
    pub fn new(node: &'a dyn EthereumNode, poll: Duration) -> Self {
        Self {
            node,
            poll,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Give up with [`Error::Timeout`] after `timeout`; `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stop with [`Error::Cancelled`] once `token` fires
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn wait(&self, tx: H256) -> Result<()> {
        let started = Instant::now();
        let mut ticker = interval(self.poll.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(Error::cancelled(format!("waiting for {}", tx)));
                }
                _ = ticker.tick() => {}
            }

            match self.node.is_confirmed(tx).await {
                Ok(true) => {
                    debug!(%tx, elapsed = ?started.elapsed(), "Transaction confirmed");
                    return Ok(());
                }
                Ok(false) => debug!(%tx, "Transaction not yet confirmed"),
                Err(e) if e.is_retryable() => warn!(%tx, "Confirmation check failed: {}", e),
                Err(e) => return Err(e),
            }

            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    return Err(Error::timeout(format!("confirmation of {}", tx)));
                }
            }
        }
    }
}
