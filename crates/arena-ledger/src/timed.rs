//! Deadline enforcement for ledger calls.
//!
//! [`TimedLedger`] wraps any [`LedgerClient`] and turns a call that outlives
//! its deadline into [`LedgerError::Timeout`]. The inner future is dropped on
//! timeout; a late reply is discarded.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use arena_types::{CardEntry, CardId, LedgerError, LedgerOp, LedgerTimeouts, Wallet};

use crate::client::{LedgerClient, LedgerResult, MatchLogReceipt, MintReceipt, TxReceipt};

/// A [`LedgerClient`] with per-operation deadlines.
#[derive(Clone)]
pub struct TimedLedger {
    inner: Arc<dyn LedgerClient>,
    timeouts: LedgerTimeouts,
}

impl TimedLedger {
    #[must_use]
    pub fn new(inner: Arc<dyn LedgerClient>, timeouts: LedgerTimeouts) -> Self {
        Self { inner, timeouts }
    }

    async fn bounded<T>(
        &self,
        op: LedgerOp,
        call: impl Future<Output = LedgerResult<T>> + Send,
    ) -> LedgerResult<T> {
        let deadline = self.timeouts.for_op(op);
        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                let after_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(backend = self.inner.name(), %op, after_ms, "ledger call timed out");
                Err(LedgerError::Timeout { op, after_ms })
            }
        }
    }
}

#[async_trait]
impl LedgerClient for TimedLedger {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn create_wallet(&self) -> LedgerResult<Wallet> {
        self.bounded(LedgerOp::CreateWallet, self.inner.create_wallet())
            .await
    }

    async fn balance(&self, address: &str) -> LedgerResult<u64> {
        self.bounded(LedgerOp::Balance, self.inner.balance(address))
            .await
    }

    async fn charge(
        &self,
        from: &Wallet,
        to_address: &str,
        amount: u64,
    ) -> LedgerResult<TxReceipt> {
        self.bounded(LedgerOp::Charge, self.inner.charge(from, to_address, amount))
            .await
    }

    async fn mint_card(&self, owner_address: &str, power: u64) -> LedgerResult<MintReceipt> {
        self.bounded(LedgerOp::MintCard, self.inner.mint_card(owner_address, power))
            .await
    }

    async fn transfer_card(
        &self,
        from: &Wallet,
        to_address: &str,
        card_id: &CardId,
    ) -> LedgerResult<TxReceipt> {
        self.bounded(
            LedgerOp::TransferCard,
            self.inner.transfer_card(from, to_address, card_id),
        )
        .await
    }

    async fn list_cards(&self, address: &str) -> LedgerResult<Vec<CardEntry>> {
        self.bounded(LedgerOp::ListCards, self.inner.list_cards(address))
            .await
    }

    async fn validate_ownership(&self, address: &str, card_id: &CardId) -> LedgerResult<bool> {
        self.bounded(
            LedgerOp::ValidateOwnership,
            self.inner.validate_ownership(address, card_id),
        )
        .await
    }

    async fn atomic_swap(
        &self,
        a: &Wallet,
        card_a: &CardId,
        b: &Wallet,
        card_b: &CardId,
    ) -> LedgerResult<TxReceipt> {
        self.bounded(
            LedgerOp::AtomicSwap,
            self.inner.atomic_swap(a, card_a, b, card_b),
        )
        .await
    }

    async fn log_match(
        &self,
        winner_address: &str,
        loser_address: &str,
        winner_power: u64,
        loser_power: u64,
    ) -> LedgerResult<MatchLogReceipt> {
        self.bounded(
            LedgerOp::LogMatch,
            self.inner
                .log_match(winner_address, loser_address, winner_power, loser_power),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::InMemoryLedger;

    #[tokio::test]
    async fn slow_call_becomes_timeout() {
        let backend = Arc::new(InMemoryLedger::new());
        backend.set_delay(LedgerOp::Balance, Duration::from_millis(200));
        let ledger = TimedLedger::new(backend.clone(), LedgerTimeouts::uniform(20));

        let err = ledger.balance("0xnobody").await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::Timeout {
                op: LedgerOp::Balance,
                after_ms: 20
            }
        );
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let backend = Arc::new(InMemoryLedger::new());
        let ledger = TimedLedger::new(backend.clone(), LedgerTimeouts::uniform(1_000));

        let wallet = ledger.create_wallet().await.unwrap();
        let balance = ledger.balance(&wallet.address).await.unwrap();
        assert_eq!(balance, backend.starting_balance());
        assert_eq!(backend.call_count(LedgerOp::Balance), 1);
    }
}
