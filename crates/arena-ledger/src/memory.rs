//! In-memory ledger backend.
//!
//! Wallets are ed25519 keypairs: the address is the hex SHA-256 of the public
//! key and the secret is the hex-encoded signing key. Every state-changing
//! call re-derives the address from the presented secret, so a wallet whose
//! secret does not match its address is refused.
//!
//! With the `test-helpers` feature the backend also counts calls per
//! operation and supports failure and latency injection.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use arena_types::constants::DEFAULT_STARTING_BALANCE;
use arena_types::{CardEntry, CardId, LedgerError, LedgerOp, SettlementRef, Wallet};

use crate::client::{LedgerClient, LedgerResult, MatchLogReceipt, MintReceipt, TxReceipt};

#[derive(Debug)]
struct CardRecord {
    owner: String,
    power: u64,
}

#[derive(Debug)]
struct MatchLogRecord {
    winner: String,
    loser: String,
    winner_power: u64,
    loser_power: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<String, u64>,
    cards: HashMap<CardId, CardRecord>,
    match_logs: HashMap<SettlementRef, MatchLogRecord>,
    sequence: u64,
}

impl LedgerState {
    /// Digest over a monotonically increasing sequence and the operation body.
    fn next_digest(&mut self, body: &str) -> String {
        self.sequence += 1;
        let mut hasher = Sha256::new();
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn owner_is(&self, card_id: &CardId, address: &str) -> bool {
        self.cards
            .get(card_id)
            .is_some_and(|record| record.owner == address)
    }
}

#[derive(Debug)]
struct Failure {
    reason: String,
    /// Calls numbered above this one fail.
    after_call: usize,
}

#[derive(Debug, Default)]
struct Hooks {
    calls: HashMap<LedgerOp, usize>,
    failures: HashMap<LedgerOp, Failure>,
    delays: HashMap<LedgerOp, Duration>,
}

/// Self-contained [`LedgerClient`] backend.
#[derive(Debug)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    hooks: Mutex<Hooks>,
    starting_balance: u64,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::with_starting_balance(DEFAULT_STARTING_BALANCE)
    }

    /// Every wallet created by this backend starts with `amount` coin.
    #[must_use]
    pub fn with_starting_balance(amount: u64) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            hooks: Mutex::new(Hooks::default()),
            starting_balance: amount,
        }
    }

    #[must_use]
    pub fn starting_balance(&self) -> u64 {
        self.starting_balance
    }

    fn state(&self, op: LedgerOp) -> LedgerResult<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|_| LedgerError::Unavailable {
            op,
            reason: "ledger state lock poisoned".to_string(),
        })
    }

    /// Count the call, apply injected latency, then any injected failure.
    async fn enter(&self, op: LedgerOp) -> LedgerResult<()> {
        let (delay, failure) = {
            let mut hooks = self.hooks.lock().map_err(|_| LedgerError::Unavailable {
                op,
                reason: "ledger hooks lock poisoned".to_string(),
            })?;
            let call = hooks.calls.entry(op).or_default();
            *call += 1;
            let call = *call;
            let failure = hooks
                .failures
                .get(&op)
                .filter(|f| call > f.after_call)
                .map(|f| f.reason.clone());
            (hooks.delays.get(&op).copied(), failure)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(reason) => Err(LedgerError::Rejected { op, reason }),
            None => Ok(()),
        }
    }

    /// Check that `wallet.secret` is the signing key behind `wallet.address`.
    fn authorize(op: LedgerOp, wallet: &Wallet) -> LedgerResult<()> {
        let rejected = |reason: String| LedgerError::Rejected { op, reason };
        let raw = hex::decode(&wallet.secret)
            .map_err(|_| rejected(format!("malformed secret for {}", wallet.address)))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| rejected(format!("malformed secret for {}", wallet.address)))?;
        let derived = address_of(&SigningKey::from_bytes(&bytes));
        if derived == wallet.address {
            Ok(())
        } else {
            Err(rejected(format!("signature check failed for {}", wallet.address)))
        }
    }
}

fn address_of(key: &SigningKey) -> String {
    let hash = Sha256::digest(key.verifying_key().as_bytes());
    format!("0x{}", hex::encode(hash))
}

fn unknown_wallet(op: LedgerOp, address: &str) -> LedgerError {
    LedgerError::Rejected {
        op,
        reason: format!("unknown wallet {address}"),
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn create_wallet(&self) -> LedgerResult<Wallet> {
        let op = LedgerOp::CreateWallet;
        self.enter(op).await?;

        let signing = SigningKey::generate(&mut OsRng);
        let wallet = Wallet::new(address_of(&signing), hex::encode(signing.to_bytes()));

        let mut state = self.state(op)?;
        state
            .balances
            .insert(wallet.address.clone(), self.starting_balance);
        info!(address = %wallet.address, grant = self.starting_balance, "wallet created");
        Ok(wallet)
    }

    async fn balance(&self, address: &str) -> LedgerResult<u64> {
        let op = LedgerOp::Balance;
        self.enter(op).await?;
        let state = self.state(op)?;
        state
            .balances
            .get(address)
            .copied()
            .ok_or_else(|| unknown_wallet(op, address))
    }

    async fn charge(
        &self,
        from: &Wallet,
        to_address: &str,
        amount: u64,
    ) -> LedgerResult<TxReceipt> {
        let op = LedgerOp::Charge;
        self.enter(op).await?;
        Self::authorize(op, from)?;

        let mut state = self.state(op)?;
        let available = state
            .balances
            .get(&from.address)
            .copied()
            .ok_or_else(|| unknown_wallet(op, &from.address))?;
        if available < amount {
            return Err(LedgerError::Rejected {
                op,
                reason: format!("insufficient funds: have {available}, need {amount}"),
            });
        }
        state
            .balances
            .insert(from.address.clone(), available - amount);
        *state.balances.entry(to_address.to_string()).or_default() += amount;
        let digest = state.next_digest(&format!("charge:{}:{to_address}:{amount}", from.address));
        debug!(from = %from.address, to = to_address, amount, "coin charged");
        Ok(TxReceipt { digest })
    }

    async fn mint_card(&self, owner_address: &str, power: u64) -> LedgerResult<MintReceipt> {
        let op = LedgerOp::MintCard;
        self.enter(op).await?;

        let mut state = self.state(op)?;
        if !state.balances.contains_key(owner_address) {
            return Err(unknown_wallet(op, owner_address));
        }
        let card_id = CardId::new(format!("0x{}", Uuid::new_v4().simple()));
        state.cards.insert(
            card_id.clone(),
            CardRecord {
                owner: owner_address.to_string(),
                power,
            },
        );
        let digest = state.next_digest(&format!("mint:{owner_address}:{card_id}:{power}"));
        debug!(owner = owner_address, card = %card_id.short(), power, "card minted");
        Ok(MintReceipt {
            card: CardEntry::new(card_id, power),
            digest,
        })
    }

    async fn transfer_card(
        &self,
        from: &Wallet,
        to_address: &str,
        card_id: &CardId,
    ) -> LedgerResult<TxReceipt> {
        let op = LedgerOp::TransferCard;
        self.enter(op).await?;
        Self::authorize(op, from)?;

        let mut state = self.state(op)?;
        if !state.owner_is(card_id, &from.address) {
            return Err(LedgerError::Rejected {
                op,
                reason: format!("{} does not own {card_id}", from.address),
            });
        }
        if let Some(record) = state.cards.get_mut(card_id) {
            record.owner = to_address.to_string();
        }
        let digest = state.next_digest(&format!("transfer:{}:{to_address}:{card_id}", from.address));
        Ok(TxReceipt { digest })
    }

    async fn list_cards(&self, address: &str) -> LedgerResult<Vec<CardEntry>> {
        let op = LedgerOp::ListCards;
        self.enter(op).await?;
        let state = self.state(op)?;
        let mut cards: Vec<CardEntry> = state
            .cards
            .iter()
            .filter(|(_, record)| record.owner == address)
            .map(|(id, record)| CardEntry::new(id.clone(), record.power))
            .collect();
        cards.sort_by(|a, b| a.card_id.cmp(&b.card_id));
        Ok(cards)
    }

    async fn validate_ownership(&self, address: &str, card_id: &CardId) -> LedgerResult<bool> {
        let op = LedgerOp::ValidateOwnership;
        self.enter(op).await?;
        Ok(self.state(op)?.owner_is(card_id, address))
    }

    async fn atomic_swap(
        &self,
        a: &Wallet,
        card_a: &CardId,
        b: &Wallet,
        card_b: &CardId,
    ) -> LedgerResult<TxReceipt> {
        let op = LedgerOp::AtomicSwap;
        self.enter(op).await?;
        Self::authorize(op, a)?;
        Self::authorize(op, b)?;
        if a.address == b.address {
            return Err(LedgerError::Rejected {
                op,
                reason: "cannot swap with self".to_string(),
            });
        }

        let mut state = self.state(op)?;
        for (wallet, card) in [(a, card_a), (b, card_b)] {
            if !state.owner_is(card, &wallet.address) {
                return Err(LedgerError::Rejected {
                    op,
                    reason: format!("{} does not own {card}", wallet.address),
                });
            }
        }
        if let Some(record) = state.cards.get_mut(card_a) {
            record.owner.clone_from(&b.address);
        }
        if let Some(record) = state.cards.get_mut(card_b) {
            record.owner.clone_from(&a.address);
        }
        let digest = state.next_digest(&format!("swap:{card_a}:{card_b}"));
        info!(card_a = %card_a.short(), card_b = %card_b.short(), "atomic swap settled");
        Ok(TxReceipt { digest })
    }

    async fn log_match(
        &self,
        winner_address: &str,
        loser_address: &str,
        winner_power: u64,
        loser_power: u64,
    ) -> LedgerResult<MatchLogReceipt> {
        let op = LedgerOp::LogMatch;
        self.enter(op).await?;

        let mut state = self.state(op)?;
        let object_id = SettlementRef(format!("0x{}", Uuid::new_v4().simple()));
        let digest = state.next_digest(&format!(
            "match:{winner_address}:{loser_address}:{winner_power}:{loser_power}"
        ));
        state.match_logs.insert(
            object_id.clone(),
            MatchLogRecord {
                winner: winner_address.to_string(),
                loser: loser_address.to_string(),
                winner_power,
                loser_power,
            },
        );
        info!(
            object_id = %object_id,
            winner = winner_address,
            winner_power,
            loser_power,
            "match logged"
        );
        Ok(MatchLogReceipt { digest, object_id })
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-helpers"))]
impl InMemoryLedger {
    /// How many times `op` has been called, including failed calls.
    pub fn call_count(&self, op: LedgerOp) -> usize {
        self.hooks
            .lock()
            .map(|h| h.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Make every subsequent `op` call fail with `Rejected { reason }`.
    pub fn fail_op(&self, op: LedgerOp, reason: &str) {
        self.fail_after(op, 0, reason);
    }

    /// Let the next `successes` calls of `op` through, then fail the rest.
    pub fn fail_after(&self, op: LedgerOp, successes: usize, reason: &str) {
        if let Ok(mut hooks) = self.hooks.lock() {
            let after_call = hooks.calls.get(&op).copied().unwrap_or(0) + successes;
            hooks.failures.insert(
                op,
                Failure {
                    reason: reason.to_string(),
                    after_call,
                },
            );
        }
    }

    pub fn clear_failure(&self, op: LedgerOp) {
        if let Ok(mut hooks) = self.hooks.lock() {
            hooks.failures.remove(&op);
        }
    }

    /// Delay every subsequent `op` call by `delay` before it runs.
    pub fn set_delay(&self, op: LedgerOp, delay: Duration) {
        if let Ok(mut hooks) = self.hooks.lock() {
            hooks.delays.insert(op, delay);
        }
    }

    /// Current owner of a card, bypassing hooks.
    pub fn owner_of(&self, card_id: &CardId) -> Option<String> {
        self.state
            .lock()
            .ok()?
            .cards
            .get(card_id)
            .map(|r| r.owner.clone())
    }

    /// `(winner, loser, winner_power, loser_power)` of a logged match.
    pub fn match_log(&self, object_id: &SettlementRef) -> Option<(String, String, u64, u64)> {
        self.state.lock().ok()?.match_logs.get(object_id).map(|r| {
            (
                r.winner.clone(),
                r.loser.clone(),
                r.winner_power,
                r.loser_power,
            )
        })
    }

    pub fn match_log_count(&self) -> usize {
        self.state.lock().map(|s| s.match_logs.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wallet_address_derives_from_key() {
        let ledger = InMemoryLedger::new();
        let wallet = ledger.create_wallet().await.unwrap();
        assert!(wallet.address.starts_with("0x"));
        assert_eq!(wallet.address.len(), 2 + 64);
        assert!(InMemoryLedger::authorize(LedgerOp::Charge, &wallet).is_ok());
    }

    #[tokio::test]
    async fn charge_moves_coin() {
        let ledger = InMemoryLedger::with_starting_balance(1_500);
        let wallet = ledger.create_wallet().await.unwrap();
        ledger.charge(&wallet, "shop", 1_000).await.unwrap();
        assert_eq!(ledger.balance(&wallet.address).await.unwrap(), 500);
        assert_eq!(ledger.balance("shop").await.unwrap(), 1_000);

        let err = ledger.charge(&wallet, "shop", 1_000).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { op: LedgerOp::Charge, .. }));
    }

    #[tokio::test]
    async fn forged_secret_refused() {
        let ledger = InMemoryLedger::new();
        let real = ledger.create_wallet().await.unwrap();
        let other = ledger.create_wallet().await.unwrap();
        let forged = Wallet::new(real.address.clone(), other.secret);
        let err = ledger.charge(&forged, "shop", 1).await.unwrap_err();
        assert!(err.to_string().contains("signature check failed"));
    }

    #[tokio::test]
    async fn mint_then_list_and_validate() {
        let ledger = InMemoryLedger::new();
        let wallet = ledger.create_wallet().await.unwrap();
        let minted = ledger.mint_card(&wallet.address, 42).await.unwrap();

        let cards = ledger.list_cards(&wallet.address).await.unwrap();
        assert_eq!(cards, vec![minted.card.clone()]);
        assert!(
            ledger
                .validate_ownership(&wallet.address, &minted.card.card_id)
                .await
                .unwrap()
        );
        assert!(
            !ledger
                .validate_ownership("0xsomeone", &minted.card.card_id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn swap_exchanges_owners() {
        let ledger = InMemoryLedger::new();
        let a = ledger.create_wallet().await.unwrap();
        let b = ledger.create_wallet().await.unwrap();
        let ca = ledger.mint_card(&a.address, 1).await.unwrap().card.card_id;
        let cb = ledger.mint_card(&b.address, 2).await.unwrap().card.card_id;

        ledger.atomic_swap(&a, &ca, &b, &cb).await.unwrap();
        assert_eq!(ledger.owner_of(&ca), Some(b.address.clone()));
        assert_eq!(ledger.owner_of(&cb), Some(a.address.clone()));
    }

    #[tokio::test]
    async fn swap_moves_nothing_when_one_side_is_not_owner() {
        let ledger = InMemoryLedger::new();
        let a = ledger.create_wallet().await.unwrap();
        let b = ledger.create_wallet().await.unwrap();
        let ca = ledger.mint_card(&a.address, 1).await.unwrap().card.card_id;
        let cb = ledger.mint_card(&a.address, 2).await.unwrap().card.card_id;

        let err = ledger.atomic_swap(&a, &ca, &b, &cb).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { .. }));
        assert_eq!(ledger.owner_of(&ca), Some(a.address.clone()));
        assert_eq!(ledger.owner_of(&cb), Some(a.address));
    }

    #[tokio::test]
    async fn injected_failure_is_counted() {
        let ledger = InMemoryLedger::new();
        ledger.fail_op(LedgerOp::LogMatch, "chain halted");
        let err = ledger.log_match("0xa", "0xb", 9, 1).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::Rejected {
                op: LedgerOp::LogMatch,
                reason: "chain halted".into()
            }
        );
        assert_eq!(ledger.call_count(LedgerOp::LogMatch), 1);
        assert_eq!(ledger.match_log_count(), 0);

        ledger.clear_failure(LedgerOp::LogMatch);
        let receipt = ledger.log_match("0xa", "0xb", 9, 1).await.unwrap();
        assert_eq!(
            ledger.match_log(&receipt.object_id),
            Some(("0xa".into(), "0xb".into(), 9, 1))
        );
    }

    #[tokio::test]
    async fn failure_can_start_after_some_calls() {
        let ledger = InMemoryLedger::new();
        ledger.log_match("0xa", "0xb", 2, 1).await.unwrap();
        ledger.fail_after(LedgerOp::LogMatch, 2, "quota");
        ledger.log_match("0xa", "0xb", 3, 1).await.unwrap();
        ledger.log_match("0xa", "0xb", 4, 1).await.unwrap();
        let err = ledger.log_match("0xa", "0xb", 5, 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { reason, .. } if reason == "quota"));
        assert_eq!(ledger.match_log_count(), 3);
        assert_eq!(ledger.call_count(LedgerOp::LogMatch), 4);
    }
}
