//! Battle resolution and match settlement.
//!
//! Each player submits one card value per match. The submission that fills
//! the second slot resolves the match inside the same critical section and
//! marks it in the [`SettlementGuard`](crate::settlement_guard::SettlementGuard),
//! so resolution and settlement happen exactly once however many triggers
//! race.
//!
//! Both players get their `round-result` as soon as the match resolves,
//! before any ledger traffic. A decisive result is then logged on the
//! ledger by a task on the settlement pool, and when that call returns
//! each player gets a second `round-result` carrying the log's object id
//! as settlement proof (or `msg` if the log failed). A draw never reaches
//! the ledger, so it produces only the first pair.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use arena_ledger::LedgerClient;
use arena_types::notification::RoundResult;
use arena_types::{
    ArenaError, CardEntry, MatchId, MatchPhase, Notification, PlayedCard, PlayerId, Result,
    RoundOutcome, SettlementRef,
};

use crate::notifier::Notifier;
use crate::pool::SettlementPool;
use crate::store::{SessionStore, StoreState};

/// What a card submission did.
#[derive(Debug)]
pub enum Submission {
    /// The card was recorded; the match waits for the other player.
    Recorded(MatchPhase),
    /// The card completed the match and it was resolved.
    Resolved(Resolution),
}

/// A resolved match and its settlement task, if one was started.
#[derive(Debug)]
pub struct Resolution {
    pub match_id: MatchId,
    pub outcome: RoundOutcome,
    /// Handle of the ledger log task. `None` for a draw.
    pub settlement: Option<JoinHandle<()>>,
}

/// Addresses captured under the lock for the off-lock ledger call.
struct Settlement {
    match_id: MatchId,
    outcome: RoundOutcome,
    winner_address: String,
    loser_address: String,
}

pub struct BattleResolver {
    store: Arc<SessionStore>,
    ledger: Arc<dyn LedgerClient>,
    notifier: Notifier,
    pool: SettlementPool,
}

impl BattleResolver {
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        ledger: Arc<dyn LedgerClient>,
        notifier: Notifier,
        pool: SettlementPool,
    ) -> Self {
        Self {
            store,
            ledger,
            notifier,
            pool,
        }
    }

    /// Record `player`'s card of power `value` in `match_id`.
    ///
    /// # Errors
    /// - `MatchNotFound` for an unknown match
    /// - `MatchAlreadyResolved` once the match is resolved
    /// - `PlayerNotInMatch` if the player occupies neither slot
    /// - `CardNotOwned` if the player's cache holds no card of that value
    /// - `AlreadySubmitted` if the player already played in this match
    pub fn submit_card(&self, match_id: MatchId, player: PlayerId, value: u64) -> Result<Submission> {
        let step = self.store.with_state(|s| {
            let m = s.get_match(match_id)?;
            if m.phase() == MatchPhase::Resolved {
                return Err(ArenaError::MatchAlreadyResolved(match_id));
            }
            if !m.involves(player) {
                return Err(ArenaError::PlayerNotInMatch { player, match_id });
            }
            let card = s
                .player(player)?
                .card_with_power(value)
                .ok_or(ArenaError::CardNotOwned { player, value })?;

            let m = s.match_mut(match_id)?;
            let phase = m.submit(
                player,
                PlayedCard {
                    card_id: card.card_id,
                    power: card.power,
                },
            )?;
            if m.is_ready() {
                Self::resolve_locked(s, match_id).map(Some)
            } else {
                debug!(%match_id, player_id = %player, %phase, "card recorded");
                Ok(None)
            }
        })?;

        match step {
            Some(settlement) => Ok(Submission::Resolved(self.dispatch(settlement))),
            None => Ok(Submission::Recorded(MatchPhase::AwaitingSecond)),
        }
    }

    /// Resolve a match directly. A second trigger for the same match is
    /// refused before any ledger call or notification.
    ///
    /// # Errors
    /// - `MatchNotFound` for an unknown match
    /// - `MatchAlreadyResolved` if it was already resolved
    /// - `InvariantViolation` if a slot is still empty
    pub fn resolve(&self, match_id: MatchId) -> Result<Resolution> {
        let settlement = self
            .store
            .with_state(|s| Self::resolve_locked(s, match_id))?;
        Ok(self.dispatch(settlement))
    }

    /// Tell a player their fire-and-forget submission was refused.
    pub fn report_rejection(&self, player: PlayerId, match_id: MatchId, err: &ArenaError) {
        warn!(%match_id, player_id = %player, code = err.code(), "card submission refused");
        self.notifier
            .publish(Notification::RoundResult(RoundResult::error(
                player,
                match_id,
                err.to_string(),
            )));
    }

    /// Decide the outcome and mark the match settled. Caller holds the lock.
    fn resolve_locked(s: &mut StoreState, match_id: MatchId) -> Result<Settlement> {
        if s.settled.is_settled(&match_id) {
            return Err(ArenaError::MatchAlreadyResolved(match_id));
        }
        let (p1, p2) = {
            let m = s.get_match(match_id)?;
            (m.p1, m.p2)
        };
        let address_of = |s: &StoreState, id: PlayerId| s.player(id).map(|p| p.wallet.address.clone());
        let (a1, a2) = (address_of(s, p1)?, address_of(s, p2)?);

        let outcome = s.match_mut(match_id)?.resolve()?;
        s.settled.mark_settled(match_id)?;

        let (winner_address, loser_address) = match outcome.winner() {
            Some(w) if w == p2 => (a2, a1),
            _ => (a1, a2),
        };
        info!(%match_id, winner = ?outcome.winner(), "match resolved");
        Ok(Settlement {
            match_id,
            outcome,
            winner_address,
            loser_address,
        })
    }

    /// Notify both players, then start the ledger log for a decisive result.
    fn dispatch(&self, settlement: Settlement) -> Resolution {
        let match_id = settlement.match_id;
        let outcome = settlement.outcome.clone();
        notify_round(&self.notifier, match_id, &outcome, None, None);

        let RoundOutcome::Decisive {
            winning_card,
            losing_card,
            ..
        } = &settlement.outcome
        else {
            return Resolution {
                match_id,
                outcome,
                settlement: None,
            };
        };

        let (winner_power, loser_power) = (winning_card.power, losing_card.power);
        let ledger = Arc::clone(&self.ledger);
        let notifier = self.notifier.clone();
        let handle = self.pool.spawn("log-match", async move {
            let logged = ledger
                .log_match(
                    &settlement.winner_address,
                    &settlement.loser_address,
                    winner_power,
                    loser_power,
                )
                .await;
            match logged {
                Ok(receipt) => {
                    info!(%match_id, object_id = %receipt.object_id, "match settled on ledger");
                    notify_round(
                        &notifier,
                        match_id,
                        &settlement.outcome,
                        Some(receipt.object_id),
                        None,
                    );
                }
                Err(e) => {
                    warn!(%match_id, error = %e, "match log failed");
                    notify_round(
                        &notifier,
                        match_id,
                        &settlement.outcome,
                        None,
                        Some(format!("settlement failed: {e}")),
                    );
                }
            }
        });

        Resolution {
            match_id,
            outcome,
            settlement: Some(handle),
        }
    }
}

fn notify_round(
    notifier: &Notifier,
    match_id: MatchId,
    outcome: &RoundOutcome,
    settlement_ref: Option<SettlementRef>,
    msg: Option<String>,
) {
    for (client_id, result, own, opponent) in outcome.per_player() {
        notifier.publish(Notification::RoundResult(RoundResult {
            client_id,
            match_id,
            result,
            own_card: Some(CardEntry::new(own.card_id, own.power)),
            opponent_card: Some(CardEntry::new(opponent.card_id, opponent.power)),
            settlement_ref: settlement_ref.clone(),
            msg: msg.clone(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use arena_ledger::InMemoryLedger;
    use arena_types::{CardId, LedgerOp, Match, RoundVerdict, Wallet};
    use tokio::sync::broadcast;

    use super::*;
    use crate::inventory::PackInventory;

    struct Fixture {
        store: Arc<SessionStore>,
        ledger: Arc<InMemoryLedger>,
        resolver: BattleResolver,
        rx: broadcast::Receiver<Notification>,
        match_id: MatchId,
    }

    /// Players 1 and 2 in a fresh match, holding cards of the given powers.
    fn fixture(p1_powers: &[u64], p2_powers: &[u64]) -> Fixture {
        let store = Arc::new(SessionStore::new(PackInventory::generate(3, Some(0)), 8));
        let ledger = Arc::new(InMemoryLedger::new());
        let notifier = Notifier::new(64);
        let rx = notifier.subscribe();
        let match_id = store
            .with_state(|s| {
                for (i, powers) in [p1_powers, p2_powers].into_iter().enumerate() {
                    let id = s.insert_player(Wallet::new(format!("0xp{i}"), "00"));
                    s.player_mut(id)?.record_cards(
                        powers
                            .iter()
                            .map(|&v| CardEntry::new(CardId::new(format!("c{i}-{v}")), v)),
                    );
                }
                let m = Match::new(PlayerId(1), PlayerId(2))?;
                let id = m.id;
                s.insert_match(m);
                Ok(id)
            })
            .unwrap();
        let resolver = BattleResolver::new(
            store.clone(),
            ledger.clone(),
            notifier,
            SettlementPool::new(4),
        );
        Fixture {
            store,
            ledger,
            resolver,
            rx,
            match_id,
        }
    }

    async fn round_results(rx: &mut broadcast::Receiver<Notification>) -> Vec<RoundResult> {
        let mut out = Vec::new();
        for _ in 0..2 {
            let next = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
            match next.expect("round-result in time").unwrap() {
                Notification::RoundResult(r) => out.push(r),
                other => panic!("unexpected {other:?}"),
            }
        }
        out
    }

    #[tokio::test]
    async fn higher_card_wins_and_is_logged() {
        let mut f = fixture(&[7], &[3]);
        assert!(matches!(
            f.resolver.submit_card(f.match_id, PlayerId(1), 7).unwrap(),
            Submission::Recorded(MatchPhase::AwaitingSecond)
        ));
        let Submission::Resolved(res) = f.resolver.submit_card(f.match_id, PlayerId(2), 3).unwrap()
        else {
            panic!("second submission should resolve");
        };
        assert_eq!(res.outcome.winner(), Some(PlayerId(1)));
        res.settlement.unwrap().await.unwrap();

        assert_eq!(f.ledger.call_count(LedgerOp::LogMatch), 1);
        let first = round_results(&mut f.rx).await;
        assert!(first.iter().all(|r| r.settlement_ref.is_none() && r.msg.is_none()));
        let results = round_results(&mut f.rx).await;
        let winner = results.iter().find(|r| r.client_id == PlayerId(1)).unwrap();
        let loser = results.iter().find(|r| r.client_id == PlayerId(2)).unwrap();
        assert_eq!(winner.result, RoundVerdict::Win);
        assert_eq!(loser.result, RoundVerdict::Lose);
        assert_eq!(winner.opponent_card.as_ref().unwrap().power, 3);
        let reference = winner.settlement_ref.clone().unwrap();
        assert_eq!(loser.settlement_ref.as_ref(), Some(&reference));
        assert_eq!(
            f.ledger.match_log(&reference),
            Some(("0xp0".into(), "0xp1".into(), 7, 3))
        );
    }

    #[tokio::test]
    async fn draw_issues_no_ledger_call() {
        let mut f = fixture(&[5], &[5]);
        f.resolver.submit_card(f.match_id, PlayerId(2), 5).unwrap();
        let Submission::Resolved(res) = f.resolver.submit_card(f.match_id, PlayerId(1), 5).unwrap()
        else {
            panic!("second submission should resolve");
        };
        assert!(res.outcome.is_draw());
        assert!(res.settlement.is_none());

        let results = round_results(&mut f.rx).await;
        assert!(results.iter().all(|r| r.result == RoundVerdict::Draw));
        assert!(results.iter().all(|r| r.settlement_ref.is_none()));
        assert!(f.rx.try_recv().is_err());
        assert_eq!(f.ledger.call_count(LedgerOp::LogMatch), 0);
    }

    #[tokio::test]
    async fn players_hear_result_before_ledger_log_returns() {
        let mut f = fixture(&[7], &[3]);
        f.ledger.set_delay(LedgerOp::LogMatch, Duration::from_millis(800));
        f.resolver.submit_card(f.match_id, PlayerId(1), 7).unwrap();
        let Submission::Resolved(res) = f.resolver.submit_card(f.match_id, PlayerId(2), 3).unwrap()
        else {
            panic!("second submission should resolve");
        };

        let early = round_results(&mut f.rx).await;
        let verdicts: Vec<_> = [PlayerId(1), PlayerId(2)]
            .iter()
            .map(|p| early.iter().find(|r| r.client_id == *p).unwrap().result)
            .collect();
        assert_eq!(verdicts, vec![RoundVerdict::Win, RoundVerdict::Lose]);
        assert!(early.iter().all(|r| r.settlement_ref.is_none()));
        assert_eq!(f.ledger.match_log_count(), 0, "log still in flight");

        res.settlement.unwrap().await.unwrap();
        let settled = round_results(&mut f.rx).await;
        let reference = settled[0].settlement_ref.clone().unwrap();
        assert_eq!(settled[1].settlement_ref.as_ref(), Some(&reference));
        assert_eq!(f.ledger.match_log_count(), 1);
    }

    #[tokio::test]
    async fn resolving_twice_settles_once() {
        let mut f = fixture(&[9], &[1]);
        f.resolver.submit_card(f.match_id, PlayerId(1), 9).unwrap();
        let Submission::Resolved(res) = f.resolver.submit_card(f.match_id, PlayerId(2), 1).unwrap()
        else {
            panic!("second submission should resolve");
        };
        res.settlement.unwrap().await.unwrap();

        let err = f.resolver.resolve(f.match_id).unwrap_err();
        assert!(matches!(err, ArenaError::MatchAlreadyResolved(_)));
        let err = f.resolver.submit_card(f.match_id, PlayerId(2), 1).unwrap_err();
        assert!(matches!(err, ArenaError::MatchAlreadyResolved(_)));

        round_results(&mut f.rx).await;
        round_results(&mut f.rx).await;
        assert!(f.rx.try_recv().is_err());
        assert_eq!(f.ledger.call_count(LedgerOp::LogMatch), 1);
    }

    #[test]
    fn submission_errors() {
        let f = fixture(&[4], &[6]);
        assert!(matches!(
            f.resolver.submit_card(MatchId::new(), PlayerId(1), 4).unwrap_err(),
            ArenaError::MatchNotFound(_)
        ));
        assert!(matches!(
            f.resolver.submit_card(f.match_id, PlayerId(9), 4).unwrap_err(),
            ArenaError::PlayerNotInMatch { .. }
        ));
        assert!(matches!(
            f.resolver.submit_card(f.match_id, PlayerId(1), 6).unwrap_err(),
            ArenaError::CardNotOwned { value: 6, .. }
        ));
        f.resolver.submit_card(f.match_id, PlayerId(1), 4).unwrap();
        assert!(matches!(
            f.resolver.submit_card(f.match_id, PlayerId(1), 4).unwrap_err(),
            ArenaError::AlreadySubmitted { .. }
        ));
        assert!(matches!(
            f.resolver.resolve(f.match_id).unwrap_err(),
            ArenaError::InvariantViolation { .. }
        ));
        let open = f.store.stats().unwrap().open_matches;
        assert_eq!(open, 1);
    }

    #[tokio::test]
    async fn failed_log_still_notifies_without_reference() {
        let mut f = fixture(&[2], &[8]);
        f.ledger.fail_op(LedgerOp::LogMatch, "gas exhausted");
        f.resolver.submit_card(f.match_id, PlayerId(1), 2).unwrap();
        let Submission::Resolved(res) = f.resolver.submit_card(f.match_id, PlayerId(2), 8).unwrap()
        else {
            panic!("second submission should resolve");
        };
        res.settlement.unwrap().await.unwrap();

        round_results(&mut f.rx).await;
        let results = round_results(&mut f.rx).await;
        for r in &results {
            assert!(r.settlement_ref.is_none());
            assert!(r.msg.as_deref().unwrap().contains("gas exhausted"));
        }
        let winner = results.iter().find(|r| r.client_id == PlayerId(2)).unwrap();
        assert_eq!(winner.result, RoundVerdict::Win);
    }

    #[tokio::test]
    async fn rejection_reported_as_round_error() {
        let mut f = fixture(&[1], &[2]);
        let err = f
            .resolver
            .submit_card(f.match_id, PlayerId(1), 99)
            .unwrap_err();
        f.resolver.report_rejection(PlayerId(1), f.match_id, &err);
        match f.rx.recv().await.unwrap() {
            Notification::RoundResult(r) => {
                assert_eq!(r.result, RoundVerdict::Error);
                assert!(r.msg.unwrap().contains("AR_ERR_202"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
