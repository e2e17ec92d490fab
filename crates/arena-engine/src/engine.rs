//! Engine assembly: one store, one notifier, one settlement pool, shared by
//! every coordinator.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use arena_ledger::{LedgerClient, TimedLedger};
use arena_types::{EngineConfig, Notification, Result};

use crate::accounts::AccountService;
use crate::battle::BattleResolver;
use crate::blind_trade::BlindTradeCoordinator;
use crate::matchmaking::MatchCoordinator;
use crate::notifier::Notifier;
use crate::pool::SettlementPool;
use crate::store::SessionStore;

pub struct Engine {
    config: EngineConfig,
    store: Arc<SessionStore>,
    notifier: Notifier,
    pool: SettlementPool,
    accounts: AccountService,
    matches: MatchCoordinator,
    battles: BattleResolver,
    trades: BlindTradeCoordinator,
}

impl Engine {
    /// Build an engine over `backend`. Every ledger call is bounded by the
    /// configured timeouts.
    ///
    /// # Errors
    /// `Configuration` if `config` does not validate.
    pub fn new(config: EngineConfig, backend: Arc<dyn LedgerClient>) -> Result<Self> {
        config.validate()?;

        let ledger: Arc<dyn LedgerClient> =
            Arc::new(TimedLedger::new(backend, config.ledger_timeouts));
        let store = Arc::new(SessionStore::from_config(&config));
        let notifier = Notifier::new(config.notification_capacity);
        let pool = SettlementPool::new(config.max_inflight_settlements);

        let accounts = AccountService::new(store.clone(), ledger.clone(), &config);
        let matches = MatchCoordinator::new(store.clone(), notifier.clone());
        let battles =
            BattleResolver::new(store.clone(), ledger.clone(), notifier.clone(), pool.clone());
        let trades = BlindTradeCoordinator::new(store.clone(), ledger.clone(), notifier.clone(), pool.clone());

        info!(
            backend = ledger.name(),
            packs = store.stats()?.packs_left,
            max_inflight_settlements = pool.capacity(),
            "engine ready"
        );
        Ok(Self {
            config,
            store,
            notifier,
            pool,
            accounts,
            matches,
            battles,
            trades,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    #[must_use]
    pub fn pool(&self) -> &SettlementPool {
        &self.pool
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    #[must_use]
    pub fn matches(&self) -> &MatchCoordinator {
        &self.matches
    }

    #[must_use]
    pub fn battles(&self) -> &BattleResolver {
        &self.battles
    }

    #[must_use]
    pub fn trades(&self) -> &BlindTradeCoordinator {
        &self.trades
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }
}
