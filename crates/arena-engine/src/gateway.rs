//! Subject dispatch: raw bus payload in, encoded reply out.
//!
//! Every request/reply subject answers either with its typed reply record or
//! with an [`ErrorReply`]; no request can take the engine down.
//! `play-card` is fire-and-forget: it never replies, and a refused
//! submission is reported to the player as a `round-result` with
//! `result: error`.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use arena_types::messages::{
    AckReply, BalanceReply, CardsReply, ClientRequest, CreateAccountReply, CredentialsReply,
    EmptyRequest, ErrorReply, JoinBlindTradeRequest, PingRequest, PlayCardRequest, QueuedReply,
    Subject, decode, encode,
};
use arena_types::{ArenaError, Result};

use crate::accounts::AccountService;
use crate::engine::Engine;

const FALLBACK_ERROR: &[u8] = br#"{"err":"AR_ERR_903: Serialization error","code":"SERIALIZATION"}"#;

#[derive(Clone)]
pub struct Gateway {
    engine: Arc<Engine>,
}

impl Gateway {
    #[must_use]
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Handle one inbound message. `None` means no reply is sent.
    pub async fn handle(&self, subject: &str, payload: &[u8]) -> Option<Vec<u8>> {
        let subject = match subject.parse::<Subject>() {
            Ok(s) => s,
            Err(e) => {
                warn!(subject, "unknown subject");
                return Some(error_reply(&e));
            }
        };
        debug!(%subject, bytes = payload.len(), "request received");

        match self.dispatch(subject, payload).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%subject, code = e.code(), kind = %e.kind(), error = %e, "request refused");
                subject.expects_reply().then(|| error_reply(&e))
            }
        }
    }

    async fn dispatch(&self, subject: Subject, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        let engine = &self.engine;
        match subject {
            Subject::CreateAccount => {
                let _: EmptyRequest = decode(subject, payload)?;
                let player_id = engine.accounts().create_account().await?;
                reply(&CreateAccountReply { player_id })
            }
            Subject::Login => {
                let req: ClientRequest = decode(subject, payload)?;
                engine.accounts().login(req.client_id)?;
                reply(&AckReply { result: true })
            }
            Subject::OpenPack => {
                let req: ClientRequest = decode(subject, payload)?;
                let result = engine.accounts().open_pack(req.client_id).await?;
                reply(&CardsReply { result })
            }
            Subject::SeeCards => {
                let req: ClientRequest = decode(subject, payload)?;
                let result = engine.accounts().see_cards(req.client_id).await?;
                reply(&CardsReply { result })
            }
            Subject::FindMatch => {
                let req: ClientRequest = decode(subject, payload)?;
                engine.matches().find_match(req.client_id)?;
                reply(&QueuedReply::queued())
            }
            Subject::PlayCard => {
                let req: PlayCardRequest = decode(subject, payload)?;
                if let Err(e) =
                    engine
                        .battles()
                        .submit_card(req.match_id, req.client_id, req.card_value)
                {
                    engine
                        .battles()
                        .report_rejection(req.client_id, req.match_id, &e);
                }
                Ok(None)
            }
            Subject::JoinBlindTrade => {
                let req: JoinBlindTradeRequest = decode(subject, payload)?;
                engine
                    .trades()
                    .join_and_process(req.client_id, req.card_id)
                    .await?;
                reply(&QueuedReply::queued())
            }
            Subject::GetCredentials => {
                let req: ClientRequest = decode(subject, payload)?;
                let wallet = engine.accounts().credentials(req.client_id)?;
                reply(&CredentialsReply {
                    address: wallet.address,
                    secret: wallet.secret,
                })
            }
            Subject::GetBalance => {
                let req: ClientRequest = decode(subject, payload)?;
                let balance = engine.accounts().balance(req.client_id).await?;
                reply(&BalanceReply { balance })
            }
            Subject::Status => {
                let _: EmptyRequest = decode(subject, payload)?;
                reply(&engine.accounts().status()?)
            }
            Subject::Ping => {
                let req: PingRequest = decode(subject, payload)?;
                reply(&AccountService::ping(req))
            }
        }
    }
}

fn reply<T: Serialize>(value: &T) -> Result<Option<Vec<u8>>> {
    encode(value).map(Some)
}

fn error_reply(err: &ArenaError) -> Vec<u8> {
    encode(&ErrorReply::from(err)).unwrap_or_else(|_| FALLBACK_ERROR.to_vec())
}
