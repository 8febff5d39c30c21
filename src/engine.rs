//! Misra's ping-pong token state machine.
//!
//! A node keeps the last PING and PONG values it has seen together with the
//! last value it wrote to the next node. A token that comes back carrying the
//! value this node last sent has gone around the whole ring without meeting its
//! companion, so the companion is presumed lost and the pair is regenerated.

use crate::{
    config::Timings,
    link::Outbound,
    log,
    message::TokenKind,
    sync::{CriticalSectionState, Occupancy, Token},
    RingError,
};
use color_print::cformat;
use futures::SinkExt;
use std::sync::Arc;
use tokio::{task::JoinHandle, time::sleep};

pub const SEED_PING: i64 = 1;
pub const SEED_PONG: i64 = -1;

#[derive(Debug)]
pub struct Engine {
    last_sent: Token,
    ping: Token,
    pong: Token,
    state: CriticalSectionState,
    timings: Timings,
}

impl Engine {
    pub fn new(timings: Timings) -> Self {
        Self {
            last_sent: Token::new(0),
            ping: Token::new(SEED_PING),
            pong: Token::new(SEED_PONG),
            state: CriticalSectionState::new(),
            timings,
        }
    }

    pub fn ping(&self) -> &Token {
        &self.ping
    }

    pub fn pong(&self) -> &Token {
        &self.pong
    }

    pub fn state(&self) -> &CriticalSectionState {
        &self.state
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Value most recently written to the next node, `0` before the first send.
    pub async fn last_sent(&self) -> i64 {
        self.last_sent.get().await
    }

    fn token(&self, kind: TokenKind) -> &Token {
        match kind {
            TokenKind::Ping => &self.ping,
            TokenKind::Pong => &self.pong,
        }
    }

    async fn regenerate(&self, x: i64) {
        self.ping.set(x).await;
        self.pong.set(x.saturating_neg()).await;
    }

    async fn incarnate(&self, x: i64) {
        let next = x.saturating_add(1);
        self.ping.set(next).await;
        self.pong.set(next.saturating_neg()).await;
    }

    /// Writes the current value of `kind` to the next node and records it as the last sent value.
    ///
    /// The outbound lock is held across the write and the record, so two sends
    /// never interleave their frames and `last_sent` always matches the wire.
    pub async fn send_token(&self, kind: TokenKind, outbound: &Outbound) -> Result<i64, RingError> {
        let mut sink = outbound.lock().await;
        let value = self.token(kind).get().await;
        sink.send(value).await?;
        self.last_sent.set(value).await;
        Ok(value)
    }

    /// Handles one value read from the previous node.
    ///
    /// A PING spawns the critical section simulation, whose handle is returned;
    /// it forwards the PING once the section is left. A PONG is forwarded after
    /// the configured delay before this returns.
    pub async fn manage_recv_token(
        self: &Arc<Self>,
        value: i64,
        outbound: &Arc<Outbound>,
    ) -> Result<Option<JoinHandle<()>>, RingError> {
        match TokenKind::of(value) {
            Some(TokenKind::Ping) => {
                log::info(&cformat!("Received <yellow, bold>PING</yellow, bold> <bold>{value}</bold>."));
                self.ping.set(value).await;

                if self.last_sent().await == value {
                    self.regenerate(self.ping.get().await).await;
                    log::warn(&cformat!(
                        "Lost <cyan, bold>PONG</cyan, bold>. Regenerated <bold>{}</bold>.",
                        self.pong.get().await
                    ));
                    self.send_token(TokenKind::Pong, outbound).await?;
                }

                let engine = Arc::clone(self);
                let outbound = Arc::clone(outbound);
                Ok(Some(tokio::spawn(async move {
                    engine.critical_section(outbound).await
                })))
            }
            Some(TokenKind::Pong) => {
                log::info(&cformat!("Received <cyan, bold>PONG</cyan, bold> <bold>{value}</bold>."));
                self.pong.set(value).await;

                if self.state.get().await == Occupancy::Locked {
                    self.incarnate(self.ping.get().await).await;
                    log::info(&cformat!(
                        "Incarnated <yellow, bold>PING</yellow, bold> to <bold>{}</bold>.",
                        self.ping.get().await
                    ));
                } else if self.last_sent().await == value {
                    // x is the received (negative) PONG value.
                    self.regenerate(self.pong.get().await).await;
                    log::warn(&cformat!(
                        "Lost <yellow, bold>PING</yellow, bold>. Regenerated <bold>{}</bold>.",
                        self.ping.get().await
                    ));
                    self.send_token(TokenKind::Ping, outbound).await?;
                }

                sleep(self.timings.pong_delay()).await;
                let sent = self.send_token(TokenKind::Pong, outbound).await?;
                log::info(&cformat!("Forwarded <cyan, bold>PONG</cyan, bold> <bold>{sent}</bold>."));
                Ok(None)
            }
            None => {
                log::warn("Received a zero valued token, ignoring it.");
                Ok(None)
            }
        }
    }

    async fn critical_section(self: Arc<Self>, outbound: Arc<Outbound>) {
        let think = self.timings.think_time(&mut rand::rng());
        log::debug(&format!("Entering critical section in {think:?}."));
        sleep(think).await;

        self.state.set(Occupancy::Locked).await;
        log::info("Entered critical section.");
        sleep(self.timings.hold()).await;
        self.state.set(Occupancy::Free).await;
        log::info("Leaving critical section.");

        match self.send_token(TokenKind::Ping, &outbound).await {
            Ok(sent) => {
                log::info(&cformat!("Forwarded <yellow, bold>PING</yellow, bold> <bold>{sent}</bold>."))
            }
            Err(e) => log::error(&format!("Couldn't forward PING to the next node: {e}")),
        }
    }
}
