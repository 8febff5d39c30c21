//! The node's two ring connections: the stream to the next node and the
//! read loop over the stream from the previous node.

use crate::{config::NodeConfig, engine::Engine, log, message::TokenCodec, RingError};
use color_print::cformat;
use futures::{SinkExt, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::{Mutex, MutexGuard, Semaphore},
    time::sleep,
};
use tokio_util::codec::{FramedRead, FramedWrite};

pub type OutboundWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, TokenCodec>;

/// Stream to the next node, shared by every task of the node.
///
/// Writers must hold the lock for a whole frame.
pub struct Outbound(Mutex<OutboundWriter>);

impl Outbound {
    pub fn new<W: AsyncWrite + Send + Unpin + 'static>(writer: W) -> Self {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        Self(Mutex::new(FramedWrite::new(writer, TokenCodec)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, OutboundWriter> {
        self.0.lock().await
    }

    /// Flushes pending frames and shuts the stream down.
    pub async fn close(&self) -> Result<(), RingError> {
        self.0.lock().await.close().await?;
        Ok(())
    }
}

/// Dials the next node with a bounded number of attempts and a fixed pause between them.
#[derive(Debug, Clone)]
pub struct Dialer {
    pub address: String,
    pub attempts: u32,
    pub backoff: Duration,
}

impl Dialer {
    pub fn new(address: String, attempts: u32, backoff: Duration) -> Self {
        Self {
            address,
            attempts,
            backoff,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            config.next_node_address(),
            config.timings.retry_attempts,
            config.timings.retry_backoff(),
        )
    }

    pub async fn dial(&self) -> Result<TcpStream, RingError> {
        for attempt in 1..=self.attempts {
            match TcpStream::connect(&self.address).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    log::warn(&cformat!(
                        "Attempt <bold>{attempt}</bold>: couldn't connect to the next node at <bold>{}</bold>: {e}",
                        self.address
                    ));
                    if attempt < self.attempts {
                        sleep(self.backoff).await;
                    }
                }
            }
        }

        log::error("Failed to connect to the next node after retries.");
        Err(RingError::DialExhausted {
            address: self.address.clone(),
            attempts: self.attempts,
            backoff: self.backoff,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Uninitialized,
    Connecting,
    Connected,
    Closed,
}

pub struct RingLink {
    dialer: Dialer,
    outbound: Option<Arc<Outbound>>,
    limiter: Arc<Semaphore>,
    state: LinkState,
}

impl RingLink {
    /// `max_in_flight` bounds how many received values are handled at once.
    pub fn new(dialer: Dialer, max_in_flight: usize) -> Self {
        Self {
            dialer,
            outbound: None,
            limiter: Arc::new(Semaphore::new(max_in_flight.max(1))),
            state: LinkState::Uninitialized,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn outbound(&self) -> Option<Arc<Outbound>> {
        self.outbound.clone()
    }

    /// Opens the stream to the next node, or returns it if it is already open.
    /// A failed dial closes the link for good.
    pub async fn connect(&mut self) -> Result<Arc<Outbound>, RingError> {
        match (self.state, &self.outbound) {
            (LinkState::Connected, Some(outbound)) => return Ok(Arc::clone(outbound)),
            (LinkState::Closed, _) => return Err(RingError::Closed),
            _ => {}
        }

        self.state = LinkState::Connecting;
        log::info(&cformat!(
            "Initializing connection with the next node at <bold>{}</bold>...",
            self.dialer.address
        ));

        match self.dialer.dial().await {
            Ok(stream) => {
                let outbound = Arc::new(Outbound::new(stream));
                self.outbound = Some(Arc::clone(&outbound));
                self.state = LinkState::Connected;
                Ok(outbound)
            }
            Err(e) => {
                self.state = LinkState::Closed;
                Err(e)
            }
        }
    }

    /// Reads values from the previous node until the stream fails, handing each
    /// one to the engine without waiting for it to be handled.
    ///
    /// Always ends with an error; both streams are closed before returning.
    pub async fn run<R: AsyncRead + Unpin>(
        &mut self,
        inbound: R,
        engine: Arc<Engine>,
    ) -> Result<(), RingError> {
        let mut frames = FramedRead::new(inbound, TokenCodec);
        let result = self.drain(&mut frames, &engine).await;
        drop(frames);
        self.close().await;
        result
    }

    async fn drain<R: AsyncRead + Unpin>(
        &mut self,
        frames: &mut FramedRead<R, TokenCodec>,
        engine: &Arc<Engine>,
    ) -> Result<(), RingError> {
        loop {
            let value = match frames.next().await {
                Some(Ok(value)) => value,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(RingError::PeerClosed),
            };

            let outbound = self.connect().await?;
            let Ok(permit) = Arc::clone(&self.limiter).acquire_owned().await else {
                return Err(RingError::Closed);
            };

            let engine = Arc::clone(engine);
            tokio::spawn(async move {
                let _permit = permit;
                match engine.manage_recv_token(value, &outbound).await {
                    Ok(Some(section)) => {
                        if let Err(e) = section.await {
                            log::error(&format!("Critical section task failed: {e}"));
                        }
                    }
                    Ok(None) => {}
                    Err(e) => log::error(&format!("Couldn't forward token to the next node: {e}")),
                }
            });
        }
    }

    async fn close(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            match outbound.close().await {
                Ok(()) => log::info("Closed connection to the next node."),
                Err(e) => log::error(&format!("Error closing connection to the next node: {e}")),
            }
        }
        self.state = LinkState::Closed;
    }
}
