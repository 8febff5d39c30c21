use crate::{
    config::NodeConfig,
    engine::Engine,
    link::{Dialer, Outbound, RingLink},
    log,
    message::TokenKind,
    RingError,
};
use color_print::cformat;
use std::sync::Arc;
use tokio::net::TcpListener;

/// A node of the ring.
pub struct Peer {
    config: NodeConfig,
    engine: Arc<Engine>,
}

impl Peer {
    pub fn new(config: NodeConfig) -> Self {
        let engine = Arc::new(Engine::new(config.timings.clone()));
        Self { config, engine }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn engine(&self) -> Arc<Engine> {
        Arc::clone(&self.engine)
    }

    /// Binds the listening port and serves the ring until the previous node goes away.
    pub async fn run(&self) -> Result<(), RingError> {
        self.config.validate()?;

        let address = self.config.listen_address();
        log::info(&cformat!("Starting server on <bold>{address}</bold>."));
        let listener = TcpListener::bind(&address).await?;

        self.serve(listener).await
    }

    /// Seeds the tokens when this is the init node, then accepts the previous
    /// node and runs the read loop over its stream.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), RingError> {
        let mut link = RingLink::new(
            Dialer::from_config(&self.config),
            self.config.timings.max_in_flight,
        );

        if self.config.init {
            log::info("This is the init node...");
            let outbound = link.connect().await?;
            self.seed(&outbound).await?;
        }

        let (previous_peer_stream, previous_peer_address) = listener.accept().await?;
        log::info(&cformat!(
            "Accepted a <bold>connection</bold> from <bold>{previous_peer_address}</bold>."
        ));

        link.run(previous_peer_stream, self.engine()).await
    }

    async fn seed(&self, outbound: &Outbound) -> Result<(), RingError> {
        let ping = self.engine.send_token(TokenKind::Ping, outbound).await?;
        log::info(&cformat!("Sent first <yellow, bold>PING</yellow, bold> <bold>{ping}</bold>."));
        let pong = self.engine.send_token(TokenKind::Pong, outbound).await?;
        log::info(&cformat!("Sent first <cyan, bold>PONG</cyan, bold> <bold>{pong}</bold>."));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Timings, engine::SEED_PONG, message::TokenCodec};
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    fn quick() -> Timings {
        Timings {
            think_min_ms: 0,
            think_max_ms: 0,
            hold_ms: 0,
            pong_delay_ms: 0,
            retry_backoff_ms: 10,
            retry_attempts: 2,
            max_in_flight: 4,
        }
    }

    #[tokio::test]
    async fn init_node_seeds_before_accepting() {
        let next = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let next_port = next.local_addr().unwrap().port();
        let own = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let config = NodeConfig::new(0, "127.0.0.1".into(), next_port, true).with_timings(quick());
        let peer = Peer::new(config);
        let engine = peer.engine();
        let serving = tokio::spawn(async move { peer.serve(own).await });

        let (stream, _) = next.accept().await.unwrap();
        let mut frames = FramedRead::new(stream, TokenCodec);
        assert_eq!(frames.next().await.unwrap().unwrap(), 1);
        assert_eq!(frames.next().await.unwrap().unwrap(), -1);
        assert_eq!(engine.last_sent().await, SEED_PONG);

        serving.abort();
    }

    #[tokio::test]
    async fn init_node_without_successor_never_accepts() {
        let gone = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let next_port = gone.local_addr().unwrap().port();
        drop(gone);
        let own = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let config = NodeConfig::new(0, "127.0.0.1".into(), next_port, true).with_timings(quick());
        let peer = Peer::new(config);

        let err = peer.serve(own).await.unwrap_err();
        assert!(matches!(err, RingError::DialExhausted { .. }));
        assert_eq!(peer.engine().last_sent().await, 0);
    }

    #[tokio::test]
    async fn run_rejects_a_missing_successor() {
        let peer = Peer::new(NodeConfig::new(0, String::new(), 0, false));
        assert!(matches!(peer.run().await, Err(RingError::Config(_))));
    }
}
