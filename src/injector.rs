//! Traffic generator that plays the part of a previous node and keeps writing
//! the same integer to a node's listening port.

use crate::{log, message::Width, RingError};
use color_print::cformat;
use std::{future::Future, time::Duration};
use tokio::{io::AsyncWriteExt, net::TcpStream, time};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Injector {
    pub address: String,
    pub value: i64,
    pub width: Width,
    pub interval: Duration,
}

impl Injector {
    pub fn new(address: String, value: i64, width: Width) -> Self {
        Self {
            address,
            value,
            width,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Connects and writes the value once per interval until `shutdown` resolves.
    /// Returns how many values were written.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) -> Result<u64, RingError> {
        let mut stream = match TcpStream::connect(&self.address).await {
            Ok(stream) => stream,
            Err(e) => {
                log::error(&cformat!("Failed to connect to <bold>{}</bold>: {e}", self.address));
                return Err(e.into());
            }
        };

        let frame = self.width.encode(self.value);
        let mut ticker = time::interval(self.interval);
        // the first tick completes immediately
        ticker.tick().await;
        tokio::pin!(shutdown);

        log::info(&format!("Sending {} every {:?}. Press CTRL+C to exit.", self.value, self.interval));
        let mut sent = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = stream.write_all(&frame).await {
                        log::error(&format!("Failed to send data: {e}"));
                        return Err(e.into());
                    }
                    sent += 1;
                    log::info(&cformat!("Sent <bold>{}</bold> to <bold>{}</bold>.", self.value, self.address));
                }
                _ = &mut shutdown => {
                    log::info("Shutting down the injector.");
                    break;
                }
            }
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TokenCodec;
    use futures::StreamExt;
    use tokio::{net::TcpListener, sync::oneshot};
    use tokio_util::codec::FramedRead;

    #[tokio::test]
    async fn writes_full_frames_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let injector = Injector::new(address, -3, Width::Bits64).with_interval(Duration::from_millis(5));

        let (stop, stopped) = oneshot::channel::<()>();
        let running = tokio::spawn(async move {
            injector
                .run_until(async {
                    let _ = stopped.await;
                })
                .await
        });

        let (stream, _) = listener.accept().await.unwrap();
        let mut frames = FramedRead::new(stream, TokenCodec);
        assert_eq!(frames.next().await.unwrap().unwrap(), -3);
        assert_eq!(frames.next().await.unwrap().unwrap(), -3);

        stop.send(()).unwrap();
        assert!(running.await.unwrap().unwrap() >= 2);
    }

    #[tokio::test]
    async fn two_narrow_writes_make_one_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let injector = Injector::new(address, 7, Width::Bits32).with_interval(Duration::from_millis(5));

        let running = tokio::spawn(async move { injector.run_until(std::future::pending()).await });

        let (stream, _) = listener.accept().await.unwrap();
        let mut frames = FramedRead::new(stream, TokenCodec);
        assert_eq!(frames.next().await.unwrap().unwrap(), (7i64 << 32) | 7);

        running.abort();
    }
}
