//! Synchronized registers shared between the tasks of a node.

use std::sync::Arc;
use tokio::sync::Mutex;

/// A circulating token value. Positive values are PING, negative values are PONG.
#[derive(Clone, Debug)]
pub struct Token(pub Arc<Mutex<i64>>);

impl Token {
    pub fn new(value: i64) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    pub async fn get(&self) -> i64 {
        *self.0.lock().await
    }

    pub async fn set(&self, value: i64) {
        *self.0.lock().await = value;
    }
}

/// Enum that tells if the node is inside its simulated critical section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupancy {
    Locked,
    Free,
}

#[derive(Clone, Debug)]
pub struct CriticalSectionState(pub Arc<Mutex<Occupancy>>);

impl CriticalSectionState {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Occupancy::Free)))
    }

    pub async fn get(&self) -> Occupancy {
        *self.0.lock().await
    }

    pub async fn set(&self, occupancy: Occupancy) {
        *self.0.lock().await = occupancy;
    }
}

impl Default for CriticalSectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_clones_share_the_value() {
        let token = Token::new(1);
        let handle = token.clone();
        handle.set(-7).await;
        assert_eq!(token.get().await, -7);
    }

    #[tokio::test]
    async fn state_starts_free() {
        let state = CriticalSectionState::new();
        assert_eq!(state.get().await, Occupancy::Free);
        state.set(Occupancy::Locked).await;
        assert_eq!(state.clone().get().await, Occupancy::Locked);
    }

    #[tokio::test]
    async fn concurrent_writers_never_tear() {
        let token = Token::new(1);
        let mut handles = Vec::new();
        for i in 1..=32i64 {
            let token = token.clone();
            let value = if i % 2 == 0 { i64::MAX - i } else { i64::MIN + i };
            handles.push(tokio::spawn(async move { token.set(value).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let value = token.get().await;
        assert!(value > i64::MAX - 64 || value < i64::MIN + 64);
    }
}
