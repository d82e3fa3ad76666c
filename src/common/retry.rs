// src/common/retry.rs

use std::future::Future;
use std::time::Duration;

use crate::common::error::AppError;

/// Uma única nova tentativa com espera, só para leituras idempotentes.
/// Escritas (criação, incremento de contadores) nunca passam por aqui.
#[derive(Debug, Clone, Copy)]
pub struct ReadRetry {
    pub backoff: Duration,
}

impl Default for ReadRetry {
    fn default() -> Self {
        Self { backoff: Duration::from_millis(150) }
    }
}

impl ReadRetry {
    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }

    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        match op().await {
            Err(e) if e.is_transient() => {
                tracing::warn!("Leitura '{}' falhou ({}), tentando de novo em {:?}", what, e, self.backoff);
                tokio::time::sleep(self.backoff).await;
                op().await
            }
            other => other,
        }
    }
}
