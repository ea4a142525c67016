//! One-shot encoder completion signal.

use tokio::sync::oneshot;

/// Totals reported when an encoder finishes normally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderSummary {
    pub chunks: u64,
    pub bytes: u64,
}

/// Why an encoder did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The encoder was aborted.
    Cancelled,
    Failed(String),
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "encoder cancelled"),
            Self::Failed(message) => write!(f, "{message}"),
        }
    }
}

/// Producer side, held by the encoder.
#[derive(Debug)]
pub struct CompletionSignal {
    tx: oneshot::Sender<Result<EncoderSummary, CompletionError>>,
}

/// Consumer side, resolved once after the final chunk.
#[derive(Debug)]
pub struct EncoderCompletion {
    rx: oneshot::Receiver<Result<EncoderSummary, CompletionError>>,
}

pub fn completion_pair() -> (CompletionSignal, EncoderCompletion) {
    let (tx, rx) = oneshot::channel();
    (CompletionSignal { tx }, EncoderCompletion { rx })
}

impl CompletionSignal {
    pub fn resolve(self, summary: EncoderSummary) {
        let _ = self.tx.send(Ok(summary));
    }

    pub fn reject(self, error: CompletionError) {
        let _ = self.tx.send(Err(error));
    }
}

impl EncoderCompletion {
    /// Wait for the outcome. A producer dropped without signalling counts
    /// as a failure.
    pub async fn wait(self) -> Result<EncoderSummary, CompletionError> {
        self.rx.await.unwrap_or_else(|_| {
            Err(CompletionError::Failed(
                "encoder stopped without signalling completion".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_once() {
        let (signal, completion) = completion_pair();
        signal.resolve(EncoderSummary { chunks: 2, bytes: 10 });
        assert_eq!(completion.wait().await.unwrap().chunks, 2);
    }

    #[tokio::test]
    async fn test_cancel_is_distinct() {
        let (signal, completion) = completion_pair();
        signal.reject(CompletionError::Cancelled);
        assert_eq!(completion.wait().await, Err(CompletionError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_signal_is_failure() {
        let (signal, completion) = completion_pair();
        drop(signal);
        assert!(matches!(completion.wait().await, Err(CompletionError::Failed(_))));
    }
}
