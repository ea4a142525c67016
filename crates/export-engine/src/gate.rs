//! One export at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vidframe_common::error::{VidframeError, VidframeResult};

/// Rejects a second export while one is in flight and exposes the
/// "exporting" flag to the host.
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    active: Arc<AtomicBool>,
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an export as started. The returned guard clears the flag when
    /// dropped.
    pub fn try_begin(&self) -> VidframeResult<ExportGuard> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VidframeError::unsupported("An export is already in progress"));
        }
        Ok(ExportGuard {
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_exporting(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct ExportGuard {
    active: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_export_is_rejected() {
        let gate = ExportGate::new();
        let guard = gate.try_begin().unwrap();
        assert!(gate.is_exporting());
        assert!(gate.clone().try_begin().is_err());

        drop(guard);
        assert!(!gate.is_exporting());
        assert!(gate.try_begin().is_ok());
    }
}
