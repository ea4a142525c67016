//! Scriptable in-memory encoder.
//!
//! Each pushed frame contributes its first 4 bytes to the output; a chunk
//! is emitted every `frames_per_chunk` frames.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use vidframe_common::error::{VidframeError, VidframeResult};

use crate::codec::CaptureCodec;
use crate::completion::{completion_pair, CompletionError, CompletionSignal, EncoderSummary};
use crate::encoder::{EncoderFactory, EncoderParams, EncoderSession, StreamEncoder};

/// Shared view of what fake encoders were asked to do.
#[derive(Debug, Default)]
pub struct FakeEncoderLog {
    pub frames: AtomicU64,
    pub aborted: AtomicBool,
    pub finished: AtomicBool,
    pub params: Mutex<Vec<EncoderParams>>,
}

impl FakeEncoderLog {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn was_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn params(&self) -> Vec<EncoderParams> {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct FakeEncoderFactory {
    codec: CaptureCodec,
    frames_per_chunk: u64,
    emit_data: bool,
    fail_start: bool,
    fail_finish: bool,
    log: Arc<FakeEncoderLog>,
}

impl FakeEncoderFactory {
    pub fn new(codec: CaptureCodec) -> Self {
        Self {
            codec,
            frames_per_chunk: 3,
            emit_data: true,
            fail_start: false,
            fail_finish: false,
            log: Arc::new(FakeEncoderLog::default()),
        }
    }

    /// Accept frames but never produce output.
    pub fn silent(mut self) -> Self {
        self.emit_data = false;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Reject the completion instead of resolving it.
    pub fn failing_finish(mut self) -> Self {
        self.fail_finish = true;
        self
    }

    pub fn log(&self) -> Arc<FakeEncoderLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl EncoderFactory for FakeEncoderFactory {
    async fn start(&self, params: EncoderParams) -> VidframeResult<EncoderSession> {
        if self.fail_start {
            return Err(VidframeError::capture("encoder unavailable"));
        }
        self.log
            .params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(params);

        let (tx, rx) = mpsc::unbounded_channel();
        let (signal, completion) = completion_pair();
        Ok(EncoderSession {
            encoder: Box::new(FakeEncoder {
                codec: self.codec,
                params,
                frames_per_chunk: self.frames_per_chunk.max(1),
                emit_data: self.emit_data,
                fail_finish: self.fail_finish,
                pending: Vec::new(),
                summary: EncoderSummary::default(),
                tx: Some(tx),
                signal: Some(signal),
                log: Arc::clone(&self.log),
            }),
            chunks: rx,
            completion,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeEncoder {
    codec: CaptureCodec,
    params: EncoderParams,
    frames_per_chunk: u64,
    emit_data: bool,
    fail_finish: bool,
    pending: Vec<u8>,
    summary: EncoderSummary,
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    signal: Option<CompletionSignal>,
    log: Arc<FakeEncoderLog>,
}

impl FakeEncoder {
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if let Some(tx) = &self.tx {
            self.summary.chunks += 1;
            self.summary.bytes += self.pending.len() as u64;
            let _ = tx.send(std::mem::take(&mut self.pending));
        }
    }
}

#[async_trait]
impl StreamEncoder for FakeEncoder {
    fn codec(&self) -> CaptureCodec {
        self.codec
    }

    async fn push_frame(&mut self, rgba: &[u8]) -> VidframeResult<()> {
        if rgba.len() != self.params.frame_len() {
            return Err(VidframeError::capture("frame size mismatch"));
        }
        if self.tx.is_none() {
            return Err(VidframeError::capture("encoder closed"));
        }
        let frames = self.log.frames.fetch_add(1, Ordering::SeqCst) + 1;
        if self.emit_data {
            self.pending.extend_from_slice(&rgba[..4]);
            if frames % self.frames_per_chunk == 0 {
                self.flush();
            }
        }
        Ok(())
    }

    async fn finish(&mut self) -> VidframeResult<()> {
        self.flush();
        self.tx.take();
        self.log.finished.store(true, Ordering::SeqCst);
        if let Some(signal) = self.signal.take() {
            if self.fail_finish {
                signal.reject(CompletionError::Failed("muxer error".to_string()));
            } else {
                signal.resolve(self.summary);
            }
        }
        Ok(())
    }

    async fn abort(&mut self) {
        self.tx.take();
        self.log.aborted.store(true, Ordering::SeqCst);
        if let Some(signal) = self.signal.take() {
            signal.reject(CompletionError::Cancelled);
        }
    }
}
