//! Per-turn audio accumulation.

use crate::core::playback::decode_base64;

/// Raw audio payloads collected since the last turn boundary.
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    payloads: Vec<String>,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, payload: impl Into<String>) {
        self.payloads.push(payload.into());
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn clear(&mut self) {
        self.payloads.clear();
    }

    /// Take everything collected so far, leaving the accumulator empty.
    pub fn take(&mut self) -> CompletedTurn {
        CompletedTurn {
            payloads: std::mem::take(&mut self.payloads),
        }
    }
}

/// The payloads of one finished turn, detached from the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTurn {
    payloads: Vec<String>,
}

impl CompletedTurn {
    pub fn payload_count(&self) -> usize {
        self.payloads.len()
    }

    /// Decode every payload and join the bytes in arrival order.
    ///
    /// Payloads that fail to decode are skipped. A trailing odd byte is
    /// dropped per payload so every payload starts on a sample boundary,
    /// matching what playback does with the same frame.
    pub fn into_pcm(self) -> Vec<u8> {
        let mut pcm = Vec::new();
        for (index, payload) in self.payloads.iter().enumerate() {
            match decode_base64(payload) {
                Ok(bytes) => {
                    let whole = bytes.len() & !1;
                    if whole != bytes.len() {
                        tracing::warn!(
                            "Audio payload #{} has an odd byte count, dropping the last byte",
                            index
                        );
                    }
                    pcm.extend_from_slice(&bytes[..whole]);
                }
                Err(e) => {
                    tracing::warn!("Skipping undecodable audio payload #{}: {}", index, e);
                }
            }
        }
        pcm
    }
}
