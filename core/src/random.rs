//! Injected randomness for challenges, user handles and name suffixes.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU8, Ordering};

use keycheck_types::base64url;

/// Default length of challenges and user handles, in bytes.
pub const CHALLENGE_LEN: usize = 32;

pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, buf: &mut [u8]);
}

/// Thread-local CSPRNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        rand::fill(buf);
    }
}

/// Deterministic source: an incrementing byte counter shared across calls.
///
/// Distinct calls yield distinct bytes until the counter wraps, which keeps
/// test ids unique and reproducible.
#[derive(Debug, Default)]
pub struct SequenceRandom {
    next: AtomicU8,
}

impl SequenceRandom {
    #[must_use]
    pub fn starting_at(first: u8) -> Self {
        Self {
            next: AtomicU8::new(first),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.next.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[must_use]
pub fn random_bytes(source: &dyn RandomSource, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    source.fill_bytes(&mut buf);
    buf
}

#[must_use]
pub fn random_base64url(source: &dyn RandomSource, len: usize) -> String {
    base64url(&random_bytes(source, len))
}

/// `chars` lowercase hex digits, e.g. a short user suffix.
#[must_use]
pub fn random_hex(source: &dyn RandomSource, chars: usize) -> String {
    let mut out = String::with_capacity(chars + 1);
    for byte in random_bytes(source, chars.div_ceil(2)) {
        let _ = write!(out, "{byte:02x}");
    }
    out.truncate(chars);
    out
}
