use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 6;

/// Source of human-readable order numbers
pub trait OrderNumberGenerator: Send + Sync {
    fn next(&self) -> String;
}

/// `ORD-YYYYMMDD-XXXXXX` with a random uppercase alphanumeric suffix
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOrderNumbers;

impl OrderNumberGenerator for RandomOrderNumbers {
    fn next(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
            .collect();
        format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), suffix)
    }
}

/// `ORD-000001`, `ORD-000002`, ... Deterministic, for tests and seeding.
#[derive(Debug, Default)]
pub struct SequentialOrderNumbers {
    counter: AtomicU64,
}

impl SequentialOrderNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_after(last: u64) -> Self {
        Self {
            counter: AtomicU64::new(last),
        }
    }
}

impl OrderNumberGenerator for SequentialOrderNumbers {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("ORD-{:06}", n)
    }
}
