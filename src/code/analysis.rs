use crate::opcodes::Opcode;
use ethereum_types::H256;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};

/// Positions inside PUSH immediates, computed with a single linear scan of
/// the bytecode. A `JUMPDEST` byte sitting inside an immediate is not a
/// valid jump target, so `JUMP`/`JUMPI` consult this filter in addition to
/// checking the byte itself.
#[derive(Debug, Default)]
pub struct JumpTargetFilter {
    blacklist: Box<[u64]>,
}

impl JumpTargetFilter {
    pub fn analyze(code: &[u8]) -> Self {
        let mut blacklist = vec![0u64; code.len().div_ceil(64)].into_boxed_slice();

        let mut pc = 0;
        while pc < code.len() {
            let op = code[pc];
            if (Opcode::PUSH1 as u8..=Opcode::PUSH32 as u8).contains(&op) {
                let n = usize::from(op - Opcode::PUSH1 as u8) + 1;
                for immediate in (pc + 1)..(pc + 1 + n).min(code.len()) {
                    blacklist[immediate / 64] |= 1 << (immediate % 64);
                }
                pc += n;
            }
            pc += 1;
        }

        Self { blacklist }
    }

    #[inline]
    pub fn is_blacklisted(&self, pc: usize) -> bool {
        self.blacklist
            .get(pc / 64)
            .is_some_and(|word| word & (1 << (pc % 64)) != 0)
    }

    /// Approximate retained size, used for cache weight accounting.
    pub fn weight(&self) -> usize {
        self.blacklist.len() * 8 + std::mem::size_of::<Self>()
    }
}

struct CacheEntry {
    filter: Arc<JumpTargetFilter>,
    last_used: u64,
}

struct CacheInner {
    entries: FxHashMap<H256, CacheEntry>,
    weight: usize,
    tick: u64,
}

/// Jump-target analyses keyed by code hash, shared between VM instances.
///
/// Keys are content-addressed so entries never need invalidation; a weight
/// bound with least-recently-used eviction keeps the cache from growing
/// without limit. Internally synchronized so hosts can run independent
/// transactions on parallel threads over the same cache.
pub struct AnalysisCache {
    inner: Mutex<CacheInner>,
    max_weight: usize,
}

impl AnalysisCache {
    pub fn new(max_weight: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: FxHashMap::default(),
                weight: 0,
                tick: 0,
            }),
            max_weight,
        }
    }

    pub fn get_or_analyze(&self, code_hash: H256, code: &[u8]) -> Arc<JumpTargetFilter> {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            // A poisoned lock only means another thread panicked mid-insert;
            // the map itself is still structurally sound.
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(entry) = inner.entries.get_mut(&code_hash) {
            entry.last_used = tick;
            return Arc::clone(&entry.filter);
        }

        let filter = Arc::new(JumpTargetFilter::analyze(code));
        inner.weight += filter.weight();
        inner.entries.insert(
            code_hash,
            CacheEntry {
                filter: Arc::clone(&filter),
                last_used: tick,
            },
        );

        while inner.weight > self.max_weight && inner.entries.len() > 1 {
            let Some((&oldest, _)) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
            else {
                break;
            };
            if let Some(evicted) = inner.entries.remove(&oldest) {
                inner.weight = inner.weight.saturating_sub(evicted.filter.weight());
                ::tracing::debug!(code_hash = ?oldest, "evicted jump analysis from cache");
            }
        }

        filter
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keccak_hash::keccak;

    #[test]
    fn push_immediates_are_blacklisted() {
        // PUSH2 0x5B5B JUMPDEST
        let code = [0x61, 0x5b, 0x5b, 0x5b];
        let filter = JumpTargetFilter::analyze(&code);
        assert!(!filter.is_blacklisted(0));
        assert!(filter.is_blacklisted(1));
        assert!(filter.is_blacklisted(2));
        assert!(!filter.is_blacklisted(3));
    }

    #[test]
    fn truncated_push_does_not_scan_past_end() {
        // PUSH32 with only 2 immediate bytes present
        let code = [0x7f, 0x00, 0x00];
        let filter = JumpTargetFilter::analyze(&code);
        assert!(filter.is_blacklisted(1));
        assert!(filter.is_blacklisted(2));
    }

    #[test]
    fn cache_evicts_by_weight() {
        let cache = AnalysisCache::new(1024);
        for i in 0u64..64 {
            let code = vec![0x5b; 4096];
            let hash = keccak(i.to_be_bytes());
            cache.get_or_analyze(hash, &code);
        }
        // Far more was inserted than the bound allows; at least one entry is
        // kept, the rest must have been evicted.
        assert!(cache.len() < 64);
        assert!(!cache.is_empty());
    }

    #[test]
    fn cache_returns_same_analysis_for_same_hash() {
        let cache = AnalysisCache::new(1 << 20);
        let code = [0x60, 0x01, 0x5b];
        let hash = keccak(code);
        let a = cache.get_or_analyze(hash, &code);
        let b = cache.get_or_analyze(hash, &code);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
