pub mod analysis;
pub mod eof;

use crate::code::{
    analysis::{AnalysisCache, JumpTargetFilter},
    eof::{ContainerKind, EofContainer},
};
use bytes::Bytes;
use ethereum_types::H256;
use keccak_hash::keccak;
use std::sync::Arc;

/// Immutable contract code: the raw bytes, their hash, the jump-target
/// analysis, and the parsed EOF container when the bytes carry one.
///
/// Instances are cheap to clone (`Bytes` plus `Arc`s) and are shared between
/// the database cache and any call frame running the code.
#[derive(Debug, Clone, Default)]
pub struct Code {
    pub bytecode: Bytes,
    pub hash: H256,
    pub jump_targets: Arc<JumpTargetFilter>,
    pub eof: Option<Arc<EofContainer>>,
}

impl Code {
    /// Build code from raw bytes, hashing and analyzing them on the spot.
    pub fn from_bytecode(bytecode: Bytes) -> Self {
        let hash = keccak(&bytecode);
        let eof = Self::try_parse_eof(&bytecode);
        let jump_targets = if eof.is_some() {
            // EOF code has no dynamic jumps; the filter stays empty.
            Arc::new(JumpTargetFilter::default())
        } else {
            Arc::new(JumpTargetFilter::analyze(&bytecode))
        };
        Self {
            bytecode,
            hash,
            jump_targets,
            eof,
        }
    }

    /// Build code for an initcode frame, where the hash is irrelevant.
    ///
    /// Initcode is always executed as legacy bytecode here: a create
    /// transaction under the EOF revision swaps in the validated container
    /// explicitly, and the legacy CREATE family must fault on the 0xEF
    /// prefix rather than interpret it.
    pub fn from_bytecode_with_hash(bytecode: Bytes, hash: H256) -> Self {
        let jump_targets = Arc::new(JumpTargetFilter::analyze(&bytecode));
        Self {
            bytecode,
            hash,
            jump_targets,
            eof: None,
        }
    }

    /// Build code routed through the shared analysis cache.
    pub fn from_bytecode_cached(bytecode: Bytes, cache: &AnalysisCache) -> Self {
        let hash = keccak(&bytecode);
        let eof = Self::try_parse_eof(&bytecode);
        let jump_targets = if eof.is_some() {
            Arc::new(JumpTargetFilter::default())
        } else {
            cache.get_or_analyze(hash, &bytecode)
        };
        Self {
            bytecode,
            hash,
            jump_targets,
            eof,
        }
    }

    /// Wrap an already-validated container (EOFCREATE child frames).
    pub fn from_eof(container: Arc<EofContainer>) -> Self {
        let bytecode = container.raw.clone();
        let hash = keccak(&bytecode);
        Self {
            bytecode,
            hash,
            jump_targets: Arc::new(JumpTargetFilter::default()),
            eof: Some(container),
        }
    }

    /// Deployed EOF containers were validated at deploy time, so a parse
    /// here is expected to succeed. Bytes that look EOF-prefixed but do not
    /// parse are kept as opaque legacy code; executing them immediately
    /// faults on the 0xEF byte, which is the behavior such accounts would
    /// have on a pre-EOF chain.
    fn try_parse_eof(bytecode: &Bytes) -> Option<Arc<EofContainer>> {
        if !EofContainer::is_eof_prefixed(bytecode) {
            return None;
        }
        EofContainer::parse(bytecode.clone()).ok().map(Arc::new)
    }

    pub fn is_eof(&self) -> bool {
        self.eof.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    /// Validate initcode arriving through a create transaction.
    pub fn parse_initcode(initcode: Bytes) -> Result<Arc<EofContainer>, eof::EofError> {
        EofContainer::parse_and_validate(initcode, ContainerKind::Initcode).map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_code_gets_jump_analysis() {
        // PUSH1 0x5B, JUMPDEST
        let code = Code::from_bytecode(Bytes::from_static(&[0x60, 0x5b, 0x5b]));
        assert!(!code.is_eof());
        assert!(code.jump_targets.is_blacklisted(1));
        assert!(!code.jump_targets.is_blacklisted(2));
    }

    #[test]
    fn eof_container_is_detected() {
        let raw = Bytes::from(hex::decode("EF00010100040200010001040000000080000000").unwrap());
        let code = Code::from_bytecode(raw);
        assert!(code.is_eof());
    }

    #[test]
    fn malformed_ef_prefix_stays_legacy() {
        let code = Code::from_bytecode(Bytes::from_static(&[0xef, 0x00, 0xff]));
        assert!(!code.is_eof());
    }
}
