//! Execution observation hooks.
//!
//! The [`Tracer`] trait covers frame boundaries, per-opcode steps, and log
//! emission. [`CallTracer`] implements the call-tree shape of geth's
//! `callTracer`; [`NoopTracer`] is the default when the host does not
//! observe execution.

use bytes::Bytes;
use ethereum_types::{Address, U256};
use serde::Serialize;
use std::{cell::RefCell, rc::Rc};

use crate::{call_frame::Log, errors::InternalError};

pub type DynTracer = Rc<RefCell<dyn Tracer>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
    EofCreate,
    ExtCall,
    ExtDelegateCall,
    ExtStaticCall,
    SelfDestruct,
}

/// Observation hooks, all optional. A frame enter is always paired with an
/// exit; opcode callbacks fire before the opcode runs.
pub trait Tracer {
    fn enter(
        &mut self,
        _call_type: CallType,
        _from: Address,
        _to: Address,
        _value: U256,
        _gas: u64,
        _input: &Bytes,
    ) {
    }

    fn exit(
        &mut self,
        _gas_used: u64,
        _output: Bytes,
        _error: Option<String>,
        _revert_reason: Option<String>,
        _is_top: bool,
    ) -> Result<(), InternalError> {
        Ok(())
    }

    fn on_opcode(&mut self, _opcode: u8, _pc: usize, _gas_remaining: u64, _depth: usize) {}

    fn log(&mut self, _log: &Log) {}
}

/// Tracer that observes nothing.
#[derive(Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

pub fn noop_tracer() -> DynTracer {
    Rc::new(RefCell::new(NoopTracer))
}

/// One node of the traced call tree.
#[derive(Debug, Clone, Serialize)]
pub struct TracedCall {
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub from: Address,
    pub to: Address,
    #[serde(serialize_with = "serialize_u256_hex")]
    pub value: U256,
    pub gas: u64,
    #[serde(rename = "gasUsed")]
    pub gas_used: u64,
    #[serde(with = "crate::utils::serde_hex_bytes")]
    pub input: Bytes,
    #[serde(with = "crate::utils::serde_hex_bytes")]
    pub output: Bytes,
    pub error: Option<String>,
    #[serde(rename = "revertReason")]
    pub revert_reason: Option<String>,
    pub logs: Vec<Log>,
    pub calls: Vec<TracedCall>,
}

fn serialize_u256_hex<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("0x{value:x}"))
}

impl TracedCall {
    fn new(
        call_type: CallType,
        from: Address,
        to: Address,
        value: U256,
        gas: u64,
        input: Bytes,
    ) -> Self {
        Self {
            call_type,
            from,
            to,
            value,
            gas,
            gas_used: 0,
            input,
            output: Bytes::new(),
            error: None,
            revert_reason: None,
            logs: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// Call-tree tracer. At the end of a traced transaction exactly one root
/// call remains, retrievable with [`CallTracer::into_root`].
#[derive(Default)]
pub struct CallTracer {
    frames: Vec<TracedCall>,
    only_top_call: bool,
    with_logs: bool,
}

impl CallTracer {
    pub fn new(only_top_call: bool, with_logs: bool) -> Self {
        Self {
            frames: Vec::new(),
            only_top_call,
            with_logs,
        }
    }

    pub fn into_dyn(self) -> DynTracer {
        Rc::new(RefCell::new(self))
    }

    /// The completed root call, if tracing observed a whole transaction.
    pub fn root(&self) -> Option<&TracedCall> {
        self.frames.first()
    }

    pub fn into_root(mut self) -> Option<TracedCall> {
        self.frames.pop()
    }
}

impl Tracer for CallTracer {
    fn enter(
        &mut self,
        call_type: CallType,
        from: Address,
        to: Address,
        value: U256,
        gas: u64,
        input: &Bytes,
    ) {
        if self.only_top_call && !self.frames.is_empty() {
            return;
        }
        self.frames
            .push(TracedCall::new(call_type, from, to, value, gas, input.clone()));
    }

    fn exit(
        &mut self,
        gas_used: u64,
        output: Bytes,
        error: Option<String>,
        revert_reason: Option<String>,
        is_top: bool,
    ) -> Result<(), InternalError> {
        if self.only_top_call && !is_top {
            return Ok(());
        }
        let mut finished = self
            .frames
            .pop()
            .ok_or(InternalError::CouldNotPopCallframe)?;
        finished.gas_used = gas_used;
        finished.output = output;
        finished.error = error;
        finished.revert_reason = revert_reason;

        match self.frames.last_mut() {
            Some(parent) => parent.calls.push(finished),
            // The root call stays for the host to collect.
            None => self.frames.push(finished),
        }
        Ok(())
    }

    fn log(&mut self, log: &Log) {
        if !self.with_logs {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.logs.push(log.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_tracer_builds_a_tree() {
        let mut tracer = CallTracer::new(false, false);
        tracer.enter(
            CallType::Call,
            Address::zero(),
            Address::from_low_u64_be(1),
            U256::zero(),
            100_000,
            &Bytes::new(),
        );
        tracer.enter(
            CallType::StaticCall,
            Address::from_low_u64_be(1),
            Address::from_low_u64_be(2),
            U256::zero(),
            50_000,
            &Bytes::new(),
        );
        tracer.exit(1000, Bytes::new(), None, None, false).unwrap();
        tracer.exit(5000, Bytes::new(), None, None, true).unwrap();

        let root = tracer.into_root().unwrap();
        assert_eq!(root.gas_used, 5000);
        assert_eq!(root.calls.len(), 1);
        assert_eq!(root.calls[0].call_type, CallType::StaticCall);
    }

    #[test]
    fn only_top_call_skips_children() {
        let mut tracer = CallTracer::new(true, false);
        tracer.enter(
            CallType::Call,
            Address::zero(),
            Address::from_low_u64_be(1),
            U256::zero(),
            100_000,
            &Bytes::new(),
        );
        tracer.enter(
            CallType::Call,
            Address::from_low_u64_be(1),
            Address::from_low_u64_be(2),
            U256::zero(),
            50_000,
            &Bytes::new(),
        );
        tracer.exit(1000, Bytes::new(), None, None, false).unwrap();
        tracer.exit(5000, Bytes::new(), None, None, true).unwrap();

        let root = tracer.into_root().unwrap();
        assert!(root.calls.is_empty());
    }
}
