//! # corevm
//!
//! A pure Rust interpreter for the Ethereum Virtual Machine: a
//! deterministic, gas-metered, stack-based bytecode machine with
//! fork-parameterized semantics from Frontier through Prague, plus the EOF
//! container format.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           VM                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  CallFrame  │  │   Memory    │  │       Stack         │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Substate   │  │ Precompiles │  │    Environment      │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GeneralizedDatabase                      │
//! │              (account state, storage, code)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key components
//!
//! - [`vm::VM`]: the execution engine; one instance per transaction
//! - [`call_frame::CallFrame`]: per-call execution state
//! - [`code::Code`]: analyzed bytecode, including EOF containers
//! - [`gas_schedule::GasSchedule`]: flat per-fork cost tables
//! - [`db::Database`]: the host's world-state capability set
//! - [`precompiles`]: native implementations of the fixed-address contracts
//! - [`hooks`]: transaction-boundary processing (validation, fees, cleanup)
//! - [`tracing`]: frame- and step-level observation
//!
//! ## Usage
//!
//! ```no_run
//! use corevm::{
//!     db::{cache::CacheDB, gen_db::GeneralizedDatabase, InMemoryDb},
//!     environment::{Environment, TxEnv},
//!     tracing::noop_tracer,
//!     vm::VM,
//! };
//! use bytes::Bytes;
//! use ethereum_types::{Address, U256};
//! use std::sync::Arc;
//!
//! let store = InMemoryDb::new();
//! let mut db = GeneralizedDatabase::new(Arc::new(store), CacheDB::default());
//! let env = Environment::default_from_address(Address::zero());
//! let tx = TxEnv::call(Address::zero(), Bytes::new(), U256::zero());
//!
//! let mut vm = VM::new(env, &mut db, &tx, noop_tracer()).unwrap();
//! let report = vm.execute().unwrap();
//! assert!(report.is_success());
//! ```

pub mod account;
pub mod call_frame;
pub mod code;
pub mod constants;
pub mod db;
pub mod environment;
pub mod errors;
pub mod execution_handlers;
pub mod gas_cost;
pub mod gas_schedule;
pub mod hooks;
pub mod memory;
pub mod opcode_handlers;
pub mod opcodes;
pub mod precompiles;
pub mod tracing;
pub mod utils;
pub mod vm;

pub use account::{Account, AccountInfo};
pub use environment::{Environment, EvmConfig, Fork, TxEnv, TxKind};
pub use errors::{ExecutionReport, TxResult, VMError};
pub use vm::VM;
