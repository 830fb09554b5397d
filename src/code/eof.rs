//! EOF v1 container parsing and validation.
//!
//! Layout: magic `0xEF00`, version `0x01`, then section headers in order:
//! types (`0x01`), code (`0x02`), optional subcontainers (`0x03`), data
//! (`0x04`), closed by the `0x00` terminator, followed by the section
//! bodies. Validation checks the instruction stream of every code section
//! (defined opcodes, complete immediates, aligned relative-jump targets) and
//! runs the stack-bounds analysis so that execution never needs per-step
//! underflow/overflow checks on section calls.

use crate::constants::{EOF_MAGIC, EOF_VERSION};
use bytes::Bytes;
use thiserror::Error;

pub const KIND_TYPES: u8 = 0x01;
pub const KIND_CODE: u8 = 0x02;
pub const KIND_CONTAINER: u8 = 0x03;
pub const KIND_DATA: u8 = 0x04;
pub const KIND_TERMINATOR: u8 = 0x00;

/// Marker in the `outputs` field for sections that never return.
pub const NON_RETURNING: u8 = 0x80;

pub const MAX_CODE_SECTIONS: usize = 1024;
pub const MAX_SUBCONTAINERS: usize = 256;
pub const MAX_STACK_HEIGHT: usize = 1023;
pub const MAX_SECTION_INPUTS: u8 = 127;
pub const MAX_SECTION_OUTPUTS: u8 = 127;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EofError {
    #[error("Container does not start with the EF00 magic")]
    InvalidMagic,
    #[error("Unsupported container version {0}")]
    UnsupportedVersion(u8),
    #[error("Truncated or malformed section headers")]
    TruncatedHeader,
    #[error("Expected section kind {expected:#04x}, found {found:#04x}")]
    UnexpectedSectionKind { expected: u8, found: u8 },
    #[error("Container body is shorter than the declared sections")]
    TruncatedBody,
    #[error("Container has trailing bytes past the declared sections")]
    TrailingBytes,
    #[error("Type section size must be four bytes per code section")]
    InvalidTypeSectionSize,
    #[error("Container must declare between 1 and 1024 code sections")]
    InvalidCodeSectionCount,
    #[error("Code section {0} is empty")]
    EmptyCodeSection(usize),
    #[error("Container declares more than 256 subcontainers")]
    InvalidContainerSectionCount,
    #[error("Subcontainer {0} is empty")]
    EmptySubcontainer(usize),
    #[error("First code section must take no inputs and be non-returning")]
    InvalidFirstSectionType,
    #[error("Section {0} declares invalid inputs or outputs")]
    InvalidSectionIo(usize),
    #[error("Section {0} declares a max stack height above 1023")]
    InvalidMaxStackHeight(usize),
    #[error("Instruction {opcode:#04x} at {pos} is not defined in EOF")]
    UndefinedInstruction { pos: usize, opcode: u8 },
    #[error("Immediate of instruction at {0} is truncated")]
    TruncatedImmediate(usize),
    #[error("Relative jump at {0} targets an immediate or leaves the section")]
    InvalidJumpTarget(usize),
    #[error("Instruction at {pos} references missing code section {section}")]
    InvalidSectionReference { pos: usize, section: usize },
    #[error("Instruction at {pos} references missing subcontainer {container}")]
    InvalidContainerReference { pos: usize, container: usize },
    #[error("DATALOADN at {0} reads past the declared data section")]
    InvalidDataLoadN(usize),
    #[error("Code section {0} does not end in a terminating instruction")]
    MissingTerminator(usize),
    #[error("Instruction at {0} is unreachable")]
    UnreachableCode(usize),
    #[error("Stack underflow at instruction {0}")]
    StackUnderflow(usize),
    #[error("Stack overflow at instruction {0}")]
    StackOverflow(usize),
    #[error("Stack height mismatch at instruction {0}")]
    StackHeightMismatch(usize),
    #[error("Computed max stack height does not match declaration of section {0}")]
    MaxStackHeightMismatch(usize),
    #[error("RETF in non-returning section at {0}")]
    InvalidRetf(usize),
    #[error("JUMPF at {0} targets an incompatible section")]
    InvalidJumpf(usize),
    #[error("Instruction at {0} is not allowed in this container kind")]
    IncompatibleContainerKind(usize),
    #[error("Subcontainer {0} is referenced both as initcode and as deployed code")]
    ConflictingContainerKind(usize),
    #[error("Subcontainer {0} is never referenced")]
    OrphanSubcontainer(usize),
}

/// How a container is meant to be used, which constrains its terminators:
/// initcode must end through RETURNCONTRACT, deployed code must not contain
/// RETURNCONTRACT at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Initcode,
    Runtime,
}

/// Per-code-section metadata from the types section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMetadata {
    pub inputs: u8,
    pub outputs: u8,
    pub max_stack_height: u16,
}

impl TypeMetadata {
    pub fn is_non_returning(&self) -> bool {
        self.outputs == NON_RETURNING
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EofContainer {
    pub types: Vec<TypeMetadata>,
    pub code_sections: Vec<Bytes>,
    pub subcontainers: Vec<Bytes>,
    pub data: Bytes,
    /// Declared size of the data section; the body may be shorter in a
    /// container that is completed with aux data at deployment.
    pub declared_data_size: usize,
    pub raw: Bytes,
}

impl EofContainer {
    pub fn is_eof_prefixed(code: &[u8]) -> bool {
        code.len() >= 2 && code[0..2] == EOF_MAGIC
    }

    /// Parse the container framing without validating the code.
    pub fn parse(raw: Bytes) -> Result<Self, EofError> {
        let bytes = raw.as_ref();
        if !Self::is_eof_prefixed(bytes) {
            return Err(EofError::InvalidMagic);
        }
        let version = *bytes.get(2).ok_or(EofError::TruncatedHeader)?;
        if version != EOF_VERSION {
            return Err(EofError::UnsupportedVersion(version));
        }

        let mut cursor = Cursor::new(bytes, 3);

        cursor.expect_kind(KIND_TYPES)?;
        let types_size = cursor.read_u16()? as usize;
        if types_size == 0 || types_size % 4 != 0 {
            return Err(EofError::InvalidTypeSectionSize);
        }

        cursor.expect_kind(KIND_CODE)?;
        let code_count = cursor.read_u16()? as usize;
        if code_count == 0 || code_count > MAX_CODE_SECTIONS {
            return Err(EofError::InvalidCodeSectionCount);
        }
        if types_size / 4 != code_count {
            return Err(EofError::InvalidTypeSectionSize);
        }
        let mut code_sizes = Vec::with_capacity(code_count);
        for i in 0..code_count {
            let size = cursor.read_u16()? as usize;
            if size == 0 {
                return Err(EofError::EmptyCodeSection(i));
            }
            code_sizes.push(size);
        }

        let mut container_sizes = Vec::new();
        if cursor.peek()? == KIND_CONTAINER {
            cursor.advance();
            let container_count = cursor.read_u16()? as usize;
            if container_count == 0 || container_count > MAX_SUBCONTAINERS {
                return Err(EofError::InvalidContainerSectionCount);
            }
            for i in 0..container_count {
                let size = cursor.read_u16()? as usize;
                if size == 0 {
                    return Err(EofError::EmptySubcontainer(i));
                }
                container_sizes.push(size);
            }
        }

        cursor.expect_kind(KIND_DATA)?;
        let declared_data_size = cursor.read_u16()? as usize;

        cursor.expect_kind(KIND_TERMINATOR)?;

        // Section bodies follow the header in declaration order.
        let types = {
            let body = cursor.take(types_size)?;
            body.chunks_exact(4)
                .map(|chunk| TypeMetadata {
                    inputs: chunk[0],
                    outputs: chunk[1],
                    max_stack_height: u16::from_be_bytes([chunk[2], chunk[3]]),
                })
                .collect::<Vec<_>>()
        };

        let mut code_sections = Vec::with_capacity(code_count);
        for size in &code_sizes {
            let offset = cursor.offset;
            cursor.take(*size)?;
            code_sections.push(raw.slice(offset..offset + size));
        }

        let mut subcontainers = Vec::with_capacity(container_sizes.len());
        for size in &container_sizes {
            let offset = cursor.offset;
            cursor.take(*size)?;
            subcontainers.push(raw.slice(offset..offset + size));
        }

        // The data body may be truncated (to be completed with aux data at
        // deployment) but never longer than declared.
        let data_offset = cursor.offset;
        let remaining = bytes.len() - data_offset;
        if remaining > declared_data_size {
            return Err(EofError::TrailingBytes);
        }
        let data = raw.slice(data_offset..);

        // Type metadata sanity.
        for (i, meta) in types.iter().enumerate() {
            if meta.inputs > MAX_SECTION_INPUTS
                || (meta.outputs > MAX_SECTION_OUTPUTS && meta.outputs != NON_RETURNING)
            {
                return Err(EofError::InvalidSectionIo(i));
            }
            if meta.max_stack_height as usize > MAX_STACK_HEIGHT {
                return Err(EofError::InvalidMaxStackHeight(i));
            }
        }
        if types[0].inputs != 0 || !types[0].is_non_returning() {
            return Err(EofError::InvalidFirstSectionType);
        }

        Ok(Self {
            types,
            code_sections,
            subcontainers,
            data,
            declared_data_size,
            raw,
        })
    }

    pub fn parse_and_validate(raw: Bytes, kind: ContainerKind) -> Result<Self, EofError> {
        let container = Self::parse(raw)?;
        container.validate(kind)?;
        Ok(container)
    }

    /// Validate every code section and recurse into subcontainers with the
    /// kind their references imply.
    pub fn validate(&self, kind: ContainerKind) -> Result<(), EofError> {
        let mut container_refs: Vec<Option<ContainerKind>> = vec![None; self.subcontainers.len()];

        for section in 0..self.code_sections.len() {
            self.validate_code_section(section, kind, &mut container_refs)?;
        }

        for (index, reference) in container_refs.iter().enumerate() {
            match reference {
                Some(sub_kind) => {
                    Self::parse_and_validate(self.subcontainers[index].clone(), *sub_kind)?;
                }
                None => return Err(EofError::OrphanSubcontainer(index)),
            }
        }

        Ok(())
    }

    fn validate_code_section(
        &self,
        section: usize,
        kind: ContainerKind,
        container_refs: &mut [Option<ContainerKind>],
    ) -> Result<(), EofError> {
        let code = &self.code_sections[section];
        let meta = self.types[section];

        // First pass: decode instructions, record instruction starts, check
        // immediates and per-instruction structural rules.
        let mut starts = vec![false; code.len()];
        let mut pos = 0;
        while pos < code.len() {
            starts[pos] = true;
            let op = code[pos];
            let info = instr_info(op).ok_or(EofError::UndefinedInstruction {
                pos,
                opcode: op,
            })?;

            match kind {
                // Initcode may only end in RETURNCONTRACT (or abort paths).
                ContainerKind::Initcode if op == 0x00 || op == 0xF3 => {
                    return Err(EofError::IncompatibleContainerKind(pos));
                }
                ContainerKind::Runtime if op == 0xEE => {
                    return Err(EofError::IncompatibleContainerKind(pos));
                }
                _ => {}
            }

            let imm = immediate_size(code, pos)?;
            if pos + 1 + imm > code.len() {
                return Err(EofError::TruncatedImmediate(pos));
            }

            match op {
                // CALLF / JUMPF immediate must name an existing section.
                0xE3 | 0xE5 => {
                    let target =
                        u16::from_be_bytes([code[pos + 1], code[pos + 2]]) as usize;
                    if target >= self.code_sections.len() {
                        return Err(EofError::InvalidSectionReference {
                            pos,
                            section: target,
                        });
                    }
                }
                // DATALOADN must stay inside the declared data section.
                0xD1 => {
                    let offset =
                        u16::from_be_bytes([code[pos + 1], code[pos + 2]]) as usize;
                    if offset + 32 > self.declared_data_size {
                        return Err(EofError::InvalidDataLoadN(pos));
                    }
                }
                // EOFCREATE / RETURNCONTRACT reference a subcontainer.
                0xEC | 0xEE => {
                    let index = code[pos + 1] as usize;
                    if index >= self.subcontainers.len() {
                        return Err(EofError::InvalidContainerReference {
                            pos,
                            container: index,
                        });
                    }
                    let wanted = if op == 0xEC {
                        ContainerKind::Initcode
                    } else {
                        ContainerKind::Runtime
                    };
                    match container_refs[index] {
                        None => container_refs[index] = Some(wanted),
                        Some(existing) if existing != wanted => {
                            return Err(EofError::ConflictingContainerKind(index));
                        }
                        Some(_) => {}
                    }
                }
                _ => {}
            }

            let _ = info;
            pos += 1 + imm;
        }

        // Second pass: relative-jump targets must land on instruction starts.
        let mut pos = 0;
        while pos < code.len() {
            let op = code[pos];
            let imm = immediate_size(code, pos)?;
            for target in jump_targets(code, pos)? {
                if target >= code.len() || !starts[target] {
                    return Err(EofError::InvalidJumpTarget(pos));
                }
            }
            let _ = op;
            pos += 1 + imm;
        }

        self.validate_stack(section, code, meta, &starts)
    }

    /// [EIP-5450] forward stack-bounds analysis. Every instruction gets a
    /// reachable height range; forward jump targets merge ranges, backward
    /// jumps must match exactly, and the section-wide maximum must equal the
    /// declared max stack height.
    fn validate_stack(
        &self,
        section: usize,
        code: &[u8],
        meta: TypeMetadata,
        starts: &[bool],
    ) -> Result<(), EofError> {
        let mut bounds: Vec<Option<(u16, u16)>> = vec![None; code.len()];
        bounds[0] = Some((meta.inputs as u16, meta.inputs as u16));

        let mut highest = meta.inputs as u16;
        let mut pos = 0;
        while pos < code.len() {
            let (min, max) = bounds[pos].ok_or(EofError::UnreachableCode(pos))?;
            let op = code[pos];
            let info = instr_info(op).ok_or(EofError::UndefinedInstruction {
                pos,
                opcode: op,
            })?;
            let imm = immediate_size(code, pos)?;

            let (inputs, outputs): (u16, u16) = match op {
                // CALLF consumes the callee's inputs and produces its
                // outputs; the callee's peak must also fit.
                0xE3 => {
                    let target =
                        u16::from_be_bytes([code[pos + 1], code[pos + 2]]) as usize;
                    let callee = self.types[target];
                    let headroom = callee.max_stack_height.saturating_sub(callee.inputs as u16);
                    if max + headroom > MAX_STACK_HEIGHT as u16 {
                        return Err(EofError::StackOverflow(pos));
                    }
                    if callee.is_non_returning() {
                        return Err(EofError::InvalidSectionReference {
                            pos,
                            section: target,
                        });
                    }
                    (callee.inputs as u16, callee.outputs as u16)
                }
                0xE4 => {
                    if meta.is_non_returning() {
                        return Err(EofError::InvalidRetf(pos));
                    }
                    let expected = meta.outputs as u16;
                    if min != expected || max != expected {
                        return Err(EofError::StackHeightMismatch(pos));
                    }
                    (expected, 0)
                }
                0xE5 => {
                    let target =
                        u16::from_be_bytes([code[pos + 1], code[pos + 2]]) as usize;
                    let callee = self.types[target];
                    let headroom = callee.max_stack_height.saturating_sub(callee.inputs as u16);
                    if max + headroom > MAX_STACK_HEIGHT as u16 {
                        return Err(EofError::StackOverflow(pos));
                    }
                    if callee.is_non_returning() {
                        if min < callee.inputs as u16 {
                            return Err(EofError::StackUnderflow(pos));
                        }
                    } else {
                        if meta.is_non_returning() {
                            return Err(EofError::InvalidJumpf(pos));
                        }
                        let expected = meta.outputs as u16 + callee.inputs as u16
                            - callee.outputs as u16;
                        if min != expected || max != expected {
                            return Err(EofError::StackHeightMismatch(pos));
                        }
                    }
                    (0, 0)
                }
                // DUPN duplicates the (imm+1)-th item.
                0xE6 => {
                    let n = code[pos + 1] as u16 + 1;
                    (n, n + 1)
                }
                // SWAPN swaps the top with the (imm+2)-th item.
                0xE7 => {
                    let n = code[pos + 1] as u16 + 2;
                    (n, n)
                }
                // EXCHANGE swaps the (n+1)-th and (n+m+1)-th items.
                0xE8 => {
                    let imm_byte = code[pos + 1];
                    let n = (imm_byte >> 4) as u16 + 1;
                    let m = (imm_byte & 0x0F) as u16 + 1;
                    (n + m + 1, n + m + 1)
                }
                _ => (info.inputs as u16, info.outputs as u16),
            };

            if min < inputs {
                return Err(EofError::StackUnderflow(pos));
            }
            let new_min = min - inputs + outputs;
            let new_max = max - inputs + outputs;
            if new_max > MAX_STACK_HEIGHT as u16 {
                return Err(EofError::StackOverflow(pos));
            }
            highest = highest.max(new_max);

            let next = pos + 1 + imm;

            // Record relative-jump successors.
            for target in jump_targets(code, pos)? {
                debug_assert!(starts[target]);
                if target <= pos {
                    // Backward edge: heights must already agree exactly.
                    if bounds[target] != Some((new_min, new_max)) {
                        return Err(EofError::StackHeightMismatch(pos));
                    }
                } else {
                    merge_bounds(&mut bounds[target], new_min, new_max);
                }
            }

            if !info.terminating {
                if next >= code.len() {
                    return Err(EofError::MissingTerminator(section));
                }
                merge_bounds(&mut bounds[next], new_min, new_max);
            }

            pos = next;
        }

        if highest != meta.max_stack_height {
            return Err(EofError::MaxStackHeightMismatch(section));
        }

        Ok(())
    }
}

fn merge_bounds(slot: &mut Option<(u16, u16)>, min: u16, max: u16) {
    match slot {
        Some((existing_min, existing_max)) => {
            *existing_min = (*existing_min).min(min);
            *existing_max = (*existing_max).max(max);
        }
        None => *slot = Some((min, max)),
    }
}

/// Immediate byte count of the instruction at `pos`, including RJUMPV's
/// variable jump table.
pub fn immediate_size(code: &[u8], pos: usize) -> Result<usize, EofError> {
    let op = code[pos];
    Ok(match op {
        0x60..=0x7F => (op - 0x5F) as usize,
        // RJUMP, RJUMPI, CALLF, JUMPF, DATALOADN
        0xE0 | 0xE1 | 0xE3 | 0xE5 | 0xD1 => 2,
        // RJUMPV: max_index byte plus (max_index + 1) two-byte offsets
        0xE2 => {
            let max_index = *code
                .get(pos + 1)
                .ok_or(EofError::TruncatedImmediate(pos))? as usize;
            1 + 2 * (max_index + 1)
        }
        // DUPN, SWAPN, EXCHANGE, EOFCREATE, RETURNCONTRACT
        0xE6 | 0xE7 | 0xE8 | 0xEC | 0xEE => 1,
        _ => 0,
    })
}

/// Targets of the relative-jump instruction at `pos` (empty for all others).
fn jump_targets(code: &[u8], pos: usize) -> Result<Vec<usize>, EofError> {
    let op = code[pos];
    let mut targets = Vec::new();
    match op {
        0xE0 | 0xE1 => {
            let rel = i16::from_be_bytes([code[pos + 1], code[pos + 2]]);
            targets.push(relative_target(code, pos, 3, rel)?);
        }
        0xE2 => {
            let max_index = code[pos + 1] as usize;
            let end = pos + 2 + 2 * (max_index + 1);
            for i in 0..=max_index {
                let at = pos + 2 + 2 * i;
                let rel = i16::from_be_bytes([code[at], code[at + 1]]);
                targets.push(relative_target_from(code, end, rel, pos)?);
            }
        }
        _ => {}
    }
    Ok(targets)
}

fn relative_target(code: &[u8], pos: usize, len: usize, rel: i16) -> Result<usize, EofError> {
    relative_target_from(code, pos + len, rel, pos)
}

fn relative_target_from(
    code: &[u8],
    from: usize,
    rel: i16,
    pos: usize,
) -> Result<usize, EofError> {
    let target = from as i64 + rel as i64;
    if target < 0 || target as usize >= code.len() {
        return Err(EofError::InvalidJumpTarget(pos));
    }
    Ok(target as usize)
}

struct InstrInfo {
    inputs: u8,
    outputs: u8,
    terminating: bool,
}

const fn io(inputs: u8, outputs: u8) -> Option<InstrInfo> {
    Some(InstrInfo {
        inputs,
        outputs,
        terminating: false,
    })
}

const fn term(inputs: u8) -> Option<InstrInfo> {
    Some(InstrInfo {
        inputs,
        outputs: 0,
        terminating: true,
    })
}

/// Stack effect and termination class of each opcode defined under EOF.
/// `None` marks opcodes rejected by validation, including every deprecated
/// legacy instruction (dynamic jumps, GAS, code introspection, the legacy
/// call and create family, SELFDESTRUCT).
fn instr_info(op: u8) -> Option<InstrInfo> {
    match op {
        0x00 => term(0),                       // STOP
        0x01..=0x07 => io(2, 1),               // ADD..SMOD
        0x08 | 0x09 => io(3, 1),               // ADDMOD, MULMOD
        0x0A | 0x0B => io(2, 1),               // EXP, SIGNEXTEND
        0x10..=0x14 => io(2, 1),               // LT..EQ
        0x15 => io(1, 1),                      // ISZERO
        0x16..=0x18 => io(2, 1),               // AND, OR, XOR
        0x19 => io(1, 1),                      // NOT
        0x1A..=0x1D => io(2, 1),               // BYTE, SHL, SHR, SAR
        0x20 => io(2, 1),                      // KECCAK256
        0x30 => io(0, 1),                      // ADDRESS
        0x31 => io(1, 1),                      // BALANCE
        0x32..=0x34 => io(0, 1),               // ORIGIN, CALLER, CALLVALUE
        0x35 => io(1, 1),                      // CALLDATALOAD
        0x36 => io(0, 1),                      // CALLDATASIZE
        0x37 => io(3, 0),                      // CALLDATACOPY
        0x3A => io(0, 1),                      // GASPRICE
        0x3D => io(0, 1),                      // RETURNDATASIZE
        0x3E => io(3, 0),                      // RETURNDATACOPY
        0x40 => io(1, 1),                      // BLOCKHASH
        0x41..=0x48 => io(0, 1),               // COINBASE..BASEFEE
        0x49 => io(1, 1),                      // BLOBHASH
        0x4A => io(0, 1),                      // BLOBBASEFEE
        0x50 => io(1, 0),                      // POP
        0x51 => io(1, 1),                      // MLOAD
        0x52 | 0x53 => io(2, 0),               // MSTORE, MSTORE8
        0x54 => io(1, 1),                      // SLOAD
        0x55 => io(2, 0),                      // SSTORE
        0x59 => io(0, 1),                      // MSIZE
        0x5C => io(1, 1),                      // TLOAD
        0x5D => io(2, 0),                      // TSTORE
        0x5E => io(3, 0),                      // MCOPY
        0x5F..=0x7F => io(0, 1),               // PUSH0..PUSH32
        0x80..=0x8F => io(op - 0x80 + 1, op - 0x80 + 2), // DUP1..DUP16
        0x90..=0x9F => io(op - 0x90 + 2, op - 0x90 + 2), // SWAP1..SWAP16
        0xA0..=0xA4 => io(op - 0xA0 + 2, 0),   // LOG0..LOG4
        0xD0 => io(1, 1),                      // DATALOAD
        0xD1 => io(0, 1),                      // DATALOADN
        0xD2 => io(0, 1),                      // DATASIZE
        0xD3 => io(3, 0),                      // DATACOPY
        0xE0 => term(0),                       // RJUMP (no fallthrough)
        0xE1 => io(1, 0),                      // RJUMPI
        0xE2 => io(1, 0),                      // RJUMPV
        0xE3 => io(0, 0),                      // CALLF (handled specially)
        0xE4 => term(0),                       // RETF (handled specially)
        0xE5 => term(0),                       // JUMPF (handled specially)
        0xE6 => io(0, 1),                      // DUPN (handled specially)
        0xE7 => io(0, 0),                      // SWAPN (handled specially)
        0xE8 => io(0, 0),                      // EXCHANGE (handled specially)
        0xEC => io(4, 1),                      // EOFCREATE
        0xEE => term(2),                       // RETURNCONTRACT
        0xF3 => term(2),                       // RETURN
        0xF7 => io(1, 1),                      // RETURNDATALOAD
        0xF8 => io(4, 1),                      // EXTCALL
        0xF9 => io(3, 1),                      // EXTDELEGATECALL
        0xFB => io(3, 1),                      // EXTSTATICCALL
        0xFD => term(2),                       // REVERT
        0xFE => term(0),                       // INVALID
        _ => None,
    }
}

/// Rewrite the data-size field of a container header in place. Used by
/// RETURNCONTRACT, which appends aux data to the deployed container and must
/// keep the header consistent with the final data section length.
pub fn patch_data_size(container: &mut [u8], new_size: u16) -> Result<(), EofError> {
    let mut cursor = Cursor::new(container, 3);
    cursor.expect_kind(KIND_TYPES)?;
    cursor.read_u16()?;
    cursor.expect_kind(KIND_CODE)?;
    let code_count = cursor.read_u16()? as usize;
    for _ in 0..code_count {
        cursor.read_u16()?;
    }
    if cursor.peek()? == KIND_CONTAINER {
        cursor.advance();
        let container_count = cursor.read_u16()? as usize;
        for _ in 0..container_count {
            cursor.read_u16()?;
        }
    }
    cursor.expect_kind(KIND_DATA)?;
    let at = cursor.offset;
    container
        .get_mut(at..at + 2)
        .ok_or(EofError::TruncatedHeader)?
        .copy_from_slice(&new_size.to_be_bytes());
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    fn peek(&self) -> Result<u8, EofError> {
        self.bytes
            .get(self.offset)
            .copied()
            .ok_or(EofError::TruncatedHeader)
    }

    fn advance(&mut self) {
        self.offset += 1;
    }

    fn expect_kind(&mut self, kind: u8) -> Result<(), EofError> {
        let found = self.peek()?;
        if found != kind {
            return Err(EofError::UnexpectedSectionKind {
                expected: kind,
                found,
            });
        }
        self.advance();
        Ok(())
    }

    fn read_u16(&mut self) -> Result<u16, EofError> {
        let bytes = self
            .bytes
            .get(self.offset..self.offset + 2)
            .ok_or(EofError::TruncatedHeader)?;
        self.offset += 2;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], EofError> {
        let bytes = self
            .bytes
            .get(self.offset..self.offset + len)
            .ok_or(EofError::TruncatedBody)?;
        self.offset += len;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(hex_str: &str) -> Bytes {
        Bytes::from(hex::decode(hex_str).unwrap())
    }

    #[test]
    fn minimal_container_parses_and_validates() {
        // One code section holding a single STOP.
        let container = EofContainer::parse_and_validate(
            decode("EF00010100040200010001040000000080000000"),
            ContainerKind::Runtime,
        )
        .unwrap();
        assert_eq!(container.code_sections.len(), 1);
        assert_eq!(container.code_sections[0].as_ref(), &[0x00]);
        assert_eq!(container.declared_data_size, 0);
    }

    #[test]
    fn rjump_loop_validates() {
        // RJUMP back to its own start: valid, non-falling-through.
        EofContainer::parse_and_validate(
            decode("EF000101000402000100030400000000800000E0FFFD"),
            ContainerKind::Runtime,
        )
        .unwrap();
    }

    #[test]
    fn callf_container_validates() {
        // Section 0: PUSH1 0x2A, CALLF -> section 1, STOP.
        // Section 1: one input, one output, RETF.
        EofContainer::parse_and_validate(
            decode("EF000101000802000200060001040000000080000101010001602AE3000100E4"),
            ContainerKind::Runtime,
        )
        .unwrap();
    }

    #[test]
    fn initcode_container_with_subcontainer_validates() {
        // PUSH0 PUSH0 RETURNCONTRACT(0), deploying a minimal container.
        EofContainer::parse_and_validate(
            decode(
                "EF00010100040200010004030001001404000000008000025F5FEE00\
                 EF00010100040200010001040000000080000000",
            ),
            ContainerKind::Initcode,
        )
        .unwrap();
    }

    #[test]
    fn dataloadn_reads_declared_data() {
        // DATALOADN 0x0000, STOP over a 33-byte data section.
        EofContainer::parse_and_validate(
            decode(
                "EF000101000402000100040400210000800001D1000000\
                 454F462068617320736F6D65206772656174206578616D706C6573206865726521",
            ),
            ContainerKind::Runtime,
        )
        .unwrap();
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        assert_eq!(
            EofContainer::parse(decode("EF01")).unwrap_err(),
            EofError::InvalidMagic
        );
        assert_eq!(
            EofContainer::parse(decode("EF0002")).unwrap_err(),
            EofError::UnsupportedVersion(2)
        );
    }

    #[test]
    fn rejects_legacy_instructions() {
        // Single JUMP (0x56) in the code section.
        let err = EofContainer::parse_and_validate(
            decode("EF00010100040200010001040000000080000056"),
            ContainerKind::Runtime,
        )
        .unwrap_err();
        assert!(matches!(err, EofError::UndefinedInstruction { opcode: 0x56, .. }));
    }

    #[test]
    fn rejects_truncated_push_immediate() {
        // PUSH2 with a single immediate byte.
        let err = EofContainer::parse_and_validate(
            decode("EF00010100040200010002040000000080000161FF"),
            ContainerKind::Runtime,
        )
        .unwrap_err();
        assert!(matches!(err, EofError::TruncatedImmediate(_)));
    }

    #[test]
    fn rejects_missing_terminator() {
        // Section ends after an ADD with no halting instruction.
        let err = EofContainer::parse_and_validate(
            decode("EF0001010004020001000504000000008000026001600201"),
            ContainerKind::Runtime,
        )
        .unwrap_err();
        assert!(matches!(err, EofError::MissingTerminator(_)));
    }

    #[test]
    fn rejects_declared_stack_height_mismatch() {
        // PUSH0 STOP but declares max stack height 2.
        let err = EofContainer::parse_and_validate(
            decode("EF0001010004020001000204000000008000025F00"),
            ContainerKind::Runtime,
        )
        .unwrap_err();
        assert_eq!(err, EofError::MaxStackHeightMismatch(0));
    }

    #[test]
    fn rejects_stack_underflow() {
        // Bare ADD with an empty stack.
        let err = EofContainer::parse_and_validate(
            decode("EF0001010004020001000204000000008000000100"),
            ContainerKind::Runtime,
        )
        .unwrap_err();
        assert_eq!(err, EofError::StackUnderflow(0));
    }

    #[test]
    fn rejects_returncontract_in_runtime_code() {
        let err = EofContainer::parse_and_validate(
            decode(
                "EF00010100040200010004030001001404000000008000025F5FEE00\
                 EF00010100040200010001040000000080000000",
            ),
            ContainerKind::Runtime,
        )
        .unwrap_err();
        assert!(matches!(err, EofError::IncompatibleContainerKind(_)));
    }
}
