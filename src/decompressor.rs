//! Decompressor front door
//!
//! A `Decompressor` owns the configuration and a handle to the shared state
//! store. Each call to `decompress` builds a fresh arena, loads the program
//! (uploaded bytecode, or bytecode held in a stored state item), runs it and
//! reports the outcome. Handles are cheap to clone; clones share the store.

use crate::config::UdvmConfig;
use crate::dictionary::seed_builtin_dictionaries;
use crate::error::{ConfigError, DecompressionError, FailureReason};
use crate::feedback::{RequestedFeedback, ReturnedParameters};
use crate::interpreter::Interpreter;
use crate::memory::MEMORY_SIZE;
use crate::state::{SharedStateStore, StateIdentifier, StateStore};
use crate::trace::TraceSink;
use crate::vm::{Registers, Vm};
use log::{debug, info};
use std::sync::Arc;

/// Where the UDVM program comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// Bytecode uploaded with the message
    Bytecode {
        code: Vec<u8>,
        /// Address the code is loaded at
        destination: u16,
        /// First instruction executed
        start: u16,
    },
    /// Bytecode held in a stored state item
    State { partial_identifier: Vec<u8> },
}

impl Program {
    /// Uploaded bytecode that starts executing at its first byte
    pub fn bytecode(code: impl Into<Vec<u8>>, destination: u16) -> Self {
        Program::Bytecode {
            code: code.into(),
            destination,
            start: destination,
        }
    }

    /// Uploaded bytecode located by the 4-bit destination field of the
    /// SigComp header: (field + 1) * 64. Field value 0 is reserved.
    pub fn from_destination_field(
        code: impl Into<Vec<u8>>,
        field: u8,
    ) -> Result<Self, FailureReason> {
        if field == 0 || field > 0x0F {
            debug!("invalid destination field {}", field);
            return Err(FailureReason::JumpOutsideMemory);
        }
        Ok(Self::bytecode(code, (field as u16 + 1) * 64))
    }

    pub fn state(partial_identifier: impl Into<Vec<u8>>) -> Self {
        Program::State {
            partial_identifier: partial_identifier.into(),
        }
    }

    /// Default header length for the cycle budget
    fn header_length(&self) -> usize {
        match self {
            Program::Bytecode { code, .. } => code.len(),
            Program::State { partial_identifier } => partial_identifier.len(),
        }
    }
}

/// One message to decompress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressRequest {
    pub program: Program,
    /// Compressed payload
    pub message: Vec<u8>,
    /// SigComp header bytes counted by the cycle budget; defaults to the
    /// program (or identifier) length
    pub header_length: Option<usize>,
}

impl DecompressRequest {
    pub fn new(program: Program, message: impl Into<Vec<u8>>) -> Self {
        DecompressRequest {
            program,
            message: message.into(),
            header_length: None,
        }
    }

    pub fn with_header_length(mut self, header_length: usize) -> Self {
        self.header_length = Some(header_length);
        self
    }
}

/// A successfully decompressed message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageOutcome {
    pub output: Vec<u8>,
    pub requested_feedback: Option<RequestedFeedback>,
    pub returned_parameters: Option<ReturnedParameters>,
    /// Identifiers of the state items committed by this message
    pub created_states: Vec<StateIdentifier>,
    pub cycles_used: u64,
    pub instructions_executed: u64,
}

#[derive(Debug, Clone)]
pub struct Decompressor {
    config: UdvmConfig,
    store: SharedStateStore,
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::seeded(UdvmConfig::default())
    }
}

impl Decompressor {
    /// A decompressor with its own store, seeded with the built-in dictionaries.
    /// Fails if `config` does not pass `UdvmConfig::validate`.
    pub fn new(config: UdvmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::seeded(config))
    }

    /// A decompressor sharing an existing store
    pub fn with_store(config: UdvmConfig, store: SharedStateStore) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Decompressor { config, store })
    }

    fn seeded(config: UdvmConfig) -> Self {
        let mut store = StateStore::with_capacity(config.state_memory_size);
        seed_builtin_dictionaries(&mut store, config.dictionary_dir.as_deref());
        info!(
            "decompressor ready: cycles_per_bit {}, {} built-in states",
            config.cycles_per_bit,
            store.len()
        );
        Decompressor {
            config,
            store: store.into_shared(),
        }
    }

    pub fn config(&self) -> &UdvmConfig {
        &self.config
    }

    pub fn store(&self) -> SharedStateStore {
        Arc::clone(&self.store)
    }

    pub fn decompress(
        &self,
        request: &DecompressRequest,
    ) -> Result<MessageOutcome, DecompressionError> {
        self.run(request, None)
    }

    /// Decompress while reporting every step to `sink`
    pub fn decompress_traced(
        &self,
        request: &DecompressRequest,
        sink: &mut dyn TraceSink,
    ) -> Result<MessageOutcome, DecompressionError> {
        self.run(request, Some(sink))
    }

    fn run(
        &self,
        request: &DecompressRequest,
        sink: Option<&mut dyn TraceSink>,
    ) -> Result<MessageOutcome, DecompressionError> {
        let vm = self.prepare(&request.program)?;
        let header_length = request
            .header_length
            .unwrap_or_else(|| request.program.header_length());

        let mut interpreter =
            Interpreter::new(vm, &request.message, header_length, &self.store, &self.config);
        if let Some(sink) = sink {
            interpreter = interpreter.with_trace(sink);
        }
        let end = interpreter.run()?;
        Ok(MessageOutcome {
            output: interpreter.output().to_vec(),
            requested_feedback: end.requested_feedback,
            returned_parameters: end.returned_parameters,
            created_states: end.committed,
            cycles_used: interpreter.cycles_used(),
            instructions_executed: interpreter.instruction_count(),
        })
    }

    /// Build the arena: registers, then the program
    fn prepare(&self, program: &Program) -> Result<Vm, DecompressionError> {
        let mut registers = Registers {
            cycles_per_bit: self.config.cycles_per_bit,
            sigcomp_version: self.config.sigcomp_version,
            ..Registers::default()
        };

        match program {
            Program::Bytecode {
                code,
                destination,
                start,
            } => {
                if *destination as usize + code.len() > MEMORY_SIZE {
                    debug!(
                        "{} bytes of bytecode do not fit at 0x{:04x}",
                        code.len(),
                        destination
                    );
                    return Err(DecompressionError::new(
                        FailureReason::JumpOutsideMemory,
                        *destination,
                        None,
                    ));
                }
                let mut vm = Vm::new(registers);
                vm.memory.load(*destination, code);
                vm.pc = *start;
                Ok(vm)
            }
            Program::State { partial_identifier } => {
                let item = self.store.lock().lookup(partial_identifier)?;
                let value = item.value();
                if item.state_address() as usize + value.len() > MEMORY_SIZE {
                    return Err(DecompressionError::new(
                        FailureReason::JumpOutsideMemory,
                        item.state_address(),
                        None,
                    ));
                }
                registers.partial_id_length = partial_identifier.len() as u16;
                registers.state_length = item.state_length();
                let mut vm = Vm::new(registers);
                vm.memory.load(item.state_address(), value);
                vm.pc = item.state_instruction();
                debug!(
                    "loaded {} bytes of state bytecode at 0x{:04x}, start 0x{:04x}",
                    value.len(),
                    item.state_address(),
                    vm.pc
                );
                Ok(vm)
            }
        }
    }
}
