use crate::bit_input::BitInput;
use crate::config::UdvmConfig;
use crate::cycles::CycleBudget;
use crate::error::{DecompressionError, FailureReason};
use crate::feedback::{RequestedFeedback, ReturnedParameters};
use crate::instruction::Instruction;
use crate::state::{SharedStateStore, StateIdentifier};
use crate::trace::{TraceEvent, TraceSink};
use crate::vm::Vm;
use log::{debug, trace};

/// Most state creation requests a single message may make
pub const MAX_PENDING_STATES: usize = 4;

/// Control signal returned by every instruction handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Fall through to the given address
    Continue(u16),
    /// Transfer control to the given address
    Jump(u16),
    /// END-MESSAGE reached
    Halt(MessageEnd),
}

/// What END-MESSAGE hands back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageEnd {
    pub requested_feedback: Option<RequestedFeedback>,
    pub returned_parameters: Option<ReturnedParameters>,
    /// Identifiers of the states committed at END-MESSAGE
    pub committed: Vec<StateIdentifier>,
}

/// A STATE-CREATE request waiting for END-MESSAGE. The bytes are read from
/// memory when the message ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingState {
    pub length: u16,
    pub address: u16,
    pub instruction: u16,
    pub minimum_access_length: u16,
    pub retention_priority: u16,
}

/// Executes one message's bytecode
pub struct Interpreter<'a> {
    /// The VM state
    pub vm: Vm,
    pub(crate) input: BitInput<'a>,
    pub(crate) output: Vec<u8>,
    pub(crate) cycles: CycleBudget,
    pub(crate) pending: Vec<PendingState>,
    pub(crate) store: &'a SharedStateStore,
    pub(crate) config: &'a UdvmConfig,
    trace: Option<&'a mut dyn TraceSink>,
    /// Instruction count for debugging
    instruction_count: u64,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter over a prepared VM. `header_length` counts toward
    /// the cycle budget along with the message.
    pub fn new(
        vm: Vm,
        message: &'a [u8],
        header_length: usize,
        store: &'a SharedStateStore,
        config: &'a UdvmConfig,
    ) -> Self {
        Interpreter {
            vm,
            input: BitInput::new(message),
            output: Vec::new(),
            cycles: CycleBudget::new(config.cycles_per_bit, header_length, message.len()),
            pending: Vec::with_capacity(MAX_PENDING_STATES),
            store,
            config,
            trace: None,
            instruction_count: 0,
        }
    }

    /// Attach a trace sink for this run
    pub fn with_trace(mut self, sink: &'a mut dyn TraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn cycles_used(&self) -> u64 {
        self.cycles.used()
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub(crate) fn emit(&mut self, event: TraceEvent) {
        if let Some(sink) = self.trace.as_mut() {
            sink.record(event);
        }
    }

    /// Spend cycles on behalf of the current instruction
    pub(crate) fn charge(&mut self, cycles: u64) -> Result<(), FailureReason> {
        self.cycles.charge(cycles)
    }

    /// Queue a state creation request, enforcing the per-message limit
    pub(crate) fn request_state(&mut self, request: PendingState) -> Result<(), FailureReason> {
        if self.pending.len() >= MAX_PENDING_STATES {
            debug!("state creation request #{} refused", self.pending.len() + 1);
            return Err(FailureReason::TooManyStateRequests);
        }
        self.emit(TraceEvent::StateCreateRequested {
            length: request.length,
            address: request.address,
        });
        self.pending.push(request);
        Ok(())
    }

    /// Run until END-MESSAGE or a failure
    pub fn run(&mut self) -> Result<MessageEnd, DecompressionError> {
        debug!(
            "starting UDVM at 0x{:04x}, cycle budget {}",
            self.vm.pc,
            self.cycles.maximum()
        );
        loop {
            let pc = self.vm.pc;
            match self.step() {
                Ok(Some(end)) => {
                    debug!(
                        "END-MESSAGE after {} instructions, {} cycles, {} output bytes",
                        self.instruction_count,
                        self.cycles.used(),
                        self.output.len()
                    );
                    return Ok(end);
                }
                Ok(None) => {}
                Err(reason) => return Err(self.failure(pc, reason)),
            }
        }
    }

    /// Fetch, decode and execute one instruction. Returns the END-MESSAGE
    /// result when the program finishes.
    pub fn step(&mut self) -> Result<Option<MessageEnd>, FailureReason> {
        let pc = self.vm.pc;
        let inst = Instruction::decode(&self.vm.memory, pc)?;
        self.charge(1)?;
        self.instruction_count += 1;

        trace!("[{:04x}] {}", pc, inst);
        let cycles_used = self.cycles.used();
        self.emit(TraceEvent::Instruction {
            pc,
            opcode: inst.opcode,
            cycles_used,
        });

        match self.execute_instruction(&inst)? {
            ExecutionResult::Continue(next) => {
                self.vm.pc = next;
                Ok(None)
            }
            ExecutionResult::Jump(target) => {
                self.emit(TraceEvent::Jump {
                    from: pc,
                    to: target,
                });
                self.vm.pc = target;
                Ok(None)
            }
            ExecutionResult::Halt(end) => Ok(Some(end)),
        }
    }

    /// Route an instruction to its opcode family
    pub fn execute_instruction(
        &mut self,
        inst: &Instruction,
    ) -> Result<ExecutionResult, FailureReason> {
        if Interpreter::is_math_opcode(inst.opcode) {
            self.execute_math_op(inst)
        } else if Interpreter::is_memory_opcode(inst.opcode) {
            self.execute_memory_op(inst)
        } else if Interpreter::is_control_opcode(inst.opcode) {
            self.execute_control_op(inst)
        } else if Interpreter::is_input_opcode(inst.opcode) {
            self.execute_input_op(inst)
        } else if Interpreter::is_state_opcode(inst.opcode) {
            self.execute_state_op(inst)
        } else {
            debug!("no handler for {}", inst.opcode.name());
            Err(FailureReason::NotImplemented)
        }
    }

    fn failure(&mut self, pc: u16, reason: FailureReason) -> DecompressionError {
        debug!(
            "decompression failed at 0x{:04x} after {} instructions: {}",
            pc, self.instruction_count, reason
        );
        self.emit(TraceEvent::Failed { pc, reason });
        let mut error =
            DecompressionError::new(reason, pc, Some(self.vm.memory.read_byte(pc)));
        error.partial_output = std::mem::take(&mut self.output);
        error
    }
}
