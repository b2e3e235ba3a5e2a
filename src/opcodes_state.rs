/// State and output operations for the UDVM
///
/// STATE-ACCESS copies a stored state item into memory. STATE-CREATE and
/// END-MESSAGE queue new state, which is only written to the store once the
/// message ends successfully. STATE-FREE follows the configured policy.
/// OUTPUT appends to the decompressed message.
use crate::config::StateFreePolicy;
use crate::error::FailureReason;
use crate::feedback::{RequestedFeedback, ReturnedParameters};
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter, MessageEnd, PendingState};
use crate::opcode_tables::Opcode;
use crate::state::{build_record, validate_partial_id_length};
use crate::trace::TraceEvent;
use log::debug;

impl<'a> Interpreter<'a> {
    /// Handle state and output opcodes
    pub fn execute_state_op(
        &mut self,
        inst: &Instruction,
    ) -> Result<ExecutionResult, FailureReason> {
        match inst.opcode {
            Opcode::StateAccess => self.state_access(inst),

            // STATE-CREATE (%state_length, %state_address, %state_instruction,
            //   %minimum_access_length, %state_retention_priority)
            Opcode::StateCreate => {
                let request = Self::pending_state(
                    inst.value(0),
                    inst.value(1),
                    inst.value(2),
                    inst.value(3),
                    inst.value(4),
                )?;
                self.charge(request.length as u64)?;
                self.request_state(request)?;
                Ok(ExecutionResult::Continue(inst.next))
            }

            // STATE-FREE (%partial_identifier_start, %partial_identifier_length)
            Opcode::StateFree => {
                let length = inst.value(1);
                validate_partial_id_length(length as usize)?;
                if self.config.state_free == StateFreePolicy::Remove {
                    let partial = self.vm.memory.read_bytes(inst.value(0), length as usize);
                    let removed = self.store.lock().free(&partial)?;
                    debug!("STATE-FREE {:02x?}: removed = {}", partial, removed);
                }
                Ok(ExecutionResult::Continue(inst.next))
            }

            // OUTPUT (%output_start, %output_length)
            Opcode::Output => {
                let length = inst.value(1);
                self.charge(length as u64)?;
                let bytes = self.vm.memory.read_circular(inst.value(0), length);
                self.output.extend_from_slice(&bytes);
                self.emit(TraceEvent::Output {
                    length: bytes.len(),
                });
                Ok(ExecutionResult::Continue(inst.next))
            }

            Opcode::EndMessage => self.end_message(inst),

            _ => Err(FailureReason::NotImplemented),
        }
    }

    /// Validate the operands of a state creation request
    fn pending_state(
        length: u16,
        address: u16,
        instruction: u16,
        minimum_access_length: u16,
        retention_priority: u16,
    ) -> Result<PendingState, FailureReason> {
        validate_partial_id_length(minimum_access_length as usize)?;
        if retention_priority == u16::MAX {
            return Err(FailureReason::InvalidRetentionPriority);
        }
        Ok(PendingState {
            length,
            address,
            instruction,
            minimum_access_length,
            retention_priority,
        })
    }

    /// STATE-ACCESS (%partial_identifier_start, %partial_identifier_length,
    ///   %state_begin, %state_length, %state_address, %state_instruction)
    fn state_access(&mut self, inst: &Instruction) -> Result<ExecutionResult, FailureReason> {
        let id_length = inst.value(1);
        let state_begin = inst.value(2);
        let mut state_length = inst.value(3);
        let mut state_address = inst.value(4);
        let mut state_instruction = inst.value(5);

        validate_partial_id_length(id_length as usize)?;
        let partial = self
            .vm
            .memory
            .read_bytes(inst.value(0), id_length as usize);
        let item = self.store.lock().lookup(&partial)?;

        if state_length == 0 {
            if state_begin != 0 {
                return Err(FailureReason::StateBeginWithoutLength);
            }
            state_length = item.state_length();
        }
        if state_address == 0 {
            state_address = item.state_address();
        }
        if state_instruction == 0 {
            state_instruction = item.state_instruction();
        }

        let begin = state_begin as usize;
        let end = begin + state_length as usize;
        let value = item.value();
        if end > value.len() {
            debug!(
                "state {:02x?} holds {} bytes, access wants {}..{}",
                partial,
                value.len(),
                begin,
                end
            );
            return Err(FailureReason::StateTooShort);
        }
        self.charge(state_length as u64)?;
        self.vm
            .memory
            .write_circular(state_address, &value[begin..end]);
        self.emit(TraceEvent::StateAccessed {
            identifier: partial,
            length: state_length,
        });

        if state_instruction != 0 {
            Ok(ExecutionResult::Jump(state_instruction))
        } else {
            Ok(ExecutionResult::Continue(inst.next))
        }
    }

    /// END-MESSAGE (%requested_feedback_location, %returned_parameters_location,
    ///   %state_length, %state_address, %state_instruction,
    ///   %minimum_access_length, %state_retention_priority)
    fn end_message(&mut self, inst: &Instruction) -> Result<ExecutionResult, FailureReason> {
        let feedback_location = inst.value(0);
        let parameters_location = inst.value(1);
        let state_length = inst.value(2);
        self.charge(state_length as u64)?;

        if state_length != 0 {
            let request = Self::pending_state(
                state_length,
                inst.value(3),
                inst.value(4),
                inst.value(5),
                inst.value(6),
            )?;
            self.request_state(request)?;
        }

        let requested_feedback = if feedback_location != 0 {
            Some(RequestedFeedback::parse(&self.vm.memory, feedback_location))
        } else {
            None
        };
        let returned_parameters = if parameters_location != 0 {
            Some(ReturnedParameters::parse(
                &self.vm.memory,
                parameters_location,
            ))
        } else {
            None
        };

        // Snapshot every record first, then commit them under one lock
        let records: Vec<(Vec<u8>, u16)> = self
            .pending
            .iter()
            .map(|p| {
                let value = self.vm.memory.read_circular(p.address, p.length);
                (
                    build_record(p.address, p.instruction, p.minimum_access_length, &value),
                    p.retention_priority,
                )
            })
            .collect();
        self.pending.clear();

        let committed: Vec<_> = {
            let mut store = self.store.lock();
            records
                .into_iter()
                .map(|(record, priority)| store.commit(record, priority))
                .collect()
        };
        for identifier in &committed {
            self.emit(TraceEvent::StateCommitted {
                identifier: *identifier,
            });
        }

        Ok(ExecutionResult::Halt(MessageEnd {
            requested_feedback,
            returned_parameters,
            committed,
        }))
    }

    /// Check if an opcode touches state or output
    pub fn is_state_opcode(opcode: Opcode) -> bool {
        matches!(
            opcode,
            Opcode::StateAccess
                | Opcode::StateCreate
                | Opcode::StateFree
                | Opcode::Output
                | Opcode::EndMessage
        )
    }
}
