//! Execution trace events
//!
//! A decode can be observed step by step by handing the interpreter a
//! `TraceSink`. Nothing is recorded unless a sink is supplied.

use crate::error::FailureReason;
use crate::opcode_tables::Opcode;
use log::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// About to execute the instruction at `pc`
    Instruction {
        pc: u16,
        opcode: Opcode,
        cycles_used: u64,
    },
    /// Control left the sequential instruction stream
    Jump { from: u16, to: u16 },
    Output { length: usize },
    StateAccessed { identifier: Vec<u8>, length: u16 },
    StateCreateRequested { length: u16, address: u16 },
    StateCommitted { identifier: [u8; 20] },
    Failed { pc: u16, reason: FailureReason },
}

pub trait TraceSink {
    fn record(&mut self, event: TraceEvent);
}

impl<F> TraceSink for F
where
    F: FnMut(TraceEvent),
{
    fn record(&mut self, event: TraceEvent) {
        self(event)
    }
}

/// Forwards every event to the `log` facade at trace level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::Instruction {
                pc,
                opcode,
                cycles_used,
            } => trace!("[{:04x}] {} (cycles {})", pc, opcode.name(), cycles_used),
            TraceEvent::Jump { from, to } => trace!("jump {:04x} -> {:04x}", from, to),
            TraceEvent::Output { length } => trace!("output {} bytes", length),
            TraceEvent::StateAccessed { identifier, length } => {
                trace!("state access {:02x?} ({} bytes)", identifier, length)
            }
            TraceEvent::StateCreateRequested { length, address } => {
                trace!("state create {} bytes at {:04x}", length, address)
            }
            TraceEvent::StateCommitted { identifier } => {
                trace!("state committed {:02x?}", identifier)
            }
            TraceEvent::Failed { pc, reason } => trace!("failed at {:04x}: {}", pc, reason),
        }
    }
}

/// Collects events in memory
#[derive(Debug, Default, Clone)]
pub struct VecTrace {
    pub events: Vec<TraceEvent>,
}

impl VecTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opcodes in execution order
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Instruction { opcode, .. } => Some(*opcode),
                _ => None,
            })
            .collect()
    }
}

impl TraceSink for VecTrace {
    fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}
