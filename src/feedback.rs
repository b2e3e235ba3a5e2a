//! END-MESSAGE feedback areas (RFC 3320 section 9.4.9)
//!
//! ```text
//!   requested_feedback_location      returned_parameters_location
//!   +---+---+---+---+---+---+---+---+ +---+---+---+---+---+---+---+---+
//!   |     reserved      | Q | S | I | |  cpb  |    dms    |    sms    |
//!   +---+---+---+---+---+---+---+---+ +---+---+---+---+---+---+---+---+
//!   :    requested feedback item    : |        SigComp_version        |
//!   :          (if Q = 1)           : +---+---+---+---+---+---+---+---+
//!   +---+---+---+---+---+---+---+---+ | length_of_partial_state_ID_1  |
//!                                     :  partial_state_identifier_1   :
//!                                     :              ...              :
//! ```

use crate::memory::{Memory, MEMORY_SIZE};
use crate::state::{STATE_MAX_ACCESS_LEN, STATE_MIN_ACCESS_LEN};

const FLAG_Q: u8 = 0x04;
const FLAG_S: u8 = 0x02;
const FLAG_I: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestedFeedback {
    /// S: the remote compressor should not create state for this endpoint
    pub state_not_needed: bool,
    /// I: the local endpoint's advertised state identifiers are not needed
    pub identifiers_not_needed: bool,
    /// Feedback item to echo back when Q is set, first byte included
    pub item: Option<Vec<u8>>,
}

impl RequestedFeedback {
    pub fn parse(memory: &Memory, location: u16) -> Self {
        let flags = memory.read_byte(location);
        let item = if flags & FLAG_Q != 0 {
            let at = location.wrapping_add(1);
            let first = memory.read_byte(at);
            let length = if first & 0x80 == 0 {
                1
            } else {
                1 + (first & 0x7F) as usize
            };
            Some(memory.read_bytes(at, length))
        } else {
            None
        };
        RequestedFeedback {
            state_not_needed: flags & FLAG_S != 0,
            identifiers_not_needed: flags & FLAG_I != 0,
            item,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReturnedParameters {
    pub cycles_per_bit: u16,
    pub decompression_memory_size: u32,
    pub state_memory_size: u32,
    pub sigcomp_version: u8,
    pub partial_state_identifiers: Vec<Vec<u8>>,
}

impl ReturnedParameters {
    pub fn parse(memory: &Memory, location: u16) -> Self {
        let sizes = memory.read_byte(location);
        let cpb = (sizes >> 6) & 0x03;
        let dms = (sizes >> 3) & 0x07;
        let sms = sizes & 0x07;

        let mut at = location.wrapping_add(2);
        let mut consumed = 2usize;
        let mut partial_state_identifiers = Vec::new();
        loop {
            let length = memory.read_byte(at) as usize;
            if !(STATE_MIN_ACCESS_LEN..=STATE_MAX_ACCESS_LEN).contains(&length)
                || consumed + 1 + length > MEMORY_SIZE
            {
                break;
            }
            partial_state_identifiers.push(memory.read_bytes(at.wrapping_add(1), length));
            at = at.wrapping_add(1 + length as u16);
            consumed += 1 + length;
        }

        ReturnedParameters {
            cycles_per_bit: 16 << cpb,
            decompression_memory_size: 1024 << dms,
            state_memory_size: if sms == 0 { 0 } else { 1024 << sms },
            sigcomp_version: memory.read_byte(location.wrapping_add(1)),
            partial_state_identifiers,
        }
    }
}
