//! Built-in static dictionaries
//!
//! SigComp endpoints share two static dictionaries that every decompressor
//! holds from startup: the SIP/SDP dictionary of RFC 3485 and the Presence
//! dictionary of RFC 5112. They are registered under their published state
//! identifiers. The dictionary bytes are read from `dictionary_dir` and checked
//! against the published identifier; if a file is missing the item is seeded
//! zero-filled at its published length so that identifier lookups and length
//! defaulting behave the same.

use crate::digest::sha1;
use crate::state::{build_record, StateIdentifier, StateStore, STATE_MIN_ACCESS_LEN};
use log::{info, warn};
use std::fs;
use std::path::Path;

/// Descriptor of a built-in dictionary
#[derive(Debug, Clone, Copy)]
pub struct BuiltinDictionary {
    pub name: &'static str,
    pub identifier: StateIdentifier,
    pub state_length: u16,
    pub file_name: &'static str,
}

/// RFC 3485 SIP/SDP static dictionary
pub const SIP_SDP: BuiltinDictionary = BuiltinDictionary {
    name: "SIP/SDP",
    identifier: [
        0xfb, 0xe5, 0x07, 0xdf, 0xe5, 0xe6, 0xaa, 0x5a, 0xf2, 0xab, 0xb9, 0x14, 0xce, 0xaa, 0x05,
        0xf9, 0x9c, 0xe6, 0x1b, 0xa5,
    ],
    state_length: 0x12E4,
    file_name: "sip_sdp.dict",
};

/// RFC 5112 Presence static dictionary
pub const PRESENCE: BuiltinDictionary = BuiltinDictionary {
    name: "Presence",
    identifier: [
        0xd9, 0x42, 0x29, 0x7d, 0x0b, 0xb3, 0x8f, 0xc0, 0x1d, 0x67, 0x41, 0xd6, 0x72, 0x39, 0x14,
        0x13, 0x74, 0x42, 0xbb, 0x5b,
    ],
    state_length: 0x0D93,
    file_name: "presence.dict",
};

pub const BUILTIN_DICTIONARIES: [BuiltinDictionary; 2] = [SIP_SDP, PRESENCE];

impl BuiltinDictionary {
    /// Dictionary bytes from `dir`, or zeros of the published length
    pub fn load_value(&self, dir: Option<&Path>) -> Vec<u8> {
        let length = self.state_length as usize;
        if let Some(dir) = dir {
            let path = dir.join(self.file_name);
            match fs::read(&path) {
                Ok(mut bytes) => {
                    if bytes.len() != length {
                        warn!(
                            "{} dictionary {} is {} bytes, expected {}",
                            self.name,
                            path.display(),
                            bytes.len(),
                            length
                        );
                        bytes.resize(length, 0);
                    }
                    info!("loaded {} dictionary from {}", self.name, path.display());
                    return bytes;
                }
                Err(e) => warn!(
                    "cannot read {} dictionary {}: {}",
                    self.name,
                    path.display(),
                    e
                ),
            }
        }
        warn!(
            "{} dictionary content unavailable, seeding {} zero bytes",
            self.name, length
        );
        vec![0u8; length]
    }

    /// State record for this dictionary: address and instruction are zero,
    /// minimum access length is 6
    pub fn record(&self, value: &[u8]) -> Vec<u8> {
        build_record(0, 0, STATE_MIN_ACCESS_LEN as u16, value)
    }

    /// Whether `value` hashes to the published identifier
    pub fn verify(&self, value: &[u8]) -> bool {
        sha1(&self.record(value)) == self.identifier
    }
}

/// Register every built-in dictionary in `store`
pub fn seed_builtin_dictionaries(store: &mut StateStore, dir: Option<&Path>) {
    for dictionary in BUILTIN_DICTIONARIES.iter() {
        let value = dictionary.load_value(dir);
        if !dictionary.verify(&value) {
            warn!(
                "{} dictionary content does not match identifier {:02x?}",
                dictionary.name,
                &dictionary.identifier[..STATE_MIN_ACCESS_LEN]
            );
        }
        store.insert_builtin(dictionary.identifier, dictionary.record(&value));
    }
}
