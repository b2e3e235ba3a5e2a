//! SHA-1 and the PPP FCS-16 CRC used by the SHA-1 and CRC instructions

use sha1::{Digest, Sha1};

/// Length of a full state identifier
pub const SHA1_LEN: usize = 20;

pub fn sha1(data: &[u8]) -> [u8; SHA1_LEN] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

lazy_static! {
    /// FCS-16 lookup table (RFC 1662, reflected polynomial 0x8408)
    static ref FCS16_TABLE: [u16; 256] = {
        let mut table = [0u16; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut v = i as u16;
            for _ in 0..8 {
                v = if v & 1 != 0 { (v >> 1) ^ 0x8408 } else { v >> 1 };
            }
            *entry = v;
        }
        table
    };
}

/// CRC over `data`: seeded with 0xFFFF, result ones' complemented
pub fn crc16(data: &[u8]) -> u16 {
    let mut fcs: u16 = 0xFFFF;
    for &b in data {
        fcs = (fcs >> 8) ^ FCS16_TABLE[((fcs ^ b as u16) & 0xFF) as usize];
    }
    fcs ^ 0xFFFF
}
