//! Fixed-size on-disk header stored at the front of a filter's `data.bin`.
//!
//! Layout (little-endian, 40 bytes): magic(8) | m_bits(8) | k(4) | pad(4) |
//! capacity(8) | false_positive_rate(8, as `f64::to_bits`).

use crate::{error::Error, sizing::Sizing};

const MAGIC: u64 = 0x626c_6f6f_6d64_3031; // "bloomd01" in ASCII, as a single le u64
pub(crate) const HEADER_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Header {
    pub(crate) m_bits: u64,
    pub(crate) k: u32,
    pub(crate) capacity: u64,
    pub(crate) false_positive_rate: f64,
}

impl Header {
    pub(crate) fn new(sizing: Sizing, capacity: u64, false_positive_rate: f64) -> Self {
        Self {
            m_bits: sizing.m_bits,
            k: sizing.k,
            capacity,
            false_positive_rate,
        }
    }

    pub(crate) fn sizing(&self) -> Sizing {
        Sizing {
            m_bits: self.m_bits,
            k: self.k,
        }
    }

    pub(crate) fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..8].copy_from_slice(&MAGIC.to_le_bytes());
        buf[8..16].copy_from_slice(&self.m_bits.to_le_bytes());
        buf[16..20].copy_from_slice(&self.k.to_le_bytes());
        // buf[20..24] left as padding.
        buf[24..32].copy_from_slice(&self.capacity.to_le_bytes());
        buf[32..40].copy_from_slice(&self.false_positive_rate.to_bits().to_le_bytes());
        buf
    }

    pub(crate) fn decode(name: &str, buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < HEADER_LEN {
            return Err(Error::CorruptHeader {
                name: name.into(),
                reason: format!("file shorter than header ({} bytes)", buf.len()),
            });
        }
        let magic = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        if magic != MAGIC {
            return Err(Error::CorruptHeader {
                name: name.into(),
                reason: format!("bad magic {magic:#x}"),
            });
        }
        let m_bits = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let k = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        let capacity = u64::from_le_bytes(buf[24..32].try_into().unwrap());
        let false_positive_rate =
            f64::from_bits(u64::from_le_bytes(buf[32..40].try_into().unwrap()));
        if m_bits == 0 || k == 0 {
            return Err(Error::CorruptHeader {
                name: name.into(),
                reason: "zero-sized bit array or hash count".into(),
            });
        }
        Ok(Self {
            m_bits,
            k,
            capacity,
            false_positive_rate,
        })
    }
}
