// Binary container format: header and record layouts, validation.

use bytemuck::{Pod, Zeroable};

use crate::FstError;
use crate::arc::{NO_STATE, StateId};
use crate::semiring::WeightKind;

/// Container magic ("!TSF" little-endian).
pub const MAGIC: u32 = 0x4653_5421;

/// Current container version.
pub const VERSION: u16 = 1;

/// Size of the fixed header in bytes (8-byte aligned).
pub const HEADER_SIZE: usize = 24;

/// Parsed container header.
///
/// On-disk layout (little-endian):
/// - bytes 0..4: magic
/// - bytes 4..6: version
/// - byte 6: weight-type discriminator (0 = tropical, 1 = log)
/// - byte 7: flags
/// - bytes 8..12: num_states
/// - bytes 12..16: num_arcs
/// - bytes 16..20: start_state (`u32::MAX` when undefined)
/// - bytes 20..24: zero padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub weight_kind: WeightKind,
    pub flags: u8,
    pub num_states: u32,
    pub num_arcs: u32,
    pub start: StateId,
}

/// Per-state record (16 bytes): arc table offset, arc count, and the final
/// weight bit image split into two u32 halves so the record stays packed.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StateEntry {
    pub arc_offset: u32,
    pub num_arcs: u32,
    pub weight_lo: u32,
    pub weight_hi: u32,
}

/// Per-arc record (20 bytes), grouped by source state and sorted by ilabel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ArcEntry {
    pub ilabel: u32,
    pub olabel: u32,
    pub weight_lo: u32,
    pub weight_hi: u32,
    pub nextstate: u32,
}

const _: () = assert!(size_of::<StateEntry>() == 16);
const _: () = assert!(size_of::<ArcEntry>() == 20);
const _: () = assert!(align_of::<StateEntry>() == 4);
const _: () = assert!(align_of::<ArcEntry>() == 4);

impl StateEntry {
    pub fn new(arc_offset: u32, num_arcs: u32, weight_bits: u64) -> Self {
        StateEntry {
            arc_offset,
            num_arcs,
            weight_lo: weight_bits as u32,
            weight_hi: (weight_bits >> 32) as u32,
        }
    }

    #[inline]
    pub fn weight_bits(&self) -> u64 {
        self.weight_lo as u64 | (self.weight_hi as u64) << 32
    }
}

impl ArcEntry {
    pub fn new(ilabel: u32, olabel: u32, weight_bits: u64, nextstate: u32) -> Self {
        ArcEntry {
            ilabel,
            olabel,
            weight_lo: weight_bits as u32,
            weight_hi: (weight_bits >> 32) as u32,
            nextstate,
        }
    }

    #[inline]
    pub fn weight_bits(&self) -> u64 {
        self.weight_lo as u64 | (self.weight_hi as u64) << 32
    }
}

/// Total container size for the given table dimensions.
pub fn container_size(num_states: u32, num_arcs: u32) -> usize {
    HEADER_SIZE + num_states as usize * size_of::<StateEntry>()
        + num_arcs as usize * size_of::<ArcEntry>()
}

/// Parse and validate the header plus the declared table dimensions against
/// the buffer length. The start state must be the sentinel or in range.
pub fn parse_header(data: &[u8]) -> Result<Header, FstError> {
    if data.len() < HEADER_SIZE {
        return Err(FstError::UnexpectedEof {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let magic = u32::from_le_bytes(data[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(FstError::InvalidMagic);
    }

    let version = u16::from_le_bytes(data[4..6].try_into().unwrap());
    if version != VERSION {
        return Err(FstError::UnsupportedVersion(version));
    }

    let weight_kind = WeightKind::from_u8(data[6]).ok_or_else(|| {
        FstError::InvalidFormat(format!("unknown weight-type discriminator {}", data[6]))
    })?;
    let flags = data[7];

    let num_states = u32::from_le_bytes(data[8..12].try_into().unwrap());
    let num_arcs = u32::from_le_bytes(data[12..16].try_into().unwrap());
    let start = u32::from_le_bytes(data[16..20].try_into().unwrap());

    let expected = container_size(num_states, num_arcs);
    if data.len() != expected {
        return Err(FstError::InvalidFormat(format!(
            "container is {} bytes but the header declares {}",
            data.len(),
            expected
        )));
    }

    if start != NO_STATE && start >= num_states {
        return Err(FstError::InvalidFormat(format!(
            "start state {start} out of range for {num_states} states"
        )));
    }

    Ok(Header {
        weight_kind,
        flags,
        num_states,
        num_arcs,
        start,
    })
}

/// Append the 24-byte header to `buf`.
pub fn write_header(buf: &mut Vec<u8>, header: &Header) {
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.push(header.weight_kind.as_u8());
    buf.push(header.flags);
    buf.extend_from_slice(&header.num_states.to_le_bytes());
    buf.extend_from_slice(&header.num_arcs.to_le_bytes());
    buf.extend_from_slice(&header.start.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
}
