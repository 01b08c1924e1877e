// Frozen FST: immutable contiguous snapshot for runtime queries.

use std::marker::PhantomData;
use std::path::Path;

use crate::FstError;
use crate::arc::{Arc, Label, NO_STATE, StateId};
use crate::format::{self, ArcEntry, HEADER_SIZE, Header, StateEntry};
use crate::mutable::MutableFst;
use crate::semiring::Semiring;

/// Backing storage for a frozen FST. Owned buffers are u64-backed so the
/// 8-byte alignment invariant of the container holds by construction;
/// borrowed buffers are the caller's responsibility and are checked on load.
#[derive(Debug)]
enum FrozenData<'a> {
    Owned { buf: Vec<u64>, len: usize },
    Borrowed(&'a [u8]),
}

/// Immutable snapshot of an FST: one contiguous 8-byte aligned region holding
/// the header, the per-state table, and the per-arc table. Arcs of each state
/// are sorted by input label, enabling binary search. Any number of readers
/// may traverse a frozen FST concurrently without synchronization.
#[derive(Debug)]
pub struct FrozenFst<'a, W> {
    data: FrozenData<'a>,
    header: Header,
    _weight: PhantomData<W>,
}

/// A frozen FST that owns its storage.
pub type OwnedFrozenFst<W> = FrozenFst<'static, W>;

impl<W: Semiring> FrozenFst<'static, W> {
    /// Freeze a mutable FST into an owned snapshot. The input is not
    /// modified; its arcs are copied and sorted by input label per state.
    pub fn freeze(fst: &MutableFst<W>) -> Result<Self, FstError> {
        let total = fst.total_arcs();
        if total > u32::MAX as u64 {
            return Err(FstError::InvalidArgument(format!(
                "{total} arcs exceed the container's 32-bit arc table"
            )));
        }

        let header = Header {
            weight_kind: W::KIND,
            flags: 0,
            num_states: fst.num_states(),
            num_arcs: total as u32,
            start: fst.start(),
        };

        let mut bytes = Vec::with_capacity(format::container_size(
            header.num_states,
            header.num_arcs,
        ));
        format::write_header(&mut bytes, &header);

        let mut sorted: Vec<Vec<Arc<W>>> = Vec::with_capacity(fst.num_states() as usize);
        let mut offset: u32 = 0;
        for s in fst.state_ids() {
            let mut arcs = fst.arcs(s).to_vec();
            arcs.sort_by_key(|a| a.ilabel);
            let entry = StateEntry::new(offset, arcs.len() as u32, fst.final_weight(s).to_bits());
            bytes.extend_from_slice(bytemuck::bytes_of(&entry));
            offset += arcs.len() as u32;
            sorted.push(arcs);
        }
        for arcs in &sorted {
            for arc in arcs {
                let entry =
                    ArcEntry::new(arc.ilabel, arc.olabel, arc.weight.to_bits(), arc.nextstate);
                bytes.extend_from_slice(bytemuck::bytes_of(&entry));
            }
        }

        Ok(Self::own_bytes(&bytes, header))
    }

    /// Load from a byte buffer, copying into owned aligned storage. Use this
    /// when the source buffer's alignment or lifetime is not under control.
    pub fn from_bytes_owned(data: &[u8]) -> Result<Self, FstError> {
        let header = Self::validate(data)?;
        Ok(Self::own_bytes(data, header))
    }

    /// Read a container file into an owned snapshot.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, FstError> {
        let data = std::fs::read(path)?;
        Self::from_bytes_owned(&data)
    }

    fn own_bytes(data: &[u8], header: Header) -> Self {
        let words = data.len().div_ceil(8);
        let mut buf = vec![0u64; words];
        bytemuck::cast_slice_mut::<u64, u8>(&mut buf)[..data.len()].copy_from_slice(data);
        FrozenFst {
            data: FrozenData::Owned {
                buf,
                len: data.len(),
            },
            header,
            _weight: PhantomData,
        }
    }
}

impl<'a, W: Semiring> FrozenFst<'a, W> {
    /// Zero-copy load: validate and expose a view over `data` without
    /// copying. The buffer must be 8-byte aligned.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, FstError> {
        if data.as_ptr() as usize % 8 != 0 {
            return Err(FstError::InvalidFormat(
                "container buffer is not 8-byte aligned".to_string(),
            ));
        }
        let header = Self::validate(data)?;
        Ok(FrozenFst {
            data: FrozenData::Borrowed(data),
            header,
            _weight: PhantomData,
        })
    }

    fn validate(data: &[u8]) -> Result<Header, FstError> {
        let header = format::parse_header(data)?;
        if header.weight_kind != W::KIND {
            return Err(FstError::WeightTypeMismatch {
                expected: W::KIND,
                actual: header.weight_kind,
            });
        }
        Ok(header)
    }

    /// The complete container image (header + state table + arc table).
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            FrozenData::Owned { buf, len } => &bytemuck::cast_slice(buf)[..*len],
            FrozenData::Borrowed(slice) => slice,
        }
    }

    /// Write the container image to a file.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), FstError> {
        std::fs::write(path, self.as_bytes())?;
        Ok(())
    }

    // -- Queries --------------------------------------------------------

    pub fn start(&self) -> StateId {
        self.header.start
    }

    pub fn num_states(&self) -> u32 {
        self.header.num_states
    }

    pub fn total_arcs(&self) -> u32 {
        self.header.num_arcs
    }

    pub fn num_arcs(&self, s: StateId) -> u32 {
        self.state_entries()[s as usize].num_arcs
    }

    pub fn final_weight(&self, s: StateId) -> W {
        W::from_bits(self.state_entries()[s as usize].weight_bits())
    }

    pub fn is_final(&self, s: StateId) -> bool {
        !self.final_weight(s).is_zero()
    }

    fn state_entries(&self) -> &[StateEntry] {
        let end = HEADER_SIZE + self.header.num_states as usize * size_of::<StateEntry>();
        bytemuck::cast_slice(&self.as_bytes()[HEADER_SIZE..end])
    }

    fn arc_entries(&self) -> &[ArcEntry] {
        let start = HEADER_SIZE + self.header.num_states as usize * size_of::<StateEntry>();
        bytemuck::cast_slice(&self.as_bytes()[start..])
    }

    /// The raw arc records of `s`, sorted by input label.
    pub fn state_arcs(&self, s: StateId) -> &[ArcEntry] {
        let entry = &self.state_entries()[s as usize];
        let lo = entry.arc_offset as usize;
        &self.arc_entries()[lo..lo + entry.num_arcs as usize]
    }

    /// Decoded arcs of `s`, sorted by input label.
    pub fn arcs(&self, s: StateId) -> impl Iterator<Item = Arc<W>> + '_ {
        self.state_arcs(s).iter().map(Self::decode)
    }

    /// Binary-search the arcs of `s` for any arc with the given input label.
    pub fn find_arc(&self, s: StateId, ilabel: Label) -> Option<Arc<W>> {
        let arcs = self.state_arcs(s);
        arcs.binary_search_by_key(&ilabel, |a| a.ilabel)
            .ok()
            .map(|i| Self::decode(&arcs[i]))
    }

    /// The contiguous sub-range of arcs of `s` whose input label equals
    /// `ilabel`, found by two binary searches. Lets composition avoid
    /// scanning the full arc list of a state.
    pub fn arcs_by_ilabel(&self, s: StateId, ilabel: Label) -> impl Iterator<Item = Arc<W>> + '_ {
        let arcs = self.state_arcs(s);
        let lo = arcs.partition_point(|a| a.ilabel < ilabel);
        let hi = arcs.partition_point(|a| a.ilabel <= ilabel);
        arcs[lo..hi].iter().map(Self::decode)
    }

    /// Thaw back into a builder (used by the text printer and the boundary's
    /// frozen-to-mutable conversions).
    pub fn to_mutable(&self) -> MutableFst<W> {
        let mut fst = MutableFst::new();
        fst.add_states(self.num_states());
        for s in 0..self.num_states() {
            for arc in self.arcs(s) {
                fst.add_arc(s, arc);
            }
            let fw = self.final_weight(s);
            if !fw.is_zero() {
                fst.set_final(s, fw);
            }
        }
        if self.start() != NO_STATE {
            fst.set_start(self.start());
        }
        fst
    }

    fn decode(entry: &ArcEntry) -> Arc<W> {
        Arc {
            ilabel: entry.ilabel,
            olabel: entry.olabel,
            weight: W::from_bits(entry.weight_bits()),
            nextstate: entry.nextstate,
        }
    }
}
