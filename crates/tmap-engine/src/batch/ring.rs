use bytemuck::{Pod, Zeroable};

use super::{BatchError, BufferKind, GeometryBackend};

/// Elements reserved by [`RingBuffer::alloc`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Allocation {
    /// Index of the first element within the ring.
    pub base: u32,
    pub len: u32,
}

/// Range handed to the draw call by [`RingBuffer::submit`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RingRegion {
    pub start: u32,
    pub count: u32,
    /// Wrap-around counter the region was written in.
    pub generation: u64,
}

/// Fixed-capacity dynamic GPU buffer used as a circular arena.
///
/// Elements are staged in a CPU copy and handed to the backend on
/// [`submit`](Self::submit). Each batch is a contiguous run
/// `[batch_start, cursor)`; a batch never straddles the end of the ring.
///
/// Mapping discipline:
/// - first batch of a generation: `map_discard`
/// - later batches of the same generation: `map_append`
/// - wrap-around starts a new generation and is always a `map_discard`
pub struct RingBuffer<T> {
    kind: BufferKind,
    staging: Vec<T>,
    batch_start: usize,
    cursor: usize,
    generation: u64,
    mapped: bool,
}

impl<T: Pod + Zeroable> RingBuffer<T> {
    pub fn new(kind: BufferKind, capacity: usize) -> Self {
        Self {
            kind,
            staging: vec![T::zeroed(); capacity],
            batch_start: 0,
            cursor: 0,
            generation: 0,
            mapped: false,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.staging.len()
    }

    /// Size of the backing GPU buffer.
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        (self.capacity() * std::mem::size_of::<T>()) as u64
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Elements written since the last submit.
    #[inline]
    pub fn pending(&self) -> usize {
        self.cursor - self.batch_start
    }

    /// True if `n` more elements would not fit before the end of the ring.
    ///
    /// Callers flush on `true`; the next allocation then wraps around.
    #[inline]
    pub fn is_full(&self, n: usize) -> bool {
        self.cursor + n > self.capacity()
    }

    /// Reserves `n` elements at the write cursor, mapping the buffer if this
    /// is the first allocation of a batch.
    ///
    /// Fails without side effects if `n` exceeds the capacity, if the pending
    /// batch leaves no room (flush first), or if the backend cannot map.
    pub fn alloc<B>(&mut self, backend: &mut B, n: usize) -> Result<Allocation, BatchError>
    where
        B: GeometryBackend + ?Sized,
    {
        let capacity = self.capacity();
        if n > capacity {
            return Err(BatchError::Capacity { kind: self.kind, requested: n, capacity });
        }

        if self.mapped {
            if self.is_full(n) {
                return Err(BatchError::RingFull {
                    kind: self.kind,
                    requested: n,
                    available: capacity - self.cursor,
                });
            }
        } else {
            let wraps = self.is_full(n);
            let result = if wraps || self.cursor == 0 {
                backend.map_discard(self.kind)
            } else {
                backend.map_append(self.kind)
            };
            result.map_err(|source| BatchError::Backend { kind: self.kind, source })?;

            if wraps {
                self.generation += 1;
                self.cursor = 0;
                self.batch_start = 0;
            }
            self.mapped = true;
        }

        let base = self.cursor;
        self.cursor += n;
        Ok(Allocation { base: base as u32, len: n as u32 })
    }

    /// Gives back the most recent allocation (used when a paired allocation
    /// in the other ring failed).
    pub fn release(&mut self, alloc: Allocation) {
        debug_assert_eq!(self.cursor, (alloc.base + alloc.len) as usize);
        self.cursor = alloc.base as usize;
    }

    /// Writable view of an allocation from the current batch.
    #[inline]
    pub fn slice_mut(&mut self, alloc: Allocation) -> &mut [T] {
        let start = alloc.base as usize;
        &mut self.staging[start..start + alloc.len as usize]
    }

    /// Finishes the current batch: uploads it, unmaps, and returns its range.
    ///
    /// A count of zero means nothing was written since the last submit.
    pub fn submit<B>(&mut self, backend: &mut B) -> RingRegion
    where
        B: GeometryBackend + ?Sized,
    {
        let region = RingRegion {
            start: self.batch_start as u32,
            count: self.pending() as u32,
            generation: self.generation,
        };
        if !self.mapped {
            return region;
        }

        let written = &self.staging[self.batch_start..self.cursor];
        let byte_offset = (self.batch_start * std::mem::size_of::<T>()) as u64;
        backend.unmap(self.kind, byte_offset, bytemuck::cast_slice(written));

        self.mapped = false;
        self.batch_start = self.cursor;
        region
    }

    /// Forgets all contents after the backing buffer was recreated.
    ///
    /// The next allocation starts a fresh generation with a discard mapping.
    pub fn reset(&mut self) {
        self.batch_start = 0;
        self.cursor = 0;
        self.mapped = false;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::recording::{BackendCall, RecordingBackend};

    fn ring(capacity: usize) -> (RingBuffer<u16>, RecordingBackend) {
        let ring = RingBuffer::new(BufferKind::Index, capacity);
        let mut backend = RecordingBackend::new();
        backend.create_buffer(BufferKind::Index, ring.size_bytes()).unwrap();
        backend.clear_calls();
        (ring, backend)
    }

    #[test]
    fn first_batch_maps_discard_then_append() {
        let (mut ring, mut backend) = ring(16);

        ring.alloc(&mut backend, 4).unwrap();
        ring.submit(&mut backend);
        ring.alloc(&mut backend, 4).unwrap();
        ring.submit(&mut backend);

        assert_eq!(
            backend.calls,
            vec![
                BackendCall::MapDiscard(BufferKind::Index),
                BackendCall::Unmap { kind: BufferKind::Index, byte_offset: 0, len: 8 },
                BackendCall::MapAppend(BufferKind::Index),
                BackendCall::Unmap { kind: BufferKind::Index, byte_offset: 8, len: 8 },
            ]
        );
    }

    #[test]
    fn submit_reports_batch_range() {
        let (mut ring, mut backend) = ring(16);

        ring.alloc(&mut backend, 3).unwrap();
        ring.alloc(&mut backend, 2).unwrap();
        assert_eq!(ring.pending(), 5);
        let first = ring.submit(&mut backend);
        assert_eq!((first.start, first.count), (0, 5));

        ring.alloc(&mut backend, 6).unwrap();
        let second = ring.submit(&mut backend);
        assert_eq!((second.start, second.count), (5, 6));
    }

    #[test]
    fn submit_without_writes_is_empty() {
        let (mut ring, mut backend) = ring(16);
        let region = ring.submit(&mut backend);
        assert_eq!(region.count, 0);
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn wrap_starts_new_generation_with_discard() {
        let (mut ring, mut backend) = ring(10);

        ring.alloc(&mut backend, 8).unwrap();
        ring.submit(&mut backend);
        assert!(ring.is_full(4));

        backend.clear_calls();
        let alloc = ring.alloc(&mut backend, 4).unwrap();
        assert_eq!(alloc.base, 0);
        assert_eq!(ring.generation(), 1);
        assert_eq!(backend.calls, vec![BackendCall::MapDiscard(BufferKind::Index)]);

        let region = ring.submit(&mut backend);
        assert_eq!((region.start, region.count, region.generation), (0, 4, 1));
    }

    #[test]
    fn full_pending_batch_is_rejected_without_wrapping() {
        let (mut ring, mut backend) = ring(10);

        ring.alloc(&mut backend, 8).unwrap();
        let err = ring.alloc(&mut backend, 4).unwrap_err();
        assert!(matches!(err, BatchError::RingFull { available: 2, .. }));
        assert_eq!(ring.pending(), 8);
        assert_eq!(ring.generation(), 0);
    }

    #[test]
    fn oversized_request_fails_without_mapping() {
        let (mut ring, mut backend) = ring(10);
        let err = ring.alloc(&mut backend, 11).unwrap_err();
        assert!(matches!(err, BatchError::Capacity { requested: 11, capacity: 10, .. }));
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn exact_capacity_fits_in_one_batch() {
        let (mut ring, mut backend) = ring(10);
        assert!(!ring.is_full(10));
        ring.alloc(&mut backend, 10).unwrap();
        assert_eq!(ring.submit(&mut backend).count, 10);
    }

    #[test]
    fn allocations_in_a_generation_never_overlap() {
        let (mut ring, mut backend) = ring(64);
        let mut taken = vec![false; 64];

        for n in [5usize, 7, 3, 11, 2, 9] {
            let alloc = ring.alloc(&mut backend, n).unwrap();
            for slot in &mut taken[alloc.base as usize..(alloc.base + alloc.len) as usize] {
                assert!(!*slot, "allocation overlaps an earlier region");
                *slot = true;
            }
            if n % 2 == 1 {
                ring.submit(&mut backend);
            }
        }
        assert_eq!(ring.generation(), 0);
    }

    #[test]
    fn map_failure_leaves_ring_untouched() {
        let (mut ring, mut backend) = ring(10);
        backend.fail_maps = true;

        let err = ring.alloc(&mut backend, 4).unwrap_err();
        assert!(matches!(err, BatchError::Backend { .. }));
        assert_eq!(ring.pending(), 0);

        backend.fail_maps = false;
        assert_eq!(ring.alloc(&mut backend, 4).unwrap().base, 0);
    }

    #[test]
    fn release_returns_space_and_uploads_nothing() {
        let (mut ring, mut backend) = ring(10);
        let alloc = ring.alloc(&mut backend, 4).unwrap();
        ring.release(alloc);
        assert_eq!(ring.pending(), 0);
        let region = ring.submit(&mut backend);
        assert_eq!(region.count, 0);
        assert!(!backend.mapped[BufferKind::Index.index()]);
    }

    #[test]
    fn staged_data_reaches_backend() {
        let (mut ring, mut backend) = ring(8);
        let alloc = ring.alloc(&mut backend, 3).unwrap();
        ring.slice_mut(alloc).copy_from_slice(&[7, 8, 9]);
        ring.submit(&mut backend);
        assert_eq!(&backend.indices()[..3], &[7, 8, 9]);
    }
}
