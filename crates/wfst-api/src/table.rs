// Slot-indexed handle table with generations, pin counts, and deferred
// destruction.

use std::ops::Deref;
use std::sync::{Mutex, MutexGuard};

use wfst_core::FstError;

/// One slot: an owned object (or empty), a generation counter, a pin count,
/// and the pending-free flag set when a removal had to be deferred.
struct Slot<T> {
    obj: Option<Box<T>>,
    generation: u32,
    pin_count: u32,
    pending_free: bool,
}

struct TableInner<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

/// Registry mapping opaque 32-bit handles to owned objects.
///
/// All bookkeeping is serialized through one mutex. A handle returned by
/// [`insert`](Self::insert) stays valid until [`remove`](Self::remove)
/// completes with a zero pin count; removal of a pinned slot marks it
/// pending and defers destruction to the unpin that drops the count to
/// zero. Generations are bumped on removal and on optimistic-commit, never
/// taking the value 0 on a live slot, so a stale generation reliably
/// signals interference.
pub struct HandleTable<T> {
    inner: Mutex<TableInner<T>>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        HandleTable {
            inner: Mutex::new(TableInner {
                slots: Vec::new(),
                free_list: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TableInner<T>> {
        // A panic mid-operation leaves only bookkeeping behind; recover the
        // guard rather than poisoning every later caller.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an object, reusing a freed slot if one is available.
    pub fn insert(&self, obj: T) -> u32 {
        let mut inner = self.lock();
        match inner.free_list.pop() {
            Some(idx) => {
                let slot = &mut inner.slots[idx as usize];
                slot.obj = Some(Box::new(obj));
                slot.generation = next_generation(slot.generation);
                slot.pin_count = 0;
                slot.pending_free = false;
                idx
            }
            None => {
                let idx = inner.slots.len() as u32;
                inner.slots.push(Slot {
                    obj: Some(Box::new(obj)),
                    generation: 1,
                    pin_count: 0,
                    pending_free: false,
                });
                idx
            }
        }
    }

    /// Run `f` against the object behind `h` under the table lock.
    pub fn with<R>(&self, h: u32, f: impl FnOnce(&T) -> R) -> Result<R, FstError> {
        let mut inner = self.lock();
        let slot = live_slot(&mut inner, h)?;
        let obj = slot.obj.as_deref().ok_or_else(|| invalid_handle(h))?;
        Ok(f(obj))
    }

    /// Run `f` against the object behind `h` mutably, under the table lock.
    /// Rejected while the slot is pinned: pinned readers rely on the body
    /// staying untouched.
    pub fn with_mut<R>(&self, h: u32, f: impl FnOnce(&mut T) -> R) -> Result<R, FstError> {
        let mut inner = self.lock();
        let slot = live_slot(&mut inner, h)?;
        if slot.pin_count > 0 {
            return Err(FstError::InvalidArgument(format!(
                "handle {h} is pinned by a concurrent reader"
            )));
        }
        let obj = slot.obj.as_deref_mut().ok_or_else(|| invalid_handle(h))?;
        Ok(f(obj))
    }

    /// Current generation of a live slot.
    pub fn generation(&self, h: u32) -> Result<u32, FstError> {
        let mut inner = self.lock();
        Ok(live_slot(&mut inner, h)?.generation)
    }

    /// Bump a live slot's generation, invalidating outstanding optimistic
    /// snapshots. Returns the new generation.
    pub fn bump_generation(&self, h: u32) -> Result<u32, FstError> {
        let mut inner = self.lock();
        let slot = live_slot(&mut inner, h)?;
        slot.generation = next_generation(slot.generation);
        Ok(slot.generation)
    }

    /// Pin the slot for lock-free reading. The returned guard dereferences
    /// to the object and releases the pin when dropped; destruction of a
    /// removed-while-pinned object happens at that point.
    pub fn pin(&self, h: u32) -> Result<PinGuard<'_, T>, FstError> {
        let mut inner = self.lock();
        let slot = live_slot(&mut inner, h)?;
        let ptr: *const T = slot.obj.as_deref().ok_or_else(|| invalid_handle(h))?;
        slot.pin_count += 1;
        Ok(PinGuard {
            table: self,
            handle: h,
            ptr,
        })
    }

    fn unpin(&self, h: u32) {
        let mut inner = self.lock();
        let Some(slot) = inner.slots.get_mut(h as usize) else {
            return;
        };
        slot.pin_count = slot.pin_count.saturating_sub(1);
        if slot.pin_count == 0 && slot.pending_free {
            slot.obj = None;
            slot.pending_free = false;
            inner.free_list.push(h);
        }
    }

    /// Clone the object and read its generation in one locked step: the
    /// opening move of the optimistic-commit protocol.
    pub fn snapshot(&self, h: u32) -> Result<(T, u32), FstError>
    where
        T: Clone,
    {
        let mut inner = self.lock();
        let slot = live_slot(&mut inner, h)?;
        let obj = slot.obj.as_deref().ok_or_else(|| invalid_handle(h))?;
        Ok((obj.clone(), slot.generation))
    }

    /// Closing move of the optimistic-commit protocol: swap `obj` into the
    /// slot iff the generation still equals `expected` and no reader holds a
    /// pin; the displaced body is destroyed and the generation bumped.
    pub fn commit(&self, h: u32, expected: u32, obj: T) -> Result<(), FstError> {
        let mut inner = self.lock();
        let slot = live_slot(&mut inner, h)?;
        if slot.pin_count > 0 {
            return Err(FstError::InvalidArgument(format!(
                "handle {h} is pinned by a concurrent reader"
            )));
        }
        if slot.generation != expected {
            return Err(FstError::InvalidArgument(format!(
                "handle {h} was mutated concurrently (generation {} != {expected})",
                slot.generation
            )));
        }
        slot.obj = Some(Box::new(obj));
        slot.generation = next_generation(slot.generation);
        Ok(())
    }

    /// Release a handle. Pinned slots are marked pending and destroyed on
    /// the final unpin. Returns whether the handle was live.
    pub fn remove(&self, h: u32) -> bool {
        let mut inner = self.lock();
        let Ok(slot) = live_slot(&mut inner, h) else {
            return false;
        };
        slot.generation = next_generation(slot.generation);
        if slot.pin_count > 0 {
            slot.pending_free = true;
        } else {
            slot.obj = None;
            inner.free_list.push(h);
        }
        true
    }

    /// Number of live objects (excluding pending-free ones).
    pub fn len(&self) -> usize {
        let inner = self.lock();
        inner
            .slots
            .iter()
            .filter(|s| s.obj.is_some() && !s.pending_free)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every slot. Callers must guarantee quiescence: no other calls in
    /// flight and no outstanding pins.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.slots.clear();
        inner.free_list.clear();
    }
}

fn invalid_handle(h: u32) -> FstError {
    FstError::InvalidArgument(format!("invalid handle {h}"))
}

fn next_generation(g: u32) -> u32 {
    // 0 never marks a live slot.
    match g.wrapping_add(1) {
        0 => 1,
        g => g,
    }
}

fn live_slot<'i, T>(
    inner: &'i mut TableInner<T>,
    h: u32,
) -> Result<&'i mut Slot<T>, FstError> {
    let slot = inner
        .slots
        .get_mut(h as usize)
        .ok_or_else(|| invalid_handle(h))?;
    if slot.obj.is_none() || slot.pending_free {
        return Err(invalid_handle(h));
    }
    Ok(slot)
}

/// RAII pin over a table slot. Dereferences without holding the table lock;
/// dropping the guard unpins (and completes a deferred removal if this was
/// the last pin).
pub struct PinGuard<'t, T> {
    table: &'t HandleTable<T>,
    handle: u32,
    ptr: *const T,
}

impl<T> Deref for PinGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the slot's pin count stays nonzero for the guard's
        // lifetime, so the boxed object is neither destroyed (remove defers
        // to the final unpin) nor replaced (with_mut and commit reject
        // pinned slots). The box gives the pointer a stable address.
        unsafe { &*self.ptr }
    }
}

impl<T> Drop for PinGuard<'_, T> {
    fn drop(&mut self) {
        self.table.unpin(self.handle);
    }
}

// Safety: the guard only exposes &T; sharing or sending it across threads
// is as safe as sharing &T itself.
unsafe impl<T: Sync> Sync for PinGuard<'_, T> {}
unsafe impl<T: Sync> Send for PinGuard<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_read_back() {
        let table: HandleTable<String> = HandleTable::new();
        let h = table.insert("hello".to_string());
        assert_eq!(table.with(h, |s| s.clone()).unwrap(), "hello");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removed_handles_are_rejected() {
        let table: HandleTable<u64> = HandleTable::new();
        let h = table.insert(7);
        assert!(table.remove(h));
        assert!(table.with(h, |v| *v).is_err());
        // Double remove reports failure.
        assert!(!table.remove(h));
    }

    #[test]
    fn slots_are_reused_with_fresh_generations() {
        let table: HandleTable<u64> = HandleTable::new();
        let h1 = table.insert(1);
        let g1 = table.generation(h1).unwrap();
        table.remove(h1);
        let h2 = table.insert(2);
        assert_eq!(h1, h2);
        let g2 = table.generation(h2).unwrap();
        assert_ne!(g1, g2);
        assert_ne!(g2, 0);
        assert_eq!(table.with(h2, |v| *v).unwrap(), 2);
    }

    #[test]
    fn pinned_removal_defers_destruction() {
        let table: HandleTable<String> = HandleTable::new();
        let h = table.insert("pinned".to_string());
        let guard = table.pin(h).unwrap();

        assert!(table.remove(h));
        // The object is still readable through the pin...
        assert_eq!(&*guard, "pinned");
        // ...but the handle itself is dead to new callers.
        assert!(table.with(h, |s| s.clone()).is_err());
        assert_eq!(table.len(), 0);

        drop(guard);
        // The final unpin recycled the slot.
        let h2 = table.insert("next".to_string());
        assert_eq!(h2, h);
    }

    #[test]
    fn nested_pins_all_release_before_destruction() {
        let table: HandleTable<u64> = HandleTable::new();
        let h = table.insert(9);
        let g1 = table.pin(h).unwrap();
        let g2 = table.pin(h).unwrap();
        table.remove(h);
        drop(g1);
        // Still alive under the second pin.
        assert_eq!(*g2, 9);
        drop(g2);
        assert!(table.with(h, |v| *v).is_err());
    }

    #[test]
    fn commit_swaps_when_generation_matches() {
        let table: HandleTable<u64> = HandleTable::new();
        let h = table.insert(1);
        let (snap, generation) = table.snapshot(h).unwrap();
        assert_eq!(snap, 1);
        table.commit(h, generation, snap + 100).unwrap();
        assert_eq!(table.with(h, |v| *v).unwrap(), 101);
        // The commit itself bumped the generation.
        assert_ne!(table.generation(h).unwrap(), generation);
    }

    #[test]
    fn commit_rejects_interfering_mutation() {
        let table: HandleTable<u64> = HandleTable::new();
        let h = table.insert(1);
        let (snap, generation) = table.snapshot(h).unwrap();
        table.bump_generation(h).unwrap();
        assert!(table.commit(h, generation, snap + 100).is_err());
        // The slot keeps its old body.
        assert_eq!(table.with(h, |v| *v).unwrap(), 1);
    }

    #[test]
    fn commit_and_mutation_reject_pinned_slots() {
        let table: HandleTable<u64> = HandleTable::new();
        let h = table.insert(5);
        let (snap, generation) = table.snapshot(h).unwrap();
        let guard = table.pin(h).unwrap();
        assert!(table.commit(h, generation, snap).is_err());
        assert!(table.with_mut(h, |v| *v += 1).is_err());
        drop(guard);
        table.commit(h, generation, snap + 1).unwrap();
        assert_eq!(table.with(h, |v| *v).unwrap(), 6);
    }

    #[test]
    fn out_of_range_handles_are_invalid() {
        let table: HandleTable<u64> = HandleTable::new();
        assert!(table.with(0, |v| *v).is_err());
        assert!(table.with(u32::MAX, |v| *v).is_err());
        assert!(!table.remove(3));
    }

    #[test]
    fn clear_drops_everything() {
        let table: HandleTable<u64> = HandleTable::new();
        let h1 = table.insert(1);
        table.insert(2);
        table.clear();
        assert_eq!(table.len(), 0);
        assert!(table.with(h1, |v| *v).is_err());
    }

    #[test]
    fn concurrent_pinned_readers() {
        use std::sync::Arc as StdArc;

        let table: StdArc<HandleTable<Vec<u64>>> = StdArc::new(HandleTable::new());
        let h = table.insert((0..1000).collect());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let table = StdArc::clone(&table);
            handles.push(std::thread::spawn(move || {
                let pin = table.pin(h).unwrap();
                pin.iter().sum::<u64>()
            }));
        }
        for t in handles {
            assert_eq!(t.join().unwrap(), 499_500);
        }
    }
}
