use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{fence, AtomicU32, Ordering};

/// Atomic reference count embedded in any object shared through a `RefHandle`. The count starts at
/// 1, meaning the creator holds the first reference.
pub struct RefCount {
    count: AtomicU32,
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

impl RefCount {
    pub fn new() -> Self {
        RefCount {
            count: AtomicU32::new(1),
        }
    }

    /// Add a reference, returning the count before the increment. Only valid while the count is
    /// non-zero.
    pub fn add_ref(&self) -> u32 {
        // NOTE: A new reference can only be created from an existing one, so no ordering is needed
        // beyond the atomicity of the increment.
        let previous = self.count.fetch_add(1, Ordering::Relaxed);
        debug_assert!(
            previous > 0,
            "add_ref called on an object that was already released"
        );
        previous
    }

    /// Drop a reference. Returns true if this was the last reference, in which case the caller is
    /// responsible for reclaiming the object.
    pub fn release(&self) -> bool {
        let previous = self.count.fetch_sub(1, Ordering::Release);
        debug_assert!(previous > 0, "released more references than were acquired");
        if previous != 1 {
            return false;
        }

        // Synchronize with every other release so that all writes made through other handles are
        // visible to the thread that reclaims the object.
        fence(Ordering::Acquire);
        true
    }

    /// Snapshot of the current count. Stale as soon as it is returned, use for diagnostics only.
    pub fn get_refs(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RefCount {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RefCount")
            .field("count", &self.get_refs())
            .finish()
    }
}

/// An object that may be shared across threads through `RefHandle`.
pub trait RefCounted: Send + Sync + Sized {
    fn ref_count(&self) -> &RefCount;

    /// Invoked exactly once, synchronously on the releasing thread, when the last reference is
    /// dropped. The default reclaims the object immediately. Implementations may instead move the
    /// object somewhere else (for example a deferred release queue) and reclaim it later.
    fn on_released(self: Box<Self>) {}
}

/// Owning handle to a heap-allocated `RefCounted` object. Cloning adds a reference, dropping
/// releases one. Handles compare by identity.
pub struct RefHandle<T: RefCounted> {
    ptr: Option<NonNull<T>>,
    phantom_data: PhantomData<T>,
}

// SAFETY: The pointee is only reachable through shared references, `RefCounted` requires it to be
// Send + Sync, and the count itself is atomic.
unsafe impl<T: RefCounted> Send for RefHandle<T> {}
unsafe impl<T: RefCounted> Sync for RefHandle<T> {}

impl<T: RefCounted> RefHandle<T> {
    pub const fn empty() -> Self {
        RefHandle {
            ptr: None,
            phantom_data: PhantomData,
        }
    }

    /// Move the object to the heap. The object's count must still be at its initial value of 1;
    /// that reference is taken over by the returned handle.
    pub fn new(value: T) -> Self {
        debug_assert_eq!(value.ref_count().get_refs(), 1);
        let ptr = NonNull::from(Box::leak(Box::new(value)));
        RefHandle {
            ptr: Some(ptr),
            phantom_data: PhantomData,
        }
    }

    /// Wrap a raw pointer previously produced by `into_raw` or `as_ptr`. If `add_ref` is false the
    /// handle adopts a reference the caller already owns.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a live object allocated by `RefHandle::new`, and if
    /// `add_ref` is false the caller must own one reference that is transferred to the handle.
    pub unsafe fn from_raw(
        ptr: *const T,
        add_ref: bool,
    ) -> Self {
        let ptr = NonNull::new(ptr as *mut T);
        if let Some(ptr) = ptr {
            if add_ref {
                ptr.as_ref().ref_count().add_ref();
            }
        }

        RefHandle {
            ptr,
            phantom_data: PhantomData,
        }
    }

    /// Give up ownership of the reference without releasing it. Use `from_raw(ptr, false)` to
    /// take it back.
    pub fn into_raw(self) -> *const T {
        let ptr = self.as_ptr();
        std::mem::forget(self);
        ptr
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr
            .map_or(std::ptr::null(), |ptr| ptr.as_ptr() as *const T)
    }

    pub fn get(&self) -> Option<&T> {
        // SAFETY: The handle owns a reference so the object stays alive for the borrow.
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Diagnostics only, see `RefCount::get_refs`
    pub fn refs(&self) -> u32 {
        self.get().map_or(0, |value| value.ref_count().get_refs())
    }

    /// Release the held reference (if any), leaving the handle empty
    pub fn reset(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: `ptr` came from a handle that owned one reference.
            unsafe {
                Self::release_ptr(ptr);
            }
        }
    }

    /// Move the reference out, leaving this handle empty. Does not touch the count.
    pub fn take(&mut self) -> Self {
        RefHandle {
            ptr: self.ptr.take(),
            phantom_data: PhantomData,
        }
    }

    unsafe fn release_ptr(ptr: NonNull<T>) {
        if ptr.as_ref().ref_count().release() {
            let boxed = Box::from_raw(ptr.as_ptr());
            boxed.on_released();
        }
    }
}

impl<T: RefCounted> Default for RefHandle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: RefCounted> Clone for RefHandle<T> {
    fn clone(&self) -> Self {
        if let Some(value) = self.get() {
            value.ref_count().add_ref();
        }

        RefHandle {
            ptr: self.ptr,
            phantom_data: PhantomData,
        }
    }

    fn clone_from(
        &mut self,
        source: &Self,
    ) {
        if self.ptr == source.ptr {
            return;
        }

        self.reset();
        *self = source.clone();
    }
}

impl<T: RefCounted> Drop for RefHandle<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: RefCounted> Deref for RefHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.get()
            .unwrap_or_else(|| panic!("dereferenced an empty RefHandle"))
    }
}

impl<T: RefCounted> PartialEq for RefHandle<T> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ptr == other.ptr
    }
}

impl<T: RefCounted> Eq for RefHandle<T> {}

impl<T: RefCounted> PartialEq<*const T> for RefHandle<T> {
    fn eq(
        &self,
        other: &*const T,
    ) -> bool {
        self.as_ptr() == *other
    }
}

impl<T: RefCounted> Hash for RefHandle<T> {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.as_ptr().hash(state);
    }
}

impl<T: RefCounted> std::fmt::Debug for RefHandle<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RefHandle")
            .field("ptr", &self.as_ptr())
            .field("refs", &self.refs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::{Arc, Barrier};

    struct TrackedObject {
        ref_count: RefCount,
        alive: AtomicBool,
        released: Arc<AtomicUsize>,
    }

    impl TrackedObject {
        fn new(released: &Arc<AtomicUsize>) -> Self {
            TrackedObject {
                ref_count: RefCount::new(),
                alive: AtomicBool::new(true),
                released: released.clone(),
            }
        }

        fn touch(&self) {
            assert!(self.alive.load(Ordering::Acquire), "use after release");
        }
    }

    impl RefCounted for TrackedObject {
        fn ref_count(&self) -> &RefCount {
            &self.ref_count
        }

        fn on_released(self: Box<Self>) {
            self.alive.store(false, Ordering::Release);
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_new_handle_holds_one_ref() {
        let released = Arc::new(AtomicUsize::new(0));
        let handle = RefHandle::new(TrackedObject::new(&released));
        assert_eq!(handle.refs(), 1);
        assert!(!handle.is_empty());

        drop(handle);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clone_and_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let a = RefHandle::new(TrackedObject::new(&released));
        let b = a.clone();
        let c = b.clone();
        assert_eq!(a.refs(), 3);
        assert_eq!(a, b);
        assert_eq!(b, c);

        drop(a);
        drop(c);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        b.touch();

        drop(b);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_take_moves_without_counting() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut a = RefHandle::new(TrackedObject::new(&released));
        let b = a.take();
        assert!(a.is_empty());
        assert_eq!(b.refs(), 1);

        drop(a);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(b);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clone_from_self_is_noop() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut a = RefHandle::new(TrackedObject::new(&released));
        let b = a.clone();
        a.clone_from(&b);
        assert_eq!(a.refs(), 2);

        let other = RefHandle::new(TrackedObject::new(&released));
        a.clone_from(&other);
        assert_eq!(b.refs(), 1);
        assert_eq!(other.refs(), 2);
        assert_eq!(a, other);
        assert_eq!(released.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_raw_pointer_round_trip() {
        let released = Arc::new(AtomicUsize::new(0));
        let a = RefHandle::new(TrackedObject::new(&released));
        let raw = a.clone().into_raw();
        assert!(a == raw);
        assert_eq!(a.refs(), 2);

        let b = unsafe { RefHandle::from_raw(raw, false) };
        assert_eq!(b.refs(), 2);
        let c = unsafe { RefHandle::from_raw(raw, true) };
        assert_eq!(c.refs(), 3);

        drop(a);
        drop(b);
        drop(c);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_handle() {
        let mut handle = RefHandle::<TrackedObject>::empty();
        assert!(handle.is_empty());
        assert!(handle.get().is_none());
        assert_eq!(handle.refs(), 0);
        assert!(handle == std::ptr::null::<TrackedObject>());
        handle.reset();
        let cloned = handle.clone();
        assert_eq!(cloned, handle);
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty RefHandle")]
    fn test_deref_empty_panics() {
        let handle = RefHandle::<TrackedObject>::empty();
        handle.touch();
    }

    #[test]
    fn test_concurrent_holders_release_exactly_once() {
        const THREAD_COUNT: usize = 8;
        const ITERATIONS: usize = 2000;

        let released = Arc::new(AtomicUsize::new(0));
        let root = RefHandle::new(TrackedObject::new(&released));

        let barrier = Arc::new(Barrier::new(THREAD_COUNT));
        let mut join_handles = Vec::new();
        for thread_index in 0..THREAD_COUNT {
            let mut held = vec![root.clone()];
            let barrier = barrier.clone();
            join_handles.push(std::thread::spawn(move || {
                barrier.wait();
                let mut rng = rand::rngs::StdRng::seed_from_u64(thread_index as u64);
                for _ in 0..ITERATIONS {
                    if held.is_empty() || rng.gen_range(0..3) > 0 {
                        if let Some(existing) = held.last() {
                            existing.touch();
                            held.push(existing.clone());
                        }
                    } else {
                        let index = rng.gen_range(0..held.len());
                        held.swap_remove(index);
                    }

                    if held.len() > 64 {
                        held.truncate(1);
                    }
                }
                held
            }));
        }

        let survivors: Vec<_> = join_handles
            .into_iter()
            .map(|join_handle| join_handle.join().unwrap())
            .collect();

        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(survivors);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        assert_eq!(root.refs(), 1);
        drop(root);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
