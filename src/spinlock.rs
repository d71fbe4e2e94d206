// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! A minimal busy-wait spinlock, usable before anything else has been set up.
//!
//! The lock is a single atomic word which is either free or held. Acquiring it spins until an
//! atomic compare-and-swap moves it from free to held, with acquire ordering; releasing it is a
//! store with release ordering. Together these make everything the previous holder wrote visible to
//! the next holder.
//!
//! There is no queueing, so under contention any waiting core may win and a core can in principle
//! be starved. There is also no timeout. Callers which need a bounded wait must build it on top of
//! [`SpinLock::try_acquire`].

use core::{
    cell::UnsafeCell,
    fmt::{self, Debug, Formatter},
    hint::spin_loop,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A bare spinlock which doesn't protect any particular data.
///
/// A `static` `SpinLock` is initialised by [`SpinLock::new`] at compile time, so it is always free
/// before the first core tries to acquire it.
pub struct SpinLock {
    /// True when some context holds the lock.
    held: AtomicBool,
}

impl SpinLock {
    /// Creates a new lock in the free state.
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Busy-waits until the lock can be taken, then takes it.
    ///
    /// The calling context must not already hold the lock, or this will spin forever.
    pub fn acquire(&self) {
        while self
            .held
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Wait with plain loads until it looks free, to avoid hammering the cache line with
            // exclusive accesses.
            while self.held.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }

    /// Tries to take the lock once, without waiting.
    ///
    /// Returns true if the lock was free and is now held by the caller.
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The calling context must hold the lock, i.e. it must have successfully called
    /// [`acquire`](Self::acquire) or [`try_acquire`](Self::try_acquire) and not yet released it.
    /// Releasing a lock held by somebody else breaks mutual exclusion for its holder.
    pub unsafe fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    /// Acquires the lock and returns a guard which will release it when dropped.
    pub fn lock(&self) -> SpinLockGuard<'_> {
        self.acquire();
        SpinLockGuard { lock: self }
    }

    /// Tries to acquire the lock without waiting, returning a guard if successful.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_>> {
        self.try_acquire().then_some(SpinLockGuard { lock: self })
    }

    /// Returns whether the lock is currently held by anybody.
    ///
    /// This is only a snapshot and may be out of date by the time it returns, so it is only useful
    /// for diagnostics.
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SpinLock {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("held", &self.is_locked())
            .finish()
    }
}

/// Proof that a [`SpinLock`] is held. The lock is released when this is dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinLockGuard<'a> {
    lock: &'a SpinLock,
}

impl Drop for SpinLockGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: The guard is only constructed after the lock was acquired, and there is exactly
        // one guard per acquisition.
        unsafe {
            self.lock.release();
        }
    }
}

/// Some data of type `T` which may only be accessed while holding a [`SpinLock`].
pub struct SpinLocked<T: ?Sized> {
    lock: SpinLock,
    data: UnsafeCell<T>,
}

// SAFETY: References to `data` are only handed out by a `SpinLockedGuard`, which can only exist
// while `lock` is held, so at most one context can access it at a time. `T` must be `Send` because
// it may be accessed from different cores in turn.
unsafe impl<T: ?Sized + Send> Sync for SpinLocked<T> {}

impl<T> SpinLocked<T> {
    /// Wraps the given data in a new, free, lock.
    pub const fn new(data: T) -> Self {
        Self {
            lock: SpinLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Consumes the lock and returns the data it protected.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> SpinLocked<T> {
    /// Busy-waits until the lock is free, then returns a guard giving exclusive access to the data.
    pub fn lock(&self) -> SpinLockedGuard<'_, T> {
        self.lock.acquire();
        SpinLockedGuard { locked: self }
    }

    /// Returns a guard giving exclusive access to the data if the lock is currently free.
    pub fn try_lock(&self) -> Option<SpinLockedGuard<'_, T>> {
        self.lock
            .try_acquire()
            .then_some(SpinLockedGuard { locked: self })
    }

    /// Returns a mutable reference to the data.
    ///
    /// No locking is needed as the mutable borrow guarantees exclusive access.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Default> Default for SpinLocked<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Exclusive access to the data in a [`SpinLocked`]. The lock is released when this is dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinLockedGuard<'a, T: ?Sized> {
    locked: &'a SpinLocked<T>,
}

impl<'a, T: ?Sized> SpinLockedGuard<'a, T> {
    /// Consumes the guard without releasing the lock, returning a reference to the data which
    /// lives as long as the lock.
    ///
    /// The lock stays held forever, so this is only useful to hand out a single exclusive
    /// reference to something like a device driver.
    pub fn leak(guard: Self) -> &'a mut T {
        let guard = ManuallyDrop::new(guard);
        // SAFETY: The lock is held and will never be released, because the guard is never
        // dropped, so this is the only reference to the data.
        unsafe { &mut *guard.locked.data.get() }
    }
}

impl<T: ?Sized> Deref for SpinLockedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: The lock is held for as long as the guard exists, so nothing else can access the
        // data.
        unsafe { &*self.locked.data.get() }
    }
}

impl<T: ?Sized> DerefMut for SpinLockedGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: The lock is held for as long as the guard exists, and the guard is mutably
        // borrowed, so this is the only reference to the data.
        unsafe { &mut *self.locked.data.get() }
    }
}

impl<T: ?Sized> Drop for SpinLockedGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: The guard is only constructed after the lock was acquired, and there is exactly
        // one guard per acquisition.
        unsafe {
            self.locked.lock.release();
        }
    }
}
