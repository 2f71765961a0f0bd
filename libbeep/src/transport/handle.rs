// libbeep/src/transport/handle.rs

//! Owning handle that releases a transport exactly once.

use std::ops::{Deref, DerefMut};

use crate::transport::traits::TransportResource;

/// Exclusive owner of a transport. The transport is released exactly once,
/// when the handle is dropped or consumed by [`TransportHandle::release`];
/// a released handle cannot be used again because it no longer exists.
pub struct TransportHandle<T: ?Sized + TransportResource> {
    inner: Box<T>,
}

impl<T: ?Sized + TransportResource> TransportHandle<T> {
    /// Take ownership of `inner`.
    pub fn new(inner: Box<T>) -> Self {
        Self { inner }
    }

    /// Release now instead of at end of scope.
    pub fn release(self) {
        drop(self)
    }
}

impl<T: ?Sized + TransportResource> Deref for TransportHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + TransportResource> DerefMut for TransportHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: ?Sized + TransportResource> Drop for TransportHandle<T> {
    fn drop(&mut self) {
        self.inner.release();
    }
}

impl<T: ?Sized + TransportResource> std::fmt::Debug for TransportHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TransportHandle")
    }
}
