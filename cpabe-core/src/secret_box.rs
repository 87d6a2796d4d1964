use alloc::boxed::Box;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A container for secret data (master keys, symmetric keys).
///
/// Keeps the value on the heap so that borrowing it does not leave copies on the stack,
/// and zeroizes it on drop.
#[derive(Clone)] // No Debug derivation, to avoid exposing the secret data accidentally.
pub struct SecretBox<T>(Box<T>)
where
    T: Zeroize + Clone;

impl<T: PartialEq + Zeroize + Clone> PartialEq<SecretBox<T>> for SecretBox<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> SecretBox<T>
where
    T: Zeroize + Clone,
{
    /// Moves the value into a new container.
    pub fn new(val: T) -> Self {
        Self(Box::new(val))
    }

    /// Returns an immutable reference to the secret data.
    pub fn as_secret(&self) -> &T {
        self.0.as_ref()
    }

    /// Returns a mutable reference to the secret data.
    pub fn as_mut_secret(&mut self) -> &mut T {
        self.0.as_mut()
    }
}

impl<T> Drop for SecretBox<T>
where
    T: Zeroize + Clone,
{
    fn drop(&mut self) {
        self.0.as_mut().zeroize()
    }
}

impl<T> ZeroizeOnDrop for SecretBox<T> where T: Zeroize + Clone {}
