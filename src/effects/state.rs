//! Mutable-state effect: the resource is the state value itself.

use std::marker::PhantomData;

use crate::algebra::Operation;

/// Reads the current state. Entry and exit states are identical; the
/// result equals the resource value.
pub struct Get<T>(PhantomData<T>);

impl<T> Get<T> {
    /// Builds a read operation.
    pub fn new() -> Self {
        Get(PhantomData)
    }
}

impl<T> Default for Get<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Operation for Get<T> {
    type Entry = T;
    type Exit = T;
    type Out = T;
    const NAME: &'static str = "state.get";
}

/// Replaces the state with a new value of the same type.
pub struct Put<T>(pub T);

impl<T: 'static> Operation for Put<T> {
    type Entry = T;
    type Exit = T;
    type Out = ();
    const NAME: &'static str = "state.put";
}

/// Replaces the state with a value of a different type entirely.
///
/// The enclosing program's resource collection changes shape at this
/// point, so `PutM` only composes inside an [`EffM`](crate::EffM).
pub struct PutM<S, T> {
    /// The new state value.
    pub value: T,
    _from: PhantomData<S>,
}

impl<S, T> PutM<S, T> {
    /// Builds a type-changing write.
    pub fn new(value: T) -> Self {
        PutM {
            value,
            _from: PhantomData,
        }
    }
}

impl<S: 'static, T: 'static> Operation for PutM<S, T> {
    type Entry = S;
    type Exit = T;
    type Out = ();
    const NAME: &'static str = "state.put_m";
}
