//! Resource model and the typed, ordered effect collection.
//!
//! Each effect instance owns one resource: the state the effect carries
//! between operations. Resources are replaced wholesale by dispatch,
//! never mutated in place; replacement is what makes state transitions
//! explicit and type-checkable.
//!
//! A program's resources live in an ordered heterogeneous list. Slots
//! are addressed by a label type (the effect's name), located at compile
//! time through index inference, so an operation touches exactly its own
//! slot and leaves every other resource untouched and in place.

use std::marker::PhantomData;

/// The resource of effect `L`, currently in state `A`.
///
/// `L` is a user-defined unit struct naming the effect instance; `A` is
/// whatever state type the effect's protocol is currently in.
pub struct Res<L, A> {
    state: A,
    _label: PhantomData<L>,
}

impl<L, A> Res<L, A> {
    /// Wraps a state value as the resource of effect `L`.
    pub fn new(state: A) -> Self {
        Res {
            state,
            _label: PhantomData,
        }
    }

    /// Consumes the slot, yielding the state.
    pub fn into_state(self) -> A {
        self.state
    }

    /// Reads the current state.
    pub fn state(&self) -> &A {
        &self.state
    }
}

impl<L, A: Clone> Clone for Res<L, A> {
    fn clone(&self) -> Self {
        Res::new(self.state.clone())
    }
}

impl<L, A: std::fmt::Debug> std::fmt::Debug for Res<L, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Res").field(&self.state).finish()
    }
}

/// Labels a state value with an effect name given as a value.
///
/// Avoids the turbofish of [`Res::new`]: `res(Counter, 0)`.
pub fn res<L, A>(_label: L, state: A) -> Res<L, A> {
    Res::new(state)
}

/// Empty resource collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nil;

/// Resource collection cell: head slot plus the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cons<H, T>(pub H, pub T);

/// Index marker: the slot is at the head of the collection.
pub struct Here;

/// Index marker: the slot is somewhere in the tail.
pub struct There<I>(PhantomData<I>);

/// Placeholder left in a collection while its labelled slot's resource
/// is out with a handler.
pub struct Gap<L>(PhantomData<L>);

impl<L> Gap<L> {
    fn new() -> Self {
        Gap(PhantomData)
    }
}

/// Removes the resource of effect `L` (in state `A`) from the
/// collection, leaving a typed gap in its position.
///
/// The index `I` is inferred from the label, which is what makes lookup
/// by effect name a compile-time operation: a collection with no `L`
/// slot in state `A` simply has no impl, and the program fails to
/// build.
pub trait Take<L, A, I> {
    /// The collection with a gap where the `L` slot was.
    type Gapped;
    /// Splits off the `L` slot's state.
    fn take(self) -> (A, Self::Gapped);
}

impl<L, A, T> Take<L, A, Here> for Cons<Res<L, A>, T> {
    type Gapped = Cons<Gap<L>, T>;

    fn take(self) -> (A, Self::Gapped) {
        (self.0.into_state(), Cons(Gap::new(), self.1))
    }
}

impl<L, A, H, T, I> Take<L, A, There<I>> for Cons<H, T>
where
    T: Take<L, A, I>,
{
    type Gapped = Cons<H, T::Gapped>;

    fn take(self) -> (A, Self::Gapped) {
        let (state, rest) = self.1.take();
        (state, Cons(self.0, rest))
    }
}

/// Refills the gap left by [`Take`] with a state of a possibly
/// different type - the exit state of the dispatched operation.
pub trait Plug<L, B, I> {
    /// The collection with the gap refilled by a `Res<L, B>` slot.
    type Plugged;
    /// Puts `state` back into the gap.
    fn plug(self, state: B) -> Self::Plugged;
}

impl<L, B, T> Plug<L, B, Here> for Cons<Gap<L>, T> {
    type Plugged = Cons<Res<L, B>, T>;

    fn plug(self, state: B) -> Self::Plugged {
        Cons(Res::new(state), self.1)
    }
}

impl<L, B, H, T, I> Plug<L, B, There<I>> for Cons<H, T>
where
    T: Plug<L, B, I>,
{
    type Plugged = Cons<H, T::Plugged>;

    fn plug(self, state: B) -> Self::Plugged {
        Cons(self.0, self.1.plug(state))
    }
}

/// Disjoint-union resource for fallible transitions.
///
/// An operation whose outcome decides the next protocol state (file
/// open) exits into `Checked`; the only way to get at either branch is
/// the [`check`](crate::program::check) combinator, which forces the
/// caller to supply a program for both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checked<F, S> {
    /// The transition failed; the resource is in the failure state.
    Failed(F),
    /// The transition succeeded with this resource.
    Succeeded(S),
}

/// Builds a resource collection from `label => state` pairs, preserving
/// order.
///
/// ```
/// use resourcery::resources;
///
/// #[derive(Clone, Copy)]
/// struct Counter;
///
/// let env = resources![Counter => 0i32];
/// # let _ = env;
/// ```
#[macro_export]
macro_rules! resources {
    () => { $crate::resource::Nil };
    ($label:expr => $state:expr $(, $rl:expr => $rs:expr)* $(,)?) => {
        $crate::resource::Cons(
            $crate::resource::res($label, $state),
            $crate::resources!($($rl => $rs),*),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    struct A;
    #[derive(Clone, Copy)]
    struct B;

    #[test]
    fn take_leaves_other_slots_in_position() {
        let env = resources![A => 1i32, B => "untouched"];
        let (state, gapped): (i32, _) = Take::<A, i32, Here>::take(env);
        assert_eq!(state, 1);
        let refilled = Plug::<A, u64, Here>::plug(gapped, 9u64);
        assert_eq!(*refilled.0.state(), 9u64);
        assert_eq!(*refilled.1 .0.state(), "untouched");
    }

    #[test]
    fn take_reaches_into_the_tail() {
        let env = resources![A => 1i32, B => 2i32];
        let (state, gapped): (i32, _) = Take::<B, i32, There<Here>>::take(env);
        assert_eq!(state, 2);
        let refilled = Plug::<B, i32, There<Here>>::plug(gapped, 7);
        assert_eq!(*refilled.0.state(), 1);
        assert_eq!(*refilled.1 .0.state(), 7);
    }
}
