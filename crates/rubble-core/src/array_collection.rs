// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structure-of-arrays storage.
//!
//! An [`ArrayCollection`] owns every attribute array registered with it and
//! is the only place their length can change, so index `i` addresses the same
//! particle in every array. Registration hands back a typed [`ArrayIndex`];
//! the element type is checked when the handle is resolved.

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

/// Length management shared by every registered array.
trait ArrayCollectionArrayBase: Any + fmt::Debug {
    fn resize(&mut self, len: usize);
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// One attribute array. New slots are filled with a per-array value.
///
/// Exposes its elements as a slice; it cannot be resized outside the owning
/// collection.
#[derive(Debug, Clone)]
pub struct ArrayCollectionArray<T> {
    data: Vec<T>,
    fill: T,
}

impl<T> ArrayCollectionArray<T> {
    /// Value given to newly added elements.
    pub fn fill(&self) -> &T {
        &self.fill
    }
}

impl<T> Deref for ArrayCollectionArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for ArrayCollectionArray<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> ArrayCollectionArrayBase for ArrayCollectionArray<T>
where
    T: Clone + fmt::Debug + 'static,
{
    fn resize(&mut self, len: usize) {
        self.data.resize(len, self.fill.clone());
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed handle to an array registered with an [`ArrayCollection`].
pub struct ArrayIndex<T> {
    slot: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArrayIndex<T> {
    /// Registration order of the array inside its collection.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl<T> Clone for ArrayIndex<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArrayIndex<T> {}

impl<T> PartialEq for ArrayIndex<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<T> Eq for ArrayIndex<T> {}

impl<T> fmt::Debug for ArrayIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayIndex<{}>({})", core::any::type_name::<T>(), self.slot)
    }
}

#[cold]
#[track_caller]
#[allow(clippy::panic)]
fn mismatched_handle<T>(slot: usize) -> ! {
    panic!(
        "array slot {slot} is not an array of {}; handle came from another collection",
        core::any::type_name::<T>()
    )
}

/// Owner of a set of equal-length attribute arrays.
#[derive(Debug, Default)]
pub struct ArrayCollection {
    size: usize,
    arrays: Vec<Box<dyn ArrayCollectionArrayBase>>,
}

impl ArrayCollection {
    /// Empty collection with no arrays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements in every array.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of registered arrays.
    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    /// Current length of every registered array, in registration order.
    pub fn array_lens(&self) -> Vec<usize> {
        self.arrays.iter().map(|a| a.len()).collect()
    }

    /// Registers an array whose new elements are `T::default()`.
    pub fn add_array<T>(&mut self) -> ArrayIndex<T>
    where
        T: Default + Clone + fmt::Debug + 'static,
    {
        self.add_array_with(T::default())
    }

    /// Registers an array whose new elements are `fill`.
    ///
    /// The array is sized to the collection immediately.
    pub fn add_array_with<T>(&mut self, fill: T) -> ArrayIndex<T>
    where
        T: Clone + fmt::Debug + 'static,
    {
        let mut array = ArrayCollectionArray { data: Vec::new(), fill };
        ArrayCollectionArrayBase::resize(&mut array, self.size);
        self.arrays.push(Box::new(array));
        ArrayIndex { slot: self.arrays.len() - 1, _marker: PhantomData }
    }

    /// Appends `count` elements to every array and returns the first new index.
    pub fn add_elements(&mut self, count: usize) -> usize {
        let first = self.size;
        self.resize(first + count);
        first
    }

    /// Truncates or grows every array to `len`.
    pub fn resize(&mut self, len: usize) {
        for array in &mut self.arrays {
            array.resize(len);
        }
        self.size = len;
    }

    /// Resolves a handle.
    ///
    /// # Panics
    /// Panics if the handle was issued by a different collection.
    #[track_caller]
    pub fn array<T: 'static>(&self, index: ArrayIndex<T>) -> &ArrayCollectionArray<T> {
        match self.arrays[index.slot].as_any().downcast_ref::<ArrayCollectionArray<T>>() {
            Some(array) => array,
            None => mismatched_handle::<T>(index.slot),
        }
    }

    /// Resolves a handle mutably. Elements may be changed; length may not.
    ///
    /// # Panics
    /// Panics if the handle was issued by a different collection.
    #[track_caller]
    pub fn array_mut<T: 'static>(&mut self, index: ArrayIndex<T>) -> &mut ArrayCollectionArray<T> {
        match self.arrays[index.slot].as_any_mut().downcast_mut::<ArrayCollectionArray<T>>() {
            Some(array) => array,
            None => mismatched_handle::<T>(index.slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_registration_matches_current_size() {
        let mut c = ArrayCollection::new();
        let a = c.add_array::<f32>();
        assert_eq!(c.add_elements(3), 0);
        let b = c.add_array_with(7_u32);
        assert_eq!(c.array(a).len(), 3);
        assert_eq!(&c.array(b)[..], &[7, 7, 7]);
        assert_eq!(c.add_elements(2), 3);
        assert_eq!(c.array_lens(), vec![5, 5]);
    }

    #[test]
    fn resize_truncates_every_array() {
        let mut c = ArrayCollection::new();
        let a = c.add_array::<i64>();
        let b = c.add_array::<Option<usize>>();
        c.add_elements(4);
        c.array_mut(a)[3] = 9;
        c.resize(2);
        assert_eq!(c.size(), 2);
        assert_eq!(c.array(a).len(), 2);
        assert_eq!(c.array(b).len(), 2);
    }

    #[test]
    #[should_panic(expected = "not an array of")]
    fn foreign_handle_is_rejected() {
        let mut first = ArrayCollection::new();
        let _ = first.add_array::<f32>();
        let mut second = ArrayCollection::new();
        let wrong = second.add_array::<u8>();
        let _ = first.array(wrong);
    }
}
