// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use core::fmt;

use rubble_math::Vec3;

use crate::array_collection::{ArrayCollection, ArrayIndex};

/// Bottom layer: owns the collection and the position array.
#[derive(Debug)]
pub struct Particles {
    collection: ArrayCollection,
    x: ArrayIndex<Vec3>,
}

impl Default for Particles {
    fn default() -> Self {
        Self::new()
    }
}

impl Particles {
    /// Empty particle set with the position array registered.
    pub fn new() -> Self {
        let mut collection = ArrayCollection::new();
        let x = collection.add_array::<Vec3>();
        Self { collection, x }
    }

    /// Number of particles.
    pub fn size(&self) -> usize {
        self.collection.size()
    }

    /// Appends `count` default-initialized particles; returns the first index.
    pub fn add_particles(&mut self, count: usize) -> usize {
        self.collection.add_elements(count)
    }

    /// Truncates or grows every attribute array together.
    pub fn resize(&mut self, len: usize) {
        self.collection.resize(len);
    }

    /// Registers an auxiliary per-particle array (e.g. cluster bookkeeping).
    pub fn add_array<T>(&mut self) -> ArrayIndex<T>
    where
        T: Default + Clone + fmt::Debug + 'static,
    {
        self.collection.add_array()
    }

    /// Registers an auxiliary per-particle array with an explicit fill value.
    pub fn add_array_with<T>(&mut self, fill: T) -> ArrayIndex<T>
    where
        T: Clone + fmt::Debug + 'static,
    {
        self.collection.add_array_with(fill)
    }

    /// The shared attribute storage.
    pub fn collection(&self) -> &ArrayCollection {
        &self.collection
    }

    /// Mutable attribute storage; lengths can only change through the
    /// collection itself.
    pub fn collection_mut(&mut self) -> &mut ArrayCollection {
        &mut self.collection
    }

    soa_accessors! {
        /// Position (center of mass) in world space.
        x, x_mut: Vec3;
    }
}
