//! # Display List Cache
//!
//! Draws are cached per caller-supplied identifier (UID). Within a list the
//! n-th draw of a tick lands in the n-th instance and mesh slot, so the
//! submission order is part of the identity:
//!
//! ```text
//!   uid 42 ──► [ instance 0 | instance 1 | instance 2 ]   prev/new transform
//!              [ mesh 0     | mesh 1     | mesh 2     ]   touched, live count
//! ```
//!
//! UID 0 opts out of caching. Its draws go to a transient list that never
//! reuses anything and is emptied at every commit.

use std::collections::HashMap;

use tickframe_core::Interpolated;
use tickframe_shared::{Matrix4, Rect};

use crate::backend::{InstanceDesc, InstanceHandle, RenderBackend};
use crate::mesh::MeshSlot;

/// One cached backend instance and its temporal state.
#[derive(Debug, Clone)]
pub struct InstanceSlot {
    pub(crate) instance: InstanceHandle,
    pub(crate) desc: InstanceDesc,
    pub(crate) transform: Interpolated<Matrix4>,
    pub(crate) scissor: Interpolated<Rect>,
    pub(crate) viewport: Interpolated<Rect>,
}

impl InstanceSlot {
    /// Creates the backend instance.
    pub fn create<B: RenderBackend>(backend: &mut B) -> Self {
        Self {
            instance: backend.create_instance(),
            desc: InstanceDesc::default(),
            transform: Interpolated::new(Matrix4::IDENTITY),
            scissor: Interpolated::new(Rect::default()),
            viewport: Interpolated::new(Rect::default()),
        }
    }

    /// Destroys the backend instance.
    pub fn release<B: RenderBackend>(self, backend: &mut B) {
        if !self.instance.is_null() {
            backend.destroy_instance(self.instance);
        }
    }

    /// Backend instance.
    #[inline]
    #[must_use]
    pub const fn instance(&self) -> InstanceHandle {
        self.instance
    }

    /// Description resolved at submission.
    #[inline]
    #[must_use]
    pub const fn desc(&self) -> &InstanceDesc {
        &self.desc
    }

    /// Transform pair.
    #[inline]
    #[must_use]
    pub const fn transform(&self) -> &Interpolated<Matrix4> {
        &self.transform
    }

    /// Returns true once a tick has been committed for this instance.
    #[inline]
    #[must_use]
    pub const fn prev_valid(&self) -> bool {
        self.transform.prev_valid()
    }

    /// Stages this tick's placement.
    pub fn stage(&mut self, transform: Matrix4, scissor: Rect, viewport: Rect) {
        self.transform.set_new(transform);
        self.scissor.set_new(scissor);
        self.viewport.set_new(viewport);
    }

    /// Drops interpolation for this tick.
    pub fn snap(&mut self) {
        self.transform.snap();
        self.scissor.snap();
        self.viewport.snap();
    }

    /// Description at weight `t`.
    #[must_use]
    pub fn sample(&self, t: f32) -> InstanceDesc {
        InstanceDesc {
            transform: self.transform.sample(t),
            scissor: self.scissor.sample(t),
            viewport: self.viewport.sample(t),
            ..self.desc
        }
    }

    /// Folds this tick's placement into the previous one.
    pub fn commit(&mut self) {
        self.transform.commit();
        self.scissor.commit();
        self.viewport.commit();
    }
}

/// Everything cached under one UID.
#[derive(Debug, Clone)]
pub struct DisplayListSlot {
    pub(crate) instances: Vec<InstanceSlot>,
    pub(crate) meshes: Vec<MeshSlot>,
    pub(crate) transform: Interpolated<Matrix4>,
    pub(crate) touched: bool,
    pub(crate) live_count: usize,
}

impl DisplayListSlot {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
            meshes: Vec::new(),
            transform: Interpolated::new(Matrix4::IDENTITY),
            touched: false,
            live_count: 0,
        }
    }

    /// Cached instances.
    #[must_use]
    pub fn instances(&self) -> &[InstanceSlot] {
        &self.instances
    }

    /// Cached meshes.
    #[must_use]
    pub fn meshes(&self) -> &[MeshSlot] {
        &self.meshes
    }

    /// Draws submitted this tick.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Returns true if the list was used this tick.
    #[inline]
    #[must_use]
    pub const fn touched(&self) -> bool {
        self.touched
    }

    /// The list's own transform pair (set by graph-node light placement).
    #[inline]
    #[must_use]
    pub const fn transform(&self) -> &Interpolated<Matrix4> {
        &self.transform
    }

    /// Records the list's transform for this tick and marks it touched.
    pub fn set_transform(&mut self, transform: Matrix4) {
        self.transform.set_new(transform);
        self.touched = true;
    }

    /// Instance slot `index`, created if it is one past the end.
    ///
    /// # Panics
    ///
    /// Panics if `index` skips past the end.
    pub fn instance_at<B: RenderBackend>(&mut self, backend: &mut B, index: usize) -> &mut InstanceSlot {
        assert!(
            index <= self.instances.len(),
            "instance index {index} skips past {}",
            self.instances.len()
        );
        if index == self.instances.len() {
            self.instances.push(InstanceSlot::create(backend));
        }
        &mut self.instances[index]
    }

    /// Destroys slots beyond this tick's live count. Returns
    /// `(instances, meshes)` destroyed.
    pub fn trim<B: RenderBackend>(&mut self, backend: &mut B) -> (usize, usize) {
        let instances = self.instances.len().saturating_sub(self.live_count);
        for slot in self.instances.drain(self.live_count.min(self.instances.len())..) {
            slot.release(backend);
        }
        let meshes = self.meshes.len().saturating_sub(self.live_count);
        for slot in self.meshes.drain(self.live_count.min(self.meshes.len())..) {
            slot.release(backend);
        }
        (instances, meshes)
    }

    /// Destroys every slot.
    pub fn release<B: RenderBackend>(mut self, backend: &mut B) {
        self.clear(backend);
    }

    /// Destroys every slot and resets the list in place.
    pub fn clear<B: RenderBackend>(&mut self, backend: &mut B) {
        for slot in self.instances.drain(..) {
            slot.release(backend);
        }
        for slot in self.meshes.drain(..) {
            slot.release(backend);
        }
        self.live_count = 0;
        self.touched = false;
    }
}

impl Default for DisplayListSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// All display lists plus the transient list for UID 0.
#[derive(Debug, Default)]
pub struct DisplayListCache {
    lists: HashMap<u32, DisplayListSlot>,
    transient: DisplayListSlot,
}

impl DisplayListCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List for `uid`, created on first use. UID 0 maps to the transient
    /// list.
    pub fn list_mut(&mut self, uid: u32) -> &mut DisplayListSlot {
        if uid == 0 {
            return &mut self.transient;
        }
        self.lists.entry(uid).or_default()
    }

    /// Cached list for `uid`.
    #[must_use]
    pub fn get(&self, uid: u32) -> Option<&DisplayListSlot> {
        self.lists.get(&uid)
    }

    /// Returns true if `uid` is cached.
    #[must_use]
    pub fn contains(&self, uid: u32) -> bool {
        self.lists.contains_key(&uid)
    }

    /// Number of cached lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// The transient list.
    #[must_use]
    pub fn transient(&self) -> &DisplayListSlot {
        &self.transient
    }

    /// Cached lists, excluding the transient one.
    pub fn cached(&self) -> impl Iterator<Item = (u32, &DisplayListSlot)> {
        self.lists.iter().map(|(&uid, list)| (uid, list))
    }

    /// Mutable cached lists, excluding the transient one.
    pub fn cached_mut(&mut self) -> impl Iterator<Item = &mut DisplayListSlot> {
        self.lists.values_mut()
    }

    /// Every list that draws this tick, transient included.
    pub fn drawable(&self) -> impl Iterator<Item = &DisplayListSlot> {
        self.lists.values().chain(std::iter::once(&self.transient))
    }

    /// Evicts every list not touched this tick. Returns how many.
    pub fn evict_untouched<B: RenderBackend>(&mut self, backend: &mut B) -> usize {
        let stale: Vec<u32> = self
            .lists
            .iter()
            .filter(|(_, list)| !list.touched)
            .map(|(&uid, _)| uid)
            .collect();
        for uid in &stale {
            if let Some(list) = self.lists.remove(uid) {
                list.release(backend);
            }
        }
        stale.len()
    }

    /// Destroys the transient list's resources. Returns how many instances
    /// were released.
    pub fn release_transient<B: RenderBackend>(&mut self, backend: &mut B) -> usize {
        let count = self.transient.instances.len();
        self.transient.clear(backend);
        count
    }

    /// Destroys everything.
    pub fn release_all<B: RenderBackend>(&mut self, backend: &mut B) {
        for (_, list) in self.lists.drain() {
            list.release(backend);
        }
        self.transient.clear(backend);
    }
}
