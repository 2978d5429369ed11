//! Frame-based pooling of transient resources.
//!
//! This module provides [`ResourcePool<R>`], a generational slot table that
//! hands out [`ResourceHandle`]s to short-lived resources such as render
//! targets or scratch buffers. Physical resources are kept alive across
//! frames and transparently reused whenever a later request asks for the
//! same shape, so unrelated passes can alias one allocation without knowing
//! about each other.
//!
//! # Frame lifecycle
//!
//! ```text
//! start_frame()                      (once per frame, before any create)
//!   ├─ leak check on unpreserved slots still in use
//!   ├─ reset per-frame debug names
//!   └─ hysteresis: tear down slots unused for too long
//!
//! create(desc, name) -> handle       (reuse a free matching slot, or allocate)
//! ... accessors keyed by handle ...
//! release(handle) | preserve(handle)
//!
//! destroy_resources()                (shutdown / resize, invalidates all handles)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use respool_core::pool::{PoolSettings, ResourcePool};
//!
//! let mut pool = ResourcePool::<MyBuffer>::new(device);
//! pool.start_frame();
//! let scratch = pool.create(&desc, "scratch")?;
//! // ... record work using pool.resource(scratch) ...
//! pool.release(scratch);
//! ```
//!
//! The pool is single-threaded: it performs no locking, and a handle must not
//! be released between a validity check and a following accessor call.

use std::fmt;
use std::sync::Arc;

use static_assertions::const_assert;

use crate::handle::ResourceHandle;
use crate::{profile_function, profile_plot};

/// Number of frames the GPU may be working on concurrently.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Top bit of a slot generation. Set while the slot is not in use.
const NOT_IN_USE_GENERATION_FLAG: u64 = 1 << 63;

/// `frames_since_used` value marking a torn-down slot.
const FRAMES_DESTROYED: u8 = 0xFF;

const_assert!(2 * MAX_FRAMES_IN_FLIGHT < FRAMES_DESTROYED as usize);

// ============================================================================
// Resource traits
// ============================================================================

/// A physical resource that can live in a [`ResourcePool`].
///
/// Implementors describe how to create and destroy themselves through a
/// device, which is injected into the pool at construction.
pub trait PoolResource: Sized {
    /// Shape of the resource, compared to decide whether a slot can be reused.
    type Description: Clone + PartialEq + fmt::Debug;
    /// Native API handle exposed to callers.
    type Native: Copy + PartialEq + fmt::Debug;
    /// Device that creates and destroys the resource.
    type Device: ?Sized;
    /// Error returned when the device fails to create the resource.
    type Error;

    /// Create a physical resource matching `description`.
    fn create(
        device: &Self::Device,
        description: &Self::Description,
        debug_name: &str,
    ) -> Result<Self, Self::Error>;

    /// Destroy the physical resource.
    fn destroy(self, device: &Self::Device);

    /// Native handle of the physical resource.
    fn native(&self) -> Self::Native;

    /// Attach a debug name to the physical resource.
    fn set_debug_name(&self, device: &Self::Device, name: &str);

    /// Whether a free slot created with `existing` can serve `requested`.
    fn matches(existing: &Self::Description, requested: &Self::Description) -> bool {
        existing == requested
    }
}

/// A pooled resource that tracks its own synchronization state.
pub trait StatefulResource: PoolResource {
    /// Usage state the resource can be transitioned into.
    type State: Copy + fmt::Debug;
    /// Barrier produced by a transition.
    type Barrier;
    /// Command buffer the barrier is recorded into.
    type CommandBuffer: Copy;

    /// Compute the barrier needed to move into `state` and record the new state.
    ///
    /// Returns `None` when the transition is redundant, unless `force_barrier`
    /// is set.
    fn transition_barrier(&mut self, state: Self::State, force_barrier: bool)
    -> Option<Self::Barrier>;

    /// Record a barrier into a command buffer.
    fn record_barrier(device: &Self::Device, cmd: Self::CommandBuffer, barrier: Self::Barrier);
}

// ============================================================================
// Settings
// ============================================================================

/// Tuning knobs for a [`ResourcePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    destroy_delay_frames: u8,
}

impl PoolSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unused frames a slot survives before it is torn down.
    ///
    /// Clamped below the torn-down sentinel.
    pub fn with_destroy_delay_frames(mut self, frames: u8) -> Self {
        self.destroy_delay_frames = frames.min(FRAMES_DESTROYED - 1);
        self
    }

    /// Number of unused frames a slot survives before it is torn down.
    pub fn destroy_delay_frames(&self) -> u8 {
        self.destroy_delay_frames
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            destroy_delay_frames: (2 * MAX_FRAMES_IN_FLIGHT) as u8,
        }
    }
}

// ============================================================================
// ResourcePool
// ============================================================================

/// Generational slot table of physical resources of one kind.
///
/// Slots are stored as parallel arrays indexed by [`ResourceHandle::index`].
/// A slot is in use while the top bit of its generation is clear. Releasing
/// bumps the generation, which invalidates every handle issued for the slot.
pub struct ResourcePool<R: PoolResource> {
    device: Arc<R::Device>,
    settings: PoolSettings,

    resources: Vec<Option<R>>,
    descriptions: Vec<Option<R::Description>>,
    /// `'|'`-joined names of every logical resource mapped to the slot this frame.
    aliased_debug_names: Vec<String>,
    /// Outlives the other arrays across `destroy_resources` so stale handles stay stale.
    generations: Vec<u64>,
    preserved: Vec<bool>,
    frames_since_used: Vec<u8>,
    freelist: Vec<u32>,

    /// Names of every `create`/`append_debug_name` call this frame.
    debug_names: Vec<String>,
    marked_debug_name: Option<String>,
    marked_debug_handle: Option<ResourceHandle<R>>,
}

impl<R: PoolResource> ResourcePool<R> {
    /// Create an empty pool that allocates through `device`.
    pub fn new(device: Arc<R::Device>) -> Self {
        Self::with_settings(device, PoolSettings::default())
    }

    /// Create an empty pool with explicit settings.
    pub fn with_settings(device: Arc<R::Device>, settings: PoolSettings) -> Self {
        Self {
            device,
            settings,
            resources: Vec::new(),
            descriptions: Vec::new(),
            aliased_debug_names: Vec::new(),
            generations: Vec::new(),
            preserved: Vec::new(),
            frames_since_used: Vec::new(),
            freelist: Vec::new(),
            debug_names: Vec::new(),
            marked_debug_name: None,
            marked_debug_handle: None,
        }
    }

    /// Device the pool allocates through.
    pub fn device(&self) -> &Arc<R::Device> {
        &self.device
    }

    /// Settings the pool was created with.
    pub fn settings(&self) -> PoolSettings {
        self.settings
    }

    /// Number of slots, including torn-down ones.
    pub fn slot_count(&self) -> usize {
        self.resources.len()
    }

    /// Number of slots currently holding a physical resource.
    pub fn live_count(&self) -> usize {
        self.resources.iter().filter(|r| r.is_some()).count()
    }

    /// Indices of torn-down slots available for a differently shaped resource.
    pub fn free_slots(&self) -> &[u32] {
        &self.freelist
    }

    fn in_use(&self, index: usize) -> bool {
        self.generations[index] & NOT_IN_USE_GENERATION_FLAG == 0
    }

    // ------------------------------------------------------------------------
    // Frame lifecycle
    // ------------------------------------------------------------------------

    /// Advance to a new frame.
    ///
    /// Must run once per frame before any [`create`](Self::create) call.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if a slot is still in use without having been
    /// preserved during the previous frame.
    pub fn start_frame(&mut self) {
        self.start_frame_with(|_, _| {});
    }

    /// [`start_frame`](Self::start_frame) with a hook that runs right before a
    /// slot's physical resource is torn down.
    ///
    /// Wrappers use the hook to drop state derived from the resource.
    pub fn start_frame_with<F>(&mut self, mut before_destroy: F)
    where
        F: FnMut(u32, &R),
    {
        profile_function!();

        let slot_count = self.resources.len();
        for i in 0..slot_count {
            if self.preserved[i] {
                self.preserved[i] = false;
            } else {
                debug_assert!(
                    !self.in_use(i),
                    "Resource leaked: slot {} ('{}') was neither released nor preserved",
                    i,
                    self.aliased_debug_names[i]
                );
            }
        }

        for name in &mut self.aliased_debug_names {
            name.clear();
        }
        self.debug_names.clear();

        let destroy_delay = self.settings.destroy_delay_frames;
        for i in 0..slot_count {
            let unused_frames = self.frames_since_used[i];
            if unused_frames == FRAMES_DESTROYED {
                continue;
            }

            if unused_frames > destroy_delay {
                if let Some(resource) = self.resources[i].take() {
                    log::debug!(
                        "Tearing down pooled slot {} after {} unused frames",
                        i,
                        unused_frames
                    );
                    before_destroy(i as u32, &resource);
                    resource.destroy(&self.device);
                }
                // The generation stays as is so the index can serve another shape.
                self.descriptions[i] = None;
                self.frames_since_used[i] = FRAMES_DESTROYED;
                self.freelist.push(i as u32);
            } else {
                self.frames_since_used[i] = unused_frames + 1;
            }
        }

        self.marked_debug_handle = None;

        profile_plot!("respool live slots", self.live_count() as f64);
    }

    /// Destroy every physical resource immediately and invalidate all handles.
    ///
    /// The debug mark set through [`mark_for_debug`](Self::mark_for_debug)
    /// survives; only [`clear_debug`](Self::clear_debug) removes it.
    pub fn destroy_resources(&mut self) {
        self.destroy_resources_with(|_, _| {});
    }

    /// [`destroy_resources`](Self::destroy_resources) with a hook that runs
    /// right before each physical resource is destroyed.
    pub fn destroy_resources_with<F>(&mut self, mut before_destroy: F)
    where
        F: FnMut(u32, &R),
    {
        profile_function!();

        let mut destroyed = 0usize;
        for (i, slot) in self.resources.iter_mut().enumerate() {
            if let Some(resource) = slot.take() {
                before_destroy(i as u32, &resource);
                resource.destroy(&self.device);
                destroyed += 1;
            }
        }

        self.resources.clear();
        self.descriptions.clear();
        self.aliased_debug_names.clear();
        for generation in &mut self.generations {
            let stored = *generation & !NOT_IN_USE_GENERATION_FLAG;
            *generation = NOT_IN_USE_GENERATION_FLAG
                | (stored.wrapping_add(1) & !NOT_IN_USE_GENERATION_FLAG);
        }
        self.debug_names.clear();
        self.marked_debug_handle = None;
        self.preserved.clear();
        self.frames_since_used.clear();
        self.freelist.clear();

        if destroyed > 0 {
            log::info!("Destroyed {} pooled resources", destroyed);
        }
    }

    // ------------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------------

    /// Get a handle to a resource matching `description`.
    ///
    /// Reuses the first free slot with a matching description, skipping the
    /// slot that holds the resource marked for debugging. Otherwise a torn-down
    /// slot is recycled or a new one is appended, and the device creates a
    /// fresh physical resource.
    ///
    /// # Errors
    ///
    /// Returns the device error if a new physical resource cannot be created.
    /// The pool is left unchanged in that case.
    pub fn create(
        &mut self,
        description: &R::Description,
        debug_name: &str,
    ) -> Result<ResourceHandle<R>, R::Error> {
        profile_function!();

        if let Some(index) = self.find_reusable(description) {
            let i = index as usize;
            self.generations[i] &= !NOT_IN_USE_GENERATION_FLAG;
            self.frames_since_used[i] = 0;

            let handle = ResourceHandle::new(index, self.generations[i]);
            log::trace!("Aliasing '{}' onto pooled slot {}", debug_name, index);
            self.append_debug_name(handle, debug_name);
            return Ok(handle);
        }

        let recycled = self.freelist.pop();
        let resource = match R::create(&self.device, description, debug_name) {
            Ok(resource) => resource,
            Err(err) => {
                if let Some(index) = recycled {
                    self.freelist.push(index);
                }
                return Err(err);
            }
        };

        let index = match recycled {
            Some(index) => {
                let generation = &mut self.generations[index as usize];
                *generation = (*generation & !NOT_IN_USE_GENERATION_FLAG).wrapping_add(1)
                    & !NOT_IN_USE_GENERATION_FLAG;
                index
            }
            None => self.push_slot(),
        };
        let i = index as usize;
        debug_assert!(self.resources[i].is_none());

        self.resources[i] = Some(resource);
        self.descriptions[i] = Some(description.clone());
        self.aliased_debug_names[i].clear();
        self.aliased_debug_names[i].push_str(debug_name);
        self.preserved[i] = false;
        self.frames_since_used[i] = 0;

        let handle = ResourceHandle::new(index, self.generations[i]);
        self.assert_valid_handle(handle);
        self.register_debug_name(handle, debug_name);

        log::trace!(
            "Created pooled resource '{}' in slot {} ({:?})",
            debug_name,
            index,
            description
        );

        Ok(handle)
    }

    /// Append a slot at the end of every array and return its index.
    fn push_slot(&mut self) -> u32 {
        assert!(
            self.resources.len() < u32::MAX as usize,
            "Resource pool slot indices exhausted"
        );

        self.resources.push(None);
        self.descriptions.push(None);
        self.aliased_debug_names.push(String::new());
        self.preserved.push(false);
        self.frames_since_used.push(0);

        let index = self.resources.len() - 1;
        // Slots that existed before `destroy_resources` keep their bumped generation.
        if self.generations.len() <= index {
            self.generations.push(0);
        } else {
            self.generations[index] &= !NOT_IN_USE_GENERATION_FLAG;
        }

        index as u32
    }

    fn find_reusable(&self, description: &R::Description) -> Option<u32> {
        (0..self.descriptions.len())
            .find(|&i| {
                if self.in_use(i) || self.preserved[i] {
                    return false;
                }

                let Some(existing) = &self.descriptions[i] else {
                    return false;
                };
                R::matches(existing, description) && !self.holds_marked_resource(i)
            })
            .map(|i| i as u32)
    }

    /// Whether the marked name is the last logical name mapped to slot `index`.
    ///
    /// The match has to start on a `'|'` boundary so that `"bloom"` does not
    /// match a slot named `"prebloom"`.
    fn holds_marked_resource(&self, index: usize) -> bool {
        let Some(marked) = self.marked_debug_name.as_deref() else {
            return false;
        };
        if marked.is_empty() {
            return false;
        }

        match self.aliased_debug_names[index].strip_suffix(marked) {
            Some(rest) => rest.is_empty() || rest.ends_with('|'),
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Handle validation
    // ------------------------------------------------------------------------

    /// Check whether `handle` refers to a live logical resource.
    ///
    /// The slot currently resolved by the debug mark also accepts a handle
    /// exactly one generation behind, so the inspector's handle survives the
    /// release of the resource it points at.
    pub fn is_valid_handle(&self, handle: ResourceHandle<R>) -> bool {
        // Any change here needs to be mirrored in assert_valid_handle().
        let i = handle.index() as usize;
        if i >= self.resources.len() || i >= self.generations.len() {
            return false;
        }

        match self.marked_debug_handle {
            Some(marked) if marked.index() == handle.index() => {
                let stored = self.generations[i] & !NOT_IN_USE_GENERATION_FLAG;
                handle.generation() == stored || handle.generation().wrapping_add(1) == stored
            }
            // A matching generation also means the slot is not flagged unused.
            _ => handle.generation() == self.generations[i],
        }
    }

    /// Panic with a precise message if `handle` is not valid.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds or the generation is stale.
    pub fn assert_valid_handle(&self, handle: ResourceHandle<R>) {
        // Any change here needs to be mirrored in is_valid_handle().
        let i = handle.index() as usize;
        assert!(
            i < self.resources.len(),
            "Invalid handle {:?}: index out of bounds for {} slots",
            handle,
            self.resources.len()
        );
        assert!(
            i < self.generations.len(),
            "Invalid handle {:?}: no generation stored for slot",
            handle
        );

        match self.marked_debug_handle {
            Some(marked) if marked.index() == handle.index() => {
                let stored = self.generations[i] & !NOT_IN_USE_GENERATION_FLAG;
                debug_assert!(
                    handle.generation() == stored
                        || handle.generation().wrapping_add(1) == stored,
                    "Stale debug handle {:?}: slot generation is {}",
                    handle,
                    stored
                );
            }
            _ => assert!(
                handle.generation() == self.generations[i],
                "Stale handle {:?}: slot generation is {:#x}",
                handle,
                self.generations[i]
            ),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Physical resource behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid.
    pub fn resource(&self, handle: ResourceHandle<R>) -> &R {
        self.assert_valid_handle(handle);
        match self.resources[handle.index() as usize].as_ref() {
            Some(resource) => resource,
            None => panic!("Handle {:?} refers to a torn-down slot", handle),
        }
    }

    /// Mutable physical resource behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid.
    pub fn resource_mut(&mut self, handle: ResourceHandle<R>) -> &mut R {
        self.assert_valid_handle(handle);
        match self.resources[handle.index() as usize].as_mut() {
            Some(resource) => resource,
            None => panic!("Handle {:?} refers to a torn-down slot", handle),
        }
    }

    /// Native API handle behind `handle`.
    pub fn native_handle(&self, handle: ResourceHandle<R>) -> R::Native {
        self.resource(handle).native()
    }

    /// Description the slot behind `handle` was created with.
    pub fn description(&self, handle: ResourceHandle<R>) -> &R::Description {
        self.assert_valid_handle(handle);
        match self.descriptions[handle.index() as usize].as_ref() {
            Some(description) => description,
            None => panic!("Handle {:?} refers to a torn-down slot", handle),
        }
    }

    /// `'|'`-joined names of every logical resource aliased onto the slot this frame.
    pub fn aliased_debug_name(&self, handle: ResourceHandle<R>) -> &str {
        self.assert_valid_handle(handle);
        &self.aliased_debug_names[handle.index() as usize]
    }

    // ------------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------------

    /// Map another logical name onto the resource behind `handle`.
    ///
    /// The aliased name is forwarded to the device as the object's debug name.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid. In debug builds, also panics if `name`
    /// was already used this frame.
    pub fn append_debug_name(&mut self, handle: ResourceHandle<R>, name: &str) {
        self.assert_valid_handle(handle);

        let i = handle.index() as usize;
        let aliased = &mut self.aliased_debug_names[i];
        if !aliased.is_empty() {
            aliased.push('|');
        }
        aliased.push_str(name);

        if let Some(resource) = &self.resources[i] {
            resource.set_debug_name(&self.device, aliased);
        }

        self.register_debug_name(handle, name);
    }

    fn register_debug_name(&mut self, handle: ResourceHandle<R>, name: &str) {
        debug_assert!(
            !self.debug_names.iter().any(|existing| existing == name),
            "Debug names need to be unique within a frame: '{}'",
            name
        );
        self.debug_names.push(name.to_owned());

        if self.marked_debug_name.as_deref() == Some(name) {
            self.marked_debug_handle = Some(handle);
        }
    }

    /// Keep the resource alive into the next frame.
    ///
    /// Has to be repeated every frame the resource should survive.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid or the resource is already preserved.
    pub fn preserve(&mut self, handle: ResourceHandle<R>) {
        self.assert_valid_handle(handle);

        let i = handle.index() as usize;
        assert!(
            !self.preserved[i],
            "Resource '{}' is being preserved in two places, ownership gets muddy",
            self.aliased_debug_names[i]
        );

        self.preserved[i] = true;
        self.frames_since_used[i] = 0;
    }

    /// Return the resource to the pool.
    ///
    /// A no-op for preserved resources, so callers need not know who
    /// preserves what.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid.
    pub fn release(&mut self, handle: ResourceHandle<R>) {
        self.assert_valid_handle(handle);

        let i = handle.index() as usize;
        if self.preserved[i] {
            return;
        }

        self.generations[i] = self.generations[i].wrapping_add(1) | NOT_IN_USE_GENERATION_FLAG;
    }

    // ------------------------------------------------------------------------
    // Debug inspection
    // ------------------------------------------------------------------------

    /// Names of every logical resource created so far this frame.
    pub fn debug_names(&self) -> &[String] {
        &self.debug_names
    }

    /// Track the resource named `name` for inspection.
    ///
    /// Resolution is lazy: the handle is picked up by the next `create` or
    /// `append_debug_name` call using that name.
    pub fn mark_for_debug(&mut self, name: impl Into<String>) {
        self.marked_debug_name = Some(name.into());
        self.marked_debug_handle = None;
    }

    /// Stop tracking the marked resource.
    pub fn clear_debug(&mut self) {
        self.marked_debug_name = None;
        self.marked_debug_handle = None;
    }

    /// Handle of the marked resource, if it has been resolved and is still valid.
    pub fn active_debug_handle(&self) -> Option<ResourceHandle<R>> {
        self.marked_debug_handle
            .filter(|&handle| self.is_valid_handle(handle))
    }

    /// Name passed to the last [`mark_for_debug`](Self::mark_for_debug).
    pub fn active_debug_name(&self) -> Option<&str> {
        self.marked_debug_name.as_deref()
    }
}

impl<R: StatefulResource> ResourcePool<R> {
    /// Move the resource behind `handle` into `state`, returning the barrier to record.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid.
    pub fn transition_barrier(
        &mut self,
        handle: ResourceHandle<R>,
        state: R::State,
        force_barrier: bool,
    ) -> Option<R::Barrier> {
        self.resource_mut(handle)
            .transition_barrier(state, force_barrier)
    }

    /// Move the resource behind `handle` into `state`, recording the barrier into `cmd`.
    pub fn transition(&mut self, cmd: R::CommandBuffer, handle: ResourceHandle<R>, state: R::State) {
        if let Some(barrier) = self.transition_barrier(handle, state, false) {
            R::record_barrier(&self.device, cmd, barrier);
        }
    }
}

impl<R: PoolResource> Drop for ResourcePool<R> {
    fn drop(&mut self) {
        self.destroy_resources();
    }
}

impl<R: PoolResource> fmt::Debug for ResourcePool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("slots", &self.resources.len())
            .field("live", &self.live_count())
            .field("free", &self.freelist.len())
            .field("marked_debug_name", &self.marked_debug_name)
            .finish_non_exhaustive()
    }
}
