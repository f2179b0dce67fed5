//! The scene: one print volume and an ordered list of print objects.
//!
//! Visibility and the override program are interior-mutable so a slicer
//! holding a shared borrow can flip them while rendering. [`SceneOverride`]
//! puts them back when it goes out of scope, whether rendering succeeded or
//! not.

use std::cell::Cell;

use tracing::debug;

use crate::error::{SceneError, SceneResult};
use crate::object::PrintObject;
use crate::program::ProgramKind;
use crate::volume::PrintVolume;

/// Snapshot of the render-affecting flags of a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneState {
    /// Whether the print volume outline is drawn.
    pub volume_visible: bool,
    /// Whether print objects are drawn.
    pub objects_visible: bool,
    /// Program replacing every object material, if any.
    pub override_program: Option<ProgramKind>,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            volume_visible: true,
            objects_visible: true,
            override_program: None,
        }
    }
}

/// A print volume plus the objects to print.
///
/// # Example
///
/// ```
/// use nalgebra::Vector3;
/// use print_scene::{PrintObject, PrintVolume, ProgramKind, Scene, TriangleMesh};
///
/// let mut scene = Scene::new(PrintVolume::new(36.0, 24.0, 50.0).unwrap());
/// scene.add_object(
///     PrintObject::new("ball", TriangleMesh::uv_sphere(10.0, 32, 16)).at(Vector3::new(0.0, 0.0, 20.0)),
/// );
///
/// scene.with_override(|s| {
///     s.set_volume_visible(false);
///     s.set_override_program(Some(ProgramKind::Slice));
/// });
/// assert!(scene.volume_visible());
/// assert_eq!(scene.override_program(), None);
/// ```
#[derive(Debug)]
pub struct Scene {
    volume: PrintVolume,
    objects: Vec<PrintObject>,
    volume_visible: Cell<bool>,
    objects_visible: Cell<bool>,
    override_program: Cell<Option<ProgramKind>>,
}

impl Scene {
    /// Create an empty scene around `volume`.
    #[must_use]
    pub fn new(volume: PrintVolume) -> Self {
        let state = SceneState::default();
        Self {
            volume,
            objects: Vec::new(),
            volume_visible: Cell::new(state.volume_visible),
            objects_visible: Cell::new(state.objects_visible),
            override_program: Cell::new(state.override_program),
        }
    }

    /// The print volume.
    #[must_use]
    pub const fn volume(&self) -> &PrintVolume {
        &self.volume
    }

    /// Resize the print volume.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidVolume`] for non-positive dimensions.
    pub fn resize_volume(&mut self, width: f64, depth: f64, height: f64) -> SceneResult<()> {
        self.volume.resize(width, depth, height)
    }

    /// Objects in insertion order.
    #[must_use]
    pub fn objects(&self) -> &[PrintObject] {
        &self.objects
    }

    /// Append an object.
    pub fn add_object(&mut self, object: PrintObject) {
        debug!(name = %object.name, faces = object.mesh.face_count(), "object added");
        self.objects.push(object);
    }

    /// Remove and return the object at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NoSuchObject`] when out of range.
    pub fn remove_object(&mut self, index: usize) -> SceneResult<PrintObject> {
        if index >= self.objects.len() {
            return Err(SceneError::NoSuchObject {
                index,
                len: self.objects.len(),
            });
        }
        Ok(self.objects.remove(index))
    }

    /// Remove every object.
    pub fn clear_objects(&mut self) {
        self.objects.clear();
    }

    /// Highest world Z of any object, never below the platform at `0.0`.
    #[must_use]
    pub fn max_object_z(&self) -> f64 {
        self.objects
            .iter()
            .filter_map(PrintObject::top_z)
            .fold(0.0, f64::max)
    }

    /// Stop drawing print objects.
    pub fn hide_print_objects(&self) {
        self.objects_visible.set(false);
    }

    /// Draw print objects again.
    pub fn show_print_objects(&self) {
        self.objects_visible.set(true);
    }

    /// Whether print objects are drawn.
    #[must_use]
    pub fn objects_visible(&self) -> bool {
        self.objects_visible.get()
    }

    /// Show or hide the print volume.
    pub fn set_volume_visible(&self, visible: bool) {
        self.volume_visible.set(visible);
    }

    /// Whether the print volume is drawn.
    #[must_use]
    pub fn volume_visible(&self) -> bool {
        self.volume_visible.get()
    }

    /// Program replacing every object material, if set.
    #[must_use]
    pub fn override_program(&self) -> Option<ProgramKind> {
        self.override_program.get()
    }

    /// Replace every object material with `program`, or clear with `None`.
    pub fn set_override_program(&self, program: Option<ProgramKind>) {
        self.override_program.set(program);
    }

    /// Current flags.
    #[must_use]
    pub fn state(&self) -> SceneState {
        SceneState {
            volume_visible: self.volume_visible.get(),
            objects_visible: self.objects_visible.get(),
            override_program: self.override_program.get(),
        }
    }

    /// Put flags back to a previous snapshot.
    pub fn restore(&self, state: SceneState) {
        self.volume_visible.set(state.volume_visible);
        self.objects_visible.set(state.objects_visible);
        self.override_program.set(state.override_program);
    }

    /// Snapshot the flags and restore them when the returned guard drops.
    #[must_use = "the scene is restored as soon as the guard is dropped"]
    pub fn begin_override(&self) -> SceneOverride<'_> {
        SceneOverride {
            scene: self,
            saved: self.state(),
        }
    }

    /// Run `f` inside an override scope. Flags are restored on every exit
    /// path, including unwinding.
    pub fn with_override<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        let _guard = self.begin_override();
        f(self)
    }
}

/// Scoped acquisition of a scene's visibility and override flags.
///
/// Dropping the guard restores the flags captured when it was created.
#[derive(Debug)]
pub struct SceneOverride<'a> {
    scene: &'a Scene,
    saved: SceneState,
}

impl SceneOverride<'_> {
    /// The scene being overridden.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        self.scene
    }

    /// Flags that will be restored.
    #[must_use]
    pub const fn saved(&self) -> SceneState {
        self.saved
    }
}

impl Drop for SceneOverride<'_> {
    fn drop(&mut self) {
        self.scene.restore(self.saved);
    }
}
