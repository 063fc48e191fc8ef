// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host collaborators.
//!
//! The engine never touches scene data directly: operation nodes go through
//! the [`Host`] trait, which the embedding application implements. The
//! in-memory [`MemoryHost`] backs tests and the standalone driver.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Object transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Location (x, y, z)
    pub location: [f64; 3],
    /// Euler rotation in radians (x, y, z)
    pub rotation: [f64; 3],
    /// Scale (x, y, z)
    pub scale: [f64; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// Kind of scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectKind {
    /// Mesh object
    #[default]
    Mesh,
    /// Light with an intensity
    Light,
    /// Empty
    Empty,
}

/// Data-access and output calls the engine's operation nodes consume
pub trait Host {
    /// Write a line of program output
    fn print(&mut self, line: &str);

    /// Block for a duration
    fn sleep(&mut self, duration: Duration);

    /// Name of the active object
    fn active_object(&self) -> Option<String>;

    /// Make an object active; `false` if it does not exist
    fn set_active_object(&mut self, name: &str) -> bool;

    /// Whether an object exists
    fn object_exists(&self, name: &str) -> bool;

    /// All object names
    fn object_names(&self) -> Vec<String>;

    /// Objects of a collection, `None` if the collection does not exist
    fn collection_objects(&self, collection: &str) -> Option<Vec<String>>;

    /// Create an object and return its final (possibly deduplicated) name
    fn create_object(&mut self, name: &str, kind: ObjectKind, collection: Option<&str>) -> String;

    /// Delete an object
    fn delete_object(&mut self, name: &str) -> bool;

    /// Duplicate an object, returning the copy's name
    fn duplicate_object(&mut self, name: &str) -> Option<String>;

    /// Rename an object
    fn rename_object(&mut self, name: &str, new_name: &str) -> bool;

    /// Read an object's transform
    fn transform(&self, name: &str) -> Option<Transform>;

    /// Write an object's transform
    fn set_transform(&mut self, name: &str, transform: Transform) -> bool;

    /// Size of an object's local bounding box, before scale
    fn bounds(&self, name: &str) -> Option<[f64; 3]>;

    /// Whether an object is visible in the viewport
    fn visible(&self, name: &str) -> Option<bool>;

    /// Show or hide an object in the viewport
    fn set_visible(&mut self, name: &str, visible: bool) -> bool;

    /// Whether an object shows up in renders
    fn render_visible(&self, name: &str) -> Option<bool>;

    /// Include or exclude an object from renders
    fn set_render_visible(&mut self, name: &str, visible: bool) -> bool;

    /// Intensity of a light object
    fn light_intensity(&self, name: &str) -> Option<f64>;

    /// Set the intensity of a light object
    fn set_light_intensity(&mut self, name: &str, intensity: f64) -> bool;
}

/// Shared buffer of printed lines
#[derive(Debug, Clone, Default)]
pub struct Console {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Console {
    /// Create an empty console
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line
    pub fn push(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }

    /// Copy of all lines
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Take all lines, leaving the buffer empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

#[derive(Debug, Clone)]
struct SceneObject {
    kind: ObjectKind,
    transform: Transform,
    visible: bool,
    render_visible: bool,
    intensity: f64,
    collection: String,
}

/// In-memory scene host
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    objects: IndexMap<String, SceneObject>,
    active: Option<String>,
    console: Console,
    echo: bool,
    slept: Duration,
}

impl MemoryHost {
    /// Collection new objects go to by default
    pub const DEFAULT_COLLECTION: &'static str = "Collection";

    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write printed lines to stdout
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Handle to the printed-line buffer
    pub fn console(&self) -> Console {
        self.console.clone()
    }

    /// Total time spent in [`Host::sleep`]
    pub fn slept(&self) -> Duration {
        self.slept
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.objects.contains_key(base) {
            return base.to_string();
        }
        let stem = match base.rsplit_once('.') {
            Some((stem, suffix)) if suffix.len() == 3 && suffix.bytes().all(|b| b.is_ascii_digit()) => stem,
            _ => base,
        };
        (1..)
            .map(|n| format!("{stem}.{n:03}"))
            .find(|candidate| !self.objects.contains_key(candidate))
            .unwrap_or_else(|| stem.to_string())
    }
}

impl Host for MemoryHost {
    fn print(&mut self, line: &str) {
        if self.echo {
            println!("{line}");
        }
        self.console.push(line);
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept += duration;
    }

    fn active_object(&self) -> Option<String> {
        self.active.clone()
    }

    fn set_active_object(&mut self, name: &str) -> bool {
        if !self.objects.contains_key(name) {
            return false;
        }
        self.active = Some(name.to_string());
        true
    }

    fn object_exists(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    fn object_names(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }

    fn collection_objects(&self, collection: &str) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .objects
            .iter()
            .filter(|(_, o)| o.collection == collection)
            .map(|(name, _)| name.clone())
            .collect();
        (!names.is_empty() || collection == Self::DEFAULT_COLLECTION).then_some(names)
    }

    fn create_object(&mut self, name: &str, kind: ObjectKind, collection: Option<&str>) -> String {
        let name = self.unique_name(name);
        let intensity = if kind == ObjectKind::Light { 1000.0 } else { 0.0 };
        self.objects.insert(
            name.clone(),
            SceneObject {
                kind,
                transform: Transform::default(),
                visible: true,
                render_visible: true,
                intensity,
                collection: collection.unwrap_or(Self::DEFAULT_COLLECTION).to_string(),
            },
        );
        name
    }

    fn delete_object(&mut self, name: &str) -> bool {
        if self.objects.shift_remove(name).is_none() {
            return false;
        }
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        true
    }

    fn duplicate_object(&mut self, name: &str) -> Option<String> {
        let object = self.objects.get(name)?.clone();
        let copy = self.unique_name(name);
        self.objects.insert(copy.clone(), object);
        Some(copy)
    }

    fn rename_object(&mut self, name: &str, new_name: &str) -> bool {
        if name == new_name {
            return self.objects.contains_key(name);
        }
        let Some(object) = self.objects.shift_remove(name) else {
            return false;
        };
        let new_name = self.unique_name(new_name);
        if self.active.as_deref() == Some(name) {
            self.active = Some(new_name.clone());
        }
        self.objects.insert(new_name, object);
        true
    }

    fn transform(&self, name: &str) -> Option<Transform> {
        self.objects.get(name).map(|o| o.transform)
    }

    fn set_transform(&mut self, name: &str, transform: Transform) -> bool {
        match self.objects.get_mut(name) {
            Some(object) => {
                object.transform = transform;
                true
            }
            None => false,
        }
    }

    fn bounds(&self, name: &str) -> Option<[f64; 3]> {
        self.objects.get(name).map(|o| match o.kind {
            ObjectKind::Mesh => [2.0; 3],
            ObjectKind::Light | ObjectKind::Empty => [0.0; 3],
        })
    }

    fn visible(&self, name: &str) -> Option<bool> {
        self.objects.get(name).map(|o| o.visible)
    }

    fn set_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.objects.get_mut(name) {
            Some(object) => {
                object.visible = visible;
                true
            }
            None => false,
        }
    }

    fn render_visible(&self, name: &str) -> Option<bool> {
        self.objects.get(name).map(|o| o.render_visible)
    }

    fn set_render_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.objects.get_mut(name) {
            Some(object) => {
                object.render_visible = visible;
                true
            }
            None => false,
        }
    }

    fn light_intensity(&self, name: &str) -> Option<f64> {
        self.objects
            .get(name)
            .filter(|o| o.kind == ObjectKind::Light)
            .map(|o| o.intensity)
    }

    fn set_light_intensity(&mut self, name: &str, intensity: f64) -> bool {
        match self.objects.get_mut(name) {
            Some(object) if object.kind == ObjectKind::Light => {
                object.intensity = intensity;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names() {
        let mut host = MemoryHost::new();
        assert_eq!(host.create_object("Cube", ObjectKind::Mesh, None), "Cube");
        assert_eq!(host.create_object("Cube", ObjectKind::Mesh, None), "Cube.001");
        assert_eq!(host.duplicate_object("Cube.001").unwrap(), "Cube.002");
    }

    #[test]
    fn test_rename_keeps_active() {
        let mut host = MemoryHost::new();
        host.create_object("Cube", ObjectKind::Mesh, None);
        assert!(host.set_active_object("Cube"));
        assert!(host.rename_object("Cube", "Box"));
        assert_eq!(host.active_object().as_deref(), Some("Box"));
        assert!(!host.rename_object("Cube", "Other"));
    }

    #[test]
    fn test_lights_only_have_intensity() {
        let mut host = MemoryHost::new();
        host.create_object("Lamp", ObjectKind::Light, None);
        host.create_object("Cube", ObjectKind::Mesh, None);
        assert!(host.set_light_intensity("Lamp", 50.0));
        assert_eq!(host.light_intensity("Lamp"), Some(50.0));
        assert!(!host.set_light_intensity("Cube", 50.0));
    }

    #[test]
    fn test_render_visibility_is_separate() {
        let mut host = MemoryHost::new();
        host.create_object("Cube", ObjectKind::Mesh, None);
        assert!(host.set_render_visible("Cube", false));
        assert_eq!(host.render_visible("Cube"), Some(false));
        assert_eq!(host.visible("Cube"), Some(true));
        assert!(!host.set_render_visible("Ghost", false));
        assert_eq!(host.bounds("Cube"), Some([2.0; 3]));
    }

    #[test]
    fn test_console_capture() {
        let mut host = MemoryHost::new();
        let console = host.console();
        host.print("hello");
        assert_eq!(console.drain(), vec!["hello".to_string()]);
        assert!(console.lines().is_empty());
    }

    #[test]
    fn test_collections() {
        let mut host = MemoryHost::new();
        host.create_object("A", ObjectKind::Mesh, Some("Props"));
        host.create_object("B", ObjectKind::Mesh, None);
        assert_eq!(host.collection_objects("Props"), Some(vec!["A".to_string()]));
        assert_eq!(host.collection_objects("Collection"), Some(vec!["B".to_string()]));
        assert_eq!(host.collection_objects("Missing"), None);
    }
}
