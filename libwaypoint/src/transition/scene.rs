//! Animated surfaces and elements
//!
//! The scene is what animations write into and what front ends read to draw.
//! Screens are surfaces keyed by [`ScreenId`]; everything smaller is an
//! element keyed by [`ElementId`]. Surface offsets are percentages of the
//! viewport, element offsets are board units.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::ScreenId;

/// Identifier of an element inside a screen, e.g. `scan.sensor`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Animatable properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prop {
    Opacity,
    X,
    Y,
    Scale,
    Rotation,
    Glow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    pub opacity: f64,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
    pub glow: f64,
    pub visible: bool,
}

impl Default for Visual {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            glow: 0.0,
            visible: true,
        }
    }
}

impl Visual {
    /// Visual of a mounted but not yet shown surface
    pub fn hidden() -> Self {
        Self {
            opacity: 0.0,
            visible: false,
            ..Self::default()
        }
    }

    pub fn get(&self, prop: Prop) -> f64 {
        match prop {
            Prop::Opacity => self.opacity,
            Prop::X => self.x,
            Prop::Y => self.y,
            Prop::Scale => self.scale,
            Prop::Rotation => self.rotation,
            Prop::Glow => self.glow,
        }
    }

    pub fn set(&mut self, prop: Prop, value: f64) {
        match prop {
            Prop::Opacity => self.opacity = value,
            Prop::X => self.x = value,
            Prop::Y => self.y = value,
            Prop::Scale => self.scale = value,
            Prop::Rotation => self.rotation = value,
            Prop::Glow => self.glow = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Surface {
    pub visual: Visual,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    pub visual: Visual,
    pub text: String,
    pub tint: Option<String>,
}

/// What an animation step writes to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Surface(ScreenId),
    Element(ElementId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Surface(id) => write!(f, "screen:{}", id),
            Target::Element(id) => write!(f, "element:{}", id),
        }
    }
}

impl From<ScreenId> for Target {
    fn from(id: ScreenId) -> Self {
        Target::Surface(id)
    }
}

impl From<ElementId> for Target {
    fn from(id: ElementId) -> Self {
        Target::Element(id)
    }
}

/// Element ids every standard scene mounts
pub mod anchors {
    pub const FLASH_OVERLAY: &str = "flash-overlay";
    pub const PROGRESS: &str = "progress";

    pub const INTRO_LOGO: &str = "intro.logo";
    pub const INTRO_TITLE: &str = "intro.title";
    pub const INTRO_SUBTITLE: &str = "intro.subtitle";
    pub const INTRO_START: &str = "intro.start";

    pub const SCAN_SENSOR: &str = "scan.sensor";
    pub const SCAN_ICON: &str = "scan.icon";
    pub const SCAN_STATUS: &str = "scan.status";

    pub const ANSWER_QUESTION: &str = "answer.question";
    pub const ANSWER_INPUT: &str = "answer.input";
    pub const ANSWER_FEEDBACK: &str = "answer.feedback";

    pub const PLACEMENT_BOARD: &str = "placement.board";
    pub const PLACEMENT_TARGET: &str = "placement.target";
    pub const PLACEMENT_COUNT: &str = "placement.count";

    pub const CAPTURE_VIEWFINDER: &str = "capture.viewfinder";
    pub const CAPTURE_STATUS: &str = "capture.status";

    pub const SUCCESS_CHECKMARK: &str = "success.checkmark";
    pub const SUCCESS_MESSAGE: &str = "success.message";

    pub const ALL: [&str; 19] = [
        FLASH_OVERLAY,
        PROGRESS,
        INTRO_LOGO,
        INTRO_TITLE,
        INTRO_SUBTITLE,
        INTRO_START,
        SCAN_SENSOR,
        SCAN_ICON,
        SCAN_STATUS,
        ANSWER_QUESTION,
        ANSWER_INPUT,
        ANSWER_FEEDBACK,
        PLACEMENT_BOARD,
        PLACEMENT_TARGET,
        PLACEMENT_COUNT,
        CAPTURE_VIEWFINDER,
        CAPTURE_STATUS,
        SUCCESS_CHECKMARK,
        SUCCESS_MESSAGE,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    surfaces: BTreeMap<ScreenId, Surface>,
    elements: BTreeMap<ElementId, Element>,
}

impl Scene {
    /// Empty scene; nothing is mounted
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene with every screen and every standard anchor mounted
    pub fn standard() -> Self {
        let mut scene = Self::new();
        for id in ScreenId::ALL {
            scene.mount_surface(id);
        }
        for id in anchors::ALL {
            scene.mount_element(id);
        }
        if let Some(flash) = scene.element_mut(&anchors::FLASH_OVERLAY.into()) {
            flash.visual.opacity = 0.0;
        }
        scene
    }

    pub fn mount_surface(&mut self, id: ScreenId) {
        self.surfaces.insert(
            id,
            Surface {
                visual: Visual::hidden(),
                active: false,
            },
        );
    }

    pub fn unmount_surface(&mut self, id: ScreenId) -> bool {
        self.surfaces.remove(&id).is_some()
    }

    pub fn mount_element(&mut self, id: impl Into<ElementId>) {
        self.elements.insert(id.into(), Element::default());
    }

    pub fn unmount_element(&mut self, id: &ElementId) -> bool {
        self.elements.remove(id).is_some()
    }

    pub fn surface(&self, id: ScreenId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn surface_mut(&mut self, id: ScreenId) -> Option<&mut Surface> {
        self.surfaces.get_mut(&id)
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn element_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn has(&self, target: &Target) -> bool {
        match target {
            Target::Surface(id) => self.surfaces.contains_key(id),
            Target::Element(id) => self.elements.contains_key(id),
        }
    }

    pub fn visual(&self, target: &Target) -> Option<&Visual> {
        match target {
            Target::Surface(id) => self.surfaces.get(id).map(|s| &s.visual),
            Target::Element(id) => self.elements.get(id).map(|e| &e.visual),
        }
    }

    pub fn visual_mut(&mut self, target: &Target) -> Option<&mut Visual> {
        match target {
            Target::Surface(id) => self.surfaces.get_mut(id).map(|s| &mut s.visual),
            Target::Element(id) => self.elements.get_mut(id).map(|e| &mut e.visual),
        }
    }

    /// Surfaces currently in the active set, in flow order
    pub fn active_surfaces(&self) -> Vec<ScreenId> {
        self.surfaces
            .iter()
            .filter(|(_, surface)| surface.active)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Make `id` the only shown surface, with a resting visual
    pub fn show_only(&mut self, id: ScreenId) {
        for (surface_id, surface) in self.surfaces.iter_mut() {
            if *surface_id == id {
                surface.active = true;
                surface.visual = Visual::default();
            } else {
                surface.active = false;
                surface.visual = Visual::hidden();
            }
        }
    }

    /// Return every element to its resting visual and clear its text
    pub fn reset_elements(&mut self) {
        for (id, element) in self.elements.iter_mut() {
            *element = Element::default();
            if id.as_str() == anchors::FLASH_OVERLAY {
                element.visual.opacity = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scene_mounts_everything() {
        let scene = Scene::standard();
        for id in ScreenId::ALL {
            assert!(scene.surface(id).is_some());
        }
        for id in anchors::ALL {
            assert!(scene.element(&id.into()).is_some(), "{}", id);
        }
        assert!(scene.active_surfaces().is_empty());
    }

    #[test]
    fn test_show_only_activates_one_surface() {
        let mut scene = Scene::standard();
        scene.show_only(ScreenId::Answer);
        assert_eq!(scene.active_surfaces(), vec![ScreenId::Answer]);
        assert_eq!(scene.surface(ScreenId::Answer).unwrap().visual.opacity, 1.0);
        assert!(!scene.surface(ScreenId::Scan).unwrap().visual.visible);
    }

    #[test]
    fn test_visual_prop_access() {
        let mut visual = Visual::default();
        visual.set(Prop::Rotation, 60.0);
        visual.set(Prop::Glow, 0.5);
        assert_eq!(visual.get(Prop::Rotation), 60.0);
        assert_eq!(visual.get(Prop::Glow), 0.5);
    }

    #[test]
    fn test_unmounted_targets_are_absent() {
        let mut scene = Scene::standard();
        assert!(scene.unmount_surface(ScreenId::Capture));
        assert!(!scene.has(&Target::Surface(ScreenId::Capture)));
        assert!(scene.visual_mut(&Target::Element("nope".into())).is_none());
    }
}
