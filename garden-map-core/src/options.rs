//! Map, marker and drawing options handed to the provider
//!
//! Defaults reproduce the garden map: satellite imagery centred on the
//! property, a green center marker and one colour per shape kind.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Center of the garden property.
    pub const fn property_center() -> Self {
        Self::new(54.651427935687735, -5.580687100975887)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::property_center()
    }
}

/// Kind of user-drawn overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Polygon,
    Rectangle,
    Circle,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Polygon, ShapeKind::Rectangle, ShapeKind::Circle];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Polygon => "polygon",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapTypeId {
    Roadmap,
    #[default]
    Satellite,
    Hybrid,
    Terrain,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapTypeControlStyle {
    Default,
    #[default]
    HorizontalBar,
    DropdownMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPosition {
    TopLeft,
    TopCenter,
    TopRight,
    LeftTop,
    LeftCenter,
    RightTop,
    BottomCenter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureHandling {
    #[default]
    Auto,
    Cooperative,
    Greedy,
    #[serde(rename = "none")]
    Disabled,
}

/// Display flags for map construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub map_type: MapTypeId,
    pub map_type_control: bool,
    pub map_type_control_style: MapTypeControlStyle,
    pub map_type_control_position: ControlPosition,
    pub zoom_control: bool,
    pub street_view_control: bool,
    pub fullscreen_control: bool,
    pub gesture_handling: GestureHandling,
    /// Hide point-of-interest labels so garden regions stay readable
    pub hide_poi_labels: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            map_type: MapTypeId::Satellite,
            map_type_control: true,
            map_type_control_style: MapTypeControlStyle::HorizontalBar,
            map_type_control_position: ControlPosition::TopCenter,
            zoom_control: true,
            street_view_control: false,
            fullscreen_control: true,
            gesture_handling: GestureHandling::Auto,
            hide_poi_labels: true,
        }
    }
}

/// Everything the provider needs to construct one map
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub display: DisplayOptions,
}

/// Circle symbol drawn for the center marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerIcon {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_weight: u32,
    pub scale: f64,
}

impl Default for MarkerIcon {
    fn default() -> Self {
        Self {
            fill_color: "#4caf50".to_string(),
            fill_opacity: 1.0,
            stroke_color: "#2d8659".to_string(),
            stroke_weight: 3,
            scale: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub position: LatLng,
    pub title: String,
    pub icon: MarkerIcon,
}

/// Stroke and fill of one shape kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_weight: u32,
    #[serde(default = "default_true")]
    pub clickable: bool,
    #[serde(default = "default_true")]
    pub editable: bool,
    #[serde(default = "default_z_index")]
    pub z_index: i32,
}

fn default_true() -> bool {
    true
}

fn default_z_index() -> i32 {
    1
}

impl ShapeStyle {
    fn filled(fill_color: &str, stroke_color: &str) -> Self {
        Self {
            fill_color: fill_color.to_string(),
            fill_opacity: 0.3,
            stroke_color: stroke_color.to_string(),
            stroke_weight: 2,
            clickable: true,
            editable: true,
            z_index: 1,
        }
    }

    pub fn default_for(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Polygon => Self::filled("#4caf50", "#2d8659"),
            ShapeKind::Rectangle => Self::filled("#2196f3", "#1976d2"),
            ShapeKind::Circle => Self::filled("#ff9800", "#f57c00"),
        }
    }
}

/// Drawing surface configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingOptions {
    /// Active tool when the surface attaches; `None` is hand (pan) mode
    pub initial_mode: Option<ShapeKind>,
    pub control_position: ControlPosition,
    pub modes: Vec<ShapeKind>,
    pub polygon: ShapeStyle,
    pub rectangle: ShapeStyle,
    pub circle: ShapeStyle,
}

impl Default for DrawingOptions {
    fn default() -> Self {
        Self {
            initial_mode: None,
            control_position: ControlPosition::LeftTop,
            modes: ShapeKind::ALL.to_vec(),
            polygon: ShapeStyle::default_for(ShapeKind::Polygon),
            rectangle: ShapeStyle::default_for(ShapeKind::Rectangle),
            circle: ShapeStyle::default_for(ShapeKind::Circle),
        }
    }
}

impl DrawingOptions {
    pub fn style_for(&self, kind: ShapeKind) -> &ShapeStyle {
        match kind {
            ShapeKind::Polygon => &self.polygon,
            ShapeKind::Rectangle => &self.rectangle,
            ShapeKind::Circle => &self.circle,
        }
    }
}

/// Per-initialization options beyond center and zoom
#[derive(Debug, Clone, PartialEq)]
pub struct InitOptions {
    pub display: DisplayOptions,
    pub marker_title: String,
    pub marker_icon: MarkerIcon,
    /// `None` realizes a view-only map without a drawing surface
    pub drawing: Option<DrawingOptions>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            display: DisplayOptions::default(),
            marker_title: "Property Center - 1 Acre Garden".to_string(),
            marker_icon: MarkerIcon::default(),
            drawing: Some(DrawingOptions::default()),
        }
    }
}

impl InitOptions {
    pub fn without_drawing(mut self) -> Self {
        self.drawing = None;
        self
    }

    pub(crate) fn marker_at(&self, position: LatLng) -> MarkerOptions {
        MarkerOptions {
            position,
            title: self.marker_title.clone(),
            icon: self.marker_icon.clone(),
        }
    }
}
