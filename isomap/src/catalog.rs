//! Static description of the overlay layers shown by the viewer.
//!
//! The catalog is the single source for both layer registration with the map and the legend.
//! Catalog order is legend order (top row first). Layers are painted in the reverse order, so
//! the first catalog entry ends up on top of the map.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::session::{Filter, LayerSpec, Visibility};
use crate::Color;

/// Geometry kind drawn by a layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Filled polygons.
    Fill,
    /// Line strings.
    Line,
    /// Points drawn as circles.
    Circle,
}

/// Paint properties of a layer.
///
/// Not every property is used by every kind: `width` applies to lines, `radius` to circles and
/// the stroke to circles (outline) and fills (polygon outline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    /// Main color.
    pub color: Color,
    /// Opacity applied on top of the color alpha, `0..=1`.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Line width in pixels.
    #[serde(default = "default_width")]
    pub width: f32,
    /// Circle radius in pixels.
    #[serde(default = "default_radius")]
    pub radius: f32,
    /// Outline color.
    #[serde(default)]
    pub stroke_color: Option<Color>,
    /// Outline width in pixels.
    #[serde(default = "default_width")]
    pub stroke_width: f32,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_width() -> f32 {
    1.0
}

fn default_radius() -> f32 {
    5.0
}

impl Paint {
    /// Opaque paint of the given color.
    pub fn new(color: Color) -> Self {
        Self {
            color,
            opacity: default_opacity(),
            width: default_width(),
            radius: default_radius(),
            stroke_color: None,
            stroke_width: default_width(),
        }
    }

    /// Sets opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Sets line width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Sets circle radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Sets outline.
    pub fn with_stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke_color = Some(color);
        self.stroke_width = width;
        self
    }

    /// Main color with the opacity applied.
    pub fn effective_color(&self) -> Color {
        self.color.with_opacity(self.opacity)
    }

    /// Outline color and width, if the paint has an outline.
    pub fn stroke(&self) -> Option<(Color, f32)> {
        self.stroke_color
            .filter(|_| self.stroke_width > 0.0)
            .map(|color| (color, self.stroke_width))
    }
}

/// One category of a categorized line layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Value of the category property.
    pub value: String,
    /// Line color of the category.
    pub color: Color,
    /// Legend label of the category.
    pub label: String,
}

/// Splits a line layer into one map layer per value of a feature property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStyle {
    /// Property that holds the category.
    pub property: String,
    /// Categories in legend order.
    pub values: Vec<Category>,
}

/// Catalog entry: one legend row and one or more map layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Unique id. Also the map layer id for uncategorized layers.
    pub id: String,
    /// Name of the data source the layer draws.
    pub source: String,
    /// Geometry kind.
    pub kind: LayerKind,
    /// Paint. For categorized layers the category colors replace `paint.color`.
    pub paint: Paint,
    /// Legend label.
    pub label: String,
    /// Optional feature filter.
    #[serde(default)]
    pub filter: Option<Filter>,
    /// Optional per-category styling, line layers only.
    #[serde(default)]
    pub categories: Option<CategoryStyle>,
    /// Whether the pointer turns into a hand over the features of this layer.
    #[serde(default)]
    pub interactive: bool,
}

impl LayerDescriptor {
    /// Creates a descriptor without filter or categories.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        kind: LayerKind,
        paint: Paint,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind,
            paint,
            label: label.into(),
            filter: None,
            categories: None,
            interactive: false,
        }
    }

    /// Sets the feature filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets per-category styling.
    pub fn with_categories(mut self, categories: CategoryStyle) -> Self {
        self.categories = Some(categories);
        self
    }

    /// Marks the layer as interactive.
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    /// Ids of the map layers registered for this descriptor, in legend order.
    pub fn layer_ids(&self) -> Vec<String> {
        match &self.categories {
            Some(categories) => categories
                .values
                .iter()
                .map(|category| category_layer_id(&self.id, &category.value))
                .collect(),
            None => vec![self.id.clone()],
        }
    }

    /// Map layer registrations for this descriptor, in paint order.
    ///
    /// `visibility` is asked for the initial visibility of every layer id.
    pub fn layer_specs(&self, visibility: impl Fn(&str) -> Visibility) -> Vec<LayerSpec> {
        let base_filters: Vec<Filter> = self.filter.iter().cloned().collect();

        match &self.categories {
            Some(categories) => categories
                .values
                .iter()
                .rev()
                .map(|category| {
                    let id = category_layer_id(&self.id, &category.value);
                    let mut filters = base_filters.clone();
                    filters.push(Filter::new(&categories.property, category.value.clone()));

                    LayerSpec {
                        visibility: visibility(&id),
                        id,
                        source: self.source.clone(),
                        kind: self.kind,
                        paint: Paint {
                            color: category.color,
                            ..self.paint.clone()
                        },
                        filters,
                    }
                })
                .collect(),
            None => vec![LayerSpec {
                id: self.id.clone(),
                source: self.source.clone(),
                kind: self.kind,
                paint: self.paint.clone(),
                filters: base_filters,
                visibility: visibility(&self.id),
            }],
        }
    }
}

fn category_layer_id(id: &str, value: &str) -> String {
    format!("{id}-{value}")
}

/// Validated ordered list of layer descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LayerDescriptor>", into = "Vec<LayerDescriptor>")]
pub struct LayerCatalog {
    descriptors: Vec<LayerDescriptor>,
}

impl TryFrom<Vec<LayerDescriptor>> for LayerCatalog {
    type Error = MapError;

    fn try_from(descriptors: Vec<LayerDescriptor>) -> Result<Self, Self::Error> {
        Self::new(descriptors)
    }
}

impl From<LayerCatalog> for Vec<LayerDescriptor> {
    fn from(catalog: LayerCatalog) -> Self {
        catalog.descriptors
    }
}

impl LayerCatalog {
    /// Creates a catalog, checking that all descriptor ids and all generated layer ids are
    /// unique and that only line layers have categories.
    pub fn new(descriptors: Vec<LayerDescriptor>) -> Result<Self, MapError> {
        let mut descriptor_ids = HashSet::new();
        let mut layer_ids = HashSet::new();

        for descriptor in &descriptors {
            if descriptor.id.is_empty() {
                return Err(MapError::Config("layer id cannot be empty".into()));
            }

            if !descriptor_ids.insert(descriptor.id.as_str()) {
                return Err(MapError::Config(format!(
                    "layer '{}' is listed twice",
                    descriptor.id
                )));
            }

            if let Some(categories) = &descriptor.categories {
                if descriptor.kind != LayerKind::Line {
                    return Err(MapError::Config(format!(
                        "layer '{}': categories are only supported for line layers",
                        descriptor.id
                    )));
                }

                if categories.values.is_empty() {
                    return Err(MapError::Config(format!(
                        "layer '{}' has an empty category list",
                        descriptor.id
                    )));
                }
            }

            for id in descriptor.layer_ids() {
                if !layer_ids.insert(id.clone()) {
                    return Err(MapError::Config(format!("layer id '{id}' is not unique")));
                }
            }
        }

        Ok(Self { descriptors })
    }

    /// Checks that every descriptor refers to one of the given source names.
    pub fn validate_sources<'a>(
        &self,
        sources: impl IntoIterator<Item = &'a str> + Clone,
    ) -> Result<(), MapError> {
        for descriptor in &self.descriptors {
            if !sources
                .clone()
                .into_iter()
                .any(|name| name == descriptor.source)
            {
                return Err(MapError::Config(format!(
                    "layer '{}' refers to unknown source '{}'",
                    descriptor.id, descriptor.source
                )));
            }
        }

        Ok(())
    }

    /// Descriptors in legend order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LayerDescriptor> + '_ {
        self.descriptors.iter()
    }

    /// Descriptors in paint order: bottom layer first.
    pub fn paint_order(&self) -> impl Iterator<Item = &LayerDescriptor> + '_ {
        self.descriptors.iter().rev()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True if the catalog has no descriptors.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All map layer ids of the catalog in legend order.
    pub fn layer_ids(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .flat_map(LayerDescriptor::layer_ids)
            .collect()
    }

    /// Belgrade metro catalog: stations, lines by route and three walking isochrones.
    pub fn belgrade_metro() -> Self {
        let area = |id: &str, source: &str, fill: Color, opacity: f32, outline: Color, label: &str| {
            LayerDescriptor::new(
                id,
                source,
                LayerKind::Fill,
                Paint::new(fill)
                    .with_opacity(opacity)
                    .with_stroke(outline, 1.0),
                label,
            )
        };

        Self {
            descriptors: vec![
                LayerDescriptor::new(
                    "stations",
                    "metro-stations",
                    LayerKind::Circle,
                    Paint::new(Color::rgb(0x1e, 0x88, 0xe5))
                        .with_radius(5.0)
                        .with_stroke(Color::rgb(0x0d, 0x47, 0xa1), 1.5),
                    "Metro stations",
                )
                .interactive(),
                LayerDescriptor::new(
                    "lines",
                    "metro-lines",
                    LayerKind::Line,
                    Paint::new(Color::rgb(0xff, 0x57, 0x22)).with_width(3.0),
                    "Metro lines",
                )
                .with_categories(CategoryStyle {
                    property: "line".into(),
                    values: vec![
                        Category {
                            value: "1".into(),
                            color: Color::rgb(0xff, 0x00, 0x00),
                            label: "Line 1".into(),
                        },
                        Category {
                            value: "2".into(),
                            color: Color::rgb(0x00, 0x00, 0xff),
                            label: "Line 2".into(),
                        },
                        Category {
                            value: "3".into(),
                            color: Color::rgb(0x00, 0xaa, 0x00),
                            label: "Line 3".into(),
                        },
                    ],
                }),
                area(
                    "area-5",
                    "area-5min",
                    Color::rgb(0x9c, 0x27, 0xb0),
                    0.3,
                    Color::rgb(0x7b, 0x1f, 0xa2),
                    "5 minutes accessibility area",
                ),
                area(
                    "area-10",
                    "area-10min",
                    Color::rgb(0xba, 0x68, 0xc8),
                    0.25,
                    Color::rgb(0x9c, 0x27, 0xb0),
                    "10 minutes accessibility area",
                ),
                area(
                    "area-15",
                    "area-15min",
                    Color::rgb(0xe1, 0xbe, 0xe7),
                    0.4,
                    Color::rgb(0xba, 0x68, 0xc8),
                    "15 minutes accessibility area",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn categorized_layer_registers_one_layer_per_category() {
        let catalog = LayerCatalog::belgrade_metro();
        let lines = catalog.iter().find(|d| d.id == "lines").unwrap();
        assert_eq!(lines.layer_ids(), vec!["lines-1", "lines-2", "lines-3"]);

        let specs = lines.layer_specs(|_| Visibility::Visible);
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].id, "lines-3");
        assert_eq!(specs[0].paint.color, Color::rgb(0x00, 0xaa, 0x00));
        assert_eq!(specs[0].filters, vec![Filter::new("line", "3")]);
        assert_eq!(specs[0].paint.width, 3.0);
    }

    #[test]
    fn paint_order_is_reverse_of_legend_order() {
        let catalog = LayerCatalog::belgrade_metro();
        let order: Vec<&str> = catalog.paint_order().map(|d| d.id.as_str()).collect();
        assert_eq!(order, vec!["area-15", "area-10", "area-5", "lines", "stations"]);
    }

    #[test]
    fn layer_specs_take_visibility_by_layer_id() {
        let catalog = LayerCatalog::belgrade_metro();
        let lines = catalog.iter().find(|d| d.id == "lines").unwrap();
        let specs = lines.layer_specs(|id| Visibility::from_checked(id != "lines-2"));

        let hidden: Vec<&str> = specs
            .iter()
            .filter(|s| s.visibility == Visibility::None)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(hidden, vec!["lines-2"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let paint = Paint::new(Color::BLACK);
        let result = LayerCatalog::new(vec![
            LayerDescriptor::new("a", "s", LayerKind::Fill, paint.clone(), "A"),
            LayerDescriptor::new("a", "s", LayerKind::Line, paint, "B"),
        ]);
        assert_matches!(result, Err(MapError::Config(_)));
    }

    #[test]
    fn generated_ids_must_not_collide() {
        let paint = Paint::new(Color::BLACK);
        let result = LayerCatalog::new(vec![
            LayerDescriptor::new("lines-1", "s", LayerKind::Line, paint.clone(), "A"),
            LayerDescriptor::new("lines", "s", LayerKind::Line, paint, "B").with_categories(
                CategoryStyle {
                    property: "line".into(),
                    values: vec![Category {
                        value: "1".into(),
                        color: Color::BLACK,
                        label: "1".into(),
                    }],
                },
            ),
        ]);
        assert_matches!(result, Err(MapError::Config(_)));
    }

    #[test]
    fn categories_only_on_lines() {
        let descriptor = LayerDescriptor::new(
            "area",
            "s",
            LayerKind::Fill,
            Paint::new(Color::BLACK),
            "Area",
        )
        .with_categories(CategoryStyle {
            property: "Time".into(),
            values: vec![Category {
                value: "5".into(),
                color: Color::BLACK,
                label: "5".into(),
            }],
        });
        assert_matches!(
            LayerCatalog::new(vec![descriptor]),
            Err(MapError::Config(_))
        );
    }

    #[test]
    fn unknown_source_is_reported() {
        let catalog = LayerCatalog::belgrade_metro();
        assert!(catalog
            .validate_sources(["area-5min", "area-10min", "area-15min", "metro-lines", "metro-stations"])
            .is_ok());
        assert_matches!(
            catalog.validate_sources(["metro-lines"]),
            Err(MapError::Config(_))
        );
    }

    #[test]
    fn catalog_deserializes_from_list() {
        let catalog: LayerCatalog = serde_json::from_str(
            r##"[
                {
                    "id": "area",
                    "source": "iso",
                    "kind": "fill",
                    "paint": {"color": "#9C27B0", "opacity": 0.3, "stroke_color": "#7B1FA2"},
                    "label": "Area",
                    "filter": {"property": "Time", "equals": 5}
                }
            ]"##,
        )
        .unwrap();

        let descriptor = catalog.iter().find(|d| d.id == "area").unwrap();
        assert_eq!(descriptor.kind, LayerKind::Fill);
        assert_eq!(descriptor.paint.stroke(), Some((Color::rgb(0x7b, 0x1f, 0xa2), 1.0)));
        assert_eq!(descriptor.filter, Some(Filter::new("Time", 5)));

        let invalid = serde_json::from_str::<LayerCatalog>(
            r##"[
                {"id": "a", "source": "s", "kind": "line", "paint": {"color": "#000000"}, "label": "A"},
                {"id": "a", "source": "s", "kind": "line", "paint": {"color": "#000000"}, "label": "A"}
            ]"##,
        );
        assert!(invalid.is_err());
    }
}
