//! Legend with a visibility checkbox per catalog entry.

use crate::catalog::{LayerCatalog, LayerDescriptor, LayerKind};
use crate::Color;

/// Symbol drawn next to a legend label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Swatch {
    /// Thin horizontal bar.
    Line {
        /// Bar color.
        color: Color,
        /// Line width in pixels.
        width: f32,
    },
    /// Filled circle.
    Circle {
        /// Fill color.
        fill: Color,
        /// Radius in pixels.
        radius: f32,
        /// Outline color and width.
        stroke: Option<(Color, f32)>,
    },
    /// Square block.
    Fill {
        /// Fill color with the layer opacity applied.
        color: Color,
        /// Outline color.
        outline: Option<Color>,
    },
}

impl Swatch {
    fn for_descriptor(descriptor: &LayerDescriptor) -> Self {
        let paint = &descriptor.paint;
        match descriptor.kind {
            LayerKind::Line => Swatch::Line {
                color: paint.effective_color(),
                width: paint.width,
            },
            LayerKind::Circle => Swatch::Circle {
                fill: paint.effective_color(),
                radius: paint.radius,
                stroke: paint.stroke(),
            },
            LayerKind::Fill => Swatch::Fill {
                color: paint.effective_color(),
                outline: paint.stroke().map(|(color, _)| color),
            },
        }
    }
}

/// Category entry shown inside a legend row.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendCategory {
    /// Category label.
    pub label: String,
    /// Category swatch.
    pub swatch: Swatch,
}

/// One legend row.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendRow {
    /// Id of the catalog entry.
    pub descriptor_id: String,
    /// Row label.
    pub label: String,
    /// Row swatch.
    pub swatch: Swatch,
    /// Categories of a categorized line layer.
    pub categories: Vec<LegendCategory>,
    /// Map layers the checkbox controls.
    pub layer_ids: Vec<String>,
    /// Checkbox state.
    pub checked: bool,
}

/// Legend rows in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Legend {
    rows: Vec<LegendRow>,
}

impl Legend {
    /// Builds the legend with every row checked.
    pub fn from_catalog(catalog: &LayerCatalog) -> Self {
        let rows = catalog
            .iter()
            .map(|descriptor| {
                let width = descriptor.paint.width;
                let categories = descriptor
                    .categories
                    .iter()
                    .flat_map(|c| c.values.iter())
                    .map(|category| LegendCategory {
                        label: category.label.clone(),
                        swatch: Swatch::Line {
                            color: category.color.with_opacity(descriptor.paint.opacity),
                            width,
                        },
                    })
                    .collect();

                LegendRow {
                    descriptor_id: descriptor.id.clone(),
                    label: descriptor.label.clone(),
                    swatch: Swatch::for_descriptor(descriptor),
                    categories,
                    layer_ids: descriptor.layer_ids(),
                    checked: true,
                }
            })
            .collect();

        Self { rows }
    }

    /// Rows in catalog order.
    pub fn rows(&self) -> &[LegendRow] {
        &self.rows
    }

    /// Row of the catalog entry.
    pub fn row(&self, descriptor_id: &str) -> Option<&LegendRow> {
        self.rows.iter().find(|r| r.descriptor_id == descriptor_id)
    }

    /// Sets the checkbox state of a row. Returns the map layers the row controls.
    pub fn set_checked(&mut self, descriptor_id: &str, checked: bool) -> Option<&[String]> {
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.descriptor_id == descriptor_id)?;
        row.checked = checked;
        Some(&row.layer_ids)
    }
}
