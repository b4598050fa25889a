//! Layer specifications registered in a map session and their visibility.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{LayerKind, Paint};

/// Whether a layer is drawn.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// The layer is drawn and can be queried.
    #[default]
    Visible,
    /// The layer keeps its data but is neither drawn nor queried.
    None,
}

impl Visibility {
    /// `Visible` for `true`, `None` for `false`.
    pub fn from_checked(checked: bool) -> Self {
        if checked {
            Self::Visible
        } else {
            Self::None
        }
    }

    /// True for `Visible`.
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible)
    }
}

/// Equality test against one feature property.
///
/// Numbers are compared by value, so `15` matches `15.0`. Other values must be equal including
/// their type: the string `"2"` does not match the number `2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Property name.
    pub property: String,
    /// Expected value.
    pub equals: Value,
}

impl Filter {
    /// Creates a new filter.
    pub fn new(property: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            equals: equals.into(),
        }
    }

    /// Checks the filter against feature properties.
    pub fn matches(&self, properties: Option<&serde_json::Map<String, Value>>) -> bool {
        let Some(value) = properties.and_then(|p| p.get(&self.property)) else {
            return false;
        };

        match (value, &self.equals) {
            (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            (a, b) => a == b,
        }
    }
}

/// Layer registration with a map: what to draw, from which source and how.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Unique id of the layer in the map.
    pub id: String,
    /// Name of the source the layer draws.
    pub source: String,
    /// Geometry kind the layer draws.
    pub kind: LayerKind,
    /// Paint of the layer.
    pub paint: Paint,
    /// Only features matching all the filters are drawn.
    pub filters: Vec<Filter>,
    /// Initial visibility.
    pub visibility: Visibility,
}

impl LayerSpec {
    /// True if the feature properties pass all the filters of the layer.
    pub fn accepts(&self, properties: Option<&serde_json::Map<String, Value>>) -> bool {
        self.filters.iter().all(|filter| filter.matches(properties))
    }
}

/// Ordered collection of the layers registered with a map.
///
/// Layers are drawn in collection order: the first layer is at the bottom. Hidden layers keep
/// their place in the collection.
#[derive(Debug, Default, Clone)]
pub struct LayerCollection(Vec<LayerSpec>);

impl LayerCollection {
    /// Adds the layer on top of all others.
    pub fn push(&mut self, layer: LayerSpec) {
        self.0.push(layer)
    }

    /// Removes all layers.
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no layers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Layer with the given id.
    pub fn get(&self, id: &str) -> Option<&LayerSpec> {
        self.0.iter().find(|layer| layer.id == id)
    }

    /// Mutable access to the layer with the given id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut LayerSpec> {
        self.0.iter_mut().find(|layer| layer.id == id)
    }

    /// True if a layer with the given id is in the collection.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Iterates over the layers from bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LayerSpec> + '_ {
        self.0.iter()
    }

    /// Iterates over the visible layers from bottom to top.
    pub fn iter_visible(&self) -> impl DoubleEndedIterator<Item = &LayerSpec> + '_ {
        self.0.iter().filter(|layer| layer.visibility.is_visible())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn properties(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn filter_compares_numbers_by_value() {
        let filter = Filter::new("Time", 15);
        assert!(filter.matches(Some(&properties(json!({"Time": 15.0})))));
        assert!(filter.matches(Some(&properties(json!({"Time": 15})))));
        assert!(!filter.matches(Some(&properties(json!({"Time": 10})))));
    }

    #[test]
    fn filter_is_strict_for_other_types() {
        let filter = Filter::new("line", "2");
        assert!(filter.matches(Some(&properties(json!({"line": "2"})))));
        assert!(!filter.matches(Some(&properties(json!({"line": 2})))));
        assert!(!filter.matches(Some(&properties(json!({"name": "Vukov spomenik"})))));
        assert!(!filter.matches(None));
    }

    #[test]
    fn visibility_serializes_as_layout_value() {
        assert_eq!(
            serde_json::to_string(&Visibility::None).unwrap(),
            "\"none\""
        );
        assert_eq!(Visibility::from_checked(true), Visibility::Visible);
        assert!(!Visibility::from_checked(false).is_visible());
    }
}
