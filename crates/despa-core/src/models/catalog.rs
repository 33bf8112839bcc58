//! Configuration snapshot: page types with their detection rules and field
//! coordinates, plus the comparable attributes.
//!
//! The snapshot is loaded once per invocation and passed explicitly to the
//! engines; nothing here is global.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;

/// Default date format for date rules (day/month/4-digit year).
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Comparator used when a rule does not name one.
pub const DEFAULT_COMPARATOR: &str = "contains";

/// Axis-aligned pixel-space rectangle `(x1, y1)`-`(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rect {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// A rectangle is usable only when `x2 > x1` and `y2 > y1`.
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Clip to an image of the given size. Returns `None` when nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let clamped = Rect {
            x1: self.x1.min(width),
            y1: self.y1.min(height),
            x2: self.x2.min(width),
            y2: self.y2.min(height),
        };
        clamped.is_valid().then_some(clamped)
    }
}

/// Declared type of a value read from a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Text,
    Number,
    Date,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
        }
    }
}

/// One spatial assertion used to recognize a page type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRule {
    #[serde(default)]
    pub id: i64,

    /// Diagnostic label of the region being checked.
    #[serde(alias = "attribute_name")]
    pub field_name: String,

    #[serde(flatten)]
    pub region: Rect,

    /// `None` (or empty) means any non-empty text matches.
    #[serde(default)]
    pub expected_value: Option<String>,

    #[serde(default)]
    pub data_type: DataType,

    /// Type-scoped comparator name (`contains`, `eq`, `regex`, ...).
    #[serde(default, alias = "match_type")]
    pub comparator: Option<String>,

    /// `chrono` format used by date rules.
    #[serde(default)]
    pub date_format: Option<String>,

    /// Higher priorities are evaluated first.
    #[serde(default)]
    pub priority: i32,
}

impl DetectionRule {
    /// Expected value, treating an empty string like a missing one.
    pub fn expectation(&self) -> Option<&str> {
        self.expected_value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn comparator(&self) -> &str {
        self.comparator
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COMPARATOR)
    }

    pub fn date_format(&self) -> &str {
        self.date_format
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_DATE_FORMAT)
    }
}

/// A region from which a named value is read once the page type is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCoordinate {
    #[serde(default)]
    pub id: i64,

    /// Key under which the value is stored in the extracted map.
    pub label: String,

    #[serde(flatten)]
    pub region: Rect,

    #[serde(default)]
    pub data_type: DataType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named page layout category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageType {
    pub id: i64,

    /// Unique identifier.
    pub name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Hex color shown by UIs.
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default, alias = "detection_rules")]
    pub rules: Vec<DetectionRule>,

    #[serde(default)]
    pub coordinates: Vec<FieldCoordinate>,
}

fn default_color() -> String {
    "#007bff".to_string()
}

impl PageType {
    /// Rules in evaluation order: descending priority, ties keep configuration order.
    pub fn rules_by_priority(&self) -> Vec<&DetectionRule> {
        let mut rules: Vec<&DetectionRule> = self.rules.iter().collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }

    /// Name to show, falling back to the identifier.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// Kind of tolerance applied when two attribute values are not textually similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    Numeric,
    Date,
    Text,
    #[serde(other)]
    Other,
}

/// Free-form validation rules of a configurable attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValidationKind>,

    /// Absolute tolerance for numeric rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,

    /// Any other keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidationRules {
    pub fn numeric(tolerance: Option<f64>) -> Self {
        Self {
            kind: Some(ValidationKind::Numeric),
            tolerance,
            extra: Map::new(),
        }
    }

    pub fn date() -> Self {
        Self {
            kind: Some(ValidationKind::Date),
            ..Self::default()
        }
    }

    pub fn text() -> Self {
        Self {
            kind: Some(ValidationKind::Text),
            ..Self::default()
        }
    }
}

/// One comparable business field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurableAttribute {
    #[serde(default)]
    pub id: i64,

    #[serde(alias = "attribute_name")]
    pub name: String,

    /// Dot-path into a document's extracted fields.
    #[serde(alias = "attribute_key")]
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, alias = "is_required", deserialize_with = "flag")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<ValidationRules>,
}

impl ConfigurableAttribute {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            key: key.into(),
            description: None,
            required: false,
            validation_rules: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.validation_rules = Some(rules);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Starter set of invoice attributes for a fresh catalog.
    pub fn defaults() -> Vec<ConfigurableAttribute> {
        vec![
            Self::new("Document number", "numero_factura")
                .with_description("Invoice or document number")
                .required()
                .with_rules(ValidationRules::text()),
            Self::new("Date", "fecha")
                .with_description("Document date")
                .required()
                .with_rules(ValidationRules::date()),
            Self::new("Supplier", "proveedor")
                .with_description("Supplier or issuer name")
                .required()
                .with_rules(ValidationRules::text()),
            Self::new("Total amount", "monto_total")
                .with_description("Document total")
                .required()
                .with_rules(ValidationRules::numeric(Some(0.01))),
            Self::new("Currency", "moneda")
                .with_description("Currency code")
                .with_rules(ValidationRules::text()),
            Self::new("Customer", "cliente")
                .with_description("Customer or receiver name")
                .with_rules(ValidationRules::text()),
        ]
    }
}

/// Accepts `true`/`false` as well as the `0`/`1` integers older exports use.
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

/// Read-only configuration snapshot handed to the engines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub page_types: Vec<PageType>,

    #[serde(default)]
    pub attributes: Vec<ConfigurableAttribute>,
}

impl Catalog {
    /// Load a snapshot from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a snapshot from JSON. Page types are put in id order so that
    /// detection picks the same winner on every run.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut catalog: Catalog = serde_json::from_str(content)?;
        catalog.page_types.sort_by_key(|pt| pt.id);
        debug!(
            "Loaded catalog: {} page types, {} attributes",
            catalog.page_types.len(),
            catalog.attributes.len()
        );
        Ok(catalog)
    }

    /// Save the snapshot as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Add the default attributes whose names are not taken yet, numbering
    /// them after the highest existing id. Returns the names added.
    pub fn add_default_attributes(&mut self) -> Vec<String> {
        let mut next_id = self.attributes.iter().map(|a| a.id).max().unwrap_or(0);
        let mut added = Vec::new();

        for mut attribute in ConfigurableAttribute::defaults() {
            if self.attributes.iter().any(|a| a.name == attribute.name) {
                debug!("Attribute '{}' already configured", attribute.name);
                continue;
            }
            next_id += 1;
            attribute.id = next_id;
            added.push(attribute.name.clone());
            self.attributes.push(attribute);
        }

        added
    }

    pub fn page_type(&self, id: i64) -> Option<&PageType> {
        self.page_types.iter().find(|pt| pt.id == id)
    }

    /// True when at least one page type can ever be matched.
    pub fn has_detection_rules(&self) -> bool {
        self.page_types.iter().any(|pt| !pt.rules.is_empty())
    }

    pub fn has_coordinates(&self) -> bool {
        self.page_types.iter().any(|pt| !pt.coordinates.is_empty())
    }

    /// Field coordinates indexed by page type id.
    pub fn coordinates_by_page_type(&self) -> BTreeMap<i64, Vec<FieldCoordinate>> {
        self.page_types
            .iter()
            .filter(|pt| !pt.coordinates.is_empty())
            .map(|pt| (pt.id, pt.coordinates.clone()))
            .collect()
    }
}
