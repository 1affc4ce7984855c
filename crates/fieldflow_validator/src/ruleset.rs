//! Declarative rule tables: which columns a datatype expects and which
//! invariants apply to them.
//!
//! Rulesets are data, not code. The built-in `FIELD` ruleset ships here and
//! additional or overriding rulesets can be deserialized from configuration;
//! nothing is synthesized from store metadata at runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recognized coordinate reference system notations: a single EPSG code for
/// geographic/projected/vertical systems, or a bound system with two codes
/// joined by an underscore.
pub const CRS_PATTERN: &str =
    r"^(Geographic2D|Projected|Vertical):EPSG::\d+$|^(BoundGeographic2D|BoundProjected):EPSG::\d+_EPSG::\d+$";

/// Declared kind of a column; drives type coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Float,
    Date,
}

/// Constraint set for one expected column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRule {
    pub name: String,
    pub kind: ColumnKind,
    /// A null value in a required column is a row-scoped error.
    #[serde(default)]
    pub required: bool,
    /// Optional regex the (non-null) text value must match.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Reject dates strictly later than today.
    #[serde(default)]
    pub not_future: bool,
}

impl ColumnRule {
    fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            pattern: None,
            not_future: false,
        }
    }
}

/// The geometry column triple checked by the polygon invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryRule {
    pub x: String,
    pub y: String,
    pub crs: String,
}

/// Group-scoped invariants, keyed by one column.
///
/// Rows with a null key value take no part in grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRules {
    /// Column whose value partitions rows into groups.
    pub key: String,
    /// Columns that must hold at most one distinct non-null value per group.
    #[serde(default)]
    pub consistency: Vec<String>,
    /// Geometry completeness/closure columns, when the datatype has any.
    #[serde(default)]
    pub geometry: Option<GeometryRule>,
}

/// The full rule table for one datatype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruleset {
    pub datatype: String,
    pub columns: Vec<ColumnRule>,
    #[serde(default)]
    pub group: Option<GroupRules>,
}

impl Ruleset {
    /// The built-in ruleset for the FIELD datatype.
    pub fn field() -> Self {
        Self {
            datatype: "FIELD".to_string(),
            columns: vec![
                ColumnRule {
                    required: true,
                    ..ColumnRule::new("FieldName", ColumnKind::Text)
                },
                ColumnRule::new("FieldType", ColumnKind::Text),
                ColumnRule {
                    not_future: true,
                    ..ColumnRule::new("DiscoveryDate", ColumnKind::Date)
                },
                ColumnRule::new("X", ColumnKind::Float),
                ColumnRule::new("Y", ColumnKind::Float),
                ColumnRule {
                    pattern: Some(CRS_PATTERN.to_string()),
                    ..ColumnRule::new("CRS", ColumnKind::Text)
                },
                ColumnRule::new("Source", ColumnKind::Text),
                ColumnRule::new("ParentFieldName", ColumnKind::Text),
            ],
            group: Some(GroupRules {
                key: "FieldName".to_string(),
                consistency: vec!["FieldType".to_string(), "DiscoveryDate".to_string()],
                geometry: Some(GeometryRule {
                    x: "X".to_string(),
                    y: "Y".to_string(),
                    crs: "CRS".to_string(),
                }),
            }),
        }
    }

    /// Expected column names, in declaration order.
    pub fn expected_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Expected columns absent from the given header.
    pub fn missing_columns(&self, headers: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !headers.iter().any(|h| h == &c.name))
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnRule> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Lookup from datatype tag to its rule table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct RulesetRegistry {
    rulesets: HashMap<String, Ruleset>,
}

impl RulesetRegistry {
    /// Registry holding only the built-in rulesets.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.insert(Ruleset::field());
        registry
    }

    /// Add or replace a ruleset; the datatype tag is the key.
    pub fn insert(&mut self, ruleset: Ruleset) {
        self.rulesets.insert(ruleset.datatype.clone(), ruleset);
    }

    pub fn get(&self, datatype: &str) -> Option<&Ruleset> {
        self.rulesets.get(datatype)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ruleset> {
        self.rulesets.values()
    }
}
