//! The validation engine: field-level rules plus row- and group-scoped
//! invariants, all lowered into one row-addressed error shape.
//!
//! A call to [`Engine::validate`] owns its accumulators; nothing carries
//! over between calls, so re-validating the same frame always yields the
//! same outcome.

use crate::frame::{TableFrame, Value};
use crate::outcome::{codes, ErrorKind, RowError, RowStatus, ValidationOutcome};
use crate::ruleset::{GroupRules, Ruleset};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Engine construction errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid pattern for column '{column}': {source}")]
    Pattern {
        column: String,
        #[source]
        source: regex::Error,
    },
}

/// A ruleset with its format patterns compiled.
pub struct Engine {
    rules: Ruleset,
    patterns: Vec<(String, Regex)>,
}

impl Engine {
    /// Compile the ruleset's format constraints.
    pub fn new(rules: Ruleset) -> Result<Self, EngineError> {
        let mut patterns = Vec::new();
        for column in &rules.columns {
            if let Some(pattern) = &column.pattern {
                let regex = Regex::new(pattern).map_err(|source| EngineError::Pattern {
                    column: column.name.clone(),
                    source,
                })?;
                patterns.push((column.name.clone(), regex));
            }
        }
        Ok(Self { rules, patterns })
    }

    pub fn rules(&self) -> &Ruleset {
        &self.rules
    }

    /// Run every check against the frame and produce one status per row plus
    /// one record per violation.
    ///
    /// Checks accumulate independently; a row can collect several errors
    /// from different checks. Coercion errors recorded while the frame was
    /// built are folded in first.
    pub fn validate(&self, frame: &TableFrame) -> ValidationOutcome {
        self.validate_as_of(frame, chrono::Utc::now().date_naive())
    }

    /// [`Engine::validate`] with an explicit "today" for the date-sanity
    /// check.
    pub fn validate_as_of(&self, frame: &TableFrame, today: chrono::NaiveDate) -> ValidationOutcome {
        let mut errors: Vec<RowError> = frame.coercion_errors().to_vec();

        self.check_field_rules(frame, &mut errors);
        self.check_not_future(frame, today, &mut errors);

        if let Some(group_rules) = &self.rules.group {
            let groups = group_rows(frame, &group_rules.key);
            self.check_group_consistency(frame, group_rules, &groups, &mut errors);
            self.check_geometry_completeness(frame, group_rules, &groups, &mut errors);
            self.check_geometry_closure(frame, group_rules, &groups, &mut errors);
        }

        let failed: HashSet<usize> = errors.iter().map(|e| e.row_index).collect();
        let row_status = (0..frame.len())
            .map(|i| {
                if failed.contains(&i) {
                    RowStatus::Failed
                } else {
                    RowStatus::Passed
                }
            })
            .collect();

        ValidationOutcome { row_status, errors }
    }

    /// Nullability and format constraints, evaluated independently per row.
    fn check_field_rules(&self, frame: &TableFrame, errors: &mut Vec<RowError>) {
        for column in &self.rules.columns {
            if !column.required {
                continue;
            }
            for row in 0..frame.len() {
                if frame.value(row, &column.name).is_null() {
                    errors.push(RowError {
                        row_index: row,
                        field_name: column.name.clone(),
                        kind: ErrorKind::Row,
                        code: codes::MISSING_REQUIRED_VALUE,
                    });
                }
            }
        }

        for (column, regex) in &self.patterns {
            for row in 0..frame.len() {
                if let Value::Text(text) = frame.value(row, column) {
                    if !regex.is_match(text) {
                        errors.push(RowError {
                            row_index: row,
                            field_name: column.clone(),
                            kind: ErrorKind::Row,
                            code: codes::INVALID_FORMAT,
                        });
                    }
                }
            }
        }
    }

    /// Date sanity: a discovery date must not lie strictly after today.
    fn check_not_future(
        &self,
        frame: &TableFrame,
        today: chrono::NaiveDate,
        errors: &mut Vec<RowError>,
    ) {
        for column in &self.rules.columns {
            if !column.not_future {
                continue;
            }
            for row in 0..frame.len() {
                if let Some(date) = frame.value(row, &column.name).as_date() {
                    if date > today {
                        errors.push(RowError {
                            row_index: row,
                            field_name: column.name.clone(),
                            kind: ErrorKind::Row,
                            code: codes::FUTURE_DISCOVERY_DATE,
                        });
                    }
                }
            }
        }
    }

    /// Within a group, each consistency column must hold at most one
    /// distinct non-null value; otherwise every member row is flagged.
    fn check_group_consistency(
        &self,
        frame: &TableFrame,
        rules: &GroupRules,
        groups: &BTreeMap<String, Vec<usize>>,
        errors: &mut Vec<RowError>,
    ) {
        for (key, members) in groups {
            let inconsistent = rules.consistency.iter().any(|column| {
                let distinct: HashSet<String> = members
                    .iter()
                    .filter_map(|&row| frame.value(row, column).canonical())
                    .collect();
                distinct.len() > 1
            });

            if inconsistent {
                for &row in members {
                    errors.push(RowError {
                        row_index: row,
                        field_name: key.clone(),
                        kind: ErrorKind::Group,
                        code: codes::INCONSISTENT_FIELD_DATA,
                    });
                }
            }
        }
    }

    /// X, Y and CRS must be uniformly all-present or all-absent per row; a
    /// single violating row flags the whole group.
    fn check_geometry_completeness(
        &self,
        frame: &TableFrame,
        rules: &GroupRules,
        groups: &BTreeMap<String, Vec<usize>>,
        errors: &mut Vec<RowError>,
    ) {
        let Some(geometry) = &rules.geometry else {
            return;
        };

        for (key, members) in groups {
            let violated = members.iter().any(|&row| {
                let x_null = frame.value(row, &geometry.x).is_null();
                let y_null = frame.value(row, &geometry.y).is_null();
                let crs_null = frame.value(row, &geometry.crs).is_null();
                x_null != y_null || y_null != crs_null
            });

            if violated {
                for &row in members {
                    errors.push(RowError {
                        row_index: row,
                        field_name: key.clone(),
                        kind: ErrorKind::Group,
                        code: codes::INCOMPLETE_GEOMETRY,
                    });
                }
            }
        }
    }

    /// Among a group's coordinate-bearing rows, the first and last (X, Y)
    /// must coincide when there are at least two of them.
    fn check_geometry_closure(
        &self,
        frame: &TableFrame,
        rules: &GroupRules,
        groups: &BTreeMap<String, Vec<usize>>,
        errors: &mut Vec<RowError>,
    ) {
        let Some(geometry) = &rules.geometry else {
            return;
        };

        for (key, members) in groups {
            let coords: Vec<(f64, f64)> = members
                .iter()
                .filter_map(|&row| {
                    let x = frame.value(row, &geometry.x).as_float()?;
                    let y = frame.value(row, &geometry.y).as_float()?;
                    Some((x, y))
                })
                .collect();

            if coords.len() >= 2 && coords.first() != coords.last() {
                for &row in members {
                    errors.push(RowError {
                        row_index: row,
                        field_name: key.clone(),
                        kind: ErrorKind::Group,
                        code: codes::GEOMETRY_NOT_CLOSED,
                    });
                }
            }
        }
    }
}

/// Partition row indices by the text value of the group key column.
///
/// Rows with a null key are not grouped; their per-row checks still run.
fn group_rows(frame: &TableFrame, key: &str) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for row in 0..frame.len() {
        if let Some(value) = frame.value(row, key).as_text() {
            groups.entry(value.to_string()).or_default().push(row);
        }
    }
    groups
}
