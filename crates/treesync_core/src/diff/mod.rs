//! Diff results.
//!
//! A [`Diff`] groups [`DiffElement`]s by record type and, within a type,
//! by shortname. Types appear in first-seen order; elements of one type
//! are iterated in first-seen order unless a [`ChildOrdering`] rule says
//! otherwise.

mod element;

pub use element::{AttrsDiff, DiffAction, DiffElement};

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ChildOrdering;
use crate::error::{CoreError, CoreResult};

/// Action counts for a diff.
///
/// `skip` is the number of compared record pairs that produced no element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Elements to create.
    pub create: usize,
    /// Elements to update.
    pub update: usize,
    /// Elements to delete.
    pub delete: usize,
    /// Elements present on both sides without differences.
    #[serde(rename = "no-change")]
    pub no_change: usize,
    /// Compared pairs that were skipped by flags.
    pub skip: usize,
}

impl DiffSummary {
    fn absorb(&mut self, other: DiffSummary) {
        self.create += other.create;
        self.update += other.update;
        self.delete += other.delete;
        self.no_change += other.no_change;
    }

    /// Returns the number of elements counted (excluding skips).
    #[must_use]
    pub fn elements(&self) -> usize {
        self.create + self.update + self.delete + self.no_change
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "create: {}, update: {}, delete: {}, no-change: {}, skip: {}",
            self.create, self.update, self.delete, self.no_change, self.skip
        )
    }
}

#[derive(Debug, Clone, Default)]
struct DiffGroup {
    model_type: String,
    elements: Vec<DiffElement>,
    by_name: HashMap<String, usize>,
}

/// A tree-shaped comparison result.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    groups: Vec<DiffGroup>,
    ordering: ChildOrdering,
    models_processed: usize,
}

impl Diff {
    /// Creates an empty diff with insertion ordering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty diff with the given ordering rules.
    #[must_use]
    pub fn with_ordering(ordering: ChildOrdering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    /// Adds an element under its type and shortname.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if that type already has an element with
    /// the same shortname.
    pub fn add(&mut self, element: DiffElement) -> CoreResult<()> {
        let index = match self
            .groups
            .iter()
            .position(|g| g.model_type == element.model_type())
        {
            Some(index) => index,
            None => {
                self.groups.push(DiffGroup {
                    model_type: element.model_type().to_string(),
                    ..DiffGroup::default()
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[index];
        if group.by_name.contains_key(element.name()) {
            return Err(CoreError::already_exists(element.model_type(), element.name()));
        }
        group
            .by_name
            .insert(element.name().to_string(), group.elements.len());
        group.elements.push(element);
        Ok(())
    }

    /// Returns the type names in first-seen order.
    #[must_use]
    pub fn groups(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.model_type.as_str()).collect()
    }

    /// Returns the elements of one type in iteration order.
    #[must_use]
    pub fn group(&self, model_type: &str) -> Vec<&DiffElement> {
        self.groups
            .iter()
            .find(|g| g.model_type == model_type)
            .map(|g| {
                let mut elements: Vec<_> = g.elements.iter().collect();
                self.ordering.order(&g.model_type, &mut elements);
                elements
            })
            .unwrap_or_default()
    }

    /// Looks up an element by type and shortname.
    #[must_use]
    pub fn get(&self, model_type: &str, name: &str) -> Option<&DiffElement> {
        let group = self.groups.iter().find(|g| g.model_type == model_type)?;
        group.by_name.get(name).map(|i| &group.elements[*i])
    }

    /// Returns every top-level element: groups in first-seen order, each
    /// ordered by its rule.
    #[must_use]
    pub fn children(&self) -> Vec<&DiffElement> {
        self.groups
            .iter()
            .flat_map(|g| self.group(&g.model_type))
            .collect()
    }

    /// Returns `true` if any element or descendant has a non-`none` action.
    #[must_use]
    pub fn has_diffs(&self) -> bool {
        self.groups
            .iter()
            .flat_map(|g| g.elements.iter())
            .any(|e| e.has_diffs(true))
    }

    /// Returns the number of elements, including nested ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.elements.iter())
            .map(|e| 1 + e.child_diff().len())
            .sum()
    }

    /// Returns `true` if the diff holds no element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.elements.is_empty())
    }

    /// Returns the number of record pairs compared to produce this diff.
    #[must_use]
    pub fn models_processed(&self) -> usize {
        self.models_processed
    }

    pub(crate) fn set_models_processed(&mut self, count: usize) {
        self.models_processed = count;
    }

    pub(crate) fn action_counts(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for element in self.groups.iter().flat_map(|g| g.elements.iter()) {
            summary.absorb(element.summary());
        }
        summary
    }

    /// Counts actions over the whole tree.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        let mut summary = self.action_counts();
        summary.skip = self.models_processed.saturating_sub(summary.elements());
        summary
    }

    /// Renders the elements with diffs as `{type: {shortname: element}}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for group in &self.groups {
            let mut elements = serde_json::Map::new();
            for element in self.group(&group.model_type) {
                if element.has_diffs(true) {
                    elements.insert(element.name().to_string(), element.to_json());
                }
            }
            if !elements.is_empty() {
                map.insert(group.model_type.clone(), serde_json::Value::Object(elements));
            }
        }
        serde_json::Value::Object(map)
    }

    pub(crate) fn render(&self, indent: usize, out: &mut String) {
        let margin = " ".repeat(indent);
        let mut first = true;
        for group in &self.groups {
            let mut heading = false;
            for element in self.group(&group.model_type) {
                if !element.has_diffs(true) {
                    continue;
                }
                if !first {
                    out.push('\n');
                }
                first = false;
                if !heading {
                    out.push_str(&format!("{margin}{}\n", group.model_type));
                    heading = true;
                }
                element.render(indent + 2, out);
            }
        }
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(0, &mut out);
        if out.is_empty() {
            return f.write_str("(no diffs)");
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::value::Attrs;

    fn element(model: &str, name: &str, src: Option<Attrs>, dst: Option<Attrs>) -> DiffElement {
        let mut e =
            DiffElement::new(model, name, name, attrs! { "name" => name }, "source", "dest");
        if let Some(a) = src {
            e.set_source_attrs(a);
        }
        if let Some(a) = dst {
            e.set_dest_attrs(a);
        }
        e
    }

    #[test]
    fn empty_diff() {
        let diff = Diff::new();
        assert!(!diff.has_diffs());
        assert!(diff.is_empty());
        assert_eq!(diff.to_string(), "(no diffs)");
        assert_eq!(diff.to_json(), serde_json::json!({}));
        assert_eq!(diff.summary(), DiffSummary::default());
    }

    #[test]
    fn duplicate_shortname_rejected() {
        let mut diff = Diff::new();
        diff.add(element("device", "d1", Some(Attrs::new()), None)).unwrap();
        diff.add(element("site", "d1", Some(Attrs::new()), None)).unwrap();
        let err = diff
            .add(element("device", "d1", None, Some(Attrs::new())))
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let mut diff = Diff::new();
        diff.add(element("site", "b", Some(Attrs::new()), None)).unwrap();
        diff.add(element("device", "x", Some(Attrs::new()), None)).unwrap();
        diff.add(element("site", "a", Some(Attrs::new()), None)).unwrap();

        assert_eq!(diff.groups(), ["site", "device"]);
        let names: Vec<_> = diff.children().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["b", "a", "x"]);
        assert_eq!(diff.get("site", "a").map(DiffElement::name), Some("a"));
    }

    #[test]
    fn ordering_rule_applies_per_type() {
        let ordering = ChildOrdering::new().with_order("site", |a, b| a.name().cmp(b.name()));
        let mut diff = Diff::with_ordering(ordering);
        diff.add(element("site", "b", Some(Attrs::new()), None)).unwrap();
        diff.add(element("site", "a", Some(Attrs::new()), None)).unwrap();
        let names: Vec<_> = diff.children().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn summary_counts_skips() {
        let mut diff = Diff::new();
        diff.add(element("site", "a", Some(Attrs::new()), None)).unwrap();
        diff.add(element("site", "b", None, Some(Attrs::new()))).unwrap();
        diff.add(element("site", "c", Some(Attrs::new()), Some(Attrs::new())))
            .unwrap();
        diff.set_models_processed(5);

        let summary = diff.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.delete, 1);
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.skip, 2);
        assert_eq!(
            summary.to_string(),
            "create: 1, update: 0, delete: 1, no-change: 1, skip: 2"
        );
        assert_eq!(diff.len(), 3);
    }

    #[test]
    fn display_and_json_only_show_diffs() {
        let mut diff = Diff::new();
        diff.add(element("site", "nyc", Some(Attrs::new()), Some(Attrs::new())))
            .unwrap();
        diff.add(element("site", "sfo", Some(Attrs::new()), None)).unwrap();
        assert_eq!(diff.to_string(), "site\n  site: sfo MISSING in dest");
        assert_eq!(diff.to_json(), serde_json::json!({ "site": { "sfo": {} } }));
    }
}
