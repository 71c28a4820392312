//! One comparison outcome for one record identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Diff, DiffSummary};
use crate::config::ChildOrdering;
use crate::error::CoreResult;
use crate::value::{attrs_to_json, Attrs};

/// Action required to bring the destination in line with the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    /// Present only in the source.
    Create,
    /// Present on both sides with differing attributes.
    Update,
    /// Present only in the destination.
    Delete,
}

impl DiffAction {
    /// Returns the lowercase action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute changes of one element: new values (`plus`) and old values (`minus`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrsDiff {
    /// Values to apply, taken from the source.
    #[serde(rename = "+", skip_serializing_if = "Attrs::is_empty", default)]
    pub plus: Attrs,
    /// Values being replaced, taken from the destination.
    #[serde(rename = "-", skip_serializing_if = "Attrs::is_empty", default)]
    pub minus: Attrs,
}

impl AttrsDiff {
    /// Returns `true` if neither side carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plus.is_empty() && self.minus.is_empty()
    }
}

/// The comparison of one record identity across source and destination.
///
/// The action is always derived from which attribute sets are present,
/// never stored.
#[derive(Debug, Clone)]
pub struct DiffElement {
    model_type: String,
    name: String,
    unique_id: String,
    keys: Attrs,
    source_name: String,
    dest_name: String,
    source_attrs: Option<Attrs>,
    dest_attrs: Option<Attrs>,
    child_diff: Diff,
}

impl DiffElement {
    /// Creates an element with neither side's attributes recorded yet.
    pub fn new(
        model_type: impl Into<String>,
        name: impl Into<String>,
        unique_id: impl Into<String>,
        keys: Attrs,
        source_name: impl Into<String>,
        dest_name: impl Into<String>,
    ) -> Self {
        Self {
            model_type: model_type.into(),
            name: name.into(),
            unique_id: unique_id.into(),
            keys,
            source_name: source_name.into(),
            dest_name: dest_name.into(),
            source_attrs: None,
            dest_attrs: None,
            child_diff: Diff::new(),
        }
    }

    pub(crate) fn set_child_ordering(&mut self, ordering: ChildOrdering) {
        self.child_diff = Diff::with_ordering(ordering);
    }

    /// Records the source-side attributes.
    pub fn set_source_attrs(&mut self, attrs: Attrs) {
        self.source_attrs = Some(attrs);
    }

    /// Records the destination-side attributes.
    pub fn set_dest_attrs(&mut self, attrs: Attrs) {
        self.dest_attrs = Some(attrs);
    }

    /// Returns the record type name.
    #[must_use]
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Returns the shortname.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unique ID of the compared records.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Returns the identifier mapping.
    #[must_use]
    pub fn keys(&self) -> &Attrs {
        &self.keys
    }

    /// Returns the label of the source adapter.
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Returns the label of the destination adapter.
    #[must_use]
    pub fn dest_name(&self) -> &str {
        &self.dest_name
    }

    /// Returns the source-side attributes, if the record exists in the source.
    #[must_use]
    pub fn source_attrs(&self) -> Option<&Attrs> {
        self.source_attrs.as_ref()
    }

    /// Returns the destination-side attributes, if the record exists in the destination.
    #[must_use]
    pub fn dest_attrs(&self) -> Option<&Attrs> {
        self.dest_attrs.as_ref()
    }

    /// Returns the derived action, or `None` when nothing needs to change.
    ///
    /// An update is only reported when an attribute present on both sides
    /// differs. Attributes declared by one side alone are not compared.
    #[must_use]
    pub fn action(&self) -> Option<DiffAction> {
        match (&self.source_attrs, &self.dest_attrs) {
            (Some(_), None) => Some(DiffAction::Create),
            (None, Some(_)) => Some(DiffAction::Delete),
            (Some(src), Some(dst)) => self
                .attrs_keys()
                .into_iter()
                .any(|key| src[key] != dst[key])
                .then_some(DiffAction::Update),
            (None, None) => None,
        }
    }

    /// Returns the attribute names meaningful for this element.
    ///
    /// When both sides are present this is the intersection of their keys.
    #[must_use]
    pub fn attrs_keys(&self) -> Vec<&str> {
        match (&self.source_attrs, &self.dest_attrs) {
            (Some(src), Some(dst)) => dst
                .keys()
                .filter(|k| src.contains_key(*k))
                .map(String::as_str)
                .collect(),
            (Some(attrs), None) | (None, Some(attrs)) => attrs.keys().map(String::as_str).collect(),
            (None, None) => Vec::new(),
        }
    }

    /// Returns the attribute changes this element represents.
    ///
    /// Updates list only the differing attributes. Creates carry every
    /// source attribute in `plus`; deletes every destination attribute in `minus`.
    #[must_use]
    pub fn attrs_diffs(&self) -> AttrsDiff {
        match (&self.source_attrs, &self.dest_attrs) {
            (Some(src), Some(dst)) => {
                let mut diff = AttrsDiff::default();
                for key in self.attrs_keys() {
                    let (s, d) = (&src[key], &dst[key]);
                    if s != d {
                        diff.plus.insert(key.to_string(), s.clone());
                        diff.minus.insert(key.to_string(), d.clone());
                    }
                }
                diff
            }
            (Some(src), None) => AttrsDiff {
                plus: src.clone(),
                minus: Attrs::new(),
            },
            (None, Some(dst)) => AttrsDiff {
                plus: Attrs::new(),
                minus: dst.clone(),
            },
            (None, None) => AttrsDiff::default(),
        }
    }

    /// Attaches a child element.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a child of the same type and shortname is present.
    pub fn add_child(&mut self, element: DiffElement) -> CoreResult<()> {
        self.child_diff.add(element)
    }

    /// Returns the nested diff of this element's children.
    #[must_use]
    pub fn child_diff(&self) -> &Diff {
        &self.child_diff
    }

    /// Returns the child elements in iteration order.
    #[must_use]
    pub fn children(&self) -> Vec<&DiffElement> {
        self.child_diff.children()
    }

    /// Returns `true` if this element, or with `include_children` any
    /// descendant, has a non-`none` action.
    #[must_use]
    pub fn has_diffs(&self, include_children: bool) -> bool {
        self.action().is_some() || (include_children && self.child_diff.has_diffs())
    }

    /// Counts actions for this element and its descendants.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        let mut summary = self.child_diff.action_counts();
        match self.action() {
            Some(DiffAction::Create) => summary.create += 1,
            Some(DiffAction::Update) => summary.update += 1,
            Some(DiffAction::Delete) => summary.delete += 1,
            None => summary.no_change += 1,
        }
        summary
    }

    /// Renders the changes as JSON: `"+"`/`"-"` attribute maps plus child groups.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let diffs = self.attrs_diffs();
        let mut map = serde_json::Map::new();
        if !diffs.plus.is_empty() {
            map.insert("+".to_string(), attrs_to_json(&diffs.plus));
        }
        if !diffs.minus.is_empty() {
            map.insert("-".to_string(), attrs_to_json(&diffs.minus));
        }
        if let serde_json::Value::Object(children) = self.child_diff.to_json() {
            map.extend(children);
        }
        serde_json::Value::Object(map)
    }

    pub(crate) fn render(&self, indent: usize, out: &mut String) {
        let margin = " ".repeat(indent);
        out.push_str(&format!("{margin}{}: {}", self.model_type, self.name));
        match (&self.source_attrs, &self.dest_attrs) {
            (Some(src), Some(dst)) => {
                for key in self.attrs_keys() {
                    if src[key] != dst[key] {
                        out.push_str(&format!(
                            "\n{margin}  {key}    {}({})    {}({})",
                            self.source_name, src[key], self.dest_name, dst[key]
                        ));
                    }
                }
            }
            (Some(_), None) => out.push_str(&format!(" MISSING in {}", self.dest_name)),
            (None, Some(_)) => out.push_str(&format!(" MISSING in {}", self.source_name)),
            (None, None) => {}
        }
        if self.child_diff.has_diffs() {
            out.push('\n');
            self.child_diff.render(indent + 2, out);
        }
    }
}

impl fmt::Display for DiffElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(0, &mut out);
        f.write_str(&out)
    }
}
