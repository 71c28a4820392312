//! Static record type descriptors.
//!
//! Each record type is described once by a `const` [`ModelSchema`] that
//! classifies its fields into identifiers, attributes and child references.
//!
//! ```rust
//! use treesync_core::ModelSchema;
//!
//! const INTERFACE: ModelSchema = ModelSchema::new("interface", &["device_name", "name"])
//!     .with_shortname(&["name"])
//!     .with_attributes(&["description"]);
//!
//! INTERFACE.validate().unwrap();
//! ```

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::flags::ModelFlags;
use crate::value::{Attrs, Value};

/// Separator placed between identifier values in a unique ID.
pub const UID_SEPARATOR: &str = "__";

/// Declaration of one record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSchema {
    /// Type name, used as the registry and store key.
    pub name: &'static str,
    /// Ordered identifier fields; together they form the unique ID.
    pub identifiers: &'static [&'static str],
    /// Ordered shortname fields; empty means "same as identifiers".
    pub shortname: &'static [&'static str],
    /// Fields compared by the differ but not part of identity.
    pub attributes: &'static [&'static str],
    /// `(child type, field holding the child unique IDs)` pairs.
    pub children: &'static [(&'static str, &'static str)],
    /// Flags every new instance starts with.
    pub default_flags: ModelFlags,
}

impl ModelSchema {
    /// Creates a descriptor with identifiers only.
    #[must_use]
    pub const fn new(name: &'static str, identifiers: &'static [&'static str]) -> Self {
        Self {
            name,
            identifiers,
            shortname: &[],
            attributes: &[],
            children: &[],
            default_flags: ModelFlags::NONE,
        }
    }

    /// Sets the shortname fields.
    #[must_use]
    pub const fn with_shortname(self, shortname: &'static [&'static str]) -> Self {
        Self { shortname, ..self }
    }

    /// Sets the attribute fields.
    #[must_use]
    pub const fn with_attributes(self, attributes: &'static [&'static str]) -> Self {
        Self { attributes, ..self }
    }

    /// Sets the child type to field mapping.
    #[must_use]
    pub const fn with_children(self, children: &'static [(&'static str, &'static str)]) -> Self {
        Self { children, ..self }
    }

    /// Sets the default model flags.
    #[must_use]
    pub const fn with_flags(self, default_flags: ModelFlags) -> Self {
        Self {
            default_flags,
            ..self
        }
    }

    /// Returns the effective shortname fields.
    #[must_use]
    pub fn shortname_fields(&self) -> &'static [&'static str] {
        if self.shortname.is_empty() {
            self.identifiers
        } else {
            self.shortname
        }
    }

    /// Returns the field holding children of `child_type`, if declared.
    #[must_use]
    pub fn child_field(&self, child_type: &str) -> Option<&'static str> {
        self.children
            .iter()
            .find(|(ty, _)| *ty == child_type)
            .map(|(_, field)| *field)
    }

    /// Returns the child type stored in `field`, if it is a child field.
    #[must_use]
    pub fn child_type_of(&self, field: &str) -> Option<&'static str> {
        self.children
            .iter()
            .find(|(_, f)| *f == field)
            .map(|(ty, _)| *ty)
    }

    /// Returns `true` if `field` is an identifier.
    #[must_use]
    pub fn is_identifier(&self, field: &str) -> bool {
        self.identifiers.contains(&field)
    }

    /// Returns `true` if `field` is an attribute.
    #[must_use]
    pub fn is_attribute(&self, field: &str) -> bool {
        self.attributes.contains(&field)
    }

    /// Builds the unique ID from identifier values, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` if any identifier is absent from `values`.
    pub fn unique_id(&self, values: &Attrs) -> CoreResult<String> {
        self.join(self.identifiers, values)
    }

    /// Builds the shortname from `values`.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` if a shortname field is absent.
    pub fn shortname_of(&self, values: &Attrs) -> CoreResult<String> {
        self.join(self.shortname_fields(), values)
    }

    fn join(&self, fields: &[&str], values: &Attrs) -> CoreResult<String> {
        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            let value = values.get(*field).ok_or_else(|| CoreError::MissingIdentifier {
                model: self.name.to_string(),
                field: (*field).to_string(),
            })?;
            parts.push(value.to_string());
        }
        Ok(parts.join(UID_SEPARATOR))
    }

    /// Projects `values` onto the identifier fields.
    #[must_use]
    pub fn pick_identifiers(&self, values: &Attrs) -> Attrs {
        pick(self.identifiers, values)
    }

    /// Projects `values` onto the attribute fields; unset attributes are `Null`.
    #[must_use]
    pub fn pick_attributes(&self, values: &Attrs) -> Attrs {
        pick(self.attributes, values)
    }

    /// Checks that the declaration is self-consistent.
    ///
    /// A field may appear in at most one of identifiers, attributes and
    /// child fields; shortname fields must be identifiers or attributes;
    /// at least one identifier is required; child types are unique.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` describing the first violation found.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::invalid_schema("<unnamed>", "type name is empty"));
        }
        if self.identifiers.is_empty() {
            return Err(CoreError::invalid_schema(self.name, "no identifier fields"));
        }

        let mut seen = HashSet::new();
        let roles = self
            .identifiers
            .iter()
            .map(|f| (*f, "identifier"))
            .chain(self.attributes.iter().map(|f| (*f, "attribute")))
            .chain(self.children.iter().map(|(_, f)| (*f, "child field")));
        for (field, role) in roles {
            if !seen.insert(field) {
                return Err(CoreError::invalid_schema(
                    self.name,
                    format!("field '{field}' declared more than once (again as {role})"),
                ));
            }
        }

        for field in self.shortname {
            if !self.is_identifier(field) && !self.is_attribute(field) {
                return Err(CoreError::invalid_schema(
                    self.name,
                    format!("shortname field '{field}' is neither identifier nor attribute"),
                ));
            }
        }

        let mut child_types = HashSet::new();
        for (child_type, _) in self.children {
            if !child_types.insert(*child_type) {
                return Err(CoreError::invalid_schema(
                    self.name,
                    format!("child type '{child_type}' declared more than once"),
                ));
            }
        }
        Ok(())
    }
}

fn pick(fields: &[&str], values: &Attrs) -> Attrs {
    fields
        .iter()
        .map(|f| ((*f).to_string(), values.get(*f).cloned().unwrap_or(Value::Null)))
        .collect()
}
