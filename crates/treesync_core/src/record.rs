//! Record instances.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::flags::ModelFlags;
use crate::schema::ModelSchema;
use crate::status::{RecordStatus, SyncStatus};
use crate::value::{Attrs, Value};

/// One typed record.
///
/// A record holds values for its identifier and attribute fields, any
/// extra (non-diffed) fields, and for each declared child field the
/// ordered unique IDs of its children. The owning adapter label and the
/// last sync status are transient: they are not part of identity,
/// equality or the serialized form.
#[derive(Debug, Clone)]
pub struct Record {
    schema: &'static ModelSchema,
    values: Attrs,
    children: BTreeMap<&'static str, Vec<String>>,
    flags: ModelFlags,
    status: RecordStatus,
    adapter: Option<String>,
}

impl Record {
    /// Creates a record from identifier and attribute values.
    ///
    /// Fields in `attrs` that are neither identifiers nor attributes are
    /// kept as extra fields.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` if an identifier value is absent, or
    /// `InvalidSchema` if `attrs` names a child field.
    pub fn new(schema: &'static ModelSchema, ids: Attrs, attrs: Attrs) -> CoreResult<Self> {
        let mut values = ids;
        for (field, value) in attrs {
            if schema.child_type_of(&field).is_some() {
                return Err(CoreError::invalid_schema(
                    schema.name,
                    format!("'{field}' is a child field, not an attribute"),
                ));
            }
            values.insert(field, value);
        }
        schema.unique_id(&values)?;

        Ok(Self {
            schema,
            values,
            children: schema.children.iter().map(|(_, f)| (*f, Vec::new())).collect(),
            flags: schema.default_flags,
            status: RecordStatus::default(),
            adapter: None,
        })
    }

    /// Rebuilds a record from its serialized field mapping.
    ///
    /// Child fields must hold lists of unique IDs.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` or `Serialization` on malformed input.
    pub fn from_fields(schema: &'static ModelSchema, fields: Attrs) -> CoreResult<Self> {
        let mut values = Attrs::new();
        let mut child_lists = Vec::new();
        for (field, value) in fields {
            if let Some(child_type) = schema.child_type_of(&field) {
                let uids = value
                    .as_list()
                    .ok_or_else(|| {
                        CoreError::serialization(format!(
                            "{}.{field}: expected a list of {child_type} ids",
                            schema.name
                        ))
                    })?
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                child_lists.push((field, uids));
            } else {
                values.insert(field, value);
            }
        }

        let mut record = Self::new(schema, Attrs::new(), values)?;
        for (field, uids) in child_lists {
            if let Some(list) = record.children.get_mut(field.as_str()) {
                *list = uids;
            }
        }
        Ok(record)
    }

    /// Returns the record type descriptor.
    #[must_use]
    pub fn schema(&self) -> &'static ModelSchema {
        self.schema
    }

    /// Returns the record type name.
    #[must_use]
    pub fn model_name(&self) -> &'static str {
        self.schema.name
    }

    /// Returns the unique ID: identifier values joined with `"__"`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        // Presence of every identifier is checked in `new`.
        self.schema.unique_id(&self.values).unwrap_or_default()
    }

    /// Returns the shortname.
    #[must_use]
    pub fn shortname(&self) -> String {
        self.schema
            .shortname_of(&self.values)
            .unwrap_or_else(|_| self.unique_id())
    }

    /// Returns the identifier mapping.
    #[must_use]
    pub fn identifiers(&self) -> Attrs {
        self.schema.pick_identifiers(&self.values)
    }

    /// Returns the attribute mapping.
    #[must_use]
    pub fn attrs(&self) -> Attrs {
        self.schema.pick_attributes(&self.values)
    }

    /// Returns the value of a non-child field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Sets a non-child field.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` when `field` is an identifier or child field;
    /// identity is fixed at construction.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> CoreResult<()> {
        let field = field.into();
        if self.schema.is_identifier(&field) || self.schema.child_type_of(&field).is_some() {
            return Err(CoreError::invalid_schema(
                self.schema.name,
                format!("'{field}' cannot be assigned after construction"),
            ));
        }
        self.values.insert(field, value.into());
        Ok(())
    }

    /// Applies every entry of `attrs` with [`Record::set`].
    ///
    /// # Errors
    ///
    /// See [`Record::set`].
    pub fn set_attrs(&mut self, attrs: &Attrs) -> CoreResult<()> {
        for (field, value) in attrs {
            self.set(field.clone(), value.clone())?;
        }
        Ok(())
    }

    /// Returns the unique IDs of children of `child_type`.
    #[must_use]
    pub fn children(&self, child_type: &str) -> &[String] {
        self.schema
            .child_field(child_type)
            .and_then(|field| self.children.get(field))
            .map_or(&[], Vec::as_slice)
    }

    /// Iterates over `(child type, child unique IDs)` in declaration order.
    pub fn child_refs(&self) -> impl Iterator<Item = (&'static str, &[String])> + '_ {
        self.schema
            .children
            .iter()
            .map(|(child_type, _)| (*child_type, self.children(child_type)))
    }

    /// Registers `child` under the matching child field.
    ///
    /// # Errors
    ///
    /// Returns `WrongType` if the child's type is not declared, and
    /// `AlreadyExists` if it is already referenced.
    pub fn add_child(&mut self, child: &Record) -> CoreResult<()> {
        let uid = child.unique_id();
        let list = self.child_list_mut(child.model_name())?;
        if list.contains(&uid) {
            return Err(CoreError::already_exists(child.model_name(), uid));
        }
        list.push(uid);
        Ok(())
    }

    /// Removes `child` from the matching child field.
    ///
    /// # Errors
    ///
    /// Returns `WrongType` if the child's type is not declared, and
    /// `NotFound` if it is not referenced.
    pub fn remove_child(&mut self, child: &Record) -> CoreResult<()> {
        let uid = child.unique_id();
        let list = self.child_list_mut(child.model_name())?;
        let position = list
            .iter()
            .position(|u| *u == uid)
            .ok_or_else(|| CoreError::not_found(child.model_name(), uid.clone()))?;
        list.remove(position);
        Ok(())
    }

    fn child_list_mut(&mut self, child_type: &str) -> CoreResult<&mut Vec<String>> {
        let field = self
            .schema
            .child_field(child_type)
            .ok_or_else(|| CoreError::wrong_type(self.schema.name, child_type))?;
        Ok(self.children.entry(field).or_default())
    }

    /// Returns the model flags.
    #[must_use]
    pub fn flags(&self) -> ModelFlags {
        self.flags
    }

    /// Replaces the model flags.
    pub fn set_flags(&mut self, flags: ModelFlags) {
        self.flags = flags;
    }

    /// Builder form of [`Record::set_flags`] that adds to the current flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ModelFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Returns the last sync status.
    #[must_use]
    pub fn status(&self) -> &RecordStatus {
        &self.status
    }

    /// Records the outcome of a sync operation.
    pub fn set_status(&mut self, status: SyncStatus, message: impl Into<String>) {
        self.status = RecordStatus::new(status, message);
    }

    /// Returns the label of the adapter whose store holds this record.
    #[must_use]
    pub fn adapter(&self) -> Option<&str> {
        self.adapter.as_deref()
    }

    pub(crate) fn set_adapter(&mut self, adapter: Option<String>) {
        self.adapter = adapter;
    }

    /// Returns the serialized form: every field, with child fields as
    /// lists of unique IDs. Adapter label and status are excluded.
    #[must_use]
    pub fn to_fields(&self) -> Attrs {
        let mut fields = self.values.clone();
        for (field, uids) in &self.children {
            fields.insert(
                (*field).to_string(),
                Value::List(uids.iter().map(|u| Value::Text(u.clone())).collect()),
            );
        }
        fields
    }

    /// Returns `true` if both records have the same type, fields and children.
    #[must_use]
    pub fn same_content(&self, other: &Record) -> bool {
        self.schema.name == other.schema.name
            && self.values == other.values
            && self.children == other.children
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.same_content(other) && self.flags == other.flags
    }
}

impl Eq for Record {}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\": {{", self.schema.name, self.unique_id())?;
        for (i, (field, value)) in self.attrs().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}: {value}")?;
        }
        write!(f, "}}")?;
        for (_, field) in self.schema.children {
            let uids = self.children.get(field).map(Vec::as_slice).unwrap_or(&[]);
            write!(f, " {field}: [{}]", uids.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    static SITE: ModelSchema = ModelSchema::new("site", &["name"])
        .with_children(&[("device", "devices"), ("person", "people")]);
    static DEVICE: ModelSchema = ModelSchema::new("device", &["name"])
        .with_attributes(&["role"])
        .with_flags(ModelFlags::NATURAL_DELETION_ORDER);
    static OTHER: ModelSchema = ModelSchema::new("rack", &["name"]);

    fn device(name: &str) -> Record {
        Record::new(&DEVICE, attrs! { "name" => name }, attrs! { "role" => "leaf" }).unwrap()
    }

    #[test]
    fn new_applies_default_flags() {
        let d = device("d1");
        assert_eq!(d.unique_id(), "d1");
        assert_eq!(d.shortname(), "d1");
        assert!(d.flags().contains(ModelFlags::NATURAL_DELETION_ORDER));
        assert_eq!(d.status().status, SyncStatus::Unknown);
    }

    #[test]
    fn new_requires_identifiers() {
        let err = Record::new(&DEVICE, Attrs::new(), attrs! { "role" => "x" }).unwrap_err();
        assert!(matches!(err, CoreError::MissingIdentifier { .. }));
    }

    #[test]
    fn add_and_remove_child() {
        let mut site = Record::new(&SITE, attrs! { "name" => "nyc" }, Attrs::new()).unwrap();
        let d1 = device("d1");
        site.add_child(&d1).unwrap();
        assert_eq!(site.children("device"), ["d1".to_string()]);

        let err = site.add_child(&d1).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));

        site.remove_child(&d1).unwrap();
        assert!(site.children("device").is_empty());
        let err = site.remove_child(&d1).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn undeclared_child_type() {
        let mut site = Record::new(&SITE, attrs! { "name" => "nyc" }, Attrs::new()).unwrap();
        let rack = Record::new(&OTHER, attrs! { "name" => "r1" }, Attrs::new()).unwrap();
        assert!(matches!(site.add_child(&rack), Err(CoreError::WrongType { .. })));
        assert!(matches!(site.remove_child(&rack), Err(CoreError::WrongType { .. })));
    }

    #[test]
    fn identifiers_are_immutable() {
        let mut d = device("d1");
        assert!(d.set("name", "d2").is_err());
        d.set("role", "spine").unwrap();
        d.set("serial", "abc").unwrap();
        assert_eq!(d.attrs(), attrs! { "role" => "spine" });
        assert_eq!(d.get("serial"), Some(&Value::from("abc")));
    }

    #[test]
    fn fields_round_trip() {
        let mut site = Record::new(&SITE, attrs! { "name" => "nyc" }, Attrs::new()).unwrap();
        site.add_child(&device("d1")).unwrap();
        let fields = site.to_fields();
        assert_eq!(fields["devices"], Value::from(vec!["d1"]));
        assert_eq!(fields["people"], Value::List(vec![]));

        let back = Record::from_fields(&SITE, fields).unwrap();
        assert_eq!(back, site);
    }

    #[test]
    fn equality_ignores_transient_state() {
        let a = device("d1");
        let mut b = device("d1");
        b.set_status(SyncStatus::Success, "done");
        b.set_adapter(Some("backend".into()));
        assert_eq!(a, b);
    }

    #[test]
    fn display_lists_attrs_and_children() {
        let mut site = Record::new(&SITE, attrs! { "name" => "nyc" }, Attrs::new()).unwrap();
        site.add_child(&device("d1")).unwrap();
        assert_eq!(site.to_string(), "site \"nyc\": {} devices: [d1] people: []");
    }
}
