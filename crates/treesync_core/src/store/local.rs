//! In-process record store.

use std::collections::{BTreeMap, HashMap};

use super::RecordStore;
use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::schema::ModelSchema;

#[derive(Debug, Default)]
struct Bucket {
    order: Vec<String>,
    records: HashMap<String, Record>,
}

/// A record store held in process memory.
///
/// Records of each type are returned in insertion order.
#[derive(Debug, Default)]
pub struct LocalStore {
    label: String,
    buckets: BTreeMap<String, Bucket>,
}

impl LocalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for LocalStore {
    fn attach(&mut self, adapter: &str, _schemas: &[&'static ModelSchema]) {
        self.label = adapter.to_string();
    }

    fn model_names(&self) -> CoreResult<Vec<String>> {
        Ok(self
            .buckets
            .iter()
            .filter(|(_, bucket)| !bucket.order.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn get(&self, model: &str, uid: &str) -> CoreResult<Option<Record>> {
        Ok(self
            .buckets
            .get(model)
            .and_then(|bucket| bucket.records.get(uid))
            .cloned())
    }

    fn get_all(&self, model: &str) -> CoreResult<Vec<Record>> {
        Ok(self
            .buckets
            .get(model)
            .map(|bucket| {
                bucket
                    .order
                    .iter()
                    .filter_map(|uid| bucket.records.get(uid).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn add(&mut self, mut record: Record) -> CoreResult<()> {
        let uid = record.unique_id();
        let bucket = self.buckets.entry(record.model_name().to_string()).or_default();
        if let Some(existing) = bucket.records.get(&uid) {
            if existing.same_content(&record) {
                return Ok(());
            }
            return Err(CoreError::already_exists(record.model_name(), uid));
        }
        record.set_adapter(Some(self.label.clone()));
        bucket.order.push(uid.clone());
        bucket.records.insert(uid, record);
        Ok(())
    }

    fn update(&mut self, mut record: Record) -> CoreResult<()> {
        let uid = record.unique_id();
        let slot = self
            .buckets
            .get_mut(record.model_name())
            .and_then(|bucket| bucket.records.get_mut(&uid))
            .ok_or_else(|| CoreError::not_found(record.model_name(), uid.clone()))?;
        record.set_adapter(Some(self.label.clone()));
        *slot = record;
        Ok(())
    }

    fn take(&mut self, model: &str, uid: &str) -> CoreResult<Option<Record>> {
        let Some(bucket) = self.buckets.get_mut(model) else {
            return Ok(None);
        };
        let record = bucket.records.remove(uid);
        if record.is_some() {
            bucket.order.retain(|u| u != uid);
        }
        Ok(record)
    }

    fn count(&self, model: Option<&str>) -> CoreResult<usize> {
        Ok(match model {
            Some(name) => self.buckets.get(name).map_or(0, |b| b.order.len()),
            None => self.buckets.values().map(|b| b.order.len()).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::value::Attrs;

    static SITE: ModelSchema =
        ModelSchema::new("site", &["name"]).with_children(&[("device", "devices")]);
    static DEVICE: ModelSchema = ModelSchema::new("device", &["name"]).with_attributes(&["role"]);

    fn store() -> LocalStore {
        let mut store = LocalStore::new();
        store.attach("local", &[&SITE, &DEVICE]);
        store
    }

    fn device(name: &str, role: &str) -> Record {
        Record::new(&DEVICE, attrs! { "name" => name }, attrs! { "role" => role }).unwrap()
    }

    #[test]
    fn add_sets_adapter_and_keeps_order() {
        let mut store = store();
        store.add(device("b", "leaf")).unwrap();
        store.add(device("a", "leaf")).unwrap();

        let all = store.get_all("device").unwrap();
        let names: Vec<_> = all.iter().map(Record::unique_id).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(all[0].adapter(), Some("local"));
        assert_eq!(store.count(Some("device")).unwrap(), 2);
        assert_eq!(store.count(None).unwrap(), 2);
        assert_eq!(store.model_names().unwrap(), ["device"]);
    }

    #[test]
    fn add_duplicate() {
        let mut store = store();
        store.add(device("a", "leaf")).unwrap();
        store.add(device("a", "leaf")).unwrap();
        let err = store.add(device("a", "spine")).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
    }

    #[test]
    fn update_requires_presence() {
        let mut store = store();
        let err = store.update(device("a", "leaf")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));

        store.add(device("a", "leaf")).unwrap();
        store.update(device("a", "spine")).unwrap();
        let got = store.get("device", "a").unwrap().unwrap();
        assert_eq!(got.attrs(), attrs! { "role" => "spine" });
    }

    #[test]
    fn get_by_uids_missing_is_error() {
        let mut store = store();
        store.add(device("a", "leaf")).unwrap();
        let found = store.get_by_uids("device", &["a".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        let err = store
            .get_by_uids("device", &["a".to_string(), "z".to_string()])
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { ref unique_id, .. } if unique_id == "z"));
    }

    #[test]
    fn remove_with_children() {
        let mut store = store();
        let mut site = Record::new(&SITE, attrs! { "name" => "nyc" }, Attrs::new()).unwrap();
        let d1 = device("d1", "leaf");
        let ghost = device("ghost", "leaf");
        site.add_child(&d1).unwrap();
        site.add_child(&ghost).unwrap();
        store.add(d1).unwrap();
        store.add(site).unwrap();

        let removed = store.remove("site", "nyc", true).unwrap();
        assert_eq!(removed.adapter(), None);
        assert_eq!(store.count(None).unwrap(), 0);
        assert!(store.model_names().unwrap().is_empty());
    }

    #[test]
    fn remove_without_children_keeps_them() {
        let mut store = store();
        let mut site = Record::new(&SITE, attrs! { "name" => "nyc" }, Attrs::new()).unwrap();
        let d1 = device("d1", "leaf");
        site.add_child(&d1).unwrap();
        store.add(d1).unwrap();
        store.add(site).unwrap();

        store.remove("site", "nyc", false).unwrap();
        assert_eq!(store.count(Some("device")).unwrap(), 1);
        let err = store.remove("site", "nyc", false).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
