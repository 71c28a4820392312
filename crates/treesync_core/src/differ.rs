//! Diff calculation.
//!
//! The differ walks the top-level collections of two adapters and recurses
//! into matching child collections:
//!
//! `diff_object_list -> diff_object_pair -> diff_child_objects -> diff_object_list`

use std::collections::HashMap;

use tracing::Span;

use crate::adapter::Adapter;
use crate::config::SyncOptions;
use crate::diff::{Diff, DiffElement};
use crate::error::{CoreError, CoreResult};
use crate::flags::{ModelFlags, SyncFlags};
use crate::record::Record;
use crate::value::Value;

/// Computes the [`Diff`] that would turn `dst` into `src`.
pub struct Differ<'a> {
    src: &'a Adapter,
    dst: &'a Adapter,
    options: &'a SyncOptions,
    span: Span,
    pairs: usize,
    processed: usize,
    total: usize,
}

impl<'a> Differ<'a> {
    /// Prepares a diff of `src` against `dst`.
    #[must_use]
    pub fn new(src: &'a Adapter, dst: &'a Adapter, options: &'a SyncOptions) -> Self {
        let span = tracing::info_span!(
            "diff",
            src = %src,
            dst = %dst,
            flags = ?options.flags
        );
        Self {
            src,
            dst,
            options,
            span,
            pairs: 0,
            processed: 0,
            total: 0,
        }
    }

    /// Runs the comparison.
    ///
    /// # Errors
    ///
    /// Returns a mismatch error if two records share a unique ID but
    /// disagree on type, shortname or identifiers, and propagates store
    /// errors such as `NotFound` for dangling child references.
    pub fn calculate(mut self) -> CoreResult<Diff> {
        let span = self.span.clone();
        let _guard = span.enter();
        tracing::info!("beginning diff calculation");

        self.total = self.src.count(None)? + self.dst.count(None)?;
        let mut diff = Diff::with_ordering(self.options.ordering.clone());

        let src_top = self.src.top_level();
        let shared: Vec<&String> = self
            .dst
            .top_level()
            .iter()
            .filter(|model| src_top.contains(*model))
            .collect();
        for model in shared {
            let src_records = self.src.get_all(model)?;
            let dst_records = self.dst.get_all(model)?;
            for element in self.diff_object_list(src_records, dst_records)? {
                diff.add(element)?;
            }
        }

        diff.set_models_processed(self.pairs);
        tracing::info!(summary = %diff.summary(), "diff calculation complete");
        Ok(diff)
    }

    fn diff_object_list(
        &mut self,
        src: Vec<Record>,
        dst: Vec<Record>,
    ) -> CoreResult<Vec<DiffElement>> {
        let mut order: Vec<String> = Vec::new();
        let mut combined: HashMap<String, (Option<Record>, Option<Record>)> = HashMap::new();

        for record in src {
            let uid = record.unique_id();
            let slot = combined.entry(uid.clone()).or_insert_with(|| {
                order.push(uid);
                (None, None)
            });
            slot.0 = Some(record);
        }
        for record in dst {
            let uid = record.unique_id();
            let slot = combined.entry(uid.clone()).or_insert_with(|| {
                order.push(uid);
                (None, None)
            });
            slot.1 = Some(record);
        }

        for uid in &order {
            if let Some((Some(src), Some(dst))) = combined.get(uid) {
                validate_pair(src, dst)?;
            }
        }

        let mut elements = Vec::new();
        for uid in order {
            let (src, dst) = combined.remove(&uid).unwrap_or_default();
            if let Some(element) = self.diff_object_pair(src.as_ref(), dst.as_ref())? {
                elements.push(element);
            }
        }
        Ok(elements)
    }

    fn diff_object_pair(
        &mut self,
        src: Option<&Record>,
        dst: Option<&Record>,
    ) -> CoreResult<Option<DiffElement>> {
        let Some(record) = src.or(dst) else {
            return Ok(None);
        };

        self.pairs += 1;
        self.processed += usize::from(src.is_some()) + usize::from(dst.is_some());
        self.options.report("diff", self.processed, self.total);

        let unique_id = record.unique_id();
        let span = tracing::debug_span!(
            parent: &self.span,
            "diff_pair",
            model = record.model_name(),
            unique_id = %unique_id
        );
        let _guard = span.enter();

        if let Some(reason) = skip_reason(self.options.flags, src, dst) {
            tracing::debug!("skipping {reason}");
            return Ok(None);
        }

        let mut element = DiffElement::new(
            record.model_name(),
            record.shortname(),
            unique_id,
            record.identifiers(),
            self.src.name(),
            self.dst.name(),
        );
        element.set_child_ordering(self.options.ordering.clone());
        if let Some(src) = src {
            element.set_source_attrs(src.attrs());
        }
        if let Some(dst) = dst {
            element.set_dest_attrs(dst.attrs());
        }

        self.diff_child_objects(&mut element, src, dst)?;
        Ok(Some(element))
    }

    fn diff_child_objects(
        &mut self,
        element: &mut DiffElement,
        src: Option<&Record>,
        dst: Option<&Record>,
    ) -> CoreResult<()> {
        let child_types: Vec<&'static str> = match (src, dst) {
            (Some(s), Some(d)) => s
                .schema()
                .children
                .iter()
                .map(|(child_type, _)| *child_type)
                .filter(|child_type| d.schema().child_field(child_type).is_some())
                .collect(),
            (Some(r), None) | (None, Some(r)) => r
                .schema()
                .children
                .iter()
                .map(|(child_type, _)| *child_type)
                .collect(),
            (None, None) => Vec::new(),
        };

        for child_type in child_types {
            let src_children = match src {
                Some(s) => self.src.get_by_uids(child_type, s.children(child_type))?,
                None => Vec::new(),
            };
            let dst_children = match dst {
                Some(d) => self.dst.get_by_uids(child_type, d.children(child_type))?,
                None => Vec::new(),
            };
            for child in self.diff_object_list(src_children, dst_children)? {
                element.add_child(child)?;
            }
        }
        Ok(())
    }
}

fn skip_reason(
    flags: SyncFlags,
    src: Option<&Record>,
    dst: Option<&Record>,
) -> Option<&'static str> {
    let src_flags = src.map(Record::flags).unwrap_or_default();
    let dst_flags = dst.map(Record::flags).unwrap_or_default();

    if dst.is_none() && flags.contains(SyncFlags::SKIP_UNMATCHED_SRC) {
        return Some("unmatched source record");
    }
    if src.is_none() && flags.contains(SyncFlags::SKIP_UNMATCHED_DST) {
        return Some("unmatched dest record");
    }
    if dst.is_none() && src_flags.contains(ModelFlags::SKIP_UNMATCHED_SRC) {
        return Some("unmatched source record due to its model flags");
    }
    if src.is_none() && dst_flags.contains(ModelFlags::SKIP_UNMATCHED_DST) {
        return Some("unmatched dest record due to its model flags");
    }
    if src_flags.contains(ModelFlags::IGNORE) {
        return Some("source record flagged IGNORE");
    }
    if dst_flags.contains(ModelFlags::IGNORE) {
        return Some("dest record flagged IGNORE");
    }
    None
}

fn validate_pair(src: &Record, dst: &Record) -> CoreResult<()> {
    if src.model_name() != dst.model_name() {
        return Err(CoreError::TypeMismatch {
            source_model: src.model_name().to_string(),
            dest_model: dst.model_name().to_string(),
        });
    }
    let (src_name, dst_name) = (src.shortname(), dst.shortname());
    if src_name != dst_name {
        return Err(CoreError::ShortnameMismatch {
            source_name: src_name,
            dest_name: dst_name,
        });
    }
    let (src_keys, dst_keys) = (src.identifiers(), dst.identifiers());
    if src_keys != dst_keys {
        return Err(CoreError::IdentifierMismatch {
            source_keys: Value::Map(src_keys).to_string(),
            dest_keys: Value::Map(dst_keys).to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::attrs;
    use crate::diff::DiffAction;
    use crate::registry::{ModelRegistry, ModelType};
    use crate::schema::ModelSchema;

    static REGION: ModelSchema = ModelSchema::new("region", &["slug"])
        .with_attributes(&["label"])
        .with_children(&[("city", "cities")]);
    static CITY: ModelSchema = ModelSchema::new("city", &["region", "slug"])
        .with_shortname(&["slug"])
        .with_attributes(&["population"]);

    fn adapter(name: &str) -> Adapter {
        let registry = ModelRegistry::new()
            .register(ModelType::new(&REGION))
            .unwrap()
            .register(ModelType::new(&CITY))
            .unwrap();
        Adapter::new("geo", name, ["region"], Arc::new(registry)).unwrap()
    }

    fn load(adapter: &mut Adapter, region: &str, cities: &[(&str, i64)]) {
        let mut parent = Record::new(
            &REGION,
            attrs! { "slug" => region },
            attrs! { "label" => region },
        )
        .unwrap();
        for (slug, population) in cities {
            let city = Record::new(
                &CITY,
                attrs! { "region" => region, "slug" => *slug },
                attrs! { "population" => *population },
            )
            .unwrap();
            parent.add_child(&city).unwrap();
            adapter.add(city).unwrap();
        }
        adapter.add(parent).unwrap();
    }

    #[test]
    fn pairs_records_by_unique_id() {
        let mut src = adapter("src");
        let mut dst = adapter("dst");
        load(&mut src, "north", &[("a", 10), ("b", 20)]);
        load(&mut dst, "north", &[("b", 25), ("c", 30)]);

        let diff = Differ::new(&src, &dst, &SyncOptions::new()).calculate().unwrap();
        let north = diff.get("region", "north").unwrap();
        assert_eq!(north.action(), None);

        let cities = north.child_diff();
        assert_eq!(cities.get("city", "a").unwrap().action(), Some(DiffAction::Create));
        assert_eq!(cities.get("city", "b").unwrap().action(), Some(DiffAction::Update));
        assert_eq!(cities.get("city", "c").unwrap().action(), Some(DiffAction::Delete));
        let names: Vec<&str> = cities.children().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(diff.models_processed(), 4);
    }

    #[test]
    fn element_carries_both_sides() {
        let mut src = adapter("src");
        let mut dst = adapter("dst");
        load(&mut src, "north", &[("b", 20)]);
        load(&mut dst, "north", &[("b", 25)]);

        let diff = Differ::new(&src, &dst, &SyncOptions::new()).calculate().unwrap();
        let city = diff.get("region", "north").unwrap().child_diff().get("city", "b").unwrap();
        assert_eq!(city.unique_id(), "north__b");
        assert_eq!(city.keys(), &attrs! { "region" => "north", "slug" => "b" });
        assert_eq!(city.source_name(), "src");
        assert_eq!(city.dest_name(), "dst");
        assert_eq!(city.attrs_diffs().plus, attrs! { "population" => 20 });
    }

    #[test]
    fn skip_reason_honors_call_and_record_flags() {
        let plain = Record::new(&REGION, attrs! { "slug" => "n" }, attrs! {}).unwrap();
        let ignored = plain.clone().with_flags(ModelFlags::IGNORE);
        let keep_dst = plain.clone().with_flags(ModelFlags::SKIP_UNMATCHED_DST);

        assert!(skip_reason(SyncFlags::NONE, Some(&plain), None).is_none());
        assert!(skip_reason(SyncFlags::SKIP_UNMATCHED_SRC, Some(&plain), None).is_some());
        assert!(skip_reason(SyncFlags::SKIP_UNMATCHED_SRC, None, Some(&plain)).is_none());
        assert!(skip_reason(SyncFlags::SKIP_UNMATCHED_DST, None, Some(&plain)).is_some());
        assert!(skip_reason(SyncFlags::NONE, None, Some(&keep_dst)).is_some());
        assert!(skip_reason(SyncFlags::NONE, Some(&plain), Some(&keep_dst)).is_none());
        assert!(skip_reason(SyncFlags::NONE, Some(&ignored), Some(&plain)).is_some());
        assert!(skip_reason(SyncFlags::NONE, Some(&plain), Some(&ignored)).is_some());
    }

    #[test]
    fn validate_pair_rejects_type_mismatch() {
        let region = Record::new(&REGION, attrs! { "slug" => "n" }, attrs! {}).unwrap();
        let city =
            Record::new(&CITY, attrs! { "region" => "n", "slug" => "n" }, attrs! {}).unwrap();
        let err = validate_pair(&region, &city).unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
        assert!(validate_pair(&region, &region.clone()).is_ok());
    }

    #[test]
    fn progress_counts_each_present_side() {
        let mut src = adapter("src");
        let mut dst = adapter("dst");
        load(&mut src, "north", &[("a", 1)]);
        load(&mut dst, "south", &[]);

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = SyncOptions::new().with_progress(move |_, processed, total| {
            sink.lock().push((processed, total));
        });
        Differ::new(&src, &dst, &options).calculate().unwrap();

        assert_eq!(*seen.lock(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
