//! Test fixtures: a network inventory domain and instrumented hooks.
//!
//! The domain has three record types:
//!
//! ```text
//! site (name)
//! └── device (name; role)
//!     └── interface (device_name, name; interface_type, description)
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use treesync_core::{
    attrs, Adapter, CoreResult, CrudError, CrudResult, DiffAction, Loader, ModelFlags,
    ModelRegistry, ModelSchema, ModelType, Record,
};

/// Site: top-level record owning devices.
pub static SITE: ModelSchema =
    ModelSchema::new("site", &["name"]).with_children(&[("device", "devices")]);

/// Device: owned by a site, owns interfaces.
pub static DEVICE: ModelSchema = ModelSchema::new("device", &["name"])
    .with_attributes(&["role"])
    .with_children(&[("interface", "interfaces")]);

/// Interface: identified by device and port name, shortnamed by port name.
pub static INTERFACE: ModelSchema = ModelSchema::new("interface", &["device_name", "name"])
    .with_shortname(&["name"])
    .with_attributes(&["interface_type", "description"]);

/// Every schema of the inventory domain.
pub static NETWORK_SCHEMAS: [&ModelSchema; 3] = [&SITE, &DEVICE, &INTERFACE];

/// One interface to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    /// Port name.
    pub name: String,
    /// Free-text description.
    pub description: String,
}

/// One device to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Globally unique device name.
    pub name: String,
    /// Device role.
    pub role: String,
    /// Interfaces on the device.
    pub interfaces: Vec<InterfaceSpec>,
}

/// One site to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSpec {
    /// Site name.
    pub name: String,
    /// Devices at the site.
    pub devices: Vec<DeviceSpec>,
}

/// Shorthand for an [`InterfaceSpec`].
pub fn iface(name: &str, description: &str) -> InterfaceSpec {
    InterfaceSpec {
        name: name.to_string(),
        description: description.to_string(),
    }
}

/// Shorthand for a [`DeviceSpec`].
pub fn device(name: &str, role: &str, interfaces: Vec<InterfaceSpec>) -> DeviceSpec {
    DeviceSpec {
        name: name.to_string(),
        role: role.to_string(),
        interfaces,
    }
}

/// Shorthand for a [`SiteSpec`].
pub fn site(name: &str, devices: Vec<DeviceSpec>) -> SiteSpec {
    SiteSpec {
        name: name.to_string(),
        devices,
    }
}

/// A whole inventory, loadable into an adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory(pub Vec<SiteSpec>);

impl Inventory {
    /// Returns the number of records this inventory loads.
    pub fn record_count(&self) -> usize {
        self.0
            .iter()
            .map(|s| {
                1 + s
                    .devices
                    .iter()
                    .map(|d| 1 + d.interfaces.len())
                    .sum::<usize>()
            })
            .sum()
    }
}

impl Loader for Inventory {
    fn load(&mut self, adapter: &mut Adapter) -> CoreResult<()> {
        for site_spec in &self.0 {
            let mut site =
                Record::new(&SITE, attrs! { "name" => site_spec.name.as_str() }, attrs! {})?;
            for device_spec in &site_spec.devices {
                let mut device = Record::new(
                    &DEVICE,
                    attrs! { "name" => device_spec.name.as_str() },
                    attrs! { "role" => device_spec.role.as_str() },
                )?;
                for iface_spec in &device_spec.interfaces {
                    let iface = Record::new(
                        &INTERFACE,
                        attrs! {
                            "device_name" => device_spec.name.as_str(),
                            "name" => iface_spec.name.as_str(),
                        },
                        attrs! {
                            "interface_type" => "ethernet",
                            "description" => iface_spec.description.as_str(),
                        },
                    )?;
                    device.add_child(&iface)?;
                    adapter.add(iface)?;
                }
                site.add_child(&device)?;
                adapter.add(device)?;
            }
            adapter.add(site)?;
        }
        Ok(())
    }
}

/// The source side of the reference scenario: sites `nyc` and `sfo`.
pub fn source_inventory() -> Inventory {
    Inventory(vec![
        site(
            "nyc",
            vec![
                device(
                    "nyc-spine1",
                    "spine",
                    vec![iface("eth0", "uplink"), iface("eth1", "server")],
                ),
                device("nyc-leaf1", "leaf", vec![iface("eth0", "uplink")]),
            ],
        ),
        site(
            "sfo",
            vec![
                device("sfo-spine1", "spine", vec![iface("eth0", "uplink")]),
                device("sfo-leaf1", "leaf", vec![iface("eth0", "uplink")]),
            ],
        ),
    ])
}

/// The destination side of the reference scenario: sites `nyc` and `atl`.
///
/// `nyc-spine1` `eth1` has a different description than in the source.
pub fn dest_inventory() -> Inventory {
    Inventory(vec![
        site(
            "nyc",
            vec![
                device(
                    "nyc-spine1",
                    "spine",
                    vec![iface("eth0", "uplink"), iface("eth1", "storage")],
                ),
                device("nyc-leaf1", "leaf", vec![iface("eth0", "uplink")]),
            ],
        ),
        site(
            "atl",
            vec![
                device("atl-spine1", "spine", vec![iface("eth0", "uplink")]),
                device("atl-leaf1", "leaf", vec![iface("eth0", "uplink")]),
            ],
        ),
    ])
}

/// Registry of the inventory domain with bookkeeping-only hooks.
pub fn network_registry() -> Arc<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    for schema in NETWORK_SCHEMAS {
        registry = registry
            .register(ModelType::new(schema))
            .expect("inventory schemas are valid");
    }
    Arc::new(registry)
}

/// Creates an empty inventory adapter.
pub fn network_adapter(name: &str, registry: Arc<ModelRegistry>) -> Adapter {
    Adapter::new("network", name, ["site"], registry).expect("inventory registry is complete")
}

/// Creates an inventory adapter and loads `inventory` into it.
pub fn loaded_adapter(name: &str, registry: Arc<ModelRegistry>, inventory: &Inventory) -> Adapter {
    let mut adapter = network_adapter(name, registry);
    adapter
        .load_with(inventory.clone())
        .expect("Failed to load inventory");
    adapter
}

/// Adds `flags` to a stored record.
pub fn flag_record(adapter: &mut Adapter, model: &str, uid: &str, flags: ModelFlags) {
    let record = adapter
        .get(model, uid)
        .expect("Record to flag must exist")
        .with_flags(flags);
    adapter.update(record).expect("Failed to update flagged record");
}

/// Shared log of hook invocations, as `"{action} {model} {uid}"` lines.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, action: DiffAction, model: &str, uid: &str) {
        self.0.lock().push(format!("{action} {model} {uid}"));
    }

    /// Returns a copy of every entry.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Returns the position of an entry, if logged.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }

    /// Returns `true` if the entry was logged.
    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }
}

/// Which hook invocations should fail or decline.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    failing: Arc<Mutex<HashSet<(DiffAction, String, String)>>>,
    declining: Arc<Mutex<HashSet<(DiffAction, String, String)>>>,
}

impl FaultPlan {
    /// Creates a plan where every hook succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the hook raise a CRUD error.
    pub fn fail(self, action: DiffAction, model: &str, uid: &str) -> Self {
        self.failing
            .lock()
            .insert((action, model.to_string(), uid.to_string()));
        self
    }

    /// Makes the hook return no record.
    pub fn decline(self, action: DiffAction, model: &str, uid: &str) -> Self {
        self.declining
            .lock()
            .insert((action, model.to_string(), uid.to_string()));
        self
    }

    fn check(&self, action: DiffAction, model: &str, uid: &str) -> CrudResult<bool> {
        let key = (action, model.to_string(), uid.to_string());
        if self.failing.lock().contains(&key) {
            let message = format!("simulated backend failure for {model} {uid}");
            return Err(match action {
                DiffAction::Create => CrudError::NotCreated(message),
                DiffAction::Update => CrudError::NotUpdated(message),
                DiffAction::Delete => CrudError::NotDeleted(message),
            });
        }
        Ok(self.declining.lock().contains(&key))
    }
}

fn instrumented(schema: &'static ModelSchema, log: &CallLog, plan: &FaultPlan) -> ModelType {
    let (create_log, create_plan) = (log.clone(), plan.clone());
    let (update_log, update_plan) = (log.clone(), plan.clone());
    let (delete_log, delete_plan) = (log.clone(), plan.clone());

    ModelType::new(schema)
        .on_create(move |ctx, ids, attrs| {
            let uid = ctx
                .schema()
                .unique_id(ids)
                .map_err(|e| CrudError::NotCreated(e.to_string()))?;
            create_log.push(DiffAction::Create, ctx.schema().name, &uid);
            if create_plan.check(DiffAction::Create, ctx.schema().name, &uid)? {
                return Ok(None);
            }
            ctx.default_create(ids, attrs)
        })
        .on_update(move |ctx, record, attrs| {
            let uid = record.unique_id();
            update_log.push(DiffAction::Update, ctx.schema().name, &uid);
            if update_plan.check(DiffAction::Update, ctx.schema().name, &uid)? {
                return Ok(None);
            }
            ctx.default_update(record, attrs)
        })
        .on_delete(move |ctx, record| {
            let uid = record.unique_id();
            delete_log.push(DiffAction::Delete, ctx.schema().name, &uid);
            if delete_plan.check(DiffAction::Delete, ctx.schema().name, &uid)? {
                return Ok(None);
            }
            ctx.default_delete(record)
        })
}

/// Registry of the inventory domain whose hooks log to `log` and obey `plan`.
pub fn recording_registry(log: &CallLog, plan: &FaultPlan) -> Arc<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    for schema in NETWORK_SCHEMAS {
        registry = registry
            .register(instrumented(schema, log, plan))
            .expect("inventory schemas are valid");
    }
    Arc::new(registry)
}
