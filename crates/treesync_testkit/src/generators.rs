//! Property-based test generators using proptest.
//!
//! Names are drawn from small pools so that two independently generated
//! inventories overlap and produce every kind of diff element.

use proptest::prelude::*;

use crate::fixtures::{DeviceSpec, InterfaceSpec, Inventory, SiteSpec};

const DESCRIPTIONS: [&str; 4] = ["uplink", "server", "storage", ""];
const ROLES: [&str; 3] = ["spine", "leaf", "border"];

/// Strategy for interface descriptions.
pub fn description_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(DESCRIPTIONS.to_vec()).prop_map(String::from)
}

/// Strategy for device roles.
pub fn role_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(ROLES.to_vec()).prop_map(String::from)
}

/// Strategy for the interfaces of one device, with distinct port names.
pub fn interfaces_strategy() -> impl Strategy<Value = Vec<InterfaceSpec>> {
    prop::collection::btree_map(0u8..4, description_strategy(), 0..4).prop_map(|ports| {
        ports
            .into_iter()
            .map(|(port, description)| InterfaceSpec {
                name: format!("eth{port}"),
                description,
            })
            .collect()
    })
}

/// Strategy for whole inventories.
///
/// Device names carry their site name, so a device never moves between
/// sites across two generated inventories.
pub fn inventory_strategy() -> impl Strategy<Value = Inventory> {
    let device = (role_strategy(), interfaces_strategy());
    let devices = prop::collection::btree_map(0u8..3, device, 0..3);
    prop::collection::btree_map(0u8..4, devices, 0..4).prop_map(|sites| {
        Inventory(
            sites
                .into_iter()
                .map(|(site, devices)| {
                    let name = format!("site{site}");
                    let devices = devices
                        .into_iter()
                        .map(|(index, (role, interfaces))| DeviceSpec {
                            name: format!("{name}-dev{index}"),
                            role,
                            interfaces,
                        })
                        .collect();
                    SiteSpec { name, devices }
                })
                .collect(),
        )
    })
}

/// Strategy for a (source, destination) pair of inventories.
pub fn inventory_pair_strategy() -> impl Strategy<Value = (Inventory, Inventory)> {
    (inventory_strategy(), inventory_strategy())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn device_names_are_unique(inventory in inventory_strategy()) {
            let names: Vec<&str> = inventory
                .0
                .iter()
                .flat_map(|s| s.devices.iter().map(|d| d.name.as_str()))
                .collect();
            let distinct: HashSet<&str> = names.iter().copied().collect();
            prop_assert_eq!(names.len(), distinct.len());
        }

        #[test]
        fn device_names_carry_their_site(inventory in inventory_strategy()) {
            for site in &inventory.0 {
                let prefix = format!("{}-", site.name);
                for device in &site.devices {
                    prop_assert!(device.name.starts_with(&prefix));
                }
            }
        }

        #[test]
        fn port_names_are_unique_per_device(interfaces in interfaces_strategy()) {
            let distinct: HashSet<&str> = interfaces.iter().map(|i| i.name.as_str()).collect();
            prop_assert_eq!(distinct.len(), interfaces.len());
        }
    }
}
