use kernelselect_core::{RegistryStatus, SpecRegistry, RESOURCE_KERNEL_CSS};
use serde_json::json;

fn registry_from(value: serde_json::Value) -> SpecRegistry {
    let mut registry = SpecRegistry::new();
    registry
        .replace_from_json(&value.to_string())
        .expect("valid catalog");
    registry
}

#[test]
fn menu_orders_mixed_case_display_names_by_code_point() {
    let registry = registry_from(json!({
        "kernelspecs": {
            "zeta": {"spec": {"display_name": "Zeta"}},
            "alpha": {"spec": {"display_name": "alpha"}},
            "beta": {"spec": {"display_name": "Beta"}},
        }
    }));

    let order = registry
        .menu_entries()
        .iter()
        .map(|entry| entry.display_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["Beta", "Zeta", "alpha"]);
}

#[test]
fn menu_is_deterministic_across_refreshes() {
    let payload = json!({
        "kernelspecs": {
            "py-b": {"spec": {"display_name": "Python"}},
            "julia": {"spec": {"display_name": "Julia"}},
            "py-a": {"spec": {"display_name": "Python"}},
        }
    });
    let mut registry = registry_from(payload.clone());
    let first = registry.menu_entries().to_vec();
    registry
        .replace_from_json(&payload.to_string())
        .expect("same catalog again");

    assert_eq!(registry.menu_entries(), first.as_slice());
    let names = first
        .iter()
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["julia", "py-b", "py-a"]);
}

#[test]
fn registry_lookup_exposes_resources_and_status() {
    let registry = registry_from(json!({
        "default": "ir",
        "kernelspecs": {
            "ir": {
                "name": "ir",
                "spec": {"display_name": "R", "language": "R"},
                "resources": {"kernel.css": "/kernelspecs/ir/kernel.css"}
            }
        }
    }));

    let spec = registry.get("ir").expect("ir registered");
    assert_eq!(
        spec.resources.get(RESOURCE_KERNEL_CSS).map(String::as_str),
        Some("/kernelspecs/ir/kernel.css")
    );
    assert_eq!(registry.default_name(), Some("ir"));
    assert_eq!(registry.status(), &RegistryStatus::Loaded { count: 1 });
    assert!(registry.get("python3").is_none());
}
