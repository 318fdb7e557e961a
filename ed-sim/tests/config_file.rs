use std::fs;

use edsim::{run_simulation, ConfigError, EdConfig};

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("edsim_config_{}_{}", std::process::id(), name))
}

#[test]
fn config_file_overrides_selected_fields() {
    let path = temp_path("small.json");
    fs::write(
        &path,
        r#"{
            "patients": 40,
            "seed": 5,
            "capacities": { "ward_a": 3, "plaster": 2 },
            "service_times": { "x_ray": { "min": 1.0, "mode": 2.0, "max": 3.0 } }
        }"#,
    )
    .unwrap();

    let config = EdConfig::load(&path).unwrap();
    assert_eq!(config.patients, 40);
    assert_eq!(config.seed, Some(5));
    assert_eq!(config.capacities.ward_a, 3);
    assert_eq!(config.capacities.ward_b, 2);
    assert_eq!(config.service_times.x_ray.mode, 2.0);
    assert_eq!(config.service_times.plaster.max, 4.7);

    let result = run_simulation(&config).unwrap();
    assert_eq!(result.patients, 40);
    assert!(result.resources["ward_a"].peak_held <= 3);

    fs::remove_file(&path).ok();
}

#[test]
fn invalid_values_in_file_are_reported() {
    let path = temp_path("bad.json");
    fs::write(&path, r#"{ "type_weights": [0, 0, 0, 0] }"#).unwrap();
    let err = EdConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "type_weights"));

    fs::write(&path, r#"{ "patients": "many" }"#).unwrap();
    assert!(matches!(EdConfig::load(&path), Err(ConfigError::Parse(_))));

    fs::remove_file(&path).ok();
}

#[test]
fn config_round_trips_through_json() {
    let config = EdConfig {
        seed: Some(3),
        ..EdConfig::default()
    };
    let text = serde_json::to_string(&config).unwrap();
    let back: EdConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}
