use acnet::config::ProcessorConfig;
use acnet::types::AcError;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{
            "salinity": 30.0,
            "temperature": 12.5,
            "tosa_ratio_thresholds": [0.9, 1.1],
            "atmospheric_auxdata_path": "/data/auxdata",
            "download_ancillary": false
        }}"#
    )
    .unwrap();

    let config = ProcessorConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.salinity, 30.0);
    assert_eq!(config.temperature, 12.5);
    assert_eq!(config.tosa_ratio_thresholds, [0.9, 1.1]);
    assert_eq!(config.atmospheric_auxdata_path.as_deref(), Some(std::path::Path::new("/data/auxdata")));
    assert!(!config.download_ancillary);
    assert_eq!(config.surface_pressure, 1000.0);
}

#[test]
fn test_config_file_missing() {
    let result = ProcessorConfig::from_json_file("/nonexistent/acnet.json");
    assert!(matches!(result, Err(AcError::Io(_))));
}

#[test]
fn test_config_serialization_round_trip() {
    let config = ProcessorConfig {
        output_as_rrs: true,
        ..ProcessorConfig::default()
    };
    let text = serde_json::to_string(&config).unwrap();
    assert_eq!(ProcessorConfig::from_json_str(&text).unwrap(), config);
}

#[test]
fn test_salinity_bounds_are_open() {
    assert!(ProcessorConfig::from_json_str(r#"{"salinity": 43.0}"#).is_err());
    assert!(ProcessorConfig::from_json_str(r#"{"salinity": 42.9}"#).is_ok());
    assert!(ProcessorConfig::from_json_str(r#"{"temperature": 0.0}"#).is_err());
}
