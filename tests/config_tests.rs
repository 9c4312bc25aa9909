mod common;

use restpipe::runtime_config::ServiceConfig;
use restpipe::server::Service;
use restpipe::telemetry::{LogConfig, LogFormat};
use std::io::Write;

#[test]
fn test_service_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    write!(
        file,
        "runtime:\n  stack_size: 131072\ndocs:\n  title: Pet Store\n  version: 3.0.0\n"
    )
    .unwrap();

    let config = ServiceConfig::load(file.path()).unwrap();
    let runtime = config.runtime_config();
    assert_eq!(runtime.stack_size, 0x20000);

    common::setup_may_runtime();
    let svc = Service::with_docs(&common::pet_store(), &runtime, &config.docs).unwrap();
    assert_eq!(svc.openapi()["info"]["title"], "Pet Store");
    assert_eq!(svc.openapi()["info"]["version"], "3.0.0");
}

#[test]
fn test_defaults_without_sections() {
    let config = ServiceConfig::from_yaml("{}").unwrap();
    assert_eq!(config.docs.title, "API");
    assert_eq!(config.runtime.stack_size, None);
    assert!(config.runtime_config().stack_size > 0);
}

#[test]
fn test_invalid_yaml_is_reported_with_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "runtime: [unclosed").unwrap();
    let err = ServiceConfig::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Invalid config file"));
}

#[test]
fn test_logging_section_overrides() {
    let config = ServiceConfig::from_yaml("logging:\n  format: pretty\n").unwrap();
    let log = config.log_config();
    assert_eq!(log.format, LogFormat::Pretty);
    assert_eq!(LogConfig::default().format, LogFormat::Json);
}
