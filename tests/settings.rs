#![cfg(feature = "config")]

use ioc_weave::{ConfigurationError, Container, ContainerSettings, DiError, Lifestyle};

#[test]
fn json_settings_configure_the_container() {
    let settings = ContainerSettings::from_json_str(
        r#"{
            "default_lifestyle": "Singleton",
            "default_scoped_lifestyle": "flowing",
            "resolve_unregistered_concrete_types": false,
            "allow_overriding_registrations": true
        }"#,
    )
    .unwrap();

    let container = Container::new();
    container.apply_settings(&settings).unwrap();

    let options = container.options();
    assert_eq!(*options.default_lifestyle(), Lifestyle::singleton());
    assert_eq!(options.default_scoped_lifestyle(), Some(&Lifestyle::flowing()));
    assert!(!options.resolve_unregistered_concrete_types());
    assert!(options.allow_overriding_registrations());
    assert!(!options.enable_auto_verification());
}

#[test]
fn unknown_lifestyle_names_are_rejected() {
    let settings = ContainerSettings {
        default_lifestyle: Some("hourly".into()),
        ..ContainerSettings::default()
    };
    let err = Container::new().apply_settings(&settings).unwrap_err();
    assert!(matches!(
        err,
        DiError::Configuration(ConfigurationError::UnknownLifestyle(name)) if name == "hourly"
    ));
}

#[test]
fn settings_survive_serialization() {
    let settings = ContainerSettings {
        enable_auto_verification: Some(true),
        ..ContainerSettings::default()
    };
    let json = settings.to_json_string().unwrap();
    assert_eq!(ContainerSettings::from_json_str(&json).unwrap(), settings);
}
