use std::{io::Write, time::Instant};

use assert_approx_eq::assert_approx_eq;
use velmux::BaseVelocity;
use velmux_apps::{Error, MuxConfig};

#[test]
fn verify_sample_configs() {
    let files = vec![
        "config/sample_mux_config.toml",
        "config/minimal_mux_config.toml",
    ];
    for f in files {
        let result = MuxConfig::new(f);
        assert!(result.is_ok(), "{:?} {:?}", f, result);
        let ser_result = toml::to_string(&result.unwrap());
        assert!(ser_result.is_ok(), "{:?} {:?}", f, ser_result);
    }
}

#[test]
fn sample_config_arbitration() {
    let config = MuxConfig::new("config/sample_mux_config.toml").unwrap();
    assert_eq!(config.sources.len(), 3);
    assert!(config.has_lock("autonomy"));
    assert!(!config.has_lock("joystick"));
    assert_approx_eq!(config.period().unwrap().as_secs_f64(), 0.05);

    let mut arbitrator = config.create_arbitrator().unwrap();
    let ids: Vec<_> = arbitrator.sources().iter().map(|s| s.id()).collect();
    assert_eq!(ids, ["joystick", "interactive_marker", "autonomy"]);

    let t0 = Instant::now();
    arbitrator
        .on_command("autonomy", BaseVelocity::new(0.3, 0.0, 0.1), t0)
        .unwrap();
    // beyond command_bounds
    assert!(arbitrator
        .on_command("joystick", BaseVelocity::new(3.0, 0.0, 0.0), t0)
        .is_err());
    assert_eq!(arbitrator.selected(), Some("autonomy"));
}

#[test]
fn minimal_config_defaults() {
    let config = MuxConfig::new("config/minimal_mux_config.toml").unwrap();
    assert_eq!(config.output_topic, "cmd_vel");
    assert_approx_eq!(config.publish_rate, 20.0);
    assert!(config.locks.is_empty());
    assert!(config.command_bounds.is_none());
    assert!(config.velocity_limits.is_none());
}

#[test]
fn invalid_configs() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[sources]]
id = "joystick"
priority = 10
timeout = 0.5

[[sources]]
id = "joystick"
priority = 5
timeout = 1.0
"#
    )
    .unwrap();
    let err = MuxConfig::new(file.path()).unwrap_err();
    assert!(
        matches!(&err, Error::Velmux(e) if e.is_config_error()),
        "{err:?}"
    );

    let err = MuxConfig::from_str(
        "[[sources]]\nid = \"a\"\npriority = 1\ntimeout = -0.5\n",
        "negative.toml",
    )
    .unwrap_err();
    assert!(matches!(&err, Error::Velmux(e) if e.is_config_error()), "{err:?}");

    assert!(matches!(
        MuxConfig::new("config/does_not_exist.toml"),
        Err(Error::NoFile(..))
    ));
    assert!(matches!(
        MuxConfig::from_str("[[sources]]\nid = 1", "broken.toml"),
        Err(Error::TomlParseFailure(..))
    ));
}

#[test]
fn ser_default_config() {
    toml::to_string(&MuxConfig::default()).unwrap();
}
