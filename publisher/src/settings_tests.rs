//! Tests for settings loading and validation.

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn complete() -> RawSettings {
    RawSettings {
        storage_account_name: Some("acmeboxes".to_owned()),
        container_name: Some("vagrant".to_owned()),
        access_key: Some("c2VjcmV0".to_owned()),
        manifest: Some("base/manifest.json".to_owned()),
        box_name: Some("acme/base".to_owned()),
        box_dir: Some("base".to_owned()),
        ..RawSettings::default()
    }
}

fn problems(raw: RawSettings) -> Vec<SettingsProblem> {
    match raw.validate() {
        Err(SettingsError::Invalid { problems }) => problems,
        other => panic!("expected invalid settings, got {other:?}"),
    }
}

#[rstest]
fn complete_settings_validate_with_defaults(complete: RawSettings) {
    let settings = complete.validate().expect("valid");
    assert_eq!(settings.manifest_path, "base/manifest.json");
    assert_eq!(settings.version, None);
    assert_eq!(settings.block_size, None);
    assert_eq!(settings.endpoint, None);
    assert_eq!(
        settings.request_timeout,
        Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
    );
    assert_eq!(settings.publish_timeout, None);
}

#[test]
fn every_missing_setting_is_reported_at_once() {
    let found = problems(RawSettings::default());
    let keys: Vec<&str> = found
        .iter()
        .filter_map(|p| match p {
            SettingsProblem::Missing { key } => Some(*key),
            _ => None,
        })
        .collect();
    assert_eq!(
        keys,
        [
            "storage_account_name",
            "container_name",
            "access_key",
            "manifest",
            "box_name",
            "box_dir",
        ]
    );
}

#[rstest]
fn blank_values_count_as_missing(complete: RawSettings) {
    let raw = RawSettings {
        box_dir: Some("   ".to_owned()),
        ..complete
    };
    assert_eq!(problems(raw), [SettingsProblem::Missing { key: "box_dir" }]);
}

#[rstest]
#[case::unresolved("{{ user `dir` }}", "unresolved")]
#[case::unbalanced_open("boxes/{{ .Version", "unbalanced")]
#[case::unbalanced_close("boxes/}}", "unbalanced")]
fn placeholders_are_rejected(complete: RawSettings, #[case] value: &str, #[case] word: &str) {
    let raw = RawSettings {
        box_dir: Some(value.to_owned()),
        ..complete
    };
    let found = problems(raw);
    assert_eq!(found.len(), 1);
    let message = found.first().map(ToString::to_string).unwrap_or_default();
    assert!(message.contains("box_dir"), "{message}");
    assert!(message.contains(word), "{message}");
}

#[rstest]
fn template_in_version_is_rejected(complete: RawSettings) {
    let raw = RawSettings {
        version: Some("{{ timestamp }}".to_owned()),
        ..complete
    };
    assert!(matches!(
        problems(raw).as_slice(),
        [SettingsProblem::Template { key: "version", .. }]
    ));
}

#[rstest]
fn blank_version_means_derive(complete: RawSettings) {
    let raw = RawSettings {
        version: Some(" ".to_owned()),
        ..complete
    };
    assert_eq!(raw.validate().expect("valid").version, None);
}

#[rstest]
fn non_base64_access_key_is_rejected(complete: RawSettings) {
    let raw = RawSettings {
        access_key: Some("not base64!".to_owned()),
        ..complete
    };
    assert!(matches!(
        problems(raw).as_slice(),
        [SettingsProblem::AccessKey { .. }]
    ));
}

#[rstest]
fn zero_timeouts_are_rejected(complete: RawSettings) {
    let raw = RawSettings {
        request_timeout_secs: Some(0),
        publish_timeout_secs: Some(0),
        ..complete
    };
    assert_eq!(
        problems(raw),
        [
            SettingsProblem::ZeroTimeout {
                key: "request_timeout_secs"
            },
            SettingsProblem::ZeroTimeout {
                key: "publish_timeout_secs"
            },
        ]
    );
}

#[rstest]
#[case::not_a_url("blob storage")]
#[case::wrong_scheme("ftp://example.test")]
fn bad_endpoint_is_rejected(complete: RawSettings, #[case] endpoint: &str) {
    let raw = RawSettings {
        endpoint: Some(endpoint.to_owned()),
        ..complete
    };
    assert!(matches!(
        problems(raw).as_slice(),
        [SettingsProblem::Endpoint { .. }]
    ));
}

#[rstest]
fn endpoint_override_is_parsed(complete: RawSettings) {
    let raw = RawSettings {
        endpoint: Some("http://127.0.0.1:10000/devstoreaccount1".to_owned()),
        ..complete
    };
    let settings = raw.validate().expect("valid");
    assert_eq!(
        settings.endpoint.as_ref().map(Url::as_str),
        Some("http://127.0.0.1:10000/devstoreaccount1")
    );
}

#[test]
fn invalid_report_lists_each_problem_on_its_own_line() {
    let err = RawSettings::default().validate().expect_err("invalid");
    let text = err.to_string();
    assert!(text.starts_with("invalid settings:"));
    assert_eq!(text.lines().count(), 7);
    assert!(text.contains("  * box_name must be set"));
}

#[rstest]
fn overlay_prefers_command_line_values(complete: RawSettings) {
    let over = RawSettings {
        container_name: Some("override".to_owned()),
        version: Some("2.0.0".to_owned()),
        ..RawSettings::default()
    };
    let merged = complete.overlay(over);
    assert_eq!(merged.container_name.as_deref(), Some("override"));
    assert_eq!(merged.version.as_deref(), Some("2.0.0"));
    assert_eq!(merged.box_dir.as_deref(), Some("base"));
}

#[test]
fn parse_rejects_unknown_keys() {
    assert!(RawSettings::parse("bucket = \"x\"").is_err());
}

#[test]
fn load_reads_file_and_resolve_applies_overlay() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(dir.path().join("boxpub.toml")).expect("UTF-8 path");
    fs::write(
        &path,
        concat!(
            "storage_account_name = \"acmeboxes\"\n",
            "container_name = \"vagrant\"\n",
            "access_key = \"c2VjcmV0\"\n",
            "manifest = \"base/manifest.json\"\n",
            "box_name = \"acme/base\"\n",
            "box_dir = \"base\"\n",
            "block_size = 1024\n",
            "publish_timeout_secs = 600\n",
        ),
    )
    .expect("write settings");

    let over = RawSettings {
        version: Some("1.0.0".to_owned()),
        ..RawSettings::default()
    };
    let settings = resolve_settings(Some(&path), over).expect("valid");

    assert_eq!(settings.block_size, Some(1024));
    assert_eq!(settings.version.as_deref(), Some("1.0.0"));
    assert_eq!(settings.publish_timeout, Some(Duration::from_secs(600)));
}

#[test]
fn missing_file_is_a_read_error() {
    let err = RawSettings::load(Utf8Path::new("/nonexistent/boxpub.toml")).expect_err("missing");
    assert!(matches!(err, SettingsError::Read { .. }));
}

#[rstest]
fn debug_output_redacts_access_key(complete: RawSettings) {
    let raw_debug = format!("{complete:?}");
    let settings = complete.validate().expect("valid");
    let debug = format!("{settings:?}");
    assert!(!raw_debug.contains("c2VjcmV0"));
    assert!(!debug.contains("c2VjcmV0"));
    assert!(debug.contains("<redacted>"));
}
