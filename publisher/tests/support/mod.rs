//! Shared fixtures for publisher behavioural tests.

use boxpub_publisher::settings::PublishSettings;
use camino::Utf8PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Container every scenario publishes into.
pub const CONTAINER: &str = "boxes";

/// Manifest object path used by every scenario.
pub const MANIFEST: &str = "base/manifest.json";

/// Contents of the box file written by [`BoxFixture::create`].
pub const BOX_CONTENT: &[u8] = b"vagrant box payload used by the behaviour tests";

/// A temporary directory holding one box file.
pub struct BoxFixture {
    _temp: TempDir,
    pub path: Utf8PathBuf,
}

impl BoxFixture {
    /// Write `acme-base.box` into a fresh temporary directory.
    pub fn create() -> Self {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let path = dir.join("acme-base.box");
        std::fs::write(&path, BOX_CONTENT).expect("write box file");
        Self { _temp: temp, path }
    }
}

/// Valid settings targeting [`CONTAINER`] and [`MANIFEST`].
pub fn publish_settings(version: Option<String>) -> PublishSettings {
    PublishSettings {
        storage_account_name: "acmeboxes".to_owned(),
        container_name: CONTAINER.to_owned(),
        access_key: "c2VjcmV0".to_owned(),
        manifest_path: MANIFEST.to_owned(),
        box_name: "acme/base".to_owned(),
        box_dir: "base".to_owned(),
        version,
        block_size: Some(8),
        endpoint: None,
        request_timeout: Duration::from_secs(5),
        publish_timeout: None,
    }
}

/// A manifest holding one provider entry under one version.
pub fn manifest_json(provider: &str, version: &str) -> String {
    format!(
        concat!(
            r#"{{"name":"acme/base","versions":[{{"version":"{version}","providers":["#,
            r#"{{"name":"{provider}","url":"https://old.test/{version}.box","#,
            r#""checksum_type":"sha256","checksum":"{checksum}"}}]}}]}}"#,
        ),
        version = version,
        provider = provider,
        checksum = "0".repeat(64),
    )
}
