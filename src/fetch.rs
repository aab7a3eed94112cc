//! Release resolution and artifact download.
//!
//! The release index resolves "latest" to a concrete tag; artifact URLs are
//! a deterministic function of (os, arch, version). Downloads stream into a
//! caller-provided directory - the orchestrator owns the scoped temp storage
//! and its cleanup.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::error::SetupError;
use crate::platform::{Os, PlatformId};

const RELEASE_INDEX_URL: &str =
    "https://api.github.com/repos/syncthing/syncthing/releases/latest";
const AGENT_DOWNLOAD_BASE: &str =
    "https://github.com/syncthing/syncthing/releases/download";
// Community Inno Setup installer for Windows; its release tags track the
// agent's own versions and it lays down the uninstaller, Start Menu group
// and logon task the inspector checks for.
const WINDOWS_SETUP_BASE: &str =
    "https://github.com/Bill-Stewart/SyncthingWindowsSetup/releases/download";

const USER_AGENT: &str = concat!("scratch-sync-setup/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Version requested at invocation: the index's latest, or a pinned tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredVersion {
    Latest,
    Pinned(String),
}

/// Source of release metadata and artifacts.
pub trait ArtifactSource {
    /// Resolve the desired version to a concrete tag such as `v1.27.12`.
    fn resolve(&self, desired: &DesiredVersion) -> Result<String, SetupError>;

    /// Download the artifact for (platform, version) into `dest_dir` and
    /// return the artifact path.
    fn download(
        &self,
        platform: PlatformId,
        version: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, SetupError>;
}

#[derive(Deserialize)]
struct ReleaseDoc {
    tag_name: String,
}

/// Release source backed by the GitHub releases API.
pub struct GithubSource {
    client: reqwest::blocking::Client,
}

impl GithubSource {
    pub fn new() -> Result<Self, SetupError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SetupError::Download(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ArtifactSource for GithubSource {
    fn resolve(&self, desired: &DesiredVersion) -> Result<String, SetupError> {
        match desired {
            DesiredVersion::Pinned(tag) => Ok(normalize_tag(tag)),
            DesiredVersion::Latest => {
                let response = self
                    .client
                    .get(RELEASE_INDEX_URL)
                    .send()
                    .map_err(|e| SetupError::VersionResolution(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(SetupError::VersionResolution(format!(
                        "release index returned HTTP {}",
                        response.status()
                    )));
                }
                let doc: ReleaseDoc = response
                    .json()
                    .map_err(|e| SetupError::VersionResolution(e.to_string()))?;
                info!("latest release: {}", doc.tag_name);
                Ok(doc.tag_name)
            }
        }
    }

    fn download(
        &self,
        platform: PlatformId,
        version: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, SetupError> {
        let url = artifact_url(platform, version);
        info!("downloading {url}");

        let mut response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| SetupError::Download(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SetupError::Download(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }

        let dest = dest_dir.join(artifact_file_name(platform, version));
        let mut file = File::create(&dest)?;
        let bytes = io::copy(&mut response, &mut file)
            .map_err(|e| SetupError::Download(e.to_string()))?;
        info!("downloaded {bytes} bytes to {}", dest.display());
        Ok(dest)
    }
}

/// Deterministic artifact URL for a (platform, version) pair.
pub fn artifact_url(platform: PlatformId, version: &str) -> String {
    match platform.os {
        Os::Windows => {
            let bare = version.trim_start_matches('v');
            format!("{WINDOWS_SETUP_BASE}/{version}/syncthing-{bare}-setup.exe")
        }
        _ => format!(
            "{AGENT_DOWNLOAD_BASE}/{version}/{}",
            artifact_file_name(platform, version)
        ),
    }
}

/// File name the artifact is stored under locally.
pub fn artifact_file_name(platform: PlatformId, version: &str) -> String {
    let arch = platform.arch.url_slug();
    match platform.os {
        Os::Linux => format!("syncthing-linux-{arch}-{version}.tar.gz"),
        Os::MacOs => format!("syncthing-macos-{arch}-{version}.zip"),
        Os::Windows => {
            format!("syncthing-{}-setup.exe", version.trim_start_matches('v'))
        }
    }
}

/// Release tags carry a leading `v`; accept pins written without it.
fn normalize_tag(tag: &str) -> String {
    if tag.starts_with('v') {
        tag.to_string()
    } else {
        format!("v{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Arch;

    fn id(os: Os, arch: Arch) -> PlatformId {
        PlatformId { os, arch }
    }

    #[test]
    fn linux_artifact_url_is_deterministic() {
        let url = artifact_url(id(Os::Linux, Arch::Amd64), "v1.27.12");
        assert_eq!(
            url,
            "https://github.com/syncthing/syncthing/releases/download/v1.27.12/syncthing-linux-amd64-v1.27.12.tar.gz"
        );
    }

    #[test]
    fn macos_artifact_is_a_zip() {
        let url = artifact_url(id(Os::MacOs, Arch::Arm64), "v1.27.12");
        assert!(url.ends_with("syncthing-macos-arm64-v1.27.12.zip"));
    }

    #[test]
    fn windows_artifact_is_the_setup_installer() {
        let url = artifact_url(id(Os::Windows, Arch::Amd64), "v1.27.12");
        assert_eq!(
            url,
            "https://github.com/Bill-Stewart/SyncthingWindowsSetup/releases/download/v1.27.12/syncthing-1.27.12-setup.exe"
        );
    }

    #[test]
    fn x86_slug_lands_in_the_file_name() {
        let name = artifact_file_name(id(Os::Linux, Arch::X86), "v1.27.12");
        assert_eq!(name, "syncthing-linux-386-v1.27.12.tar.gz");
    }

    #[test]
    fn release_document_parses_from_the_index_payload() {
        // Shape of the releases/latest response; unknown fields are ignored.
        let payload = r#"{
            "tag_name": "v1.27.12",
            "name": "v1.27.12",
            "prerelease": false,
            "assets": [{"name": "syncthing-linux-amd64-v1.27.12.tar.gz"}]
        }"#;
        let doc: ReleaseDoc = serde_json::from_str(payload).unwrap();
        assert_eq!(doc.tag_name, "v1.27.12");
    }

    #[test]
    fn pinned_versions_resolve_without_network() {
        let source = GithubSource::new().unwrap();
        let tag = source
            .resolve(&DesiredVersion::Pinned("1.27.12".into()))
            .unwrap();
        assert_eq!(tag, "v1.27.12");
        let tag = source
            .resolve(&DesiredVersion::Pinned("v2.0.0".into()))
            .unwrap();
        assert_eq!(tag, "v2.0.0");
    }
}
