//! Host platform detection and canonical identifiers.
//!
//! Maps the host OS and CPU architecture onto the identifier set used by the
//! release feed's URL templates. Detected once per run and treated as
//! immutable afterwards.

use std::fmt;

use crate::error::SetupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    pub fn name(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "macos",
            Os::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
    Arm,
    X86,
}

impl Arch {
    pub fn name(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
            Arch::Arm => "arm",
            Arch::X86 => "x86",
        }
    }

    /// Architecture component of release artifact names. Differs from the
    /// canonical name only for 32-bit x86, which the feed calls `386`.
    pub fn url_slug(self) -> &'static str {
        match self {
            Arch::X86 => "386",
            other => other.name(),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformId {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformId {
    /// Detect the host platform from the build-time constants.
    ///
    /// Any (os, arch) pair the release feed has no artifact for is fatal; no
    /// retry makes sense.
    pub fn detect() -> Result<Self, SetupError> {
        Self::from_raw(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build a platform identifier from vendor strings, normalizing the
    /// spellings seen in the wild ("AMD64", "aarch64", "armv7l", ...).
    pub fn from_raw(os: &str, arch: &str) -> Result<Self, SetupError> {
        let unsupported = || SetupError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os_id = match os {
            "linux" => Os::Linux,
            "macos" | "darwin" => Os::MacOs,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };
        let arch_id = normalize_arch(arch).ok_or_else(unsupported)?;

        // The feed only publishes 64-bit macOS artifacts, and no 32-bit ARM
        // builds exist for Windows.
        let supported = match os_id {
            Os::Linux => true,
            Os::MacOs => matches!(arch_id, Arch::Amd64 | Arch::Arm64),
            Os::Windows => matches!(arch_id, Arch::Amd64 | Arch::Arm64 | Arch::X86),
        };
        if !supported {
            return Err(unsupported());
        }

        Ok(Self { os: os_id, arch: arch_id })
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Normalize a vendor architecture string into the canonical set.
fn normalize_arch(raw: &str) -> Option<Arch> {
    match raw.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" | "x64" => Some(Arch::Amd64),
        "aarch64" | "arm64" => Some(Arch::Arm64),
        "arm" | "armv6l" | "armv7l" => Some(Arch::Arm),
        "x86" | "i386" | "i686" | "386" => Some(Arch::X86),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_arch_strings_normalize() {
        assert_eq!(normalize_arch("AMD64"), Some(Arch::Amd64));
        assert_eq!(normalize_arch("x86_64"), Some(Arch::Amd64));
        assert_eq!(normalize_arch("aarch64"), Some(Arch::Arm64));
        assert_eq!(normalize_arch("armv7l"), Some(Arch::Arm));
        assert_eq!(normalize_arch("i686"), Some(Arch::X86));
        assert_eq!(normalize_arch("riscv64"), None);
    }

    #[test]
    fn every_supported_pair_has_a_url_safe_slug() {
        let pairs = [
            ("linux", "amd64"),
            ("linux", "arm64"),
            ("linux", "arm"),
            ("linux", "386"),
            ("macos", "x86_64"),
            ("macos", "aarch64"),
            ("windows", "AMD64"),
            ("windows", "ARM64"),
            ("windows", "x86"),
        ];
        for (os, arch) in pairs {
            let id = PlatformId::from_raw(os, arch).expect("supported pair");
            let slug = id.arch.url_slug();
            assert!(!slug.is_empty());
            assert!(slug.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn unsupported_pairs_are_rejected() {
        assert!(matches!(
            PlatformId::from_raw("freebsd", "x86_64"),
            Err(SetupError::UnsupportedPlatform { .. })
        ));
        assert!(matches!(
            PlatformId::from_raw("linux", "riscv64"),
            Err(SetupError::UnsupportedPlatform { .. })
        ));
        assert!(matches!(
            PlatformId::from_raw("macos", "arm"),
            Err(SetupError::UnsupportedPlatform { .. })
        ));
        assert!(matches!(
            PlatformId::from_raw("windows", "armv7l"),
            Err(SetupError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn x86_maps_to_386_in_urls() {
        let id = PlatformId::from_raw("windows", "i686").unwrap();
        assert_eq!(id.arch.name(), "x86");
        assert_eq!(id.arch.url_slug(), "386");
    }

    #[test]
    fn host_platform_detects() {
        // The build hosts this crate targets are all in the supported set.
        PlatformId::detect().expect("host platform should be supported");
    }
}
