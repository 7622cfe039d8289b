//! Host platform naming for buildx release assets.

use std::fmt;

/// Platform as spelled in buildx asset names (`linux-amd64`, `darwin-arm64`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system (linux, darwin, windows).
    pub os: String,
    /// Architecture (amd64, arm64, arm-v7, ...).
    pub arch: String,
}

impl Platform {
    /// Create a platform from Rust's `std::env::consts` spelling.
    ///
    /// `arm_version` is only consulted for 32-bit ARM.
    #[must_use]
    pub fn from_rust(os: &str, arch: &str, arm_version: Option<u8>) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64".to_string(),
            "aarch64" => "arm64".to_string(),
            "powerpc64" => "ppc64le".to_string(),
            "x86" => "386".to_string(),
            "arm" => arm_version.map_or_else(|| "arm".to_string(), |v| format!("arm-v{v}")),
            other => other.to_string(),
        };
        Self {
            os: os.to_string(),
            arch,
        }
    }

    /// Executable suffix on this platform.
    #[must_use]
    pub fn exe_suffix(&self) -> &'static str {
        if self.os == "windows" { ".exe" } else { "" }
    }

    /// Release asset for a buildx version: `buildx-v<version>.<os>-<arch>[.exe]`.
    #[must_use]
    pub fn asset_name(&self, version: &str) -> String {
        format!("buildx-v{version}.{self}{}", self.exe_suffix())
    }

    /// File name of the docker CLI plugin.
    #[must_use]
    pub fn plugin_file_name(&self) -> String {
        format!("docker-buildx{}", self.exe_suffix())
    }

    /// File name of the standalone binary.
    #[must_use]
    pub fn standalone_file_name(&self) -> String {
        format!("buildx{}", self.exe_suffix())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// The platform this binary runs on.
#[must_use]
pub fn current_platform() -> Platform {
    let arm_version = if cfg!(target_feature = "v7") {
        Some(7)
    } else if cfg!(target_feature = "v6") {
        Some(6)
    } else {
        None
    };
    Platform::from_rust(std::env::consts::OS, std::env::consts::ARCH, arm_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_mapping() {
        let cases = [
            ("x86_64", None, "amd64"),
            ("aarch64", None, "arm64"),
            ("powerpc64", None, "ppc64le"),
            ("x86", None, "386"),
            ("arm", Some(7), "arm-v7"),
            ("arm", None, "arm"),
            ("s390x", None, "s390x"),
            ("riscv64", None, "riscv64"),
        ];
        for (arch, arm, expected) in cases {
            assert_eq!(Platform::from_rust("linux", arch, arm).arch, expected, "{arch}");
        }
    }

    #[test]
    fn test_asset_names() {
        assert_eq!(
            Platform::from_rust("linux", "x86_64", None).asset_name("0.11.2"),
            "buildx-v0.11.2.linux-amd64"
        );
        assert_eq!(
            Platform::from_rust("macos", "aarch64", None).asset_name("0.11.2"),
            "buildx-v0.11.2.darwin-arm64"
        );
        assert_eq!(
            Platform::from_rust("windows", "x86_64", None).asset_name("0.11.2"),
            "buildx-v0.11.2.windows-amd64.exe"
        );
        assert_eq!(
            Platform::from_rust("linux", "arm", Some(6)).asset_name("0.4.1"),
            "buildx-v0.4.1.linux-arm-v6"
        );
    }

    #[test]
    fn test_file_names() {
        let windows = Platform::from_rust("windows", "x86_64", None);
        assert_eq!(windows.plugin_file_name(), "docker-buildx.exe");
        assert_eq!(windows.standalone_file_name(), "buildx.exe");
        let linux = Platform::from_rust("linux", "x86_64", None);
        assert_eq!(linux.plugin_file_name(), "docker-buildx");
        assert_eq!(linux.standalone_file_name(), "buildx");
    }

    #[test]
    fn test_current_platform() {
        let p = current_platform();
        assert!(!p.os.is_empty());
        assert!(!p.arch.is_empty());
    }
}
