use std::path::Path;

/// Reports the feature release of a Java runtime.
pub trait RuntimeInspector: Send + Sync {
    /// `None` when the version cannot be determined.
    fn java_version(&self, java_exec: &Path) -> Option<u32>;
}

/// Reads `JAVA_VERSION` from the `release` file at the JDK root
/// (`<home>/bin/java` -> `<home>/release`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseFileInspector;

impl RuntimeInspector for ReleaseFileInspector {
    fn java_version(&self, java_exec: &Path) -> Option<u32> {
        let home = java_exec.parent()?.parent()?;
        let text = std::fs::read_to_string(home.join("release")).ok()?;
        let version = text.lines().find_map(|line| {
            let value = line.trim().strip_prefix("JAVA_VERSION=")?;
            Some(value.trim().trim_matches('"').to_string())
        })?;
        let major = parse_major_version(&version);
        if major.is_none() {
            tracing::debug!(
                target: "nova.debug_config",
                version = %version,
                "unrecognized JAVA_VERSION in release file"
            );
        }
        major
    }
}

/// `1.8.0_292` -> 8, `17.0.2` -> 17, `21` -> 21, `22-ea` -> 22.
pub fn parse_major_version(version: &str) -> Option<u32> {
    let mut parts = version
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty());
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        return parts.next()?.parse().ok();
    }
    Some(first)
}
