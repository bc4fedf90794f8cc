//! Server configuration — a TOML file with per-module sections.
//!
//! ```toml
//! listen = "0.0.0.0:8080"
//!
//! [storage]
//! data_dir = "/var/lib/biblio"
//!
//! [circulation]
//! loan_period_days = 14
//!
//! [attendance]
//! max_capacity = 50
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for the HTTP server.
    pub listen: String,

    pub storage: StorageConfig,
    pub circulation: CirculationSection,
    pub attendance: AttendanceSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the SQLite database.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CirculationSection {
    /// Loan period applied at acceptance time, in days.
    pub loan_period_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttendanceSection {
    /// Room capacity for attendance check-ins.
    pub max_capacity: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            storage: StorageConfig::default(),
            circulation: CirculationSection::default(),
            attendance: AttendanceSection::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for CirculationSection {
    fn default() -> Self {
        Self {
            loan_period_days: 14,
        }
    }
}

impl Default for AttendanceSection {
    fn default() -> Self {
        Self { max_capacity: 50 }
    }
}

impl ServerConfig {
    /// Resolve a context name or path to a config file path.
    ///
    /// A bare name resolves to `/etc/biblio/<name>.toml`; anything with a
    /// `/` or `.` is used as a path directly.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/biblio/{name_or_path}.toml"))
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("cannot parse config {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.storage.data_dir, "./data");
        assert_eq!(config.circulation.loan_period_days, 14);
        assert_eq!(config.attendance.max_capacity, 50);
    }

    #[test]
    fn resolve_bare_name() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/biblio/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./biblio.toml"),
            PathBuf::from("./biblio.toml")
        );
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "listen = \"127.0.0.1:9090\"\n\n[circulation]\nloan_period_days = 7"
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9090");
        assert_eq!(config.circulation.loan_period_days, 7);
        // Untouched sections keep their defaults.
        assert_eq!(config.storage.data_dir, "./data");
        assert_eq!(config.attendance.max_capacity, 50);
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(ServerConfig::load(Path::new("/nonexistent/biblio.toml")).is_err());
    }
}
