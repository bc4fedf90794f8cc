//! Bootstrap — startup checks before the server accepts traffic.

use crate::config::ServerConfig;

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if config.circulation.loan_period_days <= 0 {
        anyhow::bail!(
            "circulation.loan_period_days must be positive (got {}).",
            config.circulation.loan_period_days
        );
    }
    if config.attendance.max_capacity == 0 {
        anyhow::bail!("attendance.max_capacity must be positive.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_verifies() {
        assert!(verify_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn empty_data_dir_rejected() {
        let mut config = ServerConfig::default();
        config.storage.data_dir = String::new();
        assert!(verify_config(&config).is_err());
    }

    #[test]
    fn nonpositive_loan_period_rejected() {
        let mut config = ServerConfig::default();
        config.circulation.loan_period_days = 0;
        assert!(verify_config(&config).is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = ServerConfig::default();
        config.attendance.max_capacity = 0;
        assert!(verify_config(&config).is_err());
    }
}
