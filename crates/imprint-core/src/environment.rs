//! Host environment captured in the run report

use crate::config::UNKNOWN;
use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Tool name recorded in reports
pub const TOOL_NAME: &str = "Imprint Disc Imaging Utility";

/// Tool version recorded in reports
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Description of the machine that performed the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Operating system name
    pub operating_system: String,
    /// Operating system version
    pub os_version: String,
    /// Kernel version
    pub kernel_version: String,
    /// CPU architecture
    pub machine_architecture: String,
    /// Host name
    pub hostname: String,
    /// Version of this tool
    pub tool_version: String,
    /// Privilege context required for raw device access
    pub user_context: String,
}

impl EnvironmentInfo {
    /// Query the running system
    pub fn detect() -> Self {
        let or_unknown = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            operating_system: or_unknown(System::name()),
            os_version: or_unknown(System::os_version()),
            kernel_version: or_unknown(System::kernel_version()),
            machine_architecture: std::env::consts::ARCH.to_string(),
            hostname: or_unknown(System::host_name()),
            tool_version: TOOL_VERSION.to_string(),
            user_context: "root required for raw device access".to_string(),
        }
    }
}
