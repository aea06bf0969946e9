//! Device facts gathered once per session.

use serde::{Deserialize, Serialize};

use super::reply::SystemInformation;

/// Hardware-model prefixes of the security-appliance family (SRX and the
/// J-series services routers).
const SECURITY_PREFIXES: &[&str] = &["srx", "vsrx", "j"];

/// Hardware-model prefixes of the routing-platform family.
const ROUTING_PREFIXES: &[&str] = &["mx", "vmx"];

/// Identifying metadata snapshot, read-only after fact gathering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFacts {
    /// Hardware model, e.g. `srx340` or `mx960`.
    pub hardware_model: String,

    /// OS name, e.g. `junos-es`.
    pub os_name: String,

    /// OS version, e.g. `21.4R3-S4`.
    pub os_version: String,

    /// Chassis serial number.
    pub serial_number: String,

    /// Configured host name.
    pub hostname: String,

    /// Whether the device reported itself as a cluster node.
    pub cluster_node: bool,
}

impl DeviceFacts {
    /// True for the SRX/J security-appliance family.
    ///
    /// Case-insensitive prefix match on the hardware model, the same test
    /// the Junos tooling ecosystem applies.
    pub fn is_security_appliance(&self) -> bool {
        model_has_prefix(&self.hardware_model, SECURITY_PREFIXES)
    }

    /// True for the MX routing-platform family.
    pub fn is_routing_platform(&self) -> bool {
        model_has_prefix(&self.hardware_model, ROUTING_PREFIXES)
    }

    /// Short description for logs: `fw0 (srx340 junos-es 21.4R3)`.
    pub fn summary(&self) -> String {
        format!(
            "{} ({} {} {})",
            self.hostname, self.hardware_model, self.os_name, self.os_version
        )
    }
}

impl From<SystemInformation> for DeviceFacts {
    fn from(info: SystemInformation) -> Self {
        Self {
            hardware_model: info.hardware_model,
            os_name: info.os_name,
            os_version: info.os_version,
            serial_number: info.serial_number,
            hostname: info.host_name,
            cluster_node: info.cluster_node.is_some(),
        }
    }
}

fn model_has_prefix(model: &str, prefixes: &[&str]) -> bool {
    let model = model.to_ascii_lowercase();
    prefixes.iter().any(|prefix| model.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts_for(model: &str) -> DeviceFacts {
        DeviceFacts {
            hardware_model: model.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_security_appliance_family() {
        for model in ["srx340", "vSRX", "j2350", "SRX1500"] {
            assert!(
                facts_for(model).is_security_appliance(),
                "{model} should classify as security appliance"
            );
            assert!(!facts_for(model).is_routing_platform());
        }
    }

    #[test]
    fn test_routing_platform_family() {
        for model in ["mx960", "vmx", "MX204"] {
            assert!(
                facts_for(model).is_routing_platform(),
                "{model} should classify as routing platform"
            );
            assert!(!facts_for(model).is_security_appliance());
        }
    }

    #[test]
    fn test_switch_is_neither_family() {
        let facts = facts_for("ex4300");
        assert!(!facts.is_security_appliance());
        assert!(!facts.is_routing_platform());
    }

    #[test]
    fn test_facts_from_system_information() {
        let info = SystemInformation {
            hardware_model: "srx340".to_string(),
            os_name: "junos-es".to_string(),
            os_version: "21.4R3".to_string(),
            serial_number: "CV0123456789".to_string(),
            host_name: "fw0".to_string(),
            cluster_node: Some(()),
        };
        let facts = DeviceFacts::from(info);
        assert!(facts.cluster_node);
        assert_eq!(facts.summary(), "fw0 (srx340 junos-es 21.4R3)");
    }
}
