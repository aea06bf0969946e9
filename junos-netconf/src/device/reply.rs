//! Typed NETCONF reply shapes.
//!
//! Each shape is a structural decode of one Junos RPC reply, driven by one
//! generic [`decode_reply`] operation; adding a new RPC means adding a new
//! shape, not new parsing code.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{NetconfError, Result};

/// A reply document that decodes into a typed shape.
///
/// `RPC` is the request body whose reply the shape describes.
pub trait ReplyShape: DeserializeOwned {
    /// RPC body to send.
    const RPC: &'static str;

    /// Operation name used in error context.
    const OPERATION: &'static str;
}

/// Decode a raw reply document into a typed shape.
///
/// Decode failures carry the offending payload for diagnosis.
pub fn decode_reply<T: ReplyShape>(raw: &str) -> Result<T> {
    quick_xml::de::from_str(raw).map_err(|e| {
        NetconfError::MalformedReply {
            operation: T::OPERATION.to_string(),
            message: e.to_string(),
            raw: raw.to_string(),
        }
        .into()
    })
}

// ---------------------------------------------------------------------------
// get-system-information
// ---------------------------------------------------------------------------

/// Reply to `<get-system-information/>`.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemInformationReply {
    #[serde(rename = "system-information")]
    pub system_information: SystemInformation,
}

impl ReplyShape for SystemInformationReply {
    const RPC: &'static str = "<get-system-information/>";
    const OPERATION: &'static str = "get-system-information";
}

/// `<system-information>` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemInformation {
    #[serde(rename = "hardware-model", default)]
    pub hardware_model: String,

    #[serde(rename = "os-name", default)]
    pub os_name: String,

    #[serde(rename = "os-version", default)]
    pub os_version: String,

    #[serde(rename = "serial-number", default)]
    pub serial_number: String,

    #[serde(rename = "host-name", default)]
    pub host_name: String,

    /// Present (as an empty element) on chassis-cluster nodes.
    #[serde(rename = "cluster-node", default)]
    pub cluster_node: Option<()>,
}

// ---------------------------------------------------------------------------
// get-interface-information (terse)
// ---------------------------------------------------------------------------

/// Reply to `<get-interface-information><terse/></get-interface-information>`.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfacesTerseReply {
    #[serde(rename = "interface-information")]
    pub interface_information: InterfaceInformation,
}

impl ReplyShape for InterfacesTerseReply {
    const RPC: &'static str = "<get-interface-information><terse/></get-interface-information>";
    const OPERATION: &'static str = "get-interface-information";
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceInformation {
    #[serde(rename = "physical-interface", default)]
    pub physical_interfaces: Vec<PhysicalInterface>,
}

/// One physical interface in a terse listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PhysicalInterface {
    pub name: String,

    #[serde(rename = "admin-status", default)]
    pub admin_status: String,

    #[serde(rename = "oper-status", default)]
    pub oper_status: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(rename = "logical-interface", default)]
    pub logical_interfaces: Vec<LogicalInterface>,
}

/// One logical unit under a physical interface.
#[derive(Debug, Clone, Deserialize)]
pub struct LogicalInterface {
    pub name: String,

    #[serde(rename = "admin-status", default)]
    pub admin_status: String,

    #[serde(rename = "oper-status", default)]
    pub oper_status: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(rename = "address-family", default)]
    pub address_families: Vec<AddressFamily>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressFamily {
    #[serde(rename = "address-family-name", default)]
    pub name: String,

    #[serde(rename = "interface-address", default)]
    pub addresses: Vec<InterfaceAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceAddress {
    #[serde(rename = "ifa-local", default)]
    pub local: String,
}

// ---------------------------------------------------------------------------
// get-route-information
// ---------------------------------------------------------------------------

/// Reply to `<get-route-information/>`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteInformationReply {
    #[serde(rename = "route-information")]
    pub route_information: RouteInformation,
}

impl ReplyShape for RouteInformationReply {
    const RPC: &'static str = "<get-route-information/>";
    const OPERATION: &'static str = "get-route-information";
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteInformation {
    #[serde(rename = "route-table", default)]
    pub tables: Vec<RouteTable>,
}

/// One routing table (`inet.0`, `inet6.0`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct RouteTable {
    #[serde(rename = "table-name")]
    pub name: String,

    #[serde(rename = "total-route-count", default)]
    pub total_routes: u64,

    #[serde(rename = "active-route-count", default)]
    pub active_routes: u64,

    #[serde(rename = "rt", default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    #[serde(rename = "rt-destination", default)]
    pub destination: String,

    #[serde(rename = "rt-entry", default)]
    pub entries: Vec<RouteEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    #[serde(rename = "protocol-name", default)]
    pub protocol: String,

    #[serde(default)]
    pub preference: Option<u32>,

    #[serde(rename = "active-tag", default)]
    pub active_tag: Option<String>,

    #[serde(rename = "nh", default)]
    pub next_hops: Vec<NextHop>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextHop {
    #[serde(default)]
    pub to: Option<String>,

    #[serde(default)]
    pub via: Option<String>,
}

// ---------------------------------------------------------------------------
// get-chassis-inventory
// ---------------------------------------------------------------------------

/// Reply to `<get-chassis-inventory/>`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChassisInventoryReply {
    #[serde(rename = "chassis-inventory")]
    pub chassis_inventory: ChassisInventory,
}

impl ReplyShape for ChassisInventoryReply {
    const RPC: &'static str = "<get-chassis-inventory/>";
    const OPERATION: &'static str = "get-chassis-inventory";
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChassisInventory {
    pub chassis: Chassis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chassis {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "serial-number", default)]
    pub serial_number: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "chassis-module", default)]
    pub modules: Vec<ChassisModule>,
}

/// One hardware module; sub-modules nest one level down.
#[derive(Debug, Clone, Deserialize)]
pub struct ChassisModule {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(rename = "part-number", default)]
    pub part_number: Option<String>,

    #[serde(rename = "serial-number", default)]
    pub serial_number: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(rename = "chassis-sub-module", default)]
    pub sub_modules: Vec<ChassisSubModule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChassisSubModule {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "part-number", default)]
    pub part_number: Option<String>,

    #[serde(rename = "serial-number", default)]
    pub serial_number: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_system_information() {
        let raw = r#"<rpc-reply message-id="1">
          <system-information>
            <hardware-model>srx340</hardware-model>
            <os-name>junos-es</os-name>
            <os-version>21.4R3-S4.9</os-version>
            <serial-number>CV0123456789</serial-number>
            <host-name>fw0</host-name>
          </system-information>
        </rpc-reply>"#;

        let reply: SystemInformationReply = decode_reply(raw).unwrap();
        let info = reply.system_information;
        assert_eq!(info.hardware_model, "srx340");
        assert_eq!(info.os_version, "21.4R3-S4.9");
        assert_eq!(info.host_name, "fw0");
        assert!(info.cluster_node.is_none());
    }

    #[test]
    fn test_decode_cluster_node_flag() {
        let raw = r#"<rpc-reply>
          <system-information>
            <hardware-model>srx1500</hardware-model>
            <os-name>junos</os-name>
            <os-version>22.2R1</os-version>
            <serial-number>X</serial-number>
            <host-name>fw-cluster0</host-name>
            <cluster-node/>
          </system-information>
        </rpc-reply>"#;

        let reply: SystemInformationReply = decode_reply(raw).unwrap();
        assert!(reply.system_information.cluster_node.is_some());
    }

    #[test]
    fn test_decode_interfaces_terse() {
        let raw = r#"<rpc-reply>
          <interface-information>
            <physical-interface>
              <name>ge-0/0/0</name>
              <admin-status>up</admin-status>
              <oper-status>up</oper-status>
              <logical-interface>
                <name>ge-0/0/0.0</name>
                <admin-status>up</admin-status>
                <oper-status>up</oper-status>
                <address-family>
                  <address-family-name>inet</address-family-name>
                  <interface-address>
                    <ifa-local>198.51.100.1/30</ifa-local>
                  </interface-address>
                </address-family>
              </logical-interface>
            </physical-interface>
            <physical-interface>
              <name>lo0</name>
              <admin-status>up</admin-status>
              <oper-status>up</oper-status>
            </physical-interface>
          </interface-information>
        </rpc-reply>"#;

        let reply: InterfacesTerseReply = decode_reply(raw).unwrap();
        let phys = &reply.interface_information.physical_interfaces;
        assert_eq!(phys.len(), 2);
        assert_eq!(phys[0].name, "ge-0/0/0");
        assert_eq!(phys[0].logical_interfaces.len(), 1);
        let af = &phys[0].logical_interfaces[0].address_families[0];
        assert_eq!(af.name, "inet");
        assert_eq!(af.addresses[0].local, "198.51.100.1/30");
        assert!(phys[1].logical_interfaces.is_empty());
    }

    #[test]
    fn test_decode_route_information() {
        let raw = r#"<rpc-reply>
          <route-information>
            <route-table>
              <table-name>inet.0</table-name>
              <total-route-count>3</total-route-count>
              <active-route-count>3</active-route-count>
              <rt>
                <rt-destination>0.0.0.0/0</rt-destination>
                <rt-entry>
                  <active-tag>*</active-tag>
                  <protocol-name>Static</protocol-name>
                  <preference>5</preference>
                  <nh>
                    <to>198.51.100.2</to>
                    <via>ge-0/0/0.0</via>
                  </nh>
                </rt-entry>
              </rt>
            </route-table>
          </route-information>
        </rpc-reply>"#;

        let reply: RouteInformationReply = decode_reply(raw).unwrap();
        let table = &reply.route_information.tables[0];
        assert_eq!(table.name, "inet.0");
        assert_eq!(table.total_routes, 3);
        let entry = &table.routes[0].entries[0];
        assert_eq!(entry.protocol, "Static");
        assert_eq!(entry.preference, Some(5));
        assert_eq!(entry.next_hops[0].via.as_deref(), Some("ge-0/0/0.0"));
    }

    #[test]
    fn test_decode_chassis_inventory() {
        let raw = r#"<rpc-reply>
          <chassis-inventory>
            <chassis>
              <name>Chassis</name>
              <serial-number>CV0123456789</serial-number>
              <description>SRX340</description>
              <chassis-module>
                <name>Routing Engine 0</name>
                <description>RE-SRX340</description>
                <chassis-sub-module>
                  <name>CPU</name>
                  <part-number>BUILTIN</part-number>
                </chassis-sub-module>
              </chassis-module>
            </chassis>
          </chassis-inventory>
        </rpc-reply>"#;

        let reply: ChassisInventoryReply = decode_reply(raw).unwrap();
        let chassis = reply.chassis_inventory.chassis;
        assert_eq!(chassis.description, "SRX340");
        assert_eq!(chassis.modules[0].name, "Routing Engine 0");
        assert_eq!(chassis.modules[0].sub_modules[0].name, "CPU");
    }

    #[test]
    fn test_decode_failure_carries_payload() {
        let raw = "<rpc-reply><system-information></rpc-reply>";
        let err = decode_reply::<SystemInformationReply>(raw).unwrap_err();
        assert!(err.to_string().contains("get-system-information"));
        assert!(err.to_string().contains("<rpc-reply>"));
    }
}
