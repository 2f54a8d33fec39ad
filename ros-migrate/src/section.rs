//! Canonical configuration sections and their per-dialect output headers.

use std::fmt::{self, Display, Formatter};

use ros_config_core::parser::normalize_path;
use serde::{Deserialize, Serialize};

use crate::detect::Dialect;

/// Canonical grouping of configuration statements.
///
/// Declaration order is the output order. `Other` keeps any explicit header
/// that has no canonical kind; `Unassigned` is the trailer for lines that
/// could not be placed at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Section {
    InterfaceEthernet,
    InterfaceBridge,
    InterfaceBonding,
    InterfaceVlan,
    InterfaceVpls,
    InterfaceBridgePort,
    InterfaceBridgeVlan,
    IpPool,
    IpAddress,
    IpDhcpServer,
    IpDhcpServerNetwork,
    IpDns,
    FirewallAddressList,
    FirewallFilter,
    FirewallNat,
    FirewallMangle,
    FirewallRaw,
    RoutingTable,
    IpRoute,
    MplsLdpInstance,
    MplsLdpInterface,
    RoutingBfd,
    OspfInstance,
    OspfArea,
    OspfNetwork,
    OspfInterfaceTemplate,
    BgpTemplate,
    BgpNetwork,
    BgpConnection,
    SnmpCommunity,
    Snmp,
    SystemIdentity,
    Logging,
    UserAaa,
    User,
    PppSecret,
    Other(String),
    Unassigned,
}

const NAMED: &[(&str, Section)] = &[
    ("interface-ethernet", Section::InterfaceEthernet),
    ("interface-bridge", Section::InterfaceBridge),
    ("interface-bonding", Section::InterfaceBonding),
    ("interface-vlan", Section::InterfaceVlan),
    ("interface-vpls", Section::InterfaceVpls),
    ("interface-bridge-port", Section::InterfaceBridgePort),
    ("interface-bridge-vlan", Section::InterfaceBridgeVlan),
    ("ip-pool", Section::IpPool),
    ("ip-address", Section::IpAddress),
    ("ip-dhcp-server", Section::IpDhcpServer),
    ("ip-dhcp-server-network", Section::IpDhcpServerNetwork),
    ("ip-dns", Section::IpDns),
    ("firewall-address-list", Section::FirewallAddressList),
    ("firewall-filter", Section::FirewallFilter),
    ("firewall-nat", Section::FirewallNat),
    ("firewall-mangle", Section::FirewallMangle),
    ("firewall-raw", Section::FirewallRaw),
    ("routing-table", Section::RoutingTable),
    ("ip-route", Section::IpRoute),
    ("mpls-ldp-instance", Section::MplsLdpInstance),
    ("mpls-ldp-interface", Section::MplsLdpInterface),
    ("routing-bfd", Section::RoutingBfd),
    ("ospf-instance", Section::OspfInstance),
    ("ospf-area", Section::OspfArea),
    ("ospf-network", Section::OspfNetwork),
    ("ospf-interface-template", Section::OspfInterfaceTemplate),
    ("bgp-template", Section::BgpTemplate),
    ("bgp-network", Section::BgpNetwork),
    ("bgp-connection", Section::BgpConnection),
    ("snmp-community", Section::SnmpCommunity),
    ("snmp", Section::Snmp),
    ("system-identity", Section::SystemIdentity),
    ("logging", Section::Logging),
    ("user-aaa", Section::UserAaa),
    ("user", Section::User),
    ("ppp-secret", Section::PppSecret),
    ("unassigned", Section::Unassigned),
];

impl Section {
    /// Map a section path (`/routing bgp peer`) to its canonical section.
    pub fn from_path(path: &str) -> Section {
        let path = normalize_path(path);
        match path.as_str() {
            "/interface ethernet" => Section::InterfaceEthernet,
            "/interface bridge" => Section::InterfaceBridge,
            "/interface bonding" => Section::InterfaceBonding,
            "/interface vlan" => Section::InterfaceVlan,
            "/interface vpls" => Section::InterfaceVpls,
            "/interface bridge port" => Section::InterfaceBridgePort,
            "/interface bridge vlan" => Section::InterfaceBridgeVlan,
            "/ip pool" => Section::IpPool,
            "/ip address" => Section::IpAddress,
            "/ip dhcp-server" => Section::IpDhcpServer,
            "/ip dhcp-server network" => Section::IpDhcpServerNetwork,
            "/ip dns" => Section::IpDns,
            "/ip firewall address-list" => Section::FirewallAddressList,
            "/ip firewall filter" => Section::FirewallFilter,
            "/ip firewall nat" => Section::FirewallNat,
            "/ip firewall mangle" => Section::FirewallMangle,
            "/ip firewall raw" => Section::FirewallRaw,
            "/routing table" => Section::RoutingTable,
            "/ip route" => Section::IpRoute,
            "/mpls ldp" => Section::MplsLdpInstance,
            "/mpls ldp interface" => Section::MplsLdpInterface,
            "/routing bfd configuration" | "/routing bfd interface" => Section::RoutingBfd,
            "/routing ospf instance" => Section::OspfInstance,
            "/routing ospf area" => Section::OspfArea,
            "/routing ospf network" => Section::OspfNetwork,
            "/routing ospf interface" | "/routing ospf interface-template" => {
                Section::OspfInterfaceTemplate
            }
            "/routing bgp instance" | "/routing bgp template" => Section::BgpTemplate,
            "/routing bgp network" => Section::BgpNetwork,
            "/routing bgp peer" | "/routing bgp connection" => Section::BgpConnection,
            "/snmp community" => Section::SnmpCommunity,
            "/snmp" => Section::Snmp,
            "/system identity" => Section::SystemIdentity,
            "/system logging" => Section::Logging,
            "/user aaa" => Section::UserAaa,
            "/user" => Section::User,
            "/ppp secret" => Section::PppSecret,
            _ => Section::Other(path),
        }
    }

    /// Output header for this section in `dialect`.
    pub fn header(&self, dialect: Dialect) -> String {
        let legacy = dialect == Dialect::Legacy;
        let header = match self {
            Section::InterfaceEthernet => "/interface ethernet",
            Section::InterfaceBridge => "/interface bridge",
            Section::InterfaceBonding => "/interface bonding",
            Section::InterfaceVlan => "/interface vlan",
            Section::InterfaceVpls => "/interface vpls",
            Section::InterfaceBridgePort => "/interface bridge port",
            Section::InterfaceBridgeVlan => "/interface bridge vlan",
            Section::IpPool => "/ip pool",
            Section::IpAddress => "/ip address",
            Section::IpDhcpServer => "/ip dhcp-server",
            Section::IpDhcpServerNetwork => "/ip dhcp-server network",
            Section::IpDns => "/ip dns",
            Section::FirewallAddressList => "/ip firewall address-list",
            Section::FirewallFilter => "/ip firewall filter",
            Section::FirewallNat => "/ip firewall nat",
            Section::FirewallMangle => "/ip firewall mangle",
            Section::FirewallRaw => "/ip firewall raw",
            Section::RoutingTable => "/routing table",
            Section::IpRoute => "/ip route",
            Section::MplsLdpInstance => "/mpls ldp",
            Section::MplsLdpInterface => "/mpls ldp interface",
            Section::RoutingBfd if legacy => "/routing bfd interface",
            Section::RoutingBfd => "/routing bfd configuration",
            Section::OspfInstance => "/routing ospf instance",
            Section::OspfArea => "/routing ospf area",
            Section::OspfNetwork => "/routing ospf network",
            Section::OspfInterfaceTemplate if legacy => "/routing ospf interface",
            Section::OspfInterfaceTemplate => "/routing ospf interface-template",
            Section::BgpTemplate if legacy => "/routing bgp instance",
            Section::BgpTemplate => "/routing bgp template",
            Section::BgpNetwork => "/routing bgp network",
            Section::BgpConnection if legacy => "/routing bgp peer",
            Section::BgpConnection => "/routing bgp connection",
            Section::SnmpCommunity => "/snmp community",
            Section::Snmp => "/snmp",
            Section::SystemIdentity => "/system identity",
            Section::Logging => "/system logging",
            Section::UserAaa => "/user aaa",
            Section::User => "/user",
            Section::PppSecret => "/ppp secret",
            Section::Other(path) => return path.clone(),
            Section::Unassigned => "",
        };
        header.to_string()
    }

    /// Stable kebab-case name used in rule files and reports.
    pub fn name(&self) -> String {
        if let Section::Other(path) = self {
            return path.clone();
        }
        NAMED
            .iter()
            .find(|(_, section)| section == self)
            .map(|(name, _)| (*name).to_string())
            .unwrap_or_default()
    }

    /// Parse a kebab-case section name or a raw `/path`.
    pub fn from_name(name: &str) -> Option<Section> {
        if name.starts_with('/') {
            return Some(Section::from_path(name));
        }
        NAMED
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, section)| section.clone())
    }

    pub fn is_firewall_rules(&self) -> bool {
        matches!(
            self,
            Section::FirewallFilter
                | Section::FirewallNat
                | Section::FirewallMangle
                | Section::FirewallRaw
        )
    }

    pub fn is_ospf(&self) -> bool {
        matches!(
            self,
            Section::OspfInstance
                | Section::OspfArea
                | Section::OspfNetwork
                | Section::OspfInterfaceTemplate
        )
    }

    pub fn is_bgp(&self) -> bool {
        matches!(
            self,
            Section::BgpTemplate | Section::BgpNetwork | Section::BgpConnection
        )
    }

    /// Canonical sections take part in completeness checks; pass-through and
    /// trailer sections do not.
    pub fn is_canonical(&self) -> bool {
        !matches!(self, Section::Other(_) | Section::Unassigned)
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<Section> for String {
    fn from(section: Section) -> Self {
        section.name()
    }
}

impl TryFrom<String> for Section {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Section::from_name(&value).ok_or_else(|| format!("unknown section '{value}'"))
    }
}
