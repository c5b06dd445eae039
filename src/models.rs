// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// --- Context Types ---

/// The closed set of places a user can stand in the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextType {
    Root,
    GlobalNetwork,
    CoreNetwork,
    RouteTable,
    Vpc,
    TransitGateway,
    Firewall,
    Ec2Instance,
    Elb,
    Vpn,
}

impl ContextType {
    /// Every context type, root first.
    pub const ALL: [Self; 10] = [
        Self::Root,
        Self::GlobalNetwork,
        Self::CoreNetwork,
        Self::RouteTable,
        Self::Vpc,
        Self::TransitGateway,
        Self::Firewall,
        Self::Ec2Instance,
        Self::Elb,
        Self::Vpn,
    ];

    /// The tag used on the command line and in the prompt's long form.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::GlobalNetwork => "global-network",
            Self::CoreNetwork => "core-network",
            Self::RouteTable => "route-table",
            Self::Vpc => "vpc",
            Self::TransitGateway => "transit-gateway",
            Self::Firewall => "firewall",
            Self::Ec2Instance => "ec2-instance",
            Self::Elb => "elb",
            Self::Vpn => "vpn",
        }
    }

    /// Two or three letter form used by the short prompt.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Root => "",
            Self::GlobalNetwork => "gn",
            Self::CoreNetwork => "cn",
            Self::RouteTable => "rt",
            Self::Vpc => "vpc",
            Self::TransitGateway => "tgw",
            Self::Firewall => "fw",
            Self::Ec2Instance => "ec2",
            Self::Elb => "elb",
            Self::Vpn => "vpn",
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ContextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.tag() == s)
            .ok_or_else(|| format!("Unknown context type '{}'", s))
    }
}

/// The three families of commands the hierarchy declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Show,
    Set,
    Action,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Show => "show",
            Self::Set => "set",
            Self::Action => "action",
        })
    }
}

// --- Navigation Frames ---

/// One frame of the navigation stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub context_type: ContextType,
    /// Stable identifier of the selected resource.
    pub reference: String,
    pub display_name: Option<String>,
    /// Full fetched document. Opaque to the navigator.
    pub detail: Value,
    /// 1-based ordinal the user typed, or the position the token resolved to.
    pub selection_index: usize,
}

impl Context {
    /// The display name when present, otherwise the reference.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.reference)
    }
}

// --- Provider Resource Kinds ---

/// Resource families served by a [`crate::system::provider::ResourceProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    GlobalNetwork,
    CoreNetwork,
    Vpc,
    TransitGateway,
    Firewall,
    Ec2Instance,
    Elb,
    Vpn,
}

impl ResourceKind {
    /// Every provider-served kind, in root listing order.
    pub const ALL: [Self; 8] = [
        Self::GlobalNetwork,
        Self::CoreNetwork,
        Self::Vpc,
        Self::TransitGateway,
        Self::Firewall,
        Self::Ec2Instance,
        Self::Elb,
        Self::Vpn,
    ];

    /// Cache namespace and inventory key.
    pub fn namespace(self) -> &'static str {
        self.set_name()
    }

    /// The `set` sub-command that selects one resource of this kind.
    pub fn set_name(self) -> &'static str {
        self.context().tag()
    }

    /// The `show` sub-command that lists resources of this kind.
    pub fn listing_name(self) -> &'static str {
        match self {
            Self::GlobalNetwork => "global-networks",
            Self::CoreNetwork => "core-networks",
            Self::Vpc => "vpcs",
            Self::TransitGateway => "transit-gateways",
            Self::Firewall => "firewalls",
            Self::Ec2Instance => "ec2-instances",
            Self::Elb => "elbs",
            Self::Vpn => "vpns",
        }
    }

    /// The context a successful `set` of this kind enters.
    pub fn context(self) -> ContextType {
        match self {
            Self::GlobalNetwork => ContextType::GlobalNetwork,
            Self::CoreNetwork => ContextType::CoreNetwork,
            Self::Vpc => ContextType::Vpc,
            Self::TransitGateway => ContextType::TransitGateway,
            Self::Firewall => ContextType::Firewall,
            Self::Ec2Instance => ContextType::Ec2Instance,
            Self::Elb => ContextType::Elb,
            Self::Vpn => ContextType::Vpn,
        }
    }

    /// Global resources are discovered once, not per region.
    pub fn is_regional(self) -> bool {
        !matches!(self, Self::GlobalNetwork | Self::CoreNetwork)
    }

    pub fn from_set_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.set_name() == name)
    }

    pub fn from_listing_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.listing_name() == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

// --- Runtime Settings ---

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
        })
    }
}

/// Values changed at runtime through `set profile|regions|no-cache|output-format`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub profile: Option<String>,
    /// Empty means "use the provider's default regions".
    pub regions: Vec<String>,
    pub no_cache: bool,
    pub output_format: OutputFormat,
}
