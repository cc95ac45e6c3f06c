//! Namespace and action URIs used by WS-Management messages.
//!
//! The [`Namespace`] enum is the table the XML writer consults when it has
//! to pick a prefix for an element, so envelopes produced by this crate read
//! the same way the DMTF examples do (`s:`, `a:`, `w:`, `n:` ...).

/// SOAP 1.2 envelope namespace
pub const NS_SOAP_ENV: &str = "http://www.w3.org/2003/05/soap-envelope";
/// WS-Addressing (2004/08)
pub const NS_WSA: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
/// WS-Addressing 1.0
pub const NS_WSA10: &str = "http://www.w3.org/2005/08/addressing";
/// WS-Addressing metadata
pub const NS_WSAM: &str = "http://www.w3.org/2007/05/addressing/metadata";
/// WS-Enumeration
pub const NS_WSMEN: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration";
/// WS-Transfer
pub const NS_WSMT: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer";
/// WS-Eventing
pub const NS_WSME: &str = "http://schemas.xmlsoap.org/ws/2004/08/eventing";
/// DMTF WS-Management
pub const NS_WSMAN: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";
/// DMTF WS-Management identity
pub const NS_WSMID: &str = "http://schemas.dmtf.org/wbem/wsman/identity/1/wsmanidentity.xsd";
/// WSDL
pub const NS_WSDL: &str = "http://schemas.xmlsoap.org/wsdl";
/// WS-Policy
pub const NS_WSP: &str = "http://schemas.xmlsoap.org/ws/2004/09/policy";

/// Address used in `ReplyTo` when the reply travels back on the same connection.
pub const ANONYMOUS_ADDRESS: &str =
    "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// WS-Management action URIs.
pub mod action {
    /// Models any simple single item retrieval
    pub const GET: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Get";
    /// Models an update of an entire item
    pub const PUT: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Put";
    /// Models creation of a new item
    pub const CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
    /// Models the deletion of an item
    pub const DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
    /// Begins an enumeration or query
    pub const ENUMERATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Enumerate";
    /// Retrieves the next batch of results from enumeration
    pub const PULL: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Pull";
    /// Releases an active enumerator
    pub const RELEASE: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Release";
    /// WSMID identify
    pub const IDENTIFY: &str =
        "http://schemas.dmtf.org/wbem/wsman/identity/1/wsmanidentity/Identify";
}

/// Namespaces known to the serializer, with their preferred prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// SOAP 1.2 envelope
    SoapEnvelope,
    /// WS-Addressing
    Addressing,
    /// WS-Addressing 1.0
    Addressing10,
    /// WS-Addressing metadata
    AddressingMetadata,
    /// WS-Enumeration
    Enumeration,
    /// WS-Transfer
    Transfer,
    /// WS-Eventing
    Eventing,
    /// WS-Management
    Wsman,
    /// WS-Management identity
    WsmanIdentity,
    /// WSDL
    Wsdl,
    /// WS-Policy
    Policy,
}

impl Namespace {
    /// Every entry of the table, in prefix-assignment order.
    pub const ALL: [Namespace; 11] = [
        Namespace::SoapEnvelope,
        Namespace::Addressing,
        Namespace::Wsman,
        Namespace::Enumeration,
        Namespace::Transfer,
        Namespace::WsmanIdentity,
        Namespace::Eventing,
        Namespace::Addressing10,
        Namespace::AddressingMetadata,
        Namespace::Wsdl,
        Namespace::Policy,
    ];

    /// Canonical URI.
    pub fn uri(self) -> &'static str {
        match self {
            Namespace::SoapEnvelope => NS_SOAP_ENV,
            Namespace::Addressing => NS_WSA,
            Namespace::Addressing10 => NS_WSA10,
            Namespace::AddressingMetadata => NS_WSAM,
            Namespace::Enumeration => NS_WSMEN,
            Namespace::Transfer => NS_WSMT,
            Namespace::Eventing => NS_WSME,
            Namespace::Wsman => NS_WSMAN,
            Namespace::WsmanIdentity => NS_WSMID,
            Namespace::Wsdl => NS_WSDL,
            Namespace::Policy => NS_WSP,
        }
    }

    /// Prefix used when serializing.
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::SoapEnvelope => "s",
            Namespace::Addressing => "a",
            Namespace::Addressing10 => "wsa10",
            Namespace::AddressingMetadata => "wsam",
            Namespace::Enumeration => "n",
            Namespace::Transfer => "t",
            Namespace::Eventing => "e",
            Namespace::Wsman => "w",
            Namespace::WsmanIdentity => "wsmid",
            Namespace::Wsdl => "wsdl",
            Namespace::Policy => "wsp",
        }
    }

    /// Looks a URI up in the table.
    pub fn from_uri(uri: &str) -> Option<Namespace> {
        Self::ALL.into_iter().find(|ns| ns.uri() == uri)
    }
}
