//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Protocol constants and the method code enumeration.

use serde::{Deserialize, Serialize};

/// Standard UDAP port devices listen on.
pub const UDAP_PORT: u16 = 17784;

/// Fixed envelope length preceding the method payload.
pub const HEADER_LEN: usize = 27;

/// Protocol type marker for UCP traffic.
pub const UDAP_TYPE_UCP: u16 = 0xC001;

/// Protocol class marker for UCP traffic.
pub const UAP_CLASS_UCP: [u8; 4] = [0x00, 0x01, 0x00, 0x01];

/// Flags byte sent on every request.
pub const UCP_FLAGS: u8 = 0x01;

/// Sequence number sent on every request.
pub const REQUEST_SEQUENCE: u16 = 0x0001;

/// Length of the all-zero credential placeholder on bulk read/write requests.
pub const CREDENTIALS_LEN: usize = 32;

/// Credential placeholder. Devices accept all zeroes.
pub const DEFAULT_CREDENTIALS: [u8; CREDENTIALS_LEN] = [0u8; CREDENTIALS_LEN];

/// UCP operation selector carried in every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Reserved0,
    Discover,
    GetIp,
    SetIp,
    Reset,
    GetData,
    SetData,
    Error,
    CredentialsError,
    AdvDiscover,
    Reserved10,
    GetUuid,
    /// Code outside the enumerated range, preserved as received.
    Other(u16),
}

impl Method {
    pub fn code(self) -> u16 {
        match self {
            Method::Reserved0 => 0,
            Method::Discover => 1,
            Method::GetIp => 2,
            Method::SetIp => 3,
            Method::Reset => 4,
            Method::GetData => 5,
            Method::SetData => 6,
            Method::Error => 7,
            Method::CredentialsError => 8,
            Method::AdvDiscover => 9,
            Method::Reserved10 => 10,
            Method::GetUuid => 11,
            Method::Other(code) => code,
        }
    }

    /// Bulk configuration reads and writes carry the credential block.
    pub fn carries_credentials(self) -> bool {
        matches!(self, Method::GetData | Method::SetData)
    }
}

impl From<u16> for Method {
    fn from(code: u16) -> Self {
        match code {
            0 => Method::Reserved0,
            1 => Method::Discover,
            2 => Method::GetIp,
            3 => Method::SetIp,
            4 => Method::Reset,
            5 => Method::GetData,
            6 => Method::SetData,
            7 => Method::Error,
            8 => Method::CredentialsError,
            9 => Method::AdvDiscover,
            10 => Method::Reserved10,
            11 => Method::GetUuid,
            other => Method::Other(other),
        }
    }
}

impl From<Method> for u16 {
    fn from(method: Method) -> Self {
        method.code()
    }
}

/// Response codes used in field-list payloads.
pub mod ucp_code {
    pub const DEVICE_NAME: u8 = 2;
    pub const DEVICE_TYPE: u8 = 3;
    pub const USE_DHCP: u8 = 4;
    pub const IP_ADDR: u8 = 5;
    pub const SUBNET_MASK: u8 = 6;
    pub const GATEWAY_ADDR: u8 = 7;
    pub const FIRMWARE_REV: u8 = 9;
    pub const HARDWARE_REV: u8 = 10;
    pub const DEVICE_ID: u8 = 11;
    pub const DEVICE_STATUS: u8 = 12;
    pub const UUID: u8 = 13;
}
