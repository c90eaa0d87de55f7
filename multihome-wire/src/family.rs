//! Family-specific fixed structs carried between the netlink header and
//! the attributes.
//!
//! Each mirrors a kernel struct and is converted field by field; no
//! transmutes, no layout assumptions beyond the documented byte offsets.
//! Struct and field names follow the rtnetlink vocabulary.

/// The `rtgenmsg` struct used by `RTM_GET*` dump requests.
///
/// ```c
/// struct rtgenmsg {
///     unsigned char rtgen_family;
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenHeader {
    pub family: u8,
}

impl GenHeader {
    pub const LEN: usize = 1;

    pub fn as_bytes(self) -> [u8; Self::LEN] {
        [self.family]
    }
}

/// The `ifinfomsg` struct of link messages.
///
/// ```c
/// struct ifinfomsg {
///     unsigned char  ifi_family;
///     unsigned char  __ifi_pad;
///     unsigned short ifi_type;
///     int            ifi_index;
///     unsigned       ifi_flags;
///     unsigned       ifi_change;
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkHeader {
    pub interface_family: u8,
    pub link_layer_type: u16,
    pub index: i32,
    pub flags: u32,
    pub change_mask: u32,
}

impl LinkHeader {
    pub const LEN: usize = 16;

    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(Self {
            interface_family: bytes[0],
            link_layer_type: u16::from_ne_bytes(bytes[2..4].try_into().unwrap()),
            index: i32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
            flags: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
            change_mask: u32::from_ne_bytes(bytes[12..16].try_into().unwrap()),
        })
    }

    pub fn as_bytes(self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0] = self.interface_family;
        buf[2..4].copy_from_slice(&self.link_layer_type.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.index.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.flags.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.change_mask.to_ne_bytes());
        buf
    }
}

/// The `ifaddrmsg` struct of address messages.
///
/// ```c
/// struct ifaddrmsg {
///     __u8  ifa_family;
///     __u8  ifa_prefixlen;
///     __u8  ifa_flags;
///     __u8  ifa_scope;
///     __u32 ifa_index;
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressHeader {
    pub family: u8,
    pub prefix_len: u8,
    pub flags: u8,
    pub scope: u8,
    pub index: u32,
}

impl AddressHeader {
    pub const LEN: usize = 8;

    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(Self {
            family: bytes[0],
            prefix_len: bytes[1],
            flags: bytes[2],
            scope: bytes[3],
            index: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
        })
    }

    pub fn as_bytes(self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0] = self.family;
        buf[1] = self.prefix_len;
        buf[2] = self.flags;
        buf[3] = self.scope;
        buf[4..8].copy_from_slice(&self.index.to_ne_bytes());
        buf
    }
}

/// The `rtmsg` struct of route messages.
///
/// ```c
/// struct rtmsg {
///     unsigned char rtm_family;
///     unsigned char rtm_dst_len;
///     unsigned char rtm_src_len;
///     unsigned char rtm_tos;
///     unsigned char rtm_table;
///     unsigned char rtm_protocol;
///     unsigned char rtm_scope;
///     unsigned char rtm_type;
///     unsigned      rtm_flags;
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteHeader {
    pub address_family: u8,
    pub destination_prefix_length: u8,
    pub source_prefix_length: u8,
    pub tos: u8,
    /// 8-bit table id; tables ≥ 256 live in the `RTA_TABLE` attribute.
    pub table: u8,
    pub protocol: u8,
    pub scope: u8,
    pub kind: u8,
    pub flags: u32,
}

impl RouteHeader {
    pub const LEN: usize = 12;

    /// Byte offset of the 8-bit table field within the struct.
    pub const TABLE_OFFSET: usize = 4;

    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(Self {
            address_family: bytes[0],
            destination_prefix_length: bytes[1],
            source_prefix_length: bytes[2],
            tos: bytes[3],
            table: bytes[4],
            protocol: bytes[5],
            scope: bytes[6],
            kind: bytes[7],
            flags: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
        })
    }

    pub fn as_bytes(self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0] = self.address_family;
        buf[1] = self.destination_prefix_length;
        buf[2] = self.source_prefix_length;
        buf[3] = self.tos;
        buf[4] = self.table;
        buf[5] = self.protocol;
        buf[6] = self.scope;
        buf[7] = self.kind;
        buf[8..12].copy_from_slice(&self.flags.to_ne_bytes());
        buf
    }
}

/// The `fib_rule_hdr` struct of policy-rule messages.
///
/// ```c
/// struct fib_rule_hdr {
///     __u8 family;
///     __u8 dst_len;
///     __u8 src_len;
///     __u8 tos;
///     __u8 table;
///     __u8 res1;
///     __u8 res2;
///     __u8 action;
///     __u32 flags;
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleHeader {
    pub family: u8,
    pub dst_len: u8,
    pub src_len: u8,
    pub tos: u8,
    /// 8-bit table id; tables ≥ 256 live in the `FRA_TABLE` attribute.
    pub table: u8,
    pub action: u8,
    pub flags: u32,
}

impl RuleHeader {
    pub const LEN: usize = 12;

    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(Self {
            family: bytes[0],
            dst_len: bytes[1],
            src_len: bytes[2],
            tos: bytes[3],
            table: bytes[4],
            action: bytes[7],
            flags: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
        })
    }

    pub fn as_bytes(self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0] = self.family;
        buf[1] = self.dst_len;
        buf[2] = self.src_len;
        buf[3] = self.tos;
        buf[4] = self.table;
        buf[7] = self.action;
        buf[8..12].copy_from_slice(&self.flags.to_ne_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_header_round_trip() {
        let header = RouteHeader {
            address_family: 2,
            destination_prefix_length: 24,
            table: 254,
            protocol: 4,
            scope: 0,
            kind: 1,
            flags: 0,
            ..Default::default()
        };
        assert_eq!(RouteHeader::parse(&header.as_bytes()), Some(header));
        assert_eq!(header.as_bytes()[RouteHeader::TABLE_OFFSET], 254);
    }

    #[test]
    fn rule_header_reserved_bytes_stay_zero() {
        let header =
            RuleHeader { family: 10, src_len: 128, action: 1, ..Default::default() };
        let bytes = header.as_bytes();
        assert_eq!(bytes[5], 0);
        assert_eq!(bytes[6], 0);
        assert_eq!(RuleHeader::parse(&bytes), Some(header));
    }

    #[test]
    fn link_header_parse_rejects_short_input() {
        assert!(LinkHeader::parse(&[0u8; 15]).is_none());
        let header = LinkHeader { index: 2, ..Default::default() };
        assert_eq!(LinkHeader::parse(&header.as_bytes()), Some(header));
    }
}
