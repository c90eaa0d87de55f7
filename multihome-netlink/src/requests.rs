//! Builders for the requests the reconciler derives from observed state.
//!
//! Route mirroring deliberately clones the inbound message verbatim and
//! rewrites single fields in place. Decoding and re-encoding would drop
//! attributes this code does not know about (`RTA_PREFSRC`,
//! `RTA_MULTIPATH`, …), and the kernel treats an incomplete route as a
//! different route.

use bytes::{BufMut, Bytes, BytesMut};

use multihome_wire::{
    align, attr,
    consts::{
        AF_UNSPEC, FRA_PRIORITY, FRA_SRC, FRA_TABLE, FR_ACT_TO_TBL, NLM_F_ACK, NLM_F_CREATE,
        NLM_F_DUMP, NLM_F_EXCL, NLM_F_REQUEST, RTA_TABLE, RTM_DELROUTE, RTM_DELRULE, RTM_NEWRULE,
        RT_TABLE_UNSPEC,
    },
    family::{GenHeader, RouteHeader, RuleHeader},
    Message, MessageBuilder, NetlinkHeader,
};

/// Flag word for table dumps.
pub const DUMP_FLAGS: u16 = NLM_F_REQUEST | NLM_F_DUMP | NLM_F_ACK;
/// Flag word for rule/route installation. `NLM_F_EXCL` turns a re-emit
/// of an existing entry into an acknowledged `EEXIST` no-op.
pub const CREATE_FLAGS: u16 = NLM_F_REQUEST | NLM_F_CREATE | NLM_F_EXCL | NLM_F_ACK;
/// Flag word for rule/route removal.
pub const REMOVE_FLAGS: u16 = NLM_F_REQUEST | NLM_F_ACK;

/// Encode an `RTM_GET*` dump request for the whole table, both families.
pub fn dump_request(message_type: u16, sequence: u32) -> Bytes {
    MessageBuilder::new(message_type, DUMP_FLAGS, sequence)
        .family(&GenHeader { family: AF_UNSPEC }.as_bytes())
        .finish()
}

/// A source-address policy rule steering one managed address into its
/// interface's custom table.
///
/// The rule priority equals the table id, keeping the priority space
/// disjoint per interface and stable across restarts. The source prefix
/// is always the host mask (/32 or /128): the rule must match the
/// address, not its subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRule {
    /// `AF_INET` or `AF_INET6`, from the triggering address event.
    pub family: u8,
    /// Raw address bytes, 4 or 16.
    pub address: Vec<u8>,
    /// The managed interface's custom table.
    pub table: u32,
}

impl SourceRule {
    /// Encode the `RTM_NEWRULE` installing this rule.
    pub fn install(&self, sequence: u32) -> Bytes {
        self.build(RTM_NEWRULE, CREATE_FLAGS, sequence)
    }

    /// Encode the `RTM_DELRULE` removing this rule.
    pub fn remove(&self, sequence: u32) -> Bytes {
        self.build(RTM_DELRULE, REMOVE_FLAGS, sequence)
    }

    fn build(&self, message_type: u16, flags: u16, sequence: u32) -> Bytes {
        let header = RuleHeader {
            family: self.family,
            src_len: (self.address.len() * 8) as u8,
            // The 32-bit id travels in FRA_TABLE; the 8-bit field cannot
            // hold a custom table.
            table: RT_TABLE_UNSPEC,
            action: FR_ACT_TO_TBL,
            ..Default::default()
        };
        MessageBuilder::new(message_type, flags, sequence)
            .family(&header.as_bytes())
            .attr(FRA_SRC, &self.address)
            .and_then(|b| b.attr_u32(FRA_PRIORITY, self.table))
            .and_then(|b| b.attr_u32(FRA_TABLE, self.table))
            .expect("rule request fits the transmit bound")
            .finish()
    }
}

/// Clone an observed main-table route verbatim and retarget it at a
/// custom table.
///
/// `RTA_TABLE` is rewritten in place when present. When the kernel
/// elided it the attribute is appended instead and the 8-bit header
/// field zeroed, since a custom table id does not fit in it. Flags
/// become install or removal flags according to the observed type, which
/// is preserved.
pub fn mirror_route(observed: &Message<'_>, table: u32, sequence: u32) -> Bytes {
    let flags =
        if observed.message_type() == RTM_DELROUTE { REMOVE_FLAGS } else { CREATE_FLAGS };
    let mut buf = BytesMut::from(observed.as_bytes());

    match attr::find_value_range(observed.as_bytes(), RouteHeader::LEN, RTA_TABLE) {
        Some(range) if range.len() == 4 => {
            buf[range].copy_from_slice(&table.to_ne_bytes());
        }
        _ => {
            buf[NetlinkHeader::SIZE + RouteHeader::TABLE_OFFSET] = RT_TABLE_UNSPEC;
            let padded = align(buf.len());
            buf.resize(padded, 0);
            buf.put_u16_ne((attr::ATTR_HEADER_LEN + 4) as u16);
            buf.put_u16_ne(RTA_TABLE);
            buf.put_slice(&table.to_ne_bytes());
        }
    }

    finish_clone(buf, observed.message_type(), flags, sequence)
}

/// Clone an observed message verbatim as a deletion request: same
/// payload, deleting type, removal flags, fresh sequence number.
pub fn clone_for_delete(observed: &Message<'_>, delete_type: u16, sequence: u32) -> Bytes {
    let buf = BytesMut::from(observed.as_bytes());
    finish_clone(buf, delete_type, REMOVE_FLAGS, sequence)
}

fn finish_clone(mut buf: BytesMut, message_type: u16, flags: u16, sequence: u32) -> Bytes {
    let header = NetlinkHeader {
        length: buf.len() as u32,
        message_type,
        flags,
        sequence_number: sequence,
        port_number: 0,
    };
    header.write_to(&mut buf);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use multihome_wire::{
        consts::{
            AF_INET, NLM_F_MULTI, RTA_GATEWAY, RTA_OIF, RTM_GETLINK, RTM_NEWROUTE, RT_TABLE_MAIN,
        },
        MessageIter,
    };

    fn decode(bytes: &Bytes) -> (NetlinkHeader, Vec<u8>) {
        let message = MessageIter::new(bytes).next().unwrap().unwrap();
        (*message.header(), message.payload().to_vec())
    }

    #[test]
    fn dump_request_shape() {
        let bytes = dump_request(RTM_GETLINK, 1_000_000_000);
        let (header, payload) = decode(&bytes);
        assert_eq!(header.length, 17);
        assert_eq!(header.message_type, RTM_GETLINK);
        assert_eq!(header.flags, DUMP_FLAGS);
        assert_eq!(header.sequence_number, 1_000_000_000);
        assert_eq!(payload, [AF_UNSPEC]);
    }

    #[test]
    fn source_rule_install_matches_the_contract() {
        let rule =
            SourceRule { family: AF_INET, address: vec![192, 0, 2, 5], table: 1000 };
        let bytes = rule.install(1_000_000_001);

        let message = MessageIter::new(&bytes).next().unwrap().unwrap();
        assert_eq!(message.message_type(), RTM_NEWRULE);
        assert_eq!(message.header().flags, CREATE_FLAGS);

        let header = RuleHeader::parse(message.payload()).unwrap();
        assert_eq!(header.family, AF_INET);
        assert_eq!(header.src_len, 32);
        assert_eq!(header.table, RT_TABLE_UNSPEC);
        assert_eq!(header.action, FR_ACT_TO_TBL);

        let attrs = message.attrs(RuleHeader::LEN);
        assert_eq!(attrs.clone().find(FRA_SRC).unwrap().value, &[192, 0, 2, 5]);
        assert_eq!(attrs.clone().find(FRA_PRIORITY).unwrap().as_u32(), Some(1000));
        assert_eq!(attrs.find(FRA_TABLE).unwrap().as_u32(), Some(1000));
    }

    #[test]
    fn source_rule_remove_uses_removal_flags() {
        let address = std::net::Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1).octets();
        let rule = SourceRule { family: 10, address: address.to_vec(), table: 2000 };
        let bytes = rule.remove(5);

        let message = MessageIter::new(&bytes).next().unwrap().unwrap();
        assert_eq!(message.message_type(), RTM_DELRULE);
        assert_eq!(message.header().flags, REMOVE_FLAGS);
        assert_eq!(RuleHeader::parse(message.payload()).unwrap().src_len, 128);
    }

    fn observed_route(table_attr: Option<u32>) -> Bytes {
        let header = RouteHeader {
            address_family: AF_INET,
            table: RT_TABLE_MAIN as u8,
            kind: 1,
            ..Default::default()
        };
        let mut builder = MessageBuilder::new(RTM_NEWROUTE, NLM_F_MULTI, 0)
            .family(&header.as_bytes())
            .attr(RTA_GATEWAY, &[192, 0, 2, 1])
            .unwrap()
            // An attribute type this code does not know about.
            .attr(99, &[0xde, 0xad, 0xbe, 0xef, 0x01])
            .unwrap()
            .attr_u32(RTA_OIF, 2)
            .unwrap();
        if let Some(table) = table_attr {
            builder = builder.attr_u32(RTA_TABLE, table).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn mirror_rewrites_table_in_place() {
        let original = observed_route(Some(RT_TABLE_MAIN));
        let observed = MessageIter::new(&original).next().unwrap().unwrap();
        let mirrored = mirror_route(&observed, 1000, 1_000_000_007);

        assert_eq!(mirrored.len(), original.len());
        let message = MessageIter::new(&mirrored).next().unwrap().unwrap();
        assert_eq!(message.message_type(), RTM_NEWROUTE);
        assert_eq!(message.header().flags, CREATE_FLAGS);
        assert_eq!(message.sequence_number(), 1_000_000_007);
        assert_eq!(message.attrs(RouteHeader::LEN).find(RTA_TABLE).unwrap().as_u32(), Some(1000));
        // Unknown attribute survives byte for byte.
        assert_eq!(
            message.attrs(RouteHeader::LEN).find(99).unwrap().value,
            &[0xde, 0xad, 0xbe, 0xef, 0x01]
        );
        // Everything but the header and the table value is untouched.
        let table_range =
            attr::find_value_range(&original, RouteHeader::LEN, RTA_TABLE).unwrap();
        for (offset, (a, b)) in original.iter().zip(mirrored.iter()).enumerate() {
            if offset >= NetlinkHeader::SIZE && !table_range.contains(&offset) {
                assert_eq!(a, b, "byte {offset} changed");
            }
        }
    }

    #[test]
    fn mirror_appends_table_when_elided() {
        let original = observed_route(None);
        let observed = MessageIter::new(&original).next().unwrap().unwrap();
        let mirrored = mirror_route(&observed, 1000, 7);

        let message = MessageIter::new(&mirrored).next().unwrap().unwrap();
        assert_eq!(message.header().length as usize, mirrored.len());
        let header = RouteHeader::parse(message.payload()).unwrap();
        assert_eq!(header.table, RT_TABLE_UNSPEC);
        assert_eq!(message.attrs(RouteHeader::LEN).find(RTA_TABLE).unwrap().as_u32(), Some(1000));
    }

    #[test]
    fn delete_clone_swaps_type_and_flags() {
        let original = observed_route(Some(1000));
        let observed = MessageIter::new(&original).next().unwrap().unwrap();
        let deletion = clone_for_delete(&observed, RTM_DELROUTE, 11);

        let message = MessageIter::new(&deletion).next().unwrap().unwrap();
        assert_eq!(message.message_type(), RTM_DELROUTE);
        assert_eq!(message.header().flags, REMOVE_FLAGS);
        assert_eq!(message.sequence_number(), 11);
        assert_eq!(message.payload(), observed.payload());
    }

    #[test]
    fn mirror_of_deletion_keeps_the_type() {
        let original = observed_route(Some(RT_TABLE_MAIN));
        let mut bytes = BytesMut::from(&original[..]);
        bytes[4..6].copy_from_slice(&RTM_DELROUTE.to_ne_bytes());
        let bytes = bytes.freeze();
        let observed = MessageIter::new(&bytes).next().unwrap().unwrap();

        let mirrored = mirror_route(&observed, 1000, 12);
        let message = MessageIter::new(&mirrored).next().unwrap().unwrap();
        assert_eq!(message.message_type(), RTM_DELROUTE);
        assert_eq!(message.header().flags, REMOVE_FLAGS);
    }
}
