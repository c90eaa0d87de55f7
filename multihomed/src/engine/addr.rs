//! Address events: one source-address policy rule per managed,
//! non-link-local address.

use tracing::{debug, info, trace, warn};

use multihome_netlink::requests::SourceRule;
use multihome_wire::{
    consts::{AF_INET, AF_INET6, IFA_ADDRESS, RTM_DELADDR, RTM_NEWADDR},
    family::AddressHeader,
    Message,
};

use super::{event_name, Engine, Mode};
use crate::resolver::ResolveLinkName;

pub(super) fn handle<R: ResolveLinkName>(engine: &mut Engine<R>, message: &Message<'_>) {
    let Some(header) = AddressHeader::parse(message.payload()) else {
        warn!("discarding truncated address message");
        return;
    };
    let name = engine.resolver.link_name(header.index);
    debug!(
        event = event_name(message.message_type(), RTM_NEWADDR, RTM_DELADDR),
        index = header.index,
        interface = name.as_deref().unwrap_or("?"),
        prefix_len = header.prefix_len,
        "address event"
    );

    if engine.mode != Mode::Operational {
        return;
    }
    if !matches!(message.message_type(), RTM_NEWADDR | RTM_DELADDR) {
        return;
    }
    let Some(address) = message.attrs(AddressHeader::LEN).find(IFA_ADDRESS) else {
        return;
    };
    let address = address.value;
    if !family_matches(header.family, address) {
        debug!(family = header.family, len = address.len(), "address family mismatch, ignoring");
        return;
    }
    if is_ipv6_link_local(header.family, address) {
        trace!("ignoring link-local address");
        return;
    }
    let Some(name) = name else {
        return;
    };
    let Some(table) = engine.mapping.table_for(&name) else {
        trace!(interface = %name, "interface not managed");
        return;
    };

    let rule = SourceRule { family: header.family, address: address.to_vec(), table };
    let sequence = engine.sequences.next();
    let request = if message.message_type() == RTM_NEWADDR {
        info!(interface = %name, table, sequence, "installing source rule");
        rule.install(sequence)
    } else {
        info!(interface = %name, table, sequence, "removing source rule");
        rule.remove(sequence)
    };
    engine.queue.push(request);
}

fn family_matches(family: u8, address: &[u8]) -> bool {
    matches!((family, address.len()), (AF_INET, 4) | (AF_INET6, 16))
}

/// `fe80::/10`. Link-local addresses never get a source rule: they are
/// not routable through a custom table.
fn is_ipv6_link_local(family: u8, address: &[u8]) -> bool {
    family == AF_INET6 && address[0] == 0xfe && (address[1] & 0xc0) == 0x80
}
