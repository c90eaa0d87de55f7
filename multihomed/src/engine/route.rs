//! Route events.
//!
//! Operational: replicate main-table changes on a managed outgoing
//! interface into that interface's custom table, as a verbatim clone with
//! the table retargeted. Reset: delete whatever sits in a custom table.

use tracing::{debug, info, trace, warn};

use multihome_netlink::requests;
use multihome_wire::{
    consts::{RTA_OIF, RTA_TABLE, RTM_DELROUTE, RTM_NEWROUTE, RT_TABLE_MAIN},
    family::RouteHeader,
    Message,
};

use super::{event_name, Engine, Mode};
use crate::resolver::ResolveLinkName;

pub(super) fn handle<R: ResolveLinkName>(engine: &mut Engine<R>, message: &Message<'_>) {
    let Some(header) = RouteHeader::parse(message.payload()) else {
        warn!("discarding truncated route message");
        return;
    };
    // The 32-bit attribute overrides the 8-bit header field.
    let table = message
        .attrs(RouteHeader::LEN)
        .find(RTA_TABLE)
        .and_then(|attr| attr.as_u32())
        .unwrap_or(header.table as u32);
    debug!(
        event = event_name(message.message_type(), RTM_NEWROUTE, RTM_DELROUTE),
        table,
        dst_len = header.destination_prefix_length,
        "route event"
    );

    match engine.mode {
        Mode::Operational => mirror(engine, message, table),
        Mode::Reset => reset(engine, message, table),
        Mode::Undefined => {}
    }
}

fn mirror<R: ResolveLinkName>(engine: &mut Engine<R>, message: &Message<'_>, table: u32) {
    if table != RT_TABLE_MAIN {
        return;
    }
    if !matches!(message.message_type(), RTM_NEWROUTE | RTM_DELROUTE) {
        return;
    }
    let Some(oif) = message.attrs(RouteHeader::LEN).find(RTA_OIF).and_then(|a| a.as_u32()) else {
        return;
    };
    let Some(name) = engine.resolver.link_name(oif) else {
        return;
    };
    let Some(custom) = engine.mapping.table_for(&name) else {
        trace!(interface = %name, "route on unmanaged interface");
        return;
    };

    let sequence = engine.sequences.next();
    info!(
        event = event_name(message.message_type(), RTM_NEWROUTE, RTM_DELROUTE),
        interface = %name,
        table = custom,
        sequence,
        "mirroring main-table route"
    );
    engine.queue.push(requests::mirror_route(message, custom, sequence));
}

fn reset<R: ResolveLinkName>(engine: &mut Engine<R>, message: &Message<'_>, table: u32) {
    if !engine.mapping.contains_table(table) {
        return;
    }
    let sequence = engine.sequences.next();
    info!(table, sequence, "removing mirrored route");
    engine.queue.push(requests::clone_for_delete(message, RTM_DELROUTE, sequence));
}
