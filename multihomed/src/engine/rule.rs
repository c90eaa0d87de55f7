//! Policy-rule events. Quiet in steady state; during teardown every rule
//! targeting a custom table is deleted as observed.

use tracing::{debug, info, warn};

use multihome_netlink::requests;
use multihome_wire::{
    consts::{FRA_PRIORITY, FRA_TABLE, RTM_DELRULE, RTM_NEWRULE},
    family::RuleHeader,
    Message,
};

use super::{event_name, Engine, Mode};
use crate::resolver::ResolveLinkName;

pub(super) fn handle<R: ResolveLinkName>(engine: &mut Engine<R>, message: &Message<'_>) {
    let Some(header) = RuleHeader::parse(message.payload()) else {
        warn!("discarding truncated rule message");
        return;
    };
    let attrs = message.attrs(RuleHeader::LEN);
    let table =
        attrs.clone().find(FRA_TABLE).and_then(|a| a.as_u32()).unwrap_or(header.table as u32);
    let priority = attrs.find(FRA_PRIORITY).and_then(|a| a.as_u32());
    debug!(
        event = event_name(message.message_type(), RTM_NEWRULE, RTM_DELRULE),
        table,
        priority,
        "rule event"
    );

    if engine.mode != Mode::Reset || !engine.mapping.contains_table(table) {
        return;
    }
    let sequence = engine.sequences.next();
    info!(table, sequence, "removing source rule");
    engine.queue.push(requests::clone_for_delete(message, RTM_DELRULE, sequence));
}
