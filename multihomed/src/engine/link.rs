//! Link events. Observed for the log only: handlers that need a link
//! identity resolve it from the interface index themselves.

use tracing::{info, warn};

use multihome_wire::{
    consts::{IFLA_IFNAME, RTM_DELLINK, RTM_NEWLINK},
    family::LinkHeader,
    Message,
};

use super::{event_name, Engine};
use crate::resolver::ResolveLinkName;

pub(super) fn handle<R: ResolveLinkName>(_engine: &mut Engine<R>, message: &Message<'_>) {
    let Some(header) = LinkHeader::parse(message.payload()) else {
        warn!("discarding truncated link message");
        return;
    };
    let name = message.attrs(LinkHeader::LEN).find(IFLA_IFNAME);
    info!(
        event = event_name(message.message_type(), RTM_NEWLINK, RTM_DELLINK),
        index = header.index,
        interface = name.and_then(|attr| attr.as_str()).unwrap_or("?"),
        "link event"
    );
}
