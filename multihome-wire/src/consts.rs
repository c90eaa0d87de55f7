//! Rtnetlink protocol constants.
//!
//! Values from `<linux/netlink.h>`, `<linux/rtnetlink.h>` and
//! `<linux/fib_rules.h>`. Only the subset this daemon speaks is defined
//! here; everything else is treated as opaque and skipped.

/// Control message: no operation.
pub const NLMSG_NOOP: u16 = 1;
/// Control message: error or acknowledgement (`error == 0`).
pub const NLMSG_ERROR: u16 = 2;
/// Control message: end of a multipart dump.
pub const NLMSG_DONE: u16 = 3;
/// Control message: receive buffer overrun.
pub const NLMSG_OVERRUN: u16 = 4;

// Message types, from <linux/rtnetlink.h>.
pub const RTM_NEWLINK: u16 = 16;
pub const RTM_DELLINK: u16 = 17;
pub const RTM_GETLINK: u16 = 18;
pub const RTM_NEWADDR: u16 = 20;
pub const RTM_DELADDR: u16 = 21;
pub const RTM_GETADDR: u16 = 22;
pub const RTM_NEWROUTE: u16 = 24;
pub const RTM_DELROUTE: u16 = 25;
pub const RTM_GETROUTE: u16 = 26;
pub const RTM_NEWRULE: u16 = 32;
pub const RTM_DELRULE: u16 = 33;
pub const RTM_GETRULE: u16 = 34;

// Header flag bits, from <linux/netlink.h>.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
/// `NLM_F_ROOT | NLM_F_MATCH`: return the whole table.
pub const NLM_F_DUMP: u16 = 0x100 | 0x200;
// Modifiers to NEW requests.
pub const NLM_F_REPLACE: u16 = 0x100;
pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;

// Multicast group bits for sockaddr_nl.nl_groups, from <linux/rtnetlink.h>.
pub const RTMGRP_LINK: u32 = 0x01;
pub const RTMGRP_NOTIFY: u32 = 0x02;
pub const RTMGRP_IPV4_IFADDR: u32 = 0x10;
pub const RTMGRP_IPV4_ROUTE: u32 = 0x40;
pub const RTMGRP_IPV6_IFADDR: u32 = 0x100;
pub const RTMGRP_IPV6_ROUTE: u32 = 0x400;

// Address families, from <sys/socket.h>.
pub const AF_UNSPEC: u8 = 0;
pub const AF_INET: u8 = 2;
pub const AF_INET6: u8 = 10;

// Link attributes, from <linux/if_link.h>.
/// NUL-terminated interface name.
pub const IFLA_IFNAME: u16 = 3;

// Address attributes, from <linux/if_addr.h>.
/// Interface address, 4 bytes (v4) or 16 bytes (v6).
pub const IFA_ADDRESS: u16 = 1;

// Route attributes, from <linux/rtnetlink.h>.
pub const RTA_DST: u16 = 1;
pub const RTA_OIF: u16 = 4;
pub const RTA_GATEWAY: u16 = 5;
pub const RTA_PREFSRC: u16 = 7;
/// 32-bit table identifier; overrides the 8-bit field in `rtmsg`.
pub const RTA_TABLE: u16 = 15;

// FIB rule attributes, from <linux/fib_rules.h>.
/// Source address to match, 4 or 16 bytes.
pub const FRA_SRC: u16 = 2;
pub const FRA_PRIORITY: u16 = 6;
/// 32-bit table identifier; overrides the 8-bit field in `fib_rule_hdr`.
pub const FRA_TABLE: u16 = 15;

/// Rule action: consult the table named by `FRA_TABLE`.
pub const FR_ACT_TO_TBL: u8 = 1;

// Well-known routing tables, from <linux/rtnetlink.h>.
pub const RT_TABLE_UNSPEC: u8 = 0;
/// The kernel's default table, the source of truth for the mirror.
pub const RT_TABLE_MAIN: u32 = 254;
