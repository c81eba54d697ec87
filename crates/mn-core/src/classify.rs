//! Message classification.
//!
//! Pure mapping from one raw text chunk to exactly one [`DomainEvent`].
//! Matching is case-sensitive substring containment against a small fixed
//! vocabulary per channel, checked in priority order (first match wins).
//!
//! Classification operates on whatever text a single read produced; there is
//! no buffering across reads, so a keyword split across two reads is missed.
//! This matches the upstream daemons' behavior of writing whole messages per
//! send and is a documented limitation, not something we compensate for.

use crate::channel::ChannelKind;
use crate::event::DomainEvent;

/// Modem channel vocabulary, in priority order.
const MODEM_ALIVE: &str = "Modem Alive";
const MODEM_ASSERT: &str = "Modem Assert";
const MODEM_BLOCKED: &str = "Modem Blocked";
const AGDSP_ASSERT: &str = "AGDSP Assert";

/// System-log channel vocabulary.
const CP_DUMP_START: &str = "CP_DUMP_START";
const CP_DUMP_END: &str = "CP_DUMP_END";

/// Connectivity channel vocabulary.
const WCN_CP2_ALIVE: &str = "WCN-CP2-ALIVE";
const WCN_GE2_ALIVE: &str = "WCN-GE2-ALIVE";
const WCN_CP2_EXCEPTION: &str = "WCN-CP2-EXCEPTION";
const WCN_GE2_EXCEPTION: &str = "WCN-GE2-EXCEPTION";

/// Classifies one decoded chunk for the given channel.
///
/// Total: every input maps to exactly one event, falling back to
/// [`DomainEvent::Unrecognized`].
pub fn classify(kind: ChannelKind, raw: &str) -> DomainEvent {
    match kind {
        ChannelKind::Modem => classify_modem(raw),
        ChannelKind::SystemLog => classify_system_log(raw),
        ChannelKind::Connectivity => classify_connectivity(raw),
    }
}

fn classify_modem(raw: &str) -> DomainEvent {
    if raw.contains(MODEM_ALIVE) {
        DomainEvent::Alive(ChannelKind::Modem, raw.to_string())
    } else if raw.contains(MODEM_ASSERT) {
        DomainEvent::Assert(ChannelKind::Modem, raw.to_string())
    } else if raw.contains(MODEM_BLOCKED) {
        DomainEvent::Blocked(raw.to_string())
    } else if raw.contains(AGDSP_ASSERT) {
        DomainEvent::AgdspAssert(raw.to_string())
    } else {
        DomainEvent::Unrecognized
    }
}

fn classify_system_log(raw: &str) -> DomainEvent {
    if raw.contains(CP_DUMP_START) {
        DomainEvent::DumpStart
    } else if raw.contains(CP_DUMP_END) {
        DomainEvent::DumpEnd
    } else {
        DomainEvent::Unrecognized
    }
}

fn classify_connectivity(raw: &str) -> DomainEvent {
    if raw.contains(WCN_CP2_ALIVE) || raw.contains(WCN_GE2_ALIVE) {
        DomainEvent::Alive(ChannelKind::Connectivity, raw.to_string())
    } else if raw.contains(WCN_CP2_EXCEPTION) || raw.contains(WCN_GE2_EXCEPTION) {
        DomainEvent::Assert(ChannelKind::Connectivity, raw.to_string())
    } else {
        DomainEvent::Unrecognized
    }
}
