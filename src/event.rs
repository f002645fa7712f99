//! Scan result model and payload formatting helpers.
//!
//! An [`Event`] is one probe outcome as reported by the scan loop. Only
//! open ports are ever published; the other statuses exist so callers can
//! hand every result to the sink and let it filter.

use std::net::Ipv4Addr;

/// Classification of a probed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    Open,
    Closed,
    Arp,
}

/// One scan result.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    /// Unix timestamp of the probe response.
    pub timestamp: i64,
    pub status: PortStatus,
    pub addr: Ipv4Addr,
    /// IP protocol number (6 = TCP, 17 = UDP, ...).
    pub ip_proto: u8,
    pub port: u16,
    /// TCP flag bits from the classifying response.
    pub reason: u8,
    /// IP TTL observed on the response.
    pub ttl: u8,
}

impl Event {
    /// Comma-separated record published for an open port:
    /// `ip,port,proto,timestamp,ttl,reason`.
    pub fn payload(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.addr,
            self.port,
            ip_proto_name(self.ip_proto),
            self.timestamp,
            self.ttl,
            reason_string(self.reason)
        )
    }
}

/// Name of an IP protocol number as it appears in the published record.
pub fn ip_proto_name(ip_proto: u8) -> &'static str {
    match ip_proto {
        0 => "arp",
        1 => "icmp",
        6 => "tcp",
        17 => "udp",
        132 => "sctp",
        _ => "err",
    }
}

/// Render the TCP flag bits that classified a port, joined with `-`
/// (SYN|ACK becomes `syn-ack`). No bits set renders as the empty string.
pub fn reason_string(reason: u8) -> String {
    const FLAGS: [(u8, &str); 8] = [
        (0x01, "fin"),
        (0x02, "syn"),
        (0x04, "rst"),
        (0x08, "psh"),
        (0x10, "ack"),
        (0x20, "urg"),
        (0x40, "ece"),
        (0x80, "cwr"),
    ];

    let mut out = String::new();
    for (bit, name) in FLAGS {
        if reason & bit != 0 {
            if !out.is_empty() {
                out.push('-');
            }
            out.push_str(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_proto_names() {
        assert_eq!(ip_proto_name(6), "tcp");
        assert_eq!(ip_proto_name(17), "udp");
        assert_eq!(ip_proto_name(1), "icmp");
        assert_eq!(ip_proto_name(132), "sctp");
        assert_eq!(ip_proto_name(0), "arp");
        assert_eq!(ip_proto_name(200), "err");
    }

    #[test]
    fn test_reason_string_joins_flags() {
        assert_eq!(reason_string(0x02 | 0x10), "syn-ack");
        assert_eq!(reason_string(0x04 | 0x10), "rst-ack");
        assert_eq!(reason_string(0x02), "syn");
        assert_eq!(reason_string(0), "");
    }

    #[test]
    fn test_payload_record() {
        let event = Event {
            timestamp: 1700000000,
            status: PortStatus::Open,
            addr: Ipv4Addr::new(1, 2, 3, 4),
            ip_proto: 6,
            port: 80,
            reason: 0x12,
            ttl: 64,
        };
        assert_eq!(event.payload(), "1.2.3.4,80,tcp,1700000000,64,syn-ack");
    }
}
