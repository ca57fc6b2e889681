//! Parsing of user-facing link addresses into `mavlink` connection strings.

use std::fmt;

use mavsnap_core::{MavsnapError, Result};

/// Where the telemetry comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAddress {
    /// Serial device at a fixed baud rate.
    Serial { device: String, baud: u32 },
    /// Listen for UDP datagrams on `host:port`.
    UdpIn(String),
    /// Send to (and receive from) a UDP peer at `host:port`.
    UdpOut(String),
    /// Accept a TCP connection on `host:port`.
    TcpIn(String),
    /// Connect to a TCP server at `host:port`.
    TcpOut(String),
}

impl LinkAddress {
    /// Parse `input`; bare device paths use `default_baud`.
    ///
    /// Accepted forms: `/dev/ttyUSB0`, `serial:/dev/ttyUSB0:57600`,
    /// `udpin:0.0.0.0:14550`, `udpout:host:port` (alias `udp:`),
    /// `tcpin:host:port`, `tcpout:host:port` (alias `tcp:`).
    pub fn parse(input: &str, default_baud: u32) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MavsnapError::InvalidAddress(input.to_string()));
        }

        let Some((scheme, rest)) = input.split_once(':') else {
            return Ok(Self::Serial {
                device: input.to_string(),
                baud: default_baud,
            });
        };

        match scheme {
            "serial" => parse_serial(rest, default_baud),
            "udpin" => Ok(Self::UdpIn(host_port(input, rest)?)),
            "udpout" | "udp" => Ok(Self::UdpOut(host_port(input, rest)?)),
            "tcpin" => Ok(Self::TcpIn(host_port(input, rest)?)),
            "tcpout" | "tcp" => Ok(Self::TcpOut(host_port(input, rest)?)),
            // by-id device names can contain a colon
            _ if input.starts_with('/') => Ok(Self::Serial {
                device: input.to_string(),
                baud: default_baud,
            }),
            _ => Err(MavsnapError::InvalidAddress(input.to_string())),
        }
    }

    /// Connection string understood by [`mavlink::connect`].
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::Serial { device, baud } => format!("serial:{device}:{baud}"),
            Self::UdpIn(addr) => format!("udpin:{addr}"),
            Self::UdpOut(addr) => format!("udpout:{addr}"),
            Self::TcpIn(addr) => format!("tcpin:{addr}"),
            Self::TcpOut(addr) => format!("tcpout:{addr}"),
        }
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_connection_string())
    }
}

fn parse_serial(rest: &str, default_baud: u32) -> Result<LinkAddress> {
    if let Some((device, baud)) = rest.rsplit_once(':') {
        if let Ok(baud) = baud.parse::<u32>() {
            if device.is_empty() {
                return Err(MavsnapError::InvalidAddress(format!("serial:{rest}")));
            }
            return Ok(LinkAddress::Serial {
                device: device.to_string(),
                baud,
            });
        }
    }

    if rest.is_empty() {
        return Err(MavsnapError::InvalidAddress("serial:".to_string()));
    }
    Ok(LinkAddress::Serial {
        device: rest.to_string(),
        baud: default_baud,
    })
}

fn host_port(input: &str, rest: &str) -> Result<String> {
    let valid = rest
        .rsplit_once(':')
        .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
        .unwrap_or(false);

    if valid {
        Ok(rest.to_string())
    } else {
        Err(MavsnapError::InvalidAddress(input.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
