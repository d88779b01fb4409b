//! # Service catalog
//!
//! Canonical service kinds and the two lookup tables that feed them: mDNS
//! service-type strings (`_ipp._tcp`) and well-known TCP ports. Anything not
//! in these tables is not a service as far as the registry is concerned.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    Http,
    Https,
    Ssh,
    Sftp,
    Ftp,
    Telnet,
    Smtp,
    Dns,
    Pop3,
    Imap,
    Imaps,
    Pop3s,
    Smb,
    Afp,
    Nfs,
    Rdp,
    Vnc,
    AirPlay,
    Raop,
    GoogleCast,
    Ipp,
    Ipps,
    Printer,
    PdlDatastream,
    HomeKit,
    Spotify,
    Sonos,
    Daap,
    Workstation,
}

impl ServiceKind {
    /// Maps an mDNS service type (`_http._tcp`, `_http._tcp.local.`) to a kind.
    pub fn from_mdns_type(service_type: &str) -> Option<Self> {
        let name = service_type.trim_end_matches('.').trim_start_matches('_');
        let name = name.split('.').next().unwrap_or_default();

        let kind = match name.to_ascii_lowercase().as_str() {
            "http" => ServiceKind::Http,
            "https" => ServiceKind::Https,
            "ssh" => ServiceKind::Ssh,
            "sftp-ssh" => ServiceKind::Sftp,
            "ftp" => ServiceKind::Ftp,
            "telnet" => ServiceKind::Telnet,
            "smb" => ServiceKind::Smb,
            "afpovertcp" => ServiceKind::Afp,
            "nfs" => ServiceKind::Nfs,
            "rdp" => ServiceKind::Rdp,
            "rfb" => ServiceKind::Vnc,
            "airplay" => ServiceKind::AirPlay,
            "raop" => ServiceKind::Raop,
            "googlecast" => ServiceKind::GoogleCast,
            "ipp" => ServiceKind::Ipp,
            "ipps" => ServiceKind::Ipps,
            "printer" => ServiceKind::Printer,
            "pdl-datastream" => ServiceKind::PdlDatastream,
            "hap" | "homekit" => ServiceKind::HomeKit,
            "spotify-connect" => ServiceKind::Spotify,
            "sonos" => ServiceKind::Sonos,
            "daap" => ServiceKind::Daap,
            "workstation" => ServiceKind::Workstation,
            _ => return None,
        };
        Some(kind)
    }

    /// Maps a well-known TCP port to a kind.
    pub fn from_port(port: u16) -> Option<Self> {
        let kind = match port {
            21 => ServiceKind::Ftp,
            22 => ServiceKind::Ssh,
            23 => ServiceKind::Telnet,
            25 => ServiceKind::Smtp,
            53 => ServiceKind::Dns,
            80 | 8000 | 8080 => ServiceKind::Http,
            110 => ServiceKind::Pop3,
            143 => ServiceKind::Imap,
            443 | 8443 => ServiceKind::Https,
            445 => ServiceKind::Smb,
            515 => ServiceKind::Printer,
            548 => ServiceKind::Afp,
            631 => ServiceKind::Ipp,
            993 => ServiceKind::Imaps,
            995 => ServiceKind::Pop3s,
            2049 => ServiceKind::Nfs,
            3389 => ServiceKind::Rdp,
            3689 => ServiceKind::Daap,
            5900 => ServiceKind::Vnc,
            7000 => ServiceKind::AirPlay,
            8009 => ServiceKind::GoogleCast,
            9100 => ServiceKind::PdlDatastream,
            _ => return None,
        };
        Some(kind)
    }

    /// Port the service usually listens on.
    pub fn default_port(self) -> Option<u16> {
        let port = match self {
            ServiceKind::Http => 80,
            ServiceKind::Https => 443,
            ServiceKind::Ssh | ServiceKind::Sftp => 22,
            ServiceKind::Ftp => 21,
            ServiceKind::Telnet => 23,
            ServiceKind::Smtp => 25,
            ServiceKind::Dns => 53,
            ServiceKind::Pop3 => 110,
            ServiceKind::Imap => 143,
            ServiceKind::Imaps => 993,
            ServiceKind::Pop3s => 995,
            ServiceKind::Smb => 445,
            ServiceKind::Afp => 548,
            ServiceKind::Nfs => 2049,
            ServiceKind::Rdp => 3389,
            ServiceKind::Vnc => 5900,
            ServiceKind::AirPlay => 7000,
            ServiceKind::Raop => 5000,
            ServiceKind::GoogleCast => 8009,
            ServiceKind::Ipp | ServiceKind::Ipps => 631,
            ServiceKind::Printer => 515,
            ServiceKind::PdlDatastream => 9100,
            ServiceKind::Daap => 3689,
            ServiceKind::HomeKit
            | ServiceKind::Spotify
            | ServiceKind::Sonos
            | ServiceKind::Workstation => return None,
        };
        Some(port)
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::Http => "HTTP",
            ServiceKind::Https => "HTTPS",
            ServiceKind::Ssh => "SSH",
            ServiceKind::Sftp => "SFTP",
            ServiceKind::Ftp => "FTP",
            ServiceKind::Telnet => "Telnet",
            ServiceKind::Smtp => "SMTP",
            ServiceKind::Dns => "DNS",
            ServiceKind::Pop3 => "POP3",
            ServiceKind::Imap => "IMAP",
            ServiceKind::Imaps => "IMAPS",
            ServiceKind::Pop3s => "POP3S",
            ServiceKind::Smb => "SMB",
            ServiceKind::Afp => "AFP",
            ServiceKind::Nfs => "NFS",
            ServiceKind::Rdp => "RDP",
            ServiceKind::Vnc => "VNC",
            ServiceKind::AirPlay => "AirPlay",
            ServiceKind::Raop => "RAOP",
            ServiceKind::GoogleCast => "Google Cast",
            ServiceKind::Ipp => "IPP",
            ServiceKind::Ipps => "IPPS",
            ServiceKind::Printer => "LPD",
            ServiceKind::PdlDatastream => "JetDirect",
            ServiceKind::HomeKit => "HomeKit",
            ServiceKind::Spotify => "Spotify Connect",
            ServiceKind::Sonos => "Sonos",
            ServiceKind::Daap => "DAAP",
            ServiceKind::Workstation => "Workstation",
        }
    }

    pub fn is_web(self) -> bool {
        matches!(self, ServiceKind::Http | ServiceKind::Https)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Short name and description for a scanned port. Unknown ports get `("", "")`.
pub fn port_info(port: u16) -> (&'static str, &'static str) {
    match port {
        21 => ("FTP", "File Transfer Protocol"),
        22 => ("SSH", "Secure Shell"),
        23 => ("Telnet", "Remote Terminal"),
        25 => ("SMTP", "Mail Transfer"),
        53 => ("DNS", "Domain Name Service"),
        67 => ("DHCP", "Dynamic Host Configuration"),
        80 => ("HTTP", "Web Server"),
        110 => ("POP3", "Mail Retrieval"),
        139 => ("NetBIOS", "NetBIOS Session"),
        143 => ("IMAP", "Internet Message Access"),
        443 => ("HTTPS", "Secure Web Server"),
        445 => ("SMB", "File Sharing"),
        515 => ("LPD", "Line Printer Daemon"),
        548 => ("AFP", "Apple File Sharing"),
        631 => ("IPP", "Internet Printing"),
        993 => ("IMAPS", "Secure IMAP"),
        995 => ("POP3S", "Secure POP3"),
        2049 => ("NFS", "Network File System"),
        3389 => ("RDP", "Remote Desktop"),
        3689 => ("DAAP", "Media Sharing"),
        5900 => ("VNC", "Remote Display"),
        7000 => ("AirPlay", "Media Streaming"),
        8000 => ("HTTP-Alt", "Alternative Web"),
        8008 => ("Cast", "Cast Device Web"),
        8009 => ("Cast", "Cast Control"),
        8080 => ("HTTP-Proxy", "Web Proxy"),
        8443 => ("HTTPS-Alt", "Alternative HTTPS"),
        9100 => ("JetDirect", "Printer Service"),
        _ => ("", ""),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
