//! MAC vendor lookups.

use std::collections::HashMap;
use std::sync::OnceLock;

use lanwatch_common::network::mac;
use lanwatch_common::vendors::VendorLookup;
use lanwatch_common::warn;
use mac_oui::Oui;

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("Failed to load OUI database: {e}");
                None
            }
        })
        .as_ref()
}

/// Looks vendors up in the IEEE OUI database bundled with `mac_oui`.
pub struct OuiVendorLookup;

impl VendorLookup for OuiVendorLookup {
    fn find_vendor(&self, mac: &str) -> Option<String> {
        let db = get_oui_db()?;
        let mac = mac::normalize(mac)?;
        match db.lookup_by_mac(&mac) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            _ => None,
        }
    }
}

/// Fixed OUI prefix table, keyed like `aa:bb:cc`.
#[derive(Debug, Clone, Default)]
pub struct StaticVendorLookup {
    prefixes: HashMap<String, String>,
}

impl StaticVendorLookup {
    pub fn new<P, V>(entries: impl IntoIterator<Item = (P, V)>) -> Self
    where
        P: AsRef<str>,
        V: Into<String>,
    {
        let prefixes = entries
            .into_iter()
            .filter_map(|(prefix, vendor)| {
                let prefix = normalize_prefix(prefix.as_ref())?;
                Some((prefix, vendor.into()))
            })
            .collect();
        Self { prefixes }
    }
}

/// Accepts `AA-BB-CC`, `aa:bb:cc` or a full MAC address.
fn normalize_prefix(prefix: &str) -> Option<String> {
    let prefix = prefix.trim().replace('-', ":").to_ascii_lowercase();
    let prefix = prefix.get(..8)?;
    mac::is_valid(&format!("{prefix}:00:00:00")).then(|| prefix.to_string())
}

impl VendorLookup for StaticVendorLookup {
    fn find_vendor(&self, mac: &str) -> Option<String> {
        let prefix = mac::oui_prefix(mac)?;
        self.prefixes.get(&prefix).cloned()
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
