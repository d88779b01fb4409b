use std::sync::LazyLock;

use regex::Regex;

static MAC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").expect("static MAC pattern")
});

/// Six hex pairs separated by `:` or `-`.
pub fn is_valid(mac: &str) -> bool {
    MAC_PATTERN.is_match(mac)
}

/// Lower-case, colon separated form, or `None` if `mac` is not a MAC address.
pub fn normalize(mac: &str) -> Option<String> {
    if !is_valid(mac) {
        return None;
    }
    Some(mac.replace('-', ":").to_ascii_lowercase())
}

/// First three octets, used for vendor lookups.
pub fn oui_prefix(mac: &str) -> Option<String> {
    let normalized = normalize(mac)?;
    Some(normalized[..8].to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_separators_and_length() {
        assert!(is_valid("aa:bb:cc:dd:ee:ff"));
        assert!(is_valid("AA-BB-CC-DD-EE-FF"));
        assert!(!is_valid("aa:bb:cc:dd:ee"));
        assert!(!is_valid("aa:bb:cc:dd:ee:ff:00"));
        assert!(!is_valid("a:b:c:d:e:f"));
        assert!(!is_valid("(incomplete)"));
        assert!(!is_valid("gg:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn normalizes_to_lower_colon_form() {
        assert_eq!(normalize("AA-BB-CC-0D-EE-FF").as_deref(), Some("aa:bb:cc:0d:ee:ff"));
        assert_eq!(normalize("nope"), None);
    }

    #[test]
    fn oui_prefix_takes_three_octets() {
        assert_eq!(oui_prefix("B8:27:EB:12:34:56").as_deref(), Some("b8:27:eb"));
    }
}
