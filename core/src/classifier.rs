//! # Device classification
//!
//! An ordered list of [`Rule`]s is walked top to bottom and the first match
//! decides the [`DeviceType`]. Hostname rules come first, then vendor rules,
//! then open-port signatures.
//!
//! Confidence is additive over evidence classes that agree with the chosen
//! type, so a host whose name, vendor and ports all say "printer" scores
//! higher than one identified by name alone.

use std::collections::{BTreeMap, BTreeSet};

use lanwatch_common::device::{Device, DeviceType, Service};
use lanwatch_common::services::ServiceKind;

/// Extra confidence when more than one distinct hostname keyword agrees.
const HOSTNAME_AGREEMENT_BONUS: f32 = 0.2;

/// Confidence of an unknown device with no evidence at all.
const UNKNOWN_FLOOR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Evidence {
    Hostname,
    Vendor,
    Ports,
}

impl Evidence {
    pub fn weight(self) -> f32 {
        match self {
            Evidence::Hostname => 0.6,
            Evidence::Vendor => 0.25,
            Evidence::Ports => 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Case-insensitive substring of the hostname or vendor.
    Contains(&'static str),
    /// Every listed port is open.
    AllPorts(&'static [u16]),
    /// At least one listed port is open.
    AnyPort(&'static [u16]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub evidence: Evidence,
    pub matcher: Matcher,
    pub device_type: DeviceType,
    pub weight: f32,
}

impl Rule {
    pub fn new(evidence: Evidence, matcher: Matcher, device_type: DeviceType) -> Self {
        Self {
            evidence,
            matcher,
            device_type,
            weight: evidence.weight(),
        }
    }

    fn matches(&self, input: &ClassifierInput) -> bool {
        let text = match self.evidence {
            Evidence::Hostname => input.hostname.as_deref(),
            Evidence::Vendor => input.vendor.as_deref(),
            Evidence::Ports => None,
        };
        match (&self.matcher, text) {
            (Matcher::Contains(needle), Some(text)) => text.contains(needle),
            (Matcher::Contains(_), None) => false,
            (Matcher::AllPorts(ports), _) => ports.iter().all(|p| input.ports.contains(p)),
            (Matcher::AnyPort(ports), _) => ports.iter().any(|p| input.ports.contains(p)),
        }
    }
}

/// The evidence a classification is computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierInput {
    /// Lower-cased.
    pub hostname: Option<String>,
    /// Lower-cased.
    pub vendor: Option<String>,
    /// Open ports plus the ports implied by known services.
    pub ports: BTreeSet<u16>,
    pub services: Vec<Service>,
}

impl ClassifierInput {
    pub fn new(hostname: Option<&str>, vendor: Option<&str>) -> Self {
        Self {
            hostname: hostname.map(str::to_lowercase),
            vendor: vendor.map(str::to_lowercase),
            ..Self::default()
        }
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.ports.extend(ports);
        self
    }

    /// Adds services, folding each one's port (or its usual port) into the
    /// port set.
    pub fn with_services(mut self, services: impl IntoIterator<Item = Service>) -> Self {
        for service in services {
            if let Some(port) = service.port.or(service.kind.default_port()) {
                self.ports.insert(port);
            }
            self.services.push(service);
        }
        self
    }

    pub fn from_device(device: &Device) -> Self {
        Self::new(device.hostname.as_deref(), device.manufacturer.as_deref())
            .with_ports(device.open_ports.iter().map(|port| port.number))
            .with_services(device.services.iter().cloned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub device_type: DeviceType,
    pub confidence: f32,
    pub fingerprints: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct DeviceClassifier {
    rules: Vec<Rule>,
}

impl DeviceClassifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, input: &ClassifierInput) -> Classification {
        let fingerprints = fingerprints(input);

        let Some(winner) = self.rules.iter().find(|rule| rule.matches(input)) else {
            return Classification {
                device_type: DeviceType::Unknown,
                confidence: UNKNOWN_FLOOR,
                fingerprints,
            };
        };
        let device_type = winner.device_type;

        let agreeing: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|rule| rule.device_type == device_type && rule.matches(input))
            .collect();

        let mut per_class: BTreeMap<Evidence, f32> = BTreeMap::new();
        for rule in &agreeing {
            let weight = per_class.entry(rule.evidence).or_insert(0.0);
            *weight = weight.max(rule.weight);
        }
        let mut confidence: f32 = per_class.values().sum();

        if distinct_hostname_keywords(&agreeing) > 1 {
            confidence += HOSTNAME_AGREEMENT_BONUS;
        }

        Classification {
            device_type,
            confidence: confidence.clamp(0.0, 1.0),
            fingerprints,
        }
    }

    pub fn classify_device(&self, device: &Device) -> Classification {
        self.classify(&ClassifierInput::from_device(device))
    }
}

/// Matched hostname keywords, not counting one found inside another
/// (`phone` within `iphone`).
fn distinct_hostname_keywords(agreeing: &[&Rule]) -> usize {
    let keywords: BTreeSet<&str> = agreeing
        .iter()
        .filter(|rule| rule.evidence == Evidence::Hostname)
        .filter_map(|rule| match rule.matcher {
            Matcher::Contains(needle) => Some(needle),
            _ => None,
        })
        .collect();
    keywords
        .iter()
        .filter(|keyword| {
            !keywords
                .iter()
                .any(|other| other != *keyword && other.contains(**keyword))
        })
        .count()
}

impl Default for DeviceClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

const HOSTNAME_RULES: &[(&[&str], DeviceType)] = &[
    (&["router", "gateway"], DeviceType::Router),
    (&["printer", "epson", "laserjet"], DeviceType::Printer),
    (&["tv", "chromecast", "roku", "appletv"], DeviceType::Tv),
    (&["playstation", "ps4", "ps5"], DeviceType::PlayStation),
    (&["laptop", "macbook"], DeviceType::Laptop),
    (&["desktop", "imac", "pc-"], DeviceType::Computer),
    (&["iphone", "phone", "android", "pixel", "galaxy"], DeviceType::Phone),
    (&["ipad", "tablet"], DeviceType::Tablet),
    (&["nas", "synology", "diskstation"], DeviceType::Nas),
    (&["cam", "camera"], DeviceType::Camera),
    (&["sonos", "homepod", "speaker"], DeviceType::Speaker),
];

const VENDOR_RULES: &[(&[&str], DeviceType)] = &[
    (
        &["netgear", "tp-link", "ubiquiti", "cisco", "linksys", "asus", "arris", "juniper", "mikrotik", "huawei", "zyxel", "d-link", "avm"],
        DeviceType::Router,
    ),
    (&["hewlett", "canon", "epson", "brother", "xerox"], DeviceType::Printer),
    (&["roku", "vizio", "lg electronics", "samsung electronics"], DeviceType::Tv),
    (&["sony interactive"], DeviceType::PlayStation),
    (&["synology", "qnap"], DeviceType::Nas),
    (&["intel", "dell", "lenovo", "micro-star"], DeviceType::Computer),
    (&["raspberry pi", "espressif", "tuya"], DeviceType::IoT),
];

const PORT_RULES: &[(Matcher, DeviceType)] = &[
    (Matcher::AllPorts(&[53, 67]), DeviceType::Router),
    (Matcher::AnyPort(&[631, 9100, 515]), DeviceType::Printer),
    (Matcher::AllPorts(&[8008, 8009]), DeviceType::Tv),
    (Matcher::AnyPort(&[445]), DeviceType::Computer),
];

/// The built-in cascade: one rule per hostname keyword, one per vendor
/// keyword, then the port signatures.
pub fn default_rules() -> Vec<Rule> {
    let mut rules = keyword_rules(Evidence::Hostname, HOSTNAME_RULES);
    rules.extend(keyword_rules(Evidence::Vendor, VENDOR_RULES));
    rules.extend(
        PORT_RULES
            .iter()
            .map(|(matcher, device_type)| Rule::new(Evidence::Ports, matcher.clone(), *device_type)),
    );
    rules
}

fn keyword_rules(evidence: Evidence, table: &[(&[&'static str], DeviceType)]) -> Vec<Rule> {
    table
        .iter()
        .flat_map(|(keywords, device_type)| {
            keywords
                .iter()
                .copied()
                .map(move |keyword| Rule::new(evidence, Matcher::Contains(keyword), *device_type))
        })
        .collect()
}

/// Display-only signals derived from ports and services.
pub fn fingerprints(input: &ClassifierInput) -> BTreeMap<String, String> {
    let mut fingerprints = BTreeMap::new();

    let has_kind = |kinds: &[ServiceKind]| input.services.iter().any(|s| kinds.contains(&s.kind));

    let ssh = input.ports.contains(&22) || has_kind(&[ServiceKind::Ssh, ServiceKind::Sftp]);
    fingerprints.insert("ssh_present".to_string(), ssh.to_string());

    let mut http_ports: BTreeSet<u16> = input
        .ports
        .iter()
        .copied()
        .filter(|port| ServiceKind::from_port(*port).is_some_and(ServiceKind::is_web))
        .collect();
    http_ports.extend(
        input
            .services
            .iter()
            .filter(|service| service.kind.is_web())
            .filter_map(|service| service.port),
    );
    let http_ports = http_ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",");
    fingerprints.insert("http_ports".to_string(), http_ports);

    let smb = input.ports.contains(&445) || has_kind(&[ServiceKind::Smb]);
    fingerprints.insert("smb_present".to_string(), smb.to_string());

    if !input.services.is_empty() {
        fingerprints.insert("mdns_services".to_string(), input.services.len().to_string());
    }

    fingerprints
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

    fn classify(hostname: Option<&str>, vendor: Option<&str>, ports: &[u16]) -> Classification {
        let input = ClassifierInput::new(hostname, vendor).with_ports(ports.iter().copied());
        DeviceClassifier::default().classify(&input)
    }

    #[test]
    fn router_hostname_with_two_keywords() {
        let result = classify(Some("home-router-gateway"), None, &[]);
        assert_eq!(result.device_type, DeviceType::Router);
        assert!(result.confidence > 0.7);
    }

    #[test]
    fn overlapping_keywords_are_one_signal() {
        let phone = classify(Some("kims-iphone"), None, &[]);
        assert_eq!(phone.device_type, DeviceType::Phone);
        assert!((phone.confidence - 0.6).abs() < 1e-6);

        let camera = classify(Some("porch-camera"), None, &[]);
        assert_eq!(camera.device_type, DeviceType::Camera);
        assert!((camera.confidence - 0.6).abs() < 1e-6);

        let both = classify(Some("iphone-android-test"), None, &[]);
        assert_eq!(both.device_type, DeviceType::Phone);
        assert!((both.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn duplicate_custom_keywords_count_once() {
        let rule = Rule::new(Evidence::Hostname, Matcher::Contains("sensor"), DeviceType::IoT);
        let classifier = DeviceClassifier::new(vec![rule.clone(), rule]);
        let result = classifier.classify(&ClassifierInput::new(Some("sensor-1"), None));
        assert!((result.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn single_hostname_keyword() {
        let result = classify(Some("Living-Room-Roku"), None, &[]);
        assert_eq!(result.device_type, DeviceType::Tv);
        assert!((result.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn hostname_wins_over_vendor_and_ports() {
        let result = classify(Some("office-printer"), Some("Dell Inc."), &[445]);
        assert_eq!(result.device_type, DeviceType::Printer);
        assert!((result.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn agreeing_evidence_adds_up() {
        let result = classify(Some("laserjet-2nd-floor"), Some("Hewlett Packard"), &[9100]);
        assert_eq!(result.device_type, DeviceType::Printer);
        assert!((result.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn confidence_is_clamped() {
        let result = classify(Some("printer-epson-laserjet"), Some("Epson"), &[631, 9100]);
        assert_eq!(result.device_type, DeviceType::Printer);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn vendor_only() {
        let result = classify(None, Some("Synology Incorporated"), &[]);
        assert_eq!(result.device_type, DeviceType::Nas);
        assert!((result.confidence - 0.25).abs() < 1e-6);
    }

    #[test]
    fn apple_vendor_alone_is_unknown() {
        let result = classify(None, Some("Apple, Inc."), &[]);
        assert_eq!(result.device_type, DeviceType::Unknown);
    }

    #[test]
    fn port_signatures() {
        assert_eq!(classify(None, None, &[53, 67, 80]).device_type, DeviceType::Router);
        assert_eq!(classify(None, None, &[53, 80]).device_type, DeviceType::Unknown);
        assert_eq!(classify(None, None, &[515]).device_type, DeviceType::Printer);
        assert_eq!(classify(None, None, &[8008, 8009]).device_type, DeviceType::Tv);
        assert_eq!(classify(None, None, &[8009]).device_type, DeviceType::Unknown);
        let smb = classify(None, None, &[445]);
        assert_eq!(smb.device_type, DeviceType::Computer);
        assert!((smb.confidence - 0.15).abs() < 1e-6);
    }

    #[test]
    fn services_fold_into_ports() {
        let input = ClassifierInput::new(None, None)
            .with_services([Service::new(ServiceKind::Ipp, None)]);
        let result = DeviceClassifier::default().classify(&input);
        assert_eq!(result.device_type, DeviceType::Printer);
    }

    #[test]
    fn nothing_known_is_unknown_with_floor() {
        let result = classify(None, None, &[]);
        assert_eq!(result.device_type, DeviceType::Unknown);
        assert!((result.confidence - 0.1).abs() < 1e-6);
    }

    #[test]
    fn fingerprints_describe_ports_and_services() {
        let input = ClassifierInput::new(None, None)
            .with_ports([22, 8080, 80])
            .with_services([
                Service::new(ServiceKind::Https, Some(443)),
                Service::new(ServiceKind::Smb, Some(445)),
            ]);
        let prints = fingerprints(&input);
        assert_eq!(prints["ssh_present"], "true");
        assert_eq!(prints["http_ports"], "80,443,8080");
        assert_eq!(prints["smb_present"], "true");
        assert_eq!(prints["mdns_services"], "2");
    }

    #[test]
    fn fingerprints_without_services() {
        let prints = fingerprints(&ClassifierInput::new(Some("box"), None));
        assert_eq!(prints["ssh_present"], "false");
        assert_eq!(prints["http_ports"], "");
        assert_eq!(prints["smb_present"], "false");
        assert!(!prints.contains_key("mdns_services"));
    }

    #[test]
    fn custom_rule_list() {
        let classifier = DeviceClassifier::new(vec![Rule::new(
            Evidence::Hostname,
            Matcher::Contains("thermostat"),
            DeviceType::IoT,
        )]);
        let input = ClassifierInput::new(Some("Hallway-Thermostat"), None);
        assert_eq!(classifier.classify(&input).device_type, DeviceType::IoT);
        assert_eq!(classifier.rules().len(), 1);
    }
}
