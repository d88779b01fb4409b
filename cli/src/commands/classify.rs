use lanwatch_core::classifier::{ClassifierInput, DeviceClassifier};

use crate::commands::ClassifyArgs;
use crate::terminal::{colors, print};
use colored::*;

pub fn classify(args: ClassifyArgs, _q_level: u8) -> anyhow::Result<()> {
    if args.hostname.is_none() && args.vendor.is_none() && args.ports.is_empty() {
        anyhow::bail!("give at least one of --hostname, --vendor or --port");
    }

    let input = ClassifierInput::new(args.hostname.as_deref(), args.vendor.as_deref())
        .with_ports(args.ports.iter().copied());
    let classification = DeviceClassifier::default().classify(&input);

    let mut details = vec![
        (
            "Type".to_string(),
            classification.device_type.label().color(colors::PRIMARY).bold(),
        ),
        (
            "Score".to_string(),
            format!("{:.2}", classification.confidence).normal(),
        ),
    ];
    for (key, value) in &classification.fingerprints {
        details.push((key.clone(), value.normal()));
    }

    print::tree_head(0, args.hostname.as_deref().unwrap_or("(no hostname)"));
    print::as_tree_one_level(details);
    Ok(())
}
