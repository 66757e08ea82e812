//! `residency config check` - validate and print the effective configuration.

use residency_core::ResidencyConfig;
use std::path::Path;

pub fn run(path: Option<&Path>) -> anyhow::Result<()> {
    let rendered = render(path)?;
    println!("✔ Configuration is valid");
    println!();
    print!("{rendered}");
    Ok(())
}

/// Load, validate and serialize with secrets masked.
fn render(path: Option<&Path>) -> anyhow::Result<String> {
    let config = ResidencyConfig::load(path)?;
    config.validate()?;
    Ok(serde_yaml::to_string(&config.redacted())?)
}
