use sa_domain::config::{Config, ConfigError, ConfigSeverity};

/// Validate the config, printing any issues.
///
/// Returns `false` when at least one error (not warning) was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    for issue in &issues {
        println!("{issue}");
    }

    let (error_count, warning_count) = count(&issues);
    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

fn count(issues: &[ConfigError]) -> (usize, usize) {
    let errors = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    (errors, issues.len() - errors)
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
    print!("{output}");
    Ok(())
}
