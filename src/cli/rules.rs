use std::path::PathBuf;
use std::process::ExitCode;

use plugin_validator::RuleSet;

pub(crate) fn run(format: super::Format, config: Option<PathBuf>) -> ExitCode {
    let loaded = super::load_config(config.as_deref()).and_then(|c| RuleSet::from_config(&c));
    let rules = match loaded {
        Ok(r) => r,
        Err(e) => return super::fail(&e),
    };

    match format {
        super::Format::Text => {
            for rule in rules.iter() {
                println!(
                    "{:<6}{:<14}{:<9}{}",
                    rule.id,
                    rule.scope().to_string(),
                    rule.severity.to_string(),
                    rule.title
                );
            }
        }
        super::Format::Json => {
            let list: Vec<_> = rules
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id,
                        "scope": r.scope().to_string(),
                        "severity": r.severity,
                        "title": r.title,
                    })
                })
                .collect();
            println!("{:#}", serde_json::Value::Array(list));
        }
    }
    ExitCode::SUCCESS
}
