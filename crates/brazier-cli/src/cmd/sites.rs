use crate::output::{print_json, print_table};
use anyhow::Context;
use brazier_core::config::Config;
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(config_path).context("failed to load config")?;

    if json {
        return print_json(&config.sites);
    }

    if config.sites.is_empty() {
        println!("No sites configured.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = config
        .sites
        .iter()
        .map(|site| {
            vec![
                site.name.clone(),
                site.brazier.to_string(),
                site.roots.to_string(),
                site.herb_roots.to_string(),
                site.bank.to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "BRAZIER", "ROOTS", "HERB ROOTS", "BANK"], &rows);
    Ok(())
}
