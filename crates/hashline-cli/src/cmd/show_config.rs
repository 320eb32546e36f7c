//! `hashline config` - print the effective configuration

use anyhow::Result;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    eprintln!("\n{}", format_table(config));
    Ok(())
}

fn format_table(config: &Config) -> Table {
    let signer = config.signer();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec!["Digest", signer.digest.as_str()]);
    table.add_row(vec![
        "Salt",
        if signer.salt.is_empty() {
            "not set"
        } else {
            "configured"
        },
    ]);
    table.add_row(vec![
        "Checksum latency",
        &format!("{}ms", signer.checksum_delay.as_millis()),
    ]);
    table.add_row(vec![
        "Digest latency",
        &format!("{}ms", signer.digest_delay.as_millis()),
    ]);
    table.add_row(vec!["Worker threads", &signer.worker_threads.to_string()]);
    table.add_row(vec![
        "Channel capacity",
        &signer.channel_capacity.to_string(),
    ]);
    table.add_row(vec![
        "Digest permits",
        &hashline_signer::DIGEST_PERMITS.to_string(),
    ]);
    table
}
