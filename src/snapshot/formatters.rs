use super::DaoSnapshot;
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;

const DESCRIPTION_COLUMN_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

pub fn format_snapshot(snapshot: &DaoSnapshot, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_snapshot_table(snapshot),
        OutputFormat::Json => format_snapshot_json(snapshot),
        OutputFormat::Csv => format_proposals_csv(snapshot),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn format_snapshot_table(snapshot: &DaoSnapshot) -> String {
    let mut summary = Table::new();
    summary
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Metric", "Value"]);
    summary.add_row(vec![Cell::new("Network"), Cell::new(&snapshot.network)]);
    summary.add_row(vec![Cell::new("Block"), Cell::new(snapshot.block_number)]);
    summary.add_row(vec![
        Cell::new("Proposals"),
        Cell::new(snapshot.data.proposals.len()),
    ]);
    summary.add_row(vec![
        Cell::new("Citizens"),
        Cell::new(&snapshot.data.citizens_count),
    ]);
    summary.add_row(vec![
        Cell::new("Treasury Balance"),
        Cell::new(format!("{} ETH", snapshot.data.treasury_balance_eth)),
    ]);

    if snapshot.data.proposals.is_empty() {
        return format!("{summary}\nNo proposals found.");
    }

    let mut proposals = Table::new();
    proposals
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "ID",
            "Proposer",
            "Status",
            "For",
            "Against",
            "Abstain",
            "Description",
        ]);

    for p in &snapshot.data.proposals {
        proposals.add_row(vec![
            Cell::new(&p.id),
            Cell::new(&p.proposer),
            Cell::new(p.status_label),
            Cell::new(&p.votes.for_votes),
            Cell::new(&p.votes.against),
            Cell::new(&p.votes.abstain),
            Cell::new(truncate(&p.description, DESCRIPTION_COLUMN_CHARS)),
        ]);
    }

    format!("{summary}\n{proposals}")
}

fn format_snapshot_json(snapshot: &DaoSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
}

fn format_proposals_csv(snapshot: &DaoSnapshot) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "id",
        "proposer",
        "status",
        "for_votes",
        "against_votes",
        "abstain_votes",
        "start_time",
        "end_time",
        "description",
    ]);

    for p in &snapshot.data.proposals {
        let _ = wtr.write_record([
            p.id.as_str(),
            p.proposer.as_str(),
            p.status_label,
            p.votes.for_votes.as_str(),
            p.votes.against.as_str(),
            p.votes.abstain.as_str(),
            p.timeline.start.as_str(),
            p.timeline.end.as_str(),
            p.description.as_str(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}
