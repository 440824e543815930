//! Human-readable table rendering for `list` and `scan` output (spec
//! SPEC_FULL §2: teacher's own `comfy-table`/`owo-colors` pairing in
//! `turbomcp-cli/src/output.rs`).

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use inspector_core::{EnhancedPrompt, EnhancedResource, EnhancedResourceTemplate, EnhancedTool, RiskLevel};
use inspector_scan::ScanReport;
use owo_colors::OwoColorize;

pub fn tools_table(tools: &[EnhancedTool]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Tool", "Parameters", "Requires synthesis"]);
    for tool in tools {
        table.add_row(vec![
            Cell::new(&tool.tool.name),
            Cell::new(tool.analysis.count.to_string()),
            Cell::new(tool.analysis.requires_synthesis.to_string()),
        ]);
    }
    table
}

pub fn prompts_table(prompts: &[EnhancedPrompt]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Prompt", "Parameters"]);
    for prompt in prompts {
        table.add_row(vec![Cell::new(&prompt.prompt.name), Cell::new(prompt.analysis.count.to_string())]);
    }
    table
}

pub fn resources_table(resources: &[EnhancedResource], templates: &[EnhancedResourceTemplate]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Resource", "Kind", "Parameters"]);
    for resource in resources {
        table.add_row(vec![Cell::new(&resource.resource.uri), Cell::new("resource"), Cell::new("0")]);
    }
    for template in templates {
        table.add_row(vec![
            Cell::new(template.template.uri_or_template()),
            Cell::new("template"),
            Cell::new(template.analysis.count.to_string()),
        ]);
    }
    table
}

pub fn scan_summary_table(report: &ScanReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Artifact", "Risk", "Static matches", "Test results"]);
    for t in &report.tool_results {
        table.add_row(vec![
            Cell::new(&t.tool_name),
            Cell::new(colorize_risk(t.risk_level)),
            Cell::new(t.static_matches.len().to_string()),
            Cell::new(t.test_results.len().to_string()),
        ]);
    }
    for p in &report.prompt_results {
        table.add_row(vec![
            Cell::new(&p.prompt_name),
            Cell::new(colorize_risk(p.risk_level)),
            Cell::new(p.static_matches.len().to_string()),
            Cell::new(p.test_results.len().to_string()),
        ]);
    }
    for r in &report.resource_results {
        table.add_row(vec![
            Cell::new(&r.uri),
            Cell::new(colorize_risk(r.risk_level)),
            Cell::new(r.static_matches.len().to_string()),
            Cell::new(r.test_results.len().to_string()),
        ]);
    }
    table
}

fn colorize_risk(level: RiskLevel) -> String {
    match level {
        RiskLevel::Critical => level.as_str().red().bold().to_string(),
        RiskLevel::High => level.as_str().red().to_string(),
        RiskLevel::Medium => level.as_str().yellow().to_string(),
        RiskLevel::Low => level.as_str().green().to_string(),
    }
}
