//! Output formatting for CLI

use crate::convert::ConversionReport;
use crate::export::WrittenFile;
use crate::models::{EdgeClass, RecordArena};
use crate::resolver::ResolveStats;
use std::collections::BTreeMap;

/// Format a conversion report summary
pub fn format_report(report: &ConversionReport, written: &[WrittenFile]) -> String {
    let mut output = String::new();
    let stats = &report.stats;

    output.push_str(&format!(
        "\nRead {} record(s), {} edge(s) from {} root(s)\n",
        stats.records, stats.edges, stats.roots
    ));
    if stats.stubs > 0 {
        output.push_str(&format!("  Stub records: {}\n", stats.stubs));
    }
    output.push_str(&format!(
        "  Edges: {} embed, {} link, {} denormalize\n",
        stats.resolution.embedded, stats.resolution.linked, stats.resolution.denormalized
    ));

    for (format, counts) in &stats.formats {
        output.push_str(&format!(
            "\n{}: {} succeeded, {} failed\n",
            format, counts.succeeded, counts.failed
        ));
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        output.push_str("\n⚠️  Failed entities:\n");
        for result in failures {
            if let Some(failure) = result.failure_info() {
                output.push_str(&format!(
                    "  - [{}] {} ({}): {}\n",
                    result.format, result.identity, failure.kind, failure.message
                ));
            }
        }
    }

    if !written.is_empty() {
        output.push_str(&format!("\nWrote {} file(s):\n", written.len()));
        for file in written {
            output.push_str(&format!("  {} ({} entries)\n", file.path.display(), file.entries));
        }
    }

    output.push_str(&format!("\nDigest: {}\n", report.digest));
    if report.is_complete_success() {
        output.push_str("\n✅ All entities converted!\n");
    }
    output
}

/// Format the resolver's view of a model
pub fn format_inspection(arena: &RecordArena, stats: &ResolveStats) -> String {
    let mut output = String::new();

    let mut types: BTreeMap<&str, usize> = BTreeMap::new();
    for record in arena.records() {
        *types.entry(record.type_name.as_str()).or_default() += 1;
    }
    output.push_str(&format!("\nTypes ({}):\n", types.len()));
    for (type_name, count) in &types {
        output.push_str(&format!("  {}: {} record(s)\n", type_name, count));
    }

    output.push_str(&format!("\nRelations ({}):\n", arena.relations().len()));
    for (group, kind) in arena.relations() {
        let mut classes: BTreeMap<String, usize> = BTreeMap::new();
        for edge in arena.edges() {
            if arena.group_of(edge) == *group && !arena.record(edge.source).is_failed() {
                *classes.entry(edge.class.to_string()).or_default() += 1;
            }
        }
        let classes: Vec<String> = classes
            .iter()
            .map(|(class, count)| format!("{} {}", count, class))
            .collect();
        output.push_str(&format!("  {} ({}): {}\n", group, kind, classes.join(", ")));
    }

    let inlined = arena
        .edges()
        .iter()
        .filter(|e| e.class != EdgeClass::Link)
        .count();
    output.push_str(&format!(
        "\n{} of {} edge(s) inlined in documents ({} demoted to break cycles)\n",
        inlined,
        arena.edges().len(),
        stats.demoted
    ));

    let failed: Vec<_> = arena.records().iter().filter(|r| r.is_failed()).collect();
    if failed.is_empty() {
        output.push_str("\n✅ No failed records\n");
    } else {
        output.push_str("\n⚠️  Failed records:\n");
        for record in failed {
            if let Some(error) = record.error() {
                output.push_str(&format!("  - {}: {}\n", record.id, error));
            }
        }
    }
    output
}
