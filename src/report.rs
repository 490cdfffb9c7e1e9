// 📝 Analysis Report - fixed-width text summary of the three questions

use crate::normalize::title_case;
use crate::responses::{CategoryStats, CategoryTally};

const RULE_WIDTH: usize = 60;

fn push_tri_state(report: &mut Vec<String>, tallies: &[CategoryTally], allowed_label: &str) {
    for tally in tallies {
        let total = tally.stats.total();
        if total == 0 {
            continue;
        }
        if let CategoryStats::TriState {
            not_allowed,
            allowed,
            not_mentioned,
        } = tally.stats
        {
            let allowed_pct = allowed as f64 / total as f64 * 100.0;
            report.push(format!("{}:", title_case(&tally.category)));
            report.push(format!("  - {}: {} ({:.1}%)", allowed_label, allowed, allowed_pct));
            report.push(format!("  - Not allowed: {}", not_allowed));
            report.push(format!("  - Not mentioned: {}", not_mentioned));
        }
    }
}

/// Render the data-use, entity-sharing and user-rights tallies as text
pub fn generate_analysis_report(
    data_use: &[CategoryTally],
    entities: &[CategoryTally],
    controls: &[CategoryTally],
) -> String {
    let mut report = Vec::new();
    report.push("=".repeat(RULE_WIDTH));
    report.push("PRIVACY POLICY ANALYSIS REPORT".to_string());
    report.push("=".repeat(RULE_WIDTH));

    report.push("\n1. DATA USE PRACTICES".to_string());
    report.push("-".repeat(30));
    push_tri_state(&mut report, data_use, "Explicitly allowed");

    report.push("\n2. ENTITY SHARING PRACTICES".to_string());
    report.push("-".repeat(35));
    push_tri_state(&mut report, entities, "Sharing allowed");

    report.push("\n3. USER RIGHTS AND CONTROLS".to_string());
    report.push("-".repeat(35));
    for tally in controls {
        let total = tally.stats.total();
        if total == 0 {
            continue;
        }
        let guaranteed = tally.stats.positive();
        let guaranteed_pct = guaranteed as f64 / total as f64 * 100.0;
        report.push(format!("{}:", title_case(&tally.category)));
        report.push(format!(
            "  - Explicitly guaranteed: {} ({:.1}%)",
            guaranteed, guaranteed_pct
        ));
        match tally.stats {
            CategoryStats::Binary { no_guarantee, .. } => {
                report.push(format!("  - No guarantee: {}", no_guarantee));
            }
            CategoryStats::TriState {
                not_allowed,
                not_mentioned,
                ..
            } => {
                report.push(format!("  - No guarantee: {}", not_allowed));
                if not_mentioned > 0 {
                    report.push(format!("  - Not mentioned: {}", not_mentioned));
                }
            }
        }
    }

    report.push(format!("\n{}", "=".repeat(RULE_WIDTH)));
    report.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(category: &str, not_allowed: usize, allowed: usize, not_mentioned: usize) -> CategoryTally {
        CategoryTally {
            category: category.to_string(),
            stats: CategoryStats::TriState {
                not_allowed,
                allowed,
                not_mentioned,
            },
        }
    }

    #[test]
    fn test_report_sections() {
        let data_use = vec![tri("personalized_ads", 1, 3, 0), tri("employment", 0, 0, 0)];
        let entities = vec![tri("gov", 2, 1, 1)];
        let controls = vec![CategoryTally {
            category: "opt_out_data".to_string(),
            stats: CategoryStats::Binary {
                no_guarantee: 1,
                guaranteed: 3,
            },
        }];

        let report = generate_analysis_report(&data_use, &entities, &controls);

        assert!(report.starts_with(&"=".repeat(60)));
        assert!(report.contains("PRIVACY POLICY ANALYSIS REPORT"));
        assert!(report.contains("Personalized Ads:\n  - Explicitly allowed: 3 (75.0%)"));
        assert!(report.contains("  - Not allowed: 1"));
        // empty categories are skipped
        assert!(!report.contains("Employment:"));
        assert!(report.contains("Gov:\n  - Sharing allowed: 1 (25.0%)"));
        assert!(report.contains("Opt Out Data:\n  - Explicitly guaranteed: 3 (75.0%)"));
        assert!(report.contains("  - No guarantee: 1"));
        assert!(report.ends_with(&"=".repeat(60)));
    }
}
