//! Terminal tables for the management view.
//!
//! - category overview with per-category counts and a grand total
//! - record listing for a single category

use crate::model::{CategoryAggregate, TenantSnapshot};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn render(snapshot: &TenantSnapshot) -> String {
    if snapshot.is_empty() {
        return String::from("No unpublished SKCs collected.\n");
    }

    let mut output = String::new();

    output.push_str(&format!(
        "{:>8}  {:30} {:>6}  {:19}\n",
        "catId", "category", "skcs", "last updated"
    ));
    output.push_str(&"-".repeat(68));
    output.push('\n');

    for category in snapshot.categories.values() {
        output.push_str(&format!(
            "{:>8}  {:30} {:>6}  {}\n",
            category.cat_id,
            truncate(&category.cat_name, 30),
            category.total_count,
            category.last_updated.format(TIME_FORMAT)
        ));
    }

    let stats = &snapshot.global_stats;
    output.push_str(&format!(
        "\n{:>68}\n",
        format!(
            "TOTAL: {} skcs in {} categories",
            stats.total_skc_count, stats.total_category_count
        )
    ));

    output
}

pub fn render_category(category: &CategoryAggregate) -> String {
    let mut output = format!("\n{} ({})\n", category.cat_name, category.cat_id);
    output.push_str(&"-".repeat(40));
    output.push('\n');

    if category.records.is_empty() {
        output.push_str("  no records\n");
        return output;
    }

    for record in &category.records {
        output.push_str(&format!(
            "  {:20} {:16} {:30} {}  {}\n",
            truncate(&record.skc_id, 20),
            truncate(&record.product_id, 16),
            truncate(&record.product_name, 30),
            record.collect_time.format(TIME_FORMAT),
            record.source
        ));
    }

    output.push_str(&format!("  {:20} {:>16}\n", "subtotal", category.total_count));
    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn empty_snapshot_has_placeholder() {
        let output = render(&TenantSnapshot::empty(Utc::now()));
        assert_eq!(output, "No unpublished SKCs collected.\n");
    }

    #[test]
    fn overview_lists_categories_and_total() {
        let now = Utc::now();
        let mut snapshot = TenantSnapshot::empty(now);
        snapshot.categories.insert(10, CategoryAggregate::new(10, "Shoes", now));
        snapshot.categories.insert(20, CategoryAggregate::new(20, "Bags", now));
        snapshot.recompute_stats();

        let output = render(&snapshot);
        let shoes = output.find("Shoes").unwrap();
        let bags = output.find("Bags").unwrap();
        assert!(shoes < bags);
        assert!(output.contains("TOTAL: 0 skcs in 2 categories"));
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("abc", 6), "abc");
    }
}
