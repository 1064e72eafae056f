pub mod table;
pub mod json;

use crate::model::TenantSnapshot;

pub fn print(snapshot: &TenantSnapshot, json_output: bool) {
    if json_output {
        println!("{}", json::render(snapshot));
    } else {
        print!("{}", table::render(snapshot));
        print_history(snapshot);
    }
}

fn print_history(snapshot: &TenantSnapshot) {
    let history = &snapshot.global_stats.collect_history;
    if history.is_empty() {
        return;
    }

    println!("\nrecent batches:");
    for entry in history.iter().take(5) {
        println!(
            "  {}  {:<14} {:>5}  {}",
            entry.time.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.count,
            entry.source
        );
    }
}
