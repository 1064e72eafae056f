//! Text exports of a tenant snapshot.
//!
//! - CSV of every record, one row per SKC, every cell quoted
//! - newline-joined identifier lists for pasting into other tools

use std::io;

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::model::TenantSnapshot;

pub const CSV_HEADER: [&str; 7] = [
    "catId",
    "catName",
    "skcId",
    "productId",
    "productName",
    "collectTime",
    "source",
];

/// Byte order mark that makes spreadsheet tools detect UTF-8.
pub const UTF8_BOM: &str = "\u{feff}";

const COLLECT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render every record as CSV, categories in `cat_id` order and records in
/// insertion order.
pub fn to_csv(snapshot: &TenantSnapshot) -> Result<String, csv::Error> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;

    for (category, record) in snapshot.all_records() {
        writer.write_record([
            category.cat_id.to_string().as_str(),
            category.cat_name.as_str(),
            record.skc_id.as_str(),
            record.product_id.as_str(),
            record.product_name.as_str(),
            record.collect_time.format(COLLECT_TIME_FORMAT).to_string().as_str(),
            record.source.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

pub fn to_csv_with_bom(snapshot: &TenantSnapshot) -> Result<String, csv::Error> {
    Ok(format!("{UTF8_BOM}{}", to_csv(snapshot)?))
}

pub fn default_export_file_name(date: NaiveDate) -> String {
    format!("unpublished-skc-records_{}.csv", date.format("%Y-%m-%d"))
}

pub fn join_ids<I, S>(ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .map(|id| id.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryAggregate, SkcRecord};
    use chrono::{TimeZone, Utc};

    fn snapshot() -> TenantSnapshot {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let mut snapshot = TenantSnapshot::empty(at);

        for (cat_id, cat_name, skc_id, name) in [
            (20, "Bags", "B1", "Tote"),
            (10, "Shoes", "S1", "Boot, \"winter\""),
            (10, "Shoes", "S2", "Sandal"),
        ] {
            let category = snapshot.categories
                .entry(cat_id)
                .or_insert_with(|| CategoryAggregate::new(cat_id, cat_name, at));
            category.records.push(SkcRecord {
                skc_id: skc_id.to_string(),
                product_id: format!("P-{skc_id}"),
                product_name: name.to_string(),
                main_image_url: None,
                collect_time: at,
                source: "product-page".to_string(),
            });
        }

        snapshot.recompute_stats();
        snapshot
    }

    #[test]
    fn csv_quotes_every_cell_and_orders_by_category() {
        let csv = to_csv(&snapshot()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            r#""catId","catName","skcId","productId","productName","collectTime","source""#
        );
        assert_eq!(
            lines[1],
            r#""10","Shoes","S1","P-S1","Boot, ""winter""","2026-03-04 05:06:07","product-page""#
        );
        assert!(lines[2].starts_with(r#""10","Shoes","S2""#));
        assert!(lines[3].starts_with(r#""20","Bags","B1""#));
    }

    #[test]
    fn empty_snapshot_exports_header_only() {
        let csv = to_csv(&TenantSnapshot::empty(Utc::now())).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn bom_is_prefixed() {
        let csv = to_csv_with_bom(&snapshot()).unwrap();
        assert!(csv.starts_with(UTF8_BOM));
        assert!(csv[UTF8_BOM.len()..].starts_with("\"catId\""));
    }

    #[test]
    fn file_name_carries_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(default_export_file_name(date), "unpublished-skc-records_2026-10-19.csv");
    }

    #[test]
    fn ids_are_newline_joined() {
        assert_eq!(join_ids(["S1", "S2", "B1"]), "S1\nS2\nB1");
        assert_eq!(join_ids(Vec::<String>::new()), "");
    }
}
