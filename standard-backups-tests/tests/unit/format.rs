//! Unit tests for list-backups formatting

use rstest::rstest;
use standard_backups::utils::format::{format_column, format_size, format_table, DEFAULT_COLUMNS};
use test_utils::{sample_record, sample_records};

#[rstest]
#[case(0, "0 B")]
#[case(512, "512 B")]
#[case(1024, "1 KB")]
#[case(1536, "1.5 KB")]
#[case(1024 * 1024 * 1024, "1 GB")]
#[case(1024u64.pow(4) * 3 / 2, "1.5 TB")]
#[case(u64::MAX, "16384 PB")]
fn test_format_size(#[case] bytes: u64, #[case] expected: &str) {
    assert_eq!(format_size(bytes), expected);
}

#[rstest]
#[case("id", "abc")]
#[case("size", "1.5 KB")]
#[case("extra.host", "db1")]
#[case("extra.stats.files", "12")]
#[case("extra.stats", "{\"files\":12}")]
#[case("extra.nope", "")]
fn test_format_column(#[case] column: &str, #[case] expected: &str) {
    assert_eq!(format_column(&sample_record("abc"), column), expected);
}

#[test]
fn test_default_table_has_a_row_per_record() {
    let columns: Vec<String> = DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect();
    let table = format_table(&sample_records(3), &columns);
    let lines: Vec<_> = table.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("ID"));
    assert!(lines[0].ends_with("SIZE"));
    assert!(lines[1].starts_with("snap0000"));
    assert!(lines[2].ends_with("1 KB"));
}
