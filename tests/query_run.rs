use std::fs;

use ax_metrics::app::{pipeline, series_file};
use ax_metrics::domain::{OutputFormat, RunConfig};
use ax_metrics::io::{write_series_csv, write_series_json};
use chrono::NaiveDate;

const QUERIES: &str = r#"
table_defaults:
  - table: signups
    fetcher: random
    time_field: created_at
    fetch: { min: 0, max: 50, round: true }
metrics:
  - id: new_signups
    table: signups
    func: AVG
    filters:
      - { field: plan, value: pro }
  - id: orders
    fetcher: random
    table: orders
    func: SUM
    time_field: ordered_at
    data_type: MONEY_INT100
    fetch: { min: 1000, max: 5000 }
queries:
  - id: signups
    timeframe:
      range_unit: QUARTER
      gran_unit: WEEK
      smooth_unit: DAY
      smooth_val: 14
      allow_overflow_begin: false
    ghosts: [PREV_YEAR1]
    metrics:
      - metric: new_signups
        label: Weekly signups, 14-day smoothed
      - metric: new_signups
        divide_by_metric: orders
  - id: orders
    timeframe:
      range_unit: MONTH
      gran_unit: DAY
      mode: LASTWHOLE
      accumulate: true
    metrics:
      - metric: orders
"#;

#[test]
fn query_file_runs_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let queries_path = dir.path().join("queries.yaml");
    fs::write(&queries_path, QUERIES).unwrap();

    let now = NaiveDate::from_ymd_opt(2014, 2, 14)
        .unwrap()
        .and_hms_micro_opt(16, 30, 45, 1234)
        .unwrap();
    let config = RunConfig {
        queries_path,
        reframe: Some(now),
        seed: 42,
        format: OutputFormat::Table,
        export_csv: None,
        export_json: None,
    };
    let output = pipeline::run_queries(&config).unwrap();

    let ids: Vec<_> = output.entries.iter().map(|e| e.series.id.clone()).collect();
    assert_eq!(
        ids,
        vec![
            "Q_signups_M_1_new_signups",
            "Q_signups_M_2_new_signups_div_orders",
            "Q_signups_G_PREV_YEAR1_1_new_signups",
            "Q_signups_G_PREV_YEAR1_2_new_signups_div_orders",
            "Q_orders_M_1_orders",
        ]
    );
    assert_eq!(output.entries[0].series.count_points(), 13);
    assert_eq!(output.entries[0].series.label, "Weekly signups, 14-day smoothed");
    assert_eq!(output.entries[1].series.label, "new_signups");
    // January 2014, the last whole month before Feb 14.
    assert_eq!(output.entries[4].series.count_points(), 31);

    let csv_path = dir.path().join("points.csv");
    let series: Vec<_> = output.entries.iter().map(|e| e.series.clone()).collect();
    write_series_csv(&csv_path, &series).unwrap();
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "series_id");
    assert_eq!(&headers[2], "metric_id");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 13 * 4 + 31);
    let first = &rows[0];
    assert_eq!(&first[0], "Q_signups_M_1_new_signups");
    assert_eq!(&first[2], "new_signups");
    assert_eq!(&first[6], "2014-01-01 00:00:00.000000");
    // Smoothing clipped to the period start.
    assert_eq!(&first[7], "2014-01-01 00:00:00.000000");
    let orders_last = rows.last().unwrap();
    assert_eq!(&orders_last[7], "2014-01-01 00:00:00.000000");
    assert_eq!(&orders_last[8], "2014-02-01 00:00:00.000000");
    let cents: f64 = orders_last[9].parse().unwrap();
    assert!((10.0..=50.0).contains(&cents), "{cents}");

    let json_path = dir.path().join("series.json");
    write_series_json(&json_path, &series_file(&output)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["tool"], "axm");
    assert_eq!(value["generated_at"], "2014-02-14T16:30:45.001234");
    assert_eq!(value["metrics"]["new_signups"]["fetch"]["max"], 50.0);
    assert_eq!(value["metrics"]["new_signups"]["filters"][0]["value"], "pro");
    assert_eq!(value["metrics"]["orders"]["data_type"], "MONEY_INT100");
    let entries = value["series"].as_array().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[2]["ghost"], "PREV_YEAR1");
    assert_eq!(entries[2]["points"][0]["range"]["anchor"], "2013-01-01T00:00:00");
    assert_eq!(entries[1]["div_metric_id"], "orders");
    assert_eq!(entries[4]["frame"]["mode"], "LASTWHOLE");
    assert_eq!(entries[4]["reduce"], "SUM");
    assert!(entries[4]["reduced"].as_f64().unwrap() >= 0.0);
}

#[test]
fn broken_query_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let queries_path = dir.path().join("bad.yaml");
    fs::write(
        &queries_path,
        "metrics:\n  - { id: m, fetcher: random, table: t, time_field: ts }\nqueries:\n  - id: q\n    timeframe: { gran_unit: FORTNIGHT }\n    metrics: [{ metric: m }]\n",
    )
    .unwrap();

    let config = RunConfig {
        queries_path,
        reframe: None,
        seed: 0,
        format: OutputFormat::Json,
        export_csv: None,
        export_json: None,
    };
    let err = pipeline::run_queries(&config).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("gran_unit"));
}
