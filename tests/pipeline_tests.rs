//! End-to-end pipeline tests over real .xlsx fixtures
//!
//! Fixtures are written with rust_xlsxwriter into a temp directory and read
//! back through the full discover → read → consolidate → rank → export path.

use calamine::{open_workbook_auto, Data, Reader};
use pretty_assertions::assert_eq;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use ventas_etl::config::{EtlConfig, PipelineParams};
use ventas_etl::core::{CancellationToken, NoProgress, Pipeline, Progress};
use ventas_etl::excel::{RankingChartExporter, RANKING_SHEET};
use ventas_etl::{CellValue, EtlError};

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════

enum Cell<'a> {
    Num(f64),
    Str(&'a str),
}

/// Write an extract: a title row, a blank row, the header on row 3, then data
fn write_extract(dir: &Path, name: &str, headers: &[&str], rows: &[Vec<Cell>]) -> PathBuf {
    let path = dir.join(name);
    let mut workbook = Workbook::new();

    let cover = workbook.add_worksheet();
    cover.set_name("Resumen").unwrap();
    cover.write_string(0, 0, "not read").unwrap();

    let sheet = workbook.add_worksheet();
    sheet.set_name("ITEM_O").unwrap();
    sheet.write_string(0, 0, "Avance de ventas").unwrap();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(2, col as u16, *header).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            let (r, col) = (r as u32 + 3, col as u16);
            match cell {
                Cell::Num(n) => sheet.write_number(r, col, *n).unwrap(),
                Cell::Str(s) => sheet.write_string(r, col, *s).unwrap(),
            };
        }
    }

    workbook.save(&path).unwrap();
    path
}

/// `count` rows of (Item, Qty, Amount)
fn sales_rows(count: usize, base: f64) -> Vec<Vec<Cell<'static>>> {
    (0..count)
        .map(|i| {
            vec![
                Cell::Str("item"),
                Cell::Num(base + i as f64),
                Cell::Num((base + i as f64) * 10.0),
            ]
        })
        .collect()
}

fn extract_name(day: u32) -> String {
    format!("AvanceVentasINTI.2023.05.{:02}.xlsx", day)
}

fn params(dir: &Path) -> PipelineParams {
    PipelineParams::from_start_row(dir, "A:C", 3).unwrap()
}

fn pipeline(workers: usize) -> Pipeline {
    Pipeline::new(EtlConfig {
        workers,
        ..EtlConfig::default()
    })
    .unwrap()
}

fn read_output(path: &Path) -> Vec<Vec<Data>> {
    let mut workbook = open_workbook_auto(path).unwrap();
    let range = workbook.worksheet_range_at(0).unwrap().unwrap();
    range.rows().map(|row| row.to_vec()).collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// CONSOLIDATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_two_files_rows_add_up() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(5, 1.0));
    write_extract(dir.path(), &extract_name(11), &["Item", "Qty", "Amount"], &sales_rows(7, 1.0));

    let output = pipeline(1).run(&params(dir.path()), &NoProgress).unwrap();

    assert_eq!(output.files.len(), 2);
    assert_eq!(output.dataset.len(), 12);
    assert_eq!(
        output.dataset.columns(),
        vec!["Item", "Qty", "Amount", "ANIO", "MES", "DIA"]
    );
    for row in 0..5 {
        assert_eq!(output.dataset.get(row, "DIA"), Some(CellValue::Text("10".to_string())));
    }
    for row in 5..12 {
        assert_eq!(output.dataset.get(row, "DIA"), Some(CellValue::Text("11".to_string())));
        assert_eq!(output.dataset.get(row, "MES"), Some(CellValue::Text("05".to_string())));
    }
    assert_eq!(output.output_path, dir.path().join("Out.xlsx"));
}

#[test]
fn test_output_workbook_contents() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(2, 1.0));

    let output = pipeline(1).run(&params(dir.path()), &NoProgress).unwrap();
    let rows = read_output(&output.output_path);

    assert_eq!(rows.len(), 3);
    let header: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
    assert_eq!(header, vec!["Item", "Qty", "Amount", "ANIO", "MES", "DIA"]);
    assert_eq!(rows[1][1], Data::Float(1.0));
    assert_eq!(rows[2][2], Data::Float(20.0));
    assert_eq!(rows[1][3], Data::String("2023".to_string()));
    assert_eq!(rows[1][4], Data::String("05".to_string()));
    assert_eq!(rows[1][5], Data::String("10".to_string()));
}

#[test]
fn test_differing_headers_union() {
    let dir = TempDir::new().unwrap();
    write_extract(
        dir.path(),
        &extract_name(10),
        &["X", "Y"],
        &[vec![Cell::Num(1.0), Cell::Num(2.0)]],
    );
    write_extract(
        dir.path(),
        &extract_name(11),
        &["Y", "Z"],
        &[vec![Cell::Num(3.0), Cell::Num(4.0)]],
    );

    let params = PipelineParams::from_start_row(dir.path(), "A:B", 3).unwrap();
    let output = pipeline(1).run(&params, &NoProgress).unwrap();

    assert_eq!(output.dataset.data_columns(), &["X", "Y", "Z"]);
    assert_eq!(output.dataset.data_value(0, "Z"), Some(&CellValue::Null));
    assert_eq!(output.dataset.data_value(1, "X"), Some(&CellValue::Null));
    assert_eq!(output.dataset.data_value(1, "Z"), Some(&CellValue::Number(4.0)));
}

#[test]
fn test_files_are_merged_in_name_order() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(12), &["Item", "Qty", "Amount"], &sales_rows(1, 300.0));
    write_extract(dir.path(), &extract_name(3), &["Item", "Qty", "Amount"], &sales_rows(1, 100.0));

    let output = pipeline(1).run(&params(dir.path()), &NoProgress).unwrap();

    assert_eq!(output.dataset.get(0, "DIA"), Some(CellValue::Text("03".to_string())));
    assert_eq!(output.dataset.get(0, "Qty"), Some(CellValue::Number(100.0)));
    assert_eq!(output.dataset.get(1, "DIA"), Some(CellValue::Text("12".to_string())));
}

#[test]
fn test_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(3, 1.0));
    write_extract(dir.path(), &extract_name(11), &["Item", "Qty", "Amount"], &sales_rows(4, 2.0));

    let first = pipeline(1).run(&params(dir.path()), &NoProgress).unwrap();
    let second = pipeline(1).run(&params(dir.path()), &NoProgress).unwrap();

    // Out.xlsx from the first run must not be picked up as an input
    assert_eq!(second.files.len(), 2);
    assert_eq!(first.dataset, second.dataset);
    assert_eq!(first.ranking, second.ranking);
    assert_eq!(read_output(&first.output_path).len(), 8);
}

// ═══════════════════════════════════════════════════════════════════════════
// RANKING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_ranking_of_numeric_columns() {
    let dir = TempDir::new().unwrap();
    write_extract(
        dir.path(),
        &extract_name(10),
        &["Name", "P", "Q", "R"],
        &[
            vec![Cell::Str("a"), Cell::Num(40.0), Cell::Num(80.0), Cell::Num(5.0)],
            vec![Cell::Str("b"), Cell::Num(60.0), Cell::Num(100.0), Cell::Num(15.0)],
        ],
    );

    let params = PipelineParams::from_start_row(dir.path(), "A:D", 3).unwrap();
    let output = pipeline(1).run(&params, &NoProgress).unwrap();

    assert_eq!(output.ranking.columns(), vec!["Q", "P", "R"]);
    assert_eq!(output.ranking.stats[0].mean, 90.0);
}

#[test]
fn test_ranking_chart_workbook() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(4, 1.0));
    let output = pipeline(1).run(&params(dir.path()), &NoProgress).unwrap();

    let chart_path = dir.path().join("ranking.xlsx");
    RankingChartExporter::new(&output.ranking)
        .export(&chart_path)
        .unwrap();

    let mut workbook = open_workbook_auto(&chart_path).unwrap();
    assert_eq!(workbook.sheet_names(), vec![RANKING_SHEET.to_string()]);
    let range = workbook.worksheet_range(RANKING_SHEET).unwrap();
    assert_eq!(range.get_value((1, 0)), Some(&Data::String("Amount".to_string())));
    assert_eq!(range.get_value((1, 1)), Some(&Data::Float(25.0)));
}

// ═══════════════════════════════════════════════════════════════════════════
// PARALLEL READS AND PROGRESS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_parallel_matches_sequential() {
    let dir = TempDir::new().unwrap();
    for day in 1..=6 {
        write_extract(
            dir.path(),
            &extract_name(day),
            &["Item", "Qty", "Amount"],
            &sales_rows(day as usize, day as f64),
        );
    }

    let sequential = pipeline(1).consolidate(&params(dir.path()), &NoProgress).unwrap();
    let parallel = pipeline(4).consolidate(&params(dir.path()), &NoProgress).unwrap();

    assert_eq!(sequential.1.len(), 21);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_progress_is_monotone_and_complete() {
    let dir = TempDir::new().unwrap();
    for day in 1..=5 {
        write_extract(dir.path(), &extract_name(day), &["Item", "Qty", "Amount"], &sales_rows(2, 1.0));
    }

    for workers in [1, 3] {
        let seen: Mutex<Vec<Progress>> = Mutex::new(Vec::new());
        let observer = |p: &Progress| seen.lock().unwrap().push(p.clone());

        pipeline(workers).run(&params(dir.path()), &observer).unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 5);
        let counts: Vec<usize> = seen.iter().map(|p| p.processed).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 5]);
        assert!(seen.iter().all(|p| p.total == 5));
        assert_eq!(seen.last().unwrap().fraction(), 1.0);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FAILURES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_empty_directory_writes_nothing() {
    let dir = TempDir::new().unwrap();

    let err = pipeline(1).run(&params(dir.path()), &NoProgress).unwrap_err();

    assert!(matches!(err, EtlError::NoInput { .. }));
    assert!(!dir.path().join("Out.xlsx").exists());
}

#[test]
fn test_missing_sheet_is_reported() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(1, 1.0));

    let config = EtlConfig {
        sheet_name: "ITEM_X".to_string(),
        ..EtlConfig::default()
    };
    let err = Pipeline::new(config)
        .unwrap()
        .run(&params(dir.path()), &NoProgress)
        .unwrap_err();

    match err {
        EtlError::SheetRead { sheet, reason, .. } => {
            assert_eq!(sheet, "ITEM_X");
            assert!(reason.contains("ITEM_O"));
        }
        other => panic!("expected SheetRead, got {:?}", other),
    }
    assert!(!dir.path().join("Out.xlsx").exists());
}

#[test]
fn test_start_row_past_end_fails() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(2, 1.0));

    let params = PipelineParams::from_start_row(dir.path(), "A:C", 40).unwrap();
    let err = pipeline(1).run(&params, &NoProgress).unwrap_err();

    assert!(matches!(err, EtlError::SheetRead { .. }));
}

#[test]
fn test_parallel_reports_first_failing_file() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(1), &["Item", "Qty", "Amount"], &sales_rows(1, 1.0));
    std::fs::write(dir.path().join(extract_name(2)), b"not a workbook").unwrap();
    write_extract(dir.path(), &extract_name(3), &["Item", "Qty", "Amount"], &sales_rows(1, 1.0));

    let err = pipeline(3).run(&params(dir.path()), &NoProgress).unwrap_err();

    match err {
        EtlError::SheetRead { path, .. } => assert_eq!(path, dir.path().join(extract_name(2))),
        other => panic!("expected SheetRead, got {:?}", other),
    }
    assert!(!dir.path().join("Out.xlsx").exists());
}

#[test]
fn test_cancelled_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    for day in 1..=3 {
        write_extract(dir.path(), &extract_name(day), &["Item", "Qty", "Amount"], &sales_rows(1, 1.0));
    }

    for workers in [1, 2] {
        let token = CancellationToken::new();
        token.cancel();
        let err = pipeline(workers)
            .with_cancellation(token)
            .run(&params(dir.path()), &NoProgress)
            .unwrap_err();

        assert!(matches!(err, EtlError::Cancelled { processed: 0, total: 3 }));
        assert!(!dir.path().join("Out.xlsx").exists());
    }
}

#[test]
fn test_cancel_between_files_writes_nothing() {
    let dir = TempDir::new().unwrap();
    for day in 1..=3 {
        write_extract(dir.path(), &extract_name(day), &["Item", "Qty", "Amount"], &sales_rows(1, 1.0));
    }

    let token = CancellationToken::new();
    let cancel_after_first = {
        let token = token.clone();
        move |p: &Progress| {
            if p.processed == 1 {
                token.cancel();
            }
        }
    };

    let err = pipeline(1)
        .with_cancellation(token)
        .run(&params(dir.path()), &cancel_after_first)
        .unwrap_err();

    assert!(matches!(err, EtlError::Cancelled { processed: 1, total: 3 }));
    assert!(!dir.path().join("Out.xlsx").exists());
}

#[test]
fn test_chart_failure_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(2, 1.0));

    let err = pipeline(1)
        .with_chart(dir.path().join("missing").join("ranking.xlsx"))
        .run(&params(dir.path()), &NoProgress)
        .unwrap_err();

    assert!(matches!(err, EtlError::Export { .. }));
    assert!(!dir.path().join("Out.xlsx").exists());
}

#[test]
fn test_chart_written_with_dataset() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(2, 1.0));
    let chart_path = dir.path().join("ranking.xlsx");

    pipeline(1)
        .with_chart(&chart_path)
        .run(&params(dir.path()), &NoProgress)
        .unwrap();

    assert!(chart_path.exists());
    assert!(dir.path().join("Out.xlsx").exists());
}

#[test]
fn test_output_named_like_extract_is_not_reread() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), &extract_name(10), &["Item", "Qty", "Amount"], &sales_rows(3, 1.0));

    let config = EtlConfig {
        output_file_name: "AvanceVentasINTI.2099.12.31.xlsx".to_string(),
        ..EtlConfig::default()
    };
    let first = Pipeline::new(config.clone())
        .unwrap()
        .run(&params(dir.path()), &NoProgress)
        .unwrap();
    let second = Pipeline::new(config)
        .unwrap()
        .run(&params(dir.path()), &NoProgress)
        .unwrap();

    assert!(dir.path().join("AvanceVentasINTI.2099.12.31.xlsx").exists());
    assert_eq!(second.files.len(), 1);
    assert_eq!(first.dataset, second.dataset);
}

#[test]
fn test_missing_directory_is_no_input() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("not-there");

    let err = pipeline(1)
        .run(&PipelineParams::from_start_row(&missing, "A:C", 1).unwrap(), &NoProgress)
        .unwrap_err();

    assert!(matches!(err, EtlError::NoInput { .. }));
}
