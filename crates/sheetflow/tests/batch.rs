//! Batch execution tests

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sheetflow::prelude::*;
use sheetflow::{SheetHandle, SheetResults};

/// Memory backend whose `finalize` can be made to fail
struct FlakyWorkbook {
    inner: MemoryWorkbook,
    fail_finalize: bool,
}

impl WriteBackend for FlakyWorkbook {
    type Persisted = MemoryWorkbook;

    fn create_sheet(&mut self, name: &str) -> Result<SheetHandle> {
        self.inner.create_sheet(name)
    }

    fn set_cell(
        &mut self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        value: &Value,
        dtype: LogicalType,
    ) -> Result<()> {
        self.inner.set_cell(sheet, row, col, value, dtype)
    }

    fn finalize(self) -> Result<MemoryWorkbook> {
        if self.fail_finalize {
            let io = io::Error::new(io::ErrorKind::Other, "disk full");
            return Err(Error::persistence("job-2", io));
        }
        self.inner.finalize()
    }
}

fn totals_job(target: &str, seed: i64) -> WriteJob {
    let header = RangeSpec::at("A1", Shape::Row(3), LogicalType::Str).unwrap();
    let values = RangeSpec::at("A2", Shape::Matrix(2, 3), LogicalType::Int).unwrap();
    let total = RangeSpec::at("E1", Shape::Scalar, LogicalType::Float).unwrap();
    WriteJob::new(target)
        .range("Data", header, Payload::vector(["a", "b", "c"]))
        .range(
            "Data",
            values,
            Payload::matrix([[seed, seed + 1, seed + 2], [seed + 3, seed + 4, seed + 5]]),
        )
        .range("Summary", total, Payload::scalar(seed as f64 * 1.5))
}

fn totals_read(target: &str) -> ReadJob {
    ReadJob::new(target)
        .range(
            "Data",
            "header",
            RangeSpec::at("A1", Shape::Row(3), LogicalType::Str).unwrap(),
        )
        .range(
            "Data",
            "values",
            RangeSpec::at("A2", Shape::Matrix(2, 3), LogicalType::Int).unwrap(),
        )
        .range(
            "Summary",
            "total",
            RangeSpec::at("E1", Shape::Scalar, LogicalType::Float).unwrap(),
        )
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_failed_finalize_is_isolated() {
    let jobs = vec![
        totals_job("job-1", 10),
        totals_job("job-2", 20),
        totals_job("job-3", 30),
    ];

    let report = run_write_batch(&jobs, &BatchOptions::with_workers(3), |target: &str| {
        Ok(FlakyWorkbook {
            inner: MemoryWorkbook::new(),
            fail_finalize: target == "job-2",
        })
    });

    assert_eq!(report.len(), 3);
    assert!(!report.is_success());

    let targets: Vec<&str> = report.outcomes().iter().map(|o| o.target.as_str()).collect();
    assert_eq!(targets, vec!["job-1", "job-2", "job-3"]);

    let failed: Vec<&str> = report.failed().map(|(target, _)| target).collect();
    assert_eq!(failed, vec!["job-2"]);
    assert_eq!(
        report.get("job-2").and_then(|o| o.error_kind()),
        Some(ErrorKind::Persistence)
    );

    for (target, seed) in [("job-1", 10), ("job-3", 30)] {
        let workbook = report
            .get(target)
            .and_then(|o| o.result.as_ref().ok())
            .unwrap();
        assert_eq!(workbook.value_at("Data", 0, 1), Some(&Value::string("b")));
        assert_eq!(workbook.value_at("Data", 2, 2), Some(&Value::Int(seed + 5)));
        assert_eq!(
            workbook.value_at("Summary", 0, 4),
            Some(&Value::Float(seed as f64 * 1.5))
        );
    }
}

#[test]
fn test_dispatch_failure_aborts_only_that_job() {
    let bad_range = RangeSpec::at("A1", Shape::Row(5), LogicalType::Int).unwrap();
    let jobs = vec![
        totals_job("ok", 1),
        WriteJob::new("bad").range("Data", bad_range, Payload::vector([1, 2, 3, 4])),
    ];

    let report = run_write_batch(&jobs, &BatchOptions::with_workers(2), |_: &str| {
        Ok(MemoryWorkbook::new())
    });

    assert!(report.get("ok").unwrap().is_success());
    assert_eq!(
        report.get("bad").and_then(|o| o.error_kind()),
        Some(ErrorKind::PayloadArityMismatch)
    );
}

#[test]
fn test_factory_failure_is_reported() {
    let jobs = vec![totals_job("x", 1)];
    let report = run_write_batch(&jobs, &BatchOptions::with_workers(1), |target: &str| {
        Err::<MemoryWorkbook, _>(Error::other(format!("no backend for {}", target)))
    });
    assert_eq!(report.get("x").and_then(|o| o.error_kind()), Some(ErrorKind::Other));
}

#[test]
fn test_files_round_trip_through_batches() {
    let dir = tempfile::tempdir().unwrap();
    let xlsx = path_string(&dir.path().join("north.xlsx"));
    let csv = path_string(&dir.path().join("south"));

    // A file where the CSV directory should go makes that target fail
    let blocked = dir.path().join("blocked");
    fs::write(&blocked, b"in the way").unwrap();
    let blocked = path_string(&blocked);

    let jobs = vec![
        totals_job(&xlsx, 100),
        totals_job(&blocked, 200),
        totals_job(&csv, 300),
    ];
    let report = write_many(&jobs, &BatchOptions::with_workers(4));

    assert_eq!(
        report.get(&blocked).and_then(|o| o.error_kind()),
        Some(ErrorKind::Persistence)
    );
    let written: Vec<PathBuf> = report.succeeded().map(|(_, path)| path.clone()).collect();
    assert_eq!(written, vec![PathBuf::from(&xlsx), PathBuf::from(&csv)]);
    assert!(dir.path().join("south").join("Data.csv").is_file());
    assert!(dir.path().join("south").join("Summary.csv").is_file());

    let reads = vec![totals_read(&xlsx), totals_read(&csv)];
    let results = read_many(&reads, &BatchOptions::with_workers(2));
    assert!(results.is_success());

    for (target, seed) in [(&xlsx, 100_i64), (&csv, 300)] {
        let sheets = results
            .get(target)
            .and_then(|o| o.result.as_ref().ok())
            .unwrap();
        assert_eq!(sheets["Data"]["header"], Payload::vector(["a", "b", "c"]));
        assert_eq!(
            sheets["Data"]["values"],
            Payload::matrix([[seed, seed + 1, seed + 2], [seed + 3, seed + 4, seed + 5]])
        );
        assert_eq!(
            sheets["Summary"]["total"],
            Payload::scalar(seed as f64 * 1.5)
        );
    }
}

#[test]
fn test_missing_sheet_fails_read_job() {
    let dir = tempfile::tempdir().unwrap();
    let target = path_string(&dir.path().join("only.xlsx"));
    let report = write_many(&[totals_job(&target, 1)], &BatchOptions::with_workers(1));
    assert!(report.is_success());

    let cell = RangeSpec::at("A1", Shape::Scalar, LogicalType::Any).unwrap();
    let reads = vec![
        ReadJob::new(&target).range("Missing", "x", cell),
        ReadJob::new(&target).range("data", "x", cell),
    ];
    let results = read_many(&reads, &BatchOptions::with_workers(2));

    let outcomes = results.outcomes();
    assert_eq!(outcomes[0].error_kind(), Some(ErrorKind::Sheet));
    // Results use the workbook's own sheet name
    let sheets = outcomes[1].result.as_ref().unwrap();
    assert_eq!(sheets["Data"]["x"], Payload::scalar("a"));
}

#[test]
fn test_sheets_selected_by_index() {
    let dir = tempfile::tempdir().unwrap();
    let xlsx = path_string(&dir.path().join("indexed.xlsx"));
    let csv = path_string(&dir.path().join("indexed"));
    let report = write_many(
        &[totals_job(&xlsx, 5), totals_job(&csv, 5)],
        &BatchOptions::with_workers(2),
    );
    assert!(report.is_success());

    let total = RangeSpec::at("E1", Shape::Scalar, LogicalType::Float).unwrap();
    let cell = RangeSpec::at("A1", Shape::Scalar, LogicalType::Any).unwrap();
    let reads: Vec<ReadJob> = [&xlsx, &csv]
        .into_iter()
        .map(|target| {
            ReadJob::new(target)
                .range(1usize, "total", total)
                .range("summary", "again", total)
        })
        .chain([ReadJob::new(&xlsx).range(2usize, "x", cell)])
        .collect();
    let results = read_many(&reads, &BatchOptions::with_workers(3));

    let outcomes = results.outcomes();
    for outcome in &outcomes[..2] {
        let sheets = outcome.result.as_ref().unwrap();
        assert_eq!(sheets.keys().collect::<Vec<_>>(), vec!["Summary"]);
        assert_eq!(sheets["Summary"]["total"], Payload::scalar(7.5));
        assert_eq!(sheets["Summary"]["again"], Payload::scalar(7.5));
    }
    assert_eq!(outcomes[2].error_kind(), Some(ErrorKind::Sheet));
}

#[test]
fn test_unkeyed_ranges_come_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let target = path_string(&dir.path().join("ordered.xlsx"));
    let report = write_many(&[totals_job(&target, 40)], &BatchOptions::with_workers(1));
    assert!(report.is_success());

    let reads = vec![ReadJob::new(&target)
        .push(
            "Data",
            RangeSpec::at("A3", Shape::Row(3), LogicalType::Int).unwrap(),
        )
        .range(
            0usize,
            "header",
            RangeSpec::at("A1", Shape::Row(3), LogicalType::Str).unwrap(),
        )
        .push(
            "Data",
            RangeSpec::at("A1", Shape::Scalar, LogicalType::Str).unwrap(),
        )
        .push(
            "Data",
            RangeSpec::at("C2", Shape::Column(2), LogicalType::Int).unwrap(),
        )];
    let results = read_many(&reads, &BatchOptions::with_workers(1));
    let sheets = results.outcomes()[0].result.as_ref().unwrap();

    let data = &sheets["Data"];
    assert_eq!(
        data.ordered,
        vec![
            Payload::vector([43, 44, 45]),
            Payload::scalar("a"),
            Payload::vector([42, 45]),
        ]
    );
    assert_eq!(data[1], Payload::scalar("a"));
    assert_eq!(data["header"], Payload::vector(["a", "b", "c"]));
}

#[test]
fn test_same_key_through_two_selectors_fails() {
    let dir = tempfile::tempdir().unwrap();
    let target = path_string(&dir.path().join("dupes.xlsx"));
    let report = write_many(&[totals_job(&target, 1)], &BatchOptions::with_workers(1));
    assert!(report.is_success());

    let cell = RangeSpec::at("A1", Shape::Scalar, LogicalType::Any).unwrap();
    let reads = vec![ReadJob::new(&target)
        .range("Data", "x", cell)
        .range(0usize, "x", cell)];
    let results = read_many(&reads, &BatchOptions::with_workers(1));
    assert_eq!(results.outcomes()[0].error_kind(), Some(ErrorKind::Other));
}

/// The same 50 jobs give identical files and read results on 1 and 8 workers
#[test]
fn test_pool_size_does_not_change_results() {
    let dir = tempfile::tempdir().unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let run = |workers: usize| -> (Vec<Vec<u8>>, Vec<SheetResults>) {
        let out = dir.path().join(format!("workers-{}", workers));
        let targets: Vec<String> = (0..50)
            .map(|i| {
                let ext = if i % 2 == 0 { "xlsx" } else { "csv" };
                path_string(&out.join(format!("job-{:02}.{}", i, ext)))
            })
            .collect();

        let jobs: Vec<WriteJob> = targets
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let dates = RangeSpec::at("G1", Shape::Column(2), LogicalType::Date).unwrap();
                totals_job(target, i as i64).range(
                    "Data",
                    dates,
                    Payload::vector([day, day + chrono::Duration::days(i as i64)]),
                )
            })
            .collect();
        let report = write_many(&jobs, &BatchOptions::with_workers(workers));
        assert!(report.is_success());

        let bytes = targets
            .iter()
            .map(|target| {
                let path = Path::new(target);
                if path.extension().map_or(false, |e| e == "xlsx") {
                    fs::read(path).unwrap()
                } else {
                    let mut all = fs::read(path.join("Data.csv")).unwrap();
                    all.extend(fs::read(path.join("Summary.csv")).unwrap());
                    all
                }
            })
            .collect();

        let reads: Vec<ReadJob> = targets
            .iter()
            .map(|target| {
                totals_read(target).range(
                    "Data",
                    "dates",
                    RangeSpec::at("G1", Shape::Column(2), LogicalType::Date).unwrap(),
                )
            })
            .collect();
        let results = read_many(&reads, &BatchOptions::with_workers(workers));
        let results = results
            .into_outcomes()
            .into_iter()
            .map(|o| o.result.unwrap())
            .collect();

        (bytes, results)
    };

    let (serial_bytes, serial_results) = run(1);
    let (parallel_bytes, parallel_results) = run(8);
    assert_eq!(serial_bytes, parallel_bytes);
    assert_eq!(serial_results, parallel_results);
    assert_eq!(
        serial_results[7]["Data"]["dates"],
        Payload::vector([day, day + chrono::Duration::days(7)])
    );
}
