//! Write-then-read tests against the in-memory backend

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use sheetflow_core::{
    read_range, write_range, LogicalType, MemoryWorkbook, Payload, RangeSpec, ReadBackend,
    Shape, Value, WriteBackend,
};

fn sample(dtype: LogicalType, i: u32) -> Value {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(i));
    match dtype {
        LogicalType::Int => Value::Int(i64::from(i) * 7 - 3),
        LogicalType::Float => Value::Float(f64::from(i) + 0.25),
        LogicalType::Str => Value::string(format!("cell {}", i)),
        LogicalType::Bool => Value::Bool(i % 2 == 0),
        LogicalType::Date => Value::Date(date),
        LogicalType::DateTime => Value::DateTime(date.and_hms_opt(i % 24, 30, 0).unwrap()),
        LogicalType::Any => Value::Int(i64::from(i)),
    }
}

fn payload(shape: Shape, dtype: LogicalType) -> Payload {
    let (rows, cols) = shape.dims();
    match shape {
        Shape::Scalar => Payload::Scalar(sample(dtype, 0)),
        Shape::Row(n) | Shape::Column(n) => Payload::Vector((0..n).map(|i| sample(dtype, i)).collect()),
        Shape::Matrix(_, _) => Payload::Matrix(
            (0..rows)
                .map(|r| (0..cols).map(|c| sample(dtype, r * cols + c)).collect())
                .collect(),
        ),
    }
}

#[test]
fn test_every_shape_and_type_round_trips() {
    let shapes = [
        Shape::Scalar,
        Shape::Row(5),
        Shape::Column(5),
        Shape::Matrix(4, 4),
    ];

    for dtype in LogicalType::ALL {
        for shape in shapes {
            let mut wb = MemoryWorkbook::new();
            let sheet = wb.create_sheet("Data").unwrap();
            let range = RangeSpec::new(2, 3, shape, dtype).unwrap();
            let data = payload(shape, dtype);

            write_range(&mut wb, sheet, &range, &data).unwrap();
            let back = read_range(&wb, sheet, &range).unwrap();
            assert_eq!(back, data, "{shape} as {dtype}");
        }
    }
}

#[test]
fn test_finalize_returns_workbook() {
    let mut wb = MemoryWorkbook::new();
    let first = wb.create_sheet("First").unwrap();
    let second = wb.create_sheet("Second").unwrap();
    let range = RangeSpec::scalar(0, 0, LogicalType::Str).unwrap();
    write_range(&mut wb, first, &range, &Payload::scalar("one")).unwrap();
    write_range(&mut wb, second, &range, &Payload::scalar("two")).unwrap();

    let mut persisted = wb.finalize().unwrap();
    assert_eq!(persisted.sheet_names(), vec!["First", "Second"]);
    let sheet = persisted.open_sheet("second").unwrap();
    assert_eq!(
        read_range(&persisted, sheet, &range).unwrap(),
        Payload::scalar("two")
    );
}

#[test]
fn test_blank_payload_values_clear_cells() {
    let mut wb = MemoryWorkbook::new();
    let sheet = wb.create_sheet("S").unwrap();
    let range = RangeSpec::new(0, 0, Shape::Row(3), LogicalType::Int).unwrap();

    write_range(&mut wb, sheet, &range, &Payload::vector([1, 2, 3])).unwrap();
    write_range(
        &mut wb,
        sheet,
        &range,
        &Payload::Vector(vec![Value::Int(9), Value::Empty, Value::Int(7)]),
    )
    .unwrap();

    let any = RangeSpec::new(0, 0, Shape::Row(3), LogicalType::Any).unwrap();
    assert_eq!(
        read_range(&wb, sheet, &any).unwrap(),
        Payload::Vector(vec![Value::Int(9), Value::Empty, Value::Int(7)])
    );
}

#[test]
fn test_write_coerces_to_declared_type() {
    let mut wb = MemoryWorkbook::new();
    let sheet = wb.create_sheet("S").unwrap();
    let range = RangeSpec::new(0, 0, Shape::Row(2), LogicalType::Float).unwrap();
    write_range(&mut wb, sheet, &range, &Payload::vector([1, 2])).unwrap();
    assert_eq!(wb.value_at("S", 0, 1), Some(&Value::Float(2.0)));

    let bad = RangeSpec::scalar(1, 0, LogicalType::Int).unwrap();
    assert!(write_range(&mut wb, sheet, &bad, &Payload::scalar("abc")).is_err());
}
