//! Series and frame payloads.
//!
//! Numeric data takes the header-plus-raw-bytes path (`00bsos_` /
//! `00npdf_`); everything else is delegated to the columnar file format
//! (`00prqs_` / `00prqd_`), with the index carried as a reserved column.
//! A series written through the columnar path uses the reserved sentinel
//! column name when it has no name of its own; a series legitimately named
//! `_none_` therefore decodes as unnamed. That collision is a known edge
//! of the format, inherited rather than resolved.

use crate::error::{PackError, Result};
use crate::types::{Cell, Column, DType, Element, Frame, NdArray, Series, ValueKind};
use crate::wire::tag::Tag;
use crate::wire::{doc_from_bytes, doc_to_bytes, numeric};
use arrow::array::{
    Array, ArrayRef, BinaryArray, BinaryBuilder, BooleanArray, BooleanBuilder, Float32Array,
    Float64Array, Float64Builder, Int16Array, Int32Array, Int64Array, Int64Builder, Int8Array,
    StringArray, StringBuilder, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::datatypes::{DataType as ArrowType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::sync::Arc;

/// Column name standing in for a series with no name.
pub(crate) const UNNAMED_SERIES: &str = "_none_";
/// Reserved column carrying the index through the columnar format.
pub(crate) const INDEX_COLUMN: &str = "__index_level_0__";

/* ---------------------------------------------------------- series */

pub(crate) fn encode_series(series: &Series) -> Result<Option<Vec<u8>>> {
    if series.index.len() != series.values.len() {
        return Err(PackError::Unsupported {
            kind: ValueKind::Series,
            reason: format!(
                "index holds {} labels, values hold {} cells",
                series.index.len(),
                series.values.len()
            ),
        });
    }

    if let Column::Numeric(arr) = &series.values {
        if arr.ndim() != 1 {
            return Err(PackError::Unsupported {
                kind: ValueKind::Series,
                reason: format!("series values must be 1-dimensional, got {}", arr.ndim()),
            });
        }
        let mut doc = Document::new();
        doc.insert("i", cells_to_bson(&series.index));
        doc.insert(
            "v",
            Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: numeric::encode(arr)?,
            }),
        );
        if let Some(name) = &series.name {
            doc.insert("n", Bson::String(name.clone()));
        }
        return Ok(Some(Tag::Bsos.wrap(&doc_to_bytes(&doc)?)));
    }

    let name = series
        .name
        .clone()
        .unwrap_or_else(|| UNNAMED_SERIES.to_string());
    let columns = [(name, series.values.clone())];
    match write_parquet(&series.index, &columns)? {
        Some(bytes) => Ok(Some(Tag::Prqs.wrap(&bytes))),
        None => Ok(None),
    }
}

pub(crate) fn decode_series_doc(payload: &[u8]) -> Result<Series> {
    let doc = doc_from_bytes(payload)?;
    let index = match doc.get("i") {
        Some(Bson::Array(labels)) => bson_to_cells(labels)?,
        _ => {
            return Err(PackError::Malformed(String::from(
                "series document is missing its index",
            )))
        }
    };
    let values = match doc.get("v") {
        Some(Bson::Binary(binary)) => numeric::decode(&binary.bytes)?,
        _ => {
            return Err(PackError::Malformed(String::from(
                "series document is missing its values",
            )))
        }
    };
    let name = match doc.get("n") {
        None => None,
        Some(Bson::String(name)) => Some(name.clone()),
        Some(_) => {
            return Err(PackError::Malformed(String::from(
                "series document name slot is not text",
            )))
        }
    };
    if values.len() != index.len() {
        return Err(PackError::Malformed(format!(
            "series document holds {} labels for {} values",
            index.len(),
            values.len()
        )));
    }
    Ok(Series {
        name,
        index,
        values: Column::Numeric(values),
    })
}

pub(crate) fn decode_parquet_series(payload: &[u8]) -> Result<Series> {
    let (index, mut columns) = read_parquet(payload)?;
    if columns.len() != 1 {
        return Err(PackError::Malformed(format!(
            "series payload holds {} data columns",
            columns.len()
        )));
    }
    let (name, values) = columns.remove(0);
    let name = if name == UNNAMED_SERIES { None } else { Some(name) };
    Ok(Series { name, index, values })
}

/* ---------------------------------------------------------- frames */

pub(crate) fn encode_frame(frame: &Frame) -> Result<Option<Vec<u8>>> {
    for (name, column) in &frame.columns {
        if column.len() != frame.index.len() {
            return Err(PackError::Unsupported {
                kind: ValueKind::Frame,
                reason: format!(
                    "column {name:?} holds {} cells for {} index labels",
                    column.len(),
                    frame.index.len()
                ),
            });
        }
    }

    if let Some(arr) = frame_to_numeric(frame) {
        return Ok(Some(Tag::Npdf.wrap(&numeric::encode(&arr)?)));
    }
    match write_parquet(&frame.index, &frame.columns)? {
        Some(bytes) => Ok(Some(Tag::Prqd.wrap(&bytes))),
        None => Ok(None),
    }
}

pub(crate) fn decode_parquet_frame(payload: &[u8]) -> Result<Frame> {
    let (index, columns) = read_parquet(payload)?;
    Ok(Frame { index, columns })
}

/// The label-less numeric fast path applies only to frames whose labels
/// are the defaults it reconstructs; anything else must go through the
/// columnar format, which preserves labels.
fn frame_to_numeric(frame: &Frame) -> Option<NdArray> {
    if !frame.has_default_labels() || frame.columns.is_empty() {
        return None;
    }
    let mut dtype: Option<DType> = None;
    let mut cols = Vec::with_capacity(frame.columns.len());
    for (_, column) in &frame.columns {
        let arr = match column {
            Column::Numeric(arr) if arr.ndim() == 1 => arr,
            _ => return None,
        };
        match dtype {
            None => dtype = Some(arr.dtype()),
            Some(d) if d == arr.dtype() => {}
            Some(_) => return None,
        }
        cols.push(arr);
    }
    let dtype = dtype?;
    let size = dtype.size();
    let rows = frame.index.len();
    if cols.iter().any(|arr| arr.data().len() != rows * size) {
        return None;
    }

    /* interleave the column buffers into row-major order */
    let mut data = Vec::with_capacity(rows * cols.len() * size);
    for row in 0..rows {
        for arr in &cols {
            let at = row * size;
            data.extend_from_slice(&arr.data()[at..at + size]);
        }
    }
    NdArray::from_raw_parts(dtype, vec![rows, cols.len()], data).ok()
}

pub(crate) fn frame_from_numeric(arr: NdArray) -> Result<Frame> {
    let (rows, cols) = match arr.shape() {
        &[rows, cols] => (rows, cols),
        &[rows] => (rows, 1),
        _ => {
            return Err(PackError::Malformed(format!(
                "frame payload must be 1- or 2-dimensional, got {}",
                arr.ndim()
            )))
        }
    };
    let size = arr.dtype().size();
    let mut columns = Vec::with_capacity(cols);
    for col in 0..cols {
        let mut data = Vec::with_capacity(rows * size);
        for row in 0..rows {
            let at = (row * cols + col) * size;
            data.extend_from_slice(&arr.data()[at..at + size]);
        }
        columns.push((
            col.to_string(),
            Column::Numeric(NdArray::from_raw_parts(arr.dtype(), vec![rows], data)?),
        ));
    }
    Ok(Frame {
        index: Frame::default_index(rows),
        columns,
    })
}

/* ------------------------------------------------- columnar fallback */

/// `None` means some column's cells are not uniformly typed, which the
/// columnar delegate cannot hold; that is the caller's cue to fall back
/// further, not an error.
fn write_parquet(index: &[Cell], columns: &[(String, Column)]) -> Result<Option<Vec<u8>>> {
    let mut fields = Vec::with_capacity(columns.len() + 1);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len() + 1);
    for (name, column) in columns {
        let (arrow_type, array) = match column_to_arrow(column)? {
            Some(converted) => converted,
            None => return Ok(None),
        };
        fields.push(Field::new(name.clone(), arrow_type, true));
        arrays.push(array);
    }
    let index_column = Column::Mixed(index.to_vec());
    let (arrow_type, array) = match column_to_arrow(&index_column)? {
        Some(converted) => converted,
        None => return Ok(None),
    };
    fields.push(Field::new(INDEX_COLUMN, arrow_type, true));
    arrays.push(array);

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(Some(buf))
}

fn read_parquet(payload: &[u8]) -> Result<(Vec<Cell>, Vec<(String, Column)>)> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(payload))
        .map_err(|e| PackError::Malformed(format!("columnar payload is unreadable: {e}")))?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| PackError::Malformed(format!("columnar payload is unreadable: {e}")))?;

    let mut accs: Vec<ColAcc> = schema.fields().iter().map(|_| ColAcc::default()).collect();
    for batch in reader {
        let batch = batch
            .map_err(|e| PackError::Malformed(format!("columnar payload is unreadable: {e}")))?;
        for (acc, column) in accs.iter_mut().zip(batch.columns()) {
            append_column(acc, column)?;
        }
    }

    let mut index = None;
    let mut columns = Vec::with_capacity(schema.fields().len().saturating_sub(1));
    for (field, acc) in schema.fields().iter().zip(accs) {
        if field.name() == INDEX_COLUMN {
            if acc.lossy {
                return Err(PackError::Malformed(String::from(
                    "index cell exceeds the representable integer range",
                )));
            }
            index = Some(acc.cells);
        } else {
            columns.push((field.name().clone(), finish_column(acc)?));
        }
    }
    let index = index.ok_or_else(|| {
        PackError::Malformed(String::from("columnar payload is missing the index column"))
    })?;
    Ok((index, columns))
}

fn column_to_arrow(column: &Column) -> Result<Option<(ArrowType, ArrayRef)>> {
    match column {
        Column::Numeric(arr) if arr.ndim() == 1 => numeric_to_arrow(arr).map(Some),
        Column::Numeric(_) => Ok(None),
        Column::Mixed(cells) => mixed_to_arrow(cells),
    }
}

fn numeric_to_arrow(arr: &NdArray) -> Result<(ArrowType, ArrayRef)> {
    macro_rules! dense {
        ($elem:ty, $arrow_type:expr, $array:ty) => {{
            let values = arr.to_vec::<$elem>().ok_or_else(dtype_drift)?;
            ($arrow_type, Arc::new(<$array>::from(values)) as ArrayRef)
        }};
    }
    let converted = match arr.dtype() {
        DType::Bool => dense!(bool, ArrowType::Boolean, BooleanArray),
        DType::I8 => dense!(i8, ArrowType::Int8, Int8Array),
        DType::U8 => dense!(u8, ArrowType::UInt8, UInt8Array),
        DType::I16 => dense!(i16, ArrowType::Int16, Int16Array),
        DType::U16 => dense!(u16, ArrowType::UInt16, UInt16Array),
        DType::I32 => dense!(i32, ArrowType::Int32, Int32Array),
        DType::U32 => dense!(u32, ArrowType::UInt32, UInt32Array),
        DType::I64 => dense!(i64, ArrowType::Int64, Int64Array),
        DType::U64 => dense!(u64, ArrowType::UInt64, UInt64Array),
        DType::F32 => dense!(f32, ArrowType::Float32, Float32Array),
        DType::F64 => dense!(f64, ArrowType::Float64, Float64Array),
    };
    Ok(converted)
}

fn dtype_drift() -> PackError {
    PackError::Malformed(String::from("array buffer does not match its dtype"))
}

fn mixed_to_arrow(cells: &[Cell]) -> Result<Option<(ArrowType, ArrayRef)>> {
    /* the first non-null cell picks the column type; any later mismatch
    means the columnar delegate cannot hold this column */
    let mut head: Option<&Cell> = None;
    for cell in cells {
        if matches!(cell, Cell::Null) {
            continue;
        }
        match head {
            None => head = Some(cell),
            Some(seen) if std::mem::discriminant(seen) == std::mem::discriminant(cell) => {}
            Some(_) => return Ok(None),
        }
    }

    macro_rules! build {
        ($builder:ty, $arrow_type:expr, $variant:path, $get:expr) => {{
            let mut builder = <$builder>::new();
            for cell in cells {
                match cell {
                    Cell::Null => builder.append_null(),
                    $variant(v) => builder.append_value(($get)(v)),
                    _ => return Ok(None),
                }
            }
            ($arrow_type, Arc::new(builder.finish()) as ArrayRef)
        }};
    }

    let converted = match head {
        /* an all-null column travels as nullable text */
        None | Some(Cell::Str(_)) => build!(
            StringBuilder,
            ArrowType::Utf8,
            Cell::Str,
            String::as_str
        ),
        Some(Cell::Bool(_)) => build!(BooleanBuilder, ArrowType::Boolean, Cell::Bool, |v: &bool| {
            *v
        }),
        Some(Cell::Int(_)) => build!(Int64Builder, ArrowType::Int64, Cell::Int, |v: &i64| *v),
        Some(Cell::Float(_)) => build!(
            Float64Builder,
            ArrowType::Float64,
            Cell::Float,
            |v: &f64| *v
        ),
        Some(Cell::Bytes(_)) => build!(
            BinaryBuilder,
            ArrowType::Binary,
            Cell::Bytes,
            <Vec<u8>>::as_slice
        ),
        Some(Cell::Null) => return Ok(None),
    };
    Ok(Some(converted))
}

/// Per-column read accumulator. Cells are collected always; raw bytes are
/// collected in parallel so dense numeric columns can be rebuilt with
/// their exact dtype.
#[derive(Default)]
struct ColAcc {
    dtype: Option<DType>,
    raw: Vec<u8>,
    cells: Vec<Cell>,
    saw_null: bool,
    lossy: bool,
}

fn append_column(acc: &mut ColAcc, column: &ArrayRef) -> Result<()> {
    macro_rules! primitive {
        ($dtype:expr, $array:ty, $cell:expr) => {{
            acc.dtype = Some($dtype);
            let arr = downcast::<$array>(column)?;
            for i in 0..arr.len() {
                if arr.is_null(i) {
                    acc.saw_null = true;
                    acc.cells.push(Cell::Null);
                } else {
                    let v = arr.value(i);
                    v.write_le(&mut acc.raw);
                    acc.cells.push(($cell)(v));
                }
            }
        }};
    }

    match column.data_type() {
        ArrowType::Boolean => primitive!(DType::Bool, BooleanArray, Cell::Bool),
        ArrowType::Int8 => primitive!(DType::I8, Int8Array, |v: i8| Cell::Int(v as i64)),
        ArrowType::UInt8 => primitive!(DType::U8, UInt8Array, |v: u8| Cell::Int(v as i64)),
        ArrowType::Int16 => primitive!(DType::I16, Int16Array, |v: i16| Cell::Int(v as i64)),
        ArrowType::UInt16 => primitive!(DType::U16, UInt16Array, |v: u16| Cell::Int(v as i64)),
        ArrowType::Int32 => primitive!(DType::I32, Int32Array, |v: i32| Cell::Int(v as i64)),
        ArrowType::UInt32 => primitive!(DType::U32, UInt32Array, |v: u32| Cell::Int(v as i64)),
        ArrowType::Int64 => primitive!(DType::I64, Int64Array, Cell::Int),
        ArrowType::Float32 => primitive!(DType::F32, Float32Array, |v: f32| Cell::Float(v as f64)),
        ArrowType::Float64 => primitive!(DType::F64, Float64Array, Cell::Float),
        ArrowType::UInt64 => {
            acc.dtype = Some(DType::U64);
            let arr = downcast::<UInt64Array>(column)?;
            for i in 0..arr.len() {
                if arr.is_null(i) {
                    acc.saw_null = true;
                    acc.cells.push(Cell::Null);
                } else {
                    let v = arr.value(i);
                    v.write_le(&mut acc.raw);
                    match i64::try_from(v) {
                        Ok(i) => acc.cells.push(Cell::Int(i)),
                        Err(_) => {
                            acc.lossy = true;
                            acc.cells.push(Cell::Null);
                        }
                    }
                }
            }
        }
        ArrowType::Utf8 => {
            let arr = downcast::<StringArray>(column)?;
            for i in 0..arr.len() {
                if arr.is_null(i) {
                    acc.saw_null = true;
                    acc.cells.push(Cell::Null);
                } else {
                    acc.cells.push(Cell::Str(arr.value(i).to_string()));
                }
            }
        }
        ArrowType::Binary => {
            let arr = downcast::<BinaryArray>(column)?;
            for i in 0..arr.len() {
                if arr.is_null(i) {
                    acc.saw_null = true;
                    acc.cells.push(Cell::Null);
                } else {
                    acc.cells.push(Cell::Bytes(arr.value(i).to_vec()));
                }
            }
        }
        other => {
            return Err(PackError::Malformed(format!(
                "columnar payload holds an unsupported column type {other}"
            )))
        }
    }
    Ok(())
}

fn finish_column(acc: ColAcc) -> Result<Column> {
    if let Some(dtype) = acc.dtype {
        if !acc.saw_null {
            let rows = acc.cells.len();
            return Ok(Column::Numeric(NdArray::from_raw_parts(
                dtype,
                vec![rows],
                acc.raw,
            )?));
        }
    }
    if acc.lossy {
        return Err(PackError::Malformed(String::from(
            "cell exceeds the representable integer range",
        )));
    }
    Ok(Column::Mixed(acc.cells))
}

fn downcast<'a, T: 'static>(column: &'a ArrayRef) -> Result<&'a T> {
    column.as_any().downcast_ref::<T>().ok_or_else(|| {
        PackError::Malformed(String::from("columnar payload column type mismatch"))
    })
}

fn cells_to_bson(cells: &[Cell]) -> Bson {
    let labels = cells
        .iter()
        .map(|cell| match cell {
            Cell::Null => Bson::Null,
            Cell::Bool(b) => Bson::Boolean(*b),
            Cell::Int(i) => Bson::Int64(*i),
            Cell::Float(f) => Bson::Double(*f),
            Cell::Str(s) => Bson::String(s.clone()),
            Cell::Bytes(bytes) => Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: bytes.clone(),
            }),
        })
        .collect();
    Bson::Array(labels)
}

fn bson_to_cells(labels: &[Bson]) -> Result<Vec<Cell>> {
    labels
        .iter()
        .map(|label| {
            let cell = match label {
                Bson::Null => Cell::Null,
                Bson::Boolean(b) => Cell::Bool(*b),
                Bson::Int32(i) => Cell::Int(*i as i64),
                Bson::Int64(i) => Cell::Int(*i),
                Bson::Double(f) => Cell::Float(*f),
                Bson::String(s) => Cell::Str(s.clone()),
                Bson::Binary(binary) => Cell::Bytes(binary.bytes.clone()),
                other => {
                    return Err(PackError::Malformed(format!(
                        "series index holds a {:?} element the engine never writes",
                        other.element_type()
                    )))
                }
            };
            Ok(cell)
        })
        .collect()
}
