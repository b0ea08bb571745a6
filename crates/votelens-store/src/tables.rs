//! Parquet tables and the vote source list.
//!
//! Each persisted record type has a `*_to_batch` and a `*_from_batches`
//! conversion against the schemas in [`votelens_core::schema::tables`].

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, RecordBatch, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{info, warn};
use votelens_core::schema::tables;
use votelens_core::{
    Decision, DocumentId, DocumentType, EntrypointRecord, OutcomeRecord, Recommendation,
    RecommendationEntry, VoteRecord, VoteSource,
};

use crate::StoreError;

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::ParquetNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

/// Write a batch to a Parquet file, replacing any previous contents.
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("parquet.part");
    let file = File::create(&tmp)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), rows = batch.num_rows(), "wrote parquet table");
    Ok(())
}

/// Read the `pdf_url,xls_url` list of votes to process.
///
/// An optional `vote_id` column overrides the id derived from the
/// spreadsheet URL. Rows without a usable vote id are skipped with a warning.
pub fn read_vote_sources(path: &Path) -> Result<Vec<VoteSource>, StoreError> {
    if !path.exists() {
        return Err(StoreError::InputNotFound(path.to_path_buf()));
    }
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    let schema = Schema::new(
        header
            .trim_start_matches('\u{feff}')
            .trim_end()
            .split(',')
            .map(|name| Field::new(name.trim().trim_matches('"'), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(File::open(path)?)?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch?;
        let pdf = string_column(&batch, "pdf_url")?;
        let xls = string_column(&batch, "xls_url")?;
        let ids = string_column(&batch, "vote_id").ok();
        for row in 0..batch.num_rows() {
            let (Some(pdf_url), Some(xls_url)) = (opt(pdf, row), opt(xls, row)) else {
                warn!(row, "skipping vote source without urls");
                continue;
            };
            let source = match ids.and_then(|col| opt(col, row)).filter(|s| !s.is_empty()) {
                Some(id) => id.parse().map(|vote_id| VoteSource {
                    vote_id,
                    pdf_url: pdf_url.to_string(),
                    xls_url: xls_url.to_string(),
                }),
                None => VoteSource::from_urls(pdf_url.to_string(), xls_url.to_string()),
            };
            match source {
                Ok(src) => out.push(src),
                Err(e) => warn!(xls_url, error = %e, "skipping vote source"),
            }
        }
    }
    Ok(out)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
}

fn opt(arr: &StringArray, row: usize) -> Option<&str> {
    if arr.is_null(row) { None } else { Some(arr.value(row)) }
}

fn recommendation_value(
    arr: &StringArray,
    row: usize,
    column: &str,
) -> Result<Option<Recommendation>, StoreError> {
    opt(arr, row)
        .map(|s| {
            Recommendation::from_str_opt(s).ok_or_else(|| StoreError::InvalidValue {
                column: column.to_string(),
                value: s.to_string(),
            })
        })
        .transpose()
}

fn decision_value(arr: &StringArray, row: usize, column: &str) -> Result<Decision, StoreError> {
    let s = arr.value(row);
    Decision::from_str_opt(s).ok_or_else(|| StoreError::InvalidValue {
        column: column.to_string(),
        value: s.to_string(),
    })
}

fn batch(schema: Schema, columns: Vec<ArrayRef>) -> Result<RecordBatch, StoreError> {
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

// -- entrypoints --

pub fn entrypoints_to_batch(records: &[EntrypointRecord]) -> Result<RecordBatch, StoreError> {
    batch(
        tables::entrypoints_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.vote_id.as_str()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.title.as_str()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.doc_type.as_str()))),
            Arc::new(StringArray::from_iter(
                records.iter().map(|r| r.entrypoint_id.as_ref().map(|id| id.to_string())),
            )),
            Arc::new(StringArray::from_iter(
                records.iter().map(|r| r.entrypoint_title.as_deref()),
            )),
        ],
    )
}

pub fn entrypoints_from_batches(batches: &[RecordBatch]) -> Result<Vec<EntrypointRecord>, StoreError> {
    let mut out = Vec::new();
    for b in batches {
        let ids = string_column(b, "vote_id")?;
        let titles = string_column(b, "title")?;
        let types = string_column(b, "type")?;
        let entry_ids = string_column(b, "entrypoint_document_id")?;
        let entry_titles = string_column(b, "entrypoint_title")?;
        for row in 0..b.num_rows() {
            out.push(EntrypointRecord {
                vote_id: ids.value(row).parse()?,
                title: titles.value(row).to_string(),
                doc_type: DocumentType::from_tag(types.value(row)),
                entrypoint_id: opt(entry_ids, row).map(str::parse::<DocumentId>).transpose()?,
                entrypoint_title: opt(entry_titles, row).map(str::to_string),
            });
        }
    }
    Ok(out)
}

// -- recommendations --

pub fn recommendations_to_batch(entries: &[RecommendationEntry]) -> Result<RecordBatch, StoreError> {
    batch(
        tables::recommendations_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(entries.iter().map(|e| e.vote_id.as_str()))),
            Arc::new(StringArray::from_iter_values(
                entries.iter().map(|e| e.document_id.to_string()),
            )),
            Arc::new(StringArray::from_iter_values(entries.iter().map(|e| e.action.as_str()))),
        ],
    )
}

pub fn recommendations_from_batches(
    batches: &[RecordBatch],
) -> Result<Vec<RecommendationEntry>, StoreError> {
    let mut out = Vec::new();
    for b in batches {
        let ids = string_column(b, "vote_id")?;
        let docs = string_column(b, "underlying_document_id")?;
        let actions = string_column(b, "recommended_action")?;
        for row in 0..b.num_rows() {
            let Some(action) = recommendation_value(actions, row, "recommended_action")? else {
                continue;
            };
            out.push(RecommendationEntry {
                vote_id: ids.value(row).parse()?,
                document_id: docs.value(row).parse()?,
                action,
            });
        }
    }
    Ok(out)
}

// -- votes --

pub fn votes_to_batch(records: &[VoteRecord]) -> Result<RecordBatch, StoreError> {
    batch(
        tables::votes_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.vote_id.as_str()))),
            Arc::new(Date32Array::from_iter_values(
                records.iter().map(|r| Date32Type::from_naive_date(r.date)),
            )),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.doc_type.as_str()))),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.document_id.to_string()),
            )),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.document_title.as_str()),
            )),
            Arc::new(StringArray::from_iter(
                records.iter().map(|r| r.recommendation.map(|x| x.as_str())),
            )),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.content.as_str()))),
        ],
    )
}

pub fn votes_from_batches(batches: &[RecordBatch]) -> Result<Vec<VoteRecord>, StoreError> {
    let mut out = Vec::new();
    for b in batches {
        let ids = string_column(b, "vote_id")?;
        let dates = b
            .column_by_name("date")
            .and_then(|c| c.as_any().downcast_ref::<Date32Array>())
            .ok_or_else(|| StoreError::MissingColumn("date".into()))?;
        let types = string_column(b, "type")?;
        let docs = string_column(b, "document_id")?;
        let titles = string_column(b, "document_title")?;
        let recs = string_column(b, "recommendation")?;
        let contents = string_column(b, "content")?;
        for row in 0..b.num_rows() {
            let date = dates.value_as_date(row).ok_or_else(|| StoreError::InvalidValue {
                column: "date".into(),
                value: dates.value(row).to_string(),
            })?;
            out.push(VoteRecord {
                vote_id: ids.value(row).parse()?,
                date,
                doc_type: DocumentType::from_tag(types.value(row)),
                document_id: docs.value(row).parse()?,
                document_title: titles.value(row).to_string(),
                recommendation: recommendation_value(recs, row, "recommendation")?,
                content: contents.value(row).to_string(),
            });
        }
    }
    Ok(out)
}

// -- outcomes --

pub fn outcomes_to_batch(records: &[OutcomeRecord]) -> Result<RecordBatch, StoreError> {
    batch(
        tables::outcomes_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.vote_id.as_str()))),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.document_id.to_string()),
            )),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.party.as_str()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.decision.as_str()))),
            Arc::new(StringArray::from_iter(
                records.iter().map(|r| r.recommendation.map(|x| x.as_str())),
            )),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.mirrored_decision.as_str()),
            )),
        ],
    )
}

pub fn outcomes_from_batches(batches: &[RecordBatch]) -> Result<Vec<OutcomeRecord>, StoreError> {
    let mut out = Vec::new();
    for b in batches {
        let ids = string_column(b, "vote_id")?;
        let docs = string_column(b, "document_id")?;
        let parties = string_column(b, "party")?;
        let decisions = string_column(b, "decision")?;
        let recs = string_column(b, "recommendation")?;
        let mirrored = string_column(b, "mirrored_decision")?;
        for row in 0..b.num_rows() {
            out.push(OutcomeRecord {
                vote_id: ids.value(row).parse()?,
                document_id: docs.value(row).parse()?,
                party: parties.value(row).to_string(),
                decision: decision_value(decisions, row, "decision")?,
                recommendation: recommendation_value(recs, row, "recommendation")?,
                mirrored_decision: decision_value(mirrored, row, "mirrored_decision")?,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn doc(s: &str) -> DocumentId {
        s.parse().unwrap()
    }

    #[test]
    fn read_missing_parquet() {
        let err = read_parquet(Path::new("/nonexistent/votes.parquet")).unwrap_err();
        assert!(matches!(err, StoreError::ParquetNotFound(_)));
    }

    #[test]
    fn entrypoints_survive_parquet_with_nulls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("votes").join("entrypoints.parquet");
        let records = vec![
            EntrypointRecord {
                vote_id: "20250129".parse().unwrap(),
                title: "Beschlussempfehlung und Bericht".into(),
                doc_type: DocumentType::Beschlussempfehlung,
                entrypoint_id: Some(doc("20/14000")),
                entrypoint_title: Some("Beschlussempfehlung des Ausschusses".into()),
            },
            EntrypointRecord {
                vote_id: "20250130_2".parse().unwrap(),
                title: "Antrag".into(),
                doc_type: DocumentType::Antrag,
                entrypoint_id: None,
                entrypoint_title: None,
            },
        ];
        write_parquet(&path, &entrypoints_to_batch(&records).unwrap()).unwrap();
        assert!(!path.with_extension("parquet.part").exists());

        let back = entrypoints_from_batches(&read_parquet(&path).unwrap()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn votes_keep_date_and_optional_recommendation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("votes.parquet");
        let records = vec![VoteRecord {
            vote_id: "20250129_3".parse().unwrap(),
            date: NaiveDate::from_ymd_opt(2025, 1, 29).unwrap(),
            doc_type: DocumentType::Gesetzentwurf,
            document_id: doc("20/12345"),
            document_title: "Entwurf eines Gesetzes".into(),
            recommendation: Some(Recommendation::Reject),
            content: "A. Problem".into(),
        }];
        write_parquet(&path, &votes_to_batch(&records).unwrap()).unwrap();
        let batches = read_parquet(&path).unwrap();
        let schema = batches[0].schema();
        assert_eq!(schema.field_with_name("date").unwrap().data_type(), &DataType::Date32);
        assert_eq!(votes_from_batches(&batches).unwrap(), records);
    }

    #[test]
    fn outcomes_batch_columns() {
        let records = vec![OutcomeRecord {
            vote_id: "20250129".parse().unwrap(),
            document_id: doc("20/1"),
            party: "SPD".into(),
            decision: Decision::Adopt,
            recommendation: None,
            mirrored_decision: Decision::Adopt,
        }];
        let b = outcomes_to_batch(&records).unwrap();
        assert_eq!(b.num_rows(), 1);
        assert!(string_column(&b, "recommendation").unwrap().is_null(0));
        assert_eq!(outcomes_from_batches(&[b]).unwrap(), records);
    }

    #[test]
    fn recommendations_reject_unknown_action() {
        let b = batch(
            tables::recommendations_schema(),
            vec![
                Arc::new(StringArray::from(vec!["20250129"])),
                Arc::new(StringArray::from(vec!["20/1"])),
                Arc::new(StringArray::from(vec!["ignore"])),
            ],
        )
        .unwrap();
        assert!(matches!(
            recommendations_from_batches(&[b]),
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn vote_sources_skip_bad_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("urls.csv");
        fs::write(
            &path,
            "pdf_url,xls_url\n\
             https://x.de/20250129.pdf,https://x.de/20250129_xls-data.xlsx\n\
             https://x.de/broken.pdf,https://x.de/broken.xlsx\n",
        )
        .unwrap();
        let sources = read_vote_sources(&path).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].vote_id.as_str(), "20250129");
    }

    #[test]
    fn vote_sources_explicit_id_column() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("urls.csv");
        fs::write(
            &path,
            "vote_id,pdf_url,xls_url\n20250130_4,https://x.de/a.pdf,https://x.de/a.xls\n",
        )
        .unwrap();
        let sources = read_vote_sources(&path).unwrap();
        assert_eq!(sources[0].vote_id.as_str(), "20250130_4");
        assert_eq!(sources[0].xls_extension(), "xls");
    }
}
