/// Arrow schema definitions for the persisted tables.
pub mod tables {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Per-party ledger of ballot counts.
    pub fn ledger_schema() -> Schema {
        Schema::new(vec![
            Field::new("vote_id", DataType::Utf8, false),
            Field::new("adopt_count", DataType::Int64, false),
            Field::new("reject_count", DataType::Int64, false),
            Field::new("abstain_count", DataType::Int64, false),
        ])
    }

    /// One row per vote with its resolved entrypoint.
    pub fn entrypoints_schema() -> Schema {
        Schema::new(vec![
            Field::new("vote_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("type", DataType::Utf8, false),
            Field::new("entrypoint_document_id", DataType::Utf8, true),
            Field::new("entrypoint_title", DataType::Utf8, true),
        ])
    }

    /// Proposals named by recommendation documents.
    pub fn recommendations_schema() -> Schema {
        Schema::new(vec![
            Field::new("vote_id", DataType::Utf8, false),
            Field::new("underlying_document_id", DataType::Utf8, false),
            Field::new("recommended_action", DataType::Utf8, false),
        ])
    }

    /// Final per-document votes with content.
    pub fn votes_schema() -> Schema {
        Schema::new(vec![
            Field::new("vote_id", DataType::Utf8, false),
            Field::new("date", DataType::Date32, false),
            Field::new("type", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("document_title", DataType::Utf8, false),
            Field::new("recommendation", DataType::Utf8, true),
            Field::new("content", DataType::Utf8, false),
        ])
    }

    /// Per-party decisions with mirroring applied.
    pub fn outcomes_schema() -> Schema {
        Schema::new(vec![
            Field::new("vote_id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("party", DataType::Utf8, false),
            Field::new("decision", DataType::Utf8, false),
            Field::new("recommendation", DataType::Utf8, true),
            Field::new("mirrored_decision", DataType::Utf8, false),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::tables;

    #[test]
    fn ledger_schema_has_expected_fields() {
        let schema = tables::ledger_schema();
        assert_eq!(schema.fields().len(), 4);
        assert!(schema.field_with_name("abstain_count").is_ok());
    }

    #[test]
    fn entrypoint_fields_are_nullable() {
        let schema = tables::entrypoints_schema();
        assert!(schema.field_with_name("entrypoint_document_id").unwrap().is_nullable());
        assert!(!schema.field_with_name("vote_id").unwrap().is_nullable());
    }

    #[test]
    fn recommendations_schema_has_expected_fields() {
        let schema = tables::recommendations_schema();
        assert_eq!(schema.fields().len(), 3);
        assert!(schema.field_with_name("recommended_action").is_ok());
    }
}
