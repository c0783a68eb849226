//! Format extractors: dispatch, chunk planning, and per-chunk extraction.
//!
//! The contract is load-bearing: extraction never fails the pipeline.
//! Malformed input becomes `success = false` plus explanatory notes and
//! zero items, which the caller folds into its warnings - only structural
//! session errors abort anything.

pub mod aliases;
pub mod chunker;
pub mod document;
pub mod tabular;
pub mod text_block;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capabilities, CapabilityError};
use crate::config::{self, IngestOptions, MIN_ALIAS_MATCH_RATIO};
use crate::models::{Language, RawItem, SourceKind};

use tabular::{map_header, rows_to_items, split_tables, table_as_text, DetectedTable};

/// One input document handed to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSource {
    pub name: String,
    pub format: SourceFormat,
    pub bytes: Vec<u8>,
    /// Free-text hint from the caller ("export del CRM commerciale", …).
    pub user_context: Option<String>,
}

impl IngestSource {
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: SourceFormat::PlainText,
            bytes: content.into().into_bytes(),
            user_context: None,
        }
    }
}

/// Format family, dispatched on the caller's content-type hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Spreadsheet,
    Document,
    PlainText,
}

/// Result of one extraction step (a chunk, or a whole source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub success: bool,
    pub items: Vec<RawItem>,
    pub confidence: f32,
    pub elapsed_ms: u64,
    pub notes: Vec<String>,
}

impl ExtractionOutcome {
    fn failed(note: impl Into<String>) -> Self {
        Self {
            success: false,
            items: vec![],
            confidence: 0.0,
            elapsed_ms: 0,
            notes: vec![note.into()],
        }
    }
}

/// A unit of streaming work: one detected table or one text chunk.
#[derive(Debug, Clone)]
pub enum PlannedChunk {
    Table(DetectedTable),
    Text {
        index: usize,
        text: String,
        kind: SourceKind,
    },
}

impl PlannedChunk {
    pub fn label(&self) -> String {
        match self {
            Self::Table(t) => format!("table@{}:{}", t.sheet, t.header_row),
            Self::Text { index, kind, .. } => format!("{}#{index}", kind.as_str()),
        }
    }
}

/// Chunk plan for one source. `success = false` means the source could not
/// be read at all - a recoverable, per-source condition.
#[derive(Debug, Clone)]
pub struct SourcePlan {
    pub source_name: String,
    pub success: bool,
    pub chunks: Vec<PlannedChunk>,
    pub notes: Vec<String>,
}

impl SourcePlan {
    pub(crate) fn failed(source_name: &str, note: impl Into<String>) -> Self {
        Self {
            source_name: source_name.to_string(),
            success: false,
            chunks: vec![],
            notes: vec![note.into()],
        }
    }
}

/// Build the chunk plan for a source, dispatching on format.
pub async fn plan_source(
    caps: &Capabilities,
    source: &IngestSource,
    options: &IngestOptions,
) -> SourcePlan {
    match source.format {
        SourceFormat::Spreadsheet => plan_spreadsheet(caps, source, options).await,
        SourceFormat::Document => document::plan_document(caps, &source.name, &source.bytes).await,
        SourceFormat::PlainText => text_block::plan_text(&source.name, &source.bytes),
    }
}

async fn plan_spreadsheet(
    caps: &Capabilities,
    source: &IngestSource,
    options: &IngestOptions,
) -> SourcePlan {
    let sheets = match tokio::time::timeout(
        config::timeouts::TABULAR_READ,
        caps.tabular
            .read_sheets(&source.bytes, options.target_sheet.as_deref()),
    )
    .await
    {
        Ok(Ok(sheets)) => sheets,
        Ok(Err(e)) => {
            tracing::warn!(source = source.name, error = %e, "Tabular read failed");
            return SourcePlan::failed(&source.name, format!("Tabular read failed: {e}"));
        }
        Err(_) => {
            return SourcePlan::failed(&source.name, "Tabular read timed out");
        }
    };

    let mut chunks = Vec::new();
    for sheet in &sheets {
        for table in split_tables(sheet) {
            chunks.push(PlannedChunk::Table(table));
        }
    }
    if chunks.is_empty() {
        return SourcePlan::failed(&source.name, "No tables detected in spreadsheet");
    }
    SourcePlan {
        source_name: source.name.clone(),
        success: true,
        chunks,
        notes: vec![],
    }
}

/// Extract raw items from one planned chunk. Never errors: failures are
/// reported through the outcome.
pub async fn extract_chunk(
    caps: &Capabilities,
    source: &IngestSource,
    chunk: &PlannedChunk,
    language: Language,
) -> ExtractionOutcome {
    let start = Instant::now();
    let mut outcome = match chunk {
        PlannedChunk::Table(table) => extract_table(caps, source, table, language).await,
        PlannedChunk::Text { index, text, kind } => {
            extract_text(caps, source, *index, text, *kind, language).await
        }
    };
    outcome.elapsed_ms = start.elapsed().as_millis() as u64;
    outcome
}

async fn extract_table(
    caps: &Capabilities,
    source: &IngestSource,
    table: &DetectedTable,
    language: Language,
) -> ExtractionOutcome {
    let mapping = map_header(&table.header);

    if mapping.match_ratio >= MIN_ALIAS_MATCH_RATIO {
        let items = rows_to_items(table, &mapping, &source.name);
        let confidence = 0.6 + 0.35 * mapping.match_ratio;
        return ExtractionOutcome {
            success: true,
            items,
            confidence: confidence.min(0.95),
            elapsed_ms: 0,
            notes: vec![format!(
                "Mapped {} of {} header columns in sheet '{}'",
                mapping.columns.len(),
                table.header.iter().filter(|h| !h.trim().is_empty()).count(),
                table.sheet
            )],
        };
    }

    // Too few recognizable columns - let the extraction capability infer
    // the mapping from the rows themselves.
    let text = table_as_text(table);
    let hint = "tabular rows with unrecognized headers; infer the column mapping";
    match call_entities(caps, &text, Some(hint), language).await {
        Ok(mut items) => {
            for item in &mut items {
                item.provenance.source_kind = SourceKind::DocumentTable;
                item.provenance.source_name = source.name.clone();
            }
            ExtractionOutcome {
                success: true,
                items,
                confidence: 0.6,
                elapsed_ms: 0,
                notes: vec![format!(
                    "Header aliases matched {:.0}% - used capability-inferred mapping",
                    mapping.match_ratio * 100.0
                )],
            }
        }
        Err(e) => ExtractionOutcome::failed(format!(
            "Unmappable table in sheet '{}' and capability fallback failed: {e}",
            table.sheet
        )),
    }
}

async fn extract_text(
    caps: &Capabilities,
    source: &IngestSource,
    index: usize,
    text: &str,
    kind: SourceKind,
    language: Language,
) -> ExtractionOutcome {
    // A text block may already be a JSON export of items - decode it
    // leniently before spending a capability call.
    if looks_like_json(text) {
        let mut items: Vec<RawItem> =
            crate::pipeline::lenient_json::parse_array_lenient(text);
        if !items.is_empty() {
            for item in &mut items {
                item.provenance.source_kind = kind;
                item.provenance.source_name = source.name.clone();
            }
            return ExtractionOutcome {
                success: true,
                items,
                confidence: 0.75,
                elapsed_ms: 0,
                notes: vec!["Decoded embedded JSON item list".into()],
            };
        }
    }

    match call_entities(caps, text, source.user_context.as_deref(), language).await {
        Ok(mut items) => {
            for item in &mut items {
                item.provenance.source_kind = kind;
                item.provenance.source_name = source.name.clone();
                if kind == SourceKind::DocumentText {
                    item.provenance.page = Some(index + 1);
                }
            }
            let (confidence, notes) = if items.is_empty() {
                (0.4, vec![format!("No entities found in {}", kind.as_str())])
            } else {
                let base = match kind {
                    SourceKind::DocumentText => 0.7,
                    _ => 0.6,
                };
                (base, vec![])
            };
            ExtractionOutcome {
                success: true,
                items,
                confidence,
                elapsed_ms: 0,
                notes,
            }
        }
        Err(e) => {
            tracing::warn!(source = source.name, error = %e, "Entity extraction failed");
            ExtractionOutcome::failed(format!("Entity extraction failed: {e}"))
        }
    }
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('[') || trimmed.starts_with('{') || trimmed.contains("```json")
}

async fn call_entities(
    caps: &Capabilities,
    text: &str,
    hint: Option<&str>,
    language: Language,
) -> Result<Vec<RawItem>, CapabilityError> {
    tokio::time::timeout(
        config::timeouts::ENTITY_EXTRACTION,
        caps.entities.extract_entities(text, hint, language),
    )
    .await
    .map_err(|_| CapabilityError::Timeout)?
}

/// Extract a whole source in one pass (batch mode).
pub async fn extract_source(
    caps: &Capabilities,
    source: &IngestSource,
    options: &IngestOptions,
) -> ExtractionOutcome {
    let start = Instant::now();
    let plan = plan_source(caps, source, options).await;
    if !plan.success {
        return ExtractionOutcome {
            success: false,
            items: vec![],
            confidence: 0.0,
            elapsed_ms: start.elapsed().as_millis() as u64,
            notes: plan.notes,
        };
    }

    let mut merged = ExtractionOutcome {
        success: true,
        items: vec![],
        confidence: 0.0,
        elapsed_ms: 0,
        notes: plan.notes,
    };
    let mut weighted = 0.0f32;
    let mut weight = 0.0f32;
    let mut any_chunk_ok = false;

    for chunk in &plan.chunks {
        let outcome = extract_chunk(caps, source, chunk, options.language).await;
        any_chunk_ok |= outcome.success;
        let w = outcome.items.len().max(1) as f32;
        weighted += outcome.confidence * w;
        weight += w;
        merged.items.extend(outcome.items);
        merged.notes.extend(outcome.notes);
    }

    merged.success = any_chunk_ok;
    merged.confidence = if weight > 0.0 { weighted / weight } else { 0.0 };
    merged.elapsed_ms = start.elapsed().as_millis() as u64;
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fake_caps;

    fn spreadsheet(name: &str) -> IngestSource {
        IngestSource {
            name: name.into(),
            format: SourceFormat::Spreadsheet,
            bytes: vec![0x50, 0x4B],
            user_context: None,
        }
    }

    // ── Dispatch ────────────────────────────────────────

    #[tokio::test]
    async fn spreadsheet_plans_table_chunks() {
        let caps = fake_caps()
            .with_sheet(
                "Catalogo",
                vec![
                    vec!["Nome", "Budget", "Stato"],
                    vec!["CRM", "120000", "attivo"],
                ],
            )
            .build();
        let plan =
            plan_source(&caps, &spreadsheet("catalog.xlsx"), &IngestOptions::default()).await;
        assert!(plan.success);
        assert_eq!(plan.chunks.len(), 1);
        assert!(matches!(plan.chunks[0], PlannedChunk::Table(_)));
    }

    #[tokio::test]
    async fn unreadable_spreadsheet_recoverable() {
        let caps = fake_caps().with_failing_tabular_reader().build();
        let plan = plan_source(&caps, &spreadsheet("bad.xlsx"), &IngestOptions::default()).await;
        assert!(!plan.success);
        assert!(plan.notes[0].contains("Tabular read failed"));
    }

    // ── Table extraction ────────────────────────────────

    #[tokio::test]
    async fn mapped_table_extracts_without_capability() {
        let builder = fake_caps().with_sheet(
            "Catalogo",
            vec![
                vec!["Nome", "Budget", "Stato"],
                vec!["CRM", "€120.000", "attivo"],
                vec!["ERP", "€300.000", "proposto"],
            ],
        );
        let caps = builder.build();
        let source = spreadsheet("catalog.xlsx");
        let outcome = extract_source(&caps, &source, &IngestOptions::default()).await;

        assert!(outcome.success);
        assert_eq!(outcome.items.len(), 2);
        assert!(outcome.confidence > 0.8);
        assert_eq!(builder.entity_call_count(), 0);
    }

    #[tokio::test]
    async fn unmappable_table_falls_back_to_capability() {
        let caps = fake_caps()
            .with_sheet(
                "Dati",
                vec![
                    vec!["Colonna A", "Colonna B", "Colonna C", "Colonna D"],
                    vec!["CRM", "120000", "x", "y"],
                ],
            )
            .with_entity_items(vec![RawItem {
                name: Some("CRM".into()),
                ..Default::default()
            }])
            .build();
        let source = spreadsheet("dump.xlsx");
        let outcome = extract_source(&caps, &source, &IngestOptions::default()).await;

        assert!(outcome.success);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(
            outcome.items[0].provenance.source_kind,
            SourceKind::DocumentTable
        );
        assert!(outcome
            .notes
            .iter()
            .any(|n| n.contains("capability-inferred")));
    }

    // ── Text extraction ─────────────────────────────────

    #[tokio::test]
    async fn text_source_extracts_via_capability() {
        let caps = fake_caps()
            .with_entity_items(vec![RawItem {
                name: Some("Consulenza SAP".into()),
                ..Default::default()
            }])
            .build();
        let source = IngestSource::text("note.txt", "Servizio di consulenza SAP, €80.000");
        let outcome = extract_source(&caps, &source, &IngestOptions::default()).await;

        assert!(outcome.success);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(
            outcome.items[0].provenance.source_kind,
            SourceKind::TextBlock
        );
    }

    #[tokio::test]
    async fn json_text_source_decodes_without_capability() {
        let builder = fake_caps();
        let caps = builder.build();
        // Trailing comma and truncation - the lenient decoder's territory.
        let source = IngestSource::text(
            "export.json",
            r#"[{"name": "CRM Platform"}, {"name": "Consulenza SAP"},]"#,
        );
        let outcome = extract_source(&caps, &source, &IngestOptions::default()).await;

        assert!(outcome.success);
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(builder.entity_call_count(), 0);
        assert!(outcome.notes.iter().any(|n| n.contains("JSON")));
    }

    #[tokio::test]
    async fn capability_failure_never_panics() {
        let caps = fake_caps().with_failing_entities().build();
        let source = IngestSource::text("note.txt", "qualcosa");
        let outcome = extract_source(&caps, &source, &IngestOptions::default()).await;

        assert!(!outcome.success);
        assert!(outcome.items.is_empty());
        assert!(outcome.notes.iter().any(|n| n.contains("failed")));
    }

    #[tokio::test]
    async fn document_pages_recorded_on_items() {
        let long = vec!["Sezione con offerte e budget.".repeat(30); 30].join("\n\n");
        let caps = fake_caps()
            .with_document_text(&long)
            .with_entity_items(vec![RawItem {
                name: Some("Item".into()),
                ..Default::default()
            }])
            .build();
        let source = IngestSource {
            name: "catalogo.pdf".into(),
            format: SourceFormat::Document,
            bytes: b"%PDF".to_vec(),
            user_context: None,
        };
        let outcome = extract_source(&caps, &source, &IngestOptions::default()).await;
        assert!(outcome.success);
        assert!(outcome.items.iter().all(|i| i.provenance.page.is_some()));
    }
}
