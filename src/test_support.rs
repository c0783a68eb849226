//! In-memory fakes for the capability traits, shared across unit tests.
//!
//! Mirrors the pattern of keeping a deterministic in-memory stand-in next
//! to the real capability seam so pipeline behavior can be tested without
//! any backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::capabilities::{
    Capabilities, CapabilityError, CompanyProfile, DocumentReader, EntityExtraction, SearchHit,
    SearchHitMetadata, SearchOptions, SheetData, SimilaritySearch, StrategicContext,
    TabularReader,
};
use crate::models::{Language, RawItem};

pub fn fake_caps() -> FakeCapsBuilder {
    FakeCapsBuilder::default()
}

/// Convenience constructor for a search hit.
pub fn hit(content: &str, category: &str, score: f32) -> SearchHit {
    SearchHit {
        content: content.to_string(),
        metadata: SearchHitMetadata {
            category: Some(category.to_string()),
            subcategory: None,
            tags: vec![],
        },
        score,
    }
}

#[derive(Default)]
pub struct FakeCapsBuilder {
    sheets: Vec<SheetData>,
    tabular_fail: bool,
    document_text: Option<String>,
    document_fail: bool,
    entity_items: Vec<RawItem>,
    entity_fail: bool,
    search_hits: HashMap<String, Vec<SearchHit>>,
    search_fail: bool,
    profile: Option<CompanyProfile>,
    entity_calls: Arc<AtomicUsize>,
    search_calls: Arc<AtomicUsize>,
}

impl FakeCapsBuilder {
    pub fn with_sheet(mut self, name: &str, rows: Vec<Vec<&str>>) -> Self {
        self.sheets.push(SheetData {
            name: name.to_string(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        });
        self
    }

    pub fn with_failing_tabular_reader(mut self) -> Self {
        self.tabular_fail = true;
        self
    }

    pub fn with_document_text(mut self, text: &str) -> Self {
        self.document_text = Some(text.to_string());
        self
    }

    pub fn with_failing_document_reader(mut self) -> Self {
        self.document_fail = true;
        self
    }

    /// Items returned by every entity-extraction call.
    pub fn with_entity_items(mut self, items: Vec<RawItem>) -> Self {
        self.entity_items = items;
        self
    }

    pub fn with_failing_entities(mut self) -> Self {
        self.entity_fail = true;
        self
    }

    pub fn with_search_hits(mut self, scope: &str, hits: Vec<SearchHit>) -> Self {
        self.search_hits.insert(scope.to_string(), hits);
        self
    }

    pub fn with_failing_search(mut self) -> Self {
        self.search_fail = true;
        self
    }

    pub fn with_profile(mut self, profile: CompanyProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn entity_call_count(&self) -> usize {
        self.entity_calls.load(Ordering::SeqCst)
    }

    pub fn search_call_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn build(&self) -> Capabilities {
        Capabilities {
            entities: Arc::new(FakeEntities {
                items: self.entity_items.clone(),
                fail: self.entity_fail,
                calls: Arc::clone(&self.entity_calls),
            }),
            search: Arc::new(FakeSearch {
                hits: self.search_hits.clone(),
                fail: self.search_fail,
                calls: Arc::clone(&self.search_calls),
            }),
            context: self.profile.clone().map(|profile| {
                Arc::new(FakeContext { profile }) as Arc<dyn StrategicContext>
            }),
            tabular: Arc::new(FakeTabular {
                sheets: self.sheets.clone(),
                fail: self.tabular_fail,
            }),
            document: Arc::new(FakeDocument {
                text: self.document_text.clone().unwrap_or_default(),
                fail: self.document_fail,
            }),
        }
    }
}

struct FakeEntities {
    items: Vec<RawItem>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl EntityExtraction for FakeEntities {
    async fn extract_entities(
        &self,
        _text: &str,
        _context_hint: Option<&str>,
        _language: Language,
    ) -> Result<Vec<RawItem>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CapabilityError::Backend("entity backend down".into()));
        }
        Ok(self.items.clone())
    }
}

struct FakeSearch {
    hits: HashMap<String, Vec<SearchHit>>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SimilaritySearch for FakeSearch {
    async fn search(
        &self,
        tenant_scope: &str,
        _query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchHit>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CapabilityError::Backend("search backend down".into()));
        }
        Ok(self
            .hits
            .get(tenant_scope)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(opts.limit)
            .collect())
    }
}

struct FakeContext {
    profile: CompanyProfile,
}

#[async_trait]
impl StrategicContext for FakeContext {
    async fn latest_profile(
        &self,
        _tenant_scope: &str,
    ) -> Result<Option<CompanyProfile>, CapabilityError> {
        Ok(Some(self.profile.clone()))
    }
}

struct FakeTabular {
    sheets: Vec<SheetData>,
    fail: bool,
}

#[async_trait]
impl TabularReader for FakeTabular {
    async fn read_sheets(
        &self,
        _blob: &[u8],
        target_sheet: Option<&str>,
    ) -> Result<Vec<SheetData>, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Backend("workbook unreadable".into()));
        }
        Ok(match target_sheet {
            Some(name) => self
                .sheets
                .iter()
                .filter(|s| s.name == name)
                .cloned()
                .collect(),
            None => self.sheets.clone(),
        })
    }
}

struct FakeDocument {
    text: String,
    fail: bool,
}

#[async_trait]
impl DocumentReader for FakeDocument {
    async fn read_text(&self, _blob: &[u8]) -> Result<String, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Backend("document unreadable".into()));
        }
        Ok(self.text.clone())
    }
}
