//! Deterministic weighted-keyword type classifier.
//!
//! Not ML: two keyword groups ("product" indicators, "service"
//! indicators), each entry a synonym set plus a weight. The score is the
//! sum of weights of all groups hit (case-insensitive substring) across
//! `name + description + raw_type`. Explicit raw_type synonyms and
//! similarity-search context add bounded boosts on top.
//!
//! Confidence is `max / (total + 1)` - the +1 smoothing keeps a single
//! weak hit from producing artificial high confidence.

use crate::config::classifier::{
    CONFIDENCE_CAP, CONTEXT_BOOST, CUE_WEIGHT, NO_SIGNAL_FLOOR, RAW_TYPE_BOOST,
};
use crate::models::{ItemType, RawItem};

/// Outcome of type classification for one raw item.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeVerdict {
    pub item_type: ItemType,
    pub confidence: f32,
    pub product_score: f32,
    pub service_score: f32,
}

struct KeywordGroup {
    synonyms: &'static [&'static str],
    weight: f32,
}

const PRODUCT_GROUPS: &[KeywordGroup] = &[
    KeywordGroup { synonyms: &["product", "prodotto"], weight: 1.0 },
    KeywordGroup { synonyms: &["platform", "piattaforma"], weight: 0.9 },
    KeywordGroup { synonyms: &["software", "suite", "applicazione", "application"], weight: 0.9 },
    KeywordGroup { synonyms: &["hardware", "device", "dispositivo", "sensore", "sensor"], weight: 0.8 },
    KeywordGroup { synonyms: &["saas", "on-premise", "on premise"], weight: 0.7 },
    // Secondary product cues.
    KeywordGroup { synonyms: &["license", "licenza", "licenze"], weight: CUE_WEIGHT },
    KeywordGroup { synonyms: &["version", "versione", "release", "firmware"], weight: CUE_WEIGHT },
];

const SERVICE_GROUPS: &[KeywordGroup] = &[
    KeywordGroup { synonyms: &["service", "servizio", "servizi"], weight: 1.0 },
    KeywordGroup { synonyms: &["consulting", "consulenza", "advisory"], weight: 0.9 },
    KeywordGroup { synonyms: &["managed", "gestito", "gestione"], weight: 0.9 },
    KeywordGroup { synonyms: &["support", "supporto", "assistenza", "helpdesk"], weight: 0.8 },
    KeywordGroup { synonyms: &["maintenance", "manutenzione"], weight: 0.8 },
    KeywordGroup { synonyms: &["monitoring", "monitoraggio", "presidio"], weight: 0.8 },
    KeywordGroup { synonyms: &["training", "formazione", "affiancamento"], weight: 0.8 },
    KeywordGroup { synonyms: &["outsourcing", "implementation", "implementazione", "integrazione", "integration"], weight: 0.7 },
    // Secondary service cues.
    KeywordGroup { synonyms: &["contract", "contratto", "subscription", "abbonamento", "canone"], weight: CUE_WEIGHT },
    KeywordGroup { synonyms: &["24/7", "24x7", "h24", "sla"], weight: CUE_WEIGHT },
];

/// Synonyms strong enough that an explicit `raw_type` mention earns the
/// dedicated boost.
const STRONG_PRODUCT: &[&str] = &["product", "prodotto", "software", "piattaforma", "platform", "hardware"];
const STRONG_SERVICE: &[&str] = &["service", "servizio", "servizi", "consulenza", "consulting", "managed"];

/// Classify a raw item, optionally using similarity-search context text.
pub fn classify(raw: &RawItem, context_text: Option<&str>) -> TypeVerdict {
    let haystack = raw.classification_text().to_lowercase();

    let mut product_score = group_score(&haystack, PRODUCT_GROUPS);
    let mut service_score = group_score(&haystack, SERVICE_GROUPS);

    if let Some(raw_type) = &raw.raw_type {
        let rt = raw_type.to_lowercase();
        if STRONG_PRODUCT.iter().any(|s| rt.contains(s)) {
            product_score += RAW_TYPE_BOOST;
        }
        if STRONG_SERVICE.iter().any(|s| rt.contains(s)) {
            service_score += RAW_TYPE_BOOST;
        }
    }

    if let Some(context) = context_text {
        let ctx = context.to_lowercase();
        let product_matches = count_matches(&ctx, STRONG_PRODUCT);
        let service_matches = count_matches(&ctx, STRONG_SERVICE);
        if product_matches > service_matches {
            product_score += CONTEXT_BOOST;
        } else if service_matches > product_matches {
            service_score += CONTEXT_BOOST;
        }
    }

    let total = product_score + service_score;
    if total == 0.0 {
        // No signal at all - default to product at the floor.
        return TypeVerdict {
            item_type: ItemType::Product,
            confidence: NO_SIGNAL_FLOOR,
            product_score,
            service_score,
        };
    }

    // Tie breaks toward product.
    let item_type = if service_score > product_score {
        ItemType::Service
    } else {
        ItemType::Product
    };
    let max = product_score.max(service_score);
    let confidence = (max / (total + 1.0)).min(CONFIDENCE_CAP);

    TypeVerdict {
        item_type,
        confidence,
        product_score,
        service_score,
    }
}

fn group_score(haystack: &str, groups: &[KeywordGroup]) -> f32 {
    groups
        .iter()
        .filter(|g| g.synonyms.iter().any(|s| haystack.contains(s)))
        .map(|g| g.weight)
        .sum()
}

fn count_matches(haystack: &str, synonyms: &[&str]) -> usize {
    synonyms.iter().filter(|s| haystack.contains(*s)).count()
}
