//! Fuzzy column-alias table for tabular headers.
//!
//! Maps the header spellings real spreadsheets contain (Italian and
//! English, with punctuation and casing noise) to canonical RawItem
//! fields. Matching is exact-after-normalization first, then substring.

/// Canonical fields a column can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalColumn {
    Name,
    Description,
    RawType,
    RawStatus,
    RawPriority,
    Budget,
    StartDate,
    EndDate,
    Technologies,
    Dependencies,
    Risks,
    Owner,
}

struct AliasGroup {
    column: CanonicalColumn,
    aliases: &'static [&'static str],
}

const ALIAS_TABLE: &[AliasGroup] = &[
    AliasGroup {
        column: CanonicalColumn::Name,
        aliases: &[
            "name", "nome", "title", "titolo", "project", "progetto", "item",
            "prodotto servizio", "offerta", "denominazione",
        ],
    },
    AliasGroup {
        column: CanonicalColumn::Description,
        aliases: &[
            "description", "descrizione", "details", "dettagli", "note",
            "notes", "summary", "sintesi",
        ],
    },
    AliasGroup {
        column: CanonicalColumn::RawType,
        aliases: &["type", "tipo", "tipologia", "category type", "kind", "natura"],
    },
    AliasGroup {
        column: CanonicalColumn::RawStatus,
        aliases: &["status", "stato", "state", "fase", "phase", "avanzamento"],
    },
    AliasGroup {
        column: CanonicalColumn::RawPriority,
        aliases: &["priority", "priorita", "priorità", "importance", "importanza", "rilevanza"],
    },
    AliasGroup {
        column: CanonicalColumn::Budget,
        aliases: &[
            "budget", "cost", "costo", "importo", "valore", "value", "amount",
            "investimento", "investment", "prezzo", "price",
        ],
    },
    AliasGroup {
        column: CanonicalColumn::StartDate,
        aliases: &[
            "start", "start date", "inizio", "data inizio", "avvio", "kickoff",
            "from", "dal",
        ],
    },
    AliasGroup {
        column: CanonicalColumn::EndDate,
        aliases: &[
            "end", "end date", "fine", "data fine", "scadenza", "deadline",
            "to", "al", "delivery",
        ],
    },
    AliasGroup {
        column: CanonicalColumn::Technologies,
        aliases: &[
            "technologies", "tecnologie", "tech", "stack", "tech stack",
            "piattaforme", "strumenti", "tools",
        ],
    },
    AliasGroup {
        column: CanonicalColumn::Dependencies,
        aliases: &["dependencies", "dipendenze", "depends on", "prerequisiti", "prerequisites"],
    },
    AliasGroup {
        column: CanonicalColumn::Risks,
        aliases: &["risks", "rischi", "risk", "rischio", "criticita", "criticità", "issues"],
    },
    AliasGroup {
        column: CanonicalColumn::Owner,
        aliases: &[
            "owner", "responsabile", "referente", "manager", "pm", "lead",
            "assignee", "team",
        ],
    },
];

/// Map a header cell to a canonical column, or `None` when unknown.
pub fn resolve_column(header: &str) -> Option<CanonicalColumn> {
    let needle = normalize(header);
    if needle.is_empty() {
        return None;
    }

    // Exact match first - "note" must not fall through to substring logic.
    for group in ALIAS_TABLE {
        if group.aliases.iter().any(|a| normalize(a) == needle) {
            return Some(group.column);
        }
    }

    // Substring match either direction ("budget 2025" → budget).
    for group in ALIAS_TABLE {
        for alias in group.aliases {
            let alias = normalize(alias);
            if alias.len() >= 4 && (needle.contains(&alias) || alias.contains(&needle) && needle.len() >= 4)
            {
                return Some(group.column);
            }
        }
    }
    None
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim().to_string()
}
