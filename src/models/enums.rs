use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ItemType {
    Product => "product",
    Service => "service",
});

str_enum!(ItemStatus {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
    Cancelled => "cancelled",
    Proposed => "proposed",
});

str_enum!(Priority {
    Critical => "critical",
    High => "high",
    Medium => "medium",
    Low => "low",
});

str_enum!(RiskLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

str_enum!(Complexity {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Where a raw item came from within its source document.
str_enum!(SourceKind {
    TabularRow => "tabular_row",
    DocumentTable => "document_table",
    DocumentText => "document_text",
    TextBlock => "text_block",
});

/// Extraction language. `Auto` lets the extractors pick per source.
str_enum!(Language {
    It => "it",
    En => "en",
    Auto => "auto",
});
