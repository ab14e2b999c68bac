use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

/// Verification category offered to callers, with the provider code it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKind {
    pub id: &'static str,
    pub item_type_code: &'static str,
    pub label: &'static str,
}

const CATALOG: &[VerificationKind] = &[
    VerificationKind {
        id: "CREDIT",
        item_type_code: "CREDIT",
        label: "Credit Check",
    },
    VerificationKind {
        id: "CRIMINAL",
        item_type_code: "CIT",
        label: "Criminal Record",
    },
    VerificationKind {
        id: "EMPLOYMENT",
        item_type_code: "EMPLOY",
        label: "Employment History",
    },
    VerificationKind {
        id: "EDUCATION",
        item_type_code: "EDUC",
        label: "Educational Qualifications",
    },
    VerificationKind {
        id: "IDENTITY",
        item_type_code: "ID",
        label: "Identity Verification",
    },
    VerificationKind {
        id: "DIRECTORSHIP",
        item_type_code: "DIR",
        label: "Directorship Check",
    },
    VerificationKind {
        id: "BANKRUPTCY",
        item_type_code: "SEQUEST",
        label: "Bankruptcy/Sequestration",
    },
    VerificationKind {
        id: "PROPERTY",
        item_type_code: "PROP",
        label: "Property Ownership",
    },
];

static ITEM_CODE_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn item_code_map() -> &'static HashMap<&'static str, &'static str> {
    ITEM_CODE_MAP.get_or_init(|| {
        CATALOG
            .iter()
            .map(|kind| (kind.id, kind.item_type_code))
            .collect()
    })
}

pub fn catalog() -> &'static [VerificationKind] {
    CATALOG
}

/// Provider item-type code for an internal verification type.
///
/// Unknown types pass through unchanged so that a new category can be
/// submitted before this table learns about it.
pub fn provider_item_code(internal: &str) -> &str {
    let trimmed = internal.trim();
    item_code_map()
        .get(trimmed.to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or(trimmed)
}
