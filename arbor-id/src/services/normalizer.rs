//! Result Normalizer
//!
//! Maps the recognition provider's response shapes into the canonical
//! `IdentificationRecord`. The provider has shipped two incompatible
//! response layouts over its lifetime:
//!
//! - **Ranked**: `{results: [{score, species: {...nested taxonomy...}}]}`,
//!   pre-ranked by descending confidence. This is the current shape.
//! - **Flat**: the legacy layout with top-level `class`/`confidence`
//!   fields, bare image URL strings, and vernacular entries that are
//!   either strings or `{name}` objects.
//!
//! Both converge on the one canonical record; a new provider shape gets a
//! new mapping branch, never a change to the canonical model.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{
    IdentificationRecord, ImageVariants, NormalizationError, ReferenceImage,
};

// ============================================================================
// Provider response shapes
// ============================================================================

/// Tagged union over the known provider response layouts
///
/// The flat legacy shape is tried first: it requires `class` and
/// `confidence`, which the ranked shape never carries. The ranked branch
/// then absorbs anything with (or without) a `results` list, so a bodiless
/// `{}` response normalizes as "no match" rather than a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderResponse {
    Flat(FlatResponse),
    Ranked(RankedResponse),
}

impl ProviderResponse {
    /// Remaining identification quota, when the provider reports one
    pub fn remaining_requests(&self) -> Option<i64> {
        match self {
            ProviderResponse::Ranked(r) => r.remaining_identification_requests,
            ProviderResponse::Flat(_) => None,
        }
    }
}

/// Current ranked response layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResponse {
    /// Matches, pre-ranked by descending confidence
    #[serde(default)]
    pub results: Vec<RankedMatch>,
    /// Echo of the query (project, images, organs)
    #[serde(default)]
    pub query: Option<QueryEcho>,
    #[serde(
        rename = "remainingIdentificationRequests",
        skip_serializing_if = "Option::is_none"
    )]
    pub remaining_identification_requests: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryEcho {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub organs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMatch {
    /// Match confidence (0.0 to 1.0)
    pub score: f64,
    pub species: RankedSpecies,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSpecies {
    #[serde(rename = "scientificNameWithoutAuthor")]
    pub scientific_name_without_author: Option<String>,
    /// Full name including authorship citation
    #[serde(rename = "scientificName")]
    pub scientific_name: Option<String>,
    #[serde(rename = "commonNames", default)]
    pub common_names: Vec<String>,
    #[serde(default)]
    pub genus: Option<TaxonName>,
    #[serde(default)]
    pub family: Option<TaxonName>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(rename = "vernacularNames", default)]
    pub vernacular_names: Vec<VernacularEntry>,
    #[serde(default)]
    pub images: Vec<ProviderImage>,
}

/// Nested taxonomy object (genus / family)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonName {
    #[serde(rename = "scientificNameWithoutAuthor")]
    pub scientific_name_without_author: Option<String>,
    #[serde(rename = "scientificName")]
    pub scientific_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderImage {
    pub url: ImageUrlTriple,
    #[serde(default)]
    pub organ: Option<String>,
}

/// Per-resolution URL triple; any subset may be present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageUrlTriple {
    pub o: Option<String>,
    pub m: Option<String>,
    pub s: Option<String>,
}

/// Legacy flattened response layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatResponse {
    /// Predicted scientific name
    pub class: String,
    /// Match confidence (0.0 to 1.0)
    pub confidence: f64,
    #[serde(default)]
    pub common_names: Vec<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub genus: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub vernacular_names: Vec<VernacularEntry>,
    /// Bare reference image URLs
    #[serde(default)]
    pub images: Vec<String>,
}

/// Vernacular name entry; the provider has emitted both bare strings and
/// `{name}` objects for this field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VernacularEntry {
    Plain(String),
    Named { name: String },
}

impl VernacularEntry {
    fn into_name(self) -> String {
        match self {
            VernacularEntry::Plain(name) => name,
            VernacularEntry::Named { name } => name,
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize a provider response into the canonical record
///
/// Selects the first (top-ranked) match; the provider pre-ranks and we do
/// not re-sort. An empty or absent result list is `NoMatch`; a top match
/// without a usable scientific name is `MissingScientificName`. Every
/// other irregularity degrades: optional arrays come back empty, missing
/// image variants stay `None`.
pub fn normalize(
    response: &ProviderResponse,
    source_image_url: &str,
) -> Result<IdentificationRecord, NormalizationError> {
    match response {
        ProviderResponse::Ranked(ranked) => normalize_ranked(ranked, source_image_url),
        ProviderResponse::Flat(flat) => normalize_flat(flat, source_image_url),
    }
}

fn normalize_ranked(
    response: &RankedResponse,
    source_image_url: &str,
) -> Result<IdentificationRecord, NormalizationError> {
    let top = response.results.first().ok_or(NormalizationError::NoMatch)?;
    let species = &top.species;

    let scientific_name = flatten_species_name(
        species.scientific_name_without_author.as_deref(),
        species.scientific_name.as_deref(),
    )
    .ok_or(NormalizationError::MissingScientificName)?;

    let genus = species
        .genus
        .as_ref()
        .and_then(taxon_bare_name)
        .unwrap_or_default();
    let family = species
        .family
        .as_ref()
        .and_then(taxon_bare_name)
        .unwrap_or_default();

    let reference_images = species
        .images
        .iter()
        .map(|img| ReferenceImage {
            variants: ImageVariants {
                original: img.url.o.clone(),
                medium: img.url.m.clone(),
                small: img.url.s.clone(),
            },
            organ: img.organ.clone().unwrap_or_default(),
        })
        .collect();

    Ok(IdentificationRecord {
        scientific_name,
        confidence: top.score.clamp(0.0, 1.0),
        common_names: species.common_names.clone(),
        family,
        genus,
        synonyms: species.synonyms.clone(),
        vernacular_names: species
            .vernacular_names
            .iter()
            .cloned()
            .map(VernacularEntry::into_name)
            .collect(),
        reference_images,
        source_image_url: source_image_url.to_string(),
        created_at: Utc::now(),
    })
}

fn normalize_flat(
    response: &FlatResponse,
    source_image_url: &str,
) -> Result<IdentificationRecord, NormalizationError> {
    let scientific_name = bare_scientific_name(&response.class);
    if scientific_name.is_empty() {
        return Err(NormalizationError::MissingScientificName);
    }

    // Legacy images are bare URLs: keep them as the original variant
    let reference_images = response
        .images
        .iter()
        .map(|url| ReferenceImage {
            variants: ImageVariants {
                original: Some(url.clone()),
                medium: None,
                small: None,
            },
            organ: String::new(),
        })
        .collect();

    Ok(IdentificationRecord {
        scientific_name,
        confidence: response.confidence.clamp(0.0, 1.0),
        common_names: response.common_names.clone(),
        family: response
            .family
            .as_deref()
            .map(bare_scientific_name)
            .unwrap_or_default(),
        genus: response
            .genus
            .as_deref()
            .map(bare_scientific_name)
            .unwrap_or_default(),
        synonyms: response.synonyms.clone(),
        vernacular_names: response
            .vernacular_names
            .iter()
            .cloned()
            .map(VernacularEntry::into_name)
            .collect(),
        reference_images,
        source_image_url: source_image_url.to_string(),
        created_at: Utc::now(),
    })
}

/// Pick the bare species name, preferring the authorless field
fn flatten_species_name(without_author: Option<&str>, full: Option<&str>) -> Option<String> {
    let name = match without_author {
        Some(n) if !n.trim().is_empty() => bare_scientific_name(n),
        _ => bare_scientific_name(full.unwrap_or_default()),
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn taxon_bare_name(taxon: &TaxonName) -> Option<String> {
    flatten_species_name(
        taxon.scientific_name_without_author.as_deref(),
        taxon.scientific_name.as_deref(),
    )
}

/// Strip authorship/citation from a scientific name
///
/// Botanical authorship starts with an uppercase token or a parenthesized
/// citation ("Quercus robur L.", "Fagus sylvatica (Tourn.) L."), while
/// the name itself after the genus is lowercase (epithets, "subsp.",
/// "var."). Keeps the genus plus following lowercase tokens.
fn bare_scientific_name(name: &str) -> String {
    let mut parts = name.split_whitespace();
    let mut kept: Vec<&str> = Vec::new();

    if let Some(genus) = parts.next() {
        kept.push(genus);
    }
    for part in parts {
        let lowercase_start = part
            .chars()
            .next()
            .map(|c| c.is_lowercase())
            .unwrap_or(false);
        if lowercase_start {
            kept.push(part);
        } else {
            break;
        }
    }

    kept.join(" ")
}
