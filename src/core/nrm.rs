//! NRM enrichment: score each rate against the crosswalk rows of its level 2
//! code and copy the best row's NRM1/NRM2 fields onto the rate.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::core::crosswalk::{Crosswalk, CrosswalkEntry};
use crate::core::similarity::{extract_keywords, keyword_overlap, text_similarity};
use crate::domain::enums::MappingConfidence;
use crate::domain::model::{NamedGroupFile, SeedRate};

pub const CONFIDENCE_HIGH: f64 = 0.75;
pub const CONFIDENCE_MEDIUM: f64 = 0.50;

const UNIT_WEIGHT: f64 = 0.4;
const DESCRIPTION_WEIGHT: f64 = 0.4;
const KEYWORD_WEIGHT: f64 = 0.2;

const UNIT_EQUIVALENTS: &[(&str, &[&str])] = &[
    ("m²", &["m2", "sqm", "sq.m"]),
    ("m³", &["m3", "cum", "cu.m"]),
    ("m", &["lm", "lin.m", "linear m"]),
    ("nr", &["no", "each", "item", "ea"]),
    ("item", &["nr", "no", "each", "ea"]),
];

pub fn normalize_unit(unit: &str) -> String {
    let unit = unit.trim().to_lowercase();
    UNIT_EQUIVALENTS
        .iter()
        .find(|(standard, variants)| *standard == unit || variants.contains(&unit.as_str()))
        .map(|(standard, _)| standard.to_string())
        .unwrap_or(unit)
}

/// Equal after normalization, or any part of a "a/b" crosswalk unit matches.
pub fn units_compatible(rate_unit: &str, crosswalk_unit: &str) -> bool {
    let rate_unit = normalize_unit(rate_unit);
    if rate_unit == normalize_unit(crosswalk_unit) {
        return true;
    }
    crosswalk_unit.contains('/')
        && crosswalk_unit
            .split('/')
            .any(|part| normalize_unit(part) == rate_unit)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchScore {
    pub unit_score: f64,
    pub description_score: f64,
    pub keyword_score: f64,
    pub total_score: f64,
    pub confidence: MappingConfidence,
}

pub fn confidence_for(total_score: f64) -> MappingConfidence {
    if total_score >= CONFIDENCE_HIGH {
        MappingConfidence::High
    } else if total_score >= CONFIDENCE_MEDIUM {
        MappingConfidence::Medium
    } else {
        MappingConfidence::Low
    }
}

fn rate_text(rate: &SeedRate) -> String {
    format!(
        "{} {}",
        rate.name,
        rate.description.as_deref().unwrap_or_default()
    )
}

pub fn score_match(rate: &SeedRate, entry: &CrosswalkEntry) -> MatchScore {
    let unit_score = if units_compatible(&rate.unit, &entry.nrm1_unit) {
        1.0
    } else {
        0.0
    };
    let text = rate_text(rate);
    let description_score = text_similarity(&text, &entry.nrm1_description);
    let keyword_score = keyword_overlap(&entry.keywords(), &extract_keywords(&text));

    let total_score = unit_score * UNIT_WEIGHT
        + description_score * DESCRIPTION_WEIGHT
        + keyword_score * KEYWORD_WEIGHT;

    MatchScore {
        unit_score,
        description_score,
        keyword_score,
        total_score,
        confidence: confidence_for(total_score),
    }
}

/// Copies the NRM1/NRM2 columns of `entry` onto `rate`.
pub fn apply_entry(rate: &mut SeedRate, entry: &CrosswalkEntry, confidence: MappingConfidence) {
    rate.nrm1_l4_code = Some(entry.nrm1_l4_code.clone());
    rate.nrm1_l3_code = Some(entry.nrm1_l3_code.clone());
    rate.nrm1_l2_code = Some(entry.nrm1_l2_code.clone());
    rate.nrm1_description = Some(entry.nrm1_description.clone());
    rate.nrm2_primary_ws = Some(entry.nrm2_primary_ws.clone());
    rate.nrm2_primary_ws_name = Some(entry.nrm2_primary_ws_name.clone());
    rate.nrm2_primary_items = Some(entry.nrm2_primary_items.clone());
    rate.nrm2_secondary_ws = Some(entry.nrm2_secondary_ws.clone());
    rate.mapping_confidence = Some(confidence);
}

fn clear_mapping(rate: &mut SeedRate, l2_code: String) {
    rate.nrm1_l2_code = Some(l2_code);
    for field in [
        &mut rate.nrm1_l4_code,
        &mut rate.nrm1_l3_code,
        &mut rate.nrm1_description,
        &mut rate.nrm2_primary_ws,
        &mut rate.nrm2_primary_ws_name,
        &mut rate.nrm2_primary_items,
        &mut rate.nrm2_secondary_ws,
    ] {
        *field = Some(String::new());
    }
    rate.mapping_confidence = Some(MappingConfidence::Unmatched);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SectionStats {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichmentStats {
    pub total_rates: usize,
    pub total_files: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub no_match: usize,
    /// Manually fixed rates left as they were
    pub manual_kept: usize,
    pub by_section: BTreeMap<String, SectionStats>,
}

impl EnrichmentStats {
    pub fn matched(&self) -> usize {
        self.total_rates - self.no_match
    }

    fn record(&mut self, section: &str, confidence: MappingConfidence) {
        let entry = self.by_section.entry(section.to_string()).or_default();
        entry.total += 1;
        match confidence {
            MappingConfidence::High => {
                entry.high += 1;
                self.high_confidence += 1;
            }
            MappingConfidence::Medium => {
                entry.medium += 1;
                self.medium_confidence += 1;
            }
            _ => {
                entry.low += 1;
                self.low_confidence += 1;
            }
        }
    }

    fn percent_of_matched(&self, count: usize) -> f64 {
        match self.matched() {
            0 => 0.0,
            matched => count as f64 / matched as f64 * 100.0,
        }
    }
}

pub struct NrmEnricher<'a> {
    crosswalk: &'a Crosswalk,
    stats: EnrichmentStats,
}

impl<'a> NrmEnricher<'a> {
    pub fn new(crosswalk: &'a Crosswalk) -> Self {
        Self {
            crosswalk,
            stats: EnrichmentStats::default(),
        }
    }

    /// Highest scoring row for the rate's level 2 code; earlier rows win ties.
    pub fn find_best_match(&self, rate: &SeedRate) -> Option<(&'a CrosswalkEntry, MatchScore)> {
        let l2_code = rate.nrm1_reference()?;
        let mut best: Option<(&CrosswalkEntry, MatchScore)> = None;
        for entry in self.crosswalk.candidates(l2_code) {
            let score = score_match(rate, entry);
            if best.map_or(true, |(_, b)| score.total_score > b.total_score) {
                best = Some((entry, score));
            }
        }
        best
    }

    pub fn enrich_rate(&mut self, rate: &mut SeedRate) -> MappingConfidence {
        if rate.mapping_confidence == Some(MappingConfidence::Manual) {
            rate.nrm1_code = None;
            rate.nrm2_codes = None;
            self.stats.manual_kept += 1;
            self.stats.total_rates += 1;
            return MappingConfidence::Manual;
        }

        let confidence = match self.find_best_match(rate) {
            Some((entry, score)) => {
                apply_entry(rate, entry, score.confidence);
                self.stats.record(entry.section(), score.confidence);
                score.confidence
            }
            None => {
                let original = rate
                    .nrm1_reference()
                    .map(str::to_string)
                    .unwrap_or_default();
                clear_mapping(rate, original);
                self.stats.no_match += 1;
                MappingConfidence::Unmatched
            }
        };

        rate.nrm1_code = None;
        rate.nrm2_codes = None;
        self.stats.total_rates += 1;
        confidence
    }

    pub fn enrich_file(&mut self, file: &mut NamedGroupFile, enriched_date: &str, crosswalk_version: &str) {
        for rate in &mut file.data.rates {
            self.enrich_rate(rate);
        }
        file.data.meta.enriched_date = Some(enriched_date.to_string());
        file.data.meta.crosswalk_version = Some(crosswalk_version.to_string());
        self.stats.total_files += 1;
        tracing::debug!(
            "Enriched {} rates in {}",
            file.data.rates.len(),
            file.file_name
        );
    }

    pub fn stats(&self) -> &EnrichmentStats {
        &self.stats
    }

    pub fn into_stats(self) -> EnrichmentStats {
        self.stats
    }
}

const REVIEW_LIMIT: usize = 50;

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Markdown summary of an enrichment run plus the rates needing review.
pub fn render_mapping_qa(
    stats: &EnrichmentStats,
    files: &[NamedGroupFile],
    generated_at: &str,
    crosswalk_source: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# NRM Mapping QA Report\n");
    let _ = writeln!(out, "**Generated**: {}\n", generated_at);
    let _ = writeln!(out, "**Crosswalk Source**: `{}`\n", crosswalk_source);

    let _ = writeln!(out, "## Summary Statistics\n");
    let _ = writeln!(out, "- **Total Files Processed**: {}", stats.total_files);
    let _ = writeln!(out, "- **Total Rates Processed**: {}\n", stats.total_rates);

    let _ = writeln!(out, "## Mapping Confidence Breakdown\n");
    let _ = writeln!(out, "| Confidence Level | Count | Percentage |");
    let _ = writeln!(out, "|------------------|-------|------------|");
    let _ = writeln!(
        out,
        "| High (≥75%)      | {} | {:.1}% |",
        stats.high_confidence,
        stats.percent_of_matched(stats.high_confidence)
    );
    let _ = writeln!(
        out,
        "| Medium (50-75%)  | {} | {:.1}% |",
        stats.medium_confidence,
        stats.percent_of_matched(stats.medium_confidence)
    );
    let _ = writeln!(
        out,
        "| Low (<50%)       | {} | {:.1}% |",
        stats.low_confidence,
        stats.percent_of_matched(stats.low_confidence)
    );
    let _ = writeln!(out, "| No Match         | {} | - |\n", stats.no_match);

    let _ = writeln!(out, "## Statistics by NRM Section\n");
    let _ = writeln!(out, "| Section | Total | High | Medium | Low |");
    let _ = writeln!(out, "|---------|-------|------|--------|-----|");
    for (section, s) in &stats.by_section {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            section, s.total, s.high, s.medium, s.low
        );
    }

    let _ = writeln!(out, "\n## Items Requiring Manual Review\n");
    let _ = writeln!(
        out,
        "The following items have low confidence mappings and should be manually reviewed:\n"
    );

    let with_confidence = |wanted: MappingConfidence| {
        files
            .iter()
            .flat_map(move |f| {
                f.data
                    .rates
                    .iter()
                    .filter(move |r| r.mapping_confidence == Some(wanted))
                    .map(move |r| (f.file_name.as_str(), r))
            })
            .collect::<Vec<_>>()
    };

    let low = with_confidence(MappingConfidence::Low);
    if low.is_empty() {
        let _ = writeln!(out, "[OK] No low confidence items found!");
    } else {
        let _ = writeln!(out, "**Total Low Confidence Items**: {}\n", low.len());
        let _ = writeln!(
            out,
            "| File | Code | Name | Unit | L2 Code | L4 Code | NRM1 Description |"
        );
        let _ = writeln!(
            out,
            "|------|------|------|------|---------|---------|------------------|"
        );
        for (file, rate) in low.iter().take(REVIEW_LIMIT) {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {}... |",
                file,
                rate.code,
                rate.name,
                rate.unit,
                rate.nrm1_l2_code.as_deref().unwrap_or_default(),
                rate.nrm1_l4_code.as_deref().unwrap_or_default(),
                truncate(rate.nrm1_description.as_deref().unwrap_or_default(), 50)
            );
        }
        if low.len() > REVIEW_LIMIT {
            let _ = writeln!(
                out,
                "\n*Showing first {} of {} items*",
                REVIEW_LIMIT,
                low.len()
            );
        }
    }

    let unmatched = with_confidence(MappingConfidence::Unmatched);
    if !unmatched.is_empty() {
        let _ = writeln!(out, "\n## Items With No Matches\n");
        let _ = writeln!(out, "**Total No Match Items**: {}\n", unmatched.len());
        let _ = writeln!(out, "| File | Code | Name | Unit | Original L2 Code |");
        let _ = writeln!(out, "|------|------|------|------|------------------|");
        for (file, rate) in unmatched {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                file,
                rate.code,
                rate.name,
                rate.unit,
                rate.nrm1_l2_code.as_deref().unwrap_or_default()
            );
        }
    }

    out
}

// Manual corrections for rates the crosswalk cannot place.

/// Facilitating works rates whose source code was blank: (code, L2, L4, reason).
pub const FACILITATING_MAPPINGS: &[(&str, &str, &str, &str)] = &[
    ("GRP0-ASBREM-001", "0.1", "0.1.1.1", "Asbestos removal - toxic material"),
    ("GRP0-ASBREM-002", "0.1", "0.1.1.1", "Asbestos removal - toxic material"),
    ("GRP0-LEAPAI-003", "0.1", "0.1.1.1", "Lead paint removal - toxic material"),
    ("GRP0-DEM-004", "0.2", "0.2.1.1", "Demolition of entire buildings"),
    ("GRP0-DEM-005", "0.2", "0.2.1.1", "Demolition of entire buildings"),
    ("GRP0-DEM-006", "0.2", "0.2.1.1", "Demolition of entire buildings"),
    ("GRP0-DEM-007", "0.2", "0.2.1.1", "Demolition of entire buildings"),
    ("GRP0-DEM-008", "0.2", "0.2.1.1", "Demolition of entire buildings"),
    ("GRP0-TEMSTO-009", "0.5", "0.5.1.1", "Temporary diversion of drains"),
    ("GRP0-TEMSEW-010", "0.5", "0.5.1.1", "Temporary diversion of drains"),
    ("GRP0-TEMPOW-011", "0.5", "0.5.1.2", "Temporary diversion of services"),
    ("GRP0-ROCBRE-012", "0.6", "0.6.1.1", "Excavation works - rock breaking"),
    ("GRP0-ROCBRE-013", "0.6", "0.6.1.1", "Excavation works - rock breaking"),
    ("GRP0-DEW-014", "0.4", "0.4.1.1", "Site dewatering"),
    ("GRP0-DEW-015", "0.4", "0.4.1.1", "Site dewatering"),
    ("GRP0-GROIMP-016", "0.4", "0.4.2.1", "Soil stabilisation measures"),
    ("GRP0-GROIMP-017", "0.4", "0.4.2.1", "Soil stabilisation measures"),
];

/// Services level 2 codes that span several elements.
pub const SERVICES_RANGE_CODES: &[&str] = &["5.3-5.4", "5.5-5.7"];

const L4_KEYWORD_GROUPS: &[&[&str]] = &[
    &["toxic", "hazardous"],
    &["demolition"],
    &["diversion"],
    &["excavation"],
    &["dewatering"],
    &["stabilisation"],
    &["hot water"],
    &["water", "cold water"],
    &["heater"],
    &["air conditioning", "cooling"],
    &["heating"],
    &["ventilation", "fan", "exhaust"],
];

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric()).any(|w| w == word)
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Resolves a services range code to one element by the rate name.
pub fn services_l2_mapping(name: &str) -> (&'static str, &'static str) {
    let name = name.to_lowercase();
    if contains_any(&name, &["hot water", "water heater"]) {
        ("5.4", "Hot water system")
    } else if contains_any(&name, &["water", "rainwater", "tempering"]) {
        ("5.4", "Water installation")
    } else if has_word(&name, "ac") || contains_any(&name, &["air conditioning", "split system"]) {
        ("5.6", "Air conditioning system")
    } else if name.contains("ducted")
        && contains_any(&name, &["ductwork", "grille", "diffuser"])
    {
        ("5.6", "Ducted air conditioning")
    } else if contains_any(&name, &["vrf", "chiller", "cooling", "ahu", "fcu"]) {
        ("5.6", "Central cooling system")
    } else if name.contains("bms") && name.contains("control") {
        ("5.6", "BMS controls")
    } else if contains_any(&name, &["heating", "heater", "fireplace", "boiler"]) {
        ("5.6", "Heating system")
    } else if contains_any(
        &name,
        &["exhaust", "fan", "ventilation", "hrv", "erv", "smoke", "stair press"],
    ) {
        ("5.7", "Ventilation system")
    } else {
        ("5.6", "Mechanical services")
    }
}

/// First candidate whose description shares a keyword group with the name,
/// else the first candidate.
pub fn best_l4_match<'a>(
    crosswalk: &'a Crosswalk,
    l2_code: &str,
    item_name: &str,
) -> Option<&'a CrosswalkEntry> {
    let candidates = crosswalk.candidates(l2_code);
    let name = item_name.to_lowercase();
    candidates
        .iter()
        .find(|candidate| {
            let desc = candidate.nrm1_description.to_lowercase();
            L4_KEYWORD_GROUPS
                .iter()
                .any(|group| contains_any(&name, group) && contains_any(&desc, group))
        })
        .or_else(|| candidates.first())
        .copied()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualFix {
    pub file: String,
    pub code: String,
    pub name: String,
    pub from_l2: String,
    pub l2_code: String,
    pub l4_code: String,
    pub reason: String,
}

/// Applies the facilitating table and the services range remap to every
/// matching rate. Returns one record per rate changed.
pub fn apply_manual_fixes(crosswalk: &Crosswalk, files: &mut [NamedGroupFile]) -> Vec<ManualFix> {
    let mut fixes = Vec::new();

    for file in files.iter_mut() {
        for rate in &mut file.data.rates {
            let from_l2 = rate.nrm1_l2_code.clone().unwrap_or_default();

            let (target_l2, entry, reason) = if let Some((_, l2, l4, reason)) =
                FACILITATING_MAPPINGS.iter().find(|(code, ..)| *code == rate.code)
            {
                let entry = crosswalk
                    .by_l4(l4)
                    .or_else(|| best_l4_match(crosswalk, l2, &rate.name));
                (*l2, entry, *reason)
            } else if SERVICES_RANGE_CODES.contains(&from_l2.as_str()) {
                let (l2, reason) = services_l2_mapping(&rate.name);
                (l2, best_l4_match(crosswalk, l2, &rate.name), reason)
            } else {
                continue;
            };

            let Some(entry) = entry else {
                tracing::warn!(
                    "⚠️ No crosswalk row for {} under L2 {}, left unchanged",
                    rate.code,
                    target_l2
                );
                continue;
            };

            apply_entry(rate, entry, MappingConfidence::Manual);
            tracing::debug!(
                "{}: {} -> L2 {} -> L4 {} ({})",
                rate.code,
                from_l2,
                target_l2,
                entry.nrm1_l4_code,
                reason
            );
            fixes.push(ManualFix {
                file: file.file_name.clone(),
                code: rate.code.clone(),
                name: rate.name.clone(),
                from_l2,
                l2_code: entry.nrm1_l2_code.clone(),
                l4_code: entry.nrm1_l4_code.clone(),
                reason: reason.to_string(),
            });
        }
    }

    fixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crosswalk::fixtures::CROSSWALK_CSV;
    use crate::domain::model::{GroupMeta, RateGroupFile};

    fn crosswalk() -> Crosswalk {
        Crosswalk::from_csv(CROSSWALK_CSV.as_bytes()).unwrap()
    }

    fn rate(code: &str, name: &str, unit: &str, nrm1: &str) -> SeedRate {
        serde_json::from_value(serde_json::json!({
            "code": code,
            "name": name,
            "description": name,
            "unit": unit,
            "nrm1_code": nrm1,
            "nrm2_codes": "WS28",
        }))
        .unwrap()
    }

    fn file(name: &str, rates: Vec<SeedRate>) -> NamedGroupFile {
        NamedGroupFile {
            file_name: name.to_string(),
            data: RateGroupFile {
                meta: GroupMeta {
                    nrm_group: 3,
                    group_name: "finishes".to_string(),
                    count: rates.len(),
                    generated: "2025-01-15".to_string(),
                    source: "test".to_string(),
                    enriched_date: None,
                    crosswalk_version: None,
                    transformed: None,
                    resource_linked: None,
                },
                rates,
            },
        }
    }

    #[test]
    fn test_unit_normalization() {
        assert_eq!(normalize_unit(" SQM "), "m²");
        assert_eq!(normalize_unit("each"), "nr");
        assert!(units_compatible("m2", "m²"));
        assert!(units_compatible("no", "m2/nr"));
        assert!(units_compatible("m2", "m2/nr"));
        assert!(!units_compatible("m3", "m2/nr"));
    }

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(confidence_for(0.75), MappingConfidence::High);
        assert_eq!(confidence_for(0.5), MappingConfidence::Medium);
        assert_eq!(confidence_for(0.49), MappingConfidence::Low);
    }

    #[test]
    fn test_best_match_prefers_description_and_keywords() {
        let crosswalk = crosswalk();
        let enricher = NrmEnricher::new(&crosswalk);
        let tiling = rate("3.1.2", "Ceramic tiling to walls", "m2", "3.1");

        let (entry, score) = enricher.find_best_match(&tiling).unwrap();
        assert_eq!(entry.nrm1_l4_code, "3.1.1.2");
        assert_eq!(score.unit_score, 1.0);
        assert!(score.keyword_score > 0.0);
    }

    #[test]
    fn test_enrich_rate_moves_codes_and_counts() {
        let crosswalk = crosswalk();
        let mut enricher = NrmEnricher::new(&crosswalk);

        let mut matched = rate("3.1.1", "Plaster finish to walls", "m2", "3.1");
        let mut missing = rate("9.1.1", "Unknown work", "m2", "9.1");
        enricher.enrich_rate(&mut matched);
        let confidence = enricher.enrich_rate(&mut missing);

        assert_eq!(matched.nrm1_l4_code.as_deref(), Some("3.1.1.1"));
        assert_eq!(matched.nrm2_primary_ws.as_deref(), Some("28"));
        assert!(matched.nrm1_code.is_none());
        assert!(matched.nrm2_codes.is_none());

        assert_eq!(confidence, MappingConfidence::Unmatched);
        assert_eq!(missing.nrm1_l2_code.as_deref(), Some("9.1"));
        assert_eq!(missing.nrm1_l4_code.as_deref(), Some(""));

        let stats = enricher.stats();
        assert_eq!(stats.total_rates, 2);
        assert_eq!(stats.no_match, 1);
        assert_eq!(stats.by_section["3"].total, 1);
    }

    #[test]
    fn test_enrichment_is_repeatable() {
        let crosswalk = crosswalk();
        let mut enricher = NrmEnricher::new(&crosswalk);
        let mut tiling = rate("3.1.2", "Ceramic tiling to walls", "m2", "3.1");
        enricher.enrich_rate(&mut tiling);
        let first = tiling.clone();
        enricher.enrich_rate(&mut tiling);
        assert_eq!(tiling, first);
    }

    #[test]
    fn test_mapping_qa_lists_unmatched() {
        let crosswalk = crosswalk();
        let mut enricher = NrmEnricher::new(&crosswalk);
        let mut files = vec![file(
            "group_3_finishes.json",
            vec![
                rate("3.1.1", "Plaster finish to walls", "m2", "3.1"),
                rate("9.1.1", "Unknown work", "m2", "9.1"),
            ],
        )];
        enricher.enrich_file(&mut files[0], "2025-01-15", "crosswalk.csv");
        assert_eq!(files[0].data.meta.enriched_date.as_deref(), Some("2025-01-15"));

        let report = render_mapping_qa(enricher.stats(), &files, "2025-01-15", "crosswalk.csv");
        assert!(report.contains("**Total Rates Processed**: 2"));
        assert!(report.contains("## Items With No Matches"));
        assert!(report.contains("| group_3_finishes.json | 9.1.1 | Unknown work | m2 | 9.1 |"));
    }

    #[test]
    fn test_services_l2_mapping_uses_whole_word_ac() {
        assert_eq!(services_l2_mapping("Hot water unit").0, "5.4");
        assert_eq!(services_l2_mapping("Split system AC 7kW"), ("5.6", "Air conditioning system"));
        assert_eq!(services_l2_mapping("Bathroom exhaust fan"), ("5.7", "Ventilation system"));
        // "vacuum" must not read as "ac"
        assert_eq!(services_l2_mapping("Ducted vacuum system"), ("5.6", "Mechanical services"));
    }

    #[test]
    fn test_manual_fixes() {
        let crosswalk = crosswalk();
        let mut facilitating = rate("GRP0-DEM-004", "Demolish house", "item", "");
        facilitating.nrm1_code = None;
        facilitating.nrm1_l2_code = Some(String::new());

        let mut heater = rate("5.X.1", "Gas hot water heater", "nr", "");
        heater.nrm1_code = None;
        heater.nrm1_l2_code = Some("5.3-5.4".to_string());

        let mut untouched = rate("3.1.1", "Paint", "m2", "3.1");
        untouched.nrm1_l2_code = Some("3.1".to_string());

        let mut files = vec![file(
            "group_0_facilitating.json",
            vec![facilitating, heater, untouched.clone()],
        )];
        let fixes = apply_manual_fixes(&crosswalk, &mut files);

        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].l4_code, "0.2.1.1");
        assert_eq!(fixes[1].from_l2, "5.3-5.4");
        // "water" group hits the cold water row first
        assert_eq!(fixes[1].l4_code, "5.4.1.1");
        let rates = &files[0].data.rates;
        assert_eq!(rates[1].mapping_confidence, Some(MappingConfidence::Manual));
        assert_eq!(rates[2], untouched);
    }

    #[test]
    fn test_reenrichment_keeps_manual_mappings() {
        let crosswalk = crosswalk();
        let mut heater = rate("5.X.1", "Gas hot water heater", "nr", "");
        heater.nrm1_code = None;
        heater.nrm1_l2_code = Some("5.3-5.4".to_string());
        heater.nrm2_codes = None;
        let mut files = vec![file("group_5_services.json", vec![heater])];
        apply_manual_fixes(&crosswalk, &mut files);
        let fixed = files[0].data.rates[0].clone();
        assert_eq!(fixed.nrm1_l4_code.as_deref(), Some("5.4.1.1"));

        let mut enricher = NrmEnricher::new(&crosswalk);
        enricher.enrich_file(&mut files[0], "2025-02-01", "crosswalk.csv");

        assert_eq!(files[0].data.rates[0], fixed);
        let stats = enricher.stats();
        assert_eq!(stats.manual_kept, 1);
        assert_eq!(stats.no_match, 0);
        assert_eq!(stats.matched(), 1);
    }
}
