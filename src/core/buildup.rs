//! Composite rate build-up from a staging description.
//!
//! Labour is gang hours × gang rate, materials and plant are per-unit
//! allowances picked from keywords. Waste applies to materials only, OH&P to
//! the nett total.

use std::collections::BTreeMap;

use crate::domain::model::{
    GroupMeta, IndexEntry, LabourLine, MaterialLine, NamedGroupFile, PlantLine, RateGroupFile,
    RateIndex, SeedRate, StagingRate,
};
use crate::domain::ports::RateDefaults;
use crate::utils::numeric::{factor_from_percent, round2, round_to};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeAssignment {
    pub trade: &'static str,
    /// "tradespeople+labourers", e.g. "1+0.5"
    pub gang: &'static str,
    pub rate_per_hour: f64,
}

struct TradeRule {
    keywords: &'static [&'static str],
    assignment: TradeAssignment,
}

const fn assign(trade: &'static str, gang: &'static str, rate_per_hour: f64) -> TradeAssignment {
    TradeAssignment {
        trade,
        gang,
        rate_per_hour,
    }
}

// First match wins.
const TRADE_RULES: &[TradeRule] = &[
    TradeRule {
        keywords: &["electric", "power", "light", "cable", "socket", "switch", "wiring", "circuit"],
        assignment: assign("Electrician", "1+0", 84.0),
    },
    TradeRule {
        keywords: &["plumb", "pipe", "drain", "water", "sanitary", "tap", "valve", "toilet", "basin"],
        assignment: assign("Plumber", "1+0.5", 92.0),
    },
    TradeRule {
        keywords: &["hvac", "ventil", "air con", "duct", "heating", "cooling", "extract"],
        assignment: assign("HVAC", "1+1", 95.0),
    },
    TradeRule {
        keywords: &["brick", "block", "masonry", "render", "mortar"],
        assignment: assign("Bricklayer", "1+1", 95.0),
    },
    TradeRule {
        keywords: &["timber", "wood", "frame", "joinery", "door", "window", "stair", "rail"],
        assignment: assign("Carpenter", "1+0.5", 82.5),
    },
    TradeRule {
        keywords: &["roof", "tile", "gutter", "flashing"],
        assignment: assign("Roofer", "1+1", 95.0),
    },
    TradeRule {
        keywords: &["plaster", "render", "skim", "ceiling"],
        assignment: assign("Plasterer", "1+0.5", 82.5),
    },
    TradeRule {
        keywords: &["tile", "ceramic", "porcelain", "mosaic"],
        assignment: assign("Tiler", "1+0.5", 82.5),
    },
    TradeRule {
        keywords: &["paint", "decor", "coating", "finish"],
        assignment: assign("Painter", "1+0", 66.0),
    },
    TradeRule {
        keywords: &["concrete", "excavat", "foundation", "footing", "slab"],
        assignment: assign("Labourer", "0+2", 110.0),
    },
    TradeRule {
        keywords: &["demol", "asbestos", "hazard", "remov"],
        assignment: assign("Specialist", "1+1", 95.0),
    },
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

pub fn classify_trade(description: &str, nrm_group: u8) -> TradeAssignment {
    let desc = description.to_lowercase();
    if let Some(rule) = TRADE_RULES.iter().find(|r| contains_any(&desc, r.keywords)) {
        return rule.assignment;
    }

    match nrm_group {
        0 => assign("Specialist", "1+1", 95.0),
        1 => assign("Labourer", "0+2", 110.0),
        5 => assign("Tradesperson", "1+0", 75.0),
        _ => assign("General", "1+0.5", 82.5),
    }
}

fn normalized_unit(unit: &str) -> String {
    if unit.trim().is_empty() {
        "m2".to_string()
    } else {
        unit.to_lowercase()
    }
}

fn is_area(unit: &str) -> bool {
    unit.contains("m2") || unit.contains("m²")
}

fn is_volume(unit: &str) -> bool {
    unit.contains("m3") || unit.contains("m³")
}

/// Gang hours per unit of measure.
pub fn labour_hours(unit: &str, description: &str) -> f64 {
    let unit = normalized_unit(unit);
    let desc = description.to_lowercase();
    let multiplier = if contains_any(&desc, &["complex", "ornate", "special", "bespoke"]) {
        1.5
    } else {
        1.0
    };

    let base = if is_area(&unit) {
        if contains_any(&desc, &["wall", "brick", "block", "masonry"]) {
            0.6
        } else if contains_any(&desc, &["tile", "floor", "ceil"]) {
            0.35
        } else if contains_any(&desc, &["paint", "coat"]) {
            0.12
        } else if contains_any(&desc, &["roof", "clad"]) {
            0.25
        } else {
            0.3
        }
    } else if is_volume(&unit) {
        1.5
    } else if matches!(unit.as_str(), "m" | "lm") {
        if contains_any(&desc, &["pipe", "cable", "duct"]) {
            0.15
        } else {
            0.25
        }
    } else if matches!(unit.as_str(), "nr" | "ea" | "item" | "unit" | "leaf") {
        if contains_any(&desc, &["simple", "small"]) {
            0.5
        } else if contains_any(&desc, &["large", "complex"]) {
            3.0
        } else {
            1.0
        }
    } else {
        0.5
    };

    base * multiplier
}

pub fn material_cost(unit: &str, description: &str) -> f64 {
    let unit = normalized_unit(unit);
    let desc = description.to_lowercase();

    let base = if contains_any(&desc, &["marble", "granite", "stone", "premium"]) {
        150.0
    } else if contains_any(&desc, &["timber", "hardwood"]) {
        80.0
    } else if contains_any(&desc, &["steel", "metal"]) {
        60.0
    } else if contains_any(&desc, &["tile", "porcelain"]) {
        55.0
    } else if contains_any(&desc, &["brick", "block"]) {
        40.0
    } else if desc.contains("concrete") {
        35.0
    } else if contains_any(&desc, &["plaster", "paint"]) {
        15.0
    } else if desc.contains("insulation") {
        20.0
    } else if contains_any(&desc, &["electric", "cable"]) {
        25.0
    } else if contains_any(&desc, &["pipe", "plumb"]) {
        30.0
    } else {
        25.0
    };

    if is_volume(&unit) {
        base * 5.0
    } else if matches!(unit.as_str(), "nr" | "ea" | "item" | "unit") {
        base * 0.8
    } else {
        base
    }
}

pub fn plant_cost(description: &str, nrm_group: u8) -> f64 {
    let desc = description.to_lowercase();
    if matches!(nrm_group, 0 | 1 | 8) {
        15.0
    } else if contains_any(&desc, &["excavat", "demol", "concrete"]) {
        20.0
    } else if contains_any(&desc, &["scaffold", "height", "lift"]) {
        10.0
    } else if contains_any(&desc, &["crane", "hoist"]) {
        25.0
    } else {
        3.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTotals {
    pub nett_total: f64,
    pub total_rate: f64,
}

/// `nett = labour + materials × waste_factor + plant`, `total = nett × (1 + ohp%)`.
pub fn compute_totals(
    labour: f64,
    materials: f64,
    plant: f64,
    waste_factor: f64,
    ohp_percent: f64,
) -> RateTotals {
    let nett = labour + materials * waste_factor + plant;
    RateTotals {
        nett_total: round2(nett),
        total_rate: round2(nett * (1.0 + ohp_percent / 100.0)),
    }
}

/// Totals of an existing rate at a given waste factor.
pub fn totals_for(rate: &SeedRate, waste_factor: f64) -> RateTotals {
    compute_totals(
        rate.labour_total,
        rate.materials_total,
        rate.plant_total,
        waste_factor,
        rate.ohp_percent,
    )
}

pub fn build_rate(staging: &StagingRate, defaults: &RateDefaults) -> SeedRate {
    let trade = classify_trade(&staging.description, staging.nrm_group);
    let hrs = labour_hours(&staging.unit, &staging.description);
    let mat_cost = material_cost(&staging.unit, &staging.description);
    let plant = plant_cost(&staging.description, staging.nrm_group);
    let labour_cost = hrs * trade.rate_per_hour;

    let nrm2_code = staging
        .nrm2_codes
        .first()
        .cloned()
        .unwrap_or_else(|| "WS1".to_string());
    let task_description: String = staging.description.chars().take(50).collect();
    let output = if hrs > 0.0 { round2(1.0 / hrs) } else { 1.0 };

    let totals = compute_totals(
        round2(labour_cost),
        round2(mat_cost),
        round2(plant),
        factor_from_percent(defaults.waste_percent),
        defaults.ohp_percent,
    );

    SeedRate {
        code: staging.code.clone(),
        name: staging.description.clone(),
        description: Some(
            staging
                .notes
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| staging.description.clone()),
        ),
        unit: staging.unit.clone(),
        nrm1_code: staging.nrm1_code.clone(),
        nrm2_codes: Some(staging.nrm2_codes.join(", ")),
        nrm1_l4_code: None,
        nrm1_l3_code: None,
        nrm1_l2_code: None,
        nrm1_description: None,
        nrm2_primary_ws: None,
        nrm2_primary_ws_name: None,
        nrm2_primary_items: None,
        nrm2_secondary_ws: None,
        mapping_confidence: None,
        spec_level: Some(defaults.spec_level.clone()),
        base_date: Some(defaults.base_date.clone()),
        region: Some(defaults.region.clone()),
        labour: vec![LabourLine {
            nrm2_code: nrm2_code.clone(),
            task_description,
            gang: trade.gang.to_string(),
            output,
            output_unit: format!("{}/hr", staging.unit),
            hrs_per_unit: round_to(hrs, 4),
            rate_per_hour: trade.rate_per_hour,
            cost_per_unit: round2(labour_cost),
            source: "Heuristic".to_string(),
        }],
        materials: vec![MaterialLine {
            nrm2_code: nrm2_code.clone(),
            description: "Materials allowance".to_string(),
            unit: staging.unit.clone(),
            quantity: 1.0,
            unit_rate: round2(mat_cost),
            cost: round2(mat_cost),
            supplier: "TBC".to_string(),
        }],
        plant: vec![PlantLine {
            nrm2_code,
            description: "Plant allowance".to_string(),
            unit: staging.unit.clone(),
            quantity: 1.0,
            unit_rate: round2(plant),
            cost: round2(plant),
            notes: None,
        }],
        components: None,
        labour_hours_per_unit: None,
        gang_composition: None,
        material_waste_factor: None,
        labour_total: round2(labour_cost),
        materials_total: round2(mat_cost),
        plant_total: round2(plant),
        waste_percent: defaults.waste_percent,
        nett_total: totals.nett_total,
        ohp_percent: defaults.ohp_percent,
        total_rate: totals.total_rate,
    }
}

pub fn group_name(group: u8) -> &'static str {
    match group {
        0 => "facilitating",
        1 => "substructure",
        2 => "superstructure",
        3 => "finishes",
        4 => "fittings",
        5 => "services",
        6 => "prefabricated",
        7 => "existing",
        8 => "external",
        _ => "unknown",
    }
}

pub fn group_file_name(group: u8) -> String {
    format!("group_{}_{}.json", group, group_name(group))
}

/// Builds every staging rate and splits the results into group files plus
/// the index that lists them.
pub fn build_groups(
    staging: &[StagingRate],
    defaults: &RateDefaults,
    generated: &str,
) -> (Vec<NamedGroupFile>, RateIndex) {
    let mut grouped: BTreeMap<u8, Vec<SeedRate>> = BTreeMap::new();
    for rate in staging {
        grouped
            .entry(rate.nrm_group)
            .or_default()
            .push(build_rate(rate, defaults));
    }

    let mut index = RateIndex::default();
    let mut files = Vec::with_capacity(grouped.len());
    for (group, rates) in grouped {
        let file_name = group_file_name(group);
        index.groups.insert(
            group.to_string(),
            IndexEntry {
                name: group_name(group).to_string(),
                file: file_name.clone(),
                count: rates.len(),
                codes: rates.iter().map(|r| r.code.clone()).collect(),
            },
        );
        index.total += rates.len();

        files.push(NamedGroupFile {
            file_name,
            data: RateGroupFile {
                meta: GroupMeta {
                    nrm_group: group,
                    group_name: group_name(group).to_string(),
                    count: rates.len(),
                    generated: generated.to_string(),
                    source: defaults.source.clone(),
                    enriched_date: None,
                    crosswalk_version: None,
                    transformed: None,
                    resource_linked: None,
                },
                rates,
            },
        });
    }

    (files, index)
}
