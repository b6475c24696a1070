//! Replaces inline labour, material and plant lines with links into the
//! resource library (`LAB_`, `MAT_`, `PLT_` ids).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::core::heuristics::resource_id;
use crate::core::waste::effective_waste_factor;
use crate::domain::enums::Market;
use crate::domain::model::{ComponentLine, Components, NamedGroupFile, SeedRate};
use crate::domain::schema::ResourceKind;
use crate::utils::error::Result;
use crate::utils::numeric::round_to;

// (pattern, trade); checked in order.
const TRADE_KEYWORDS: &[(&str, &str)] = &[
    (r"asbestos|hazmat|toxic|contamin", "CIVIL"),
    (r"demolit|strip.?out", "CIVIL"),
    (r"electri|power|cable|light|switch|outlet", "ELECTRICIAN"),
    (r"plumb|pipe|drain|sewer|water.?main|tap|valve", "PLUMBER"),
    (r"brick|block|masonry|pointing", "BRICKLAYER"),
    (r"paint|coat|prime|finish|stain", "PAINTER"),
    (r"tile|floor.?finish|ceramic|porcelain", "TILER"),
    (r"roof|gutter|fascia|eave|soffit", "ROOFER"),
    (r"concret|slab|footing|pour", "CONCRETER"),
    (r"steel|weld|reinforce|rebar|reo", "STEEL_FIXER"),
    (r"carp|timber|frame|joist|bearer|truss", "CARPENTER"),
    (r"plaster|gyprock|drywall|cornice|ceiling.?lining", "PLASTERER"),
    (r"glaz|window|glass|mirror", "GLAZIER"),
    (r"hvac|air.?con|duct|ventil|split.?system", "HVAC"),
    (r"insul|batts|wrap|thermal", "INSULATOR"),
    (r"landscap|garden|plant|turf|mulch", "LANDSCAPER"),
    (r"pav|paver|brick.?pav", "PAVER"),
    (r"fence|gate|screen", "FENCER"),
    (r"waterproof|membrane", "WATERPROOFER"),
    (r"joiner|cabinet|bench|cupboard", "JOINER"),
    (r"survey|setout", "SURVEYOR"),
    (r"excavat|dig|trench|earth", "CIVIL"),
];

const PLANT_KEYWORDS: &[(&str, &str)] = &[
    (r"excavat|dig|trench|bulk.?cut", "MINI_EXCAVATOR"),
    (r"demolit|break|crush", "BREAKER"),
    (r"concret|pour|slab", "VIBRATOR"),
    (r"crane|lift|hoist", "CRANE"),
    (r"scaffold|height|high.?level", "SCAFFOLD"),
    (r"compact|roll|subgrade", "COMPACTOR"),
    (r"clear|grub|strip", "SKID_STEER"),
    (r"generator|power.?supply", "GENERATOR"),
    (r"ewp|platform|cherry.?pick", "EWP"),
    (r"pump|dewater", "CONCRETE_PUMP"),
    (r"skip|bin|waste", "SKIP_BIN"),
];

const MATERIAL_KEYWORDS: &[(&str, &str)] = &[
    (r"brick", "BRICKS"),
    (r"concrete|cement", "CONCRETE"),
    (r"plasterboard|gyprock|drywall", "PLASTERBOARD"),
    (r"timber|frame|stud", "FRAMING"),
    (r"tile", "FLOOR_TILES"),
    (r"carpet", "CARPET"),
    (r"paint", "PAINT"),
    (r"insul|batt", "ACOUSTIC_BATTS"),
    (r"membrane|waterproof", "WATERPROOF_MEMBRANE"),
    (r"door", "DOOR"),
    (r"window", "WINDOW"),
    (r"pipe|drain", "DRAINAGE"),
    (r"cable|wire", "ELEC_CABLE"),
    (r"conduit", "CONDUIT"),
    (r"flashin", "FLASHINGS"),
    (r"cornice", "CORNICE"),
    (r"cladding", "CLADDING"),
    (r"fence", "FENCE"),
    (r"decking", "DECKING"),
    (r"basin|sink", "BASIN"),
    (r"bath|tub", "BATH"),
];

/// Built-in plant hire items: (item, name, hourly rate).
const PLANT_LIBRARY: &[(&str, &str, f64)] = &[
    ("EXCAVATOR", "Excavator", 180.0),
    ("MINI_EXCAVATOR", "Mini Excavator", 120.0),
    ("SKID_STEER", "Skid Steer Loader", 100.0),
    ("COMPACTOR", "Compactor", 80.0),
    ("ROLLER", "Roller", 90.0),
    ("TIPPER_TRUCK", "Tipper Truck", 95.0),
    ("AUGER_DRILL", "Auger Drill Rig", 250.0),
    ("VIBRATOR", "Concrete Vibrator", 25.0),
    ("NAIL_GUN", "Nail Gun", 15.0),
    ("LIFTING_GEAR", "Lifting Gear", 50.0),
    ("CRANE", "Mobile Crane", 350.0),
    ("BREAKER", "Hydraulic Breaker", 150.0),
    ("SCAFFOLD", "Scaffold", 12.0),
    ("CONCRETE_PUMP", "Concrete Pump", 200.0),
    ("GENERATOR", "Generator", 60.0),
    ("EWP", "Elevated Work Platform", 180.0),
    ("SKIP_BIN", "Skip Bin", 150.0),
];

fn nrm_fallback_trade(section: char) -> &'static str {
    match section {
        '0' | '8' => "CIVIL",
        '1' => "CONCRETER",
        '2' => "CARPENTER",
        '3' => "PLASTERER",
        '4' => "JOINER",
        '5' => "ELECTRICIAN",
        _ => "TRADES",
    }
}

/// Entry of `labour-rates.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabourRateEntry {
    pub resource_id: String,
    #[serde(default)]
    pub trade: Option<String>,
    #[serde(default)]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabourRateFile {
    pub rates: Vec<LabourRateEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantResource {
    pub name: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceLibrary {
    pub labour: BTreeMap<String, LabourRateEntry>,
    pub materials: BTreeSet<String>,
    pub plant: BTreeMap<String, PlantResource>,
}

impl ResourceLibrary {
    pub fn new(market: Market) -> Self {
        let plant = PLANT_LIBRARY
            .iter()
            .map(|(item, name, rate)| {
                (
                    resource_id(ResourceKind::Plant, market, item),
                    PlantResource {
                        name: name.to_string(),
                        rate: *rate,
                    },
                )
            })
            .collect();
        Self {
            plant,
            ..Default::default()
        }
    }

    pub fn with_labour(mut self, file: LabourRateFile) -> Self {
        self.labour = file
            .rates
            .into_iter()
            .map(|r| (r.resource_id.clone(), r))
            .collect();
        self
    }

    /// Material ids from resource file names (`MAT_AU_PAINT.json`).
    pub fn with_material_files<'a>(
        mut self,
        market: Market,
        file_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let prefix = format!("MAT_{}_", market);
        self.materials = file_names
            .into_iter()
            .filter(|f| f.starts_with(&prefix))
            .filter_map(|f| f.strip_suffix(".json"))
            .map(str::to_string)
            .collect();
        self
    }
}

fn compile(rules: &[(&str, &str)], kind: ResourceKind, market: Market) -> Result<Vec<(Regex, String)>> {
    rules
        .iter()
        .map(|(pattern, item)| Ok((Regex::new(pattern)?, resource_id(kind, market, item))))
        .collect()
}

fn first_hit<'r>(rules: &'r [(Regex, String)], text: &str) -> Option<&'r str> {
    rules
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, id)| id.as_str())
}

/// Parses "1+0.5" into (tradespeople, labourers).
pub fn parse_gang(gang: &str) -> (f64, f64) {
    let mut parts = gang.split('+').map(|p| p.trim().parse::<f64>().unwrap_or(0.0));
    let trade = parts.next().unwrap_or(0.0);
    let labourer = parts.next().unwrap_or(0.0);
    (trade, labourer)
}

pub struct ResourceLinker {
    market: Market,
    library: ResourceLibrary,
    trades: Vec<(Regex, String)>,
    plant: Vec<(Regex, String)>,
    materials: Vec<(Regex, String)>,
}

impl ResourceLinker {
    pub fn new(market: Market, library: ResourceLibrary) -> Result<Self> {
        Ok(Self {
            market,
            trades: compile(TRADE_KEYWORDS, ResourceKind::Labour, market)?,
            plant: compile(PLANT_KEYWORDS, ResourceKind::Plant, market)?,
            materials: compile(MATERIAL_KEYWORDS, ResourceKind::Material, market)?,
            library,
        })
    }

    pub fn library(&self) -> &ResourceLibrary {
        &self.library
    }

    pub fn detect_trade(&self, description: &str, nrm1_code: Option<&str>) -> String {
        if let Some(id) = first_hit(&self.trades, &description.to_lowercase()) {
            return id.to_string();
        }
        let trade = nrm1_code
            .and_then(|code| code.chars().next())
            .map(nrm_fallback_trade)
            .unwrap_or("TRADES");
        resource_id(ResourceKind::Labour, self.market, trade)
    }

    /// One labour line for the trade hours and one for the labourer hours.
    pub fn expand_gang(&self, gang: &str, trade_id: &str, hrs_per_unit: f64) -> Vec<ComponentLine> {
        let (trade_count, labourer_count) = parse_gang(gang);
        let mut lines = Vec::with_capacity(2);
        if trade_count > 0.0 {
            lines.push(ComponentLine::Linked {
                resource_id: trade_id.to_string(),
                qty: round_to(hrs_per_unit * trade_count, 3),
                unit: "hr".to_string(),
            });
        }
        if labourer_count > 0.0 {
            lines.push(ComponentLine::Linked {
                resource_id: resource_id(ResourceKind::Labour, self.market, "LABOURER"),
                qty: round_to(hrs_per_unit * labourer_count, 3),
                unit: "hr".to_string(),
            });
        }
        lines
    }

    pub fn detect_plant(&self, description: &str) -> Option<&str> {
        first_hit(&self.plant, &description.to_lowercase())
    }

    /// First pattern hit that exists in the material library.
    pub fn find_material(&self, description: &str) -> Option<&str> {
        let text = description.to_lowercase();
        self.materials
            .iter()
            .filter(|(re, _)| re.is_match(&text))
            .map(|(_, id)| id.as_str())
            .find(|id| self.library.materials.contains(*id))
    }

    /// Linked copy of `rate`. Rates already carrying only components come back as is.
    pub fn link_rate(&self, rate: &SeedRate) -> SeedRate {
        let has_inline = !rate.labour.is_empty() || !rate.materials.is_empty() || !rate.plant.is_empty();
        if rate.components.is_some() && !has_inline {
            return rate.clone();
        }

        let description = rate.description.as_deref().unwrap_or(&rate.name);
        let mut components = Components::default();

        let trade_id = self.detect_trade(description, rate.nrm1_reference());
        for line in &rate.labour {
            components
                .labour
                .extend(self.expand_gang(&line.gang, &trade_id, line.hrs_per_unit));
        }

        for material in &rate.materials {
            let line = match self.find_material(&material.description) {
                Some(id) => ComponentLine::Linked {
                    resource_id: id.to_string(),
                    qty: material.quantity,
                    unit: material.unit.clone(),
                },
                None => ComponentLine::Inline {
                    description: material.description.clone(),
                    qty: material.quantity,
                    unit: material.unit.clone(),
                    rate: material.unit_rate,
                },
            };
            components.materials.push(line);
        }

        if let Some(plant) = rate.plant.first() {
            match self.detect_plant(description) {
                Some(id) => components.plant.push(ComponentLine::Linked {
                    resource_id: id.to_string(),
                    qty: plant.quantity,
                    unit: plant.unit.clone(),
                }),
                None if plant.cost > 0.0 => components.plant.push(ComponentLine::Inline {
                    description: plant.description.clone(),
                    qty: plant.quantity,
                    unit: plant.unit.clone(),
                    rate: plant.unit_rate,
                }),
                None => {}
            }
        }

        let hours: f64 = components.labour.iter().map(ComponentLine::qty).sum();
        let gang = rate
            .labour
            .first()
            .map(|l| l.gang.clone())
            .unwrap_or_else(|| "1+0".to_string());

        let mut linked = rate.clone();
        linked.labour.clear();
        linked.materials.clear();
        linked.plant.clear();
        linked.components = Some(components);
        linked.labour_hours_per_unit = Some(round_to(hours, 3));
        linked.gang_composition = Some(gang);
        linked.material_waste_factor = Some(effective_waste_factor(rate));
        linked
    }

    pub fn link_file(&self, file: &mut NamedGroupFile, transformed: &str) -> GroupLinkStats {
        let mut stats = GroupLinkStats::default();
        for rate in &mut file.data.rates {
            *rate = self.link_rate(rate);
            stats.count += 1;
            if let Some(components) = &rate.components {
                let linked = |lines: &[ComponentLine]| lines.iter().any(|l| l.resource_id().is_some());
                stats.labour_linked += usize::from(linked(&components.labour));
                stats.materials_linked += usize::from(linked(&components.materials));
                stats.plant_linked += usize::from(linked(&components.plant));
            }
        }
        file.data.meta.transformed = Some(transformed.to_string());
        file.data.meta.resource_linked = Some(true);
        stats
    }

    pub fn trade_patterns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.trades.iter().map(|(re, id)| (re.as_str(), id.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GroupLinkStats {
    pub count: usize,
    pub labour_linked: usize,
    pub materials_linked: usize,
    pub plant_linked: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkStats {
    pub total_rates: usize,
    pub labour_linked: usize,
    pub materials_linked: usize,
    pub plant_linked: usize,
    pub by_group: BTreeMap<String, GroupLinkStats>,
}

impl LinkStats {
    pub fn add_group(&mut self, file_name: &str, group: GroupLinkStats) {
        self.total_rates += group.count;
        self.labour_linked += group.labour_linked;
        self.materials_linked += group.materials_linked;
        self.plant_linked += group.plant_linked;
        self.by_group.insert(file_name.to_string(), group);
    }
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

pub fn render_linking_qa(stats: &LinkStats, linker: &ResourceLinker, generated_at: &str) -> String {
    let market = linker.market;
    let library = linker.library();
    let mut out = String::new();

    let _ = writeln!(out, "# Resource Linking QA Report\n");
    let _ = writeln!(out, "**Generated**: {}", generated_at);
    let _ = writeln!(out, "**Market**: {}", market);
    let _ = writeln!(out, "**Status**: COMPLETE\n");

    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "| Metric | Count | Percentage |");
    let _ = writeln!(out, "|--------|-------|------------|");
    let _ = writeln!(out, "| Total Rates | {} | 100% |", stats.total_rates);
    for (label, count) in [
        ("Labour Linked", stats.labour_linked),
        ("Materials Linked", stats.materials_linked),
        ("Plant Linked", stats.plant_linked),
    ] {
        let _ = writeln!(
            out,
            "| {} | {} | {:.1}% |",
            label,
            count,
            pct(count, stats.total_rates)
        );
    }

    let _ = writeln!(out, "\n## By Group\n");
    let _ = writeln!(out, "| Group | Rates | Labour % | Materials % | Plant % |");
    let _ = writeln!(out, "|-------|-------|----------|-------------|---------|");
    for (file, g) in &stats.by_group {
        let name = file.trim_end_matches(".json").trim_start_matches("group_");
        let _ = writeln!(
            out,
            "| {} | {} | {:.0}% | {:.0}% | {:.0}% |",
            name,
            g.count,
            pct(g.labour_linked, g.count),
            pct(g.materials_linked, g.count),
            pct(g.plant_linked, g.count)
        );
    }

    let _ = writeln!(out, "\n## Resource Libraries Used\n");
    let _ = writeln!(out, "| Type | Count |");
    let _ = writeln!(out, "|------|-------|");
    let _ = writeln!(out, "| Labour (LAB_{}_*) | {} |", market, library.labour.len());
    let _ = writeln!(out, "| Materials (MAT_{}_*) | {} |", market, library.materials.len());
    let _ = writeln!(out, "| Plant (PLT_{}_*) | {} |", market, library.plant.len());

    let _ = writeln!(out, "\n## Trade Detection Patterns\n");
    let _ = writeln!(out, "| Pattern | Resource ID |");
    let _ = writeln!(out, "|---------|-------------|");
    for (pattern, id) in linker.trade_patterns() {
        let _ = writeln!(out, "| `{}` | {} |", pattern, id);
    }
    let _ = writeln!(
        out,
        "| default | {} |",
        resource_id(ResourceKind::Labour, market, "TRADES")
    );

    let _ = writeln!(out, "\n## Notes\n");
    let _ = writeln!(out, "- Labour: every rate with labour lines gets at least one linked labour resource");
    let _ = writeln!(out, "- Materials: lines without a library match keep inline allowance values");
    let _ = writeln!(out, "- Plant: only rates with identifiable plant needs get resource links");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buildup::build_rate;
    use crate::domain::model::StagingRate;
    use crate::domain::ports::RateDefaults;

    fn linker(materials: &[&str]) -> ResourceLinker {
        let library = ResourceLibrary::new(Market::Au)
            .with_material_files(Market::Au, materials.iter().copied());
        ResourceLinker::new(Market::Au, library).unwrap()
    }

    fn generated(description: &str, group: u8) -> SeedRate {
        build_rate(
            &StagingRate {
                code: "X.1".to_string(),
                description: description.to_string(),
                notes: None,
                unit: "m2".to_string(),
                nrm_group: group,
                nrm1_code: Some(format!("{}.1", group)),
                nrm2_codes: vec![],
            },
            &RateDefaults::default(),
        )
    }

    #[test]
    fn test_detect_trade_patterns_and_fallback() {
        let linker = linker(&[]);
        assert_eq!(linker.detect_trade("Asbestos sheet removal", None), "LAB_AU_CIVIL");
        assert_eq!(linker.detect_trade("Double power outlet", None), "LAB_AU_ELECTRICIAN");
        assert_eq!(linker.detect_trade("Sundries", Some("4.1")), "LAB_AU_JOINER");
        assert_eq!(linker.detect_trade("Sundries", Some("6.1")), "LAB_AU_TRADES");
        assert_eq!(linker.detect_trade("Sundries", None), "LAB_AU_TRADES");
    }

    #[test]
    fn test_expand_gang() {
        let linker = linker(&[]);
        let lines = linker.expand_gang("1+0.5", "LAB_AU_CARPENTER", 0.35);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].qty(), 0.35);
        assert_eq!(lines[1].resource_id(), Some("LAB_AU_LABOURER"));
        assert_eq!(lines[1].qty(), 0.175);

        let labour_only = linker.expand_gang("0+2", "LAB_AU_CIVIL", 1.5);
        assert_eq!(labour_only.len(), 1);
        assert_eq!(labour_only[0].qty(), 3.0);
    }

    #[test]
    fn test_material_requires_library_entry() {
        let without = linker(&[]);
        assert_eq!(without.find_material("Paint"), None);

        let with = linker(&["MAT_AU_PAINT.json", "MAT_NZ_TILES.json", "README.md"]);
        assert_eq!(with.find_material("Paint, 2 coats"), Some("MAT_AU_PAINT"));
        assert_eq!(with.library().materials.len(), 1);
    }

    #[test]
    fn test_link_rate_builds_components() {
        let linker = linker(&[]);
        let rate = generated("Concrete slab on ground", 1);
        let linked = linker.link_rate(&rate);

        assert!(linked.labour.is_empty() && linked.materials.is_empty() && linked.plant.is_empty());
        let components = linked.components.as_ref().unwrap();
        // 0+2 gang → labourer hours only
        assert_eq!(components.labour.len(), 1);
        assert_eq!(components.labour[0].resource_id(), Some("LAB_AU_LABOURER"));
        assert!(matches!(components.materials[0], ComponentLine::Inline { .. }));
        assert_eq!(components.plant[0].resource_id(), Some("PLT_AU_VIBRATOR"));
        assert_eq!(linked.gang_composition.as_deref(), Some("0+2"));
        assert_eq!(linked.material_waste_factor, Some(1.05));
        assert_eq!(linked.total_rate, rate.total_rate);
        assert_eq!(linked.nrm1_code, rate.nrm1_code);

        // linking twice changes nothing
        assert_eq!(linker.link_rate(&linked), linked);
    }

    #[test]
    fn test_plant_allowance_kept_inline_when_undetected() {
        let linker = linker(&[]);
        let linked = linker.link_rate(&generated("Skim coat", 3));
        let plant = &linked.components.unwrap().plant;
        assert_eq!(plant.len(), 1);
        assert!(matches!(&plant[0], ComponentLine::Inline { rate, .. } if *rate == 3.0));
    }
}
