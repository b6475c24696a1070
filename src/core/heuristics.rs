//! Static estimating heuristics: NRM sections, resource ID conventions,
//! labour productivity, waste guidelines and typical gangs.

use serde::Serialize;

use crate::domain::enums::Market;
use crate::domain::schema::ResourceKind;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct NrmSection {
    pub number: u8,
    pub name: &'static str,
    pub trades: &'static [&'static str],
    pub examples: &'static [&'static str],
}

pub const NRM_SECTION_MAP: &[NrmSection] = &[
    NrmSection {
        number: 0,
        name: "Facilitating Works",
        trades: &["Preliminaries", "Demolition", "Scaffolding"],
        examples: &["Site setup", "Temporary works", "Protection"],
    },
    NrmSection {
        number: 1,
        name: "Substructure",
        trades: &["Earthworks", "Concreter", "Formworker"],
        examples: &["Footings", "Slabs", "Piling", "Excavation"],
    },
    NrmSection {
        number: 2,
        name: "Superstructure",
        trades: &["Carpenter", "Bricklayer", "Roofer", "Glazier", "Steelworker"],
        examples: &["Framing", "Walls", "Roof", "Windows", "Doors"],
    },
    NrmSection {
        number: 3,
        name: "Internal Finishes",
        trades: &["Plasterer", "Painter", "Tiler", "Floor Layer", "Ceiling Fixer"],
        examples: &["Plasterboard", "Painting", "Tiling", "Flooring", "Ceilings"],
    },
    NrmSection {
        number: 4,
        name: "Fittings, Furnishings & Equipment",
        trades: &["Joiner", "Kitchen Installer", "Cabinetmaker"],
        examples: &["Joinery", "Kitchens", "Wardrobes", "Benchtops"],
    },
    NrmSection {
        number: 5,
        name: "Services",
        trades: &["Electrician", "Plumber", "HVAC", "Fire Protection"],
        examples: &["Electrical", "Plumbing", "Air conditioning", "Fire systems", "Lifts"],
    },
    NrmSection {
        number: 6,
        name: "Prefabricated Buildings",
        trades: &["Prefab"],
        examples: &["Modular buildings", "Prefab structures"],
    },
    NrmSection {
        number: 7,
        name: "Work to Existing Buildings",
        trades: &["Renovations", "Demolition"],
        examples: &["Alterations", "Refurbishment", "Restoration"],
    },
    NrmSection {
        number: 8,
        name: "External Works",
        trades: &["Landscaper", "Civil", "Fencer", "Paver"],
        examples: &["Drainage", "Landscaping", "Fencing", "Paving", "Driveways"],
    },
];

pub fn nrm_section(number: u8) -> Option<&'static NrmSection> {
    NRM_SECTION_MAP.iter().find(|s| s.number == number)
}

pub const MATERIAL_ID_PATTERN: &str = "MAT_{MARKET}_{ITEM}";
pub const LABOUR_ID_PATTERN: &str = "LAB_{MARKET}_{TRADE}";
pub const PLANT_ID_PATTERN: &str = "PLT_{MARKET}_{ITEM}";

pub fn resource_prefix(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Labour => "LAB",
        ResourceKind::Material => "MAT",
        ResourceKind::Plant => "PLT",
    }
}

/// Uppercase with every run of non-alphanumerics collapsed to `_`.
pub fn resource_token(item: &str) -> String {
    let mut token = String::with_capacity(item.len());
    for ch in item.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            token.push(ch.to_ascii_uppercase());
        } else if !token.ends_with('_') {
            token.push('_');
        }
    }
    token.trim_matches('_').to_string()
}

/// `resource_id(Labour, Au, "tiler")` → `LAB_AU_TILER`
pub fn resource_id(kind: ResourceKind, market: Market, item: &str) -> String {
    format!("{}_{}_{}", resource_prefix(kind), market, resource_token(item))
}

/// Splits `MAT_AU_FLOOR_TILES` into its kind, market and item.
pub fn parse_resource_id(id: &str) -> Option<(ResourceKind, Market, &str)> {
    let mut parts = id.splitn(3, '_');
    let kind = match parts.next()? {
        "LAB" => ResourceKind::Labour,
        "MAT" => ResourceKind::Material,
        "PLT" => ResourceKind::Plant,
        _ => return None,
    };
    let market = parts.next()?.parse().ok()?;
    let item = parts.next().filter(|item| {
        !item.is_empty()
            && item
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    })?;
    Some((kind, market, item))
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Productivity {
    pub activity: &'static str,
    /// Hours per unit, low and high.
    pub range: (f64, f64),
    pub unit: &'static str,
    pub notes: &'static str,
}

impl Productivity {
    pub fn contains(&self, hours: f64) -> bool {
        hours >= self.range.0 && hours <= self.range.1
    }
}

const fn prod(
    activity: &'static str,
    low: f64,
    high: f64,
    unit: &'static str,
    notes: &'static str,
) -> Productivity {
    Productivity {
        activity,
        range: (low, high),
        unit,
        notes,
    }
}

pub const TRADE_PRODUCTIVITY: &[Productivity] = &[
    // Finishes
    prod("tiling_floor", 0.3, 0.5, "hr/m2", "Standard floor tiles, increases for complex patterns"),
    prod("tiling_wall", 0.5, 0.8, "hr/m2", "Wall tiles, higher for small format or intricate work"),
    prod("painting_walls", 0.1, 0.15, "hr/m2", "2 coats, brush/roller, add for cutting in"),
    prod("painting_ceilings", 0.12, 0.18, "hr/m2", "2 coats, overhead work"),
    prod("plastering", 0.2, 0.35, "hr/m2", "Plasterboard fixing and setting"),
    prod("flooring_timber", 0.25, 0.35, "hr/m2", "Floating or fixed timber floors"),
    prod("flooring_carpet", 0.15, 0.25, "hr/m2", "Carpet and underlay"),
    prod("flooring_vinyl", 0.2, 0.3, "hr/m2", "Sheet or plank vinyl"),
    // Superstructure
    prod("framing_walls", 0.15, 0.25, "hr/m2", "Timber stud walls, standard height"),
    prod("framing_roof", 0.2, 0.35, "hr/m2", "Roof framing, varies by complexity"),
    prod("brickwork", 0.8, 1.2, "hr/m2", "Single skin brickwork"),
    prod("roofing_tiles", 0.15, 0.25, "hr/m2", "Concrete or terracotta tiles"),
    prod("roofing_metal", 0.1, 0.18, "hr/m2", "Metal roof sheeting"),
    prod("glazing", 0.5, 1.0, "hr/m2", "Window installation"),
    // Services
    prod("electrical_point", 0.3, 0.5, "hr/point", "GPO, switch, or light point"),
    prod("plumbing_fixture", 1.0, 2.0, "hr/fixture", "Basin, toilet, shower, etc."),
    prod("plumbing_rough_in", 0.8, 1.5, "hr/point", "Pipe rough-in per fixture"),
    prod("hvac_duct", 0.3, 0.5, "hr/m", "Ductwork installation"),
    // Substructure
    prod("concrete_slab", 0.05, 0.1, "hr/m2", "Concrete placement, excludes formwork"),
    prod("formwork", 0.3, 0.5, "hr/m2", "Formwork to slabs/footings"),
    prod("excavation_machine", 0.02, 0.05, "hr/m3", "Machine excavation"),
    prod("excavation_hand", 0.5, 1.0, "hr/m3", "Hand excavation"),
    // External works
    prod("paving", 0.15, 0.25, "hr/m2", "Brick or concrete pavers"),
    prod("fencing_timber", 0.3, 0.5, "hr/m", "Timber paling fence"),
    prod("fencing_colorbond", 0.2, 0.35, "hr/m", "Metal sheet fencing"),
    prod("landscaping", 0.2, 0.4, "hr/m2", "Garden bed preparation and planting"),
];

pub fn productivity(activity: &str) -> Option<&'static Productivity> {
    TRADE_PRODUCTIVITY
        .iter()
        .find(|p| p.activity.eq_ignore_ascii_case(activity.trim()))
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct WasteGuideline {
    pub material: &'static str,
    pub factor: (f64, f64),
    pub notes: &'static str,
}

impl WasteGuideline {
    pub fn contains(&self, factor: f64) -> bool {
        factor >= self.factor.0 - 1e-9 && factor <= self.factor.1 + 1e-9
    }
}

pub const WASTE_FACTOR_GUIDELINES: &[WasteGuideline] = &[
    WasteGuideline { material: "tiles", factor: (1.05, 1.10), notes: "5-10% waste for cuts, breakage, pattern matching" },
    WasteGuideline { material: "timber", factor: (1.07, 1.12), notes: "7-12% waste for cuts, defects, offcuts" },
    WasteGuideline { material: "paint", factor: (1.05, 1.08), notes: "5-8% for coverage variation, application loss" },
    WasteGuideline { material: "concrete", factor: (1.03, 1.05), notes: "3-5% for slump, spillage, over-ordering" },
    WasteGuideline { material: "plasterboard", factor: (1.05, 1.10), notes: "5-10% for cuts around openings" },
    WasteGuideline { material: "insulation", factor: (1.03, 1.05), notes: "3-5% for cutting and fitting" },
    WasteGuideline { material: "roofing", factor: (1.05, 1.08), notes: "5-8% for laps, cuts, ridge/valley pieces" },
    WasteGuideline { material: "bricks", factor: (1.03, 1.05), notes: "3-5% for breakage and cutting" },
    WasteGuideline { material: "adhesives", factor: (1.10, 1.15), notes: "10-15% for application variation" },
    WasteGuideline { material: "fixings", factor: (1.10, 1.15), notes: "10-15% for drops, over-use, lost items" },
];

/// Bounds used when no guideline material is named.
pub const GENERIC_WASTE_RANGE: (f64, f64) = (1.00, 1.15);

pub fn waste_guideline(material: &str) -> Option<&'static WasteGuideline> {
    WASTE_FACTOR_GUIDELINES
        .iter()
        .find(|w| w.material.eq_ignore_ascii_case(material.trim()))
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GangTemplate {
    pub team: &'static str,
    pub members: &'static [(&'static str, u32)],
}

impl GangTemplate {
    pub fn crew_size(&self) -> u32 {
        self.members.iter().map(|(_, count)| count).sum()
    }
}

pub const GANG_COMPOSITIONS: &[GangTemplate] = &[
    GangTemplate { team: "single_trade", members: &[("tiler", 1)] },
    GangTemplate { team: "trade_pair", members: &[("tradesperson", 1), ("apprentice", 1)] },
    GangTemplate { team: "carpentry_team", members: &[("carpenter", 2), ("labourer", 1)] },
    GangTemplate { team: "civil_team", members: &[("operator", 1), ("labourer", 2)] },
    GangTemplate { team: "concrete_team", members: &[("concreter", 2), ("labourer", 2)] },
    GangTemplate { team: "electrical_team", members: &[("electrician", 1), ("apprentice", 1)] },
    GangTemplate { team: "plumbing_team", members: &[("plumber", 1), ("apprentice", 1)] },
    GangTemplate { team: "painting_team", members: &[("painter", 2)] },
    GangTemplate { team: "roofing_team", members: &[("roofer", 2), ("labourer", 1)] },
    GangTemplate { team: "survey_team", members: &[("surveyor", 1), ("assistant", 1)] },
];

pub fn gang(team: &str) -> Option<&'static GangTemplate> {
    GANG_COMPOSITIONS
        .iter()
        .find(|g| g.team.eq_ignore_ascii_case(team.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_normalizes_item() {
        assert_eq!(
            resource_id(ResourceKind::Material, Market::Au, "floor tiles"),
            "MAT_AU_FLOOR_TILES"
        );
        assert_eq!(
            resource_id(ResourceKind::Labour, Market::Nz, "  electrician "),
            "LAB_NZ_ELECTRICIAN"
        );
        assert_eq!(
            resource_id(ResourceKind::Plant, Market::Ca, "crane (mobile) - 25t"),
            "PLT_CA_CRANE_MOBILE_25T"
        );
    }

    #[test]
    fn test_parse_resource_id() {
        assert_eq!(
            parse_resource_id("MAT_UK_PLASTERBOARD"),
            Some((ResourceKind::Material, Market::Uk, "PLASTERBOARD"))
        );
        assert_eq!(parse_resource_id("MAT_XX_TILES"), None);
        assert_eq!(parse_resource_id("LAB_AU_"), None);
        assert_eq!(parse_resource_id("TOOL_AU_SAW"), None);
        assert_eq!(parse_resource_id("LAB_AU_tiler"), None);
    }

    #[test]
    fn test_lookups() {
        let tiling = productivity("tiling_floor").unwrap();
        assert!(tiling.contains(0.35));
        assert!(!tiling.contains(0.6));

        assert_eq!(waste_guideline("Timber").unwrap().factor, (1.07, 1.12));
        assert!(waste_guideline("glass").is_none());

        assert_eq!(gang("concrete_team").unwrap().crew_size(), 4);
        assert_eq!(nrm_section(3).unwrap().name, "Internal Finishes");
        assert!(nrm_section(9).is_none());
    }
}
