//! Composite-builder prompt text and the template bundle handed to the
//! estimating assistant. Printed only; nothing here calls a model.

use serde::Serialize;

use crate::core::heuristics::{
    GangTemplate, NrmSection, Productivity, WasteGuideline, GANG_COMPOSITIONS,
    LABOUR_ID_PATTERN, MATERIAL_ID_PATTERN, NRM_SECTION_MAP, PLANT_ID_PATTERN,
    TRADE_PRODUCTIVITY, WASTE_FACTOR_GUIDELINES,
};
use crate::utils::error::Result;

pub const PROMPT_VERSION: &str = "v1";

pub const COMPOSITE_SCHEMA_TEMPLATE: &str = r#"{
  "code": "GC-{MARKET}-{4-digit-number}",
  "name": "Short descriptive name",
  "description": "Detailed description of the work item",
  "market": "AU | NZ | UK | CA | US",
  "classification": "NRM",
  "nrm_level2_code": "X.X (e.g., 3.2 for floor finishes)",
  "unit": "m2 | m | m3 | EA | no | ls | hr",
  "total_rate": 0,
  "scope_includes": ["Item 1", "Item 2", "..."],
  "scope_excludes": ["Item 1", "Item 2", "..."],
  "methodology": {
    "spacing": "As applicable (e.g., 600mm centres)",
    "fixings": ["Fixing type 1", "Fixing type 2"],
    "installation_sequence": ["Step 1", "Step 2", "..."],
    "quality_checks": ["Check 1", "Check 2", "..."],
    "tools_required": ["Tool 1", "Tool 2", "..."],
    "safety_considerations": ["Safety item 1", "Safety item 2", "..."]
  },
  "labour_hours_per_unit": 0.0,
  "gang_composition": { "trade": 1 },
  "material_waste_factor": 1.05,
  "components": {
    "materials": [{ "resource_id": "MAT_{MARKET}_{ITEM}", "qty": 1, "unit": "m2" }],
    "labour": [{ "resource_id": "LAB_{MARKET}_{TRADE}", "qty": 0.3, "unit": "hr" }],
    "plant": []
  },
  "rates": {
    "material_coverage_factor": 1.05,
    "labour_productivity_rate": "0.3 hr/m2",
    "plant_productivity_rate": "0 hr/m2"
  },
  "spec_tier": "standard | economy | premium",
  "metadata": {
    "reviewed_by": "",
    "confidence": 0.6,
    "needs_review": true,
    "source_reference": ""
  }
}"#;

pub const COMPOSITE_BUILDER_SYSTEM_PROMPT: &str = r#"You are an expert Construction Estimator and Quantity Surveyor specializing in creating detailed composite rates for construction work items.

Your role is to generate complete, accurate composite rate JSON files from free-form descriptions of construction work.

=== MARKETS SUPPORTED ===
- AU: Australia (AUD, AS/NZS standards)
- NZ: New Zealand (NZD, AS/NZS standards)
- UK: United Kingdom (GBP, British standards)
- CA: Canada (CAD, CSA standards)
- US: United States (USD, ASTM/ANSI standards)

=== NRM CLASSIFICATION (REQUIRED) ===
Every composite must be classified to an NRM Level 2 code:

Section 0 - Facilitating Works: 0.1-0.9 (Preliminaries, Demolition, Scaffolding)
Section 1 - Substructure: 1.1-1.9 (Foundations, Earthworks, Piling)
Section 2 - Superstructure: 2.1-2.9 (Frame, Roof, External Walls, Windows, Doors)
Section 3 - Internal Finishes: 3.1-3.9 (Wall finishes, Floor finishes, Ceiling finishes)
Section 4 - Fittings: 4.1-4.9 (Joinery, Kitchens, Wardrobes)
Section 5 - Services: 5.1-5.9 (Electrical, Plumbing, HVAC, Fire, Lifts)
Section 6 - Prefabricated Buildings: 6.1-6.9
Section 7 - Work to Existing: 7.1-7.9 (Alterations, Refurbishment)
Section 8 - External Works: 8.1-8.9 (Drainage, Landscaping, Fencing, Paving)

=== RESOURCE ID CONVENTIONS (CRITICAL) ===
All resource IDs must follow these patterns:
- Materials: MAT_{MARKET}_{ITEM} (e.g., MAT_AU_FLOOR_TILES, MAT_UK_PLASTERBOARD)
- Labour: LAB_{MARKET}_{TRADE} (e.g., LAB_AU_TILER, LAB_NZ_ELECTRICIAN)
- Plant: PLT_{MARKET}_{ITEM} (e.g., PLT_AU_EXCAVATOR, PLT_CA_CRANE)

Use UPPERCASE, underscores between words, and be descriptive but concise.

=== LABOUR PRODUCTIVITY RATES (USE AS GUIDE) ===
Tiling (floor): 0.3-0.5 hr/m2 | Tiling (wall): 0.5-0.8 hr/m2
Painting (walls): 0.1-0.15 hr/m2 | Painting (ceilings): 0.12-0.18 hr/m2
Plastering: 0.2-0.35 hr/m2 | Timber flooring: 0.25-0.35 hr/m2
Wall framing: 0.15-0.25 hr/m2 | Brickwork: 0.8-1.2 hr/m2
Electrical points: 0.3-0.5 hr/point | Plumbing fixtures: 1.0-2.0 hr/fixture

=== WASTE FACTORS (APPLY TO MATERIALS) ===
Tiles: 1.05-1.10 (5-10%) | Timber: 1.07-1.12 (7-12%)
Paint: 1.05-1.08 (5-8%) | Concrete: 1.03-1.05 (3-5%)
Plasterboard: 1.05-1.10 (5-10%) | Fixings: 1.10-1.15 (10-15%)

=== REQUIRED OUTPUT STRUCTURE ===
Every composite MUST include:
1. code: Format GC-{MARKET}-XXXX (e.g., GC-AU-0700)
2. name: Short, descriptive name (e.g., "Floor tiling (wet areas)")
3. description: Detailed description of work included
4. market: One of AU, NZ, UK, CA, US
5. classification: Always "NRM"
6. nrm_level2_code: X.X format (e.g., "3.2")
7. unit: Appropriate UOM (m2, m, m3, EA, no, ls, hr)
8. scope_includes: Array of items included in rate
9. scope_excludes: Array of items NOT included
10. methodology: Object with installation_sequence, quality_checks, tools_required, safety_considerations
11. labour_hours_per_unit: Realistic productivity rate
12. gang_composition: Object defining crew makeup
13. material_waste_factor: Appropriate waste multiplier
14. components: Object with materials, labour, plant arrays
15. rates: Summary of productivity rates
16. spec_tier: "economy", "standard", or "premium"
17. metadata: confidence, needs_review, source_reference

=== QUALITY REQUIREMENTS ===
- Be realistic with productivity rates - use industry benchmarks
- Include all necessary materials (main + consumables)
- Account for fixings, adhesives, sealants where applicable
- Specify appropriate gang composition for the trade
- Include comprehensive scope boundaries (includes/excludes)
- Provide complete installation methodology
- Flag with needs_review: true if uncertain

=== RESPONSE FORMAT ===
Output a valid JSON object matching the golden composite schema. Do not include markdown code fences or explanatory text - just the JSON."#;

/// Floor tiling (wet areas), the reference composite.
pub const COMPOSITE_EXAMPLE: &str = r#"{
  "code": "GC-AU-0051",
  "name": "Floor tiling (wet areas)",
  "description": "Supply and install floor tiles to wet areas.",
  "market": "AU",
  "classification": "NRM",
  "nrm_level2_code": "3.2",
  "unit": "m2",
  "total_rate": 0,
  "scope_includes": ["Tiles", "Adhesive", "Grout"],
  "scope_excludes": ["Waterproofing"],
  "methodology": {
    "spacing": "As per tile size",
    "fixings": ["Adhesive", "Grout"],
    "installation_sequence": ["Set out tiles", "Fix tiles", "Grout joints"],
    "quality_checks": ["Level", "Grout finish"],
    "tools_required": ["Tile cutter", "Trowel"],
    "safety_considerations": ["Knee protection"]
  },
  "labour_hours_per_unit": 0.35,
  "gang_composition": { "tiler": 1 },
  "material_waste_factor": 1.08,
  "components": {
    "materials": [
      { "resource_id": "MAT_AU_FLOOR_TILES", "qty": 1, "unit": "m2" },
      { "resource_id": "MAT_AU_TILE_ADHESIVE", "qty": 0.01, "unit": "m3" },
      { "resource_id": "MAT_AU_GROUT", "qty": 0.005, "unit": "m3" }
    ],
    "labour": [{ "resource_id": "LAB_AU_TILER", "qty": 0.35, "unit": "hr" }],
    "plant": []
  },
  "rates": {
    "material_coverage_factor": 1.08,
    "labour_productivity_rate": "0.35 hr/m2",
    "plant_productivity_rate": "0 hr/m2"
  },
  "spec_tier": "standard",
  "metadata": {
    "reviewed_by": "",
    "confidence": 0.55,
    "needs_review": true,
    "source_reference": ""
  }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct ResourcePatterns {
    pub materials: &'static str,
    pub labour: &'static str,
    pub plant: &'static str,
}

/// Everything the assistant is primed with, as one serializable document.
#[derive(Debug, Clone, Serialize)]
pub struct PromptBundle {
    pub version: &'static str,
    pub system_prompt: &'static str,
    pub schema_template: &'static str,
    pub example: serde_json::Value,
    pub nrm_sections: &'static [NrmSection],
    pub resource_patterns: ResourcePatterns,
    pub productivity: &'static [Productivity],
    pub waste_guidelines: &'static [WasteGuideline],
    pub gang_compositions: &'static [GangTemplate],
}

impl PromptBundle {
    pub fn load() -> Result<Self> {
        Ok(Self {
            version: PROMPT_VERSION,
            system_prompt: COMPOSITE_BUILDER_SYSTEM_PROMPT,
            schema_template: COMPOSITE_SCHEMA_TEMPLATE,
            example: serde_json::from_str(COMPOSITE_EXAMPLE)?,
            nrm_sections: NRM_SECTION_MAP,
            resource_patterns: ResourcePatterns {
                materials: MATERIAL_ID_PATTERN,
                labour: LABOUR_ID_PATTERN,
                plant: PLANT_ID_PATTERN,
            },
            productivity: TRADE_PRODUCTIVITY,
            waste_guidelines: WASTE_FACTOR_GUIDELINES,
            gang_compositions: GANG_COMPOSITIONS,
        })
    }
}

/// Part selectable from the `prompt` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PromptPart {
    System,
    Schema,
    Example,
    Bundle,
}

pub fn render(part: PromptPart) -> Result<String> {
    Ok(match part {
        PromptPart::System => COMPOSITE_BUILDER_SYSTEM_PROMPT.to_string(),
        PromptPart::Schema => COMPOSITE_SCHEMA_TEMPLATE.to_string(),
        PromptPart::Example => COMPOSITE_EXAMPLE.to_string(),
        PromptPart::Bundle => serde_json::to_string_pretty(&PromptBundle::load()?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_serializes_all_tables() {
        let bundle = PromptBundle::load().unwrap();
        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["example"]["code"], "GC-AU-0051");
        assert_eq!(value["nrm_sections"].as_array().unwrap().len(), 9);
        assert_eq!(value["resource_patterns"]["labour"], "LAB_{MARKET}_{TRADE}");
        assert_eq!(value["productivity"][0]["range"][1], 0.5);
    }

    #[test]
    fn test_schema_template_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(COMPOSITE_SCHEMA_TEMPLATE).unwrap();
        assert_eq!(schema["classification"], "NRM");
    }

    #[test]
    fn test_render_system_prompt() {
        let text = render(PromptPart::System).unwrap();
        assert!(text.contains("RESOURCE ID CONVENTIONS"));
    }
}
