use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::enums::{MappingConfidence, Severity};

/// A single QA / integrity finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    pub subject: String,
    pub message: String,
}

impl Finding {
    pub fn new(severity: Severity, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// Row of the staging extract (`rate_descriptions.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingRate {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub unit: String,
    pub nrm_group: u8,
    #[serde(default)]
    pub nrm1_code: Option<String>,
    #[serde(default)]
    pub nrm2_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingFile {
    pub rates: Vec<StagingRate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabourLine {
    pub nrm2_code: String,
    pub task_description: String,
    pub gang: String,
    pub output: f64,
    pub output_unit: String,
    pub hrs_per_unit: f64,
    pub rate_per_hour: f64,
    pub cost_per_unit: f64,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialLine {
    pub nrm2_code: String,
    pub description: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_rate: f64,
    pub cost: f64,
    pub supplier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantLine {
    pub nrm2_code: String,
    pub description: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_rate: f64,
    pub cost: f64,
    pub notes: Option<String>,
}

/// A component either linked to the resource library or kept as an inline allowance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ComponentLine {
    Linked {
        resource_id: String,
        qty: f64,
        unit: String,
    },
    Inline {
        description: String,
        qty: f64,
        unit: String,
        rate: f64,
    },
}

impl ComponentLine {
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            ComponentLine::Linked { resource_id, .. } => Some(resource_id),
            ComponentLine::Inline { .. } => None,
        }
    }

    pub fn qty(&self) -> f64 {
        match self {
            ComponentLine::Linked { qty, .. } | ComponentLine::Inline { qty, .. } => *qty,
        }
    }

    /// Text used when classifying the material type.
    pub fn label(&self) -> &str {
        match self {
            ComponentLine::Linked { resource_id, .. } => resource_id,
            ComponentLine::Inline { description, .. } => description,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Components {
    #[serde(default)]
    pub labour: Vec<ComponentLine>,
    #[serde(default)]
    pub materials: Vec<ComponentLine>,
    #[serde(default)]
    pub plant: Vec<ComponentLine>,
}

/// Composite rate as it moves through generate → waste → NRM → linking.
///
/// Stage-specific fields are optional so every stage reads the output of any
/// earlier one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedRate {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm1_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm2_codes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm1_l4_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm1_l3_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm1_l2_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm1_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm2_primary_ws: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm2_primary_ws_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm2_primary_items: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrm2_secondary_ws: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_confidence: Option<MappingConfidence>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labour: Vec<LabourLine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialLine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plant: Vec<PlantLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labour_hours_per_unit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gang_composition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_waste_factor: Option<f64>,

    #[serde(default)]
    pub labour_total: f64,
    #[serde(default)]
    pub materials_total: f64,
    #[serde(default)]
    pub plant_total: f64,
    #[serde(default)]
    pub waste_percent: f64,
    #[serde(default)]
    pub nett_total: f64,
    #[serde(default)]
    pub ohp_percent: f64,
    #[serde(default)]
    pub total_rate: f64,
}

impl SeedRate {
    /// NRM1 code before enrichment, L2 code after.
    pub fn nrm1_reference(&self) -> Option<&str> {
        self.nrm1_code
            .as_deref()
            .or(self.nrm1_l2_code.as_deref())
            .filter(|code| !code.is_empty())
    }

    pub fn has_nrm2(&self) -> bool {
        let codes = self.nrm2_codes.as_deref().unwrap_or_default();
        let primary = self.nrm2_primary_ws.as_deref().unwrap_or_default();
        !codes.is_empty() || !primary.is_empty()
    }

    pub fn has_materials(&self) -> bool {
        !self.materials.is_empty()
            || self
                .components
                .as_ref()
                .is_some_and(|c| !c.materials.is_empty())
    }

    /// Material descriptions and resource ids, inline lines first.
    pub fn material_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.materials.iter().map(|m| m.description.as_str()).collect();
        if let Some(components) = &self.components {
            labels.extend(components.materials.iter().map(ComponentLine::label));
        }
        labels
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupMeta {
    pub nrm_group: u8,
    pub group_name: String,
    pub count: usize,
    pub generated: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crosswalk_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_linked: Option<bool>,
}

/// One `group_{n}_{name}.json` file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateGroupFile {
    pub meta: GroupMeta,
    pub rates: Vec<SeedRate>,
}

/// A group file together with the name it was read from.
#[derive(Debug, Clone)]
pub struct NamedGroupFile {
    pub file_name: String,
    pub data: RateGroupFile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub name: String,
    pub file: String,
    pub count: usize,
    pub codes: Vec<String>,
}

/// `composite_rates_index.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RateIndex {
    pub groups: BTreeMap<String, IndexEntry>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_line_untagged_forms() {
        let linked: ComponentLine = serde_json::from_str(
            r#"{"resource_id": "LAB_AU_TILER", "qty": 0.35, "unit": "hr"}"#,
        )
        .unwrap();
        assert_eq!(linked.resource_id(), Some("LAB_AU_TILER"));

        let inline: ComponentLine = serde_json::from_str(
            r#"{"description": "Materials allowance", "qty": 1.0, "unit": "m2", "rate": 55.0}"#,
        )
        .unwrap();
        assert_eq!(inline.resource_id(), None);
        assert_eq!(inline.label(), "Materials allowance");
    }

    #[test]
    fn test_seed_rate_reads_minimal_record() {
        let rate: SeedRate = serde_json::from_str(
            r#"{"code": "R1", "name": "Paint walls", "unit": "m2", "nrm1_l2_code": "3.1"}"#,
        )
        .unwrap();
        assert_eq!(rate.nrm1_reference(), Some("3.1"));
        assert!(!rate.has_materials());
        assert!(!rate.has_nrm2());
        assert_eq!(rate.total_rate, 0.0);
    }
}
