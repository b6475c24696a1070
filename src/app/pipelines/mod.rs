pub mod generate_pipeline;
pub mod link_pipeline;
pub mod nrm_pipeline;
pub mod qa_pipeline;
pub mod waste_pipeline;

pub use generate_pipeline::GeneratePipeline;
pub use link_pipeline::ResourceLinkPipeline;
pub use nrm_pipeline::{NrmEnrichPipeline, NrmFixPipeline};
pub use qa_pipeline::{LabourQaPipeline, SeedQaPipeline};
pub use waste_pipeline::{WasteUpdatePipeline, WasteValidationPipeline};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::{NamedGroupFile, RateGroupFile, Storage};
use crate::utils::error::{RatesError, Result};

/// `dir/name`, tolerating a trailing slash or an empty dir.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

pub async fn read_json<S: Storage, T: DeserializeOwned>(storage: &S, path: &str) -> Result<T> {
    let bytes = storage.read_file(path).await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        RatesError::processing(format!("{} is not valid: {}", path, e))
    })
}

pub async fn write_json<S: Storage, T: Serialize>(storage: &S, path: &str, value: &T) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    storage.write_file(path, &json).await
}

pub fn is_group_file(name: &str) -> bool {
    name.starts_with("group_") && name.ends_with(".json")
}

/// Every `group_*.json` in `rates_dir`, in file name order.
pub async fn load_group_files<S: Storage>(storage: &S, rates_dir: &str) -> Result<Vec<NamedGroupFile>> {
    let mut files = Vec::new();
    for name in storage.list_files(rates_dir).await? {
        if !is_group_file(&name) {
            continue;
        }
        let data: RateGroupFile = read_json(storage, &join_path(rates_dir, &name)).await?;
        tracing::debug!("Loaded {} ({} rates)", name, data.rates.len());
        files.push(NamedGroupFile {
            file_name: name,
            data,
        });
    }
    if files.is_empty() {
        return Err(RatesError::not_found(format!("group_*.json files in {}", rates_dir)));
    }
    Ok(files)
}

pub async fn save_group_files<S: Storage>(
    storage: &S,
    rates_dir: &str,
    files: &[NamedGroupFile],
) -> Result<()> {
    for file in files {
        write_json(storage, &join_path(rates_dir, &file.file_name), &file.data).await?;
        tracing::debug!("Saved {}", file.file_name);
    }
    Ok(())
}

/// Local timestamp for report headers.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("au/rates/", "group_0.json"), "au/rates/group_0.json");
        assert_eq!(join_path("", "x.json"), "x.json");
        assert!(is_group_file("group_3_finishes.json"));
        assert!(!is_group_file("composite_rates_index.json"));
    }
}
