//! 表映射配置, 从 JSON 文件加载
//!
//! ```json
//! { "devices": "unified_devices", "flows": "netflow_records" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::EntityType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in config file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// 实体名到存储表 (或集合) 名的映射
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMappingConfig {
    /// 小写实体名 -> 表名
    #[serde(flatten)]
    pub mappings: HashMap<String, String>,
}

impl TableMappingConfig {
    /// 从 JSON 文件加载映射
    ///
    /// 实体键不区分大小写。不是实体名的键会被保留并记录警告，查询不会用到它们。
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let raw: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let mut mappings = HashMap::with_capacity(raw.len());
        for (entity, table) in raw {
            let entity = entity.to_lowercase();
            if entity.parse::<EntityType>().is_err() {
                warn!(entity = %entity, "table mapping names an unknown entity");
            }
            debug!(entity = %entity, table = %table, "table mapping entry");
            mappings.insert(entity, table);
        }

        info!(path = %path.display(), entries = mappings.len(), "loaded table mapping");
        Ok(Self { mappings })
    }

    /// 加载映射，失败时回退到默认配置
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "using default table mapping");
                Self::default()
            }
        }
    }

    pub fn insert(&mut self, entity: EntityType, table: impl Into<String>) {
        self.mappings.insert(entity.as_str().to_string(), table.into());
    }

    /// 获取实体对应的表名，没有映射时返回实体名本身
    pub fn table_name(&self, entity: EntityType) -> String {
        self.mappings
            .get(entity.as_str())
            .cloned()
            .unwrap_or_else(|| entity.as_str().to_string())
    }

    pub fn mappings(&self) -> &HashMap<String, String> {
        &self.mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn test_load_valid_json_config() {
        let file = write_config(
            r#"{
                "Devices": "unified_devices",
                "flows": "netflow_records",
                "routers": "routers_v2"
            }"#,
        );

        let config = TableMappingConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.table_name(EntityType::Devices), "unified_devices");
        assert_eq!(config.table_name(EntityType::Flows), "netflow_records");
        assert_eq!(config.table_name(EntityType::Logs), "logs");
        assert_eq!(config.mappings().len(), 3);
    }

    #[test]
    fn test_invalid_json_config() {
        let file = write_config("invalid json");
        let result = TableMappingConfig::from_json_file(file.path());
        assert!(matches!(result, Err(ConfigError::Json { .. })));

        let file = write_config(r#"{"devices": 5}"#);
        let result = TableMappingConfig::from_json_file(file.path());
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table_mapping.json");

        let err = TableMappingConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("table_mapping.json"));

        assert_eq!(
            TableMappingConfig::load_or_default(&path),
            TableMappingConfig::default()
        );
    }

    #[test]
    fn test_default_config() {
        let mut config = TableMappingConfig::default();
        for entity in EntityType::ALL {
            assert_eq!(config.table_name(entity), entity.as_str());
        }

        config.insert(EntityType::Traps, "snmp_traps");
        assert_eq!(config.table_name(EntityType::Traps), "snmp_traps");
    }
}
