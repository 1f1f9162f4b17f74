use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::connectors::ConnectorType;
use crate::credentials::SupplierCredentials;
use crate::ConfigError;

const ENV_REF_PREFIX: &str = "env:";

/// One supplier connection described in `config/suppliers.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierSeed {
    pub id: String,
    pub name: String,
    pub connector: ConnectorType,
    /// Values are literals or `env:VAR` references resolved at seed time.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

impl SupplierSeed {
    /// Resolve `env:VAR` references through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when a referenced variable is unset.
    pub fn resolve_credentials<F>(&self, lookup: F) -> Result<SupplierCredentials, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let mut creds = SupplierCredentials::new();
        for (key, raw) in &self.credentials {
            let value = match raw.strip_prefix(ENV_REF_PREFIX) {
                Some(var) => {
                    lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))?
                }
                None => raw.clone(),
            };
            creds.insert(key.clone(), value);
        }
        Ok(creds)
    }
}

#[derive(Debug, Deserialize)]
pub struct SuppliersFile {
    pub suppliers: Vec<SupplierSeed>,
}

/// Load and validate the supplier seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_suppliers(path: &Path) -> Result<SuppliersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SuppliersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_suppliers(&content)
}

/// Parse and validate supplier seed YAML.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML or invalid entries.
pub fn parse_suppliers(content: &str) -> Result<SuppliersFile, ConfigError> {
    let file: SuppliersFile = serde_yaml::from_str(content)?;
    validate_suppliers(&file)?;
    Ok(file)
}

fn validate_suppliers(file: &SuppliersFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for supplier in &file.suppliers {
        if supplier.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "supplier id must be non-empty".to_string(),
            ));
        }
        if supplier.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' must have a non-empty name",
                supplier.id
            )));
        }
        if !seen_ids.insert(supplier.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate supplier id: '{}'",
                supplier.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::env::VarError;

    use super::*;

    const SAMPLE: &str = r"
suppliers:
  - id: cj-main
    name: CJ Dropshipping
    connector: cjdropshipping
    credentials:
      accessToken: env:CJ_ACCESS_TOKEN
  - id: demo-store
    name: Demo Store
    connector: shopify
    credentials:
      shopUrl: https://demo.example.com
";

    #[test]
    fn parses_sample_file() {
        let file = parse_suppliers(SAMPLE).unwrap();
        assert_eq!(file.suppliers.len(), 2);
        assert_eq!(file.suppliers[0].connector, ConnectorType::CjDropshipping);
        assert_eq!(file.suppliers[1].connector, ConnectorType::Shopify);
    }

    #[test]
    fn resolves_env_references() {
        let file = parse_suppliers(SAMPLE).unwrap();
        let creds = file.suppliers[0]
            .resolve_credentials(|var| {
                if var == "CJ_ACCESS_TOKEN" {
                    Ok("tok".to_string())
                } else {
                    Err(VarError::NotPresent)
                }
            })
            .unwrap();
        assert_eq!(creds.get("accessToken"), Some("tok"));
    }

    #[test]
    fn missing_env_reference_is_reported() {
        let file = parse_suppliers(SAMPLE).unwrap();
        let err = file.suppliers[0]
            .resolve_credentials(|_| Err(VarError::NotPresent))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "CJ_ACCESS_TOKEN"));
    }

    #[test]
    fn literal_values_pass_through() {
        let file = parse_suppliers(SAMPLE).unwrap();
        let creds = file.suppliers[1]
            .resolve_credentials(|_| Err(VarError::NotPresent))
            .unwrap();
        assert_eq!(creds.get("shopUrl"), Some("https://demo.example.com"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = r"
suppliers:
  - id: a
    name: One
    connector: bigbuy
  - id: A
    name: Two
    connector: bigbuy
";
        let err = parse_suppliers(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn unknown_connector_fails_to_parse() {
        let yaml = r"
suppliers:
  - id: a
    name: One
    connector: aliexpress
";
        assert!(matches!(
            parse_suppliers(yaml),
            Err(ConfigError::SuppliersFileParse(_))
        ));
    }
}
