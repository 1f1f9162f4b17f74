use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Supplier API families the sync engine knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorType {
    #[serde(rename = "shopify")]
    Shopify,
    #[serde(rename = "bigbuy")]
    BigBuy,
    #[serde(rename = "cjdropshipping")]
    CjDropshipping,
    #[serde(rename = "matterhorn")]
    Matterhorn,
    #[serde(rename = "generic_json")]
    GenericJson,
}

impl ConnectorType {
    pub const ALL: [ConnectorType; 5] = [
        ConnectorType::Shopify,
        ConnectorType::BigBuy,
        ConnectorType::CjDropshipping,
        ConnectorType::Matterhorn,
        ConnectorType::GenericJson,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorType::Shopify => "shopify",
            ConnectorType::BigBuy => "bigbuy",
            ConnectorType::CjDropshipping => "cjdropshipping",
            ConnectorType::Matterhorn => "matterhorn",
            ConnectorType::GenericJson => "generic_json",
        }
    }

    /// Static metadata for this connector.
    #[must_use]
    pub fn info(self) -> &'static ConnectorInfo {
        // CONNECTORS is ordered like ALL, one entry per variant.
        &CONNECTORS[self as usize]
    }
}

impl std::fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        match needle.as_str() {
            "shopify" => Ok(ConnectorType::Shopify),
            "bigbuy" => Ok(ConnectorType::BigBuy),
            "cjdropshipping" | "cj" => Ok(ConnectorType::CjDropshipping),
            "matterhorn" => Ok(ConnectorType::Matterhorn),
            "generic_json" | "generic" => Ok(ConnectorType::GenericJson),
            _ => Err(CoreError::UnknownConnector(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    None,
    ApiKey,
    AccessToken,
}

/// Descriptive metadata for one connector, as shown to users choosing a
/// supplier integration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorInfo {
    pub connector: ConnectorType,
    pub name: &'static str,
    pub auth_type: AuthType,
    pub base_url: &'static str,
    /// Documented upstream request budget.
    pub rate_limit_per_minute: u32,
    /// Prefix used when deriving a SKU from the external id.
    pub sku_prefix: &'static str,
    pub default_currency: &'static str,
    /// Credential keys holding the secret, in lookup priority order.
    pub credential_keys: &'static [&'static str],
    pub supports_orders: bool,
}

static CONNECTORS: [ConnectorInfo; 5] = [
    ConnectorInfo {
        connector: ConnectorType::Shopify,
        name: "Shopify storefront",
        auth_type: AuthType::None,
        base_url: "",
        rate_limit_per_minute: 120,
        sku_prefix: "SHOPIFY",
        default_currency: "USD",
        credential_keys: &["accessToken"],
        supports_orders: false,
    },
    ConnectorInfo {
        connector: ConnectorType::BigBuy,
        name: "BigBuy",
        auth_type: AuthType::ApiKey,
        base_url: "https://api.bigbuy.eu",
        rate_limit_per_minute: 60,
        sku_prefix: "BIGBUY",
        default_currency: "EUR",
        credential_keys: &["apiKey", "api_key"],
        supports_orders: false,
    },
    ConnectorInfo {
        connector: ConnectorType::CjDropshipping,
        name: "CJ Dropshipping",
        auth_type: AuthType::AccessToken,
        base_url: "https://developers.cjdropshipping.com/api2.0/v1",
        rate_limit_per_minute: 60,
        sku_prefix: "CJ",
        default_currency: "USD",
        credential_keys: &["accessToken", "apiKey"],
        supports_orders: true,
    },
    ConnectorInfo {
        connector: ConnectorType::Matterhorn,
        name: "Matterhorn",
        auth_type: AuthType::ApiKey,
        base_url: "https://matterhorn-wholesale.com",
        rate_limit_per_minute: 30,
        sku_prefix: "MATTERHORN",
        default_currency: "EUR",
        credential_keys: &["apiKey", "api_key"],
        supports_orders: false,
    },
    ConnectorInfo {
        connector: ConnectorType::GenericJson,
        name: "Generic JSON feed",
        auth_type: AuthType::ApiKey,
        base_url: "",
        rate_limit_per_minute: 60,
        sku_prefix: "SUP",
        default_currency: "USD",
        credential_keys: &["apiKey", "token"],
        supports_orders: false,
    },
];

/// All registered connectors, in a stable order.
#[must_use]
pub fn connector_catalog() -> &'static [ConnectorInfo] {
    &CONNECTORS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_table_matches_variant_order() {
        for connector in ConnectorType::ALL {
            assert_eq!(connector.info().connector, connector);
        }
    }

    #[test]
    fn parses_known_names_case_insensitively() {
        assert_eq!(
            "CJDropshipping".parse::<ConnectorType>().unwrap(),
            ConnectorType::CjDropshipping
        );
        assert_eq!(
            " bigbuy ".parse::<ConnectorType>().unwrap(),
            ConnectorType::BigBuy
        );
        assert_eq!(
            "generic".parse::<ConnectorType>().unwrap(),
            ConnectorType::GenericJson
        );
    }

    #[test]
    fn unknown_connector_is_rejected() {
        let err = "aliexpress".parse::<ConnectorType>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownConnector(ref v) if v == "aliexpress"));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for connector in ConnectorType::ALL {
            assert_eq!(
                connector.to_string().parse::<ConnectorType>().unwrap(),
                connector
            );
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ConnectorType::GenericJson).unwrap();
        assert_eq!(json, "\"generic_json\"");
    }

    #[test]
    fn only_cj_supports_orders() {
        let with_orders: Vec<_> = connector_catalog()
            .iter()
            .filter(|c| c.supports_orders)
            .map(|c| c.connector)
            .collect();
        assert_eq!(with_orders, vec![ConnectorType::CjDropshipping]);
    }
}
