use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::catalog::{BoxCatalog, CatalogError, ProductCatalog};

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
    pub limits: RequestLimits,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            catalog: CatalogConfig::from_env(),
            limits: RequestLimits::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "BOX_ALLOCATOR_API_HOST";
    const PORT_VAR: &'static str = "BOX_ALLOCATOR_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (Self::DEFAULT_BIND_IP, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => parse_port(&raw).unwrap_or_else(|reason| {
                warn!(
                    "{} ('{}') {}. Using {}.",
                    Self::PORT_VAR,
                    raw,
                    reason,
                    Self::DEFAULT_PORT
                );
                Self::DEFAULT_PORT
            }),
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_ip: Self::DEFAULT_BIND_IP,
            display_host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
        }
    }
}

/// Where the box and product catalogs come from.
///
/// Without a path the built-in catalogs are used.
#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    box_catalog_path: Option<PathBuf>,
    product_catalog_path: Option<PathBuf>,
}

impl CatalogConfig {
    const BOX_CATALOG_VAR: &'static str = "BOX_ALLOCATOR_BOX_CATALOG";
    const PRODUCT_CATALOG_VAR: &'static str = "BOX_ALLOCATOR_PRODUCT_CATALOG";

    fn from_env() -> Self {
        Self {
            box_catalog_path: env_string(Self::BOX_CATALOG_VAR).map(PathBuf::from),
            product_catalog_path: env_string(Self::PRODUCT_CATALOG_VAR).map(PathBuf::from),
        }
    }

    pub fn with_box_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.box_catalog_path = Some(path.into());
        self
    }

    pub fn with_product_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.product_catalog_path = Some(path.into());
        self
    }

    /// Loads the box catalog. A broken catalog file is fatal.
    pub fn load_boxes(&self) -> Result<BoxCatalog, CatalogError> {
        match &self.box_catalog_path {
            Some(path) => {
                let catalog = BoxCatalog::from_json_file(path)?;
                info!(
                    "Loaded {} box types from {}",
                    catalog.len(),
                    path.display()
                );
                Ok(catalog)
            }
            None => Ok(BoxCatalog::builtin()),
        }
    }

    pub fn load_products(&self) -> Result<ProductCatalog, CatalogError> {
        match &self.product_catalog_path {
            Some(path) => {
                let catalog = ProductCatalog::from_json_file(path)?;
                info!("Loaded {} products from {}", catalog.len(), path.display());
                Ok(catalog)
            }
            None => Ok(ProductCatalog::builtin()),
        }
    }
}

/// Rules applied to pack requests before they reach the selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RequestLimits {
    /// Maximum number of products per request.
    pub max_products: usize,
    /// Reject requests that list the same product id twice.
    pub reject_duplicates: bool,
}

impl RequestLimits {
    pub const DEFAULT_MAX_PRODUCTS: usize = 10;
    pub const DEFAULT_REJECT_DUPLICATES: bool = true;

    const MAX_PRODUCTS_VAR: &'static str = "BOX_ALLOCATOR_MAX_PRODUCTS";
    const REJECT_DUPLICATES_VAR: &'static str = "BOX_ALLOCATOR_REJECT_DUPLICATES";

    fn from_env() -> Self {
        let max_products = load_usize_with_warning(
            Self::MAX_PRODUCTS_VAR,
            Self::DEFAULT_MAX_PRODUCTS,
            |value| value >= 1,
            "must be at least 1",
        );

        let reject_duplicates = env_string(Self::REJECT_DUPLICATES_VAR)
            .and_then(|raw| parse_bool(&raw, Self::REJECT_DUPLICATES_VAR))
            .unwrap_or(Self::DEFAULT_REJECT_DUPLICATES);

        if !reject_duplicates {
            warn!(
                "Duplicate products are accepted ({} = false).",
                Self::REJECT_DUPLICATES_VAR
            );
        }

        Self {
            max_products,
            reject_duplicates,
        }
    }
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_products: Self::DEFAULT_MAX_PRODUCTS,
            reject_duplicates: Self::DEFAULT_REJECT_DUPLICATES,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_port(raw: &str) -> Result<u16, String> {
    match raw.trim().parse::<u16>() {
        Ok(0) => Err("must not be 0".to_string()),
        Ok(value) => Ok(value),
        Err(err) => Err(format!("could not be parsed: {}", err)),
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_usize(
    raw: &str,
    validator: impl Fn(usize) -> bool,
    invalid_hint: &str,
) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(value) if validator(value) => Ok(value),
        Ok(_) => Err(invalid_hint.to_string()),
        Err(err) => Err(format!("could not be parsed as number: {}", err)),
    }
}

fn load_usize_with_warning(
    var_name: &str,
    default: usize,
    validator: impl Fn(usize) -> bool,
    invalid_hint: &str,
) -> usize {
    match env_string(var_name) {
        Some(raw) => parse_usize(&raw, validator, invalid_hint).unwrap_or_else(|reason| {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, reason, default
            );
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        for raw in ["1", "true", "yes", "y", "on", "TRUE", "Yes", " on "] {
            assert_eq!(parse_bool(raw, "TEST_VAR"), Some(true), "input {raw:?}");
        }
    }

    #[test]
    fn test_parse_bool_false_values() {
        for raw in ["0", "false", "no", "n", "off", "FALSE", "No", "  0  "] {
            assert_eq!(parse_bool(raw, "TEST_VAR"), Some(false), "input {raw:?}");
        }
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("8080"), Ok(8080));
        assert_eq!(parse_port(" 3000 "), Ok(3000));
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
        assert!(parse_port("http").is_err());
    }

    #[test]
    fn test_parse_usize_respects_validator() {
        assert_eq!(parse_usize("12", |v| v >= 1, "must be at least 1"), Ok(12));
        assert_eq!(
            parse_usize("0", |v| v >= 1, "must be at least 1"),
            Err("must be at least 1".to_string())
        );
        assert!(parse_usize("-3", |v| v >= 1, "must be at least 1").is_err());
    }

    #[test]
    fn test_defaults() {
        let limits = RequestLimits::default();
        assert_eq!(limits.max_products, 10);
        assert!(limits.reject_duplicates);

        let api = ApiConfig::default();
        assert_eq!(api.port(), 8080);
        assert!(api.binds_to_all_interfaces());
        assert_eq!(api.socket_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_catalog_config_falls_back_to_builtin() {
        let config = CatalogConfig::default();
        assert_eq!(config.load_boxes().unwrap(), BoxCatalog::builtin());
        assert_eq!(config.load_products().unwrap(), ProductCatalog::builtin());
    }

    #[test]
    fn test_catalog_config_reports_missing_file() {
        let config = CatalogConfig::default().with_box_catalog("/nonexistent/boxes.json");
        assert!(matches!(
            config.load_boxes(),
            Err(CatalogError::Io { .. })
        ));
    }
}
