/// Engine configuration
///
/// # Environment variables
///
/// Every setting can be overridden through the environment:
///
/// | Variable | Default | Purpose |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/commerce | Working directory (store file lives here) |
/// | CURRENCY | USD | ISO currency code stamped on new orders |
/// | DEFAULT_SHIPPING_PACKAGE | (unset) | Fallback package for products without one |
/// | BULK_UPDATE_CAP | 100 | Hard cap on bulk status-update batches |
/// | NOTIFY_CAPACITY | 1024 | Notification channel capacity |
/// | ENVIRONMENT | development | development \| staging \| production |
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the store file
    pub work_dir: String,
    /// ISO currency code for new orders
    pub currency: String,
    /// Workspace default shipping package, used when a product line has
    /// no package of its own
    pub default_shipping_package: Option<i64>,
    /// Oversized bulk batches are rejected outright, never truncated
    pub bulk_update_cap: usize,
    /// Capacity of the fire-and-forget notification channel
    pub notify_capacity: usize,
    /// Running environment: development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/commerce".into()),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "USD".into()),
            default_shipping_package: std::env::var("DEFAULT_SHIPPING_PACKAGE")
                .ok()
                .and_then(|p| p.parse().ok()),
            bulk_update_cap: std::env::var("BULK_UPDATE_CAP")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(100),
            notify_capacity: std::env::var("NOTIFY_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: "/var/lib/commerce".into(),
            currency: "USD".into(),
            default_shipping_package: None,
            bulk_update_cap: 100,
            notify_capacity: 1024,
            environment: "development".into(),
        }
    }
}
