//! Configuration for the composite service.
//!
//! Built once at startup and shared read-only (`Arc<Config>`) by every
//! component. [`Config::from_env`] reads process environment variables;
//! [`Config::from_lookup`] takes any lookup function so tests never touch the
//! real environment.

use composite_core::Service;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// How `GET /composites/{id}/` looks breeders up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreederLookup {
    /// GET the breeder service directly
    #[default]
    Direct,
    /// Correlation-id rendezvous over pub/sub
    PubSub,
}

impl FromStr for BreederLookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "pubsub" | "pub_sub" | "pub-sub" => Ok(Self::PubSub),
            other => Err(format!("expected `direct` or `pubsub`, got `{other}`")),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server
    pub server: ServerConfig,
    /// Sibling services
    pub services: ServiceConfig,
    /// Breeder lookup mode
    pub breeder_lookup: BreederLookup,
    /// Pub/sub rendezvous
    pub pubsub: PubSubConfig,
    /// Workflow executions
    pub workflow: WorkflowConfig,
    /// Notification function
    pub notification: NotificationConfig,
    /// Bearer token for the Google REST adapters
    pub access_token: Option<String>,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Mount point of the composite routes
    pub api_base_path: String,
    /// Prefix for every hypermedia href
    pub url_prefix: String,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    /// Upper bound on any single inbound request
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Sibling service locations
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Breeder service base URL
    pub breeder_url: String,
    /// Pet service base URL
    pub pet_url: String,
    /// Customer service base URL
    pub customer_url: String,
    /// Timeout for regular upstream calls
    pub timeout: Duration,
    /// Timeout for liveness probes
    pub probe_timeout: Duration,
}

impl ServiceConfig {
    /// Base URL of `service`, without a trailing slash.
    #[must_use]
    pub fn base_url(&self, service: Service) -> &str {
        let url = match service {
            Service::Breeder => &self.breeder_url,
            Service::Pet => &self.pet_url,
            Service::Customer => &self.customer_url,
        };
        url.trim_end_matches('/')
    }
}

/// Pub/sub rendezvous configuration
#[derive(Debug, Clone)]
pub struct PubSubConfig {
    /// REST endpoint
    pub endpoint: String,
    /// Project owning the topic and subscription
    pub project_id: String,
    /// Topic the lookup request is published to
    pub request_topic: String,
    /// Subscription the reply is pulled from
    pub response_subscription: String,
    /// How long to wait for the reply
    pub timeout: Duration,
    /// Delay between pulls
    pub poll_interval: Duration,
    /// Batch size per pull
    pub max_messages: u32,
}

/// Workflow execution configuration
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// REST endpoint
    pub endpoint: String,
    /// Project owning the workflows
    pub project_id: String,
    /// Region of the workflows
    pub location: String,
    /// Workflow used for customer lookup
    pub customer_workflow: String,
    /// How long to poll before giving up
    pub timeout: Duration,
    /// Delay between polls
    pub poll_interval: Duration,
}

/// Notification function configuration
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// HTTP trigger URL of the function
    pub function_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric or enumerated variable is
    /// set to something unparseable, or if `CORS_ORIGINS` lists `*`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric or enumerated variable is
    /// set to something unparseable, or if `CORS_ORIGINS` lists `*`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let port: u16 = vars.parse("PORT", 8000)?;
        let api_base_path = normalise_base_path(&vars.string("API_BASE_PATH", "/api/v1"));
        let url_prefix = vars
            .optional("URL_PREFIX")
            .unwrap_or_else(|| format!("http://localhost:{port}{api_base_path}"));
        let project_id = vars.string("GCP_PROJECT_ID", "local-project");

        Ok(Self {
            server: ServerConfig {
                host: vars.string("HOST", "0.0.0.0"),
                port,
                api_base_path,
                url_prefix,
                cors_origins: cors_origins(&vars.string(
                    "CORS_ORIGINS",
                    "http://localhost,http://localhost:3000",
                ))?,
                request_timeout: Duration::from_secs(vars.parse("REQUEST_TIMEOUT_SECS", 60)?),
            },
            services: ServiceConfig {
                breeder_url: vars.string(
                    "BREEDER_SERVICE_URL",
                    "http://localhost:8001/api/v1/breeders",
                ),
                pet_url: vars.string("PET_SERVICE_URL", "http://localhost:8002/api/v1/pets"),
                customer_url: vars.string(
                    "CUSTOMER_SERVICE_URL",
                    "http://localhost:8003/api/v1/customers",
                ),
                timeout: Duration::from_secs(vars.parse("UPSTREAM_TIMEOUT_SECS", 10)?),
                probe_timeout: Duration::from_secs(vars.parse("PROBE_TIMEOUT_SECS", 2)?),
            },
            breeder_lookup: vars.parse("BREEDER_LOOKUP", BreederLookup::Direct)?,
            pubsub: PubSubConfig {
                endpoint: vars.string("PUBSUB_ENDPOINT", "https://pubsub.googleapis.com"),
                project_id: project_id.clone(),
                request_topic: vars.string("PUBSUB_REQUEST_TOPIC", "breeder-requests"),
                response_subscription: vars
                    .string("PUBSUB_RESPONSE_SUBSCRIPTION", "breeder-responses-sub"),
                timeout: Duration::from_secs(vars.parse("PUBSUB_TIMEOUT_SECS", 30)?),
                poll_interval: Duration::from_millis(
                    vars.parse("PUBSUB_POLL_INTERVAL_MS", 500)?,
                ),
                max_messages: vars.parse("PUBSUB_MAX_MESSAGES", 10)?,
            },
            workflow: WorkflowConfig {
                endpoint: vars.string(
                    "WORKFLOW_ENDPOINT",
                    "https://workflowexecutions.googleapis.com",
                ),
                project_id,
                location: vars.string("WORKFLOW_LOCATION", "us-central1"),
                customer_workflow: vars.string("CUSTOMER_WORKFLOW", "customer-lookup"),
                timeout: Duration::from_secs(vars.parse("WORKFLOW_TIMEOUT_SECS", 30)?),
                poll_interval: Duration::from_millis(
                    vars.parse("WORKFLOW_POLL_INTERVAL_MS", 1000)?,
                ),
            },
            notification: NotificationConfig {
                function_url: vars.string(
                    "NOTIFICATION_FUNCTION_URL",
                    "http://localhost:8080/notify",
                ),
            },
            access_token: vars.optional("GCP_ACCESS_TOKEN"),
        })
    }
}

/// Credentialed CORS needs explicit origins, so `*` is refused.
fn cors_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.iter().any(|origin| origin == "*") {
        return Err(ConfigError::Invalid {
            key: "CORS_ORIGINS",
            value: raw.to_string(),
            reason: "wildcard origin is not allowed with credentials; list origins explicitly"
                .to_string(),
        });
    }
    Ok(origins)
}

fn normalise_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => {
                let parsed = value.trim().parse::<T>();
                parsed.map_err(|e| ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                    value,
                })
            }
        }
    }
}
