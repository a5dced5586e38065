use pullgate::request::SourceFlagPolicy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_ENGINE_HOST: &str = "http://localhost:2375";

pub struct Ctx {
    pub engine_host: String,
    pub source_policy: SourceFlagPolicy,
}

impl Ctx {
    pub fn init() -> anyhow::Result<Self> {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env()))
            .try_init()?;
        let engine_host =
            std::env::var("DOCKER_HOST").unwrap_or_else(|_| DEFAULT_ENGINE_HOST.to_string());
        let source_policy = if std::env::var("PULLGATE_STRICT_SOURCE_FLAGS").is_ok() {
            SourceFlagPolicy::Strict
        } else {
            SourceFlagPolicy::Precedence
        };
        Ok(Self {
            engine_host,
            source_policy,
        })
    }
}
