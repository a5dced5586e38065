use clap::{ArgAction, Parser};
use pullgate::engine::EngineClient;
use pullgate::puller::Puller;
use pullgate::request::PullRequestBuilder;
use pullgate::{error, Result};
use snafu::ResultExt;

use super::context::Ctx;

fn content_trust_enabled() -> bool {
    std::env::var("DOCKER_CONTENT_TRUST")
        .map(|v| !matches!(v.as_str(), "" | "0" | "false"))
        .unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(version, about = "Pull an image or a repository from a registry", long_about = None)]
pub struct Pull {
    /// Image reference NAME[:TAG|@DIGEST]
    remote: String,
    /// Download all tagged images in the repository
    #[arg(short = 'a', long)]
    all_tags: bool,
    /// Download the source container in addition to the image
    #[arg(long)]
    source: bool,
    /// Download only the source container for the image
    #[arg(long)]
    source_only: bool,
    /// Constrain the pull to a specific os/architecture
    #[arg(long)]
    platform: Option<String>,
    /// Skip image verification (negatable, defaults from DOCKER_CONTENT_TRUST)
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = !content_trust_enabled(),
        default_missing_value = "true",
        action = ArgAction::Set,
    )]
    disable_content_trust: bool,
}

impl Pull {
    pub async fn run(&self, ctx: &Ctx) -> Result<()> {
        let request = PullRequestBuilder::default()
            .remote(self.remote.as_str())
            .all_tags(self.all_tags)
            .platform(self.platform.clone())
            .untrusted(self.disable_content_trust)
            .include_source(self.source)
            .source_only(self.source_only)
            .build()
            .context(error::BuildRequestSnafu)?;
        let engine = EngineClient::new(&ctx.engine_host)?;
        Puller::new(&engine, &engine, std::io::stdout())
            .with_policy(ctx.source_policy)
            .run(&request)
            .await
    }
}
