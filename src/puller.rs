use snafu::ResultExt;
use std::io::Write;
use std::str::FromStr;

use crate::hints::HintSet;
use crate::plan::{self, PullPath};
use crate::reference::ImageReference;
use crate::request::{self, PullRequest, SourceFlagPolicy};
use crate::trust::{PullExecutor, TrustDelegate};
use crate::{error, Result};

/// Orchestrates a single pull: normalize the reference, validate the flags,
/// resolve the source mode, pick the execution path, dispatch to exactly one
/// executor and translate known failure signatures. Holds no state across
/// invocations; collaborators are injected so tests run against fakes.
pub struct Puller<'a, D, E, W> {
    delegate: &'a D,
    executor: &'a E,
    out: W,
    policy: SourceFlagPolicy,
    hints: HintSet,
}

impl<'a, D, E, W> Puller<'a, D, E, W>
where
    D: TrustDelegate,
    E: PullExecutor,
    W: Write + Send,
{
    pub fn new(delegate: &'a D, executor: &'a E, out: W) -> Self {
        Self {
            delegate,
            executor,
            out,
            policy: SourceFlagPolicy::default(),
            hints: HintSet::default(),
        }
    }

    pub fn with_policy(mut self, policy: SourceFlagPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_hints(mut self, hints: HintSet) -> Self {
        self.hints = hints;
        self
    }

    pub async fn run(&mut self, request: &PullRequest) -> Result<()> {
        let mut reference = ImageReference::from_str(request.remote())?;
        request::validate(&reference, request, self.policy)?;
        if !request.all_tags() && reference.is_name_only() {
            reference = reference.tag_name_only();
            if let Some(tag) = reference.tag() {
                writeln!(self.out, "Using default tag: {tag}").context(error::NoticeSnafu)?;
            }
        }
        let plan = plan::plan(&reference, request);
        debug!(target: "puller", "pulling {reference} via {:?} path", plan.path);
        let resolved = self
            .delegate
            .resolve_trust_and_auth(&reference)
            .await
            .context(error::TrustResolutionSnafu {
                reference: reference.to_string(),
            })?;
        let outcome = match plan.path {
            PullPath::Trusted => {
                self.executor
                    .trusted_pull(&resolved, plan.platform.as_deref(), plan.include_source)
                    .await
            }
            PullPath::Privileged => {
                self.executor
                    .privileged_pull(
                        &resolved,
                        request.all_tags(),
                        plan.platform.as_deref(),
                        plan.include_source,
                    )
                    .await
            }
        };
        outcome.map_err(|err| self.hints.apply(err))
    }
}
