use crate::error::Error;

/// Upstream marker the engine embeds when a plugin reference is pulled as an
/// image. String-matched because the engine only reports it as message text.
pub const PLUGIN_MARKER: &str = "when fetching 'plugin'";

const PLUGIN_ADVICE: &str = "Use `docker plugin install`";

/// A single remediation rule: a predicate over the final error and the advice
/// to append when it matches.
pub struct Hint {
    matches: Box<dyn Fn(&Error) -> bool + Send + Sync>,
    advice: String,
}

impl Hint {
    pub fn new(
        matches: impl Fn(&Error) -> bool + Send + Sync + 'static,
        advice: impl Into<String>,
    ) -> Self {
        Self {
            matches: Box::new(matches),
            advice: advice.into(),
        }
    }

    /// Rule matching a substring of the rendered error message.
    pub fn on_substring(marker: impl Into<String>, advice: impl Into<String>) -> Self {
        let marker = marker.into();
        Self::new(move |err| err.to_string().contains(&marker), advice)
    }
}

/// Ordered set of remediation rules applied to errors coming back from the
/// execution paths. The first matching rule wins; everything else passes
/// through unchanged.
pub struct HintSet {
    hints: Vec<Hint>,
}

impl Default for HintSet {
    fn default() -> Self {
        Self {
            hints: vec![Hint::on_substring(PLUGIN_MARKER, PLUGIN_ADVICE)],
        }
    }
}

impl HintSet {
    pub fn empty() -> Self {
        Self { hints: Vec::new() }
    }

    pub fn push(&mut self, hint: Hint) {
        self.hints.push(hint);
    }

    pub fn apply(&self, err: Error) -> Error {
        for hint in &self.hints {
            if (hint.matches)(&err) {
                return Error::Annotated {
                    message: err.to_string(),
                    advice: hint.advice.clone(),
                };
            }
        }
        err
    }
}
