use snafu::Snafu;

use crate::request::PullRequestBuilderError;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("tag can't be used with --all-tags/-a"))]
    AllTagsWithReference,
    #[snafu(display("can't download source with --all-tags/-a"))]
    AllTagsWithSource,
    #[snafu(display("{message} - {advice}"))]
    Annotated { message: String, advice: String },
    #[snafu(display("failed to resolve registry credentials: {reason}"))]
    Authorization { reason: String },
    #[snafu(display("invalid pull request: {source}"))]
    BuildRequest { source: PullRequestBuilderError },
    #[snafu(display("failed to deserialize credential file: {source}"))]
    ConfigDeserialize { source: serde_json::Error },
    #[snafu(display("engine did not return a resolved descriptor for '{reference}'"))]
    DescriptorMissing { reference: String },
    #[snafu(display("unsupported engine host '{host}': only http and https are supported"))]
    EngineHost { host: String },
    #[snafu(display("engine reported pull failure: {reason}"))]
    EngineReport { reason: String },
    #[snafu(display("engine returned an unexpected status ({status}): {reason}"))]
    EngineStatus { status: u16, reason: String },
    #[snafu(display("failed to deserialize error response from engine: {source}"))]
    ErrorDeserialize { source: reqwest::Error },
    #[snafu(display("failed to interact with local file: {source}"))]
    File { source: std::io::Error },
    #[snafu(display("invalid algorithm in digest: {algorithm}"))]
    InvalidAlgorithm { algorithm: String },
    #[snafu(display("malformed image reference '{reference}': {reason}"))]
    MalformedReference { reference: String, reason: String },
    #[snafu(display("failed to emit notice: {source}"))]
    Notice { source: std::io::Error },
    #[snafu(display("failed to make request to engine: {source}"))]
    Request { source: reqwest::Error },
    #[snafu(display("failed to parse response from engine: {source}"))]
    ResponseDeserialize { source: serde_json::Error },
    #[snafu(display("failed to read response stream from engine: {source}"))]
    ResponseRead { source: reqwest::Error },
    #[snafu(display("failed to serialize registry auth: {source}"))]
    Serialize { source: serde_json::Error },
    #[snafu(display("--source can't be combined with --source-only"))]
    SourceFlagsConflict,
    #[snafu(display(
        "can't verify trust for every tag in a repository; disable content trust to pull all tags"
    ))]
    TrustedAllTags,
    #[snafu(display("failed to resolve trust data for '{reference}': {source}"))]
    TrustResolution {
        reference: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },
    #[snafu(display("invalid url detected: {source}"))]
    Url { source: url::ParseError },
}
