//! Command-line argument parsing with clap.

use std::path::{Path, PathBuf};

use berth_proto::{ResourceKind, Verb};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ConfigOverrides;
use crate::error::CliError;
use crate::orchestrator::CommandRequest;
use crate::payload::ResourceDocument;

/// berth - container orchestration client.
#[derive(Parser, Debug, Clone)]
#[command(name = "berth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON config file.
    #[arg(long, env = "BERTH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the submission API.
    #[arg(long, env = "BERTH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Session channel address (host:port).
    #[arg(long, env = "BERTH_SESSION_ADDR", global = true)]
    pub session_addr: Option<String>,

    /// Auth token.
    #[arg(long, env = "BERTH_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Namespace for namespaced kinds.
    #[arg(short, long, env = "BERTH_NAMESPACE", global = true)]
    pub namespace: Option<String>,

    /// Log every protocol step to stderr.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format.
    #[arg(short, long = "output", value_enum, default_value_t = Format::Table, global = true)]
    pub output: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Overrides that take precedence over the config file.
    ///
    /// `--namespace` is not one of them: it scopes this command only, while
    /// the config's default namespace stays the fallback.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_url: self.api_url.clone(),
            session_addr: self.session_addr.clone(),
            token: self.token.clone(),
            debug: self.debug,
        }
    }

    /// Turn the parsed arguments into a command request.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are inconsistent or a resource file
    /// cannot be loaded.
    pub fn request(&self) -> Result<CommandRequest, CliError> {
        let mut request = self.command.request()?;
        request.namespace.clone_from(&self.namespace);
        Ok(request)
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[derive(Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a deployment from a document.
    Run(RunArgs),

    /// Create a resource from a document.
    Create(FileArgs),

    /// Show one resource or list a kind.
    Get(TargetArgs),

    /// Delete a resource.
    Delete(TargetArgs),

    /// Replace a resource with a new document.
    Replace(FileArgs),

    /// Expose a deployment through a service document.
    Expose(ExposeArgs),
}

impl Commands {
    /// Verb this subcommand submits.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        match self {
            Self::Run(_) => Verb::Run,
            Self::Create(_) => Verb::Create,
            Self::Get(_) => Verb::Get,
            Self::Delete(_) => Verb::Delete,
            Self::Replace(_) => Verb::Replace,
            Self::Expose(_) => Verb::Expose,
        }
    }

    fn request(&self) -> Result<CommandRequest, CliError> {
        let verb = self.verb();
        match self {
            Self::Run(args) => named_document(verb, ResourceKind::Deployments, &args.name, &args.file),
            Self::Expose(args) => named_document(verb, ResourceKind::Services, &args.name, &args.file),
            Self::Create(args) | Self::Replace(args) => {
                let doc = ResourceDocument::load(&args.file)?;
                Ok(document_request(verb, doc))
            }
            Self::Get(args) | Self::Delete(args) => args.resolve(verb),
        }
    }
}

/// Arguments for `run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Deployment name.
    pub name: String,

    /// Deployment document (JSON).
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Arguments for `expose`.
#[derive(Args, Debug, Clone)]
pub struct ExposeArgs {
    /// Service name.
    pub name: String,

    /// Service document (JSON).
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Arguments for verbs driven entirely by a document.
#[derive(Args, Debug, Clone)]
pub struct FileArgs {
    /// Resource document (JSON).
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Arguments for `get` and `delete`: a kind and name, or a document.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Resource kind (deploy, po, svc, ns, ...).
    pub kind: Option<String>,

    /// Resource name.
    pub name: Option<String>,

    /// Take kind and name from a resource document instead.
    #[arg(short, long, conflicts_with_all = ["kind", "name"])]
    pub file: Option<PathBuf>,
}

impl TargetArgs {
    fn resolve(&self, verb: Verb) -> Result<CommandRequest, CliError> {
        match (&self.file, &self.kind) {
            (Some(file), None) => {
                let doc = ResourceDocument::load(file)?;
                let name = doc.name().ok_or_else(|| {
                    CliError::Payload(format!(
                        "{verb} -f {}: document has no metadata.name",
                        file.display()
                    ))
                })?;
                let mut request = CommandRequest::new(verb, doc.kind());
                request.name = Some(name.to_string());
                Ok(request)
            }
            (None, Some(kind)) => {
                let kind = kind
                    .parse::<ResourceKind>()
                    .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
                if verb == Verb::Delete && self.name.is_none() {
                    return Err(CliError::InvalidArgument(format!(
                        "delete {kind} requires a resource name"
                    )));
                }
                let mut request = CommandRequest::new(verb, kind);
                request.name.clone_from(&self.name);
                Ok(request)
            }
            (None, None) => Err(CliError::InvalidArgument(
                "one of KIND or --file is required".into(),
            )),
            (Some(_), Some(_)) => Err(CliError::InvalidArgument(
                "give either KIND or --file, not both".into(),
            )),
        }
    }
}

fn named_document(
    verb: Verb,
    kind: ResourceKind,
    name: &str,
    file: &Path,
) -> Result<CommandRequest, CliError> {
    let doc = ResourceDocument::load(file)?.named(name)?;
    if doc.kind() != kind {
        return Err(CliError::Payload(format!(
            "{verb} expects a {kind} document, found {}",
            doc.kind()
        )));
    }
    Ok(document_request(verb, doc))
}

fn document_request(verb: Verb, doc: ResourceDocument) -> CommandRequest {
    let mut request = CommandRequest::new(verb, doc.kind());
    request.name = doc.name().map(str::to_string);
    request.payload = Some(doc.into_body());
    request
}
