//! sigcheck: verify Sigstore bundles against a trusted root.
//!
//! Each bundle is verified in turn. The first failure stops the run with
//! exit code 1.

mod root;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use sigcheck_verify::rekor::{RekorClient, RekorClientConfig};
use sigcheck_verify::types::{Bundle, BundleExt, Sha256Hash};
use sigcheck_verify::{VerificationPolicy, Verifier};

/// Verify Sigstore bundles offline or against the transparency log.
#[derive(Parser)]
#[command(name = "sigcheck", version, about, long_about = None)]
struct Cli {
    /// Bundle files to verify.
    #[arg(required = true, value_name = "BUNDLE")]
    bundles: Vec<PathBuf>,

    /// Require the signing certificate's OIDC issuer.
    #[arg(long, env = "SIGCHECK_EXPECTED_OIDC_ISSUER", value_name = "URL")]
    expected_oidc_issuer: Option<String>,

    /// Require a subject alternative name on the signing certificate.
    #[arg(long, env = "SIGCHECK_EXPECTED_SAN", value_name = "IDENTITY")]
    expected_san: Option<String>,

    /// Require an RFC 3161 timestamp from a trusted timestamp authority.
    #[arg(long, env = "SIGCHECK_REQUIRE_TSA")]
    require_tsa: bool,

    /// Require transparency log entries.
    #[arg(
        long,
        env = "SIGCHECK_REQUIRE_TLOG",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_name = "BOOL"
    )]
    require_tlog: bool,

    /// Confirm each log entry against the live log.
    #[arg(long, env = "SIGCHECK_ONLINE_TLOG")]
    online_tlog: bool,

    /// Reject bundles older than this format version (e.g. 0.3).
    #[arg(long, env = "SIGCHECK_MIN_BUNDLE_VERSION", value_name = "VERSION")]
    min_bundle_version: Option<String>,

    /// Trusted root JSON file. Defaults to the embedded Sigstore production root.
    #[arg(long, env = "SIGCHECK_TRUSTED_ROOT", value_name = "PATH")]
    trusted_root: Option<PathBuf>,

    /// TUF repository to fetch the trusted root from.
    #[arg(long, env = "SIGCHECK_TUF_ROOT_URL", value_name = "URL", conflicts_with = "trusted_root")]
    tuf_root_url: Option<String>,

    /// TUF root metadata that bootstraps trust in the repository.
    #[arg(long, env = "SIGCHECK_TUF_ROOT_JSON", value_name = "PATH", requires = "tuf_root_url")]
    tuf_root_json: Option<PathBuf>,

    /// Cache directory for TUF metadata and targets.
    #[arg(long, env = "SIGCHECK_TUF_DIRECTORY", value_name = "DIR", requires = "tuf_root_url")]
    tuf_directory: Option<PathBuf>,

    /// Use the cached TUF trusted root without contacting the repository.
    #[arg(long, env = "SIGCHECK_TUF_OFFLINE", requires = "tuf_root_url")]
    tuf_offline: bool,

    /// Artifact the bundles must sign: a file path or `sha256:<hex>`.
    #[arg(long, env = "SIGCHECK_ARTIFACT", value_name = "PATH")]
    artifact: Option<String>,

    /// Timeout for transparency log requests, in seconds.
    #[arg(long, env = "SIGCHECK_LOG_TIMEOUT", default_value_t = 30, value_name = "SECS")]
    log_timeout: u64,

    /// Enable verbose logging (repeat for more detail: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output logs as JSON (for machine consumption).
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn policy(&self) -> Result<VerificationPolicy> {
        let mut builder = VerificationPolicy::builder()
            .require_transparency_log(self.require_tlog)
            .online_transparency_log(self.online_tlog)
            .require_timestamp_authority(self.require_tsa)
            // CT log checks are not available; asking would only add a warning
            .require_ct_log(false);
        if let Some(ref issuer) = self.expected_oidc_issuer {
            builder = builder.require_issuer(issuer);
        }
        if let Some(ref san) = self.expected_san {
            builder = builder.require_identity(san);
        }
        if let Some(ref version) = self.min_bundle_version {
            builder = builder.min_bundle_version(version);
        }
        Ok(builder.build()?)
    }
}

/// Raw artifact bytes or a digest given on the command line
enum ArtifactInput {
    Bytes(Vec<u8>),
    Digest(Sha256Hash),
}

impl ArtifactInput {
    fn load(arg: &str) -> Result<Self> {
        if let Some(hex) = arg.strip_prefix("sha256:") {
            let digest = Sha256Hash::from_hex(hex)
                .wrap_err_with(|| format!("invalid artifact digest {}", arg))?;
            return Ok(ArtifactInput::Digest(digest));
        }
        let bytes =
            std::fs::read(arg).wrap_err_with(|| format!("failed to read artifact {}", arg))?;
        Ok(ArtifactInput::Bytes(bytes))
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn load_bundle(path: &Path) -> Result<Bundle> {
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read bundle {}", path.display()))?;
    Bundle::from_json(&json)
        .map_err(|e| eyre!("{}: {}", path.display(), sigcheck_verify::Error::from(e)))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let policy = cli.policy()?;
    let trusted_root = root::load(&cli)?;
    let artifact = cli.artifact.as_deref().map(ArtifactInput::load).transpose()?;

    let client = if policy.online_tlog() {
        let config =
            RekorClientConfig::default().with_timeout(Duration::from_secs(cli.log_timeout));
        Some(RekorClient::new(config)?)
    } else {
        None
    };

    let mut verifier = Verifier::new(&trusted_root, policy);
    if let Some(ref client) = client {
        verifier = verifier.with_log_source(client);
    }

    for path in &cli.bundles {
        let bundle = load_bundle(path)?;
        let outcome = match &artifact {
            Some(ArtifactInput::Bytes(bytes)) => verifier.verify_artifact(&bundle, bytes),
            Some(ArtifactInput::Digest(digest)) => verifier.verify_artifact(&bundle, *digest),
            None => verifier.verify(&bundle),
        };
        let result = outcome.map_err(|e| eyre!("{}: {}", path.display(), e))?;

        for warning in &result.warnings {
            tracing::warn!(bundle = %path.display(), "{}", warning);
        }
        tracing::info!(
            bundle = %path.display(),
            identity = result.identity.as_deref().unwrap_or(""),
            signing_time = result.signing_time,
            "verified"
        );
        println!("Verification successful!");
    }

    Ok(())
}
