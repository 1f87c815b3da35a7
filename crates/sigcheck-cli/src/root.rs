//! Trusted root selection.

use color_eyre::eyre::{bail, Result, WrapErr};
use sigcheck_trust_root::{
    BytesSource, FileSource, TrustRootSource, TrustedRoot, TufConfig, TufSource,
    SIGSTORE_PRODUCTION_TRUSTED_ROOT,
};

use crate::Cli;

/// Load the trusted root named on the command line
///
/// A local file wins, then a TUF repository. With neither, the embedded
/// Sigstore production trusted root is used.
pub fn load(cli: &Cli) -> Result<TrustedRoot> {
    let source = source(cli)?;
    let root = TrustedRoot::from_source(source.as_ref())
        .map_err(sigcheck_verify::Error::from)
        .wrap_err("failed to load trusted root")?;
    tracing::debug!(
        media_type = root.media_type(),
        logs = root.tlog_verifiers().count(),
        "trusted root loaded"
    );
    Ok(root)
}

fn source(cli: &Cli) -> Result<Box<dyn TrustRootSource>> {
    if let Some(ref path) = cli.trusted_root {
        return Ok(Box::new(FileSource::new(path)));
    }

    let Some(ref url) = cli.tuf_root_url else {
        tracing::debug!("using the embedded Sigstore production trusted root");
        return Ok(Box::new(BytesSource::from_static(
            SIGSTORE_PRODUCTION_TRUSTED_ROOT.as_bytes(),
        )));
    };
    let Some(ref bootstrap) = cli.tuf_root_json else {
        bail!("--tuf-root-url needs the repository's root metadata (--tuf-root-json)");
    };
    let root_json = std::fs::read(bootstrap)
        .wrap_err_with(|| format!("failed to read TUF root metadata {}", bootstrap.display()))?;

    let mut config = TufConfig::new(url);
    if let Some(ref dir) = cli.tuf_directory {
        config = config.with_cache_dir(dir.clone());
    }
    if cli.tuf_offline {
        config = config.offline();
    }
    Ok(Box::new(TufSource::new(config, root_json)))
}
