use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::info;

use plugin_validator::{
    manifest, render, resolver, scheduler, Config, Format, MarketplaceManifest, Report,
    RuleContext, RuleEngine, RuleSet, ValidatorError,
};

pub(crate) struct Options {
    pub manifest: Option<PathBuf>,
    pub plugin: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub format: Format,
    pub config: Option<PathBuf>,
    pub workers: Option<usize>,
    pub strict: bool,
    pub color: bool,
}

pub(crate) fn run(opts: Options) -> ExitCode {
    let mut config = match super::load_config(opts.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return super::fail(&e),
    };
    if opts.workers.is_some() {
        config.workers = opts.workers;
    }
    config.strict |= opts.strict;

    let engine = match build_engine(&config) {
        Ok(e) => e,
        Err(e) => return super::fail(&e),
    };

    let report = match &opts.plugin {
        Some(dir) => validate_single(&engine, dir, config.strict),
        None => {
            let path = opts
                .manifest
                .clone()
                .unwrap_or_else(|| PathBuf::from(manifest::DEFAULT_MANIFEST_PATH));
            let manifest = match manifest::load(&path) {
                Ok(m) => m,
                Err(e) => return super::fail(&e),
            };
            validate_marketplace(engine, &manifest, &opts, &config)
        }
    };
    let report = match report {
        Ok(r) => r,
        Err(e) => return super::fail(&e),
    };

    print!("{}", render(&report, opts.format, opts.color));
    ExitCode::from(report.exit_code())
}

fn build_engine(config: &Config) -> Result<RuleEngine, ValidatorError> {
    Ok(RuleEngine::new(
        RuleSet::from_config(config)?,
        RuleContext::from_config(config)?,
    ))
}

/// Validate one directory outside any manifest.
fn validate_single(
    engine: &RuleEngine,
    dir: &std::path::Path,
    strict: bool,
) -> Result<Report, ValidatorError> {
    let plugin = resolver::resolve_dir(dir).map_err(|e| match e {
        ValidatorError::PluginNotFound { path } => ValidatorError::Invocation {
            message: format!("plugin directory not found: {}", path.display()),
        },
        other => other,
    })?;
    let results = engine.validate_plugin(None, &plugin);
    Ok(Report::summarize(&[plugin.name], results, strict))
}

fn validate_marketplace(
    engine: RuleEngine,
    manifest: &MarketplaceManifest,
    opts: &Options,
    config: &Config,
) -> Result<Report, ValidatorError> {
    let base_dir = manifest.base_dir_or(opts.base_dir.as_deref());
    let workers = config.worker_count();
    info!(
        manifest = %manifest.path().display(),
        base_dir = %base_dir.display(),
        plugins = manifest.len(),
        rules = engine.rules().len(),
        workers,
        "validating marketplace"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(workers)
        .enable_all()
        .build()
        .map_err(|e| ValidatorError::InternalIo {
            path: PathBuf::from("."),
            source: e,
        })?;
    let outcome = runtime.block_on(scheduler::validate_marketplace(
        Arc::new(engine),
        manifest,
        &base_dir,
        workers,
        scheduler::shutdown_signal(),
    ));

    let report = Report::summarize(&outcome.plugins, outcome.results, config.strict);
    Ok(if outcome.interrupted {
        report.with_interruption(outcome.skipped)
    } else {
        report
    })
}
