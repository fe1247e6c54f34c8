#![forbid(unsafe_code)]

mod logging;
mod options;
mod verbose;

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use colored::Colorize;
use options::Command;
use std::path::{Path, PathBuf};
use versioner::{
    config::{self, Config},
    diagnostics::Printer,
    metadata::SitePackages,
    module::{self, SourceTree, DEFAULT_VERSION_MODULE},
    Pep440Formatter, RepositoryQuerier, Resolver, Vcs,
};

fn resolver(root: &Path, level: versioner::Level) -> Resolver<verbose::Logger> {
    Resolver {
        modules: Box::new(SourceTree::new(root)),
        registry: Box::new(SitePackages::from_env()),
        frozen: versioner::is_frozen(),
        logger: verbose::Logger::new(level),
    }
}

/// The raw version control state of the repository at `root`.
fn info(root: &Path) -> eyre::Result<String> {
    let repo = versioner::vcs::open(root);
    let describe = repo.describe()?;
    let branch = match repo.branch() {
        Ok(branch) => branch,
        Err(err) => {
            tracing::warn!("{err}");
            "-".to_string()
        }
    };
    let release_version = repo
        .release_version()?
        .unwrap_or_else(|| "-".to_string());
    let rows = [
        ("vcs", Vcs::detect(root).to_string()),
        ("branch", branch),
        ("tag distance", describe.tag_distance.to_string()),
        ("latest tag", describe.latest_tag.clone()),
        ("node", describe.node.clone()),
        ("build id", describe.build_id()),
        ("version", repo.version()?),
        ("release version", release_version),
        ("archive", repo.is_archive()?.to_string()),
        ("architecture", versioner::platform::architecture_string()),
    ];
    Ok(rows
        .iter()
        .map(|(key, value)| format!("{:>16}: {value}", key.bold()))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Where `stamp` writes the version module.
fn version_module_path(
    dir: &Path,
    root: &Path,
    write_to: Option<PathBuf>,
    config: &Config,
) -> eyre::Result<PathBuf> {
    if let Some(write_to) = write_to.or_else(|| config.write_to.clone()) {
        return Ok(dir.join(write_to));
    }
    let package = config
        .package
        .as_deref()
        .ok_or_else(|| eyre::eyre!("missing `write-to` or `package` to stamp the version into"))?;
    let version_module = config
        .version_module
        .as_deref()
        .unwrap_or(DEFAULT_VERSION_MODULE);
    Ok(SourceTree::new(root).module_path(package, version_module))
}

fn main() -> eyre::Result<()> {
    if std::env::var("RUST_SPANTRACE").is_err() {
        std::env::set_var("RUST_SPANTRACE", "0");
    }

    let start = std::time::Instant::now();
    color_eyre::install()?;

    let options = options::Options::parse();
    let color_choice = options.color_choice.unwrap_or(termcolor::ColorChoice::Auto);
    let use_color = logging::setup(options.log_level, options.log_format, color_choice)?;
    colored::control::set_override(use_color);

    let cwd = std::env::current_dir().wrap_err("could not determine current working dir")?;
    let dir = options.dir.as_deref().unwrap_or(&cwd);
    let dir = dir
        .canonicalize()
        .wrap_err_with(|| format!("directory {dir:?} does not exist"))?;

    let printer = Printer::stderr(Some(color_choice));
    let config = match config::find_config(&dir, &printer)? {
        Some((path, config)) => {
            tracing::debug!(?path, "using config");
            config
        }
        None => Config::default(),
    };
    let root = config
        .root
        .as_ref()
        .map_or_else(|| dir.clone(), |root| dir.join(root));

    let resolver = resolver(&root, options.verbosity.level());

    let output = match options.command {
        Command::Get(get) => {
            let package = get
                .package
                .or_else(|| config.package.clone())
                .ok_or_else(|| eyre::eyre!("missing package name"))?;
            let version_module = get.version_module.or_else(|| config.version_module.clone());
            let scm = get.scm.or(config.scm).unwrap_or_default();
            resolver.get_version(&package, &root, version_module.as_deref(), scm)?
        }
        Command::Parse => resolver.parse_version(&root)?,
        Command::Vcs(vcs) => {
            let on_error = vcs.on_error.or(config.on_error).unwrap_or_default();
            resolver.vcs_version(&root, on_error)?
        }
        Command::Pep440(pep440) => {
            let method = pep440.method.or(config.method).unwrap_or_default();
            let branch = pep440.branch == Some(true) || config.branch == Some(true);
            let repo = versioner::vcs::open(&root);
            Pep440Formatter::new(branch, method)
                .format(&repo)
                .wrap_err_with(|| format!("failed to format version of {root:?}"))?
        }
        Command::Info => info(&root)?,
        Command::Stamp(stamp) => {
            let version = resolver.parse_version(&root)?;
            let path = version_module_path(&dir, &root, stamp.write_to, &config)?;
            if stamp.dry_run == Some(true) {
                tracing::info!(?path, "would write version module");
                eprint!("{}", module::render_version_module(&version));
            } else {
                module::write_version_module(&path, &version)?;
            }
            version
        }
    };
    println!("{output}");

    tracing::info!(elapsed = ?start.elapsed(), "done");
    Ok(())
}
