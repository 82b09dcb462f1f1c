use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use rpy_po::config::{find_default_config, init_default_config, load_config, AppConfig, CONFIG_FILENAME};
use rpy_po::gettext::{self, po, CancelToken, UpdateResolver};
use rpy_po::progress::ConsoleProgress;
use rpy_po::rpy::scan::apply_exclusions;
use rpy_po::rpy::{
    scan_translation_files, CommentPolicy, FormatCheck, PoToRpyConverter, RpyToPoConverter,
    Statements,
};

#[derive(Parser, Debug)]
#[command(name = "rpy-po")]
#[command(about = "Ren'Py translation file <-> gettext PO converter with catalog updating", long_about = None)]
struct Args {
    /// Generate a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: search for rpy-po.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input .rpy translation files (default: scan <project-dir>/game/tl/<language>)
    #[arg(value_name = "RPY")]
    inputs: Vec<PathBuf>,

    /// Ren'Py project root holding game/ (used when no inputs are given)
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Target language, as named under game/tl/
    #[arg(short, long)]
    language: Option<String>,

    /// Also convert the engine-generated common.rpy when scanning
    #[arg(long)]
    include_common: bool,

    /// Export: write the converted PO catalog here
    #[arg(long, value_name = "PO")]
    export_po: Option<PathBuf>,

    /// Statement registry JSON (written on export, read on import/validate)
    #[arg(long, value_name = "JSON")]
    statements: Option<PathBuf>,

    /// Export: validate statements against --statements instead of learning
    #[arg(long)]
    validate_statements: bool,

    /// Export: add "<name> speaking" comments to dialogue messages
    #[arg(long)]
    speaker_comments: bool,

    /// Import: PO catalog to convert back into .rpy files
    #[arg(long, value_name = "PO")]
    import_po: Option<PathBuf>,

    /// Import: directory to write the rebuilt .rpy files under
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Update: freshly exported template catalog
    #[arg(long, value_name = "PO")]
    update_template: Option<PathBuf>,

    /// Update: previously translated catalog to merge from
    #[arg(long, value_name = "PO")]
    update_previous: Option<PathBuf>,

    /// Update: write the merged catalog here
    #[arg(long, value_name = "PO")]
    update_output: Option<PathBuf>,

    /// Update: resolutions JSON carried over from an earlier session
    #[arg(long, value_name = "JSON")]
    resolutions: Option<PathBuf>,

    /// Update: write this session's resolutions here
    #[arg(long, value_name = "JSON")]
    resolutions_out: Option<PathBuf>,

    /// Update: bulk-resolve remaining problems by orphan similarity
    #[arg(long)]
    auto_resolve: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(true);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let cfg = load_app_config(&args)?;

    if args.update_template.is_some() || args.update_previous.is_some() {
        return run_update(&args, &cfg, progress);
    }

    if args.import_po.is_some() {
        return run_import(&args, &cfg, progress);
    }

    if args.export_po.is_some() {
        return run_export(&args, &cfg, progress);
    }

    let mut cmd = Args::command();
    cmd.print_help().context("print help")?;
    eprintln!(
        "\n\nMODES:\n  export:  rpy-po --language french --export-po game.po [--statements statements.json] [RPY...]\n  import:  rpy-po --language french --import-po game.po --statements statements.json --out-dir game/tl/french\n  update:  rpy-po --update-template new.po --update-previous old.po --update-output merged.po\n\nDefault config search: {CONFIG_FILENAME} (upwards)."
    );
    Ok(())
}

fn load_app_config(args: &Args) -> anyhow::Result<AppConfig> {
    let workdir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let path = match &args.config {
        Some(p) => Some(p.clone()),
        None => find_default_config(&workdir, CONFIG_FILENAME),
    };
    match path {
        Some(p) => load_config(&p),
        None => Ok(AppConfig::default()),
    }
}

fn required_language(args: &Args, cfg: &AppConfig) -> anyhow::Result<String> {
    args.language
        .clone()
        .or_else(|| cfg.project.language.clone())
        .context("no language given (use --language or set [project].language in the config)")
}

fn resolve_inputs(args: &Args, cfg: &AppConfig, language: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !args.inputs.is_empty() {
        return Ok(args.inputs.clone());
    }
    let project_dir = args
        .project_dir
        .clone()
        .or_else(|| cfg.project.project_dir.clone())
        .context("no inputs given and no project dir configured")?;
    let include_common = args.include_common || cfg.project.include_common.unwrap_or(false);
    let files = scan_translation_files(&project_dir, language, include_common)?;
    Ok(apply_exclusions(files, &cfg.project.exclude))
}

fn run_export(args: &Args, cfg: &AppConfig, progress: ConsoleProgress) -> anyhow::Result<()> {
    let language = required_language(args, cfg)?;
    let inputs = resolve_inputs(args, cfg, &language)?;
    let export_path = args.export_po.as_ref().context("missing --export-po")?;
    let names = cfg.character_names();
    let policy = if args.speaker_comments {
        CommentPolicy::Speaking
    } else {
        CommentPolicy::None
    };
    let converter = RpyToPoConverter::new(&language, &names, policy, progress);

    let registry;
    let check = if args.validate_statements {
        let path = args
            .statements
            .as_ref()
            .context("--validate-statements requires --statements")?;
        registry = Statements::load(path)?;
        FormatCheck::Validate(&registry)
    } else {
        FormatCheck::Learn
    };

    let result = converter.convert(&inputs, check)?;
    for id in &result.mismatched_ids {
        progress.warn(format!("statement format changed: {id}"));
    }
    for who in &result.missing_names {
        progress.warn(format!("no display name for speaker: {who}"));
    }
    po::write_path(&result.catalog, export_path)?;
    progress.info(format!(
        "exported {} messages to {}",
        result.catalog.len(),
        export_path.display()
    ));
    if !args.validate_statements {
        if let Some(path) = &args.statements {
            result.statements.save(path)?;
            progress.info(format!(
                "saved {} statement templates to {}",
                result.statements.dialogue_len(),
                path.display()
            ));
        }
    }
    Ok(())
}

fn run_import(args: &Args, cfg: &AppConfig, progress: ConsoleProgress) -> anyhow::Result<()> {
    let language = required_language(args, cfg)?;
    let po_path = args.import_po.as_ref().context("missing --import-po")?;
    let statements_path = args.statements.as_ref().context("missing --statements")?;
    let out_dir = args.out_dir.as_ref().context("missing --out-dir")?;

    let statements = Statements::load(statements_path)?;
    let catalog = po::read_path(po_path)?;
    let converter = PoToRpyConverter::new(&language, &statements, progress);
    let (files, failures) = converter.convert(&catalog);
    for (key, err) in &failures {
        progress.warn(format!("skipped {key}: {err:#}"));
    }
    let errors = converter.write(&files, out_dir);
    if !errors.is_empty() {
        let mut names: Vec<&String> = errors.keys().collect();
        names.sort();
        for name in names {
            progress.warn(format!("failed to write {name}: {:#}", errors[name]));
        }
        anyhow::bail!("{} translation files failed to write", errors.len());
    }
    Ok(())
}

fn run_update(args: &Args, cfg: &AppConfig, progress: ConsoleProgress) -> anyhow::Result<()> {
    let template_path = args.update_template.as_ref().context("missing --update-template")?;
    let previous_path = args.update_previous.as_ref().context("missing --update-previous")?;
    let output_path = args.update_output.as_ref().context("missing --update-output")?;

    let template = po::read_path(template_path)?;
    let previous = po::read_path(previous_path)?;
    let carried = match &args.resolutions {
        Some(path) => gettext::load_resolutions(path)?,
        None => Vec::new(),
    };

    let mut resolver =
        UpdateResolver::with_config(&template, &previous, carried, cfg.resolver_config(), progress);
    let cancel = CancelToken::new();
    resolver.update(&cancel)?;
    if args.auto_resolve {
        let resolved = resolver.auto_resolve(&cancel);
        progress.info(format!("auto-resolved {resolved} problems"));
    }
    resolver.solve_problems();

    for problem in resolver.problems() {
        progress.warn(format!("unresolved {:?}: {}", problem.kind, problem.key));
        for (candidate, similarity) in &problem.candidates {
            progress.warn(format!("  candidate ({similarity:.2}): {candidate}"));
        }
    }
    po::write_path(resolver.result(), output_path)?;
    progress.info(format!(
        "wrote merged catalog ({} messages, {} unresolved problems) to {}",
        resolver.result().len(),
        resolver.problems().len(),
        output_path.display()
    ));
    if let Some(path) = &args.resolutions_out {
        let resolutions = resolver.resolutions();
        gettext::save_resolutions(&resolutions, path)?;
        progress.info(format!(
            "saved {} resolutions to {}",
            resolutions.len(),
            path.display()
        ));
    }
    Ok(())
}
