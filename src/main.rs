use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use ipaflow::cli::{Cli, Commands, ConfigAction};
use ipaflow::config::Config;
use ipaflow::output::{format_lookup, format_rules, format_transcript};
use ipaflow::pipeline::{Engine, Input};
use ipaflow::registry::{Notation, SymbolRegistry};
use ipaflow::rules::RuleEngine;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Transcribe {
            input,
            language,
            output,
            segments,
            no_color,
            collapse_repeats,
            workers,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if collapse_repeats {
                config.assembly.collapse_repeats = true;
            }
            let options = TranscribeOptions {
                language,
                output,
                segments,
                color: !no_color && std::io::stdout().is_terminal(),
                workers,
                quiet: cli.quiet,
                verbose: cli.verbose,
            };
            run_transcribe(config, &input, &options)?;
        }
        Commands::Lookup { symbol, notation } => {
            let config = load_config(cli.config.as_deref())?;
            run_lookup(&config, &symbol, notation)?;
        }
        Commands::Relabel {
            cluster,
            symbol,
            language,
            notation,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_relabel(config, &cluster, &symbol, &language, notation, cli.quiet)?;
        }
        Commands::Rules { language } => {
            let config = load_config(cli.config.as_deref())?;
            run_rules(&config, language.as_deref())?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "ipaflow", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Log level from -q / -v; `RUST_LOG` takes precedence when set.
fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("ipaflow={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        let default_path = Config::default_path();
        Config::load_or_default(&default_path)
            .with_context(|| format!("loading {}", default_path.display()))?
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

struct TranscribeOptions {
    language: Option<String>,
    output: Option<PathBuf>,
    segments: bool,
    color: bool,
    workers: usize,
    quiet: bool,
    verbose: u8,
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))
    }
}

fn run_transcribe(config: Config, input: &Path, options: &TranscribeOptions) -> Result<()> {
    let json = read_input(input)?;
    let mut utterances = Input::from_json(&json)
        .context("input is not an utterance, {\"utterances\": [...]} or {\"segments\": [...]}")?
        .into_utterances();
    if let Some(language) = &options.language {
        for utterance in utterances.iter_mut().filter(|u| u.language.is_none()) {
            utterance.language = Some(language.clone());
        }
    }

    let engine = Engine::from_config(config)?;
    let transcripts = engine.process_batch(utterances, options.workers)?;

    if let Some(path) = &options.output {
        let json = serde_json::to_string_pretty(&transcripts)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        if !options.quiet {
            eprintln!("Wrote {} transcript(s) to {}", transcripts.len(), path.display());
        }
    }

    if !options.quiet {
        for transcript in &transcripts {
            print!(
                "{}",
                format_transcript(transcript, options.segments, options.verbose, options.color)
            );
        }
    }
    Ok(())
}

fn registry_from(config: &Config) -> Result<SymbolRegistry> {
    Ok(match &config.registry.inventory {
        Some(path) => SymbolRegistry::load(path)?,
        None => SymbolRegistry::builtin()?,
    })
}

fn run_lookup(config: &Config, symbol: &str, notation: Option<Notation>) -> Result<()> {
    let registry = registry_from(config)?;
    let resolved = registry.resolve(symbol, notation)?;
    let Some(entry) = registry.entry(&resolved.glyph) else {
        bail!("'{}' resolved but has no registry entry", resolved.glyph);
    };
    let features = registry.features_of(&resolved.glyph, &resolved.diacritics);
    print!("{}", format_lookup(symbol, &resolved, entry, &features));
    Ok(())
}

fn run_relabel(
    config: Config,
    cluster: &str,
    symbol: &str,
    language: &str,
    notation: Option<Notation>,
    quiet: bool,
) -> Result<()> {
    if config.mapping.store_dir.is_none() {
        bail!("mapping.store_dir is not configured; relabels would not persist");
    }
    let engine = Engine::from_config(config)?;
    let resolved = engine.relabel(cluster, language, symbol, notation)?;
    if !quiet {
        println!("{cluster} -> {} ({language})", resolved.text());
    }
    Ok(())
}

fn run_rules(config: &Config, language: Option<&str>) -> Result<()> {
    let registry = Arc::new(registry_from(config)?);
    let rules = RuleEngine::from_config(registry, &config.rules)?;
    for error in rules.load_errors() {
        eprintln!("warning: rule set '{}' rejected: {}", error.rule_set, error.message);
    }

    let code = ipaflow::language::normalize(Some(language.unwrap_or(&config.default_language)));
    let profile = config.profile(&code)?;
    let (name, selected) = rules.select(&code, profile.rule_set.as_deref());
    print!("{}", format_rules(name, selected));
    Ok(())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
        ConfigAction::Show { language } => {
            let config = load_config(custom_path)?;
            match language {
                Some(code) => print!("{}", toml::to_string_pretty(&config.profile(&code)?)?),
                None => print!("{}", config.to_toml_string()?),
            }
        }
    }
    Ok(())
}
