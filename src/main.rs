// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, error, info, warn};
use serde::Serialize;
use url::Url;

use mdtrans::backends::http::{HttpModelFactory, OpenAiChatClient};
use mdtrans::config::{BackendPolicy, ToneProfile, TranslationConfig, load_glossary};
use mdtrans::diagnostics::{CollectingSink, DiagnosticEvent};
use mdtrans::errors::PipelineError;
use mdtrans::language_utils::{language_name, normalize_lang_code};
use mdtrans::mt::MtTranslator;
use mdtrans::pipeline::TranslationPipeline;
use mdtrans::postedit::{LlmPostEditor, PostEditOptions};
use mdtrans::registry::ModelRegistry;
use mdtrans::segmenter::TextBlock;

/// Exit code when no MT backend could be made available
const EXIT_NO_BACKEND: i32 = 4;

/// CLI wrapper for BackendPolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliBackendPolicy {
    /// Prefer Marian models, fall back to NLLB
    Auto,
    /// Marian models only, fail when no route exists
    Marian,
    /// NLLB only, skip direct and pivot routes
    Nllb,
}

impl From<CliBackendPolicy> for BackendPolicy {
    fn from(cli_policy: CliBackendPolicy) -> Self {
        match cli_policy {
            CliBackendPolicy::Auto => BackendPolicy::MarianThenNllb,
            CliBackendPolicy::Marian => BackendPolicy::MarianOnly,
            CliBackendPolicy::Nllb => BackendPolicy::NllbOnly,
        }
    }
}

/// CLI wrapper for LevelFilter to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// mdtrans - Markdown-safe machine translation with LLM post-editing
#[derive(Parser, Debug)]
#[command(name = "mdtrans")]
#[command(version = "0.1.0")]
#[command(about = "Translate Markdown documents while preserving structure")]
#[command(long_about = "mdtrans translates Markdown documents block by block, protecting code,
URLs, links, and custom patterns behind placeholder tokens, and optionally
post-editing the MT draft with an OpenAI-compatible LLM.

EXAMPLES:
    mdtrans -s en -t de post.md -o post.de.md        # Translate a document
    mdtrans -s en -t de --no-postedit post.md        # MT only, no LLM pass
    mdtrans -s fr -t it --glossary terms.json post.md
    mdtrans -s en -t de --prefetch-only post.md      # Warm models and exit
    mdtrans -s en -t de --debug post.md -o out.md    # Write out.md.debug.json")]
struct CommandLineOptions {
    /// Input Markdown file to translate
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output file path; stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'fr', 'deu')
    #[arg(short, long)]
    source_language: String,

    /// Target language code (e.g., 'de', 'it', 'fra')
    #[arg(short, long)]
    target_language: String,

    /// Glossary JSON file mapping source terms to target terms
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// Formality register for the post-edit pass
    #[arg(long, default_value = "neutral")]
    register: String,

    /// Authorial voice for the post-edit pass
    #[arg(long, default_value = "thoughtful essay")]
    voice: String,

    /// Target audience for the post-edit pass
    #[arg(long, default_value = "general")]
    audience: String,

    /// Humor handling for the post-edit pass
    #[arg(long, default_value = "none")]
    humor: String,

    /// Additional regex patterns to protect from translation (repeatable)
    #[arg(long = "protect", value_name = "REGEX")]
    protected_patterns: Vec<String>,

    /// MT backend selection policy
    #[arg(short, long, value_enum, default_value = "auto")]
    backend: CliBackendPolicy,

    /// Disable pivot routing through English
    #[arg(long)]
    no_pivot: bool,

    /// Disable the LLM post-edit pass
    #[arg(long)]
    no_postedit: bool,

    /// MT inference server base URL
    #[arg(long, default_value = "http://localhost:8000/")]
    mt_endpoint: Url,

    /// OpenAI-compatible LLM server base URL
    #[arg(long, default_value = "http://localhost:11434/")]
    llm_endpoint: Url,

    /// Model name for the post-edit pass
    #[arg(long, default_value = "llama3.2:3b")]
    postedit_model: String,

    /// Maximum prompt size in characters for the post-edit pass; 0 disables
    #[arg(long, default_value_t = 4000)]
    postedit_max_chars: usize,

    /// Sampling temperature for the post-edit pass
    #[arg(long, default_value_t = 0.2)]
    postedit_temperature: f32,

    /// Warm up the MT models for the pair, then exit
    #[arg(long)]
    prefetch_only: bool,

    /// Write a <OUT>.debug.json artifact with blocks and stage records
    #[arg(long)]
    debug: bool,

    /// Set logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: CliLogLevel,
}

/// Debug artifact written next to the output file with --debug
#[derive(Serialize)]
struct DebugArtifact<'a> {
    source_lang: &'a str,
    target_lang: &'a str,
    blocks: &'a [TextBlock],
    events: &'a [DiagnosticEvent],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    run(cli).await
}

async fn run(cli: CommandLineOptions) -> Result<()> {
    let source_lang = normalize_lang_code(&cli.source_language)
        .with_context(|| format!("invalid source language '{}'", cli.source_language))?;
    let target_lang = normalize_lang_code(&cli.target_language)
        .with_context(|| format!("invalid target language '{}'", cli.target_language))?;
    if source_lang == target_lang {
        return Err(anyhow!("source and target language are the same"));
    }

    let glossary = match &cli.glossary {
        Some(path) => load_glossary(path)
            .with_context(|| format!("failed to load glossary {}", path.display()))?,
        None => Default::default(),
    };

    let tone = ToneProfile {
        register: cli.register.clone(),
        voice: cli.voice.clone(),
        audience: cli.audience.clone(),
        humor: cli.humor.clone(),
    };

    let mut cfg = TranslationConfig::new(&source_lang, &target_lang)
        .with_tone(tone)
        .with_glossary(glossary)
        .with_protected_patterns(cli.protected_patterns.clone())
        .with_pivot(!cli.no_pivot)
        .with_backend(cli.backend.clone().into())
        .with_postedit(!cli.no_postedit);
    cfg.validate().context("invalid configuration")?;

    let registry = Arc::new(ModelRegistry::default());
    let mt = MtTranslator::new(
        Arc::clone(&registry),
        Box::new(HttpModelFactory::new(cli.mt_endpoint.clone())),
    );

    // Warm the route up front; when the preferred models cannot be loaded
    // and the policy allows it, degrade to NLLB instead of failing later
    // mid-document.
    let effective_policy = match mt.prefetch_pair(&cfg).await {
        Ok(policy) => policy,
        Err(PipelineError::Backend(e)) => {
            error!("No MT backend available: {}", e);
            std::process::exit(EXIT_NO_BACKEND);
        }
        Err(e) => return Err(e.into()),
    };
    if effective_policy != cfg.mt_backend {
        warn!("Falling back to the multilingual model for this run");
        cfg = cfg.with_backend(effective_policy);
    }
    if cli.prefetch_only {
        info!("Models prefetched for {} -> {}", source_lang, target_lang);
        return Ok(());
    }

    let postedit = if cli.no_postedit {
        LlmPostEditor::offline()
    } else {
        let chat = OpenAiChatClient::new(
            cli.llm_endpoint.clone(),
            &cli.postedit_model,
            cli.postedit_temperature,
        );
        let options = PostEditOptions {
            max_prompt_chars: (cli.postedit_max_chars > 0).then_some(cli.postedit_max_chars),
            ..PostEditOptions::default()
        };
        LlmPostEditor::new(Arc::new(chat), options)
    };

    let sink = Arc::new(CollectingSink::new());
    let pipeline = TranslationPipeline::new(mt, postedit)
        .with_sink(Arc::clone(&sink) as Arc<dyn mdtrans::diagnostics::DiagnosticSink>);

    let text = std::fs::read_to_string(&cli.input_path)
        .with_context(|| format!("failed to read {}", cli.input_path.display()))?;

    info!(
        "Translating {} ({} -> {})",
        cli.input_path.display(),
        language_name(&source_lang).unwrap_or_else(|_| source_lang.clone()),
        language_name(&target_lang).unwrap_or_else(|_| target_lang.clone())
    );
    let translated = pipeline.translate(&text, &cfg).await?;

    match &cli.out {
        Some(path) => {
            std::fs::write(path, &translated)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", translated),
    }

    if cli.debug {
        write_debug_artifact(&cli, &cfg, pipeline.segmenter().segment(&text), &sink)?;
    }
    Ok(())
}

/// Write `<OUT>.debug.json` with the segmented blocks and stage records
fn write_debug_artifact(
    cli: &CommandLineOptions,
    cfg: &TranslationConfig,
    blocks: Vec<TextBlock>,
    sink: &CollectingSink,
) -> Result<()> {
    let base: &Path = cli.out.as_deref().unwrap_or(&cli.input_path);
    let mut debug_path = base.as_os_str().to_owned();
    debug_path.push(".debug.json");
    let debug_path = PathBuf::from(debug_path);

    let events = sink.events();
    let artifact = DebugArtifact {
        source_lang: &cfg.source_lang,
        target_lang: &cfg.target_lang,
        blocks: &blocks,
        events: &events,
    };
    let body = serde_json::to_string_pretty(&artifact)?;
    std::fs::write(&debug_path, body)
        .with_context(|| format!("failed to write {}", debug_path.display()))?;
    info!("Wrote debug artifact {}", debug_path.display());
    Ok(())
}
