use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

mod catalog;
mod export;
mod models;
mod server;
mod session;
mod settings;
mod studio;
mod text;

use catalog::Catalog;
use models::{ChatCompletionClient, TextGenerator};
use settings::{SettingsOverrides, StudioConfig};
use studio::GenerationForm;

#[derive(Debug, Parser)]
#[command(name = "content_studio")]
#[command(about = "Generate written content variants with a hosted LLM", long_about = None)]
struct Cli {
    /// JSON config file with `client` overrides and/or a `catalog`
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(flatten)]
    client: ClientArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct ClientArgs {
    #[arg(long, global = true)]
    endpoint: Option<String>,
    #[arg(long, global = true)]
    model: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

impl From<ClientArgs> for SettingsOverrides {
    fn from(a: ClientArgs) -> Self {
        SettingsOverrides {
            endpoint: a.endpoint,
            model: a.model,
            timeout_secs: a.timeout_secs,
            ..Default::default()
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the HTTP studio with one history per session
    Serve {
        #[arg(long, default_value = "127.0.0.1:7171")]
        listen: String,
    },
    /// Run one generation action and print every variant
    Generate {
        prompt: String,
        #[arg(long, default_value = "Blog Post")]
        content_type: String,
        #[arg(long, default_value = "Professional")]
        tone: String,
        #[arg(long, default_value = "Medium")]
        length: String,
        #[arg(long, default_value_t = 1)]
        versions: u32,
        /// Also write each variant to a timestamped .txt file here
        #[arg(long)]
        save_dir: Option<PathBuf>,
        /// Cut printed text at the length's upper word bound
        #[arg(long)]
        clip: bool,
    },
    /// List content types, tones and lengths
    Catalog,
}

fn build_generator(config: &StudioConfig, cli: &SettingsOverrides) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let file = config.client.clone().unwrap_or_default();
    let client_settings = settings::resolve_client_settings(&file, cli)?;
    let client = ChatCompletionClient::new(client_settings, settings::api_key_from_env())?;
    Ok(Arc::new(client))
}

fn print_catalog(catalog: &Catalog) {
    println!("Content types:");
    for o in &catalog.content_types {
        println!("  {:<22} {}", o.label, o.description);
    }
    println!("Tones:");
    for o in &catalog.tones {
        println!("  {:<22} {}", o.label, o.description);
    }
    println!("Lengths:");
    for o in &catalog.lengths {
        println!("  {:<22} ~{} words", o.label, o.bounds);
    }
}

async fn generate_once(
    generator: Arc<dyn TextGenerator>,
    catalog: &Catalog,
    form: GenerationForm,
    save_dir: Option<PathBuf>,
    clip: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut ledger = session::SessionLedger::new();
    let entries = studio::run_generation(generator, catalog, &form).await?;
    studio::record(&mut ledger, &entries);

    let multi = form.versions > 1;
    let bounds = catalog.length(&form.length).map(|l| l.bounds);
    let target = bounds.map(|b| b.to_string()).unwrap_or_default();
    for e in ledger.list() {
        if multi {
            writeln!(out, "#### Version {}", e.version)?;
        }
        match bounds {
            Some(b) if clip => writeln!(out, "{}\n", text::truncate_words(&e.text, b.max_words() as usize))?,
            _ => writeln!(out, "{}\n", e.text)?,
        }
        writeln!(out, "Word count: {} words (target: {})", text::count_words(&e.text), target)?;
        if let Some(dir) = &save_dir {
            let version = multi.then_some(e.version);
            let path = export::save_as_txt(dir, &e.text, &e.content_type, version)?;
            writeln!(out, "Saved: {}", path.display())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => StudioConfig::load(path)?,
        None => StudioConfig::default(),
    };
    let catalog = config.catalog_or_default();
    let overrides: SettingsOverrides = cli.client.into();

    match cli.command {
        Commands::Serve { listen } => {
            let addr: SocketAddr = listen.parse()?;
            let generator = build_generator(&config, &overrides)?;
            let state = server::AppState::new(generator, catalog);
            server::serve(addr, state).await?;
        }
        Commands::Generate { prompt, content_type, tone, length, versions, save_dir, clip } => {
            let generator = build_generator(&config, &overrides)?;
            let form = GenerationForm { prompt, content_type, tone, length, versions };
            generate_once(generator, &catalog, form, save_dir, clip, &mut std::io::stdout()).await?;
        }
        Commands::Catalog => print_catalog(&catalog),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::tests::{FailingGenerator, ReverseOrderGenerator, form};
    use tempfile::tempdir;

    async fn run(generator: Arc<dyn TextGenerator>, form: GenerationForm, save_dir: Option<PathBuf>, clip: bool) -> String {
        let mut out = Vec::new();
        generate_once(generator, &Catalog::default(), form, save_dir, clip, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn save_dir_keeps_every_variant() {
        let dir = tempdir().unwrap();
        let out = run(Arc::new(ReverseOrderGenerator::new()), form(3), Some(dir.path().to_path_buf()), false).await;

        let mut saved: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| std::fs::read_to_string(e.unwrap().path()).unwrap())
            .collect();
        saved.sort();
        assert_eq!(saved, vec!["call 0", "call 1", "call 2"]);
        assert_eq!(out.matches("Saved: ").count(), 3);
        assert!(out.contains("#### Version 1"));
        assert!(out.contains("#### Version 3"));
    }

    #[tokio::test]
    async fn prints_word_count_against_target() {
        let out = run(Arc::new(FailingGenerator), form(1), None, false).await;
        assert!(out.contains("API Error: 500 - server exploded"));
        assert!(out.contains("Word count: 6 words (target: 100-200)"));
        assert!(!out.contains("#### Version"));
        assert!(!out.contains("Saved: "));
    }

    #[tokio::test]
    async fn clip_cuts_printed_text_at_upper_bound() {
        struct Wordy;
        #[async_trait::async_trait]
        impl TextGenerator for Wordy {
            async fn generate(&self, _req: &models::GenerationRequest) -> models::GenerationResult {
                models::GenerationResult::Success(vec!["word"; 250].join(" "))
            }
        }

        let clipped = run(Arc::new(Wordy), form(1), None, true).await;
        let body = clipped.lines().next().unwrap();
        assert!(body.ends_with(text::TRUNCATION_MARKER));
        assert_eq!(text::count_words(body), 200);
        // the metric still counts the stored text
        assert!(clipped.contains("Word count: 250 words (target: 100-200)"));

        let full = run(Arc::new(Wordy), form(1), None, false).await;
        assert_eq!(text::count_words(full.lines().next().unwrap()), 250);
    }
}
