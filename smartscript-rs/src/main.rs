use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use smartscript::cli::{self, CliArgs, ConfigFile};
use smartscript::config::{self, Config};
use smartscript::script::{self, Document};
use smartscript::{Error, Result};

#[tokio::main]
async fn main() {
    init_tracing();

    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("smartscript: {e}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(1);
        }
    };
    if args.help {
        println!("{}", cli::USAGE);
        return;
    }

    if let Err(e) = run(args).await {
        eprintln!("smartscript: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `SMARTSCRIPT_LOG` (default `warn`).
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("SMARTSCRIPT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

async fn run(args: CliArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    config.parameters.extend(args.parameters);
    config.persistent.extend(args.persistent);
    config.header |= args.header;

    // ── Read and parse every template concurrently ────────────────────────────
    let handles: Vec<_> = args
        .templates
        .into_iter()
        .map(|path| tokio::spawn(load_template(path)))
        .collect();
    let mut docs = Vec::with_capacity(handles.len());
    for handle in handles {
        docs.push(handle.await.map_err(|e| Error::Task(e.to_string()))??);
    }

    // ── Render in argument order ──────────────────────────────────────────────
    let config = Arc::new(config);
    let mut persistent = config.persistent.clone();
    let mut stdout = tokio::io::stdout();
    for (path, doc) in docs {
        if args.print_tree {
            stdout.write_all(script::write_tree(&doc).as_bytes()).await?;
            continue;
        }
        let cfg = Arc::clone(&config);
        let (output, result) =
            tokio::task::spawn_blocking(move || render_one(&cfg, persistent, &doc))
                .await
                .map_err(|e| Error::Task(e.to_string()))?;
        // Whatever rendered before a failure is still written out.
        stdout.write_all(&output).await?;
        match result {
            Ok(after) => persistent = after,
            Err(e) => {
                stdout.flush().await?;
                return Err(e.in_template(&path));
            }
        }
    }
    stdout.flush().await?;

    debug!(?persistent, "persistent parameters after run");
    Ok(())
}

fn load_config(choice: &ConfigFile) -> Result<Config> {
    let path = match choice {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(path) => Some(path.clone()),
        ConfigFile::Search => config::find_user_config(),
    };
    let Some(path) = path else {
        return Ok(Config::new());
    };
    // Bad lines are logged by the loader and otherwise skipped.
    let (config, _errors) =
        Config::load_file(&path).map_err(|source| Error::Config { path: path.clone(), source })?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

async fn load_template(path: PathBuf) -> Result<(PathBuf, Arc<Document>)> {
    let src = read_source(&path)
        .await
        .map_err(|e| Error::from(e).in_template(&path))?;
    let doc = script::parse(&src).map_err(|e| Error::from(e).in_template(&path))?;
    debug!(path = %path.display(), nodes = doc.len(), "template parsed");
    Ok((path, Arc::new(doc)))
}

/// Read a template; `-` is standard input.
async fn read_source(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut src = String::new();
        tokio::io::stdin().read_to_string(&mut src).await?;
        Ok(src)
    } else {
        tokio::fs::read_to_string(path).await
    }
}

/// Render one template into memory.
///
/// Returns the bytes produced so far alongside the outcome, so a failed
/// render still yields its partial output.
fn render_one(
    config: &Config,
    persistent: HashMap<String, String>,
    doc: &Document,
) -> (Vec<u8>, Result<HashMap<String, String>>) {
    let mut ctx = match config.response(Vec::new()) {
        Ok(ctx) => ctx.with_persistent_parameters(persistent),
        Err(e) => return (Vec::new(), Err(e.into())),
    };
    let result = script::render(doc, &mut ctx)
        .map_err(Error::from)
        // An empty body still gets its header.
        .and_then(|()| ctx.write_bytes(&[]).map_err(Error::from));
    let (output, persistent) = ctx.into_parts();
    (output, result.map(|()| persistent))
}
