use clap::{Parser, ValueEnum};
use lineserve::config::{self, ServerConfig};
use lineserve::dispatch::{Algorithm, AlgorithmRegistry, SearchDispatcher, SearchMode, WorkerPool};
use lineserve::error::{ServerError, EXIT_CONFIG, EXIT_OK};
use lineserve::index::{HashIndex, MembershipIndex, NativeSetIndex, TrieIndex};
use lineserve::logging::QueryLog;
use lineserve::server::{daemon, tls, Server};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const QUERY_LOG_PATH: &str = "logs/queries.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunMode {
    /// Run in the foreground.
    Normal,
    /// Detach from the terminal; PID file and logs land under /tmp.
    Daemon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BindScope {
    /// Bind 0.0.0.0 and accept remote clients.
    Public,
    /// Bind 127.0.0.1 only.
    Local,
}

/// TCP service answering exact line-membership queries against a text corpus.
#[derive(Parser, Debug)]
#[command(name = "lineserve", version)]
struct Args {
    /// Foreground or detached run.
    #[arg(long, value_enum, default_value = "normal")]
    mode: RunMode,

    /// Preloaded index variant: 0=native-set, 1=hash, 2=trie, 3=none
    /// (the chosen algorithm decides). Ignored when REREAD_ON_QUERY=true.
    #[arg(long, default_value_t = 1)]
    buffer: u8,

    /// Bind scope for the listening socket.
    #[arg(long, value_enum, default_value = "public")]
    ip: BindScope,

    /// Path to the key=value configuration file.
    #[arg(long = "config_path", default_value = "config.txt")]
    config_path: PathBuf,

    /// Search algorithm display name; see the registry for valid names.
    #[arg(long, default_value = "Shell Grep")]
    algorithm: String,
}

fn main() {
    let args = Args::parse();
    let daemonized = args.mode == RunMode::Daemon;

    if daemonized {
        // Fork before the runtime exists; only the grandchild continues.
        if let Err(e) = daemon::daemonize() {
            eprintln!("daemonisation failed: {e:#}");
            std::process::exit(EXIT_CONFIG);
        }
    }

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // `run` joins every connection handler before returning, so exiting the
    // process here cannot cut a response short.
    let result = runtime.block_on(run(&args));

    if daemonized {
        daemon::remove_artifacts();
    }

    match result {
        Ok(()) => std::process::exit(EXIT_OK),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(args: &Args) -> Result<(), ServerError> {
    let config = config::load_config_file(&args.config_path)?;
    tracing::info!(
        "Loaded configuration: corpus={}, reread_on_query={}, use_ssl={}, port={}",
        config.linux_path.display(),
        config.reread_on_query,
        config.use_ssl,
        config.port,
    );

    let registry = AlgorithmRegistry::with_builtin();
    let Some(algorithm) = registry.resolve(&args.algorithm) else {
        return Err(ServerError::Config(format!(
            "unknown algorithm '{}' (available: {})",
            args.algorithm,
            registry.list_algorithms().join(", ")
        )));
    };

    let mode = build_search_mode(&config, args, &algorithm)?;

    let pool = Arc::new(
        WorkerPool::new(num_cpus::get())
            .map_err(|e| ServerError::Config(format!("worker pool startup failed: {e:#}")))?,
    );
    let dispatcher = SearchDispatcher::new(pool.clone(), mode, args.algorithm.clone());

    let tls_acceptor = if config.use_ssl {
        let material_dir = args
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Some(tls::load_or_generate(material_dir)?)
    } else {
        None
    };

    let (log, log_writer) = QueryLog::open(Path::new(QUERY_LOG_PATH))
        .await
        .map_err(|e| ServerError::Config(format!("cannot open query log: {e:#}")))?;

    let bind_ip = match args.ip {
        BindScope::Public => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        BindScope::Local => IpAddr::V4(Ipv4Addr::LOCALHOST),
    };

    let server = Server::new(config, dispatcher, tls_acceptor, log, log_writer);
    let result = server.run(bind_ip).await;

    pool.join();
    result
}

fn build_search_mode(
    config: &ServerConfig,
    args: &Args,
    algorithm: &Algorithm,
) -> Result<SearchMode, ServerError> {
    if config.reread_on_query {
        return Ok(SearchMode::Reread {
            path: config.linux_path.clone(),
            search: algorithm.reread,
        });
    }

    let path = config.linux_path.as_path();
    let corpus_err = |cause: anyhow::Error| ServerError::Corpus {
        path: path.to_path_buf(),
        cause,
    };

    let index: Arc<dyn MembershipIndex> = match args.buffer {
        0 => Arc::new(NativeSetIndex::build(path).map_err(corpus_err)?),
        1 => Arc::new(HashIndex::build(path).map_err(corpus_err)?),
        2 => Arc::new(TrieIndex::build(path).map_err(corpus_err)?),
        3 => (algorithm.build)(path).map_err(corpus_err)?,
        other => {
            return Err(ServerError::Config(format!(
                "invalid --buffer value {} (expected 0..=3)",
                other
            )))
        }
    };

    tracing::info!("Preloaded index '{}' with {} entries", index.name(), index.len());
    Ok(SearchMode::Preloaded { index })
}
