use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use api::oauth2::{self, RefreshCredentials};
use queue::{EngineConfig, QueueEngine, QueueStore, Scheduler};

use crate::command::Handlers;
use crate::config::Config;
use crate::irc;
use crate::module;

const CONFIG_DIR: &str = "SongBot";
const LOG: &str = "songbot.log";

argwerk::define! {
    /// SongBot
    ///
    /// Takes song requests from Twitch chat and queues them on Spotify.
    #[usage = "songbot"]
    struct Args {
        help: bool,
        trace: bool,
        root: Option<PathBuf>,
        config: Option<PathBuf>,
        log: Vec<String>,
    }
    /// Show this help.
    ["--help" | "-h"] => {
        println!("{}", HELP);
        help = true;
    }
    /// If we should enable tracing in all logs.
    ["--trace"] => {
        trace = true;
    }
    /// Directory to store logs and the queue in.
    ["--root", #[os] path] => {
        root = Some(PathBuf::from(path));
    }
    /// Configuration file to use. Defaults to config.yaml in the root.
    ["--config", #[os] path] => {
        config = Some(PathBuf::from(path));
    }
    /// Additionally enable logging for the specified modules. Example: --log irc=trace
    ["--log", spec] => {
        log.push(spec);
    }
}

/// Configure logging.
fn setup_logs(root: &Path, trace: bool, modules: &[String]) -> Result<impl Drop> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, Registry};

    // Crates to enable logging for, by default.
    const CRATES: [&str; 4] = ["songbot", "songbot_api", "songbot_common", "songbot_queue"];

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();

    let level = if trace { "trace" } else { "info" };

    for name in CRATES {
        env_filter = env_filter.add_directive(format!("{name}={level}").parse()?);
    }

    for module in modules {
        env_filter = env_filter.add_directive(module.parse()?);
    }

    let file_appender = tracing_appender::rolling::daily(root, LOG);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = Registry::default()
        .with(env_filter)
        .with(
            fmt::Layer::default()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(fmt::Layer::default().with_writer(std::io::stdout));

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}

/// Entrypoint.
pub fn main() -> Result<()> {
    let args = Args::args()?;

    if args.help {
        return Ok(());
    }

    let root = match args.root {
        Some(root) => root,
        None => dirs::config_dir()
            .ok_or_else(|| anyhow!("no standard configuration directory available"))?
            .join(CONFIG_DIR),
    };

    if !root.is_dir() {
        std::fs::create_dir_all(&root)
            .with_context(|| anyhow!("failed to create root: {}", root.display()))?;
    }

    let _guard = setup_logs(&root, args.trace, &args.log).context("failed to setup logs")?;

    let config_path = args.config.unwrap_or_else(|| root.join("config.yaml"));
    let config = Config::load(&config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    if let Err(e) = runtime.block_on(try_main(&root, config)) {
        common::log_error!(e, "Bot crashed");
        return Err(anyhow!("bot crashed, see the log for details"));
    }

    tracing::info!("Exiting...");
    Ok(())
}

/// Actual main function, running the application loop.
async fn try_main(root: &Path, config: Config) -> Result<()> {
    tracing::info!("Starting SongBot {}", crate::VERSION);

    let token = api::Token::new();

    let credentials = RefreshCredentials {
        token_url: str::parse(oauth2::SPOTIFY_TOKEN_URL)?,
        client_id: config.spotify.client_id.clone(),
        client_secret: config.spotify.client_secret.get()?,
        refresh_token: config.spotify.refresh_token.get()?,
    };

    let spotify = Arc::new(api::Spotify::new(crate::USER_AGENT, token.clone())?);

    let classifier = Arc::new(api::OpenAi::new(
        crate::USER_AGENT,
        config.classifier.api_url.as_deref(),
        &config.classifier.api_key.get()?,
        &config.classifier.model,
    )?);

    let channel = config.twitch.irc_channel();
    let sender = irc::Sender::new();
    let queue_path = config.queue.path(root);
    tracing::info!("Using queue: {}", queue_path.display());

    let engine = QueueEngine::new(
        QueueStore::new(queue_path),
        spotify,
        classifier,
        Arc::new(sender.clone()),
        EngineConfig {
            channel: channel.clone(),
            max_queue_length: config.queue.max_queue_length,
            max_requests_per_user: config.queue.max_requests_per_user,
            max_requeues: config.queue.max_requeues,
            device: config.spotify.device.clone(),
        },
    );

    let mut handlers = Handlers::default();
    module::hook(&mut handlers, &engine);

    let chat = irc::Chat::new(
        config.twitch.nickname.clone(),
        channel,
        config.twitch.token.get()?,
        handlers,
        sender,
    );

    let refresh = oauth2::refresh_loop(crate::USER_AGENT, credentials, token.clone());

    let scheduler = {
        let scheduler = Scheduler::new(engine.clone(), config.queue.interval());

        async move {
            token.wait_until_ready().await;
            scheduler.run().await
        }
    };

    let result = tokio::select! {
        result = chat.run() => result.context("chat"),
        result = refresh => result.context("token refresh"),
        result = scheduler => result.context("scheduler"),
        result = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            result.map_err(Into::into)
        }
    };

    engine.save().await;
    result
}
