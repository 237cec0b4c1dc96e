use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Context;
use burp_backend_client::HttpChatClient;
use burp_cli::Cli;
use burp_cli::Command;
use burp_cli::Renderer;
use burp_cli::TerminalTranscript;
use burp_cli::input::HELP_TEXT;
use burp_core::ChatSession;
use burp_core::DisplayLine;
use burp_core::OrCancelExt;
use burp_core::TranscriptSink;
use burp_core::config::AppConfig;
use burp_core::config::ConfigLoader;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr at `warn` unless RUST_LOG says otherwise, so they
    // stay out of the transcript on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let backend = Arc::new(
        HttpChatClient::new(&config.server.url, config.server.publish_url.as_deref())
            .context("failed to build http client")?,
    );
    let color = !cli.no_color && std::io::stdout().is_terminal();
    let sink = Arc::new(TerminalTranscript::new(Renderer::new(color)));
    let mut session =
        ChatSession::new(&config, backend, sink.clone()).context("failed to start session")?;

    info!(
        channel = %session.channel(),
        nickname = %session.nickname(),
        model = %session.model(),
        "session started"
    );
    sink.append(DisplayLine::help(format!(
        "joined {} as {}; /help for commands",
        session.channel_label(),
        session.nickname()
    )));

    let mut cancel = CancellationToken::new();
    let mut poller = session.spawn_poller(cancel.clone());

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Ok(line) = lines.next_line().or_cancel(&shutdown).await else {
            break;
        };
        let Some(line) = line.context("failed to read stdin")? else {
            break;
        };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => {
                for text in HELP_TEXT {
                    sink.append(DisplayLine::help(*text));
                }
            }
            Command::Nick(name) => {
                if session.set_nickname(&name) {
                    sink.append(DisplayLine::help(format!("you are now {}", session.nickname())));
                } else {
                    sink.append(DisplayLine::help("nickname must contain a letter or digit"));
                }
            }
            Command::Join(name) => {
                // Returns promptly: the poller checks its token before every await.
                cancel.cancel();
                match poller.await {
                    Ok(state) => session.restore(state),
                    Err(e) => warn!("poller task failed: {e}"),
                }
                if session.set_channel(&name) {
                    sink.append(DisplayLine::help(format!("joined {}", session.channel_label())));
                } else {
                    sink.append(DisplayLine::help("channel must contain a letter or digit"));
                }
                cancel = CancellationToken::new();
                poller = session.spawn_poller(cancel.clone());
            }
            Command::Unknown(name) => {
                sink.append(DisplayLine::help(format!("unknown command /{name}; try /help")));
            }
            Command::Say(text) => match session.submit(&text).or_cancel(&shutdown).await {
                Err(_) => break,
                // Failures are already in the transcript.
                Ok(Err(e)) => debug!("submit failed: {e}"),
                Ok(Ok(_)) => {}
            },
        }
    }

    cancel.cancel();
    if let Err(e) = poller.await {
        warn!("poller task failed: {e}");
    }
    info!("session ended");
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::new().with_file(path).load(),
        None => ConfigLoader::load_default(),
    }
    .context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}
