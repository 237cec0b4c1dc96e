use std::path::PathBuf;

use burp_core::config::AppConfig;
use clap::Parser;

/// Chat with the assistant on a long-poll chat server.
#[derive(Debug, Default, Parser)]
#[command(name = "burp", version, about)]
pub struct Cli {
    /// Read settings from this TOML file instead of the default locations.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Server base URL used for reading the channel.
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Separate base URL for sending messages.
    #[arg(long, value_name = "URL")]
    pub publish_url: Option<String>,

    #[arg(long, value_name = "NAME")]
    pub channel: Option<String>,

    #[arg(long, value_name = "NAME")]
    pub nick: Option<String>,

    #[arg(long, value_name = "ID")]
    pub model: Option<String>,

    /// Sampling temperature.
    #[arg(long = "temp", value_name = "T")]
    pub temperature: Option<f64>,

    #[arg(long, value_name = "N")]
    pub max_tokens: Option<u64>,

    #[arg(long, value_name = "P")]
    pub top_p: Option<f64>,

    #[arg(long, value_name = "K")]
    pub top_k: Option<u64>,

    /// Do not replay recent messages on startup.
    #[arg(long)]
    pub no_history: bool,

    /// Delay before retrying a failed poll.
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Flags win over file and environment values.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.server.url = server.clone();
        }
        if let Some(publish) = &self.publish_url {
            config.server.publish_url = Some(publish.clone());
        }
        if let Some(channel) = &self.channel {
            config.session.channel = channel.clone();
        }
        if let Some(nick) = &self.nick {
            config.session.nickname = nick.clone();
        }
        if let Some(model) = &self.model {
            config.session.model = model.clone();
        }
        if self.no_history {
            config.session.load_history = false;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.poll.retry_delay_ms = ms;
        }

        let generation = &mut config.generation;
        generation.temperature = self.temperature.or(generation.temperature);
        generation.max_tokens = self.max_tokens.or(generation.max_tokens);
        generation.top_p = self.top_p.or(generation.top_p);
        generation.top_k = self.top_k.or(generation.top_k);
    }
}
