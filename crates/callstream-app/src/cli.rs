use clap::Parser;

/// Callstream: chat with a streaming model that can call local tools.
#[derive(Parser, Debug)]
#[command(name = "callstream", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Model name override.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Prompt to send once. Starts an interactive session when omitted.
    pub prompt: Vec<String>,
}

impl Args {
    /// The one-shot prompt, if any words were given.
    pub fn one_shot(&self) -> Option<String> {
        (!self.prompt.is_empty()).then(|| self.prompt.join(" "))
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_words_are_joined() {
        let args = Args::parse_from(["callstream", "--model", "qwen-plus", "weather", "in", "Beijing?"]);
        assert_eq!(args.model.as_deref(), Some("qwen-plus"));
        assert_eq!(args.one_shot().as_deref(), Some("weather in Beijing?"));
    }

    #[test]
    fn no_prompt_means_interactive() {
        let args = Args::parse_from(["callstream", "--log-level", "debug"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.one_shot().is_none());
    }
}
