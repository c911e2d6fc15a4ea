use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Interface the HTTP relay binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP relay listens on.
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Comma separated list of origins allowed to call the relay from a browser.
    /// When unset any origin is accepted.
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Global quota of chat requests per second forwarded upstream. 0 disables the quota.
    #[arg(long, env = "REQUESTS_PER_SECOND", default_value = "0")]
    pub requests_per_second: u32,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (gemini, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "gemini")]
    pub chat_llm_type: String,

    /// API Key for the Chat LLM provider.
    #[arg(long, env = "API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gemini-1.5-flash, llama3)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    /// Upper bound on generated tokens per reply.
    #[arg(long, env = "MAX_OUTPUT_TOKENS", default_value = "1000")]
    pub max_output_tokens: u32,

    /// Sampling temperature sent with every completion.
    #[arg(long, env = "TEMPERATURE", default_value = "1.0")]
    pub temperature: f32,

    /// Seconds to wait for the model before answering with an upstream error.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "30")]
    pub upstream_timeout_secs: u64,

    // --- Prompt Args ---
    /// Optional JSON file replacing the built-in system preamble.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- TLS Args ---
    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

/// Options for the terminal chat front end.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Chat with the insurance relay from a terminal", long_about = None)]
pub struct ClientArgs {
    /// Base URL of a running relay.
    #[arg(long, env = "RELAY_URL", default_value = "http://localhost:5000")]
    pub relay_url: String,

    /// Seconds before an unanswered turn is given up on.
    #[arg(long, env = "RELAY_TIMEOUT_SECS", default_value = "60")]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_defaults() {
        let args = Args::try_parse_from(["policy-chat-relay"]).unwrap();
        assert_eq!(args.max_output_tokens, 1000);
        assert_eq!(args.temperature, 1.0);
        assert!(args.allowed_origins.is_empty());
        assert!(!args.enable_tls);
    }

    #[test]
    fn origins_split_on_commas() {
        let args = Args::try_parse_from([
            "policy-chat-relay",
            "--allowed-origins",
            "http://localhost:3000,http://localhost:5173",
        ]).unwrap();
        assert_eq!(args.allowed_origins, vec!["http://localhost:3000", "http://localhost:5173"]);
    }
}
