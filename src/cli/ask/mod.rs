//! Ask command - answers one query from the terminal

use clap::Args;

use crate::config::AppConfig;
use crate::domain::query::QueryRequest;
use crate::domain::search::SourceType;
use crate::infrastructure::logging::{self, LogTarget};

/// Arguments for the ask command
#[derive(Args, Clone, Debug)]
pub struct AskArgs {
    /// Natural-language question
    pub query: String,

    /// Restrict to a source type (repeatable)
    #[arg(long = "source", value_parser = parse_source_type)]
    pub sources: Vec<SourceType>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<i64>,

    /// Minimum similarity between 0 and 1
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Return results only, without an LLM answer
    #[arg(long)]
    pub no_synthesis: bool,
}

impl AskArgs {
    pub fn to_request(&self) -> QueryRequest {
        QueryRequest {
            query: self.query.clone(),
            sources: (!self.sources.is_empty()).then(|| self.sources.clone()),
            limit: self.limit,
            threshold: self.threshold,
            synthesize: Some(!self.no_synthesis),
        }
    }
}

fn parse_source_type(value: &str) -> Result<SourceType, String> {
    value.parse().map_err(|e: crate::domain::DomainError| e.to_string())
}

/// Run a single query and print the JSON response to stdout
pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging, LogTarget::Stderr);

    let state = crate::create_app_state(&config).await?;

    match state.query_service.query(args.to_request()).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            anyhow::bail!("query failed: {}", failure.error)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn parse(args: &[&str]) -> AskArgs {
        match Cli::parse_from(args).command {
            Command::Ask(args) => args,
            Command::Serve => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_full_arguments() {
        let args = parse(&[
            "knowledge-query",
            "ask",
            "why do uploads fail",
            "--source",
            "jira",
            "--source",
            "wiki",
            "--limit",
            "5",
            "--threshold",
            "0.3",
            "--no-synthesis",
        ]);

        let request = args.to_request();
        assert_eq!(request.query, "why do uploads fail");
        assert_eq!(request.sources, Some(vec![SourceType::Jira, SourceType::Wiki]));
        assert_eq!(request.limit, Some(5));
        assert_eq!(request.threshold, Some(0.3));
        assert_eq!(request.synthesize, Some(false));
    }

    #[test]
    fn test_defaults_query_all_sources() {
        let request = parse(&["knowledge-query", "ask", "what is aoma"]).to_request();

        assert!(request.sources.is_none());
        assert_eq!(request.synthesize, Some(true));
    }

    #[test]
    fn test_unknown_source_rejected() {
        let result = Cli::try_parse_from(["knowledge-query", "ask", "q", "--source", "slack"]);

        assert!(result.is_err());
    }
}
