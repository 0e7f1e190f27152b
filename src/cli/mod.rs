//! CLI command definitions and parsing
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::content::{Caller, ContentType, Flavor, OrderBy};
use crate::error::{KbSearchError, Result};
use crate::search::{Pagination, SearchParams};

#[derive(Parser, Debug)]
#[command(
    name = "kbsearch",
    version,
    author = "neur0map",
    about = "Permission-aware knowledge base search",
    long_about = "kbsearch searches knowledge base answers, categories and knowledge bases \
                  through a full-text index, falls back to a relational title search when the \
                  index is disabled, and only returns what the caller is allowed to see."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/kbsearch/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search knowledge base content
    Search(SearchArgs),

    /// Import a JSON content dump into the database
    Import {
        /// Path to the dump file
        file: PathBuf,

        /// Skip rebuilding the search index afterwards
        #[arg(long)]
        no_reindex: bool,
    },

    /// Rebuild the search index from the database
    Reindex,

    /// Show database and index statistics
    Stats {
        /// Show statistics in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query text
    pub query: String,

    /// Knowledge base id to search in (repeatable, defaults to all active)
    #[arg(long = "kb", value_name = "ID")]
    pub knowledge_bases: Vec<i64>,

    /// System locale code, e.g. en-us
    #[arg(short, long)]
    pub locale: Option<String>,

    /// Category id whose subtree the search is restricted to
    #[arg(short, long)]
    pub scope: Option<i64>,

    /// agent or public (defaults to search.default_flavor)
    #[arg(short, long)]
    pub flavor: Option<String>,

    /// Content type to search: answer, category, knowledge_base or a full type tag (repeatable)
    #[arg(short, long)]
    pub index: Vec<String>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Engine offset, used together with --limit
    #[arg(long)]
    pub from: Option<usize>,

    /// Page number (starting at 1)
    #[arg(long)]
    pub page: Option<usize>,

    /// Results per page
    #[arg(long, default_value = "10")]
    pub per_page: usize,

    /// Ordering as field[:asc|desc] (repeatable)
    #[arg(short, long)]
    pub order: Vec<String>,

    /// Disable highlighting
    #[arg(long)]
    pub no_highlight: bool,

    /// Id of the searching user; without it the search runs anonymously
    #[arg(long)]
    pub caller_id: Option<i64>,

    /// Permission held by the caller (repeatable)
    #[arg(long)]
    pub permission: Vec<String>,

    /// Role held by the caller (repeatable)
    #[arg(long)]
    pub role: Vec<String>,

    /// Show results in JSON format
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub fn to_params(&self, default_flavor: Flavor) -> Result<SearchParams> {
        let mut params = SearchParams::new()
            .flavor(match &self.flavor {
                Some(flavor) => flavor.parse()?,
                None => default_flavor,
            })
            .highlight(!self.no_highlight);

        if !self.knowledge_bases.is_empty() {
            params = params.knowledge_bases(self.knowledge_bases.iter().copied());
        }
        if let Some(locale) = &self.locale {
            params = params.locale_code(locale.clone());
        }
        if let Some(scope) = self.scope {
            params = params.scope(scope);
        }
        for index in &self.index {
            params = params.index(parse_index(index)?);
        }
        if let Some(limit) = self.limit {
            params = params.limit(limit);
        }
        if let Some(from) = self.from {
            params = params.offset(from);
        }
        for order in &self.order {
            params = params.order_by(order.parse::<OrderBy>()?);
        }

        params.validate()?;
        Ok(params)
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.page.map(|page| Pagination::page(page, self.per_page))
    }

    pub fn caller(&self) -> Option<Caller> {
        self.caller_id.map(|id| Caller {
            id,
            roles: self.role.clone(),
            permissions: self.permission.clone(),
        })
    }
}

/// Accepts short names as well as full type tags
pub fn parse_index(value: &str) -> Result<ContentType> {
    match value.trim().to_ascii_lowercase().as_str() {
        "answer" | "answers" => Ok(ContentType::AnswerTranslation),
        "category" | "categories" => Ok(ContentType::CategoryTranslation),
        "knowledge_base" | "kb" => Ok(ContentType::KnowledgeBaseTranslation),
        _ => value.trim().parse().map_err(|_| {
            KbSearchError::InvalidParams(format!(
                "Unknown index '{}', expected answer, category or knowledge_base",
                value
            ))
        }),
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file location
    Path,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
