use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrazierError {
    #[error("unresolved jump label '{0}': no instruction was marked with it")]
    UnresolvedLabel(String),

    #[error("label '{0}' is marked more than once")]
    DuplicateLabel(String),

    #[error("no sites configured: at least one site is required")]
    NoSites,

    #[error("site not found: {0}")]
    SiteNotFound(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("program for phase '{phase}' at site '{site}' failed to build: {source}")]
    Program {
        phase: String,
        site: String,
        #[source]
        source: Box<BrazierError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, BrazierError>;
