use thiserror::Error;

/// コミット履歴の取り込みに関するエラー
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Git error: {0}")]
    GitError(#[from] git2::Error),

    #[error("Invalid repository path: {0}")]
    InvalidRepository(String),

    #[error("Invalid author pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Unknown branch or revision: {0}")]
    UnknownRevision(String),
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
