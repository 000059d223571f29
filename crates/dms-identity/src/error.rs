#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("graph store error")]
    Graph(#[from] dms_graph::GraphError),

    #[error("directory request failed: {0}")]
    Directory(#[from] reqwest::Error),

    #[error("directory token acquisition failed: {0}")]
    Auth(String),
}
