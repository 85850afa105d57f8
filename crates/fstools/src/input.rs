use schemars::JsonSchema;
use serde::Deserialize;

/// One path or a list of paths.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub(crate) fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(path) => vec![path],
            Self::Many(paths) => paths,
        }
    }
}

/// Input shared by the path-based tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct PathsInput {
    /// One path or a list of paths, relative to the repository root.
    pub(crate) path: OneOrMany,
}
