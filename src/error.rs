//! Structural errors. Any of these aborts the translation pass that raised it.
//!
//! Failures inside a single translator are not represented here: they are
//! plain `anyhow::Error` values that the driver turns into framework nodes.

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// A name was registered twice in the operation map.
    #[error("operation '{name}' has already been registered")]
    DuplicateOperation { name: String },

    #[error("no output port in group '{group}' with index {index}: {detail}")]
    PortResolution {
        group: String,
        index: usize,
        detail: String,
    },

    #[error(
        "cannot prepare input {input} of operation '{operation}', expected producer '{producer}' port {port}: {detail}"
    )]
    InputResolution {
        operation: String,
        input: usize,
        producer: String,
        port: usize,
        detail: String,
    },

    #[error("there is no operation with name '{name}'")]
    MissingOperation { name: String },

    #[error("output port {port} of operation '{operation}' does not exist")]
    OutputPort { operation: String, port: usize },

    #[error("number of inputs ({expected}) and arguments ({actual}) of body graph '{body}' do not match")]
    BodyArity {
        body: String,
        expected: usize,
        actual: usize,
    },

    #[error("body graph '{body}' contains a cycle")]
    BodyCycle { body: String },

    #[error("cannot reorder {kind}: {detail}")]
    Reorder { kind: &'static str, detail: String },

    #[error("invalid input edge '{0}'")]
    InvalidEdge(String),

    #[error("invalid output place '{0}'")]
    InvalidOutputPlace(String),

    #[error("failed to parse source graph: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read source graph: {0}")]
    Io(#[from] std::io::Error),
}

pub type TranslateResult<T> = Result<T, TranslateError>;
