use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, duplicate override, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// IO error (file read, directory listing, etc.).
    #[error("IO error: {0}")]
    Io(String),
    /// The sentinel first-column value of the header row was never found.
    #[error("file '{file}': no header row starting with '{sentinel}'")]
    MissingHeader { file: String, sentinel: String },
    /// Missing required column in a located header row.
    #[error("file '{file}': missing column '{column}'")]
    MissingColumn { file: String, column: String },
    /// A response file whose name does not follow `<class>_<subject>.<ext>`.
    #[error("file '{file}': name does not follow <class>_<subject>")]
    BadFileName { file: String },
    /// A `Q<n>` header numbers a question past the sane test length.
    #[error("file '{file}': question column Q{question} exceeds the limit of {limit}")]
    QuestionOutOfRange {
        file: String,
        question: u32,
        limit: u32,
    },
    /// A source directory contained no files of the expected extension.
    #[error("{source_kind} source: no '.{extension}' files found in {dir}")]
    EmptySourceDir {
        source_kind: String,
        dir: String,
        extension: String,
    },
    /// Every file in a source directory failed to parse.
    #[error("{source_kind} source: none of {attempted} file(s) in {dir} could be parsed")]
    NoParsedFiles {
        source_kind: String,
        dir: String,
        attempted: usize,
    },
    /// Two skills claim the same question and the overlap policy is `reject`.
    #[error(
        "{class_section} {subject}: question {question} claimed by both '{first}' and '{second}'"
    )]
    SkillOverlap {
        class_section: String,
        subject: String,
        question: u32,
        first: String,
        second: String,
    },
    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(String),
}
