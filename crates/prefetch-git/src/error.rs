#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("git {step} failed after {attempts} attempt(s): {output}")]
    StepFailed { step: &'static str, attempts: u32, output: String },

    #[error("failed to start git: {0}")]
    Spawn(#[from] std::io::Error),
}
