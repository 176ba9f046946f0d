use snafu::Snafu;

use crate::connection::ConnectionError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("failed to read terminal input at {stage}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to write terminal output at {stage}"))]
    WriteOutput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("wallet session is unavailable at {stage}: {source}"))]
    Session {
        stage: &'static str,
        source: ConnectionError,
    },
}

pub type AppResult<T> = Result<T, AppError>;
