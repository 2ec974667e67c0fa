use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("could not write example configuration to {}", _0.display())]
    Example(#[error(not(source))] PathBuf),
    #[display("storage backend could not be initialised")]
    Init,
    #[display("sync pass failed")]
    Sync,
    #[display("a sync pass is already running")]
    Busy,
}
