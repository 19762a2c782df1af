use crate::Result;
use std::path::Path;

pub mod ssh;

/// Remote capability consumed by the sync engine.
pub trait Transport {
    /// Run a shell command on the remote host and return its stdout.
    fn exec(&self, command: &str) -> Result<String>;
    fn upload_file(&self, local: &Path, remote: &str) -> Result<()>;
    fn download_file(&self, remote: &str, local: &Path) -> Result<()>;

    /// Release the underlying channel.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn exec(&self, command: &str) -> Result<String> {
        (**self).exec(command)
    }

    fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        (**self).upload_file(local, remote)
    }

    fn download_file(&self, remote: &str, local: &Path) -> Result<()> {
        (**self).download_file(remote, local)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

/// Quote `value` as a single POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
