use crate::transport::Transport;
use crate::{ArtsyncError, Result};
use ssh2::Session;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_PORT: u16 = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key_path: Option<PathBuf>,
}

impl SshConfig {
    /// Build a config from a manifest `server` value (`host` or `host:port`).
    ///
    /// Without a user, the local login name is used.
    pub fn from_server(server: &str, user: Option<String>, key_path: Option<PathBuf>) -> Result<Self> {
        let (host, port) = match server.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                let port = port
                    .parse()
                    .map_err(|_| ArtsyncError::Config(format!("Invalid port in server '{}'", server)))?;
                (host, port)
            }
            _ => (server, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(ArtsyncError::Config("Empty server address".into()));
        }

        let user = match user {
            Some(user) => user,
            None => std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .map_err(|_| ArtsyncError::Connection(format!("No user to connect to {} as", host)))?,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            user,
            key_path,
        })
    }
}

pub struct SshConnection {
    session: Session,
    _tcp: TcpStream,
}

impl Transport for SshConnection {
    fn exec(&self, command: &str) -> Result<String> {
        let mut channel = self.session.channel_session()
            .map_err(|e| ArtsyncError::Connection(format!("Channel open failed: {}", e)))?;
        channel.exec(command)
            .map_err(|e| ArtsyncError::RemoteCommand(format!("Exec failed: {}", e)))?;

        let mut s = String::new();
        channel.read_to_string(&mut s)?;

        channel.wait_close().ok();
        let exit_status = channel.exit_status().unwrap_or(0);

        if exit_status != 0 {
            return Err(ArtsyncError::RemoteCommand(format!(
                "Command '{}' exited with code {}. Output: {}",
                command, exit_status, s
            )));
        }

        Ok(s)
    }

    fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        let mut local_file = std::fs::File::open(local).map_err(|e| ArtsyncError::file(local, e))?;
        let size = local_file.metadata().map_err(|e| ArtsyncError::file(local, e))?.len();

        let mut channel = self.session
            .scp_send(Path::new(remote), 0o644, size, None)
            .map_err(|e| ArtsyncError::Connection(format!("Remote file create failed {}: {}", remote, e)))?;

        pump(
            &mut local_file,
            &mut channel,
            |e| ArtsyncError::file(local, e),
            |e| ArtsyncError::Connection(format!("Write to {} failed: {}", remote, e)),
        )?;

        finish_send(&mut channel)
            .map_err(|e| ArtsyncError::Connection(format!("Upload to {} did not complete: {}", remote, e)))?;

        debug!("Uploaded {} bytes to {}", size, remote);
        Ok(())
    }

    fn download_file(&self, remote: &str, local: &Path) -> Result<()> {
        let (mut channel, stat) = self.session
            .scp_recv(Path::new(remote))
            .map_err(|e| ArtsyncError::RemoteCommand(format!("Remote file open failed {}: {}", remote, e)))?;

        let mut local_file = std::fs::File::create(local).map_err(|e| ArtsyncError::file(local, e))?;
        // scp may append a trailing status byte, only take the announced size
        let copied = pump(
            &mut (&mut channel).take(stat.size()),
            &mut local_file,
            |e| ArtsyncError::Connection(format!("Read from {} failed: {}", remote, e)),
            |e| ArtsyncError::file(local, e),
        )?;
        if copied != stat.size() {
            return Err(ArtsyncError::Connection(format!(
                "Short read from {}: got {} of {} bytes",
                remote,
                copied,
                stat.size()
            )));
        }

        channel.send_eof().ok();
        channel.wait_eof().ok();
        channel.close().ok();
        channel.wait_close().ok();

        debug!("Downloaded {} bytes from {}", copied, remote);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.session
            .disconnect(None, "closing", None)
            .map_err(|e| ArtsyncError::Connection(format!("Disconnect failed: {}", e)))
    }
}

/// Copy `reader` into `writer` and flush it. A failure is reported through
/// the mapper of the side it came from.
fn pump<R, W, RE, WE>(reader: &mut R, writer: &mut W, read_err: RE, write_err: WE) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    RE: Fn(std::io::Error) -> ArtsyncError,
    WE: Fn(std::io::Error) -> ArtsyncError,
{
    let mut buffer = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(e)),
        };
        writer.write_all(&buffer[..n]).map_err(&write_err)?;
        total += n as u64;
    }
    writer.flush().map_err(write_err)?;
    Ok(total)
}

impl SshConnection {
    /// Open an authenticated session. Never prompts: an explicit key, then
    /// the agent, then the default keys are tried.
    pub fn connect(config: &SshConfig) -> Result<Self> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port))
            .map_err(|e| ArtsyncError::Connection(format!("Failed to connect to {}:{}: {}", config.host, config.port, e)))?;

        let mut session = Session::new()
            .map_err(|e| ArtsyncError::Connection(e.to_string()))?;

        session.set_tcp_stream(tcp.try_clone()?);
        session.handshake()
            .map_err(|e| ArtsyncError::Connection(format!("Handshake failed: {}", e)))?;

        if let Some(key) = &config.key_path {
            session.userauth_pubkey_file(&config.user, None, key, None)
                .map_err(|e| ArtsyncError::Authentication(format!("Key auth failed: {}", e)))?;
        } else if session.userauth_agent(&config.user).is_err() || !session.authenticated() {
            let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).unwrap_or_default();
            let default_keys = [
                PathBuf::from(&home).join(".ssh/id_ed25519"),
                PathBuf::from(&home).join(".ssh/id_rsa"),
            ];

            for key in default_keys.iter().filter(|k| k.exists()) {
                if session.userauth_pubkey_file(&config.user, None, key, None).is_ok()
                    && session.authenticated()
                {
                    break;
                }
            }
        }

        if !session.authenticated() {
            return Err(ArtsyncError::Authentication(format!(
                "Authentication as {} failed (agent and default keys tried)",
                config.user
            )));
        }

        Ok(Self { session, _tcp: tcp })
    }
}

fn finish_send(channel: &mut ssh2::Channel) -> std::result::Result<(), ssh2::Error> {
    channel.send_eof()?;
    channel.wait_eof()?;
    channel.close()?;
    channel.wait_close()
}
