//! Pilot bundle assembly.
//!
//! A bundle is the one artifact handed to a computing element: a
//! self-executing bootstrap script embedding the delegated credential, the
//! pilot agent, and the installer as compressed, transport-encoded
//! payloads. The artifact is modelled as structured data (files to
//! materialize, environment exports, agent command line) and rendered
//! deterministically, so its contract is unit-testable without touching a
//! filesystem.
//!
//! When executed on the worker, the rendered script:
//! - creates an isolated scratch directory and removes it on every exit
//!   path, success or failure;
//! - materializes the credential (mode 0600) and both scripts (mode 0700);
//! - exports the credential path and, if configured, the outbound proxy;
//! - hands control to the agent script with the given options.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::error::PackagingError;
use crate::proxy::DelegatedProxy;

/// Environment variable pointing the agent at its credential file.
pub const PROXY_ENV_VAR: &str = "X509_USER_PROXY";
/// Environment variable carrying the site's outbound HTTP proxy, exported
/// only when one is configured.
pub const OUTBOUND_PROXY_ENV_VAR: &str = "HTTP_PROXY";

const PROXY_FILE: &str = "proxy";
const AGENT_FILE: &str = "pilot-agent";
const INSTALLER_FILE: &str = "pilot-install";

/// One payload the bootstrap materializes on the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    pub name: &'static str,
    /// Unix permission bits applied after decoding.
    pub mode: u32,
    /// gzip + base64 transport encoding of the payload bytes.
    pub encoded: String,
}

/// A complete, ready-to-submit pilot bundle.
///
/// One bundle is built per submission call and reused for every pilot of
/// that call; it is handed to the computing element and never retained
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PilotBundle {
    pub files: Vec<BundleFile>,
    pub agent_options: Vec<String>,
    pub outbound_proxy: Option<String>,
}

/// Assemble a bundle from the delegated credential and the agent and
/// installer scripts.
///
/// Fails atomically: if any payload is unreadable or compression fails, no
/// artifact is returned. Reads only local files; the remote resource is
/// never touched.
pub fn build_bundle(
    agent_options: &[String],
    proxy: &DelegatedProxy,
    agent_path: &Path,
    installer_path: &Path,
    outbound_proxy: Option<&str>,
) -> Result<PilotBundle, PackagingError> {
    let agent_bytes = read_payload(AGENT_FILE, agent_path)?;
    let installer_bytes = read_payload(INSTALLER_FILE, installer_path)?;

    let files = vec![
        BundleFile {
            name: PROXY_FILE,
            mode: 0o600,
            encoded: encode_payload(PROXY_FILE, proxy.pem())?,
        },
        BundleFile {
            name: AGENT_FILE,
            mode: 0o700,
            encoded: encode_payload(AGENT_FILE, &agent_bytes)?,
        },
        BundleFile {
            name: INSTALLER_FILE,
            mode: 0o700,
            encoded: encode_payload(INSTALLER_FILE, &installer_bytes)?,
        },
    ];

    debug!(
        agent = %agent_path.display(),
        installer = %installer_path.display(),
        options = agent_options.len(),
        "pilot bundle assembled"
    );

    Ok(PilotBundle {
        files,
        agent_options: agent_options.to_vec(),
        outbound_proxy: outbound_proxy.map(str::to_string),
    })
}

impl PilotBundle {
    /// Render the self-executing bootstrap script.
    ///
    /// Pure function of the bundle contents: identical bundles render to
    /// identical scripts.
    pub fn render(&self) -> String {
        let mut script = String::new();
        script.push_str("#!/bin/sh\n");
        script.push_str("# gridpilot bootstrap\n");
        script.push_str("workdir=$(mktemp -d \"${TMPDIR:-/tmp}/pilot.XXXXXXXX\") || exit 1\n");
        // The trap is installed before anything lands in the scratch
        // directory, so every exit path removes it.
        script.push_str("trap 'rm -rf \"$workdir\"' EXIT HUP INT TERM\n");
        script.push_str("set -e\n");
        script.push_str("unpack() {\n");
        script.push_str("  printf '%s' \"$2\" | base64 -d | gunzip -c > \"$workdir/$1\"\n");
        script.push_str("  chmod \"$3\" \"$workdir/$1\"\n");
        script.push_str("}\n");

        for file in &self.files {
            script.push_str(&format!(
                "unpack {} '{}' {:o}\n",
                file.name, file.encoded, file.mode
            ));
        }

        script.push_str(&format!(
            "{PROXY_ENV_VAR}=\"$workdir/{PROXY_FILE}\"\nexport {PROXY_ENV_VAR}\n"
        ));
        if let Some(outbound) = &self.outbound_proxy {
            script.push_str(&format!(
                "{OUTBOUND_PROXY_ENV_VAR}={}\nexport {OUTBOUND_PROXY_ENV_VAR}\n",
                shell_quote(outbound)
            ));
        }

        script.push_str("cd \"$workdir\"\n");
        let mut command = format!("./{AGENT_FILE}");
        for option in &self.agent_options {
            command.push(' ');
            command.push_str(&shell_quote(option));
        }
        script.push_str(&command);
        script.push('\n');
        script
    }

    /// Materialize the rendered script as a uniquely named file in `dir`
    /// and return its path, for backends that submit files rather than
    /// text.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, PackagingError> {
        let mut file = tempfile::Builder::new()
            .prefix("pilot-")
            .suffix(".sh")
            .tempfile_in(dir)
            .map_err(PackagingError::Write)?;
        file.write_all(self.render().as_bytes())
            .map_err(PackagingError::Write)?;
        let (_, path) = file.keep().map_err(|e| PackagingError::Write(e.error))?;
        Ok(path)
    }
}

/// Inverse of the transport encoding. Used by tests and local diagnostics
/// to check payloads round-trip byte-identically.
pub fn decode_payload(encoded: &str) -> std::io::Result<Vec<u8>> {
    use std::io::Read;

    let compressed = STANDARD
        .decode(encoded)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_payload(name: &'static str, path: &Path) -> Result<Vec<u8>, PackagingError> {
    std::fs::read(path).map_err(|source| PackagingError::UnreadablePayload { name, source })
}

fn encode_payload(name: &'static str, bytes: &[u8]) -> Result<String, PackagingError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(bytes)
        .map_err(|source| PackagingError::Compression { name, source })?;
    let compressed = encoder
        .finish()
        .map_err(|source| PackagingError::Compression { name, source })?;
    Ok(STANDARD.encode(compressed))
}

/// POSIX single-quote escaping.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
