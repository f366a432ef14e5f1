//! IMAP connection and TLS helpers
//!
//! Provides the low-level `connect()` and `select()` functions behind
//! [`crate::ImapStore`]. Every network step is bounded by the
//! configured timeout so a hung server surfaces as an error instead of
//! stalling the caller forever.

use crate::config::{ImapConfig, TlsMode};
use crate::error::{Error, Result};
use async_imap::Session;
use rustls::pki_types::ServerName;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// A TLS-wrapped IMAP session.
pub type ImapSession = Session<Compat<tokio_rustls::client::TlsStream<TcpStream>>>;

/// Run `fut`, failing with [`Error::Timeout`] if it takes longer than
/// `after`.
pub async fn bounded<T, F>(after: Duration, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| Error::Timeout { operation, after })?
}

/// Build the TLS connector for `config`.
///
/// With `accept_invalid_certs` the server certificate is not verified
/// at all (local bridges use self-signed certificates); otherwise the
/// Mozilla root set from `webpki-roots` is trusted. The ring provider
/// is used explicitly so no process-wide default is required.
fn tls_connector(config: &ImapConfig) -> Result<TlsConnector> {
    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| Error::Tls(format!("TLS setup failed: {e}")))?;

    let tls = if config.accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(tls)))
}

/// Open a fresh TLS-wrapped, authenticated IMAP session.
///
/// Connects to `config.host:config.port` via TCP, issues STARTTLS when
/// configured, performs the TLS handshake, and logs in.
///
/// # Errors
///
/// Network failures and rejected credentials map to
/// [`Error::Connection`], handshake failures to [`Error::Tls`], and slow
/// steps to [`Error::Timeout`].
pub async fn connect(config: &ImapConfig) -> Result<ImapSession> {
    let addr = format!("{}:{}", config.host, config.port);
    debug!("Connecting to IMAP server at {} ({:?})", addr, config.tls);

    let tcp_stream = bounded(config.timeout, "TCP connect", async {
        TcpStream::connect(&addr)
            .await
            .map_err(|e| Error::Connection(format!("{addr}: {e}")))
    })
    .await?;

    let stream = match config.tls {
        TlsMode::Implicit => tcp_stream,
        TlsMode::StartTls => {
            let mut client = async_imap::Client::new(tcp_stream.compat());
            bounded(config.timeout, "STARTTLS", async {
                client
                    .run_command_and_check_ok("STARTTLS", None)
                    .await
                    .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))
            })
            .await?;
            client.into_inner().into_inner()
        }
    };

    let connector = tls_connector(config)?;
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    let tls_stream = bounded(config.timeout, "TLS handshake", async {
        connector
            .connect(server_name, stream)
            .await
            .map_err(|e| Error::Tls(e.to_string()))
    })
    .await?;

    let tls_client = async_imap::Client::new(tls_stream.compat());

    let session = bounded(config.timeout, "LOGIN", async {
        tls_client
            .login(&config.username, &config.password)
            .await
            .map_err(|(e, _)| Error::Connection(format!("Login failed: {e}")))
    })
    .await?;

    info!("Connected to IMAP server {}", config.host);
    Ok(session)
}

/// SELECT a folder on an existing session.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the server rejects the folder.
pub async fn select(session: &mut ImapSession, folder: &str, after: Duration) -> Result<()> {
    bounded(after, "SELECT", async {
        session
            .select(folder)
            .await
            .map_err(|e| Error::Protocol(format!("Failed to select {folder}: {e}")))
    })
    .await?;
    debug!("Selected {}", folder);
    Ok(())
}

/// Connect, log in and select the configured folder.
///
/// If SELECT fails the half-open session is logged out before the
/// error is returned.
///
/// # Errors
///
/// Any error from [`connect`] or [`select`].
pub async fn open(config: &ImapConfig) -> Result<ImapSession> {
    let mut session = connect(config).await?;
    if let Err(e) = select(&mut session, &config.folder, config.timeout).await {
        logout(&mut session, config.timeout).await;
        return Err(e);
    }
    Ok(session)
}

/// LOGOUT, ignoring failures: the connection is going away either way.
pub async fn logout(session: &mut ImapSession, after: Duration) {
    let result = bounded(after, "LOGOUT", async {
        session
            .logout()
            .await
            .map_err(|e| Error::Protocol(format!("Logout failed: {e}")))
    })
    .await;
    match result {
        Ok(()) => debug!("Logged out"),
        Err(e) => debug!("Ignoring logout failure: {}", e),
    }
}

/// Certificate verifier that accepts all certificates
/// (for bridges with self-signed certs).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
