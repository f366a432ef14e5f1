//! Commands valid in any IMAP state (RFC 3501 section 6.1):
//! CAPABILITY, NOOP and LOGOUT.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_capability<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    stream: &mut BufReader<S>,
) {
    let _ = write_line(stream, "* CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN\r\n").await;
    let _ = write_line(stream, &format!("{tag} OK CAPABILITY completed\r\n")).await;
}

pub async fn handle_noop<S: AsyncRead + AsyncWrite + Unpin>(tag: &str, stream: &mut BufReader<S>) {
    let _ = write_line(stream, &format!("{tag} OK NOOP completed\r\n")).await;
}

/// Untagged BYE, then the tagged OK. The caller closes the connection.
pub async fn handle_logout<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    stream: &mut BufReader<S>,
) {
    let _ = write_line(stream, "* BYE Fake server logging out\r\n").await;
    let _ = write_line(stream, &format!("{tag} OK LOGOUT completed\r\n")).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use tokio::io::{BufReader, DuplexStream};

    async fn capture<F, Fut>(handler: F) -> String
    where
        F: FnOnce(BufReader<DuplexStream>) -> Fut,
        Fut: Future<Output = BufReader<DuplexStream>>,
    {
        let (client, server) = tokio::io::duplex(1024);
        drop(handler(BufReader::new(server)).await);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn capability_advertises_starttls() {
        let output = capture(|mut s| async move {
            handle_capability("A1", &mut s).await;
            s
        })
        .await;
        assert!(output.contains("STARTTLS"));
        assert!(output.ends_with("A1 OK CAPABILITY completed\r\n"));
    }

    #[tokio::test]
    async fn noop_is_ok() {
        let output = capture(|mut s| async move {
            handle_noop("N7", &mut s).await;
            s
        })
        .await;
        assert_eq!(output, "N7 OK NOOP completed\r\n");
    }

    #[tokio::test]
    async fn logout_sends_bye_before_ok() {
        let output = capture(|mut s| async move {
            handle_logout("X1", &mut s).await;
            s
        })
        .await;
        let bye = output.find("* BYE").unwrap();
        let ok = output.find("X1 OK LOGOUT").unwrap();
        assert!(bye < ok);
    }
}
