//! SELECT command handler.
//!
//! Only INBOX exists. The response carries the counts a client needs
//! to start working with the folder:
//!
//! - `* N EXISTS` for the number of messages
//! - `[UIDVALIDITY 1]`, constant because the fake inbox is never
//!   recreated
//! - `[UIDNEXT n]`, one past the highest UID
//! - `[UNSEEN n]`, the sequence number of the first unseen message

use crate::fake_imap::inbox::Inbox;
use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Answer SELECT. Returns whether INBOX is now selected.
pub async fn handle_select<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    inbox: &Inbox,
    stream: &mut BufReader<S>,
) -> bool {
    if !folder_name.eq_ignore_ascii_case("INBOX") {
        let _ = write_line(stream, &format!("{tag} NO Mailbox does not exist\r\n")).await;
        return false;
    }

    let uidnext = inbox
        .messages
        .iter()
        .map(|m| m.uid)
        .max()
        .map_or(1, |max| max + 1);

    let mut lines = vec![
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n".to_string(),
        format!("* {} EXISTS\r\n", inbox.messages.len()),
        "* 0 RECENT\r\n".to_string(),
        "* OK [UIDVALIDITY 1] UIDs valid\r\n".to_string(),
        format!("* OK [UIDNEXT {uidnext}] Predicted next UID\r\n"),
    ];
    if let Some(pos) = inbox.messages.iter().position(|m| !m.seen) {
        lines.push(format!("* OK [UNSEEN {}] First unseen\r\n", pos + 1));
    }
    lines.push(format!("{tag} OK [READ-WRITE] SELECT completed\r\n"));

    for line in &lines {
        if write_line(stream, line).await.is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::inbox::InboxBuilder;
    use tokio::io::BufReader;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    async fn run(folder_name: &str, inbox: &Inbox) -> (String, bool) {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        let selected = handle_select("A1", folder_name, inbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), selected)
    }

    #[tokio::test]
    async fn selects_inbox_case_insensitively() {
        let inbox = InboxBuilder::new()
            .message(5, true, RAW)
            .message(10, false, RAW)
            .build();

        let (output, selected) = run("inbox", &inbox).await;

        assert!(selected);
        assert!(output.contains("* 2 EXISTS"));
        assert!(output.contains("[UIDNEXT 11]"));
        assert!(output.contains("[UNSEEN 2]"));
        assert!(output.ends_with("A1 OK [READ-WRITE] SELECT completed\r\n"));
    }

    #[tokio::test]
    async fn empty_inbox() {
        let (output, selected) = run("INBOX", &Inbox::default()).await;

        assert!(selected);
        assert!(output.contains("* 0 EXISTS"));
        assert!(output.contains("[UIDNEXT 1]"));
        assert!(!output.contains("UNSEEN"));
    }

    #[tokio::test]
    async fn other_folders_do_not_exist() {
        let (output, selected) = run("Archive", &Inbox::default()).await;

        assert!(!selected);
        assert_eq!(output, "A1 NO Mailbox does not exist\r\n");
    }
}
