//! UID SEARCH command handler.
//!
//! Supports the flag keys the relay uses (`UNSEEN`, plus `SEEN` and
//! `ALL`) and the `NOT`/`AND`/`OR` combinators. Anything else is
//! answered with `BAD` so a test notices a query it did not expect.
//!
//! ```text
//! * SEARCH 101 102
//! A0003 OK SEARCH completed
//! ```

use crate::fake_imap::inbox::{Inbox, TestMessage};
use crate::fake_imap::io::write_line;
use imap_codec::imap_types::search::SearchKey;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_uid_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    inbox: &Inbox,
    selected: bool,
    stream: &mut BufReader<S>,
) {
    if !selected {
        let _ = write_line(stream, &format!("{tag} BAD No mailbox selected\r\n")).await;
        return;
    }
    if inbox.fail_search {
        let _ = write_line(stream, &format!("{tag} NO Search temporarily unavailable\r\n")).await;
        return;
    }

    let mut hits = Vec::new();
    for message in &inbox.messages {
        let verdict: Option<Vec<bool>> = criteria.iter().map(|k| matches_key(message, k)).collect();
        match verdict {
            Some(v) if v.iter().all(|&b| b) => hits.push(message.uid.to_string()),
            Some(_) => {}
            None => {
                let _ = write_line(stream, &format!("{tag} BAD Unsupported search key\r\n")).await;
                return;
            }
        }
    }

    let line = if hits.is_empty() {
        "* SEARCH\r\n".to_string()
    } else {
        format!("* SEARCH {}\r\n", hits.join(" "))
    };
    let _ = write_line(stream, &line).await;
    let _ = write_line(stream, &format!("{tag} OK SEARCH completed\r\n")).await;
}

/// `None` for keys the fake server does not implement.
fn matches_key(message: &TestMessage, key: &SearchKey<'_>) -> Option<bool> {
    match key {
        SearchKey::All => Some(true),
        SearchKey::Unseen => Some(!message.seen),
        SearchKey::Seen => Some(message.seen),
        SearchKey::Not(k) => matches_key(message, k).map(|b| !b),
        SearchKey::And(keys) => keys
            .as_ref()
            .iter()
            .map(|k| matches_key(message, k))
            .collect::<Option<Vec<_>>>()
            .map(|v| v.into_iter().all(|b| b)),
        SearchKey::Or(a, b) => Some(matches_key(message, a)? || matches_key(message, b)?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::inbox::InboxBuilder;
    use tokio::io::BufReader;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    async fn run(criteria: &[SearchKey<'_>], inbox: &Inbox, selected: bool) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_search("A1", criteria, inbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn inbox() -> Inbox {
        InboxBuilder::new()
            .message(101, false, RAW)
            .message(102, true, RAW)
            .message(103, false, RAW)
            .build()
    }

    #[tokio::test]
    async fn unseen_in_folder_order() {
        let output = run(&[SearchKey::Unseen], &inbox(), true).await;
        assert_eq!(output, "* SEARCH 101 103\r\nA1 OK SEARCH completed\r\n");
    }

    #[tokio::test]
    async fn not_seen_equals_unseen() {
        let key = SearchKey::Not(Box::new(SearchKey::Seen));
        let output = run(&[key], &inbox(), true).await;
        assert!(output.starts_with("* SEARCH 101 103\r\n"));
    }

    #[tokio::test]
    async fn no_hits() {
        let inbox = InboxBuilder::new().message(1, true, RAW).build();
        let output = run(&[SearchKey::Unseen], &inbox, true).await;
        assert!(output.starts_with("* SEARCH\r\n"));
    }

    #[tokio::test]
    async fn failing_search_says_no() {
        let inbox = InboxBuilder::new().message(1, false, RAW).fail_search().build();
        let output = run(&[SearchKey::Unseen], &inbox, true).await;
        assert_eq!(output, "A1 NO Search temporarily unavailable\r\n");
    }

    #[tokio::test]
    async fn requires_selected_mailbox() {
        let output = run(&[SearchKey::All], &inbox(), false).await;
        assert_eq!(output, "A1 BAD No mailbox selected\r\n");
    }

    #[tokio::test]
    async fn unsupported_key_is_bad() {
        let output = run(&[SearchKey::Answered], &inbox(), true).await;
        assert_eq!(output, "A1 BAD Unsupported search key\r\n");
    }
}
