//! UID FETCH command handler.
//!
//! Message data goes out as a counted literal: `{length}\r\n`
//! followed by exactly that many raw bytes, then the closing `)`.
//!
//! ```text
//! * 1 FETCH (UID 101 BODY[HEADER] {312}
//! <312 bytes of header block>
//! )
//! ```
//!
//! A header fetch (`BODY.PEEK[HEADER]`) leaves the message unseen. A
//! full fetch (`BODY[]`) sets `\Seen` like a real server does, which
//! is what ends the "unread" life of a message the owner has read.

use crate::fake_imap::inbox::{Inbox, TestMessage};
use crate::fake_imap::io::{write_bytes, write_line};
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// UIDs named one by one. The relay never fetches ranges.
fn single_uids(seq_set: &SequenceSet) -> Vec<u32> {
    seq_set
        .0
        .as_ref()
        .iter()
        .filter_map(|seq| match seq {
            Sequence::Single(SeqOrUid::Value(v)) => Some(v.get()),
            _ => None,
        })
        .collect()
}

fn fetch_response(seq: usize, message: &TestMessage, header_only: bool) -> (String, Vec<u8>) {
    let (section, data) = if header_only {
        ("BODY[HEADER]", message.header().to_vec())
    } else {
        ("BODY[]", message.raw.clone())
    };
    (
        format!(
            "* {seq} FETCH (UID {} {section} {{{}}}\r\n",
            message.uid,
            data.len()
        ),
        data,
    )
}

/// Build the untagged FETCH responses, flagging fully fetched messages
/// as seen. The lock is released before anything is written.
fn responses(uids: &[u32], header_only: bool, inbox: &Mutex<Inbox>) -> Vec<(String, Vec<u8>)> {
    let mut inbox = inbox.lock().unwrap();
    let mut out = Vec::new();

    // Servers may push FETCH data for other messages at any time.
    if let Some(stray) = inbox.stray_fetch.filter(|s| !uids.contains(s))
        && let Some((idx, message)) = inbox.get(stray)
    {
        out.push(fetch_response(idx + 1, message, header_only));
    }

    for &uid in uids {
        let Some((idx, message)) = inbox.get(uid) else {
            continue;
        };
        out.push(fetch_response(idx + 1, message, header_only));
        if !header_only {
            inbox.set_seen(uid, true);
        }
    }
    out
}

pub async fn handle_uid_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    header_only: bool,
    inbox: &Mutex<Inbox>,
    selected: bool,
    stream: &mut BufReader<S>,
) {
    if !selected {
        let _ = write_line(stream, &format!("{tag} BAD No mailbox selected\r\n")).await;
        return;
    }

    for (prefix, data) in responses(&single_uids(sequence_set), header_only, inbox) {
        if write_line(stream, &prefix).await.is_err()
            || write_bytes(stream, &data).await.is_err()
            || write_line(stream, ")\r\n").await.is_err()
        {
            return;
        }
    }

    let _ = write_line(stream, &format!("{tag} OK FETCH completed\r\n")).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::inbox::InboxBuilder;
    use std::num::NonZeroU32;
    use tokio::io::BufReader;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    fn uid_set(uid: u32) -> SequenceSet {
        SequenceSet(
            vec![Sequence::Single(SeqOrUid::Value(
                NonZeroU32::new(uid).unwrap(),
            ))]
            .try_into()
            .unwrap(),
        )
    }

    async fn run(uid: u32, header_only: bool, inbox: &Mutex<Inbox>) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_fetch("A1", &uid_set(uid), header_only, inbox, true, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn inbox() -> Mutex<Inbox> {
        Mutex::new(InboxBuilder::new().message(7, true, RAW).message(42, false, RAW).build())
    }

    #[tokio::test]
    async fn header_fetch_omits_body_and_keeps_unseen() {
        let inbox = inbox();

        let output = run(42, true, &inbox).await;

        assert!(output.starts_with("* 2 FETCH (UID 42 BODY[HEADER] {32}\r\n"));
        assert!(output.contains("Subject: Test"));
        assert!(!output.contains("Body"));
        assert!(!inbox.lock().unwrap().get(42).unwrap().1.seen);
    }

    #[tokio::test]
    async fn full_fetch_returns_everything_and_marks_seen() {
        let inbox = inbox();

        let output = run(42, false, &inbox).await;

        let literal = format!("BODY[] {{{}}}", RAW.len());
        assert!(output.contains(&literal));
        assert!(output.contains("\r\n\r\nBody)\r\n"));
        assert!(output.ends_with("A1 OK FETCH completed\r\n"));
        assert!(inbox.lock().unwrap().get(42).unwrap().1.seen);
    }

    #[tokio::test]
    async fn stray_fetch_goes_out_first() {
        let inbox = Mutex::new(
            InboxBuilder::new()
                .message(7, false, RAW)
                .message(42, false, RAW)
                .stray_fetch(7)
                .build(),
        );

        let output = run(42, false, &inbox).await;

        let stray = output.find("UID 7 BODY[]").unwrap();
        let asked = output.find("UID 42 BODY[]").unwrap();
        assert!(stray < asked);
        assert!(!inbox.lock().unwrap().get(7).unwrap().1.seen);
        assert!(inbox.lock().unwrap().get(42).unwrap().1.seen);
    }

    #[tokio::test]
    async fn unknown_uid_returns_only_ok() {
        let output = run(99, false, &inbox()).await;
        assert_eq!(output, "A1 OK FETCH completed\r\n");
    }
}
