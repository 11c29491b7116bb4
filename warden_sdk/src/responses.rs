//! Reply helpers
//!
//! Turns ledger results into the `(ok, message)` replies the transport sends back, and
//! splits long listings into pages that fit a single chat message.

use std::path::PathBuf;
use warden_user::prelude::{AccountRecord, Role};

/// The longest message a chat transport accepts, in characters
pub const MAX_MESSAGE_LEN: usize = 4096;

/// What the transport sends back for one command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub ok: bool,
    /// One chat message per entry
    pub messages: Vec<String>,
    /// A file to offer for download (the daemon configuration backup)
    pub attachment: Option<PathBuf>,
}

impl Response {
    pub fn ok<T: Into<String>>(message: T) -> Self {
        Self {
            ok: true,
            messages: vec![message.into()],
            attachment: None,
        }
    }

    pub fn fail<T: Into<String>>(message: T) -> Self {
        Self {
            ok: false,
            messages: vec![message.into()],
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, path: PathBuf) -> Self {
        self.attachment = Some(path);
        self
    }

    /// Every message joined by newlines
    pub fn text(&self) -> String {
        self.messages.join("\n")
    }
}

/// Splits `header` + `lines` into messages of at most `max_len` characters. The header
/// opens the first message only. A single line longer than `max_len` is sent on its own
pub fn paginate<I, S>(header: &str, lines: I, max_len: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pages = Vec::new();
    let mut current = format!("{header}\n\n");

    for line in lines {
        let line = line.as_ref();
        if current.chars().count() + line.chars().count() + 1 > max_len && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
        }

        current.push_str(line);
        current.push('\n');
    }

    if !current.is_empty() {
        pages.push(current);
    }

    pages
        .into_iter()
        .map(|page| page.trim_end().to_string())
        .collect()
}

/// The listing reply for an actor of `role`
pub fn account_listing(actor: u64, role: Option<Role>, records: &[AccountRecord]) -> Response {
    let is_super_admin = role == Some(Role::SuperAdmin);

    if records.is_empty() {
        return Response::ok(if is_super_admin {
            "No accounts are registered in the tracking ledger."
        } else {
            "You have not added any accounts yet."
        });
    }

    let header = if is_super_admin {
        format!("All registered accounts ({})", records.len())
    } else {
        format!("Accounts added by you ({actor})")
    };

    let lines = records.iter().map(|record| {
        if is_super_admin {
            format!(
                "- {} (expires {}, created by {})",
                record.identifier,
                record.expiration_display(),
                record.creator_id
            )
        } else {
            format!(
                "- {} (expires {})",
                record.identifier,
                record.expiration_display()
            )
        }
    });

    Response {
        ok: true,
        messages: paginate(&header, lines, MAX_MESSAGE_LEN),
        attachment: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_listing_is_one_page() {
        let pages = paginate("Header", ["- a", "- b"], MAX_MESSAGE_LEN);
        assert_eq!(pages, vec!["Header\n\n- a\n- b".to_string()]);
    }

    #[test]
    fn long_listing_keeps_header_on_first_page() {
        let lines: Vec<String> = (0..40).map(|n| format!("- user{n:03}")).collect();
        let pages = paginate("Accounts", &lines, 64);
        assert!(pages.len() > 1);
        assert!(pages[0].starts_with("Accounts\n\n- user000"));
        assert!(pages[1..].iter().all(|page| page.starts_with("- user")));
        assert!(pages.iter().all(|page| page.chars().count() <= 64));

        let rejoined: Vec<&str> = pages
            .iter()
            .flat_map(|page| page.lines())
            .filter(|line| line.starts_with("- "))
            .collect();
        assert_eq!(rejoined.len(), 40);
    }

    #[test]
    fn empty_listing_messages() {
        assert!(account_listing(1, Some(Role::SuperAdmin), &[])
            .text()
            .contains("No accounts"));
        assert!(account_listing(1, Some(Role::Manager), &[])
            .text()
            .contains("not added"));
    }
}
