use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use lettre::message::Mailbox;
use thiserror::Error;

use crate::attachment::{Disposition, ParseDispositionError};

/// Parse a mailbox (`addr@example.com` or `Name <addr@example.com>`) for clap
fn parse_mailbox(s: &str) -> Result<Mailbox, String> {
    s.parse::<Mailbox>()
        .map_err(|e| format!("invalid email address '{}': {}", s, e))
}

/// Check that every disposition carried by a raw value is known.
///
/// The raw value is kept as-is so that newline splitting can run after parsing.
fn parse_disposition_value(s: &str) -> Result<String, String> {
    let check = |piece: &str| piece.parse::<Disposition>().map_err(|e| e.to_string());
    if s.contains('\n') {
        split_lines(s).try_for_each(|piece| check(piece).map(drop))?;
    } else {
        check(s)?;
    }
    Ok(s.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "send-email", version)]
#[command(about = "Send a markdown email with optional attachments through SendGrid")]
pub struct MailerArgs {
    /// Email address(es) to send the message to
    #[arg(
        long = "to",
        value_name = "ADDRESS",
        num_args = 1..,
        required = true,
        value_parser = parse_mailbox
    )]
    pub to: Vec<Mailbox>,

    /// Subject of the email
    #[arg(long, value_name = "SUBJECT", allow_hyphen_values = true)]
    pub subject: String,

    /// Body of the email, written in markdown
    #[arg(long = "markdown-body", value_name = "MARKDOWN", allow_hyphen_values = true)]
    pub markdown_body: String,

    /// Email address to send the message from
    #[arg(long = "from", value_name = "ADDRESS", value_parser = parse_mailbox)]
    pub from: Mailbox,

    /// SendGrid API key
    #[arg(long = "api-key", value_name = "KEY")]
    pub api_key: String,

    /// File paths to attach to the email. Only the last occurrence is used.
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..,
        overrides_with = "attachments"
    )]
    pub attachments: Vec<String>,

    /// Attachment disposition: 'inline', 'attachment' or '' (default: attachment).
    /// Give one to apply it to every attachment, or one per attachment.
    /// Only the last occurrence is used.
    #[arg(
        long = "attachments-disposition",
        value_name = "DISPOSITION",
        num_args = 0..,
        default_value = "attachment",
        overrides_with = "attachments_disposition",
        value_parser = parse_disposition_value
    )]
    pub attachments_disposition: Vec<String>,

    /// Increase verbosity (can be used multiple times: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error(transparent)]
    InvalidDisposition(#[from] ParseDispositionError),
}

/// Immutable run configuration, built once from the command line.
#[derive(Clone)]
pub struct Options {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub markdown_body: String,
    pub api_key: String,
    /// Empty when no attachment was requested.
    pub attachments: Vec<PathBuf>,
    pub dispositions: Vec<Disposition>,
}

impl Options {
    pub fn from_args(args: MailerArgs) -> Result<Self, OptionsError> {
        let MailerArgs {
            to,
            subject,
            markdown_body,
            from,
            api_key,
            attachments,
            attachments_disposition,
            verbosity: _,
        } = args;

        let attachments = split_single_value(attachments);
        let attachments = if is_attachment_requested(&attachments) {
            attachments.into_iter().map(PathBuf::from).collect()
        } else {
            Vec::new()
        };

        let dispositions = split_single_value(attachments_disposition)
            .iter()
            .map(|value| value.parse::<Disposition>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            from,
            to,
            subject,
            markdown_body,
            api_key,
            attachments,
            dispositions,
        })
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let to: Vec<String> = self.to.iter().map(ToString::to_string).collect();
        f.debug_struct("Options")
            .field("from", &self.from.to_string())
            .field("to", &to)
            .field("subject", &self.subject)
            .field("markdown_body", &self.markdown_body)
            .field("api_key", &"<redacted>")
            .field("attachments", &self.attachments)
            .field("dispositions", &self.dispositions)
            .finish()
    }
}

/// Split a newline separated value into trimmed, non-empty pieces.
fn split_lines(value: &str) -> impl Iterator<Item = &str> {
    value.split('\n').map(str::trim).filter(|s| !s.is_empty())
}

/// A list given as exactly one newline separated value is expanded into its pieces.
/// Anything else is returned untouched.
pub fn split_single_value(values: Vec<String>) -> Vec<String> {
    if let [single] = values.as_slice() {
        if single.contains('\n') {
            return split_lines(single).map(str::to_string).collect();
        }
    }
    values
}

fn is_attachment_requested(attachments: &[String]) -> bool {
    match attachments {
        [] => false,
        [only] => !only.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: &[&str] = &[
        "send-email",
        "--to",
        "rcpt@example.com",
        "--subject",
        "Hello",
        "--markdown-body",
        "**hi**",
        "--from",
        "sender@example.com",
        "--api-key",
        "SG.key",
    ];

    fn parse(extra: &[&str]) -> Result<MailerArgs, clap::Error> {
        let argv: Vec<&str> = REQUIRED.iter().chain(extra.iter()).copied().collect();
        MailerArgs::try_parse_from(argv)
    }

    fn options(extra: &[&str]) -> Options {
        Options::from_args(parse(extra).unwrap()).unwrap()
    }

    #[test]
    fn test_required_arguments() {
        let opts = options(&[]);
        assert_eq!(opts.from.email.to_string(), "sender@example.com");
        assert_eq!(opts.to.len(), 1);
        assert_eq!(opts.subject, "Hello");
        assert_eq!(opts.markdown_body, "**hi**");
        assert_eq!(opts.api_key, "SG.key");
        assert!(opts.attachments.is_empty());
        assert_eq!(opts.dispositions, vec![Disposition::Attachment]);
    }

    #[test]
    fn test_missing_required_argument_is_usage_error() {
        let err = MailerArgs::try_parse_from(["send-email", "--to", "rcpt@example.com"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_to_accumulates_across_occurrences() {
        let opts = options(&["--to", "a@example.com", "b@example.com", "--to", "c@example.com"]);
        let to: Vec<String> = opts.to.iter().map(|m| m.email.to_string()).collect();
        assert_eq!(
            to,
            vec![
                "rcpt@example.com",
                "a@example.com",
                "b@example.com",
                "c@example.com"
            ]
        );
    }

    #[test]
    fn test_body_and_subject_may_start_with_hyphen() {
        let args = MailerArgs::try_parse_from([
            "send-email",
            "--to",
            "rcpt@example.com",
            "--subject",
            "- nightly run",
            "--markdown-body",
            "- first item\n- second item",
            "--from",
            "sender@example.com",
            "--api-key",
            "SG.key",
        ])
        .unwrap();
        assert_eq!(args.subject, "- nightly run");
        assert_eq!(args.markdown_body, "- first item\n- second item");
    }

    #[test]
    fn test_repeated_attachment_flags_keep_last_occurrence() {
        let opts = options(&[
            "--attachments",
            "a.txt",
            "b.txt",
            "--attachments",
            "c.txt",
            "--attachments-disposition",
            "inline",
            "--attachments-disposition",
            "attachment",
        ]);
        assert_eq!(opts.attachments, vec![PathBuf::from("c.txt")]);
        assert_eq!(opts.dispositions, vec![Disposition::Attachment]);
    }

    #[test]
    fn test_repeated_attachments_still_split_last_value() {
        let opts = options(&["--attachments", "old.txt", "--attachments", "a.txt\nb.txt"]);
        assert_eq!(
            opts.attachments,
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );
    }

    #[test]
    fn test_mailbox_with_display_name() {
        let args = MailerArgs::try_parse_from([
            "send-email",
            "--to",
            "Jane Doe <jane@example.com>",
            "--subject",
            "s",
            "--markdown-body",
            "b",
            "--from",
            "Bot <bot@example.com>",
            "--api-key",
            "k",
        ])
        .unwrap();
        assert_eq!(args.to[0].name.as_deref(), Some("Jane Doe"));
        assert_eq!(args.from.name.as_deref(), Some("Bot"));
        assert_eq!(args.from.email.to_string(), "bot@example.com");
    }

    #[test]
    fn test_invalid_address_rejected() {
        let err = MailerArgs::try_parse_from([
            "send-email",
            "--to",
            "not-an-address",
            "--subject",
            "s",
            "--markdown-body",
            "b",
            "--from",
            "bot@example.com",
            "--api-key",
            "k",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_newline_joined_attachments_match_separate_values() {
        let joined = options(&["--attachments", "a.txt\nb.txt"]);
        let separate = options(&["--attachments", "a.txt", "b.txt"]);
        assert_eq!(joined.attachments, separate.attachments);
        assert_eq!(
            joined.attachments,
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );
    }

    #[test]
    fn test_newline_split_trims_and_drops_empty_lines() {
        let opts = options(&["--attachments", "\n  a.txt \n\nb.txt\n"]);
        assert_eq!(
            opts.attachments,
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );
    }

    #[test]
    fn test_empty_attachment_value_means_no_attachments() {
        assert!(options(&["--attachments", ""]).attachments.is_empty());
        assert!(options(&["--attachments"]).attachments.is_empty());
    }

    #[test]
    fn test_newline_joined_dispositions() {
        let opts = options(&["--attachments-disposition", "inline\nattachment"]);
        assert_eq!(
            opts.dispositions,
            vec![Disposition::Inline, Disposition::Attachment]
        );
    }

    #[test]
    fn test_empty_disposition_is_unset_sentinel() {
        let opts = options(&["--attachments-disposition", ""]);
        assert_eq!(opts.dispositions, vec![Disposition::Unset]);
    }

    #[test]
    fn test_disposition_flag_without_values() {
        let opts = options(&["--attachments-disposition"]);
        assert!(opts.dispositions.is_empty());
    }

    #[test]
    fn test_invalid_disposition_rejected() {
        let err = parse(&["--attachments-disposition", "sideways"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = parse(&["--attachments-disposition", "inline\nsideways"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", options(&[]));
        assert!(!rendered.contains("SG.key"));
        assert!(rendered.contains("<redacted>"));
    }
}
