//! Provider payload for a single message (v3 `mail/send` schema).

use lettre::message::Mailbox;
use serde::Serialize;

use crate::attachment::Disposition;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Mailbox> for EmailAddress {
    fn from(mailbox: &Mailbox) -> Self {
        Self {
            email: mailbox.email.to_string(),
            name: mailbox.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Personalization {
    pub to: Vec<EmailAddress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

/// A base64 encoded file ready to be sent.
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub content: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub filename: String,
    pub disposition: Disposition,
    pub content_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub personalizations: Vec<Personalization>,
    pub from: EmailAddress,
    pub subject: String,
    pub content: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Build a message with an HTML body. All recipients share one personalization.
    pub fn new(from: &Mailbox, to: &[Mailbox], subject: &str, html: String) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: to.iter().map(EmailAddress::from).collect(),
            }],
            from: from.into(),
            subject: subject.to_string(),
            content: vec![Content {
                content_type: "text/html".to_string(),
                value: html,
            }],
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    /// Every recipient across all personalizations.
    pub fn recipients(&self) -> impl Iterator<Item = &EmailAddress> {
        self.personalizations.iter().flat_map(|p| p.to.iter())
    }
}
