use crate::config::MailSettings;
use crate::error::MailError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use log::{error, info};
use std::time::Duration;

/// SMTP reply codes that mean the relay refused our credentials.
const AUTH_FAILURE_CODES: [&str; 4] = ["530", "534", "535", "538"];

/// Sends order exports through the configured relay.
pub struct Mailer {
    smtp: SmtpTransport,
    from: Mailbox,
    host: String,
}

impl Mailer {
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let creds = Credentials::new(settings.username.clone(), settings.password.clone());

        let tls_parameters = TlsParameters::new(settings.host.clone())
            .map_err(|e| MailError::Connect(e.to_string()))?;

        let smtp = SmtpTransport::relay(&settings.host)
            .map_err(|e| MailError::Connect(e.to_string()))?
            .credentials(creds)
            .port(settings.port)
            .tls(Tls::Wrapper(tls_parameters))
            .timeout(Some(Duration::from_secs(settings.timeout_secs)))
            .build();

        let from = settings
            .from
            .parse()
            .map_err(|_| MailError::Address(settings.from.clone()))?;

        Ok(Mailer {
            smtp,
            from,
            host: settings.host.clone(),
        })
    }

    /// Send one message carrying one attachment.
    ///
    /// Connects and authenticates first so a dead relay or bad credentials
    /// are reported apart from a rejected message. Blocks until the relay
    /// answers or the configured timeout elapses.
    pub fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        attachment: Vec<u8>,
        attachment_name: &str,
    ) -> Result<(), MailError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|_| MailError::Address(recipient.to_string()))?;
        let content_type =
            ContentType::parse("text/csv").map_err(|e| MailError::Send(e.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(
                        Attachment::new(attachment_name.to_string()).body(attachment, content_type),
                    ),
            )
            .map_err(|e| MailError::Send(e.to_string()))?;

        check_connection(&self.host, self.smtp.test_connection())?;

        self.smtp.send(&email).map_err(|e| {
            error!("mail relay {} refused message: {}", self.host, e);
            MailError::Send(e.to_string())
        })?;

        info!("emailed {} to {}", attachment_name, recipient);
        Ok(())
    }
}

/// Turn the relay probe result into a send precondition.
fn check_connection(
    host: &str,
    probe: Result<bool, lettre::transport::smtp::Error>,
) -> Result<(), MailError> {
    match probe {
        Ok(true) => Ok(()),
        Ok(false) => {
            error!("mail relay {} did not answer the connection check", host);
            Err(MailError::Connect(format!("{} is not accepting connections", host)))
        }
        Err(e) => {
            error!("mail relay {} unavailable: {}", host, e);
            Err(classify_connect_error(&e))
        }
    }
}

fn classify_connect_error(e: &lettre::transport::smtp::Error) -> MailError {
    let auth_rejected = e
        .status()
        .map(|code| AUTH_FAILURE_CODES.contains(&code.to_string().as_str()))
        .unwrap_or(false);

    if auth_rejected || e.is_permanent() {
        MailError::Auth(e.to_string())
    } else {
        MailError::Connect(e.to_string())
    }
}
