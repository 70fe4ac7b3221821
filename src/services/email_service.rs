use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::models::CodeType;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Sends transactional mail. Without an SMTP relay, messages are only logged.
#[derive(Clone)]
pub struct EmailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl EmailService {
    pub fn new(smtp: Option<SmtpConfig>, from_email: &str) -> Result<Self, EmailError> {
        let from: Mailbox = from_email
            .parse()
            .map_err(|_| EmailError::InvalidEmailAddress(from_email.to_string()))?;

        let transport = match smtp {
            Some(config) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                    .map_err(|e| EmailError::SmtpConnectionFailed(e.to_string()))?
                    .port(config.port);
                if let (Some(username), Some(password)) = (config.username, config.password) {
                    builder = builder.credentials(Credentials::new(username, password));
                }
                Some(builder.build())
            }
            None => None,
        };

        Ok(Self { transport, from })
    }

    pub async fn send_confirmation_code(
        &self,
        to_email: &str,
        username: &str,
        code: &str,
        code_type: CodeType,
    ) -> Result<(), EmailError> {
        let email = render_confirmation_email(username, code, code_type);
        self.send_email(to_email, &email).await
    }

    async fn send_email(&self, to_email: &str, email: &RenderedEmail) -> Result<(), EmailError> {
        let Some(transport) = &self.transport else {
            info!("SMTP not configured, email to {} not sent: {}", to_email, email.subject);
            return Ok(());
        };

        let to: Mailbox = to_email
            .parse()
            .map_err(|_| EmailError::InvalidEmailAddress(to_email.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| EmailError::EmailSendingFailed(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| EmailError::EmailSendingFailed(e.to_string()))?;

        info!("Sent email to {}: {}", to_email, email.subject);
        Ok(())
    }
}

pub fn render_confirmation_email(username: &str, code: &str, code_type: CodeType) -> RenderedEmail {
    match code_type {
        CodeType::AccountVerification => RenderedEmail {
            subject: "Confirm your Beast Physique account".to_string(),
            body: format!(
                "Hi {},\n\nWelcome to Beast Physique! Your confirmation code is {}.\n\n\
                 Enter it in the app to verify your email address.\n",
                username, code
            ),
        },
        CodeType::ForgottenPassword => RenderedEmail {
            subject: "Reset your Beast Physique password".to_string(),
            body: format!(
                "Hi {},\n\nUse the code {} to reset your password.\n\n\
                 If you did not ask for a reset, you can ignore this email.\n",
                username, code
            ),
        },
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("SMTP connection failed: {0}")]
    SmtpConnectionFailed(String),
    #[error("Email sending failed: {0}")]
    EmailSendingFailed(String),
    #[error("Invalid email address: {0}")]
    InvalidEmailAddress(String),
}
