use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::services::ServiceError;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_email(&self, to_email: &str, code: &str)
        -> Result<(), ServiceError>;

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        code: &str,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| ServiceError::EmailError(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        ServiceError::EmailError(e.to_string())
                    })?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| {
                    ServiceError::EmailError(e.to_string())
                })?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| ServiceError::EmailError(e.to_string()))?;

        // Send in the blocking pool so SMTP I/O never stalls the runtime.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(ServiceError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_verification_email(
        &self,
        to_email: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        let html_body = format!(
            r#"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Verify your email</h2>
                    <p>Your verification code is:</p>
                    <p style="font-size: 24px; letter-spacing: 4px; font-weight: bold;">{}</p>
                    <p style="color: #666; font-size: 12px;">
                        This code expires in 10 minutes. If you didn't register, ignore this email.
                    </p>
                </body>
            </html>"#,
            code
        );

        let plain_body = format!(
            "Verify your email\n\nYour verification code is: {}\n\nThis code expires in 10 minutes. If you didn't register, ignore this email.",
            code
        );

        self.send_email(to_email, "Verify Your Email Address", &plain_body, &html_body)
            .await
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        let html_body = format!(
            r#"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Password reset requested</h2>
                    <p>Your reset code is:</p>
                    <p style="font-size: 24px; letter-spacing: 4px; font-weight: bold;">{}</p>
                    <p style="color: #666; font-size: 12px;">
                        This code expires in 15 minutes. If you didn't request a reset, ignore this email.
                    </p>
                </body>
            </html>"#,
            code
        );

        let plain_body = format!(
            "Password reset requested\n\nYour reset code is: {}\n\nThis code expires in 15 minutes. If you didn't request a reset, ignore this email.",
            code
        );

        self.send_email(to_email, "Reset Your Password", &plain_body, &html_body)
            .await
    }
}

/// Email provider that records sends instead of performing them.
pub struct MockEmailService {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Default for MockEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_email(
        &self,
        to_email: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }
}
