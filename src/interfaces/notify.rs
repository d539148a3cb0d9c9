use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::{AuthConfig, EmailSettings, SmsSettings};
use crate::vendors;

/// One outbound alert channel. Channels are tried in order; a failure in
/// one must not prevent attempting the next.
pub trait Notifier {
    fn name(&self) -> &'static str;
    fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Walk the channel list until one delivery succeeds. If every channel
/// fails, the failures are logged and the run relies on external log
/// monitoring.
pub fn alert_failure(notifiers: &[Box<dyn Notifier>], subject: &str, body: &str) {
    for notifier in notifiers {
        match notifier.send(subject, body) {
            Ok(()) => {
                log::info!("Failure alert sent via {}", notifier.name());
                return;
            }
            Err(e) => log::error!("Error sending {} notification: {e:#}", notifier.name()),
        }
    }
    log::error!("No notification channel succeeded");
}

pub fn notifiers_from_config(config: &AuthConfig) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
    if let Some(email) = &config.email {
        match EmailNotifier::new(email) {
            Ok(n) => notifiers.push(Box::new(n)),
            Err(e) => log::error!("Cannot set up email notifier: {e:#}"),
        }
    }
    if let Some(sms) = &config.sms {
        match SmsNotifier::new(sms.clone()) {
            Ok(n) => notifiers.push(Box::new(n)),
            Err(e) => log::error!("Cannot set up SMS notifier: {e:#}"),
        }
    }
    notifiers
}

pub struct EmailNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    recipients: Vec<String>,
}

impl EmailNotifier {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let from: Mailbox = settings
            .from_address
            .parse()
            .with_context(|| format!("invalid from_address: {}", settings.from_address))?;

        let credentials = Credentials::new(
            settings.smtp_username.clone(),
            settings.smtp_password.clone(),
        );
        let transport = if settings.use_tls {
            SmtpTransport::starttls_relay(&settings.smtp_host)
                .with_context(|| format!("cannot create SMTP relay for {}", settings.smtp_host))?
                .port(settings.smtp_port)
                .credentials(credentials)
                .build()
        } else {
            SmtpTransport::builder_dangerous(&settings.smtp_host)
                .port(settings.smtp_port)
                .credentials(credentials)
                .build()
        };

        Ok(EmailNotifier {
            transport,
            from,
            recipients: settings.recipients.clone(),
        })
    }
}

impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    fn send(&self, subject: &str, body: &str) -> Result<()> {
        let mut delivered = 0;
        for recipient in &self.recipients {
            let to: Mailbox = match recipient.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    log::error!("Invalid recipient address {recipient}: {e}");
                    continue;
                }
            };
            let message = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(subject)
                .body(body.to_string())
                .context("cannot build email message")?;
            match self.transport.send(&message) {
                Ok(_) => delivered += 1,
                Err(e) => log::error!("Error sending email to {recipient}: {e}"),
            }
        }
        if delivered == 0 {
            anyhow::bail!("email was not delivered to any recipient");
        }
        Ok(())
    }
}

/// Text-message fallback via an HTTP gateway. Only the subject line is
/// sent; the full diagnostics are in the log and the email body.
pub struct SmsNotifier {
    agent: ureq::Agent,
    settings: SmsSettings,
}

impl SmsNotifier {
    pub fn new(settings: SmsSettings) -> Result<Self> {
        Ok(SmsNotifier {
            agent: vendors::agent()?,
            settings,
        })
    }
}

impl Notifier for SmsNotifier {
    fn name(&self) -> &'static str {
        "sms"
    }

    fn send(&self, subject: &str, _body: &str) -> Result<()> {
        self.agent
            .post(&self.settings.gateway_url)
            .send_form(&[
                ("api_key", self.settings.api_key.as_str()),
                ("to", self.settings.to.as_str()),
                ("message", subject),
            ])
            .context("SMS gateway request failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubNotifier {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Notifier for StubNotifier {
        fn name(&self) -> &'static str {
            self.name
        }

        fn send(&self, _subject: &str, _body: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("channel down")
            }
            Ok(())
        }
    }

    fn stub(name: &'static str, fail: bool) -> (Box<dyn Notifier>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(StubNotifier {
                name,
                fail,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[test]
    fn first_successful_channel_stops_the_chain() {
        let (email, email_calls) = stub("email", false);
        let (sms, sms_calls) = stub("sms", false);

        alert_failure(&[email, sms], "subject", "body");
        assert_eq!(email_calls.load(Ordering::SeqCst), 1);
        assert_eq!(sms_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_channel_falls_back_to_the_next() {
        let (email, email_calls) = stub("email", true);
        let (sms, sms_calls) = stub("sms", false);

        alert_failure(&[email, sms], "subject", "body");
        assert_eq!(email_calls.load(Ordering::SeqCst), 1);
        assert_eq!(sms_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn all_channels_failing_is_contained() {
        let (email, _) = stub("email", true);
        let (sms, sms_calls) = stub("sms", true);

        alert_failure(&[email, sms], "subject", "body");
        assert_eq!(sms_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sms_gateway_delivery() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/send")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("to".into(), "+15551234567".into()),
                mockito::Matcher::UrlEncoded("message".into(), "pvpipe failure".into()),
            ]))
            .expect(1)
            .create();

        let notifier = SmsNotifier {
            agent: ureq::Agent::new(),
            settings: SmsSettings {
                gateway_url: format!("{}/send", server.url()),
                api_key: "sms-key".to_string(),
                to: "+15551234567".to_string(),
            },
        };
        notifier.send("pvpipe failure", "full diagnostics").unwrap();
        mock.assert();
    }
}
