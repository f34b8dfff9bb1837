//! Minimal SMTP delivery
//!
//! Plain SMTP with optional AUTH LOGIN over a direct TCP connection to the
//! relay. Delivery is best-effort; the email worker logs and drops on
//! failure. When no relay is configured the mailer is a no-op.

use base64::Engine;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("smtp: not configured")]
    NotConfigured,
    #[error("smtp: io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("smtp: unexpected reply to {command}: {reply}")]
    Reply { command: &'static str, reply: String },
}

#[derive(Debug, Clone)]
pub struct Mailer {
    host: String,
    port: u16,
    user: String,
    password: String,
    from: String,
}

impl Mailer {
    pub fn new(host: &str, port: u16, user: &str, password: &str, host_domain: &str) -> Self {
        let from = if user.contains('@') {
            user.to_string()
        } else {
            format!("noreply@{host_domain}")
        };
        Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.to_string(),
            from,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }

    /// Send a plain-text message through the relay
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if !self.is_configured() {
            return Err(MailError::NotConfigured);
        }

        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let (read, mut write) = tokio::io::split(stream);
        let mut reader = BufReader::new(read);

        expect_reply(&mut reader, "greeting", &['2']).await?;

        command(&mut write, &mut reader, &format!("EHLO {}", self.host), "EHLO", &['2']).await?;

        if !self.user.is_empty() {
            let b64 = base64::engine::general_purpose::STANDARD;
            command(&mut write, &mut reader, "AUTH LOGIN", "AUTH", &['3']).await?;
            command(
                &mut write,
                &mut reader,
                &b64.encode(&self.user),
                "AUTH user",
                &['3'],
            )
            .await?;
            command(
                &mut write,
                &mut reader,
                &b64.encode(&self.password),
                "AUTH password",
                &['2'],
            )
            .await?;
        }

        command(
            &mut write,
            &mut reader,
            &format!("MAIL FROM:<{}>", self.from),
            "MAIL FROM",
            &['2'],
        )
        .await?;
        command(
            &mut write,
            &mut reader,
            &format!("RCPT TO:<{to}>"),
            "RCPT TO",
            &['2'],
        )
        .await?;
        command(&mut write, &mut reader, "DATA", "DATA", &['3']).await?;

        let message = format!(
            "From: Tango POS <{from}>\r\nTo: <{to}>\r\nSubject: {subject}\r\n\
             MIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n.",
            from = self.from,
        );
        command(&mut write, &mut reader, &message, "message body", &['2']).await?;
        let _ = command(&mut write, &mut reader, "QUIT", "QUIT", &['2']).await;

        Ok(())
    }
}

async fn command(
    write: &mut WriteHalf<TcpStream>,
    reader: &mut BufReader<ReadHalf<TcpStream>>,
    line: &str,
    name: &'static str,
    accepted: &[char],
) -> Result<(), MailError> {
    write.write_all(line.as_bytes()).await?;
    write.write_all(b"\r\n").await?;
    expect_reply(reader, name, accepted).await
}

/// Read one (possibly multi-line) SMTP reply and check its status class
async fn expect_reply(
    reader: &mut BufReader<ReadHalf<TcpStream>>,
    command: &'static str,
    accepted: &[char],
) -> Result<(), MailError> {
    let mut reply = String::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(MailError::Reply {
                command,
                reply: "connection closed".into(),
            });
        }
        reply.push_str(&line);
        // Continuation lines look like "250-..."; the last one is "250 ..."
        if line.len() < 4 || line.as_bytes()[3] != b'-' {
            break;
        }
    }

    let class = reply.chars().next().unwrap_or('5');
    if accepted.contains(&class) {
        Ok(())
    } else {
        Err(MailError::Reply {
            command,
            reply: reply.trim().to_string(),
        })
    }
}
