// Operator notifications
use crate::api::TelegramNotifier;
use crate::error::NotifyError;

/// One-way message channel to the operator
///
/// Delivery failures are reported to the caller, which logs them; they never
/// influence trading.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "trendbot::notify", "{}", strip_markup(text));
        Ok(())
    }
}

/// Notifier chosen at startup
pub enum OperatorChannel {
    Telegram(TelegramNotifier),
    Log(LogNotifier),
}

impl Notifier for OperatorChannel {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        match self {
            OperatorChannel::Telegram(t) => t.notify(text).await,
            OperatorChannel::Log(l) => l.notify(text).await,
        }
    }
}

/// Remove the HTML tags used for Telegram formatting
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<b>BUY</b> opened"), "BUY opened");
        assert_eq!(strip_markup("no tags"), "no tags");
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        tokio_test::assert_ok!(LogNotifier.notify("<i>hello</i>").await);
    }
}
