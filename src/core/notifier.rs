use std::collections::HashMap;

use serde_json::json;
use tracing::error;

use super::differ::DiffRecord;

const MAX_MESSAGE_LENGTH: usize = 4096;
const MAX_PAGES_TO_LIST: usize = 10;

/// Sends change notifications through the Telegram bot API.
///
/// Delivery is best-effort: failures are logged and reported as a boolean so
/// a broken bot never aborts a run.
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Format the notification message with Telegram HTML markup.
    ///
    /// Lists up to 10 changed pages with their summaries (and the first line
    /// of analysis when present), then a link to the full report. Telegram
    /// caps messages at 4096 characters.
    pub fn format_message(
        &self,
        diffs: &[DiffRecord],
        report_date: &str,
        report_url: &str,
        analyses: &HashMap<String, String>,
    ) -> String {
        let changed: Vec<&DiffRecord> = diffs.iter().filter(|d| d.has_changes).collect();
        let count = changed.len();

        let mut lines = vec![
            format!("<b>Documentation Updated ({})</b>", report_date),
            String::new(),
            format!("{} {} changed", count, if count == 1 { "page" } else { "pages" }),
            String::new(),
            "<b>Changed Pages:</b>".to_string(),
        ];

        for diff in changed.iter().take(MAX_PAGES_TO_LIST) {
            lines.push(format!(
                "\u{2022} {}: {}",
                escape_html(&diff.page_slug),
                escape_html(&diff.summary)
            ));

            if let Some(analysis) = analyses.get(&diff.page_slug) {
                let first_line: String = analysis
                    .lines()
                    .next()
                    .unwrap_or("")
                    .chars()
                    .take(100)
                    .collect();
                lines.push(format!("  <i>{}</i>", escape_html(&first_line)));
            }
        }

        if count > MAX_PAGES_TO_LIST {
            lines.push(format!("... and {} more", count - MAX_PAGES_TO_LIST));
        }

        lines.push(String::new());
        lines.push(format!("<a href=\"{}\">View Full Diff Report</a>", report_url));

        truncate_message(lines.join("\n"))
    }

    /// Send a change notification. Returns whether delivery succeeded.
    pub async fn send_notification(
        &self,
        diffs: &[DiffRecord],
        report_date: &str,
        report_url: &str,
        analyses: &HashMap<String, String>,
    ) -> bool {
        let message = self.format_message(diffs, report_date, report_url, analyses);
        self.send(&message, true).await
    }

    /// Send an error notification so a broken run is noticed.
    pub async fn send_error_notification(&self, error_message: &str) -> bool {
        let message = format!(
            "<b>Docwatch Error</b>\n\n{}",
            escape_html(error_message)
        );
        self.send(&truncate_message(message), false).await
    }

    async fn send(&self, message: &str, disable_preview: bool) -> bool {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "HTML",
            "disable_web_page_preview": disable_preview,
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!("Telegram API error {}: {}", status, body);
                false
            }
            Err(e) => {
                error!("Failed to send Telegram notification: {}", e);
                false
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn truncate_message(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_LENGTH {
        return message;
    }
    let truncated: String = message.chars().take(MAX_MESSAGE_LENGTH - 3).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> TelegramNotifier {
        TelegramNotifier::new("token", "12345")
    }

    fn diff(slug: &str) -> DiffRecord {
        DiffRecord {
            source_id: "claude".to_string(),
            source_name: "Claude Docs".to_string(),
            page_slug: slug.to_string(),
            has_changes: true,
            old_text: String::new(),
            new_text: String::new(),
            unified_diff: String::new(),
            inline_diff: String::new(),
            added_count: 1,
            removed_count: 0,
            summary: "+1 lines".to_string(),
        }
    }

    #[test]
    fn message_lists_pages_and_link() {
        let diffs = vec![diff("overview"), diff("settings")];
        let message = notifier().format_message(
            &diffs,
            "2026-01-03",
            "https://user.github.io/repo/2026/01/03/",
            &HashMap::new(),
        );

        assert!(message.contains("<b>Documentation Updated (2026-01-03)</b>"));
        assert!(message.contains("2 pages changed"));
        assert!(message.contains("\u{2022} overview: +1 lines"));
        assert!(message.contains("\u{2022} settings: +1 lines"));
        assert!(message.contains("href=\"https://user.github.io/repo/2026/01/03/\""));
    }

    #[test]
    fn singular_page_count() {
        let message =
            notifier().format_message(&[diff("overview")], "2026-01-03", "url", &HashMap::new());
        assert!(message.contains("1 page changed"));
    }

    #[test]
    fn unchanged_diffs_are_skipped() {
        let mut quiet = diff("quiet");
        quiet.has_changes = false;
        let message = notifier().format_message(
            &[diff("overview"), quiet],
            "2026-01-03",
            "url",
            &HashMap::new(),
        );
        assert!(message.contains("1 page changed"));
        assert!(!message.contains("quiet"));
    }

    #[test]
    fn long_page_lists_are_capped() {
        let diffs: Vec<DiffRecord> = (0..13).map(|i| diff(&format!("page-{}", i))).collect();
        let message = notifier().format_message(&diffs, "2026-01-03", "url", &HashMap::new());

        assert!(message.contains("page-9"));
        assert!(!message.contains("\u{2022} page-10:"));
        assert!(message.contains("... and 3 more"));
    }

    #[test]
    fn analysis_first_line_is_included() {
        let mut analyses = HashMap::new();
        analyses.insert(
            "overview".to_string(),
            "New auth flow documented.\nMore detail below.".to_string(),
        );
        let message =
            notifier().format_message(&[diff("overview")], "2026-01-03", "url", &analyses);

        assert!(message.contains("<i>New auth flow documented.</i>"));
        assert!(!message.contains("More detail below."));
    }

    #[test]
    fn html_is_escaped() {
        let mut tricky = diff("generic<T>");
        tricky.summary = "+1 lines & <markup>".to_string();
        let message = notifier().format_message(&[tricky], "2026-01-03", "url", &HashMap::new());

        assert!(message.contains("generic&lt;T&gt;"));
        assert!(message.contains("+1 lines &amp; &lt;markup&gt;"));
        assert!(!message.contains("<markup>"));
    }

    #[test]
    fn oversized_messages_are_truncated() {
        let mut big = diff("big");
        big.summary = "x".repeat(10_000);
        let message = notifier().format_message(&[big], "2026-01-03", "url", &HashMap::new());

        assert_eq!(message.chars().count(), MAX_MESSAGE_LENGTH);
        assert!(message.ends_with("..."));
    }
}
