use askama::Template;
use pulldown_cmark::{html, Options, Parser};

/// Convert markdown text to HTML
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}

/// Chat message posted when a signal is published.
#[derive(Template)]
#[template(
    source = "🚀 **{{ side }} {{ symbol }}**\n📊 Entry: {{ entry }} TP: {{ take_profit }} SL: {{ stop_loss }}\n🎯 R:R ≈ {{ risk_reward }}\n⏰ {{ timeframe }}\n[SIGNAL_ID:{{ signal_id }}]",
    ext = "txt",
    escape = "none"
)]
pub struct SignalAnnouncement {
    pub signal_id: i32,
    pub side: String,
    pub symbol: String,
    pub entry: String,
    pub take_profit: String,
    pub stop_loss: String,
    pub risk_reward: String,
    pub timeframe: String,
}

/// Chat message posted when a signal is closed.
#[derive(Template)]
#[template(
    source = "📊 SIGNAL FERMÉ 📊\n\nSignal {{ side }} {{ symbol }} fermé\nRésultat: {{ result }}\n{% if let Some(pnl) = pnl %}P&L: {{ pnl }}\n{% endif %}[SIGNAL_ID:{{ signal_id }}]",
    ext = "txt",
    escape = "none"
)]
pub struct SignalClosure {
    pub signal_id: i32,
    pub side: String,
    pub symbol: String,
    /// `🟢 GAGNANT`, `🔴 PERDANT` or `🔵 BREAK-EVEN`
    pub result: String,
    pub pnl: Option<String>,
}

/// Extract the signal id an announcement message refers to.
pub fn referenced_signal_id(content: &str) -> Option<i32> {
    let start = content.find("[SIGNAL_ID:")? + "[SIGNAL_ID:".len();
    let end = content[start..].find(']')? + start;
    content[start..end].trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_render() {
        let text = SignalAnnouncement {
            signal_id: 42,
            side: "BUY".into(),
            symbol: "NAS100".into(),
            entry: "18000".into(),
            take_profit: "18100".into(),
            stop_loss: "17950".into(),
            risk_reward: "2.00".into(),
            timeframe: "1 min".into(),
        }
        .render()
        .unwrap();
        assert!(text.starts_with("🚀 **BUY NAS100**\n"));
        assert!(text.contains("📊 Entry: 18000 TP: 18100 SL: 17950\n"));
        assert!(text.contains("🎯 R:R ≈ 2.00\n"));
        assert!(text.ends_with("[SIGNAL_ID:42]"));
        assert_eq!(referenced_signal_id(&text), Some(42));
    }

    #[test]
    fn test_closure_render_skips_pnl_for_break_even() {
        let be = SignalClosure {
            signal_id: 7,
            side: "SELL".into(),
            symbol: "EURUSD".into(),
            result: "🔵 BREAK-EVEN".into(),
            pnl: None,
        }
        .render()
        .unwrap();
        assert!(!be.contains("P&L"));
        assert!(be.ends_with("[SIGNAL_ID:7]"));

        let win = SignalClosure {
            signal_id: 8,
            side: "BUY".into(),
            symbol: "BTC".into(),
            result: "🟢 GAGNANT".into(),
            pnl: Some("+$50.00".into()),
        }
        .render()
        .unwrap();
        assert!(win.contains("P&L: +$50.00\n"));
    }

    #[test]
    fn test_markdown_bold() {
        assert_eq!(markdown_to_html("**BUY**"), "<p><strong>BUY</strong></p>\n");
    }

    #[test]
    fn test_referenced_signal_id_absent() {
        assert_eq!(referenced_signal_id("hello"), None);
        assert_eq!(referenced_signal_id("[SIGNAL_ID:abc]"), None);
    }
}
