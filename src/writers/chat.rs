use crate::writers::Writer;

pub struct ChatWriter;

impl Writer for ChatWriter {
    fn name(&self) -> &str {
        "Chat-Writer"
    }

    fn system_prompt(&self) -> &str {
        r#"You are a helpful financial-briefing assistant.
Answer questions about markets, tickers and the client's daily reports.
Be concise and factual. If you do not know, say so. Plain text only, no JSON.
"#
    }
}
