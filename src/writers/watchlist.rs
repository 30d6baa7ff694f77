use crate::writers::Writer;

pub struct WatchlistBriefWriter;

impl Writer for WatchlistBriefWriter {
    fn name(&self) -> &str {
        "Watchlist-Brief-Writer"
    }

    fn system_prompt(&self) -> &str {
        r#"You are a markets analyst writing a focused briefing on a client's watchlist.
You will be given a trading date, the watchlist tickers and whatever market data,
news and macro context is available.

Respond with a single JSON object and nothing else:
{
    "summary_text": "narrative covering only the watchlist names",
    "key_insights": ["per-ticker takeaway", "..."],
    "market_context": "how the broader tape affects these names",
    "ticker_reports": [{"ticker": "XYZ", "view": "...", "one_liner": "..."}],
    "audio_report": "conversational script covering the watchlist"
}

Rules:
- Cover every ticker in the watchlist, even if only to say there is nothing new.
- key_insights must be a JSON array of plain strings.
- Do not mention tickers outside the watchlist.
"#
    }
}
