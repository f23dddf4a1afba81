use super::session::{Notice, UiSession};
use pdf_kb_core::{SourceType, EXAMPLE_QUESTIONS};
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; }
aside { width: 18rem; padding: 1rem; background: #f3f4f6; min-height: 100vh; }
main { flex: 1; padding: 1rem 2rem; }
.columns { display: flex; gap: 2rem; }
.columns > section { flex: 1; }
.notice { padding: .5rem .75rem; border-radius: 4px; margin: .25rem 0; }
.success { background: #dcfce7; } .info { background: #dbeafe; }
.warning { background: #fef9c3; } .error { background: #fee2e2; }
textarea, input[type=text] { width: 100%; box-sizing: border-box; }
button { margin: .25rem 0; }
"#;

/// Renders the whole page for `session`; `notices` are the ones taken for this view.
pub fn render(session: &UiSession, notices: &[Notice]) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>PDF Knowledge Base</title>\
         <style>{STYLE}</style></head><body>"
    );

    render_sidebar(&mut html, session);

    html.push_str("<main><h1>PDF Knowledge Base</h1>");
    html.push_str(
        "<p><em>Upload PDFs (books, transcripts, notes) and ask grounded questions powered by File Search.</em></p>",
    );
    let active = if session.store_name.is_empty() {
        "Not set"
    } else {
        session.store_name.as_str()
    };
    let _ = write!(
        html,
        "<div class=\"notice success\">Active store: <code>{}</code></div>",
        escape(active)
    );
    for notice in notices {
        render_notice(&mut html, notice);
    }

    html.push_str("<div class=\"columns\">");
    render_ingest(&mut html);
    render_query(&mut html, session);
    html.push_str("</div>");

    render_history(&mut html, session);
    html.push_str("</main></body></html>");
    html
}

fn render_sidebar(html: &mut String, session: &UiSession) {
    let _ = write!(
        html,
        "<aside><h3>Store Settings</h3><form method=\"post\" action=\"/settings\">\
         <label>Existing File Search store (optional)<input type=\"text\" name=\"store_name\" value=\"{}\" \
         placeholder=\"fileSearchStores/...\"></label>\
         <label>Store display name<input type=\"text\" name=\"display_name\" value=\"{}\"></label>\
         <button type=\"submit\">Save</button></form>\
         <p class=\"notice info\">Need a new store? Leave the store field empty and ingest at least one PDF. \
         Any newly created store name will appear here once ingestion finishes.</p></aside>",
        escape(&session.store_name),
        escape(&session.display_name)
    );
}

fn render_notice(html: &mut String, notice: &Notice) {
    let (class, message) = match notice {
        Notice::Success(message) => ("success", message),
        Notice::Info(message) => ("info", message),
        Notice::Warning(message) => ("warning", message),
        Notice::Error(message) => ("error", message),
    };
    let _ = write!(html, "<div class=\"notice {class}\">{}</div>", escape(message));
}

fn render_ingest(html: &mut String) {
    html.push_str(
        "<section><h2>1. Add knowledge</h2>\
         <details><summary>How ingestion works</summary><ul>\
         <li>Drop any PDF (book chapters, exported transcripts, notes) into the uploader.</li>\
         <li>Leave the store blank to create a new File Search store automatically.</li>\
         <li>Re-run ingestion whenever you add new material; existing files stay indexed.</li>\
         </ul></details>\
         <form method=\"post\" action=\"/ingest\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"files\" accept=\".pdf,application/pdf\" multiple>\
         <label>Tag as <select name=\"source_type\">",
    );
    for source in SourceType::ALL {
        let _ = write!(html, "<option value=\"{source}\">{source}</option>");
    }
    html.push_str(
        "</select></label><br><button type=\"submit\">Ingest selected PDFs</button></form></section>",
    );
}

fn render_query(html: &mut String, session: &UiSession) {
    html.push_str("<section><h2>2. Ask grounded questions</h2>");
    html.push_str("<p>Choose a prompt below or type your own, then run it against your File Search store.</p>");

    for (index, example) in EXAMPLE_QUESTIONS.iter().enumerate() {
        let _ = write!(
            html,
            "<form method=\"post\" action=\"/use\"><em>{text}</em>\
             <input type=\"hidden\" name=\"question\" value=\"{text}\">\
             <button type=\"submit\">Use example {n}</button></form>",
            text = escape(example),
            n = index + 1
        );
    }

    // The suggest button shares this form so it sees the typed store and sources.
    let _ = write!(
        html,
        "<form method=\"post\" action=\"/ask\">\
         <label>Store to query<input type=\"text\" name=\"store_name\" value=\"{}\"></label>\
         <fieldset><legend>Sources to consult</legend>",
        escape(&session.store_name)
    );
    for source in SourceType::ALL {
        let checked = if session.source_filter == Some(source) { " checked" } else { "" };
        let _ = write!(
            html,
            "<label><input type=\"radio\" name=\"sources\" value=\"{source}\"{checked}> {}</label>",
            source_label(source)
        );
    }
    let all_checked = if session.source_filter.is_none() { " checked" } else { "" };
    let _ = write!(
        html,
        "<label><input type=\"radio\" name=\"sources\" value=\"all\"{all_checked}> All sources</label></fieldset>\
         <label>Question<textarea name=\"question\" rows=\"6\" \
         placeholder=\"e.g. Summarize the author's view on dreams.\">{}</textarea></label>\
         <button type=\"submit\">Get answer</button>\
         <button type=\"submit\" formaction=\"/suggest\">Suggest new questions from my PDFs</button></form>",
        escape(&session.question_text)
    );

    if !session.suggestions.is_empty() {
        html.push_str("<h4>AI tutor suggestions</h4>");
        for (index, suggestion) in session.suggestions.iter().enumerate() {
            let _ = write!(
                html,
                "<form method=\"post\" action=\"/use\">{n}. {text}\
                 <input type=\"hidden\" name=\"question\" value=\"{text}\">\
                 <button type=\"submit\">Use suggestion {n}</button></form>",
                n = index + 1,
                text = escape(suggestion)
            );
        }
        html.push_str(
            "<form method=\"post\" action=\"/suggestions/clear\"><button type=\"submit\">Clear suggestions</button></form>",
        );
    }

    if let Some(last) = &session.last_answer {
        html.push_str("<h3>Answer</h3>");
        if last.answer.text.trim().is_empty() {
            html.push_str("<p><em>No answer returned.</em></p>");
        } else {
            let _ = write!(html, "<p style=\"white-space: pre-wrap\">{}</p>", escape(&last.answer.text));
        }

        html.push_str("<h3>Citations</h3>");
        if !last.answer.is_grounded() {
            html.push_str("<p><em>No citations returned.</em></p>");
        }
        for (index, citation) in last.answer.citations.iter().enumerate() {
            let _ = write!(
                html,
                "<details><summary>Citation {}: {}</summary><p>{}</p></details>",
                index + 1,
                escape(&citation.title),
                escape(&citation.snippet())
            );
        }
    }
    html.push_str("</section>");
}

fn render_history(html: &mut String, session: &UiSession) {
    if session.history.is_empty() {
        return;
    }

    html.push_str("<h3>Recent questions</h3>");
    for (index, entry) in session.history.entries().iter().enumerate() {
        let grounded = if entry.grounded { "" } else { " (no citations)" };
        let _ = write!(
            html,
            "<details><summary>{}. {}{grounded}</summary><p>{}</p></details>",
            index + 1,
            escape(&entry.question),
            escape(&entry.answer)
        );
    }
    html.push_str(
        "<form method=\"post\" action=\"/history/clear\"><button type=\"submit\">Clear history</button></form>",
    );
}

fn source_label(source: SourceType) -> &'static str {
    match source {
        SourceType::Book => "Books (PDFs only)",
        SourceType::Transcript => "Transcripts",
        SourceType::Notes => "Notes",
    }
}

/// `"all"` (or anything unparseable) means no filter.
pub fn parse_sources(value: &str) -> Option<SourceType> {
    value.parse().ok()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
