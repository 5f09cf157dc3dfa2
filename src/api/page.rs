use crate::config::Credentials;
use crate::workflow::Outcome;

/// Which API keys the server already holds for this browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedKeys {
    pub llm: bool,
    pub embedding: bool,
    pub vector_store: bool,
}

impl SavedKeys {
    pub fn of(credentials: &Credentials) -> Self {
        Self {
            llm: !credentials.llm_api_key.is_empty(),
            embedding: !credentials.embedding_api_key.is_empty(),
            vector_store: !credentials.vector_store_api_key.is_empty(),
        }
    }
}

/// Values the form is rendered with. API keys are never part of the page.
pub struct PageView<'a> {
    pub index_name: &'a str,
    pub saved_keys: SavedKeys,
    pub query: &'a str,
    pub document_name: Option<&'a str>,
    pub outcome: Option<&'a Outcome>,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn banner(outcome: &Outcome) -> String {
    let (class, icon) = match outcome {
        Outcome::Success(_) => ("success", "&#10004;"),
        Outcome::Warning(_) => ("warning", "&#9888;"),
        Outcome::Error(_) => ("error", "&#10006;"),
    };
    format!(
        r#"<div class="banner {}"><span class="icon">{}</span><div class="text">{}</div></div>"#,
        class,
        icon,
        escape_html(outcome.message())
    )
}

fn secret_input(label: &str, name: &str, saved: bool) -> String {
    let placeholder = if saved { "saved, leave blank to keep" } else { "" };
    format!(
        r#"<label for="{name}">{label}</label><input id="{name}" name="{name}" type="password" value="" placeholder="{placeholder}" autocomplete="off">"#,
        label = label,
        name = name,
        placeholder = placeholder
    )
}

fn input(label: &str, name: &str, kind: &str, value: &str) -> String {
    format!(
        r#"<label for="{name}">{label}</label><input id="{name}" name="{name}" type="{kind}" value="{value}" autocomplete="off">"#,
        label = label,
        name = name,
        kind = kind,
        value = escape_html(value)
    )
}

pub fn render_page(view: &PageView<'_>) -> String {
    let keys = view.saved_keys;

    let current_document = match view.document_name {
        Some(name) => format!(
            r#"<p class="current">Current document: <strong>{}</strong></p>"#,
            escape_html(name)
        ),
        None => String::new(),
    };

    let banner = view.outcome.map(banner).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Document Question-Answering App</title>
<style>
body {{ font-family: sans-serif; margin: 0; display: flex; min-height: 100vh; }}
aside {{ width: 20rem; background: #f0f2f6; padding: 1.5rem; box-sizing: border-box; }}
main {{ flex: 1; padding: 2rem 3rem; }}
label {{ display: block; margin-top: 1rem; font-size: 0.9rem; }}
input {{ width: 100%; padding: 0.4rem; box-sizing: border-box; }}
button {{ margin-top: 1rem; padding: 0.5rem 1.5rem; }}
.banner {{ margin-top: 1.5rem; padding: 1rem; border-radius: 0.4rem; display: flex; gap: 0.6rem; white-space: pre-wrap; }}
.success {{ background: #dff5e3; }}
.warning {{ background: #fff6d6; }}
.error {{ background: #fde2e2; }}
.current {{ font-size: 0.85rem; }}
</style>
</head>
<body>
<form method="post" action="/" enctype="multipart/form-data" style="display: contents">
<aside>
<h3>Settings</h3>
{groq}
{cohere}
{pinecone}
{index}
<label for="source_doc">Source document</label><input id="source_doc" name="source_doc" type="file" accept=".pdf,application/pdf">
{current_document}
</aside>
<main>
<h2>Document Question-Answering App</h2>
{query}
<button type="submit">Submit</button>
{banner}
</main>
</form>
</body>
</html>
"#,
        groq = secret_input("Groq API key", "groq_api_key", keys.llm),
        cohere = secret_input("Cohere API key", "cohere_api_key", keys.embedding),
        pinecone = secret_input("Pinecone API key", "pinecone_api_key", keys.vector_store),
        index = input("Pinecone index name", "pinecone_index", "text", view.index_name),
        current_document = current_document,
        query = input("Enter your query", "query", "text", view.query),
        banner = banner,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn test_render_page_escapes_answer_and_fields() {
        let outcome = Outcome::Success("<b>Refunds</b> within 30 days".to_string());

        let html = render_page(&PageView {
            index_name: "idx\"><b>",
            saved_keys: SavedKeys::default(),
            query: "What is the refund policy?",
            document_name: Some("doc<1>.pdf"),
            outcome: Some(&outcome),
        });

        assert!(html.contains("&lt;b&gt;Refunds&lt;/b&gt; within 30 days"));
        assert!(html.contains(r#"value="idx&quot;&gt;&lt;b&gt;""#));
        assert!(html.contains("doc&lt;1&gt;.pdf"));
        assert!(html.contains(r#"class="banner success""#));
        assert!(!html.contains("<b>Refunds</b>"));
    }

    #[test]
    fn test_render_page_without_outcome_has_no_banner() {
        let html = render_page(&PageView {
            index_name: "",
            saved_keys: SavedKeys::default(),
            query: "",
            document_name: None,
            outcome: None,
        });

        assert!(html.contains(r#"name="groq_api_key" type="password""#));
        assert!(html.contains(r#"name="source_doc" type="file""#));
        assert!(!html.contains("class=\"banner"));
        assert!(!html.contains("Current document"));
    }

    #[test]
    fn test_saved_keys_are_never_rendered() {
        let credentials = Credentials {
            llm_api_key: "gsk_live_secret".to_string(),
            embedding_api_key: String::new(),
            vector_store_api_key: "pc_live_secret".to_string(),
            index_name: "policies".to_string(),
        };

        let html = render_page(&PageView {
            index_name: &credentials.index_name,
            saved_keys: SavedKeys::of(&credentials),
            query: "",
            document_name: None,
            outcome: None,
        });

        assert!(!html.contains("gsk_live_secret"));
        assert!(!html.contains("pc_live_secret"));
        assert!(html.contains(r#"name="groq_api_key" type="password" value="" placeholder="saved, leave blank to keep""#));
        assert!(html.contains(r#"name="cohere_api_key" type="password" value="" placeholder="""#));
        assert!(html.contains(r#"value="policies""#));
    }
}
