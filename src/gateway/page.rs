//! Protected task page rendering.
//!
//! Pages are built by parameterized template functions; every
//! user-controlled value passes through [`html_escape`] before
//! interpolation, so a hostile identity name cannot inject markup.

/// Escape a value for interpolation into HTML text or attributes.
pub fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn base_style() -> &'static str {
    r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: #f4f7f6; color: #333;
        display: flex; justify-content: center; align-items: center;
        min-height: 100vh; padding: 20px;
    }
    .card {
        background: #fff; border-radius: 16px; padding: 40px;
        max-width: 440px; width: 100%; box-shadow: 0 4px 24px rgba(0,0,0,0.08);
        text-align: center;
    }
    .card h1 { font-size: 26px; color: #2c3e50; margin-bottom: 12px; }
    .card p { font-size: 14px; color: #7f8c8d; margin-top: 8px; }
    .identity {
        margin: 20px 0; padding: 14px;
        background: #f0f4ff; border-radius: 10px;
        font-size: 14px; color: #1a1a2e;
    }
    .identity code { font-size: 12px; color: #666; }
    "#
}

/// Render the protected task page for an authenticated identity.
pub fn render_tasks_page(name: &str, user_id: &str) -> String {
    let name = html_escape(name);
    let user_id = html_escape(user_id);

    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>taskvault - Tasks</title>
<style>{style}</style>
</head><body>
<div class="card">
  <h1>Welcome to your task manager</h1>
  <div class="identity">
    Signed in as <strong>{name}</strong><br>
    <code>{user_id}</code>
  </div>
  <p>Your credentials were verified for this request.</p>
  <p>Use the console client to exercise every endpoint.</p>
</div>
</body></html>"#,
        style = base_style(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            html_escape(r#"<script>alert("x")</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
        );
        assert_eq!(html_escape("a&'b"), "a&amp;&#39;b");
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn page_is_bound_to_the_identity() {
        let page = render_tasks_page("ana", "user-id-123");
        assert!(page.contains("ana"));
        assert!(page.contains("user-id-123"));
    }

    #[test]
    fn page_escapes_hostile_names() {
        let page = render_tasks_page("<img onerror=x>", "id");
        assert!(!page.contains("<img"));
        assert!(page.contains("&lt;img"));
    }
}
