//! Server-rendered pages. Two views, no templating engine.

/// Landing page for anonymous visitors.
pub(super) fn landing_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>reportdeck</title>
</head>
<body>
  <h1>reportdeck</h1>
  <p>Sign in to view the report dashboard.</p>
  <p><a href="/login">Sign in</a></p>
</body>
</html>
"#
    .to_string()
}

/// Dashboard for the signed-in user. The embedded report loads through the
/// embed-token endpoint.
pub(super) fn dashboard_page(username: &str, name: Option<&str>) -> String {
    let username = escape(username);
    let name = name.map(escape).unwrap_or_else(|| username.clone());

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Dashboard - reportdeck</title>
</head>
<body>
  <h1>Welcome, {name}</h1>
  <p>Signed in as {username}</p>
  <nav>
    <a href="/send-email">Email report export</a>
    <a href="/trigger-pipeline">Run pipeline</a>
    <a href="/logout">Sign out</a>
  </nav>
  <iframe id="report" title="Report" width="1140" height="541" frameborder="0"></iframe>
  <script>
    fetch('/embed-token')
      .then((response) => response.json())
      .then((bundle) => {{
        document.getElementById('report').src = bundle.embedTokenURL;
      }});
  </script>
</body>
</html>
"#
    )
}

/// Minimal HTML escaping for text interpolated into the views.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_shows_username_and_name() {
        let page = dashboard_page("u@x.com", Some("U"));
        assert!(page.contains("u@x.com"));
        assert!(page.contains("Welcome, U"));
    }

    #[test]
    fn test_dashboard_falls_back_to_username() {
        let page = dashboard_page("u@x.com", None);
        assert!(page.contains("Welcome, u@x.com"));
    }

    #[test]
    fn test_dashboard_escapes_html() {
        let page = dashboard_page("<script>alert(1)</script>", None);
        assert!(!page.contains("<script>alert(1)"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_landing_links_to_login() {
        assert!(landing_page().contains(r#"href="/login""#));
    }
}
