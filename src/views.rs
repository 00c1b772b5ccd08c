//! Server-rendered pages.

use time::OffsetDateTime;

use crate::{auth::repo_types::User, flash::Flash};

/// Escape text for HTML bodies and double-quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, flash: Option<Flash>, body: &str) -> String {
    let banner = match flash {
        Some(f) => format!(
            r#"<div class="flash flash-{}">{}</div>"#,
            f.category().as_str(),
            escape(f.message())
        ),
        None => String::new(),
    };
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 28rem; margin: 3rem auto; }}
label {{ display: block; margin-top: .75rem; }}
input {{ width: 100%; padding: .4rem; }}
button {{ margin-top: 1rem; padding: .5rem 1rem; }}
.flash {{ padding: .6rem; margin-bottom: 1rem; border-radius: 4px; }}
.flash-success {{ background: #e3f6e5; }}
.flash-error {{ background: #fbe4e4; }}
.flash-info {{ background: #e4eefb; }}
</style>
</head>
<body>
{banner}
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

pub fn index_page(user: &User, flash: Option<Flash>) -> String {
    let member_since = OffsetDateTime::from_unix_timestamp(user.created_at)
        .map(|t| t.date().to_string())
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Welcome, {name}!</h1>
<p>You are signed in as <strong>{email}</strong>.</p>
<p>Member since {since}.</p>
<p><a href="/logout">Log out</a></p>"#,
        name = escape(user.display_name()),
        email = escape(&user.email),
        since = escape(&member_since),
    );
    layout("Home", flash, &body)
}

pub fn login_page(next: Option<&str>, flash: Option<Flash>) -> String {
    let next_field = match next {
        Some(next) => format!(
            r#"<input type="hidden" name="next" value="{}">"#,
            escape(next)
        ),
        None => String::new(),
    };
    let body = format!(
        r#"<h1>Log in</h1>
<form method="post" action="/login">
{next_field}
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form>
<p>No account? <a href="/register">Register</a></p>"#
    );
    layout("Log in", flash, &body)
}

pub fn register_page(flash: Option<Flash>) -> String {
    let body = r#"<h1>Register</h1>
<form method="post" action="/register">
<label>First name <input type="text" name="first_name" maxlength="100"></label>
<label>Last name <input type="text" name="last_name" maxlength="100"></label>
<label>Username <input type="text" name="username" maxlength="50"></label>
<label>Email <input type="email" name="email" maxlength="120" required></label>
<label>Mobile <input type="tel" name="mobile" maxlength="20"></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Create account</button>
</form>
<p>Already registered? <a href="/login">Log in</a></p>"#;
    layout("Register", flash, body)
}

pub fn error_page(message: &str) -> String {
    layout("Error", None, &format!("<h1>Error</h1>\n<p>{}</p>", escape(message)))
}
