//! Minimal HTML for the login form, upload form and gallery.

use std::fmt::Write;

use photos_types::models::{Session, Upload};

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body></html>\n",
        escape(title),
        body
    )
}

pub fn login_page() -> String {
    layout(
        "Log in",
        r#"<form method="post" action="/login">
  <label>Username <input name="username" autocomplete="username"></label>
  <label>Password <input name="password" type="password" autocomplete="current-password"></label>
  <button type="submit">Log in</button>
</form>"#,
    )
}

pub const UPLOAD_FORM_MARKER: &str = r#"id="upload-form""#;

pub fn upload_page(session: &Session) -> String {
    let body = format!(
        r#"<p>Signed in as {}</p>
<form {} method="post" action="/upload" enctype="multipart/form-data">
  <label>Title <input name="title"></label>
  <label>Caption <textarea name="caption"></textarea></label>
  <input name="images" type="file" accept="image/*" multiple>
  <button type="submit">Upload</button>
</form>"#,
        escape(session.username()),
        UPLOAD_FORM_MARKER
    );
    layout("Upload", &body)
}

pub fn gallery_page(uploads: &[Upload], session: Option<&Session>) -> String {
    let mut body = String::new();
    match session {
        Some(session) => {
            let _ = write!(
                body,
                r#"<nav>{} · <a href="/upload">Upload</a> · <form method="post" action="/logout"><button>Log out</button></form></nav>"#,
                escape(session.username())
            );
        }
        None => body.push_str(r#"<nav><a href="/login">Log in</a></nav>"#),
    }

    body.push_str("\n<main>");
    for upload in uploads {
        let _ = write!(
            body,
            r#"
<figure>
  <img src="/uploads/{id}" alt="{alt}">
  <figcaption><strong>{title}</strong> {caption}"#,
            id = upload.id,
            alt = escape(&upload.filename),
            title = escape(&upload.title),
            caption = escape(&upload.caption),
        );
        let meta = &upload.metadata;
        let details: Vec<&str> = [&meta.camera, &meta.iso, &meta.aperture, &meta.exposure]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .collect();
        if !details.is_empty() {
            let _ = write!(body, "<br><small>{}</small>", escape(&details.join(" · ")));
        }
        body.push_str("</figcaption>\n</figure>");
    }
    body.push_str("\n</main>");

    layout("Photos", &body)
}
