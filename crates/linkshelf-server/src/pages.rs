//! Server-rendered HTML: the landing page and the public profile page.
//!
//! Pages are maud functions composed into a shared document shell that
//! carries the SEO and Open Graph metadata.

use axum::{
  extract::{Path, State},
  response::Html,
};
use linkshelf_api::Backend;
use linkshelf_core::{ResolveError, link::Link, profile, user::PublicProfile};
use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::{AppState, error::PageError};

// ─── Styles ──────────────────────────────────────────────────────────────────

pub const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:Inter,-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;line-height:1.5;min-height:100vh;display:flex;flex-direction:column;align-items:center;padding:2.5rem 1rem;background:#fafafa;color:#111}
main{max-width:560px;width:100%;flex:1;display:flex;flex-direction:column;align-items:center;gap:1rem}
.avatar{width:96px;height:96px;border-radius:50%;object-fit:cover;background:#ddd}
.avatar-fallback{width:96px;height:96px;border-radius:50%;display:flex;align-items:center;justify-content:center;font-size:2.2rem;font-weight:700;text-transform:uppercase;background:#111;color:#fff}
.username{font-size:1.25rem;font-weight:700}
.links{list-style:none;width:100%;display:flex;flex-direction:column;gap:.75rem}
.link{display:flex;align-items:center;gap:.75rem;padding:.9rem 1rem;border-radius:12px;border:1px solid currentColor;color:inherit;text-decoration:none;font-weight:600}
.link:hover{opacity:.85}
.link img{width:40px;height:40px;border-radius:8px;object-fit:cover;flex-shrink:0}
.link span{flex:1;text-align:center}
.empty{opacity:.6}
footer{margin-top:2rem;font-size:.8rem;opacity:.6}
footer a{color:inherit}
.home h1{font-size:2.5rem;letter-spacing:-.03em}
.home p{font-size:1.1rem;text-align:center;opacity:.8}
"#;

pub const ERROR_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:Inter,-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;min-height:100vh;display:flex;align-items:center;justify-content:center;background:#fafafa;color:#111}
.error-page{text-align:center;display:flex;flex-direction:column;gap:.75rem}
.error-page h1{font-size:2rem}
.error-page a{color:#555}
"#;

// ─── Shell ───────────────────────────────────────────────────────────────────

/// Open Graph metadata for a page.
pub struct OpenGraph<'a> {
  pub title:       &'a str,
  pub description: &'a str,
  pub url:         &'a str,
  pub image:       Option<&'a str>,
  pub og_type:     &'a str,
}

/// A bare HTML document.
pub fn document(title: &str, css: &str, head: Markup, body: Markup) -> Markup {
  html! {
    (DOCTYPE)
    html lang="en" {
      head {
        meta charset="utf-8";
        meta name="viewport" content="width=device-width, initial-scale=1";
        title { (title) }
        (head)
        style { (PreEscaped(css)) }
      }
      body { (body) }
    }
  }
}

/// A full page with description, canonical URL and social-card metadata.
pub fn page_shell(site_name: &str, og: OpenGraph<'_>, style: Option<&str>, content: Markup) -> Markup {
  let head = html! {
    meta name="description" content=(og.description);
    link rel="canonical" href=(og.url);

    meta property="og:title" content=(og.title);
    meta property="og:description" content=(og.description);
    meta property="og:url" content=(og.url);
    meta property="og:site_name" content=(site_name);
    meta property="og:type" content=(og.og_type);
    @if let Some(image) = og.image {
      meta property="og:image" content=(image);
    }

    meta name="twitter:card" content=(if og.image.is_some() { "summary_large_image" } else { "summary" });
    meta name="twitter:title" content=(og.title);
    meta name="twitter:description" content=(og.description);
  };

  let body = html! {
    main style=[style] { (content) }
    footer {
      "Made with "
      a href="/" { (site_name) }
    }
  };

  document(og.title, PAGE_CSS, head, body)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// `value` if it is safe to drop into an inline style declaration.
fn css_value(value: &str) -> Option<&str> {
  let value = value.trim();
  let safe = !value.is_empty()
    && value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ' | '-'));
  safe.then_some(value)
}

fn theme_style(profile: &PublicProfile) -> Option<String> {
  let background = profile.background.as_deref().and_then(css_value);
  let color = profile.color.as_deref().and_then(css_value);

  let mut style = String::new();
  if let Some(bg) = background {
    style.push_str(&format!("background:{bg};"));
  }
  if let Some(fg) = color {
    style.push_str(&format!("color:{fg};"));
  }
  (!style.is_empty()).then_some(style)
}

/// Where a link should point. Bare hosts get `https://`; other schemes are
/// not linked at all.
pub fn href_for(target: &str) -> Option<String> {
  let target = target.trim();
  let lower = target.to_ascii_lowercase();

  if lower.starts_with("http://") || lower.starts_with("https://") {
    return Some(target.to_owned());
  }

  let has_scheme = target
    .split_once(':')
    .is_some_and(|(head, _)| !head.contains(['/', '.', '?', '#']));
  if has_scheme || target.is_empty() {
    return None;
  }
  Some(format!("https://{target}"))
}

fn link_item(link: &Link) -> Markup {
  let thumbnail = link.metadata.thumbnail();
  html! {
    li {
      @match href_for(&link.link) {
        Some(href) => {
          a class="link" href=(href) rel="noopener noreferrer" target="_blank" {
            @if let Some(src) = thumbnail { img src=(src) alt="" loading="lazy"; }
            span { (link.title) }
          }
        }
        None => {
          div class="link" { span { (link.title) } }
        }
      }
    }
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /`
pub async fn landing<S: Backend>(State(state): State<AppState<S>>) -> Html<String> {
  let config = &state.config;
  let markup = page_shell(
    &config.site_name,
    OpenGraph {
      title:       &config.site_name,
      description: &config.site_description,
      url:         &config.base_url,
      image:       None,
      og_type:     "website",
    },
    None,
    html! {
      div class="home" {
        h1 { (config.site_name) }
        p { (config.site_description) }
      }
    },
  );
  Html(markup.into_string())
}

/// `GET /user/{username}`
pub async fn profile_page<S: Backend>(
  State(state): State<AppState<S>>,
  Path(username): Path<String>,
) -> Result<Html<String>, PageError> {
  let profile = profile::resolve_profile(state.api.store.as_ref(), &username)
    .await
    .map_err(|e| match e {
      ResolveError::NotFound(name) => PageError::NotFound(name),
      ResolveError::Backend(err) => PageError::Unavailable(err.to_string()),
    })?;

  let config = &state.config;
  let url = format!("{}/user/{}", config.base_url.trim_end_matches('/'), profile.username);
  let title = format!("{} | {}", profile.username, config.site_name);
  let description = format!("{} on {}", profile.username, config.site_name);
  let style = theme_style(&profile);
  let initial = profile.username.chars().next().unwrap_or('?');

  let markup = page_shell(
    &config.site_name,
    OpenGraph {
      title:       &title,
      description: &description,
      url:         &url,
      image:       profile.photo_url.as_deref(),
      og_type:     "profile",
    },
    style.as_deref(),
    html! {
      @if let Some(photo) = &profile.photo_url {
        img class="avatar" src=(photo) alt=(profile.username);
      } @else {
        div class="avatar-fallback" { (initial) }
      }
      h1 class="username" { "@" (profile.username) }
      @if profile.links.is_empty() {
        p class="empty" { "No links yet." }
      } @else {
        ul class="links" {
          @for link in &profile.links { (link_item(link)) }
        }
      }
    },
  );

  Ok(Html(markup.into_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn href_handles_bare_hosts_and_schemes() {
    assert_eq!(href_for("https://a.example/x").as_deref(), Some("https://a.example/x"));
    assert_eq!(href_for("HTTP://a.example").as_deref(), Some("HTTP://a.example"));
    assert_eq!(href_for("a.example/path").as_deref(), Some("https://a.example/path"));
    assert_eq!(href_for("a.example:8080/x").as_deref(), Some("https://a.example:8080/x"));
    assert_eq!(href_for("javascript:alert(1)"), None);
    assert_eq!(href_for("  "), None);
  }

  #[test]
  fn css_values_are_filtered() {
    assert_eq!(css_value("#fff"), Some("#fff"));
    assert_eq!(css_value("rgb(0, 0, 0)"), Some("rgb(0, 0, 0)"));
    assert_eq!(css_value("red;}body{display:none"), None);
    assert_eq!(css_value("url(\"x\")"), None);
  }

  #[test]
  fn shell_carries_open_graph_tags() {
    let markup = page_shell(
      "Linkshelf",
      OpenGraph {
        title:       "alice | Linkshelf",
        description: "alice on Linkshelf",
        url:         "http://localhost/user/alice",
        image:       Some("http://localhost/media/p.png"),
        og_type:     "profile",
      },
      Some("background:#000;"),
      html! { p { "hi" } },
    )
    .into_string();

    assert!(markup.contains(r#"<meta property="og:title" content="alice | Linkshelf">"#));
    assert!(markup.contains(r#"<meta property="og:image" content="http://localhost/media/p.png">"#));
    assert!(markup.contains(r#"<main style="background:#000;">"#));
    assert!(markup.contains(r#"<meta name="twitter:card" content="summary_large_image">"#));
  }

  #[test]
  fn imageless_pages_use_the_small_card() {
    let markup = page_shell(
      "Linkshelf",
      OpenGraph {
        title:       "Linkshelf",
        description: "One page for all of your links.",
        url:         "http://localhost",
        image:       None,
        og_type:     "website",
      },
      None,
      html! {},
    )
    .into_string();

    assert!(markup.contains(r#"<meta name="twitter:card" content="summary">"#));
    assert!(!markup.contains("og:image"));
  }
}
