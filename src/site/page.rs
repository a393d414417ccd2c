//! Public landing page

use super::behavior::{
    is_active_link, navbar_style, NavMenu, NAVBAR_RAISE_THRESHOLD, RAISED_SHADOW, RESTING_SHADOW,
    SCROLL_SPY_LEAD,
};
use crate::portal::render::escape_html;

/// A nav entry and the section it scrolls to
pub struct PageSection<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub body: &'a str,
}

pub const DEFAULT_SECTIONS: [PageSection<'static>; 4] = [
    PageSection {
        id: "home",
        title: "Home",
        body: "Long-term capital for enduring businesses.",
    },
    PageSection {
        id: "about",
        title: "About",
        body: "We partner with management teams to build durable value.",
    },
    PageSection {
        id: "strategy",
        title: "Strategy",
        body: "Concentrated positions, patient horizons, disciplined risk.",
    },
    PageSection {
        id: "contact",
        title: "Contact",
        body: "Investors can sign in to the portal for statements and tax forms.",
    },
];

fn script() -> String {
    format!(
        r##"
var navToggle = document.getElementById('navToggle');
var navMenu = document.getElementById('navMenu');
navToggle.addEventListener('click', function () {{ navMenu.classList.toggle('active'); }});
document.querySelectorAll('.nav-menu a').forEach(function (link) {{
  link.addEventListener('click', function () {{ navMenu.classList.remove('active'); }});
}});
var navbar = document.querySelector('.navbar');
document.querySelectorAll('a[href^="#"]').forEach(function (link) {{
  link.addEventListener('click', function (e) {{
    e.preventDefault();
    var id = link.getAttribute('href');
    if (id === '#') return;
    var target = document.querySelector(id);
    if (target) window.scrollTo({{ top: target.offsetTop - navbar.offsetHeight, behavior: 'smooth' }});
  }});
}});
window.addEventListener('scroll', function () {{
  navbar.style.boxShadow = window.scrollY > {threshold} ? '{raised}' : '{resting}';
  var current = '';
  document.querySelectorAll('section[id]').forEach(function (section) {{
    if (window.scrollY >= section.offsetTop - navbar.offsetHeight - {lead}) current = section.id;
  }});
  document.querySelectorAll('.nav-menu a').forEach(function (link) {{
    link.classList.toggle('active', link.getAttribute('href').slice(1) === current);
  }});
}});
"##,
        threshold = NAVBAR_RAISE_THRESHOLD,
        raised = RAISED_SHADOW,
        resting = RESTING_SHADOW,
        lead = SCROLL_SPY_LEAD,
    )
}

/// Page markup in its initial state: scrolled to the top, menu closed
pub fn render_public_page(company_name: &str, sections: &[PageSection<'_>]) -> String {
    let company = escape_html(company_name);
    let menu = NavMenu::default();
    let style = navbar_style(0.0);
    let current = sections.first().map(|s| s.id);
    let links: String = sections
        .iter()
        .map(|s| {
            let href = format!("#{}", s.id);
            let class = if is_active_link(&href, current) {
                r#" class="active""#
            } else {
                ""
            };
            format!(
                r#"<li><a href="{}"{}>{}</a></li>"#,
                escape_html(&href),
                class,
                escape_html(s.title)
            )
        })
        .collect();
    let body: String = sections
        .iter()
        .map(|s| {
            format!(
                r#"<section id="{}"><h2>{}</h2><p>{}</p></section>"#,
                escape_html(s.id),
                escape_html(s.title),
                escape_html(s.body)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{company}</title></head>
<body>
<nav class="navbar" style="background-color: {background}; box-shadow: {shadow};">
<a class="nav-logo" href="/">{company}</a>
<button id="navToggle" class="nav-toggle" aria-label="Menu">&#9776;</button>
<ul id="navMenu" class="{menu_class}">{links}<li><a class="nav-portal" href="/admin">Investor Portal</a></li></ul>
</nav>
{body}
<script>{script}</script>
</body>
</html>
"#,
        company = company,
        background = style.background,
        shadow = style.box_shadow,
        menu_class = if menu.is_open() { "nav-menu active" } else { "nav-menu" },
        links = links,
        body = body,
        script = script(),
    )
}
