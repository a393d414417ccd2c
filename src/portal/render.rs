//! Markup rendering
//!
//! Renderers for the three live lists plus the admin pages. Everything
//! interpolated into markup goes through [`escape_html`].

use chrono::{DateTime, Utc};

use super::control::ControlState;
use super::model::{Document, DocumentCategory, Investor, Message, Recipient};
use super::notifier::{RecipientSelector, ALL_INVESTORS_LABEL};
use crate::live::{LiveCollectionView, ViewRenderer, ViewStatus};

pub const NO_INVESTORS: &str = "No investors yet";
pub const NO_DOCUMENTS: &str = "No documents uploaded yet";
pub const NO_MESSAGES: &str = "No messages sent yet";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Human-readable size, 1024-based with up to two decimals
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "Unknown size".to_string();
    }

    let mut exponent = 0;
    while exponent < UNITS.len() - 1 && bytes >= 1u64 << (10 * (exponent + 1)) {
        exponent += 1;
    }
    let scaled = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}

/// `m/d/yyyy`, or `fallback` when the timestamp is missing
pub fn format_date(at: Option<DateTime<Utc>>, fallback: &str) -> String {
    match at {
        Some(at) => at.format("%-m/%-d/%Y").to_string(),
        None => fallback.to_string(),
    }
}

fn empty_state(text: &str) -> String {
    format!(r#"<div class="empty-state"><p>{}</p></div>"#, escape_html(text))
}

/// Small form posting to an action endpoint, confirmed client-side
fn action_button(action: &str, label: &str, class: &str, prompt: &str) -> String {
    format!(
        r#"<form method="post" action="{}" class="inline-action" data-confirm="{}"><input type="hidden" name="confirm" value="true"><button type="submit" class="btn-small {}">{}</button></form>"#,
        escape_html(action),
        escape_html(prompt),
        class,
        escape_html(label)
    )
}

pub struct InvestorListRenderer;

impl ViewRenderer<Investor> for InvestorListRenderer {
    fn render(&self, investors: &[Investor]) -> String {
        let mut html = String::new();
        for investor in investors {
            let id = urlencoding::encode(&investor.id);
            html.push_str(&format!(
                r#"<div class="investor-item" data-id="{}"><div class="investor-info"><div class="investor-name">{}</div><div class="investor-email">{} &bull; Last login: {}</div></div><div class="investor-actions">{}{}</div></div>"#,
                escape_html(&investor.id),
                escape_html(&investor.name),
                escape_html(&investor.email),
                format_date(investor.last_login, "Never"),
                action_button(
                    &format!("/api/v1/investors/{}/password-reset", id),
                    "Reset Password",
                    "btn-secondary",
                    &format!("Send password reset email to {}?", investor.email),
                ),
                action_button(
                    &format!("/api/v1/investors/{}/delete", id),
                    "Remove",
                    "btn-danger",
                    &format!(
                        "Are you sure you want to remove {}? This action cannot be undone.",
                        investor.name
                    ),
                ),
            ));
        }
        html
    }

    fn placeholder(&self) -> String {
        empty_state(NO_INVESTORS)
    }
}

/// Resolves recipient ids to display names through the investor mirror
#[derive(Clone)]
pub struct RecipientNames {
    investors: Option<LiveCollectionView<Investor>>,
}

impl RecipientNames {
    pub fn new(investors: LiveCollectionView<Investor>) -> Self {
        Self {
            investors: Some(investors),
        }
    }

    /// Only "All Investors" resolves; everything else is unknown
    pub fn detached() -> Self {
        Self { investors: None }
    }

    pub fn name_of(&self, recipient: &Recipient) -> String {
        match recipient {
            Recipient::All => ALL_INVESTORS_LABEL.to_string(),
            Recipient::Investor(id) => self
                .investors
                .as_ref()
                .and_then(|view| view.find(|investor| &investor.id == id))
                .map(|investor| investor.name)
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

pub struct DocumentListRenderer {
    names: RecipientNames,
}

impl DocumentListRenderer {
    pub fn new(names: RecipientNames) -> Self {
        Self { names }
    }
}

impl ViewRenderer<Document> for DocumentListRenderer {
    fn render(&self, documents: &[Document]) -> String {
        let mut html = String::new();
        for document in documents {
            html.push_str(&format!(
                r#"<div class="document-item" data-id="{}"><div class="document-header"><div class="document-name"><a href="{}">{}</a></div><div class="document-date">{}</div></div><div class="document-info"><span class="document-category">{}</span><span>{}</span><span>Shared with: {}</span></div><div class="document-actions">{}</div></div>"#,
                escape_html(&document.id),
                escape_html(&document.storage_url),
                escape_html(&document.name),
                format_date(document.uploaded_at, "Recent"),
                document.category.label(),
                format_file_size(document.file_size),
                escape_html(&self.names.name_of(&document.recipient_id)),
                action_button(
                    &format!("/api/v1/documents/{}/delete", urlencoding::encode(&document.id)),
                    "Delete",
                    "btn-danger",
                    &format!(
                        "Are you sure you want to delete \"{}\"? This action cannot be undone.",
                        document.name
                    ),
                ),
            ));
        }
        html
    }

    fn placeholder(&self) -> String {
        empty_state(NO_DOCUMENTS)
    }
}

pub struct MessageListRenderer {
    names: RecipientNames,
}

impl MessageListRenderer {
    pub fn new(names: RecipientNames) -> Self {
        Self { names }
    }
}

impl ViewRenderer<Message> for MessageListRenderer {
    fn render(&self, messages: &[Message]) -> String {
        let mut html = String::new();
        for message in messages {
            let attachment = message
                .attachment()
                .map(|a| {
                    format!(
                        r#"<span class="message-attachment"><a href="{}">{}</a> ({})</span>"#,
                        escape_html(&a.url),
                        escape_html(&a.name),
                        format_file_size(a.size_bytes)
                    )
                })
                .unwrap_or_default();
            html.push_str(&format!(
                r#"<div class="message-item" data-id="{}"><div class="message-header"><div class="message-subject">{}</div><div class="message-date">{}</div></div><div class="message-info"><span>To: {}</span>{}</div></div>"#,
                escape_html(&message.id),
                escape_html(&message.subject),
                format_date(message.sent_at, "Recent"),
                escape_html(&self.names.name_of(&message.recipient_id)),
                attachment,
            ));
        }
        html
    }

    fn placeholder(&self) -> String {
        empty_state(NO_MESSAGES)
    }
}

/// `<option>` list of a recipient selector
pub fn render_selector_options(selector: &RecipientSelector) -> String {
    selector
        .options
        .iter()
        .map(|option| {
            let selected = if option.value == selector.selected {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                escape_html(&option.value),
                selected,
                escape_html(&option.label)
            )
        })
        .collect()
}

fn render_category_options() -> String {
    DocumentCategory::all()
        .iter()
        .map(|c| format!(r#"<option value="{}">{}</option>"#, c.as_str(), c.label()))
        .collect()
}

fn render_button(control: &ControlState) -> String {
    format!(
        r#"<button type="submit" id="{}" class="btn-primary"{}>{}</button>"#,
        control.id,
        if control.disabled { " disabled" } else { "" },
        escape_html(&control.label)
    )
}

/// Error banner for views whose subscription failed
pub fn render_banner(failed: &[(String, ViewStatus)]) -> String {
    let reasons: Vec<String> = failed
        .iter()
        .filter_map(|(view, status)| match status {
            ViewStatus::Failed(reason) => Some(format!(
                "<li>{}: {}</li>",
                escape_html(view),
                escape_html(reason)
            )),
            _ => None,
        })
        .collect();
    if reasons.is_empty() {
        return String::new();
    }
    format!(
        r#"<div class="error-banner" role="alert"><p>Live updates stopped. Reload the page to retry.</p><ul>{}</ul></div>"#,
        reasons.concat()
    )
}

/// Everything the dashboard page shows
pub struct DashboardPage<'a> {
    pub company_name: &'a str,
    pub admin_email: &'a str,
    pub min_password_length: usize,
    pub suggested_password: &'a str,
    pub total_investors: usize,
    pub total_messages: usize,
    pub total_documents: usize,
    pub investors_markup: &'a str,
    pub messages_markup: &'a str,
    pub documents_markup: &'a str,
    pub message_recipients: &'a RecipientSelector,
    pub document_recipients: &'a RecipientSelector,
    pub add_investor: ControlState,
    pub send_message: ControlState,
    pub upload_document: ControlState,
    pub banner: String,
    pub notice: Option<&'a str>,
}

const DASHBOARD_SCRIPT: &str = r#"
document.querySelectorAll('form[data-confirm]').forEach(function (form) {
  form.addEventListener('submit', function (e) {
    if (!confirm(form.dataset.confirm)) e.preventDefault();
  });
});
(function () {
  var area = document.getElementById('fileUploadArea');
  var input = document.getElementById('documentFile');
  if (!area || !input) return;
  area.addEventListener('click', function () { input.click(); });
  area.addEventListener('dragover', function (e) { e.preventDefault(); area.classList.add('dragover'); });
  area.addEventListener('dragleave', function () { area.classList.remove('dragover'); });
  area.addEventListener('drop', function (e) {
    e.preventDefault();
    area.classList.remove('dragover');
    if (e.dataTransfer.files.length) {
      input.files = e.dataTransfer.files;
      document.getElementById('documentSource').value = 'drag-and-drop';
    }
  });
})();
['messageRecipient', 'documentRecipient'].forEach(function (id) {
  var select = document.getElementById(id);
  if (!select) return;
  select.addEventListener('change', function () {
    fetch('/api/v1/recipients/' + id, {
      method: 'POST',
      headers: { 'Content-Type': 'application/x-www-form-urlencoded', 'Accept': 'application/json' },
      body: 'value=' + encodeURIComponent(select.value)
    });
  });
});
(function () {
  var proto = location.protocol === 'https:' ? 'wss:' : 'ws:';
  var ws = new WebSocket(proto + '//' + location.host + '/ws');
  var containers = {
    investors: 'investorListContainer',
    messages: 'messageListContainer',
    documents: 'documentsListContainer'
  };
  var totals = { investors: 'totalInvestors', messages: 'totalMessages', documents: 'totalDocuments' };
  ws.onopen = function () {
    ws.send(JSON.stringify({ type: 'subscribe', topics: ['views.*', 'recipients', 'uploads'] }));
  };
  ws.onmessage = function (event) {
    var msg = JSON.parse(event.data);
    if (msg.type === 'view_rendered') {
      document.getElementById(containers[msg.view]).innerHTML = msg.markup;
      document.getElementById(totals[msg.view]).textContent = msg.count;
    } else if (msg.type === 'recipients_changed') {
      var select = document.getElementById(msg.selector);
      var chosen = select.value;
      select.innerHTML = msg.options_markup;
      var kept = Array.prototype.some.call(select.options, function (o) { return o.value === chosen; });
      select.value = kept ? chosen : 'all';
    } else if (msg.type === 'upload_progress') {
      var box = document.getElementById('uploadProgress');
      var state = msg.state;
      box.style.display = state.state === 'uploading' ? 'block' : 'none';
      if (state.state === 'uploading') {
        document.getElementById('progressFill').style.width = state.percent + '%';
        document.getElementById('progressText').textContent = 'Uploading... ' + Math.round(state.percent) + '%';
      }
    }
  };
})();
"#;

pub fn render_dashboard(page: &DashboardPage<'_>) -> String {
    let company = escape_html(page.company_name);
    let notice = page
        .notice
        .map(|n| format!(r#"<div class="notice" role="status">{}</div>"#, escape_html(n)))
        .unwrap_or_default();

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{company} Admin Dashboard</title></head>
<body class="admin">
<header class="admin-header">
<h1>{company} Admin</h1>
<span class="admin-email">{admin_email}</span>
<form method="post" action="/admin/logout"><button type="submit" id="logoutBtn" class="btn-secondary">Logout</button></form>
</header>
{banner}{notice}
<section class="stats">
<div class="stat-card"><span class="stat-value" id="totalInvestors">{total_investors}</span><span class="stat-label">Total Investors</span></div>
<div class="stat-card"><span class="stat-value" id="totalMessages">{total_messages}</span><span class="stat-label">Messages Sent</span></div>
<div class="stat-card"><span class="stat-value" id="totalDocuments">{total_documents}</span><span class="stat-label">Documents</span></div>
</section>
<section id="investors-tab" class="tab-content active">
<h2>Add Investor</h2>
<form id="addInvestorForm" method="post" action="/api/v1/investors">
<input id="investorName" name="name" type="text" placeholder="Full name" required>
<input id="investorEmail" name="email" type="email" placeholder="Email" required>
<input id="investorPassword" name="password" type="text" minlength="{min_password_length}" value="{suggested_password}">
{add_investor}
</form>
<div id="investorListContainer">{investors}</div>
</section>
<section id="messages-tab" class="tab-content">
<h2>Send Message</h2>
<form id="sendMessageForm" method="post" action="/api/v1/messages" enctype="multipart/form-data">
<select id="messageRecipient" name="recipient">{message_recipients}</select>
<input id="messageSubject" name="subject" type="text" placeholder="Subject" required>
<textarea id="messageBody" name="body" placeholder="Message" required></textarea>
<input id="messageAttachment" name="attachment" type="file">
{send_message}
</form>
<div id="messageListContainer">{messages}</div>
</section>
<section id="documents-tab" class="tab-content">
<h2>Upload Document</h2>
<form id="uploadDocumentForm" method="post" action="/api/v1/documents" enctype="multipart/form-data">
<div id="fileUploadArea" class="file-upload-area"><p>Click or drop a file here</p>
<input id="documentFile" name="file" type="file" hidden></div>
<input id="documentSource" name="source" type="hidden" value="picker">
<select id="documentCategory" name="category">{categories}</select>
<select id="documentRecipient" name="recipient">{document_recipients}</select>
<div id="uploadProgress" class="upload-progress" style="display: none;">
<div class="progress-bar"><div id="progressFill" class="progress-fill" style="width: 0%;"></div></div>
<span id="progressText">Uploading... 0%</span>
</div>
{upload_document}
</form>
<div id="documentsListContainer">{documents}</div>
</section>
<script>{script}</script>
</body>
</html>
"##,
        company = company,
        admin_email = escape_html(page.admin_email),
        banner = page.banner,
        notice = notice,
        total_investors = page.total_investors,
        total_messages = page.total_messages,
        total_documents = page.total_documents,
        min_password_length = page.min_password_length,
        suggested_password = escape_html(page.suggested_password),
        add_investor = render_button(&page.add_investor),
        investors = page.investors_markup,
        message_recipients = render_selector_options(page.message_recipients),
        send_message = render_button(&page.send_message),
        messages = page.messages_markup,
        categories = render_category_options(),
        document_recipients = render_selector_options(page.document_recipients),
        upload_document = render_button(&page.upload_document),
        documents = page.documents_markup,
        script = DASHBOARD_SCRIPT,
    )
}

pub fn render_login(company_name: &str, error: Option<&str>, notice: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<div class="error-message" role="alert">{}</div>"#, escape_html(e)))
        .unwrap_or_default();
    let notice = notice
        .map(|n| format!(r#"<div class="notice" role="status">{}</div>"#, escape_html(n)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{company} Admin Login</title></head>
<body class="login">
<h1>{company} Admin</h1>
{notice}{error}
<form id="loginForm" method="post" action="/admin/login">
<input id="email" name="email" type="email" placeholder="Email" required>
<input id="password" name="password" type="password" placeholder="Password" required>
<button type="submit" id="loginBtn" class="btn-primary">Sign In</button>
</form>
</body>
</html>
"#,
        company = escape_html(company_name),
        notice = notice,
        error = error,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn investor(id: &str, name: &str) -> Investor {
        Investor {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@x.com", id),
            created_at: None,
            last_login: None,
        }
    }

    fn document(recipient: Recipient, size: u64) -> Document {
        Document {
            id: "d1".to_string(),
            name: "report.pdf".to_string(),
            category: DocumentCategory::TaxForms,
            recipient_id: recipient,
            storage_url: "http://h/files/documents/1_report.pdf".to_string(),
            file_size: size,
            file_type: "application/pdf".to_string(),
            uploaded_at: None,
            uploaded_by: "admin".to_string(),
        }
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "Unknown size");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2_097_152), "2 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024 * 1024), "5120 GB");
    }

    #[test]
    fn test_format_date() {
        let at = DateTime::from_timestamp_millis(1_704_067_200_000);
        assert_eq!(format_date(at, "Never"), "1/1/2024");
        assert_eq!(format_date(None, "Never"), "Never");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_investor_list() {
        let renderer = InvestorListRenderer;
        assert!(renderer.placeholder().contains(NO_INVESTORS));

        let html = renderer.render(&[investor("a", "<Al>"), investor("b", "Bea")]);
        assert!(html.contains("&lt;Al&gt;"));
        assert!(html.contains("Last login: Never"));
        assert!(html.contains("/api/v1/investors/b/delete"));
        assert!(html.find("data-id=\"a\"").unwrap() < html.find("data-id=\"b\"").unwrap());
    }

    #[test]
    fn test_document_list_resolves_names() {
        let renderer = DocumentListRenderer::new(RecipientNames::detached());
        let html = renderer.render(&[document(Recipient::All, 2_097_152)]);
        assert!(html.contains("Shared with: All Investors"));
        assert!(html.contains("Tax Forms"));
        assert!(html.contains("2 MB"));
        assert!(html.contains(">Recent<"));

        let html = renderer.render(&[document(Recipient::Investor("ghost".into()), 0)]);
        assert!(html.contains("Shared with: Unknown"));
        assert!(html.contains("Unknown size"));
    }

    #[test]
    fn test_selector_options_mark_selection() {
        let mut selector = RecipientSelector::new("messageRecipient");
        selector.rebuild(&[investor("a", "Al")]);
        selector.select("a");
        let html = render_selector_options(&selector);
        assert!(html.starts_with(r#"<option value="all">All Investors</option>"#));
        assert!(html.contains(r#"<option value="a" selected>Al</option>"#));
    }

    #[test]
    fn test_dashboard_script_keeps_recipient_choice() {
        // Browser selection survives option rebuilds unless the investor is gone
        assert!(DASHBOARD_SCRIPT.contains("var chosen = select.value;"));
        assert!(DASHBOARD_SCRIPT.contains("select.value = kept ? chosen : 'all';"));
        let replace = DASHBOARD_SCRIPT.find("select.innerHTML = msg.options_markup").unwrap();
        assert!(DASHBOARD_SCRIPT.find("var chosen").unwrap() < replace);
        assert!(DASHBOARD_SCRIPT.find("select.value = kept").unwrap() > replace);

        // and is reported to the server so later pushes mark it selected
        assert!(DASHBOARD_SCRIPT.contains("fetch('/api/v1/recipients/' + id"));
        assert!(DASHBOARD_SCRIPT.contains("['messageRecipient', 'documentRecipient']"));
    }

    #[test]
    fn test_banner_only_lists_failures() {
        assert!(render_banner(&[("investors".into(), ViewStatus::Live)]).is_empty());
        let html = render_banner(&[("documents".into(), ViewStatus::Failed("denied".into()))]);
        assert!(html.contains("documents: denied"));
    }

    #[test]
    fn test_login_page_shows_error() {
        let html = render_login(
            "Blackpine Capital",
            Some("Incorrect email or password."),
            Some("You have been logged out."),
        );
        assert!(html.contains("You have been logged out."));
        assert!(html.contains("Incorrect email or password."));
        assert!(html.contains(r#"action="/admin/login""#));
    }
}
