//! Document shell around a server-rendered page.

/// Head content for the document.
#[derive(Debug, Clone, Default)]
pub struct HeadContent {
    /// Page title.
    pub title: Option<String>,
    /// Meta tags.
    pub meta: Vec<(String, String)>,
    /// Stylesheet hrefs.
    pub stylesheets: Vec<String>,
}

impl HeadContent {
    /// Create head content with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Add a meta tag.
    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push((name.to_string(), content.to_string()));
        self
    }

    /// Add a stylesheet link.
    pub fn with_stylesheet(mut self, href: &str) -> Self {
        self.stylesheets.push(href.to_string());
        self
    }

    /// Render head content to HTML.
    pub fn render(&self) -> String {
        let mut html = String::new();

        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>\n", escape_text(title)));
        }
        for (name, content) in &self.meta {
            html.push_str(&format!(
                "<meta name=\"{}\" content=\"{}\">\n",
                escape_text(name),
                escape_text(content)
            ));
        }
        for href in &self.stylesheets {
            html.push_str(&format!(
                "<link rel=\"stylesheet\" href=\"{}\">\n",
                escape_text(href)
            ));
        }

        html
    }
}

/// Full document wrapping the page markup and the hydration state.
#[derive(Debug, Clone)]
pub struct DocumentShell {
    /// Head content.
    pub head: HeadContent,
    /// Id of the element the page renders into.
    pub root_id: String,
    state_script: Option<String>,
}

impl DocumentShell {
    /// Create a shell rendering into `<div id="__app">`.
    pub fn new(head: HeadContent) -> Self {
        Self {
            head,
            root_id: "__app".to_string(),
            state_script: None,
        }
    }

    /// Set the root element id.
    pub fn with_root_id(mut self, id: impl Into<String>) -> Self {
        self.root_id = id.into();
        self
    }

    /// Embed the serialized hydration state script. Placed after the root
    /// element so the page markup itself matches the client render.
    pub fn with_state_script(mut self, script: impl Into<String>) -> Self {
        self.state_script = Some(script.into());
        self
    }

    /// Render the document around `body_html`.
    pub fn render(&self, body_html: &str) -> String {
        let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&self.head.render());
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!(
            "<div id=\"{}\">{}</div>\n",
            escape_text(&self.root_id),
            body_html
        ));
        if let Some(script) = &self.state_script {
            html.push_str(script);
            html.push('\n');
        }
        html.push_str("</body>\n</html>");
        html
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
