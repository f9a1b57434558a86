//! # Invoice Templates
//!
//! Named markup templates on disk and `{{ placeholder }}` substitution.
//!
//! ## Placeholder Rules
//! ```text
//! "<td>{{ razon_social }}</td>"   ──►  "<td>Acme &amp; Hijos</td>"
//!        │
//!        ├── whitespace inside the braces is ignored
//!        ├── the name must be one of the InvoiceFields keys
//!        ├── unknown name / missing "}}" ──► RenderError::MissingField
//!        └── values are HTML-escaped
//! ```

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use cuentas_core::error::{RenderError, RenderResult};
use cuentas_core::InvoiceFields;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

// =============================================================================
// Template Library
// =============================================================================

/// Directory of named templates.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    dir: PathBuf,
}

impl TemplateLibrary {
    /// Library rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TemplateLibrary { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads a template by file name.
    ///
    /// Only plain file names are accepted; anything that could leave the
    /// library directory is reported as not found.
    pub async fn load(&self, name: &str) -> RenderResult<String> {
        if !is_plain_name(name) {
            return Err(RenderError::TemplateNotFound(name.to_string()));
        }

        let path = self.dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(template = %path.display(), bytes = text.len(), "Template loaded");
                Ok(text)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RenderError::TemplateNotFound(name.to_string()))
            }
            Err(e) => Err(RenderError::TemplateRead {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('\\')
}

// =============================================================================
// Substitution
// =============================================================================

/// Replaces every placeholder in `template` with its escaped field value.
pub fn fill_template(template: &str, fields: &InvoiceFields) -> RenderResult<String> {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let end = after_open.find(CLOSE).ok_or_else(|| {
            RenderError::MissingField(format!(
                "unterminated placeholder near '{}'",
                snippet(after_open)
            ))
        })?;

        let key = after_open[..end].trim();
        let value = fields
            .get(key)
            .ok_or_else(|| RenderError::MissingField(key.to_string()))?;
        out.push_str(&escape_html(value));

        rest = &after_open[end + CLOSE.len()..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Escapes text for element content and quoted attribute values.
pub fn escape_html(value: &str) -> String {
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

fn snippet(text: &str) -> String {
    text.chars().take(20).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> InvoiceFields {
        InvoiceFields {
            numero: "007".to_string(),
            fecha: "14 de Octubre de 2026".to_string(),
            razon_social: "Acme & Hijos <S.A.S>".to_string(),
            nit: "900123456-7".to_string(),
            servicio: "Soporte".to_string(),
            precio: "$2.000.000".to_string(),
            moneda: "COP".to_string(),
            assets_path: "/srv/assets".to_string(),
            assets_url: "file:///srv/assets".to_string(),
        }
    }

    #[test]
    fn test_fill_all_placeholders() {
        let html = fill_template(
            "<h1>N.º {{numero}}</h1><p>{{ precio }} {{  moneda  }}</p><img src=\"{{ assets_path }}/logo.png\">",
            &fields(),
        )
        .unwrap();
        assert_eq!(
            html,
            "<h1>N.º 007</h1><p>$2.000.000 COP</p><img src=\"/srv/assets/logo.png\">"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        let html = fill_template("<td>{{ razon_social }}</td>", &fields()).unwrap();
        assert_eq!(html, "<td>Acme &amp; Hijos &lt;S.A.S&gt;</td>");
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = fill_template("{{ total }}", &fields()).unwrap_err();
        assert!(matches!(err, RenderError::MissingField(key) if key == "total"));
    }

    #[test]
    fn test_unterminated_placeholder() {
        let err = fill_template("<p>{{ numero</p>", &fields()).unwrap_err();
        assert!(matches!(err, RenderError::MissingField(_)));
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged() {
        let text = "body { color: #333; } } {";
        assert_eq!(fill_template(text, &fields()).unwrap(), text);
    }

    #[test]
    fn test_plain_names() {
        assert!(is_plain_name("factura_template.html"));
        assert!(!is_plain_name("../secret.html"));
        assert!(!is_plain_name("/etc/passwd"));
        assert!(!is_plain_name("sub/factura.html"));
        assert!(!is_plain_name(r"..\factura.html"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".."));
    }

    #[tokio::test]
    async fn test_library_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("factura_template.html"), "<p>{{ numero }}</p>").unwrap();
        let library = TemplateLibrary::new(dir.path());

        assert_eq!(
            library.load("factura_template.html").await.unwrap(),
            "<p>{{ numero }}</p>"
        );
        assert!(matches!(
            library.load("otra.html").await,
            Err(RenderError::TemplateNotFound(_))
        ));
        assert!(matches!(
            library.load("../factura_template.html").await,
            Err(RenderError::TemplateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_shipped_template_links_assets_with_file_urls() {
        let templates = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates");
        let markup = TemplateLibrary::new(templates)
            .load("factura_template.html")
            .await
            .unwrap();

        let windows = InvoiceFields {
            assets_path: "C:/app/assets".to_string(),
            assets_url: "file:///C:/app/assets".to_string(),
            ..fields()
        };
        let html = fill_template(&markup, &windows).unwrap();

        assert!(html.contains(r#"src="file:///C:/app/assets/logo.svg""#));
        assert!(html.contains(r#"src="file:///C:/app/assets/firma.svg""#));
        assert!(!html.contains("file://C:"));
    }

    #[tokio::test]
    async fn test_library_read_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("carpeta.html")).unwrap();
        let library = TemplateLibrary::new(dir.path());

        assert!(matches!(
            library.load("carpeta.html").await,
            Err(RenderError::TemplateRead { .. })
        ));
    }
}
