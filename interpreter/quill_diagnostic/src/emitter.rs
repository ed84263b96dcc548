//! Render diagnostics against template source with `ariadne`.

use ariadne::{Config, Label as ReportLabel, Report, ReportKind, Source};

use crate::{Diagnostic, Severity};

/// Render a diagnostic as a human-readable report.
///
/// `name` is the display name of the template (a path or a synthetic id);
/// `source` is the full template text the diagnostic's spans index into.
/// Output is plain text (no ANSI colors) so hosts can log it anywhere.
pub fn render(diagnostic: &Diagnostic, source: &str, name: &str) -> String {
    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Note => ReportKind::Advice,
    };
    let offset = diagnostic
        .primary_span()
        .map_or(0, |span| span.start as usize);

    let mut report = Report::build(kind, name, offset)
        .with_config(Config::default().with_color(false))
        .with_code(diagnostic.code.as_str())
        .with_message(&diagnostic.message);

    for label in &diagnostic.labels {
        let range = label.span.start as usize..label.span.end as usize;
        report = report.with_label(ReportLabel::new((name, range)).with_message(&label.message));
    }
    for note in &diagnostic.notes {
        report = report.with_note(note);
    }

    let mut buf = Vec::new();
    // Rendering failure leaves buf partially filled; fall back to Display.
    if report
        .finish()
        .write((name, Source::from(source)), &mut buf)
        .is_err()
    {
        return diagnostic.to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use quill_ir::Span;

    #[test]
    fn test_render_contains_code_and_message() {
        let source = "<q:if condition=\"{x >}\"></q:if>";
        let diag = Diagnostic::error(ErrorCode::UnexpectedToken, "expected expression")
            .with_label(Span::new(21, 22), "after this operator");
        let rendered = render(&diag, source, "page.qml");
        assert!(rendered.contains("E1001"));
        assert!(rendered.contains("expected expression"));
    }

    #[test]
    fn test_render_without_labels_falls_back_to_message() {
        let diag = Diagnostic::warning(ErrorCode::UndefinedVariable, "`x` is not defined");
        let rendered = render(&diag, "", "t");
        assert!(rendered.contains("`x` is not defined"));
    }
}
