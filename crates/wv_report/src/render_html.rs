// crates/wv_report/src/render_html.rs
//
// Deterministic, offline HTML renderer.
// • No external assets; styles are inline.
// • Every content string is HTML-escaped.
// • Each wave row carries a `title` and an `aria-label`, so the figures are
//   readable without hovering.
// • Section order: Cover → Groups (or no-data notice) → Integrity.

use std::fmt::Write as _;

use crate::{ReportModel, ReportRow, SectionCover, SectionIntegrity, SubregionGroup};

// ------------------------- formatting helpers -------------------------

/// Escape text for HTML.
pub(crate) fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

// ------------------------- HTML builder -------------------------

pub struct HtmlBuilder {
    buf: String,
}

impl HtmlBuilder {
    pub fn new() -> Self {
        Self { buf: String::with_capacity(16 * 1024) }
    }

    pub fn start(&mut self, title: &str) {
        let _ = write!(
            self.buf,
            "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
             <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
             <title>{}</title>\
             <style>\
             body{{font-family:system-ui,-apple-system,Segoe UI,Roboto,Ubuntu,Arial,sans-serif;margin:24px;}}\
             h1,h2,h3{{margin:0.2em 0;}}\
             .muted{{opacity:0.8}}\
             .note{{font-style:italic;opacity:0.9}}\
             .wave{{display:inline-block;width:10px;height:10px;margin-right:2px;border-radius:50%;background:#3a7ca5}}\
             table{{border-collapse:collapse}}\
             td,th{{padding:4px 8px;border-bottom:1px solid #ddd;text-align:left}}\
             </style></head><body>",
            esc(title)
        );
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</body></html>");
        self.buf
    }

    pub fn section_cover(&mut self, c: &SectionCover) {
        let _ = write!(
            self.buf,
            "<h1>{}</h1><p class=\"muted\">Selection {} · {} of {} waves · tie-break {}</p>",
            esc(&c.title),
            esc(&c.selection),
            c.total_waves,
            c.budget,
            esc(&c.tie_break)
        );
    }

    pub fn section_group(&mut self, g: &SubregionGroup) {
        let _ = write!(
            self.buf,
            "<section><h2>{} <span class=\"muted\">({} waves)</span></h2>\
             <table><thead><tr><th>State</th><th>Share</th><th>Rank</th>\
             <th>Missing</th><th>Waves</th></tr></thead><tbody>",
            esc(&g.subregion),
            g.waves
        );
        for r in &g.rows {
            self.row(r);
        }
        self.buf.push_str("</tbody></table></section>");
    }

    fn row(&mut self, r: &ReportRow) {
        let label = format!(
            "{}: share {}, rank {}, {} missing, {} waves",
            r.state_name, r.share_pct, r.rank, r.missing_pct, r.waves
        );
        let label = esc(&label);
        let _ = write!(
            self.buf,
            "<tr title=\"{0}\"><td>{1}</td><td>{2}</td><td>{3}</td><td>{4}</td>\
             <td role=\"img\" aria-label=\"{0}\">",
            label,
            esc(&r.state_name),
            esc(&r.share_pct),
            r.rank,
            esc(&r.missing_pct)
        );
        // Each wave carries the row label as its own title.
        for _ in 0..r.waves {
            let _ = write!(self.buf, "<span class=\"wave\" title=\"{label}\"></span>");
        }
        self.buf.push_str("</td></tr>");
    }

    pub fn section_notice(&mut self, notice: &str) {
        let _ = write!(self.buf, "<p class=\"note\" role=\"status\">{}</p>", esc(notice));
    }

    pub fn section_integrity(&mut self, i: &SectionIntegrity) {
        let _ = write!(
            self.buf,
            "<h3>Integrity</h3><ul class=\"muted\">\
             <li>Waves: {}</li><li>Run: {}</li>\
             <li>Records: {} ({} rows)</li><li>Params: {}</li><li>Engine: {}</li></ul>",
            esc(&i.waves_id),
            esc(&i.run_id),
            esc(&i.records_sha256),
            i.record_count,
            esc(&i.params_sha256),
            esc(&i.engine)
        );
    }
}

impl Default for HtmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------- top-level entry -------------------------

pub fn render_html(model: &ReportModel) -> String {
    let mut h = HtmlBuilder::new();
    h.start(&model.cover.title);
    h.section_cover(&model.cover);
    match &model.notice {
        Some(n) => h.section_notice(n),
        None => {
            for g in &model.groups {
                h.section_group(g);
            }
        }
    }
    h.section_integrity(&model.integrity);
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_model, fixtures};

    #[test]
    fn escapes_and_labels_rows() {
        let (w, r) = fixtures::drawn();
        let html = render_html(&build_model(&w, &r).unwrap());
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.ends_with("</body></html>"));
        assert!(html.contains("Tonga &lt;Kingdom&gt;"));
        assert!(!html.contains("Tonga <Kingdom>"));
        assert!(html.contains("aria-label=\"New South Wales: share 50.0%, rank 1, 0.0% missing, 5 waves\""));
        assert_eq!(html.matches("<span class=\"wave\" title=\"").count(), 10);
        assert_eq!(
            html.matches(
                "<span class=\"wave\" title=\"New South Wales: share 50.0%, rank 1, 0.0% missing, 5 waves\"></span>"
            )
            .count(),
            5
        );
        assert!(html.contains("<span class=\"wave\" title=\"Tonga &lt;Kingdom&gt;: share 10.0%"));
    }

    #[test]
    fn groups_appear_in_subregion_order() {
        let (w, r) = fixtures::drawn();
        let html = render_html(&build_model(&w, &r).unwrap());
        let a = html.find("<h2>Australia").unwrap();
        let m = html.find("<h2>Melanesia").unwrap();
        let p = html.find("<h2>Polynesia").unwrap();
        assert!(a < m && m < p);
    }

    #[test]
    fn no_data_renders_notice_only() {
        let (w, r) = fixtures::empty();
        let html = render_html(&build_model(&w, &r).unwrap());
        assert!(html.contains("role=\"status\">No data for 1990 class 3.</p>"));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn esc_covers_quotes() {
        assert_eq!(esc("a\"b'c&"), "a&quot;b&#x27;c&amp;");
    }
}
