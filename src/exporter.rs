use crate::importer::BookDocument;
use std::borrow::Cow;
use std::io::Write;

/// Columns written to the CSV, in order. Readwise matches on these names.
pub const CSV_COLUMNS: [&str; 4] = ["Title", "Author", "Highlight", "Note"];

/// One highlight, relabeled for Readwise.
///
/// `start`, `end` and `color` only drive ordering and are not written out.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub title: String,
    pub author: String,
    pub highlight: String,
    pub note: Option<String>,
    pub start: f64,
    pub end: Option<f64>,
    pub color: Option<String>,
}

/// Build the export table for a book, ordered by position in the text.
///
/// The sort is stable, so highlights sharing a `start` keep their order from the export.
/// A book without a `bookmarks` field yields an empty table.
pub fn to_table(document: &BookDocument) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = document
        .bookmarks
        .iter()
        .flatten()
        .map(|bm| ExportRow {
            title: document.title.clone(),
            author: document.authors.clone(),
            highlight: bm.text.clone(),
            note: bm.name.clone(),
            start: bm.start,
            end: bm.end,
            color: bm.color.clone(),
        })
        .collect();
    rows.sort_by(|a, b| a.start.total_cmp(&b.start));
    rows
}

/// File name for a book's CSV: `"{author} {title}.csv"` with every `/` removed.
pub fn output_filename(author: &str, title: &str) -> String {
    format!("{} {}.csv", author, title).replace('/', "")
}

/// Write `rows` as CSV with a `Title,Author,Highlight,Note` header.
pub fn write_csv<W: Write>(writer: &mut W, rows: &[ExportRow]) -> std::io::Result<()> {
    writeln!(writer, "{}", CSV_COLUMNS.join(","))?;
    for row in rows {
        writeln!(
            writer,
            "{},{},{},{}",
            escape_field(&row.title),
            escape_field(&row.author),
            escape_field(&row.highlight),
            escape_field(row.note.as_deref().unwrap_or("")),
        )?;
    }
    Ok(())
}

/// Minimal quoting: only fields containing a delimiter, quote or line break are quoted.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::parse_document;

    fn book(json: &str) -> BookDocument {
        parse_document(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_to_table_sorts_by_start_and_keeps_cardinality() {
        let doc = book(
            r#"{"title":"Foo","authors":"Jane Doe","bookmarks":[
                {"text":"hi","name":"","start":5,"end":6,"color":"yellow"},
                {"text":"lo","name":"n","start":1,"end":2,"color":"blue"},
                {"text":"mid","start":3.5}
            ]}"#,
        );
        let rows = to_table(&doc);
        assert_eq!(rows.len(), 3);
        let highlights: Vec<&str> = rows.iter().map(|r| r.highlight.as_str()).collect();
        assert_eq!(highlights, ["lo", "mid", "hi"]);
        assert!(rows.windows(2).all(|w| w[0].start <= w[1].start));

        assert_eq!(rows[0].title, "Foo");
        assert_eq!(rows[0].author, "Jane Doe");
        assert_eq!(rows[0].note.as_deref(), Some("n"));
        assert_eq!(rows[0].end, Some(2.0));
        assert_eq!(rows[0].color.as_deref(), Some("blue"));
    }

    #[test]
    fn test_to_table_is_stable_on_equal_start() {
        let doc = book(
            r#"{"title":"T","authors":"A","bookmarks":[
                {"text":"first","start":2},
                {"text":"early","start":1},
                {"text":"second","start":2},
                {"text":"third","start":2}
            ]}"#,
        );
        let highlights: Vec<String> = to_table(&doc).into_iter().map(|r| r.highlight).collect();
        assert_eq!(highlights, ["early", "first", "second", "third"]);
    }

    #[test]
    fn test_to_table_without_bookmarks_is_empty() {
        assert!(to_table(&book(r#"{"title":"T"}"#)).is_empty());
    }

    #[test]
    fn test_output_filename_strips_slashes() {
        assert_eq!(output_filename("Jane Doe", "Foo"), "Jane Doe Foo.csv");
        assert_eq!(
            output_filename("AC/DC", "Either/Or"),
            "ACDC EitherOr.csv"
        );
        assert_eq!(output_filename("None", "a\\b: c"), "None a\\b: c.csv");
    }

    #[test]
    fn test_write_csv_header_and_rows() {
        let doc = book(
            r#"{"title":"Foo","authors":"Jane Doe","bookmarks":[
                {"text":"hi","name":"","start":5,"end":6,"color":"yellow"},
                {"text":"lo","name":"n","start":1,"end":2,"color":"blue"}
            ]}"#,
        );
        let mut out = Vec::new();
        write_csv(&mut out, &to_table(&doc)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Title,Author,Highlight,Note\nFoo,Jane Doe,lo,n\nFoo,Jane Doe,hi,\n"
        );
    }

    #[test]
    fn test_write_csv_quotes_when_needed() {
        let doc = book(
            r#"{"title":"War, and Peace","authors":"Leo Tolstoy","bookmarks":[
                {"text":"He said \"no\"\nthen left","start":1}
            ]}"#,
        );
        let mut out = Vec::new();
        write_csv(&mut out, &to_table(&doc)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Title,Author,Highlight,Note\n\"War, and Peace\",Leo Tolstoy,\"He said \"\"no\"\"\nthen left\",\n"
        );
    }

    #[test]
    fn test_write_csv_empty_table_is_header_only() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Title,Author,Highlight,Note\n");
    }
}
