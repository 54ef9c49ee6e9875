use crate::domain::TitleRecord;
use crate::error::ParseError;

/// Upper bound on a single piece of markup (tag, comment, CDATA section).
pub const MAX_MARKUP_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatcher {
    name: String,
    attribute: Option<(String, String)>,
}

impl TagMatcher {
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(
        name: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            attribute: Some((attribute.into(), value.into())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, tag: &StartTag) -> bool {
        if tag.name != self.name {
            return false;
        }
        match &self.attribute {
            None => true,
            Some((key, value)) => tag
                .attributes
                .iter()
                .any(|(name, found)| name == key && found == value),
        }
    }
}

/// Without a `record` element every identifier element is a record of its
/// own; with one, the other fields are looked up inside each record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSchema {
    pub record: Option<String>,
    pub identifier: TagMatcher,
    pub text: Option<TagMatcher>,
    pub accession: Option<TagMatcher>,
    pub error: Option<String>,
}

impl TagSchema {
    pub fn search_ids() -> Self {
        Self {
            record: None,
            identifier: TagMatcher::element("Id"),
            text: None,
            accession: None,
            error: Some("ERROR".to_string()),
        }
    }

    pub fn summary_titles(title_item: &str, accession_item: &str) -> Self {
        Self {
            record: Some("DocSum".to_string()),
            identifier: TagMatcher::element("Id"),
            text: Some(TagMatcher::with_attribute("Item", "Name", title_item)),
            accession: Some(TagMatcher::with_attribute("Item", "Name", accession_item)),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub identifier: String,
    pub text: Option<String>,
    pub accession: Option<String>,
}

impl ParsedRecord {
    pub fn into_title(self) -> TitleRecord {
        let title = TitleRecord::new(self.identifier, self.text.unwrap_or_default());
        match self.accession {
            Some(accession) => title.with_accession(accession),
            None => title,
        }
    }
}

pub trait RecordSink {
    fn record(&mut self, record: ParsedRecord);
}

impl RecordSink for Vec<ParsedRecord> {
    fn record(&mut self, record: ParsedRecord) {
        self.push(record);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Text,
    Markup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Identifier,
    Text,
    Accession,
    Error,
}

#[derive(Debug)]
struct Capture {
    field: Field,
    depth: usize,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct RecordBuilder {
    depth: usize,
    identifier: Option<String>,
    text: Option<String>,
    accession: Option<String>,
}

#[derive(Debug)]
struct StartTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

#[derive(Debug)]
pub struct StreamingParser {
    schema: TagSchema,
    mode: Mode,
    markup: Vec<u8>,
    quote: Option<u8>,
    stack: Vec<String>,
    capture: Option<Capture>,
    record: Option<RecordBuilder>,
    saw_element: bool,
    emitted: usize,
    failed: Option<ParseError>,
}

impl StreamingParser {
    pub fn new(schema: TagSchema) -> Self {
        Self {
            schema,
            mode: Mode::Text,
            markup: Vec::new(),
            quote: None,
            stack: Vec::new(),
            capture: None,
            record: None,
            saw_element: false,
            emitted: 0,
            failed: None,
        }
    }

    pub fn records_emitted(&self) -> usize {
        self.emitted
    }

    /// Once an error is returned the parser stays failed. Records delivered
    /// to `sink` before the fault stay there.
    pub fn feed(&mut self, chunk: &[u8], sink: &mut dyn RecordSink) -> Result<(), ParseError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        let result = self.consume(chunk, sink);
        if let Err(err) = &result {
            self.failed = Some(err.clone());
        }
        result
    }

    pub fn finish(self) -> Result<usize, ParseError> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        if self.mode == Mode::Markup {
            return Err(ParseError::TruncatedMarkup);
        }
        if let Some(open) = self.stack.last() {
            return Err(ParseError::UnclosedElement(open.clone()));
        }
        if !self.saw_element {
            return Err(ParseError::EmptyDocument);
        }
        Ok(self.emitted)
    }

    fn consume(&mut self, chunk: &[u8], sink: &mut dyn RecordSink) -> Result<(), ParseError> {
        let mut rest = chunk;
        while !rest.is_empty() {
            match self.mode {
                Mode::Text => match rest.iter().position(|&b| b == b'<') {
                    Some(pos) => {
                        self.text(&rest[..pos]);
                        self.mode = Mode::Markup;
                        self.markup.clear();
                        self.quote = None;
                        rest = &rest[pos + 1..];
                    }
                    None => {
                        self.text(rest);
                        rest = &[];
                    }
                },
                Mode::Markup => {
                    let mut closed_at = None;
                    for (i, &byte) in rest.iter().enumerate() {
                        if byte == b'>' && self.markup_complete() {
                            closed_at = Some(i);
                            break;
                        }
                        self.push_markup(byte)?;
                    }
                    match closed_at {
                        Some(i) => {
                            rest = &rest[i + 1..];
                            self.mode = Mode::Text;
                            let markup = std::mem::take(&mut self.markup);
                            self.handle_markup(&markup, sink)?;
                        }
                        None => rest = &[],
                    }
                }
            }
        }
        Ok(())
    }

    fn push_markup(&mut self, byte: u8) -> Result<(), ParseError> {
        if self.markup.len() >= MAX_MARKUP_LEN {
            return Err(ParseError::TagTooLong(MAX_MARKUP_LEN));
        }
        if !self.in_raw_section() {
            match self.quote {
                Some(open) if open == byte => self.quote = None,
                None if byte == b'"' || byte == b'\'' => self.quote = Some(byte),
                _ => {}
            }
        }
        self.markup.push(byte);
        Ok(())
    }

    fn in_raw_section(&self) -> bool {
        self.markup.starts_with(b"!--") || self.markup.starts_with(b"![CDATA[")
    }

    fn markup_complete(&self) -> bool {
        if self.markup.starts_with(b"!--") {
            return self.markup.len() >= 5 && self.markup.ends_with(b"--");
        }
        if self.markup.starts_with(b"![CDATA[") {
            return self.markup.len() >= 10 && self.markup.ends_with(b"]]");
        }
        self.quote.is_none()
    }

    fn text(&mut self, bytes: &[u8]) {
        if let Some(capture) = &mut self.capture {
            capture.bytes.extend_from_slice(bytes);
        }
    }

    fn handle_markup(&mut self, markup: &[u8], sink: &mut dyn RecordSink) -> Result<(), ParseError> {
        if markup.starts_with(b"![CDATA[") {
            let content = &markup[8..markup.len() - 2];
            // Field bytes are entity-decoded on close, so CDATA ampersands
            // must survive that pass.
            if let Some(capture) = &mut self.capture {
                for &byte in content {
                    if byte == b'&' {
                        capture.bytes.extend_from_slice(b"&amp;");
                    } else {
                        capture.bytes.push(byte);
                    }
                }
            }
            return Ok(());
        }
        if markup.starts_with(b"?") || markup.starts_with(b"!") {
            return Ok(());
        }

        let raw = std::str::from_utf8(markup)
            .map_err(|_| ParseError::MalformedTag(String::from_utf8_lossy(markup).into_owned()))?;
        if let Some(name) = raw.strip_prefix('/') {
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(ParseError::MalformedTag(raw.to_string()));
            }
            return self.end_element(name, sink);
        }
        let tag = parse_start_tag(raw)?;
        self.start_element(tag, sink)
    }

    fn start_element(&mut self, tag: StartTag, sink: &mut dyn RecordSink) -> Result<(), ParseError> {
        self.saw_element = true;
        let depth = self.stack.len() + 1;

        let is_record = self.schema.record.as_deref() == Some(tag.name.as_str());
        if is_record {
            if self.record.is_some() {
                return Err(ParseError::NestedRecord(tag.name));
            }
            self.record = Some(RecordBuilder {
                depth,
                ..RecordBuilder::default()
            });
        } else if self.capture.is_none() {
            self.capture = self.capture_for(&tag).map(|field| Capture {
                field,
                depth,
                bytes: Vec::new(),
            });
        }

        let self_closing = tag.self_closing;
        let name = tag.name;
        self.stack.push(name.clone());
        if self_closing {
            self.end_element(&name, sink)?;
        }
        Ok(())
    }

    fn capture_for(&self, tag: &StartTag) -> Option<Field> {
        if self.schema.error.as_deref() == Some(tag.name.as_str()) {
            return Some(Field::Error);
        }
        if self.schema.record.is_some() {
            let record = self.record.as_ref()?;
            if record.identifier.is_none() && self.schema.identifier.matches(tag) {
                return Some(Field::Identifier);
            }
            let wanted = |value: &Option<String>, matcher: &Option<TagMatcher>| {
                value.is_none() && matcher.as_ref().is_some_and(|m| m.matches(tag))
            };
            if wanted(&record.text, &self.schema.text) {
                return Some(Field::Text);
            }
            return wanted(&record.accession, &self.schema.accession)
                .then_some(Field::Accession);
        }
        self.schema.identifier.matches(tag).then_some(Field::Identifier)
    }

    fn end_element(&mut self, name: &str, sink: &mut dyn RecordSink) -> Result<(), ParseError> {
        let Some(open) = self.stack.last() else {
            return Err(ParseError::UnexpectedClosingTag(name.to_string()));
        };
        if open != name {
            return Err(ParseError::MismatchedTag {
                expected: open.clone(),
                found: name.to_string(),
            });
        }
        let depth = self.stack.len();
        self.stack.pop();

        if self.capture.as_ref().is_some_and(|capture| capture.depth == depth) {
            if let Some(capture) = self.capture.take() {
                self.close_field(name, capture, sink)?;
            }
        }

        if self.record.as_ref().is_some_and(|record| record.depth == depth) {
            if let Some(record) = self.record.take() {
                let identifier = record.identifier.ok_or(ParseError::MissingIdentifier)?;
                self.emit(
                    ParsedRecord {
                        identifier,
                        text: record.text,
                        accession: record.accession,
                    },
                    sink,
                );
            }
        }
        Ok(())
    }

    fn close_field(
        &mut self,
        name: &str,
        capture: Capture,
        sink: &mut dyn RecordSink,
    ) -> Result<(), ParseError> {
        let raw = String::from_utf8(capture.bytes)
            .map_err(|_| ParseError::InvalidUtf8(name.to_string()))?;
        let value = unescape(raw.trim());
        match capture.field {
            Field::Error => Err(ParseError::Remote(value)),
            Field::Identifier if value.is_empty() => Err(ParseError::MissingIdentifier),
            Field::Identifier => {
                match &mut self.record {
                    Some(record) => record.identifier = Some(value),
                    None => self.emit(
                        ParsedRecord {
                            identifier: value,
                            text: None,
                            accession: None,
                        },
                        sink,
                    ),
                }
                Ok(())
            }
            Field::Text => {
                if let Some(record) = &mut self.record {
                    record.text = Some(value);
                }
                Ok(())
            }
            Field::Accession => {
                if let Some(record) = &mut self.record {
                    record.accession = Some(value).filter(|value| !value.is_empty());
                }
                Ok(())
            }
        }
    }

    fn emit(&mut self, record: ParsedRecord, sink: &mut dyn RecordSink) {
        self.emitted += 1;
        sink.record(record);
    }
}

fn parse_start_tag(raw: &str) -> Result<StartTag, ParseError> {
    let malformed = || ParseError::MalformedTag(raw.to_string());
    let (body, self_closing) = match raw.strip_suffix('/') {
        Some(body) => (body, true),
        None => (raw, false),
    };
    let body = body.trim_end();
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() || name.contains(['<', '=', '"', '\'']) {
        return Err(malformed());
    }
    let attributes = parse_attributes(&body[name_end..]).ok_or_else(malformed)?;
    Ok(StartTag {
        name: name.to_string(),
        attributes,
        self_closing,
    })
}

fn parse_attributes(input: &str) -> Option<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        rest = rest[eq + 1..].trim_start();
        let quote = rest.chars().next().filter(|ch| *ch == '"' || *ch == '\'')?;
        rest = &rest[1..];
        let end = rest.find(quote)?;
        attributes.push((key.to_string(), unescape(&rest[..end])));
        rest = rest[end + 1..].trim_start();
    }
    Some(attributes)
}

/// Unknown entities are left as written.
pub fn unescape(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos..];
        let decoded = after
            .find(';')
            .filter(|end| *end <= 12)
            .and_then(|end| decode_entity(&after[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const IDS: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE eSearchResult PUBLIC "-//NLM//DTD esearch 20060628//EN" "https://eutils.ncbi.nlm.nih.gov/eutils/dtd/20060628/esearch.dtd">
<eSearchResult><Count>3</Count><RetMax>3</RetMax><RetStart>0</RetStart><IdList>
<Id>1ABC</Id>
<Id>2XYZ</Id>
<Id>3DEF</Id>
</IdList></eSearchResult>
"#;

    const TITLES: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<eSummaryResult>
<DocSum>
	<Id>2XYZ</Id>
	<Item Name="PdbAcc" Type="String">2XYZ</Item>
	<Item Name="PdbDescr" Type="String">Myoglobin &amp; heme</Item>
	<Item Name="OrganismList" Type="List"><Item Name="string" Type="String">Physeter catodon</Item></Item>
</DocSum>
<DocSum>
	<Id>1ABC</Id>
	<Item Name="PdbDescr" Type="String"><![CDATA[Hemoglobin <alpha> & beta]]></Item>
</DocSum>
</eSummaryResult>
"#;

    fn parse_whole(schema: TagSchema, input: &[u8]) -> Result<Vec<ParsedRecord>, ParseError> {
        let mut records = Vec::new();
        let mut parser = StreamingParser::new(schema);
        parser.feed(input, &mut records)?;
        parser.finish()?;
        Ok(records)
    }

    fn ids(records: &[ParsedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.identifier.as_str()).collect()
    }

    #[test]
    fn extracts_identifiers_in_document_order() {
        let records = parse_whole(TagSchema::search_ids(), IDS.as_bytes()).unwrap();
        assert_eq!(ids(&records), vec!["1ABC", "2XYZ", "3DEF"]);
        assert!(records.iter().all(|r| r.text.is_none()));
    }

    #[test]
    fn extracts_titles_with_entities_and_cdata() {
        let records =
            parse_whole(TagSchema::summary_titles("PdbDescr", "PdbAcc"), TITLES.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, "2XYZ");
        assert_eq!(records[0].text.as_deref(), Some("Myoglobin & heme"));
        assert_eq!(records[1].identifier, "1ABC");
        assert_eq!(records[1].text.as_deref(), Some("Hemoglobin <alpha> & beta"));
    }

    #[test]
    fn every_split_point_yields_the_same_records() {
        for (schema, payload) in [
            (TagSchema::search_ids(), IDS),
            (TagSchema::summary_titles("PdbDescr", "PdbAcc"), TITLES),
        ] {
            let expected = parse_whole(schema.clone(), payload.as_bytes()).unwrap();
            let bytes = payload.as_bytes();
            for split in 0..=bytes.len() {
                let mut records = Vec::new();
                let mut parser = StreamingParser::new(schema.clone());
                parser.feed(&bytes[..split], &mut records).unwrap();
                parser.feed(&bytes[split..], &mut records).unwrap();
                parser.finish().unwrap();
                assert_eq!(records, expected, "split at {split}");
            }
        }
    }

    #[test]
    fn multibyte_text_survives_byte_sized_chunks() {
        let payload = "<eSummaryResult><DocSum><Id>1A</Id><Item Name=\"PdbDescr\">Cytochrome c\u{2032} \u{3b1}-helix</Item></DocSum></eSummaryResult>";
        let mut records = Vec::new();
        let mut parser = StreamingParser::new(TagSchema::summary_titles("PdbDescr", "PdbAcc"));
        for byte in payload.as_bytes() {
            parser.feed(std::slice::from_ref(byte), &mut records).unwrap();
        }
        parser.finish().unwrap();
        assert_eq!(
            records[0].text.as_deref(),
            Some("Cytochrome c\u{2032} \u{3b1}-helix")
        );
    }

    #[test]
    fn records_are_emitted_as_soon_as_they_close() {
        let mut records = Vec::new();
        let mut parser = StreamingParser::new(TagSchema::search_ids());
        parser
            .feed(b"<eSearchResult><IdList><Id>1ABC</Id><Id>2X", &mut records)
            .unwrap();
        assert_eq!(ids(&records), vec!["1ABC"]);
        assert_eq!(parser.records_emitted(), 1);
    }

    #[test]
    fn mismatched_closing_tag_keeps_earlier_records() {
        let mut records = Vec::new();
        let mut parser = StreamingParser::new(TagSchema::search_ids());
        let err = parser
            .feed(
                b"<eSearchResult><IdList><Id>1ABC</Id><Id>2XYZ</Count></IdList>",
                &mut records,
            )
            .unwrap_err();
        assert_matches!(err, ParseError::MismatchedTag { ref expected, ref found }
            if expected == "Id" && found == "Count");
        assert_eq!(ids(&records), vec!["1ABC"]);

        let again = parser.feed(b"<Id>9ZZZ</Id>", &mut records).unwrap_err();
        assert_eq!(again, err);
        assert_eq!(records.len(), 1);
        assert_eq!(parser.finish().unwrap_err(), err);
    }

    #[test]
    fn closing_tag_without_open_element_fails() {
        let err = parse_whole(TagSchema::search_ids(), b"</IdList>").unwrap_err();
        assert_matches!(err, ParseError::UnexpectedClosingTag(name) if name == "IdList");
    }

    #[test]
    fn truncated_payloads_fail_on_finish() {
        let err = parse_whole(TagSchema::search_ids(), b"<eSearchResult><IdList><Id>1A")
            .unwrap_err();
        assert_matches!(err, ParseError::UnclosedElement(name) if name == "Id");

        let err = parse_whole(TagSchema::search_ids(), b"<eSearchResult></eSearchRes")
            .unwrap_err();
        assert_eq!(err, ParseError::TruncatedMarkup);
    }

    #[test]
    fn empty_body_is_not_a_document() {
        let err = parse_whole(TagSchema::search_ids(), b"  \n").unwrap_err();
        assert_eq!(err, ParseError::EmptyDocument);
    }

    #[test]
    fn empty_id_list_is_valid() {
        let records = parse_whole(
            TagSchema::search_ids(),
            b"<eSearchResult><Count>0</Count><IdList/></eSearchResult>",
        )
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn remote_error_element_is_reported() {
        let err = parse_whole(
            TagSchema::search_ids(),
            b"<eSearchResult><ERROR>Empty term and query_key - nothing todo</ERROR></eSearchResult>",
        )
        .unwrap_err();
        assert_matches!(err, ParseError::Remote(message) if message.starts_with("Empty term"));
    }

    #[test]
    fn nested_record_is_rejected() {
        let err = parse_whole(
            TagSchema::summary_titles("PdbDescr", "PdbAcc"),
            b"<r><DocSum><Id>1</Id><DocSum></DocSum></DocSum></r>",
        )
        .unwrap_err();
        assert_matches!(err, ParseError::NestedRecord(_));
    }

    #[test]
    fn record_without_identifier_is_rejected() {
        let err = parse_whole(
            TagSchema::summary_titles("PdbDescr", "PdbAcc"),
            br#"<r><DocSum><Item Name="PdbDescr">orphan</Item></DocSum></r>"#,
        )
        .unwrap_err();
        assert_eq!(err, ParseError::MissingIdentifier);
    }

    #[test]
    fn record_without_title_item_has_no_text() {
        let records = parse_whole(
            TagSchema::summary_titles("PdbDescr", "PdbAcc"),
            br#"<r><DocSum><Id>7Q</Id><Item Name="PdbAcc">7Q</Item></DocSum></r>"#,
        )
        .unwrap();
        assert_eq!(records[0].identifier, "7Q");
        assert_eq!(records[0].text, None);
        assert_eq!(records[0].accession.as_deref(), Some("7Q"));
    }

    #[test]
    fn accession_is_captured_beside_the_title() {
        let payload = br#"<r><DocSum><Id>1159487</Id><Item Name="PdbAcc">1A3N</Item><Item Name="PdbDescr">Deoxy Human Hemoglobin</Item></DocSum><DocSum><Id>64830</Id><Item Name="PdbAcc"></Item></DocSum></r>"#;
        let records = parse_whole(TagSchema::summary_titles("PdbDescr", "PdbAcc"), payload).unwrap();
        assert_eq!(records[0].identifier, "1159487");
        assert_eq!(records[0].accession.as_deref(), Some("1A3N"));
        assert_eq!(records[0].text.as_deref(), Some("Deoxy Human Hemoglobin"));
        assert_eq!(records[1].accession, None);

        let title = records[0].clone().into_title();
        assert_eq!(title.accession.as_deref(), Some("1A3N"));
        assert_eq!(title.title, "Deoxy Human Hemoglobin");
    }

    #[test]
    fn comments_and_quoted_brackets_are_skipped() {
        let payload = br#"<r><!-- <Id>0NOPE</Id> --><DocSum note="a > b"><Id>4K</Id><Item Name='PdbDescr'>Kinase</Item></DocSum></r>"#;
        let records = parse_whole(TagSchema::summary_titles("PdbDescr", "PdbAcc"), payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "4K");
        assert_eq!(records[0].text.as_deref(), Some("Kinase"));
    }

    #[test]
    fn oversized_markup_fails() {
        let mut payload = b"<r ".to_vec();
        payload.extend(std::iter::repeat_n(b'a', MAX_MARKUP_LEN + 1));
        let mut records = Vec::new();
        let mut parser = StreamingParser::new(TagSchema::search_ids());
        let err = parser.feed(&payload, &mut records).unwrap_err();
        assert_eq!(err, ParseError::TagTooLong(MAX_MARKUP_LEN));
    }

    #[test]
    fn malformed_attribute_is_rejected() {
        let err = parse_whole(TagSchema::search_ids(), b"<r a=unquoted></r>").unwrap_err();
        assert_matches!(err, ParseError::MalformedTag(_));
    }

    #[test]
    fn unescape_handles_numeric_references() {
        assert_eq!(unescape("&#945;&#x3B2; &lt;ok&gt;"), "\u{3b1}\u{3b2} <ok>");
        assert_eq!(unescape("AT&T &bogus; &"), "AT&T &bogus; &");
    }
}
