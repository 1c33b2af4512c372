//! Provider XML envelope: `<xml><name><![CDATA[value]]></name>...</xml>`.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::Result;
use crate::error::Error;
use crate::types::FieldMap;

const CDATA_END: &str = "]]>";

/// Encodes `fields` as a flat `<xml>` document, each value wrapped in CDATA.
///
/// A value containing `]]>` is split across two CDATA sections so the
/// document stays well-formed.
#[must_use]
pub fn encode(fields: &FieldMap) -> String {
    let mut out = String::from("<xml>");
    for (name, value) in fields {
        out.push('<');
        out.push_str(name);
        out.push_str("><![CDATA[");
        out.push_str(&value.replace(CDATA_END, "]]]]><![CDATA[>"));
        out.push_str("]]></");
        out.push_str(name);
        out.push('>');
    }
    out.push_str("</xml>");
    out
}

/// Decodes a flat envelope into a [`FieldMap`].
///
/// Only the direct children of the root element become fields; text nested
/// any deeper is ignored. DOCTYPE declarations are rejected outright and no
/// entity other than the five predefined ones is ever expanded.
pub fn decode(xml: &str) -> Result<FieldMap> {
    let mut reader = Reader::from_str(xml);

    let mut fields = FieldMap::new();
    let mut depth = 0_usize;
    let mut seen_root = false;
    let mut current: Option<(String, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 && seen_root {
                    return Err(Error::decode("multiple root elements"));
                }
                depth += 1;
                seen_root = true;
                if depth == 2 {
                    let name = std::str::from_utf8(e.name().as_ref())?.to_owned();
                    current = Some((name, String::new()));
                }
            }
            Event::Empty(e) => {
                match depth {
                    0 if seen_root => return Err(Error::decode("multiple root elements")),
                    0 => seen_root = true,
                    1 => {
                        let qname = e.name();
                        let name = std::str::from_utf8(qname.as_ref())?;
                        fields.insert(name, "");
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                if let Some((name, value)) = current.take_if(|_| depth == 2) {
                    fields.insert(name, value);
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                match (depth, current.as_mut()) {
                    (2, Some((_, value))) => value.push_str(&text),
                    (0 | 1, _) if !text.trim().is_empty() => {
                        return Err(Error::decode("unexpected text outside a field"));
                    }
                    _ => {}
                }
            }
            Event::CData(c) => {
                if let (2, Some((_, value))) = (depth, current.as_mut()) {
                    value.push_str(std::str::from_utf8(&c)?);
                }
            }
            Event::DocType(_) => {
                return Err(Error::decode("DOCTYPE declarations are not accepted"));
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {}
        }
    }

    if !seen_root {
        return Err(Error::decode("no root element"));
    }
    if depth != 0 {
        return Err(Error::decode("unclosed element"));
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    #[test]
    fn encode_wraps_values_in_cdata() {
        let fields = FieldMap::from([("return_code", "SUCCESS"), ("appid", "wx1")]);

        assert_eq!(
            encode(&fields),
            "<xml><appid><![CDATA[wx1]]></appid><return_code><![CDATA[SUCCESS]]></return_code></xml>"
        );
    }

    #[test]
    fn encode_empty_map() {
        assert_eq!(encode(&FieldMap::new()), "<xml></xml>");
    }

    #[test]
    fn decode_single_field() -> Result<()> {
        let fields = decode("<xml><a><![CDATA[x]]></a></xml>")?;

        assert_eq!(fields, FieldMap::from([("a", "x")]));
        Ok(())
    }

    #[test]
    fn decode_plain_text_and_entities() -> Result<()> {
        let fields = decode("<xml>\n  <total_fee>1</total_fee>\n  <body>a &amp; b</body>\n</xml>")?;

        assert_eq!(fields.get("total_fee"), Some("1"));
        assert_eq!(fields.get("body"), Some("a & b"));
        assert_eq!(fields.len(), 2);
        Ok(())
    }

    #[test]
    fn decode_empty_document_is_not_an_error() -> Result<()> {
        assert!(decode("<xml></xml>")?.is_empty(), "valid but empty");
        assert!(decode("<xml/>")?.is_empty(), "self-closing root");
        Ok(())
    }

    #[test]
    fn decode_empty_field() -> Result<()> {
        let fields = decode("<xml><attach/><body></body></xml>")?;

        assert_eq!(fields.get("attach"), Some(""));
        assert_eq!(fields.get("body"), Some(""));
        Ok(())
    }

    #[test]
    fn decode_rejects_malformed_input() {
        for input in ["<not-xml", "", "plain text", "<xml><a>1</b></xml>", "<xml><a>1</a>"] {
            let err = decode(input).expect_err(input);
            assert_eq!(err.kind(), Kind::Decode, "input: {input}");
        }
    }

    #[test]
    fn decode_rejects_doctype() {
        let hostile = r#"<?xml version="1.0"?><!DOCTYPE xml [<!ENTITY xxe SYSTEM "file:///etc/passwd">]><xml><a>&xxe;</a></xml>"#;

        let err = decode(hostile).expect_err("doctype must be rejected");
        assert_eq!(err.kind(), Kind::Decode);
    }

    #[test]
    fn decode_rejects_unknown_entity() {
        let err = decode("<xml><a>&xxe;</a></xml>").expect_err("entity must not resolve");

        assert_eq!(err.kind(), Kind::Decode);
    }

    #[test]
    fn decode_ignores_grandchildren_text() -> Result<()> {
        let fields = decode("<xml><a>1<b>2</b></a></xml>")?;

        assert_eq!(fields.get("a"), Some("1"));
        assert!(!fields.contains_key("b"), "only direct children are fields");
        Ok(())
    }

    #[test]
    fn nested_element_keeps_parent_and_siblings() -> Result<()> {
        let fields = decode("<xml><a>1<b>2</b></a><c>3</c><d/></xml>")?;

        assert_eq!(fields, FieldMap::from([("a", "1"), ("c", "3"), ("d", "")]));
        Ok(())
    }

    #[test]
    fn cdata_terminator_survives() -> Result<()> {
        let fields = FieldMap::from([("detail", "a]]>b")]);

        assert_eq!(decode(&encode(&fields))?, fields);
        Ok(())
    }
}
