//! Small helpers over quick-xml shared by the container and package parsers

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use std::borrow::Cow;

/// Value of the attribute whose local name matches, namespace prefix ignored
pub(crate) fn attr(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .map(|a| match a.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// Element local name as UTF-8
pub(crate) fn local_name<'a>(element: &'a BytesStart<'_>) -> Cow<'a, str> {
    String::from_utf8_lossy(element.local_name().into_inner())
}

/// Unescaped text content, falling back to the raw bytes for unknown entities
pub(crate) fn text(event: &BytesText<'_>) -> String {
    match event.unescape() {
        Ok(v) => v.into_owned(),
        Err(_) => String::from_utf8_lossy(event).into_owned(),
    }
}

/// Collapse runs of whitespace into single spaces and trim
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrite `<name/>` as `<name></name>` for every element not listed in
/// `void`, so an HTML parser reads XHTML shorthand the way an XML parser would.
///
/// Markup that is not well-formed enough to tokenize is returned unchanged.
pub(crate) fn expand_empty_elements<'a>(markup: &'a str, void: &[&str]) -> Cow<'a, str> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut out = String::new();
    let mut copied = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) => {
                let end = reader.buffer_position() as usize;
                let local = local_name(&e).to_ascii_lowercase();
                if void.contains(&local.as_str()) || !markup[..end].ends_with("/>") {
                    continue;
                }
                out.push_str(&markup[copied..end - 2]);
                out.push_str("></");
                out.push_str(&String::from_utf8_lossy(e.name().as_ref()));
                out.push('>');
                copied = end;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Chapter markup is not well-formed XML, parsing as HTML: {}", e);
                return Cow::Borrowed(markup);
            }
        }
    }

    if copied == 0 {
        return Cow::Borrowed(markup);
    }
    out.push_str(&markup[copied..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_empty_elements() {
        let void = ["br", "img"];
        assert_eq!(
            expand_empty_elements(r#"<head><title/><script src="a.js" /></head>"#, &void),
            r#"<head><title></title><script src="a.js" ></script></head>"#
        );
        assert_eq!(
            expand_empty_elements(r#"<p>a<br/>b<img src="x"/></p>"#, &void),
            r#"<p>a<br/>b<img src="x"/></p>"#
        );
        assert_eq!(
            expand_empty_elements("<svg:rect/>", &void),
            "<svg:rect></svg:rect>"
        );
    }

    #[test]
    fn test_expand_leaves_broken_markup() {
        let broken = "<p>a <div/> < b";
        assert!(matches!(
            expand_empty_elements(broken, &["br"]),
            Cow::Borrowed(s) if s == broken
        ));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  A \n\t tale  "), "A tale");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
