//! Lenient tag extraction over raw XML text.
//!
//! Provider payloads are not reliably namespace-consistent or well-formed, so
//! these helpers match literal `<tag>` / `</tag>` delimiters instead of parsing
//! a document tree. They ignore attributes, namespaces and nesting: the first
//! closing delimiter after an opening one ends the match, the same way a
//! non-greedy `<tag>(.*?)</tag>` pattern would.

/// Content of the first `<tag>...</tag>` pair, verbatim.
pub fn first_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let len = text[start..].find(&close)?;
    Some(&text[start..start + len])
}

/// Every non-overlapping `<tag>...</tag>` body, in document order.
///
/// An opening delimiter without a matching close ends the scan.
pub fn tag_blocks<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(&open) {
        let start = cursor + offset + open.len();
        let Some(len) = text[start..].find(&close) else {
            break;
        };
        blocks.push(&text[start..start + len]);
        cursor = start + len + close.len();
    }

    blocks
}

/// Trimmed content of the first `tag`, `None` when missing or blank.
pub fn optional_value<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    first_tag(text, tag)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tag_spans_newlines() {
        let xml = "<a>\n  one\n</a><a>two</a>";
        assert_eq!(first_tag(xml, "a"), Some("\n  one\n"));
    }

    #[test]
    fn first_tag_requires_both_delimiters() {
        assert_eq!(first_tag("<a>unterminated", "a"), None);
        assert_eq!(first_tag("no tags here", "a"), None);
    }

    #[test]
    fn first_tag_does_not_match_longer_names() {
        let xml = "<inq_keyword>x</inq_keyword><inq_key>42</inq_key>";
        assert_eq!(first_tag(xml, "inq_key"), Some("42"));
    }

    #[test]
    fn blocks_are_returned_in_order() {
        let xml = "<r><b>1</b>noise<b>2</b><b></b></r>";
        assert_eq!(tag_blocks(xml, "b"), vec!["1", "2", ""]);
    }

    #[test]
    fn blocks_stop_at_unterminated_tail() {
        let xml = "<b>1</b><b>2";
        assert_eq!(tag_blocks(xml, "b"), vec!["1"]);
    }

    #[test]
    fn optional_value_treats_blank_as_absent() {
        assert_eq!(optional_value("<x>  </x>", "x"), None);
        assert_eq!(optional_value("<x> PASS </x>", "x"), Some("PASS"));
        assert_eq!(optional_value("<y>1</y>", "x"), None);
    }
}
