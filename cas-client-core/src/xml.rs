use roxmltree::{Document, Error, Node};
use std::borrow::Cow;

/// Upper bound on the namespace prefixes declared on behalf of a document.
const MAX_UNDECLARED_PREFIXES: usize = 8;

/// Parses `text` and hands the document to `read`.
///
/// CAS servers and their proxies regularly send `cas:` or `samlp:` elements
/// without the matching `xmlns` declaration. Each prefix reported as unknown
/// is declared on a wrapping element and parsing is retried.
pub(crate) fn parse_lenient<T, F>(text: &str, read: F) -> Result<T, Error>
where
    F: FnOnce(&Document) -> T,
{
    let mut prefixes: Vec<String> = Vec::new();
    let mut source = Cow::Borrowed(text);
    loop {
        let error = match Document::parse(&source) {
            Ok(document) => return Ok(read(&document)),
            Err(err) => err,
        };
        match error {
            Error::UnknownNamespace(prefix, _)
                if prefixes.len() < MAX_UNDECLARED_PREFIXES && !prefixes.contains(&prefix) =>
            {
                debug!("Declaring undeclared namespace prefix `{}`", prefix);
                prefixes.push(prefix);
                source = Cow::Owned(declare_prefixes(text, &prefixes));
            }
            err => return Err(err),
        }
    }
}

fn declare_prefixes(text: &str, prefixes: &[String]) -> String {
    let namespaces: String = prefixes
        .iter()
        .map(|prefix| format!(" xmlns:{0}=\"urn:undeclared:{0}\"", prefix))
        .collect();
    format!(
        "<undeclared{}>{}</undeclared>",
        namespaces,
        without_declaration(text)
    )
}

/// `text` without its byte order mark and `<?xml ...?>` declaration.
fn without_declaration(text: &str) -> &str {
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<?xml") {
        if let Some(end) = text.find("?>") {
            return &text[end + 2..];
        }
    }
    text
}

/// True when `node` is an element whose local name matches `name`, ignoring
/// the namespace prefix and ASCII case.
pub(crate) fn is_named(node: Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

/// First descendant element (document order) named `name`.
pub(crate) fn find_descendant<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants().find(|n| is_named(*n, name))
}

/// Concatenated text of every text node below `node`.
pub(crate) fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

pub(crate) fn trimmed_text(node: Node) -> String {
    text_content(node).trim().to_string()
}

/// Lower-cased local tag name.
pub(crate) fn local_name(node: Node) -> String {
    node.tag_name().name().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const RESP: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
        <cas:authenticationSuccess>
            <cas:user> jdoe </cas:user>
            <cas:Title>Mr.<b xmlns="">Jr</b></cas:Title>
        </cas:authenticationSuccess>
    </cas:serviceResponse>"#;

    #[test]
    fn lookups_ignore_prefix_and_case() {
        let doc = Document::parse(RESP).unwrap();
        let success = find_descendant(doc.root(), "AUTHENTICATIONSUCCESS").unwrap();
        assert!(is_named(success, "authenticationSuccess"));
        let user = find_descendant(success, "user").unwrap();
        assert_eq!(trimmed_text(user), "jdoe");
        assert!(find_descendant(success, "attributes").is_none());
    }

    #[test]
    fn undeclared_prefixes_are_tolerated() {
        let resp = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
            <cas:serviceResponse>
                <cas:authenticationSuccess>
                    <cas:user>jdoe</cas:user>
                    <foo:bar xsi:type=\"x\">baz</foo:bar>
                </cas:authenticationSuccess>
            </cas:serviceResponse>";
        let user = parse_lenient(resp, |doc| {
            find_descendant(doc.root(), "user").map(trimmed_text)
        })
        .unwrap();
        assert_eq!(user, Some(String::from("jdoe")));
    }

    #[test]
    fn declared_documents_are_parsed_as_is() {
        let root = parse_lenient(RESP, |doc| local_name(doc.root_element())).unwrap();
        assert_eq!(root, "serviceresponse");
    }

    #[test]
    fn malformed_documents_still_fail() {
        assert!(parse_lenient("<cas:user>jdoe", |_| ()).is_err());
        assert!(parse_lenient("Internal Server Error", |_| ()).is_err());
        assert!(parse_lenient("", |_| ()).is_err());
    }

    #[test]
    fn text_content_includes_nested_text() {
        let doc = Document::parse(RESP).unwrap();
        let title = find_descendant(doc.root(), "title").unwrap();
        assert_eq!(text_content(title), "Mr.Jr");
        assert_eq!(local_name(title), "title");
    }
}
