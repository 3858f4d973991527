use scraper::node::Element;
use scraper::Html;

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "br", "div", "li", "tr", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];

fn is_block(element: &Element) -> bool {
    BLOCK_ELEMENTS.contains(&element.name())
}

/// Plain text from an HTML fragment: tags dropped, entities decoded,
/// whitespace collapsed. Block elements separate words; inline ones don't.
pub fn strip_html(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let mut plain = String::new();

    for node in fragment.root_element().descendants() {
        if let Some(element) = node.value().as_element() {
            if is_block(element) {
                plain.push(' ');
            }
            continue;
        }

        let Some(text_node) = node.value().as_text() else {
            continue;
        };
        let in_script = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
            .unwrap_or(false);
        if in_script {
            continue;
        }
        // text following a closed block element
        if node
            .prev_sibling()
            .and_then(|s| s.value().as_element().map(is_block))
            .unwrap_or(false)
        {
            plain.push(' ');
        }
        plain.push_str(text_node);
    }

    plain.split_whitespace().collect::<Vec<_>>().join(" ")
}
