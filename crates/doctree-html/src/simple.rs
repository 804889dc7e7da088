//! Compact-list classification.
//!
//! A list is "simple" when every item holds at most one paragraph (a
//! trailing nested list does not count). Simple lists can be rendered
//! compactly, without the vertical space a paragraph normally gets.

use doctree::{Document, NodeId, NodeKind};

use crate::settings::Settings;

enum Verdict {
    /// Node is fine on its own; keep checking its children.
    Descend,
    /// Node is fine and its content cannot affect the result.
    SkipChildren,
    /// Node must satisfy the one-paragraph item shape first.
    ItemCheck,
    /// Node disqualifies the whole list.
    Abort,
}

fn classify(kind: &NodeKind) -> Verdict {
    match kind {
        NodeKind::Text(_)
        | NodeKind::Paragraph
        | NodeKind::Author
        | NodeKind::Copyright
        | NodeKind::Date
        | NodeKind::Organization
        | NodeKind::Status
        | NodeKind::Term
        | NodeKind::FieldName
        | NodeKind::Comment
        | NodeKind::SubstitutionDefinition
        | NodeKind::Target { .. }
        | NodeKind::Pending => Verdict::SkipChildren,
        NodeKind::BulletList
        | NodeKind::EnumeratedList { .. }
        | NodeKind::Docinfo
        | NodeKind::DefinitionList
        | NodeKind::DefinitionListItem
        | NodeKind::Classifier
        | NodeKind::FieldList
        | NodeKind::Field
        | NodeKind::Contact => Verdict::Descend,
        NodeKind::ListItem
        | NodeKind::Authors
        | NodeKind::Address
        | NodeKind::Version
        | NodeKind::Definition
        | NodeKind::FieldBody => Verdict::ItemCheck,
        _ => Verdict::Abort,
    }
}

/// Whether an item-like node has the one-paragraph shape: at most one
/// visible child once a trailing nested list is set aside.
fn item_is_simple(doc: &Document, id: NodeId) -> bool {
    let mut children = doc.visible_children(id);
    if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
        let trailing_list = matches!(
            doc[last].kind,
            NodeKind::BulletList | NodeKind::EnumeratedList { .. } | NodeKind::FieldList
        );
        if matches!(doc[first].kind, NodeKind::Paragraph) && trailing_list {
            children.pop();
        }
    }
    children.len() <= 1
}

fn walk(doc: &Document, id: NodeId) -> bool {
    match classify(&doc[id].kind) {
        Verdict::Abort => return false,
        Verdict::SkipChildren => return true,
        Verdict::ItemCheck => {
            if !item_is_simple(doc, id) {
                return false;
            }
        }
        Verdict::Descend => {}
    }
    doc.children(id).iter().all(|&child| walk(doc, child))
}

/// Whether every item of the list rooted at `id` is simple.
pub fn check_simple_list(doc: &Document, id: NodeId) -> bool {
    walk(doc, id)
}

/// Whether the list at `id` should be rendered compactly.
///
/// Explicit `compact`/`open` class arguments take precedence, then the
/// per-list-family settings, then the contents-topic special case, and
/// finally the structural check.
pub fn is_compactable(
    doc: &Document,
    id: NodeId,
    settings: &Settings,
    in_contents: bool,
) -> bool {
    let node = &doc[id];
    if node.classes.iter().any(|c| c == "compact") {
        return true;
    }
    if node.classes.iter().any(|c| c == "open") {
        return false;
    }
    match node.kind {
        NodeKind::FieldList | NodeKind::DefinitionList if !settings.compact_field_lists => {
            return false;
        }
        NodeKind::BulletList | NodeKind::EnumeratedList { .. } if !settings.compact_lists => {
            return false;
        }
        _ => {}
    }
    if in_contents {
        return true;
    }
    check_simple_list(doc, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with_paragraphs(doc: &mut Document, list: NodeId, count: usize) -> NodeId {
        let item = doc.push(list, NodeKind::ListItem);
        for i in 0..count {
            let para = doc.push(item, NodeKind::Paragraph);
            doc.push_text(para, format!("text {i}"));
        }
        item
    }

    #[test]
    fn test_single_paragraph_items_are_simple() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        item_with_paragraphs(&mut doc, list, 1);
        item_with_paragraphs(&mut doc, list, 1);
        assert!(check_simple_list(&doc, list));
    }

    #[test]
    fn test_two_paragraph_item_is_not_simple() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        item_with_paragraphs(&mut doc, list, 1);
        item_with_paragraphs(&mut doc, list, 2);
        assert!(!check_simple_list(&doc, list));
    }

    #[test]
    fn test_trailing_nested_list_does_not_count() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        let item = item_with_paragraphs(&mut doc, list, 1);
        let nested = doc.push(item, NodeKind::BulletList);
        item_with_paragraphs(&mut doc, nested, 1);
        assert!(check_simple_list(&doc, list));
    }

    #[test]
    fn test_nested_list_item_must_also_be_simple() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        let item = item_with_paragraphs(&mut doc, list, 1);
        let nested = doc.push(item, NodeKind::BulletList);
        item_with_paragraphs(&mut doc, nested, 2);
        assert!(!check_simple_list(&doc, list));
    }

    #[test]
    fn test_invisible_children_are_ignored() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        let item = item_with_paragraphs(&mut doc, list, 1);
        doc.push(item, NodeKind::Comment);
        doc.push(
            item,
            NodeKind::Target {
                refuri: None,
                refid: None,
                refname: None,
            },
        );
        assert!(check_simple_list(&doc, list));
    }

    #[test]
    fn test_block_quote_in_item_aborts() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        let item = item_with_paragraphs(&mut doc, list, 1);
        doc.push(item, NodeKind::BlockQuote);
        assert!(!check_simple_list(&doc, list));
    }

    #[test]
    fn test_compact_class_wins() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        item_with_paragraphs(&mut doc, list, 2);
        doc[list].classes.push("compact".to_owned());
        assert!(is_compactable(&doc, list, &Settings::default(), false));
    }

    #[test]
    fn test_open_class_wins() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        item_with_paragraphs(&mut doc, list, 1);
        doc[list].classes.push("open".to_owned());
        assert!(!is_compactable(&doc, list, &Settings::default(), false));
    }

    #[test]
    fn test_settings_disable_compaction() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        item_with_paragraphs(&mut doc, list, 1);
        let settings = Settings {
            compact_lists: false,
            ..Settings::default()
        };
        assert!(!is_compactable(&doc, list, &settings, false));

        let dl = doc.push(doc.root(), NodeKind::DefinitionList);
        let li = doc.push(dl, NodeKind::DefinitionListItem);
        let term = doc.push(li, NodeKind::Term);
        doc.push_text(term, "t");
        let settings = Settings {
            compact_field_lists: false,
            ..Settings::default()
        };
        assert!(!is_compactable(&doc, dl, &settings, false));
    }

    #[test]
    fn test_contents_topic_is_always_compact() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        item_with_paragraphs(&mut doc, list, 2);
        assert!(is_compactable(&doc, list, &Settings::default(), true));
    }
}
