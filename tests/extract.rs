mod common;

use common::{normalize_whitespace, render_pdf};
use docqa::extract::{extract_text, DocumentKind};

#[test]
fn single_page_pdf_round_trips() {
    let text = "quarterly revenue grew by twelve percent";
    let pdf = render_pdf(&[text]);
    let extracted = extract_text(&pdf, DocumentKind::Pdf).unwrap();
    assert_eq!(normalize_whitespace(&extracted), text);
    assert_eq!(extracted, extracted.trim());
}

#[test]
fn pdf_pages_are_joined_in_order() {
    let pdf = render_pdf(&["first page body", "second page body"]);
    let extracted = extract_text(&pdf, DocumentKind::Pdf).unwrap();
    let first = extracted.find("first page body").unwrap();
    let second = extracted.find("second page body").unwrap();
    assert!(first < second);
    assert!(extracted[first..second].contains('\n'));
}
