#![no_main]

//! Fuzz target for path query parsing and evaluation.

use libfuzzer_sys::fuzz_target;
use pvstate_xml::{Query, parse_document};

#[derive(Debug, arbitrary::Arbitrary)]
struct QueryInput {
    path: String,
    document: String,
}

fuzz_target!(|input: QueryInput| {
    let Ok(query) = Query::parse(&input.path) else {
        return;
    };
    let Ok(doc) = parse_document(&input.document) else {
        return;
    };
    let all = doc.select_all(doc.document_node(), &query);
    let first = doc.select_first(doc.document_node(), &query);
    assert_eq!(all.first().copied(), first);
});
