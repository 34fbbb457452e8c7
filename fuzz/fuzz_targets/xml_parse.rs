#![no_main]

//! Fuzz target for state text parsing.
//!
//! Anything that parses must render, and the rendering must parse again.

use libfuzzer_sys::fuzz_target;
use pvstate_xml::{parse_document, parse_element, render_document, render_element};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(doc) = parse_document(s) {
        let _ = render_document(&doc);
    }

    let Ok(element) = parse_element(s) else {
        return;
    };
    let rendered = render_element(&element).expect("parsed elements render");
    parse_element(&rendered).expect("rendered text parses");
});
