use jcsv::{Error, ErrorKind, ParseOptions, SerializeOptions};
use rstest::rstest;

const INDEXED: &str = "\
#manifest
table,start_line,description
users,6,People
orders,10,\"Orders, open\"

#users
id,name
1,Ada
2,Lin
#orders{refs=[user]}
id,user
7,users
";

fn names(document: &jcsv::Document) -> Vec<&str> {
    document.names().collect()
}

#[rstest]
fn manifest_index_and_scan_agree() {
    let indexed = jcsv::parse(INDEXED).expect("indexed parse");
    let scanned =
        jcsv::parse_with_options(INDEXED, &ParseOptions::default().with_manifest(false))
            .expect("scan parse");
    assert!(indexed.errors().is_empty(), "{:?}", indexed.errors());
    assert!(scanned.errors().is_empty(), "{:?}", scanned.errors());
    assert_eq!(names(&indexed), vec!["users", "orders"]);
    assert_eq!(names(&indexed), names(&scanned));
    assert!(indexed.same_content(&scanned));
    assert_eq!(indexed.description("orders"), Some("Orders, open"));
    assert_eq!(scanned.description("orders"), None);
}

#[rstest]
#[case("users,5,People\norders,10,O", 1)]
#[case("users,6,People\norders,2,O", 1)]
#[case("users,6,People\norders,,O", 0)]
#[case("users,x,People\norders,10,O", 1)]
#[case("users,10,People\norders,6,O", 2)]
#[case("users,6,People\nghost,20,G", 2)]
fn manifest_problems_fall_back_to_scanning(#[case] rows: &str, #[case] diagnostics: usize) {
    let input = format!(
        "#manifest\ntable,start_line,description\n{rows}\n\n\
         #users\nid,name\n1,Ada\n2,Lin\n#orders\nid,user\n7,users\n"
    );
    let document = jcsv::parse(&input).expect("parse");
    assert_eq!(names(&document), vec!["users", "orders"]);
    assert_eq!(document.errors().len(), diagnostics, "{:?}", document.errors());
    assert!(document
        .errors()
        .iter()
        .all(|error| error.kind() == ErrorKind::ManifestInconsistency));
}

#[rstest]
fn manifest_without_rows_is_scanned_past() {
    let input = "#manifest\ntable,start_line,description\n\n#users\nid\n1\n#orders\nid\n7\n";
    let document = jcsv::parse(input).expect("parse");
    assert_eq!(names(&document), vec!["users", "orders"]);
    assert!(document.errors().is_empty(), "{:?}", document.errors());
}

#[rstest]
#[case("#a\nx\n1\n#a\ny\n2\n", ErrorKind::DuplicateBlockName, Some(4))]
#[case("#a\nx\n#manifest\ntable,description\n", ErrorKind::ReservedNameMisuse, Some(3))]
#[case("#a\nx\n#b c\ny\n", ErrorKind::MalformedHeader, Some(3))]
#[case("#a{k=1\nx\n", ErrorKind::MalformedHeader, Some(1))]
#[case("#a{k=[}\nx\n", ErrorKind::MalformedMetadata, Some(1))]
#[case("note\n#a\nx\n", ErrorKind::MalformedHeader, Some(1))]
#[case("#a\nx,y\n1\n", ErrorKind::CsvParse, Some(3))]
fn structural_errors_are_fatal(
    #[case] input: &str,
    #[case] kind: ErrorKind,
    #[case] line: Option<usize>,
) {
    let err = jcsv::parse(input).expect_err("must fail");
    assert_eq!(err.kind(), kind, "{err}");
    if line.is_some() {
        assert_eq!(err.line(), line, "{err}");
    }
}

#[rstest]
#[case("#a\nx\n1\n#b c\ny\n#c\nz\n", vec!["a", "c"], ErrorKind::MalformedHeader)]
#[case("#a\nx\n1\n#b{k=[}\ny\n2\n", vec!["a", "b"], ErrorKind::MalformedMetadata)]
#[case("#a\nx\n1\n#b\ny\n1,2\n", vec!["a"], ErrorKind::CsvParse)]
#[case("junk\n#a\nx\n", vec!["a"], ErrorKind::MalformedHeader)]
fn lenient_mode_reports_and_continues(
    #[case] input: &str,
    #[case] expected: Vec<&str>,
    #[case] kind: ErrorKind,
) {
    let options = ParseOptions::default().with_strict(false);
    let document = jcsv::parse_with_options(input, &options).expect("lenient parse");
    assert_eq!(names(&document), expected);
    assert_eq!(document.errors().len(), 1);
    assert_eq!(document.errors()[0].kind(), kind);
}

#[rstest]
fn duplicate_names_stay_fatal_when_lenient() {
    let options = ParseOptions::default().with_strict(false);
    let err = jcsv::parse_with_options("#a\nx\n#a\ny\n", &options).expect_err("duplicate");
    assert!(matches!(err, Error::DuplicateBlockName { .. }));
}

#[rstest]
fn hash_prefixed_rows_are_data() {
    let input = "#tags\nid,tag\n#1,x\n\"#2\",y\n";
    let document = jcsv::parse(input).expect("parse");
    let tags = document.get("tags").expect("tags");
    assert_eq!(tags.record_count(), 2);
    assert_eq!(tags.cell(0, "id").map(|cell| cell.as_str()), Some("#1"));
    assert_eq!(tags.cell(1, "id").map(|cell| cell.as_str()), Some("#2"));
    let text = jcsv::to_string(&document).expect("serialize");
    assert_eq!(text, "#tags\nid,tag\n\"#1\",\"x\"\n\"#2\",\"y\"\n");
}

#[rstest]
#[case("#a\nx\n#users \n")]
#[case("#a\nx\n#users\u{a0}\n")]
fn trailing_whitespace_lines_are_data(#[case] input: &str) {
    let document = jcsv::parse(input).expect("parse");
    assert_eq!(names(&document), vec!["a"]);
    let a = document.get("a").expect("a");
    assert_eq!(a.record_count(), 1);
    assert!(a.cell(0, "x").is_some_and(|cell| cell.as_str().starts_with("#users")));
}

#[rstest]
fn crlf_input_is_accepted() {
    let input = "#a{comment=x}\r\nid,name\r\n1,Ada\r\n\r\n#b\r\nk\r\nv\r\n";
    let document = jcsv::parse(input).expect("parse");
    assert_eq!(names(&document), vec!["a", "b"]);
    let a = document.get("a").expect("a");
    assert_eq!(a.columns().collect::<Vec<_>>(), vec!["id", "name"]);
    assert_eq!(a.cell(0, "name").map(|cell| cell.as_str()), Some("Ada"));
    assert_eq!(
        jcsv::to_string(&document).expect("serialize"),
        "#a{comment=x}\nid,name\n1,Ada\n\n#b\nk\nv\n"
    );
}

#[rstest]
fn quoted_fields_span_lines() {
    let input = "#notes\nid,text\n1,\"first\nsecond\"\n2,plain\n";
    let document = jcsv::parse(input).expect("parse");
    let notes = document.get("notes").expect("notes");
    assert_eq!(notes.record_count(), 2);
    assert_eq!(
        notes.cell(0, "text").map(|cell| cell.as_str()),
        Some("first\nsecond")
    );
}

#[rstest]
fn emitted_manifest_is_used_on_reparse() {
    let document = jcsv::parse(INDEXED).expect("parse");
    let options = SerializeOptions::default().with_manifest(true);
    let text = jcsv::to_string_with_options(&document, &options).expect("serialize");
    assert!(text.starts_with(
        "#manifest\ntable,start_line,description\nusers,6,People\norders,11,\"Orders, open\"\n\n#users\n"
    ));
    let reparsed = jcsv::parse(&text).expect("reparse");
    assert!(reparsed.errors().is_empty(), "{:?}", reparsed.errors());
    assert_eq!(jcsv::to_string_with_options(&reparsed, &options).expect("again"), text);
}
