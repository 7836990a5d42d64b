use indoc::indoc;
use notemark::run::{Error, OsFacade, OutputFormat, RunOptions, RunOptionsBuilder};
use std::io;
use std::io::ErrorKind;

#[derive(Debug)]
struct Case {
    options: RunOptions,
    note: &'static str,
    files: &'static [(&'static str, &'static str)],
}

#[derive(Default)]
struct CaseIo {
    note: String,
    files: Vec<(String, String)>,
    stdout: Vec<u8>,
    errors: Vec<String>,
}

impl OsFacade for CaseIo {
    fn read_stdin(&self) -> io::Result<String> {
        Ok(self.note.clone())
    }

    fn read_file(&self, path: &str) -> io::Result<String> {
        for (name, content) in &self.files {
            if path == name {
                return Ok(content.clone());
            }
        }
        Err(io::Error::new(ErrorKind::NotFound, format!("File not found: {}", path)))
    }

    fn stdout(&mut self) -> impl io::Write {
        &mut self.stdout
    }

    fn write_error(&mut self, err: Error) {
        self.errors.push(format!("{err}"));
    }
}

impl Case {
    fn run(&self) -> (bool, CaseIo) {
        let mut os = CaseIo {
            note: self.note.to_string(),
            files: self
                .files
                .iter()
                .map(|(name, content)| (name.to_string(), content.to_string()))
                .collect(),
            ..Default::default()
        };
        let ok = notemark::run::run(&self.options, &mut os);
        (ok, os)
    }

    fn run_expecting_json(&self, expect: &str) {
        let (ok, os) = self.run();
        assert!(ok, "run failed: {:?}", os.errors);
        let actual: serde_json::Value =
            serde_json::from_slice(&os.stdout).expect("stdout wasn't valid JSON");
        let expected: serde_json::Value = serde_json::from_str(expect).expect("bad expected JSON");
        assert_eq!(
            serde_json::to_string_pretty(&actual).unwrap(),
            serde_json::to_string_pretty(&expected).unwrap(),
        );
    }
}

#[test]
fn paragraph_to_json() {
    Case {
        options: RunOptions::default(),
        note: "hello world",
        files: &[],
    }
    .run_expecting_json(
        r#"{
            "roots": [
                {
                    "paragraph": {
                        "body": [
                            {"text": {"value": "hello"}},
                            {"space": {"count": 1}},
                            {"text": {"value": "world"}}
                        ]
                    }
                }
            ]
        }"#,
    );
}

#[test]
fn document_structure_to_json() {
    Case {
        options: RunOptions::default(),
        note: indoc! {"
            === Notes

            * one
            * two
        "},
        files: &[],
    }
    .run_expecting_json(
        r#"{
            "roots": [
                {
                    "heading": {
                        "level": 1,
                        "body": [{"text": {"value": "Notes"}}],
                        "attrs": {"attrs": []}
                    }
                },
                {
                    "list": {
                        "kind": "unordered",
                        "attrs": {"attrs": []},
                        "items": [
                            [{"paragraph": {"body": [{"text": {"value": "one"}}]}}],
                            [{"paragraph": {"body": [{"text": {"value": "two"}}]}}]
                        ]
                    }
                }
            ]
        }"#,
    );
}

#[test]
fn table_with_header_to_json() {
    Case {
        options: RunOptions::default(),
        note: "|=A:|=B>|\n|1|2|",
        files: &[],
    }
    .run_expecting_json(
        r#"{
            "roots": [
                {
                    "table": {
                        "alignments": ["center", "right"],
                        "header": [
                            {"align": null, "body": [{"text": {"value": "A"}}]},
                            {"align": null, "body": [{"text": {"value": "B"}}]}
                        ],
                        "rows": [
                            [
                                {"align": null, "body": [{"text": {"value": "1"}}]},
                                {"align": null, "body": [{"text": {"value": "2"}}]}
                            ]
                        ]
                    }
                }
            ]
        }"#,
    );
}

#[test]
fn files_concatenate_in_order() {
    let case = Case {
        options: RunOptionsBuilder::default()
            .note_file_paths(vec!["a.note".to_string(), "b.note".to_string()])
            .build()
            .unwrap(),
        note: "unused stdin",
        files: &[("a.note", "from a"), ("b.note", "from b")],
    };
    let (ok, os) = case.run();
    assert!(ok);
    let text = String::from_utf8(os.stdout).unwrap();
    // the two files' lines merge into one paragraph, joined by a soft break
    assert!(text.contains(r#"{"value":"a"}"#), "got: {text}");
    assert!(text.contains(r#"{"break":{"hard":false}}"#), "got: {text}");
    assert!(text.contains(r#"{"value":"b"}"#), "got: {text}");
}

#[test]
fn dash_reads_stdin() {
    let case = Case {
        options: RunOptionsBuilder::default()
            .note_file_paths(vec!["-".to_string()])
            .build()
            .unwrap(),
        note: "from stdin",
        files: &[],
    };
    let (ok, os) = case.run();
    assert!(ok);
    let text = String::from_utf8(os.stdout).unwrap();
    assert!(text.contains("stdin"), "got: {text}");
}

#[test]
fn missing_file_reports_error() {
    let case = Case {
        options: RunOptionsBuilder::default()
            .note_file_paths(vec!["nope.note".to_string()])
            .build()
            .unwrap(),
        note: "",
        files: &[],
    };
    let (ok, os) = case.run();
    assert!(!ok);
    assert_eq!(os.errors.len(), 1);
    assert!(os.errors[0].contains("nope.note"), "got: {:?}", os.errors);
    assert_eq!(os.stdout, Vec::<u8>::new());
}

#[test]
fn quiet_suppresses_output() {
    let case = Case {
        options: RunOptionsBuilder::default().quiet(true).build().unwrap(),
        note: "hello",
        files: &[],
    };
    let (ok, os) = case.run();
    assert!(ok);
    assert_eq!(os.stdout, Vec::<u8>::new());
}

#[test]
fn debug_output() {
    let case = Case {
        options: RunOptionsBuilder::default()
            .output(OutputFormat::Debug)
            .build()
            .unwrap(),
        note: "hello",
        files: &[],
    };
    let (ok, os) = case.run();
    assert!(ok);
    let text = String::from_utf8(os.stdout).unwrap();
    assert!(text.contains("Paragraph"), "got: {text}");
    assert!(text.contains("hello"), "got: {text}");
}
