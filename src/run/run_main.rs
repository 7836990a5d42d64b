use crate::note_elem::{InvalidNote, NoteDoc, ParseOptions};
use crate::run::cli::OutputFormat;
use crate::run::RunOptions;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::{env, io};

/// The run's overall possible error.
#[derive(Debug)]
pub enum Error {
    /// The note failed to parse.
    ///
    /// This comes from [`NoteDoc::parse`], and only ever reports an internal-consistency bug;
    /// malformed markup is not an error.
    NoteParse(InvalidNote),

    /// Couldn't read an input file.
    FileReadError(Input, io::Error),
}

impl std::error::Error for Error {}

/// Stdin or an input file by path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Input {
    Stdin,
    FilePath(String),
}

impl Error {
    pub(crate) fn from_io_error(error: io::Error, file: Input) -> Self {
        Error::FileReadError(file, error)
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Stdin => f.write_str("stdin"),
            Input::FilePath(file) => write!(f, "file {file:?}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NoteParse(err) => {
                writeln!(f, "Note parse error:")?;
                writeln!(f, "{err}")
            }
            Error::FileReadError(file, err) => {
                if env::var("NOTEMARK_PORTABLE_ERRORS").unwrap_or_default().is_empty() {
                    writeln!(f, "{err} while reading {file}")
                } else {
                    writeln!(f, "{} while reading {file}", err.kind())
                }
            }
        }
    }
}

/// A simple facade for handling I/O.
///
/// This trait lets you do "I/O-y stuff" like mocking out stdin or reading files. The [`run`]
/// method uses it.
pub trait OsFacade {
    /// Read stdin (or your mock of it) to a `String`.
    fn read_stdin(&self) -> io::Result<String>;

    /// Read a file path (or your mock of one) to a `String`.
    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Get a writer for stdout (or your mock of it).
    fn stdout(&mut self) -> impl Write;

    /// Handle an error.
    fn write_error(&mut self, err: Error);

    /// Read a slice of file paths into a single, concatenated `String`.
    ///
    /// The default implementation (which you should feel free to use) treats the file path `"-"`
    /// as stdin. The first `"-"` reads all of stdin (via [`Self::read_stdin`]), and subsequent
    /// `"-"`s get silently ignored.
    fn read_all(&self, note_file_paths: &[String]) -> Result<String, Error> {
        if note_file_paths.is_empty() {
            return self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin));
        }
        let mut contents = String::new();
        let mut have_read_stdin = false;
        for path in note_file_paths {
            if path == "-" {
                if !have_read_stdin {
                    contents.push_str(
                        &self
                            .read_stdin()
                            .map_err(|err| Error::from_io_error(err, Input::Stdin))?,
                    );
                    have_read_stdin = true
                }
            } else {
                let path_contents = self
                    .read_file(path)
                    .map_err(|err| Error::from_io_error(err, Input::FilePath(path.to_string())))?;
                contents.push_str(&path_contents);
            }
            contents.push('\n');
        }
        Ok(contents)
    }
}

/// Runs notemark end to end.
///
/// This uses the provided [RunOptions] and [OsFacade] to read the input note, parse and
/// normalize it into a [`NoteDoc`], and write the tree to the given [`OsFacade`] in the format
/// specified by [`RunOptions::output`].
pub fn run(options: &RunOptions, os: &mut impl OsFacade) -> bool {
    match run_or_error(options, os) {
        Ok(ok) => ok,
        Err(err) => {
            os.write_error(err);
            false
        }
    }
}

fn run_or_error(options: &RunOptions, os: &mut impl OsFacade) -> Result<bool, Error> {
    let contents = os.read_all(&options.note_file_paths)?;

    let mut parse_options = ParseOptions::default();
    if let Some(max_nesting_depth) = options.max_nesting_depth {
        parse_options.max_nesting_depth = max_nesting_depth;
    }
    let doc = NoteDoc::parse(&contents, &parse_options).map_err(Error::NoteParse)?;

    if !options.quiet {
        let mut stdout = os.stdout();
        match options.output {
            OutputFormat::Json => {
                serde_json::to_writer(&mut stdout, &doc).unwrap();
            }
            OutputFormat::Debug => {
                writeln!(&mut stdout, "{doc:#?}").unwrap();
            }
        }
    }

    Ok(true)
}
