//! Line-oriented command loop driving a [`ScanSession`].

use std::io::{self, Write};
use std::path::PathBuf;

use image::GenericImageView;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::recognizer::{MathpixRecognizer, RecognizerError};
use crate::region::BorderSide;
use crate::session::ScanSession;
use crate::speech::{INVALID_COORDINATES, Narrator, REMOVED, SET};

const HELP: &str = "\
commands:
  open FILE                 load an image
  text                      print the recognized lines with their row numbers
  left|right|top|bottom R C place a border at the character in row R, column C
  remove SIDE|all           remove one border or all of them
  switch horizontal|vertical
                            swap left/right or top/bottom borders
  split                     split the current image into two columns
  next | previous           move between columns
  cancel                    go back to the whole page
  region FILE               save the bordered region as an image
  recognize [full]          send the bordered region (or whole image) to Mathpix
  help                      show this text
  quit                      leave";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(PathBuf),
    Text,
    Place {
        side: BorderSide,
        row: usize,
        column: usize,
    },
    /// `None` removes every border.
    Remove(Option<BorderSide>),
    Switch(Axis),
    Split,
    Next,
    Previous,
    Cancel,
    Region(PathBuf),
    Recognize { full: bool },
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),
    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("'{value}' is not a valid {argument}")]
    InvalidArgument {
        argument: &'static str,
        value: String,
    },
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

/// Parses one input line; blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let name = name.to_ascii_lowercase();

    let command = match name.as_str() {
        "open" | "o" => Command::Open(path_argument(&mut words, "open")?),
        "text" | "t" => Command::Text,
        "left" | "right" | "top" | "bottom" => {
            let side = name
                .parse::<BorderSide>()
                .map_err(|_| ParseError::UnknownCommand(name.clone()))?;
            let row = index_argument(words.next(), side.as_str(), "row")?;
            let column = index_argument(words.next(), side.as_str(), "column")?;
            Command::Place { side, row, column }
        }
        "remove" | "rm" => {
            let target = words.next().ok_or(ParseError::MissingArgument {
                command: "remove",
                argument: "a side or 'all'",
            })?;
            if target.eq_ignore_ascii_case("all") {
                Command::Remove(None)
            } else {
                let side = target.parse::<BorderSide>().map_err(|_| {
                    ParseError::InvalidArgument {
                        argument: "side",
                        value: target.to_string(),
                    }
                })?;
                Command::Remove(Some(side))
            }
        }
        "switch" => match words.next().map(str::to_ascii_lowercase).as_deref() {
            Some("horizontal" | "h") => Command::Switch(Axis::Horizontal),
            Some("vertical" | "v") => Command::Switch(Axis::Vertical),
            Some(other) => {
                return Err(ParseError::InvalidArgument {
                    argument: "axis",
                    value: other.to_string(),
                });
            }
            None => {
                return Err(ParseError::MissingArgument {
                    command: "switch",
                    argument: "'horizontal' or 'vertical'",
                });
            }
        },
        "split" => Command::Split,
        "next" | "n" => Command::Next,
        "previous" | "prev" | "p" => Command::Previous,
        "cancel" => Command::Cancel,
        "region" => Command::Region(path_argument(&mut words, "region")?),
        "recognize" | "r" => match words.next() {
            None => Command::Recognize { full: false },
            Some(word) if word.eq_ignore_ascii_case("full") => Command::Recognize { full: true },
            Some(word) => return Err(ParseError::UnexpectedArgument(word.to_string())),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(ParseError::UnknownCommand(name)),
    };

    match words.next() {
        Some(extra) => Err(ParseError::UnexpectedArgument(extra.to_string())),
        None => Ok(Some(command)),
    }
}

fn path_argument<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
) -> Result<PathBuf, ParseError> {
    words
        .next()
        .map(PathBuf::from)
        .ok_or(ParseError::MissingArgument {
            command,
            argument: "a file path",
        })
}

fn index_argument(
    word: Option<&str>,
    command: &'static str,
    argument: &'static str,
) -> Result<usize, ParseError> {
    let word = word.ok_or(ParseError::MissingArgument { command, argument })?;
    word.parse().map_err(|_| ParseError::InvalidArgument {
        argument,
        value: word.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    session: ScanSession,
    narrator: Box<dyn Narrator>,
    recognizer: Result<MathpixRecognizer, RecognizerError>,
}

impl Console {
    pub fn new(
        session: ScanSession,
        narrator: Box<dyn Narrator>,
        recognizer: Result<MathpixRecognizer, RecognizerError>,
    ) -> Self {
        Self {
            session,
            narrator,
            recognizer,
        }
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    fn prompt(&self) -> String {
        match self.session.active_column() {
            Some(active) => format!(
                "{} [column {}/{}]> ",
                self.session.file_name(),
                active + 1,
                self.session.column_count()
            ),
            None => format!("{}> ", self.session.file_name()),
        }
    }

    /// Reads commands from stdin until `quit` or end of input.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = io::stdout();
        loop {
            write!(stdout, "{}", self.prompt())?;
            stdout.flush()?;
            let Some(line) = lines.next_line().await? else {
                writeln!(stdout)?;
                return Ok(());
            };
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => {
                    writeln!(stdout, "{err}")?;
                    continue;
                }
            };
            if self.execute(command, &mut stdout).await? == Flow::Quit {
                return Ok(());
            }
        }
    }

    pub async fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<Flow> {
        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Open(path) => match self.session.load_image_from_file(&path) {
                Ok(()) => {
                    let lines = self.session.image_boxes().len();
                    writeln!(out, "{}: {lines} lines", self.session.file_name())?;
                    self.narrator.speak(&format!("{lines} lines"));
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to open image");
                    writeln!(out, "{err}")?;
                    self.narrator.speak("Cannot open image");
                }
            },
            _ if !self.session.has_image() => {
                writeln!(out, "no image loaded, use 'open FILE' first")?;
                self.narrator.speak("No image");
            }
            Command::Text => {
                for (row, line) in self.session.image_text().lines().enumerate() {
                    writeln!(out, "{row:>3}  {line}")?;
                }
            }
            Command::Place { side, row, column } => {
                match self.session.place_border(side, row, column) {
                    Ok(true) => {
                        info!(side = side.as_str(), row, column, "border placed");
                        writeln!(out, "{side} border set")?;
                        self.narrator.speak(SET);
                    }
                    Ok(false) => writeln!(out, "{side} border already covers that character")?,
                    Err(err) => {
                        writeln!(out, "{err}")?;
                        self.narrator.speak(INVALID_COORDINATES);
                    }
                }
            }
            Command::Remove(side) => {
                let removed = match side {
                    Some(side) => self.session.remove_border(side),
                    None => self.session.remove_all_borders(),
                };
                if removed {
                    writeln!(out, "removed")?;
                    self.narrator.speak(REMOVED);
                } else {
                    writeln!(out, "nothing to remove")?;
                }
            }
            Command::Switch(Axis::Horizontal) => {
                self.session.switch_horizontal_borders();
                writeln!(out, "left and right borders switched")?;
                self.narrator.speak("Switched");
            }
            Command::Switch(Axis::Vertical) => {
                self.session.switch_vertical_borders();
                writeln!(out, "top and bottom borders switched")?;
                self.narrator.speak("Switched");
            }
            Command::Split => match self.session.split_to_columns() {
                Ok(()) => {
                    let count = self.session.column_count();
                    writeln!(out, "split into {count} columns")?;
                    self.narrator.speak(&format!("{count} columns"));
                }
                Err(err) => {
                    writeln!(out, "{err}")?;
                    self.narrator.speak("Cannot split");
                }
            },
            Command::Next | Command::Previous if !self.session.has_columns() => {
                writeln!(out, "the image is not split into columns")?;
                self.narrator.speak("No columns");
            }
            Command::Next => {
                let active = self.session.switch_to_next_column();
                self.announce_column(active, out)?;
            }
            Command::Previous => {
                let active = self.session.switch_to_previous_column();
                self.announce_column(active, out)?;
            }
            Command::Cancel => {
                if self.session.cancel_columns() {
                    writeln!(out, "back to the whole page")?;
                    self.narrator.speak("Whole page");
                } else {
                    writeln!(out, "no columns to cancel")?;
                }
            }
            Command::Region(path) => {
                let region = self.session.get_bordered_region();
                match region.save(&path) {
                    Ok(()) => writeln!(
                        out,
                        "saved {}x{} region to {}",
                        region.width(),
                        region.height(),
                        path.display()
                    )?,
                    Err(err) => writeln!(out, "failed to save {}: {err}", path.display())?,
                }
            }
            Command::Recognize { full } => self.recognize(full, out).await?,
        }
        Ok(Flow::Continue)
    }

    fn announce_column<W: Write>(&self, active: usize, out: &mut W) -> io::Result<()> {
        let count = self.session.column_count();
        writeln!(out, "column {} of {count}", active + 1)?;
        self.narrator.speak(&format!("Column {}", active + 1));
        Ok(())
    }

    async fn recognize<W: Write>(&self, full: bool, out: &mut W) -> io::Result<()> {
        let recognizer = match &self.recognizer {
            Ok(recognizer) => recognizer,
            Err(err) => {
                writeln!(out, "recognition unavailable: {err}")?;
                self.narrator.speak("Recognition unavailable");
                return Ok(());
            }
        };
        let image = match (full, self.session.active_page()) {
            (true, Some(page)) => page.image().clone(),
            _ => self.session.get_bordered_region(),
        };
        match recognizer.recognize(&image).await {
            Ok(recognition) => {
                if let Some(failure) = &recognition.failure {
                    warn!(error = %failure.error, id = ?failure.id, "recognition reported an error");
                }
                let text = recognition.best_text();
                writeln!(out, "{text}")?;
                self.narrator.speak(text);
            }
            Err(err) => {
                warn!(error = %err, "recognition failed");
                writeln!(out, "{err}")?;
                self.narrator.speak("Recognition failed");
            }
        }
        Ok(())
    }
}
