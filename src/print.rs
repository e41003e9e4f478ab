//! User-facing messages

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use crate::config::APP_NAME;

pub fn info(msg: impl Display) {
    println!("{APP_NAME}:INFO: {msg}");
}

pub fn warn(msg: impl Display) {
    eprintln!("{APP_NAME}:WARN: {msg}");
}

pub fn err(msg: impl Display) {
    eprintln!("{APP_NAME}:ERROR: {msg}");
}

/// Asks a yes/no question on the terminal. Anything but "y"/"yes" is no.
pub fn question(prompt: &str) -> io::Result<bool> {
    question_with(&mut io::stdin().lock(), &mut io::stdout(), prompt)
}

fn question_with<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<bool> {
    write!(output, "{APP_NAME}:CHECK: {prompt} [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
