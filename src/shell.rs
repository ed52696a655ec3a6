//! A small shell simulator: enough of the shell language to walk the scripts
//! scheduled as jobs and hand each simple command to a callback, in order.
//!
//! Variables assigned with `NAME=value` are substituted into later commands,
//! and files written with `cat > FILE << EOF` (or `echo ... > FILE`) can be read
//! back through [`SimulatedProcess::read_file`]. Control flow is not evaluated:
//! both branches of an `if` are walked, loops run once.
use std::{collections::HashMap, sync::LazyLock};

use anyhow::anyhow;
use regex::{Captures, Regex};

use crate::command::ShellCommand;

/// View of the simulated process handed to the command callback.
pub trait SimulatedProcess {
    /// Content of a file written earlier in the script.
    fn read_file(&self, name: &str) -> Option<String>;
}

pub trait ShellSimulator: Send + Sync {
    /// Runs `script`, calling `on_command` once per simple command. Fails when the
    /// script cannot be tokenized.
    fn simulate(
        &self,
        script: &str,
        on_command: &mut dyn FnMut(&dyn SimulatedProcess, &ShellCommand),
    ) -> anyhow::Result<()>;
}

/// The built-in [`ShellSimulator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptSimulator;

impl ShellSimulator for ScriptSimulator {
    fn simulate(
        &self,
        script: &str,
        on_command: &mut dyn FnMut(&dyn SimulatedProcess, &ShellCommand),
    ) -> anyhow::Result<()> {
        let mut lexer = ScriptLexer::new(script);
        let mut process = ProcessState::default();
        while let Some(command) = lexer.next_command(&process.variables)? {
            process.execute(command, on_command);
        }
        Ok(())
    }
}

static VARIABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("variable pattern is a valid regex")
});

/// Words dropped from the start of a command.
const RESERVED_WORDS: &[&str] = &[
    "!", "{", "}", "do", "done", "elif", "else", "fi", "if", "then", "until", "while",
];

/// Builtins whose `NAME=value` arguments are variable assignments.
const DECLARATION_BUILTINS: &[&str] = &["declare", "export", "local", "readonly", "typeset"];

#[derive(Debug, Default)]
struct ProcessState {
    variables: HashMap<String, String>,
    files: HashMap<String, String>,
}

impl SimulatedProcess for ProcessState {
    fn read_file(&self, name: &str) -> Option<String> {
        self.files.get(name).cloned()
    }
}

impl ProcessState {
    fn execute(
        &mut self,
        command: SimpleCommand,
        on_command: &mut dyn FnMut(&dyn SimulatedProcess, &ShellCommand),
    ) {
        let SimpleCommand {
            words,
            redirects,
            heredoc_body,
            ..
        } = command;
        let mut words = words
            .into_iter()
            .skip_while(|word| RESERVED_WORDS.contains(&word.as_str()))
            .peekable();

        // `A=1 B=2` assigns, `A=1 cmd` only sets the command's environment
        let mut assignments = vec![];
        while let Some(assignment) = words.peek().and_then(|word| parse_assignment(word)) {
            assignments.push(assignment);
            words.next();
        }
        let Some(name) = words.next() else {
            for (name, value) in assignments {
                self.variables.insert(name, value);
            }
            return;
        };
        let params: Vec<String> = words.collect();

        if DECLARATION_BUILTINS.contains(&name.as_str()) {
            for (var_name, value) in params.iter().filter_map(|param| parse_assignment(param)) {
                self.variables.insert(var_name, value);
            }
        }

        let output = redirects
            .iter()
            .rev()
            .find(|redirect| redirect.kind != RedirectKind::Input);
        match (name.as_str(), output) {
            ("cat", Some(output)) => {
                let content = match heredoc_body {
                    Some(body) => Some(body),
                    None => params
                        .iter()
                        .chain(
                            redirects
                                .iter()
                                .filter(|redirect| redirect.kind == RedirectKind::Input)
                                .map(|redirect| &redirect.target),
                        )
                        .map(|source| self.files.get(source).map(String::as_str))
                        .collect::<Option<String>>(),
                };
                // a source written outside the script leaves the target unreadable
                let Some(content) = content else {
                    log::debug!("Virtual file {} has unknown content", output.target);
                    self.files.remove(&output.target);
                    return;
                };
                log::debug!("Writing virtual file {}", output.target);
                self.write_file(output, content);
                return;
            }
            ("echo", Some(output)) => {
                let content = format!("{}\n", params.join(" "));
                self.write_file(output, content);
            }
            _ => {}
        }

        on_command(&*self, &ShellCommand { name, params });
    }

    fn write_file(&mut self, redirect: &Redirect, content: String) {
        match redirect.kind {
            RedirectKind::Append => self
                .files
                .entry(redirect.target.clone())
                .or_default()
                .push_str(&content),
            _ => {
                self.files.insert(redirect.target.clone(), content);
            }
        }
    }
}

/// `NAME=value`, with a valid shell identifier as name.
fn parse_assignment(word: &str) -> Option<(String, String)> {
    let (name, value) = word.split_once('=')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    Some((name.to_owned(), value.to_owned()))
}

fn expand_variables(text: &str, variables: &HashMap<String, String>) -> String {
    VARIABLE_PATTERN
        .replace_all(text, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            match variables.get(name) {
                Some(value) => value.to_owned(),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectKind {
    Input,
    Output,
    Append,
}

#[derive(Debug, Clone)]
struct Redirect {
    kind: RedirectKind,
    target: String,
}

#[derive(Debug, Clone)]
struct HereDoc {
    delimiter: String,
    strip_tabs: bool,
    expand: bool,
}

#[derive(Debug, Default)]
struct SimpleCommand {
    words: Vec<String>,
    redirects: Vec<Redirect>,
    heredoc: Option<HereDoc>,
    heredoc_body: Option<String>,
}

impl SimpleCommand {
    fn is_empty(&self) -> bool {
        self.words.is_empty() && self.redirects.is_empty() && self.heredoc.is_none()
    }
}

/// Splits a script into simple commands, one at a time, so that variables
/// assigned by a command are visible to the following ones.
struct ScriptLexer {
    source_chars: Vec<char>,
    current: usize,
    line: u32,
}

impl ScriptLexer {
    fn new(script: &str) -> Self {
        Self {
            source_chars: script.chars().collect(),
            current: 0,
            line: 1,
        }
    }

    fn advance(&mut self) -> char {
        let c = self.source_chars[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
        }
        c
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source_chars[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source_chars.len() {
            '\0'
        } else {
            self.source_chars[self.current + 1]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() != expected {
            return false;
        }
        self.advance();
        true
    }

    fn skip_blanks(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\\' if self.peek_next() == '\n' => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn next_command(
        &mut self,
        variables: &HashMap<String, String>,
    ) -> anyhow::Result<Option<SimpleCommand>> {
        let mut command = SimpleCommand::default();
        loop {
            self.skip_blanks();
            if self.is_at_end() {
                break;
            }
            match self.peek() {
                '#' => self.skip_comment(),
                '\n' | ';' | '(' | ')' => {
                    self.advance();
                    if !command.is_empty() {
                        break;
                    }
                }
                '|' => {
                    self.advance();
                    if !self.match_char('|') {
                        self.match_char('&');
                    }
                    if !command.is_empty() {
                        break;
                    }
                }
                '&' if self.peek_next() == '>' => {
                    self.advance();
                    self.advance();
                    self.match_char('>');
                    let target = self.redirect_target(variables)?;
                    command.redirects.push(Redirect {
                        kind: RedirectKind::Output,
                        target,
                    });
                }
                '&' => {
                    self.advance();
                    self.match_char('&');
                    if !command.is_empty() {
                        break;
                    }
                }
                '<' | '>' => self.read_redirect(&mut command, variables)?,
                _ => {
                    let (word, quoted) = self.read_word(variables)?;
                    let is_fd = !quoted
                        && !word.is_empty()
                        && word.chars().all(|c| c.is_ascii_digit())
                        && matches!(self.peek(), '<' | '>');
                    if !is_fd {
                        command.words.push(word);
                    }
                }
            }
        }

        if command.is_empty() {
            return Ok(None);
        }
        if let Some(heredoc) = command.heredoc.clone() {
            command.heredoc_body = Some(self.read_heredoc_body(&heredoc, variables)?);
        }
        Ok(Some(command))
    }

    fn read_redirect(
        &mut self,
        command: &mut SimpleCommand,
        variables: &HashMap<String, String>,
    ) -> anyhow::Result<()> {
        if self.advance() == '<' {
            if self.match_char('<') {
                if self.match_char('<') {
                    // here-string
                    self.redirect_target(variables)?;
                    return Ok(());
                }
                let strip_tabs = self.match_char('-');
                self.skip_blanks();
                let (delimiter, quoted) = self.read_word(&HashMap::new())?;
                if delimiter.is_empty() {
                    return Err(anyhow!(
                        self.error_str("Missing here-document delimiter")
                    ));
                }
                command.heredoc = Some(HereDoc {
                    delimiter,
                    strip_tabs,
                    expand: !quoted,
                });
                return Ok(());
            }
            if self.match_char('&') {
                self.redirect_target(variables)?;
                return Ok(());
            }
            let target = self.redirect_target(variables)?;
            command.redirects.push(Redirect {
                kind: RedirectKind::Input,
                target,
            });
            return Ok(());
        }

        let kind = if self.match_char('>') {
            RedirectKind::Append
        } else {
            self.match_char('|');
            RedirectKind::Output
        };
        if self.match_char('&') {
            // fd duplication, e.g. `2>&1`
            self.redirect_target(variables)?;
            return Ok(());
        }
        let target = self.redirect_target(variables)?;
        command.redirects.push(Redirect { kind, target });
        Ok(())
    }

    fn redirect_target(&mut self, variables: &HashMap<String, String>) -> anyhow::Result<String> {
        self.skip_blanks();
        let (target, _) = self.read_word(variables)?;
        if target.is_empty() {
            return Err(anyhow!(self.error_str("Missing redirection target")));
        }
        Ok(target)
    }

    /// Reads one word, resolving quotes, escapes and known variables. Also
    /// reports whether any part of it was quoted.
    fn read_word(&mut self, variables: &HashMap<String, String>) -> anyhow::Result<(String, bool)> {
        let mut word = String::new();
        let mut quoted = false;
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' | ';' | '&' | '|' | '<' | '>' | '(' | ')' => break,
                '\\' => {
                    self.advance();
                    if self.is_at_end() {
                        break;
                    }
                    let escaped = self.advance();
                    if escaped != '\n' {
                        quoted = true;
                        word.push(escaped);
                    }
                }
                '\'' => {
                    self.advance();
                    quoted = true;
                    loop {
                        if self.is_at_end() {
                            return Err(anyhow!(
                                self.error_str("Found unterminated single quote")
                            ));
                        }
                        match self.advance() {
                            '\'' => break,
                            c => word.push(c),
                        }
                    }
                }
                '"' => {
                    self.advance();
                    quoted = true;
                    self.read_double_quoted(&mut word, variables)?;
                }
                '$' => self.read_dollar(&mut word, variables)?,
                '`' => self.read_backtick(&mut word)?,
                _ => word.push(self.advance()),
            }
        }
        Ok((word, quoted))
    }

    fn read_double_quoted(
        &mut self,
        word: &mut String,
        variables: &HashMap<String, String>,
    ) -> anyhow::Result<()> {
        loop {
            if self.is_at_end() {
                return Err(anyhow!(
                    self.error_str("Found unterminated double quote")
                ));
            }
            match self.peek() {
                '"' => {
                    self.advance();
                    return Ok(());
                }
                '\\' => {
                    self.advance();
                    if self.is_at_end() {
                        continue;
                    }
                    match self.advance() {
                        '\n' => {}
                        c @ ('"' | '\\' | '$' | '`') => word.push(c),
                        c => {
                            word.push('\\');
                            word.push(c);
                        }
                    }
                }
                '$' => self.read_dollar(word, variables)?,
                '`' => self.read_backtick(word)?,
                _ => word.push(self.advance()),
            }
        }
    }

    /// `$NAME` and `${NAME}` are replaced when the variable is known; anything
    /// else (unknown names, `$(...)`, `$1`) is kept verbatim.
    fn read_dollar(
        &mut self,
        word: &mut String,
        variables: &HashMap<String, String>,
    ) -> anyhow::Result<()> {
        let start = self.current;
        self.advance();
        match self.peek() {
            '{' => {
                self.advance();
                loop {
                    if self.is_at_end() || self.peek() == '\n' {
                        return Err(anyhow!(
                            self.error_str("Found unterminated parameter expansion")
                        ));
                    }
                    if self.advance() == '}' {
                        break;
                    }
                }
                let name: String = self.source_chars[start + 2..self.current - 1]
                    .iter()
                    .collect();
                match variables.get(&name) {
                    Some(value) => word.push_str(value),
                    None => word.extend(&self.source_chars[start..self.current]),
                }
            }
            '(' => {
                self.advance();
                let mut depth = 1usize;
                while depth > 0 {
                    if self.is_at_end() {
                        return Err(anyhow!(
                            self.error_str("Found unterminated command substitution")
                        ));
                    }
                    match self.advance() {
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        _ => {}
                    }
                }
                word.extend(&self.source_chars[start..self.current]);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
                    self.advance();
                }
                let name: String = self.source_chars[start + 1..self.current].iter().collect();
                match variables.get(&name) {
                    Some(value) => word.push_str(value),
                    None => word.extend(&self.source_chars[start..self.current]),
                }
            }
            _ => word.push('$'),
        }
        Ok(())
    }

    fn read_backtick(&mut self, word: &mut String) -> anyhow::Result<()> {
        let start = self.current;
        self.advance();
        loop {
            if self.is_at_end() {
                return Err(anyhow!(
                    self.error_str("Found unterminated command substitution")
                ));
            }
            if self.advance() == '`' {
                break;
            }
        }
        word.extend(&self.source_chars[start..self.current]);
        Ok(())
    }

    /// Reads the here-document body, which starts on the line after the
    /// command, and removes it from the source so lexing resumes right after
    /// the command.
    fn read_heredoc_body(
        &mut self,
        heredoc: &HereDoc,
        variables: &HashMap<String, String>,
    ) -> anyhow::Result<String> {
        let unterminated = || format!("Found unterminated here-document `{}`", heredoc.delimiter);
        let search_from = self.current.saturating_sub(1);
        let Some(offset) = self.source_chars[search_from..]
            .iter()
            .position(|&c| c == '\n')
        else {
            return Err(anyhow!(self.error_str(&unterminated())));
        };
        let body_start = search_from + offset + 1;

        let source_len = self.source_chars.len();
        let mut lines = vec![];
        let mut pos = body_start;
        loop {
            if pos >= source_len {
                return Err(anyhow!(self.error_str(&unterminated())));
            }
            let line_end = self.source_chars[pos..]
                .iter()
                .position(|&c| c == '\n')
                .map_or(source_len, |offset| pos + offset);
            let line: String = self.source_chars[pos..line_end].iter().collect();
            let line = line.trim_end_matches('\r');
            let line = if heredoc.strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line
            };
            pos = (line_end + 1).min(source_len);
            if line == heredoc.delimiter {
                break;
            }
            lines.push(line.to_owned());
        }
        self.source_chars.drain(body_start..pos);
        self.line += lines.len() as u32 + 1;

        let mut body = lines.join("\n");
        if !lines.is_empty() {
            body.push('\n');
        }
        if heredoc.expand {
            body = expand_variables(&body, variables);
        }
        Ok(body)
    }

    fn error_str(&self, error: &str) -> String {
        format!("[line: {}] Shell error: {}", self.line, error)
    }
}
