//! Reader and writer for yanny parameter files (`.par`)
//!
//! A yanny file is made of `#` comments, `keyword value` pairs,
//! `typedef enum` and `typedef struct` declarations and data rows, each row
//! starting with the name of the struct it belongs to.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

mod schema;
mod tokens;
pub use schema::{EnumDef, Member, Patterns, StructDef};
use tokens::Token;

#[derive(Debug, thiserror::Error)]
pub enum ParError {
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: {table} row ends before member {member:?}")]
    ShortRow {
        line: usize,
        table: String,
        member: String,
    },
    #[error("line {line}: {table} row has values past its last member")]
    LongRow { line: usize, table: String },
    #[error("no typedef struct for table {0:?}")]
    UnknownStruct(String),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}
type Result<T> = std::result::Result<T, ParError>;

/// A value of a row member, kept as its source text
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    Array(Vec<String>),
}
impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(value) => Some(value.as_str()),
            Value::Array(_) => None,
        }
    }
}

/// A data row, one [Value] per struct member
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<Value>);

/// The rows of one struct
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub def: StructDef,
    pub rows: Vec<Row>,
}
impl Table {
    pub fn name(&self) -> &str {
        &self.def.name
    }
    /// Renders the rows, one line per row
    pub fn rows_to_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                let mut line = self.def.name.clone();
                for (member, value) in self.def.members.iter().zip(&row.0) {
                    line.push(' ');
                    line.push_str(&render_value(member, value));
                }
                line
            })
            .collect()
    }
}

fn render_scalar(member: &Member, value: &str) -> String {
    if member.is_string() {
        tokens::quote(value)
    } else {
        value.to_string()
    }
}
fn render_value(member: &Member, value: &Value) -> String {
    match value {
        Value::Scalar(value) => render_scalar(member, value),
        Value::Array(values) => {
            let items: Vec<String> = values.iter().map(|v| render_scalar(member, v)).collect();
            format!("{{ {} }}", items.join(" "))
        }
    }
}

/// The content of a yanny file
#[derive(Debug, Clone, Default)]
pub struct ParFile {
    /// Raw lines before the first `typedef`
    pub header: Vec<String>,
    pub pairs: Vec<(String, String)>,
    pub enums: Vec<EnumDef>,
    pub tables: Vec<Table>,
}
impl ParFile {
    /// Reads and parses a yanny file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ParError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("parsing {:?}", path);
        text.parse()
    }
    pub fn pair(&self, keyword: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v.as_str())
    }
    pub fn enumeration(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }
    /// The table of the struct `name`, struct names are case insensitive
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
    fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    fn add_typedef(&mut self, patterns: &Patterns, text: &str, line: usize) -> Result<()> {
        let capts = patterns
            .typedef
            .captures(text.trim()).ok_or_else(|| ParError::Syntax {
            line,
            message: "malformed typedef".into(),
        })?;
        let (kind, body, name) = (&capts[1], &capts[2], &capts[3]);
        match kind {
            "enum" => self.enums.push(EnumDef::parse(name, body)),
            _ => {
                let def = StructDef::parse(name, body, patterns)
                    .map_err(|message| ParError::Syntax { line, message })?;
                self.tables.push(Table { def, rows: vec![] });
            }
        }
        Ok(())
    }

    fn add_row(&mut self, name: &str, tokens: Vec<Token>, line: usize) -> Result<()> {
        let table = self
            .table_mut(name)
            .ok_or_else(|| ParError::UnknownStruct(name.to_string()))?;
        let syntax = |message: String| ParError::Syntax { line, message };
        let mut tokens = tokens.into_iter().peekable();
        let mut values = Vec::with_capacity(table.def.members.len());
        for member in &table.def.members {
            let short = || ParError::ShortRow {
                line,
                table: table.def.name.clone(),
                member: member.name.clone(),
            };
            let value = match member.len() {
                None => match tokens.next() {
                    Some(Token::Word(s)) | Some(Token::Quoted(s)) => Value::Scalar(s),
                    Some(Token::Open) => match tokens.next() {
                        Some(Token::Close) => Value::Scalar(String::new()),
                        _ => return Err(syntax(format!("member {:?} is not an array", member.name))),
                    },
                    Some(Token::Close) => return Err(syntax("unbalanced '}'".into())),
                    None => return Err(short()),
                },
                Some(n) => {
                    let mut items = vec![];
                    if let Some(Token::Open) = tokens.peek() {
                        tokens.next();
                        loop {
                            match tokens.next() {
                                Some(Token::Close) => break,
                                Some(Token::Word(s)) | Some(Token::Quoted(s)) => items.push(s),
                                Some(Token::Open) => return Err(syntax("nested '{'".into())),
                                None => return Err(syntax("unterminated '{'".into())),
                            }
                        }
                    } else {
                        for _ in 0..n {
                            match tokens.next() {
                                Some(Token::Word(s)) | Some(Token::Quoted(s)) => items.push(s),
                                Some(_) => return Err(syntax("unexpected brace".into())),
                                None => return Err(short()),
                            }
                        }
                    }
                    if items.len() != n {
                        return Err(syntax(format!(
                            "member {:?} expects {} values, found {}",
                            member.name,
                            n,
                            items.len()
                        )));
                    }
                    Value::Array(items)
                }
            };
            values.push(value);
        }
        if tokens.next().is_some() {
            return Err(ParError::LongRow {
                line,
                table: table.def.name.clone(),
            });
        }
        table.rows.push(Row(values));
        Ok(())
    }
}

impl std::str::FromStr for ParFile {
    type Err = ParError;

    fn from_str(text: &str) -> Result<Self> {
        let patterns = Patterns::new()?;
        let mut par = ParFile::default();
        let raw: Vec<&str> = text.lines().collect();
        par.header = raw
            .iter()
            .take_while(|line| !line.trim_start().starts_with("typedef"))
            .map(|line| line.to_string())
            .collect();

        // logical lines: comments stripped and `\` continuations joined
        let mut logical: Vec<(usize, String)> = vec![];
        let mut pending: Option<(usize, String)> = None;
        for (i, line) in raw.iter().enumerate() {
            let stripped = tokens::strip_comment(line).trim_end();
            let (content, continued) = match stripped.strip_suffix('\\') {
                Some(content) => (content.trim_end(), true),
                None => (stripped, false),
            };
            let entry = match pending.take() {
                Some((start, mut text)) => {
                    text.push(' ');
                    text.push_str(content.trim_start());
                    (start, text)
                }
                None => (i + 1, content.to_string()),
            };
            if continued {
                pending = Some(entry);
            } else {
                logical.push(entry);
            }
        }
        if let Some(entry) = pending {
            logical.push(entry);
        }

        let mut typedef: Option<(usize, String)> = None;
        for (line, text) in logical {
            let trimmed = text.trim();
            if let Some((start, mut buffer)) = typedef.take() {
                buffer.push('\n');
                buffer.push_str(trimmed);
                if buffer.contains('}') && buffer.ends_with(';') {
                    par.add_typedef(&patterns, &buffer, start)?;
                } else {
                    typedef = Some((start, buffer));
                }
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with("typedef") {
                if trimmed.contains('}') && trimmed.ends_with(';') {
                    par.add_typedef(&patterns, trimmed, line)?;
                } else {
                    typedef = Some((line, trimmed.to_string()));
                }
                continue;
            }
            let mut tokens = tokens::tokenize(trimmed)
                .map_err(|message| ParError::Syntax { line, message })?;
            let keyword = match tokens.first() {
                Some(Token::Word(word)) => word.clone(),
                _ => {
                    return Err(ParError::Syntax {
                        line,
                        message: "line does not start with a keyword".into(),
                    })
                }
            };
            if par.table(&keyword).is_some() {
                tokens.remove(0);
                par.add_row(&keyword, tokens, line)?;
            } else {
                let value = trimmed[keyword.len()..].trim().to_string();
                par.pairs.push((keyword, value));
            }
        }
        if let Some((line, _)) = typedef {
            return Err(ParError::Syntax {
                line,
                message: "unterminated typedef".into(),
            });
        }
        Ok(par)
    }
}

/// Renders a yanny file from enum declarations and tables
///
/// The output starts with a `#` banner and carries no keyword pairs
pub fn render(enums: &[EnumDef], tables: &[Table]) -> Vec<String> {
    let mut lines = vec![
        "#".to_string(),
        format!(
            "# Written by {} v{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ),
        "#".to_string(),
    ];
    for def in enums {
        lines.extend(def.to_string().lines().map(String::from));
        lines.push(String::new());
    }
    for table in tables {
        lines.extend(table.def.to_string().lines().map(String::from));
        lines.push(String::new());
    }
    for table in tables {
        lines.extend(table.rows_to_lines());
    }
    lines
}

/// Inserts `header` after the leading `#` comment block of `lines`
pub fn splice_header(mut lines: Vec<String>, header: &[String]) -> Vec<String> {
    let at = lines
        .iter()
        .position(|line| !line.starts_with('#'))
        .unwrap_or(lines.len());
    lines.splice(at..at, header.iter().cloned());
    lines
}
