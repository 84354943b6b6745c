use std::fmt;

use regex::Regex;

/// The compiled `typedef` patterns
#[derive(Debug, Clone)]
pub struct Patterns {
    pub typedef: Regex,
    pub member: Regex,
}
impl Patterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            typedef: Regex::new(r"(?s)^typedef\s+(enum|struct)\s*\{(.*)\}\s*(\w+)\s*;$")?,
            member: Regex::new(r"^(\w+)\s+(\w+)\s*((?:\[\s*\d+\s*\]\s*)*)$")?,
        })
    }
}

/// A `typedef enum { … } NAME;` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}
impl EnumDef {
    /// Parses the comma separated body of an enum typedef
    pub fn parse(name: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            values: body
                .split(',')
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect(),
        }
    }
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}
impl fmt::Display for EnumDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "typedef enum {{")?;
        let n = self.values.len();
        for (i, value) in self.values.iter().enumerate() {
            if i + 1 < n {
                writeln!(f, "  {},", value)?;
            } else {
                writeln!(f, "  {}", value)?;
            }
        }
        write!(f, "}} {};", self.name)
    }
}

/// A member of a `typedef struct`
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub ctype: String,
    pub name: String,
    pub dims: Vec<usize>,
}
impl Member {
    /// Parses a declaration like `float mag[5]` or `char name[20]`
    pub fn parse(declaration: &str, patterns: &Patterns) -> Result<Self, String> {
        let capts = patterns
            .member
            .captures(declaration.trim())
            .ok_or_else(|| format!("invalid struct member {:?}", declaration.trim()))?;
        let dims = capts[3]
            .split(|c| c == '[' || c == ']')
            .map(str::trim)
            .filter(|dim| !dim.is_empty())
            .map(|dim| dim.parse::<usize>().map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ctype: capts[1].to_string(),
            name: capts[2].to_string(),
            dims,
        })
    }
    pub fn is_string(&self) -> bool {
        self.ctype == "char"
    }
    /// Number of values of an array member, `None` for a scalar
    ///
    /// The last dimension of a `char` member is the string width
    pub fn len(&self) -> Option<usize> {
        let dims = if self.is_string() && !self.dims.is_empty() {
            &self.dims[..self.dims.len() - 1]
        } else {
            &self.dims[..]
        };
        if dims.is_empty() {
            None
        } else {
            Some(dims.iter().product())
        }
    }
}
impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ctype, self.name)?;
        for dim in &self.dims {
            write!(f, "[{}]", dim)?;
        }
        write!(f, ";")
    }
}

/// A `typedef struct { … } NAME;` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<Member>,
}
impl StructDef {
    /// Parses the semicolon separated body of a struct typedef
    pub fn parse(name: &str, body: &str, patterns: &Patterns) -> Result<Self, String> {
        let members = body
            .split(';')
            .map(str::trim)
            .filter(|declaration| !declaration.is_empty())
            .map(|declaration| Member::parse(declaration, patterns))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_string(),
            members,
        })
    }
    /// Index of the member `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }
}
impl fmt::Display for StructDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "typedef struct {{")?;
        for member in &self.members {
            writeln!(f, "  {}", member)?;
        }
        write!(f, "}} {};", self.name)
    }
}
