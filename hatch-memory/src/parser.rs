use hatch_core::{Error, Result, Value, consume_while, for_each_code_char, truncate_long};
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Word(String),
    /// Backtick quoted identifier.
    Quoted(String),
    Number(String),
    String(String),
    Blob(Vec<u8>),
    Param,
    Symbol(char),
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(v) | Token::Number(v) => f.write_str(v),
            Token::Quoted(v) => write!(f, "`{v}`"),
            Token::String(v) => write!(f, "'{v}'"),
            Token::Blob(v) => write!(f, "X'{}'", hex::encode_upper(v)),
            Token::Param => f.write_str("?"),
            Token::Symbol(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    /// Placeholder, numbered from 0 in order of appearance.
    Param(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnDef {
    pub name: String,
    /// Typed NULL of the declared type.
    pub value: Value,
    pub primary_key: bool,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Filter {
    pub column: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    All,
    Columns(Vec<String>),
    Count,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
        if_not_exists: bool,
    },
    DropTable {
        name: String,
        if_exists: bool,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Expr>>,
    },
    Select {
        table: String,
        projection: Projection,
        filter: Option<Filter>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        filter: Option<Filter>,
    },
    Delete {
        table: String,
        filter: Option<Filter>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Parsed {
    pub statement: Statement,
    pub parameters: usize,
}

pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token>> {
    let mut input = sql;
    let mut tokens = Vec::new();
    loop {
        consume_while(&mut input, char::is_whitespace);
        let Some(c) = input.chars().next() else {
            break;
        };
        let token = match c {
            '-' if input.starts_with("--") => {
                consume_while(&mut input, |c| c != '\n');
                continue;
            }
            '#' => {
                consume_while(&mut input, |c| c != '\n');
                continue;
            }
            '/' if input.starts_with("/*") => {
                let end = input[2..].find("*/").map(|i| i + 4).unwrap_or(input.len());
                input = &input[end..];
                continue;
            }
            '\'' | '"' => Token::String(quoted(&mut input, c)?),
            '`' => Token::Quoted(quoted(&mut input, c)?),
            'x' | 'X' if input[1..].starts_with('\'') => {
                input = &input[1..];
                let digits = quoted(&mut input, '\'')?;
                Token::Blob(hex::decode(&digits).map_err(|e| {
                    Error::new(e).context(format!("Invalid blob literal X'{digits}'"))
                })?)
            }
            c if c.is_ascii_digit()
                || (c == '.' && input[1..].starts_with(|v: char| v.is_ascii_digit())) =>
            {
                let mut previous = ' ';
                let number = consume_while(&mut input, |c| {
                    let accept = c.is_ascii_alphanumeric()
                        || c == '.'
                        || (matches!(c, '+' | '-') && matches!(previous, 'e' | 'E'));
                    previous = c;
                    accept
                });
                Token::Number(number.to_string())
            }
            c if c.is_alphabetic() || c == '_' => Token::Word(
                consume_while(&mut input, |c| c.is_alphanumeric() || c == '_' || c == '$')
                    .to_string(),
            ),
            '?' => {
                input = &input[1..];
                Token::Param
            }
            '(' | ')' | ',' | '=' | '*' | ';' | '-' | '.' => {
                input = &input[1..];
                Token::Symbol(c)
            }
            _ => {
                return Err(Error::msg(format!(
                    "You have an error in your SQL syntax near `{}`",
                    truncate_long!(input)
                )));
            }
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Reads the literal quoted by `quote` at the start of `input`.
fn quoted(input: &mut &str, quote: char) -> Result<String> {
    let text: &str = *input;
    let mut result = String::new();
    let mut chars = text.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if c == quote {
            if text[i + 1..].starts_with(quote) {
                chars.next();
                result.push(quote);
                continue;
            }
            *input = &text[i + 1..];
            return Ok(result);
        }
        if c == '\\' && quote != '`' {
            let Some((_, escaped)) = chars.next() else {
                break;
            };
            result.push(match escaped {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '0' => '\0',
                'Z' => '\x1a',
                v => v,
            });
            continue;
        }
        result.push(c);
    }
    Err(Error::msg(format!(
        "Unterminated quoted literal: {}",
        truncate_long!(text)
    )))
}

fn number(text: &str, negative: bool) -> Result<Value> {
    let invalid = || Error::msg(format!("Invalid numeric literal `{text}`"));
    if text.contains(['.', 'e', 'E']) {
        let value = text.parse::<f64>().map_err(|_| invalid())?;
        return Ok(Value::Float64(Some(if negative { -value } else { value })));
    }
    let signed = if negative {
        format!("-{text}").parse::<i64>()
    } else {
        text.parse::<i64>()
    };
    match signed {
        Ok(v) => Ok(Value::Int64(Some(v))),
        Err(..) if !negative => text
            .parse::<u64>()
            .map(|v| Value::UInt64(Some(v)))
            .map_err(|_| invalid()),
        Err(..) => Err(invalid()),
    }
}

/// Typed NULL for a declared column type, unknown types are treated as text.
fn column_type(name: &str) -> Value {
    match name.to_ascii_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => Value::Boolean(None),
        "TINYINT" => Value::Int8(None),
        "SMALLINT" => Value::Int16(None),
        "INT" | "INTEGER" | "MEDIUMINT" => Value::Int32(None),
        "BIGINT" => Value::Int64(None),
        "FLOAT" | "REAL" => Value::Float32(None),
        "DOUBLE" => Value::Float64(None),
        "DECIMAL" | "NUMERIC" => Value::Decimal(None, 0, 0),
        "BLOB" | "BINARY" | "VARBINARY" => Value::Blob(None),
        "DATE" => Value::Date(None),
        "TIME" => Value::Time(None),
        "DATETIME" | "TIMESTAMP" => Value::Timestamp(None),
        "UUID" => Value::Uuid(None),
        _ => Value::Varchar(None),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    parameters: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }
    fn advance(&mut self) -> Option<Token> {
        let result = self.tokens.get(self.position).cloned();
        if result.is_some() {
            self.position += 1;
        }
        result
    }
    fn unexpected(&self, expected: &str) -> Error {
        match self.peek() {
            Some(token) => Error::msg(format!(
                "You have an error in your SQL syntax: expected {expected} near `{token}`"
            )),
            None => Error::msg(format!(
                "You have an error in your SQL syntax: expected {expected} at the end of the statement"
            )),
        }
    }
    fn keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Word(v)) if v.eq_ignore_ascii_case(keyword)) {
            self.position += 1;
            return true;
        }
        false
    }
    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }
    fn symbol(&mut self, symbol: char) -> bool {
        if self.peek() == Some(&Token::Symbol(symbol)) {
            self.position += 1;
            return true;
        }
        false
    }
    fn expect_symbol(&mut self, symbol: char) -> Result<()> {
        if self.symbol(symbol) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{symbol}`")))
        }
    }
    fn identifier(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Word(v)) | Some(Token::Quoted(v)) => {
                let result = v.clone();
                self.position += 1;
                Ok(result)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }
    /// Comma separated items up to the closing parenthesis, which is consumed.
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut result = Vec::new();
        loop {
            result.push(item(self)?);
            if self.symbol(')') {
                return Ok(result);
            }
            self.expect_symbol(',')?;
        }
    }
    fn expression(&mut self) -> Result<Expr> {
        let negative = self.symbol('-');
        let value = match self.advance() {
            Some(Token::Param) if !negative => {
                self.parameters += 1;
                return Ok(Expr::Param(self.parameters - 1));
            }
            Some(Token::Number(v)) => number(&v, negative)?,
            Some(Token::String(v)) if !negative => Value::Varchar(Some(v)),
            Some(Token::Blob(v)) if !negative => Value::Blob(Some(v.into())),
            Some(Token::Word(v)) if !negative && v.eq_ignore_ascii_case("NULL") => Value::Null,
            Some(Token::Word(v)) if !negative && v.eq_ignore_ascii_case("TRUE") => {
                Value::Boolean(Some(true))
            }
            Some(Token::Word(v)) if !negative && v.eq_ignore_ascii_case("FALSE") => {
                Value::Boolean(Some(false))
            }
            Some(..) => {
                self.position -= 1;
                return Err(self.unexpected("a value"));
            }
            None => return Err(self.unexpected("a value")),
        };
        Ok(Expr::Literal(value))
    }
    fn filter(&mut self) -> Result<Option<Filter>> {
        if !self.keyword("WHERE") {
            return Ok(None);
        }
        let column = self.identifier()?;
        self.expect_symbol('=')?;
        Ok(Some(Filter {
            column,
            value: self.expression()?,
        }))
    }
    fn column_def(&mut self) -> Result<ColumnDef> {
        let name = self.identifier()?;
        let mut value = column_type(&self.identifier()?);
        if self.symbol('(') {
            let arguments = self.list(|p| match p.advance() {
                Some(Token::Number(v)) => Ok(v.parse::<u8>().unwrap_or(0)),
                _ => Err(p.unexpected("a type argument")),
            })?;
            if let Value::Decimal(_, precision, scale) = &mut value {
                *precision = arguments.first().copied().unwrap_or_default();
                *scale = arguments.get(1).copied().unwrap_or_default();
            }
        }
        let mut primary_key = false;
        let mut nullable = true;
        loop {
            if self.keyword("PRIMARY") {
                self.expect_keyword("KEY")?;
                primary_key = true;
                nullable = false;
            } else if self.keyword("NOT") {
                self.expect_keyword("NULL")?;
                nullable = false;
            } else if !self.keyword("NULL") && !self.keyword("UNSIGNED") {
                break;
            }
        }
        Ok(ColumnDef {
            name,
            value,
            primary_key,
            nullable,
        })
    }
    fn statement(&mut self) -> Result<Statement> {
        if self.keyword("CREATE") {
            self.expect_keyword("TABLE")?;
            let if_not_exists = if self.keyword("IF") {
                self.expect_keyword("NOT")?;
                self.expect_keyword("EXISTS")?;
                true
            } else {
                false
            };
            let name = self.identifier()?;
            self.expect_symbol('(')?;
            let columns = self.list(Self::column_def)?;
            Ok(Statement::CreateTable {
                name,
                columns,
                if_not_exists,
            })
        } else if self.keyword("DROP") {
            self.expect_keyword("TABLE")?;
            let if_exists = if self.keyword("IF") {
                self.expect_keyword("EXISTS")?;
                true
            } else {
                false
            };
            Ok(Statement::DropTable {
                name: self.identifier()?,
                if_exists,
            })
        } else if self.keyword("INSERT") {
            self.expect_keyword("INTO")?;
            let table = self.identifier()?;
            let columns = if self.symbol('(') {
                Some(self.list(Self::identifier)?)
            } else {
                None
            };
            if !self.keyword("VALUES") {
                self.expect_keyword("VALUE")?;
            }
            let mut rows = Vec::new();
            loop {
                self.expect_symbol('(')?;
                rows.push(self.list(Self::expression)?);
                if !self.symbol(',') {
                    break;
                }
            }
            Ok(Statement::Insert {
                table,
                columns,
                rows,
            })
        } else if self.keyword("SELECT") {
            let projection = if self.symbol('*') {
                Projection::All
            } else if matches!(self.tokens.get(self.position + 1), Some(Token::Symbol('(')))
                && self.keyword("COUNT")
            {
                self.expect_symbol('(')?;
                self.expect_symbol('*')?;
                self.expect_symbol(')')?;
                Projection::Count
            } else {
                let mut columns = vec![self.identifier()?];
                while self.symbol(',') {
                    columns.push(self.identifier()?);
                }
                Projection::Columns(columns)
            };
            self.expect_keyword("FROM")?;
            Ok(Statement::Select {
                table: self.identifier()?,
                projection,
                filter: self.filter()?,
            })
        } else if self.keyword("UPDATE") {
            let table = self.identifier()?;
            self.expect_keyword("SET")?;
            let mut assignments = Vec::new();
            loop {
                let column = self.identifier()?;
                self.expect_symbol('=')?;
                assignments.push((column, self.expression()?));
                if !self.symbol(',') {
                    break;
                }
            }
            Ok(Statement::Update {
                table,
                assignments,
                filter: self.filter()?,
            })
        } else if self.keyword("DELETE") {
            self.expect_keyword("FROM")?;
            Ok(Statement::Delete {
                table: self.identifier()?,
                filter: self.filter()?,
            })
        } else {
            Err(self.unexpected("a statement"))
        }
    }
}

/// Parses a single statement, a trailing `;` is allowed.
pub(crate) fn parse(sql: &str) -> Result<Parsed> {
    let mut parser = Parser {
        tokens: tokenize(sql)?,
        position: 0,
        parameters: 0,
    };
    let statement = parser.statement()?;
    while parser.symbol(';') {}
    if parser.peek().is_some() {
        return Err(parser.unexpected("the end of the statement"));
    }
    Ok(Parsed {
        statement,
        parameters: parser.parameters,
    })
}

/// Splits a text query on the `;` separating its statements, dropping the
/// pieces made only of blanks and comments.
pub(crate) fn split_statements(sql: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut code = false;
    for_each_code_char(sql, |i, c| {
        if c == ';' {
            if code {
                result.push(&sql[start..i]);
            }
            start = i + 1;
            code = false;
        } else if !c.is_whitespace() {
            code = true;
        }
    });
    if code {
        result.push(&sql[start..]);
    }
    result
}
