use crate::{Error, QueryParts, Result, Value};
use std::fmt::Write;
use time::{Date, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $out:ident, $value:expr) => {{
        let mut buffer = ryu::Buffer::new();
        if $value.is_finite() {
            $out.push_str(buffer.format_finite($value));
        } else {
            $this.write_value_string($out, buffer.format($value));
        }
    }};
}

/// Renders values as SQL literals, the building block of client-side prepared statements.
///
/// Every method has a default implementation producing MySQL flavoured
/// literals, drivers override the ones their server reads differently.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            _ if value.is_null() => self.write_value_none(out),
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Int8(Some(v)) => write_integer!(out, *v),
            Value::Int16(Some(v)) => write_integer!(out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::UInt8(Some(v)) => write_integer!(out, *v),
            Value::UInt16(Some(v)) => write_integer!(out, *v),
            Value::UInt32(Some(v)) => write_integer!(out, *v),
            Value::UInt64(Some(v)) => write_integer!(out, *v),
            Value::Float32(Some(v)) => write_float!(self, out, *v),
            Value::Float64(Some(v)) => write_float!(self, out, *v),
            Value::Decimal(Some(v), ..) => {
                let _ = write!(out, "{}", v);
            }
            Value::Char(Some(v)) => {
                let mut buffer = [0; 4];
                self.write_value_string(out, v.encode_utf8(&mut buffer));
            }
            Value::Varchar(Some(v)) => self.write_value_string(out, v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v.as_ref()),
            Value::Date(Some(v)) => {
                out.push('\'');
                self.write_value_date(out, v);
                out.push('\'');
            }
            Value::Time(Some(v)) => {
                out.push('\'');
                self.write_value_time(out, v);
                out.push('\'');
            }
            Value::Timestamp(Some(v)) => {
                out.push('\'');
                self.write_value_date(out, &v.date());
                out.push(' ');
                self.write_value_time(out, &v.time());
                out.push('\'');
            }
            Value::Uuid(Some(v)) => {
                let _ = write!(out, "'{}'", v);
            }
            _ => self.write_value_none(out),
        }
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL")
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize])
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        let mut position = 0;
        for (i, c) in value.char_indices() {
            let replace = match c {
                '\'' => "''",
                '\\' => "\\\\",
                '\n' => "\\n",
                '\r' => "\\r",
                '\0' => "\\0",
                _ => continue,
            };
            out.push_str(&value[position..i]);
            out.push_str(replace);
            position = i + 1;
        }
        out.push_str(&value[position..]);
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        out.push_str(&hex::encode_upper(value));
        out.push('\'');
    }

    fn write_value_date(&self, out: &mut String, value: &Date) {
        let _ = write!(
            out,
            "{:04}-{:02}-{:02}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    fn write_value_time(&self, out: &mut String, value: &Time) {
        let mut subsecond = value.nanosecond();
        let _ = write!(
            out,
            "{:02}:{:02}:{:02}",
            value.hour(),
            value.minute(),
            value.second(),
        );
        if subsecond == 0 {
            return;
        }
        let mut width = 9;
        while subsecond % 10 == 0 {
            subsecond /= 10;
            width -= 1;
        }
        let _ = write!(out, ".{:0width$}", subsecond);
    }

    /// Writes `parts` with every placeholder replaced by the literal of the matching value.
    fn write_query(&self, out: &mut String, parts: &QueryParts, values: &[Value]) -> Result<()> {
        if parts.parameter_count() != values.len() {
            return Err(Error::msg(format!(
                "The query expects {} parameters but {} were provided",
                parts.parameter_count(),
                values.len()
            )));
        }
        let mut fragments = parts.fragments().iter();
        if let Some(first) = fragments.next() {
            out.push_str(first);
        }
        for (fragment, value) in fragments.zip(values) {
            self.write_value(out, value);
            out.push_str(fragment);
        }
        Ok(())
    }
}

/// Writer with the default literal syntax.
#[derive(Default, Clone, Copy)]
pub struct GenericSqlWriter;

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use time::macros::{date, datetime, time};

    fn render(value: Value) -> String {
        let mut out = String::new();
        GenericSqlWriter.write_value(&mut out, &value);
        out
    }

    #[test]
    fn literals() {
        assert_eq!(render(Value::Int32(Some(-5))), "-5");
        assert_eq!(render(Value::UInt64(None)), "NULL");
        assert_eq!(render(Value::Boolean(Some(true))), "true");
        assert_eq!(render(Value::Float64(Some(1.5))), "1.5");
        assert_eq!(
            render(Value::Decimal(Decimal::from_str("12.50").ok(), 4, 2)),
            "12.50"
        );
        assert_eq!(render(Value::Blob(Some([0xDE, 0xAD].into()))), "X'DEAD'");
        assert_eq!(render(Value::Date(Some(date!(2024 - 02 - 29)))), "'2024-02-29'");
        assert_eq!(render(Value::Time(Some(time!(10:30:00.250)))), "'10:30:00.25'");
        assert_eq!(
            render(Value::Timestamp(Some(datetime!(2024-01-02 03:04:05)))),
            "'2024-01-02 03:04:05'"
        );
    }

    #[test]
    fn string_escaping() {
        assert_eq!(
            render(Value::Varchar(Some("it's a \\ path\n".into()))),
            r"'it''s a \\ path\n'"
        );
        assert_eq!(render(Value::Char(Some('\''))), "''''");
    }

    #[test]
    fn query() {
        let parts = QueryParts::new("SELECT * FROM t WHERE a = ? AND b = '?' AND c = ?");
        let mut out = String::new();
        GenericSqlWriter
            .write_query(
                &mut out,
                &parts,
                &[Value::Int32(Some(1)), Value::Varchar(Some("x".into()))],
            )
            .unwrap();
        assert_eq!(out, "SELECT * FROM t WHERE a = 1 AND b = '?' AND c = 'x'");
        assert!(
            GenericSqlWriter
                .write_query(&mut String::new(), &parts, &[])
                .is_err()
        );
    }
}
