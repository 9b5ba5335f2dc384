use hatch_core::SqlWriter;

/// Literal syntax read by the memory server.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemorySqlWriter {}

impl SqlWriter for MemorySqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["FALSE", "TRUE"][value as usize]);
    }
}

#[cfg(test)]
mod tests {
    use super::MemorySqlWriter;
    use hatch_core::{QueryParts, SqlWriter, Value};

    #[test]
    fn substitutes_placeholders() {
        let parts = QueryParts::new("UPDATE t SET flag = ?, note = '?' WHERE id = ?");
        let mut out = String::new();
        MemorySqlWriter {}
            .write_query(
                &mut out,
                &parts,
                &[Value::Boolean(Some(true)), Value::Int64(Some(-3))],
            )
            .unwrap();
        assert_eq!(out, "UPDATE t SET flag = TRUE, note = '?' WHERE id = -3");
    }
}
